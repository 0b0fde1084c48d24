// src/display.rs
//
// Live view of each closed window: the combined mask with every entity's
// id, position and heading drawn above its centroid.
//
// The OpenCV window is only compiled with the `display` feature. Without it
// (or with display.enabled = false) frames go to HeadlessSink.

use crate::accumulator::BinaryMask;
use crate::tracking::Entity;
use crate::types::DisplayConfig;
use anyhow::Result;
use tracing::info;

pub trait FrameSink {
    fn show(&mut self, frame_number: u64, mask: &BinaryMask, entities: &[Entity]) -> Result<()>;
}

/// Drops frames. Used for batch runs and tests.
#[derive(Debug, Default)]
pub struct HeadlessSink;

impl FrameSink for HeadlessSink {
    fn show(&mut self, _frame: u64, _mask: &BinaryMask, _entities: &[Entity]) -> Result<()> {
        Ok(())
    }
}

/// Text drawn above an entity, top line first: id, position, heading
pub fn entity_labels(entity: &Entity) -> [String; 3] {
    let angle = match entity.angle {
        Some(a) => format!("{} deg", a),
        None => "-- deg".to_string(),
    };
    [
        entity.id.to_string(),
        format!("({} , {})", entity.position.x, entity.position.y),
        angle,
    ]
}

pub fn build_sink(config: &DisplayConfig) -> Result<Box<dyn FrameSink>> {
    if !config.enabled {
        info!("⚪ Display disabled in config");
        return Ok(Box::new(HeadlessSink::default()));
    }

    #[cfg(feature = "display")]
    {
        let display = opencv_view::OpenCvDisplay::new(config.wait_ms)?;
        info!("✓ OpenCV display ready");
        Ok(Box::new(display))
    }

    #[cfg(not(feature = "display"))]
    {
        info!("⚪ Built without the `display` feature, running headless");
        Ok(Box::new(HeadlessSink::default()))
    }
}

#[cfg(feature = "display")]
mod opencv_view {
    use super::{entity_labels, FrameSink};
    use crate::accumulator::BinaryMask;
    use crate::tracking::Entity;
    use anyhow::Result;
    use opencv::{
        core::{self, Mat},
        highgui, imgproc,
        prelude::*,
    };

    const WINDOW: &str = "radvision";

    pub struct OpenCvDisplay {
        wait_ms: i32,
    }

    impl OpenCvDisplay {
        pub fn new(wait_ms: i32) -> Result<Self> {
            highgui::named_window(WINDOW, highgui::WINDOW_AUTOSIZE)?;
            Ok(Self { wait_ms })
        }

        fn annotate(&self, mask: &BinaryMask, entities: &[Entity]) -> Result<Mat> {
            let gray = Mat::from_slice(mask.data())?;
            let gray = gray.reshape(1, mask.rows() as i32)?;

            let mut frame = Mat::default();
            imgproc::cvt_color(&gray, &mut frame, imgproc::COLOR_GRAY2BGR, 0)?;

            let label_color = core::Scalar::new(255.0, 0.0, 0.0, 0.0); // Blue
            let dot_color = core::Scalar::new(0.0, 0.0, 255.0, 0.0); // Red

            for entity in entities {
                let (x, y) = (entity.position.x, entity.position.y);

                for (line, offset) in entity_labels(entity).iter().zip([70, 50, 30]) {
                    imgproc::put_text(
                        &mut frame,
                        line,
                        core::Point::new(x - 10, y - offset),
                        imgproc::FONT_HERSHEY_SIMPLEX,
                        0.5,
                        label_color,
                        2,
                        imgproc::LINE_8,
                        false,
                    )?;
                }

                imgproc::rectangle_points(
                    &mut frame,
                    core::Point::new(x - 15, y - 20),
                    core::Point::new(x + 90, y - 90),
                    label_color,
                    1,
                    imgproc::LINE_8,
                    0,
                )?;

                imgproc::circle(
                    &mut frame,
                    core::Point::new(x, y),
                    4,
                    dot_color,
                    -1,
                    imgproc::LINE_8,
                    0,
                )?;
            }

            Ok(frame)
        }
    }

    impl FrameSink for OpenCvDisplay {
        fn show(
            &mut self,
            _frame_number: u64,
            mask: &BinaryMask,
            entities: &[Entity],
        ) -> Result<()> {
            let frame = self.annotate(mask, entities)?;
            highgui::imshow(WINDOW, &frame)?;
            highgui::wait_key(self.wait_ms)?;
            Ok(())
        }
    }
}
