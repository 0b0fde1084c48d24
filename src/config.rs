use crate::types::Config;
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("reading config {}", path))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing config {}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to built-in defaults.
    /// Runs before logging is up, so the caller reports the fallback.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.sensor.rows == 0 || self.sensor.cols == 0 {
            bail!(
                "sensor dimensions must be non-zero (got {}x{})",
                self.sensor.rows,
                self.sensor.cols
            );
        }
        if self.window.accumulation_time == 0 {
            bail!("window.accumulation_time must be positive");
        }
        if !(self.tracker.bot_width > 0.0) {
            bail!("tracker.bot_width must be positive");
        }
        for (name, params) in [
            ("combined", &self.clustering.combined),
            ("positive", &self.clustering.positive),
            ("negative", &self.clustering.negative),
        ] {
            if !(params.eps >= 1.0) || params.min_pts == 0 {
                bail!(
                    "clustering.{} needs eps >= 1 and min_pts >= 1 (got eps={}, min_pts={})",
                    name,
                    params.eps,
                    params.min_pts
                );
            }
        }
        Ok(())
    }
}
