// src/pipeline/mod.rs

pub mod metrics;
pub mod runner;
pub mod window_pipeline;
pub mod window_report;

pub use runner::run;
