pub mod config;
pub mod constants;

pub use config::{CommandSet, PipelineConfig, TemplateSet};
