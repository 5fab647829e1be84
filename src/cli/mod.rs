pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{AnalyzeArgs, CacheAction, CacheArgs, CliArgs, Commands, ConfigArgs};
pub use output::{CacheStats, OutputFormat, OutputFormatter};
