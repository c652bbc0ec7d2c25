//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("execution.debug", false)?
        .set_default("execution.concurrent", false)?
        .set_default("execution.close_threshold_ms", 6000)?
        .set_default("execution.pass_through", vec!["log", "tracing"])?
        .set_default("task.strategy", "per_artifact")?
        .set_default("task.output_dir", "target/generated")?
        .set_default("task.report_dir", "target/provgen")?
        .set_default("task.generator.method", "run")
}
