use crate::config::Config;
use log::{LevelFilter, SetLoggerError};
use simplelog::{self, ConfigBuilder, ThreadLogMode};

/// Dependencies whose logs drown out stream lifecycle messages. Shown only at Trace.
const FILTERED_MODULES: &[&str] = &["tower", "tower_http", "hyper", "hyper_util", "axum"];

pub struct Logger {}

impl Logger {
    /// Installs the global terminal logger at the level configured in `config`.
    ///
    /// Fails if a logger has already been installed for this process.
    pub fn init_logger(config: &Config) -> Result<(), SetLoggerError> {
        let level = config.log_level_filter;
        simplelog::TermLogger::init(
            level,
            Self::build_log_config(level),
            simplelog::TerminalMode::Mixed,
            simplelog::ColorChoice::Auto,
        )
    }

    /// Dependency logs are noise unless everything was asked for.
    fn should_filter_dependencies(level: LevelFilter) -> bool {
        level != LevelFilter::Trace
    }

    /// Thread ids help tell concurrent stream writers apart while debugging.
    fn should_log_threads(level: LevelFilter) -> bool {
        level >= LevelFilter::Debug
    }

    fn build_log_config(level: LevelFilter) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder.set_time_format_rfc3339();

        if Self::should_log_threads(level) {
            builder
                .set_thread_level(LevelFilter::Error)
                .set_thread_mode(ThreadLogMode::Both);
        } else {
            builder.set_thread_level(LevelFilter::Off);
        }

        if Self::should_filter_dependencies(level) {
            for module in FILTERED_MODULES {
                builder.add_filter_ignore_str(module);
            }
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filtered_modules_cover_http_stack_only() {
        for module in ["tower", "hyper", "axum"] {
            assert!(
                FILTERED_MODULES.contains(&module),
                "{module} should be filtered"
            );
        }
        assert!(
            !FILTERED_MODULES.contains(&"sse"),
            "stream lifecycle logs should stay visible"
        );
    }

    #[test]
    fn test_trace_level_disables_dependency_filtering() {
        assert!(!Logger::should_filter_dependencies(LevelFilter::Trace));
    }

    #[test]
    fn test_other_levels_enable_dependency_filtering() {
        for level in [
            LevelFilter::Off,
            LevelFilter::Error,
            LevelFilter::Warn,
            LevelFilter::Info,
            LevelFilter::Debug,
        ] {
            assert!(
                Logger::should_filter_dependencies(level),
                "{level} should filter dependencies"
            );
        }
    }

    #[test]
    fn test_thread_ids_only_when_debugging() {
        assert!(!Logger::should_log_threads(LevelFilter::Info));
        assert!(Logger::should_log_threads(LevelFilter::Debug));
        assert!(Logger::should_log_threads(LevelFilter::Trace));
    }

    #[test]
    fn test_build_log_config_does_not_panic_at_any_level() {
        for level in [LevelFilter::Info, LevelFilter::Debug, LevelFilter::Trace] {
            let _config = Logger::build_log_config(level);
        }
    }
}
