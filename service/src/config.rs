use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use sse::client::StreamOptions;
use std::time::Duration;

const BINARY_NAME: &str = "event_stream_rs";

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// A list of full CORS origin URLs that allowed to receive server responses.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = "http://localhost:3000,https://localhost:3000"
    )]
    pub allowed_origins: Vec<String>,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 4000)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Seconds of stream inactivity before a keep-alive comment is sent (0 disables them)
    #[arg(long, env, default_value_t = 15)]
    pub keep_alive_secs: u64,

    /// Maximum lifetime in seconds of a single event stream; unlimited when unset
    #[arg(long, env)]
    stream_timeout_secs: Option<u64>,

    /// Reconnection delay in milliseconds suggested to browsers when a stream opens
    #[arg(long, env)]
    retry_millis: Option<u64>,

    /// Seconds between the server clock events broadcast to every stream
    #[arg(long, env, default_value_t = 2)]
    pub tick_interval_secs: u64,
}

impl Default for Config {
    /// Built-in defaults, overridden only by environment variables.
    fn default() -> Self {
        Config::parse_from([BINARY_NAME])
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn interface(&self) -> &str {
        self.interface.as_deref().unwrap_or("127.0.0.1")
    }

    pub fn stream_timeout(&self) -> Option<Duration> {
        self.stream_timeout_secs.map(Duration::from_secs)
    }

    pub fn keep_alive(&self) -> Option<Duration> {
        (self.keep_alive_secs > 0).then(|| Duration::from_secs(self.keep_alive_secs))
    }

    pub fn retry(&self) -> Option<Duration> {
        self.retry_millis.map(Duration::from_millis)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs.max(1))
    }

    /// Options every event stream opened by this server runs with.
    pub fn stream_options(&self) -> StreamOptions {
        StreamOptions {
            timeout: self.stream_timeout(),
            keep_alive: self.keep_alive(),
            retry: self.retry(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse_from([BINARY_NAME]);

        assert_eq!(config.port, 4000);
        assert_eq!(config.interface(), "127.0.0.1");
        assert_eq!(config.log_level_filter, LevelFilter::Info);
        assert_eq!(config.tick_interval(), Duration::from_secs(2));
        assert_eq!(
            config.allowed_origins,
            vec!["http://localhost:3000", "https://localhost:3000"]
        );
    }

    #[test]
    fn test_stream_options_from_flags() {
        let config = Config::parse_from([
            BINARY_NAME,
            "--keep-alive-secs",
            "30",
            "--stream-timeout-secs",
            "600",
            "--retry-millis",
            "2500",
        ]);

        assert_eq!(
            config.stream_options(),
            StreamOptions::new()
                .keep_alive(Duration::from_secs(30))
                .timeout(Duration::from_secs(600))
                .retry(Duration::from_millis(2500))
        );
    }

    #[test]
    fn test_zero_keep_alive_disables_it() {
        let config = Config::parse_from([BINARY_NAME, "--keep-alive-secs", "0"]);

        assert_eq!(config.keep_alive(), None);
    }

    #[test]
    fn test_log_level_parses_uppercase_names() {
        let config = Config::parse_from([BINARY_NAME, "--log-level-filter", "DEBUG"]);

        assert_eq!(config.log_level_filter, LevelFilter::Debug);
    }
}
