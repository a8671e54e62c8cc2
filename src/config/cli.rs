//! Command-line surface.
//!
//! Flags are parsed once in `main` and folded into an immutable
//! [`ServerConfig`]; nothing reads them after that.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::schema::{EngineConfig, ServerConfig};
use crate::observability::logging::LogFormat;

#[derive(Parser, Debug)]
#[command(name = "goproxy-server")]
#[command(about = "A Go module proxy server", long_about = None)]
pub struct Cli {
    /// TCP address that the HTTP server listens on
    #[arg(long, default_value = "localhost:8080")]
    pub address: String,

    /// Path to the TLS certificate file
    #[arg(long)]
    pub tls_cert_file: Option<PathBuf>,

    /// Path to the TLS key file
    #[arg(long)]
    pub tls_key_file: Option<PathBuf>,

    /// Prefix for all request paths
    #[arg(long, default_value = "")]
    pub path_prefix: String,

    /// Name of the Go binary that is used to execute direct fetches
    #[arg(long, default_value = "go")]
    pub go_bin_name: String,

    /// Maximum number (0 means no limit) of concurrent direct fetches
    #[arg(long, default_value_t = 0)]
    pub max_direct_fetches: usize,

    /// Comma-separated list of proxied checksum databases
    #[arg(long, value_delimiter = ',')]
    pub proxied_sumdbs: Vec<String>,

    /// Directory that used to cache module files
    #[arg(long, default_value = "caches")]
    pub cache_dir: PathBuf,

    /// Directory for storing temporary files
    #[arg(long, default_value_os_t = std::env::temp_dir())]
    pub temp_dir: PathBuf,

    /// Allow insecure TLS connections
    #[arg(long)]
    pub insecure: bool,

    /// Maximum amount of time (0 means no limit) to wait for an outgoing connection to establish
    #[arg(long, default_value = "30s", value_parser = parse_timeout)]
    pub connect_timeout: Duration,

    /// Maximum amount of time (0 means no limit) to wait for a fetch to complete
    #[arg(long, default_value = "10m", value_parser = parse_timeout)]
    pub fetch_timeout: Duration,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// A humantime duration, or a bare `0` for "no limit".
fn parse_timeout(value: &str) -> Result<Duration, humantime::DurationError> {
    match value.trim() {
        "0" => Ok(Duration::ZERO),
        other => humantime::parse_duration(other),
    }
}

impl Cli {
    /// Fold the parsed flags into the server configuration.
    pub fn into_config(self) -> ServerConfig {
        ServerConfig {
            address: self.address,
            tls_cert_file: self.tls_cert_file.filter(|p| !p.as_os_str().is_empty()),
            tls_key_file: self.tls_key_file.filter(|p| !p.as_os_str().is_empty()),
            path_prefix: Some(self.path_prefix).filter(|p| !p.is_empty()),
            connect_timeout: self.connect_timeout,
            fetch_timeout: self.fetch_timeout,
            insecure: self.insecure,
            engine: EngineConfig {
                go_bin_name: self.go_bin_name,
                max_direct_fetches: self.max_direct_fetches,
                proxied_sumdbs: self.proxied_sumdbs,
                cache_dir: self.cache_dir,
                temp_dir: self.temp_dir,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["goproxy-server"]).unwrap();
        assert_eq!(cli.log_format, LogFormat::Text);

        let config = cli.into_config();
        assert_eq!(config.address, "localhost:8080");
        assert!(config.path_prefix.is_none());
        assert!(config.tls().is_none());
        assert!(!config.insecure);
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.fetch_timeout, Duration::from_secs(600));
        assert_eq!(config.engine.cache_dir, PathBuf::from("caches"));
        assert!(config.engine.proxied_sumdbs.is_empty());
    }

    #[test]
    fn test_all_flags() {
        let cli = Cli::try_parse_from([
            "goproxy-server",
            "--address",
            "0.0.0.0:9000",
            "--tls-cert-file",
            "cert.pem",
            "--tls-key-file",
            "key.pem",
            "--path-prefix",
            "/proxy",
            "--go-bin-name",
            "go1.22",
            "--max-direct-fetches",
            "8",
            "--proxied-sumdbs",
            "sum.golang.org,sum.golang.google.cn https://sum.golang.google.cn",
            "--cache-dir",
            "/var/cache/goproxy",
            "--temp-dir",
            "/var/tmp",
            "--insecure",
            "--connect-timeout",
            "5s",
            "--fetch-timeout",
            "0",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);

        let config = cli.into_config();
        assert_eq!(config.address, "0.0.0.0:9000");
        assert!(config.tls().is_some());
        assert_eq!(config.path_prefix.as_deref(), Some("/proxy"));
        assert!(config.insecure);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.fetch_timeout, Duration::ZERO);
        assert_eq!(config.engine.go_bin_name, "go1.22");
        assert_eq!(config.engine.max_direct_fetches, 8);
        assert_eq!(
            config.engine.proxied_sumdbs,
            vec![
                "sum.golang.org".to_string(),
                "sum.golang.google.cn https://sum.golang.google.cn".to_string()
            ]
        );
        assert_eq!(config.engine.temp_dir, PathBuf::from("/var/tmp"));
    }

    #[test]
    fn test_timeout_forms() {
        assert_eq!(parse_timeout("0").unwrap(), Duration::ZERO);
        assert_eq!(parse_timeout("0s").unwrap(), Duration::ZERO);
        assert_eq!(parse_timeout("1h 30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_timeout("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_timeout("250ms").unwrap(), Duration::from_millis(250));
        assert!(parse_timeout("").is_err());
        assert!(parse_timeout("10").is_err());
    }

    #[test]
    fn test_rejects_bad_duration() {
        let err = Cli::try_parse_from(["goproxy-server", "--fetch-timeout", "ten minutes"]);
        assert!(err.is_err());
    }
}
