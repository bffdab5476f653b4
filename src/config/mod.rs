// Configuration module entry point
// Layers defaults, config file, environment and command line into one
// immutable Config

mod types;

use std::net::SocketAddr;
use std::path::Path;

use crate::cli::Cli;

// Re-export public types
pub use types::{Config, FeaturesConfig, HttpConfig, LoggingConfig, PerformanceConfig, ServerConfig};

/// Config file picked up from the working directory when present
const DEFAULT_CONFIG_NAME: &str = "dirserve";

/// Environment variable prefix, e.g. `DIRSERVE_SERVER__PORT=9000`
const ENV_PREFIX: &str = "DIRSERVE";

impl Config {
    /// Load configuration for the given command line
    ///
    /// Precedence, lowest first: built-in defaults, config file, environment,
    /// command line flags.
    pub fn load(cli: &Cli) -> Result<Self, config::ConfigError> {
        let file = match cli.config.as_deref() {
            Some(path) => config::File::from(Path::new(path)).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let settings = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("server.directory", ".")?
            .set_default("features.redirect", false)?
            .set_default("features.cors", false)?
            .set_default("features.verbose", false)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 300)?
            .set_default("performance.shutdown_timeout", 5)?
            .set_default("http.server_name", concat!("dirserve/", env!("CARGO_PKG_VERSION")))?
            .set_default("http.max_body_size", 10_485_760)? // 10MB
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("server.port", cli.port.map(i64::from))?
            .set_override_option("server.host", cli.listen_address.clone())?
            .set_override_option("server.directory", cli.directory.clone())?
            // Flags can only switch features on
            .set_override_option("features.redirect", cli.redirect.then_some(true))?
            .set_override_option("features.cors", cli.cors.then_some(true))?
            .set_override_option("features.verbose", cli.verbose.then_some(true))?
            .build()?;

        settings.try_deserialize()
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        let host = self.server.host.trim_matches(|c| c == '[' || c == ']');
        let addr = if host.contains(':') {
            format!("[{host}]:{}", self.server.port)
        } else {
            format!("{host}:{}", self.server.port)
        };
        addr.parse().map_err(|e| format!("Invalid address '{addr}': {e}"))
    }

    /// Effective configuration as TOML, for `--print-config`
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("dirserve").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let cfg = Config::load(&cli(&[])).unwrap();
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.server.port, 8000);
        assert_eq!(cfg.server.directory, ".");
        assert_eq!(cfg.features, FeaturesConfig::default());
        assert_eq!(cfg.logging.access_log_format, "combined");
        assert_eq!(cfg.http.max_body_size, 10_485_760);
    }

    #[test]
    fn test_flags_override_defaults() {
        let cfg = Config::load(&cli(&["-p", "9001", "-l", "127.0.0.1", "-d", "/tmp", "--cors", "--redirect"])).unwrap();
        assert_eq!(cfg.server.port, 9001);
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.server.directory, "/tmp");
        assert!(cfg.features.cors);
        assert!(cfg.features.redirect);
        assert!(!cfg.features.verbose);
    }

    #[test]
    fn test_config_file_then_flags() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[server]\nport = 7000\ndirectory = \"/srv/www\"\n\n[features]\nverbose = true\n\n[logging]\nlevel = \"debug\"\naccess_log_format = \"json\""
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cfg = Config::load(&cli(&["-c", &path])).unwrap();
        assert_eq!(cfg.server.port, 7000);
        assert_eq!(cfg.server.directory, "/srv/www");
        assert!(cfg.features.verbose);
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.logging.access_log_format, "json");

        // A flag wins over the file, an absent flag leaves the file value alone
        let cfg = Config::load(&cli(&["-c", &path, "-p", "7100"])).unwrap();
        assert_eq!(cfg.server.port, 7100);
        assert!(cfg.features.verbose);
    }

    #[test]
    fn test_missing_explicit_config_file_is_an_error() {
        assert!(Config::load(&cli(&["-c", "/nonexistent/dirserve-test.toml"])).is_err());
    }

    #[test]
    fn test_socket_addr() {
        let mut cfg = Config::load(&cli(&["-l", "127.0.0.1", "-p", "8080"])).unwrap();
        assert_eq!(cfg.socket_addr().unwrap(), "127.0.0.1:8080".parse().unwrap());

        cfg.server.host = "::1".to_string();
        assert_eq!(cfg.socket_addr().unwrap(), "[::1]:8080".parse().unwrap());

        cfg.server.host = "not an address".to_string();
        assert!(cfg.socket_addr().is_err());
    }

    #[test]
    fn test_to_toml() {
        let cfg = Config::load(&cli(&["-p", "8123", "--verbose"])).unwrap();
        let rendered = cfg.to_toml().unwrap();
        assert!(rendered.contains("port = 8123"));
        assert!(rendered.contains("verbose = true"));
    }
}
