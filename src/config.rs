use clap::Parser;
use std::path::PathBuf;

/// In-memory state sidecar for the TunTaz Madani dashboard.
///
/// Reads one JSON request per line on stdin and answers on stdout. Logs go
/// to stderr.
#[derive(Parser, Debug, Default)]
#[command(name = "tuntazd", version)]
pub struct Cli {
    /// JSON file with `branches`, `users` and `students` replacing the demo data
    #[arg(long, env = "TUNTAZ_SEED")]
    pub seed: Option<PathBuf>,
    /// Log level or `EnvFilter` directive (RUST_LOG wins when set)
    #[arg(long, env = "TUNTAZ_LOG_LEVEL")]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub seed_path: Option<PathBuf>,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl AppConfig {
    /// `.env` is read first so its values are visible to clap's env fallback.
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Self::from_cli(Cli::parse())
    }

    pub fn from_cli(cli: Cli) -> Self {
        let log_level = cli
            .log_level
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| "info".to_string());
        Self {
            seed_path: cli.seed,
            telemetry: TelemetryConfig { log_level },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_info_and_demo_seed() {
        let cfg = AppConfig::from_cli(Cli::default());
        assert_eq!(cfg.seed_path, None);
        assert_eq!(cfg.telemetry.log_level, "info");
    }

    #[test]
    fn flags_are_parsed() {
        let cli = Cli::try_parse_from([
            "tuntazd",
            "--seed",
            "/tmp/santri.json",
            "--log-level",
            "debug",
        ])
        .expect("parse");
        let cfg = AppConfig::from_cli(cli);
        assert_eq!(cfg.seed_path, Some(PathBuf::from("/tmp/santri.json")));
        assert_eq!(cfg.telemetry.log_level, "debug");
    }

    #[test]
    fn blank_log_level_falls_back() {
        let cfg = AppConfig::from_cli(Cli {
            seed: None,
            log_level: Some("  ".into()),
        });
        assert_eq!(cfg.telemetry.log_level, "info");
    }
}
