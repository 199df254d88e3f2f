use crate::broker::FetchWindow;
use crate::constants::{
    DEFAULT_PAGE_SIZE, DEFAULT_REQUEST_TIMEOUT, DEFAULT_TRADE_LOG_PATH, DEFAULT_WINDOW_DAYS,
    MAX_PAGE_SIZE, MERGED_OUTPUT_FILE,
};
use crate::error::ReconcileError;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod broker;

pub use broker::{load_broker_config, BrokerConfig};

/// Read `name` from the environment, or from the file named by `<name>_FILE`.
pub fn read_env_or_file(name: &str) -> Result<String> {
    if let Ok(value) = env::var(name) {
        return Ok(value);
    }

    let file_var = format!("{}_FILE", name);
    let path = env::var(&file_var).map_err(|_| anyhow!("Neither {} nor {} is set", name, file_var))?;
    let content =
        fs::read_to_string(&path).with_context(|| format!("Failed to read {} at {}", file_var, path))?;
    Ok(content.trim().to_string())
}

/// Contents of an optional TOML config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub reconcile: ReconcileSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconcileSection {
    pub log_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub window_days: Option<i64>,
    pub page_size: Option<u32>,
    pub request_timeout_secs: Option<u64>,
}

pub fn load_config(path: &Path) -> Result<FileConfig, ReconcileError> {
    let content = fs::read_to_string(path)?;
    let config: FileConfig = toml::from_str(&content)?;
    log::info!("Loaded reconcile config from '{}'", path.display());
    Ok(config)
}

/// Values given on the command line; these win over the file and the environment.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub log_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub window_days: Option<i64>,
    pub after: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowSpec {
    /// The given number of days ending when the run starts.
    TrailingDays(i64),
    Between {
        after: DateTime<Utc>,
        until: DateTime<Utc>,
    },
}

impl WindowSpec {
    pub fn resolve(&self) -> Result<FetchWindow, ReconcileError> {
        match *self {
            WindowSpec::TrailingDays(days) => FetchWindow::trailing_days(days),
            WindowSpec::Between { after, until } => Ok(FetchWindow::new(after, until)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileSettings {
    pub log_path: PathBuf,
    pub output_path: PathBuf,
    pub window: WindowSpec,
    pub page_size: u32,
    pub request_timeout: Duration,
}

impl ReconcileSettings {
    /// Merge sources. Priority: CLI > file > environment (`env_log_path`) > default.
    pub fn resolve(
        file: &ReconcileSection,
        cli: &CliOverrides,
        env_log_path: Option<PathBuf>,
    ) -> Result<Self, ReconcileError> {
        let log_path = cli
            .log_path
            .clone()
            .or_else(|| file.log_path.clone())
            .or(env_log_path)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TRADE_LOG_PATH));

        let output_path = cli
            .output_path
            .clone()
            .or_else(|| file.output_path.clone())
            .unwrap_or_else(|| default_output_path(&log_path));

        let window = match (cli.after, cli.until) {
            (Some(after), Some(until)) => {
                if after >= until {
                    return Err(ReconcileError::ValidationError(format!(
                        "after ({}) must be earlier than until ({})",
                        after, until
                    )));
                }
                WindowSpec::Between { after, until }
            }
            (None, None) => {
                let days = cli
                    .window_days
                    .or(file.window_days)
                    .unwrap_or(DEFAULT_WINDOW_DAYS);
                if days <= 0 {
                    return Err(ReconcileError::ValidationError(format!(
                        "window_days must be positive, got {}",
                        days
                    )));
                }
                FetchWindow::trailing_days(days)?;
                WindowSpec::TrailingDays(days)
            }
            _ => {
                return Err(ReconcileError::ValidationError(
                    "after and until must be given together".to_string(),
                ))
            }
        };

        let page_size = cli
            .page_size
            .or(file.page_size)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(ReconcileError::ValidationError(format!(
                "page_size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, page_size
            )));
        }

        let request_timeout = match file.request_timeout_secs {
            Some(0) => {
                return Err(ReconcileError::ValidationError(
                    "request_timeout_secs must be positive".to_string(),
                ))
            }
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_REQUEST_TIMEOUT,
        };

        Ok(Self {
            log_path,
            output_path,
            window,
            page_size,
            request_timeout,
        })
    }
}

/// Load the optional config file and the environment, then apply CLI overrides.
pub fn load_settings(
    config_path: Option<&Path>,
    cli: &CliOverrides,
) -> Result<ReconcileSettings, ReconcileError> {
    let file = match config_path {
        Some(path) => load_config(path)?,
        None => FileConfig::default(),
    };
    let env_log_path = env::var("TRADE_LOG_PATH").ok().map(PathBuf::from);
    ReconcileSettings::resolve(&file.reconcile, cli, env_log_path)
}

/// The merged table lives next to the trade log.
pub fn default_output_path(log_path: &Path) -> PathBuf {
    log_path.with_file_name(MERGED_OUTPUT_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_env_or_file() {
        env::set_var("RECONCILER_TEST_SECRET", "direct_value");
        assert_eq!(read_env_or_file("RECONCILER_TEST_SECRET").unwrap(), "direct_value");
        env::remove_var("RECONCILER_TEST_SECRET");

        // Secret files usually end with a newline
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "file_value").unwrap();
        env::set_var("RECONCILER_TEST_SECRET_FILE", file.path());
        assert_eq!(read_env_or_file("RECONCILER_TEST_SECRET").unwrap(), "file_value");
        env::remove_var("RECONCILER_TEST_SECRET_FILE");

        assert!(read_env_or_file("RECONCILER_TEST_SECRET").is_err());
    }

    #[test]
    fn test_defaults() {
        let settings =
            ReconcileSettings::resolve(&ReconcileSection::default(), &CliOverrides::default(), None)
                .unwrap();
        assert_eq!(settings.log_path, PathBuf::from(DEFAULT_TRADE_LOG_PATH));
        assert_eq!(
            settings.output_path,
            PathBuf::from("logs").join(MERGED_OUTPUT_FILE)
        );
        assert_eq!(settings.window, WindowSpec::TrailingDays(30));
        assert_eq!(settings.page_size, 500);
        assert_eq!(settings.request_timeout, DEFAULT_REQUEST_TIMEOUT);
    }

    #[test]
    fn test_priority_cli_over_file_over_env() {
        let file = ReconcileSection {
            log_path: Some(PathBuf::from("/file/log.jsonl")),
            window_days: Some(7),
            page_size: Some(100),
            ..Default::default()
        };
        let env_path = Some(PathBuf::from("/env/log.jsonl"));

        let settings =
            ReconcileSettings::resolve(&file, &CliOverrides::default(), env_path.clone()).unwrap();
        assert_eq!(settings.log_path, PathBuf::from("/file/log.jsonl"));
        assert_eq!(settings.window, WindowSpec::TrailingDays(7));
        assert_eq!(settings.page_size, 100);

        let cli = CliOverrides {
            log_path: Some(PathBuf::from("/cli/log.jsonl")),
            page_size: Some(50),
            ..Default::default()
        };
        let settings = ReconcileSettings::resolve(&file, &cli, env_path.clone()).unwrap();
        assert_eq!(settings.log_path, PathBuf::from("/cli/log.jsonl"));
        assert_eq!(
            settings.output_path,
            PathBuf::from("/cli").join(MERGED_OUTPUT_FILE)
        );
        assert_eq!(settings.page_size, 50);

        let settings =
            ReconcileSettings::resolve(&ReconcileSection::default(), &CliOverrides::default(), env_path)
                .unwrap();
        assert_eq!(settings.log_path, PathBuf::from("/env/log.jsonl"));
    }

    #[test]
    fn test_explicit_window() {
        let after = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let until = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let cli = CliOverrides {
            after: Some(after),
            until: Some(until),
            ..Default::default()
        };
        let settings =
            ReconcileSettings::resolve(&ReconcileSection::default(), &cli, None).unwrap();
        assert_eq!(
            settings.window.resolve().unwrap(),
            FetchWindow::new(after, until)
        );
    }

    #[test]
    fn test_validation_errors() {
        let after = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let section = ReconcileSection::default();

        let inverted = CliOverrides {
            after: Some(after),
            until: Some(after),
            ..Default::default()
        };
        let half = CliOverrides {
            after: Some(after),
            ..Default::default()
        };
        let zero_days = CliOverrides {
            window_days: Some(0),
            ..Default::default()
        };
        let big_page = CliOverrides {
            page_size: Some(501),
            ..Default::default()
        };
        let huge_days = CliOverrides {
            window_days: Some(1_000_000_000),
            ..Default::default()
        };

        for cli in [inverted, half, zero_days, big_page, huge_days] {
            assert!(matches!(
                ReconcileSettings::resolve(&section, &cli, None),
                Err(ReconcileError::ValidationError(_))
            ));
        }

        let huge_file_days = ReconcileSection {
            window_days: Some(i64::MAX),
            ..Default::default()
        };
        assert!(matches!(
            ReconcileSettings::resolve(&huge_file_days, &CliOverrides::default(), None),
            Err(ReconcileError::ValidationError(_))
        ));

        let no_timeout = ReconcileSection {
            request_timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(ReconcileSettings::resolve(&no_timeout, &CliOverrides::default(), None).is_err());
    }

    #[test]
    fn test_load_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[reconcile]\nlog_path = \"bot/trade_log.jsonl\"\nwindow_days = 14\nrequest_timeout_secs = 5"
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(
            config.reconcile.log_path,
            Some(PathBuf::from("bot/trade_log.jsonl"))
        );
        assert_eq!(config.reconcile.window_days, Some(14));
        assert_eq!(config.reconcile.request_timeout_secs, Some(5));
    }

    #[test]
    fn test_unknown_config_key_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[reconcile]\nwindow = 14").unwrap();
        assert!(matches!(
            load_config(file.path()),
            Err(ReconcileError::ParsingError(_))
        ));
    }
}
