//! Log subscriber setup for hosts embedding the reconcilers.
//!
//! The host usually speaks its own protocol on stdout, so log lines always
//! go to stderr. Verbosity applies to this workspace's crates only; other
//! crates (HTTP stack, runtime) stay at `warn` unless `RUST_LOG` says
//! otherwise.

use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::domain::{ReconcileError, Result};

/// Targets that receive the configured level.
const OWN_TARGETS: [&str; 2] = ["aap_api", "aap_reconcile_core"];

/// Line format of emitted events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-field human-readable lines.
    #[default]
    Full,
    /// One short line per event.
    Compact,
    /// Newline-delimited JSON, for log shippers.
    Json,
}

impl FromStr for LogFormat {
    type Err = ReconcileError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "full" | "text" => Ok(LogFormat::Full),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(ReconcileError::validation(
                "AAP_LOG_FORMAT",
                format!("unknown format {other:?}, expected full, compact or json"),
            )),
        }
    }
}

/// Subscriber settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub format: LogFormat,
    /// Level for this workspace's crates when `RUST_LOG` is unset.
    pub level: Level,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::Full,
            level: Level::INFO,
        }
    }
}

impl LogSettings {
    /// Read `AAP_LOG_FORMAT` and `AAP_LOG_LEVEL`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings from an arbitrary variable source; unset keys keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        if let Some(raw) = lookup("AAP_LOG_FORMAT").filter(|v| !v.trim().is_empty()) {
            settings.format = raw.parse()?;
        }
        if let Some(raw) = lookup("AAP_LOG_LEVEL").filter(|v| !v.trim().is_empty()) {
            settings.level = raw.trim().parse().map_err(|_| {
                ReconcileError::validation("AAP_LOG_LEVEL", format!("unknown level {raw:?}"))
            })?;
        }
        Ok(settings)
    }

    /// Filter directives used when `RUST_LOG` is unset.
    pub fn directives(&self) -> String {
        let level = self.level.as_str().to_ascii_lowercase();
        let mut directives = vec!["warn".to_string()];
        directives.extend(OWN_TARGETS.iter().map(|target| format!("{target}={level}")));
        directives.join(",")
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.directives()))
    }
}

/// Install the global subscriber.
///
/// Returns `false` when a global subscriber was already set, in which case
/// nothing changes.
pub fn init_tracing(settings: &LogSettings) -> bool {
    let registry = tracing_subscriber::registry().with(settings.filter());
    let layer = fmt::layer().with_writer(std::io::stderr);

    let installed = match settings.format {
        LogFormat::Full => registry.with(layer).try_init(),
        LogFormat::Compact => registry.with(layer.compact()).try_init(),
        LogFormat::Json => registry.with(layer.json()).try_init(),
    };
    installed.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_settings_default_when_unset() {
        let settings = LogSettings::from_lookup(env(&[])).unwrap();
        assert_eq!(settings, LogSettings::default());
    }

    #[test]
    fn test_settings_from_variables() {
        let settings = LogSettings::from_lookup(env(&[
            ("AAP_LOG_FORMAT", " JSON "),
            ("AAP_LOG_LEVEL", "debug"),
        ]))
        .unwrap();
        assert_eq!(settings.format, LogFormat::Json);
        assert_eq!(settings.level, Level::DEBUG);
    }

    #[test]
    fn test_settings_reject_unknown_values() {
        let err = LogSettings::from_lookup(env(&[("AAP_LOG_FORMAT", "xml")])).unwrap_err();
        assert!(
            matches!(err, ReconcileError::Validation { ref attribute, .. } if attribute == "AAP_LOG_FORMAT")
        );

        let err = LogSettings::from_lookup(env(&[("AAP_LOG_LEVEL", "loud")])).unwrap_err();
        assert!(
            matches!(err, ReconcileError::Validation { ref attribute, .. } if attribute == "AAP_LOG_LEVEL")
        );
    }

    #[test]
    fn test_directives_scope_level_to_own_crates() {
        let settings = LogSettings {
            format: LogFormat::Compact,
            level: Level::TRACE,
        };
        assert_eq!(
            settings.directives(),
            "warn,aap_api=trace,aap_reconcile_core=trace"
        );
    }

    #[test]
    fn test_second_init_is_a_no_op() {
        init_tracing(&LogSettings::default());
        let settings = LogSettings {
            format: LogFormat::Json,
            level: Level::DEBUG,
        };
        assert!(!init_tracing(&settings));
    }
}
