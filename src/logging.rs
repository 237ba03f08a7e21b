//! Process-wide tracing subscriber.
//!
//! The optimizer logs search-mode decisions under `spgraph::optimizer` and
//! procedure lifecycle transitions under `spgraph::procedure`.

use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{Error, Result};

/// Directive used when neither an explicit filter nor `RUST_LOG` is given:
/// crate events at `info`, per-arrangement tracing off.
pub const DEFAULT_DIRECTIVE: &str = "spgraph=info";

/// Builds the filter [`init_logging`] would install.
///
/// An explicit `directive` must parse. Without one, `RUST_LOG` is consulted
/// and [`DEFAULT_DIRECTIVE`] is the fallback.
pub fn log_filter(directive: Option<&str>) -> Result<EnvFilter> {
    match directive {
        Some(directive) => EnvFilter::try_new(directive)
            .map_err(|e| Error::Logging(format!("invalid log directive '{directive}': {e}"))),
        None => Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))),
    }
}

/// Installs a formatting subscriber filtered by [`log_filter`].
pub fn init_logging(directive: Option<&str>) -> Result<()> {
    fmt()
        .with_env_filter(log_filter(directive)?)
        .with_target(true)
        .try_init()
        .map_err(|_| Error::Logging("a global subscriber is already installed".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_directive_must_parse() {
        let err = log_filter(Some("spgraph=notalevel")).unwrap_err();
        assert_eq!(err.code(), "Logging");
        assert!(err.to_string().contains("spgraph=notalevel"));
        let filter = log_filter(Some("spgraph::optimizer=trace")).unwrap();
        assert!(filter.to_string().contains("spgraph::optimizer=trace"));
    }

    #[test]
    fn default_directive_parses() {
        assert!(EnvFilter::try_new(DEFAULT_DIRECTIVE).is_ok());
        assert!(log_filter(None).is_ok());
    }

    #[test]
    fn bad_directive_installs_nothing() {
        assert!(init_logging(Some("spgraph=bogus")).is_err());
    }
}
