//! Subscriber installation for the netrecon binaries

use std::sync::Once;
use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

/// Logging profile configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Human-readable output for development
    Development,
    /// JSON structured output for production
    Production,
    /// Test capture mode for deterministic testing
    Test,
}

impl Profile {
    /// Parse from a configuration string; unknown values default to `Development`.
    pub fn parse(s: &str) -> Self {
        match s {
            "production" | "json" => Profile::Production,
            "test" => Profile::Test,
            _ => Profile::Development,
        }
    }

    /// Filter used when `RUST_LOG` is unset. Covers every workspace crate;
    /// dependency noise (rusqlite, reqwest) stays at warn.
    pub fn default_directives(self) -> &'static str {
        match self {
            Profile::Development => {
                "warn,netrecon=debug,netrecon_core=debug,netrecon_engine=debug,netrecon_store=debug"
            }
            Profile::Production => {
                "warn,netrecon=info,netrecon_core=info,netrecon_engine=info,netrecon_store=info"
            }
            Profile::Test => "off",
        }
    }

    fn filter(self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.default_directives()))
    }
}

static INIT_ONCE: Once = Once::new();

/// Install the global subscriber for `profile`
///
/// Only the first call takes effect. Logs go to stderr; stdout carries the
/// run report.
///
/// - **Development**: human-readable lines, debug for the workspace crates
/// - **Production**: one JSON object per event, info and above
/// - **Test**: no output; use [`init_test_capture`](super::init_test_capture)
///
/// ```
/// use netrecon_core::logging_facility::{init, Profile};
///
/// init(Profile::Development);
/// ```
pub fn init(profile: Profile) {
    INIT_ONCE.call_once(|| match profile {
        Profile::Development => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_env_filter(profile.filter())
                .init();
        }
        Profile::Production => {
            tracing_subscriber::fmt()
                .json()
                .with_writer(std::io::stderr)
                .with_env_filter(profile.filter())
                .init();
        }
        Profile::Test => {
            tracing_subscriber::registry().init();
        }
    });
}
