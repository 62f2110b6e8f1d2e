//! logging
//!
//! One-time setup of the `tracing` subscriber.
//!
//! Library code only emits events; the binary picks a [`Profile`] and calls
//! [`init`] once before doing anything else. Events go to stderr so they
//! never mix with command output. `RUST_LOG` overrides the profile's
//! default filter.

use std::sync::Once;

use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

use crate::core::config::schema::LogFormat;

/// Logging profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Human-readable, warnings and errors only
    Standard,
    /// Human-readable with debug level
    Development,
    /// JSON structured output with info level
    Production,
    /// No output; tests install their own subscriber if they need one
    Test,
}

impl Profile {
    /// Pick a profile from the `--debug` flag and the configured format.
    pub fn select(debug: bool, format: LogFormat) -> Self {
        match (debug, format) {
            (true, LogFormat::Pretty) => Profile::Development,
            (_, LogFormat::Json) => Profile::Production,
            (false, LogFormat::Pretty) => Profile::Standard,
        }
    }

    /// Filter used when `RUST_LOG` is not set.
    pub fn default_filter(self) -> &'static str {
        match self {
            Profile::Standard => "xmldb=warn",
            Profile::Development => "xmldb=debug",
            Profile::Production => "xmldb=info",
            Profile::Test => "off",
        }
    }
}

static INIT_ONCE: Once = Once::new();

fn filter(profile: Profile) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(profile.default_filter()))
}

/// Install the global subscriber for `profile`.
///
/// Only the first call has any effect.
///
/// # Example
///
/// ```
/// use xmldb::logging::{init, Profile};
///
/// init(Profile::Test);
/// ```
pub fn init(profile: Profile) {
    INIT_ONCE.call_once(|| {
        // A subscriber installed elsewhere wins; that is not an error here.
        match profile {
            Profile::Standard | Profile::Development => {
                let _ = tracing_subscriber::fmt()
                    .with_writer(std::io::stderr)
                    .with_env_filter(filter(profile))
                    .try_init();
            }
            Profile::Production => {
                let _ = tracing_subscriber::fmt()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_env_filter(filter(profile))
                    .try_init();
            }
            Profile::Test => {
                let _ = tracing_subscriber::registry().try_init();
            }
        }
    });
}
