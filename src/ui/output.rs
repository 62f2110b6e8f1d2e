//! ui::output
//!
//! Terminal output for the `xmldb` binary.
//!
//! Command results go to stdout; notices and errors go to stderr. Quiet
//! mode silences everything except results and errors, so scripts can
//! rely on stdout holding only what they asked for.

use std::fmt::Display;

use serde_json::Value;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Results and errors only
    Quiet,
    /// Results plus short confirmations
    Normal,
    /// Normal output plus debug notes
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags; `--quiet` wins over `--debug`.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a command result (always shown).
pub fn result(text: impl Display) {
    print!("{}", text);
}

/// Print a JSON value (always shown).
pub fn json(value: &Value) {
    println!("{}", format_json(value));
}

/// Print a debug note (only in debug mode).
pub fn debug(message: impl Display, verbosity: Verbosity) {
    if verbosity == Verbosity::Debug {
        eprintln!("[debug] {}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a confirmation (respects quiet mode).
pub fn success(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Pretty JSON text; falls back to compact form.
pub fn format_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn quiet_wins() {
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Debug);
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
    }

    #[test]
    fn json_is_pretty() {
        let text = format_json(&json!({"system": {"hostname": "r1"}}));
        assert!(text.contains("\n"));
        assert!(text.contains("\"hostname\": \"r1\""));
    }
}
