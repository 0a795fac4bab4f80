//! CLI error handling with user-friendly messages.

use std::fmt;
use std::process;

/// CLI-specific errors with user-facing messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    Logging(String),
    /// Configuration error (bad file or bad flag combination)
    Config(String),
    /// Scan failed before any per-source work started
    Scan(String),
    /// Shard construction or span computation failed
    Subset(String),
    /// Bounds argument could not be parsed
    InvalidBounds(String),
}

impl CliError {
    /// Exit the process with an error message and a non-zero code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::InvalidBounds(_) = self {
            eprintln!();
            eprintln!("Bounds are six comma-separated numbers:");
            eprintln!("  --bounds 0,0,0,100,100,100");
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Logging(msg) => write!(f, "failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "configuration error: {}", msg),
            CliError::Scan(msg) => write!(f, "scan failed: {}", msg),
            CliError::Subset(msg) => write!(f, "subset error: {}", msg),
            CliError::InvalidBounds(raw) => write!(f, "invalid bounds '{}'", raw),
        }
    }
}

impl std::error::Error for CliError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = CliError::Config("missing input".to_string());
        assert_eq!(err.to_string(), "configuration error: missing input");

        let err = CliError::InvalidBounds("1,2".to_string());
        assert_eq!(err.to_string(), "invalid bounds '1,2'");
    }
}
