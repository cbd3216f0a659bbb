//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use marketlens::config::ConfigFileError;
use marketlens::market::MarketError;
use marketlens::store::StoreError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Bad command-line input
    InvalidArgument(String),
    /// Fixture could not be loaded
    Fixture(StoreError),
    /// Failed to start the async runtime
    Runtime(std::io::Error),
    /// Market resolution failed
    Resolve(MarketError),
    /// Failed to render output
    Output(String),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Resolve(e) if e.is_validation() => {
                eprintln!();
                eprintln!("Check --lat, --lon and --radius.");
                eprintln!("The largest accepted radius is set by [market] max_radius_miles.");
            }
            CliError::Fixture(_) => {
                eprintln!();
                eprintln!("A fixture is a JSON object with optional keys:");
                eprintln!("  organizations: [{{ id, name, type, coordinate: {{ latitude, longitude }} }}]");
                eprintln!("  identifiers:   {{ <organization id>: [<identifier>, ...] }}");
                eprintln!("  tags:          [{{ scope: {{ kind, id }}, entity_id, tag }}]");
            }
            _ => {}
        }

        // Validation problems are usage errors
        let code = match self {
            CliError::InvalidArgument(_) => 2,
            CliError::Resolve(e) if e.is_validation() => 2,
            _ => 1,
        };
        process::exit(code)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::Fixture(e) => write!(f, "Failed to load fixture: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to start runtime: {}", e),
            CliError::Resolve(e) => write!(f, "Failed to resolve market: {}", e),
            CliError::Output(msg) => write!(f, "Failed to write output: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Fixture(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::Resolve(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<MarketError> for CliError {
    fn from(e: MarketError) -> Self {
        CliError::Resolve(e)
    }
}
