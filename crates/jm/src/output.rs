//! Structured output formatting for CLI commands.
//!
//! This module provides consistent JSON output formatting for both success
//! and error cases, ensuring machine-readable output that works well with
//! scripts and automation tools.

use chrono::Utc;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt::Display;
use std::io::{self, Write};

use crate::errors::ActionableError;
use crate::goto::GotoError;
use crate::tracker::TrackerError;

/// Version of the JSON output format
const OUTPUT_VERSION: &str = "0.1.0";

// ============================================================================
// Output Context for Quiet Mode
// ============================================================================

/// Context for controlling output verbosity
pub struct OutputContext {
    quiet: bool,
    json: bool,
}

impl OutputContext {
    /// Create a new output context
    pub fn new(quiet: bool, json: bool) -> Self {
        Self { quiet, json }
    }

    /// Print essential output (always shown unless --json)
    pub fn print_data(&self, msg: impl Display) -> io::Result<()> {
        if !self.json {
            writeln_safe(&format!("{}", msg))
        } else {
            Ok(())
        }
    }

    /// Print informational message (suppressed by --quiet or --json)
    pub fn print_info(&self, msg: impl Display) -> io::Result<()> {
        if !self.quiet && !self.json {
            writeln_safe(&format!("{}", msg))
        } else {
            Ok(())
        }
    }

    /// Print warning (suppressed by --quiet or --json)
    pub fn print_warning(&self, msg: impl Display) -> io::Result<()> {
        if !self.quiet && !self.json {
            writeln_safe_stderr(&format!("Warning: {}", msg))
        } else {
            Ok(())
        }
    }

    /// Print error (always shown to stderr)
    pub fn print_error(&self, msg: impl Display) -> io::Result<()> {
        writeln_safe_stderr(&format!("{}", msg))
    }

    /// Print a serializable value as a success envelope (only with --json)
    pub fn print_json<T: Serialize>(&self, data: T, command: &str) -> io::Result<()> {
        if !self.json {
            return Ok(());
        }
        let output = JsonOutput::success(data, command);
        let text = output.to_json_string().map_err(io::Error::other)?;
        writeln_safe(&text)
    }

    /// Check if JSON mode is enabled
    pub fn is_json(&self) -> bool {
        self.json
    }
}

/// Safe println that handles broken pipes gracefully
fn writeln_safe(msg: &str) -> io::Result<()> {
    match writeln!(io::stdout(), "{}", msg) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            // Piped into head and friends
            std::process::exit(0);
        }
        Err(e) => Err(e),
    }
}

fn writeln_safe_stderr(msg: &str) -> io::Result<()> {
    match writeln!(io::stderr(), "{}", msg.trim_end_matches('\n')) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            std::process::exit(0);
        }
        Err(e) => Err(e),
    }
}

// ============================================================================
// JSON Output Types
// ============================================================================

/// Wrapper for successful command output with metadata
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub metadata: Metadata,
}

impl<T: Serialize> JsonOutput<T> {
    /// Create a new successful output with the given data
    pub fn success(data: T, command: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            metadata: Metadata::new(command),
        }
    }

    /// Serialize to JSON string with pretty formatting
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Wrapper for error output with suggestions
#[derive(Debug, Serialize)]
pub struct JsonError {
    pub success: bool,
    pub error: ErrorDetail,
    pub metadata: Metadata,
}

impl JsonError {
    /// Create a new error output
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        command: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
                suggestions: Vec::new(),
            },
            metadata: Metadata::new(command),
        }
    }

    /// Add details to the error
    pub fn with_details(mut self, details: Value) -> Self {
        self.error.details = Some(details);
        self
    }

    /// Add a suggestion to the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.error.suggestions.push(suggestion.into());
        self
    }

    /// Add multiple suggestions to the error
    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.error.suggestions.extend(suggestions);
        self
    }

    /// Serialize to JSON string with pretty formatting
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Get the appropriate exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        ErrorCode::to_exit_code(&self.error.code)
    }
}

/// Error details including code, message, and suggestions
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Error code (e.g., "NO_TRANSITION_MAP", "BROKEN_STEP")
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional error details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// Suggested actions to resolve the error
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

// ============================================================================
// Exit Codes
// ============================================================================

/// Standardized exit codes for the jm CLI
///
/// These codes follow Unix conventions and provide consistent error reporting
/// for automation and scripting.
///
/// # Examples
///
/// ```rust
/// use jm::ExitCode;
///
/// assert_eq!(ExitCode::ValidationFailed.code(), 4);
/// assert_eq!(ExitCode::ExternalError.code(), 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Command succeeded (0)
    Success = 0,

    /// Generic error (1)
    GenericError = 1,

    /// Invalid arguments, usage or configuration error (2)
    InvalidArgument = 2,

    /// Issue not found (3)
    NotFound = 3,

    /// Goto could not complete - missing transition map or broken step (4)
    ValidationFailed = 4,

    /// Tracker refused the credentials (5)
    PermissionDenied = 5,

    /// Tracker unreachable or answered with an error (10)
    ExternalError = 10,
}

impl ExitCode {
    /// Convert exit code to i32 for `std::process::exit`
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Classify an error returned by a command.
    ///
    /// Typed errors are matched first; plain `anyhow` messages fall back to
    /// `GenericError`.
    pub fn from_error(error: &anyhow::Error) -> ExitCode {
        if let Some(goto) = error.downcast_ref::<GotoError>() {
            return goto.exit_code();
        }
        if let Some(tracker) = error.downcast_ref::<TrackerError>() {
            return ExitCode::from_tracker_error(tracker);
        }
        if error.downcast_ref::<ActionableError>().is_some() {
            return ExitCode::InvalidArgument;
        }
        if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
            return match io_error.kind() {
                io::ErrorKind::NotFound => ExitCode::NotFound,
                io::ErrorKind::PermissionDenied => ExitCode::PermissionDenied,
                _ => ExitCode::ExternalError,
            };
        }

        let error_msg = error.to_string().to_lowercase();
        if error_msg.contains("invalid") || error_msg.contains("no project configured") {
            ExitCode::InvalidArgument
        } else if error_msg.contains("failed to parse") {
            ExitCode::InvalidArgument
        } else {
            ExitCode::GenericError
        }
    }

    /// Exit code for a failed tracker call.
    pub fn from_tracker_error(error: &TrackerError) -> ExitCode {
        match error {
            TrackerError::Status { status: 404, .. } => ExitCode::NotFound,
            TrackerError::Status {
                status: 401 | 403, ..
            } => ExitCode::PermissionDenied,
            TrackerError::MissingSetting(_) => ExitCode::InvalidArgument,
            _ => ExitCode::ExternalError,
        }
    }
}

// ============================================================================
// Error Codes (String constants for JSON responses)
// ============================================================================

/// Standard error codes for jm operations (JSON format)
pub struct ErrorCode;

impl ErrorCode {
    pub const ISSUE_NOT_FOUND: &'static str = "ISSUE_NOT_FOUND";
    pub const NO_TRANSITION_MAP: &'static str = "NO_TRANSITION_MAP";
    pub const BROKEN_STEP: &'static str = "BROKEN_STEP";
    pub const MALFORMED_ISSUE: &'static str = "MALFORMED_ISSUE";
    pub const INVALID_ARGUMENT: &'static str = "INVALID_ARGUMENT";
    pub const PERMISSION_DENIED: &'static str = "PERMISSION_DENIED";
    pub const TRACKER_ERROR: &'static str = "TRACKER_ERROR";
    pub const GENERIC_ERROR: &'static str = "GENERIC_ERROR";
}

impl ErrorCode {
    /// Map error code string to exit code
    pub fn to_exit_code(code: &str) -> ExitCode {
        match code {
            Self::ISSUE_NOT_FOUND => ExitCode::NotFound,
            Self::NO_TRANSITION_MAP | Self::BROKEN_STEP => ExitCode::ValidationFailed,
            Self::INVALID_ARGUMENT => ExitCode::InvalidArgument,
            Self::PERMISSION_DENIED => ExitCode::PermissionDenied,
            Self::MALFORMED_ISSUE | Self::TRACKER_ERROR => ExitCode::ExternalError,
            _ => ExitCode::GenericError,
        }
    }

    /// String code for an exit code, used when only the exit code is known.
    pub fn for_exit_code(code: ExitCode) -> &'static str {
        match code {
            ExitCode::NotFound => Self::ISSUE_NOT_FOUND,
            ExitCode::InvalidArgument => Self::INVALID_ARGUMENT,
            ExitCode::PermissionDenied => Self::PERMISSION_DENIED,
            ExitCode::ExternalError => Self::TRACKER_ERROR,
            _ => Self::GENERIC_ERROR,
        }
    }
}

/// Helper to create common error responses
impl JsonError {
    /// JSON envelope for any error a command returned.
    pub fn from_error(error: &anyhow::Error, command: impl Into<String>) -> Self {
        if let Some(goto) = error.downcast_ref::<GotoError>() {
            return Self::from_goto_error(goto, command);
        }
        if let Some(actionable) = error.downcast_ref::<ActionableError>() {
            return Self::new(ErrorCode::INVALID_ARGUMENT, actionable.message(), command)
                .with_suggestions(actionable.remedies().to_vec());
        }
        let code = ExitCode::from_error(error);
        Self::new(
            ErrorCode::for_exit_code(code),
            format!("{:#}", error),
            command,
        )
    }

    /// JSON envelope for one failed goto key.
    pub fn from_goto_error(error: &GotoError, command: impl Into<String>) -> Self {
        let actionable = error.to_actionable();
        Self::new(error.code(), error.to_string(), command)
            .with_details(error.details())
            .with_suggestions(actionable.remedies().to_vec())
    }
}

/// Metadata included in all responses
#[derive(Debug, Serialize)]
pub struct Metadata {
    /// Timestamp when the response was generated
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: chrono::DateTime<Utc>,
    /// Version of the output format
    pub version: String,
    /// Command that generated this response
    pub command: String,
}

impl Metadata {
    fn new(command: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            version: OUTPUT_VERSION.to_string(),
            command: command.into(),
        }
    }
}

/// Serialize timestamp in ISO 8601 format
fn serialize_timestamp<S>(dt: &chrono::DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&dt.to_rfc3339())
}
