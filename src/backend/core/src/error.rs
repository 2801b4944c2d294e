//! Error handling for the workspace access engine.
//!
//! This module provides:
//! - A central error type with a stable, machine-readable error code
//! - User-facing vs internal messages
//! - Severity levels that drive log levels
//! - Error metrics through the `metrics` facade
//! - Conversions from the component-level errors and common library errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use wsaccess_core::error::{AccessError, ErrorContext, Result};
//!
//! fn load(path: &str) -> Result<String> {
//!     std::fs::read_to_string(path).context("Failed to read workspace export")
//! }
//! ```

use metrics::counter;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::{error, warn};

use crate::workspace::{HierarchyError, PermissionParseError, ResolveError};

// ═══════════════════════════════════════════════════════════════════════════════
// Result Type Alias
// ═══════════════════════════════════════════════════════════════════════════════

/// A specialized Result type for workspace access operations.
pub type Result<T> = std::result::Result<T, AccessError>;

// ═══════════════════════════════════════════════════════════════════════════════
// Error Codes
// ═══════════════════════════════════════════════════════════════════════════════

/// Machine-readable error codes.
///
/// These codes are stable and can be used by callers for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Hierarchy Errors (1000-1099)
    OrphanedWorkspace,
    HierarchyCycle,
    MultipleRoots,
    NoRootWorkspace,
    DuplicateWorkspace,

    // Resolution Errors (1100-1199)
    WorkspaceNotFound,
    InvalidPermission,

    // Serialization Errors (2200-2299)
    SerializationError,
    DeserializationError,
    InvalidJson,

    // Fetch Errors (3000-3099)
    FetchFailed,
    FetchTimeout,
    SourceUnavailable,

    // Input Errors (4100-4199)
    InvalidInput,
    InputNotFound,

    // Configuration Errors (5000-5099)
    ConfigurationError,
    MissingConfiguration,
    InvalidConfiguration,

    // Internal Errors (9000-9099)
    InternalError,
    UnknownError,
}

impl ErrorCode {
    /// Get the numeric code for this error.
    pub const fn numeric_code(&self) -> u32 {
        match self {
            Self::OrphanedWorkspace => 1000,
            Self::HierarchyCycle => 1001,
            Self::MultipleRoots => 1002,
            Self::NoRootWorkspace => 1003,
            Self::DuplicateWorkspace => 1004,

            Self::WorkspaceNotFound => 1100,
            Self::InvalidPermission => 1101,

            Self::SerializationError => 2200,
            Self::DeserializationError => 2201,
            Self::InvalidJson => 2202,

            Self::FetchFailed => 3000,
            Self::FetchTimeout => 3001,
            Self::SourceUnavailable => 3002,

            Self::InvalidInput => 4100,
            Self::InputNotFound => 4101,

            Self::ConfigurationError => 5000,
            Self::MissingConfiguration => 5001,
            Self::InvalidConfiguration => 5002,

            Self::InternalError => 9000,
            Self::UnknownError => 9099,
        }
    }

    /// Check if the failed operation may succeed when retried.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::FetchFailed | Self::FetchTimeout | Self::SourceUnavailable
        )
    }

    /// Whether this code describes a malformed hierarchy.
    pub const fn is_hierarchy(&self) -> bool {
        matches!(self.numeric_code(), 1000..=1099)
    }

    /// Get the error category for grouping.
    pub const fn category(&self) -> &'static str {
        match self.numeric_code() {
            1000..=1099 => "hierarchy",
            1100..=1199 => "resolution",
            2200..=2299 => "serialization",
            3000..=3099 => "fetch",
            4100..=4199 => "input",
            5000..=5099 => "configuration",
            9000..=9099 => "internal",
            _ => "unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Severity
// ═══════════════════════════════════════════════════════════════════════════════

/// Severity level for errors (affects logging).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Bad input from the caller
    Low,
    /// Transient collaborator failures
    Medium,
    /// Data the engine cannot work with
    High,
    /// Bugs and unexpected states
    Critical,
}

impl ErrorSeverity {
    pub const fn from_code(code: &ErrorCode) -> Self {
        match code {
            ErrorCode::WorkspaceNotFound
            | ErrorCode::InvalidPermission
            | ErrorCode::InvalidInput
            | ErrorCode::InputNotFound => Self::Low,

            ErrorCode::FetchFailed | ErrorCode::FetchTimeout | ErrorCode::SourceUnavailable => {
                Self::Medium
            }

            ErrorCode::OrphanedWorkspace
            | ErrorCode::HierarchyCycle
            | ErrorCode::MultipleRoots
            | ErrorCode::NoRootWorkspace
            | ErrorCode::DuplicateWorkspace
            | ErrorCode::SerializationError
            | ErrorCode::DeserializationError
            | ErrorCode::InvalidJson
            | ErrorCode::ConfigurationError
            | ErrorCode::MissingConfiguration
            | ErrorCode::InvalidConfiguration => Self::High,

            ErrorCode::InternalError | ErrorCode::UnknownError => Self::Critical,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Details
// ═══════════════════════════════════════════════════════════════════════════════

/// Additional structured details about an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Additional context key-value pairs
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,

    /// Related entity ID (workspace, role, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,

    /// Related entity type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,

    /// Suggested action for resolution
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

impl ErrorDetails {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(mut self, entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggested_action = Some(suggestion.into());
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Main Error Type
// ═══════════════════════════════════════════════════════════════════════════════

/// The main error type for the workspace access engine.
#[derive(Error, Debug)]
pub struct AccessError {
    /// Machine-readable error code
    code: ErrorCode,

    /// User-friendly error message
    user_message: Cow<'static, str>,

    /// Detailed internal message (for logging only)
    internal_message: Option<String>,

    /// Additional structured details
    details: ErrorDetails,

    /// The source error that caused this error
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.user_message)?;
        if let Some(ref internal) = self.internal_message {
            write!(f, " (internal: {})", internal)?;
        }
        Ok(())
    }
}

impl AccessError {
    // ─────────────────────────────────────────────────────────────────────────
    // Constructors
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a new error with code and user message.
    pub fn new(code: ErrorCode, user_message: impl Into<Cow<'static, str>>) -> Self {
        let error = Self {
            code,
            user_message: user_message.into(),
            internal_message: None,
            details: ErrorDetails::default(),
            source: None,
        };
        error.record_metrics();
        error
    }

    /// Create an error with both user and internal messages.
    pub fn with_internal(
        code: ErrorCode,
        user_message: impl Into<Cow<'static, str>>,
        internal_message: impl Into<String>,
    ) -> Self {
        let mut error = Self::new(code, user_message);
        error.internal_message = Some(internal_message.into());
        error
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_internal(ErrorCode::InternalError, "An internal error occurred", message)
    }

    pub fn invalid_input(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn workspace_not_found(id: impl Into<String>) -> Self {
        let id = id.into();
        Self::new(ErrorCode::WorkspaceNotFound, format!("Workspace not found: {}", id))
            .with_details(ErrorDetails::new().with_entity("workspace", id))
    }

    /// A collaborator failed to deliver data.
    pub fn fetch_failed(collaborator: &'static str, message: impl Into<String>) -> Self {
        Self::with_internal(
            ErrorCode::FetchFailed,
            format!("Failed to fetch {}", collaborator),
            message,
        )
        .with_context("collaborator", collaborator)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Builder Methods
    // ─────────────────────────────────────────────────────────────────────────

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn with_details(mut self, details: ErrorDetails) -> Self {
        self.details = details;
        self
    }

    pub fn with_internal_message(mut self, message: impl Into<String>) -> Self {
        self.internal_message = Some(message.into());
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.details.context.insert(key.into(), v);
        }
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    pub fn internal_message(&self) -> Option<&str> {
        self.internal_message.as_deref()
    }

    pub fn details(&self) -> &ErrorDetails {
        &self.details
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    pub fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::from_code(&self.code)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Logging
    // ─────────────────────────────────────────────────────────────────────────

    /// Log this error with appropriate severity.
    pub fn log(&self) {
        let code = self.code.to_string();
        let category = self.code.category();

        match self.severity() {
            ErrorSeverity::Critical => {
                error!(
                    error_code = %code,
                    category = category,
                    user_message = %self.user_message,
                    internal_message = ?self.internal_message,
                    details = ?self.details,
                    source = ?self.source,
                    "CRITICAL ERROR"
                );
            }
            ErrorSeverity::High => {
                error!(
                    error_code = %code,
                    category = category,
                    user_message = %self.user_message,
                    internal_message = ?self.internal_message,
                    "High severity error"
                );
            }
            ErrorSeverity::Medium => {
                warn!(
                    error_code = %code,
                    category = category,
                    user_message = %self.user_message,
                    "Medium severity error"
                );
            }
            ErrorSeverity::Low => {
                tracing::debug!(
                    error_code = %code,
                    category = category,
                    user_message = %self.user_message,
                    "Low severity error"
                );
            }
        }
    }

    fn record_metrics(&self) {
        counter!(
            "wsaccess_errors_total",
            "code" => self.code.to_string(),
            "category" => self.code.category().to_string(),
            "severity" => format!("{:?}", self.severity()),
        )
        .increment(1);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Context Extension Trait
// ═══════════════════════════════════════════════════════════════════════════════

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Add context to an error.
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with error code.
    fn with_error_code(self, code: ErrorCode) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| AccessError::internal(message.into()).with_source(e))
    }

    fn with_error_code(self, code: ErrorCode) -> Result<T> {
        self.map_err(|e| AccessError::new(code, e.to_string()).with_source(e))
    }
}

impl<T> ErrorContext<T> for Option<T> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.ok_or_else(|| AccessError::new(ErrorCode::WorkspaceNotFound, message.into()))
    }

    fn with_error_code(self, code: ErrorCode) -> Result<T> {
        self.ok_or_else(|| AccessError::new(code, "Resource not found"))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// From Implementations
// ═══════════════════════════════════════════════════════════════════════════════

impl From<HierarchyError> for AccessError {
    fn from(error: HierarchyError) -> Self {
        let (code, entity) = match &error {
            HierarchyError::DuplicateId { id } => (ErrorCode::DuplicateWorkspace, Some(id)),
            HierarchyError::OrphanedNode { id, .. } => (ErrorCode::OrphanedWorkspace, Some(id)),
            HierarchyError::CyclicHierarchy { id } => (ErrorCode::HierarchyCycle, Some(id)),
            HierarchyError::MultipleRoots { second, .. } => (ErrorCode::MultipleRoots, Some(second)),
            HierarchyError::NoRoot => (ErrorCode::NoRootWorkspace, None),
        };
        let mut details = ErrorDetails::new()
            .with_suggestion("Fix the workspace parent references and reload");
        if let Some(id) = entity {
            details = details.with_entity("workspace", id.as_str());
        }
        Self::new(code, error.to_string())
            .with_details(details)
            .with_source(error)
    }
}

impl From<ResolveError> for AccessError {
    fn from(error: ResolveError) -> Self {
        match &error {
            ResolveError::UnknownWorkspace(id) => {
                Self::workspace_not_found(id.as_str()).with_source(error)
            }
        }
    }
}

impl From<PermissionParseError> for AccessError {
    fn from(error: PermissionParseError) -> Self {
        Self::new(ErrorCode::InvalidPermission, error.to_string()).with_source(error)
    }
}

impl From<serde_json::Error> for AccessError {
    fn from(error: serde_json::Error) -> Self {
        let code = if error.is_syntax() || error.is_data() {
            ErrorCode::DeserializationError
        } else if error.is_eof() {
            ErrorCode::InvalidJson
        } else {
            ErrorCode::SerializationError
        };

        Self::with_internal(code, "Failed to process JSON data", error.to_string()).with_source(error)
    }
}

impl From<tokio::time::error::Elapsed> for AccessError {
    fn from(error: tokio::time::error::Elapsed) -> Self {
        Self::with_internal(ErrorCode::FetchTimeout, "Fetch timed out", error.to_string())
            .with_source(error)
    }
}

impl From<std::io::Error> for AccessError {
    fn from(error: std::io::Error) -> Self {
        use std::io::ErrorKind;

        let (code, user_msg) = match error.kind() {
            ErrorKind::NotFound => (ErrorCode::InputNotFound, "File not found"),
            ErrorKind::InvalidData | ErrorKind::InvalidInput => {
                (ErrorCode::InvalidInput, "Input could not be read")
            }
            _ => (ErrorCode::InternalError, "An I/O error occurred"),
        };

        Self::with_internal(code, user_msg, error.to_string()).with_source(error)
    }
}

impl From<anyhow::Error> for AccessError {
    fn from(error: anyhow::Error) -> Self {
        match error.downcast::<AccessError>() {
            Ok(access_error) => access_error,
            Err(error) => Self::with_internal(
                ErrorCode::InternalError,
                "An internal error occurred",
                error.to_string(),
            ),
        }
    }
}

impl From<config::ConfigError> for AccessError {
    fn from(error: config::ConfigError) -> Self {
        let (code, user_msg) = match &error {
            config::ConfigError::NotFound(_) => (
                ErrorCode::MissingConfiguration,
                "Required configuration not found",
            ),
            config::ConfigError::PathParse(_) | config::ConfigError::FileParse { .. } => (
                ErrorCode::InvalidConfiguration,
                "Configuration file is invalid",
            ),
            _ => (ErrorCode::ConfigurationError, "Configuration error occurred"),
        };

        Self::with_internal(code, user_msg, error.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::WorkspaceId;
    use std::error::Error as _;

    #[test]
    fn test_hierarchy_error_mapping() {
        let err: AccessError = HierarchyError::CyclicHierarchy {
            id: WorkspaceId::new("a"),
        }
        .into();
        assert_eq!(err.code(), ErrorCode::HierarchyCycle);
        assert!(err.code().is_hierarchy());
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert_eq!(err.details().entity_id.as_deref(), Some("a"));
        assert!(err.source().is_some());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_no_root_has_no_entity() {
        let err: AccessError = HierarchyError::NoRoot.into();
        assert_eq!(err.code(), ErrorCode::NoRootWorkspace);
        assert!(err.details().entity_id.is_none());
    }

    #[test]
    fn test_fetch_failure_is_retryable() {
        let err = AccessError::fetch_failed("workspaces", "connection reset");
        assert!(err.is_retryable());
        assert_eq!(err.code().category(), "fetch");
        assert_eq!(err.internal_message(), Some("connection reset"));
        assert_eq!(err.details().context["collaborator"], "workspaces");
    }

    #[test]
    fn test_display_includes_code() {
        let err = AccessError::workspace_not_found("ws-9");
        assert_eq!(err.to_string(), "[WorkspaceNotFound] Workspace not found: ws-9");
    }

    #[test]
    fn test_option_context() {
        let missing: Option<u8> = None;
        let err = missing.context("no such workspace").unwrap_err();
        assert_eq!(err.code(), ErrorCode::WorkspaceNotFound);
    }

    #[test]
    fn test_anyhow_roundtrip_keeps_code() {
        let original = AccessError::invalid_input("bad file");
        let wrapped = anyhow::Error::new(original);
        let back: AccessError = wrapped.into();
        assert_eq!(back.code(), ErrorCode::InvalidInput);
    }
}
