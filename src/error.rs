//! Error types for per-file generation failures.
//!
//! Failures are classified with an explicit [`ErrorKind`] at the point of
//! detection, and each kind maps to fixed troubleshooting text. A failure in
//! one file never aborts the run; the driver formats it with
//! [`GenerateError::detailed_context`] and reports it through the response
//! `error` field while the remaining files continue.

use std::fmt;

use thiserror::Error;

/// Classifies a generation failure at its point of detection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The descriptor is malformed or incomplete, e.g. a nameless service.
    InvalidDescriptor,
    /// A referenced proto element is absent from the request where one is
    /// required.
    MissingReference,
    /// A value in the request is invalid, e.g. a file without a name.
    InvalidValue,
    /// Reading or writing the plugin streams failed. Driver only.
    Io,
}

impl ErrorKind {
    /// Fixed troubleshooting lines for the kind, included in reported
    /// contexts and the driver's fatal diagnostics.
    pub fn troubleshooting(&self) -> &'static [&'static str] {
        match self {
            ErrorKind::InvalidDescriptor => &[
                "Troubleshooting: the compiled descriptor is malformed or incomplete.",
                "Try: regenerate the request with a current protoc release.",
            ],
            ErrorKind::MissingReference => &[
                "Troubleshooting: a referenced proto element was not found in the request.",
                "Try: pass every imported .proto file to protoc alongside the generated one.",
            ],
            ErrorKind::InvalidValue => &[
                "Troubleshooting: the request carried an invalid value.",
                "Try: check the plugin parameters and the proto file for typos.",
            ],
            ErrorKind::Io => &[
                "Troubleshooting: reading or writing the plugin streams failed.",
                "Try: run the plugin through protoc rather than invoking it directly.",
            ],
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidDescriptor => "InvalidDescriptor",
            ErrorKind::MissingReference => "MissingReference",
            ErrorKind::InvalidValue => "InvalidValue",
            ErrorKind::Io => "Io",
        };
        f.write_str(name)
    }
}

/// How much context a reported per-file error carries.
///
/// Selected with the `error_format` plugin parameter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ErrorFormat {
    #[default]
    Standard,
    Simple,
    Detailed,
}

impl ErrorFormat {
    /// Parses an `error_format` parameter value; unrecognized values fall
    /// back to `Standard`.
    pub fn from_param(value: &str) -> ErrorFormat {
        match value.to_ascii_lowercase().as_str() {
            "simple" => ErrorFormat::Simple,
            "detailed" => ErrorFormat::Detailed,
            _ => ErrorFormat::Standard,
        }
    }
}

/// An error raised while generating output for a single file.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct GenerateError {
    pub kind: ErrorKind,
    pub message: String,
}

impl GenerateError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> GenerateError {
        GenerateError {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_descriptor(message: impl Into<String>) -> GenerateError {
        GenerateError::new(ErrorKind::InvalidDescriptor, message)
    }

    pub fn invalid_value(message: impl Into<String>) -> GenerateError {
        GenerateError::new(ErrorKind::InvalidValue, message)
    }

    pub fn missing_reference(message: impl Into<String>) -> GenerateError {
        GenerateError::new(ErrorKind::MissingReference, message)
    }

    /// Formats the error with per-kind troubleshooting context for the
    /// response `error` field.
    pub fn detailed_context(&self, proto_file: &str, format: ErrorFormat, debug: bool) -> String {
        if format == ErrorFormat::Simple {
            return format!(
                "File processing failed: {}: {}: {}",
                proto_file, self.kind, self.message
            );
        }

        let mut lines = vec![
            format!("File processing failed: {}", proto_file),
            format!("Error kind: {}", self.kind),
            format!("Error message: {}", self.message),
        ];
        for line in self.kind.troubleshooting() {
            lines.push((*line).to_string());
        }
        if format == ErrorFormat::Detailed {
            lines.push(String::new());
            lines.push("Debug suggestions:".to_string());
            lines.push("1. Enable debug output: pass debug=verbose in the plugin parameters".to_string());
            lines.push("2. Inspect the compiled descriptor: protoc --decode_raw < request.bin".to_string());
            lines.push("3. Verify the plugin binary is on PATH as protoc-gen-py-mcp".to_string());
        }
        if debug {
            lines.push(String::new());
            lines.push(format!("Debug detail: {:?}", self));
        }
        lines.join("\n")
    }
}
