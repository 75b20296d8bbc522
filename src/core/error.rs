//! Error handling for texen
//!
//! Two types carry every failure a run can surface:
//! - [`TexenError`] - what went wrong, for code that needs to match on it
//! - [`ErrorContext`] - the same failure dressed for a terminal, with details
//!   and a suggestion
//!
//! # Error Categories
//!
//! - **Configuration**: [`TexenError::MissingTemplatePath`],
//!   [`TexenError::MissingControlTemplate`], [`TexenError::MissingOutputDirectory`],
//!   [`TexenError::MissingOutputFile`], [`TexenError::InvalidContextProperty`],
//!   [`TexenError::ConfigParse`]
//! - **Generation**: [`TexenError::GenerationFailed`], classified by
//!   [`FailureKind`]
//! - **File system**: [`TexenError::Io`]
//!
//! Property loading and context object instantiation never produce errors
//! here; they are logged and skipped where they happen.
//!
//! # Examples
//!
//! ```rust,no_run
//! use texen::core::{TexenError, user_friendly_error};
//!
//! fn check() -> Result<(), TexenError> {
//!     Err(TexenError::MissingOutputFile)
//! }
//!
//! if let Err(e) = check() {
//!     let ctx = user_friendly_error(anyhow::Error::from(e));
//!     ctx.display();
//! }
//! ```

use colored::Colorize;
use std::fmt;
use std::io;
use thiserror::Error;

use crate::encoding::UnsupportedEncoding;
use crate::engine::EngineError;

/// Appended to every generation failure message.
pub const FAILURE_HINT: &str = ". For more information consult the log, or run with --verbose.";

/// What kind of template failure stopped a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The template text could not be parsed.
    Syntax,
    /// A template or resource could not be found.
    ResourceNotFound,
    /// A context object method called from a template failed.
    MethodInvocation { reference: String, method: String },
    Other,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax => f.write_str("syntax error"),
            Self::ResourceNotFound => f.write_str("resource not found"),
            Self::MethodInvocation {
                reference,
                method,
            } => write!(f, "method invocation '{reference}.{method}'"),
            Self::Other => f.write_str("generation error"),
        }
    }
}

#[derive(Debug, Error)]
pub enum TexenError {
    /// No template path and the resource locator fallback is off.
    #[error("Template path is not set")]
    MissingTemplatePath,

    #[error("Control template is not set")]
    MissingControlTemplate,

    #[error("Output directory is not set")]
    MissingOutputDirectory,

    #[error("Output file is not set")]
    MissingOutputFile,

    /// A context property could not be turned into a context binding.
    #[error("Invalid context property '{key}': {reason}")]
    InvalidContextProperty { key: String, reason: String },

    #[error("Invalid task configuration in {path}: {reason}")]
    ConfigParse { path: String, reason: String },

    #[error(transparent)]
    Encoding(#[from] UnsupportedEncoding),

    /// File system failure outside template rendering.
    #[error("Failed to {operation}: {path}")]
    Io {
        operation: String,
        path: String,
        #[source]
        source: io::Error,
    },

    /// Rendering the control template, or a template it called, failed.
    #[error("{message}{}", FAILURE_HINT)]
    GenerationFailed {
        kind: FailureKind,
        message: String,
        #[source]
        source: EngineError,
    },
}

impl TexenError {
    /// Wrap an engine error, classifying it.
    #[must_use]
    pub fn generation_failed(source: EngineError) -> Self {
        let kind = match &source {
            EngineError::Syntax { .. } => FailureKind::Syntax,
            EngineError::NotFound { .. } => FailureKind::ResourceNotFound,
            EngineError::MethodInvocation {
                reference,
                method,
                ..
            } => FailureKind::MethodInvocation {
                reference: reference.clone(),
                method: method.clone(),
            },
            EngineError::Render { .. }
            | EngineError::Io { .. }
            | EngineError::Encoding(_) => FailureKind::Other,
        };

        let message = match &source {
            EngineError::MethodInvocation {
                source: cause,
                ..
            } => format!("Generation failed: {source}: {cause}"),
            _ => format!("Generation failed: {source}"),
        };

        Self::GenerationFailed {
            kind,
            message,
            source,
        }
    }

    /// The failure kind, for generation failures.
    pub fn failure_kind(&self) -> Option<&FailureKind> {
        match self {
            Self::GenerationFailed {
                kind,
                ..
            } => Some(kind),
            _ => None,
        }
    }

    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::MissingTemplatePath
                | Self::MissingControlTemplate
                | Self::MissingOutputDirectory
                | Self::MissingOutputFile
                | Self::InvalidContextProperty { .. }
                | Self::ConfigParse { .. }
        )
    }
}

impl From<EngineError> for TexenError {
    fn from(source: EngineError) -> Self {
        Self::generation_failed(source)
    }
}

/// An error prepared for display, with optional details and suggestion.
#[derive(Debug)]
pub struct ErrorContext {
    pub message: String,
    pub suggestion: Option<String>,
    pub details: Option<String>,
}

impl ErrorContext {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            details: None,
        }
    }

    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print to stderr: error in red, details in yellow, suggestion in green.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.message);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] for the terminal.
///
/// The first [`TexenError`] found in the chain decides the suggestion; plain
/// I/O errors and anything else get a generic one.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let mut current: &dyn std::error::Error = error.as_ref();
    loop {
        if let Some(texen_error) = current.downcast_ref::<TexenError>() {
            return create_error_context(texen_error);
        }
        if let Some(engine_error) = current.downcast_ref::<EngineError>() {
            return create_error_context(&TexenError::generation_failed(clone_engine_error(
                engine_error,
            )));
        }

        match current.source() {
            Some(source) => current = source,
            None => break,
        }
    }

    if let Some(io_error) = error.downcast_ref::<io::Error>() {
        let suggestion = match io_error.kind() {
            io::ErrorKind::PermissionDenied => {
                "Check file permissions and try running with appropriate privileges"
            }
            io::ErrorKind::NotFound => "Check that the path exists",
            _ => "Check file permissions and disk space",
        };
        return ErrorContext::new(error.to_string())
            .with_suggestion(suggestion)
            .with_details(format!("IO error: {io_error}"));
    }

    ErrorContext::new(format!("{error:#}"))
        .with_suggestion("Run with --verbose for more details")
}

/// Build the display form of a [`TexenError`].
pub fn create_error_context(error: &TexenError) -> ErrorContext {
    let context = ErrorContext::new(error.to_string());
    match error {
        TexenError::MissingTemplatePath => context
            .with_suggestion("Set 'template_path' in the task file, pass --template-path, or enable --use-resource-locator")
            .with_details("Templates are searched in the template path directories"),
        TexenError::MissingControlTemplate => context
            .with_suggestion("Set 'control_template' in the task file or pass --control-template"),
        TexenError::MissingOutputDirectory => context
            .with_suggestion("Set 'output_directory' in the task file or pass --output-directory"),
        TexenError::MissingOutputFile => context
            .with_suggestion("Set 'output_file' in the task file or pass --output-file")
            .with_details("The control template output is written to output_directory/output_file"),
        TexenError::InvalidContextProperty {
            key,
            ..
        } => context
            .with_suggestion(format!("Rename '{key}' so a name precedes '.file.contents', e.g. 'license.file.contents'")),
        TexenError::ConfigParse {
            path,
            ..
        } => context
            .with_suggestion(format!("Check the TOML syntax and field names in {path}")),
        TexenError::Encoding(_) => context
            .with_suggestion("Use UTF-8 or ISO-8859-1, or leave the encoding unset"),
        TexenError::Io {
            source,
            ..
        } => {
            let suggestion = if source.kind() == io::ErrorKind::PermissionDenied {
                "Check file permissions and try running with appropriate privileges"
            } else {
                "Check that the path exists and you have the necessary permissions"
            };
            context.with_suggestion(suggestion).with_details(source.to_string())
        }
        TexenError::GenerationFailed {
            kind,
            source,
            ..
        } => {
            let suggestion = match kind {
                FailureKind::Syntax => "Check the template syntax near the reported position".to_string(),
                FailureKind::ResourceNotFound => {
                    "Check the template name and the template path".to_string()
                }
                FailureKind::MethodInvocation {
                    reference,
                    method,
                } => format!("Check the arguments passed to {reference}(method=\"{method}\")"),
                FailureKind::Other => "Make sure every variable the template uses is defined".to_string(),
            };
            context.with_suggestion(suggestion).with_details(format!("{kind}: {source}"))
        }
    }
}

fn clone_engine_error(error: &EngineError) -> EngineError {
    match error {
        EngineError::Syntax {
            template,
            message,
        } => EngineError::Syntax {
            template: template.clone(),
            message: message.clone(),
        },
        EngineError::NotFound {
            name,
            searched,
        } => EngineError::NotFound {
            name: name.clone(),
            searched: searched.clone(),
        },
        EngineError::MethodInvocation {
            reference,
            method,
            source,
        } => EngineError::MethodInvocation {
            reference: reference.clone(),
            method: method.clone(),
            source: source.clone(),
        },
        EngineError::Render {
            template,
            message,
        } => EngineError::Render {
            template: template.clone(),
            message: message.clone(),
        },
        EngineError::Io {
            target,
            source,
        } => EngineError::Io {
            target: target.clone(),
            source: io::Error::new(source.kind(), source.to_string()),
        },
        EngineError::Encoding(err) => EngineError::Encoding(err.clone()),
    }
}
