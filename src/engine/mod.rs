//! The seam between the generation pipeline and a template language.
//!
//! The pipeline never looks inside template text. It asks a
//! [`TemplateEngine`] for a named [`Template`] and renders that template
//! against a [`Context`]. [`TeraEngine`] is the shipped implementation.

mod tera;

pub use self::tera::TeraEngine;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::context::Context;
use crate::encoding::{Encoding, UnsupportedEncoding};
use crate::generator::TextWriter;
use crate::resources::ResourceLocator;

/// Where an engine looks for templates.
#[derive(Debug, Clone, Default)]
pub struct TemplateLocations {
    /// Directories searched in order.
    pub search_paths: Vec<PathBuf>,
    /// Consulted after every search path misses.
    pub resources: Option<ResourceLocator>,
}

impl TemplateLocations {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self {
            search_paths,
            resources: None,
        }
    }

    #[must_use]
    pub fn with_resources(mut self, locator: ResourceLocator) -> Self {
        self.resources = Some(locator);
        self
    }

    /// Human readable list of the places searched, for error messages.
    pub fn describe(&self) -> String {
        let mut places: Vec<String> =
            self.search_paths.iter().map(|path| path.display().to_string()).collect();
        if let Some(locator) = &self.resources {
            places.push(format!("resources under {}", locator.base_dir().display()));
        }
        if places.is_empty() {
            "no template locations configured".to_string()
        } else {
            places.join(", ")
        }
    }
}

/// Errors raised while loading or rendering a template.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Syntax error in template '{template}': {message}")]
    Syntax { template: String, message: String },

    #[error("Template '{name}' not found (searched: {searched})")]
    NotFound { name: String, searched: String },

    /// A context object method called from the template failed.
    #[error("Invocation of '{reference}.{method}' failed")]
    MethodInvocation {
        reference: String,
        method: String,
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to render template '{template}': {message}")]
    Render { template: String, message: String },

    #[error("I/O error on {target}")]
    Io {
        target: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Encoding(#[from] UnsupportedEncoding),
}

pub trait TemplateEngine: Send + Sync {
    /// Replace the engine's template locations.
    fn configure(&mut self, locations: TemplateLocations);

    /// Load and compile `name`, decoding its source with `encoding`.
    fn get_template(&self, name: &str, encoding: Encoding)
    -> Result<Box<dyn Template>, EngineError>;
}

pub trait Template: Send + Sync {
    fn name(&self) -> &str;

    fn render(&self, context: &Context) -> Result<String, EngineError>;

    /// Render straight into an output writer.
    fn render_to(&self, context: &Context, writer: &mut TextWriter) -> Result<(), EngineError> {
        let text = self.render(context)?;
        writer.write_str(&text).map_err(|source| EngineError::Io {
            target: writer.path().display().to_string(),
            source,
        })
    }
}
