//! Texen - template-driven multi-file generation
//!
//! Texen turns a *control template* plus a property/context model into one or
//! more rendered output files. The control template is rendered to the main
//! output file; from inside it, templates call back into the generator to
//! render *worker templates*, each into the file the template names.
//!
//! # Architecture Overview
//!
//! A generation run flows through these components:
//!
//! - [`task::GenerationTask`] validates the [`config::TaskConfig`], configures
//!   the template search locations, builds the context and drives the run
//! - [`context::ContextBuilder`] layers the rendering context: generator
//!   defaults, registered context objects, caller values, then typed
//!   properties coerced from `.properties` files
//! - [`generator::Generator`] resolves templates through the
//!   [`engine::TemplateEngine`] seam and renders to a string or to a cached
//!   writer
//! - [`generator::WriterCache`] guarantees a single open writer per output
//!   path for the lifetime of a run
//! - [`properties::PropertyStore`] loads property files from the template path
//!   or through the [`resources::ResourceLocator`], degrading to an empty set
//!   on any failure
//!
//! # Template Syntax
//!
//! The bundled engine adapter is [`engine::TeraEngine`]. Every context object
//! is visible both as a variable and as a callable function:
//!
//! ```text
//! {# control.tera #}
//! Generated {{ now }} into {{ outputDirectory }}
//! {% for table in tables %}
//! {{ generator(method="parse", template="table.tera", file=table.name ~ ".sql", object_id="table", object=table) }}
//! {% endfor %}
//! ```
//!
//! # Command-Line Usage
//!
//! ```bash
//! # Run a generation described by a task file
//! texen --config texen.toml generate
//!
//! # Same thing with flags only
//! texen generate --control-template control.tera --template-path templates \
//!     --output-directory out --output-file report.txt \
//!     --context-properties project.properties
//!
//! # Render a single template to stdout
//! texen render hello.tera --template-path templates --set name=World
//! ```

// Core functionality modules
pub mod cli;
pub mod config;
pub mod core;

// Generation pipeline
pub mod context;
pub mod engine;
pub mod generator;
pub mod properties;
pub mod task;

// Supporting modules
pub mod encoding;
pub mod resources;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
