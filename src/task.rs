//! One generation run, from configuration to closed output files.
//!
//! [`GenerationTask::execute`] performs these steps in order:
//!
//! 1. validate the [`TaskConfig`]
//! 2. build the [`Generator`], configuring the engine's template locations
//! 3. create the output directory and open `output_directory/output_file`
//! 4. build the initial context ([`TaskHooks`]) and coerce the context
//!    properties into it
//! 5. render the control template into the output file
//! 6. close the output file, shut the generator down, run the cleanup hook

use std::path::PathBuf;

use crate::config::TaskConfig;
use crate::context::{Context, ContextBuilder, ObjectRegistry};
use crate::core::TexenError;
use crate::engine::TemplateEngine;
use crate::generator::{Generator, GeneratorBuilder};
use crate::properties::{PropertySet, PropertyStore};
use crate::resources::ResourceLocator;

/// Context key of the run timestamp.
pub const NOW_KEY: &str = "now";

/// Extension points around a run.
pub trait TaskHooks: Send + Sync {
    /// Add values to the context before the context properties are applied.
    ///
    /// The default binds [`NOW_KEY`] to the current local time in RFC 2822
    /// form.
    fn populate_initial_context(&self, context: &mut Context) -> Result<(), TexenError> {
        context.insert(NOW_KEY, chrono::Local::now().to_rfc2822());
        Ok(())
    }

    /// Called once the run is over, whether it succeeded or not.
    fn cleanup(&self) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl TaskHooks for DefaultHooks {}

/// What a successful run wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationReport {
    /// The control template's output file.
    pub output: PathBuf,
    /// Files written by worker templates, sorted.
    pub files: Vec<PathBuf>,
}

pub struct GenerationTask {
    config: TaskConfig,
    engine: Option<Box<dyn TemplateEngine>>,
    registry: ObjectRegistry,
    hooks: Box<dyn TaskHooks>,
    resources: Vec<(String, Vec<u8>)>,
}

impl GenerationTask {
    pub fn new(config: TaskConfig) -> Self {
        Self {
            config,
            engine: None,
            registry: ObjectRegistry::with_builtins(),
            hooks: Box::new(DefaultHooks),
            resources: Vec::new(),
        }
    }

    pub fn config(&self) -> &TaskConfig {
        &self.config
    }

    #[must_use]
    pub fn with_engine(mut self, engine: Box<dyn TemplateEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Replace the context object registry (built-ins are included by default).
    #[must_use]
    pub fn with_registry(mut self, registry: ObjectRegistry) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn with_hooks(mut self, hooks: impl TaskHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    /// Make `bytes` available through the resource locator as `name`.
    #[must_use]
    pub fn with_resource(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.resources.push((name.into(), bytes.into()));
        self
    }

    pub fn validate(&self) -> Result<(), TexenError> {
        self.config.validate()
    }

    pub fn execute(self) -> Result<GenerationReport, TexenError> {
        self.validate()?;

        let Self {
            config,
            engine,
            registry,
            hooks,
            resources,
        } = self;

        let result = run(&config, engine, registry, hooks.as_ref(), resources);
        hooks.cleanup();
        result
    }
}

/// A generator builder carrying the locations, encodings and properties
/// `config` names. Relative paths resolve against the task base directory.
pub fn generator_builder(config: &TaskConfig, locator: ResourceLocator) -> GeneratorBuilder {
    let mut builder = Generator::builder(locator)
        .input_encoding(config.input_encoding.clone())
        .output_encoding(config.output_encoding.clone())
        .use_resource_locator(config.use_resource_locator);

    let template_dirs = config.template_directories();
    if !template_dirs.is_empty() {
        tracing::debug!("Template directories: {:?}", template_dirs);
        let joined: Vec<String> = template_dirs.iter().map(|dir| dir.display().to_string()).collect();
        builder = builder.template_path(joined.join(","));
    }
    if let Some(dir) = config.resolved_output_directory() {
        builder = builder.output_directory(dir);
    }
    if let Some(properties) = &config.generator_properties {
        builder = builder.with_properties(properties.as_str());
    }
    builder
}

fn run(
    config: &TaskConfig,
    engine: Option<Box<dyn TemplateEngine>>,
    registry: ObjectRegistry,
    hooks: &dyn TaskHooks,
    resources: Vec<(String, Vec<u8>)>,
) -> Result<GenerationReport, TexenError> {
    let base_dir = config.base_dir();
    let mut locator = ResourceLocator::new(&base_dir);
    for (name, bytes) in resources {
        locator.add_resource(&name, bytes);
    }

    let output_directory =
        config.resolved_output_directory().ok_or(TexenError::MissingOutputDirectory)?;
    let control_template =
        config.control_template.as_deref().ok_or(TexenError::MissingControlTemplate)?;
    let output_file = config.output_file.as_deref().ok_or(TexenError::MissingOutputFile)?;

    let mut builder = generator_builder(config, locator.clone()).registry(registry);
    if let Some(engine) = engine {
        builder = builder.engine(engine);
    }
    let generator = builder.build()?;

    std::fs::create_dir_all(&output_directory).map_err(|source| TexenError::Io {
        operation: "create output directory".to_string(),
        path: output_directory.display().to_string(),
        source,
    })?;

    let output = output_directory.join(output_file);
    let mut writer = generator.get_writer(&output, config.output_encoding.as_deref())?;

    let mut initial = Context::new();
    hooks.populate_initial_context(&mut initial)?;
    let properties = load_context_properties(&locator, &config.context_property_sources());
    let context = ContextBuilder::new()
        .with_caller(initial)
        .with_typed_properties(&properties, &base_dir)?
        .build();

    tracing::info!("Generating to file {}", output.display());

    let text = match generator.parse_control(control_template, context) {
        Ok(text) => text,
        Err(err) => {
            tracing::error!("Generation of {} failed: {}", output.display(), err);
            generator.shutdown();
            return Err(TexenError::generation_failed(err));
        }
    };

    let written = writer.write_str(&text).and_then(|()| writer.close());
    let files = generator.shutdown();
    written.map_err(|source| TexenError::Io {
        operation: "write output file".to_string(),
        path: output.display().to_string(),
        source,
    })?;

    tracing::debug!("Wrote {} and {} worker file(s)", output.display(), files.len());
    Ok(GenerationReport {
        output,
        files,
    })
}

/// Load and merge the context property sources, later sources winning.
///
/// Each source resolves through the locator. A source that cannot be read
/// is logged and contributes nothing.
pub fn load_context_properties(locator: &ResourceLocator, sources: &[String]) -> PropertySet {
    let store = PropertyStore::new(None, locator.clone());
    let mut merged = PropertySet::new();

    for source in sources {
        let load = store.load_resource(source);
        if !load.is_loaded() {
            tracing::warn!("Context properties '{}' could not be loaded", source);
        }
        merged.merge(&load.into_set());
    }
    merged
}
