//! The generator: template lookup, rendering and output routing for one run.
//!
//! A [`Generator`] is a cheap, cloneable handle. It owns the template engine,
//! the generator properties, the [`WriterCache`] and the *active context* of
//! the control template. It is also bound into that context as `generator`,
//! which is how control templates hand work to worker templates:
//!
//! ```text
//! {% for table in tables %}
//! {{ generator(method="parse", template="table.tera",
//!              file=table.name ~ ".sql", object_id="table", object=table) }}
//! {% endfor %}
//! ```
//!
//! A worker render sees a copy of the active context plus the injected
//! object. When it names a file the output goes to the cached writer for
//! that file and the call returns an empty string; otherwise the rendered
//! text is returned in place.
//!
//! Writes to one file concatenate in call order. A worker that targets a file
//! whose render is still in progress further up the call chain does not
//! write directly: its text is spliced into the enclosing render at the
//! point of the call.
//!
//! # Lifecycle
//!
//! Build with [`Generator::builder`], drive with
//! [`Generator::parse_control`], then call [`Generator::shutdown`] to close
//! every cached writer and drop the active context.

mod writers;

pub use writers::{OutputBinding, SharedWriter, TextWriter, WriterCache};

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use anyhow::anyhow;
use serde_json::{Value, json};

use crate::context::{
    Context, ContextBuilder, ContextObject, ContextValue, MethodInvocationError, ObjectRegistry,
    RESERVED_KEYS, optional_str, required_str,
};
use crate::core::TexenError;
use crate::encoding::Encoding;
use crate::engine::{EngineError, Template, TemplateEngine, TemplateLocations, TeraEngine};
use crate::properties::{PropertySet, PropertyStore};
use crate::resources::{DEFAULTS_RESOURCE, ResourceLocator};
use crate::utils::absolute_path;

/// Generator property naming the default output directory.
pub const OUTPUT_PATH_PROPERTY: &str = "path.output";
/// Generator property naming the default template path.
pub const TEMPLATE_PATH_PROPERTY: &str = "path.template";
/// Prefix of generator properties that bind context objects.
pub const CONTEXT_OBJECTS_PREFIX: &str = "context.objects.";

pub const GENERATOR_KEY: &str = "generator";
pub const OUTPUT_DIRECTORY_KEY: &str = "outputDirectory";

/// Read-only settings handed to context object factories.
#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    pub output_directory: PathBuf,
    /// Comma separated template directories, already absolute.
    pub template_path: Option<String>,
    pub input_encoding: Option<String>,
    pub output_encoding: Option<String>,
    pub locator: ResourceLocator,
}

#[derive(Clone)]
pub struct Generator {
    inner: Arc<Inner>,
}

struct Inner {
    engine: Box<dyn TemplateEngine>,
    settings: GeneratorSettings,
    properties: PropertySet,
    registry: ObjectRegistry,
    writers: WriterCache,
    active: Mutex<Context>,
    frames: Mutex<Vec<RenderFrame>>,
    next_marker: AtomicU64,
}

/// A file render in progress, with the nested output spliced into it.
struct RenderFrame {
    path: PathBuf,
    deferred: Vec<(String, String)>,
}

const MARKER_OPEN: char = '\u{E000}';
const MARKER_CLOSE: char = '\u{E001}';

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("settings", &self.inner.settings)
            .field("registry", &self.inner.registry)
            .field("open_writers", &self.inner.writers.len())
            .finish_non_exhaustive()
    }
}

impl Generator {
    /// Start building a generator whose resources resolve through `locator`.
    pub fn builder(locator: ResourceLocator) -> GeneratorBuilder {
        GeneratorBuilder::new(locator)
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.inner.settings
    }

    pub fn output_directory(&self) -> &Path {
        &self.inner.settings.output_directory
    }

    pub fn template_path(&self) -> Option<&str> {
        self.inner.settings.template_path.as_deref()
    }

    /// Generator properties: embedded defaults merged with any custom file.
    pub fn properties(&self) -> &PropertySet {
        &self.inner.properties
    }

    /// Look up a template. `encoding` falls back to the input encoding.
    pub fn get_template(
        &self,
        name: &str,
        encoding: Option<&str>,
    ) -> Result<Box<dyn Template>, EngineError> {
        let encoding =
            Encoding::resolve_with_fallback(encoding, self.inner.settings.input_encoding.as_deref())?;
        tracing::debug!("Loading template '{}' ({})", name, encoding.name());
        self.inner.engine.get_template(name, encoding)
    }

    /// Open an uncached writer. The caller owns and closes it.
    pub fn get_writer(&self, path: &Path, encoding: Option<&str>) -> Result<TextWriter, TexenError> {
        let encoding = Encoding::resolve(encoding)?;
        TextWriter::create(path, encoding).map_err(|source| TexenError::Io {
            operation: "open output file".to_string(),
            path: path.display().to_string(),
            source,
        })
    }

    /// The cached writer for `output_file` under the output directory.
    ///
    /// `encoding` falls back to the output encoding.
    pub fn resolve_writer_for(
        &self,
        output_file: &str,
        encoding: Option<&str>,
    ) -> Result<SharedWriter, EngineError> {
        let settings = &self.inner.settings;
        let encoding =
            Encoding::resolve_with_fallback(encoding, settings.output_encoding.as_deref())?;
        let path = absolute_path(&settings.output_directory, Path::new(output_file));

        self.inner.writers.resolve(&path, encoding).map_err(|source| EngineError::Io {
            target: path.display().to_string(),
            source,
        })
    }

    /// Render `template` with the active context.
    ///
    /// `object` is bound into the active context first. An empty
    /// `output_file` returns the text; otherwise the text goes to the cached
    /// writer for that file and the result is empty.
    pub fn parse(
        &self,
        template: &str,
        output_file: &str,
        object: Option<(&str, ContextValue)>,
    ) -> Result<String, EngineError> {
        self.parse_with_encodings(template, output_file, object, None, None)
    }

    pub fn parse_with_encodings(
        &self,
        template: &str,
        output_file: &str,
        object: Option<(&str, ContextValue)>,
        input_encoding: Option<&str>,
        output_encoding: Option<&str>,
    ) -> Result<String, EngineError> {
        let template = self.get_template(template, input_encoding)?;

        let context = {
            let mut active = self.lock_active();
            if let Some((object_id, value)) = object {
                active.insert(object_id, value);
            }
            active.clone()
        };

        if output_file.is_empty() {
            return template.render(&context);
        }

        let writer = self.resolve_writer_for(output_file, output_encoding)?;
        let path = writer.lock().unwrap_or_else(PoisonError::into_inner).path().to_path_buf();
        tracing::debug!("Rendering '{}' into {}", template.name(), output_file);

        let depth = self.push_frame(&path);
        let rendered = template.render(&context);
        let frame = self.pop_frame(depth);
        let (text, foreign) = splice_deferred(&rendered?, &frame.deferred);

        if let Some(marker) = self.defer_to_enclosing(&path, text.as_str()) {
            return Ok(marker + &foreign);
        }

        let mut writer = writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_str(&text).map_err(|source| EngineError::Io {
            target: writer.path().display().to_string(),
            source,
        })?;
        Ok(foreign)
    }

    /// Render the control template.
    ///
    /// The context is layered as defaults, then registered objects, then
    /// `context`, and becomes the active context for worker renders.
    pub fn parse_control(
        &self,
        control_template: &str,
        context: Context,
    ) -> Result<String, EngineError> {
        let template = self.get_template(control_template, None)?;

        let context = ContextBuilder::new()
            .with_defaults(self)
            .with_registered_objects(self)
            .with_caller(context)
            .build();
        *self.lock_active() = context.clone();

        template.render(&context)
    }

    /// Bind `generator` and `outputDirectory`. Safe to call repeatedly.
    pub fn fill_context_defaults(&self, context: &mut Context) {
        let handle: Arc<dyn ContextObject> = Arc::new(GeneratorHandle {
            inner: Arc::downgrade(&self.inner),
        });
        context.insert(GENERATOR_KEY, handle);
        context.insert(
            OUTPUT_DIRECTORY_KEY,
            self.output_directory().display().to_string(),
        );
    }

    /// Bind an instance for every `context.objects.<name> = <Type>` property.
    ///
    /// The variable name is the part after the last `.`. Unknown types and
    /// failing factories are logged and skipped.
    pub fn fill_context_properties(&self, context: &mut Context) {
        for (key, type_name) in self.inner.properties.with_prefix(CONTEXT_OBJECTS_PREFIX) {
            let name = key.rsplit('.').next().unwrap_or(key);
            if RESERVED_KEYS.contains(&name) {
                tracing::warn!("Ignoring {}: '{}' is reserved", key, name);
                continue;
            }

            match self.inner.registry.instantiate(type_name.trim(), &self.inner.settings) {
                Ok(object) => {
                    tracing::debug!("Bound {} as '{}'", object.type_name(), name);
                    context.insert(name, object);
                }
                Err(err) => {
                    tracing::warn!("Skipping context object '{}': {}", name, err);
                }
            }
        }
    }

    /// A copy of the active context.
    pub fn active_context(&self) -> Context {
        self.lock_active().clone()
    }

    /// Close every cached writer and drop the active context.
    ///
    /// Returns the paths of the writers that were open.
    pub fn shutdown(&self) -> Vec<PathBuf> {
        let closed = self.inner.writers.shutdown();
        self.lock_active().clear();
        tracing::debug!("Generator shut down, closed {} writer(s)", closed.len());
        closed
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, Context> {
        self.inner.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_frames(&self) -> std::sync::MutexGuard<'_, Vec<RenderFrame>> {
        self.inner.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push_frame(&self, path: &Path) -> usize {
        let mut frames = self.lock_frames();
        frames.push(RenderFrame {
            path: path.to_path_buf(),
            deferred: Vec::new(),
        });
        frames.len() - 1
    }

    fn pop_frame(&self, depth: usize) -> RenderFrame {
        let mut frames = self.lock_frames();
        let depth = depth.min(frames.len());
        let mut popped = frames.split_off(depth).into_iter();
        popped.next().unwrap_or(RenderFrame {
            path: PathBuf::new(),
            deferred: Vec::new(),
        })
    }

    /// Hand `text` to the nearest enclosing render of `path`, if any.
    ///
    /// Returns the marker standing in for `text` until that render splices it.
    fn defer_to_enclosing(&self, path: &Path, text: &str) -> Option<String> {
        let mut frames = self.lock_frames();
        let frame = frames.iter_mut().rev().find(|frame| frame.path == path)?;
        let id = self.inner.next_marker.fetch_add(1, Ordering::Relaxed);
        let marker = format!("{MARKER_OPEN}{id}{MARKER_CLOSE}");
        tracing::trace!("Deferring nested output for {} into the enclosing render", path.display());
        frame.deferred.push((marker.clone(), text.to_string()));
        Some(marker)
    }
}

/// Replace the markers owned by `deferred` with their text.
///
/// Markers owned by other renders are removed and returned, in order, so the
/// caller can pass them up to the render that owns them.
fn splice_deferred(text: &str, deferred: &[(String, String)]) -> (String, String) {
    let mut spliced = String::with_capacity(text.len());
    let mut foreign = String::new();
    let mut rest = text;

    while let Some(start) = rest.find(MARKER_OPEN) {
        spliced.push_str(&rest[..start]);
        let tail = &rest[start..];
        let token = tail
            .find(MARKER_CLOSE)
            .map(|end| &tail[..end + MARKER_CLOSE.len_utf8()])
            .filter(|token| is_marker(token));

        match token {
            Some(token) => {
                match deferred.iter().find(|(marker, _)| marker == token) {
                    Some((_, chunk)) => spliced.push_str(chunk),
                    None => foreign.push_str(token),
                }
                rest = &tail[token.len()..];
            }
            None => {
                spliced.push(MARKER_OPEN);
                rest = &tail[MARKER_OPEN.len_utf8()..];
            }
        }
    }
    spliced.push_str(rest);
    (spliced, foreign)
}

fn is_marker(token: &str) -> bool {
    token
        .strip_prefix(MARKER_OPEN)
        .and_then(|rest| rest.strip_suffix(MARKER_CLOSE))
        .is_some_and(|id| !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()))
}

/// The `generator` context object.
///
/// Holds the generator weakly. The active context that stores this handle
/// lives inside the generator itself.
struct GeneratorHandle {
    inner: Weak<Inner>,
}

impl GeneratorHandle {
    fn upgrade(&self) -> Option<Generator> {
        self.inner.upgrade().map(|inner| Generator { inner })
    }
}

impl ContextObject for GeneratorHandle {
    fn type_name(&self) -> &str {
        "Generator"
    }

    fn snapshot(&self) -> Value {
        self.upgrade().map(|generator| generator.snapshot()).unwrap_or(Value::Null)
    }

    fn invoke(&self, method: &str, args: &HashMap<String, Value>) -> anyhow::Result<Value> {
        let generator = self.upgrade().ok_or_else(|| anyhow!("Generator has been dropped"))?;
        generator.invoke(method, args)
    }
}

impl ContextObject for Generator {
    fn type_name(&self) -> &str {
        "Generator"
    }

    fn snapshot(&self) -> Value {
        let settings = &self.inner.settings;
        json!({
            "outputDirectory": settings.output_directory.display().to_string(),
            "templatePath": settings.template_path.clone().unwrap_or_default(),
            "inputEncoding": settings.input_encoding.clone().unwrap_or_default(),
            "outputEncoding": settings.output_encoding.clone().unwrap_or_default(),
        })
    }

    fn invoke(&self, method: &str, args: &HashMap<String, Value>) -> anyhow::Result<Value> {
        match method {
            "parse" => {
                let template = required_str(args, "template")?;
                let file = optional_str(args, "file").unwrap_or_default();
                let object_id = optional_str(args, "object_id");
                let object = match (object_id.as_deref(), args.get("object")) {
                    (Some(id), Some(value)) => Some((id, ContextValue::from_json(value.clone()))),
                    (Some(_), None) => return Err(anyhow!("object_id given without object")),
                    _ => None,
                };

                let text = self
                    .parse_with_encodings(
                        &template,
                        &file,
                        object,
                        optional_str(args, "input_encoding").as_deref(),
                        optional_str(args, "output_encoding").as_deref(),
                    )
                    .map_err(|err| match err {
                        EngineError::MethodInvocation {
                            reference,
                            method,
                            source,
                        } => anyhow::Error::new(MethodInvocationError {
                            reference,
                            method,
                            cause: source,
                        }),
                        other => anyhow::Error::new(other),
                    })?;
                Ok(Value::String(text))
            }
            other => Err(anyhow!("Generator has no method '{}'", other)),
        }
    }
}

/// Configures and builds a [`Generator`].
pub struct GeneratorBuilder {
    locator: ResourceLocator,
    engine: Box<dyn TemplateEngine>,
    registry: ObjectRegistry,
    output_directory: Option<PathBuf>,
    template_path: Option<String>,
    input_encoding: Option<String>,
    output_encoding: Option<String>,
    properties_file: Option<String>,
    use_resource_locator: bool,
}

impl GeneratorBuilder {
    pub fn new(locator: ResourceLocator) -> Self {
        Self {
            locator,
            engine: Box::new(TeraEngine::new()),
            registry: ObjectRegistry::with_builtins(),
            output_directory: None,
            template_path: None,
            input_encoding: None,
            output_encoding: None,
            properties_file: None,
            use_resource_locator: false,
        }
    }

    /// Replace the default [`TeraEngine`].
    #[must_use]
    pub fn engine(mut self, engine: Box<dyn TemplateEngine>) -> Self {
        self.engine = engine;
        self
    }

    #[must_use]
    pub fn registry(mut self, registry: ObjectRegistry) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn output_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_directory = Some(dir.into());
        self
    }

    /// Comma separated list of template directories.
    #[must_use]
    pub fn template_path(mut self, path: impl Into<String>) -> Self {
        self.template_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn input_encoding(mut self, encoding: Option<String>) -> Self {
        self.input_encoding = encoding;
        self
    }

    #[must_use]
    pub fn output_encoding(mut self, encoding: Option<String>) -> Self {
        self.output_encoding = encoding;
        self
    }

    /// Merge a custom generator properties resource over the defaults.
    #[must_use]
    pub fn with_properties(mut self, name: impl Into<String>) -> Self {
        self.properties_file = Some(name.into());
        self
    }

    /// Fall back to the resource locator for templates not on the template path.
    #[must_use]
    pub fn use_resource_locator(mut self, enabled: bool) -> Self {
        self.use_resource_locator = enabled;
        self
    }

    pub fn build(self) -> Result<Generator, TexenError> {
        let Self {
            locator,
            mut engine,
            registry,
            output_directory,
            template_path,
            input_encoding,
            output_encoding,
            properties_file,
            use_resource_locator,
        } = self;

        // Fail early on encodings the writers could not honor.
        Encoding::resolve(input_encoding.as_deref())?;
        Encoding::resolve(output_encoding.as_deref())?;

        let store = PropertyStore::new(None, locator.clone());
        let mut properties = store.load_resource(DEFAULTS_RESOURCE).into_set();
        if let Some(name) = &properties_file {
            let load = store.load_resource(name);
            if !load.is_loaded() {
                tracing::warn!("Generator properties '{}' could not be loaded", name);
            }
            properties.merge(&load.into_set());
        }

        let base_dir = locator.base_dir().to_path_buf();
        let output_directory = output_directory
            .or_else(|| properties.get(OUTPUT_PATH_PROPERTY).map(PathBuf::from))
            .map(|dir| absolute_path(&base_dir, &dir))
            .ok_or(TexenError::MissingOutputDirectory)?;

        let template_dirs: Vec<PathBuf> = template_path
            .as_deref()
            .or_else(|| properties.get(TEMPLATE_PATH_PROPERTY))
            .map(|path| split_template_path(path, &base_dir))
            .unwrap_or_default();
        let template_path = (!template_dirs.is_empty()).then(|| {
            template_dirs.iter().map(|dir| dir.display().to_string()).collect::<Vec<_>>().join(",")
        });

        let mut locations = TemplateLocations::new(template_dirs);
        if use_resource_locator {
            locations = locations.with_resources(locator.clone());
        }
        engine.configure(locations);

        let settings = GeneratorSettings {
            output_directory,
            template_path,
            input_encoding,
            output_encoding,
            locator,
        };
        tracing::debug!("Generator settings: {:?}", settings);

        Ok(Generator {
            inner: Arc::new(Inner {
                engine,
                settings,
                properties,
                registry,
                writers: WriterCache::new(),
                active: Mutex::new(Context::new()),
                frames: Mutex::new(Vec::new()),
                next_marker: AtomicU64::new(0),
            }),
        })
    }
}

/// Split a comma separated template path into absolute directories.
pub fn split_template_path(path: &str, base_dir: &Path) -> Vec<PathBuf> {
    path.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| absolute_path(base_dir, Path::new(entry)))
        .collect()
}
