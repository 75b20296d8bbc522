//! [`TemplateEngine`] backed by Tera.
//!
//! Each template is compiled into its own `Tera` instance with autoescaping
//! disabled, since the output is source code and plain text rather than
//! HTML. Templates it names in `include`, `import` or `extends` tags are
//! looked up the same way and compiled alongside it. At render time every [`ContextObject`] in the context becomes a Tera
//! function named after its key:
//!
//! ```text
//! {{ strings(method="capitalize", text=table.name) }}
//! {{ generator(method="parse", template="row.tera", file=table.name ~ ".sql",
//!              object_id="table", object=table) }}
//! ```
//!
//! The `method` argument selects the method; the remaining arguments are
//! passed through by name.

use std::collections::{HashMap, HashSet};
use std::error::Error as _;
use std::path::Path;
use std::sync::Arc;

use ::tera::{Context as TeraContext, Tera, Value};

use super::{EngineError, Template, TemplateEngine, TemplateLocations};
use crate::context::{Context, ContextObject, MethodInvocationError};
use crate::encoding::Encoding;

#[derive(Debug, Clone, Default)]
pub struct TeraEngine {
    locations: TemplateLocations,
}

impl TeraEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn locations(&self) -> &TemplateLocations {
        &self.locations
    }

    fn read_source(&self, name: &str) -> Result<Vec<u8>, EngineError> {
        let direct = Path::new(name);
        if direct.is_absolute() && direct.is_file() {
            return read_file(direct);
        }

        for dir in &self.locations.search_paths {
            let candidate = dir.join(name);
            if candidate.is_file() {
                tracing::debug!("Template '{}' found at {}", name, candidate.display());
                return read_file(&candidate);
            }
        }

        if let Some(locator) = &self.locations.resources {
            if let Ok(bytes) = locator.open_read(name) {
                return Ok(bytes);
            }
        }

        Err(EngineError::NotFound {
            name: name.to_string(),
            searched: self.locations.describe(),
        })
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, EngineError> {
    std::fs::read(path).map_err(|source| EngineError::Io {
        target: path.display().to_string(),
        source,
    })
}

impl TemplateEngine for TeraEngine {
    fn configure(&mut self, locations: TemplateLocations) {
        tracing::debug!("Template locations: {}", locations.describe());
        self.locations = locations;
    }

    fn get_template(
        &self,
        name: &str,
        encoding: Encoding,
    ) -> Result<Box<dyn Template>, EngineError> {
        let mut sources = vec![(name.to_string(), encoding.decode(&self.read_source(name)?))];
        let mut seen = HashSet::from([name.to_string()]);

        let mut index = 0;
        while index < sources.len() {
            for referenced in referenced_templates(&sources[index].1) {
                if !seen.insert(referenced.clone()) {
                    continue;
                }
                match self.read_source(&referenced) {
                    Ok(bytes) => sources.push((referenced, encoding.decode(&bytes))),
                    // Tera reports it with the tag that names it.
                    Err(EngineError::NotFound { .. }) => {
                        tracing::debug!("'{}' references unknown template '{}'", name, referenced);
                    }
                    Err(err) => return Err(err),
                }
            }
            index += 1;
        }

        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        tera.add_raw_templates(sources).map_err(|err| match &err.kind {
            ::tera::ErrorKind::MissingParent { parent, .. } => EngineError::NotFound {
                name: parent.clone(),
                searched: self.locations.describe(),
            },
            _ => EngineError::Syntax {
                template: name.to_string(),
                message: format_tera_error(&err),
            },
        })?;

        Ok(Box::new(TeraTemplate {
            name: name.to_string(),
            tera,
        }))
    }
}

/// Names of the templates `source` pulls in through `include`, `import` and
/// `extends` tags.
fn referenced_templates(source: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = source;

    while let Some(start) = rest.find("{%") {
        let tag = &rest[start + 2..];
        let end = tag.find("%}").unwrap_or(tag.len());
        let body = tag[..end].trim_start_matches('-').trim_start();
        let keyword = body.split_whitespace().next().unwrap_or_default();
        if matches!(keyword, "include" | "import" | "extends") {
            names.extend(string_literals(&body[keyword.len()..]));
        }
        rest = &tag[end..];
    }
    names
}

fn string_literals(text: &str) -> Vec<String> {
    let mut literals = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find(['"', '\'', '`']) {
        let quote = &rest[open..open + 1];
        let after = &rest[open + 1..];
        match after.find(quote) {
            Some(close) => {
                literals.push(after[..close].to_string());
                rest = &after[close + 1..];
            }
            None => break,
        }
    }
    literals
}

/// A compiled template.
#[derive(Debug, Clone)]
pub struct TeraTemplate {
    name: String,
    tera: Tera,
}

impl Template for TeraTemplate {
    fn name(&self) -> &str {
        &self.name
    }

    fn render(&self, context: &Context) -> Result<String, EngineError> {
        // Object functions only live for this render.
        let mut tera = self.tera.clone();
        let mut tera_context = TeraContext::new();

        for (key, value) in context.iter() {
            tera_context.insert(key, &value.to_json());
        }
        for (key, object) in context.objects() {
            tera.register_function(key, object_function(key.to_string(), Arc::clone(object)));
        }

        tracing::debug!(
            "Rendering '{}' with context keys: {}",
            self.name,
            context.keys().collect::<Vec<_>>().join(", ")
        );

        tera.render(&self.name, &tera_context).map_err(|err| classify(&self.name, &err))
    }
}

fn object_function(reference: String, object: Arc<dyn ContextObject>) -> impl ::tera::Function {
    move |args: &HashMap<String, Value>| -> ::tera::Result<Value> {
        let method = args.get("method").and_then(Value::as_str).ok_or_else(|| {
            ::tera::Error::msg(format!("Call to '{}' needs a method=\"...\" argument", reference))
        })?;

        let mut call_args = args.clone();
        call_args.remove("method");

        object.invoke(method, &call_args).map_err(|err| {
            // A failure from a nested render already names the call that failed.
            let failure = match err.downcast::<MethodInvocationError>() {
                Ok(nested) => nested,
                Err(err) => MethodInvocationError::new(&reference, method, err),
            };
            ::tera::Error::chain(failure.to_string(), failure)
        })
    }
}

/// Map a Tera render error onto [`EngineError`].
///
/// A failed object call anywhere in the chain wins; the innermost one names
/// the call that actually failed when worker renders are nested.
fn classify(template: &str, error: &::tera::Error) -> EngineError {
    let mut invocation: Option<&MethodInvocationError> = None;
    let mut missing: Option<String> = None;

    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(error);
    while let Some(err) = current {
        if let Some(found) = err.downcast_ref::<MethodInvocationError>() {
            invocation = Some(found);
        }
        if let Some(tera_err) = err.downcast_ref::<::tera::Error>() {
            if let ::tera::ErrorKind::TemplateNotFound(name) = &tera_err.kind {
                missing.get_or_insert_with(|| name.clone());
            }
        }
        current = err.source();
    }

    if let Some(found) = invocation {
        return EngineError::MethodInvocation {
            reference: found.reference.clone(),
            method: found.method.clone(),
            source: Arc::clone(&found.cause),
        };
    }

    if let Some(name) = missing {
        return EngineError::NotFound {
            name,
            searched: format!("templates known to '{}'", template),
        };
    }

    EngineError::Render {
        template: template.to_string(),
        message: format_tera_error(error),
    }
}

/// Flatten a Tera error chain into one readable message.
pub fn format_tera_error(error: &::tera::Error) -> String {
    let mut messages = vec![error.to_string()];
    let mut current = error.source();
    while let Some(err) = current {
        messages.push(err.to_string());
        current = err.source();
    }

    let messages: Vec<String> =
        messages.into_iter().map(|msg| msg.trim().to_string()).filter(|msg| !msg.is_empty()).collect();

    if messages.is_empty() {
        "unknown template error".to_string()
    } else {
        messages.join("\n  → ")
    }
}
