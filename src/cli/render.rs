//! Render one template and print the result.
//!
//! The template sees the same context as a control template: generator
//! defaults, registered context objects, then `--set` values coerced the
//! way context properties are (`count=3` binds an integer, `debug=on` a
//! boolean). Worker templates it calls still write their own files under
//! the output directory.
//!
//! The task file (`--config`, or `texen.toml` when present) seeds the template
//! path, output directory, encodings and resource fallback. Flags win over it,
//! and relative paths resolve against the task file's directory.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use super::{CliConfig, parse_key_value};
use crate::config::TaskConfig;
use crate::context::{Context, coerce_property};
use crate::core::TexenError;
use crate::resources::ResourceLocator;
use crate::task::generator_builder;

#[derive(Args, Debug)]
pub struct RenderCommand {
    /// Template to render
    template: String,

    /// Comma separated template directories, searched in order
    #[arg(long)]
    template_path: Option<String>,

    /// Directory worker templates write to
    #[arg(long)]
    output_directory: Option<PathBuf>,

    /// Bind a context value (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    values: Vec<(String, String)>,

    /// Encoding of template files
    #[arg(long)]
    input_encoding: Option<String>,

    /// Encoding of files written by worker templates
    #[arg(long)]
    output_encoding: Option<String>,

    /// Fall back to the resource locator when a template is not on the
    /// template path
    #[arg(long)]
    use_resource_locator: bool,
}

impl RenderCommand {
    pub fn execute(self, config: &CliConfig) -> Result<()> {
        let text = self.render(config)?;
        print!("{text}");
        Ok(())
    }

    fn render(self, config: &CliConfig) -> Result<String> {
        let task = config.load_task(TaskConfig {
            template_path: self.template_path,
            output_directory: self.output_directory,
            input_encoding: self.input_encoding,
            output_encoding: self.output_encoding,
            use_resource_locator: self.use_resource_locator,
            ..Default::default()
        })?;
        let base_dir = task.base_dir();

        let mut context = Context::new();
        for (key, value) in &self.values {
            let (name, value) = coerce_property(key, value, &base_dir)?;
            context.insert(name, value);
        }

        let generator = generator_builder(&task, ResourceLocator::new(&base_dir)).build()?;

        let result = generator.parse_control(&self.template, context);
        let files = generator.shutdown();
        for file in files {
            tracing::info!("Wrote {}", file.display());
        }

        result.map_err(|err| TexenError::generation_failed(err).into())
    }
}
