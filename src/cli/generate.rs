//! Run a generation task.
//!
//! Settings come from the task file (see [`crate::config`]) with any flag
//! given here taking precedence. Relative paths given as flags resolve
//! against the task's base directory.
//!
//! # Examples
//!
//! ```bash
//! texen generate
//! texen generate --control-template control.tera --template-path templates \
//!     --output-directory out --output-file report.txt
//! texen generate --context-properties "project.properties, local.properties"
//! ```

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::CliConfig;
use crate::config::TaskConfig;
use crate::task::GenerationTask;

#[derive(Args, Debug, Default)]
pub struct GenerateCommand {
    /// Template rendered into the output file
    #[arg(long)]
    control_template: Option<String>,

    /// Comma separated template directories, searched in order
    #[arg(long)]
    template_path: Option<String>,

    /// Directory output files are written to
    #[arg(long)]
    output_directory: Option<PathBuf>,

    /// Name of the control template's output file
    #[arg(long)]
    output_file: Option<String>,

    /// Encoding of output files
    #[arg(long)]
    output_encoding: Option<String>,

    /// Encoding of template files
    #[arg(long)]
    input_encoding: Option<String>,

    /// Comma separated property files loaded into the context
    #[arg(long)]
    context_properties: Option<String>,

    /// Fall back to the resource locator when a template is not on the
    /// template path
    #[arg(long)]
    use_resource_locator: bool,

    /// Directory relative paths resolve against
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Property file merged over the built-in generator properties
    #[arg(long)]
    generator_properties: Option<String>,
}

impl GenerateCommand {
    pub fn execute(self, config: &CliConfig) -> Result<()> {
        let task = config.load_task(self.into_overrides())?;
        let report = GenerationTask::new(task).execute()?;

        println!("{} {}", "✓".green(), report.output.display());
        for file in &report.files {
            println!("{} {}", "✓".green(), file.display());
        }
        println!(
            "{}",
            format!("Generated {} file(s)", report.files.len() + 1).bold()
        );
        Ok(())
    }

    fn into_overrides(self) -> TaskConfig {
        TaskConfig {
            control_template: self.control_template,
            template_path: self.template_path,
            output_directory: self.output_directory,
            output_file: self.output_file,
            output_encoding: self.output_encoding,
            input_encoding: self.input_encoding,
            context_properties: self.context_properties,
            use_resource_locator: self.use_resource_locator,
            base_dir: self.base_dir,
            generator_properties: self.generator_properties,
        }
    }
}
