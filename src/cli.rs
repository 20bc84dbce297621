//! CLI: compile | validate | params
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use serde_json::Value;

use json_schematic::compiler::Compiler;
use json_schematic::input::{Input, RegistryInputs};
use json_schematic::params::{self, ParamLocation};
use json_schematic::parser::TypeRegistry;
use json_schematic::schema;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// compile type descriptions to OpenAPI components, validate documents
/// against them, or project them onto request parameters
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// compile types and print `{"components": {"schemas": ...}}`
    Compile(CompileOut),
    /// validate JSON documents against one type
    Validate(ValidateRun),
    /// print the path or query parameters of an object type
    Params(ParamsOut),
}

#[derive(Args, Debug, Clone)]
struct TypeSettings {
    /// JSON file of type descriptions (name → definition)
    #[arg(long)]
    types: PathBuf,
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct CompileOut {
    #[command(flatten)]
    type_settings: TypeSettings,

    /// root types to compile (all registry types if omitted)
    #[arg(long)]
    root: Vec<String>,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct ValidateRun {
    #[command(flatten)]
    type_settings: TypeSettings,

    /// registry type every document must satisfy
    #[arg(long = "type")]
    type_name: String,

    #[command(flatten)]
    input_settings: InputSettings,
}

#[derive(clap::Parser, Debug)]
struct ParamsOut {
    #[command(flatten)]
    type_settings: TypeSettings,

    /// registry type whose properties become parameters
    #[arg(long = "type")]
    type_name: String,

    /// parameter location
    #[arg(long = "in", value_enum)]
    location: ParamLocation,
}

/// One JSON value read from an input, labelled for reporting.
struct Document {
    label: String,
    value: Value,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl TypeSettings {
    fn load(&self) -> anyhow::Result<TypeRegistry> {
        Ok(TypeRegistry::load(&self.types)?)
    }
}

impl InputSettings {
    fn load_documents(&self) -> anyhow::Result<Vec<Document>> {
        let source_paths = resolve_file_path_patterns(&self.input).context("failed to resolve input file paths")?;
        let mut documents = Vec::new();
        for source_path in source_paths {
            let source_path_str = source_path.to_string_lossy().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file {source_path_str}"))?;
            if self.ndjson {
                for (index, line) in source.lines().enumerate().filter(|(_, line)| !line.trim().is_empty()) {
                    let value = serde_json::from_str::<Value>(line)
                        .with_context(|| format!("failed to parse JSON ({source_path_str}:{})", index + 1))?;
                    documents.push(Document { label: format!("{source_path_str}:{}", index + 1), value });
                }
            } else {
                let value = serde_json::from_str::<Value>(&source)
                    .with_context(|| format!("failed to parse JSON source file ({source_path_str})"))?;
                documents.push(Document { label: source_path_str, value });
            }
        }
        Ok(documents)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    /// `Ok(false)` when the command ran but found invalid documents.
    pub fn run(&self) -> anyhow::Result<bool> {
        match &self.cmd {
            Command::Compile(target) => {
                let registry = target.type_settings.load()?;
                let roots: Vec<String> = match target.root.is_empty() {
                    true => registry.names().map(str::to_string).collect(),
                    false => target.root.clone(),
                };
                let mut compiler = Compiler::new(&registry);
                for root in &roots {
                    compiler.add_type(root)?;
                }
                let document = schema::components_document(compiler.to_schemas());
                write_output(target.out.as_deref(), &serde_json::to_string_pretty(&document)?)?;
                Ok(true)
            }
            Command::Validate(target) => {
                let registry = target.type_settings.load()?;
                let input = RegistryInputs::build(&registry)?.require(&target.type_name)?;
                let documents = target.input_settings.load_documents()?;
                let results: Vec<_> = documents
                    .par_iter()
                    .map(|document| (document.label.as_str(), input.call(&document.value)))
                    .collect();
                let mut failures = 0usize;
                for (label, result) in results {
                    match result {
                        Ok(_) => println!("{} {label}", "✓".green()),
                        Err(report) => {
                            failures += 1;
                            println!("{} {label}", "✗".red());
                            for (path, messages) in report.path_hash() {
                                println!("    {} {}", path.yellow(), messages.join(", "));
                            }
                        }
                    }
                }
                tracing::debug!(documents = documents.len(), failures, "validation finished");
                Ok(failures == 0)
            }
            Command::Params(target) => {
                let registry = target.type_settings.load()?;
                let input = RegistryInputs::build(&registry)?.require(&target.type_name)?;
                let parameters = params::parameters(&input.schema(), target.location)?;
                println!("{}", serde_json::to_string_pretty(&parameters)?);
                Ok(true)
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn write_output(out: Option<&Path>, source: &str) -> anyhow::Result<()> {
    let Some(out) = out else {
        println!("{source}");
        return Ok(());
    };
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(out, source).with_context(|| format!("failed to write {}", out.display()))?;
    Ok(())
}

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
