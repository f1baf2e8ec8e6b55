//! Rendering resolved documents and writing them out

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use kafka_config_core::Document;
use serde_yaml::Value;
use tempfile::NamedTempFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
    /// `dotted.path=value` lines
    Flat,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
            Self::Flat => "properties",
        }
    }

    pub fn render(&self, document: &Document) -> Result<String> {
        match self {
            Self::Yaml => Ok(serde_yaml::to_string(&document.to_yaml_value())?),
            Self::Json => {
                let mut json = serde_json::to_string_pretty(&document.to_yaml_value())?;
                json.push('\n');
                Ok(json)
            }
            Self::Flat => Ok(render_flat(document)),
        }
    }
}

fn render_flat(document: &Document) -> String {
    document
        .flatten()
        .iter()
        .map(|(key, leaf)| format!("{}={}\n", key, escape(&scalar_text(leaf))))
        .collect()
}

fn scalar_text(leaf: &Document) -> String {
    match leaf.to_yaml_value() {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s,
        other => serde_yaml::to_string(&other).unwrap_or_default(),
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

/// One input file's rendered output
#[derive(Debug)]
pub struct Rendered {
    pub source: PathBuf,
    pub contents: String,
}

/// `{dir}/{source stem}.{extension}`
pub fn target_path(dir: &Path, source: &Path, format: OutputFormat) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    dir.join(format!("{}.{}", stem, format.extension()))
}

/// Write every rendered document into `dir`
///
/// All outputs are staged as temporary files first. If staging any of them
/// fails, the staged files are removed and no target is touched.
pub fn write_all(dir: &Path, rendered: &[Rendered], format: OutputFormat) -> Result<Vec<PathBuf>> {
    let mut targets = HashSet::new();
    for output in rendered {
        let target = target_path(dir, &output.source, format);
        if !targets.insert(target.clone()) {
            bail!(
                "Multiple inputs would be written to {}; rename one of them",
                target.display()
            );
        }
    }

    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let mut staged = Vec::with_capacity(rendered.len());
    for output in rendered {
        let mut file = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create a temporary file in {}", dir.display()))?;
        file.write_all(output.contents.as_bytes())
            .with_context(|| format!("Failed to stage output for {}", output.source.display()))?;
        staged.push((file, target_path(dir, &output.source, format)));
    }

    let mut written = Vec::with_capacity(staged.len());
    for (file, target) in staged {
        file.persist(&target)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        written.push(target);
    }
    Ok(written)
}
