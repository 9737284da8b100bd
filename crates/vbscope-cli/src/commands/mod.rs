//! CLI command implementations

pub mod check;
pub mod definition;
pub mod rename;

pub use check::CheckArgs;
pub use definition::DefinitionArgs;
pub use rename::RenameArgs;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use tracing::{debug, warn};
use vbscope_core::config::load_config_or_default_with_warnings;
use vbscope_core::{CancellationToken, Project, SyntaxTree};
use walkdir::WalkDir;

const SYNTAX_STREAM_SUFFIX: &str = ".syntax.json";

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Report declaration diagnostics for every document in a project
    Check(CheckArgs),

    /// Show where the name at a position is declared
    Definition(DefinitionArgs),

    /// List every location renamed together with the name at a position
    Rename(RenameArgs),
}

/// Arguments shared by position queries.
#[derive(Args, Debug)]
pub struct PositionArgs {
    /// Directory holding the project's syntax streams
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Document uri or file name, e.g. Module1.bas
    #[arg(value_name = "DOCUMENT")]
    pub document: String,

    /// Zero-based line
    #[arg(long)]
    pub line: u32,

    /// Zero-based character offset within the line
    #[arg(long)]
    pub character: u32,

    /// Output format (pretty, json)
    #[arg(short, long, default_value = "pretty")]
    pub format: String,
}

pub struct LoadedProject {
    pub project: Project,
    pub total_files: usize,
    pub failures: Vec<(PathBuf, String)>,
}

/// Reads every syntax stream under `path` and feeds it to a fresh project.
///
/// Streams are read and deserialized in parallel; parsing into the graph is
/// sequential because the project has a single writer.
pub fn load_project(path: &Path) -> Result<LoadedProject> {
    let config_dir = if path.is_file() {
        path.parent().unwrap_or(Path::new("."))
    } else {
        path
    };
    let config_result = load_config_or_default_with_warnings(config_dir);
    for warning in &config_result.warnings {
        eprintln!("{} {}", "warning:".yellow().bold(), warning);
    }

    let files = discover_files(path)?;
    let trees: Vec<(PathBuf, Result<SyntaxTree>)> = files
        .par_iter()
        .map(|file| (file.clone(), read_tree(file)))
        .collect();

    let mut project = Project::new(config_result.config);
    let cancel = CancellationToken::new();
    let mut failures = Vec::new();
    for (file, tree) in trees {
        let parsed = tree.and_then(|tree| Ok(project.parse_document(tree, &cancel)?));
        match parsed {
            Ok(publish) => debug!(uri = %publish.uri, "Loaded document"),
            Err(error) => {
                warn!(file = %file.display(), %error, "Skipping document");
                failures.push((file, format!("{error:#}")));
            }
        }
    }

    Ok(LoadedProject {
        project,
        total_files: files.len(),
        failures,
    })
}

/// Resolves a user-supplied document name to a loaded uri.
pub fn find_document(project: &Project, name: &str) -> Result<String> {
    let suffix = format!("/{name}");
    let matches: Vec<&str> = project
        .documents()
        .filter(|document| document.uri == name || document.uri.ends_with(&suffix))
        .map(|document| document.uri.as_str())
        .collect();

    match matches.as_slice() {
        [uri] => Ok(uri.to_string()),
        [] => anyhow::bail!("No loaded document matches '{}'", name),
        _ => anyhow::bail!(
            "'{}' matches {} documents, pass the full uri instead",
            name,
            matches.len()
        ),
    }
}

fn read_tree(path: &Path) -> Result<SyntaxTree> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    SyntaxTree::from_json(&content)
        .with_context(|| format!("Invalid syntax stream {}", path.display()))
}

fn discover_files(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        anyhow::bail!("Path does not exist: {}", path.display());
    }

    if path.is_file() {
        if is_syntax_stream(path) {
            return Ok(vec![path.to_path_buf()]);
        } else {
            return Ok(vec![]);
        }
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| is_syntax_stream(e.path()))
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();

    Ok(files)
}

fn is_syntax_stream(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(SYNTAX_STREAM_SUFFIX))
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}
