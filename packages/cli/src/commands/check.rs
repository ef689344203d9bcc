use crate::config::Config;
use anyhow::Result;
use bunnyhop_model::TemplateRegistry;
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Template file or directory (defaults to the configured templates)
    pub input: Option<PathBuf>,

    /// List every file, not only the broken ones
    #[arg(short, long)]
    pub verbose: bool,
}

/// Outcome of checking a set of template files
#[derive(Debug, Default)]
pub struct CheckReport {
    pub files: usize,
    pub nodes: usize,
    pub connectors: usize,
    pub problems: Vec<String>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }
}

pub fn check(args: CheckArgs, cwd: &str) -> Result<()> {
    println!("🔍 {} BunnyHop template check", "Starting".green().bold());

    let paths = match &args.input {
        Some(input) if input.is_dir() => find_json_files(input),
        Some(input) if input.is_file() => vec![input.clone()],
        Some(input) => {
            return Err(anyhow::anyhow!("Input path does not exist: {}", input.display()));
        }
        None => Config::load(cwd)?.template_paths(cwd)?,
    };
    println!("   Found {} template files", paths.len());
    println!();

    let report = check_files(&paths, args.verbose);

    println!();
    println!(
        "✨ {} Check complete!",
        if report.is_clean() {
            "Done".green().bold()
        } else {
            "Done".red().bold()
        }
    );
    println!("   Files checked: {}", report.files);
    println!("   Node templates: {}", report.nodes);
    println!("   Connector templates: {}", report.connectors);

    if report.is_clean() {
        println!("   {} No issues found!", "✓".green());
        return Ok(());
    }

    println!("   {} {}", "Errors:".red(), report.problems.len());
    std::process::exit(1);
}

/// Load, merge and validate `paths`, printing each problem as it is found
pub fn check_files(paths: &[PathBuf], verbose: bool) -> CheckReport {
    let mut report = CheckReport::default();
    let mut merged = TemplateRegistry::new();

    for path in paths {
        report.files += 1;
        let templates = match TemplateRegistry::load(path) {
            Ok(templates) => templates,
            Err(err) => {
                eprintln!("{} {}: {}", "✗".red(), path.display(), err);
                report.problems.push(format!("{}: {}", path.display(), err));
                continue;
            }
        };
        debug!(path = %path.display(), nodes = templates.node_count(), "Template file parsed");

        if let Err(err) = merged.merge(templates) {
            eprintln!("{} {}: {}", "✗".red(), path.display(), err);
            report.problems.push(format!("{}: {}", path.display(), err));
        } else if verbose {
            println!("{} {}", "✓".green(), path.display());
        }
    }

    for problem in merged.validate() {
        eprintln!("{} {}", "✗".red(), problem);
        report.problems.push(problem.to_string());
    }

    report.nodes = merged.node_count();
    report.connectors = merged.connector_count();
    report
}

fn find_json_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<_> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.into_path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    files
}
