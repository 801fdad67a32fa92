use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use rayon::prelude::*;
use tracing::{debug, info};
use tracing_subscriber::filter::EnvFilter;

use jackc::{compile, compile_traced, CompileError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    /// Stack machine instructions
    Vm,
    /// Parenthesized grammar trace
    Trace,
}

impl Emit {
    fn extension(self) -> &'static str {
        match self {
            Emit::Vm => "vm",
            Emit::Trace => "trace",
        }
    }
}

#[derive(Parser)]
#[command(name = "jackc", version, about = "Compile class files to stack machine code")]
struct Cli {
    /// Source files, or directories whose `.jack` files are all compiled
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    #[arg(long, value_enum, default_value_t = Emit::Vm)]
    emit: Emit,

    /// Print results instead of writing them next to each source
    #[arg(long)]
    stdout: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Compiles every unit and reports whether all of them succeeded.
fn run(cli: &Cli) -> Result<bool> {
    let mut units = Vec::new();
    for path in collect_sources(&cli.paths)? {
        let bytes = fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
        units.push((path, bytes));
    }

    // each unit gets its own parser, so they translate independently
    let results: Vec<_> = units
        .par_iter()
        .map(|(path, bytes)| (path, translate(bytes, cli.emit)))
        .collect();

    let prefix_paths = results.len() > 1;
    let mut all_ok = true;
    for (path, result) in results {
        match result {
            Ok(text) if cli.stdout => print!("{}", text),
            Ok(text) => {
                let out = path.with_extension(cli.emit.extension());
                match fs::write(&out, text)
                    .with_context(|| format!("failed to write {}", out.display()))
                {
                    Ok(()) => info!(source = %path.display(), output = %out.display(), "wrote"),
                    Err(err) => {
                        all_ok = false;
                        eprintln!("Error: {:#}", err);
                    }
                }
            }
            Err(err) => {
                all_ok = false;
                if prefix_paths {
                    eprintln!("{}: {}", path.display(), err);
                } else {
                    eprintln!("{}", err);
                }
            }
        }
    }
    Ok(all_ok)
}

fn translate(source: &[u8], emit: Emit) -> Result<String, CompileError> {
    match emit {
        Emit::Vm => compile(source).map(|chunk| chunk.to_string()),
        Emit::Trace => compile_traced(source).map(|(_, trace)| trace),
    }
}

fn collect_sources(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut sources = Vec::new();
    for path in paths {
        if !path.is_dir() {
            sources.push(path.clone());
            continue;
        }

        let mut found = Vec::new();
        let entries = fs::read_dir(path)
            .with_context(|| format!("failed to read directory {}", path.display()))?;
        for entry in entries {
            let entry_path = entry?.path();
            if is_source(&entry_path) {
                found.push(entry_path);
            }
        }
        if found.is_empty() {
            bail!("no .jack files in {}", path.display());
        }
        found.sort();
        debug!(dir = %path.display(), files = found.len(), "collected sources");
        sources.extend(found);
    }
    Ok(sources)
}

fn is_source(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext == "jack")
}
