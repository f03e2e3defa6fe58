use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::Parser;
use log::info;

use crate::error::TranslateError;
use crate::linker::Unit;

mod ast;
mod error;
mod linker;
#[cfg(test)]
mod machine;
mod parser;
mod translator;

/// Translates Hack VM bytecode into Hack assembly.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// A .vm file, or a directory whose .vm files are linked into one program
    input: PathBuf,

    /// Output path; defaults to the input with an .asm extension
    #[arg(short, long)]
    out: Option<PathBuf>,
}

/// The units behind an input path: a single .vm file, or every .vm file of a
/// directory in file-name order so repeated builds emit identical programs.
fn vm_files(input: &Path) -> Result<Vec<PathBuf>, TranslateError> {
    if input.is_file() {
        if input.extension() == Some(OsStr::new("vm")) {
            return Ok(vec![input.to_path_buf()]);
        }
        return Err(TranslateError::NoInput(input.to_path_buf()));
    }

    if input.is_dir() {
        let entries = fs::read_dir(input).map_err(|_| TranslateError::NoInput(input.to_path_buf()))?;
        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension() == Some(OsStr::new("vm")))
            .collect();
        if files.is_empty() {
            return Err(TranslateError::NoInput(input.to_path_buf()));
        }
        files.sort();
        return Ok(files);
    }

    Err(TranslateError::NoInput(input.to_path_buf()))
}

fn load_units(files: &[PathBuf]) -> anyhow::Result<Vec<Unit>> {
    let mut units = Vec::with_capacity(files.len());
    for path in files {
        let name = path
            .file_stem()
            .and_then(OsStr::to_str)
            .ok_or_else(|| TranslateError::NoInput(path.clone()))?
            .to_string();
        let source = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        units.push(Unit { name, source });
    }
    Ok(units)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let files = vm_files(&args.input)?;
    info!("translating {} unit(s) from {}", files.len(), args.input.display());
    let units = load_units(&files)?;

    let program = linker::link(&units)?;

    let out = args.out.unwrap_or_else(|| args.input.with_extension("asm"));
    let mut text = program.join("\n");
    text.push('\n');
    fs::write(&out, text).with_context(|| format!("writing {}", out.display()))?;
    info!("wrote {} lines to {}", program.len(), out.display());

    Ok(())
}
