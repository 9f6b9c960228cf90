// src/bin/merge_dirs.rs
// ============================================================================
// MERGE DIRS - Fusiona directorios de muestras sin pisar nombres
// ============================================================================
//
// Uso: merge_dirs ./new_samples ./dataset
//
// ============================================================================

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use ckpt_dump::expand_user;
use ckpt_dump::merge::merge_dirs;

#[derive(Parser)]
#[command(name = "merge_dirs")]
#[command(about = "Move all files in immediate subdirectories of src into the same \
directory in dst, while removing possible naming conflicts. Assumes that filenames \
have a number right before the file extension. Ignores hidden files.")]
struct Args {
    src: PathBuf,
    dst: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let src = expand_user(&args.src);
    let dst = expand_user(&args.dst);

    let moves = merge_dirs(&src, &dst)
        .with_context(|| format!("Failed to merge {} into {}", src.display(), dst.display()))?;

    log::debug!("{} entries moved", moves.len());
    Ok(())
}
