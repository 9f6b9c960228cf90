// src/bin/verify.rs
// ============================================================================
// CKPT VERIFY - Audita un directorio exportado por ckpt-dump
// ============================================================================
//
// Uso: verify ./weights [--element-bytes 4]
//
// ============================================================================

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use ckpt_dump::expand_user;
use ckpt_dump::verify::verify_output_dir;

#[derive(Parser)]
#[command(name = "verify")]
#[command(about = "Check that every manifest entry has a weight file of the right size")]
struct Args {
    /// Output directory produced by ckpt-dump
    dir: PathBuf,

    /// Bytes per tensor element (4 for float32)
    #[arg(long, default_value_t = 4)]
    element_bytes: usize,

    /// Show warnings
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let dir = expand_user(&args.dir);
    let report = verify_output_dir(&dir, args.element_bytes)
        .with_context(|| format!("Cannot verify {}", dir.display()))?;

    println!("  Directory: {}", dir.display());
    println!("  Entries:   {}", report.checked);

    for err in &report.errors {
        println!("  ✗ {}", err);
    }
    if args.verbose {
        for warning in &report.warnings {
            println!("  ⚠ {}", warning);
        }
    } else if !report.warnings.is_empty() {
        println!("  ⚠ {} warnings (use -v)", report.warnings.len());
    }

    if report.valid {
        println!("  ✓ VALID");
        Ok(())
    } else {
        println!("  ✗ INVALID ({} errors)", report.errors.len());
        std::process::exit(1);
    }
}
