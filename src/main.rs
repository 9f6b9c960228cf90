// src/main.rs
// ============================================================================
// CKPT-DUMP CLI
// ============================================================================
//
// Uso:
//   ckpt-dump \
//       --checkpoint_file ~/ckpt/squeezenet.safetensors \
//       --output_dir ./weights \
//       --remove_variables_regex '^aux_'
//
// ============================================================================

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;

use ckpt_dump::{run_export, ExportConfig};

#[derive(Parser, Debug)]
#[command(name = "ckpt-dump")]
#[command(about = "Dump checkpoint variables to raw weight files plus a JSON manifest")]
#[command(version)]
struct Args {
    /// Path to the model checkpoint (.safetensors file or folder of shards)
    #[arg(long = "checkpoint_file", visible_alias = "checkpoint-file", value_name = "PATH")]
    checkpoint_file: PathBuf,

    /// The output directory where to store the converted weights
    #[arg(long = "output_dir", visible_alias = "output-dir", value_name = "DIR")]
    output_dir: PathBuf,

    /// A regular expression to match against variable names that should not be included
    #[arg(
        long = "remove_variables_regex",
        visible_alias = "remove-variables-regex",
        default_value = "",
        value_name = "REGEX"
    )]
    remove_variables_regex: String,

    /// Verbose output (debug logs)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let start = Instant::now();

    // Errores de configuración: antes de cualquier I/O
    let config = ExportConfig::new(
        &args.checkpoint_file,
        &args.output_dir,
        &args.remove_variables_regex,
    )
    .context("Invalid configuration")?;

    println!("═══════════════════════════════════════════════════════════════");
    println!("  CKPT-DUMP v{}", env!("CARGO_PKG_VERSION"));
    println!("═══════════════════════════════════════════════════════════════");
    println!("  Checkpoint: {}", config.checkpoint_file.display());
    println!("  Output:     {}", config.output_dir.display());
    println!(
        "  Exclude:    {}",
        if args.remove_variables_regex.is_empty() {
            "(none)"
        } else {
            args.remove_variables_regex.as_str()
        }
    );
    println!("═══════════════════════════════════════════════════════════════");

    let outcome = run_export(&config)
        .with_context(|| format!("Failed to export {}", config.checkpoint_file.display()))?;

    println!("Done!");

    let stats = &outcome.stats;
    println!("\n═══════════════════════════════════════════════════════════════");
    println!("  EXPORT COMPLETE");
    println!("═══════════════════════════════════════════════════════════════");
    println!("  Time:        {:.1}s", start.elapsed().as_secs_f64());
    println!("  Variables:   {} ({} after filter)", stats.total_variables, stats.filtered_variables);
    println!("  Written:     {} ({:.1} MB)", stats.written, stats.total_bytes as f64 / 1024.0 / 1024.0);
    println!("  Skipped:     {}", stats.skipped);
    println!("  Manifest:    {} entries", outcome.manifest.len());
    if stats.manifest_overwrites > 0 || stats.filename_collisions > 0 {
        println!(
            "  ⚠ Overwrites: {} manifest keys, {} filename collisions",
            stats.manifest_overwrites, stats.filename_collisions
        );
    }
    println!("  Output:      {}", outcome.manifest_path.display());
    println!("═══════════════════════════════════════════════════════════════");

    Ok(())
}
