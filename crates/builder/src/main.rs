//! # minetest-builder
//!
//! Compile Luanti for Windows with LuaSocket.
//!
//! Must run in a Visual Studio Developer Command Prompt.
//!
//! ## Usage
//!
//! ```bash
//! minetest-builder x64                  # Fetch, build and package for 64-bit
//! minetest-builder x86 --force-rebuild  # Start the 32-bit build from scratch
//! ```
//!
//! ## Layout
//!
//! - Sources and tools: `build/<arch>/`
//! - Distribution: `dist/minetest_<arch>/`

use anyhow::{Context, Result};
use clap::Parser;
use minetest_builder::{builder, logging, Arch, BuildConfig};

#[derive(Parser)]
#[command(
    name = "minetest-builder",
    version,
    about = "Fetch and compile Luanti with LuaSocket for Windows"
)]
struct Cli {
    /// Target CPU architecture
    #[arg(value_enum)]
    arch: Arch,

    /// Remove this architecture's build and dist directories first
    #[arg(long)]
    force_rebuild: bool,

    /// Show every external command before it runs
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let root = std::env::current_dir().context("Failed to read working directory")?;
    let config = BuildConfig::new(cli.arch, root).with_force_rebuild(cli.force_rebuild);
    builder::build_all(config)?;

    Ok(())
}
