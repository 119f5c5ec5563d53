//! Build system for Luanti on Windows.
//!
//! Structure:
//! - `toolchain` - target architectures and MSVC profiles
//! - `config` - run settings, directory layout, pin file
//! - `vendor` - source fetching (git clones and archives)
//! - `components/` - vcpkg, LuaRocks and engine builders
//! - `dist` - distribution packaging
//! - `orchestration` - the linear pipeline tying it together

pub mod archive;
pub mod components;
pub mod config;
pub mod dist;
pub mod orchestration;
pub mod process;
pub mod toolchain;
pub mod vendor;

#[cfg(test)]
pub(crate) mod testutil;

use crate::error::Result;
use config::BuildConfig;
use log::info;
use orchestration::{Orchestrator, Report};
use process::SystemRunner;

/// Build everything: fetch sources, build components, package the distribution.
pub fn build_all(config: BuildConfig) -> Result<Report> {
    info!("=== Building Luanti for {} ===", config.arch);

    let report = Orchestrator::new(config, &SystemRunner).run()?;

    info!("=== Build complete ===");
    Ok(report)
}
