//! Buildable components.
//!
//! Each module drives the toolchain for one fetched source tree.

pub mod luanti;
pub mod luarocks;
pub mod registry;
pub mod vcpkg;

use crate::builder::config::Layout;
use crate::builder::process::Runner;
use crate::builder::toolchain::ToolchainProfile;
use crate::error::{BuildError, Error, Result};
use std::path::Path;
use std::process::Command;

/// Everything a component needs to build.
pub struct BuildContext<'a> {
    pub layout: &'a Layout,
    pub profile: &'a ToolchainProfile,
    pub runner: &'a dyn Runner,
}

/// A component built from a fetched source tree.
pub trait Buildable: Sync {
    fn name(&self) -> &'static str;

    /// Whether the component's final output already exists.
    fn is_built(&self, ctx: &BuildContext<'_>) -> bool;

    fn build(&self, ctx: &BuildContext<'_>) -> Result<()>;
}

impl BuildContext<'_> {
    /// Run one toolchain step in `dir`, attributing failure to `component`.
    pub fn run(
        &self,
        component: &'static str,
        step: &str,
        dir: &Path,
        cmd: &mut Command,
    ) -> Result<()> {
        self.runner
            .run(cmd.current_dir(dir))
            .map_err(|e| step_error(component, step, e.into()))
    }
}

pub(crate) fn step_error(component: &'static str, step: &str, source: BuildError) -> Error {
    Error::Build {
        component,
        step: step.to_string(),
        source,
    }
}

/// First entry of a directory in name order, if any.
pub(crate) fn first_entry(dir: &Path, pred: impl Fn(&str) -> bool) -> Option<std::path::PathBuf> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(std::result::Result::ok)
        .filter(|e| pred(&e.file_name().to_string_lossy()))
        .map(|e| e.path())
        .collect();
    entries.sort();
    entries.into_iter().next()
}
