//! Distribution packaging.
//!
//! Assembles `dist/minetest_<arch>` from the run-in-place engine tree, the
//! game checkout, and the LuaRocks systree.

use crate::builder::components::luanti::EXECUTABLE;
use crate::builder::config::Layout;
use crate::error::{Error, Result};
use log::info;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Engine directories shipped as-is.
pub const ENGINE_DIRS: &[&str] = &[
    "builtin",
    "client",
    "clientmods",
    "doc",
    "fonts",
    "games",
    "mods",
    "locale",
    "textures",
];

/// Result of the package phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PackageOutcome {
    Packaged,
    /// Distribution directory already present; left as is.
    Existing,
}

/// Build the distribution directory unless it already exists.
pub fn package(layout: &Layout) -> Result<PackageOutcome> {
    let dist = layout.dist_dir();
    if dist.exists() {
        info!("Distribution already present at {}", dist.display());
        return Ok(PackageOutcome::Existing);
    }

    info!("=== Building distribution ===");
    assemble(layout, &dist).map_err(|source| Error::Package {
        path: dist.clone(),
        source,
    })?;
    info!("  Packaged: {}", dist.display());
    Ok(PackageOutcome::Packaged)
}

fn assemble(layout: &Layout, dist: &Path) -> io::Result<()> {
    let engine = layout.luanti_src();
    let bin = dist.join("bin");
    fs::create_dir_all(dist)?;

    copy_tree(&layout.luanti_release(), &bin)?;
    for dir in ENGINE_DIRS {
        copy_tree(&engine.join(dir), &dist.join(dir))?;
    }
    fs::copy(engine.join("LICENSE.txt"), dist.join("LICENSE.txt"))?;
    remove_if_present(&bin.join(pdb_name()))?;

    let game = dist.join("games").join("minetest_game");
    copy_tree(&layout.game_src(), &game)?;
    let git = game.join(".git");
    if git.is_dir() {
        fs::remove_dir_all(git)?;
    }
    fs::create_dir_all(dist.join("worlds"))?;

    copy_tree(&layout.lua_systree("lib"), &bin)?;
    copy_tree(&layout.lua_systree("share"), &bin.join("lua"))?;
    Ok(())
}

/// Debug symbols next to the executable.
fn pdb_name() -> PathBuf {
    Path::new(EXECUTABLE).with_extension("pdb")
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Recursively copy `src` into `dest`, merging with anything already there.
pub fn copy_tree(src: &Path, dest: &Path) -> io::Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
