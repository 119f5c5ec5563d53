//! Luanti engine builder (cmake + MSVC, run-in-place layout).

use super::{first_entry, step_error, BuildContext, Buildable};
use crate::error::{BuildError, Result};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Engine executable name inside the release directory.
pub const EXECUTABLE: &str = "luanti.exe";

/// Luanti component.
pub struct Luanti;

/// cmake bundled with vcpkg, falling back to the one on `PATH`.
fn find_cmake(vcpkg: &Path) -> PathBuf {
    let tools = vcpkg.join("downloads").join("tools");
    let bundled = first_entry(&tools, |n| n.contains("cmake"))
        .and_then(|dir| first_entry(&dir, |_| true))
        .map(|dir| dir.join("bin").join("cmake.exe"))
        .filter(|p| p.is_file());

    bundled.unwrap_or_else(|| {
        warn!("  No cmake in {}, using cmake from PATH", tools.display());
        PathBuf::from("cmake")
    })
}

/// Remove a previous configure run so cmake starts clean.
fn clear_cmake_cache(src: &Path) -> std::io::Result<()> {
    let files = src.join("CMakeFiles");
    if files.is_dir() {
        std::fs::remove_dir_all(files)?;
    }
    let cache = src.join("CMakeCache.txt");
    if cache.is_file() {
        std::fs::remove_file(cache)?;
    }
    Ok(())
}

fn configure_args(ctx: &BuildContext<'_>) -> Vec<String> {
    let tools = ctx.layout.tools_dir();
    let toolchain_file = tools
        .join("vcpkg")
        .join("scripts")
        .join("buildsystems")
        .join("vcpkg.cmake");
    let iconv_dll = tools
        .join("vcpkg")
        .join("buildtrees")
        .join("libiconv")
        .join(ctx.profile.release_tree())
        .join("libiconv.dll");

    vec![
        ".".to_string(),
        "-G".to_string(),
        ctx.profile.generator().to_string(),
        "-A".to_string(),
        ctx.profile.cmake_platform.to_string(),
        format!("-DCMAKE_TOOLCHAIN_FILE={}", toolchain_file.display()),
        "-DCMAKE_BUILD_TYPE=Release".to_string(),
        "-DENABLE_GETTEXT=1".to_string(),
        format!("-DGETTEXT_ICONV_DLL={}", iconv_dll.display()),
        "-DENABLE_CURSES=0".to_string(),
        "-DRUN_IN_PLACE=TRUE".to_string(),
    ]
}

impl Buildable for Luanti {
    fn name(&self) -> &'static str {
        "luanti"
    }

    fn is_built(&self, ctx: &BuildContext<'_>) -> bool {
        ctx.layout.luanti_release().join(EXECUTABLE).is_file()
    }

    fn build(&self, ctx: &BuildContext<'_>) -> Result<()> {
        info!("=== Building Luanti ({}) ===", ctx.profile.cmake_platform);

        let src = ctx.layout.luanti_src();
        let cmake = find_cmake(&ctx.layout.vcpkg_dir());

        clear_cmake_cache(&src).map_err(|e| step_error(self.name(), "configure", e.into()))?;

        ctx.run(
            self.name(),
            "configure",
            &src,
            Command::new(&cmake).args(configure_args(ctx)),
        )?;
        ctx.run(
            self.name(),
            "build",
            &src,
            Command::new(&cmake).args(["--build", ".", "--config", "Release"]),
        )?;

        // Keep per-architecture output apart in case both get built
        let built = src.join("bin").join("Release");
        if !built.is_dir() {
            return Err(step_error(self.name(), "build", BuildError::Missing(built)));
        }
        let release = ctx.layout.luanti_release();
        std::fs::rename(&built, &release)
            .map_err(|e| step_error(self.name(), "rename output", e.into()))?;

        info!("  Built: {}", release.join(EXECUTABLE).display());
        Ok(())
    }
}
