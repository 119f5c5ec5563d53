//! vcpkg: bootstraps itself, then builds the engine's native dependencies.

use super::{BuildContext, Buildable};
use crate::error::Result;
use log::info;
use std::path::PathBuf;
use std::process::Command;

/// Ports the engine links against.
pub const PACKAGES: &[&str] = &[
    "zlib",
    "zstd",
    "curl[winssl]",
    "openal-soft",
    "libvorbis",
    "libogg",
    "libjpeg-turbo",
    "sqlite3",
    "freetype",
    "luajit",
    "gmp",
    "jsoncpp",
    "gettext[tools]",
    "sdl2",
    "opengl",
    "opengl-registry",
];

/// vcpkg component.
pub struct Vcpkg;

impl Vcpkg {
    /// Release build tree of sqlite3; present once `vcpkg install` has finished.
    fn marker(ctx: &BuildContext<'_>) -> PathBuf {
        ctx.layout
            .vcpkg_dir()
            .join("buildtrees")
            .join("sqlite3")
            .join(ctx.profile.release_tree())
    }
}

impl Buildable for Vcpkg {
    fn name(&self) -> &'static str {
        "vcpkg"
    }

    fn is_built(&self, ctx: &BuildContext<'_>) -> bool {
        ctx.layout.vcpkg_exe().is_file() && Self::marker(ctx).is_dir()
    }

    fn build(&self, ctx: &BuildContext<'_>) -> Result<()> {
        info!("=== Building vcpkg ===");
        let dir = ctx.layout.vcpkg_dir();

        if ctx.layout.vcpkg_exe().is_file() {
            info!("  vcpkg executable found");
        } else {
            info!("  Bootstrapping vcpkg");
            ctx.run(
                self.name(),
                "bootstrap",
                &dir,
                Command::new(dir.join("bootstrap-vcpkg.bat")).arg("-disableMetrics"),
            )?;
        }

        if Self::marker(ctx).is_dir() {
            info!("  Native dependencies already compiled");
        } else {
            info!("  Compiling native dependencies for {}", ctx.profile.triplet());
            ctx.run(
                self.name(),
                "install",
                &dir,
                Command::new(ctx.layout.vcpkg_exe())
                    .arg("install")
                    .args(PACKAGES)
                    .args(["--triplet", ctx.profile.triplet().as_str(), "--no-binarycaching"]),
            )?;
        }

        Ok(())
    }
}
