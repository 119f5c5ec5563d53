//! LuaRocks: a self-contained install per architecture, used to build
//! LuaSocket and lua-cjson against vcpkg's LuaJIT.

use super::{first_entry, step_error, BuildContext, Buildable};
use crate::error::{BuildError, Result};
use log::info;
use std::path::PathBuf;
use std::process::Command;

/// Rocks shipped next to the engine.
pub const ROCKS: &[&str] = &["luasocket", "lua-cjson"];

/// LuaRocks component.
pub struct Luarocks;

impl Luarocks {
    /// Native modules that must exist once the rocks are installed.
    fn modules(ctx: &BuildContext<'_>) -> [PathBuf; 2] {
        let lib = ctx.layout.lua_systree("lib");
        [lib.join("cjson.dll"), lib.join("socket").join("core.dll")]
    }

    fn install(&self, ctx: &BuildContext<'_>) -> Result<()> {
        let vcpkg = ctx.layout.vcpkg_dir();
        let luajit = vcpkg.join("buildtrees").join("luajit");
        let lua_dir = luajit.join(ctx.profile.release_tree()).join("src");
        let include = first_entry(&luajit.join("src"), |_| true)
            .map(|p| p.join("src"))
            .ok_or_else(|| {
                step_error(
                    self.name(),
                    "install",
                    BuildError::Missing(luajit.join("src")),
                )
            })?;

        let src = ctx.layout.luarocks_src();
        ctx.run(
            self.name(),
            "install",
            &src,
            Command::new(src.join("install.bat"))
                .args(["/SELFCONTAINED", "/NOREG", "/NOADMIN", "/Q", "/P"])
                .arg(ctx.layout.luarocks_prefix())
                .arg("/LUA")
                .arg(lua_dir)
                .arg("/INC")
                .arg(include),
        )
    }

    fn install_rocks(&self, ctx: &BuildContext<'_>) -> Result<()> {
        let luarocks = ctx.layout.luarocks_bat();
        let prefix = ctx.layout.luarocks_prefix();
        let installed = ctx.layout.vcpkg_dir().join("installed").join(ctx.profile.triplet());

        info!("  Configuring LuaJIT paths");
        let settings = [
            ("variables.LUA_LIBDIR", installed.join("lib")),
            (
                "variables.LUA_INCDIR",
                installed.join("include").join("luajit"),
            ),
            ("variables.MSVC", PathBuf::from("1")),
        ];
        for (key, value) in settings {
            ctx.run(
                self.name(),
                &format!("config {key}"),
                &prefix,
                Command::new(&luarocks).args(["config", key]).arg(value),
            )?;
        }

        for rock in ROCKS {
            info!("  Installing {rock}");
            ctx.run(
                self.name(),
                &format!("install {rock}"),
                &prefix,
                Command::new(&luarocks).args(["install", *rock]),
            )?;
        }
        Ok(())
    }
}

impl Buildable for Luarocks {
    fn name(&self) -> &'static str {
        "luarocks"
    }

    fn is_built(&self, ctx: &BuildContext<'_>) -> bool {
        ctx.layout.luarocks_bat().is_file() && Self::modules(ctx).iter().all(|m| m.is_file())
    }

    fn build(&self, ctx: &BuildContext<'_>) -> Result<()> {
        info!("=== Building luarocks ===");

        if ctx.layout.luarocks_bat().is_file() {
            info!("  Found installed luarocks");
        } else {
            info!("  Installing to {}", ctx.layout.luarocks_prefix().display());
            self.install(ctx)?;
        }

        if Self::modules(ctx).iter().all(|m| m.is_file()) {
            info!("  Found {}", ROCKS.join(" and "));
        } else {
            self.install_rocks(ctx)?;
        }
        Ok(())
    }
}
