//! Build configuration and working-directory layout.

use crate::builder::toolchain::Arch;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Optional pin file read from the working directory.
pub const PIN_FILE: &str = "minetest-builder.json";

/// Settings for one run.
#[derive(Clone, Debug)]
pub struct BuildConfig {
    pub arch: Arch,
    /// Directory everything is fetched into and built under.
    pub root: PathBuf,
    /// Wipe this architecture's build and dist trees first.
    pub force_rebuild: bool,
}

impl BuildConfig {
    pub fn new(arch: Arch, root: impl Into<PathBuf>) -> Self {
        Self {
            arch,
            root: root.into(),
            force_rebuild: false,
        }
    }

    #[must_use]
    pub fn with_force_rebuild(mut self, force: bool) -> Self {
        self.force_rebuild = force;
        self
    }

    pub fn layout(&self) -> Layout {
        Layout::new(&self.root, self.arch)
    }
}

/// Every path the pipeline reads or writes.
#[derive(Clone, Debug)]
pub struct Layout {
    root: PathBuf,
    arch: Arch,
}

impl Layout {
    pub fn new(root: &Path, arch: Arch) -> Self {
        Self {
            root: root.to_path_buf(),
            arch,
        }
    }

    /// `build/<arch>`
    pub fn build_dir(&self) -> PathBuf {
        self.root.join("build").join(self.arch.id())
    }

    pub fn tools_dir(&self) -> PathBuf {
        self.build_dir().join("tools")
    }

    pub fn vcpkg_dir(&self) -> PathBuf {
        self.tools_dir().join("vcpkg")
    }

    pub fn vcpkg_exe(&self) -> PathBuf {
        self.vcpkg_dir().join("vcpkg.exe")
    }

    pub fn luarocks_src(&self) -> PathBuf {
        self.tools_dir().join("luarocks")
    }

    /// Self-contained LuaRocks install for this architecture.
    pub fn luarocks_prefix(&self) -> PathBuf {
        self.tools_dir().join(format!("luarocks_{}", self.arch.id()))
    }

    pub fn luarocks_bat(&self) -> PathBuf {
        self.luarocks_prefix().join("luarocks.bat")
    }

    /// `systree/<kind>/lua/5.1` inside the LuaRocks install.
    pub fn lua_systree(&self, kind: &str) -> PathBuf {
        self.luarocks_prefix()
            .join("systree")
            .join(kind)
            .join("lua")
            .join("5.1")
    }

    pub fn luanti_src(&self) -> PathBuf {
        self.build_dir().join("minetest")
    }

    /// Release output after it has been renamed for this architecture.
    pub fn luanti_release(&self) -> PathBuf {
        self.luanti_src()
            .join("bin")
            .join(format!("Release_{}", self.arch.id()))
    }

    pub fn game_src(&self) -> PathBuf {
        self.build_dir().join("minetest_game")
    }

    pub fn dist_dir(&self) -> PathBuf {
        self.root
            .join("dist")
            .join(format!("minetest_{}", self.arch.id()))
    }

    pub fn pin_file(&self) -> PathBuf {
        self.root.join(PIN_FILE)
    }
}

/// Contents of the pin file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Pins {
    #[serde(default)]
    pub dependencies: BTreeMap<String, PinOverride>,
}

/// Replacement source fields for one dependency.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PinOverride {
    pub url: Option<String>,
    pub revision: Option<String>,
    /// Fetch this archive instead of cloning.
    pub archive: Option<String>,
    pub sha256: Option<String>,
}

impl Pins {
    /// Load the pin file if one exists. A missing file means no overrides.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::parse(&raw).map_err(|reason| Error::Config {
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn parse(raw: &str) -> std::result::Result<Self, String> {
        let pins: Self = serde_json::from_str(raw).map_err(|e| e.to_string())?;
        for (name, pin) in &pins.dependencies {
            if pin.archive.is_none() && pin.sha256.is_some() {
                return Err(format!("{name}: sha256 is only valid with archive"));
            }
        }
        Ok(pins)
    }
}
