//! Target architectures and the MSVC toolchain profile for each.

use crate::error::{Error, Result};
use clap::ValueEnum;
use std::ffi::OsString;
use std::fmt;

/// Variables a Visual Studio Developer Command Prompt always sets.
pub const DEVELOPER_ENV_VARS: &[&str] = &[
    "VSINSTALLDIR",
    "VCINSTALLDIR",
    "DevEnvDir",
    "INCLUDE",
    "LIB",
    "LIBPATH",
];

/// cmake generator for the supported Visual Studio release.
const GENERATOR: &str = "Visual Studio 16 2019";

/// Target CPU architecture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum)]
pub enum Arch {
    /// 32-bit x86
    #[value(name = "x86")]
    X86,
    /// 64-bit x86-64
    #[value(name = "x64")]
    X64,
}

impl Arch {
    /// Identifier used in directory names and vcpkg triplets.
    pub fn id(self) -> &'static str {
        match self {
            Self::X86 => "x86",
            Self::X64 => "x64",
        }
    }

    /// Toolchain settings for this architecture.
    pub fn profile(self) -> ToolchainProfile {
        match self {
            Self::X86 => ToolchainProfile {
                arch: self,
                bits: 32,
                cmake_platform: "Win32",
            },
            Self::X64 => ToolchainProfile {
                arch: self,
                bits: 64,
                cmake_platform: "x64",
            },
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// How the toolchain is driven for one architecture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ToolchainProfile {
    pub arch: Arch,
    pub bits: u8,
    /// Value for cmake's `-A` platform switch.
    pub cmake_platform: &'static str,
}

impl ToolchainProfile {
    pub fn generator(&self) -> &'static str {
        GENERATOR
    }

    /// vcpkg target triplet, e.g. `x64-windows`.
    pub fn triplet(&self) -> String {
        format!("{}-windows", self.arch.id())
    }

    /// Name of vcpkg's release build tree for a port.
    pub fn release_tree(&self) -> String {
        format!("{}-rel", self.triplet())
    }
}

/// Check that the developer environment variables are present.
///
/// Only reads the environment through `lookup`; never touches the filesystem.
pub fn check_developer_env(lookup: fn(&str) -> Option<OsString>) -> Result<()> {
    let missing: Vec<String> = DEVELOPER_ENV_VARS
        .iter()
        .filter(|var| lookup(var).is_none())
        .map(|var| (*var).to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::Toolchain { missing })
    }
}
