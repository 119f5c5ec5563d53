//! Component registry - single source of truth for all buildable components.
//!
//! All components implement the [`Buildable`] trait and are registered here.

use super::{luanti::Luanti, luarocks::Luarocks, vcpkg::Vcpkg, Buildable};

/// All registered components.
///
/// Order matters for the build phase: LuaRocks needs vcpkg's LuaJIT, and
/// the engine needs vcpkg's libraries and cmake.
pub static COMPONENTS: &[&dyn Buildable] = &[&Vcpkg, &Luarocks, &Luanti];

/// List all component names.
pub fn names() -> impl Iterator<Item = &'static str> {
    COMPONENTS.iter().map(|c| c.name())
}
