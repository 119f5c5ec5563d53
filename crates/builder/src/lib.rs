//! Fetch and compile Luanti (Minetest) with LuaSocket and lua-cjson for
//! Windows, then package a run-in-place distribution.

pub mod builder;
pub mod error;
pub mod logging;

pub use builder::config::BuildConfig;
pub use builder::toolchain::Arch;
pub use error::{Error, Result};
