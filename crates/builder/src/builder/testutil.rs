//! Fake toolchain for tests.
//!
//! Records every command line and creates the files each real tool would
//! leave behind, so the pipeline can run end to end without git or MSVC.

use crate::builder::archive::Downloader;
use crate::builder::dist::ENGINE_DIRS;
use crate::builder::process::{command_line, program_name, CommandError, Runner};
use crate::error::FetchError;
use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use zip::write::SimpleFileOptions;

#[derive(Default)]
pub struct FakeTools {
    calls: RefCell<Vec<String>>,
    fail_on: Option<String>,
    archives: HashMap<String, Vec<u8>>,
}

impl FakeTools {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the first command whose line contains `needle`.
    #[must_use]
    pub fn fail_on(mut self, needle: &str) -> Self {
        self.fail_on = Some(needle.to_string());
        self
    }

    /// Answer downloads of `url` with `bytes`.
    #[must_use]
    pub fn serve(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.archives.insert(url.to_string(), bytes);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn simulate(cmd: &Command) -> io::Result<()> {
        let args: Vec<&OsStr> = cmd.get_args().collect();
        let cwd = cmd.get_current_dir().map(Path::to_path_buf).unwrap_or_default();
        let arg_after = |flag: &str| {
            args.iter()
                .position(|a| *a == flag)
                .and_then(|i| args.get(i + 1))
                .map(PathBuf::from)
        };

        match program_name(cmd).as_str() {
            "git" => {
                let url = args.len().checked_sub(2).and_then(|i| args.get(i));
                let (Some(url), Some(dest)) = (url, args.last()) else {
                    return Ok(());
                };
                let dest = Path::new(dest);
                fs::create_dir_all(dest)?;
                let url = url.to_string_lossy();
                if url.ends_with("/minetest.git") {
                    for dir in ENGINE_DIRS {
                        touch(&dest.join(dir).join("README.txt"))?;
                    }
                    touch(&dest.join("LICENSE.txt"))?;
                } else if url.ends_with("/minetest_game.git") {
                    touch(&dest.join(".git/HEAD"))?;
                    touch(&dest.join("mods/default/init.lua"))?;
                }
            }
            "bootstrap-vcpkg.bat" => {
                touch(&cwd.join("vcpkg.exe"))?;
                touch(
                    &cwd.join("downloads/tools/cmake-3.30.1-windows/cmake-3.30.1-windows-i386/bin/cmake.exe"),
                )?;
            }
            "vcpkg.exe" => {
                if let Some(triplet) = arg_after("--triplet") {
                    let rel = format!("{}-rel", triplet.display());
                    fs::create_dir_all(cwd.join("buildtrees/sqlite3").join(&rel))?;
                    fs::create_dir_all(cwd.join("buildtrees/luajit").join(&rel).join("src"))?;
                    fs::create_dir_all(cwd.join("buildtrees/luajit/src/v2.1-20240815-1/src"))?;
                }
            }
            "install.bat" => {
                if let Some(prefix) = arg_after("/P") {
                    touch(&prefix.join("luarocks.bat"))?;
                }
            }
            "luarocks.bat" => {
                if args.first().is_some_and(|a| *a == "install") {
                    let prefix = Path::new(cmd.get_program())
                        .parent()
                        .map(Path::to_path_buf)
                        .unwrap_or_default();
                    let systree = prefix.join("systree");
                    touch(&systree.join("lib/lua/5.1/cjson.dll"))?;
                    touch(&systree.join("lib/lua/5.1/socket/core.dll"))?;
                    touch(&systree.join("share/lua/5.1/socket.lua"))?;
                }
            }
            "cmake.exe" | "cmake" => {
                if args.first().is_some_and(|a| *a == "--build") {
                    touch(&cwd.join("bin/Release/luanti.exe"))?;
                    touch(&cwd.join("bin/Release/luanti.pdb"))?;
                } else {
                    touch(&cwd.join("CMakeCache.txt"))?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

impl Runner for FakeTools {
    fn run(&self, cmd: &mut Command) -> Result<(), CommandError> {
        let line = command_line(cmd);
        self.calls.borrow_mut().push(line.clone());

        if self.fail_on.as_deref().is_some_and(|n| line.contains(n)) {
            return Err(CommandError::Failed {
                program: program_name(cmd),
                code: Some(1),
            });
        }

        Self::simulate(cmd).map_err(|source| CommandError::Spawn {
            program: program_name(cmd),
            source,
        })
    }
}

impl Downloader for FakeTools {
    fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let line = format!("GET {url}");
        self.calls.borrow_mut().push(line.clone());

        if self.fail_on.as_deref().is_some_and(|n| line.contains(n)) {
            return Err(io::Error::new(io::ErrorKind::ConnectionRefused, url.to_string()).into());
        }
        self.archives
            .get(url)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, url.to_string()).into())
    }
}

/// A zip whose entries all sit below the directory `top`.
pub fn zip_archive(top: &str, files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    writer.add_directory(format!("{top}/"), options).unwrap();
    for (name, contents) in files {
        writer.start_file(format!("{top}/{name}"), options).unwrap();
        writer.write_all(contents.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Create a file and its parent directories.
pub fn touch(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, b"")
}
