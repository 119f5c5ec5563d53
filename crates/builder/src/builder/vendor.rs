//! Source fetching.
//!
//! The dependency list is fixed; a pin file may only change where each
//! entry comes from, never which entries exist or their order.

use crate::builder::archive::{self, Downloader};
use crate::builder::config::{Layout, Pins};
use crate::builder::process::Runner;
use crate::error::{Error, FetchError, Result};
use log::info;
use std::path::PathBuf;
use std::process::Command;

/// Source definitions: (name, directory under `build/<arch>`, git url, branch/tag).
///
/// Order matters: the fetch phase walks this list front to back.
pub const SOURCES: &[(&str, &str, &str, &str)] = &[
    (
        "vcpkg",
        "tools/vcpkg",
        "https://github.com/microsoft/vcpkg.git",
        "master",
    ),
    (
        "luarocks",
        "tools/luarocks",
        "https://github.com/luarocks/luarocks.git",
        "master",
    ),
    (
        "minetest",
        "minetest",
        "https://github.com/minetest/minetest.git",
        "stable-5",
    ),
    (
        "minetest_game",
        "minetest_game",
        "https://github.com/minetest/minetest_game.git",
        "stable-5",
    ),
];

/// Where a dependency's source tree comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Source {
    /// Clone a single branch or tag.
    Git { url: String, revision: String },
    /// Download and unpack.
    Archive { url: String, sha256: Option<String> },
}

/// One entry of the dependency list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dependency {
    pub name: &'static str,
    /// Destination relative to `build/<arch>`.
    pub subdir: &'static str,
    pub source: Source,
}

/// Result of fetching one dependency.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    Fetched,
    /// Directory already present; left as is.
    Cached,
}

/// The dependency list with the pin file applied.
pub fn dependencies(pins: &Pins) -> Result<Vec<Dependency>> {
    if let Some(unknown) = pins
        .dependencies
        .keys()
        .find(|name| find_source(name).is_none())
    {
        return Err(Error::Config {
            path: PathBuf::from(crate::builder::config::PIN_FILE),
            reason: format!("unknown dependency `{unknown}`"),
        });
    }

    Ok(SOURCES
        .iter()
        .map(|&(name, subdir, url, revision)| {
            let source = match pins.dependencies.get(name) {
                Some(pin) => match &pin.archive {
                    Some(archive) => Source::Archive {
                        url: archive.clone(),
                        sha256: pin.sha256.clone(),
                    },
                    None => Source::Git {
                        url: pin.url.clone().unwrap_or_else(|| url.to_string()),
                        revision: pin
                            .revision
                            .clone()
                            .unwrap_or_else(|| revision.to_string()),
                    },
                },
                None => Source::Git {
                    url: url.to_string(),
                    revision: revision.to_string(),
                },
            };
            Dependency {
                name,
                subdir,
                source,
            }
        })
        .collect())
}

/// Find source definition by name.
pub fn find_source(name: &str) -> Option<(&'static str, &'static str, &'static str, &'static str)> {
    SOURCES.iter().find(|(n, _, _, _)| *n == name).copied()
}

/// Directory a dependency is fetched into.
pub fn dest(layout: &Layout, dep: &Dependency) -> PathBuf {
    layout.build_dir().join(dep.subdir)
}

/// Fetch a single dependency unless its directory already exists.
pub fn fetch(
    layout: &Layout,
    dep: &Dependency,
    runner: &dyn Runner,
    downloader: &dyn Downloader,
) -> Result<FetchOutcome> {
    let dest = dest(layout, dep);

    if dest.exists() {
        info!("{} already present at {}", dep.name, dest.display());
        return Ok(FetchOutcome::Cached);
    }

    let fail = |source: FetchError| Error::Fetch {
        name: dep.name.to_string(),
        source,
    };

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| fail(e.into()))?;
    }

    match &dep.source {
        Source::Git { url, revision } => {
            info!("Fetching {} from {url} @ {revision}", dep.name);
            runner
                .run(Command::new("git").args(clone_args(url, revision)).arg(&dest))
                .map_err(|e| fail(e.into()))?;
        }
        Source::Archive { url, sha256 } => {
            info!("Fetching {} from {url}", dep.name);
            archive::fetch(downloader, url, sha256.as_deref(), &dest).map_err(fail)?;
        }
    }

    Ok(FetchOutcome::Fetched)
}

fn clone_args<'a>(url: &'a str, revision: &'a str) -> [&'a str; 7] {
    [
        "clone",
        "--single-branch",
        "--branch",
        revision,
        "-c",
        "advice.detachedHead=false",
        url,
    ]
}

/// Fetch every dependency in order, stopping at the first failure.
pub fn fetch_all(
    layout: &Layout,
    deps: &[Dependency],
    runner: &dyn Runner,
    downloader: &dyn Downloader,
) -> Result<Vec<(&'static str, FetchOutcome)>> {
    info!("=== Fetching sources ===");
    let mut fetched = Vec::with_capacity(deps.len());
    for dep in deps {
        fetched.push((dep.name, fetch(layout, dep, runner, downloader)?));
    }
    Ok(fetched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::testutil::{zip_archive, FakeTools};
    use crate::error::FetchError;
    use crate::builder::toolchain::Arch;
    use tempfile::TempDir;

    #[test]
    fn test_default_order() {
        let deps = dependencies(&Pins::default()).unwrap();
        let names: Vec<_> = deps.iter().map(|d| d.name).collect();
        assert_eq!(names, ["vcpkg", "luarocks", "minetest", "minetest_game"]);
    }

    #[test]
    fn test_pins_override_revision_and_source() {
        let pins = Pins::parse(
            r#"{ "dependencies": {
                "minetest": { "revision": "5.10.0" },
                "minetest_game": { "archive": "https://example.invalid/game.zip" }
            } }"#,
        )
        .unwrap();
        let deps = dependencies(&pins).unwrap();

        assert_eq!(
            deps[2].source,
            Source::Git {
                url: "https://github.com/minetest/minetest.git".to_string(),
                revision: "5.10.0".to_string(),
            }
        );
        assert_eq!(
            deps[3].source,
            Source::Archive {
                url: "https://example.invalid/game.zip".to_string(),
                sha256: None,
            }
        );
    }

    #[test]
    fn test_unknown_pin_is_rejected() {
        let pins = Pins::parse(r#"{ "dependencies": { "irrlicht": {} } }"#).unwrap();
        assert!(matches!(dependencies(&pins), Err(Error::Config { .. })));
    }

    #[test]
    fn test_clone_command() {
        let tmp = TempDir::new().unwrap();
        let layout = Layout::new(tmp.path(), Arch::X64);
        let deps = dependencies(&Pins::default()).unwrap();
        let tools = FakeTools::new();

        fetch(&layout, &deps[2], &tools, &tools).unwrap();

        let calls = tools.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].starts_with(
            "git clone --single-branch --branch stable-5 -c advice.detachedHead=false \
             https://github.com/minetest/minetest.git"
        ));
        assert!(tmp.path().join("build/x64/minetest").is_dir());
    }

    #[test]
    fn test_existing_directory_is_not_refetched() {
        let tmp = TempDir::new().unwrap();
        let layout = Layout::new(tmp.path(), Arch::X86);
        let deps = dependencies(&Pins::default()).unwrap();
        std::fs::create_dir_all(tmp.path().join("build/x86/tools/vcpkg")).unwrap();
        let tools = FakeTools::new();

        assert_eq!(
            fetch(&layout, &deps[0], &tools, &tools).unwrap(),
            FetchOutcome::Cached
        );
        assert!(tools.calls().is_empty());
    }

    #[test]
    fn test_failure_stops_later_fetches() {
        let tmp = TempDir::new().unwrap();
        let layout = Layout::new(tmp.path(), Arch::X64);
        let deps = dependencies(&Pins::default()).unwrap();
        let tools = FakeTools::new().fail_on("luarocks.git");

        let err = fetch_all(&layout, &deps, &tools, &tools).unwrap_err();

        assert!(matches!(err, Error::Fetch { ref name, .. } if name == "luarocks"));
        let calls = tools.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|c| !c.contains("minetest")));
        assert!(!tmp.path().join("build/x64/minetest").exists());
        assert!(!tmp.path().join("build/x64/minetest_game").exists());
    }

    fn archive_pins(sha256: Option<&str>) -> Pins {
        let checksum = sha256.map(|s| format!(r#", "sha256": "{s}""#)).unwrap_or_default();
        Pins::parse(&format!(
            r#"{{ "dependencies": {{ "minetest": {{
                "archive": "https://example.invalid/minetest-5.10.0.zip"{checksum}
            }} }} }}"#
        ))
        .unwrap()
    }

    fn engine_zip() -> Vec<u8> {
        zip_archive("minetest-5.10.0", &[("LICENSE.txt", "LGPL")])
    }

    #[test]
    fn test_pinned_archive_is_unpacked() {
        let tmp = TempDir::new().unwrap();
        let layout = Layout::new(tmp.path(), Arch::X64);
        let bytes = engine_zip();
        let sha256 = hex::encode(<sha2::Sha256 as sha2::Digest>::digest(&bytes));
        let deps = dependencies(&archive_pins(Some(&sha256))).unwrap();
        let tools = FakeTools::new().serve("https://example.invalid/minetest-5.10.0.zip", bytes);

        let fetched = fetch_all(&layout, &deps, &tools, &tools).unwrap();

        assert!(fetched.iter().all(|(_, o)| *o == FetchOutcome::Fetched));
        assert!(tmp.path().join("build/x64/minetest/LICENSE.txt").is_file());
        assert_eq!(tools.calls()[2], "GET https://example.invalid/minetest-5.10.0.zip");
        assert!(tools.calls()[3].contains("minetest_game.git"));
    }

    #[test]
    fn test_checksum_mismatch_stops_later_fetches() {
        let tmp = TempDir::new().unwrap();
        let layout = Layout::new(tmp.path(), Arch::X64);
        let deps = dependencies(&archive_pins(Some(&"0".repeat(64)))).unwrap();
        let tools =
            FakeTools::new().serve("https://example.invalid/minetest-5.10.0.zip", engine_zip());

        let err = fetch_all(&layout, &deps, &tools, &tools).unwrap_err();

        assert!(matches!(
            err,
            Error::Fetch {
                ref name,
                source: FetchError::ChecksumMismatch { .. },
            } if name == "minetest"
        ));
        let calls = tools.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|c| !c.contains("minetest_game")));
        assert!(!tmp.path().join("build/x64/minetest").exists());
        assert!(!tmp.path().join("build/x64/minetest_game").exists());
    }

    #[test]
    fn test_failed_archive_is_fetched_again() {
        let tmp = TempDir::new().unwrap();
        let layout = Layout::new(tmp.path(), Arch::X64);
        let url = "https://example.invalid/minetest-5.10.0.zip";
        let deps = dependencies(&archive_pins(None)).unwrap();

        let broken = FakeTools::new().serve(url, b"not a zip".to_vec());
        let err = fetch(&layout, &deps[2], &broken, &broken).unwrap_err();
        assert!(matches!(err, Error::Fetch { source: FetchError::Zip(_), .. }));
        assert!(!tmp.path().join("build/x64/minetest").exists());

        let tools = FakeTools::new().serve(url, engine_zip());
        assert_eq!(
            fetch(&layout, &deps[2], &tools, &tools).unwrap(),
            FetchOutcome::Fetched
        );
        assert!(tmp.path().join("build/x64/minetest/LICENSE.txt").is_file());
    }
}
