//! The build pipeline.
//!
//! Strictly linear: `Validate → Fetch → Configure → Build → Package → Done`.
//! The first error moves straight to `Failed` and is returned as is; nothing
//! on disk is rolled back.

use crate::builder::archive::{Downloader, HttpDownloader};
use crate::builder::components::{registry, BuildContext};
use crate::builder::config::{BuildConfig, Pins};
use crate::builder::dist::{self, PackageOutcome};
use crate::builder::process::Runner;
use crate::builder::toolchain::{self, ToolchainProfile};
use crate::builder::vendor::{self, FetchOutcome};
use crate::error::{Error, Result};
use log::{error, info};
use std::ffi::OsString;
use std::fmt;
use std::path::Path;

/// Pipeline stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Validate,
    Fetch,
    Configure,
    Build,
    Package,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validate => "validate",
            Self::Fetch => "fetch",
            Self::Configure => "configure",
            Self::Build => "build",
            Self::Package => "package",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Whether a component was built in this run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildOutcome {
    Built,
    /// Output already present; skipped.
    UpToDate,
}

/// What a successful run did.
#[derive(Debug)]
pub struct Report {
    pub profile: ToolchainProfile,
    pub fetched: Vec<(&'static str, FetchOutcome)>,
    pub built: Vec<(&'static str, BuildOutcome)>,
    pub packaged: PackageOutcome,
    pub elapsed: chrono::Duration,
}

/// Drives one build from validation to a packaged distribution.
pub struct Orchestrator<'a> {
    config: BuildConfig,
    runner: &'a dyn Runner,
    downloader: &'a dyn Downloader,
    env: fn(&str) -> Option<OsString>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(config: BuildConfig, runner: &'a dyn Runner) -> Self {
        Self {
            config,
            runner,
            downloader: &HttpDownloader,
            env: |key| std::env::var_os(key),
        }
    }

    /// Replace the HTTP client used for archive sources.
    #[must_use]
    pub fn with_downloader(mut self, downloader: &'a dyn Downloader) -> Self {
        self.downloader = downloader;
        self
    }

    /// Replace the environment lookup used for the developer prompt check.
    #[must_use]
    pub fn with_env(mut self, env: fn(&str) -> Option<OsString>) -> Self {
        self.env = env;
        self
    }

    pub fn run(&self) -> Result<Report> {
        let started = chrono::Local::now();
        let mut stage = Stage::Validate;

        let result = self.run_stages(&mut stage);
        let elapsed = chrono::Local::now() - started;

        match result {
            Ok(mut report) => {
                info!("That run took {}", format_elapsed(elapsed));
                report.elapsed = elapsed;
                Ok(report)
            }
            Err(e) => {
                error!("Stopped during {stage} stage after {}", format_elapsed(elapsed));
                Err(e)
            }
        }
    }

    fn run_stages(&self, stage: &mut Stage) -> Result<Report> {
        let layout = self.config.layout();

        toolchain::check_developer_env(self.env)?;
        info!("Set CPU architecture to {}", self.config.arch);
        // Bad pins must fail before anything is deleted
        let pins = Pins::load(&layout.pin_file())?;
        let deps = vendor::dependencies(&pins)?;
        if self.config.force_rebuild {
            info!("Forcing rebuild");
            remove_dir(&layout.build_dir())?;
            remove_dir(&layout.dist_dir())?;
        }
        info!("Building into {}", layout.build_dir().display());

        *stage = Stage::Fetch;
        let fetched = vendor::fetch_all(&layout, &deps, self.runner, self.downloader)?;

        *stage = Stage::Configure;
        let profile = self.config.arch.profile();
        info!(
            "Toolchain: {}-bit, {} ({}), triplet {}",
            profile.bits,
            profile.generator(),
            profile.cmake_platform,
            profile.triplet()
        );

        *stage = Stage::Build;
        info!("Components: {}", registry::names().collect::<Vec<_>>().join(", "));
        let ctx = BuildContext {
            layout: &layout,
            profile: &profile,
            runner: self.runner,
        };
        let mut built = Vec::with_capacity(registry::COMPONENTS.len());
        for component in registry::COMPONENTS {
            let outcome = if component.is_built(&ctx) {
                info!("{} already built", component.name());
                BuildOutcome::UpToDate
            } else {
                component.build(&ctx)?;
                BuildOutcome::Built
            };
            built.push((component.name(), outcome));
        }

        *stage = Stage::Package;
        let packaged = dist::package(&layout)?;

        *stage = Stage::Done;
        Ok(Report {
            profile,
            fetched,
            built,
            packaged,
            elapsed: chrono::Duration::zero(),
        })
    }
}

fn remove_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        std::fs::remove_dir_all(path).map_err(|e| Error::io(path, e))?;
    }
    Ok(())
}

fn format_elapsed(elapsed: chrono::Duration) -> String {
    let secs = elapsed.num_seconds().max(0);
    format!("{}h {:02}m {:02}s", secs / 3600, secs / 60 % 60, secs % 60)
}
