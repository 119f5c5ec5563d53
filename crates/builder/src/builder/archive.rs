//! Archive sources: download, verify, unpack.
//!
//! Unpacking happens in a staging directory next to the destination, which
//! is renamed into place only once every entry has been written. A failed
//! fetch never leaves a directory that a later run would mistake for a
//! finished one.

use crate::error::FetchError;
use flate2::read::GzDecoder;
use log::{debug, info, warn};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};

type Result<T> = std::result::Result<T, FetchError>;

/// Retrieves the raw bytes behind an archive URL.
pub trait Downloader {
    fn download(&self, url: &str) -> Result<Vec<u8>>;
}

/// Blocking HTTP(S) downloads.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpDownloader;

impl Downloader for HttpDownloader {
    fn download(&self, url: &str) -> Result<Vec<u8>> {
        info!("Downloading {url}");
        let response = reqwest::blocking::get(url)?.error_for_status()?;
        Ok(response.bytes()?.to_vec())
    }
}

/// Archive formats, picked from the file name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Zip,
    TarGz,
    Tar,
}

impl Format {
    pub fn from_name(name: &str) -> Result<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".zip") {
            Ok(Self::Zip)
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Ok(Self::TarGz)
        } else if lower.ends_with(".tar") {
            Ok(Self::Tar)
        } else {
            Err(FetchError::UnsupportedArchive(name.to_string()))
        }
    }
}

/// Download `url`, check it against `sha256` if given, and unpack it into `dest`.
pub fn fetch(
    downloader: &dyn Downloader,
    url: &str,
    sha256: Option<&str>,
    dest: &Path,
) -> Result<()> {
    let format = Format::from_name(url)?;
    let bytes = downloader.download(url)?;

    if let Some(expected) = sha256 {
        verify(&bytes, expected)?;
        debug!("Checksum verified: {expected}");
    }

    unpack_as(format, &bytes, dest)
}

fn verify(bytes: &[u8], expected: &str) -> Result<()> {
    let actual = hex::encode(Sha256::digest(bytes));
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(FetchError::ChecksumMismatch {
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}

/// Unpack an archive, choosing the format from the name.
///
/// The archive's single top-level directory is stripped, so `dest` ends up
/// holding the source tree directly. `dest` must not exist yet.
pub fn unpack(name: &str, bytes: &[u8], dest: &Path) -> Result<()> {
    unpack_as(Format::from_name(name)?, bytes, dest)
}

fn unpack_as(format: Format, bytes: &[u8], dest: &Path) -> Result<()> {
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    // Removed on drop if anything below fails
    let staging = tempfile::Builder::new()
        .prefix(".unpack-")
        .tempdir_in(parent)?;

    match format {
        Format::Zip => unpack_zip(bytes, staging.path())?,
        Format::TarGz => unpack_tar(GzDecoder::new(bytes), staging.path())?,
        Format::Tar => unpack_tar(bytes, staging.path())?,
    }

    fs::rename(staging.path(), dest)?;
    info!("Unpacked to {}", dest.display());
    Ok(())
}

/// Entry path below the archive's top-level directory.
///
/// `None` for the top-level directory itself. Absolute paths and `..`
/// anywhere are rejected.
fn relative_entry(path: &Path) -> Result<Option<PathBuf>> {
    let mut parts = path.components().filter(|c| *c != Component::CurDir);
    let unsafe_entry = || FetchError::UnsafeEntry(path.to_path_buf());

    match parts.next() {
        Some(Component::Normal(_)) => {}
        None => return Ok(None),
        Some(_) => return Err(unsafe_entry()),
    }

    let mut stripped = PathBuf::new();
    for part in parts {
        match part {
            Component::Normal(name) => stripped.push(name),
            _ => return Err(unsafe_entry()),
        }
    }
    Ok((!stripped.as_os_str().is_empty()).then_some(stripped))
}

fn unpack_zip(bytes: &[u8], dest: &Path) -> Result<()> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(path) = entry.enclosed_name() else {
            return Err(FetchError::UnsafeEntry(PathBuf::from(entry.name())));
        };
        let Some(stripped) = relative_entry(&path)? else {
            continue;
        };
        let dest_path = dest.join(stripped);

        if entry.is_dir() {
            fs::create_dir_all(&dest_path)?;
            continue;
        }
        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&dest_path)?;
        std::io::copy(&mut entry, &mut out)?;
    }

    Ok(())
}

fn unpack_tar<R: Read>(reader: R, dest: &Path) -> Result<()> {
    let mut archive = tar::Archive::new(reader);

    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();
        let Some(stripped) = relative_entry(&path)? else {
            continue;
        };

        match entry.header().entry_type() {
            tar::EntryType::Link => {
                warn!("Skipping hard link {}", path.display());
                continue;
            }
            tar::EntryType::Symlink => {
                let target = entry.link_name()?.map(|t| t.into_owned()).unwrap_or_default();
                let escapes = target
                    .components()
                    .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
                if escapes {
                    return Err(FetchError::UnsafeEntry(path));
                }
            }
            _ => {}
        }

        let dest_path = dest.join(stripped);
        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent)?;
        }
        entry.unpack(&dest_path)?;
    }

    Ok(())
}
