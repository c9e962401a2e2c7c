//! Load archives: the zip handed to the staging host, holding the manifest and the data.

use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};

use tracing::{error, info};
use zip::result::{ZipError, ZipResult};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{Result, SliError};
use crate::manifest::{csv_entry_name, DatasetManifest, MANIFEST_ENTRY};

const PACKAGE_SUFFIX: &str = ".data.zip";
const ENTRY_CAPACITY_HINT: u64 = 1 << 20;

/// A packaged load, written to disk. Deleting `file_path` is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadArchive {
    pub manifest_json: Vec<u8>,
    pub csv_payload: Vec<u8>,
    pub file_path: PathBuf,
}

impl LoadArchive {
    /// Read a package back from disk. Both entries must be present.
    pub fn open(path: &Path, dataset: &str) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| SliError::packaging(path, "cannot open archive", e))?;
        let mut archive = ZipArchive::new(file)
            .map_err(|e| SliError::packaging(path, "not a zip archive", e))?;

        let mut required = |name: &str| -> Result<Vec<u8>> {
            read_entry(&mut archive, name)
                .map_err(|e| SliError::packaging(path, format!("cannot read {name}"), e))?
                .ok_or_else(|| SliError::Packaging {
                    path: path.to_path_buf(),
                    message: format!("archive has no {name}"),
                    source: None,
                })
        };
        let manifest_json = required(MANIFEST_ENTRY)?;
        let csv_payload = required(&csv_entry_name(dataset))?;

        Ok(Self {
            manifest_json,
            csv_payload,
            file_path: path.to_path_buf(),
        })
    }
}

/// Writes load archives next to the template they were derived from.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadPackager;

impl LoadPackager {
    /// Package `manifest` and `csv_text` into `<template path>.data.zip`.
    pub fn build(&self, manifest: &DatasetManifest, csv_text: &str) -> Result<LoadArchive> {
        let manifest_json = manifest.to_json()?;
        let path = package_path(&manifest.template_path);

        let file = File::create(&path).map_err(|e| {
            error!(path = %path.display(), error = %e, "Cannot open load archive for writing");
            SliError::packaging(&path, "cannot open archive for writing", e)
        })?;

        write_package(
            file,
            &[
                (MANIFEST_ENTRY, manifest_json.as_bytes()),
                (manifest.csv_entry_name().as_str(), csv_text.as_bytes()),
            ],
        )
        .map_err(|e| {
            error!(path = %path.display(), error = %e, "Cannot write load archive");
            SliError::packaging(&path, "cannot write archive", e)
        })?;

        info!(
            dataset = %manifest.dataset_id,
            path = %path.display(),
            csv_bytes = csv_text.len(),
            "Load archive packaged"
        );
        Ok(LoadArchive {
            manifest_json: manifest_json.into_bytes(),
            csv_payload: csv_text.as_bytes().to_vec(),
            file_path: path,
        })
    }
}

pub fn package_path(template_path: &Path) -> PathBuf {
    let mut name = template_path.as_os_str().to_owned();
    name.push(PACKAGE_SUFFIX);
    PathBuf::from(name)
}

/// Contents of the entry `name`, or `None` if the archive has no such entry.
pub(crate) fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> ZipResult<Option<Vec<u8>>> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e),
    };
    // The declared size comes from the archive header and is not trusted.
    let mut content = Vec::with_capacity(entry.size().min(ENTRY_CAPACITY_HINT) as usize);
    entry.read_to_end(&mut content)?;
    Ok(Some(content))
}

fn write_package<W: Write + Seek>(sink: W, entries: &[(&str, &[u8])]) -> ZipResult<()> {
    let mut writer = ZipWriter::new(sink);
    for (name, content) in entries {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        writer.start_file(*name, options)?;
        writer.write_all(content)?;
    }
    writer.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn read_entry_returns_content_or_none() {
        let mut buffer = Cursor::new(Vec::new());
        let payload = vec![b'x'; (ENTRY_CAPACITY_HINT as usize) + 17];
        write_package(&mut buffer, &[("big.csv", payload.as_slice()), ("small.json", &b"{}"[..])]).unwrap();

        let mut archive = ZipArchive::new(buffer).unwrap();
        assert_eq!(read_entry(&mut archive, "big.csv").unwrap(), Some(payload));
        assert_eq!(read_entry(&mut archive, "small.json").unwrap(), Some(b"{}".to_vec()));
        assert_eq!(read_entry(&mut archive, "missing.csv").unwrap(), None);
    }
}
