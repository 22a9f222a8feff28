//! ZIP packaging of datasets.
//!
//! Codecs produce a [`Dataset`]; this module is the only place that knows
//! about the archive container.

use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::format::error::FormatError;
use crate::format::traits::Dataset;

/// Write every file of `dataset` into a deflated ZIP stream.
pub fn write_zip<W: Write + Seek>(dataset: &Dataset, writer: W) -> Result<W, FormatError> {
    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for file in dataset.files() {
        zip.start_file(file.path.as_str(), options)?;
        zip.write_all(&file.contents)?;
    }
    Ok(zip.finish()?)
}

/// Read all regular files of a ZIP stream.
///
/// Entries whose names would escape the archive root are skipped.
pub fn read_zip<R: Read + Seek>(reader: R) -> Result<Dataset, FormatError> {
    let mut archive = ZipArchive::new(reader)?;
    let mut dataset = Dataset::new();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        if entry.enclosed_name().is_none() {
            log::warn!("Skipping unsafe archive entry '{}'", entry.name());
            continue;
        }
        let path = entry.name().replace('\\', "/");
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents)?;
        dataset.insert(path, contents);
    }
    log::debug!("Read {} files from archive", dataset.len());
    Ok(dataset)
}

/// Archive a dataset in memory.
pub fn to_zip_bytes(dataset: &Dataset) -> Result<Vec<u8>, FormatError> {
    Ok(write_zip(dataset, Cursor::new(Vec::new()))?.into_inner())
}

pub fn from_zip_bytes(bytes: &[u8]) -> Result<Dataset, FormatError> {
    read_zip(Cursor::new(bytes))
}

/// Write a dataset archive to disk.
pub fn save_zip(dataset: &Dataset, path: &Path) -> Result<(), FormatError> {
    let file = std::fs::File::create(path)?;
    write_zip(dataset, file)?;
    log::info!("💾 Wrote {} files to {:?}", dataset.len(), path);
    Ok(())
}

/// Read a dataset archive from disk.
pub fn load_zip(path: &Path) -> Result<Dataset, FormatError> {
    read_zip(std::fs::File::open(path)?)
}
