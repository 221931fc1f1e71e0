//! Index snapshot files: JSON, gzip-compressed when the path ends in `.gz`.

use crate::colour::RegistrySnapshot;
use crate::error::Result;
use crate::store::StoreSnapshot;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Everything needed to rebuild an index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub registry: RegistrySnapshot,
    pub store: StoreSnapshot,
}

pub enum SnapshotWriter {
    Plain(BufWriter<File>),
    Compressed(BufWriter<GzEncoder<File>>),
}

impl SnapshotWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        if path.extension().map(|ext| ext == "gz").unwrap_or(false) {
            let encoder = GzEncoder::new(file, Compression::default());
            Ok(SnapshotWriter::Compressed(BufWriter::new(encoder)))
        } else {
            Ok(SnapshotWriter::Plain(BufWriter::new(file)))
        }
    }

    pub fn writer(&mut self) -> &mut dyn Write {
        match self {
            SnapshotWriter::Plain(writer) => writer,
            SnapshotWriter::Compressed(writer) => writer,
        }
    }

    /// Flush buffers and, for gzip, write the trailer.
    pub fn finish(self) -> Result<()> {
        match self {
            SnapshotWriter::Plain(mut writer) => writer.flush()?,
            SnapshotWriter::Compressed(writer) => {
                let encoder = writer.into_inner().map_err(|e| e.into_error())?;
                encoder.finish()?.flush()?;
            }
        }
        Ok(())
    }
}

pub fn open_snapshot(path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(path)?;
    if path.extension().map(|ext| ext == "gz").unwrap_or(false) {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

pub fn write_snapshot(path: &Path, snapshot: &IndexSnapshot) -> Result<()> {
    let mut out = SnapshotWriter::create(path)?;
    serde_json::to_writer(out.writer(), snapshot)?;
    out.finish()
}

pub fn read_snapshot(path: &Path) -> Result<IndexSnapshot> {
    Ok(serde_json::from_reader(open_snapshot(path)?)?)
}
