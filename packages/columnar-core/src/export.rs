//! Export and import of one session as a self-describing container file.
//!
//! Layout: 4-byte magic, u32 LE header length, JSON header (version,
//! implementation tag, row count, column definitions), u64 LE batch
//! length, one bincode record batch holding every column buffer, and a
//! crc32 of the batch bytes. Writes go to a sibling temp file which is
//! fsynced and renamed over the destination.

use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::Path;

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::column::ColumnBuffer;
use crate::error::{EngineError, Result};
use crate::query::IMPLEMENTATION;
use crate::schema::{ColumnDefinition, Schema};

const MAGIC: [u8; 4] = *b"CTC1";
const CONTAINER_VERSION: u32 = 1;

/// JSON header written directly after the magic.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContainerHeader {
    version: u32,
    implementation: String,
    row_count: usize,
    columns: Vec<ColumnDefinition>,
}

/// Everything read back out of a container.
#[derive(Debug)]
pub struct ContainerContents {
    pub columns: Vec<ColumnDefinition>,
    pub row_count: usize,
    pub buffers: Vec<ColumnBuffer>,
}

/// Writes the schema and one batch covering all rows to `destination`.
pub(crate) fn write_container(
    destination: &Path,
    schema: &Schema,
    row_count: usize,
    buffers: &[ColumnBuffer],
) -> Result<()> {
    let header = ContainerHeader {
        version: CONTAINER_VERSION,
        implementation: IMPLEMENTATION.to_string(),
        row_count,
        columns: schema.columns().to_vec(),
    };
    let header_bytes = serde_json::to_vec(&header)
        .map_err(|e| EngineError::SerializationError(e.to_string()))?;
    let batch = bincode::serialize(buffers)
        .map_err(|e| EngineError::SerializationError(e.to_string()))?;
    let mut hasher = Hasher::new();
    hasher.update(&batch);
    let checksum = hasher.finalize();

    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| classify_io_error(e, "Failed to create export directory"))?;
        }
    }

    let temp_path = destination.with_extension("tmp");
    let mut file = File::create(&temp_path)
        .map_err(|e| classify_io_error(e, "Failed to create temp export file"))?;
    file.write_all(&MAGIC)
        .and_then(|_| file.write_all(&(header_bytes.len() as u32).to_le_bytes()))
        .and_then(|_| file.write_all(&header_bytes))
        .and_then(|_| file.write_all(&(batch.len() as u64).to_le_bytes()))
        .and_then(|_| file.write_all(&batch))
        .and_then(|_| file.write_all(&checksum.to_le_bytes()))
        .map_err(|e| classify_io_error(e, "Failed to write container"))?;
    file.sync_all()
        .map_err(|e| classify_io_error(e, "Failed to sync container"))?;
    drop(file);

    fs::rename(&temp_path, destination)
        .map_err(|e| classify_io_error(e, "Failed to rename temp export file"))?;
    debug!("exported {} rows to {}", row_count, destination.display());
    Ok(())
}

/// Reads a container back, verifying magic, version, checksum, and that
/// every buffer holds exactly the advertised row count.
pub(crate) fn read_container(source: &Path) -> Result<ContainerContents> {
    let mut file =
        File::open(source).map_err(|e| classify_io_error(e, "Failed to open container"))?;

    let mut magic = [0u8; 4];
    read_exact(&mut file, &mut magic)?;
    if magic != MAGIC {
        return Err(EngineError::DataCorruption(
            "bad container magic".to_string(),
        ));
    }

    let header_len = read_u32(&mut file)? as usize;
    let mut header_bytes = vec![0u8; header_len];
    read_exact(&mut file, &mut header_bytes)?;
    let header: ContainerHeader = serde_json::from_slice(&header_bytes)
        .map_err(|e| EngineError::SerializationError(e.to_string()))?;
    if header.version != CONTAINER_VERSION {
        return Err(EngineError::SerializationError(format!(
            "unsupported container version {}",
            header.version
        )));
    }

    let batch_len = read_u64(&mut file)? as usize;
    let mut batch = vec![0u8; batch_len];
    read_exact(&mut file, &mut batch)?;
    let stored_checksum = read_u32(&mut file)?;
    let mut hasher = Hasher::new();
    hasher.update(&batch);
    let checksum = hasher.finalize();
    if checksum != stored_checksum {
        return Err(EngineError::DataCorruption(format!(
            "checksum mismatch: stored {:08x}, computed {:08x}",
            stored_checksum, checksum
        )));
    }

    let buffers: Vec<ColumnBuffer> = bincode::deserialize(&batch)
        .map_err(|e| EngineError::SerializationError(e.to_string()))?;
    if buffers.len() != header.columns.len()
        || buffers.iter().any(|b| b.len() != header.row_count)
        || buffers
            .iter()
            .zip(&header.columns)
            .any(|(b, c)| b.kind() != c.kind)
    {
        return Err(EngineError::DataCorruption(
            "batch shape does not match header".to_string(),
        ));
    }

    Ok(ContainerContents {
        columns: header.columns,
        row_count: header.row_count,
        buffers,
    })
}

fn read_exact(file: &mut File, buf: &mut [u8]) -> Result<()> {
    file.read_exact(buf)
        .map_err(|e| classify_io_error(e, "Failed to read container"))
}

fn read_u32(file: &mut File) -> Result<u32> {
    let mut bytes = [0u8; 4];
    read_exact(file, &mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}

fn read_u64(file: &mut File) -> Result<u64> {
    let mut bytes = [0u8; 8];
    read_exact(file, &mut bytes)?;
    Ok(u64::from_le_bytes(bytes))
}

/// Maps raw I/O errors onto engine errors by kind.
fn classify_io_error(error: std::io::Error, context: &str) -> EngineError {
    match error.kind() {
        ErrorKind::StorageFull | ErrorKind::OutOfMemory => {
            EngineError::DiskFull(format!("{}: {}", context, error))
        }
        _ => EngineError::IoError(format!("{}: {}", context, error)),
    }
}
