//! Reads a FASTA (plain or gzip) reference into a `floxer_core::Reference`,
//! matching the teacher's own `needletail`-based FASTA reading.

use std::path::Path;

use anyhow::Context;

use floxer_core::Reference;

use crate::error::{CliError, CliResult};

pub fn read_reference(path: &Path) -> CliResult<Reference> {
    let mut reader = needletail::parse_fastx_file(path)
        .with_context(|| format!("failed to open reference FASTA at {}", path.display()))
        .map_err(|e| CliError::Io {
            source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
            path: Some(path.to_path_buf()),
        })?;

    let mut records = Vec::new();
    while let Some(record) = reader.next() {
        let record = record.map_err(|e| CliError::Io {
            source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
            path: Some(path.to_path_buf()),
        })?;
        let full_id = String::from_utf8_lossy(record.id()).into_owned();
        let id = full_id.split_whitespace().next().unwrap_or(&full_id).to_string();
        let sequence = record.seq().into_owned();
        records.push((id, sequence));
    }

    Reference::from_raw_records(records).map_err(CliError::from)
}
