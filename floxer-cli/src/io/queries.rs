//! Streaming FASTQ (plain or gzip) reader producing `floxer_core::Query`
//! records one at a time, so a run never has to hold every query in
//! memory at once.

use std::path::{Path, PathBuf};

use anyhow::Context;

use floxer_core::Query;

use crate::error::{CliError, CliResult};

/// Queries longer than this are skipped with a warning: the banded
/// DP's `O(query_len * reference_span)` cost makes unbounded lengths
/// an operational hazard rather than a correctness one.
pub const MAX_QUERY_LENGTH: usize = 1_000_000;

pub struct QueryReader {
    inner: Box<dyn needletail::FastxReader>,
    path: PathBuf,
    next_internal_id: usize,
}

impl QueryReader {
    pub fn open(path: &Path) -> CliResult<Self> {
        let inner = needletail::parse_fastx_file(path)
            .with_context(|| format!("failed to open query FASTQ at {}", path.display()))
            .map_err(|e| CliError::Io {
                source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
                path: Some(path.to_path_buf()),
            })?;
        Ok(Self { inner, path: path.to_path_buf(), next_internal_id: 0 })
    }
}

impl Iterator for QueryReader {
    type Item = CliResult<Query>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = self.inner.next()?;
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    return Some(Err(CliError::Io {
                        source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
                        path: Some(self.path.clone()),
                    }))
                }
            };

            let full_id = String::from_utf8_lossy(record.id()).into_owned();
            let id = full_id.split_whitespace().next().unwrap_or(&full_id).to_string();
            let sequence = record.seq();

            if sequence.len() > MAX_QUERY_LENGTH {
                log::warn!("skipping query {id}: length {} exceeds the maximum of {MAX_QUERY_LENGTH}", sequence.len());
                continue;
            }
            if sequence.is_empty() {
                log::warn!("skipping empty query record: {id}");
                continue;
            }

            let quality = record
                .qual()
                .map(|q| String::from_utf8_lossy(q).into_owned());

            let internal_id = self.next_internal_id;
            self.next_internal_id += 1;

            return Some(Ok(Query::new(id, internal_id, &sequence, quality)));
        }
    }
}
