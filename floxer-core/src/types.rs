//! Core data types shared across the alignment pipeline: reference
//! records, queries, and orientation.

use crate::alphabet::{self, Rank};
use crate::error::{FloxerError, FloxerResult};

/// Which strand of the query an alignment was found on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Forward,
    ReverseComplement,
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Orientation::Forward => write!(f, "forward"),
            Orientation::ReverseComplement => write!(f, "reverse_complement"),
        }
    }
}

/// One reference contig: a stable textual id, its index into the
/// reference list (the "internal id"), and its rank sequence.
#[derive(Debug, Clone)]
pub struct ReferenceRecord {
    pub id: String,
    pub internal_id: usize,
    pub rank_sequence: Vec<Rank>,
}

impl ReferenceRecord {
    pub fn len(&self) -> usize {
        self.rank_sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rank_sequence.is_empty()
    }
}

/// An ordered collection of reference records, as read from a FASTA
/// file (or handed in directly by a library caller / test).
#[derive(Debug, Clone, Default)]
pub struct Reference {
    pub records: Vec<ReferenceRecord>,
}

impl Reference {
    /// Builds a reference from `(id, raw sequence bytes)` pairs,
    /// sanitizing non-ACGTN bytes to `N` and dropping empty records
    /// and duplicate ids (uniquified with a numeric suffix), exactly
    /// as the external FASTA reader is contracted to do. This
    /// constructor exists so the core is independently testable
    /// without going through `floxer-cli`'s FASTA parser.
    pub fn from_raw_records<I, S>(records: I) -> FloxerResult<Self>
    where
        I: IntoIterator<Item = (S, Vec<u8>)>,
        S: Into<String>,
    {
        let mut seen_ids = std::collections::HashMap::<String, usize>::new();
        let mut out = Vec::new();

        for (id, raw) in records {
            let id = id.into();
            if raw.is_empty() {
                log::warn!("dropping empty reference record: {id}");
                continue;
            }

            let (rank_sequence, sanitized) = alphabet::sanitize_to_ranks(&raw);
            if sanitized {
                log::warn!("reference record {id} contained non-ACGTN bytes, replaced with N");
            }

            let unique_id = match seen_ids.get_mut(&id) {
                None => {
                    seen_ids.insert(id.clone(), 0);
                    id
                }
                Some(count) => {
                    *count += 1;
                    format!("{id}_{count}")
                }
            };

            let internal_id = out.len();
            out.push(ReferenceRecord {
                id: unique_id,
                internal_id,
                rank_sequence,
            });
        }

        if out.is_empty() {
            return Err(FloxerError::input("reference contains no non-empty records"));
        }

        Ok(Self { records: out })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A single query: its rank sequence, precomputed reverse complement,
/// stable user id, and optional per-base quality string.
#[derive(Debug, Clone)]
pub struct Query {
    pub id: String,
    pub internal_id: usize,
    pub rank_sequence: Vec<Rank>,
    pub reverse_complement_rank_sequence: Vec<Rank>,
    pub quality: Option<String>,
}

impl Query {
    pub fn new(id: String, internal_id: usize, raw_sequence: &[u8], quality: Option<String>) -> Self {
        let (rank_sequence, sanitized) = alphabet::sanitize_to_ranks(raw_sequence);
        if sanitized {
            log::warn!("query record {id} contained non-ACGTN bytes, replaced with N");
        }

        let quality = match quality {
            Some(q) if q.len() == rank_sequence.len() => Some(q),
            Some(_) => {
                log::warn!("query record {id} has a quality string of mismatched length, dropping it");
                None
            }
            None => None,
        };

        let reverse_complement_rank_sequence = alphabet::reverse_complement(&rank_sequence);

        Self {
            id,
            internal_id,
            rank_sequence,
            reverse_complement_rank_sequence,
            quality,
        }
    }

    pub fn len(&self) -> usize {
        self.rank_sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rank_sequence.is_empty()
    }

    pub fn sequence_for(&self, orientation: Orientation) -> &[Rank] {
        match orientation {
            Orientation::Forward => &self.rank_sequence,
            Orientation::ReverseComplement => &self.reverse_complement_rank_sequence,
        }
    }

    /// A query is admissible iff `|q| > e` and `e >= s`, where `e` is
    /// the query's error budget and `s` the seed error cap. Otherwise
    /// it bypasses the core and is reported unmapped.
    pub fn is_admissible(&self, query_num_errors: usize, seed_max_errors: usize) -> bool {
        self.len() > query_num_errors && query_num_errors >= seed_max_errors
    }
}
