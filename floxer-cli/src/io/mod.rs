//! File format glue kept out of `floxer-core`: FASTA/FASTQ reading
//! and SAM writing.

pub mod queries;
pub mod reference;
pub mod sam;
