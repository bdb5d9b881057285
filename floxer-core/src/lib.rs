//! Core PEX/FM-index alignment pipeline for the floxer long-read
//! aligner: exact seeding via PEX trees, approximate FM-index search,
//! hierarchical banded-edit-distance verification, and alignment
//! collection.
//!
//! This crate has no knowledge of file formats or process
//! orchestration; that lives in the `floxer-cli` binary crate. It
//! does not initialize a logger (callers are expected to have set one
//! up) and never calls `std::process::exit`.

pub mod alignment;
pub mod alphabet;
pub mod anchor;
pub mod collector;
pub mod error;
pub mod fmindex;
pub mod intervals;
mod math;
pub mod pex;
pub mod pipeline;
pub mod seeding;
pub mod stats;
pub mod types;
pub mod verify;

pub use error::{FloxerError, FloxerResult};
pub use pex::{PexTree, PexTreeBuildStrategy, PexTreeCache, PexTreeConfig};
pub use pipeline::{align_query, PipelineConfig, QueryErrorBudget};
pub use types::{Orientation, Query, Reference, ReferenceRecord};

/// Version information for the floxer core library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
