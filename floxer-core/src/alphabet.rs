//! The DNA+N rank alphabet shared by references and queries.
//!
//! Rank 0 is reserved as the FM-index sentinel; it never occurs in a
//! sanitized sequence. `A=1, C=2, G=3, T=4, N=5`.

/// A single rank in the 5-symbol alphabet `{A,C,G,T,N}` plus the
/// reserved sentinel rank `0`.
pub type Rank = u8;

pub const SENTINEL: Rank = 0;
pub const RANK_A: Rank = 1;
pub const RANK_C: Rank = 2;
pub const RANK_G: Rank = 3;
pub const RANK_T: Rank = 4;
pub const RANK_N: Rank = 5;

/// Number of distinct non-sentinel ranks.
pub const ALPHABET_SIZE: usize = 5;

/// Converts one input byte to its rank, replacing any non-ACGT
/// (case-insensitive) byte with the rank for `N`. Returns whether the
/// byte required sanitizing, so callers can warn once per record
/// rather than once per base.
pub fn byte_to_rank(byte: u8) -> (Rank, bool) {
    match byte.to_ascii_uppercase() {
        b'A' => (RANK_A, false),
        b'C' => (RANK_C, false),
        b'G' => (RANK_G, false),
        b'T' => (RANK_T, false),
        b'N' => (RANK_N, false),
        _ => (RANK_N, true),
    }
}

/// Converts a raw sequence of input bytes into a rank sequence,
/// returning whether any byte needed sanitizing.
pub fn sanitize_to_ranks(sequence: &[u8]) -> (Vec<Rank>, bool) {
    let mut any_sanitized = false;
    let ranks = sequence
        .iter()
        .map(|&b| {
            let (rank, sanitized) = byte_to_rank(b);
            any_sanitized |= sanitized;
            rank
        })
        .collect();
    (ranks, any_sanitized)
}

/// The complement of a rank under the standard Watson-Crick pairing;
/// `N` complements to `N`.
pub fn complement_rank(rank: Rank) -> Rank {
    match rank {
        RANK_A => RANK_T,
        RANK_T => RANK_A,
        RANK_C => RANK_G,
        RANK_G => RANK_C,
        other => other,
    }
}

/// Reverse-complements a rank sequence.
pub fn reverse_complement(ranks: &[Rank]) -> Vec<Rank> {
    ranks.iter().rev().map(|&r| complement_rank(r)).collect()
}

/// Renders a rank back to its uppercase ASCII character, for SAM
/// `SEQ` output. The sentinel has no textual representation and is
/// never expected to appear here.
pub fn rank_to_char(rank: Rank) -> u8 {
    match rank {
        RANK_A => b'A',
        RANK_C => b'C',
        RANK_G => b'G',
        RANK_T => b'T',
        RANK_N => b'N',
        _ => b'?',
    }
}

pub fn ranks_to_string(ranks: &[Rank]) -> String {
    ranks.iter().map(|&r| rank_to_char(r) as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_non_acgtn() {
        let (ranks, sanitized) = sanitize_to_ranks(b"ACGTXN");
        assert_eq!(ranks, vec![RANK_A, RANK_C, RANK_G, RANK_T, RANK_N, RANK_N]);
        assert!(sanitized);
    }

    #[test]
    fn lowercase_is_accepted_without_sanitizing() {
        let (ranks, sanitized) = sanitize_to_ranks(b"acgtn");
        assert_eq!(ranks, vec![RANK_A, RANK_C, RANK_G, RANK_T, RANK_N]);
        assert!(!sanitized);
    }

    #[test]
    fn reverse_complement_is_involutive() {
        let (ranks, _) = sanitize_to_ranks(b"ACGTTGCAN");
        let rc = reverse_complement(&ranks);
        let rc_rc = reverse_complement(&rc);
        assert_eq!(ranks, rc_rc);
    }

    #[test]
    fn reverse_complement_known_value() {
        let (ranks, _) = sanitize_to_ranks(b"AAAACCCC");
        let rc = reverse_complement(&ranks);
        assert_eq!(ranks_to_string(&rc), "GGGGTTTT");
    }
}
