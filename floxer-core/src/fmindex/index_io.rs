//! On-disk persistence for a built [`BidirectionalFmIndex`]: a
//! magic-tagged, versioned, little-endian binary blob so a reference
//! only has to be indexed once.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use thiserror::Error;

use super::{BidirectionalFmIndex, FmIndexHalf, SIGMA};

const MAGIC: &[u8; 4] = b"FLXI";
// v2 drops the forward half: the search scheme only ever walks the
// reversed/backward index (see `fmindex::scheme::Block`), so the
// forward half was built and persisted but never read back.
const VERSION: u32 = 2;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("not a floxer index file (bad magic bytes)")]
    BadMagic,
    #[error("unsupported index format version {found}, expected {expected}")]
    VersionMismatch { found: u32, expected: u32 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn save<W: Write>(index: &BidirectionalFmIndex, mut writer: W) -> Result<(), IndexError> {
    writer.write_all(MAGIC)?;
    writer.write_u32::<LittleEndian>(VERSION)?;

    writer.write_u64::<LittleEndian>(index.concatenated_length as u64)?;

    writer.write_u64::<LittleEndian>(index.reference_boundaries.len() as u64)?;
    for &(start, end) in &index.reference_boundaries {
        writer.write_u64::<LittleEndian>(start as u64)?;
        writer.write_u64::<LittleEndian>(end as u64)?;
    }

    save_half(&index.backward, &mut writer)?;

    Ok(())
}

fn save_half<W: Write>(half: &FmIndexHalf, mut writer: W) -> Result<(), IndexError> {
    writer.write_u64::<LittleEndian>(half.bwt.len() as u64)?;
    for &rank in &half.bwt {
        writer.write_u8(rank)?;
    }

    for &count in &half.c_array {
        writer.write_u64::<LittleEndian>(count as u64)?;
    }

    writer.write_u64::<LittleEndian>(half.occ.len() as u64)?;
    for row in &half.occ {
        for &count in row {
            writer.write_u64::<LittleEndian>(count as u64)?;
        }
    }

    writer.write_u64::<LittleEndian>(half.suffix_array.len() as u64)?;
    for &pos in &half.suffix_array {
        writer.write_u64::<LittleEndian>(pos as u64)?;
    }

    Ok(())
}

pub fn load<R: Read>(mut reader: R) -> Result<BidirectionalFmIndex, IndexError> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(IndexError::BadMagic);
    }

    let version = reader.read_u32::<LittleEndian>()?;
    if version != VERSION {
        return Err(IndexError::VersionMismatch { found: version, expected: VERSION });
    }

    let concatenated_length = reader.read_u64::<LittleEndian>()? as usize;

    let num_references = reader.read_u64::<LittleEndian>()? as usize;
    let mut reference_boundaries = Vec::with_capacity(num_references);
    for _ in 0..num_references {
        let start = reader.read_u64::<LittleEndian>()? as usize;
        let end = reader.read_u64::<LittleEndian>()? as usize;
        reference_boundaries.push((start, end));
    }

    let backward = load_half(&mut reader)?;

    Ok(BidirectionalFmIndex {
        backward,
        reference_boundaries,
        concatenated_length,
    })
}

fn load_half<R: Read>(mut reader: R) -> Result<FmIndexHalf, IndexError> {
    let bwt_len = reader.read_u64::<LittleEndian>()? as usize;
    let mut bwt = Vec::with_capacity(bwt_len);
    for _ in 0..bwt_len {
        bwt.push(reader.read_u8()?);
    }

    let mut c_array = [0usize; SIGMA];
    for slot in c_array.iter_mut() {
        *slot = reader.read_u64::<LittleEndian>()? as usize;
    }

    let occ_len = reader.read_u64::<LittleEndian>()? as usize;
    let mut occ = Vec::with_capacity(occ_len);
    for _ in 0..occ_len {
        let mut row = [0usize; SIGMA];
        for slot in row.iter_mut() {
            *slot = reader.read_u64::<LittleEndian>()? as usize;
        }
        occ.push(row);
    }

    let sa_len = reader.read_u64::<LittleEndian>()? as usize;
    let mut suffix_array = Vec::with_capacity(sa_len);
    for _ in 0..sa_len {
        suffix_array.push(reader.read_u64::<LittleEndian>()? as usize);
    }

    Ok(FmIndexHalf { bwt, c_array, occ, suffix_array })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::sanitize_to_ranks;

    #[test]
    fn round_trips_through_a_byte_buffer() {
        let (ranks, _) = sanitize_to_ranks(b"ACGTACGTTTTTACGT");
        let index = BidirectionalFmIndex::build(&[ranks]);

        let mut buffer = Vec::new();
        save(&index, &mut buffer).unwrap();

        let loaded = load(buffer.as_slice()).unwrap();
        assert_eq!(loaded.concatenated_length, index.concatenated_length);
        assert_eq!(loaded.reference_boundaries, index.reference_boundaries);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let garbage = vec![0u8; 16];
        let result = load(garbage.as_slice());
        assert!(matches!(result, Err(IndexError::BadMagic)));
    }

    #[test]
    fn version_mismatch_is_reported() {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(MAGIC);
        buffer.extend_from_slice(&999u32.to_le_bytes());
        let result = load(buffer.as_slice());
        assert!(matches!(result, Err(IndexError::VersionMismatch { found: 999, .. })));
    }
}
