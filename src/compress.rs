//! zlib deflate/inflate for the folder record's optional `compressed` wire
//! encoding (SPEC_FULL.md §9). Uses the teacher's existing `compress`
//! dependency (already pulled in for CVMFS's own zlib objects in
//! `fetcher.rs`) rather than introducing a second compression crate.

use std::io::{Read, Write};

use compress::zlib;

use crate::error::CoreResult;

pub fn deflate(data: &[u8]) -> CoreResult<Vec<u8>> {
    let mut out = Vec::new();
    {
        let mut encoder = zlib::Encoder::new(&mut out);
        encoder.write_all(data)?;
    }
    Ok(out)
}

pub fn inflate(data: &[u8]) -> CoreResult<Vec<u8>> {
    let mut out = Vec::new();
    zlib::Decoder::new(data).read_to_end(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let original = b"the quick brown fox jumps over the lazy dog".repeat(8);
        let packed = deflate(&original).unwrap();
        assert!(packed.len() < original.len());
        assert_eq!(inflate(&packed).unwrap(), original);
    }
}
