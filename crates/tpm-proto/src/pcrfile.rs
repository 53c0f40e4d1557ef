/*
 * SPDX-FileCopyrightText: Copyright (c) 2021-2024 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
 * SPDX-License-Identifier: LicenseRef-NvidiaProprietary
 *
 * NVIDIA CORPORATION, its affiliates and licensors retain all intellectual
 * property and proprietary rights in and to this material, related
 * documentation and any modifications thereto. Any use, reproduction,
 * disclosure or distribution of this material and related documentation
 * without an express license agreement from NVIDIA CORPORATION or
 * its affiliates is strictly prohibited.
 */

//! Client-declared PCR values, in the `tpm2-tools` `.pcr` layout: a
//! `TPML_PCR_SELECTION` header (the same wire shape `TPMS_ATTEST`
//! carries) followed by the selected digests, concatenated in
//! canonical `(alg, pcr)` order with no further framing.

use crate::alg::Digest;
use crate::quote::PcrBank;
use crate::reader::Reader;
use crate::{PcrSelection, WireError, WireResult};

/// Parses a `.pcr` file into a [`PcrBank`]. The selection header
/// determines both the algorithms/indices present and the canonical
/// order the trailing digests are read in.
pub fn parse(raw: &[u8]) -> WireResult<PcrBank> {
    let mut r = Reader::new(raw);
    let selection = PcrSelection::parse(&mut r)?;

    let mut bank = PcrBank::new();
    for (alg, pcr) in selection.canonical_order() {
        let bytes = r.take(alg.digest_size())?.to_vec();
        let digest = Digest::new(alg, bytes).map_err(|e| WireError::Other(e.to_string()))?;
        bank.insert(alg, pcr, digest);
    }
    r.finish(".pcr file")?;

    Ok(bank)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alg::HashAlg;

    fn pcr_file_fixture() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&1u32.to_be_bytes()); // 1 selection
        buf.extend_from_slice(&HashAlg::Sha256.tpm_id().to_be_bytes());
        buf.push(3); // size of select
        buf.extend_from_slice(&[0b0000_0011, 0, 0]); // PCR0, PCR1
        buf.extend_from_slice(&[0x11u8; 32]); // PCR0 digest
        buf.extend_from_slice(&[0x22u8; 32]); // PCR1 digest
        buf
    }

    #[test]
    fn parses_selection_and_concatenated_digests() {
        let bank = parse(&pcr_file_fixture()).unwrap();
        assert_eq!(
            bank.get(HashAlg::Sha256, 0).unwrap().as_bytes(),
            &[0x11u8; 32][..]
        );
        assert_eq!(
            bank.get(HashAlg::Sha256, 1).unwrap().as_bytes(),
            &[0x22u8; 32][..]
        );
    }

    #[test]
    fn rejects_trailing_bytes() {
        let mut raw = pcr_file_fixture();
        raw.push(0xAA);
        assert!(matches!(parse(&raw), Err(WireError::TrailingBytes { .. })));
    }

    #[test]
    fn rejects_truncated_digest() {
        let mut raw = pcr_file_fixture();
        raw.pop();
        assert!(matches!(parse(&raw), Err(WireError::UnexpectedEof { .. })));
    }
}
