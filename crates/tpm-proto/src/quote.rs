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

use std::collections::{BTreeMap, BTreeSet};

use crate::alg::{Digest, HashAlg};
use crate::reader::Reader;
use crate::{WireError, WireResult};

const TPM_GENERATED_VALUE: u32 = 0xFF54_4347;
const TPM_ST_ATTEST_QUOTE: u16 = 0x8018;
const PCR_SELECT_OCTETS: u8 = 3; // 24 PCRs / 8 bits per byte

/// Mapping from hash algorithm to the set of PCR indices selected for
/// that algorithm, in `0..=23`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PcrSelection(BTreeMap<HashAlg, BTreeSet<u8>>);

impl PcrSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, alg: HashAlg, pcr: u8) -> WireResult<()> {
        if pcr > 23 {
            return Err(WireError::PcrIndexOutOfRange(pcr));
        }
        self.0.entry(alg).or_default().insert(pcr);
        Ok(())
    }

    pub fn algs(&self) -> impl Iterator<Item = HashAlg> + '_ {
        self.0.keys().copied()
    }

    pub fn pcrs(&self, alg: HashAlg) -> Option<&BTreeSet<u8>> {
        self.0.get(&alg)
    }

    pub fn contains(&self, alg: HashAlg, pcr: u8) -> bool {
        self.0.get(&alg).is_some_and(|s| s.contains(&pcr))
    }

    /// Canonical `(alg, pcr)` order: ascending `TPM_ALG_ID`, then
    /// ascending PCR index. This is both the wire order of
    /// `TPML_PCR_SELECTION` and the order the quote verifier must
    /// concatenate PCR values in before recomputing `pcrDigest`.
    pub fn canonical_order(&self) -> Vec<(HashAlg, u8)> {
        let mut out = Vec::new();
        for (&alg, pcrs) in &self.0 {
            for &pcr in pcrs {
                out.push((alg, pcr));
            }
        }
        out
    }

    pub fn parse(r: &mut Reader) -> WireResult<Self> {
        let count = r.u32()?;
        let mut sel = Self::new();
        for _ in 0..count {
            let alg = HashAlg::from_tpm_id(r.u16()?)?;
            let size_of_select = r.u8()?;
            let bitmap = r.take(size_of_select as usize)?;
            if size_of_select != PCR_SELECT_OCTETS {
                return Err(WireError::InvalidSelectionSize {
                    alg: alg.tpm_id(),
                    size: size_of_select,
                });
            }
            for (byte_idx, byte) in bitmap.iter().enumerate() {
                for bit in 0..8u8 {
                    if byte & (1 << bit) != 0 {
                        sel.insert(alg, (byte_idx as u8) * 8 + bit)?;
                    }
                }
            }
        }
        Ok(sel)
    }
}

impl PartialOrd for PcrSelection {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PcrSelection {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.canonical_order().cmp(&other.canonical_order())
    }
}

/// Mapping from algorithm to `{ pcr index -> Digest }`. Invariant: for
/// every `(alg, i)` present, `Digest.len == alg.size`, enforced by
/// [`Digest::new`] at construction.
#[derive(Debug, Clone, Default)]
pub struct PcrBank(BTreeMap<HashAlg, BTreeMap<u8, Digest>>);

impl PcrBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, alg: HashAlg, pcr: u8, digest: Digest) {
        self.0.entry(alg).or_default().insert(pcr, digest);
    }

    pub fn get(&self, alg: HashAlg, pcr: u8) -> Option<&Digest> {
        self.0.get(&alg).and_then(|m| m.get(&pcr))
    }

    pub fn algs(&self) -> impl Iterator<Item = HashAlg> + '_ {
        self.0.keys().copied()
    }

    pub fn selection(&self) -> PcrSelection {
        let mut sel = PcrSelection::new();
        for (&alg, pcrs) in &self.0 {
            for &pcr in pcrs.keys() {
                sel.insert(alg, pcr)
                    .expect("PcrBank only ever holds validated in-range indices");
            }
        }
        sel
    }

    /// Concatenates the selected PCR values in canonical selection
    /// order, as required before recomputing `pcrDigest`.
    pub fn concat_in_order(&self, order: &[(HashAlg, u8)]) -> WireResult<Vec<u8>> {
        let mut out = Vec::new();
        for &(alg, pcr) in order {
            let digest = self.get(alg, pcr).ok_or_else(|| {
                WireError::Other(format!("missing PCR value for ({alg:?}, {pcr})"))
            })?;
            out.extend_from_slice(digest.as_bytes());
        }
        Ok(out)
    }
}

/// A parsed `TPMS_ATTEST` quote body.
#[derive(Debug, Clone)]
pub struct TpmsAttest {
    pub extra_data: Vec<u8>,
    pub pcr_select: PcrSelection,
    pub pcr_digest: Digest,
    raw: Vec<u8>,
}

impl TpmsAttest {
    pub fn parse(raw: &[u8]) -> WireResult<Self> {
        let mut r = Reader::new(raw);

        let magic = r.u32()?;
        if magic != TPM_GENERATED_VALUE {
            return Err(WireError::BadMagic(magic));
        }

        let attest_type = r.u16()?;
        if attest_type != TPM_ST_ATTEST_QUOTE {
            return Err(WireError::NotAQuote(attest_type));
        }

        let _qualified_signer = r.tpm2b()?;
        let extra_data = r.tpm2b()?.to_vec();

        // TPMS_CLOCK_INFO: clock(u64) + resetCount(u32) + restartCount(u32) + safe(u8)
        let _clock = r.u64()?;
        let _reset_count = r.u32()?;
        let _restart_count = r.u32()?;
        let _safe = r.u8()?;
        let _firmware_version = r.u64()?;

        let pcr_select = PcrSelection::parse(&mut r)?;
        let digest_bytes = r.tpm2b()?.to_vec();
        // pcrDigest carries no explicit algorithm tag on the wire; its
        // length uniquely identifies one of the four supported banks
        // (20/32/48/64 bytes for SHA-1/256/384/512).
        let pcr_digest_alg = alg_for_digest_len(digest_bytes.len())?;
        let pcr_digest = Digest::new(pcr_digest_alg, digest_bytes)
            .map_err(|e| WireError::Other(e.to_string()))?;

        r.finish("TPMS_ATTEST")?;

        Ok(Self {
            extra_data,
            pcr_select,
            pcr_digest,
            raw: raw.to_vec(),
        })
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }
}

fn alg_for_digest_len(len: usize) -> WireResult<HashAlg> {
    match len {
        20 => Ok(HashAlg::Sha1),
        32 => Ok(HashAlg::Sha256),
        48 => Ok(HashAlg::Sha384),
        64 => Ok(HashAlg::Sha512),
        other => Err(WireError::Other(format!(
            "pcrDigest length {other} does not match any supported hash algorithm"
        ))),
    }
}
