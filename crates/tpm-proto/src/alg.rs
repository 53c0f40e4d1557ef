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

use digest::Digest as _;
use sha2::{Sha256, Sha384, Sha512};
use strum_macros::FromRepr;
use subtle::ConstantTimeEq;

use crate::{WireError, WireResult};

/// Subset of `TPM_ALG_ID` this service understands as a PCR/name hash
/// algorithm. `TPM_ALG_ID` itself has far more values (signature
/// schemes, symmetric ciphers, ...); we only need the hash banks.
#[derive(FromRepr, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum HashAlg {
    Sha1 = 0x0004,
    Sha256 = 0x000B,
    Sha384 = 0x000C,
    Sha512 = 0x000D,
}

impl HashAlg {
    pub fn from_tpm_id(id: u16) -> WireResult<Self> {
        Self::from_repr(id).ok_or(WireError::UnknownAlgorithm(id))
    }

    pub fn tpm_id(self) -> u16 {
        self as u16
    }

    pub fn digest_size(self) -> usize {
        match self {
            HashAlg::Sha1 => 20,
            HashAlg::Sha256 => 32,
            HashAlg::Sha384 => 48,
            HashAlg::Sha512 => 64,
        }
    }

    pub fn hash(self, data: &[u8]) -> Digest {
        let bytes = match self {
            HashAlg::Sha1 => sha1::Sha1::digest(data).to_vec(),
            HashAlg::Sha256 => Sha256::digest(data).to_vec(),
            HashAlg::Sha384 => Sha384::digest(data).to_vec(),
            HashAlg::Sha512 => Sha512::digest(data).to_vec(),
        };
        Digest {
            alg: self,
            bytes: bytes.into(),
        }
    }

    /// `extend(acc, d) = H_alg(acc || d)`, the PCR/event-log fold
    /// operation shared by PCR extension and event-log replay.
    pub fn extend(self, acc: &Digest, data: &[u8]) -> WireResult<Digest> {
        if acc.alg != self {
            return Err(WireError::Other(format!(
                "extend: accumulator alg {:?} does not match {:?}",
                acc.alg, self
            )));
        }
        let mut buf = Vec::with_capacity(acc.bytes.len() + data.len());
        buf.extend_from_slice(&acc.bytes);
        buf.extend_from_slice(data);
        Ok(self.hash(&buf))
    }

    /// The all-zero accumulator a PCR starts from before any
    /// extension (or after a `StartupLocality` seed — see
    /// [`Digest::locality_seed`]).
    pub fn zero(self) -> Digest {
        Digest {
            alg: self,
            bytes: vec![0u8; self.digest_size()].into(),
        }
    }
}

/// A fixed-width digest tagged with the algorithm that produced it.
/// Equality is constant-time byte equality of same-algorithm digests,
/// per the owning spec's `Digest` invariant.
#[derive(Debug, Clone)]
pub struct Digest {
    alg: HashAlg,
    bytes: Box<[u8]>,
}

impl Digest {
    pub fn new(alg: HashAlg, bytes: Vec<u8>) -> WireResult<Self> {
        if bytes.len() != alg.digest_size() {
            return Err(WireError::Other(format!(
                "digest for {alg:?} must be {} bytes, got {}",
                alg.digest_size(),
                bytes.len()
            )));
        }
        Ok(Self {
            alg,
            bytes: bytes.into(),
        })
    }

    pub fn alg(&self) -> HashAlg {
        self.alg
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Accumulator seeded by a `StartupLocality` event: `0x00...0N`
    /// where `N` is the locality byte, per the `EventLog` invariant.
    pub fn locality_seed(alg: HashAlg, locality: u8) -> Self {
        let mut bytes = vec![0u8; alg.digest_size()];
        *bytes.last_mut().expect("digest size is non-zero") = locality;
        Self {
            alg,
            bytes: bytes.into(),
        }
    }
}

impl PartialEq for Digest {
    fn eq(&self, other: &Self) -> bool {
        self.alg == other.alg && bool::from(self.bytes.ct_eq(&other.bytes))
    }
}

impl Eq for Digest {}
