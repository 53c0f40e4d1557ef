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

use crate::alg::HashAlg;
use crate::reader::Reader;
use crate::{WireError, WireResult};

const ALG_RSASSA: u16 = 0x0014;
const ALG_RSAPSS: u16 = 0x0016;
const ALG_ECDSA: u16 = 0x0018;

/// A parsed `TPMT_SIGNATURE` over a marshalled Quote.
#[derive(Debug, Clone)]
pub enum TpmtSignature {
    RsaSsa { hash: HashAlg, sig: Vec<u8> },
    RsaPss { hash: HashAlg, sig: Vec<u8> },
    Ecdsa { hash: HashAlg, r: Vec<u8>, s: Vec<u8> },
}

impl TpmtSignature {
    pub fn parse(raw: &[u8]) -> WireResult<Self> {
        let mut r = Reader::new(raw);
        let sig_alg = r.u16()?;
        let sig = match sig_alg {
            ALG_RSASSA => {
                let hash = HashAlg::from_tpm_id(r.u16()?)?;
                let sig = r.tpm2b()?.to_vec();
                TpmtSignature::RsaSsa { hash, sig }
            }
            ALG_RSAPSS => {
                let hash = HashAlg::from_tpm_id(r.u16()?)?;
                let sig = r.tpm2b()?.to_vec();
                TpmtSignature::RsaPss { hash, sig }
            }
            ALG_ECDSA => {
                let hash = HashAlg::from_tpm_id(r.u16()?)?;
                let sig_r = r.tpm2b()?.to_vec();
                let sig_s = r.tpm2b()?.to_vec();
                TpmtSignature::Ecdsa {
                    hash,
                    r: sig_r,
                    s: sig_s,
                }
            }
            other => return Err(WireError::UnknownAlgorithm(other)),
        };
        r.finish("TPMT_SIGNATURE")?;
        Ok(sig)
    }

    pub fn hash_alg(&self) -> HashAlg {
        match self {
            TpmtSignature::RsaSsa { hash, .. }
            | TpmtSignature::RsaPss { hash, .. }
            | TpmtSignature::Ecdsa { hash, .. } => *hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rsapss_signature() {
        let mut raw = Vec::new();
        raw.extend_from_slice(&ALG_RSAPSS.to_be_bytes());
        raw.extend_from_slice(&HashAlg::Sha256.tpm_id().to_be_bytes());
        let body = vec![0x42u8; 256];
        raw.extend_from_slice(&(body.len() as u16).to_be_bytes());
        raw.extend_from_slice(&body);

        let sig = TpmtSignature::parse(&raw).unwrap();
        match sig {
            TpmtSignature::RsaPss { hash, sig } => {
                assert_eq!(hash, HashAlg::Sha256);
                assert_eq!(sig.len(), 256);
            }
            _ => panic!("expected RsaPss"),
        }
    }

    #[test]
    fn rejects_unknown_scheme() {
        let mut raw = Vec::new();
        raw.extend_from_slice(&0x1234u16.to_be_bytes());
        assert!(matches!(
            TpmtSignature::parse(&raw),
            Err(WireError::UnknownAlgorithm(0x1234))
        ));
    }
}
