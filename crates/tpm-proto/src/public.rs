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

use bitflags::bitflags;

use crate::alg::{Digest, HashAlg};
use crate::reader::Reader;
use crate::{WireError, WireResult};

bitflags! {
    /// `TPMA_OBJECT`. Only the bits the AK-policy gate cares about are
    /// named; the rest round-trip through `bits()` untouched.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AkAttributes: u32 {
        const FIXED_TPM             = 0x0000_0002;
        const ST_CLEAR              = 0x0000_0004;
        const FIXED_PARENT          = 0x0000_0010;
        const SENSITIVE_DATA_ORIGIN = 0x0000_0020;
        const USER_WITH_AUTH        = 0x0000_0040;
        const ADMIN_WITH_POLICY     = 0x0000_0080;
        const NO_DA                 = 0x0000_0400;
        const ENCRYPTED_DUPLICATION = 0x0000_0800;
        const RESTRICTED            = 0x0001_0000;
        const DECRYPT               = 0x0002_0000;
        const SIGN_ENCRYPT          = 0x0004_0000;
    }
}

impl AkAttributes {
    /// The exact seven-bit combination the AK-policy gate requires:
    /// `{fixedTPM, stClear, fixedParent, sensitiveDataOrigin,
    /// userWithAuth, restricted, sign}`. Nothing more, nothing less.
    pub const REQUIRED: Self = Self::FIXED_TPM
        .union(Self::ST_CLEAR)
        .union(Self::FIXED_PARENT)
        .union(Self::SENSITIVE_DATA_ORIGIN)
        .union(Self::USER_WITH_AUTH)
        .union(Self::RESTRICTED)
        .union(Self::SIGN_ENCRYPT);
}

/// Signing scheme declared by the AK's public area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningScheme {
    RsaSsa { hash: HashAlg },
    RsaPss { hash: HashAlg },
    EcdsaP256 { hash: HashAlg },
    EcdsaP384 { hash: HashAlg },
}

/// Key-type-specific public parameters.
#[derive(Debug, Clone)]
pub enum PublicParams {
    Rsa {
        scheme: SigningScheme,
        key_bits: u16,
        exponent: u32,
        modulus: Vec<u8>,
    },
    Ecc {
        scheme: SigningScheme,
        curve_id: u16,
        x: Vec<u8>,
        y: Vec<u8>,
    },
}

/// A parsed `TPMT_PUBLIC`, retaining the raw marshalled bytes (needed
/// to recompute the TPM `Name`) alongside the decoded fields.
#[derive(Debug, Clone)]
pub struct TpmtPublic {
    pub name_alg: HashAlg,
    pub attributes: AkAttributes,
    pub params: PublicParams,
    raw: Vec<u8>,
}

// TPM_ALG_ID values used only inside TPMT_PUBLIC parsing.
const ALG_RSA: u16 = 0x0001;
const ALG_ECC: u16 = 0x0023;
const ALG_RSASSA: u16 = 0x0014;
const ALG_RSAPSS: u16 = 0x0016;
const ALG_ECDSA: u16 = 0x0018;
const ALG_NULL: u16 = 0x0010;
const CURVE_NIST_P256: u16 = 0x0003;
const CURVE_NIST_P384: u16 = 0x0004;

impl TpmtPublic {
    /// Parses a marshalled `TPMT_PUBLIC`. Trailing bytes after the
    /// structure's own length-delimited fields are a `MALFORMED`
    /// error, per the decoder's contract.
    pub fn parse(raw: &[u8]) -> WireResult<Self> {
        let mut r = Reader::new(raw);

        let object_type = r.u16()?;
        let name_alg = HashAlg::from_tpm_id(r.u16()?)?;
        let attributes = AkAttributes::from_bits_truncate(r.u32()?);
        // TPMU_PUBLIC_ID's auth policy: length-prefixed, opaque to us.
        let _auth_policy = r.tpm2b()?;

        let params = match object_type {
            ALG_RSA => {
                // TPMS_RSA_PARMS: symmetric, scheme, keyBits, exponent.
                let symmetric = r.u16()?;
                if symmetric != ALG_NULL {
                    // A restricted signing key must not also declare a
                    // symmetric algorithm for decryption.
                    return Err(WireError::Other(
                        "AK public area declares a non-null symmetric algorithm".into(),
                    ));
                }
                let scheme_alg = r.u16()?;
                let scheme = match scheme_alg {
                    ALG_RSASSA => SigningScheme::RsaSsa {
                        hash: HashAlg::from_tpm_id(r.u16()?)?,
                    },
                    ALG_RSAPSS => SigningScheme::RsaPss {
                        hash: HashAlg::from_tpm_id(r.u16()?)?,
                    },
                    ALG_NULL => {
                        return Err(WireError::Other(
                            "RSA key declares TPM_ALG_NULL signing scheme: not usable as an AK"
                                .into(),
                        ));
                    }
                    other => return Err(WireError::UnknownAlgorithm(other)),
                };
                let key_bits = r.u16()?;
                let exponent = r.u32()?;
                let modulus = r.tpm2b()?.to_vec();
                PublicParams::Rsa {
                    scheme,
                    key_bits,
                    exponent,
                    modulus,
                }
            }
            ALG_ECC => {
                // TPMS_ECC_PARMS: symmetric, scheme, curveID, kdf.
                let symmetric = r.u16()?;
                if symmetric != ALG_NULL {
                    return Err(WireError::Other(
                        "AK public area declares a non-null symmetric algorithm".into(),
                    ));
                }
                let scheme_alg = r.u16()?;
                let hash = match scheme_alg {
                    ALG_ECDSA => HashAlg::from_tpm_id(r.u16()?)?,
                    ALG_NULL => {
                        return Err(WireError::Other(
                            "ECC key declares TPM_ALG_NULL signing scheme: not usable as an AK"
                                .into(),
                        ));
                    }
                    other => return Err(WireError::UnknownAlgorithm(other)),
                };
                let curve_id = r.u16()?;
                let scheme = match curve_id {
                    CURVE_NIST_P256 => SigningScheme::EcdsaP256 { hash },
                    CURVE_NIST_P384 => SigningScheme::EcdsaP384 { hash },
                    other => {
                        return Err(WireError::Other(format!("unsupported ECC curve {other:#x}")));
                    }
                };
                let kdf = r.u16()?;
                if kdf != ALG_NULL {
                    return Err(WireError::Other("unsupported non-null ECC KDF".into()));
                }
                let x = r.tpm2b()?.to_vec();
                let y = r.tpm2b()?.to_vec();
                PublicParams::Ecc {
                    scheme,
                    curve_id,
                    x,
                    y,
                }
            }
            other => return Err(WireError::UnknownAlgorithm(other)),
        };

        r.finish("TPMT_PUBLIC")?;

        Ok(Self {
            name_alg,
            attributes,
            params,
            raw: raw.to_vec(),
        })
    }

    pub fn signing_scheme(&self) -> SigningScheme {
        match &self.params {
            PublicParams::Rsa { scheme, .. } => *scheme,
            PublicParams::Ecc { scheme, .. } => *scheme,
        }
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// `name = nameAlg || H_nameAlg(TPMT_PUBLIC_marshalled)`.
    pub fn name(&self) -> Vec<u8> {
        let digest = self.name_alg.hash(&self.raw);
        let mut out = Vec::with_capacity(2 + digest.as_bytes().len());
        out.extend_from_slice(&self.name_alg.tpm_id().to_be_bytes());
        out.extend_from_slice(digest.as_bytes());
        out
    }

    pub fn name_digest(&self) -> Digest {
        self.name_alg.hash(&self.raw)
    }
}
