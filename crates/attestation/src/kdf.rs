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

//! `KDFa`, the SP800-108 counter-mode HMAC key derivation function the
//! credential sealer uses to turn a shared seed into the symmetric and
//! integrity keys of a credential-activation blob, plus a small HMAC
//! helper shared by the sealer's outer integrity tag and the envelope
//! tag.

use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};
use tpm_proto::HashAlg;

use crate::error::{VerifyError, VerifyResult};

macro_rules! kdfa_impl {
    ($name:ident, $digest:ty) => {
        fn $name(
            key: &[u8],
            label: &[u8],
            context_u: &[u8],
            context_v: &[u8],
            bits: u32,
        ) -> VerifyResult<Vec<u8>> {
            let mut out = Vec::new();
            let mut counter: u32 = 1;
            while out.len() * 8 < bits as usize {
                let mut mac = Hmac::<$digest>::new_from_slice(key)
                    .map_err(|e| VerifyError::SealingFailed(format!("KDFa HMAC key: {e}")))?;
                mac.update(&counter.to_be_bytes());
                mac.update(label);
                mac.update(context_u);
                mac.update(context_v);
                mac.update(&bits.to_be_bytes());
                out.extend_from_slice(&mac.finalize().into_bytes());
                counter += 1;
            }
            out.truncate(bits.div_ceil(8) as usize);
            Ok(out)
        }
    };
}

kdfa_impl!(kdfa_sha1, Sha1);
kdfa_impl!(kdfa_sha256, Sha256);
kdfa_impl!(kdfa_sha384, Sha384);
kdfa_impl!(kdfa_sha512, Sha512);

/// `KDFa(hashAlg, key, label, contextU, contextV, bits)`: `label` is
/// NUL-terminated on the wire, per the TPM 2.0 KDF definition.
pub fn kdfa(
    alg: HashAlg,
    key: &[u8],
    label: &str,
    context_u: &[u8],
    context_v: &[u8],
    bits: u32,
) -> VerifyResult<Vec<u8>> {
    let mut label_bytes = label.as_bytes().to_vec();
    label_bytes.push(0);
    match alg {
        HashAlg::Sha1 => kdfa_sha1(key, &label_bytes, context_u, context_v, bits),
        HashAlg::Sha256 => kdfa_sha256(key, &label_bytes, context_u, context_v, bits),
        HashAlg::Sha384 => kdfa_sha384(key, &label_bytes, context_u, context_v, bits),
        HashAlg::Sha512 => kdfa_sha512(key, &label_bytes, context_u, context_v, bits),
    }
}

macro_rules! hmac_impl {
    ($name:ident, $digest:ty) => {
        fn $name(key: &[u8], messages: &[&[u8]]) -> VerifyResult<Vec<u8>> {
            let mut mac = Hmac::<$digest>::new_from_slice(key)
                .map_err(|e| VerifyError::SealingFailed(format!("HMAC key: {e}")))?;
            for msg in messages {
                mac.update(msg);
            }
            Ok(mac.finalize().into_bytes().to_vec())
        }
    };
}

hmac_impl!(hmac_sha1, Sha1);
hmac_impl!(hmac_sha256, Sha256);
hmac_impl!(hmac_sha384, Sha384);
hmac_impl!(hmac_sha512, Sha512);

/// HMAC over the concatenation of `messages`, under the hash bank
/// named by `alg`.
pub fn hmac(alg: HashAlg, key: &[u8], messages: &[&[u8]]) -> VerifyResult<Vec<u8>> {
    match alg {
        HashAlg::Sha1 => hmac_sha1(key, messages),
        HashAlg::Sha256 => hmac_sha256(key, messages),
        HashAlg::Sha384 => hmac_sha384(key, messages),
        HashAlg::Sha512 => hmac_sha512(key, messages),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kdfa_output_length_matches_requested_bits() {
        let out = kdfa(HashAlg::Sha256, b"shared-seed", "STORAGE", b"context", b"", 128).unwrap();
        assert_eq!(out.len(), 16);
    }

    #[test]
    fn kdfa_is_deterministic() {
        let a = kdfa(HashAlg::Sha256, b"key", "LABEL", b"u", b"v", 256).unwrap();
        let b = kdfa(HashAlg::Sha256, b"key", "LABEL", b"u", b"v", 256).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn kdfa_distinguishes_labels() {
        let a = kdfa(HashAlg::Sha256, b"key", "STORAGE", b"u", b"v", 256).unwrap();
        let b = kdfa(HashAlg::Sha256, b"key", "INTEGRITY", b"u", b"v", 256).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn hmac_matches_across_calls() {
        let a = hmac(HashAlg::Sha256, b"key", &[b"part1", b"part2"]).unwrap();
        let b = hmac(HashAlg::Sha256, b"key", &[b"part1part2"]).unwrap();
        assert_eq!(a, b);
    }
}
