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

//! A stable per-device identity key, independent of whichever nameAlg
//! a particular EK happens to use.

use sha2::{Digest, Sha256};
use tpm_proto::TpmtPublic;

/// SHA-256 of the EK's marshalled `TPMT_PUBLIC`. The external policy
/// verifier and any device registry index devices by this value.
pub fn ek_identity(ek: &TpmtPublic) -> [u8; 32] {
    Sha256::digest(ek.raw()).into()
}

#[cfg(test)]
mod tests {
    use tpm_proto::{AkAttributes, HashAlg};

    use super::*;

    fn ek_fixture(modulus: &[u8]) -> TpmtPublic {
        let mut buf = Vec::new();
        buf.extend_from_slice(&1u16.to_be_bytes());
        buf.extend_from_slice(&HashAlg::Sha256.tpm_id().to_be_bytes());
        buf.extend_from_slice(&AkAttributes::REQUIRED.bits().to_be_bytes());
        buf.extend_from_slice(&0u16.to_be_bytes());
        buf.extend_from_slice(&0x0010u16.to_be_bytes());
        buf.extend_from_slice(&0x0014u16.to_be_bytes());
        buf.extend_from_slice(&HashAlg::Sha256.tpm_id().to_be_bytes());
        buf.extend_from_slice(&2048u16.to_be_bytes());
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf.extend_from_slice(&(modulus.len() as u16).to_be_bytes());
        buf.extend_from_slice(modulus);
        TpmtPublic::parse(&buf).unwrap()
    }

    #[test]
    fn identity_is_deterministic() {
        let ek = ek_fixture(&[0x42u8; 256]);
        assert_eq!(ek_identity(&ek), ek_identity(&ek));
    }

    #[test]
    fn identity_differs_for_different_keys() {
        let a = ek_fixture(&[0x42u8; 256]);
        let b = ek_fixture(&[0x43u8; 256]);
        assert_ne!(ek_identity(&a), ek_identity(&b));
    }
}
