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

//! The AK-policy gate: the AK must be restricted to signing TPM-internal
//! structures and must not survive a reboot.

use tpm_proto::{AkAttributes, TpmtPublic};

use crate::error::{VerifyError, VerifyResult};

/// Succeeds iff `ak`'s object attributes are exactly the seven-bit
/// combination `{fixedTPM, stClear, fixedParent, sensitiveDataOrigin,
/// userWithAuth, restricted, sign}`. The signing-key/restricted-object
/// requirements are already enforced by [`TpmtPublic::parse`] rejecting
/// non-signing schemes and non-null symmetric algorithms, so the
/// attribute comparison is the only check left here.
pub fn validate_ak(ak: &TpmtPublic) -> VerifyResult<()> {
    if ak.attributes != AkAttributes::REQUIRED {
        return Err(VerifyError::BadAk(format!(
            "attribute set {:#010x} does not match required {:#010x}",
            ak.attributes.bits(),
            AkAttributes::REQUIRED.bits()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use tpm_proto::HashAlg;

    use super::*;

    fn ak_with(attrs: AkAttributes) -> TpmtPublic {
        let mut buf = Vec::new();
        buf.extend_from_slice(&1u16.to_be_bytes()); // TPM_ALG_RSA
        buf.extend_from_slice(&HashAlg::Sha256.tpm_id().to_be_bytes());
        buf.extend_from_slice(&attrs.bits().to_be_bytes());
        buf.extend_from_slice(&0u16.to_be_bytes()); // empty auth policy
        buf.extend_from_slice(&0x0010u16.to_be_bytes()); // TPM_ALG_NULL symmetric
        buf.extend_from_slice(&0x0016u16.to_be_bytes()); // TPM_ALG_RSAPSS
        buf.extend_from_slice(&HashAlg::Sha256.tpm_id().to_be_bytes());
        buf.extend_from_slice(&2048u16.to_be_bytes());
        buf.extend_from_slice(&0u32.to_be_bytes());
        let modulus = vec![0x11u8; 256];
        buf.extend_from_slice(&(modulus.len() as u16).to_be_bytes());
        buf.extend_from_slice(&modulus);
        TpmtPublic::parse(&buf).unwrap()
    }

    #[test]
    fn accepts_exact_required_set() {
        assert!(validate_ak(&ak_with(AkAttributes::REQUIRED)).is_ok());
    }

    #[test]
    fn rejects_missing_st_clear() {
        let missing = AkAttributes::REQUIRED - AkAttributes::ST_CLEAR;
        assert!(matches!(
            validate_ak(&ak_with(missing)),
            Err(VerifyError::BadAk(_))
        ));
    }

    #[test]
    fn rejects_extra_attribute() {
        let extra = AkAttributes::REQUIRED | AkAttributes::ADMIN_WITH_POLICY;
        assert!(matches!(
            validate_ak(&ak_with(extra)),
            Err(VerifyError::BadAk(_))
        ));
    }
}
