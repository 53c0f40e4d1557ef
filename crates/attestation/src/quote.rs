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

//! Verifies a `TPMS_ATTEST` quote against a nonce, a set of PCR
//! values, and the AK that is claimed to have signed it.

use subtle::ConstantTimeEq;
use tpm_proto::{PcrBank, TpmsAttest, TpmtPublic, TpmtSignature};

use crate::crypto;
use crate::error::{VerifyError, VerifyResult};

/// The shortest nonce this service accepts. Anything shorter gives an
/// attacker too much room to find a quote that happens to carry a
/// matching `extraData` by chance.
const MIN_NONCE_LEN: usize = 8;

/// Runs the quote verifier's full check in order: nonce length, nonce
/// match, PCR selection match, `pcrDigest` recomputation, and finally
/// the signature itself. Each check fails closed with a `BadQuote`
/// before the more expensive signature verification ever runs.
pub fn verify_quote(
    ak: &TpmtPublic,
    attest: &TpmsAttest,
    signature: &TpmtSignature,
    nonce: &[u8],
    pcr_bank: &PcrBank,
) -> VerifyResult<()> {
    if nonce.len() < MIN_NONCE_LEN {
        return Err(VerifyError::BadQuote(format!(
            "nonce is {} bytes, must be at least {MIN_NONCE_LEN}",
            nonce.len()
        )));
    }

    if attest.extra_data.len() != nonce.len()
        || !bool::from(attest.extra_data.as_slice().ct_eq(nonce))
    {
        return Err(VerifyError::BadQuote(
            "quote extraData does not match the request nonce".into(),
        ));
    }

    if attest.pcr_select != pcr_bank.selection() {
        return Err(VerifyError::BadQuote(
            "quoted PCR selection does not match the PCR values presented".into(),
        ));
    }

    let order = attest.pcr_select.canonical_order();
    let concatenated = pcr_bank.concat_in_order(&order)?;
    let recomputed = attest.pcr_digest.alg().hash(&concatenated);
    if recomputed != attest.pcr_digest {
        return Err(VerifyError::BadQuote(
            "recomputed pcrDigest does not match the quote's pcrDigest".into(),
        ));
    }

    crypto::verify_signature(ak, attest.raw(), signature)
}

#[cfg(test)]
mod tests {
    use rsa::pkcs1v15::SigningKey;
    use rsa::signature::{SignatureEncoding, Signer};
    use rsa::{RsaPrivateKey, RsaPublicKey};
    use sha2::Sha256;
    use tpm_proto::{AkAttributes, Digest, HashAlg};

    use super::*;

    fn ak_fixture(public: &RsaPublicKey) -> TpmtPublic {
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
        let modulus = public.n().to_bytes_be();
        buf.extend_from_slice(&(modulus.len() as u16).to_be_bytes());
        buf.extend_from_slice(&modulus);
        TpmtPublic::parse(&buf).unwrap()
    }

    fn quote_bytes(extra_data: &[u8], pcr_digest: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&0xFF544347u32.to_be_bytes());
        buf.extend_from_slice(&0x8018u16.to_be_bytes());
        buf.extend_from_slice(&4u16.to_be_bytes());
        buf.extend_from_slice(&[0u8; 4]);
        buf.extend_from_slice(&(extra_data.len() as u16).to_be_bytes());
        buf.extend_from_slice(extra_data);
        buf.extend_from_slice(&0u64.to_be_bytes());
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf.push(1);
        buf.extend_from_slice(&0u64.to_be_bytes());
        buf.extend_from_slice(&1u32.to_be_bytes());
        buf.extend_from_slice(&HashAlg::Sha256.tpm_id().to_be_bytes());
        buf.push(3);
        buf.extend_from_slice(&[0b0000_0001, 0, 0]); // PCR0 only
        buf.extend_from_slice(&(pcr_digest.len() as u16).to_be_bytes());
        buf.extend_from_slice(pcr_digest);
        buf
    }

    fn signed_quote(
        private: RsaPrivateKey,
        nonce: &[u8],
        pcr0: &[u8; 32],
    ) -> (TpmtPublic, TpmsAttest, TpmtSignature, PcrBank) {
        let public = RsaPublicKey::from(&private);
        let ak = ak_fixture(&public);

        let pcr_digest = HashAlg::Sha256.hash(pcr0);
        let quote_raw = quote_bytes(nonce, pcr_digest.as_bytes());
        let attest = TpmsAttest::parse(&quote_raw).unwrap();

        let signing_key = SigningKey::<Sha256>::new(private);
        let sig: rsa::pkcs1v15::Signature = signing_key.sign(&quote_raw);
        let signature = TpmtSignature::RsaSsa {
            hash: HashAlg::Sha256,
            sig: sig.to_vec(),
        };

        let mut bank = PcrBank::new();
        bank.insert(
            HashAlg::Sha256,
            0,
            Digest::new(HashAlg::Sha256, pcr0.to_vec()).unwrap(),
        );

        (ak, attest, signature, bank)
    }

    #[test]
    fn accepts_a_consistent_quote() {
        let mut rng = rand::rng();
        let private = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let nonce = b"01234567";
        let (ak, attest, signature, bank) = signed_quote(private, nonce, &[0x55u8; 32]);
        assert!(verify_quote(&ak, &attest, &signature, nonce, &bank).is_ok());
    }

    #[test]
    fn rejects_short_nonce() {
        let mut rng = rand::rng();
        let private = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let (ak, attest, signature, bank) = signed_quote(private, b"short", &[0x55u8; 32]);
        assert!(matches!(
            verify_quote(&ak, &attest, &signature, b"short", &bank),
            Err(VerifyError::BadQuote(_))
        ));
    }

    #[test]
    fn rejects_mismatched_nonce() {
        let mut rng = rand::rng();
        let private = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let (ak, attest, signature, bank) = signed_quote(private, b"01234567", &[0x55u8; 32]);
        assert!(matches!(
            verify_quote(&ak, &attest, &signature, b"76543210", &bank),
            Err(VerifyError::BadQuote(_))
        ));
    }

    #[test]
    fn rejects_tampered_pcr_value() {
        let mut rng = rand::rng();
        let private = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let nonce = b"01234567";
        let (ak, attest, signature, mut bank) = signed_quote(private, nonce, &[0x55u8; 32]);
        bank.insert(
            HashAlg::Sha256,
            0,
            Digest::new(HashAlg::Sha256, vec![0xAAu8; 32]).unwrap(),
        );
        assert!(matches!(
            verify_quote(&ak, &attest, &signature, nonce, &bank),
            Err(VerifyError::BadQuote(_))
        ));
    }
}
