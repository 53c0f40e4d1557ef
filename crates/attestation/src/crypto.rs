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

//! Signature verification across the four AK signing schemes this
//! service accepts, and the RSA-OAEP wrap used to bind a session
//! secret to an EK.

use ecdsa::signature::Verifier as _;
use rsa::signature::Verifier as _;
use rsa::{BigUint, Oaep, RsaPublicKey};
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};
use tpm_proto::{PublicParams, SigningScheme, TpmtPublic, TpmtSignature};

use crate::error::{VerifyError, VerifyResult};

const EK_KEY_BITS: u16 = 2048;
const MAKE_CREDENTIAL_LABEL: &str = "IDENTITY\0";

/// Verifies `signature` over `message` using the key and scheme
/// declared by `ak`'s public area. The signature's own hash field must
/// match the AK's declared scheme; a quote signed under a different
/// hash than the AK advertises is rejected rather than silently
/// accepted under whichever one the caller sent.
pub fn verify_signature(ak: &TpmtPublic, message: &[u8], signature: &TpmtSignature) -> VerifyResult<()> {
    match (&ak.params, signature) {
        (PublicParams::Rsa { exponent, modulus, .. }, TpmtSignature::RsaSsa { hash, sig }) => {
            require_scheme(ak, SigningScheme::RsaSsa { hash: *hash })?;
            let key = rsa_public_key(modulus, *exponent)?;
            verify_rsa_ssa(&key, *hash, message, sig)
        }
        (PublicParams::Rsa { exponent, modulus, .. }, TpmtSignature::RsaPss { hash, sig }) => {
            require_scheme(ak, SigningScheme::RsaPss { hash: *hash })?;
            let key = rsa_public_key(modulus, *exponent)?;
            verify_rsa_pss(&key, *hash, message, sig)
        }
        (PublicParams::Ecc { x, y, .. }, TpmtSignature::Ecdsa { hash, r, s }) => {
            match ak.signing_scheme() {
                SigningScheme::EcdsaP256 { .. } => {
                    require_scheme(ak, SigningScheme::EcdsaP256 { hash: *hash })?;
                    verify_ecdsa_p256(x, y, *hash, message, r, s)
                }
                SigningScheme::EcdsaP384 { .. } => {
                    require_scheme(ak, SigningScheme::EcdsaP384 { hash: *hash })?;
                    verify_ecdsa_p384(x, y, *hash, message, r, s)
                }
                _ => unreachable!("TpmtPublic::parse only produces ECC params with an ECDSA scheme"),
            }
        }
        _ => Err(VerifyError::BadQuote(
            "signature algorithm does not match the AK's key type".into(),
        )),
    }
}

fn require_scheme(ak: &TpmtPublic, seen: SigningScheme) -> VerifyResult<()> {
    if ak.signing_scheme() != seen {
        return Err(VerifyError::BadQuote(
            "signature hash algorithm does not match the AK's declared scheme".into(),
        ));
    }
    Ok(())
}

fn rsa_public_key(modulus: &[u8], exponent: u32) -> VerifyResult<RsaPublicKey> {
    let e = if exponent == 0 { 65537 } else { exponent };
    RsaPublicKey::new(BigUint::from_bytes_be(modulus), BigUint::from(e))
        .map_err(|e| VerifyError::BadAk(format!("invalid RSA public key: {e}")))
}

fn verify_rsa_ssa(key: &RsaPublicKey, hash: tpm_proto::HashAlg, msg: &[u8], sig: &[u8]) -> VerifyResult<()> {
    use rsa::pkcs1v15::{Signature, VerifyingKey};
    let signature = Signature::try_from(sig)
        .map_err(|e| VerifyError::BadQuote(format!("malformed RSASSA signature: {e}")))?;
    let result = match hash {
        tpm_proto::HashAlg::Sha1 => VerifyingKey::<Sha1>::new(key.clone()).verify(msg, &signature),
        tpm_proto::HashAlg::Sha256 => VerifyingKey::<Sha256>::new(key.clone()).verify(msg, &signature),
        tpm_proto::HashAlg::Sha384 => VerifyingKey::<Sha384>::new(key.clone()).verify(msg, &signature),
        tpm_proto::HashAlg::Sha512 => VerifyingKey::<Sha512>::new(key.clone()).verify(msg, &signature),
    };
    result.map_err(|e| VerifyError::BadQuote(format!("RSASSA signature verification failed: {e}")))
}

fn verify_rsa_pss(key: &RsaPublicKey, hash: tpm_proto::HashAlg, msg: &[u8], sig: &[u8]) -> VerifyResult<()> {
    use rsa::pss::{Signature, VerifyingKey};
    let signature = Signature::try_from(sig)
        .map_err(|e| VerifyError::BadQuote(format!("malformed RSAPSS signature: {e}")))?;
    let result = match hash {
        tpm_proto::HashAlg::Sha1 => VerifyingKey::<Sha1>::new(key.clone()).verify(msg, &signature),
        tpm_proto::HashAlg::Sha256 => VerifyingKey::<Sha256>::new(key.clone()).verify(msg, &signature),
        tpm_proto::HashAlg::Sha384 => VerifyingKey::<Sha384>::new(key.clone()).verify(msg, &signature),
        tpm_proto::HashAlg::Sha512 => VerifyingKey::<Sha512>::new(key.clone()).verify(msg, &signature),
    };
    result.map_err(|e| VerifyError::BadQuote(format!("RSAPSS signature verification failed: {e}")))
}

fn encoded_point(x: &[u8], y: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + x.len() + y.len());
    out.push(0x04);
    out.extend_from_slice(x);
    out.extend_from_slice(y);
    out
}

fn verify_ecdsa_p256(
    x: &[u8],
    y: &[u8],
    hash: tpm_proto::HashAlg,
    msg: &[u8],
    r: &[u8],
    s: &[u8],
) -> VerifyResult<()> {
    if hash != tpm_proto::HashAlg::Sha256 {
        return Err(VerifyError::BadQuote(
            "P-256 AK must sign with SHA-256, per its declared scheme".into(),
        ));
    }
    let point_bytes = encoded_point(x, y);
    let point = p256::EncodedPoint::from_bytes(&point_bytes)
        .map_err(|e| VerifyError::BadAk(format!("malformed P-256 point: {e}")))?;
    let key = p256::ecdsa::VerifyingKey::from_encoded_point(&point)
        .into_option()
        .ok_or_else(|| VerifyError::BadAk("P-256 point is not on the curve".into()))?;
    let r: [u8; 32] = r
        .try_into()
        .map_err(|_| VerifyError::BadQuote("malformed ECDSA r component".into()))?;
    let s: [u8; 32] = s
        .try_into()
        .map_err(|_| VerifyError::BadQuote("malformed ECDSA s component".into()))?;
    let signature = p256::ecdsa::Signature::from_scalars(r, s)
        .map_err(|e| VerifyError::BadQuote(format!("malformed ECDSA signature: {e}")))?;
    key.verify(msg, &signature)
        .map_err(|e| VerifyError::BadQuote(format!("ECDSA P-256 signature verification failed: {e}")))
}

fn verify_ecdsa_p384(
    x: &[u8],
    y: &[u8],
    hash: tpm_proto::HashAlg,
    msg: &[u8],
    r: &[u8],
    s: &[u8],
) -> VerifyResult<()> {
    if hash != tpm_proto::HashAlg::Sha384 {
        return Err(VerifyError::BadQuote(
            "P-384 AK must sign with SHA-384, per its declared scheme".into(),
        ));
    }
    let point_bytes = encoded_point(x, y);
    let point = p384::EncodedPoint::from_bytes(&point_bytes)
        .map_err(|e| VerifyError::BadAk(format!("malformed P-384 point: {e}")))?;
    let key = p384::ecdsa::VerifyingKey::from_encoded_point(&point)
        .into_option()
        .ok_or_else(|| VerifyError::BadAk("P-384 point is not on the curve".into()))?;
    let r: [u8; 48] = r
        .try_into()
        .map_err(|_| VerifyError::BadQuote("malformed ECDSA r component".into()))?;
    let s: [u8; 48] = s
        .try_into()
        .map_err(|_| VerifyError::BadQuote("malformed ECDSA s component".into()))?;
    let signature = p384::ecdsa::Signature::from_scalars(r, s)
        .map_err(|e| VerifyError::BadQuote(format!("malformed ECDSA signature: {e}")))?;
    key.verify(msg, &signature)
        .map_err(|e| VerifyError::BadQuote(format!("ECDSA P-384 signature verification failed: {e}")))
}

/// Builds the RSA public key an EK's public area declares, rejecting
/// anything that is not a 2048-bit RSA key — the only EK shape this
/// service's credential-activation binding supports.
pub fn ek_public_key(ek: &TpmtPublic) -> VerifyResult<RsaPublicKey> {
    match &ek.params {
        PublicParams::Rsa {
            key_bits,
            exponent,
            modulus,
            ..
        } if *key_bits == EK_KEY_BITS => rsa_public_key(modulus, *exponent)
            .map_err(|e| VerifyError::BadEk(format!("EK public key is invalid: {e}"))),
        PublicParams::Rsa { key_bits, .. } => Err(VerifyError::BadEk(format!(
            "EK is a {key_bits}-bit RSA key, only 2048-bit is supported"
        ))),
        PublicParams::Ecc { .. } => Err(VerifyError::BadEk("EK must be RSA-2048, not ECC".into())),
    }
}

/// RSA-OAEP-wraps `seed` under `ek`, using the `"IDENTITY\0"` label the
/// TPM 2.0 `MakeCredential` operation requires.
pub fn oaep_wrap_seed(ek: &RsaPublicKey, seed: &[u8]) -> VerifyResult<Vec<u8>> {
    let padding = Oaep::new_with_label::<Sha256, _>(MAKE_CREDENTIAL_LABEL);
    ek.encrypt(&mut rand_core::OsRng, padding, seed)
        .map_err(|e| VerifyError::SealingFailed(format!("OAEP wrap of MakeCredential seed failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs1v15::SigningKey;
    use rsa::signature::{SignatureEncoding as _, Signer as _};
    use rsa::RsaPrivateKey;
    use tpm_proto::{AkAttributes, HashAlg};

    fn rsa_ak_fixture(key: &RsaPublicKey) -> TpmtPublic {
        let mut buf = Vec::new();
        buf.extend_from_slice(&1u16.to_be_bytes()); // TPM_ALG_RSA
        buf.extend_from_slice(&HashAlg::Sha256.tpm_id().to_be_bytes());
        buf.extend_from_slice(&AkAttributes::REQUIRED.bits().to_be_bytes());
        buf.extend_from_slice(&0u16.to_be_bytes());
        buf.extend_from_slice(&0x0010u16.to_be_bytes()); // TPM_ALG_NULL symmetric
        buf.extend_from_slice(&0x0014u16.to_be_bytes()); // TPM_ALG_RSASSA
        buf.extend_from_slice(&HashAlg::Sha256.tpm_id().to_be_bytes());
        buf.extend_from_slice(&2048u16.to_be_bytes());
        buf.extend_from_slice(&0u32.to_be_bytes());
        let modulus = key.n().to_bytes_be();
        buf.extend_from_slice(&(modulus.len() as u16).to_be_bytes());
        buf.extend_from_slice(&modulus);
        TpmtPublic::parse(&buf).unwrap()
    }

    #[test]
    fn verifies_a_genuine_rsassa_signature() {
        let mut rng = rand::rng();
        let private = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public = RsaPublicKey::from(&private);
        let ak = rsa_ak_fixture(&public);

        let signing_key = SigningKey::<Sha256>::new(private);
        let message = b"attest-this-message";
        let signature: rsa::pkcs1v15::Signature = signing_key.sign(message);

        let sig = TpmtSignature::RsaSsa {
            hash: HashAlg::Sha256,
            sig: signature.to_vec(),
        };
        assert!(verify_signature(&ak, message, &sig).is_ok());
    }

    #[test]
    fn rejects_signature_over_the_wrong_message() {
        let mut rng = rand::rng();
        let private = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public = RsaPublicKey::from(&private);
        let ak = rsa_ak_fixture(&public);

        let signing_key = SigningKey::<Sha256>::new(private);
        let signature: rsa::pkcs1v15::Signature = signing_key.sign(b"original message");

        let sig = TpmtSignature::RsaSsa {
            hash: HashAlg::Sha256,
            sig: signature.to_vec(),
        };
        assert!(verify_signature(&ak, b"tampered message", &sig).is_err());
    }

    #[test]
    fn ek_public_key_rejects_non_2048_bit_rsa() {
        let mut rng = rand::rng();
        let private = RsaPrivateKey::new(&mut rng, 1024).unwrap();
        let public = RsaPublicKey::from(&private);
        let ak = rsa_ak_fixture(&public);
        // Build an EK-shaped TpmtPublic with the 1024-bit key.
        let mut buf = Vec::new();
        buf.extend_from_slice(&1u16.to_be_bytes());
        buf.extend_from_slice(&HashAlg::Sha256.tpm_id().to_be_bytes());
        buf.extend_from_slice(&AkAttributes::REQUIRED.bits().to_be_bytes());
        buf.extend_from_slice(&0u16.to_be_bytes());
        buf.extend_from_slice(&0x0010u16.to_be_bytes());
        buf.extend_from_slice(&0x0014u16.to_be_bytes());
        buf.extend_from_slice(&HashAlg::Sha256.tpm_id().to_be_bytes());
        buf.extend_from_slice(&1024u16.to_be_bytes());
        buf.extend_from_slice(&0u32.to_be_bytes());
        let modulus = public.n().to_bytes_be();
        buf.extend_from_slice(&(modulus.len() as u16).to_be_bytes());
        buf.extend_from_slice(&modulus);
        let ek = TpmtPublic::parse(&buf).unwrap();
        let _ = ak;

        assert!(matches!(ek_public_key(&ek), Err(VerifyError::BadEk(_))));
    }
}
