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

//! The last pipeline stage: mints a random session secret, binds it to
//! the caller's EK/AK pair through a `MakeCredential`-equivalent blob,
//! and envelope-encrypts the policy-approved payload under that
//! secret. A caller that cannot activate the credential on its own TPM
//! can never recover the payload key.

use aes::cipher::{BlockEncryptMut, KeyIvInit, StreamCipher};
use cbc::cipher::block_padding::Pkcs7;
use rand::RngCore;
use tpm_proto::TpmtPublic;
use zeroize::ZeroizeOnDrop;

use crate::crypto;
use crate::error::{VerifyError, VerifyResult};
use crate::kdf;

/// Byte length of the random seed generated fresh for every
/// `MakeCredential`-equivalent blob.
const SEED_LEN: usize = 16;
/// AES-256 envelope key size, in bytes.
const AES_KEY_LEN: usize = 32;
/// AES-CBC IV size, in bytes.
const IV_LEN: usize = 16;
/// HMAC-SHA256 envelope tag key size, in bytes.
const HMAC_KEY_LEN: usize = 16;
/// `sessionSecret = aesKey || iv || hmacKey`, drawn as one CSPRNG call
/// and bound to the caller as a single unit. None of its components
/// ever appear outside the `encIdentity` field they are bound through.
const SESSION_SECRET_LEN: usize = AES_KEY_LEN + IV_LEN + HMAC_KEY_LEN;
/// `encIdentity` is wrapped under AES-128 in CFB128 mode, matching the
/// symmetric algorithm a real EK's storage parameters would name.
const SYM_KEY_LEN: usize = 16;
const ZERO_IV_16: [u8; 16] = [0u8; 16];

type Aes128Cfb = cfb_mode::Encryptor<aes::Aes128>;
type Aes256Cbc = cbc::Encryptor<aes::Aes256>;

/// The random value bound to the caller through credential activation:
/// `aesKey(32) || iv(16) || hmacKey(16)`. Its components are used
/// directly as the envelope key material and are never drawn or
/// serialized separately. Zeroized on drop; never logged or returned
/// in an error message.
#[derive(ZeroizeOnDrop)]
pub struct SessionSecret(Vec<u8>);

impl SessionSecret {
    fn generate() -> Self {
        let mut bytes = vec![0u8; SESSION_SECRET_LEN];
        rand::rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    fn aes_key(&self) -> &[u8] {
        &self.0[0..AES_KEY_LEN]
    }

    fn iv(&self) -> &[u8] {
        &self.0[AES_KEY_LEN..AES_KEY_LEN + IV_LEN]
    }

    fn hmac_key(&self) -> &[u8] {
        &self.0[AES_KEY_LEN + IV_LEN..]
    }
}

/// The response returned to a caller whose attestation and policy
/// check both passed. `credential_blob` is the complete
/// `TPM2B_ID_OBJECT || TPM2B_ENCRYPTED_SECRET` pair binding the
/// session secret to the caller's EK/AK; `tag` and `ciphertext` are
/// the policy-approved payload, envelope-encrypted under that secret.
pub struct SealedResponse {
    pub credential_blob: Vec<u8>,
    pub tag: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

impl SealedResponse {
    /// Serializes the response as `credentialBlob || tag || ciphertext`,
    /// flat. `credentialBlob` already carries its own TPM2B length
    /// prefixes; `tag` is a fixed 32 bytes; a client recovers
    /// `ciphertext` as whatever remains.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            self.credential_blob.len() + self.tag.len() + self.ciphertext.len(),
        );
        out.extend_from_slice(&self.credential_blob);
        out.extend_from_slice(&self.tag);
        out.extend_from_slice(&self.ciphertext);
        out
    }
}

/// Binds a fresh session secret to `ak_name` under `ek`, and
/// envelope-encrypts `payload` under that secret. This is the entire
/// sealing pipeline; the caller is responsible for having already
/// confirmed the request passed policy.
pub fn seal(ek: &TpmtPublic, ak_name: &[u8], payload: &[u8]) -> VerifyResult<SealedResponse> {
    let secret = SessionSecret::generate();
    let credential_blob = make_credential(ek, ak_name, secret.as_bytes())?;

    let ciphertext = Aes256Cbc::new_from_slices(secret.aes_key(), secret.iv())
        .map_err(|e| VerifyError::SealingFailed(format!("bad envelope key/IV: {e}")))?
        .encrypt_padded_vec_mut::<Pkcs7>(payload);

    let tag = kdf::hmac(tpm_proto::HashAlg::Sha256, secret.hmac_key(), &[&ciphertext])?;

    Ok(SealedResponse {
        credential_blob,
        tag,
        ciphertext,
    })
}

/// Builds the `TPM2_MakeCredential`-equivalent blob: a `TPM2B_ID_OBJECT`
/// binding `credential` to an object literally named `ak_name`,
/// concatenated with the `TPM2B_ENCRYPTED_SECRET` wrapping the seed
/// that blob was derived from. Only a TPM holding both the EK's
/// private key and that named object can unwrap it back to
/// `credential`.
fn make_credential(ek: &TpmtPublic, ak_name: &[u8], credential: &[u8]) -> VerifyResult<Vec<u8>> {
    let ek_pub = crypto::ek_public_key(ek)?;

    let mut seed = vec![0u8; SEED_LEN];
    rand::rng().fill_bytes(&mut seed);
    let encrypted_secret = crypto::oaep_wrap_seed(&ek_pub, &seed)?;

    let sym_key = kdf::kdfa(ek.name_alg, &seed, "STORAGE", ak_name, b"", (SYM_KEY_LEN * 8) as u32)?;
    let integrity_bits = (ek.name_alg.digest_size() * 8) as u32;
    let integrity_key = kdf::kdfa(ek.name_alg, &seed, "INTEGRITY", b"", b"", integrity_bits)?;

    let mut enc_identity = Vec::with_capacity(2 + credential.len());
    enc_identity.extend_from_slice(&(credential.len() as u16).to_be_bytes());
    enc_identity.extend_from_slice(credential);

    let mut cipher = Aes128Cfb::new_from_slices(&sym_key, &ZERO_IV_16)
        .map_err(|e| VerifyError::SealingFailed(format!("bad symKey: {e}")))?;
    cipher.apply_keystream(&mut enc_identity);

    let outer_hmac = kdf::hmac(ek.name_alg, &integrity_key, &[&enc_identity, ak_name])?;

    let mut id_object = Vec::with_capacity(2 + outer_hmac.len() + enc_identity.len());
    id_object.extend_from_slice(&(outer_hmac.len() as u16).to_be_bytes());
    id_object.extend_from_slice(&outer_hmac);
    id_object.extend_from_slice(&enc_identity);

    let mut credential_blob =
        Vec::with_capacity(2 + id_object.len() + 2 + encrypted_secret.len());
    credential_blob.extend_from_slice(&(id_object.len() as u16).to_be_bytes());
    credential_blob.extend_from_slice(&id_object);
    credential_blob.extend_from_slice(&(encrypted_secret.len() as u16).to_be_bytes());
    credential_blob.extend_from_slice(&encrypted_secret);

    Ok(credential_blob)
}

#[cfg(test)]
mod tests {
    use rsa::RsaPrivateKey;
    use tpm_proto::{AkAttributes, HashAlg};

    use super::*;

    fn ek_fixture() -> (RsaPrivateKey, TpmtPublic) {
        let mut rng = rand::rng();
        let private = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public = rsa::RsaPublicKey::from(&private);

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
        (private, TpmtPublic::parse(&buf).unwrap())
    }

    #[test]
    fn seal_produces_nonempty_fields() {
        let (_, ek) = ek_fixture();
        let response = seal(&ek, b"fake-ak-name", b"top secret payload").unwrap();
        assert!(!response.credential_blob.is_empty());
        assert!(!response.ciphertext.is_empty());
        assert_eq!(response.tag.len(), 32);
    }

    #[test]
    fn seal_is_randomized_across_calls() {
        let (_, ek) = ek_fixture();
        let a = seal(&ek, b"fake-ak-name", b"payload").unwrap();
        let b = seal(&ek, b"fake-ak-name", b"payload").unwrap();
        assert_ne!(a.credential_blob, b.credential_blob);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    /// Exercises the exact fixture sizes from the end-to-end happy-path
    /// scenario: a SHA-256/RSA-2048 EK and a 117-byte payload, which
    /// PKCS#7-pads to 128 bytes of ciphertext. Asserts the response is
    /// the flat `credentialBlob || tag(32) || ciphertext` layout, with
    /// no framing beyond `credentialBlob`'s own TPM2B length prefixes.
    #[test]
    fn to_bytes_matches_documented_layout() {
        let (_, ek) = ek_fixture();
        let payload = vec![0x7au8; 117];
        let response = seal(&ek, b"fake-ak-name", &payload).unwrap();

        // TPM2B_ID_OBJECT(2 + 2+32 + 2+64) || TPM2B_ENCRYPTED_SECRET(2 + 256)
        // for a SHA-256 name algorithm and an RSA-2048 EK.
        assert_eq!(response.credential_blob.len(), 360);
        assert_eq!(response.tag.len(), 32);
        assert_eq!(response.ciphertext.len(), 128);
        assert_eq!(response.ciphertext.len() % 16, 0);

        let framed = response.to_bytes();
        assert_eq!(
            framed.len(),
            response.credential_blob.len() + response.tag.len() + response.ciphertext.len()
        );

        let (blob, rest) = framed.split_at(response.credential_blob.len());
        assert_eq!(blob, response.credential_blob.as_slice());
        let (tag, ciphertext) = rest.split_at(32);
        assert_eq!(tag, response.tag.as_slice());
        assert_eq!(ciphertext, response.ciphertext.as_slice());
    }
}
