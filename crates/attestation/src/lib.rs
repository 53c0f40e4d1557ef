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

//! The core TPM 2.0 remote-attestation pipeline: AK policy gate, quote
//! verification, event-log replay and credential-activation sealing.
//! HTTP transport, the external policy decision and the client all
//! live outside this crate.

pub mod ak_gate;
pub mod crypto;
pub mod error;
pub mod eventlog;
pub mod identity;
pub mod kdf;
pub mod nonce;
pub mod quote;
pub mod sealer;

pub use error::{VerifyError, VerifyResult};
pub use eventlog::EventlogPolicy;
pub use nonce::{ClientNonce, NonceSource};
pub use sealer::SealedResponse;

use tpm_proto::{EventLog, PcrBank, TpmsAttest, TpmtPublic, TpmtSignature};

/// The raw, as-received fields of one attestation request. Multipart
/// decoding is the HTTP layer's job; by the time it reaches here the
/// request is already split into named byte slices.
pub struct AttestationRequest<'a> {
    pub ak_public: &'a [u8],
    pub ek_public: &'a [u8],
    pub quote: &'a [u8],
    pub signature: &'a [u8],
    pub pcr_file: &'a [u8],
    pub nonce: &'a [u8],
    pub eventlog: Option<&'a [u8]>,
    pub ima_log: Option<&'a [u8]>,
}

/// Everything the policy decision and the sealing stage need, once a
/// request has fully passed AK, quote and event-log verification.
pub struct VerifiedAttestation {
    pub ak: TpmtPublic,
    pub ek: TpmtPublic,
    pub pcr_bank: PcrBank,
}

/// Runs every verification stage up to (but not including) the policy
/// decision: parses the AK/EK/quote/signature/PCR file, checks the
/// AK's attribute profile, verifies the quote against the nonce and
/// PCR values, and replays any event log(s) against the quoted PCRs.
///
/// `nonce_source` decides what the quote's `extraData` is actually
/// checked against; pass [`ClientNonce`] to trust `req.nonce` as-is, or
/// a different [`NonceSource`] for a server-chosen nonce.
///
/// The caller is responsible for invoking the external policy decision
/// and, on approval, [`sealer::seal`] — both are outside this crate's
/// scope.
pub fn verify(
    req: AttestationRequest<'_>,
    policy: &EventlogPolicy,
    nonce_source: &dyn NonceSource,
) -> VerifyResult<VerifiedAttestation> {
    let ak = TpmtPublic::parse(req.ak_public)?;
    let ek = TpmtPublic::parse(req.ek_public)?;
    ak_gate::validate_ak(&ak)?;

    let attest = TpmsAttest::parse(req.quote)?;
    let signature = TpmtSignature::parse(req.signature)?;
    let pcr_bank = tpm_proto::pcrfile::parse(req.pcr_file)?;

    let nonce = nonce_source.nonce(req.nonce);
    quote::verify_quote(&ak, &attest, &signature, &nonce, &pcr_bank)?;

    let tcg_log = req.eventlog.map(EventLog::parse).transpose()?;
    eventlog::verify_against_quoted_pcrs(tcg_log.as_ref(), &pcr_bank, policy)?;

    if let Some(ima_bytes) = req.ima_log {
        let ima_alg = pcr_bank.algs().next().unwrap_or(tpm_proto::HashAlg::Sha256);
        let ima_text = std::str::from_utf8(ima_bytes)
            .map_err(|_| VerifyError::Malformed("IMA log is not valid UTF-8".into()))?;
        let parsed_ima = tpm_proto::eventlog::parse_ima_log(ima_text, ima_alg)?;
        eventlog::verify_ima_log(Some(&parsed_ima), &pcr_bank, policy)?;
    } else if policy.require_eventlog && tcg_log.is_none() {
        return Err(VerifyError::BadEventlog(
            "no event log of any kind supplied and one is required by policy".into(),
        ));
    }

    Ok(VerifiedAttestation { ak, ek, pcr_bank })
}
