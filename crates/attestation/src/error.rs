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

//! The error taxonomy the whole pipeline reports through. Every
//! variant here names one of the failure kinds in the owning spec's
//! error handling design; the orchestrator is the only place that maps
//! a variant to an HTTP status.

use tpm_proto::{HashAlg, WireError};

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("malformed TPM structure: {0}")]
    Malformed(String),
    #[error("AK attribute set does not match required profile: {0}")]
    BadAk(String),
    #[error("quote verification failed: {0}")]
    BadQuote(String),
    #[error("event log missing algorithm {0:?} referenced by the quote")]
    InvalidEventlogAlg(HashAlg),
    #[error("event log replay disagrees with a quoted PCR: {0}")]
    BadEventlog(String),
    #[error("EK is not a valid RSA-2048 public key: {0}")]
    BadEk(String),
    #[error("policy verifier rejected the request: {0}")]
    VerifyFailed(String),
    #[error("sealing pipeline failed: {0}")]
    SealingFailed(String),
}

impl VerifyError {
    /// The `<KIND[:extra]>` reason string from the spec's error
    /// taxonomy table, as reported to operators (not to the client —
    /// the 403 responses are deliberately indistinguishable otherwise).
    pub fn reason(&self) -> String {
        match self {
            VerifyError::MissingField(field) => format!("MISSING_FIELD:{field}"),
            VerifyError::Malformed(_) => "MALFORMED".to_string(),
            VerifyError::BadAk(_) => "BAD_AK".to_string(),
            VerifyError::BadQuote(_) => "BAD_QUOTE".to_string(),
            VerifyError::InvalidEventlogAlg(alg) => format!("INVALID_EVENTLOG_ALG:{alg:?}"),
            VerifyError::BadEventlog(_) => "BAD_EVENTLOG".to_string(),
            VerifyError::BadEk(_) => "BAD_EK".to_string(),
            VerifyError::VerifyFailed(_) => "VERIFY_FAILED".to_string(),
            VerifyError::SealingFailed(_) => "SEALING_FAILED".to_string(),
        }
    }

    /// `true` for the single kind that maps to `500` rather than `403`.
    pub fn is_internal(&self) -> bool {
        matches!(self, VerifyError::SealingFailed(_))
    }
}

impl From<WireError> for VerifyError {
    fn from(e: WireError) -> Self {
        VerifyError::Malformed(e.to_string())
    }
}

pub type VerifyResult<T> = Result<T, VerifyError>;
