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

//! The orchestrator's error type. This is the one place a `VerifyError`
//! (or a malformed multipart body) turns into an HTTP status; every
//! 403 response carries the same shape regardless of which check
//! failed, so a client cannot distinguish failure kinds by anything but
//! the reason string meant for operators.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use attestation::VerifyError;

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error(transparent)]
    Verify(#[from] VerifyError),
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("malformed multipart body: {0}")]
    Multipart(#[from] MultipartError),
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let (status, reason) = match &self {
            RequestError::Verify(e) if e.is_internal() => {
                (StatusCode::INTERNAL_SERVER_ERROR, e.reason())
            }
            RequestError::Verify(e) => (StatusCode::FORBIDDEN, e.reason()),
            RequestError::MissingField(field) => {
                (StatusCode::FORBIDDEN, format!("MISSING_FIELD:{field}"))
            }
            RequestError::Multipart(_) => (StatusCode::FORBIDDEN, "MALFORMED".to_string()),
        };
        tracing::warn!(reason = %reason, "rejecting attestation request");
        (status, reason).into_response()
    }
}

pub type RequestResult<T> = Result<T, RequestError>;
