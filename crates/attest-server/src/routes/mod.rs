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

//! The one HTTP endpoint: `POST /`. Drives the orchestrator state
//! machine end to end — receive, parse, validate AK, validate quote,
//! validate event log, invoke policy, seal, respond — and is the only
//! place a `VerifyError` becomes an HTTP status.

use std::collections::HashMap;
use std::sync::Arc;

use attestation::{AttestationRequest, identity, sealer};
use axum::Router;
use axum::extract::{Multipart, State};
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::{RequestError, RequestResult};
use crate::policy;
use crate::workspace::RequestWorkspace;

const REQUIRED_FIELDS: &[&str] = &["quote", "sig", "pcr", "nonce", "ak.pub", "ek.pub"];

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
}

pub fn router(state: AppState) -> Router {
    Router::new().route("/", post(attest)).with_state(state)
}

async fn attest(State(state): State<AppState>, multipart: Multipart) -> Response {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("request", request_id = %request_id);
    let result = handle(state, multipart).instrument(span).await;

    let mut response = match result {
        Ok(body) => {
            let mut response = body.into_response();
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
            response
        }
        Err(err) => err.into_response(),
    };
    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

async fn handle(state: AppState, mut multipart: Multipart) -> RequestResult<Vec<u8>> {
    let workspace = RequestWorkspace::new()
        .map_err(|e| attestation::VerifyError::SealingFailed(format!("workspace creation failed: {e}")))?;

    let mut fields = HashMap::new();
    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let data = field.bytes().await?;
        workspace.write_field(&name, &data).map_err(|e| {
            attestation::VerifyError::SealingFailed(format!("failed to stage upload {name}: {e}"))
        })?;
        fields.insert(name, data);
    }

    for field in REQUIRED_FIELDS {
        if !fields.contains_key(*field) {
            return Err(RequestError::MissingField(field));
        }
    }

    let request = AttestationRequest {
        ak_public: fields["ak.pub"].as_ref(),
        ek_public: fields["ek.pub"].as_ref(),
        quote: fields["quote"].as_ref(),
        signature: fields["sig"].as_ref(),
        pcr_file: fields["pcr"].as_ref(),
        nonce: fields["nonce"].as_ref(),
        eventlog: fields.get("eventlog").map(|v| v.as_ref()),
        ima_log: fields.get("imalog").map(|v| v.as_ref()),
    };

    let verified = attestation::verify(request, &state.config.eventlog_policy(), &attestation::ClientNonce)?;

    let ek_hash = identity::ek_identity(&verified.ek);
    let payload = policy::invoke(
        &state.config.bindir,
        &state.config.policy_verifier,
        &ek_hash,
        workspace.path(),
    )
    .await?;

    let ak_name = verified.ak.name();
    let sealed = sealer::seal(&verified.ek, &ak_name, &payload)?;

    Ok(sealed.to_bytes())
}
