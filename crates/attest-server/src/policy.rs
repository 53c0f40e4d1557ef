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

//! Invokes the external, pluggable policy verifier: a child process
//! that decides whether the attesting device (identified by its EK
//! hash) is authorised, and if so prints the payload to seal on
//! stdout. Its decision logic is not our concern; we only speak its
//! argv/exit-code contract.

use std::path::Path;
use std::process::Stdio;

use attestation::VerifyError;

const VERIFY_ARG: &str = "verify";

/// Runs `<bindir>/<binary> verify <ek_hex> <workspace>` and returns its
/// stdout bytes. The child is killed if this future is dropped before
/// it exits, so an aborted request never leaves it running.
pub async fn invoke(
    bindir: &Path,
    binary: &str,
    ek_hash: &[u8],
    workspace: &Path,
) -> Result<Vec<u8>, VerifyError> {
    let program = bindir.join(binary);
    let ek_hex = hex::encode(ek_hash);

    let child = tokio::process::Command::new(&program)
        .arg(VERIFY_ARG)
        .arg(&ek_hex)
        .arg(workspace)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            VerifyError::VerifyFailed(format!("failed to launch {}: {e}", program.display()))
        })?;

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| VerifyError::VerifyFailed(format!("policy verifier I/O error: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::warn!(
            exit_code = ?output.status.code(),
            stderr = %stderr.trim(),
            "policy verifier rejected the request"
        );
        return Err(VerifyError::VerifyFailed(format!(
            "exit status {:?}",
            output.status.code()
        )));
    }

    Ok(output.stdout)
}
