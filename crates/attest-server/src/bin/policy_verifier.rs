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

//! Reference policy verifier for integration tests: approves every
//! device and emits a fixed payload. The real policy verifier is an
//! external, pluggable binary with its own device registry and
//! decision logic; this one exists only so the orchestrator has
//! something real to invoke argv/exit-code semantics against.

use std::io::Write;

const PAYLOAD: &[u8] = b"this is the policy-approved secret payload sealed to the caller";

fn main() {
    let mut args = std::env::args().skip(1);
    let Some(command) = args.next() else {
        eprintln!("usage: policy-verifier verify <ek_hex> <workspace>");
        std::process::exit(2);
    };
    let ek_hex = args.next().unwrap_or_default();
    let workspace = args.next().unwrap_or_default();

    if command != "verify" {
        eprintln!("unknown command: {command}");
        std::process::exit(2);
    }

    eprintln!("policy-verifier: approving device {ek_hex} (workspace {workspace})");
    std::io::stdout()
        .write_all(PAYLOAD)
        .expect("failed to write payload to stdout");
}
