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

//! Wire-format parsing for the TPM 2.0 structures used in remote
//! attestation: `TPMT_PUBLIC`, `TPMS_ATTEST`, `TPMT_SIGNATURE`, PCR
//! selections and the TCG event log. Nothing here talks to a TPM; it
//! only decodes the big-endian byte layouts the TPM 2.0 Structures
//! spec defines.

pub mod alg;
pub mod eventlog;
pub mod pcrfile;
pub mod public;
pub mod quote;
pub mod reader;
pub mod signature;

pub use alg::{Digest, HashAlg};
pub use eventlog::{EventLog, ParsedEvent};
pub use public::{AkAttributes, PublicParams, SigningScheme, TpmtPublic};
pub use quote::{PcrBank, PcrSelection, TpmsAttest};
pub use signature::TpmtSignature;

/// Every failure from this crate is a structural parse failure —
/// `MALFORMED` in the taxonomy of the owning spec.
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone)]
pub enum WireError {
    #[error("buffer underrun: needed {needed} bytes, had {available}")]
    UnexpectedEof { needed: usize, available: usize },
    #[error("trailing bytes after parsing {what}: {count} unconsumed")]
    TrailingBytes { what: &'static str, count: usize },
    #[error("unknown TPM_ALG_ID {0:#06x}")]
    UnknownAlgorithm(u16),
    #[error("PCR index {0} out of range 0..=23")]
    PcrIndexOutOfRange(u8),
    #[error("PCR selection size {size} is invalid for alg {alg:#06x}")]
    InvalidSelectionSize { alg: u16, size: u8 },
    #[error("bad magic {0:#010x}, expected TPM2_GENERATED_VALUE")]
    BadMagic(u32),
    #[error("unexpected TPMS_ATTEST type {0:#06x}, expected TPM_ST_ATTEST_QUOTE")]
    NotAQuote(u16),
    #[error("{0}")]
    Other(String),
}

pub type WireResult<T> = Result<T, WireError>;
