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

//! Cross-checks a TCG binary event log (and, independently, an IMA
//! runtime measurement log) against the PCR values a quote already
//! verified.

use tpm_proto::{EventLog, PcrBank};

use crate::error::{VerifyError, VerifyResult};

/// Event-log acceptance policy. `require_eventlog` controls whether a
/// request without any event log is accepted (the TPM quote alone is
/// still a valid attestation; the event log only adds an independent
/// cross-check).
#[derive(Debug, Clone, Copy)]
pub struct EventlogPolicy {
    pub require_eventlog: bool,
    pub ima_pcr: u8,
}

impl Default for EventlogPolicy {
    fn default() -> Self {
        Self {
            require_eventlog: false,
            ima_pcr: 10,
        }
    }
}

/// Replays `eventlog` and compares the result against every PCR the
/// quote covered. A PCR the log never mentions is accepted as-is —
/// the quote's own signature already vouches for its value; the log
/// only has to agree where it speaks.
pub fn verify_against_quoted_pcrs(
    eventlog: Option<&EventLog>,
    pcr_bank: &PcrBank,
    policy: &EventlogPolicy,
) -> VerifyResult<()> {
    let Some(eventlog) = eventlog else {
        if policy.require_eventlog {
            return Err(VerifyError::BadEventlog(
                "no event log supplied and one is required by policy".into(),
            ));
        }
        return Ok(());
    };

    let selection = pcr_bank.selection();
    for alg in selection.algs() {
        if !eventlog.has_alg(alg) {
            return Err(VerifyError::InvalidEventlogAlg(alg));
        }
    }

    for alg in selection.algs() {
        let Some(pcrs) = selection.pcrs(alg) else {
            continue;
        };
        for &pcr in pcrs {
            let quoted = pcr_bank
                .get(alg, pcr)
                .expect("selection is derived from the same bank");
            if let Some(replayed) = eventlog.replay(alg, pcr)? {
                if &replayed != quoted {
                    return Err(VerifyError::BadEventlog(format!(
                        "PCR {pcr} ({alg:?}) event-log replay disagrees with the quoted value"
                    )));
                }
            }
        }
    }

    Ok(())
}

/// Replays an IMA runtime measurement log against the single PCR it
/// extends (`policy.ima_pcr`), independent of whether a TCG binary log
/// was also supplied. A device is free to submit neither, either, or
/// both logs.
pub fn verify_ima_log(
    ima_log: Option<&EventLog>,
    pcr_bank: &PcrBank,
    policy: &EventlogPolicy,
) -> VerifyResult<()> {
    let Some(ima_log) = ima_log else {
        return Ok(());
    };

    for alg in pcr_bank.algs() {
        let Some(quoted) = pcr_bank.get(alg, policy.ima_pcr) else {
            continue;
        };
        if let Some(replayed) = ima_log.replay(alg, policy.ima_pcr)? {
            if &replayed != quoted {
                return Err(VerifyError::BadEventlog(format!(
                    "IMA log replay disagrees with the quoted value of PCR {}",
                    policy.ima_pcr
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use tpm_proto::{Digest, HashAlg};

    use super::*;

    fn bank_with(pcr: u8, value: [u8; 32]) -> PcrBank {
        let mut bank = PcrBank::new();
        bank.insert(HashAlg::Sha256, pcr, Digest::new(HashAlg::Sha256, value.to_vec()).unwrap());
        bank
    }

    fn legacy_header() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf.extend_from_slice(&0x0000_0003u32.to_be_bytes());
        buf.extend_from_slice(&[0u8; 20]);
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf
    }

    fn event2(pcr: u32, digest: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&pcr.to_be_bytes());
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf.extend_from_slice(&1u32.to_be_bytes());
        buf.extend_from_slice(&HashAlg::Sha256.tpm_id().to_be_bytes());
        buf.extend_from_slice(digest);
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf
    }

    #[test]
    fn accepts_missing_eventlog_by_default() {
        let bank = bank_with(0, [0x11u8; 32]);
        let policy = EventlogPolicy::default();
        assert!(verify_against_quoted_pcrs(None, &bank, &policy).is_ok());
    }

    #[test]
    fn rejects_missing_eventlog_when_required() {
        let bank = bank_with(0, [0x11u8; 32]);
        let policy = EventlogPolicy {
            require_eventlog: true,
            ..EventlogPolicy::default()
        };
        assert!(matches!(
            verify_against_quoted_pcrs(None, &bank, &policy),
            Err(VerifyError::BadEventlog(_))
        ));
    }

    #[test]
    fn accepts_a_log_that_replays_to_the_quoted_value() {
        let acc = HashAlg::Sha256.zero();
        let extended = HashAlg::Sha256.extend(&acc, &[0x22u8; 32]).unwrap();
        let bank = bank_with(0, extended.as_bytes().try_into().unwrap());

        let mut raw = legacy_header();
        raw.extend(event2(0, &[0x22u8; 32]));
        let log = EventLog::parse(&raw).unwrap();

        let policy = EventlogPolicy::default();
        assert!(verify_against_quoted_pcrs(Some(&log), &bank, &policy).is_ok());
    }

    #[test]
    fn rejects_a_log_that_disagrees_with_the_quote() {
        let bank = bank_with(0, [0x11u8; 32]);

        let mut raw = legacy_header();
        raw.extend(event2(0, &[0x22u8; 32]));
        let log = EventLog::parse(&raw).unwrap();

        let policy = EventlogPolicy::default();
        assert!(matches!(
            verify_against_quoted_pcrs(Some(&log), &bank, &policy),
            Err(VerifyError::BadEventlog(_))
        ));
    }

    #[test]
    fn rejects_a_log_missing_a_quoted_algorithm() {
        let bank = bank_with(0, [0x11u8; 32]);
        let log = EventLog::default();
        let policy = EventlogPolicy::default();
        assert!(matches!(
            verify_against_quoted_pcrs(Some(&log), &bank, &policy),
            Err(VerifyError::InvalidEventlogAlg(HashAlg::Sha256))
        ));
    }
}
