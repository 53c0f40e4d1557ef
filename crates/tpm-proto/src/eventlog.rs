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

//! TCG binary measurement log (`TCG_PCR_EVENT2`) and IMA text log
//! parsing. Both are ordered sequences of `(pcr, alg, digest)`
//! extension events; the event-log replay component folds them.

use crate::alg::{Digest, HashAlg};
use crate::reader::Reader;
use crate::{WireError, WireResult};

const EV_NO_ACTION: u32 = 0x0000_0003;
/// Event signature prefix the TCG spec uses to seed PCRs 17-22 from a
/// non-zero starting locality.
const STARTUP_LOCALITY_SIGNATURE: &[u8] = b"StartupLocality\0";

#[derive(Debug, Clone)]
pub struct ParsedEvent {
    pub pcr_index: u8,
    pub event_type: u32,
    pub digests: Vec<Digest>,
}

#[derive(Debug, Clone, Default)]
pub struct EventLog {
    pub events: Vec<ParsedEvent>,
    /// Locality seed discovered from a `StartupLocality` event, if any.
    pub startup_locality: Option<u8>,
}

impl EventLog {
    /// Parses a TCG binary measurement log: one legacy `TCG_PCR_EVENT`
    /// header record followed by zero or more crypto-agile
    /// `TCG_PCR_EVENT2` records.
    pub fn parse(raw: &[u8]) -> WireResult<Self> {
        let mut r = Reader::new(raw);
        let mut log = EventLog::default();

        if r.is_empty() {
            return Ok(log);
        }

        let header = parse_legacy_header(&mut r)?;
        if let Some(locality) = extract_startup_locality(&header) {
            log.startup_locality = Some(locality);
        }

        while !r.is_empty() {
            let event = parse_event2(&mut r)?;
            log.events.push(event);
        }

        Ok(log)
    }

    /// Events touching a given `(alg, pcr)`, in log order.
    pub fn events_for(&self, alg: HashAlg, pcr: u8) -> impl Iterator<Item = &Digest> {
        self.events.iter().filter_map(move |e| {
            if e.pcr_index == pcr {
                e.digests.iter().find(|d| d.alg() == alg)
            } else {
                None
            }
        })
    }

    pub fn has_alg(&self, alg: HashAlg) -> bool {
        self.events.iter().any(|e| e.digests.iter().any(|d| d.alg() == alg))
    }

    /// Folds `extend` over every event touching `(alg, pcr)`, seeding
    /// the accumulator from a `StartupLocality` event when present for
    /// PCRs 17-22, per the `EventLog` invariant.
    pub fn replay(&self, alg: HashAlg, pcr: u8) -> WireResult<Option<Digest>> {
        let mut events = self.events_for(alg, pcr).peekable();
        if events.peek().is_none() {
            return Ok(None);
        }

        let mut acc = if (17..=22).contains(&pcr) {
            match self.startup_locality {
                Some(locality) => Digest::locality_seed(alg, locality),
                None => alg.zero(),
            }
        } else {
            alg.zero()
        };

        for digest in events {
            acc = alg.extend(&acc, digest.as_bytes())?;
        }

        Ok(Some(acc))
    }
}

struct LegacyHeader {
    event_data: Vec<u8>,
}

fn parse_legacy_header(r: &mut Reader) -> WireResult<LegacyHeader> {
    let _pcr_index = r.u32()?;
    let event_type = r.u32()?;
    let _digest = r.take(20)?; // SHA-1, fixed width in the legacy record
    let event_size = r.u32()? as usize;
    let event_data = r.take(event_size)?.to_vec();

    if event_type != EV_NO_ACTION {
        // Not fatal on its own; the header record's type is
        // informational for locality detection only.
    }

    Ok(LegacyHeader { event_data })
}

fn extract_startup_locality(header: &LegacyHeader) -> Option<u8> {
    let data = &header.event_data;
    if data.len() >= STARTUP_LOCALITY_SIGNATURE.len() + 1
        && &data[..STARTUP_LOCALITY_SIGNATURE.len()] == STARTUP_LOCALITY_SIGNATURE
    {
        Some(data[STARTUP_LOCALITY_SIGNATURE.len()])
    } else {
        None
    }
}

fn parse_event2(r: &mut Reader) -> WireResult<ParsedEvent> {
    let pcr_index_raw = r.u32()?;
    let pcr_index: u8 = pcr_index_raw
        .try_into()
        .map_err(|_| WireError::PcrIndexOutOfRange(u8::MAX))?;
    if pcr_index > 23 {
        return Err(WireError::PcrIndexOutOfRange(pcr_index));
    }
    let event_type = r.u32()?;

    let digest_count = r.u32()?;
    let mut digests = Vec::with_capacity(digest_count as usize);
    for _ in 0..digest_count {
        let alg = HashAlg::from_tpm_id(r.u16()?)?;
        let bytes = r.take(alg.digest_size())?.to_vec();
        digests.push(Digest::new(alg, bytes).map_err(|e| WireError::Other(e.to_string()))?);
    }

    let event_size = r.u32()? as usize;
    let _event_data = r.take(event_size)?;

    Ok(ParsedEvent {
        pcr_index,
        event_type,
        digests,
    })
}

/// Parses an IMA ASCII runtime measurement log. Each line is
/// `<pcr> <template-hash-hex> <template-name> <filedata-hash> <path>`;
/// the template hash is the value folded into the named PCR (commonly
/// 10), independent of the TCG binary log's replay.
pub fn parse_ima_log(text: &str, default_alg: HashAlg) -> WireResult<EventLog> {
    let mut log = EventLog::default();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split_whitespace();
        let pcr: u8 = fields
            .next()
            .ok_or_else(|| WireError::Other("IMA line missing PCR field".into()))?
            .parse()
            .map_err(|_| WireError::Other("IMA line has non-numeric PCR field".into()))?;
        if pcr > 23 {
            return Err(WireError::PcrIndexOutOfRange(pcr));
        }
        let hash_hex = fields
            .next()
            .ok_or_else(|| WireError::Other("IMA line missing template hash field".into()))?;
        let bytes = decode_hex(hash_hex)
            .map_err(|e| WireError::Other(format!("IMA line has invalid hex digest: {e}")))?;
        let alg = match bytes.len() {
            20 => HashAlg::Sha1,
            32 => HashAlg::Sha256,
            48 => HashAlg::Sha384,
            64 => HashAlg::Sha512,
            _ => default_alg,
        };
        let digest = if bytes.len() == alg.digest_size() {
            Digest::new(alg, bytes).map_err(|e| WireError::Other(e.to_string()))?
        } else {
            // All-zero placeholder hash used by some IMA templates
            // before the first real event; treat as a no-op extend.
            alg.zero()
        };
        log.events.push(ParsedEvent {
            pcr_index: pcr,
            event_type: 0,
            digests: vec![digest],
        });
    }
    Ok(log)
}

fn decode_hex(s: &str) -> Result<Vec<u8>, String> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.len() % 2 != 0 {
        return Err("odd-length hex string".to_string());
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(|e| e.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy_header(event_data: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&0u32.to_be_bytes()); // pcr 0
        buf.extend_from_slice(&EV_NO_ACTION.to_be_bytes());
        buf.extend_from_slice(&[0u8; 20]);
        buf.extend_from_slice(&(event_data.len() as u32).to_be_bytes());
        buf.extend_from_slice(event_data);
        buf
    }

    fn event2(pcr: u32, alg: HashAlg, digest: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&pcr.to_be_bytes());
        buf.extend_from_slice(&0u32.to_be_bytes()); // event type, unused by replay
        buf.extend_from_slice(&1u32.to_be_bytes()); // 1 digest
        buf.extend_from_slice(&alg.tpm_id().to_be_bytes());
        buf.extend_from_slice(digest);
        buf.extend_from_slice(&0u32.to_be_bytes()); // empty event data
        buf
    }

    #[test]
    fn replay_matches_sequential_extend() {
        let mut raw = legacy_header(b"");
        raw.extend(event2(0, HashAlg::Sha256, &[0x11u8; 32]));
        raw.extend(event2(0, HashAlg::Sha256, &[0x22u8; 32]));
        let log = EventLog::parse(&raw).unwrap();

        let replayed = log.replay(HashAlg::Sha256, 0).unwrap().unwrap();

        let acc = HashAlg::Sha256.zero();
        let acc = HashAlg::Sha256.extend(&acc, &[0x11u8; 32]).unwrap();
        let acc = HashAlg::Sha256.extend(&acc, &[0x22u8; 32]).unwrap();
        assert_eq!(replayed, acc);
    }

    #[test]
    fn missing_pcr_replays_to_none() {
        let raw = legacy_header(b"");
        let log = EventLog::parse(&raw).unwrap();
        assert!(log.replay(HashAlg::Sha256, 7).unwrap().is_none());
    }

    #[test]
    fn startup_locality_seeds_pcr17_22() {
        let mut event_data = STARTUP_LOCALITY_SIGNATURE.to_vec();
        event_data.push(3);
        let mut raw = legacy_header(&event_data);
        raw.extend(event2(17, HashAlg::Sha256, &[0x01u8; 32]));
        let log = EventLog::parse(&raw).unwrap();

        let replayed = log.replay(HashAlg::Sha256, 17).unwrap().unwrap();
        let seed = Digest::locality_seed(HashAlg::Sha256, 3);
        let expected = HashAlg::Sha256.extend(&seed, &[0x01u8; 32]).unwrap();
        assert_eq!(replayed, expected);
    }

    #[test]
    fn parses_ima_text_log() {
        let hash = "11".repeat(32);
        let text = format!("10 {hash} ima-ng sha256:{hash} /usr/bin/bash\n");
        let log = parse_ima_log(&text, HashAlg::Sha256).unwrap();
        assert_eq!(log.events.len(), 1);
        assert_eq!(log.events[0].pcr_index, 10);
    }
}
