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

//! Minimal big-endian cursor over a borrowed byte slice. TPM wire
//! structures are all big-endian, length-prefixed substructures.

use byteorder::{BigEndian, ReadBytesExt};

use crate::{WireError, WireResult};

pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn need(&self, n: usize) -> WireResult<()> {
        if self.remaining() < n {
            Err(WireError::UnexpectedEof {
                needed: n,
                available: self.remaining(),
            })
        } else {
            Ok(())
        }
    }

    pub fn take(&mut self, n: usize) -> WireResult<&'a [u8]> {
        self.need(n)?;
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn u8(&mut self) -> WireResult<u8> {
        self.need(1)?;
        let v = self.buf[self.pos];
        self.pos += 1;
        Ok(v)
    }

    pub fn u16(&mut self) -> WireResult<u16> {
        self.need(2)?;
        let mut slice = &self.buf[self.pos..self.pos + 2];
        self.pos += 2;
        slice
            .read_u16::<BigEndian>()
            .map_err(|e| WireError::Other(e.to_string()))
    }

    pub fn u32(&mut self) -> WireResult<u32> {
        self.need(4)?;
        let mut slice = &self.buf[self.pos..self.pos + 4];
        self.pos += 4;
        slice
            .read_u32::<BigEndian>()
            .map_err(|e| WireError::Other(e.to_string()))
    }

    pub fn u64(&mut self) -> WireResult<u64> {
        self.need(8)?;
        let mut slice = &self.buf[self.pos..self.pos + 8];
        self.pos += 8;
        slice
            .read_u64::<BigEndian>()
            .map_err(|e| WireError::Other(e.to_string()))
    }

    /// Reads a `TPM2B`-style length-prefixed (u16) byte buffer.
    pub fn tpm2b(&mut self) -> WireResult<&'a [u8]> {
        let len = self.u16()? as usize;
        self.take(len)
    }

    /// Asserts the reader has been fully consumed, mapping leftover
    /// bytes to `WireError::TrailingBytes` — the decoder must reject
    /// trailing bytes after a length-delimited substructure.
    pub fn finish(self, what: &'static str) -> WireResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(WireError::TrailingBytes {
                what,
                count: self.remaining(),
            })
        }
    }
}
