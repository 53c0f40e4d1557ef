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

//! Extension point for where the nonce a quote is checked against
//! comes from. The default trusts the client's own choice; a server
//! wanting replay protection independent of the client can supply a
//! different source without touching the quote verifier.

/// Produces the nonce a quote's `extraData` is checked against, given
/// whatever nonce the client claims to have used.
pub trait NonceSource: Send + Sync {
    fn nonce(&self, client_nonce: &[u8]) -> Vec<u8>;
}

/// Trusts the client-supplied nonce unmodified. The default for this
/// service; a quote's `extraData` already binds it to a single
/// request regardless of who picked the value.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClientNonce;

impl NonceSource for ClientNonce {
    fn nonce(&self, client_nonce: &[u8]) -> Vec<u8> {
        client_nonce.to_vec()
    }
}
