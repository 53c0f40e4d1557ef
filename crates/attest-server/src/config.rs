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

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use attestation::EventlogPolicy;
use serde::{Deserialize, Serialize};

const DEFAULT_LISTEN: &str = "0.0.0.0:8443";
const DEFAULT_IMA_PCR: u8 = 10;
const DEFAULT_POLICY_VERIFIER: &str = "policy-verifier";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    /// Directory containing the policy verifier binary. Read once at
    /// process start; never reloaded mid-request.
    #[serde(default = "Defaults::bindir")]
    pub bindir: PathBuf,
    #[serde(default = "Defaults::listen")]
    pub listen: SocketAddr,
    #[serde(default = "Defaults::require_eventlog")]
    pub require_eventlog: bool,
    #[serde(default = "Defaults::ima_pcr")]
    pub ima_pcr: u8,
    #[serde(default = "Defaults::policy_verifier")]
    pub policy_verifier: String,
}

impl ServerConfig {
    pub fn eventlog_policy(&self) -> EventlogPolicy {
        EventlogPolicy {
            require_eventlog: self.require_eventlog,
            ima_pcr: self.ima_pcr,
        }
    }
}

pub struct Defaults;

impl Defaults {
    pub fn bindir() -> PathBuf {
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    }

    pub fn listen() -> SocketAddr {
        DEFAULT_LISTEN
            .parse()
            .expect("BUG: default listen address is invalid")
    }

    pub fn require_eventlog() -> bool {
        false
    }

    pub fn ima_pcr() -> u8 {
        DEFAULT_IMA_PCR
    }

    pub fn policy_verifier() -> String {
        DEFAULT_POLICY_VERIFIER.to_string()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bindir: Defaults::bindir(),
            listen: Defaults::listen(),
            require_eventlog: Defaults::require_eventlog(),
            ima_pcr: Defaults::ima_pcr(),
            policy_verifier: Defaults::policy_verifier(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config file: {path}: {error}")]
    CouldNotRead { path: String, error: std::io::Error },
    #[error("Invalid TOML in config file: {path}: {error}")]
    InvalidToml { path: String, error: toml::de::Error },
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let cfg = std::fs::read_to_string(path).map_err(|error| ConfigError::CouldNotRead {
            path: path.to_string_lossy().to_string(),
            error,
        })?;
        toml::from_str::<Self>(&cfg).map_err(|error| ConfigError::InvalidToml {
            path: path.to_string_lossy().to_string(),
            error,
        })
    }
}
