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
use std::path::PathBuf;

use clap::Parser;
use eyre::WrapErr;
use tracing::metadata::LevelFilter;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

mod config;
mod error;
mod policy;
mod routes;
mod workspace;

use config::{ConfigError, ServerConfig};
use routes::AppState;

#[tokio::main]
async fn main() -> Result<(), eyre::Report> {
    let options = Options::parse();

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy()
        .add_directive("tower_http=warn".parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("carbide_attest_server=info".parse()?)
        .add_directive("attestation=info".parse()?);

    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(env_filter)
        .try_init()?;

    match options.command {
        Command::Run(run_command) => {
            let config: ServerConfig = run_command.try_into()?;

            tracing::info!(
                listen = %config.listen,
                bindir = %config.bindir.display(),
                require_eventlog = config.require_eventlog,
                "starting attestation server"
            );

            let state = AppState {
                config: std::sync::Arc::new(config.clone()),
            };

            let listener = tokio::net::TcpListener::bind(config.listen)
                .await
                .wrap_err("failed to bind listen address")?;

            axum::serve(listener, routes::router(state))
                .await
                .wrap_err("attestation server exited")?;
        }
    }

    Ok(())
}

#[derive(Parser)]
pub struct Options {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Parser)]
pub enum Command {
    #[clap(about = "Start the attestation server")]
    Run(RunCommand),
}

#[derive(Parser)]
pub struct RunCommand {
    #[clap(long, short = 'f', help = "Path to TOML configuration file")]
    config_file: Option<PathBuf>,

    #[clap(long, env = "BINDIR", help = "Directory containing the policy verifier binary")]
    pub bindir: Option<PathBuf>,

    #[clap(long, env = "ATTEST_LISTEN", help = "Address to listen on")]
    pub listen: Option<SocketAddr>,

    #[clap(long, help = "Reject requests with no event log part")]
    pub require_eventlog: bool,

    #[clap(long, help = "PCR the IMA log is expected to extend")]
    pub ima_pcr: Option<u8>,

    #[clap(long, help = "Policy verifier binary name within BINDIR")]
    pub policy_verifier: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum CommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl TryInto<ServerConfig> for RunCommand {
    type Error = CommandError;

    fn try_into(self) -> Result<ServerConfig, Self::Error> {
        let mut config = if let Some(config_path) = self.config_file {
            ServerConfig::load(&config_path)?
        } else {
            ServerConfig::default()
        };

        if let Some(bindir) = self.bindir {
            config.bindir = bindir;
        }
        if let Some(listen) = self.listen {
            config.listen = listen;
        }
        if self.require_eventlog {
            config.require_eventlog = true;
        }
        if let Some(ima_pcr) = self.ima_pcr {
            config.ima_pcr = ima_pcr;
        }
        if let Some(policy_verifier) = self.policy_verifier {
            config.policy_verifier = policy_verifier;
        }

        Ok(config)
    }
}
