/* Licensed to the Apache Software Foundation (ASF) under one
 * or more contributor license agreements.  See the NOTICE file
 * distributed with this work for additional information
 * regarding copyright ownership.  The ASF licenses this file
 * to you under the Apache License, Version 2.0 (the
 * "License"); you may not use this file except in compliance
 * with the License.  You may obtain a copy of the License at
 *
 *   http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing,
 * software distributed under the License is distributed on an
 * "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
 * KIND, either express or implied.  See the License for the
 * specific language governing permissions and limitations
 * under the License.
 */

use clap::Parser;
use dotenvy::dotenv;
use figlet_rs::FIGfont;
use ssp_backend::configs::loader::load_config;
use ssp_backend::gluster::executor::LocalExecutor;
use ssp_backend::gluster::fanout::PeerFanOut;
use ssp_backend::gluster::monitoring::VolumeMonitor;
use ssp_backend::gluster::peer_client::HttpPeerClient;
use ssp_backend::gluster::peers::GlusterCli;
use ssp_backend::gluster::runner::BashRunner;
use ssp_backend::gluster::volumes::VolumeOrchestrator;
use ssp_backend::http::http_server;
use ssp_backend::http::shared::AppState;
use ssp_backend::PortalError;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

#[derive(Debug, Parser)]
#[command(author, version, about = "Gluster volume API of the self-service portal")]
struct Args {
    /// Path to the TOML configuration file. Environment variables prefixed
    /// with `SSP_` override its values.
    #[arg(short, long, env = "SSP_CONFIG_PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), PortalError> {
    if let Ok(font) = FIGfont::standard() {
        if let Some(figure) = font.convert("SSP Gluster API") {
            eprintln!("{figure}");
        }
    }

    if let Ok(path) = dotenv() {
        eprintln!(
            "Loaded environment variables from .env file at path: {}",
            path.display()
        );
    }

    let args = Args::parse();

    Registry::default()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or(EnvFilter::new("INFO")))
        .init();

    let config = load_config(args.config.as_deref()).inspect_err(|error| {
        error!("Invalid configuration: {error}");
    })?;

    let gluster = Arc::new(config.gluster);
    let executor = LocalExecutor::new(Arc::new(BashRunner));
    let discovery = Arc::new(GlusterCli::new(
        executor.clone(),
        gluster.local_address.clone(),
    ));
    let peer_client = Arc::new(HttpPeerClient::new(gluster.port, gluster.secret.clone()));
    let fan_out = PeerFanOut::new(discovery, peer_client);

    let state = Arc::new(AppState {
        secret: gluster.secret.clone(),
        volumes: VolumeOrchestrator::new(gluster.clone(), executor.clone(), fan_out),
        monitor: VolumeMonitor::new(executor),
    });

    let listener = http_server::bind(&config.http).await?;
    http_server::serve(listener, state, shutdown_signal()).await?;

    info!("SSP Gluster API stopped successfully");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (
            signal(SignalKind::interrupt()),
            signal(SignalKind::terminate()),
        ) {
            (Ok(mut ctrl_c), Ok(mut sigterm)) => {
                tokio::select! {
                    _ = ctrl_c.recv() => {
                        info!("Received SIGINT. Shutting down SSP Gluster API...");
                    },
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM. Shutting down SSP Gluster API...");
                    }
                }
                return;
            }
            (Err(error), _) | (_, Err(error)) => {
                error!("Failed to register signal handlers: {error}");
            }
        }
    }

    if let Err(error) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {error}");
    }
}
