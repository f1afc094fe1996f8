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

use crate::configs::http::HttpConfig;
use crate::error::PortalError;
use crate::http::shared::AppState;
use crate::http::{system, volumes, COMPONENT};
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(system::router(state.clone()))
        .merge(volumes::router(state))
        .layer(TraceLayer::new_for_http())
}

pub async fn bind(config: &HttpConfig) -> Result<TcpListener, PortalError> {
    let address = config.socket_addr()?;
    TcpListener::bind(address).await.map_err(|error| {
        error!("{COMPONENT} (error: {error}) - failed to bind HTTP listener on: {address}");
        PortalError::Configuration(format!("Cannot bind HTTP listener on: {address}"))
    })
}

/// Serves the API on an already bound listener until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: F,
) -> Result<SocketAddr, PortalError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let address = listener.local_addr().map_err(|error| {
        error!("{COMPONENT} (error: {error}) - failed to read listener address");
        PortalError::command_failed()
    })?;
    info!("Started HTTP API on: {address}");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|error| {
            error!("{COMPONENT} (error: {error}) - HTTP API terminated unexpectedly");
            PortalError::command_failed()
        })?;

    info!("HTTP API on: {address} stopped");
    Ok(address)
}
