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

use crate::error::PortalError;
use crate::gluster::models::{
    ApiResponse, CreateLvCommand, CreateVolumeCommand, DeleteVolumeCommand, GrowVolumeCommand,
    VolInfo,
};
use crate::http::basic_auth::basic_auth;
use crate::http::error::CustomError;
use crate::http::shared::AppState;
use crate::http::COMPONENT;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{debug_handler, middleware, Json, Router};
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use tracing::error;

#[derive(Debug, Default, Deserialize)]
pub struct CheckUsageQuery {
    #[serde(default)]
    pub threshold: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    let secured = Router::new()
        .route("/sec/volume", post(create_volume))
        .route("/sec/volume/grow", post(grow_volume))
        .route("/sec/volume/delete", post(delete_volume))
        .route("/sec/lv", post(create_lv))
        .route("/sec/lv/grow", post(grow_lv))
        .route("/sec/lv/delete", post(delete_lv))
        .route_layer(middleware::from_fn_with_state(state.clone(), basic_auth));

    Router::new()
        .route("/volume/{pv_name}", get(get_volume_usage))
        .route("/volume/{pv_name}/check", get(check_volume_usage))
        .merge(secured)
        .with_state(state)
}

/// Runs a mutation on its own task so that a client hanging up cannot cancel
/// it between two commands.
async fn detached<T, F>(task: F) -> Result<T, CustomError>
where
    T: Send + 'static,
    F: Future<Output = Result<T, PortalError>> + Send + 'static,
{
    match tokio::spawn(task).await {
        Ok(result) => Ok(result?),
        Err(error) => {
            error!("{COMPONENT} (error: {error}) - volume task did not complete");
            Err(PortalError::command_failed().into())
        }
    }
}

#[debug_handler]
async fn get_volume_usage(
    State(state): State<Arc<AppState>>,
    Path(pv_name): Path<String>,
) -> Result<Json<VolInfo>, CustomError> {
    let info = state.monitor.volume_usage(&pv_name).await?;
    Ok(Json(info))
}

#[debug_handler]
async fn check_volume_usage(
    State(state): State<Arc<AppState>>,
    Path(pv_name): Path<String>,
    Query(query): Query<CheckUsageQuery>,
) -> Result<Json<ApiResponse>, CustomError> {
    state
        .monitor
        .check_usage(&pv_name, &query.threshold)
        .await?;
    Ok(Json(ApiResponse::new("Usage is below threshold")))
}

#[debug_handler]
async fn create_volume(
    State(state): State<Arc<AppState>>,
    Json(command): Json<CreateVolumeCommand>,
) -> Result<Json<ApiResponse>, CustomError> {
    let pv_name = detached(async move {
        state
            .volumes
            .create_volume(&command.project, &command.size)
            .await
    })
    .await?;
    Ok(Json(ApiResponse::new(pv_name)))
}

#[debug_handler]
async fn create_lv(
    State(state): State<Arc<AppState>>,
    Json(command): Json<CreateLvCommand>,
) -> Result<Json<ApiResponse>, CustomError> {
    detached(async move {
        state
            .volumes
            .create_lv_locally(&command.lv_name, &command.mount_point, &command.size)
            .await
    })
    .await?;
    Ok(Json(ApiResponse::new("LV created")))
}

#[debug_handler]
async fn grow_volume(
    State(state): State<Arc<AppState>>,
    Json(command): Json<GrowVolumeCommand>,
) -> Result<Json<ApiResponse>, CustomError> {
    detached(async move {
        state
            .volumes
            .grow_volume(&command.pv_name, &command.new_size)
            .await
    })
    .await?;
    Ok(Json(ApiResponse::new("Volume grown")))
}

#[debug_handler]
async fn grow_lv(
    State(state): State<Arc<AppState>>,
    Json(command): Json<GrowVolumeCommand>,
) -> Result<Json<ApiResponse>, CustomError> {
    detached(async move {
        state
            .volumes
            .grow_lv_locally(&command.pv_name, &command.new_size)
            .await
    })
    .await?;
    Ok(Json(ApiResponse::new("LV grown")))
}

#[debug_handler]
async fn delete_volume(
    State(state): State<Arc<AppState>>,
    Json(command): Json<DeleteVolumeCommand>,
) -> Result<Json<ApiResponse>, CustomError> {
    detached(async move { state.volumes.delete_volume(&command.lv_name).await }).await?;
    Ok(Json(ApiResponse::new("Volume deleted")))
}

#[debug_handler]
async fn delete_lv(
    State(state): State<Arc<AppState>>,
    Json(command): Json<DeleteVolumeCommand>,
) -> Result<Json<ApiResponse>, CustomError> {
    detached(async move { state.volumes.delete_lv_locally(&command.lv_name).await }).await?;
    Ok(Json(ApiResponse::new("LV deleted")))
}
