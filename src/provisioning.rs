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

//! Portal-side entry point for volume requests: the caller is authorized on
//! the project first, the request is validated, and only then handed to a
//! storage backend.

use crate::authz::resolver::PermissionResolver;
use crate::error::{PortalError, MISSING_INPUT_ERROR};
use crate::gluster::models::{ApiResponse, CreateVolumeCommand, GrowVolumeCommand};
use crate::gluster::naming;
use crate::gluster::peer_client::API_USER;
use crate::gluster::sizing::{validate_size, SizeLimit, Technology};
use crate::gluster::volumes::VolumeOrchestrator;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

const COMPONENT: &str = "PROVISIONING";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VolumeLifecycle: Send + Sync {
    /// Returns the storage-side name `<project>_pv<N>`.
    async fn create_volume(&self, project: &str, size: &str) -> Result<String, PortalError>;

    async fn grow_volume(&self, pv_name: &str, new_size: &str) -> Result<(), PortalError>;
}

#[async_trait]
impl VolumeLifecycle for VolumeOrchestrator {
    async fn create_volume(&self, project: &str, size: &str) -> Result<String, PortalError> {
        VolumeOrchestrator::create_volume(self, project, size).await
    }

    async fn grow_volume(&self, pv_name: &str, new_size: &str) -> Result<(), PortalError> {
        VolumeOrchestrator::grow_volume(self, pv_name, new_size).await
    }
}

/// Talks to the management API of a remote storage node.
#[derive(Debug, Clone)]
pub struct GlusterApiClient {
    client: reqwest::Client,
    base_url: String,
    secret: String,
}

impl GlusterApiClient {
    pub fn new(base_url: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            secret: secret.into(),
        }
    }

    async fn post<T: Serialize + Sync>(&self, path: &str, body: &T) -> Result<ApiResponse, PortalError> {
        let url = format!("{}/{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .basic_auth(API_USER, Some(&self.secret))
            .json(body)
            .send()
            .await
            .map_err(|error| {
                error!("{COMPONENT} (error: {error}) - gluster API not reachable, url: {url}");
                PortalError::api_failed()
            })?;

        let status = response.status();
        let message = response
            .json::<ApiResponse>()
            .await
            .map(|response| response.message)
            .unwrap_or_default();
        match status {
            StatusCode::OK => Ok(ApiResponse::new(message)),
            StatusCode::BAD_REQUEST if !message.is_empty() => Err(PortalError::Validation(message)),
            _ => {
                error!("{COMPONENT} - gluster API call: {url} failed with status: {status}, message: {message}");
                Err(PortalError::api_failed())
            }
        }
    }
}

#[async_trait]
impl VolumeLifecycle for GlusterApiClient {
    async fn create_volume(&self, project: &str, size: &str) -> Result<String, PortalError> {
        let command = CreateVolumeCommand {
            project: project.to_owned(),
            size: size.to_owned(),
        };
        Ok(self.post("sec/volume", &command).await?.message)
    }

    async fn grow_volume(&self, pv_name: &str, new_size: &str) -> Result<(), PortalError> {
        let command = GrowVolumeCommand {
            pv_name: pv_name.to_owned(),
            new_size: new_size.to_owned(),
        };
        self.post("sec/volume/grow", &command).await?;
        Ok(())
    }
}

/// Names under which a new volume is known to OpenShift and to gluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVolumeResponse {
    pub pv_name: String,
    pub path: String,
}

impl NewVolumeResponse {
    /// OpenShift PV names cannot contain `_`, and the `gl-` prefix keeps them
    /// apart from volumes of other storage technologies.
    pub fn from_volume(volume: &str) -> Self {
        Self {
            pv_name: format!("gl-{}", volume.replacen('_', "-", 1)),
            path: format!("vol_{volume}"),
        }
    }
}

pub struct Provisioner {
    resolver: Arc<PermissionResolver>,
    lifecycle: Arc<dyn VolumeLifecycle>,
    limit: SizeLimit,
}

impl Provisioner {
    pub fn new(
        resolver: Arc<PermissionResolver>,
        lifecycle: Arc<dyn VolumeLifecycle>,
        limit: SizeLimit,
    ) -> Self {
        Self {
            resolver,
            lifecycle,
            limit,
        }
    }

    pub async fn create_volume(
        &self,
        principal: &str,
        project: &str,
        size: &str,
    ) -> Result<NewVolumeResponse, PortalError> {
        if project.is_empty() || size.is_empty() {
            return Err(PortalError::validation(MISSING_INPUT_ERROR));
        }
        self.resolver.authorize(principal, project).await?;
        validate_size(size, Technology::Gluster, self.limit)?;

        let volume = self.lifecycle.create_volume(project, size).await?;
        info!("{principal} created a gluster volume. Project: {project}, size: {size}");
        Ok(NewVolumeResponse::from_volume(&volume))
    }

    /// `project` is the namespace the PV is bound to. The volume itself names
    /// its owning project, and the two must agree before the caller is
    /// authorized on it.
    pub async fn grow_volume(
        &self,
        principal: &str,
        project: &str,
        pv_name: &str,
        new_size: &str,
    ) -> Result<(), PortalError> {
        if project.is_empty() || pv_name.is_empty() || new_size.is_empty() {
            return Err(PortalError::validation(MISSING_INPUT_ERROR));
        }
        let volume = naming::parse_pv_name(pv_name)?;
        if volume.project != project {
            return Err(PortalError::validation(format!(
                "Volume {pv_name} does not belong to project {project}"
            )));
        }
        self.resolver.authorize(principal, &volume.project).await?;
        validate_size(new_size, Technology::Any, self.limit)?;

        self.lifecycle.grow_volume(pv_name, new_size).await?;
        info!("{principal} grew gluster volume: {pv_name} to: {new_size}");
        Ok(())
    }
}
