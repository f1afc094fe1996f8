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

use crate::authz::role_binding::{RoleBinding, RoleBindingSource};
use crate::authz::COMPONENT;
use crate::configs::authz::OpenShiftConfig;
use crate::error::PortalError;
use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{error, warn};

#[derive(Debug, Deserialize)]
struct RoleBindingList {
    #[serde(default)]
    items: Vec<RoleBinding>,
}

#[derive(Debug, Deserialize)]
struct Group {
    #[serde(default)]
    users: Option<Vec<String>>,
}

/// Read-only client for the OpenShift REST API, authenticated with a service
/// account token.
#[derive(Debug, Clone)]
pub struct OpenShiftClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl OpenShiftClient {
    pub fn new(config: &OpenShiftConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.url.trim_end_matches('/').to_owned(),
            token: config.token.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn get(&self, path: &str) -> Result<Response, PortalError> {
        let url = self.url(path);
        self.client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|error| {
                error!("{COMPONENT} (error: {error}) - request to OpenShift failed, url: {url}");
                PortalError::api_failed()
            })
    }

    async fn parse<T: DeserializeOwned>(response: Response, path: &str) -> Result<T, PortalError> {
        response.json::<T>().await.map_err(|error| {
            error!("{COMPONENT} (error: {error}) - error parsing body of response from: {path}");
            PortalError::api_failed()
        })
    }
}

#[async_trait]
impl RoleBindingSource for OpenShiftClient {
    async fn role_bindings(&self, project: &str) -> Result<Vec<RoleBinding>, PortalError> {
        let path = format!("apis/rbac.authorization.k8s.io/v1/namespaces/{project}/rolebindings");
        let response = self.get(&path).await?;
        match response.status() {
            StatusCode::NOT_FOUND => {
                warn!("Project was not found: {project}");
                Err(PortalError::NotFound(format!(
                    "Project {project} does not exist"
                )))
            }
            StatusCode::FORBIDDEN => {
                error!("{COMPONENT} - cannot list role bindings of project: {project}, forbidden");
                Err(PortalError::api_failed())
            }
            status if !status.is_success() => {
                error!("{COMPONENT} - listing role bindings of project: {project} failed with status: {status}");
                Err(PortalError::api_failed())
            }
            _ => Ok(Self::parse::<RoleBindingList>(response, &path).await?.items),
        }
    }

    async fn group_members(&self, group: &str) -> Result<Vec<String>, PortalError> {
        let path = format!("apis/user.openshift.io/v1/groups/{group}");
        let response = self.get(&path).await?;
        match response.status() {
            StatusCode::NOT_FOUND => {
                warn!("Group was not found: {group}");
                Ok(Vec::new())
            }
            status if !status.is_success() => {
                error!("{COMPONENT} - reading group: {group} failed with status: {status}");
                Err(PortalError::api_failed())
            }
            _ => Ok(Self::parse::<Group>(response, &path)
                .await?
                .users
                .unwrap_or_default()),
        }
    }
}
