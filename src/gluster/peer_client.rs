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

use crate::gluster::models::{CreateLvCommand, DeleteVolumeCommand, GrowVolumeCommand};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Basic-auth user every node expects on its `/sec` routes.
pub const API_USER: &str = "GLUSTER_API";

#[derive(Debug, Error)]
pub enum PeerCallError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status code {0}")]
    Status(u16),
}

/// A change a peer applies to its own brick. Serializes to the bare request
/// body the peer endpoint expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PeerOperation {
    CreateLv(CreateLvCommand),
    GrowLv(GrowVolumeCommand),
    DeleteLv(DeleteVolumeCommand),
}

impl PeerOperation {
    pub fn path(&self) -> &'static str {
        match self {
            PeerOperation::CreateLv(_) => "/sec/lv",
            PeerOperation::GrowLv(_) => "/sec/lv/grow",
            PeerOperation::DeleteLv(_) => "/sec/lv/delete",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PeerOperation::CreateLv(_) => "create lv",
            PeerOperation::GrowLv(_) => "grow lv",
            PeerOperation::DeleteLv(_) => "delete lv",
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PeerClient: Send + Sync {
    /// Succeeds only when the peer answered with exactly `200 OK`.
    async fn send(&self, peer: &str, operation: &PeerOperation) -> Result<(), PeerCallError>;
}

#[derive(Debug, Clone)]
pub struct HttpPeerClient {
    client: reqwest::Client,
    port: u16,
    secret: String,
}

impl HttpPeerClient {
    pub fn new(port: u16, secret: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            port,
            secret: secret.into(),
        }
    }

    pub fn url(&self, peer: &str, operation: &PeerOperation) -> String {
        format!("http://{peer}:{}{}", self.port, operation.path())
    }
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn send(&self, peer: &str, operation: &PeerOperation) -> Result<(), PeerCallError> {
        let url = self.url(peer, operation);
        debug!("Sending {} to peer: {url}", operation.name());
        let response = self
            .client
            .post(&url)
            .basic_auth(API_USER, Some(&self.secret))
            .json(operation)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(PeerCallError::Status(status.as_u16()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn operations_should_target_the_peer_lv_routes() {
        let client = HttpPeerClient::new(8080, "secret");
        let grow = PeerOperation::GrowLv(GrowVolumeCommand {
            pv_name: "p_pv1".to_owned(),
            new_size: "5G".to_owned(),
        });
        let delete = PeerOperation::DeleteLv(DeleteVolumeCommand {
            lv_name: "vol_p_pv1".to_owned(),
        });

        assert_eq!(client.url("10.0.0.2", &grow), "http://10.0.0.2:8080/sec/lv/grow");
        assert_eq!(client.url("node-b", &delete), "http://node-b:8080/sec/lv/delete");
    }

    #[test]
    fn operation_should_serialize_to_its_bare_body() {
        let create = PeerOperation::CreateLv(CreateLvCommand {
            size: "10M".to_owned(),
            mount_point: "/gluster/p/pv1".to_owned(),
            lv_name: "lv_p_pv1".to_owned(),
        });
        assert_eq!(
            serde_json::to_value(&create).unwrap(),
            json!({"size": "10M", "mountPoint": "/gluster/p/pv1", "lvName": "lv_p_pv1"})
        );
    }

    #[tokio::test]
    async fn unreachable_peer_should_fail_with_transport_error() {
        // Port 9 (discard) on loopback is expected to refuse connections.
        let client = HttpPeerClient::new(9, "secret");
        let operation = PeerOperation::DeleteLv(DeleteVolumeCommand {
            lv_name: "vol_p_pv1".to_owned(),
        });
        let error = client.send("127.0.0.1", &operation).await.unwrap_err();
        assert!(matches!(error, PeerCallError::Transport(_)));
    }
}
