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
use crate::gluster::peer_client::{PeerCallError, PeerClient, PeerOperation};
use crate::gluster::peers::PeerDiscovery;
use crate::gluster::COMPONENT;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

/// Outcome of a fan-out that stopped midway. Nothing is rolled back: every
/// peer listed in `completed` keeps the change.
#[derive(Debug, Error)]
pub enum FanOutError {
    #[error("failed to discover peers: {0}")]
    Discovery(#[source] PortalError),
    #[error("peer {failed} failed to {operation}: {reason}")]
    PeerFailed {
        operation: &'static str,
        failed: String,
        completed: Vec<String>,
        #[source]
        reason: PeerCallError,
    },
    #[error("local {operation} failed after all peers succeeded")]
    Local {
        operation: &'static str,
        completed: Vec<String>,
        #[source]
        source: PortalError,
    },
}

impl FanOutError {
    pub fn completed_peers(&self) -> &[String] {
        match self {
            FanOutError::Discovery(_) => &[],
            FanOutError::PeerFailed { completed, .. } | FanOutError::Local { completed, .. } => {
                completed
            }
        }
    }
}

impl From<FanOutError> for PortalError {
    fn from(_: FanOutError) -> Self {
        PortalError::command_failed()
    }
}

/// Sends a change to every peer, one at a time in discovery order, and only
/// then applies it on this node.
#[derive(Clone)]
pub struct PeerFanOut {
    discovery: Arc<dyn PeerDiscovery>,
    client: Arc<dyn PeerClient>,
}

impl PeerFanOut {
    pub fn new(discovery: Arc<dyn PeerDiscovery>, client: Arc<dyn PeerClient>) -> Self {
        Self { discovery, client }
    }

    pub fn discovery(&self) -> &dyn PeerDiscovery {
        self.discovery.as_ref()
    }

    /// Returns the peers that received the change. `local` is only polled
    /// once every peer answered with success.
    pub async fn apply<F>(
        &self,
        operation: &PeerOperation,
        local: F,
    ) -> Result<Vec<String>, FanOutError>
    where
        F: Future<Output = Result<(), PortalError>> + Send,
    {
        let peers = self
            .discovery
            .list_peers()
            .await
            .map_err(FanOutError::Discovery)?;

        let mut completed = Vec::with_capacity(peers.len());
        for peer in peers {
            if let Err(reason) = self.client.send(&peer, operation).await {
                error!(
                    "{COMPONENT} (error: {reason}) - peer: {peer} failed to {}, already changed peers: {completed:?}",
                    operation.name()
                );
                return Err(FanOutError::PeerFailed {
                    operation: operation.name(),
                    failed: peer,
                    completed,
                    reason,
                });
            }
            info!("Peer: {peer} completed {}", operation.name());
            completed.push(peer);
        }

        if let Err(source) = local.await {
            error!(
                "{COMPONENT} (error: {source}) - local {} failed, already changed peers: {completed:?}",
                operation.name()
            );
            return Err(FanOutError::Local {
                operation: operation.name(),
                completed,
                source,
            });
        }

        Ok(completed)
    }
}
