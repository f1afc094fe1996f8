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
use crate::gluster::executor::LocalExecutor;
use crate::gluster::COMPONENT;
use async_trait::async_trait;
use nix::ifaddrs::getifaddrs;
use nix::net::if_::InterfaceFlags;
use std::net::Ipv4Addr;
use tracing::{error, info};

const PEER_STATUS_COMMAND: &str = "gluster peer status | grep Hostname";
const HOSTNAME_MARKER: &str = "Hostname: ";
const GREP_NO_MATCH_EXIT_CODE: i32 = 1;

/// Peers are looked up on every call and never cached.
#[async_trait]
pub trait PeerDiscovery: Send + Sync {
    async fn list_peers(&self) -> Result<Vec<String>, PortalError>;

    /// The address under which the other nodes reach this one.
    async fn local_address(&self) -> Result<String, PortalError>;
}

/// Extracts peer names from `gluster peer status` output, in listed order.
pub fn parse_peer_status(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.split_once(HOSTNAME_MARKER))
        .map(|(_, peer)| peer.trim())
        .filter(|peer| !peer.is_empty())
        .map(str::to_owned)
        .collect()
}

pub fn select_local_address<I>(candidates: I) -> Option<Ipv4Addr>
where
    I: IntoIterator<Item = Ipv4Addr>,
{
    candidates
        .into_iter()
        .find(|address| !address.is_loopback() && !address.is_unspecified())
}

pub struct GlusterCli {
    executor: LocalExecutor,
    local_address: Option<String>,
}

impl GlusterCli {
    pub fn new(executor: LocalExecutor, local_address: Option<String>) -> Self {
        Self {
            executor,
            local_address,
        }
    }

    fn interface_addresses() -> Result<Vec<Ipv4Addr>, PortalError> {
        let interfaces = getifaddrs().map_err(|error| {
            error!("{COMPONENT} (error: {error}) - failed to list network interfaces");
            PortalError::command_failed()
        })?;

        Ok(interfaces
            .filter(|interface| interface.flags.contains(InterfaceFlags::IFF_UP))
            .filter_map(|interface| {
                interface
                    .address
                    .as_ref()
                    .and_then(|address| address.as_sockaddr_in())
                    .map(|address| address.ip())
            })
            .collect())
    }
}

#[async_trait]
impl PeerDiscovery for GlusterCli {
    async fn list_peers(&self) -> Result<Vec<String>, PortalError> {
        match self.executor.capture(PEER_STATUS_COMMAND).await {
            Ok(output) => {
                let peers = parse_peer_status(&output);
                info!("Found gluster peers: {peers:?}");
                Ok(peers)
            }
            Err(error) if error.exit_code() == Some(GREP_NO_MATCH_EXIT_CODE) => {
                info!("Found no gluster peers");
                Ok(Vec::new())
            }
            Err(error) => {
                error!(
                    "{COMPONENT} (error: {error}) - failed to get gluster peers, stderr: {}",
                    error.stderr()
                );
                Err(PortalError::command_failed())
            }
        }
    }

    async fn local_address(&self) -> Result<String, PortalError> {
        if let Some(address) = &self.local_address {
            return Ok(address.clone());
        }

        let Some(address) = select_local_address(Self::interface_addresses()?) else {
            error!("{COMPONENT} - no routable IPv4 address found on this server");
            return Err(PortalError::command_failed());
        };
        Ok(address.to_string())
    }
}
