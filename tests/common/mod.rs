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

#![allow(dead_code)]

use async_trait::async_trait;
use ssp_backend::configs::gluster::GlusterConfig;
use ssp_backend::configs::http::HttpConfig;
use ssp_backend::gluster::executor::LocalExecutor;
use ssp_backend::gluster::fanout::PeerFanOut;
use ssp_backend::gluster::monitoring::VolumeMonitor;
use ssp_backend::gluster::peer_client::HttpPeerClient;
use ssp_backend::gluster::peers::GlusterCli;
use ssp_backend::gluster::runner::{CommandError, CommandRunner};
use ssp_backend::gluster::volumes::VolumeOrchestrator;
use ssp_backend::http::http_server;
use ssp_backend::http::shared::AppState;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

pub const SECRET: &str = "integration-secret";
pub const LOCAL_ADDRESS: &str = "10.0.0.1";

/// Answers shell commands from canned outputs instead of running them.
#[derive(Default)]
pub struct ScriptedRunner {
    commands: Mutex<Vec<String>>,
    outputs: Vec<(String, String)>,
    failures: Vec<(String, i32)>,
}

impl ScriptedRunner {
    pub fn respond(mut self, fragment: &str, stdout: &str) -> Self {
        self.outputs.push((fragment.to_owned(), stdout.to_owned()));
        self
    }

    pub fn fail_when(mut self, fragment: &str, code: i32) -> Self {
        self.failures.push((fragment.to_owned(), code));
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, command: &str, args: &[&str]) -> Result<Vec<u8>, CommandError> {
        let text = args.last().copied().unwrap_or(command);
        self.commands.lock().unwrap().push(text.to_owned());

        if let Some((_, code)) = self
            .failures
            .iter()
            .find(|(fragment, _)| text.contains(fragment.as_str()))
        {
            return Err(CommandError::ExitStatus {
                code: *code,
                stdout: Vec::new(),
                stderr: String::new(),
            });
        }

        Ok(self
            .outputs
            .iter()
            .find(|(fragment, _)| text.contains(fragment.as_str()))
            .map(|(_, stdout)| stdout.as_bytes().to_vec())
            .unwrap_or_default())
    }
}

pub fn gluster_config(port: u16) -> Arc<GlusterConfig> {
    Arc::new(GlusterConfig {
        port,
        max_gb: 100,
        replicas: 2,
        pool_name: "pool_ssd".to_owned(),
        vg_name: "vg_ssd".to_owned(),
        base_path: "/gluster/project".to_owned(),
        secret: SECRET.to_owned(),
        local_address: Some(LOCAL_ADDRESS.to_owned()),
    })
}

/// Wires a node the same way the binary does, around the given runner. Peers
/// are contacted on `peer_port`.
pub fn node_state(runner: Arc<ScriptedRunner>, peer_port: u16) -> Arc<AppState> {
    let config = gluster_config(peer_port);
    let executor = LocalExecutor::new(runner);
    let discovery = Arc::new(GlusterCli::new(
        executor.clone(),
        config.local_address.clone(),
    ));
    let client = Arc::new(HttpPeerClient::new(peer_port, SECRET));
    Arc::new(AppState {
        secret: SECRET.to_owned(),
        volumes: VolumeOrchestrator::new(
            config,
            executor.clone(),
            PeerFanOut::new(discovery, client),
        ),
        monitor: VolumeMonitor::new(executor),
    })
}

pub async fn start_node(state: Arc<AppState>) -> SocketAddr {
    let listener = http_server::bind(&HttpConfig {
        address: "127.0.0.1:0".to_owned(),
    })
    .await
    .expect("listener should bind");
    let address = listener.local_addr().expect("listener should have an address");
    tokio::spawn(http_server::serve(
        listener,
        state,
        std::future::pending::<()>(),
    ));
    address
}
