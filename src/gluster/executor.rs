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
use crate::gluster::command::Command;
use crate::gluster::runner::{CommandError, CommandRunner};
use crate::gluster::COMPONENT;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Runs shell commands on this node, one after another.
#[derive(Clone)]
pub struct LocalExecutor {
    runner: Arc<dyn CommandRunner>,
}

impl LocalExecutor {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Stops at the first failing command that its tolerance policy does not
    /// cover. Commands already executed are not undone. The caller only ever
    /// sees the generic execution error; details go to the log.
    pub async fn run_sequence(&self, commands: &[Command]) -> Result<(), PortalError> {
        info!("Got {} new command(s) to execute", commands.len());
        for command in commands {
            match self.capture(command.text()).await {
                Ok(stdout) => {
                    info!("Cmd: {command} | StdOut: {stdout}");
                }
                Err(error) if command.tolerates(&error) => {
                    warn!(
                        "Cmd: {command} | tolerated failure: {error} | StdOut: {}",
                        String::from_utf8_lossy(error.stdout())
                    );
                }
                Err(error) => {
                    error!(
                        "{COMPONENT} (error: {error}) - failed to execute command: {command}, stdout: {}, stderr: {}",
                        String::from_utf8_lossy(error.stdout()),
                        error.stderr()
                    );
                    return Err(PortalError::command_failed());
                }
            }
        }

        Ok(())
    }

    /// Runs a single command and hands back its raw outcome, for callers
    /// that need to interpret the output or the exit status themselves.
    pub async fn capture(&self, command: &str) -> Result<String, CommandError> {
        let stdout = self.runner.run("bash", &["-c", command]).await?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}
