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

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command as ProcessCommand;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("exit status {code}")]
    ExitStatus {
        code: i32,
        stdout: Vec<u8>,
        stderr: String,
    },
    #[error("terminated by signal")]
    Terminated { stdout: Vec<u8>, stderr: String },
}

impl CommandError {
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            CommandError::ExitStatus { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn stdout(&self) -> &[u8] {
        match self {
            CommandError::ExitStatus { stdout, .. } | CommandError::Terminated { stdout, .. } => {
                stdout
            }
            CommandError::Spawn { .. } => &[],
        }
    }

    pub fn stderr(&self) -> &str {
        match self {
            CommandError::ExitStatus { stderr, .. } | CommandError::Terminated { stderr, .. } => {
                stderr
            }
            CommandError::Spawn { .. } => "",
        }
    }
}

/// Executes a program on the local host and returns its standard output.
/// Implementations block the calling task until the program exits.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str, args: &[&str]) -> Result<Vec<u8>, CommandError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BashRunner;

#[async_trait]
impl CommandRunner for BashRunner {
    async fn run(&self, command: &str, args: &[&str]) -> Result<Vec<u8>, CommandError> {
        debug!("Spawning {command} with {} argument(s)", args.len());
        let output = ProcessCommand::new(command)
            .args(args)
            .output()
            .await
            .map_err(|source| CommandError::Spawn {
                command: command.to_owned(),
                source,
            })?;

        if output.status.success() {
            return Ok(output.stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        match output.status.code() {
            Some(code) => Err(CommandError::ExitStatus {
                code,
                stdout: output.stdout,
                stderr,
            }),
            None => Err(CommandError::Terminated {
                stdout: output.stdout,
                stderr,
            }),
        }
    }
}
