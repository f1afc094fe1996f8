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

use thiserror::Error;

/// Message returned to callers for every failed command, peer call or local
/// sequence. The root cause only ever reaches the logs.
pub const COMMAND_EXECUTION_ERROR: &str = "Error running command, see logs for details";
pub const GENERIC_API_ERROR: &str =
    "Error when calling the ownership API. Please open an issue with the platform team";
pub const MISSING_INPUT_ERROR: &str = "Not all input values provided";

#[derive(Debug, Error)]
pub enum PortalError {
    #[error("{0}")]
    Validation(String),
    #[error(
        "You don't have admin permissions on: {resource}. The following users have admin permissions: {}",
        admins.join(", ")
    )]
    Permission {
        resource: String,
        admins: Vec<String>,
    },
    #[error("{0}")]
    Execution(&'static str),
    #[error("{0}")]
    Configuration(String),
    #[error("{0}")]
    NotFound(String),
}

impl PortalError {
    pub fn validation(message: impl Into<String>) -> Self {
        PortalError::Validation(message.into())
    }

    pub fn command_failed() -> Self {
        PortalError::Execution(COMMAND_EXECUTION_ERROR)
    }

    pub fn api_failed() -> Self {
        PortalError::Execution(GENERIC_API_ERROR)
    }

    pub fn as_code(&self) -> &'static str {
        match self {
            PortalError::Validation(_) => "validation",
            PortalError::Permission { .. } => "permission",
            PortalError::Execution(_) => "execution",
            PortalError::Configuration(_) => "configuration",
            PortalError::NotFound(_) => "not_found",
        }
    }
}
