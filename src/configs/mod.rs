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

pub mod authz;
pub mod gluster;
pub mod http;
pub mod loader;

use crate::configs::authz::{AuthorizationConfig, JwksConfig, OpenShiftConfig};
use crate::configs::gluster::GlusterConfig;
use crate::configs::http::HttpConfig;
use crate::error::PortalError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Must specify parameters {}", .0.join(", "))]
    MissingParameters(Vec<&'static str>),
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("Cannot load configuration: {0}")]
    CannotLoad(String),
}

impl From<ConfigError> for PortalError {
    fn from(error: ConfigError) -> Self {
        PortalError::Configuration(error.to_string())
    }
}

/// Complete process configuration. Built once at startup and only ever read
/// afterwards, usually through an `Arc`.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PortalConfig {
    pub http: HttpConfig,
    pub gluster: GlusterConfig,
    pub authorization: AuthorizationConfig,
    pub openshift: Option<OpenShiftConfig>,
    pub jwks: JwksConfig,
}

impl PortalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.http.validate()?;
        self.gluster.validate()?;
        self.authorization.validate()?;
        if let Some(openshift) = &self.openshift {
            openshift.validate()?;
        }
        Ok(())
    }
}
