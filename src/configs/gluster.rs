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

use crate::configs::ConfigError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_MAX_GB: u32 = 100;
pub const DEFAULT_REPLICAS: u32 = 2;

/// Settings shared by every node of the storage cluster. Peers are reached on
/// the same `port` this node listens on.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GlusterConfig {
    pub port: u16,
    pub max_gb: u32,
    pub replicas: u32,
    pub pool_name: String,
    pub vg_name: String,
    pub base_path: String,
    pub secret: String,
    /// Address announced for the local brick. Taken from the first active
    /// non-loopback IPv4 interface when absent.
    pub local_address: Option<String>,
}

impl Default for GlusterConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_gb: DEFAULT_MAX_GB,
            replicas: DEFAULT_REPLICAS,
            pool_name: String::new(),
            vg_name: String::new(),
            base_path: String::new(),
            secret: String::new(),
            local_address: None,
        }
    }
}

impl GlusterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let missing: Vec<&'static str> = [
            ("pool_name", &self.pool_name),
            ("base_path", &self.base_path),
            ("vg_name", &self.vg_name),
            ("secret", &self.secret),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingParameters(missing));
        }

        if self.max_gb == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_gb",
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.replicas == 0 {
            return Err(ConfigError::InvalidValue {
                field: "replicas",
                reason: "must be greater than 0".to_owned(),
            });
        }

        Ok(())
    }

    pub fn base_path(&self) -> &str {
        self.base_path.trim_end_matches('/')
    }
}
