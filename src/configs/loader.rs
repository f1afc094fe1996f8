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

use crate::configs::{ConfigError, PortalConfig};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use std::path::Path;
use tracing::info;

pub const ENV_PREFIX: &str = "SSP_";

/// Loads the configuration from defaults, an optional TOML file and `SSP_`
/// environment variables (nested keys separated by `__`), in that order, and
/// validates the result.
pub fn load_config(path: Option<&Path>) -> Result<PortalConfig, ConfigError> {
    let mut figment = Figment::new().merge(Serialized::defaults(PortalConfig::default()));
    if let Some(path) = path {
        if !path.exists() {
            return Err(ConfigError::CannotLoad(format!(
                "config file {} does not exist",
                path.display()
            )));
        }
        info!("Loading configuration from: {}", path.display());
        figment = figment.merge(Toml::file(path));
    }

    let config: PortalConfig = figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|error| ConfigError::CannotLoad(error.to_string()))?;
    config.validate()?;
    Ok(config)
}
