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
use strum::Display;

/// Which external system owns the ACL of the resources guarded by a resolver.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OwnershipStrategyKind {
    #[default]
    RoleBinding,
    DirectoryGroup,
    Tag,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthorizationConfig {
    pub strategy: OwnershipStrategyKind,
    /// Members of this directory group pass every check.
    pub superadmin_group: Option<String>,
    /// Technical account that may administer every project.
    pub functional_account: Option<String>,
    pub admin_role: String,
    pub operator_group: String,
    pub group_tag: String,
    pub owner_tag: String,
    pub group_blacklist: Vec<String>,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            strategy: OwnershipStrategyKind::default(),
            superadmin_group: None,
            functional_account: None,
            admin_role: "admin".to_owned(),
            operator_group: "operator".to_owned(),
            group_tag: "uos_group".to_owned(),
            owner_tag: "Creator".to_owned(),
            group_blacklist: Vec::new(),
        }
    }
}

impl AuthorizationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = match self.strategy {
            OwnershipStrategyKind::RoleBinding => ("admin_role", &self.admin_role),
            OwnershipStrategyKind::DirectoryGroup => ("group_tag", &self.group_tag),
            OwnershipStrategyKind::Tag => ("owner_tag", &self.owner_tag),
        };
        if required.1.trim().is_empty() {
            return Err(ConfigError::MissingParameters(vec![required.0]));
        }

        if matches!(&self.superadmin_group, Some(group) if group.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "superadmin_group",
                reason: "must not be empty when set".to_owned(),
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct OpenShiftConfig {
    pub url: String,
    pub token: String,
}

impl OpenShiftConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        if self.url.trim().is_empty() {
            missing.push("openshift.url");
        }
        if self.token.trim().is_empty() {
            missing.push("openshift.token");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingParameters(missing))
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct JwksConfig {
    pub ttl_secs: u64,
    pub max_keys: u64,
}

impl Default for JwksConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            max_keys: 64,
        }
    }
}
