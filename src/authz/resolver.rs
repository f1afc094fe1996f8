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

use crate::authz::directory::{BlacklistedDirectory, DirectoryService, GroupBlacklist};
use crate::authz::role_binding::{RoleBindingSource, RoleBindingStrategy};
use crate::authz::tags::{DirectoryGroupStrategy, TagOwnershipStrategy, TagSource};
use crate::authz::{OwnershipStrategy, COMPONENT};
use crate::configs::authz::{AuthorizationConfig, OwnershipStrategyKind};
use crate::error::{PortalError, MISSING_INPUT_ERROR};
use std::sync::Arc;
use tracing::{error, info};

/// External systems a resolver may consult. Only the ones the configured
/// strategy needs have to be present.
#[derive(Clone, Default)]
pub struct Collaborators {
    pub role_bindings: Option<Arc<dyn RoleBindingSource>>,
    pub directory: Option<Arc<dyn DirectoryService>>,
    pub tags: Option<Arc<dyn TagSource>>,
}

fn missing(collaborator: &str, strategy: OwnershipStrategyKind) -> PortalError {
    PortalError::Configuration(format!(
        "Ownership strategy '{strategy}' requires a {collaborator} client"
    ))
}

pub struct PermissionResolver {
    strategy: Arc<dyn OwnershipStrategy>,
    directory: Option<Arc<dyn DirectoryService>>,
    superadmin_group: Option<String>,
    functional_account: Option<String>,
}

impl PermissionResolver {
    pub fn new(strategy: Arc<dyn OwnershipStrategy>) -> Self {
        Self {
            strategy,
            directory: None,
            superadmin_group: None,
            functional_account: None,
        }
    }

    pub fn with_superadmin_group(
        mut self,
        group: impl Into<String>,
        directory: Arc<dyn DirectoryService>,
    ) -> Self {
        self.superadmin_group = Some(group.into());
        self.directory = Some(directory);
        self
    }

    pub fn with_functional_account(mut self, account: impl Into<String>) -> Self {
        self.functional_account = Some(account.into());
        self
    }

    pub fn from_config(
        config: &AuthorizationConfig,
        collaborators: Collaborators,
    ) -> Result<Self, PortalError> {
        let kind = config.strategy;
        let blacklist = GroupBlacklist::new(config.group_blacklist.clone());
        let directory = collaborators.directory.map(|inner| {
            if blacklist.is_empty() {
                return inner;
            }
            Arc::new(BlacklistedDirectory::new(inner, blacklist)) as Arc<dyn DirectoryService>
        });
        let strategy: Arc<dyn OwnershipStrategy> = match kind {
            OwnershipStrategyKind::RoleBinding => {
                let source = collaborators
                    .role_bindings
                    .clone()
                    .ok_or_else(|| missing("role binding", kind))?;
                Arc::new(RoleBindingStrategy::new(
                    source,
                    &config.admin_role,
                    &config.operator_group,
                ))
            }
            OwnershipStrategyKind::DirectoryGroup => {
                let directory = directory
                    .clone()
                    .ok_or_else(|| missing("directory", kind))?;
                let tags = collaborators
                    .tags
                    .clone()
                    .ok_or_else(|| missing("tag", kind))?;
                Arc::new(DirectoryGroupStrategy::new(
                    directory,
                    tags,
                    &config.group_tag,
                ))
            }
            OwnershipStrategyKind::Tag => {
                let tags = collaborators
                    .tags
                    .clone()
                    .ok_or_else(|| missing("tag", kind))?;
                Arc::new(TagOwnershipStrategy::new(tags, &config.owner_tag))
            }
        };

        let mut resolver = PermissionResolver::new(strategy);
        if let Some(group) = &config.superadmin_group {
            let directory = directory.ok_or_else(|| missing("directory", kind))?;
            resolver = resolver.with_superadmin_group(group, directory);
        }
        if let Some(account) = config.functional_account.as_deref().filter(|a| !a.is_empty()) {
            resolver = resolver.with_functional_account(account);
        }

        Ok(resolver)
    }

    /// Grants access when the principal is the functional account, belongs to
    /// the superadmin group, or shares an identity with the resource owners.
    /// A failed lookup is an error, never a decision.
    pub async fn authorize(&self, principal: &str, resource: &str) -> Result<(), PortalError> {
        if principal.is_empty() || resource.is_empty() {
            return Err(PortalError::validation(MISSING_INPUT_ERROR));
        }

        if self.functional_account.as_deref() == Some(principal) {
            info!("Functional account: {principal} granted access to: {resource}");
            return Ok(());
        }

        if self.is_superadmin(principal).await? {
            info!("Superadmin: {principal} granted access to: {resource}");
            return Ok(());
        }

        let owners = self.strategy.owners(resource).await?;
        let identities = self.strategy.identities(principal).await?;
        if identities.intersects(&owners) {
            return Ok(());
        }

        info!("Denied access for: {principal} to: {resource}");
        Err(PortalError::Permission {
            resource: resource.to_owned(),
            admins: owners.to_vec(),
        })
    }

    /// Everybody allowed to administer `resource`, lower-cased and sorted.
    pub async fn project_admins(&self, resource: &str) -> Result<Vec<String>, PortalError> {
        if resource.is_empty() {
            return Err(PortalError::validation(MISSING_INPUT_ERROR));
        }
        Ok(self.strategy.owners(resource).await?.to_vec())
    }

    async fn is_superadmin(&self, principal: &str) -> Result<bool, PortalError> {
        let (Some(group), Some(directory)) = (&self.superadmin_group, &self.directory) else {
            return Ok(false);
        };

        let groups = directory.groups_of_user(principal).await.map_err(|e| {
            error!("{COMPONENT} (error: {e}) - failed to get groups of user: {principal}");
            e
        })?;
        Ok(groups.iter().any(|g| g.eq_ignore_ascii_case(group)))
    }
}
