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

use crate::authz::set::AuthorizationSet;
use crate::authz::OwnershipStrategy;
use crate::error::PortalError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

const GROUP_KIND: &str = "Group";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleBinding {
    pub role_ref: RoleRef,
    #[serde(default)]
    pub subjects: Vec<Subject>,
    /// Legacy OpenShift field, still returned for bindings created through
    /// `oc adm policy`.
    #[serde(default)]
    pub group_names: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRef {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    #[serde(default)]
    pub kind: String,
    pub name: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoleBindingSource: Send + Sync {
    async fn role_bindings(&self, project: &str) -> Result<Vec<RoleBinding>, PortalError>;

    async fn group_members(&self, group: &str) -> Result<Vec<String>, PortalError>;
}

/// Subjects of every binding to `admin_role`, and whether one of those
/// bindings grants the role to `operator_group`.
pub fn admin_subjects(
    bindings: &[RoleBinding],
    admin_role: &str,
    operator_group: &str,
) -> (AuthorizationSet, bool) {
    let mut admins = AuthorizationSet::new();
    let mut has_operator_group = false;
    for binding in bindings
        .iter()
        .filter(|binding| binding.role_ref.name == admin_role)
    {
        for subject in &binding.subjects {
            admins.insert(&subject.name);
            if subject.kind == GROUP_KIND && subject.name.eq_ignore_ascii_case(operator_group) {
                has_operator_group = true;
            }
        }
        if let Some(groups) = &binding.group_names {
            if groups
                .iter()
                .any(|group| group.eq_ignore_ascii_case(operator_group))
            {
                has_operator_group = true;
            }
        }
    }

    (admins, has_operator_group)
}

/// Project owners are the admin role-binding subjects. Members of the
/// operator group act through the group name: it is one of their identities,
/// so they are granted wherever that group holds the admin role without
/// being listed as admins themselves.
pub struct RoleBindingStrategy {
    source: Arc<dyn RoleBindingSource>,
    admin_role: String,
    operator_group: String,
}

impl RoleBindingStrategy {
    pub fn new(
        source: Arc<dyn RoleBindingSource>,
        admin_role: impl Into<String>,
        operator_group: impl Into<String>,
    ) -> Self {
        Self {
            source,
            admin_role: admin_role.into(),
            operator_group: operator_group.into(),
        }
    }
}

#[async_trait]
impl OwnershipStrategy for RoleBindingStrategy {
    async fn owners(&self, project: &str) -> Result<AuthorizationSet, PortalError> {
        let bindings = self.source.role_bindings(project).await?;
        let (mut owners, has_operator_group) =
            admin_subjects(&bindings, &self.admin_role, &self.operator_group);
        if has_operator_group {
            debug!(
                "Project: {project} is administered by group: {}",
                self.operator_group
            );
            owners.insert(&self.operator_group);
        }

        Ok(owners)
    }

    async fn identities(&self, principal: &str) -> Result<AuthorizationSet, PortalError> {
        let mut identities: AuthorizationSet = [principal].into_iter().collect();
        if self.operator_group.is_empty() {
            return Ok(identities);
        }

        let members = self.source.group_members(&self.operator_group).await?;
        if members
            .iter()
            .any(|member| member.eq_ignore_ascii_case(principal))
        {
            identities.insert(&self.operator_group);
        }
        Ok(identities)
    }
}
