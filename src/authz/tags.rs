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

use crate::authz::directory::DirectoryService;
use crate::authz::set::AuthorizationSet;
use crate::authz::{OwnershipStrategy, COMPONENT};
use crate::error::PortalError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::error;

/// Key/value metadata attached to a cloud resource (server metadata, bucket
/// tags).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TagSource: Send + Sync {
    async fn tags(&self, resource: &str) -> Result<HashMap<String, String>, PortalError>;
}

fn tag_value<'a>(tags: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    tags.get(key)
        .or_else(|| {
            tags.iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(key))
                .map(|(_, value)| value)
        })
        .map(String::as_str)
        .filter(|value| !value.trim().is_empty())
}

/// A resource belongs to the directory group named in one of its tags; every
/// member of that group may act on it.
pub struct DirectoryGroupStrategy {
    directory: Arc<dyn DirectoryService>,
    tags: Arc<dyn TagSource>,
    group_tag: String,
}

impl DirectoryGroupStrategy {
    pub fn new(
        directory: Arc<dyn DirectoryService>,
        tags: Arc<dyn TagSource>,
        group_tag: impl Into<String>,
    ) -> Self {
        Self {
            directory,
            tags,
            group_tag: group_tag.into(),
        }
    }
}

#[async_trait]
impl OwnershipStrategy for DirectoryGroupStrategy {
    async fn owners(&self, resource: &str) -> Result<AuthorizationSet, PortalError> {
        let tags = self.tags.tags(resource).await?;
        let Some(group) = tag_value(&tags, &self.group_tag) else {
            error!(
                "{COMPONENT} - tag: {} not found on resource: {resource}, tags: {tags:?}",
                self.group_tag
            );
            return Err(PortalError::api_failed());
        };

        Ok([group].into_iter().collect())
    }

    async fn identities(&self, principal: &str) -> Result<AuthorizationSet, PortalError> {
        let groups = self.directory.groups_of_user(principal).await?;
        Ok(groups.into_iter().collect())
    }
}

/// A resource belongs to whoever its owner tag names (e.g. `Creator`).
pub struct TagOwnershipStrategy {
    tags: Arc<dyn TagSource>,
    owner_tag: String,
}

impl TagOwnershipStrategy {
    pub fn new(tags: Arc<dyn TagSource>, owner_tag: impl Into<String>) -> Self {
        Self {
            tags,
            owner_tag: owner_tag.into(),
        }
    }
}

#[async_trait]
impl OwnershipStrategy for TagOwnershipStrategy {
    async fn owners(&self, resource: &str) -> Result<AuthorizationSet, PortalError> {
        let tags = self.tags.tags(resource).await?;
        Ok(tag_value(&tags, &self.owner_tag).into_iter().collect())
    }

    async fn identities(&self, principal: &str) -> Result<AuthorizationSet, PortalError> {
        Ok([principal].into_iter().collect())
    }
}
