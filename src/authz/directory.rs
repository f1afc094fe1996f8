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
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Group lookup against the corporate directory.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DirectoryService: Send + Sync {
    async fn groups_of_user(&self, username: &str) -> Result<Vec<String>, PortalError>;
}

/// Raw `memberOf` values of a directory user, as distinguished names. The
/// directory wire protocol lives behind this trait.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MemberOfSource: Send + Sync {
    async fn member_of(&self, username: &str) -> Result<Vec<String>, PortalError>;
}

/// Returns the value of the first RDN of `dn`, provided that RDN carries a
/// single attribute. `CN=Team A,OU=Groups,DC=corp` yields `Team A`.
pub fn common_name(dn: &str) -> Option<String> {
    let mut value = String::new();
    let mut in_value = false;
    let mut chars = dn.trim().chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let escaped = chars.next()?;
                if in_value {
                    value.push(escaped);
                }
            }
            '=' if !in_value => in_value = true,
            ',' | ';' => break,
            '+' => return None,
            _ if in_value => value.push(c),
            _ => {}
        }
    }

    let value = value.trim();
    if !in_value || value.is_empty() {
        return None;
    }
    Some(value.to_owned())
}

/// Group names that never count as a membership, compared case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct GroupBlacklist(Vec<String>);

impl GroupBlacklist {
    pub fn new(groups: Vec<String>) -> Self {
        Self(groups)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, group: &str) -> bool {
        self.0
            .iter()
            .any(|blacklisted| blacklisted.eq_ignore_ascii_case(group))
    }
}

/// Directory groups resolved from `memberOf` DNs, minus the blacklist.
pub struct MemberOfDirectory {
    source: Arc<dyn MemberOfSource>,
    blacklist: GroupBlacklist,
}

impl MemberOfDirectory {
    pub fn new(source: Arc<dyn MemberOfSource>, blacklist: GroupBlacklist) -> Self {
        Self { source, blacklist }
    }
}

#[async_trait]
impl DirectoryService for MemberOfDirectory {
    async fn groups_of_user(&self, username: &str) -> Result<Vec<String>, PortalError> {
        let entries = self.source.member_of(username).await?;
        let mut groups = Vec::with_capacity(entries.len());
        for dn in entries {
            let Some(group) = common_name(&dn) else {
                warn!("Could not parse DN: {dn}");
                continue;
            };
            if self.blacklist.contains(&group) {
                debug!("Ignoring blacklisted group: {group} of user: {username}");
                continue;
            }
            groups.push(group);
        }

        Ok(groups)
    }
}

/// Drops blacklisted groups from whatever another directory service returns.
pub struct BlacklistedDirectory {
    inner: Arc<dyn DirectoryService>,
    blacklist: GroupBlacklist,
}

impl BlacklistedDirectory {
    pub fn new(inner: Arc<dyn DirectoryService>, blacklist: GroupBlacklist) -> Self {
        Self { inner, blacklist }
    }
}

#[async_trait]
impl DirectoryService for BlacklistedDirectory {
    async fn groups_of_user(&self, username: &str) -> Result<Vec<String>, PortalError> {
        let mut groups = self.inner.groups_of_user(username).await?;
        groups.retain(|group| {
            let blacklisted = self.blacklist.contains(group);
            if blacklisted {
                debug!("Ignoring blacklisted group: {group} of user: {username}");
            }
            !blacklisted
        });
        Ok(groups)
    }
}
