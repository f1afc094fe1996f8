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

//! Decides whether a principal may act on a resource whose ownership is
//! tracked by an external system.

pub mod directory;
pub mod jwks;
pub mod openshift;
pub mod resolver;
pub mod role_binding;
pub mod set;
pub mod tags;

use crate::authz::set::AuthorizationSet;
use crate::error::PortalError;
use async_trait::async_trait;

pub const COMPONENT: &str = "AUTHZ";

/// How ownership of one kind of resource is looked up.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OwnershipStrategy: Send + Sync {
    /// Identities allowed to administer `resource`.
    async fn owners(&self, resource: &str) -> Result<AuthorizationSet, PortalError>;

    /// Identities held by `principal`, compared against [`Self::owners`].
    async fn identities(&self, principal: &str) -> Result<AuthorizationSet, PortalError>;
}
