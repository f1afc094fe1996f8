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

//! Node-local management of gluster-backed project volumes: LVM and gluster
//! command sequences, the fan-out across peer storage nodes and the read-only
//! usage checks.

pub mod command;
pub mod executor;
pub mod fanout;
pub mod models;
pub mod monitoring;
pub mod naming;
pub mod peer_client;
pub mod peers;
pub mod runner;
pub mod sizing;
pub mod volumes;

pub const COMPONENT: &str = "GLUSTER";
