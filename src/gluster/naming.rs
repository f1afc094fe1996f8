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

//! Canonical names of the LVM and gluster objects that back a project volume.
//!
//! A volume for project `p` with sequence number `n` is made of:
//! - the logical volume `lv_<p>_pv<n>`,
//! - the mount point `<base>/<p>/pv<n>` with the brick directory below it,
//! - the gluster volume `vol_<p>_pv<n>`.
//!
//! Sequence numbers are never reused: the next one is always derived from the
//! highest number still present, so deleting `pv3` leaves a gap.
//!
//! Every name ends up inside a shell command, so names coming from a request
//! are parsed back into a project and a sequence before anything runs.

use crate::error::PortalError;
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NamingError {
    #[error("could not parse a volume sequence number out of: {name}")]
    InvalidSequence { name: String },
    #[error("no volume sequence number left for project: {project}")]
    SequenceExhausted { project: String },
    #[error("Invalid project name: {project}")]
    InvalidProject { project: String },
    #[error("Invalid volume name: {name}")]
    InvalidName { name: String },
}

impl From<NamingError> for PortalError {
    fn from(error: NamingError) -> Self {
        PortalError::validation(error.to_string())
    }
}

/// Project and sequence number a volume name was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeId {
    pub project: String,
    pub sequence: u32,
}

fn project_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("project pattern is valid")
    })
}

/// Projects are DNS labels: lower-case alphanumerics and inner dashes.
pub fn validate_project(project: &str) -> Result<(), NamingError> {
    if project_pattern().is_match(project) {
        Ok(())
    } else {
        Err(NamingError::InvalidProject {
            project: project.to_owned(),
        })
    }
}

/// Parses the digits after `pv`. Signs, spaces and anything past `u32::MAX`
/// are rejected.
fn parse_sequence(name: &str, digits: &str) -> Result<u32, NamingError> {
    let invalid = || NamingError::InvalidSequence {
        name: name.to_owned(),
    };
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(invalid());
    }
    digits.parse().map_err(|_| invalid())
}

fn split_volume_id(name: &str, rest: &str, separator: &str) -> Result<VolumeId, NamingError> {
    let invalid = || NamingError::InvalidName {
        name: name.to_owned(),
    };
    let (project, digits) = rest.rsplit_once(separator).ok_or_else(invalid)?;
    validate_project(project).map_err(|_| invalid())?;
    let sequence = parse_sequence(name, digits).map_err(|_| invalid())?;
    Ok(VolumeId {
        project: project.to_owned(),
        sequence,
    })
}

/// Parses the portal-facing `<project>_pv<N>`.
pub fn parse_pv_name(name: &str) -> Result<VolumeId, NamingError> {
    split_volume_id(name, name, "_pv")
}

/// Parses `lv_<project>_pv<N>`.
pub fn parse_lv_name(name: &str) -> Result<VolumeId, NamingError> {
    let rest = name.strip_prefix("lv_").ok_or_else(|| NamingError::InvalidName {
        name: name.to_owned(),
    })?;
    split_volume_id(name, rest, "_pv")
}

/// Parses the gluster volume name `vol_<project>_pv<N>`.
pub fn parse_volume_name(name: &str) -> Result<VolumeId, NamingError> {
    let rest = name.strip_prefix("vol_").ok_or_else(|| NamingError::InvalidName {
        name: name.to_owned(),
    })?;
    split_volume_id(name, rest, "_pv")
}

/// Parses the persistent volume name `[gl-]<project>-pv<N>` used by
/// monitoring. The split is at the last `-pv`.
pub fn parse_persistent_volume(name: &str) -> Result<VolumeId, NamingError> {
    let rest = name.strip_prefix("gl-").unwrap_or(name);
    split_volume_id(name, rest, "-pv")
}

pub fn lv_prefix(project: &str) -> String {
    format!("lv_{project}_pv")
}

pub fn lv_name(project: &str, sequence: u32) -> String {
    format!("lv_{project}_pv{sequence}")
}

pub fn volume_name(project: &str, sequence: u32) -> String {
    format!("vol_{project}_pv{sequence}")
}

/// The name handed back to the portal once a volume exists.
pub fn pv_name(project: &str, sequence: u32) -> String {
    format!("{project}_pv{sequence}")
}

pub fn mount_point(base_path: &str, project: &str, sequence: u32) -> String {
    format!("{base_path}/{project}/pv{sequence}")
}

pub fn brick_path(mount_point: &str) -> String {
    format!("{mount_point}/brick")
}

/// Returns `max(N) + 1` over all names `lv_<project>_pv<N>`, or `1` when the
/// project has no volume yet.
pub fn next_sequence_number<'a, I>(project: &str, existing: I) -> Result<u32, NamingError>
where
    I: IntoIterator<Item = &'a str>,
{
    let prefix = lv_prefix(project);
    let mut highest: u32 = 0;
    for name in existing {
        let name = name.trim();
        let Some(suffix) = name.strip_prefix(&prefix) else {
            continue;
        };
        highest = highest.max(parse_sequence(name, suffix)?);
    }

    highest
        .checked_add(1)
        .ok_or_else(|| NamingError::SequenceExhausted {
            project: project.to_owned(),
        })
}

/// Rewrites `vol_<project>_pv<N>` into `<base>/<project>/pv<N>`.
///
/// This is a plain string substitution of the first `vol_` and the first
/// `_pv`; project names containing either literal are not supported.
pub fn mount_path(volume_name: &str, base_path: &str) -> String {
    volume_name
        .replacen("vol_", &format!("{base_path}/"), 1)
        .replacen("_pv", "/pv", 1)
}

pub fn lv_name_of_volume(volume_name: &str) -> String {
    volume_name.replacen("vol_", "lv_", 1)
}
