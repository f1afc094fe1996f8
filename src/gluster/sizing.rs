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
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::sync::OnceLock;
use strum::{Display as StrumDisplay, EnumString};

pub const MAX_MEGABYTES: u64 = 1024;

const SIZE_PATTERN: &str = r"^(\d+)([MG])$";

fn size_regex() -> &'static Regex {
    static SIZE_REGEX: OnceLock<Regex> = OnceLock::new();
    SIZE_REGEX.get_or_init(|| Regex::new(SIZE_PATTERN).expect("size pattern is a valid regex"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Technology {
    Gluster,
    Nfs,
    /// Used when growing: the backing technology is irrelevant there.
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeUnit {
    Megabytes,
    Gigabytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeLimit {
    pub max_megabytes: u64,
    pub max_gigabytes: u64,
}

impl SizeLimit {
    pub fn new(max_gigabytes: u64) -> Self {
        Self {
            max_megabytes: MAX_MEGABYTES,
            max_gigabytes,
        }
    }
}

/// A size accepted by [`validate_size`]. Displays in the same `<n><M|G>`
/// notation LVM expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeSize {
    pub amount: u64,
    pub unit: SizeUnit,
}

impl Display for VolumeSize {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let suffix = match self.unit {
            SizeUnit::Megabytes => "M",
            SizeUnit::Gigabytes => "G",
        };
        write!(f, "{}{suffix}", self.amount)
    }
}

fn wrong_format(size: &str) -> PortalError {
    PortalError::validation(format!(
        "Invalid size. Size must be int followed by suffix (e.g. 100M). Allowed suffixes are 'G/M'. You sent: {size}"
    ))
}

pub fn validate_size(
    size: &str,
    technology: Technology,
    limit: SizeLimit,
) -> Result<VolumeSize, PortalError> {
    let captures = size_regex()
        .captures(size)
        .ok_or_else(|| wrong_format(size))?;
    let amount: u64 = captures[1].parse().map_err(|_| wrong_format(size))?;
    let unit = if &captures[2] == "M" {
        SizeUnit::Megabytes
    } else {
        SizeUnit::Gigabytes
    };

    if technology == Technology::Nfs && unit != SizeUnit::Gigabytes {
        return Err(PortalError::validation(format!(
            "Invalid size. Only Gigabytes (e.g. 10G) are allowed for nfs volumes. You sent: {size}"
        )));
    }

    match unit {
        SizeUnit::Megabytes if amount > limit.max_megabytes => Err(PortalError::validation(
            "Your size is too big for suffix 'M' use 'G' instead",
        )),
        SizeUnit::Gigabytes if amount > limit.max_gigabytes => {
            Err(PortalError::validation(format!(
                "Max allowed size exceeded. Max allowed is: {}G",
                limit.max_gigabytes
            )))
        }
        _ => Ok(VolumeSize { amount, unit }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const LIMIT: SizeLimit = SizeLimit {
        max_megabytes: MAX_MEGABYTES,
        max_gigabytes: 100,
    };

    #[test_case("1M" ; "smallest megabyte size")]
    #[test_case("10M" ; "ten megabytes")]
    #[test_case("1024M" ; "megabyte ceiling")]
    #[test_case("1G" ; "one gigabyte")]
    #[test_case("100G" ; "gigabyte ceiling")]
    fn valid_sizes_should_pass(size: &str) {
        let parsed = validate_size(size, Technology::Gluster, LIMIT).unwrap();
        assert_eq!(parsed.to_string(), size);
    }

    #[test_case("1025M" ; "megabytes above ceiling")]
    #[test_case("101G" ; "gigabytes above ceiling")]
    #[test_case("10" ; "missing suffix")]
    #[test_case("10T" ; "unknown suffix")]
    #[test_case("10m" ; "lower case suffix")]
    #[test_case("M" ; "missing amount")]
    #[test_case("-5G" ; "negative amount")]
    #[test_case(" 5G" ; "leading whitespace")]
    #[test_case("" ; "empty")]
    #[test_case("99999999999999999999999G" ; "overflowing amount")]
    fn invalid_sizes_should_fail(size: &str) {
        let error = validate_size(size, Technology::Gluster, LIMIT).unwrap_err();
        assert!(matches!(error, PortalError::Validation(_)));
    }

    #[test]
    fn megabytes_above_ceiling_should_suggest_gigabytes() {
        let error = validate_size("1025M", Technology::Gluster, LIMIT).unwrap_err();
        assert!(error.to_string().contains("use 'G' instead"));
    }

    #[test]
    fn gigabytes_above_ceiling_should_report_the_ceiling() {
        let error = validate_size("101G", Technology::Gluster, LIMIT).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Max allowed size exceeded. Max allowed is: 100G"
        );
    }

    #[test]
    fn ceiling_should_follow_the_configuration() {
        assert!(validate_size("150G", Technology::Gluster, SizeLimit::new(200)).is_ok());
        assert!(validate_size("201G", Technology::Gluster, SizeLimit::new(200)).is_err());
    }

    #[test]
    fn nfs_should_only_accept_gigabytes() {
        assert!(validate_size("10G", Technology::Nfs, LIMIT).is_ok());
        let error = validate_size("500M", Technology::Nfs, LIMIT).unwrap_err();
        assert!(error.to_string().contains("Only Gigabytes"));
    }

    #[test]
    fn any_technology_should_accept_both_units() {
        assert!(validate_size("500M", Technology::Any, LIMIT).is_ok());
        assert!(validate_size("5G", Technology::Any, LIMIT).is_ok());
    }

    #[test]
    fn technology_should_parse_from_lowercase() {
        assert_eq!("nfs".parse::<Technology>().unwrap(), Technology::Nfs);
        assert_eq!(Technology::Gluster.to_string(), "gluster");
    }
}
