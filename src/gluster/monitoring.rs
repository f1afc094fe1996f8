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
use crate::gluster::executor::LocalExecutor;
use crate::gluster::models::VolInfo;
use crate::gluster::naming;
use crate::gluster::COMPONENT;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{error, info};

const GREP_NO_MATCH_EXIT_CODE: i32 = 1;

fn number_regex() -> &'static Regex {
    static NUMBER_REGEX: OnceLock<Regex> = OnceLock::new();
    NUMBER_REGEX.get_or_init(|| Regex::new(r"\d+").expect("number pattern is a valid regex"))
}

/// Translates an OpenShift PV name into the suffix of its device-mapper path.
///
/// `gl-ose-mon-a-pv3` becomes `lv_ose--mon--a_pv3`: device-mapper escapes
/// every `-` inside the LV name by doubling it. Names that are not a valid
/// project plus sequence give `None`.
pub fn pv_device_pattern(pv_name: &str) -> Option<String> {
    let id = naming::parse_persistent_volume(pv_name).ok()?;
    Some(format!(
        "lv_{}_pv{}",
        id.project.replace('-', "--"),
        id.sequence
    ))
}

/// Reads total and used kilobytes from `df --output=size,used,source`.
/// A zero total has no usage ratio and does not parse.
pub fn parse_df_output(output: &str) -> Option<VolInfo> {
    let mut numbers = number_regex()
        .find_iter(output)
        .map(|number| number.as_str().parse::<u64>());
    let total = numbers.next()?.ok().filter(|total| *total > 0)?;
    let used = numbers.next()?.ok()?;
    Some(VolInfo {
        total_kilo_bytes: total,
        used_kilo_bytes: used,
    })
}

pub fn used_percentage(info: &VolInfo) -> f64 {
    100.0 / info.total_kilo_bytes as f64 * info.used_kilo_bytes as f64
}

#[derive(Clone)]
pub struct VolumeMonitor {
    executor: LocalExecutor,
}

impl VolumeMonitor {
    pub fn new(executor: LocalExecutor) -> Self {
        Self { executor }
    }

    pub async fn volume_usage(&self, pv_name: &str) -> Result<VolInfo, PortalError> {
        let Some(pattern) = pv_device_pattern(pv_name) else {
            return Err(PortalError::validation(format!(
                "Invalid PV name: {pv_name}"
            )));
        };

        let command = format!("df --output=size,used,source | grep '{pattern}$'");
        let output = match self.executor.capture(&command).await {
            Ok(output) => output,
            Err(error) if error.exit_code() == Some(GREP_NO_MATCH_EXIT_CODE) => {
                return Err(PortalError::NotFound(format!("PV {pv_name} does not exist")));
            }
            Err(error) => {
                error!("{COMPONENT} (error: {error}) - could not read usage of PV: {pv_name}");
                return Err(PortalError::command_failed());
            }
        };

        parse_df_output(&output).ok_or_else(|| {
            error!("{COMPONENT} - unable to parse df output for PV: {pv_name}, output: {output}");
            PortalError::command_failed()
        })
    }

    /// Fails when more than `threshold` percent of the volume is used.
    pub async fn check_usage(&self, pv_name: &str, threshold: &str) -> Result<(), PortalError> {
        let threshold: f64 = threshold.trim().parse().map_err(|_| {
            PortalError::validation("Wrong threshold. Is not a valid integer")
        })?;

        let info = self.volume_usage(pv_name).await?;
        let used = used_percentage(&info);
        if used > threshold {
            return Err(PortalError::validation(format!(
                "Error used {used} is bigger than threshold: {threshold}"
            )));
        }

        info!("PV: {pv_name} uses {used}% (threshold: {threshold}%)");
        Ok(())
    }
}
