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

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVolumeCommand {
    pub project: String,
    pub size: String,
}

/// Sent to every peer so it can carve out its local brick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLvCommand {
    pub size: String,
    pub mount_point: String,
    pub lv_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowVolumeCommand {
    pub pv_name: String,
    pub new_size: String,
}

/// `lv_name` carries the gluster volume name (`vol_<project>_pv<N>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteVolumeCommand {
    pub lv_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolInfo {
    pub total_kilo_bytes: u64,
    pub used_kilo_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub message: String,
}

impl ApiResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lv_command_should_use_camel_case_fields() {
        let command = CreateLvCommand {
            size: "10M".to_owned(),
            mount_point: "/gluster/p/pv1".to_owned(),
            lv_name: "lv_p_pv1".to_owned(),
        };
        assert_eq!(
            serde_json::to_value(&command).unwrap(),
            json!({"size": "10M", "mountPoint": "/gluster/p/pv1", "lvName": "lv_p_pv1"})
        );
    }

    #[test]
    fn vol_info_should_use_kilobyte_field_names() {
        let info: VolInfo =
            serde_json::from_value(json!({"totalKiloBytes": 49664, "usedKiloBytes": 2864}))
                .unwrap();
        assert_eq!(info.total_kilo_bytes, 49664);
        assert_eq!(info.used_kilo_bytes, 2864);
    }
}
