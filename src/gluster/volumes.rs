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

use crate::configs::gluster::GlusterConfig;
use crate::error::{PortalError, MISSING_INPUT_ERROR};
use crate::gluster::command::Command;
use crate::gluster::executor::LocalExecutor;
use crate::gluster::fanout::PeerFanOut;
use crate::gluster::models::{CreateLvCommand, DeleteVolumeCommand, GrowVolumeCommand};
use crate::gluster::naming;
use crate::gluster::peer_client::PeerOperation;
use crate::gluster::sizing::{validate_size, SizeLimit, Technology};
use crate::gluster::COMPONENT;
use std::sync::Arc;
use tracing::{error, info};

const LIST_LVS_COMMAND: &str = "lvs -o lv_name";
const MOUNT_OPTIONS: &str = "rw,inode64,noatime,nouuid";

fn require(values: &[&str]) -> Result<(), PortalError> {
    if values.iter().any(|value| value.is_empty()) {
        return Err(PortalError::validation(MISSING_INPUT_ERROR));
    }
    Ok(())
}

/// Drives the whole lifecycle of a project volume from this node: peers first,
/// then the local brick, then the gluster volume itself.
#[derive(Clone)]
pub struct VolumeOrchestrator {
    config: Arc<GlusterConfig>,
    executor: LocalExecutor,
    fan_out: PeerFanOut,
}

impl VolumeOrchestrator {
    pub fn new(config: Arc<GlusterConfig>, executor: LocalExecutor, fan_out: PeerFanOut) -> Self {
        Self {
            config,
            executor,
            fan_out,
        }
    }

    pub fn size_limit(&self) -> SizeLimit {
        SizeLimit::new(u64::from(self.config.max_gb))
    }

    /// Returns the portal-facing name `<project>_pv<N>` of the new volume.
    pub async fn create_volume(&self, project: &str, size: &str) -> Result<String, PortalError> {
        require(&[project, size])?;
        naming::validate_project(project)?;
        validate_size(size, Technology::Gluster, self.size_limit())?;

        let sequence = self.next_sequence_number(project).await?;
        let mount_point = naming::mount_point(self.config.base_path(), project, sequence);
        let lv_name = naming::lv_name(project, sequence);
        info!("Creating volume: {lv_name} of size: {size} at: {mount_point}");

        let operation = PeerOperation::CreateLv(CreateLvCommand {
            size: size.to_owned(),
            mount_point: mount_point.clone(),
            lv_name: lv_name.clone(),
        });
        let peers = self
            .fan_out
            .apply(
                &operation,
                self.create_lv_locally(&lv_name, &mount_point, size),
            )
            .await?;

        let local = self.fan_out.discovery().local_address().await?;
        let volume = naming::volume_name(project, sequence);
        self.executor
            .run_sequence(&volume_commands(
                &volume,
                self.config.replicas,
                &peers,
                &local,
                &mount_point,
            ))
            .await?;

        Ok(naming::pv_name(project, sequence))
    }

    pub async fn create_lv_locally(
        &self,
        lv_name: &str,
        mount_point: &str,
        size: &str,
    ) -> Result<(), PortalError> {
        require(&[lv_name, mount_point, size])?;
        let id = naming::parse_lv_name(lv_name)?;
        if mount_point != naming::mount_point(self.config.base_path(), &id.project, id.sequence) {
            return Err(PortalError::validation(format!(
                "Invalid mount point: {mount_point}"
            )));
        }
        validate_size(size, Technology::Gluster, self.size_limit())?;
        self.executor
            .run_sequence(&lv_create_commands(
                &self.config,
                lv_name,
                mount_point,
                size,
            ))
            .await
    }

    pub async fn grow_volume(&self, pv_name: &str, new_size: &str) -> Result<(), PortalError> {
        require(&[pv_name, new_size])?;
        naming::parse_pv_name(pv_name)?;
        validate_size(new_size, Technology::Any, self.size_limit())?;
        info!("Growing volume: {pv_name} to: {new_size}");

        let operation = PeerOperation::GrowLv(GrowVolumeCommand {
            pv_name: pv_name.to_owned(),
            new_size: new_size.to_owned(),
        });
        self.fan_out
            .apply(&operation, self.grow_lv_locally(pv_name, new_size))
            .await?;
        Ok(())
    }

    pub async fn grow_lv_locally(&self, pv_name: &str, new_size: &str) -> Result<(), PortalError> {
        require(&[pv_name, new_size])?;
        naming::parse_pv_name(pv_name)?;
        validate_size(new_size, Technology::Any, self.size_limit())?;
        self.executor
            .run_sequence(&lv_grow_commands(&self.config.vg_name, pv_name, new_size))
            .await
    }

    /// Stops and deletes the gluster volume on this node, then removes the
    /// backing LV everywhere.
    pub async fn delete_volume(&self, volume_name: &str) -> Result<(), PortalError> {
        require(&[volume_name])?;
        naming::parse_volume_name(volume_name)?;
        info!("Deleting volume: {volume_name}");

        self.executor
            .run_sequence(&[
                Command::new(format!("gluster volume stop {volume_name} --mode=script")),
                Command::new(format!("gluster volume delete {volume_name} --mode=script")),
            ])
            .await?;

        let operation = PeerOperation::DeleteLv(DeleteVolumeCommand {
            lv_name: volume_name.to_owned(),
        });
        self.fan_out
            .apply(&operation, self.delete_lv_locally(volume_name))
            .await?;
        Ok(())
    }

    /// `volume_name` is the gluster volume name; mount path and LV are derived
    /// from it.
    pub async fn delete_lv_locally(&self, volume_name: &str) -> Result<(), PortalError> {
        require(&[volume_name])?;
        naming::parse_volume_name(volume_name)?;
        let mount_path = naming::mount_path(volume_name, self.config.base_path());
        let lv_name = naming::lv_name_of_volume(volume_name);
        self.executor
            .run_sequence(&lv_delete_commands(
                &self.config.vg_name,
                &lv_name,
                &mount_path,
            ))
            .await
    }

    async fn next_sequence_number(&self, project: &str) -> Result<u32, PortalError> {
        let output = self
            .executor
            .capture(LIST_LVS_COMMAND)
            .await
            .map_err(|error| {
                error!(
                    "{COMPONENT} (error: {error}) - could not count existing lvs for project: {project}"
                );
                PortalError::command_failed()
            })?;

        naming::next_sequence_number(project, output.lines()).map_err(|error| {
            error!("{COMPONENT} (error: {error}) - could not parse existing lvs for project: {project}");
            PortalError::command_failed()
        })
    }
}

pub fn lv_create_commands(
    config: &GlusterConfig,
    lv_name: &str,
    mount_point: &str,
    size: &str,
) -> Vec<Command> {
    let vg = &config.vg_name;
    let pool = &config.pool_name;
    let device = format!("/dev/{vg}/{lv_name}");
    let brick = naming::brick_path(mount_point);
    vec![
        Command::new(format!("mkdir -p {mount_point}")),
        Command::new(format!("lvcreate -V {size} -T {vg}/{pool} -n {lv_name}")),
        Command::new(format!("mkfs.xfs -i size=512 -n size=8192 {device}")),
        Command::new(format!(
            "echo \"{device} {mount_point} xfs {MOUNT_OPTIONS} 1 2\" | tee -a /etc/fstab > /dev/null "
        )),
        Command::new(format!("mount -o {MOUNT_OPTIONS} {device} {mount_point}")),
        Command::new(format!("mkdir {brick}")),
        Command::new(format!("semanage fcontext -a -t glusterd_brick_t {brick}")),
        Command::new(format!("restorecon -Rv {brick}")),
        Command::new(format!("chown nfsnobody.nfsnobody {brick}")),
        Command::new(format!("chmod 777 {brick}")),
    ]
}

/// Bricks are listed peers first, this node last.
pub fn volume_commands(
    volume: &str,
    replicas: u32,
    peers: &[String],
    local: &str,
    mount_point: &str,
) -> Vec<Command> {
    let brick = naming::brick_path(mount_point);
    let mut create = format!("gluster volume create {volume} replica {replicas} ");
    for server in peers.iter().map(String::as_str).chain(std::iter::once(local)) {
        create.push_str(&format!("{server}:{brick} "));
    }
    create.push_str("--mode=script");

    vec![
        Command::new(create),
        Command::new(format!("gluster volume start {volume}")),
        Command::new(format!("gluster volume set {volume} user.smb disable")),
        Command::new(format!("gluster volume set {volume} user.cifs disable")),
    ]
}

pub fn lv_grow_commands(vg_name: &str, pv_name: &str, new_size: &str) -> Vec<Command> {
    let device = format!("/dev/{vg_name}/lv_{pv_name}");
    vec![
        Command::resize(format!("lvextend -L {new_size} {device}")),
        Command::new(format!("xfs_growfs {device}")),
    ]
}

pub fn lv_delete_commands(vg_name: &str, lv_name: &str, mount_path: &str) -> Vec<Command> {
    vec![
        Command::new(format!("sed -i '\\#/dev/{vg_name}/{lv_name}#d' /etc/fstab")),
        Command::new(format!("umount {mount_path}")),
        Command::new(format!("lvremove --yes /dev/{vg_name}/{lv_name}")),
        Command::new(format!(
            "rmdir --parents --ignore-fail-on-non-empty {mount_path}"
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::COMMAND_EXECUTION_ERROR;
    use crate::gluster::testing::{
        entries, journal, Journal, RecordingPeerClient, RecordingRunner, StaticDiscovery,
    };
    use serde_json::json;

    const LOCAL: &str = "192.168.1.10";

    fn config() -> Arc<GlusterConfig> {
        Arc::new(GlusterConfig {
            pool_name: "pool".to_owned(),
            vg_name: "vgname".to_owned(),
            base_path: "/basepath".to_owned(),
            secret: "secret".to_owned(),
            ..Default::default()
        })
    }

    struct Setup {
        journal: Journal,
        runner: Arc<RecordingRunner>,
        peers: Arc<RecordingPeerClient>,
        orchestrator: VolumeOrchestrator,
    }

    fn setup(peers: &[&str], failing_peer: Option<&str>, runner: RecordingRunner) -> Setup {
        let journal = journal();
        let runner = Arc::new(runner.with_journal(journal.clone()));
        let mut client = RecordingPeerClient::new(journal.clone());
        if let Some(peer) = failing_peer {
            client = client.failing_on(peer);
        }
        let client = Arc::new(client);
        let orchestrator = VolumeOrchestrator::new(
            config(),
            LocalExecutor::new(runner.clone()),
            PeerFanOut::new(Arc::new(StaticDiscovery::new(peers, LOCAL)), client.clone()),
        );
        Setup {
            journal,
            runner,
            peers: client,
            orchestrator,
        }
    }

    #[tokio::test]
    async fn create_volume_should_fan_out_then_build_the_gluster_volume() {
        let setup = setup(
            &["192.168.1.11", "192.168.1.12"],
            None,
            RecordingRunner::default().respond("lvs", "  LV\n  pool\n"),
        );

        let pv = setup
            .orchestrator
            .create_volume("my-project", "10M")
            .await
            .unwrap();

        assert_eq!(pv, "my-project_pv1");
        let brick = "/basepath/my-project/pv1/brick";
        let mut expected = vec![
            "local: lvs -o lv_name".to_owned(),
            "192.168.1.11: /sec/lv".to_owned(),
            "192.168.1.12: /sec/lv".to_owned(),
        ];
        expected.extend(
            [
                "mkdir -p /basepath/my-project/pv1",
                "lvcreate -V 10M -T vgname/pool -n lv_my-project_pv1",
                "mkfs.xfs -i size=512 -n size=8192 /dev/vgname/lv_my-project_pv1",
                "echo \"/dev/vgname/lv_my-project_pv1 /basepath/my-project/pv1 xfs rw,inode64,noatime,nouuid 1 2\" | tee -a /etc/fstab > /dev/null ",
                "mount -o rw,inode64,noatime,nouuid /dev/vgname/lv_my-project_pv1 /basepath/my-project/pv1",
                "mkdir /basepath/my-project/pv1/brick",
                "semanage fcontext -a -t glusterd_brick_t /basepath/my-project/pv1/brick",
                "restorecon -Rv /basepath/my-project/pv1/brick",
                "chown nfsnobody.nfsnobody /basepath/my-project/pv1/brick",
                "chmod 777 /basepath/my-project/pv1/brick",
            ]
            .map(|command| format!("local: {command}")),
        );
        expected.push(format!(
            "local: gluster volume create vol_my-project_pv1 replica 2 192.168.1.11:{brick} 192.168.1.12:{brick} {LOCAL}:{brick} --mode=script"
        ));
        expected.extend(
            [
                "gluster volume start vol_my-project_pv1",
                "gluster volume set vol_my-project_pv1 user.smb disable",
                "gluster volume set vol_my-project_pv1 user.cifs disable",
            ]
            .map(|command| format!("local: {command}")),
        );
        assert_eq!(entries(&setup.journal), expected);
        assert_eq!(
            setup.peers.bodies()[0],
            json!({
                "size": "10M",
                "mountPoint": "/basepath/my-project/pv1",
                "lvName": "lv_my-project_pv1"
            })
        );
    }

    #[tokio::test]
    async fn create_volume_should_continue_after_the_highest_sequence() {
        let setup = setup(
            &[],
            None,
            RecordingRunner::default().respond(
                "lvs",
                "  LV\n  lv_my-project_pv1\n  lv_my-project_pv3\n  lv_other_pv9\n",
            ),
        );

        let pv = setup
            .orchestrator
            .create_volume("my-project", "1G")
            .await
            .unwrap();

        assert_eq!(pv, "my-project_pv4");
        assert!(setup
            .runner
            .commands()
            .contains(&"lvcreate -V 1G -T vgname/pool -n lv_my-project_pv4".to_owned()));
    }

    #[tokio::test]
    async fn failing_peer_should_leave_local_node_untouched() {
        let setup = setup(
            &["peer1", "peer2"],
            Some("peer2"),
            RecordingRunner::default(),
        );

        let error = setup
            .orchestrator
            .create_volume("my-project", "10M")
            .await
            .unwrap_err();

        assert_eq!(error.to_string(), COMMAND_EXECUTION_ERROR);
        assert_eq!(
            entries(&setup.journal),
            vec![
                "local: lvs -o lv_name",
                "peer1: /sec/lv",
                "peer2: /sec/lv"
            ]
        );
    }

    #[tokio::test]
    async fn failing_local_lv_should_skip_gluster_volume_creation() {
        let setup = setup(
            &["peer1"],
            None,
            RecordingRunner::default().fail_when("mkfs.xfs", 1),
        );

        assert!(setup
            .orchestrator
            .create_volume("my-project", "10M")
            .await
            .is_err());
        assert!(!setup
            .runner
            .commands()
            .iter()
            .any(|command| command.starts_with("gluster volume")));
    }

    #[tokio::test]
    async fn invalid_input_should_be_rejected_before_any_command() {
        let setup = setup(&["peer1"], None, RecordingRunner::default());

        let missing = setup.orchestrator.create_volume("", "10M").await.unwrap_err();
        assert_eq!(missing.to_string(), MISSING_INPUT_ERROR);
        let too_big = setup
            .orchestrator
            .create_volume("my-project", "101G")
            .await
            .unwrap_err();
        assert!(matches!(too_big, PortalError::Validation(_)));
        assert!(entries(&setup.journal).is_empty());
    }

    #[tokio::test]
    async fn grow_volume_should_extend_on_peers_then_locally() {
        let setup = setup(&["peer1"], None, RecordingRunner::default());

        setup
            .orchestrator
            .grow_volume("my-project_pv2", "10M")
            .await
            .unwrap();

        assert_eq!(
            entries(&setup.journal),
            vec![
                "peer1: /sec/lv/grow",
                "local: lvextend -L 10M /dev/vgname/lv_my-project_pv2",
                "local: xfs_growfs /dev/vgname/lv_my-project_pv2",
            ]
        );
        assert_eq!(
            setup.peers.bodies(),
            vec![json!({"pvName": "my-project_pv2", "newSize": "10M"})]
        );
    }

    #[tokio::test]
    async fn grow_to_the_current_size_should_still_grow_the_filesystem() {
        let setup = setup(&[], None, RecordingRunner::default().fail_when("lvextend", 5));

        setup
            .orchestrator
            .grow_volume("my-project_pv1", "5G")
            .await
            .unwrap();

        assert_eq!(
            setup.runner.commands(),
            vec![
                "lvextend -L 5G /dev/vgname/lv_my-project_pv1",
                "xfs_growfs /dev/vgname/lv_my-project_pv1",
            ]
        );
    }

    #[tokio::test]
    async fn delete_volume_should_stop_gluster_before_removing_lvs() {
        let setup = setup(&["peer1"], None, RecordingRunner::default());

        setup
            .orchestrator
            .delete_volume("vol_my-project_pv1")
            .await
            .unwrap();

        assert_eq!(
            entries(&setup.journal),
            vec![
                "local: gluster volume stop vol_my-project_pv1 --mode=script",
                "local: gluster volume delete vol_my-project_pv1 --mode=script",
                "peer1: /sec/lv/delete",
                "local: sed -i '\\#/dev/vgname/lv_my-project_pv1#d' /etc/fstab",
                "local: umount /basepath/my-project/pv1",
                "local: lvremove --yes /dev/vgname/lv_my-project_pv1",
                "local: rmdir --parents --ignore-fail-on-non-empty /basepath/my-project/pv1",
            ]
        );
        assert_eq!(
            setup.peers.bodies(),
            vec![json!({"lvName": "vol_my-project_pv1"})]
        );
    }

    #[tokio::test]
    async fn failing_gluster_stop_should_not_touch_any_lv() {
        let setup = setup(
            &["peer1"],
            None,
            RecordingRunner::default().fail_when("volume stop", 1),
        );

        assert!(setup
            .orchestrator
            .delete_volume("vol_my-project_pv1")
            .await
            .is_err());
        assert_eq!(
            entries(&setup.journal),
            vec!["local: gluster volume stop vol_my-project_pv1 --mode=script"]
        );
    }

    #[tokio::test]
    async fn local_lv_operations_should_require_all_inputs() {
        let setup = setup(&[], None, RecordingRunner::default());

        assert!(setup
            .orchestrator
            .create_lv_locally("lv_a_pv1", "", "10M")
            .await
            .is_err());
        assert!(setup.orchestrator.delete_lv_locally("").await.is_err());
        assert!(setup.orchestrator.grow_lv_locally("a_pv1", "").await.is_err());
        assert!(setup.runner.calls().is_empty());
    }

    #[tokio::test]
    async fn injected_names_should_be_rejected_before_any_command() {
        let setup = setup(&["peer1"], None, RecordingRunner::default());
        let orchestrator = &setup.orchestrator;

        let errors = vec![
            orchestrator.create_volume("x;reboot", "10M").await.unwrap_err(),
            orchestrator
                .create_volume("$(touch /tmp/pwned)", "10M")
                .await
                .unwrap_err(),
            orchestrator
                .grow_volume("x';touch /tmp/pwned;'_pv1", "10M")
                .await
                .unwrap_err(),
            orchestrator
                .grow_lv_locally("my-project_pv1 && id", "10M")
                .await
                .unwrap_err(),
            orchestrator
                .delete_volume("vol_x_pv1; rm -rf /")
                .await
                .unwrap_err(),
            orchestrator
                .delete_lv_locally("vol_../../etc_pv1")
                .await
                .unwrap_err(),
            orchestrator
                .create_lv_locally("lv_x`id`_pv1", "/basepath/x/pv1", "10M")
                .await
                .unwrap_err(),
        ];

        assert!(errors
            .iter()
            .all(|error| matches!(error, PortalError::Validation(_))));
        assert!(entries(&setup.journal).is_empty());
    }

    #[tokio::test]
    async fn local_lv_should_only_be_created_at_its_own_mount_point() {
        let setup = setup(&[], None, RecordingRunner::default());

        let moved = setup
            .orchestrator
            .create_lv_locally("lv_my-project_pv1", "/etc; id", "10M")
            .await
            .unwrap_err();
        let injected_size = setup
            .orchestrator
            .create_lv_locally("lv_my-project_pv1", "/basepath/my-project/pv1", "10M;id")
            .await
            .unwrap_err();

        assert_eq!(moved.to_string(), "Invalid mount point: /etc; id");
        assert!(matches!(injected_size, PortalError::Validation(_)));
        assert!(setup.runner.calls().is_empty());

        setup
            .orchestrator
            .create_lv_locally("lv_my-project_pv1", "/basepath/my-project/pv1", "10M")
            .await
            .unwrap();
        assert_eq!(
            setup.runner.commands()[1],
            "lvcreate -V 10M -T vgname/pool -n lv_my-project_pv1"
        );
    }

    #[test]
    fn volume_without_peers_should_only_list_the_local_brick() {
        let commands = volume_commands("vol_p_pv1", 1, &[], "10.0.0.1", "/b/p/pv1");
        assert_eq!(
            commands[0].text(),
            "gluster volume create vol_p_pv1 replica 1 10.0.0.1:/b/p/pv1/brick --mode=script"
        );
    }
}
