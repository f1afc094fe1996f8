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

mod common;

use common::{node_state, start_node, ScriptedRunner, SECRET};
use reqwest::StatusCode;
use serde_json::{json, Value};
use ssp_backend::error::COMMAND_EXECUTION_ERROR;
use ssp_backend::gluster::peer_client::API_USER;
use std::net::SocketAddr;
use std::sync::Arc;

const PEER_STATUS: &str = "Hostname: 127.0.0.1\n";

struct Cluster {
    local: SocketAddr,
    local_runner: Arc<ScriptedRunner>,
    peer_runner: Arc<ScriptedRunner>,
}

/// Starts a peer node and a local node that lists the peer as its only
/// gluster peer.
async fn cluster(local_runner: ScriptedRunner, peer_runner: ScriptedRunner) -> Cluster {
    let peer_runner = Arc::new(peer_runner);
    let peer = start_node(node_state(peer_runner.clone(), 0)).await;

    let local_runner = Arc::new(local_runner.respond("gluster peer status", PEER_STATUS));
    let local = start_node(node_state(local_runner.clone(), peer.port())).await;
    Cluster {
        local,
        local_runner,
        peer_runner,
    }
}

async fn post(address: SocketAddr, path: &str, body: Value) -> (StatusCode, Value) {
    let response = reqwest::Client::new()
        .post(format!("http://{address}{path}"))
        .basic_auth(API_USER, Some(SECRET))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = response.status();
    (status, response.json().await.unwrap())
}

async fn get(address: SocketAddr, path: &str) -> (StatusCode, Value) {
    let response = reqwest::get(format!("http://{address}{path}")).await.unwrap();
    let status = response.status();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn ping_should_answer_pong() {
    let node = start_node(node_state(Arc::new(ScriptedRunner::default()), 0)).await;

    let pong = reqwest::get(format!("http://{node}/ping"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let name = reqwest::get(format!("http://{node}/"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert_eq!(pong, "pong");
    assert_eq!(name, "SSP Gluster API");
}

#[tokio::test]
async fn secured_routes_should_require_credentials() {
    let runner = Arc::new(ScriptedRunner::default());
    let node = start_node(node_state(runner.clone(), 0)).await;
    let client = reqwest::Client::new();
    let body = json!({"size": "5G", "mountPoint": "/gluster/project/p/pv1", "lvName": "lv_p_pv1"});

    let anonymous = client
        .post(format!("http://{node}/sec/lv"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let wrong_secret = client
        .post(format!("http://{node}/sec/lv"))
        .basic_auth(API_USER, Some("guess"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let wrong_user = client
        .post(format!("http://{node}/sec/lv"))
        .basic_auth("admin", Some(SECRET))
        .json(&body)
        .send()
        .await
        .unwrap();

    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        anonymous.headers().get("www-authenticate").unwrap(),
        "Basic"
    );
    assert_eq!(wrong_secret.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_user.status(), StatusCode::UNAUTHORIZED);
    assert!(runner.commands().is_empty());
}

#[tokio::test]
async fn volume_should_be_created_on_peer_before_local_node() {
    let cluster = cluster(ScriptedRunner::default(), ScriptedRunner::default()).await;

    let (status, body) = post(
        cluster.local,
        "/sec/volume",
        json!({"project": "my-project", "size": "5G"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "my-project_pv1"}));

    let peer = cluster.peer_runner.commands();
    assert!(peer.contains(&"mkdir -p /gluster/project/my-project/pv1".to_owned()));
    assert!(peer.contains(&"lvcreate -V 5G -T vg_ssd/pool_ssd -n lv_my-project_pv1".to_owned()));

    let local = cluster.local_runner.commands();
    let lvcreate = local
        .iter()
        .position(|command| command.starts_with("lvcreate"))
        .unwrap();
    let volume_create = local
        .iter()
        .position(|command| command.starts_with("gluster volume create"))
        .unwrap();
    assert!(lvcreate < volume_create);
    assert_eq!(
        local[volume_create],
        "gluster volume create vol_my-project_pv1 replica 2 \
         127.0.0.1:/gluster/project/my-project/pv1/brick \
         10.0.0.1:/gluster/project/my-project/pv1/brick --mode=script"
    );
    assert_eq!(
        local.last().unwrap(),
        "gluster volume set vol_my-project_pv1 user.cifs disable"
    );
}

#[tokio::test]
async fn failing_peer_should_stop_creation_before_local_changes() {
    let cluster = cluster(
        ScriptedRunner::default(),
        ScriptedRunner::default().fail_when("lvcreate", 3),
    )
    .await;

    let (status, body) = post(
        cluster.local,
        "/sec/volume",
        json!({"project": "my-project", "size": "5G"}),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], COMMAND_EXECUTION_ERROR);
    assert!(cluster
        .local_runner
        .commands()
        .iter()
        .all(|command| !command.starts_with("lvcreate") && !command.starts_with("gluster volume")));
}

#[tokio::test]
async fn invalid_size_should_be_rejected_without_running_commands() {
    let cluster = cluster(ScriptedRunner::default(), ScriptedRunner::default()).await;

    let (status, body) = post(
        cluster.local,
        "/sec/volume",
        json!({"project": "my-project", "size": "101G"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Max allowed size exceeded. Max allowed is: 100G");
    assert!(cluster.peer_runner.commands().is_empty());
}

#[tokio::test]
async fn grow_should_reach_peer_and_local_node() {
    let cluster = cluster(ScriptedRunner::default(), ScriptedRunner::default()).await;

    let (status, body) = post(
        cluster.local,
        "/sec/volume/grow",
        json!({"pvName": "my-project_pv1", "newSize": "10G"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Volume grown"}));
    let expected = vec![
        "lvextend -L 10G /dev/vg_ssd/lv_my-project_pv1".to_owned(),
        "xfs_growfs /dev/vg_ssd/lv_my-project_pv1".to_owned(),
    ];
    assert_eq!(cluster.peer_runner.commands(), expected);
    assert!(cluster
        .local_runner
        .commands()
        .ends_with(&expected));
}

#[tokio::test]
async fn delete_should_stop_volume_then_remove_lvs_everywhere() {
    let cluster = cluster(ScriptedRunner::default(), ScriptedRunner::default()).await;

    let (status, body) = post(
        cluster.local,
        "/sec/volume/delete",
        json!({"lvName": "vol_my-project_pv1"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Volume deleted"}));
    let local = cluster.local_runner.commands();
    assert_eq!(local[0], "gluster volume stop vol_my-project_pv1 --mode=script");
    assert_eq!(local[1], "gluster volume delete vol_my-project_pv1 --mode=script");
    assert!(local.contains(&"lvremove --yes /dev/vg_ssd/lv_my-project_pv1".to_owned()));
    assert!(cluster
        .peer_runner
        .commands()
        .contains(&"umount /gluster/project/my-project/pv1".to_owned()));
}

#[tokio::test]
async fn usage_should_be_reported_and_checked_against_threshold() {
    let runner = Arc::new(ScriptedRunner::default().respond(
        "lv_my--project_pv1",
        " 10240  5120 /dev/mapper/vg_ssd-lv_my--project_pv1\n",
    ));
    let node = start_node(node_state(runner, 0)).await;

    let (status, usage) = get(node, "/volume/gl-my-project-pv1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        usage,
        json!({"totalKiloBytes": 10240, "usedKiloBytes": 5120})
    );

    let (status, _) = get(node, "/volume/gl-my-project-pv1/check?threshold=60").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get(node, "/volume/gl-my-project-pv1/check?threshold=40").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Error used 50 is bigger than threshold: 40");

    let (status, body) = get(node, "/volume/gl-my-project-pv1/check?threshold=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Wrong threshold. Is not a valid integer");
}

#[tokio::test]
async fn usage_of_unknown_pv_should_be_not_found() {
    let runner = Arc::new(ScriptedRunner::default().fail_when("df --output", 1));
    let node = start_node(node_state(runner, 0)).await;

    let (status, body) = get(node, "/volume/gl-unknown-pv9").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "PV gl-unknown-pv9 does not exist");
}

#[tokio::test]
async fn shell_payloads_should_be_rejected_on_every_entry_point() {
    let cluster = cluster(ScriptedRunner::default(), ScriptedRunner::default()).await;

    let (status, body) = get(
        cluster.local,
        "/volume/gl-x%27%3Btouch%20%2Ftmp%2Fpwned%3B%27-pv1",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid PV name: gl-x';touch /tmp/pwned;'-pv1");

    let requests = [
        ("/sec/volume", json!({"project": "x;reboot", "size": "5G"})),
        ("/sec/volume", json!({"project": "my-project", "size": "5G;id"})),
        ("/sec/volume/grow", json!({"pvName": "x$(id)_pv1", "newSize": "5G"})),
        ("/sec/volume/delete", json!({"lvName": "vol_x_pv1 && id"})),
        (
            "/sec/lv",
            json!({"size": "5G", "mountPoint": "/gluster/project/x/pv1", "lvName": "lv_x|id_pv1"}),
        ),
        (
            "/sec/lv",
            json!({"size": "5G", "mountPoint": "/tmp; id", "lvName": "lv_x_pv1"}),
        ),
        ("/sec/lv/grow", json!({"pvName": "x_pv1`id`", "newSize": "5G"})),
        ("/sec/lv/delete", json!({"lvName": "vol_../etc_pv1"})),
    ];
    for (path, request) in requests {
        let (status, _) = post(cluster.local, path, request.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{path} accepted {request}");
    }

    assert!(cluster.local_runner.commands().is_empty());
    assert!(cluster.peer_runner.commands().is_empty());
}
