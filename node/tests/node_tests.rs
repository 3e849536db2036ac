//! Integration tests running a full node on a loopback socket: seed file →
//! ledger → HTTP server → graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use agora_node::{AgoraNode, NodeConfig};
use agora_nullables::InMemoryLedger;
use agora_store::{VoteStore, VotingStore};
use agora_types::{ResidentId, VotingId};

const SEED: &str = r##"{
    "businesses": [{"id": 1, "name": "Torre Norte"}],
    "propertyUnits": [
        {"id": 1, "businessId": 1, "number": "101", "participationCoefficient": "0.5"},
        {"id": 2, "businessId": 1, "number": "102", "participationCoefficient": "0.5"}
    ],
    "residents": [
        {"id": 1, "name": "Ana", "dni": "111", "propertyUnitId": 1, "isMainResident": true}
    ],
    "votingGroups": [{"id": 1, "businessId": 1, "name": "Asamblea",
                      "startsAt": null, "endsAt": null,
                      "requiresQuorum": false, "quorumPercentage": 0.0}],
    "votings": [{"id": 1, "votingGroupId": 1, "title": "Budget", "votingType": "binary"}],
    "votingOptions": [
        {"id": 1, "votingId": 1, "text": "Yes", "code": "YES", "color": "#22c55e"},
        {"id": 2, "votingId": 1, "text": "No", "code": "NO", "color": "#ef4444"}
    ],
    "votes": [{"id": 1, "votingId": 1, "residentId": 1, "votingOptionId": 2, "votedAt": 10,
               "ipAddress": null, "userAgent": null, "notes": null}]
}"##;

fn seeded_config(dir: &tempfile::TempDir) -> NodeConfig {
    let seed = dir.path().join("seed.json");
    std::fs::write(&seed, SEED).unwrap();
    NodeConfig {
        bind_address: "127.0.0.1".into(),
        port: 0,
        token_secret: "node-secret".into(),
        admin_api_key: "node-admin".into(),
        seed_file: Some(seed),
        enable_metrics: true,
        ..NodeConfig::default()
    }
}

/// Send a bare HTTP/1.1 request and return everything read within `wait`.
async fn raw_request(addr: std::net::SocketAddr, request: &str, wait: Duration) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut out = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        match tokio::time::timeout(wait, stream.read(&mut buf)).await {
            Ok(Ok(0)) | Err(_) => break,
            Ok(Ok(n)) => out.extend_from_slice(&buf[..n]),
            Ok(Err(e)) => panic!("read failed: {e}"),
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[test]
fn seed_file_populates_the_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let node = AgoraNode::new(seeded_config(&dir)).unwrap();
    let ledger: &Arc<InMemoryLedger> = node.ledger();
    assert_eq!(ledger.get_voting(VotingId::new(1)).unwrap().title, "Budget");
    assert!(ledger
        .has_voted(VotingId::new(1), ResidentId::new(1))
        .unwrap());
}

#[test]
fn config_file_drives_the_node() {
    let dir = tempfile::tempdir().unwrap();
    let config = seeded_config(&dir);
    let path = dir.path().join("agora.toml");
    std::fs::write(&path, config.to_toml_string().unwrap()).unwrap();

    let loaded = NodeConfig::from_toml_file(&path).unwrap();
    assert_eq!(loaded.seed_file, config.seed_file);
    let node = AgoraNode::new(loaded).unwrap();
    assert!(node.state().settings.enable_metrics);
    assert_eq!(node.state().settings.admin_api_key, "node-admin");
}

#[tokio::test]
async fn serves_health_and_results_over_tcp() {
    let dir = tempfile::tempdir().unwrap();
    let mut node = AgoraNode::new(seeded_config(&dir)).unwrap();
    let addr = node.start().await.unwrap();

    let health = raw_request(
        addr,
        "GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        Duration::from_secs(2),
    )
    .await;
    assert!(health.starts_with("HTTP/1.1 200"), "{health}");
    assert!(health.contains("\"status\":\"ok\""));

    let results = raw_request(
        addr,
        "GET /admin/votings/1/results HTTP/1.1\r\nHost: localhost\r\n\
         Authorization: Bearer node-admin\r\nConnection: close\r\n\r\n",
        Duration::from_secs(2),
    )
    .await;
    assert!(results.starts_with("HTTP/1.1 200"), "{results}");
    assert!(results.contains("\"totalVotes\":1"));

    node.stop().await.unwrap();
}

#[tokio::test]
async fn stop_closes_open_streams() {
    let dir = tempfile::tempdir().unwrap();
    let mut node = AgoraNode::new(seeded_config(&dir)).unwrap();
    let addr = node.start().await.unwrap();

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(
            b"GET /admin/votings/1/stream HTTP/1.1\r\nHost: localhost\r\n\
              Authorization: Bearer node-admin\r\n\r\n",
        )
        .await
        .unwrap();
    let mut head = vec![0u8; 4096];
    let n = tokio::time::timeout(Duration::from_secs(2), stream.read(&mut head))
        .await
        .unwrap()
        .unwrap();
    let head = String::from_utf8_lossy(&head[..n]).into_owned();
    assert!(head.starts_with("HTTP/1.1 200"), "{head}");
    assert_eq!(node.state().metrics.sse_connections.get(), 1);

    // Graceful shutdown would hang on a stream that never ends.
    tokio::time::timeout(Duration::from_secs(4), node.stop())
        .await
        .expect("stop timed out")
        .unwrap();
    assert_eq!(node.state().metrics.sse_connections.get(), 0);
}
