use helion::client::FelicityClient;
use helion::config::InverterConfig;
use helion::record::PathSeg::{Idx, Key};
use serde_json::json;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::time::{Duration, sleep};

/// Serve one canned response per incoming connection, in order, closing each
/// socket after the write. An empty response closes without sending.
async fn mock_inverter(responses: Vec<Vec<u8>>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        for response in responses {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let mut buf = [0u8; 256];
            let _ = socket.read(&mut buf).await;
            if !response.is_empty() {
                let _ = socket.write_all(&response).await;
            }
        }
    });
    addr
}

fn client_for(addr: SocketAddr) -> FelicityClient {
    let config = InverterConfig {
        host: addr.ip().to_string(),
        port: addr.port(),
        connect_timeout_ms: 1000,
        read_timeout_ms: 100,
        max_read_chunks: 40,
    };
    FelicityClient::new(&config)
}

#[tokio::test]
async fn full_poll_combines_all_three_namespaces() {
    let addr = mock_inverter(vec![
        b"{'Batt': [[5280, 0, 0]],\r\n 'date': '20240601120000', 'fault': 0}".to_vec(),
        b"{'version': '1.09', 'Type': 5}".to_vec(),
        b"{'OperM': 1, 'index': 0}{'OperM': 2, 'buzEn': 1}".to_vec(),
    ])
    .await;

    let record = client_for(addr).fetch().await.unwrap();
    assert_eq!(
        record.get_path(&[Key("Batt"), Idx(0), Idx(0)]),
        Some(&json!(5280))
    );
    assert_eq!(record.date_str(), Some("20240601120000"));
    assert_eq!(
        record.get_path(&[Key("_basic"), Key("version")]),
        Some(&json!("1.09"))
    );
    // Later settings fragment wins on conflict
    assert_eq!(record.setting("OperM"), Some(&json!(2)));
    assert_eq!(record.setting("buzEn"), Some(&json!(1)));
}

#[tokio::test]
async fn chunked_response_is_reassembled() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        // Realtime command: payload split across two writes within the
        // read-timeout window.
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 256];
        let _ = socket.read(&mut buf).await;
        socket.write_all(b"{'fault': 0, 'Batt': ").await.unwrap();
        sleep(Duration::from_millis(30)).await;
        socket.write_all(b"[[5280]]}").await.unwrap();
        drop(socket);
        // Basic and settings commands: nothing to say.
        for _ in 0..2 {
            let (socket, _) = listener.accept().await.unwrap();
            drop(socket);
        }
    });

    let record = client_for(addr).fetch().await.unwrap();
    assert_eq!(
        record.get_path(&[Key("Batt"), Idx(0), Idx(0)]),
        Some(&json!(5280))
    );
    assert!(record.get("_basic").is_none());
    assert!(record.get("_settings").is_none());
}

#[tokio::test]
async fn empty_runtime_response_is_a_protocol_error() {
    let addr = mock_inverter(vec![Vec::new()]).await;
    let err = client_for(addr).fetch().await.unwrap_err();
    assert!(err.to_string().contains("No data received"));
}

#[tokio::test]
async fn unparseable_runtime_response_is_a_protocol_error() {
    let addr = mock_inverter(vec![b"ERR no such command".to_vec()]).await;
    let err = client_for(addr).fetch().await.unwrap_err();
    assert!(err.to_string().contains("Unexpected runtime payload"));
}

#[tokio::test]
async fn failed_optional_commands_leave_namespaces_absent() {
    let addr = mock_inverter(vec![
        b"{'fault': 0}".to_vec(),
        Vec::new(),
        Vec::new(),
    ])
    .await;

    let record = client_for(addr).fetch().await.unwrap();
    assert_eq!(record.get("fault"), Some(&json!(0)));
    assert!(record.get("_basic").is_none());
    assert!(record.get("_settings").is_none());
}

#[tokio::test]
async fn non_ascii_bytes_are_dropped_before_parsing() {
    let addr = mock_inverter(vec![
        b"\xff\xfe{'fault': 0, 'warn': None}\xf0".to_vec(),
        Vec::new(),
        Vec::new(),
    ])
    .await;

    let record = client_for(addr).fetch().await.unwrap();
    assert_eq!(record.get("fault"), Some(&json!(0)));
    assert_eq!(record.get("warn"), Some(&json!(null)));
}

#[tokio::test]
async fn connection_refused_is_a_connection_error() {
    // Bind then drop to get a port that is almost certainly closed.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client_for(addr).fetch().await.unwrap_err();
    assert!(err.to_string().contains("Error connecting"));
}
