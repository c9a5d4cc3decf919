//! Wire-level tests: the real client against an in-process stub daemon
//! speaking the binary protocol.

use bucketctl::{provision_bucket, EngineTuning, Error, McClient, ProvisionConfig};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const OP_SASL_AUTH: u8 = 0x21;
const OP_SET_VBUCKET_STATE: u8 = 0x3d;
const OP_CREATE_BUCKET: u8 = 0x85;
const OP_SELECT_BUCKET: u8 = 0x89;

#[derive(Default)]
struct DaemonState {
    bucket_exists: bool,
    created: Option<(String, String, String)>,
    activations: Vec<(u16, String)>,
}

fn response_frame(opcode: u8, status: u16, opaque: u32, msg: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; 24];
    buf[0] = 0x81;
    buf[1] = opcode;
    buf[6..8].copy_from_slice(&status.to_be_bytes());
    buf[8..12].copy_from_slice(&(msg.len() as u32).to_be_bytes());
    buf[12..16].copy_from_slice(&opaque.to_be_bytes());
    buf.extend_from_slice(msg);
    buf
}

/// Serve one connection: parse request frames, answer like the bucket engine
/// does, record what happened.
async fn serve_one(listener: TcpListener, state: Arc<Mutex<DaemonState>>) {
    let (mut socket, _) = listener.accept().await.unwrap();

    loop {
        let mut header = [0u8; 24];
        if socket.read_exact(&mut header).await.is_err() {
            break;
        }
        assert_eq!(header[0], 0x80, "request magic");

        let opcode = header[1];
        let key_len = u16::from_be_bytes([header[2], header[3]]) as usize;
        let body_len = u32::from_be_bytes([header[8], header[9], header[10], header[11]]) as usize;
        let opaque = u32::from_be_bytes([header[12], header[13], header[14], header[15]]);

        let mut body = vec![0u8; body_len];
        socket.read_exact(&mut body).await.unwrap();
        let key = &body[..key_len];
        let value = &body[key_len..];

        let (status, msg): (u16, &[u8]) = {
            let mut st = state.lock().unwrap();
            match opcode {
                OP_SASL_AUTH => {
                    if key == b"PLAIN" && value == b"\0admin\0secret" {
                        (0x0000, &b""[..])
                    } else {
                        (0x0020, &b"Auth failure"[..])
                    }
                }
                OP_SELECT_BUCKET => {
                    if st.bucket_exists {
                        (0x0000, &b""[..])
                    } else {
                        (0x0001, &b"Engine not found"[..])
                    }
                }
                OP_CREATE_BUCKET => {
                    let nul = value.iter().position(|&b| b == 0).unwrap();
                    st.created = Some((
                        String::from_utf8(key.to_vec()).unwrap(),
                        String::from_utf8(value[..nul].to_vec()).unwrap(),
                        String::from_utf8(value[nul + 1..].to_vec()).unwrap(),
                    ));
                    st.bucket_exists = true;
                    (0x0000, &b""[..])
                }
                OP_SET_VBUCKET_STATE => {
                    let vb: u16 = std::str::from_utf8(key).unwrap().parse().unwrap();
                    let state_str = String::from_utf8(value.to_vec()).unwrap();
                    st.activations.push((vb, state_str));
                    (0x0000, &b""[..])
                }
                _ => (0x0081, &b"Unknown command"[..]),
            }
        };

        let frame = response_frame(opcode, status, opaque, msg);
        if socket.write_all(&frame).await.is_err() {
            break;
        }
    }
}

async fn start_daemon(state: Arc<Mutex<DaemonState>>) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(serve_one(listener, state));
    port
}

fn config_for(port: u16) -> ProvisionConfig {
    ProvisionConfig {
        host: "127.0.0.1".into(),
        port,
        username: "admin".into(),
        password: "secret".into(),
        base_dir: "/srv".into(),
        data_dir: "/data".into(),
        bucket: "b1".into(),
        max_attempts: 5,
        retry_delay_ms: 10,
        create_on_any_error: false,
    }
}

#[tokio::test]
async fn provisions_missing_bucket_end_to_end() {
    let state = Arc::new(Mutex::new(DaemonState::default()));
    let port = start_daemon(state.clone()).await;

    let cfg = config_for(port);
    let mut client = McClient::connect(&cfg.host, cfg.port).await.unwrap();
    client
        .sasl_auth_plain(&cfg.username, &cfg.password)
        .await
        .unwrap();

    let report = provision_bucket(&mut client, &cfg, &EngineTuning::default())
        .await
        .unwrap();

    assert!(report.created);
    assert_eq!(report.vbuckets_activated, 1024);

    let st = state.lock().unwrap();
    let (name, engine, config) = st.created.as_ref().unwrap();
    assert_eq!(name, "b1");
    assert_eq!(engine, "/srv/install/lib/memcached/ep.so");
    assert_eq!(
        config,
        "initfile=/srv/install/etc/membase/init.sql;dbname=/data/b1-data/b1;\
         ht_size=3079;ht_locks=5;db_shards=4;tap_noop_interval=20;\
         max_txn_size=1000;max_size=1048576000;tap_keepalive=300;\
         vb0=false;waitforwarmup=false;failpartialwarmup=false;\
         shardpattern=%d/%b-%i.mb;db_strategy=multiMTVBDB;"
    );

    assert_eq!(st.activations.len(), 1024);
    for (i, (vb, state_str)) in st.activations.iter().enumerate() {
        assert_eq!(*vb, i as u16);
        assert_eq!(state_str, "active");
    }
}

#[tokio::test]
async fn selects_existing_bucket_without_creating() {
    let state = Arc::new(Mutex::new(DaemonState {
        bucket_exists: true,
        ..Default::default()
    }));
    let port = start_daemon(state.clone()).await;

    let cfg = config_for(port);
    let mut client = McClient::connect(&cfg.host, cfg.port).await.unwrap();
    client
        .sasl_auth_plain(&cfg.username, &cfg.password)
        .await
        .unwrap();

    let report = provision_bucket(&mut client, &cfg, &EngineTuning::default())
        .await
        .unwrap();

    assert!(!report.created);
    assert_eq!(report.create_requests, 0);

    let st = state.lock().unwrap();
    assert!(st.created.is_none());
    assert_eq!(st.activations.len(), 1024);
}

#[tokio::test]
async fn bad_credentials_fail_authentication() {
    let state = Arc::new(Mutex::new(DaemonState::default()));
    let port = start_daemon(state).await;

    let mut client = McClient::connect("127.0.0.1", port).await.unwrap();
    let err = client.sasl_auth_plain("admin", "wrong").await.unwrap_err();

    assert!(matches!(err, Error::AuthFailed(_)));
}

#[tokio::test]
async fn connect_to_unreachable_daemon_fails() {
    // Bind-then-drop gives a port nothing is listening on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let err = McClient::connect("127.0.0.1", port).await.unwrap_err();
    assert!(matches!(err, Error::ConnectionFailed(_)));
    assert!(err.is_retryable());
}
