#![cfg(unix)]

use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use spherolink_conn::{
    CancellationToken, Command, ConnError, Connection, ConnectionConfig, ConnectionState,
    Dispatcher,
};
use spherolink_frame::{checksum, RawFrame, ResponseCode, ResponseFrame, DID_CORE, DID_SPHERO};
use spherolink_transport::Endpoint;

fn make_sock_path(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "spherolink-conn-{}-{}-{}",
        tag,
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir.join("device.sock")
}

fn fast_config() -> ConnectionConfig {
    ConnectionConfig {
        max_retries: 0,
        retry_delay: Duration::from_millis(10),
        ..ConnectionConfig::default()
    }
}

/// Bind a listener and run `device` against the first client on its own thread.
fn spawn_device<F>(tag: &str, device: F) -> (Endpoint, JoinHandle<()>)
where
    F: FnOnce(UnixStream) + Send + 'static,
{
    let path = make_sock_path(tag);
    let listener = UnixListener::bind(&path).expect("listener should bind");
    let dir = path.parent().expect("socket has a parent dir").to_path_buf();

    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("device should accept");
        device(stream);
        let _ = std::fs::remove_dir_all(&dir);
    });
    (Endpoint::Unix(path), handle)
}

/// A synchronous reply: `FF FF code seq dlen payload chk`.
fn reply(code: u8, seq: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = vec![0xFF, 0xFF, code, seq, payload.len() as u8];
    frame.extend_from_slice(payload);
    frame.push(checksum(&frame[2..]));
    frame
}

fn read_command(stream: &mut UnixStream, payload_len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; 7 + payload_len];
    stream.read_exact(&mut buf).expect("device should read a command");
    buf
}

fn wait_for_state(conn: &Connection, state: ConnectionState) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while conn.state() != state {
        assert!(Instant::now() < deadline, "stuck in {:?}", conn.state());
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn ping_roundtrip() {
    let (endpoint, device) = spawn_device("ping", |mut stream| {
        let cmd = read_command(&mut stream, 0);
        assert_eq!(cmd, [0xFF, 0xFD, 0x00, 0x01, 0x00, 0x01, 0xFD]);
        stream.write_all(&reply(0x00, cmd[4], &[])).unwrap();
        let _ = stream.read_to_end(&mut Vec::new());
    });

    let dispatcher = Dispatcher::connect(endpoint, fast_config()).expect("should connect");
    assert_eq!(dispatcher.connection().state(), ConnectionState::Connected);

    let seq = dispatcher.send_command(DID_CORE, 0x01).unwrap();
    assert_eq!(seq, 0);
    assert_eq!(dispatcher.next_sequence(), 1);

    let response = dispatcher.read_response().unwrap();
    assert_eq!(response.response_code(), ResponseCode::Ok);
    assert_eq!(response.seq, 0);
    assert_eq!(response.data_length, 0);

    dispatcher.close();
    device.join().unwrap();
}

#[test]
fn frames_reach_the_wire_in_send_order() {
    let (endpoint, device) = spawn_device("order", |mut stream| {
        let mut wire = vec![0u8; 7 + 8 + 11];
        stream.read_exact(&mut wire).unwrap();

        assert_eq!(&wire[..7], &[0xFF, 0xFD, 0x00, 0x01, 0x00, 0x01, 0xFD]);
        assert_eq!(&wire[7..13], &[0xFF, 0xFE, 0x02, 0x21, 0x01, 0x02]);
        assert_eq!(wire[13], 0x80);
        assert_eq!(&wire[15..21], &[0xFF, 0xFD, 0x02, 0x20, 0x02, 0x05]);
        assert_eq!(&wire[21..25], &[0xFF, 0x00, 0x00, 0xFF]);
        let _ = stream.read_to_end(&mut Vec::new());
    });

    let dispatcher = Dispatcher::connect(endpoint, fast_config()).unwrap();
    dispatcher.send_command(DID_CORE, 0x01).unwrap();
    dispatcher
        .send_command_with(
            &Command::new(DID_SPHERO, 0x21)
                .with_payload(vec![0x80])
                .without_answer(),
        )
        .unwrap();
    let red = Command::named("set-rgb-led")
        .unwrap()
        .with_payload(vec![0xFF, 0x00, 0x00, 0xFF]);
    dispatcher.send_command_with(&red).unwrap();
    assert_eq!(dispatcher.next_sequence(), 3);

    // Wait for the device to see all three frames before hanging up.
    let deadline = Instant::now() + Duration::from_secs(5);
    while dispatcher.connection().pending_outbound() > 0 {
        assert!(Instant::now() < deadline, "frames never left the queue");
        thread::sleep(Duration::from_millis(5));
    }
    dispatcher.close();
    device.join().unwrap();
}

#[test]
fn replies_are_read_in_arrival_order_not_by_sequence() {
    let (endpoint, device) = spawn_device("arrival", |mut stream| {
        read_command(&mut stream, 0);
        read_command(&mut stream, 0);
        // Answer the second command first.
        stream.write_all(&reply(0x00, 1, &[0xAA])).unwrap();
        thread::sleep(Duration::from_millis(50));
        stream.write_all(&reply(0x00, 0, &[0xBB])).unwrap();
        let _ = stream.read_to_end(&mut Vec::new());
    });

    let dispatcher = Dispatcher::connect(endpoint, fast_config()).unwrap();
    assert_eq!(dispatcher.send_command(DID_CORE, 0x01).unwrap(), 0);
    assert_eq!(dispatcher.send_command(DID_CORE, 0x01).unwrap(), 1);

    let first = dispatcher.read_response().unwrap();
    let second = dispatcher.read_response().unwrap();
    assert_eq!((first.seq, first.payload.as_ref()), (1, &[0xAA][..]));
    assert_eq!((second.seq, second.payload.as_ref()), (0, &[0xBB][..]));

    dispatcher.close();
    device.join().unwrap();
}

#[test]
fn leading_noise_is_skipped() {
    let (endpoint, device) = spawn_device("noise", |mut stream| {
        let mut chunk = vec![0x00, 0x42];
        chunk.extend(reply(0x09, 4, &[0x01, 0x02]));
        stream.write_all(&chunk).unwrap();
        let _ = stream.read_to_end(&mut Vec::new());
    });

    let conn = Connection::open(endpoint, fast_config()).unwrap();
    let response: ResponseFrame = conn.read().unwrap();
    assert_eq!(response.response_code(), ResponseCode::BadDeviceId);
    assert_eq!(response.seq, 4);
    assert_eq!(response.data_to::<u16>(0), 0x0102);

    conn.close();
    device.join().unwrap();
}

#[test]
fn checksum_validation_rejects_corrupt_reply() {
    let (endpoint, device) = spawn_device("checksum", |mut stream| {
        let mut bad = reply(0x00, 0, &[0x10]);
        *bad.last_mut().unwrap() ^= 0xFF;
        stream.write_all(&bad).unwrap();
        let _ = stream.read_to_end(&mut Vec::new());
    });

    let mut config = fast_config();
    config.frame.validate_checksum = true;
    let conn = Connection::open(endpoint, config).unwrap();

    let err = conn.read::<ResponseFrame>().unwrap_err();
    assert!(matches!(err, ConnError::Frame(_)));
    assert_eq!(conn.pending_inbound(), 0);

    conn.close();
    device.join().unwrap();
}

#[test]
fn blocked_read_wakes_on_close() {
    let (endpoint, device) = spawn_device("wake", |mut stream| {
        let _ = stream.read_to_end(&mut Vec::new());
    });

    let conn = Connection::open(endpoint, fast_config()).unwrap();
    thread::scope(|scope| {
        let reader = scope.spawn(|| conn.read::<RawFrame>());
        thread::sleep(Duration::from_millis(50));
        conn.close();

        let err = reader.join().unwrap().unwrap_err();
        assert!(matches!(err, ConnError::NotConnected(_)));
    });

    assert_eq!(conn.state(), ConnectionState::Closed);
    conn.close();
    assert_eq!(conn.state(), ConnectionState::Closed);
    device.join().unwrap();
}

#[test]
fn read_timeout_and_cancellation() {
    let (endpoint, device) = spawn_device("timeout", |mut stream| {
        let _ = stream.read_to_end(&mut Vec::new());
    });

    let conn = Connection::open(endpoint, fast_config()).unwrap();

    let started = Instant::now();
    let err = conn.read_timeout::<RawFrame>(Duration::from_millis(50)).unwrap_err();
    assert!(matches!(err, ConnError::Timeout(d) if d == Duration::from_millis(50)));
    assert!(started.elapsed() >= Duration::from_millis(50));

    let token = CancellationToken::new();
    thread::scope(|scope| {
        let reader = scope.spawn(|| conn.read_cancellable::<RawFrame>(&token));
        thread::sleep(Duration::from_millis(50));
        token.cancel();

        let err = reader.join().unwrap().unwrap_err();
        assert!(matches!(err, ConnError::Cancelled));
    });
    assert!(conn.is_connected());

    conn.close();
    device.join().unwrap();
}

#[test]
fn retry_exhaustion_reports_last_error() {
    let path = make_sock_path("retry");
    let config = ConnectionConfig {
        max_retries: 2,
        retry_delay: Duration::from_millis(20),
        ..ConnectionConfig::default()
    };
    let conn = Connection::with_endpoint(Endpoint::Unix(path.clone()), config);

    let started = Instant::now();
    let err = conn.connect().unwrap_err();
    assert!(started.elapsed() >= Duration::from_millis(40));

    match err {
        ConnError::NotConnected(msg) => assert!(msg.contains("device.sock"), "{msg}"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(conn.state(), ConnectionState::Closed);
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn device_hangup_closes_connection() {
    let (endpoint, device) = spawn_device("hangup", drop);

    let conn = Connection::open(endpoint, fast_config()).unwrap();
    device.join().unwrap();
    wait_for_state(&conn, ConnectionState::Closed);

    assert!(!conn.is_connected());
    let err = conn.send(&RawFrame(vec![0xFF].into())).unwrap_err();
    assert!(matches!(err, ConnError::NotConnected(_)));
}

#[test]
fn shutdown_finishes_in_flight_frame() {
    let (endpoint, device) = spawn_device("shutdown", |mut stream| {
        let cmd = read_command(&mut stream, 0);
        assert_eq!(&cmd[..4], &[0xFF, 0xFD, 0x00, 0x02]);
        let _ = stream.read_to_end(&mut Vec::new());
    });

    let dispatcher = Dispatcher::connect(endpoint, fast_config()).unwrap();
    dispatcher.send_command(DID_CORE, 0x02).unwrap();
    // Let the write pipeline pick the frame up.
    thread::sleep(Duration::from_millis(50));
    dispatcher.connection().shutdown();

    assert!(dispatcher.connection().is_shutting_down());
    let err = dispatcher.send_command(DID_CORE, 0x01).unwrap_err();
    assert!(matches!(err, ConnError::NotConnected(_)));
    assert_eq!(dispatcher.next_sequence(), 1);

    wait_for_state(dispatcher.connection(), ConnectionState::Closed);
    device.join().unwrap();
}

#[test]
fn reconnect_after_close() {
    let path = make_sock_path("reconnect");
    let listener = UnixListener::bind(&path).unwrap();
    let device = thread::spawn(move || {
        for seq in 0..2u8 {
            let (mut stream, _) = listener.accept().unwrap();
            let cmd = read_command(&mut stream, 0);
            assert_eq!(cmd[4], seq);
            stream.write_all(&reply(0x00, seq, &[])).unwrap();
            let _ = stream.read_to_end(&mut Vec::new());
        }
    });

    let dispatcher = Dispatcher::connect(Endpoint::Unix(path.clone()), fast_config()).unwrap();
    dispatcher.send_command(DID_CORE, 0x01).unwrap();
    assert_eq!(dispatcher.read_response().unwrap().seq, 0);
    dispatcher.close();

    // The sequence survives the reconnect.
    dispatcher.connection().connect().unwrap();
    dispatcher.send_command(DID_CORE, 0x01).unwrap();
    assert_eq!(dispatcher.read_response().unwrap().seq, 1);
    dispatcher.close();

    device.join().unwrap();
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn shutdown_always_reaches_closed() {
    const SESSIONS: usize = 20;

    let path = make_sock_path("shutdown-loop");
    let listener = UnixListener::bind(&path).unwrap();
    let device = thread::spawn(move || {
        for _ in 0..SESSIONS {
            let (mut stream, _) = listener.accept().unwrap();
            let _ = stream.read_to_end(&mut Vec::new());
        }
    });

    for _ in 0..SESSIONS {
        let conn = Connection::open(Endpoint::Unix(path.clone()), fast_config()).unwrap();
        conn.shutdown();
        wait_for_state(&conn, ConnectionState::Closed);
        assert!(!conn.is_connected());
    }

    device.join().unwrap();
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn close_aborts_connect_retries() {
    let path = make_sock_path("abort");
    let config = ConnectionConfig {
        max_retries: 5,
        retry_delay: Duration::from_secs(30),
        ..ConnectionConfig::default()
    };
    let conn = Arc::new(Connection::with_endpoint(Endpoint::Unix(path.clone()), config));

    let connector = {
        let conn = Arc::clone(&conn);
        thread::spawn(move || conn.connect())
    };
    wait_for_state(&conn, ConnectionState::Connecting);
    thread::sleep(Duration::from_millis(50));

    let started = Instant::now();
    conn.close();
    let err = connector.join().unwrap().unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(matches!(err, ConnError::NotConnected(_)));
    assert_eq!(conn.state(), ConnectionState::Closed);
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn flush_waits_until_queue_is_written() {
    let (endpoint, device) = spawn_device("flush", |mut stream| {
        for seq in 0..3u8 {
            let cmd = read_command(&mut stream, 4);
            assert_eq!(cmd[4], seq);
        }
        let _ = stream.read_to_end(&mut Vec::new());
    });

    let dispatcher = Dispatcher::connect(endpoint, fast_config()).unwrap();
    let led = Command::named("set-rgb-led")
        .unwrap()
        .with_payload(vec![0x00, 0xFF, 0x00, 0x00]);
    for _ in 0..3 {
        dispatcher.send_command_with(&led).unwrap();
    }

    dispatcher.connection().flush(Duration::from_secs(5)).unwrap();
    assert_eq!(dispatcher.connection().pending_outbound(), 0);

    dispatcher.close();
    device.join().unwrap();
    assert!(dispatcher.connection().flush(Duration::from_millis(1)).is_ok());
}
