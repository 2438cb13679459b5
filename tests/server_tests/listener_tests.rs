//! Listener Tests
//!
//! These tests verify:
//! - `serve_over_listener` serves several sockets concurrently
//! - Transient accept errors are retried after a pause
//! - Each connection owns its own state
//! - `Server` honors its connection limit and shuts down on request

use std::cell::Cell;
use std::io::{self, ErrorKind};
use std::net::TcpStream;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use assuan::network::{Listener, MemoryStream, Server, ACCEPT_BACKOFF};
use assuan::{serve_over_listener, AssuanError, Config, ErrorCode, ProtoInfo, Session};

fn register_proto() -> Arc<ProtoInfo<Vec<String>>> {
    let proto = ProtoInfo::<Vec<String>>::builder("register ready")
        .handler("PUSH", |_, state, params| {
            state.push(params.to_string());
            Ok(())
        })
        .handler("LIST", |out, state, _| {
            out.write_data(state.join(",").as_bytes())?;
            Ok(())
        })
        .build();
    Arc::new(proto)
}

fn wait_for<F: Fn() -> bool>(condition: F) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        thread::sleep(Duration::from_millis(10));
    }
}

/// Listener whose accepts fail transiently a few times, then fatally
struct FailingListener {
    transient: u32,
    calls: Cell<u32>,
}

impl Listener for FailingListener {
    type Stream = MemoryStream;

    fn accept(&self) -> io::Result<MemoryStream> {
        let call = self.calls.get() + 1;
        self.calls.set(call);
        if call <= self.transient {
            Err(io::Error::new(ErrorKind::Other, "Too many open files"))
        } else {
            Err(io::Error::new(ErrorKind::InvalidInput, "listener closed"))
        }
    }
}

// =============================================================================
// serve_over_listener
// =============================================================================

#[test]
fn test_transient_accept_errors_back_off() {
    let listener = FailingListener {
        transient: 3,
        calls: Cell::new(0),
    };

    let started = Instant::now();
    let result = serve_over_listener(&listener, register_proto());

    assert!(matches!(result, Err(AssuanError::Io(_))));
    assert_eq!(listener.calls.get(), 4);
    assert!(started.elapsed() >= ACCEPT_BACKOFF * 3);
}

#[cfg(unix)]
#[test]
fn test_unix_listener_isolates_connections() {
    use std::os::unix::net::{UnixListener, UnixStream};

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("register.sock");
    let listener = UnixListener::bind(&path).unwrap();

    let proto = register_proto();
    thread::spawn(move || serve_over_listener(&listener, proto));

    let mut first = Session::connect(UnixStream::connect(&path).unwrap()).unwrap();
    let mut second = Session::connect(UnixStream::connect(&path).unwrap()).unwrap();
    assert_eq!(first.greeting(), "register ready");

    first.simple_command("PUSH", "a").unwrap();
    second.simple_command("PUSH", "x").unwrap();
    first.simple_command("PUSH", "b").unwrap();

    assert_eq!(first.simple_command("LIST", "").unwrap(), b"a,b");
    assert_eq!(second.simple_command("LIST", "").unwrap(), b"x");

    first.close().unwrap();

    // Closing one client leaves the other untouched
    second.simple_command("PUSH", "y").unwrap();
    assert_eq!(second.simple_command("LIST", "").unwrap(), b"x,y");
}

#[test]
fn test_tcp_listener_survives_dropped_clients() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let proto = register_proto();
    thread::spawn(move || serve_over_listener(&listener, proto));

    // A client that vanishes without a word
    drop(TcpStream::connect(addr).unwrap());

    let mut session = Session::connect(TcpStream::connect(addr).unwrap()).unwrap();
    session.simple_command("PUSH", "still here").unwrap();
    assert_eq!(session.simple_command("LIST", "").unwrap(), b"still here");
}

// =============================================================================
// Server
// =============================================================================

#[test]
fn test_server_greeting_and_shutdown() {
    let config = Config::builder().listen_addr("127.0.0.1:0").build();
    let server = Server::bind(config, register_proto()).unwrap();
    let addr = server.local_addr().unwrap();
    let shutdown = server.shutdown_handle().unwrap();

    let running = thread::spawn(move || server.run());

    let mut session = Session::connect(TcpStream::connect(addr).unwrap()).unwrap();
    assert_eq!(session.greeting(), "register ready");
    session.simple_command("NOP", "").unwrap();
    session.close().unwrap();

    shutdown.shutdown();
    assert!(running.join().unwrap().is_ok());
}

#[test]
fn test_server_refuses_over_limit() {
    let config = Config::builder()
        .listen_addr("127.0.0.1:0")
        .max_connections(1)
        .build();
    let server = Arc::new(Server::bind(config, register_proto()).unwrap());
    let addr = server.local_addr().unwrap();

    let runner = Arc::clone(&server);
    thread::spawn(move || runner.run());

    let first = Session::connect(TcpStream::connect(addr).unwrap()).unwrap();
    wait_for(|| server.active_connections() == 1);

    let refused = Session::connect(TcpStream::connect(addr).unwrap());
    match refused {
        Err(err) => {
            let peer = err.as_peer().expect("expected ERR greeting");
            assert_eq!(peer.code, ErrorCode::General);
            assert_eq!(peer.message, "too many connections");
        }
        Ok(_) => panic!("second connection should be refused"),
    }

    // Once the first client leaves there is room again
    first.close().unwrap();
    wait_for(|| server.active_connections() == 0);
    assert!(Session::connect(TcpStream::connect(addr).unwrap()).is_ok());
}

#[cfg(unix)]
#[test]
fn test_server_unix_socket_cleanup() {
    use std::os::unix::net::UnixStream;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("server.sock");

    let config = Config::builder().socket_path(&path).build();
    let server = Server::bind(config, register_proto()).unwrap();
    assert!(server.local_addr().is_none());
    let shutdown = server.shutdown_handle().unwrap();

    let running = thread::spawn(move || server.run());

    let mut session = Session::connect(UnixStream::connect(&path).unwrap()).unwrap();
    session.simple_command("PUSH", "z").unwrap();
    session.close().unwrap();

    shutdown.shutdown();
    assert!(running.join().unwrap().is_ok());

    // The server was dropped with its thread
    assert!(!path.exists());
}
