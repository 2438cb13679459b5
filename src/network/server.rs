//! Socket Server
//!
//! Binds the socket named by a [`Config`], accepts connections and hands
//! each to its own thread running the dispatcher.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

#[cfg(unix)]
use std::os::unix::net::{UnixListener, UnixStream};

use crate::config::Config;
use crate::error::{AssuanError, Result};
use crate::protocol::{ErrorCode, ErrorSource, Pipe, WireError};
use crate::server::{spawn_connection, ProtoInfo};
use super::connection::timeout_from_ms;
use super::{Connection, Listener, ACCEPT_BACKOFF};

/// The bound socket
enum Bound {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(UnixListener, PathBuf),
}

/// Where to connect to unblock a pending accept
#[derive(Debug, Clone)]
enum WakeTarget {
    Tcp(SocketAddr),
    #[cfg(unix)]
    Unix(PathBuf),
}

/// Lets another thread stop a running [`Server`]
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    wake: WakeTarget,
}

impl ShutdownHandle {
    /// Signal the server to stop accepting; live connections run to completion
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);

        // The accept loop only checks the flag after accept returns
        let woke = match &self.wake {
            WakeTarget::Tcp(addr) => TcpStream::connect(addr).map(drop),
            #[cfg(unix)]
            WakeTarget::Unix(path) => UnixStream::connect(path).map(drop),
        };
        if let Err(e) = woke {
            tracing::debug!("Could not wake accept loop: {}", e);
        }
    }
}

/// Decrements the live connection count when the connection thread ends
struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Socket server for one protocol
pub struct Server<T> {
    config: Config,
    proto: Arc<ProtoInfo<T>>,
    listener: Bound,
    shutdown: Arc<AtomicBool>,
    active: Arc<AtomicUsize>,
}

impl<T: Default + 'static> Server<T> {
    /// Bind the socket described by `config`
    pub fn bind(config: Config, proto: Arc<ProtoInfo<T>>) -> Result<Self> {
        let listener = match &config.socket_path {
            #[cfg(unix)]
            Some(path) => {
                remove_stale_socket(path)?;
                let listener = UnixListener::bind(path)?;
                tracing::info!("Listening on {}", path.display());
                Bound::Unix(listener, path.clone())
            }
            #[cfg(not(unix))]
            Some(_) => {
                return Err(AssuanError::Config(
                    "unix sockets are not supported on this platform".to_string(),
                ))
            }
            None => {
                let listener = TcpListener::bind(&config.listen_addr)?;
                tracing::info!("Listening on {}", listener.local_addr()?);
                Bound::Tcp(listener)
            }
        };

        Ok(Self {
            config,
            proto,
            listener,
            shutdown: Arc::new(AtomicBool::new(false)),
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Bound TCP address, if serving over TCP
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.listener {
            Bound::Tcp(listener) => listener.local_addr().ok(),
            #[cfg(unix)]
            Bound::Unix(..) => None,
        }
    }

    pub fn shutdown_handle(&self) -> Result<ShutdownHandle> {
        let wake = match &self.listener {
            Bound::Tcp(listener) => WakeTarget::Tcp(listener.local_addr()?),
            #[cfg(unix)]
            Bound::Unix(_, path) => WakeTarget::Unix(path.clone()),
        };
        Ok(ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
            wake,
        })
    }

    /// Number of connections currently being served
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Accept and serve connections until shut down (blocking)
    pub fn run(&self) -> Result<()> {
        match &self.listener {
            Bound::Tcp(listener) => self.accept_loop(listener),
            #[cfg(unix)]
            Bound::Unix(listener, _) => self.accept_loop(listener),
        }
    }

    fn accept_loop<L: Listener>(&self, listener: &L) -> Result<()> {
        let read_timeout = timeout_from_ms(self.config.read_timeout_ms);
        let write_timeout = timeout_from_ms(self.config.write_timeout_ms);

        loop {
            let accepted = listener.accept();
            if self.shutdown.load(Ordering::SeqCst) {
                tracing::info!("Shutdown requested, no longer accepting");
                return Ok(());
            }

            let stream = match accepted {
                Ok(stream) => stream,
                Err(e) if listener.is_fatal(&e) => {
                    tracing::error!("Listener failed: {}", e);
                    return Err(e.into());
                }
                Err(e) => {
                    // Running out of descriptors would otherwise spin here
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(ACCEPT_BACKOFF);
                    continue;
                }
            };

            if self.active.load(Ordering::SeqCst) >= self.config.max_connections {
                tracing::warn!(
                    "Connection limit of {} reached, refusing {}",
                    self.config.max_connections,
                    stream.peer_label()
                );
                refuse(stream);
                continue;
            }

            if let Err(e) = stream.set_timeouts(read_timeout, write_timeout) {
                tracing::warn!("Failed to configure {}: {}", stream.peer_label(), e);
                continue;
            }

            self.active.fetch_add(1, Ordering::SeqCst);
            let guard = ActiveGuard(Arc::clone(&self.active));
            spawn_connection(stream, Arc::clone(&self.proto), guard);
        }
    }
}

impl<T> Drop for Server<T> {
    fn drop(&mut self) {
        match &self.listener {
            #[cfg(unix)]
            Bound::Unix(_, path) => {
                let _ = std::fs::remove_file(path);
            }
            _ => {}
        }
    }
}

/// Tell a client over the limit why it is being dropped
fn refuse<C: Connection>(stream: C) {
    let err = WireError::new(
        ErrorSource::Assuan,
        ErrorCode::General,
        "assuan",
        "too many connections",
    );
    if let Err(e) = Pipe::new(stream).write_error(&err) {
        tracing::debug!("Could not notify refused client: {}", e);
    }
}

/// Remove a socket file left behind by a previous run
#[cfg(unix)]
fn remove_stale_socket(path: &std::path::Path) -> Result<()> {
    use std::os::unix::fs::FileTypeExt;

    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_socket() => {
            tracing::debug!("Removing stale socket {}", path.display());
            std::fs::remove_file(path)?;
            Ok(())
        }
        Ok(_) => Err(AssuanError::Config(format!(
            "{} exists and is not a socket",
            path.display()
        ))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
