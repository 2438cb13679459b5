//! Serving many connections
//!
//! One OS thread per accepted connection. The blueprint is shared through an
//! `Arc`; each thread builds and owns its own connection state.

use std::sync::Arc;
use std::thread;

use crate::error::Result;
use crate::network::{Connection, Listener, ACCEPT_BACKOFF};
use super::{serve, ProtoInfo};

/// Accept connections from `listener` forever, serving each on its own thread
///
/// Accept failures the listener considers transient are logged and skipped.
/// A fatal one ends the loop with an error. Failures of individual
/// connections are logged and never affect the others.
pub fn serve_over_listener<L, T>(listener: &L, proto: Arc<ProtoInfo<T>>) -> Result<()>
where
    L: Listener,
    T: Default + 'static,
{
    loop {
        let stream = match listener.accept() {
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

        spawn_connection(stream, Arc::clone(&proto), ());
    }
}

/// Serve `stream` on a new thread; `guard` is dropped when the connection ends
pub(crate) fn spawn_connection<C, T, G>(stream: C, proto: Arc<ProtoInfo<T>>, guard: G)
where
    C: Connection,
    T: Default + 'static,
    G: Send + 'static,
{
    let peer = stream.peer_label();
    tracing::debug!("Received connection from {}", peer);

    let spawned = thread::Builder::new()
        .name("assuan-conn".to_string())
        .spawn(move || {
            let span = tracing::debug_span!("connection", %peer);
            let _enter = span.enter();

            match serve(stream, &proto) {
                Ok(()) => tracing::debug!("Connection closed"),
                Err(e) if e.is_disconnect() => tracing::debug!("Client disconnected: {}", e),
                Err(e) => tracing::warn!("Serve failed: {}", e),
            }
            drop(guard);
        });

    if let Err(e) = spawned {
        tracing::warn!("Failed to spawn connection thread: {}", e);
    }
}
