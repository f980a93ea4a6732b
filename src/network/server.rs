//! TCP Server
//!
//! Accepts connections and dispatches to worker threads.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver};

use crate::config::Config;
use crate::error::{Result, RosterError};
use crate::handler::Handler;

use super::Connection;

/// How long the acceptor sleeps when no connection is pending
const ACCEPT_POLL: Duration = Duration::from_millis(20);

/// Queued connections per worker before the acceptor blocks
const BACKLOG_PER_WORKER: usize = 4;

/// Flag that stops a running [`Server`]
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle(Arc<AtomicBool>);

impl ShutdownHandle {
    /// Ask the server to stop accepting and wind down
    pub fn shutdown(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// TCP server for RosterDB
pub struct Server {
    config: Config,
    handler: Arc<Handler>,
    listener: TcpListener,
    shutdown: ShutdownHandle,
}

impl Server {
    /// Bind the listen address from `config`
    pub fn bind(config: Config, handler: Arc<Handler>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            RosterError::Network(format!("cannot bind {}: {}", config.listen_addr, e))
        })?;

        Ok(Self {
            config,
            handler,
            listener,
            shutdown: ShutdownHandle::default(),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle for stopping the server from another thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.shutdown();
    }

    /// Start the server (blocking until shutdown)
    ///
    /// Workers finish the connection they are serving before exiting.
    pub fn run(self) -> Result<()> {
        let worker_count = self.config.max_connections.max(1);
        self.listener.set_nonblocking(true)?;

        let (sender, receiver) = channel::bounded::<TcpStream>(worker_count * BACKLOG_PER_WORKER);

        let mut workers = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            workers.push(self.spawn_worker(index, receiver.clone())?);
        }
        drop(receiver);

        tracing::info!(
            "Listening on {} with {} workers",
            self.local_addr()?,
            worker_count
        );

        while !self.shutdown.is_shutdown() {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    if let Err(e) = stream.set_nonblocking(false) {
                        tracing::warn!("Dropping connection from {}: {}", peer, e);
                        continue;
                    }
                    if sender.send(stream).is_err() {
                        // Every worker has exited
                        break;
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(ACCEPT_POLL);
                }
            }
        }

        tracing::info!("Shutting down, waiting for workers");
        drop(sender);
        for worker in workers {
            if worker.join().is_err() {
                tracing::error!("Connection worker panicked");
            }
        }
        Ok(())
    }

    fn spawn_worker(&self, index: usize, connections: Receiver<TcpStream>) -> Result<JoinHandle<()>> {
        let handler = Arc::clone(&self.handler);
        let read_ms = self.config.read_timeout_ms;
        let write_ms = self.config.write_timeout_ms;

        let handle = thread::Builder::new()
            .name(format!("rosterdb-worker-{}", index))
            .spawn(move || {
                for stream in connections.iter() {
                    let mut connection = match Connection::new(stream, Arc::clone(&handler)) {
                        Ok(c) => c,
                        Err(e) => {
                            tracing::warn!("Cannot set up connection: {}", e);
                            continue;
                        }
                    };
                    if let Err(e) = connection.set_timeouts(read_ms, write_ms) {
                        tracing::warn!("Cannot set timeouts for {}: {}", connection.peer_addr(), e);
                        continue;
                    }
                    if let Err(e) = connection.handle() {
                        tracing::debug!("Connection {} closed with error: {}", connection.peer_addr(), e);
                    }
                }
            })?;
        Ok(handle)
    }
}
