//! Low-level async NETLINK_ROUTE socket.

use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

use bytes::BytesMut;
use netlink_sys::{Socket, SocketAddr, protocols};
use tokio::io::Interest;
use tokio::io::unix::AsyncFd;

use super::error::{Error, Result};
use super::namespace;

/// Capacity of the buffer one response datagram is received into.
pub const RESPONSE_BUF_SIZE: usize = 4096;

/// Async netlink socket bound to the routing subsystem.
///
/// The descriptor is closed when the socket is dropped.
pub struct NetlinkSocket {
    /// The underlying async file descriptor.
    fd: AsyncFd<Socket>,
    /// Sequence number counter.
    seq: AtomicU32,
    /// Local port ID (assigned by kernel).
    pid: u32,
}

impl NetlinkSocket {
    /// Create a new routing socket in the current network namespace.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new() -> Result<Self> {
        Self::create_socket()
    }

    /// Create a routing socket inside the network namespace at `ns_path`
    /// (e.g. `/var/run/netns/<name>` or `/proc/<pid>/ns/net`).
    ///
    /// The calling thread is switched into the namespace for the duration
    /// of socket creation and then switched back. The socket keeps
    /// operating in the target namespace afterwards.
    pub fn new_in_namespace_path<P: AsRef<Path>>(ns_path: P) -> Result<Self> {
        let _guard = namespace::enter_path(ns_path)?;
        Self::create_socket()
    }

    fn create_socket() -> Result<Self> {
        let mut socket = Socket::new(protocols::NETLINK_ROUTE).map_err(Error::Socket)?;
        socket.set_non_blocking(true).map_err(Error::Socket)?;

        // Bind to get a port ID
        let mut addr = SocketAddr::new(0, 0);
        socket.bind(&addr).map_err(Error::Bind)?;
        socket.get_address(&mut addr).map_err(Error::Bind)?;
        let pid = addr.port_number();

        // Extended ACK only enriches error reports
        socket.set_ext_ack(true).ok();

        let fd = AsyncFd::new(socket).map_err(Error::Socket)?;

        Ok(Self {
            fd,
            seq: AtomicU32::new(1),
            pid,
        })
    }

    /// Get the next sequence number.
    pub fn next_seq(&self) -> u32 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Get the local port ID.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Send one request datagram to the kernel.
    pub async fn send(&self, msg: &[u8]) -> Result<()> {
        loop {
            let mut guard = self
                .fd
                .ready(Interest::WRITABLE)
                .await
                .map_err(Error::Transport)?;

            match guard.try_io(|inner| inner.get_ref().send(msg, 0)) {
                Ok(result) => {
                    let sent = result.map_err(Error::Transport)?;
                    if sent != msg.len() {
                        return Err(Error::Transport(io::Error::new(
                            io::ErrorKind::WriteZero,
                            format!("short send: {} of {} bytes", sent, msg.len()),
                        )));
                    }
                    return Ok(());
                }
                Err(_would_block) => continue,
            }
        }
    }

    /// Receive one datagram into a [`RESPONSE_BUF_SIZE`] buffer.
    pub async fn recv_msg(&self) -> Result<Vec<u8>> {
        let mut buf = BytesMut::with_capacity(RESPONSE_BUF_SIZE);

        loop {
            let mut guard = self
                .fd
                .ready(Interest::READABLE)
                .await
                .map_err(Error::Transport)?;

            match guard.try_io(|inner| inner.get_ref().recv(&mut buf, 0)) {
                Ok(result) => {
                    result.map_err(Error::Transport)?;
                    // recv advanced buf past the received bytes
                    return Ok(buf.to_vec());
                }
                Err(_would_block) => continue,
            }
        }
    }
}
