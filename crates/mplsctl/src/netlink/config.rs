//! Request and transport settings shared by the route operations.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use mplsctl::netlink::{MplsRouter, RouterConfig};
//!
//! let router = MplsRouter::with_config(
//!     RouterConfig::new()
//!         .recv_timeout(Duration::from_secs(2))
//!         .netns("/var/run/netns/lab"),
//! );
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::builder::REQUEST_CAPACITY;
use super::message::{NLM_F_ACK, NLM_F_CREATE, NLM_F_EXCL, NLM_F_REPLACE, NLM_F_REQUEST};
use super::types::route::{rt_proto, rt_table};

/// Settings applied to every request an [`MplsRouter`](super::MplsRouter) sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    /// Routing table ID.
    pub table: u8,
    /// Route origin protocol.
    pub protocol: u8,
    /// Fail with EEXIST when the route exists (otherwise replace it).
    pub exclusive: bool,
    /// Upper bound on the wait for the kernel's answer.
    ///
    /// `None` waits indefinitely: a kernel that never answers leaves the
    /// operation pending.
    pub recv_timeout: Option<Duration>,
    /// Request buffer capacity in bytes.
    pub capacity: usize,
    /// Network namespace file to open the socket in.
    ///
    /// Interface names are resolved inside this namespace too.
    pub netns: Option<PathBuf>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            table: rt_table::MAIN,
            protocol: rt_proto::BOOT,
            exclusive: true,
            recv_timeout: None,
            capacity: REQUEST_CAPACITY,
            netns: None,
        }
    }
}

impl RouterConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the routing table ID.
    pub fn table(mut self, table: u8) -> Self {
        self.table = table;
        self
    }

    /// Set the route origin protocol (`rt_proto::*`).
    pub fn protocol(mut self, protocol: u8) -> Self {
        self.protocol = protocol;
        self
    }

    /// Choose between create-only (`true`) and create-or-replace (`false`).
    pub fn exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = exclusive;
        self
    }

    /// Fail with `Error::Timeout` if no answer arrives within `timeout`.
    pub fn recv_timeout(mut self, timeout: Duration) -> Self {
        self.recv_timeout = Some(timeout);
        self
    }

    /// Set the request buffer capacity in bytes.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Open the socket in the namespace at `path` and resolve interface names inside it.
    pub fn netns(mut self, path: impl AsRef<Path>) -> Self {
        self.netns = Some(path.as_ref().to_path_buf());
        self
    }

    /// Netlink flags for a route creation request.
    pub fn request_flags(&self) -> u16 {
        let mode = if self.exclusive {
            NLM_F_EXCL
        } else {
            NLM_F_REPLACE
        };
        NLM_F_REQUEST | NLM_F_ACK | NLM_F_CREATE | mode
    }
}
