//! Temporarily switching the calling thread into a network namespace.
//!
//! Used for the two things that must happen inside the target namespace
//! when [`RouterConfig::netns`](super::RouterConfig::netns) is set: creating
//! the routing socket and resolving interface names.
//!
//! # Example
//!
//! ```ignore
//! use mplsctl::netlink::namespace;
//!
//! let guard = namespace::enter_path("/var/run/netns/lab")?;
//! // ... work in the namespace ...
//! guard.restore()?;
//! ```

use std::fs::File;
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::Path;

use tracing::warn;

use super::error::{Error, Result};

/// Enter the network namespace bound at `path`.
///
/// Only the calling thread switches. The returned guard switches it back,
/// so nothing may `.await` while the guard is alive.
pub fn enter_path<P: AsRef<Path>>(path: P) -> Result<NamespaceGuard> {
    let path = path.as_ref();
    let namespace_err = |source: io::Error| Error::Namespace {
        path: path.display().to_string(),
        source,
    };

    // Save the current namespace so we can restore it
    let original = File::open("/proc/self/ns/net").map_err(namespace_err)?;
    let target = File::open(path).map_err(namespace_err)?;

    // SAFETY: setns only reads the descriptor, which stays open for the call.
    let ret = unsafe { libc::setns(target.as_raw_fd(), libc::CLONE_NEWNET) };
    if ret < 0 {
        return Err(namespace_err(io::Error::last_os_error()));
    }

    Ok(NamespaceGuard {
        original,
        path: path.display().to_string(),
    })
}

/// A guard that restores the original namespace when dropped.
#[derive(Debug)]
pub struct NamespaceGuard {
    original: File,
    path: String,
}

impl NamespaceGuard {
    /// Restore the original namespace explicitly.
    ///
    /// This is called automatically on drop, but calling it explicitly
    /// allows you to handle errors.
    pub fn restore(self) -> Result<()> {
        self.do_restore()
    }

    fn do_restore(&self) -> Result<()> {
        // SAFETY: original was opened from /proc/self/ns/net and is still open.
        let ret = unsafe { libc::setns(self.original.as_raw_fd(), libc::CLONE_NEWNET) };
        if ret < 0 {
            return Err(Error::Namespace {
                path: self.path.clone(),
                source: io::Error::last_os_error(),
            });
        }
        Ok(())
    }
}

impl Drop for NamespaceGuard {
    fn drop(&mut self) {
        if let Err(e) = self.do_restore() {
            warn!(error = %e, "failed to restore original network namespace");
        }
    }
}
