//! Common test utilities for integration tests.
//!
//! Provides `TestNamespace` for isolated network namespace testing
//! and helper macros for conditional test execution.

use mplsctl::{Error, Result, RouterConfig};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Once;
use std::sync::atomic::{AtomicU32, Ordering};

/// Global counter for unique namespace names.
static NAMESPACE_COUNTER: AtomicU32 = AtomicU32::new(0);

static TRACING: Once = Once::new();

/// Highest label the test namespaces accept (`net.mpls.platform_labels - 1`).
pub const PLATFORM_LABELS: u32 = 1024;

/// Generate a unique namespace name for this test.
fn unique_ns_name(prefix: &str) -> String {
    let id = NAMESPACE_COUNTER.fetch_add(1, Ordering::SeqCst);
    let pid = std::process::id();
    format!("mplsctl-test-{}-{}-{}", prefix, pid, id)
}

fn command_error(cmd: &str, err: impl std::fmt::Display) -> Error {
    Error::InvalidMessage(format!("{}: {}", cmd, err))
}

/// Route `RUST_LOG`-filtered tracing output through the test harness.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A test network namespace with MPLS enabled and automatic cleanup.
///
/// The namespace is deleted when the struct is dropped.
///
/// # Example
///
/// ```ignore
/// let ns = TestNamespace::new("mytest")?;
/// let router = MplsRouter::with_config(ns.config());
///
/// router.add_route_dev("lo", 100, 1).await?;
/// ```
pub struct TestNamespace {
    name: String,
}

impl TestNamespace {
    /// Create a new test namespace with a unique name.
    ///
    /// Sets `net.mpls.platform_labels` and brings up loopback.
    pub fn new(prefix: &str) -> Result<Self> {
        let name = unique_ns_name(prefix);

        let status = Command::new("ip")
            .args(["netns", "add", &name])
            .status()
            .map_err(|e| command_error("ip netns add", e))?;

        if !status.success() {
            return Err(Error::InvalidMessage(format!(
                "failed to create namespace: {}",
                name
            )));
        }

        let ns = Self { name };
        ns.exec(
            "sysctl",
            &[
                "-w",
                &format!("net.mpls.platform_labels={}", PLATFORM_LABELS),
            ],
        )?;
        ns.link_up("lo")?;
        Ok(ns)
    }

    /// Get the namespace name.
    #[allow(dead_code)]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the namespace file bound by `ip netns add`.
    pub fn path(&self) -> PathBuf {
        Path::new("/var/run/netns").join(&self.name)
    }

    /// Router configuration whose sockets open inside this namespace.
    pub fn config(&self) -> RouterConfig {
        RouterConfig::new().netns(self.path())
    }

    /// Run a command in the namespace and return its output.
    pub fn exec(&self, cmd: &str, args: &[&str]) -> Result<String> {
        let output = Command::new("ip")
            .args(["netns", "exec", &self.name, cmd])
            .args(args)
            .output()
            .map_err(|e| command_error(cmd, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::InvalidMessage(format!(
                "command failed: {} {:?}: {}",
                cmd, args, stderr
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Add a dummy interface with MPLS input enabled.
    pub fn add_dummy(&self, name: &str) -> Result<()> {
        self.exec("ip", &["link", "add", name, "type", "dummy"])?;
        self.exec(
            "sysctl",
            &["-w", &format!("net.mpls.conf.{}.input=1", name)],
        )?;
        Ok(())
    }

    /// Bring an interface up using ip command.
    pub fn link_up(&self, name: &str) -> Result<()> {
        self.exec("ip", &["link", "set", name, "up"])?;
        Ok(())
    }

    /// Add an IP address using ip command.
    pub fn add_addr(&self, dev: &str, addr: &str) -> Result<()> {
        self.exec("ip", &["addr", "add", addr, "dev", dev])?;
        Ok(())
    }

    /// Interface index as seen inside the namespace.
    pub fn ifindex(&self, dev: &str) -> Result<u32> {
        let out = self.exec("cat", &[&format!("/sys/class/net/{}/ifindex", dev)])?;
        out.trim()
            .parse()
            .map_err(|e| command_error("ifindex", e))
    }

    /// MPLS routing table of the namespace as printed by `ip -M route`.
    pub fn mpls_routes(&self) -> Result<String> {
        self.exec("ip", &["-M", "route", "show"])
    }

    /// IPv4 routes of the namespace.
    pub fn ipv4_routes(&self) -> Result<String> {
        self.exec("ip", &["-4", "route", "show"])
    }
}

impl Drop for TestNamespace {
    fn drop(&mut self) {
        let _ = Command::new("ip")
            .args(["netns", "del", &self.name])
            .status();
    }
}

/// Check if running as root.
pub fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions.
    unsafe { libc::geteuid() == 0 }
}

/// Load the MPLS modules and report whether the kernel supports them.
pub fn mpls_available() -> bool {
    for module in ["mpls_router", "mpls_iptunnel"] {
        let _ = Command::new("modprobe").arg(module).status();
    }
    Path::new("/proc/sys/net/mpls").exists()
}

/// Skip the test unless running as root on an MPLS-capable kernel.
///
/// Use this at the beginning of integration tests.
#[macro_export]
macro_rules! require_root {
    () => {
        crate::common::init_tracing();
        if !crate::common::is_root() {
            eprintln!("Skipping test: requires root");
            return Ok(());
        }
        if !crate::common::mpls_available() {
            eprintln!("Skipping test: kernel lacks MPLS support");
            return Ok(());
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_ns_name() {
        let name1 = unique_ns_name("test");
        let name2 = unique_ns_name("test");
        assert_ne!(name1, name2);
        assert!(name1.starts_with("mplsctl-test-test-"));
    }
}
