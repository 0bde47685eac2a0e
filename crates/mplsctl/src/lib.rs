//! Async MPLS route programming over rtnetlink.
//!
//! Installs MPLS forwarding state in the Linux kernel: label routes that
//! leave through an interface or towards a next hop, label swaps, and IPv4
//! host routes that push an MPLS label. Each operation sends a single
//! `RTM_NEWROUTE` request and waits for the kernel's acknowledgement.
//!
//! # Example
//!
//! ```ignore
//! use mplsctl::MplsRouter;
//!
//! #[tokio::main]
//! async fn main() -> mplsctl::Result<()> {
//!     let router = MplsRouter::new();
//!
//!     router.add_route_nexthop("10.0.0.1", 100, 1).await?;
//!     router.add_encap_gateway("192.168.1.5", 42, "10.0.0.2").await?;
//!
//!     Ok(())
//! }
//! ```

pub mod netlink;
pub mod util;

// Re-export common types at crate root for convenience
pub use netlink::{Error, ErrorKind, MplsRequest, MplsRouter, Result, RouterConfig};
