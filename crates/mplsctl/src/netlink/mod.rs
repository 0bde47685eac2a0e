//! Netlink plumbing for MPLS route programming.
//!
//! # Quick Start
//!
//! ```ignore
//! use mplsctl::netlink::MplsRouter;
//!
//! let router = MplsRouter::new();
//! router.add_route_dev("eth0", 100, 1).await?;
//! router.add_swap_nexthop("10.0.0.1", 101, 201, 1).await?;
//! router.add_encap_dev("eth0", "192.168.1.5", 42).await?;
//! ```
//!
//! # Kernel errors
//!
//! ```ignore
//! match router.add_route_dev("eth0", 100, 1).await {
//!     Err(e) if e.is_already_exists() => println!("route already present"),
//!     Err(e) => return Err(e),
//!     Ok(()) => {}
//! }
//! ```

pub mod attr;
pub mod builder;
mod channel;
pub mod config;
mod error;
pub mod interface_ref;
pub mod message;
pub mod mpls;
pub mod namespace;
mod socket;
pub mod types;

pub use attr::{AttrIter, NlAttr};
pub use builder::MessageBuilder;
pub use channel::{Channel, decode_response};
pub use config::RouterConfig;
pub use error::{Error, ErrorKind, Result};
pub use interface_ref::{InterfaceRef, resolve_interface_index, resolve_interface_index_in};
pub use message::{MessageIter, NLMSG_HDRLEN, NlMsgHdr, NlMsgType};
pub use mpls::{Destination, Egress, MplsLabel, MplsRequest, MplsRouter};
pub use socket::NetlinkSocket;
pub use types::mpls::{encode_encap_header, encode_plain};
