//! MPLS route requests and the route operations built on them.
//!
//! Every operation is one linear pipeline: parse literals, resolve the
//! output interface, build the `RTM_NEWROUTE` request, then open a channel,
//! send, await the single answer and drop the channel. Nothing survives
//! between operations.
//!
//! # Prerequisites
//!
//! ```bash
//! sudo modprobe mpls_router
//! sudo modprobe mpls_iptunnel
//! sudo sysctl -w net.mpls.platform_labels=1048575
//! sudo sysctl -w net.mpls.conf.eth0.input=1
//! ```
//!
//! # Example
//!
//! ```ignore
//! use mplsctl::netlink::MplsRouter;
//!
//! let router = MplsRouter::new();
//!
//! // Label 100 arriving as bottom of stack leaves through eth0
//! router.add_route_dev("eth0", 100, 1).await?;
//!
//! // Transit LSR: swap 100 for 200 towards 10.0.0.1
//! router.add_swap_nexthop("10.0.0.1", 100, 200, 1).await?;
//!
//! // Push label 42 onto traffic for 192.168.1.5 via gateway 10.0.0.2
//! router.add_encap_gateway("192.168.1.5", 42, "10.0.0.2").await?;
//! ```
//!
//! Requests can also be built without a socket for inspection:
//!
//! ```ignore
//! use mplsctl::netlink::{InterfaceRef, MplsRequest, RouterConfig};
//!
//! let bytes = MplsRequest::route_dev(100, 1, InterfaceRef::index(2))
//!     .to_bytes(&RouterConfig::default())?;
//! ```

use std::fmt;
use std::net::Ipv4Addr;

use tracing::{debug, warn};

use super::attr::AttrIter;
use super::builder::MessageBuilder;
use super::channel::Channel;
use super::config::RouterConfig;
use super::error::Result;
use super::interface_ref::{InterfaceRef, resolve_interface_index_in};
use super::message::{NLMSG_HDRLEN, NlMsgType};
use super::types::mpls::{
    AF_MPLS, MPLS_LABEL_PREFIX_LEN, RtVia, encode_encap_header, encode_plain, lwtunnel_encap,
    mpls_label,
};
use super::types::route::{RouteScope, RouteType, RtMsg, RtaAttr};
use crate::util::addr::parse_ipv4;

/// IPv4 address family.
const AF_INET: u8 = libc::AF_INET as u8;

/// Prefix length of an encapsulated IPv4 destination (host route).
const IPV4_HOST_PREFIX_LEN: u8 = 32;

// ============================================================================
// MplsLabel
// ============================================================================

/// An MPLS label (20-bit value, 0-1048575).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MplsLabel(u32);

impl MplsLabel {
    /// Create a new MPLS label.
    ///
    /// Returns `None` if the label is out of range (> 1048575).
    pub fn new(label: u32) -> Option<Self> {
        if label <= mpls_label::MAX {
            Some(Self(label))
        } else {
            None
        }
    }

    /// IPv4 Explicit NULL label (0).
    pub const EXPLICIT_NULL_V4: Self = Self(mpls_label::IPV4_EXPLICIT_NULL);

    /// Router Alert label (1).
    pub const ROUTER_ALERT: Self = Self(mpls_label::ROUTER_ALERT);

    /// IPv6 Explicit NULL label (2).
    pub const EXPLICIT_NULL_V6: Self = Self(mpls_label::IPV6_EXPLICIT_NULL);

    /// Implicit NULL label (3).
    ///
    /// Signalled for penultimate hop popping; never seen on the wire.
    pub const IMPLICIT_NULL: Self = Self(mpls_label::IMPLICIT_NULL);

    /// Check if this is a reserved label (0-15).
    pub fn is_reserved(&self) -> bool {
        self.0 <= mpls_label::MAX_RESERVED
    }

    /// Get the raw label value.
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl From<MplsLabel> for u32 {
    fn from(val: MplsLabel) -> Self {
        val.0
    }
}

impl fmt::Display for MplsLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// MplsRequest
// ============================================================================

/// What the route matches on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Incoming label on an `AF_MPLS` route, optionally swapped on the way out.
    ///
    /// `bos` applies to the incoming label and to the swapped-in label alike.
    Label {
        label: u32,
        bos: u8,
        swap_to: Option<u32>,
    },
    /// IPv4 host route that pushes `label` as the bottom of stack.
    Encap { dst: Ipv4Addr, label: u32 },
}

/// Where matching packets leave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Egress {
    /// Output interface (`RTA_OIF`).
    Dev(InterfaceRef),
    /// Next hop (`RTA_VIA` for label routes, `RTA_GATEWAY` for encapsulation).
    Via(Ipv4Addr),
}

/// Egress with the interface already resolved.
#[derive(Debug, Clone, Copy)]
enum Hop {
    Oif(u32),
    Addr(Ipv4Addr),
}

/// A single `RTM_NEWROUTE` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MplsRequest {
    dst: Destination,
    egress: Egress,
}

impl MplsRequest {
    /// Create a request from its parts.
    pub fn new(dst: Destination, egress: Egress) -> Self {
        Self { dst, egress }
    }

    /// Label route leaving through an interface.
    pub fn route_dev(label: u32, bos: u8, dev: impl Into<InterfaceRef>) -> Self {
        Self::new(
            Destination::Label {
                label,
                bos,
                swap_to: None,
            },
            Egress::Dev(dev.into()),
        )
    }

    /// Label route towards a next hop.
    pub fn route_via(label: u32, bos: u8, via: Ipv4Addr) -> Self {
        Self::new(
            Destination::Label {
                label,
                bos,
                swap_to: None,
            },
            Egress::Via(via),
        )
    }

    /// Swap `label` for `new_label` and leave through an interface.
    pub fn swap_dev(label: u32, new_label: u32, bos: u8, dev: impl Into<InterfaceRef>) -> Self {
        Self::new(
            Destination::Label {
                label,
                bos,
                swap_to: Some(new_label),
            },
            Egress::Dev(dev.into()),
        )
    }

    /// Swap `label` for `new_label` towards a next hop.
    pub fn swap_via(label: u32, new_label: u32, bos: u8, via: Ipv4Addr) -> Self {
        Self::new(
            Destination::Label {
                label,
                bos,
                swap_to: Some(new_label),
            },
            Egress::Via(via),
        )
    }

    /// Push `label` onto traffic for `dst` and send it out of an interface.
    pub fn encap_dev(dst: Ipv4Addr, label: u32, dev: impl Into<InterfaceRef>) -> Self {
        Self::new(Destination::Encap { dst, label }, Egress::Dev(dev.into()))
    }

    /// Push `label` onto traffic for `dst` and hand it to `gateway`.
    pub fn encap_via(dst: Ipv4Addr, label: u32, gateway: Ipv4Addr) -> Self {
        Self::new(Destination::Encap { dst, label }, Egress::Via(gateway))
    }

    /// What the route matches: an incoming label or an IPv4 host.
    pub fn destination(&self) -> &Destination {
        &self.dst
    }

    /// Where matching traffic leaves: a device or a next-hop address.
    pub fn egress(&self) -> &Egress {
        &self.egress
    }

    /// Build the request without touching a socket.
    ///
    /// Resolves the output interface first, so a bad name fails here. With
    /// `config.netns` set, names are looked up inside that namespace.
    /// Sequence number and port ID stay zero until the request is sent.
    pub fn build(&self, config: &RouterConfig) -> Result<MessageBuilder> {
        let hop = match &self.egress {
            Egress::Dev(iface) => {
                Hop::Oif(resolve_interface_index_in(iface, config.netns.as_deref())?)
            }
            Egress::Via(addr) => Hop::Addr(*addr),
        };

        let mut msg = MessageBuilder::new(NlMsgType::RTM_NEWROUTE, config.request_flags())
            .with_capacity(config.capacity);
        self.write_to(&mut msg, config, hop)?;

        debug!(
            msg_type = NlMsgType::RTM_NEWROUTE,
            flags = format_args!("{:#x}", config.request_flags()),
            len = msg.len(),
            attrs = AttrIter::new(&msg.as_bytes()[NLMSG_HDRLEN + RtMsg::SIZE..]).count(),
            "built route request"
        );
        Ok(msg)
    }

    /// Build the request and return its bytes.
    pub fn to_bytes(&self, config: &RouterConfig) -> Result<Vec<u8>> {
        self.build(config).map(MessageBuilder::finish)
    }

    fn write_to(&self, msg: &mut MessageBuilder, config: &RouterConfig, hop: Hop) -> Result<()> {
        let rtmsg = RtMsg::new()
            .with_table(config.table)
            .with_protocol(config.protocol)
            .with_type(RouteType::Unicast);

        match &self.dst {
            Destination::Label {
                label,
                bos,
                swap_to,
            } => {
                if MplsLabel::new(*label).is_some_and(|l| l.is_reserved()) {
                    warn!(label, "incoming label is reserved, the kernel may reject it");
                }

                msg.append(
                    &rtmsg
                        .with_family(AF_MPLS)
                        .with_dst_len(MPLS_LABEL_PREFIX_LEN)
                        .with_scope(RouteScope::Universe),
                )?;
                msg.append_attr(RtaAttr::Dst as u16, encode_plain(*label, *bos)?.as_bytes())?;
                if let Some(new_label) = swap_to {
                    let entry = encode_plain(*new_label, *bos)?;
                    msg.append_attr(RtaAttr::Newdst as u16, entry.as_bytes())?;
                }
                match hop {
                    Hop::Oif(idx) => msg.append_attr_u32(RtaAttr::Oif as u16, idx)?,
                    Hop::Addr(addr) => {
                        msg.append_attr(RtaAttr::Via as u16, &RtVia::ipv4_payload(addr))?
                    }
                }
            }
            Destination::Encap { dst, label } => {
                // Device egress is on-link, a gateway needs the universe scope
                let scope = match hop {
                    Hop::Oif(_) => RouteScope::Link,
                    Hop::Addr(_) => RouteScope::Universe,
                };
                msg.append(
                    &rtmsg
                        .with_family(AF_INET)
                        .with_dst_len(IPV4_HOST_PREFIX_LEN)
                        .with_scope(scope),
                )?;
                msg.append_attr(RtaAttr::Dst as u16, &dst.octets())?;

                let tunnel = encode_encap_header(*label, 1, 0)?;
                msg.append_nested_attr(RtaAttr::Encap as u16, tunnel.as_bytes())?;
                msg.append_attr_u16(RtaAttr::EncapType as u16, lwtunnel_encap::MPLS)?;
                match hop {
                    Hop::Oif(idx) => msg.append_attr_u32(RtaAttr::Oif as u16, idx)?,
                    Hop::Addr(gw) => msg.append_attr(RtaAttr::Gateway as u16, &gw.octets())?,
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// MplsRouter
// ============================================================================

/// Entry point for the route operations.
///
/// Holds configuration only. Each call opens its own socket, so a router
/// can be shared between tasks freely.
#[derive(Debug, Clone, Default)]
pub struct MplsRouter {
    config: RouterConfig,
}

impl MplsRouter {
    /// Create a router with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a router with a custom configuration.
    pub fn with_config(config: RouterConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Build `request`, send it and wait for the kernel's verdict.
    ///
    /// Build errors return before any socket is opened. The channel is
    /// dropped on every path out of this function.
    pub async fn execute(&self, request: &MplsRequest) -> Result<()> {
        let msg = request.build(&self.config)?;
        let channel = Channel::open(&self.config)?;
        channel.send_and_await(msg).await
    }

    /// Route incoming `label` out of interface `dev`.
    pub async fn add_route_dev(&self, dev: &str, label: u32, bos: u8) -> Result<()> {
        self.execute(&MplsRequest::route_dev(label, bos, dev)).await
    }

    /// Route incoming `label` to the IPv4 next hop `next_hop`.
    pub async fn add_route_nexthop(&self, next_hop: &str, label: u32, bos: u8) -> Result<()> {
        let via = parse_ipv4(next_hop)?;
        self.execute(&MplsRequest::route_via(label, bos, via)).await
    }

    /// Swap `label` for `new_label` and send out of interface `dev`.
    pub async fn add_swap_dev(&self, dev: &str, label: u32, new_label: u32, bos: u8) -> Result<()> {
        self.execute(&MplsRequest::swap_dev(label, new_label, bos, dev))
            .await
    }

    /// Swap `label` for `new_label` and send to `next_hop`.
    pub async fn add_swap_nexthop(
        &self,
        next_hop: &str,
        label: u32,
        new_label: u32,
        bos: u8,
    ) -> Result<()> {
        let via = parse_ipv4(next_hop)?;
        self.execute(&MplsRequest::swap_via(label, new_label, bos, via))
            .await
    }

    /// Push `label` onto traffic for host `dst` and send it out of `dev`.
    pub async fn add_encap_dev(&self, dev: &str, dst: &str, label: u32) -> Result<()> {
        let dst = parse_ipv4(dst)?;
        self.execute(&MplsRequest::encap_dev(dst, label, dev)).await
    }

    /// Push `label` onto traffic for host `dst` and hand it to `gateway`.
    pub async fn add_encap_gateway(&self, dst: &str, label: u32, gateway: &str) -> Result<()> {
        let dst = parse_ipv4(dst)?;
        let gateway = parse_ipv4(gateway)?;
        self.execute(&MplsRequest::encap_via(dst, label, gateway))
            .await
    }
}
