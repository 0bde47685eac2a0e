//! Route message structures (struct rtmsg and RTA_* attributes).

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::netlink::error::{Error, Result};

/// Route descriptor (struct rtmsg).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct RtMsg {
    /// Address family (AF_INET, AF_MPLS, ...).
    pub rtm_family: u8,
    /// Destination prefix length.
    pub rtm_dst_len: u8,
    /// Source prefix length.
    pub rtm_src_len: u8,
    /// Type of service.
    pub rtm_tos: u8,
    /// Routing table ID.
    pub rtm_table: u8,
    /// Routing protocol.
    pub rtm_protocol: u8,
    /// Distance to destination.
    pub rtm_scope: u8,
    /// Route type.
    pub rtm_type: u8,
    /// Route flags.
    pub rtm_flags: u32,
}

impl RtMsg {
    /// Size of this structure.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Create an all-zero descriptor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the address family (`AF_MPLS` or `AF_INET`).
    pub fn with_family(mut self, family: u8) -> Self {
        self.rtm_family = family;
        self
    }

    /// Set the destination prefix length in bits.
    pub fn with_dst_len(mut self, len: u8) -> Self {
        self.rtm_dst_len = len;
        self
    }

    /// Set the routing table ID.
    pub fn with_table(mut self, table: u8) -> Self {
        self.rtm_table = table;
        self
    }

    /// Set the route origin protocol.
    pub fn with_protocol(mut self, protocol: u8) -> Self {
        self.rtm_protocol = protocol;
        self
    }

    /// Set the route scope.
    pub fn with_scope(mut self, scope: RouteScope) -> Self {
        self.rtm_scope = scope as u8;
        self
    }

    /// Set the route type.
    pub fn with_type(mut self, rtype: RouteType) -> Self {
        self.rtm_type = rtype as u8;
        self
    }

    /// Convert to bytes.
    pub fn as_bytes(&self) -> &[u8] {
        <Self as IntoBytes>::as_bytes(self)
    }

    /// Parse from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::read_from_prefix(data)
            .map(|(r, _)| r)
            .map_err(|_| Error::Truncated {
                expected: Self::SIZE,
                actual: data.len(),
            })
    }
}

/// Route attributes (RTA_*).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum RtaAttr {
    Unspec = 0,
    Dst = 1,
    Src = 2,
    Iif = 3,
    Oif = 4,
    Gateway = 5,
    Priority = 6,
    Prefsrc = 7,
    Metrics = 8,
    Multipath = 9,
    Protoinfo = 10,
    Flow = 11,
    Cacheinfo = 12,
    Session = 13,
    MpAlgo = 14,
    Table = 15,
    Mark = 16,
    MfcStats = 17,
    Via = 18,
    Newdst = 19,
    Pref = 20,
    EncapType = 21,
    Encap = 22,
}

/// Route scope (RT_SCOPE_*).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RouteScope {
    Universe = 0,
    Site = 200,
    Link = 253,
    Host = 254,
    Nowhere = 255,
}

/// Route type (RTN_*).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RouteType {
    Unspec = 0,
    Unicast = 1,
    Local = 2,
    Broadcast = 3,
    Anycast = 4,
    Multicast = 5,
    Blackhole = 6,
    Unreachable = 7,
    Prohibit = 8,
}

/// Routing table IDs (RT_TABLE_*).
pub mod rt_table {
    pub const UNSPEC: u8 = 0;
    pub const DEFAULT: u8 = 253;
    pub const MAIN: u8 = 254;
    pub const LOCAL: u8 = 255;
}

/// Route origin protocols (RTPROT_*).
pub mod rt_proto {
    pub const UNSPEC: u8 = 0;
    pub const REDIRECT: u8 = 1;
    pub const KERNEL: u8 = 2;
    pub const BOOT: u8 = 3;
    pub const STATIC: u8 = 4;
}
