//! MPLS structures and label codec for netlink.
//!
//! A label is carried in one of two encodings depending on where it goes:
//!
//! - [`encode_plain`] produces a bare `struct mpls_label` for `RTA_DST` and
//!   `RTA_NEWDST` on `AF_MPLS` routes.
//! - [`encode_encap_header`] produces an `MPLS_IPTUNNEL_DST` record (attribute
//!   header plus label entry) for the nested `RTA_ENCAP` block of an IP route.
//!
//! Both refuse out-of-range input instead of masking it.

use std::net::Ipv4Addr;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::netlink::attr::NlAttr;
use crate::netlink::error::{Error, Result};

/// MPLS address family (AF_MPLS).
pub const AF_MPLS: u8 = libc::AF_MPLS as u8;

/// Prefix length of an MPLS route destination (the label width).
pub const MPLS_LABEL_PREFIX_LEN: u8 = 20;

/// MPLS label entry (struct mpls_label).
///
/// The entry is a big-endian 32-bit value with:
/// - Bits 31-12: Label (20 bits)
/// - Bits 11-9: Traffic Class (3 bits)
/// - Bit 8: Bottom-of-Stack (S bit)
/// - Bits 7-0: TTL (8 bits)
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct MplsLabelEntry {
    /// Big-endian encoded label entry.
    pub entry: u32,
}

impl MplsLabelEntry {
    /// Size of this structure.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Pack already-validated fields.
    fn pack(label: u32, tc: u8, bos: bool, ttl: u8) -> Self {
        let entry = (label << 12) | ((tc as u32) << 9) | ((bos as u32) << 8) | (ttl as u32);
        Self {
            entry: entry.to_be(),
        }
    }

    /// Get the label value (20 bits).
    pub fn label(&self) -> u32 {
        (u32::from_be(self.entry) >> 12) & mpls_label::MAX
    }

    /// Get the traffic class (3 bits).
    pub fn tc(&self) -> u8 {
        ((u32::from_be(self.entry) >> 9) & 0x7) as u8
    }

    /// Check if this is the bottom of stack.
    pub fn is_bos(&self) -> bool {
        (u32::from_be(self.entry) & 0x100) != 0
    }

    /// Get the TTL value.
    pub fn ttl(&self) -> u8 {
        (u32::from_be(self.entry) & 0xFF) as u8
    }

    /// Convert to bytes.
    pub fn as_bytes(&self) -> &[u8] {
        <Self as IntoBytes>::as_bytes(self)
    }

    /// Parse from bytes.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        Self::read_from_prefix(data).map(|(r, _)| r).ok()
    }
}

/// `MPLS_IPTUNNEL_DST` record carried inside a nested `RTA_ENCAP`.
///
/// Eight bytes: a 4-byte attribute header (length 8, type
/// [`mpls_tunnel::DST`]) followed by one label entry with TTL zero.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct MplsTunnelDst {
    /// Sub-attribute header.
    pub header: NlAttr,
    /// Label entry.
    pub label: MplsLabelEntry,
}

impl MplsTunnelDst {
    /// Size of this structure.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Convert to bytes.
    pub fn as_bytes(&self) -> &[u8] {
        <Self as IntoBytes>::as_bytes(self)
    }

    /// Parse from bytes.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        Self::read_from_prefix(data).map(|(r, _)| r).ok()
    }

    /// The record as a single 64-bit value in memory order.
    pub fn to_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(self.as_bytes());
        u64::from_ne_bytes(bytes)
    }
}

fn check_label(label: u32) -> Result<()> {
    if label > mpls_label::MAX {
        return Err(Error::InvalidLabel { label });
    }
    Ok(())
}

fn check_bos(bit: u8) -> Result<bool> {
    match bit {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(Error::InvalidStackBottom { bit }),
    }
}

fn check_tc(tc: u8) -> Result<()> {
    if tc > 7 {
        return Err(Error::InvalidTrafficClass { tc });
    }
    Ok(())
}

/// Encode a label for `RTA_DST` / `RTA_NEWDST`.
///
/// Label in bits 31-12, bottom-of-stack at bit 8, everything else zero,
/// stored in network byte order.
pub fn encode_plain(label: u32, bos: u8) -> Result<MplsLabelEntry> {
    check_label(label)?;
    let bos = check_bos(bos)?;
    Ok(MplsLabelEntry::pack(label, 0, bos, 0))
}

/// Encode the `MPLS_IPTUNNEL_DST` record for an encapsulation route.
///
/// Label in bits 31-12, traffic class in bits 11-9, bottom-of-stack at
/// bit 8 and TTL zero, behind a `{len: 8, type: MPLS_IPTUNNEL_DST}` header.
pub fn encode_encap_header(label: u32, bos: u8, tc: u8) -> Result<MplsTunnelDst> {
    check_label(label)?;
    let bos = check_bos(bos)?;
    check_tc(tc)?;
    Ok(MplsTunnelDst {
        header: NlAttr::new(mpls_tunnel::DST, MplsLabelEntry::SIZE),
        label: MplsLabelEntry::pack(label, tc, bos, 0),
    })
}

/// RTA_VIA structure for MPLS routes.
///
/// Used to specify the next hop for MPLS routes with address family.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct RtVia {
    /// Address family (AF_INET or AF_INET6), native endian.
    pub rtvia_family: u16,
    // Address follows (variable length)
}

impl RtVia {
    /// Size of the header (without address).
    pub const HEADER_SIZE: usize = std::mem::size_of::<Self>();

    /// Create for IPv4.
    pub fn ipv4() -> Self {
        Self {
            rtvia_family: libc::AF_INET as u16,
        }
    }

    /// Full `RTA_VIA` payload for an IPv4 next hop.
    pub fn ipv4_payload(addr: Ipv4Addr) -> [u8; 6] {
        let mut payload = [0u8; Self::HEADER_SIZE + 4];
        payload[..Self::HEADER_SIZE].copy_from_slice(Self::ipv4().as_bytes());
        payload[Self::HEADER_SIZE..].copy_from_slice(&addr.octets());
        payload
    }

    /// Convert to bytes.
    pub fn as_bytes(&self) -> &[u8] {
        <Self as IntoBytes>::as_bytes(self)
    }
}

/// MPLS tunnel attributes (MPLS_IPTUNNEL_*).
pub mod mpls_tunnel {
    /// Unspecified.
    pub const UNSPEC: u16 = 0;
    /// Destination label stack.
    pub const DST: u16 = 1;
    /// TTL propagation.
    pub const TTL: u16 = 2;
}

/// Lightweight tunnel encapsulation types (LWTUNNEL_ENCAP_*).
pub mod lwtunnel_encap {
    /// No encapsulation.
    pub const NONE: u16 = 0;
    /// MPLS encapsulation.
    pub const MPLS: u16 = 1;
    /// IP encapsulation.
    pub const IP: u16 = 2;
}

/// Special MPLS label values.
pub mod mpls_label {
    /// IPv4 Explicit NULL.
    pub const IPV4_EXPLICIT_NULL: u32 = 0;
    /// Router Alert.
    pub const ROUTER_ALERT: u32 = 1;
    /// IPv6 Explicit NULL.
    pub const IPV6_EXPLICIT_NULL: u32 = 2;
    /// Implicit NULL (penultimate hop popping).
    pub const IMPLICIT_NULL: u32 = 3;
    /// Highest reserved label.
    pub const MAX_RESERVED: u32 = 15;
    /// Maximum valid label value.
    pub const MAX: u32 = 0xFFFFF; // 2^20 - 1 = 1048575
}
