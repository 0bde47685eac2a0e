//! Netlink attribute (rtattr/nlattr) handling.

use super::error::{Error, Result};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Netlink attribute alignment.
pub const NLA_ALIGNTO: usize = 4;

/// Align a length to NLA_ALIGNTO boundary.
#[inline]
pub const fn nla_align(len: usize) -> usize {
    (len + NLA_ALIGNTO - 1) & !(NLA_ALIGNTO - 1)
}

/// Size of the attribute header.
pub const NLA_HDRLEN: usize = 4; // nla_align(size_of::<NlAttr>())

/// Largest payload a single attribute can declare.
pub const NLA_MAX_PAYLOAD: usize = u16::MAX as usize - NLA_HDRLEN;

/// Netlink attribute header (mirrors struct nlattr / struct rtattr).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct NlAttr {
    /// Length including header, excluding trailing padding.
    pub nla_len: u16,
    /// Attribute type.
    pub nla_type: u16,
}

/// Attribute type flags.
pub const NLA_F_NESTED: u16 = 1 << 15;
pub const NLA_F_NET_BYTEORDER: u16 = 1 << 14;
pub const NLA_TYPE_MASK: u16 = !(NLA_F_NESTED | NLA_F_NET_BYTEORDER);

impl NlAttr {
    /// Create a new attribute header.
    ///
    /// Callers must keep `data_len` within [`NLA_MAX_PAYLOAD`].
    pub const fn new(attr_type: u16, data_len: usize) -> Self {
        Self {
            nla_len: (NLA_HDRLEN + data_len) as u16,
            nla_type: attr_type,
        }
    }

    /// Get the attribute type without flags.
    pub fn kind(&self) -> u16 {
        self.nla_type & NLA_TYPE_MASK
    }

    /// Check if this is a nested attribute.
    pub fn is_nested(&self) -> bool {
        self.nla_type & NLA_F_NESTED != 0
    }

    /// Get the payload length (total length minus header).
    pub fn payload_len(&self) -> usize {
        (self.nla_len as usize).saturating_sub(NLA_HDRLEN)
    }

    /// Convert to bytes.
    pub fn as_bytes(&self) -> &[u8] {
        <Self as IntoBytes>::as_bytes(self)
    }

    /// Parse from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        Self::ref_from_prefix(data)
            .map(|(r, _)| r)
            .map_err(|_| Error::Truncated {
                expected: std::mem::size_of::<Self>(),
                actual: data.len(),
            })
    }
}

/// Iterator over netlink attributes in a buffer.
///
/// Yields the raw header alongside the payload so callers can inspect
/// flag bits such as [`NLA_F_NESTED`].
pub struct AttrIter<'a> {
    data: &'a [u8],
}

impl<'a> AttrIter<'a> {
    /// Create a new attribute iterator.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Check if there are no more attributes.
    pub fn is_empty(&self) -> bool {
        self.data.len() < NLA_HDRLEN
    }
}

impl<'a> Iterator for AttrIter<'a> {
    /// Returns (attribute header, payload data).
    type Item = (&'a NlAttr, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.len() < NLA_HDRLEN {
            return None;
        }

        let attr = NlAttr::from_bytes(self.data).ok()?;

        let len = attr.nla_len as usize;
        if len < NLA_HDRLEN || len > self.data.len() {
            return None;
        }

        let payload = &self.data[NLA_HDRLEN..len];
        let aligned_len = nla_align(len);

        if aligned_len >= self.data.len() {
            self.data = &[];
        } else {
            self.data = &self.data[aligned_len..];
        }

        Some((attr, payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nla_align() {
        assert_eq!(nla_align(4), 4);
        assert_eq!(nla_align(5), 8);
        assert_eq!(nla_align(6), 8);
        assert_eq!(nla_align(12), 12);
    }

    #[test]
    fn test_header_flags() {
        let attr = NlAttr::new(22 | NLA_F_NESTED, 8);
        assert_eq!(attr.nla_len, 12);
        assert_eq!(attr.kind(), 22);
        assert!(attr.is_nested());
        assert_eq!(attr.payload_len(), 8);
        assert!(!NlAttr::new(22, 0).is_nested());
    }

    #[test]
    fn test_iter_skips_padding() {
        // type 1 with a 2-byte payload (padded to 8), then type 4 with a u32.
        let mut data = Vec::new();
        data.extend_from_slice(NlAttr::new(1, 2).as_bytes());
        data.extend_from_slice(&[0xAA, 0xBB, 0, 0]);
        data.extend_from_slice(NlAttr::new(4, 4).as_bytes());
        data.extend_from_slice(&7u32.to_ne_bytes());

        let attrs: Vec<_> = AttrIter::new(&data).collect();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].0.kind(), 1);
        assert_eq!(attrs[0].1, &[0xAA, 0xBB]);
        assert_eq!(attrs[1].0.kind(), 4);
        assert_eq!(attrs[1].1, &7u32.to_ne_bytes());
    }

    #[test]
    fn test_iter_stops_on_bad_length() {
        let mut data = Vec::new();
        data.extend_from_slice(NlAttr::new(1, 40).as_bytes());
        data.extend_from_slice(&[0; 4]);

        assert!(AttrIter::new(&data).next().is_none());
    }
}
