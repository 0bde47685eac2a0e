//! Bounded message builder for constructing netlink requests.
//!
//! The builder owns the request buffer and keeps the header's length field
//! equal to the aligned number of bytes written so far. Every append checks
//! the configured capacity first and leaves the buffer untouched when the
//! write would not fit.

use tracing::trace;
use zerocopy::{Immutable, IntoBytes};

use super::attr::{NLA_F_NESTED, NLA_HDRLEN, NLA_MAX_PAYLOAD, NlAttr, nla_align};
use super::error::{Error, Result};
use super::message::{NLMSG_HDRLEN, NlMsgHdr, nlmsg_align};
use super::types::route::RtMsg;

/// Size of the attribute area reserved behind the route descriptor.
pub const ATTR_BUF_SIZE: usize = 4096;

/// Default request capacity: header, route descriptor and attribute area.
pub const REQUEST_CAPACITY: usize = NLMSG_HDRLEN + RtMsg::SIZE + ATTR_BUF_SIZE;

/// Builder for constructing netlink messages.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    buf: Vec<u8>,
    capacity: usize,
}

impl MessageBuilder {
    /// Create a new message builder with the given type and flags.
    pub fn new(msg_type: u16, flags: u16) -> Self {
        Self::with_header(NlMsgHdr::new(msg_type, flags))
    }

    /// Create a builder from an existing header.
    pub fn with_header(header: NlMsgHdr) -> Self {
        let mut buf = Vec::with_capacity(REQUEST_CAPACITY);
        buf.extend_from_slice(header.as_bytes());
        buf.resize(NLMSG_HDRLEN, 0);
        let mut builder = Self {
            buf,
            capacity: REQUEST_CAPACITY,
        };
        builder.sync_len();
        builder
    }

    /// Limit the buffer to `capacity` bytes.
    ///
    /// The capacity never drops below what has already been written.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(self.buf.len());
        self
    }

    /// Get the current message length.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check if the message is empty (header only).
    pub fn is_empty(&self) -> bool {
        self.buf.len() == NLMSG_HDRLEN
    }

    /// Get the buffer capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes still available for appends.
    pub fn remaining(&self) -> usize {
        self.capacity - self.buf.len()
    }

    /// Fail unless the message can grow to `end` bytes.
    fn ensure_room(&self, end: usize) -> Result<()> {
        if end > self.capacity {
            return Err(Error::CapacityExceeded {
                required: end,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// Write the current length into the header.
    fn sync_len(&mut self) {
        let len = (self.buf.len() as u32).to_ne_bytes();
        self.buf[0..4].copy_from_slice(&len);
    }

    /// Append raw bytes to the message (with alignment padding).
    pub fn append_bytes(&mut self, data: &[u8]) -> Result<()> {
        let start = self.buf.len();
        let end = nlmsg_align(start + data.len());
        self.ensure_room(end)?;

        self.buf.extend_from_slice(data);
        self.buf.resize(end, 0);
        self.sync_len();
        Ok(())
    }

    /// Append a fixed-size struct to the message.
    pub fn append<T: IntoBytes + Immutable>(&mut self, data: &T) -> Result<()> {
        self.append_bytes(data.as_bytes())
    }

    /// Append an attribute with the given type and data.
    pub fn append_attr(&mut self, attr_type: u16, data: &[u8]) -> Result<()> {
        let start = self.buf.len();
        if data.len() > NLA_MAX_PAYLOAD {
            return Err(Error::CapacityExceeded {
                required: start + NLA_HDRLEN + data.len(),
                capacity: self.capacity,
            });
        }
        let end = nla_align(start + NLA_HDRLEN + data.len());
        self.ensure_room(end)?;

        let attr = NlAttr::new(attr_type, data.len());
        self.buf.extend_from_slice(attr.as_bytes());
        self.buf.extend_from_slice(data);
        self.buf.resize(end, 0);
        self.sync_len();

        trace!(attr_type, payload_len = data.len(), end, "appended attribute");
        Ok(())
    }

    /// Append a u16 attribute (native endian).
    pub fn append_attr_u16(&mut self, attr_type: u16, value: u16) -> Result<()> {
        self.append_attr(attr_type, &value.to_ne_bytes())
    }

    /// Append a u32 attribute (native endian).
    pub fn append_attr_u32(&mut self, attr_type: u16, value: u32) -> Result<()> {
        self.append_attr(attr_type, &value.to_ne_bytes())
    }

    /// Append a nested attribute whose payload is already-encoded records.
    ///
    /// `records` must be a complete sequence of length/type/value records
    /// (for MPLS encapsulation, the tunnel destination header produced by
    /// the label codec). The outer type gets [`NLA_F_NESTED`] and the same
    /// capacity check as [`append_attr`](Self::append_attr).
    pub fn append_nested_attr(&mut self, attr_type: u16, records: &[u8]) -> Result<()> {
        self.append_attr(attr_type | NLA_F_NESTED, records)
    }

    /// Get the header as written so far.
    pub fn header(&self) -> NlMsgHdr {
        let mut header = NlMsgHdr::default();
        header
            .as_mut_bytes()
            .copy_from_slice(&self.buf[..std::mem::size_of::<NlMsgHdr>()]);
        header
    }

    /// Set the sequence number.
    pub fn set_seq(&mut self, seq: u32) {
        let bytes = seq.to_ne_bytes();
        self.buf[8..12].copy_from_slice(&bytes);
    }

    /// Set the port ID.
    pub fn set_pid(&mut self, pid: u32) {
        let bytes = pid.to_ne_bytes();
        self.buf[12..16].copy_from_slice(&bytes);
    }

    /// Finalize and return the message bytes.
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }

    /// Get the current buffer for inspection.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}
