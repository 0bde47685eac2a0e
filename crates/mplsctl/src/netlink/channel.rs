//! One-shot request/response exchange with the kernel.
//!
//! A [`Channel`] owns a single socket for the lifetime of one route
//! operation: one request goes out, exactly one datagram is read back, and
//! the socket is closed when the channel is dropped.

use std::time::Duration;

use tracing::{debug, warn};

use super::builder::MessageBuilder;
use super::config::RouterConfig;
use super::error::{Error, Result};
use super::message::{MessageIter, NLMSG_HDRLEN, NlMsgError};
use super::socket::NetlinkSocket;

/// Single-use netlink endpoint.
pub struct Channel {
    socket: NetlinkSocket,
    recv_timeout: Option<Duration>,
}

impl Channel {
    /// Open a channel, honouring the namespace and timeout in `config`.
    ///
    /// Creation and bind failures are reported as distinct errors.
    pub fn open(config: &RouterConfig) -> Result<Self> {
        let socket = match &config.netns {
            Some(path) => NetlinkSocket::new_in_namespace_path(path)?,
            None => NetlinkSocket::new()?,
        };
        Ok(Self {
            socket,
            recv_timeout: config.recv_timeout,
        })
    }

    /// Send the request and wait for the kernel's single answer.
    ///
    /// Stamps the sequence number and port ID into the header first. There
    /// is no retry: a failed send or receive ends the exchange.
    pub async fn send_and_await(&self, mut builder: MessageBuilder) -> Result<()> {
        let seq = self.socket.next_seq();
        builder.set_seq(seq);
        builder.set_pid(self.socket.pid());

        let msg = builder.finish();
        debug!(seq, pid = self.socket.pid(), len = msg.len(), "sending request");
        self.socket.send(&msg).await?;

        let response = self.recv().await?;
        debug!(seq, len = response.len(), "received response");

        decode_response(&response)
    }

    /// Read one datagram, bounded by the configured receive timeout.
    pub(crate) async fn recv(&self) -> Result<Vec<u8>> {
        match self.recv_timeout {
            Some(limit) => tokio::time::timeout(limit, self.socket.recv_msg())
                .await
                .map_err(|_| Error::Timeout(limit))?,
            None => self.socket.recv_msg().await,
        }
    }
}

/// Interpret the kernel's answer to a route request.
///
/// Only the first message in the datagram is examined. Anything other than
/// an error report counts as success, and so does an error report carrying
/// code zero (an explicit ACK). A non-zero code becomes [`Error::Kernel`].
pub fn decode_response(data: &[u8]) -> Result<()> {
    let (header, payload) = match MessageIter::new(data).next() {
        Some(result) => result?,
        None => {
            return Err(Error::Truncated {
                expected: NLMSG_HDRLEN,
                actual: data.len(),
            });
        }
    };

    if header.is_error() {
        let err = NlMsgError::from_bytes(payload)?;
        if !err.is_ack() {
            let err = Error::from_errno(err.error);
            warn!(seq = header.nlmsg_seq, %err, "kernel rejected request");
            return Err(err);
        }
    }

    Ok(())
}
