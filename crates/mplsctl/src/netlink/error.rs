//! Error types for MPLS route operations.

use std::io;
use std::time::Duration;

use crate::util::addr::AddrError;
use crate::util::ifname::IfError;

/// Result type for MPLS route operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad failure categories a caller can branch on.
///
/// Every [`Error`] maps onto exactly one kind via [`Error::kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The netlink endpoint could not be created, bound, or moved into a namespace.
    ResourceUnavailable,
    /// Caller input was rejected before anything was sent.
    InvalidInput,
    /// The request would not fit in the request buffer.
    CapacityExceeded,
    /// Sending or receiving on the endpoint failed.
    TransportFailure,
    /// The kernel answered with a non-zero error code.
    KernelRejected,
}

/// Errors that can occur while building or exchanging a route request.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Creating the netlink socket failed.
    #[error("failed to create netlink socket: {0}")]
    Socket(#[source] io::Error),

    /// Binding the netlink socket failed.
    #[error("failed to bind netlink socket: {0}")]
    Bind(#[source] io::Error),

    /// Entering or restoring a network namespace failed.
    #[error("cannot use network namespace '{path}': {source}")]
    Namespace {
        /// Namespace file path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Address literal could not be parsed as IPv4.
    #[error("invalid IPv4 address: {input}")]
    InvalidAddress {
        /// The rejected literal.
        input: String,
    },

    /// MPLS label does not fit in 20 bits.
    #[error("invalid MPLS label {label} (max 1048575)")]
    InvalidLabel {
        /// The rejected label.
        label: u32,
    },

    /// Traffic class does not fit in 3 bits.
    #[error("invalid MPLS traffic class {tc} (max 7)")]
    InvalidTrafficClass {
        /// The rejected traffic class.
        tc: u8,
    },

    /// Bottom-of-stack flag is neither 0 nor 1.
    #[error("invalid bottom-of-stack bit {bit} (must be 0 or 1)")]
    InvalidStackBottom {
        /// The rejected flag value.
        bit: u8,
    },

    /// Interface not found.
    #[error("interface not found: {name}")]
    InterfaceNotFound {
        /// The interface name that was not found.
        name: String,
    },

    /// Interface name is malformed.
    #[error("invalid interface name '{name}': {reason}")]
    InvalidInterfaceName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Appending would overflow the request buffer.
    #[error("request buffer exhausted: need {required} bytes, capacity is {capacity}")]
    CapacityExceeded {
        /// Aligned length the message would have after the append.
        required: usize,
        /// Buffer capacity.
        capacity: usize,
    },

    /// Send or receive on the socket failed.
    #[error("netlink transport error: {0}")]
    Transport(#[source] io::Error),

    /// No response arrived within the configured receive timeout.
    #[error("no response from kernel within {0:?}")]
    Timeout(Duration),

    /// Kernel returned an error code.
    #[error("kernel error: {message} (errno {errno})")]
    Kernel {
        /// The errno value from the kernel (positive).
        errno: i32,
        /// Human-readable error message.
        message: String,
    },

    /// Message was truncated.
    #[error("message truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Expected message length.
        expected: usize,
        /// Actual bytes received.
        actual: usize,
    },

    /// Invalid message format.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

impl Error {
    /// Create a kernel error from the (negative) code carried in an error report.
    pub fn from_errno(errno: i32) -> Self {
        let errno = errno.saturating_abs();
        let message = io::Error::from_raw_os_error(errno).to_string();
        // io::Error appends " (os error N)"; the errno is already reported separately.
        let message = match message.rfind(" (os error") {
            Some(idx) => message[..idx].to_string(),
            None => message,
        };
        Self::Kernel { errno, message }
    }

    /// Map this error onto its failure category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Socket(_) | Self::Bind(_) | Self::Namespace { .. } => {
                ErrorKind::ResourceUnavailable
            }
            Self::InvalidAddress { .. }
            | Self::InvalidLabel { .. }
            | Self::InvalidTrafficClass { .. }
            | Self::InvalidStackBottom { .. }
            | Self::InterfaceNotFound { .. }
            | Self::InvalidInterfaceName { .. } => ErrorKind::InvalidInput,
            Self::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            Self::Transport(_)
            | Self::Timeout(_)
            | Self::Truncated { .. }
            | Self::InvalidMessage(_) => ErrorKind::TransportFailure,
            Self::Kernel { .. } => ErrorKind::KernelRejected,
        }
    }

    /// Check if the kernel rejected the request.
    pub fn is_kernel_rejected(&self) -> bool {
        matches!(self, Self::Kernel { .. })
    }

    /// Check if this is a "not found" error (ENOENT, ENODEV, or unknown interface).
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Kernel { errno, .. } => matches!(*errno, 2 | 19), // ENOENT=2, ENODEV=19
            Self::InterfaceNotFound { .. } => true,
            _ => false,
        }
    }

    /// Check if this is a permission error (EPERM, EACCES).
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Self::Kernel { errno, .. } => matches!(*errno, 1 | 13), // EPERM=1, EACCES=13
            Self::Socket(e) | Self::Bind(e) | Self::Transport(e) => {
                e.kind() == io::ErrorKind::PermissionDenied
            }
            _ => false,
        }
    }

    /// Check if this is an "already exists" error (EEXIST).
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::Kernel { errno: 17, .. }) // EEXIST=17
    }

    /// Get the errno value if this is a kernel error.
    pub fn errno(&self) -> Option<i32> {
        match self {
            Self::Kernel { errno, .. } => Some(*errno),
            _ => None,
        }
    }
}

impl From<AddrError> for Error {
    fn from(err: AddrError) -> Self {
        match err {
            AddrError::InvalidAddress(input) => Self::InvalidAddress { input },
        }
    }
}

impl From<IfError> for Error {
    fn from(err: IfError) -> Self {
        match err {
            IfError::NotFound(name) => Self::InterfaceNotFound { name },
            IfError::InvalidName { name, reason } => Self::InvalidInterfaceName { name, reason },
        }
    }
}
