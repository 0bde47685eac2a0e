//! Output interface references and their resolution to an ifindex.
//!
//! Routes leaving through a device carry `RTA_OIF`, which needs the
//! interface index. Callers either name the device and let it be looked up
//! when the request is built, or pass an index they already hold.
//!
//! Names must be resolved in the namespace the route goes into. sysfs in
//! this process only shows the namespace it was mounted in, so when a target
//! namespace is configured [`resolve_interface_index_in`] enters it and asks
//! the kernel there instead.

use std::fmt;
use std::path::Path;

use super::error::{Error, Result};
use super::namespace;
use crate::util::ifname;

/// A reference to a network interface, either by name or by index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InterfaceRef {
    /// Interface specified by name (resolved when the request is built).
    Name(String),
    /// Interface specified by index (already resolved).
    Index(u32),
}

impl InterfaceRef {
    /// Create an interface reference from a name.
    #[inline]
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Create an interface reference from an index.
    #[inline]
    pub fn index(index: u32) -> Self {
        Self::Index(index)
    }

    /// Get the name if this is a name reference.
    #[inline]
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            Self::Index(_) => None,
        }
    }
}

impl fmt::Display for InterfaceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{}", name),
            Self::Index(idx) => write!(f, "ifindex:{}", idx),
        }
    }
}

impl From<&str> for InterfaceRef {
    #[inline]
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for InterfaceRef {
    #[inline]
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<u32> for InterfaceRef {
    #[inline]
    fn from(index: u32) -> Self {
        Self::Index(index)
    }
}

/// Resolve an interface reference to a positive ifindex.
///
/// Names go through sysfs; index 0 never names a device and is rejected.
pub fn resolve_interface_index(iface: &InterfaceRef) -> Result<u32> {
    match iface {
        InterfaceRef::Name(name) => Ok(ifname::name_to_index(name)?),
        InterfaceRef::Index(0) => Err(Error::InterfaceNotFound {
            name: iface.to_string(),
        }),
        InterfaceRef::Index(idx) => Ok(*idx),
    }
}

/// Resolve an interface reference in the network namespace at `netns`.
///
/// With no namespace this is [`resolve_interface_index`]. Otherwise a name
/// is looked up with the calling thread switched into `netns`, so the index
/// is the one the kernel will see when the route is installed there.
pub fn resolve_interface_index_in(iface: &InterfaceRef, netns: Option<&Path>) -> Result<u32> {
    match (iface, netns) {
        (InterfaceRef::Name(name), Some(path)) => {
            ifname::validate(name)?;
            let _guard = namespace::enter_path(path)?;
            Ok(ifname::name_to_index_in_current_ns(name)?)
        }
        _ => resolve_interface_index(iface),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interface_ref_name() {
        let iface = InterfaceRef::name("eth0");
        assert_eq!(iface.as_name(), Some("eth0"));
        assert_eq!(iface.to_string(), "eth0");
    }

    #[test]
    fn test_interface_ref_index() {
        let iface = InterfaceRef::index(42);
        assert_eq!(iface.as_name(), None);
        assert_eq!(iface.to_string(), "ifindex:42");
    }

    #[test]
    fn test_from_impls() {
        assert_eq!(InterfaceRef::from("eth0"), InterfaceRef::Name("eth0".into()));
        assert_eq!(
            InterfaceRef::from(String::from("eth0")),
            InterfaceRef::Name("eth0".into())
        );
        assert_eq!(InterfaceRef::from(42u32), InterfaceRef::Index(42));
    }

    #[test]
    fn test_resolve_index() {
        assert_eq!(resolve_interface_index(&InterfaceRef::index(7)).unwrap(), 7);
        assert!(matches!(
            resolve_interface_index(&InterfaceRef::index(0)),
            Err(Error::InterfaceNotFound { .. })
        ));
    }

    #[test]
    fn test_resolve_unknown_name() {
        let err = resolve_interface_index(&InterfaceRef::name("nosuchif0")).unwrap_err();
        assert!(matches!(err, Error::InterfaceNotFound { ref name } if name == "nosuchif0"));
    }

    #[test]
    fn test_resolve_bad_name() {
        let err = resolve_interface_index(&InterfaceRef::name("")).unwrap_err();
        assert!(matches!(err, Error::InvalidInterfaceName { .. }));
    }

    #[test]
    fn test_resolve_loopback() {
        if !std::path::Path::new("/sys/class/net/lo").exists() {
            return;
        }
        let idx = resolve_interface_index(&InterfaceRef::name("lo")).unwrap();
        assert_eq!(idx, ifname::name_to_index("lo").unwrap());
    }

    #[test]
    fn test_resolve_in_namespace_never_falls_back_to_host() {
        // A name the host knows must not resolve when the namespace is unusable.
        let err = resolve_interface_index_in(
            &InterfaceRef::name("lo"),
            Some(Path::new("/nonexistent/netns/mplsctl")),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Namespace { .. }));
    }

    #[test]
    fn test_resolve_in_namespace_index_passthrough() {
        let netns = Some(Path::new("/nonexistent/netns/mplsctl"));
        assert_eq!(
            resolve_interface_index_in(&InterfaceRef::index(9), netns).unwrap(),
            9
        );
        assert!(matches!(
            resolve_interface_index_in(&InterfaceRef::name(""), netns),
            Err(Error::InvalidInterfaceName { .. })
        ));
    }
}
