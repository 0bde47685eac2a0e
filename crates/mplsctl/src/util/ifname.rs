//! Interface name validation and index lookup.

use std::ffi::CString;

/// Maximum interface name length (including null terminator).
pub const IFNAMSIZ: usize = 16;

/// Error type for interface operations.
#[derive(Debug, thiserror::Error)]
pub enum IfError {
    #[error("interface not found: {0}")]
    NotFound(String),

    #[error("invalid interface name '{name}': {reason}")]
    InvalidName { name: String, reason: String },
}

pub type Result<T> = std::result::Result<T, IfError>;

fn invalid(name: &str, reason: impl Into<String>) -> IfError {
    IfError::InvalidName {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Validate an interface name.
pub fn validate(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(invalid(name, "empty name"));
    }

    if name.len() >= IFNAMSIZ {
        return Err(invalid(
            name,
            format!("name too long (max {} chars)", IFNAMSIZ - 1),
        ));
    }

    if name == "." || name == ".." || name.contains('/') || name.contains('\0') {
        return Err(invalid(name, "name contains invalid characters"));
    }

    if name.chars().any(|c| c.is_whitespace()) {
        return Err(invalid(name, "name contains whitespace"));
    }

    Ok(())
}

/// Convert an interface name to its index.
///
/// The index is read from sysfs, so it reflects the network namespace
/// sysfs was mounted in.
pub fn name_to_index(name: &str) -> Result<u32> {
    validate(name)?;

    let path = format!("/sys/class/net/{}/ifindex", name);
    let content =
        std::fs::read_to_string(&path).map_err(|_| IfError::NotFound(name.to_string()))?;

    match content.trim().parse::<u32>() {
        Ok(index) if index > 0 => Ok(index),
        _ => Err(IfError::NotFound(name.to_string())),
    }
}

/// Convert an interface name to its index in the calling thread's namespace.
///
/// Uses `if_nametoindex(3)`, whose lookup socket is created in the network
/// namespace the thread is currently in. Use this instead of
/// [`name_to_index`] after switching namespaces.
pub fn name_to_index_in_current_ns(name: &str) -> Result<u32> {
    validate(name)?;

    let c_name = CString::new(name).map_err(|_| invalid(name, "name contains NUL"))?;
    // SAFETY: c_name is a valid NUL-terminated string for the duration of the call.
    let index = unsafe { libc::if_nametoindex(c_name.as_ptr()) };
    if index == 0 {
        return Err(IfError::NotFound(name.to_string()));
    }
    Ok(index)
}
