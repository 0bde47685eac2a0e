//! Kernel structures and constants for route requests.

pub mod mpls;
pub mod route;
