//! Input parsing helpers shared by the route operations.

pub mod addr;
pub mod ifname;
