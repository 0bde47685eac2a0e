//! MPLS route integration tests.
//!
//! Every test works in its own namespace. Device-based routes name the
//! namespace's `dummy0`, which only exists inside it.

use mplsctl::netlink::types::route::{RtMsg, RtaAttr};
use mplsctl::netlink::{AttrIter, InterfaceRef, MplsRequest, NLMSG_HDRLEN};
use mplsctl::{ErrorKind, MplsRouter, Result};
use std::net::Ipv4Addr;
use std::time::Duration;

use crate::common::TestNamespace;

/// Set up a namespace with `dummy0` up on 10.0.0.254/24.
fn setup_mpls_ns(name: &str) -> Result<(TestNamespace, MplsRouter)> {
    let ns = TestNamespace::new(name)?;
    ns.add_dummy("dummy0")?;
    ns.link_up("dummy0")?;
    ns.add_addr("dummy0", "10.0.0.254/24")?;

    let router = MplsRouter::with_config(ns.config().recv_timeout(Duration::from_secs(5)));
    Ok((ns, router))
}

/// The `RTA_OIF` value carried by a built request.
fn oif_of(request: &[u8]) -> Option<u32> {
    AttrIter::new(&request[NLMSG_HDRLEN + RtMsg::SIZE..])
        .find(|(attr, _)| attr.kind() == RtaAttr::Oif as u16)
        .map(|(_, payload)| u32::from_ne_bytes(payload.try_into().unwrap()))
}

#[tokio::test]
async fn test_names_resolve_inside_namespace() -> Result<()> {
    require_root!();

    let (ns, _) = setup_mpls_ns("resolve")?;
    let config = ns.config();
    let expected = ns.ifindex("dummy0")?;

    let bytes = MplsRequest::route_dev(100, 1, "dummy0").to_bytes(&config)?;
    assert_eq!(oif_of(&bytes), Some(expected));

    let bytes = MplsRequest::encap_dev(Ipv4Addr::new(192, 168, 1, 5), 42, "dummy0")
        .to_bytes(&config)?;
    assert_eq!(oif_of(&bytes), Some(expected));

    Ok(())
}

#[tokio::test]
async fn test_host_only_device_not_found_in_namespace() -> Result<()> {
    require_root!();

    let (ns, _) = setup_mpls_ns("hostdev")?;
    let inside = ns.exec("ls", &["/sys/class/net"])?;
    let inside: Vec<&str> = inside.split_whitespace().collect();

    let host_only = std::fs::read_dir("/sys/class/net")
        .unwrap()
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().into_string().ok())
        .find(|name| !inside.contains(&name.as_str()));
    let Some(host_only) = host_only else {
        eprintln!("Skipping: every host device also exists in the namespace");
        return Ok(());
    };

    let err = MplsRequest::route_dev(100, 1, host_only.as_str())
        .build(&ns.config())
        .unwrap_err();
    assert!(err.is_not_found(), "{} resolved in namespace: {}", host_only, err);
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    Ok(())
}

#[tokio::test]
async fn test_route_via_interface() -> Result<()> {
    require_root!();

    let (ns, router) = setup_mpls_ns("rtdev")?;
    router.add_route_dev("dummy0", 100, 1).await?;

    let routes = ns.mpls_routes()?;
    assert!(
        routes.lines().any(|l| l.starts_with("100 ") && l.contains("dev dummy0")),
        "missing label route in:\n{}",
        routes
    );

    Ok(())
}

#[tokio::test]
async fn test_route_via_next_hop() -> Result<()> {
    require_root!();

    let (ns, router) = setup_mpls_ns("rtvia")?;
    router.add_route_nexthop("10.0.0.1", 101, 1).await?;

    let routes = ns.mpls_routes()?;
    assert!(
        routes
            .lines()
            .any(|l| l.starts_with("101 ") && l.contains("10.0.0.1")),
        "missing next hop route in:\n{}",
        routes
    );

    Ok(())
}

#[tokio::test]
async fn test_swap_via_interface() -> Result<()> {
    require_root!();

    let (ns, router) = setup_mpls_ns("swapdev")?;
    router.add_swap_dev("dummy0", 102, 202, 1).await?;

    let routes = ns.mpls_routes()?;
    assert!(
        routes
            .lines()
            .any(|l| l.starts_with("102 ") && l.contains("202")),
        "missing swap route in:\n{}",
        routes
    );

    Ok(())
}

#[tokio::test]
async fn test_swap_via_next_hop() -> Result<()> {
    require_root!();

    let (ns, router) = setup_mpls_ns("swapvia")?;
    router.add_swap_nexthop("10.0.0.1", 103, 203, 1).await?;

    let routes = ns.mpls_routes()?;
    assert!(
        routes
            .lines()
            .any(|l| l.starts_with("103 ") && l.contains("203") && l.contains("10.0.0.1")),
        "missing swap route in:\n{}",
        routes
    );

    Ok(())
}

#[tokio::test]
async fn test_encap_via_interface() -> Result<()> {
    require_root!();

    let (ns, router) = setup_mpls_ns("encapdev")?;
    let ifindex = ns.ifindex("dummy0")?;

    router
        .execute(&MplsRequest::encap_dev(
            Ipv4Addr::new(192, 168, 1, 5),
            42,
            InterfaceRef::index(ifindex),
        ))
        .await?;

    let routes = ns.ipv4_routes()?;
    assert!(
        routes
            .lines()
            .any(|l| l.starts_with("192.168.1.5 ") && l.contains("encap mpls") && l.contains("42")),
        "missing encap route in:\n{}",
        routes
    );

    Ok(())
}

#[tokio::test]
async fn test_encap_via_named_interface() -> Result<()> {
    require_root!();

    let (ns, router) = setup_mpls_ns("encapname")?;
    router
        .add_encap_dev("dummy0", "192.168.1.7", 44)
        .await?;

    let routes = ns.ipv4_routes()?;
    assert!(
        routes
            .lines()
            .any(|l| l.starts_with("192.168.1.7 ") && l.contains("dev dummy0")),
        "missing encap route in:\n{}",
        routes
    );

    Ok(())
}

#[tokio::test]
async fn test_encap_via_gateway() -> Result<()> {
    require_root!();

    let (ns, router) = setup_mpls_ns("encapgw")?;
    router
        .add_encap_gateway("192.168.1.6", 43, "10.0.0.2")
        .await?;

    let routes = ns.ipv4_routes()?;
    assert!(
        routes.lines().any(|l| l.starts_with("192.168.1.6 ")
            && l.contains("encap mpls")
            && l.contains("via 10.0.0.2")),
        "missing encap route in:\n{}",
        routes
    );

    Ok(())
}

#[tokio::test]
async fn test_duplicate_route_rejected() -> Result<()> {
    require_root!();

    let (_ns, router) = setup_mpls_ns("dup")?;
    router.add_route_dev("dummy0", 104, 1).await?;

    let err = router.add_route_dev("dummy0", 104, 1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::KernelRejected);
    assert!(err.is_already_exists(), "unexpected error: {}", err);

    Ok(())
}

#[tokio::test]
async fn test_replace_mode_overwrites() -> Result<()> {
    require_root!();

    let (ns, _) = setup_mpls_ns("replace")?;
    let router = MplsRouter::with_config(ns.config().exclusive(false));

    router.add_swap_nexthop("10.0.0.1", 105, 205, 1).await?;
    router.add_swap_nexthop("10.0.0.1", 105, 305, 1).await?;

    let routes = ns.mpls_routes()?;
    let line = routes
        .lines()
        .find(|l| l.starts_with("105 "))
        .unwrap_or_default();
    assert!(line.contains("305"), "route not replaced:\n{}", routes);

    Ok(())
}

#[tokio::test]
async fn test_label_beyond_platform_limit_rejected() -> Result<()> {
    require_root!();

    let (_ns, router) = setup_mpls_ns("limit")?;
    let err = router
        .add_route_dev("dummy0", crate::common::PLATFORM_LABELS + 1, 1)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::KernelRejected);

    Ok(())
}
