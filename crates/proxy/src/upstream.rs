//! Reaching origin servers.
//!
//! [`Upstream`] is the seam between the connection handler and the network: name resolution and
//! dialing go through it, so tests can point "public" names at local listeners.

use std::fmt;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::ProxyError;

static TUNNEL_ADDR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+):(\d+)$").unwrap());

#[async_trait]
pub trait Upstream: fmt::Debug + Send + Sync {
    async fn resolve(&self, host: &str, port: u16) -> io::Result<Vec<SocketAddr>>;

    /// Connects to the first address that accepts.
    async fn connect(&self, addrs: &[SocketAddr]) -> io::Result<TcpStream>;

    async fn dial(&self, host: &str, port: u16) -> io::Result<TcpStream> {
        let addrs = self.resolve(host, port).await?;
        self.connect(&addrs).await
    }
}

/// Resolves through the system resolver and dials plain TCP.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpUpstream;

#[async_trait]
impl Upstream for TcpUpstream {
    async fn resolve(&self, host: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
        Ok(tokio::net::lookup_host((host, port)).await?.collect())
    }

    async fn connect(&self, addrs: &[SocketAddr]) -> io::Result<TcpStream> {
        TcpStream::connect(addrs).await
    }
}

/// Checks a CONNECT target and returns the addresses the tunnel may dial.
///
/// The target must look like `host:port`, match `allowed`, and resolve only to globally routable
/// unicast addresses. Callers dial the returned addresses, never the name again.
pub async fn check_tunnel_target(
    upstream: &dyn Upstream,
    allowed: &Regex,
    target: &str,
) -> Result<Vec<SocketAddr>, ProxyError> {
    let captures = TUNNEL_ADDR
        .captures(target)
        .ok_or_else(|| ProxyError::forbidden(format!("\"{target}\" is not a host:port address")))?;

    if !allowed.is_match(target) {
        return Err(ProxyError::forbidden(format!("tunnels to \"{target}\" are not allowed")));
    }

    let host = captures[1].trim_start_matches('[').trim_end_matches(']');
    let port = captures[2].parse::<u16>().map_err(|e| ProxyError::forbidden(format!("invalid port in \"{target}\": {e}")))?;

    let addrs = upstream
        .resolve(host, port)
        .await
        .map_err(|e| ProxyError::forbidden(format!("can't resolve \"{host}\": {e}")))?;

    if addrs.is_empty() {
        return Err(ProxyError::forbidden(format!("\"{host}\" has no addresses")));
    }

    if let Some(addr) = addrs.iter().find(|addr| !is_global_unicast(addr.ip())) {
        debug!(%target, %addr, "tunnel target resolves to a non-global address");
        return Err(ProxyError::forbidden(format!("\"{target}\" resolves to the non-global address {}", addr.ip())));
    }

    Ok(addrs)
}

/// True for addresses that are reachable on the public internet as a single host.
pub fn is_global_unicast(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(ip) => is_global_unicast_v4(ip),
        IpAddr::V6(ip) => match ip.to_ipv4_mapped() {
            Some(ip) => is_global_unicast_v4(ip),
            None => is_global_unicast_v6(ip),
        },
    }
}

fn is_global_unicast_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    // 100.64.0.0/10, carrier-grade NAT
    let shared = a == 100 && (b & 0xc0) == 64;

    !(ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_broadcast()
        || ip.is_unspecified()
        || ip.is_multicast()
        || shared)
}

fn is_global_unicast_v6(ip: Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    // fc00::/7 unique local, fe80::/10 link local
    let unique_local = (first & 0xfe00) == 0xfc00;
    let link_local = (first & 0xffc0) == 0xfe80;

    !(ip.is_loopback() || ip.is_unspecified() || ip.is_multicast() || unique_local || link_local)
}
