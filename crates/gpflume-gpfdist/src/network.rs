//! gpfdist location URIs from the listener's bound address

use std::net::{IpAddr, Ipv4Addr, UdpSocket};

/// Build the location URI for a listener bound on `port`:
/// `gpfdist://<host>:<port>`.
pub fn gpfdist_uri(port: u16) -> String {
    format!("gpfdist://{}:{port}", local_address())
}

/// Best-effort resolution of an address the bulk-load client can reach.
///
/// Connecting a UDP socket sends no packets but makes the OS pick the
/// outbound interface address. Falls back to loopback when the host has
/// no route at all.
pub fn local_address() -> IpAddr {
    UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .and_then(|socket| {
            socket.connect(("8.8.8.8", 80))?;
            socket.local_addr()
        })
        .map(|addr| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_has_scheme_and_port() {
        let uri = gpfdist_uri(8080);
        assert!(uri.starts_with("gpfdist://"));
        assert!(uri.ends_with(":8080"));
    }

    #[test]
    fn local_address_is_not_unspecified() {
        assert!(!local_address().is_unspecified());
    }
}
