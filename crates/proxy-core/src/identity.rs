//! The proxy's own advertised address

use std::net::{IpAddr, SocketAddr};

/// Advertised address of this proxy and the two header values derived from
/// it. Both values are reused verbatim in every message the proxy touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyIdentity {
    addr: SocketAddr,
    via: String,
    record_route: String,
}

impl ProxyIdentity {
    pub fn new(ip: IpAddr, port: u16) -> Self {
        let addr = SocketAddr::new(ip, port);
        Self {
            addr,
            via: format!("Via: SIP/2.0/UDP {}", addr),
            record_route: format!("Record-Route: <sip:{};lr>", addr),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// `Via: SIP/2.0/UDP IP:PORT`, without branch
    pub fn via(&self) -> &str {
        &self.via
    }

    /// `Record-Route: <sip:IP:PORT;lr>`
    pub fn record_route(&self) -> &str {
        &self.record_route
    }

    /// True if `line` is a Via written by this proxy
    pub fn is_own_via(&self, line: &str) -> bool {
        match line.strip_prefix(self.via.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with([';', ' ', ',']),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates() {
        let identity = ProxyIdentity::new("192.0.2.10".parse().unwrap(), 5060);
        assert_eq!(identity.via(), "Via: SIP/2.0/UDP 192.0.2.10:5060");
        assert_eq!(identity.record_route(), "Record-Route: <sip:192.0.2.10:5060;lr>");

        let v6 = ProxyIdentity::new("2001:db8::1".parse().unwrap(), 5070);
        assert_eq!(v6.via(), "Via: SIP/2.0/UDP [2001:db8::1]:5070");
    }

    #[test]
    fn test_is_own_via() {
        let identity = ProxyIdentity::new("192.0.2.10".parse().unwrap(), 5060);
        assert!(identity.is_own_via("Via: SIP/2.0/UDP 192.0.2.10:5060;branch=z9hG4bKxm"));
        assert!(identity.is_own_via("Via: SIP/2.0/UDP 192.0.2.10:5060"));
        assert!(!identity.is_own_via("Via: SIP/2.0/UDP 192.0.2.10:50601;branch=x"));
        assert!(!identity.is_own_via("Via: SIP/2.0/UDP 192.0.2.11:5060;branch=x"));
    }
}
