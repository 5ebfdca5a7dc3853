//! IPv4/IPv6 address and subnet matching for access control
//!
//! A spec is either a bare address (exact match after canonicalization) or
//! `address/prefix`, which matches every address sharing the top `prefix`
//! bits. Addresses of the other family never match.

use crate::error::{Error, Result};
use ipnet::IpNet;
use std::net::IpAddr;

/// Parse a spec into a network; a bare address becomes a host network
pub fn parse_spec(spec: &str) -> Option<IpNet> {
    match spec.parse::<IpNet>() {
        Ok(net) => Some(net),
        Err(_) => spec.parse::<IpAddr>().ok().map(IpNet::from),
    }
}

/// Does `address` fall within `spec`
///
/// Malformed specs or addresses never match.
pub fn matches(spec: &str, address: &str) -> bool {
    match address.parse::<IpAddr>() {
        Ok(addr) => matches_addr(spec, &addr),
        Err(_) => false,
    }
}

/// [`matches`] for an already parsed address
pub fn matches_addr(spec: &str, addr: &IpAddr) -> bool {
    parse_spec(spec).is_some_and(|net| net.contains(addr))
}

/// Canonical form of an address or subnet spec
///
/// Subnets are truncated to their network address, so `10.1.2.3/8` becomes
/// `10.0.0.0/8`. Prefix lengths must be 1-32 for IPv4 and 1-128 for IPv6.
pub fn normalize(spec: &str) -> Result<String> {
    if let Ok(addr) = spec.parse::<IpAddr>() {
        return Ok(addr.to_string());
    }

    let Some((addr, prefix)) = spec.split_once('/') else {
        return Err(Error::validation(format!("not a valid IP address: {spec:?}")));
    };
    let addr: IpAddr = addr
        .parse()
        .map_err(|_| Error::validation(format!("not a valid IP address: {spec:?}")))?;
    let max = if addr.is_ipv4() { 32 } else { 128 };
    let prefix = prefix
        .parse::<u8>()
        .ok()
        .filter(|p| (1..=max).contains(p))
        .ok_or_else(|| {
            Error::validation(format!("subnet prefix must be between 1 and {max}: {spec:?}"))
        })?;

    IpNet::new(addr, prefix)
        .map(|net| net.trunc().to_string())
        .map_err(|e| Error::validation(format!("{spec:?}: {e}")))
}

/// Grant/deny decision for a client
///
/// The deny list is checked first and any match refuses. A non-empty grant
/// list then requires a match; an empty one admits.
pub fn is_admitted<S: AsRef<str>>(grant: &[S], deny: &[S], client: &IpAddr) -> bool {
    if let Some(hit) = deny.iter().find(|s| matches_addr(s.as_ref(), client)) {
        tracing::debug!("Refusing {} (denied by {})", client, hit.as_ref());
        return false;
    }
    if grant.is_empty() {
        return true;
    }
    let granted = grant.iter().any(|s| matches_addr(s.as_ref(), client));
    if !granted {
        tracing::debug!("Refusing {} (not in grant list)", client);
    }
    granted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipv4_subnets() {
        assert!(matches("10.0.0.0/8", "10.1.2.3"));
        assert!(!matches("10.0.0.0/9", "10.128.0.0"));
        assert!(matches("10.0.0.0/9", "10.127.255.255"));
        assert!(matches("192.168.1.0/24", "192.168.1.50"));
        assert!(!matches("192.168.1.0/24", "192.168.2.1"));
    }

    #[test]
    fn test_literals() {
        assert!(matches("127.0.0.1", "127.0.0.1"));
        assert!(!matches("127.0.0.1", "127.0.0.2"));
        assert!(matches("::1", "::1"));
        assert!(matches("::1", "0:0:0:0:0:0:0:1"));
        assert!(matches("::ffff:10.0.0.1", "::ffff:a00:1"));
    }

    #[test]
    fn test_ipv6_subnets() {
        assert!(matches("fe80::/10", "fe80::1"));
        assert!(matches("fe80::/10", "febf::1"));
        assert!(!matches("fe80::/10", "fec0::1"));
        assert!(matches("2001:db8::/32", "2001:db8:ffff::1"));
    }

    #[test]
    fn test_family_mismatch() {
        assert!(!matches("192.168.0.0/24", "fe80::1"));
        assert!(!matches("::/0", "10.0.0.1"));
        assert!(!matches("127.0.0.1", "::1"));
    }

    #[test]
    fn test_malformed_never_matches() {
        assert!(!matches("10.0.0.0/8", "not-an-ip"));
        assert!(!matches("garbage", "10.0.0.1"));
        assert!(!matches("10.0.0.0/40", "10.0.0.1"));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("10.1.2.3/8").unwrap(), "10.0.0.0/8");
        assert_eq!(normalize("192.168.1.77").unwrap(), "192.168.1.77");
        assert_eq!(normalize("fe80::1234/10").unwrap(), "fe80::/10");
        assert_eq!(normalize("0:0:0:0:0:0:0:1").unwrap(), "::1");
        assert!(normalize("10.0.0.0/0").is_err());
        assert!(normalize("10.0.0.0/33").is_err());
        assert!(normalize("::/129").is_err());
        assert!(normalize("example.com").is_err());
    }

    #[test]
    fn test_admission() {
        let client: IpAddr = "10.5.5.5".parse().unwrap();
        let none: [&str; 0] = [];
        assert!(is_admitted(&none, &none, &client));
        assert!(!is_admitted(&none, &["10.0.0.0/8"], &client));
        assert!(is_admitted(&["10.0.0.0/8"], &none, &client));
        assert!(!is_admitted(&["127.0.0.0/8"], &none, &client));
        // deny wins over grant
        assert!(!is_admitted(&["10.0.0.0/8"], &["10.5.5.5"], &client));
    }
}
