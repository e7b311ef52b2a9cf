use crate::error::{WifiError, WifiResult};
use std::net::IpAddr;

/// Check that `mac` is a usable unicast hardware address
pub fn validate_mac(mac: &str) -> WifiResult<[u8; 6]> {
    let invalid = |reason: String| WifiError::InvalidMac {
        mac: mac.to_string(),
        reason,
    };

    let parts: Vec<&str> = mac.split(':').collect();
    if parts.len() != 6 {
        return Err(invalid(format!("wrong number of octets ({})", parts.len())));
    }

    let mut octets = [0u8; 6];
    for (octet, part) in octets.iter_mut().zip(&parts) {
        *octet = u8::from_str_radix(part, 16)
            .map_err(|_| invalid(format!("invalid hex octet {part:?}")))?;
    }

    if octets[0] & 1 != 0 {
        return Err(invalid("multicast address".to_string()));
    }
    if octets == [0; 6] {
        return Err(invalid("all-zero address".to_string()));
    }
    // 00:00:5e:00:01:xx is reserved for VRRP virtual routers
    if octets[..5] == [0x00, 0x00, 0x5e, 0x00, 0x01] {
        return Err(invalid("VRRP address".to_string()));
    }

    Ok(octets)
}

/// Split `addr` or `addr/prefix` into its parts, dropping any `%zone` suffix
pub fn parse_address(addr: &str) -> WifiResult<(IpAddr, Option<u8>)> {
    let invalid = || WifiError::InvalidAddress(addr.to_string());

    let (ip, prefix) = match addr.split_once('/') {
        Some((ip, prefix)) => (ip, Some(prefix.parse::<u8>().map_err(|_| invalid())?)),
        None => (addr, None),
    };
    let ip = ip.split('%').next().unwrap_or(ip);
    let ip: IpAddr = ip.parse().map_err(|_| invalid())?;

    let max_prefix = if ip.is_ipv4() { 32 } else { 128 };
    if prefix.is_some_and(|p| p > max_prefix) {
        return Err(invalid());
    }
    Ok((ip, prefix))
}
