//! Host network identity: the address stamped as `server_ip` on envelopes.

use std::net::IpAddr;

use thiserror::Error;

/// Used when the host has no non-loopback IPv4 address
pub const FALLBACK_SERVER_IP: &str = "localhost";

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("failed to list network interfaces: {0}")]
    Interfaces(String),
}

/// Lists the host's network interfaces as `(name, address)` pairs
#[cfg_attr(test, mockall::automock)]
pub trait InterfaceSource: Send + Sync {
    fn interfaces(&self) -> Result<Vec<(String, IpAddr)>, NetworkError>;
}

/// Interfaces reported by the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInterfaces;

impl InterfaceSource for SystemInterfaces {
    fn interfaces(&self) -> Result<Vec<(String, IpAddr)>, NetworkError> {
        local_ip_address::list_afinet_netifas().map_err(|e| NetworkError::Interfaces(e.to_string()))
    }
}

/// First non-loopback IPv4 address of the host, or [`FALLBACK_SERVER_IP`]
pub fn resolve_server_ip(source: &dyn InterfaceSource) -> String {
    let interfaces = match source.interfaces() {
        Ok(interfaces) => interfaces,
        Err(e) => {
            tracing::warn!("{}, using '{}'", e, FALLBACK_SERVER_IP);
            return FALLBACK_SERVER_IP.to_string();
        }
    };

    match interfaces
        .into_iter()
        .find(|(_, ip)| ip.is_ipv4() && !ip.is_loopback())
    {
        Some((name, ip)) => {
            tracing::debug!("Using address {} of interface '{}'", ip, name);
            ip.to_string()
        }
        None => {
            tracing::warn!(
                "No non-loopback IPv4 address found, using '{}'",
                FALLBACK_SERVER_IP
            );
            FALLBACK_SERVER_IP.to_string()
        }
    }
}
