//! WiFi management module for wifictl
//!
//! This module talks to wpa_supplicant over its control socket: it owns the
//! datagram channel, scans and merges networks, and manages the daemon's
//! configured networks.

mod connection;
mod handle;
mod profile;
mod scanning;
mod session;
mod types;

// Re-export public API
pub use connection::parse_network_list;
pub use handle::{ControlChannel, ControlTransport, validate_ifname};
pub use scanning::parse_scan_results;
pub use session::NetworkSession;
pub use types::{Band, ConfiguredNetwork, KeyMgmt, NetworkProfile};
