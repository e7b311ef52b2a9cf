//! wifictl: a client for wpa_supplicant's control interface, plus the
//! iproute2 link settings that go with it.

pub mod config;
pub mod error;
pub mod link;
pub mod wifi;

pub use error::{WifiError, WifiResult};
