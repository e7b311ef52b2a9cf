//! Link configuration for wifictl
//!
//! Lifecycle and common settings of a network interface, independent of the
//! wireless session. Everything goes through `ip` with an argument vector.

mod command;
mod ip;
mod validate;

use crate::error::WifiResult;

pub use command::{CommandOutput, CommandRunner, SystemRunner};
pub use ip::IpLink;
pub use validate::{parse_address, validate_mac};

/// Lifecycle and common configuration of a network interface
pub trait LinkControl {
    fn ifname(&self) -> &str;

    fn exists(&self) -> bool;
    fn create(&self, kind: &str) -> WifiResult<()>;
    fn delete(&self) -> WifiResult<()>;

    fn set_mtu(&self, mtu: u32) -> WifiResult<()>;
    fn set_state(&self, up: bool) -> WifiResult<()>;
    fn is_up(&self) -> WifiResult<bool>;
    fn set_alias(&self, alias: &str) -> WifiResult<()>;
    fn alias(&self) -> WifiResult<String>;
    fn set_mac(&self, mac: &str) -> WifiResult<()>;
    fn mac(&self) -> WifiResult<Option<String>>;

    /// Add `addr` (`ip` or `ip/prefix`) unless it is already assigned
    fn add_addr(&self, addr: &str) -> WifiResult<()>;
    /// Delete `addr` if it is assigned
    fn del_addr(&self, addr: &str) -> WifiResult<()>;
    fn flush_addrs(&self) -> WifiResult<()>;

    /// Drop all addresses, then delete the interface
    fn remove(&self) -> WifiResult<()> {
        self.flush_addrs()?;
        self.delete()
    }
}

/// Reports whether an exact address is assigned to an interface
pub trait AddressQuery {
    fn is_addr_assigned(&self, addr: &str) -> WifiResult<bool>;
}
