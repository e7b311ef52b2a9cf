use crate::config;
use crate::error::{WifiError, WifiResult};
use crate::link::command::{CommandRunner, SystemRunner};
use crate::link::validate::{parse_address, validate_mac};
use crate::link::{AddressQuery, LinkControl};
use crate::wifi::validate_ifname;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

const IP: &str = "ip";

/// Entry of `ip -json -details link show`
#[derive(Debug, Deserialize)]
struct LinkDetails {
    #[serde(default)]
    flags: Vec<String>,
    #[serde(default)]
    ifalias: Option<String>,
    #[serde(default)]
    address: Option<String>,
}

/// Entry of `ip -json addr show`
#[derive(Debug, Deserialize)]
struct AddrDetails {
    #[serde(default)]
    addr_info: Vec<AddrInfo>,
}

#[derive(Debug, Deserialize)]
struct AddrInfo {
    local: Option<String>,
    prefixlen: Option<u8>,
}

/// A network link configured through iproute2
#[derive(Debug)]
pub struct IpLink<R = SystemRunner> {
    ifname: String,
    runner: R,
    sysfs_dir: PathBuf,
}

impl IpLink<SystemRunner> {
    pub fn new(ifname: &str) -> WifiResult<Self> {
        let timeout = Duration::from_secs(config::COMMAND_TIMEOUT_SECS);
        Self::with_runner(ifname, SystemRunner::with_timeout(timeout))
    }
}

impl<R: CommandRunner> IpLink<R> {
    pub fn with_runner(ifname: &str, runner: R) -> WifiResult<Self> {
        validate_ifname(ifname)?;
        Ok(Self {
            ifname: ifname.to_string(),
            runner,
            sysfs_dir: PathBuf::from(config::SYSFS_NET_DIR),
        })
    }

    /// Look up interfaces under `dir` instead of /sys/class/net
    pub fn with_sysfs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.sysfs_dir = dir.into();
        self
    }

    fn ip(&self, args: &[&str]) -> WifiResult<String> {
        self.runner.run_checked(IP, args, &[0])
    }

    fn details(&self) -> WifiResult<Option<LinkDetails>> {
        let out = self.ip(&["-json", "-details", "link", "show", "dev", &self.ifname])?;
        let mut links: Vec<LinkDetails> = serde_json::from_str(&out)?;
        Ok(if links.is_empty() {
            None
        } else {
            Some(links.swap_remove(0))
        })
    }
}

impl<R: CommandRunner> LinkControl for IpLink<R> {
    fn ifname(&self) -> &str {
        &self.ifname
    }

    fn exists(&self) -> bool {
        self.sysfs_dir.join(&self.ifname).exists()
    }

    fn create(&self, kind: &str) -> WifiResult<()> {
        self.ip(&["link", "add", "dev", &self.ifname, "type", kind])?;
        info!("Created {} link {}", kind, self.ifname);
        Ok(())
    }

    fn delete(&self) -> WifiResult<()> {
        self.ip(&["link", "del", "dev", &self.ifname])?;
        info!("Deleted link {}", self.ifname);
        Ok(())
    }

    fn set_mtu(&self, mtu: u32) -> WifiResult<()> {
        self.ip(&["link", "set", "dev", &self.ifname, "mtu", &mtu.to_string()])?;
        Ok(())
    }

    fn set_state(&self, up: bool) -> WifiResult<()> {
        let state = if up { "up" } else { "down" };
        self.ip(&["link", "set", "dev", &self.ifname, state])?;
        Ok(())
    }

    fn is_up(&self) -> WifiResult<bool> {
        Ok(self
            .details()?
            .is_some_and(|link| link.flags.iter().any(|flag| flag == "UP")))
    }

    fn set_alias(&self, alias: &str) -> WifiResult<()> {
        if alias.is_empty() {
            return Err(WifiError::EmptyAlias);
        }
        self.ip(&["link", "set", "dev", &self.ifname, "alias", alias])?;
        Ok(())
    }

    fn alias(&self) -> WifiResult<String> {
        Ok(self
            .details()?
            .and_then(|link| link.ifalias)
            .unwrap_or_default())
    }

    fn set_mac(&self, mac: &str) -> WifiResult<()> {
        validate_mac(mac)?;
        self.ip(&["link", "set", "dev", &self.ifname, "address", mac])?;
        Ok(())
    }

    fn mac(&self) -> WifiResult<Option<String>> {
        Ok(self.details()?.and_then(|link| link.address))
    }

    fn add_addr(&self, addr: &str) -> WifiResult<()> {
        if self.is_addr_assigned(addr)? {
            debug!("{} already has {}", self.ifname, addr);
            return Ok(());
        }
        self.ip(&["addr", "add", addr, "dev", &self.ifname])?;
        Ok(())
    }

    fn del_addr(&self, addr: &str) -> WifiResult<()> {
        if !self.is_addr_assigned(addr)? {
            debug!("{} does not have {}", self.ifname, addr);
            return Ok(());
        }
        self.ip(&["addr", "del", addr, "dev", &self.ifname])?;
        Ok(())
    }

    fn flush_addrs(&self) -> WifiResult<()> {
        self.ip(&["addr", "flush", "dev", &self.ifname])?;
        Ok(())
    }
}

impl<R: CommandRunner> AddressQuery for IpLink<R> {
    fn is_addr_assigned(&self, addr: &str) -> WifiResult<bool> {
        let (wanted, prefix) = parse_address(addr)?;

        let output = self
            .runner
            .run(IP, &["-json", "addr", "show", "dev", &self.ifname])?;
        if output.code != 0 {
            // No such device
            return Ok(false);
        }

        let entries: Vec<AddrDetails> = serde_json::from_str(&output.stdout)?;
        let assigned = entries
            .iter()
            .flat_map(|entry| &entry.addr_info)
            .filter_map(|info| {
                let local = info.local.as_deref()?;
                let (ip, _) = parse_address(local).ok()?;
                Some((ip, info.prefixlen))
            })
            .any(|(ip, len)| ip == wanted && (prefix.is_none() || prefix == len));
        Ok(assigned)
    }
}
