/// Centralized configuration constants for wifictl
use std::path::PathBuf;
use std::time::Duration;

// Control channel locations
pub const CTRL_IFACE_DIR: &str = "/var/run/wpa_supplicant";
pub const LOCAL_SOCKET_DIR: &str = "/tmp";
pub const APP_TAG: &str = "wifictl";

// Protocol limits
pub const REPLY_BUFFER_SIZE: usize = 4096;
pub const HANDSHAKE_ATTEMPTS: u32 = 5;

// Timing
pub const HANDSHAKE_DEADLINE_MS: u64 = 5000;
pub const REQUEST_TIMEOUT_SECS: u64 = 10;
pub const SCAN_DELAY_MS: u64 = 2000;
pub const COMMAND_TIMEOUT_SECS: u64 = 10;

// Link introspection
pub const SYSFS_NET_DIR: &str = "/sys/class/net";

/// Longest interface name the kernel accepts (IFNAMSIZ minus the NUL)
pub const MAX_IFNAME_LEN: usize = 15;

/// Runtime settings for a control channel and the session built on it
#[derive(Debug, Clone)]
pub struct ControlConfig {
    /// Directory holding wpa_supplicant's per-interface control sockets
    pub ctrl_dir: PathBuf,
    /// Directory where the client binds its own socket
    pub local_dir: PathBuf,
    /// Prefix of the client socket file name
    pub app_tag: String,
    pub reply_buffer: usize,
    pub handshake_attempts: u32,
    /// Overall wall-clock budget for the PING/PONG handshake
    pub handshake_deadline: Duration,
    /// Read timeout for ordinary requests; `None` blocks forever
    pub request_timeout: Option<Duration>,
    /// Pause between SCAN and SCAN_RESULTS
    pub scan_delay: Duration,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            ctrl_dir: PathBuf::from(CTRL_IFACE_DIR),
            local_dir: PathBuf::from(LOCAL_SOCKET_DIR),
            app_tag: APP_TAG.to_string(),
            reply_buffer: REPLY_BUFFER_SIZE,
            handshake_attempts: HANDSHAKE_ATTEMPTS,
            handshake_deadline: Duration::from_millis(HANDSHAKE_DEADLINE_MS),
            request_timeout: Some(Duration::from_secs(REQUEST_TIMEOUT_SECS)),
            scan_delay: Duration::from_millis(SCAN_DELAY_MS),
        }
    }
}

impl ControlConfig {
    /// Path of the client's own socket for `ifname`
    pub fn local_socket_path(&self, ifname: &str) -> PathBuf {
        self.local_dir.join(format!("{}_{}", self.app_tag, ifname))
    }

    /// Path of wpa_supplicant's control socket for `ifname`
    pub fn remote_socket_path(&self, ifname: &str) -> PathBuf {
        self.ctrl_dir.join(ifname)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_paths_follow_interface_name() {
        let config = ControlConfig::default();
        assert_eq!(
            config.local_socket_path("wlan0"),
            PathBuf::from("/tmp/wifictl_wlan0")
        );
        assert_eq!(
            config.remote_socket_path("wlan0"),
            PathBuf::from("/var/run/wpa_supplicant/wlan0")
        );
    }
}
