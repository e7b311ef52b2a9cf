/// Typed errors for wifictl operations
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for WiFi and link operations
pub type WifiResult<T> = Result<T, WifiError>;

/// Errors that can occur while talking to wpa_supplicant or configuring a link
#[derive(Error, Debug)]
pub enum WifiError {
    #[error("Invalid interface name {0:?}")]
    InvalidInterfaceName(String),

    #[error("Control endpoint {} is already open in this process", .path.display())]
    EndpointBusy { path: PathBuf },

    #[error("Failed to bind control socket {}: {source}", .path.display())]
    Bind {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to connect to {} (is wpa_supplicant running?): {source}", .path.display())]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Connection to {} is broken after {attempts} attempt(s)", .path.display())]
    ConnectionBroken { path: PathBuf, attempts: u32 },

    #[error("Timed out waiting for reply to {command}")]
    Timeout { command: String },

    #[error("Control channel to {} is out of sync after a timed-out request; reopen it", .path.display())]
    OutOfSync { path: PathBuf },

    #[error("Reply to {command} exceeds the {limit}-byte receive buffer")]
    ReplyTruncated { command: String, limit: usize },

    #[error("Reply to {command} is not valid UTF-8")]
    InvalidUtf8 { command: String },

    #[error("Malformed {command} line {line:?}: expected {expected} fields, found {found}")]
    FieldCount {
        command: String,
        line: String,
        expected: usize,
        found: usize,
    },

    #[error("Malformed {command} reply: invalid {field} {value:?}")]
    InvalidField {
        command: String,
        field: &'static str,
        value: String,
    },

    #[error("{command} rejected by wpa_supplicant: {reply}")]
    CommandFailed { command: String, reply: String },

    #[error("Unknown network id {0}")]
    UnknownNetworkId(u32),

    #[error("Network {ssid:?} requires a password")]
    MissingPassword { ssid: String },

    #[error("Network {id} is partially configured: setting {field} failed: {source}")]
    PartialConfiguration {
        id: u32,
        field: &'static str,
        #[source]
        source: Box<WifiError>,
    },

    #[error("Invalid MAC address {mac}: {reason}")]
    InvalidMac { mac: String, reason: String },

    #[error("Invalid address {0:?}")]
    InvalidAddress(String),

    #[error("Alias cannot be empty")]
    EmptyAlias,

    #[error("Command `{command}` did not finish within {timeout:?}")]
    CommandTimeout { command: String, timeout: Duration },

    #[error("Command `{command}` failed with exit code {code}: {output}")]
    CommandExit {
        command: String,
        code: i32,
        output: String,
    },

    #[error("Unexpected `ip` output: {0}")]
    LinkInfo(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
