use secrecy::SecretString;
use std::collections::BTreeSet;
use std::fmt;

/// Frequency band a network was seen on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Band {
    Ghz2_4,
    Ghz5,
}

impl Band {
    /// Map a channel center frequency in MHz to its band, if it has one
    pub fn from_mhz(freq: u32) -> Option<Band> {
        match freq {
            2412..=2484 => Some(Band::Ghz2_4),
            4915..=5825 => Some(Band::Ghz5),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Band::Ghz2_4 => "2.4GHz",
            Band::Ghz5 => "5GHz",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication / key management scheme advertised in scan flags.
///
/// Variants are ordered; the greatest scheme of a profile decides how it is
/// configured on the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyMgmt {
    WpaPsk,
    Wpa2Psk,
    WpaEap,
    Wpa2Eap,
}

impl KeyMgmt {
    pub const ALL: [KeyMgmt; 4] = [
        KeyMgmt::WpaPsk,
        KeyMgmt::Wpa2Psk,
        KeyMgmt::WpaEap,
        KeyMgmt::Wpa2Eap,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyMgmt::WpaPsk => "WPA-PSK",
            KeyMgmt::Wpa2Psk => "WPA2-PSK",
            KeyMgmt::WpaEap => "WPA-EAP",
            KeyMgmt::Wpa2Eap => "WPA2-EAP",
        }
    }

    /// Schemes whose identifier appears in a raw flags field such as
    /// `[WPA2-PSK-CCMP][ESS]`
    pub fn detect(flags: &str) -> impl Iterator<Item = KeyMgmt> + '_ {
        KeyMgmt::ALL
            .into_iter()
            .filter(move |akm| flags.contains(akm.as_str()))
    }

    pub fn is_psk(&self) -> bool {
        matches!(self, KeyMgmt::WpaPsk | KeyMgmt::Wpa2Psk)
    }

    /// `key_mgmt` and `proto` values written with SET_NETWORK
    pub fn network_settings(&self) -> (&'static str, Option<&'static str>) {
        match self {
            KeyMgmt::WpaPsk | KeyMgmt::Wpa2Psk => ("WPA-PSK", Some("WPA")),
            KeyMgmt::WpaEap | KeyMgmt::Wpa2Eap => ("WPA-EAP", Some("RSN")),
        }
    }
}

impl fmt::Display for KeyMgmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A network seen in scan results, merged across all BSSes sharing its SSID
#[derive(Debug, Default)]
pub struct NetworkProfile {
    pub ssid: String,
    pub rssi: i32,
    pub bands: BTreeSet<Band>,
    pub akm: BTreeSet<KeyMgmt>,
    password: Option<SecretString>,
}

impl NetworkProfile {
    pub fn new(ssid: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            ..Default::default()
        }
    }

    /// Scheme used when the profile is added to the daemon
    pub fn preferred_key_mgmt(&self) -> Option<KeyMgmt> {
        self.akm.last().copied()
    }

    pub fn set_password(&mut self, password: SecretString) {
        self.password = Some(password);
    }

    pub fn password(&self) -> Option<&SecretString> {
        self.password.as_ref()
    }

    /// Fold another sighting of the same SSID into this profile
    pub fn merge(&mut self, other: NetworkProfile) {
        self.rssi = self.rssi.max(other.rssi);
        self.bands.extend(other.bands);
        self.akm.extend(other.akm);
    }
}

/// A network stored in wpa_supplicant's configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfiguredNetwork {
    pub id: u32,
    pub ssid: String,
    pub bssid: String,
    pub flags: String,
}

impl ConfiguredNetwork {
    pub fn is_current(&self) -> bool {
        self.flags.contains("[CURRENT]")
    }
}
