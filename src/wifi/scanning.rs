use crate::error::{WifiError, WifiResult};
use crate::wifi::handle::ControlTransport;
use crate::wifi::session::{
    NetworkSession, SCAN, SCAN_RESULTS, ensure_reply, split_fields, table_rows,
};
use crate::wifi::types::{Band, KeyMgmt, NetworkProfile};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::debug;

impl<T: ControlTransport> NetworkSession<T> {
    /// Trigger a scan and return the visible networks, one per SSID
    pub fn scan(&self) -> WifiResult<Vec<NetworkProfile>> {
        let reply = self.request_text(SCAN)?;
        // FAIL-BUSY means a scan is already running; its results serve as well
        ensure_reply(SCAN, &reply, &["OK", "FAIL-BUSY"])?;

        debug!("Waiting {:?} for scan results", self.scan_delay());
        std::thread::sleep(self.scan_delay());

        let results = self.request_text(SCAN_RESULTS)?;
        parse_scan_results(&results)
    }
}

/// Parse a SCAN_RESULTS reply, merging rows that share an SSID.
///
/// Rows are `bssid \t frequency \t signal level \t flags \t ssid`. The merged
/// profile keeps the strongest signal and the union of bands and schemes.
/// Profiles are ordered by signal strength, strongest first.
pub fn parse_scan_results(reply: &str) -> WifiResult<Vec<NetworkProfile>> {
    let mut profiles: HashMap<String, NetworkProfile> = HashMap::new();

    for line in table_rows(reply) {
        let profile = parse_scan_row(line)?;
        match profiles.entry(profile.ssid.clone()) {
            Entry::Occupied(entry) => entry.into_mut().merge(profile),
            Entry::Vacant(entry) => {
                entry.insert(profile);
            }
        }
    }

    let mut list: Vec<NetworkProfile> = profiles.into_values().collect();
    list.sort_by(|a, b| b.rssi.cmp(&a.rssi).then_with(|| a.ssid.cmp(&b.ssid)));
    Ok(list)
}

fn parse_scan_row(line: &str) -> WifiResult<NetworkProfile> {
    let fields = split_fields(SCAN_RESULTS, line, 5)?;

    let frequency: u32 = parse_field("frequency", fields[1])?;
    let rssi: i32 = parse_field("signal level", fields[2])?;

    let mut profile = NetworkProfile::new(fields[4]);
    profile.rssi = rssi;
    profile.bands.extend(Band::from_mhz(frequency));
    profile.akm.extend(KeyMgmt::detect(fields[3]));
    Ok(profile)
}

fn parse_field<N: std::str::FromStr>(field: &'static str, value: &str) -> WifiResult<N> {
    value.trim().parse().map_err(|_| WifiError::InvalidField {
        command: SCAN_RESULTS.to_string(),
        field,
        value: value.to_string(),
    })
}
