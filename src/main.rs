use clap::{ArgAction, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use secrecy::SecretString;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use wifictl::{
    config::{self, ControlConfig},
    link::{IpLink, LinkControl},
    wifi::{Band, ControlChannel, KeyMgmt, NetworkProfile, NetworkSession},
};

/// Environment variable read when `add` is given no --password
const PASSWORD_ENV: &str = "WIFICTL_PASSWORD";

/// A small command-line controller for wpa_supplicant and Linux network links
#[derive(Parser, Debug)]
#[command(
    name = "wifictl",
    about = "A small command-line controller for wpa_supplicant and Linux network links.",
    long_about = None,
    version = env!("CARGO_PKG_VERSION"),
    disable_version_flag = true
)]
struct Args {
    /// Print version information
    #[arg(short = 'V', long = "version", action = ArgAction::Version)]
    version: (),

    /// Wireless interface to manage
    #[arg(short, long, default_value = "wlan0")]
    interface: String,

    /// Directory holding wpa_supplicant control sockets
    #[arg(long, default_value = config::CTRL_IFACE_DIR)]
    ctrl_dir: PathBuf,

    /// Milliseconds to wait between SCAN and SCAN_RESULTS
    #[arg(long, default_value_t = config::SCAN_DELAY_MS)]
    scan_delay_ms: u64,

    /// Seconds to wait for each reply from wpa_supplicant
    #[arg(long, default_value_t = config::REQUEST_TIMEOUT_SECS)]
    timeout: u64,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(flatten)]
    Wifi(WifiCommand),
    /// Configure the interface itself
    Link {
        #[command(subcommand)]
        action: LinkAction,
    },
}

/// Commands sent to wpa_supplicant
#[derive(Subcommand, Debug)]
enum WifiCommand {
    /// Scan and list visible networks
    Scan,
    /// List networks configured in wpa_supplicant
    List,
    /// Select a configured network
    Connect { ssid: String },
    /// Add a visible network to wpa_supplicant's configuration
    Add {
        ssid: String,
        /// Passphrase for WPA-PSK networks (or set WIFICTL_PASSWORD)
        #[arg(long)]
        password: Option<String>,
    },
    /// Remove a configured network by id
    Remove { id: u32 },
    /// Disconnect from the current network
    Disconnect,
}

#[derive(Subcommand, Debug)]
enum LinkAction {
    /// Bring the interface up
    Up,
    /// Bring the interface down
    Down,
    /// Show state, MAC address and alias
    Show,
    /// Set the MTU
    Mtu { mtu: u32 },
    /// Set the MAC address
    Mac { mac: String },
    /// Set the interface alias
    Alias { alias: String },
    /// Add an address (`ip` or `ip/prefix`)
    AddrAdd { addr: String },
    /// Delete an address (`ip` or `ip/prefix`)
    AddrDel { addr: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    init_tracing(args.verbose)?;

    // The control socket is blocking; keep it off the async workers
    tokio::task::spawn_blocking(move || run(args)).await?
}

fn init_tracing(verbose: u8) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .wrap_err("Failed to initialize tracing subscriber")
}

fn run(args: Args) -> Result<()> {
    match args.command {
        Command::Link { action } => run_link(&args.interface, action),
        Command::Wifi(command) => {
            let config = ControlConfig {
                ctrl_dir: args.ctrl_dir,
                scan_delay: Duration::from_millis(args.scan_delay_ms),
                request_timeout: Some(Duration::from_secs(args.timeout)),
                ..ControlConfig::default()
            };
            let session = NetworkSession::open(&args.interface, &config).wrap_err_with(|| {
                format!("Failed to open control channel for {}", args.interface)
            })?;
            let result = run_wifi(&session, command);
            session.close();
            result
        }
    }
}

fn run_wifi(session: &NetworkSession<ControlChannel>, command: WifiCommand) -> Result<()> {
    match command {
        WifiCommand::Scan => print_profiles(&session.scan()?),
        WifiCommand::List => {
            println!("  {:>4}  {:<32} {:<18} FLAGS", "ID", "SSID", "BSSID");
            for network in session.list_networks()? {
                let marker = if network.is_current() { '*' } else { ' ' };
                println!(
                    "{} {:>4}  {:<32} {:<18} {}",
                    marker, network.id, network.ssid, network.bssid, network.flags
                );
            }
        }
        WifiCommand::Connect { ssid } => match session.connect(&NetworkProfile::new(&ssid))? {
            Some(id) => println!("Selected network {id} ({ssid})"),
            None => return Err(eyre!("No configured network named {ssid:?}; add it first")),
        },
        WifiCommand::Add { ssid, password } => {
            let mut profile = session
                .scan()?
                .into_iter()
                .find(|p| p.ssid == ssid)
                .ok_or_else(|| eyre!("Network {ssid:?} is not visible"))?;

            if let Some(password) = password.or_else(|| std::env::var(PASSWORD_ENV).ok()) {
                profile.set_password(SecretString::from(password));
            }

            let id = session.add_profile(&profile)?;
            info!(id, "Network added");
            println!("Added {ssid:?} as network {id}");
        }
        WifiCommand::Remove { id } => {
            session.remove_profile(id)?;
            println!("Removed network {id}");
        }
        WifiCommand::Disconnect => session.disconnect()?,
    }
    Ok(())
}

fn run_link(ifname: &str, action: LinkAction) -> Result<()> {
    let link = IpLink::new(ifname)?;
    if !link.exists() {
        return Err(eyre!("Interface {ifname} does not exist"));
    }

    match action {
        LinkAction::Up => link.set_state(true)?,
        LinkAction::Down => link.set_state(false)?,
        LinkAction::Show => {
            let state = if link.is_up()? { "up" } else { "down" };
            println!("{}: {}", link.ifname(), state);
            println!("  mac:   {}", link.mac()?.unwrap_or_else(|| "-".to_string()));
            println!("  alias: {}", link.alias()?);
        }
        LinkAction::Mtu { mtu } => link.set_mtu(mtu)?,
        LinkAction::Mac { mac } => link.set_mac(&mac)?,
        LinkAction::Alias { alias } => link.set_alias(&alias)?,
        LinkAction::AddrAdd { addr } => link.add_addr(&addr)?,
        LinkAction::AddrDel { addr } => link.del_addr(&addr)?,
    }
    Ok(())
}

fn print_profiles(profiles: &[NetworkProfile]) {
    println!("{:<32} {:>5}  {:<12} SECURITY", "SSID", "RSSI", "BANDS");
    for profile in profiles {
        let bands = join(profile.bands.iter().map(Band::as_str));
        let security = if profile.akm.is_empty() {
            "open".to_string()
        } else {
            join(profile.akm.iter().map(KeyMgmt::as_str))
        };
        println!(
            "{:<32} {:>5}  {:<12} {}",
            profile.ssid, profile.rssi, bands, security
        );
    }
}

fn join<'a>(items: impl Iterator<Item = &'a str>) -> String {
    items.collect::<Vec<_>>().join(",")
}
