// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Orvibo control CLI
//!
//! # Usage
//!
//! ```bash
//! # Find sockets on the LAN
//! orvibo-ctl discover --broadcast 192.168.1.255
//!
//! # Read and change the power state
//! orvibo-ctl state --host 192.168.1.42 --mac ac:cf:23:93:34:9c
//! orvibo-ctl set --host 192.168.1.42 --mac ac:cf:23:93:34:9c on
//!
//! # Dump whatever arrives on port 10000 for 10 seconds
//! orvibo-ctl listen --port 10000 --timeout-ms 10000
//!
//! # Using a configuration file
//! orvibo-ctl --config orvibo.toml discover
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use orvibo_udp::{
    discover, open_local_endpoint, Datagram, LocalEndpoint, MacAddress, OrviboConfig, Verdict,
    S20,
};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Orvibo smart socket control
#[derive(Parser, Debug)]
#[command(name = "orvibo-ctl")]
#[command(about = "Discover and switch Orvibo smart sockets over UDP")]
#[command(version)]
struct Args {
    /// Configuration file path (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Local address to bind
    #[arg(long, global = true)]
    bind: Option<IpAddr>,

    /// Mailbox capacity in datagrams (0 = unbounded)
    #[arg(long, global = true)]
    queue_size: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Broadcast a discovery request and list the devices that answer
    Discover {
        /// Broadcast address
        #[arg(short, long)]
        broadcast: Option<Ipv4Addr>,

        /// Per-attempt timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Number of attempts
        #[arg(long)]
        retries: Option<u32>,
    },

    /// Subscribe to a socket and print its power state
    State {
        /// Socket IP address
        #[arg(long)]
        host: IpAddr,

        /// Socket MAC address
        #[arg(long)]
        mac: MacAddress,
    },

    /// Switch a socket on or off
    Set {
        /// Socket IP address
        #[arg(long)]
        host: IpAddr,

        /// Socket MAC address
        #[arg(long)]
        mac: MacAddress,

        /// Requested power state
        #[arg(value_enum)]
        state: Power,
    },

    /// Print every datagram received during one listening pass
    Listen {
        /// Local port (defaults to the configured local port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Listening time in milliseconds
        #[arg(long, default_value = "5000")]
        timeout_ms: u64,
    },

    /// Generate a default configuration file
    GenConfig {
        /// Output file path
        #[arg(short, long, default_value = "orvibo.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file path
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Power {
    On,
    Off,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = build_config(&args)?;

    let level = args.log_level.as_deref().unwrap_or(&config.log_level);
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match args.command {
        Commands::Discover {
            broadcast,
            timeout_ms,
            retries,
        } => {
            let mut config = config;
            if let Some(broadcast) = broadcast {
                config.device.broadcast_address = broadcast;
            }
            if let Some(timeout_ms) = timeout_ms {
                config.device.discovery_timeout_ms = timeout_ms;
            }
            if let Some(retries) = retries {
                config.device.discovery_retries = retries;
            }
            config.validate()?;
            cmd_discover(&config).await
        }
        Commands::State { host, mac } => cmd_state(&config, host, mac).await,
        Commands::Set { host, mac, state } => cmd_set(&config, host, mac, state).await,
        Commands::Listen { port, timeout_ms } => {
            let port = port.unwrap_or(config.device.local_port);
            cmd_listen(&config, port, Duration::from_millis(timeout_ms)).await
        }
        Commands::GenConfig { output } => cmd_gen_config(output),
        Commands::Validate { config } => cmd_validate(config),
    }
}

fn build_config(args: &Args) -> Result<OrviboConfig, Box<dyn std::error::Error>> {
    let mut config = match args.config {
        Some(ref path) => OrviboConfig::from_file(path)?,
        None => OrviboConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.transport.bind_address = bind;
    }
    if let Some(queue_size) = args.queue_size {
        config.transport.queue_size = queue_size;
    }
    Ok(config)
}

async fn open_endpoint(
    config: &OrviboConfig,
    port: u16,
) -> Result<LocalEndpoint, Box<dyn std::error::Error>> {
    let bind = config.transport.bind_address.to_string();
    let endpoint = open_local_endpoint(&bind, port, &config.transport).await?;
    info!("Listening on {}", endpoint.address()?);
    Ok(endpoint)
}

async fn open_s20(
    config: &OrviboConfig,
    host: IpAddr,
    mac: MacAddress,
) -> Result<S20, Box<dyn std::error::Error>> {
    let address = SocketAddr::new(host, config.device.port);
    Ok(S20::open(address, mac, &config.transport, config.device.clone()).await?)
}

async fn cmd_discover(config: &OrviboConfig) -> Result<(), Box<dyn std::error::Error>> {
    let endpoint = open_endpoint(config, config.device.local_port).await?;
    let devices = discover(&endpoint, &config.device).await?;
    endpoint.close();

    if devices.is_empty() {
        println!("No devices found");
        return Ok(());
    }
    println!("{:<18} {:<22} TYPE", "MAC", "ADDRESS");
    for device in &devices {
        println!(
            "{:<18} {:<22} {}",
            device.mac.to_string(),
            device.address.to_string(),
            device.device_type
        );
    }
    Ok(())
}

async fn cmd_state(
    config: &OrviboConfig,
    host: IpAddr,
    mac: MacAddress,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut s20 = open_s20(config, host, mac).await?;
    if !s20.subscribe().await? {
        eprintln!("No answer from {} ({})", mac, host);
        std::process::exit(1);
    }
    println!("{}: {}", mac, describe(s20.state()));
    Ok(())
}

async fn cmd_set(
    config: &OrviboConfig,
    host: IpAddr,
    mac: MacAddress,
    power: Power,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut s20 = open_s20(config, host, mac).await?;
    if !s20.state_change(power == Power::On).await? {
        eprintln!("State change on {} ({}) not confirmed", mac, host);
        std::process::exit(1);
    }
    println!("{}: {}", mac, describe(s20.state()));
    Ok(())
}

async fn cmd_listen(
    config: &OrviboConfig,
    port: u16,
    timeout: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let endpoint = open_endpoint(config, port).await?;
    let outcome = endpoint
        .listen(timeout, |_| Verdict::AddAndContinueWaiting)
        .await?;
    endpoint.close();

    let datagrams = outcome.map(|o| o.into_datagrams()).unwrap_or_default();
    for datagram in &datagrams {
        print_datagram(datagram);
    }
    println!("{} datagram(s) received", datagrams.len());
    Ok(())
}

fn cmd_gen_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let content = format!(
        r#"# Orvibo Configuration
# Generated by orvibo-ctl gen-config

{}"#,
        OrviboConfig::default().to_toml_string()?
    );
    std::fs::write(&output, content)?;
    println!("Generated configuration file: {}", output.display());
    Ok(())
}

fn cmd_validate(config_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    match OrviboConfig::from_file(&config_path) {
        Ok(config) => {
            println!("Configuration valid!");
            println!();
            println!(
                "Bind:      {}:{}",
                config.transport.bind_address, config.device.local_port
            );
            println!(
                "Broadcast: {}:{}",
                config.device.broadcast_address, config.device.port
            );
            println!(
                "Queue:     {}",
                match config.transport.queue_size {
                    0 => "unbounded".to_string(),
                    n => n.to_string(),
                }
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration invalid: {}", e);
            std::process::exit(1);
        }
    }
}

fn describe(state: Option<bool>) -> &'static str {
    match state {
        Some(true) => "on",
        Some(false) => "off",
        None => "unknown",
    }
}

fn print_datagram(datagram: &Datagram) {
    println!(
        "{:<22} {:>5} B  {}",
        datagram.peer.to_string(),
        datagram.payload.len(),
        hex(&datagram.payload)
    );
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_set() {
        let args = Args::parse_from([
            "orvibo-ctl",
            "set",
            "--host",
            "192.168.1.42",
            "--mac",
            "ac:cf:23:93:34:9c",
            "on",
        ]);
        match args.command {
            Commands::Set { host, mac, state } => {
                assert_eq!(host, IpAddr::V4(Ipv4Addr::new(192, 168, 1, 42)));
                assert_eq!(mac.to_string(), "ac:cf:23:93:34:9c");
                assert_eq!(state, Power::On);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_bad_mac_rejected() {
        let result = Args::try_parse_from([
            "orvibo-ctl",
            "state",
            "--host",
            "192.168.1.42",
            "--mac",
            "not-a-mac",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_overrides() {
        let args = Args::parse_from(["orvibo-ctl", "discover", "--queue-size", "8"]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.transport.queue_size, 8);
        assert_eq!(config.device, OrviboConfig::default().device);
    }

    #[test]
    fn test_hex_and_describe() {
        assert_eq!(hex(&[0x68, 0x64, 0x00, 0x06]), "68 64 00 06");
        assert_eq!(hex(&[]), "");
        assert_eq!(describe(Some(true)), "on");
        assert_eq!(describe(None), "unknown");
    }
}
