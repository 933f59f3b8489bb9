//! cdc-agent: emulates a 6-disc CD changer on the I/K-bus and bridges its
//! playback commands to MPRIS players on the D-Bus session bus.
//!
//! One dispatch loop owns all state; reader threads (bus socket, D-Bus
//! presence and metadata watchers, ctrl-c) only funnel events into its
//! channel.

mod bus;
mod config;
mod error;
mod mpris;

use std::path::PathBuf;
use std::thread;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use zbus::blocking::Connection;

use cdc_core::{BusTransport, Changer, DispatchLoop, LoopEvent, Magazine};
use ibus_protocol::MAX_FRAME_SIZE;

use crate::bus::UnixDatagramBus;
use crate::error::AgentError;
use crate::mpris::MprisFactory;

#[derive(Parser)]
#[command(name = "cdc-agent")]
#[command(about = "I/K-bus CD changer emulator bridging to MPRIS players")]
struct Args {
    /// Config file. Defaults to $XDG_CONFIG_HOME/cdc/cdc.yaml, then
    /// /etc/cdc.yaml.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Unix datagram socket of the bus bridge daemon.
    #[arg(short, long, default_value = "/run/ikbus/bridge.sock")]
    bus: PathBuf,

    /// Local socket path to bind for receiving frames.
    #[arg(short, long, default_value = "/run/ikbus/cdc.sock")]
    local: PathBuf,
}

fn main() -> Result<(), AgentError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config_path = args
        .config
        .clone()
        .or_else(config::default_path)
        .ok_or(AgentError::ConfigNotFound)?;
    let config = config::load(&config_path)?;
    if config.is_empty() {
        return Err(AgentError::EmptyMagazine);
    }

    let transport = UnixDatagramBus::connect(&args.local, &args.bus)?;
    let reader = transport.try_clone()?;

    let (events, loop_events) = crossbeam_channel::unbounded();

    let shutdown = events.clone();
    ctrlc::set_handler(move || {
        let _ = shutdown.send(LoopEvent::Shutdown);
    })?;

    spawn_bus_reader(reader, events.clone())?;

    let connection = Connection::session()?;
    mpris::spawn_presence_watcher(&connection, events.clone())?;

    let changer = Changer::new(transport);
    let magazine = Magazine::new(config.slots.clone());
    let factory = MprisFactory::new(connection.clone(), events.clone());

    // Players that were already running get their discs loaded up front.
    mpris::scan_existing_players(&connection, &events)?;

    info!(config = %config_path.display(), bus = %args.bus.display(), "cdc agent running");
    DispatchLoop::new(changer, magazine, factory, loop_events).run();
    info!("cdc agent stopped");
    Ok(())
}

/// Pump frames from the bus socket into the dispatch channel. A read error
/// on a datagram socket is unrecoverable here, so it shuts the agent down.
fn spawn_bus_reader(
    mut reader: UnixDatagramBus,
    events: crossbeam_channel::Sender<LoopEvent>,
) -> Result<(), AgentError> {
    thread::Builder::new()
        .name("bus-reader".into())
        .spawn(move || {
            let mut buf = [0u8; MAX_FRAME_SIZE];
            loop {
                match reader.read_frame(&mut buf) {
                    Ok(len) => {
                        if events.send(LoopEvent::Frame(buf[..len].to_vec())).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "bus read failed");
                        let _ = events.send(LoopEvent::Shutdown);
                        break;
                    }
                }
            }
        })
        .map_err(AgentError::Bus)?;
    Ok(())
}
