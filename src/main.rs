//! Midas monitor
//!
//! Feeds raw MIDI (hex, from arguments or stdin one message per line) through
//! a device profile and prints the decoded control events, the feedback sent
//! back to the device and the matching MDDS signals.

use anyhow::Result;
use clap::Parser;
use colored::*;
use midas_engine::app::{CallbackApplication, MidasOutputEvent};
use midas_engine::config::{load_default_profile, DeviceProfile};
use midas_engine::mdds::{MonotonicClock, SignalMap, DAW_ALL, DEVICE_ALL};
use midas_engine::message::Direction;
use midas_engine::midi::{format_hex, parse_hex, WireEvent};
use midas_engine::os::MidasOs;
use midas_engine::output::LogOutput;
use std::io::{self, BufRead};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const PAGE: &str = "Main";

/// Midas - decode controller MIDI into semantic control events
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Device profile (YAML); the embedded MiniLab mkII profile otherwise
    #[arg(short, long, env = "MIDAS_PROFILE")]
    profile: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Print the profile's controls and messages, then exit
    #[arg(long)]
    list: bool,

    /// Decode these hex messages instead of reading stdin
    #[arg(short, long, num_args = 1..)]
    decode: Vec<String>,

    /// Port the messages arrive on
    #[arg(long, default_value = "0")]
    port: u8,

    /// Print MDDS signals as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level)?;

    info!("🎹 Midas v{}", env!("CARGO_PKG_VERSION"));

    let profile = match &args.profile {
        Some(path) => DeviceProfile::load(path)?,
        None => load_default_profile()?,
    };

    if args.list {
        return list_profile(&profile);
    }

    let mut monitor = Monitor::new(&profile, args.json)?;

    if !args.decode.is_empty() {
        for message in &args.decode {
            monitor.feed(args.port, message)?;
        }
        return Ok(());
    }

    info!("Reading hex messages from stdin");
    for line in io::stdin().lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Err(e) = monitor.feed(args.port, line) {
            warn!("⚠️  {:#}", e);
        }
    }

    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

/// One echo application on a single page, plus the profile's signal map
struct Monitor {
    os: MidasOs,
    signals: SignalMap,
    clock: MonotonicClock,
    json: bool,
}

impl Monitor {
    fn new(profile: &DeviceProfile, json: bool) -> Result<Self> {
        let mut os = MidasOs::with_options(Box::new(LogOutput::new(profile.name.clone())), profile.os);

        let app = CallbackApplication::new("monitor", profile.registries()?, |event, outbox| {
            println!("  {} {}", "→".green(), event);
            outbox.emit(MidasOutputEvent::new(event.control, event.command, event.value));
        })
        .with_codes(profile.message_codes()?)
        .with_sysex_handler(|name, message, _| {
            let params: Vec<String> = message
                .message()
                .params()
                .iter()
                .filter_map(|(param, _)| message.param(param).map(|v| format!("{}={}", param, format_hex(v))))
                .collect();
            println!("  {} {} {}", "→".green(), name.yellow(), params.join(" "));
        });

        os.add_page(PAGE);
        os.add_application(PAGE, Box::new(app))?;
        os.switch_page(PAGE)?;
        os.alt_tab(PAGE, 0)?;

        Ok(Self {
            os,
            signals: profile.signal_map()?,
            clock: MonotonicClock::new(),
            json,
        })
    }

    fn feed(&mut self, port: u8, text: &str) -> Result<()> {
        let bytes = parse_hex(text)?;
        let event = WireEvent::from_raw(port, &bytes)?;
        println!("{} {}", "◆".cyan(), event.to_string().bold());

        if self.os.process(&event) == 0 {
            println!("  {}", "(no control)".dimmed());
        }

        if let Some(envelope) = self.signals.translate(&event, DEVICE_ALL, DAW_ALL, self.clock.now()) {
            if self.json {
                println!("  {}", serde_json::to_string(&envelope)?);
            } else {
                println!("  {} {}", "⇢".magenta(), envelope);
            }
        }
        Ok(())
    }
}

fn list_profile(profile: &DeviceProfile) -> Result<()> {
    let registries = profile.registries()?;
    let codes = profile.message_codes()?;

    println!("\n{}", format!("=== {} ===", profile.name).bold().cyan());

    println!("\n{}", "Commands:".bold());
    for (command, status) in registries.command_map.iter() {
        println!("  {:<18} {}", command.to_string().yellow(), format!("{:02X}", status).green());
    }

    for (title, map) in [("Buttons:", &registries.button_map), ("Controllers:", &registries.controller_map)] {
        println!("\n{} {}", title.bold(), map.len().to_string().green());
        for (control, address) in map.iter() {
            match address {
                Some(address) => println!("  {} {}", control, address),
                None => println!("  {} {}", control, "(unbound)".dimmed()),
            }
        }
    }

    for direction in [Direction::Input, Direction::Output] {
        println!("\n{}", format!("Messages ({}):", direction).bold());
        for (name, message) in codes.midi_messages(direction) {
            println!("  {:<18} {}", name.yellow(), message);
        }
        for (name, message) in codes.sysex_messages(direction) {
            println!("  {:<18} {}", name.yellow(), message);
        }
    }

    let signals = profile.signal_map()?;
    println!(
        "\n{} {} MIDI, {} sysex",
        "MDDS signals:".bold(),
        signals.midi_len().to_string().green(),
        signals.sysex_len().to_string().green()
    );

    println!("\n{}", "✅ Profile OK".green().bold());
    Ok(())
}
