//! mousegestr – Mouse gesture recognition for Linux pointer devices.
//!
//! CLI entry point.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use std::sync::atomic::Ordering;
use std::time::SystemTime;

use clap::Parser;
use log::{Level, LevelFilter, Log, Metadata, Record};

use mousegestr::manager::{GestureManager, format_pattern, list_pointer_devices};
use mousegestr::session::SessionEvent;

#[derive(Parser)]
#[command(name = "mousegestr", about = "Mouse gesture recognition")]
struct Cli {
    /// Path to configuration file
    #[arg(default_value = "/etc/mousegestr/gestures.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// List available pointer devices and exit
    #[arg(short, long)]
    list_devices: bool,

    /// Replay a recorded pointer trace and print what it resolves to
    #[arg(long, value_name = "TRACE", conflicts_with = "record")]
    replay: Option<PathBuf>,

    /// Extract a gesture pattern from a recorded pointer trace
    #[arg(long, value_name = "TRACE")]
    record: Option<PathBuf>,
}

/// Simple logger that writes to stderr and optionally to a log file.
struct MousegestrLogger {
    level: LevelFilter,
    file: Option<Mutex<std::fs::File>>,
}

impl Log for MousegestrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.target().starts_with("mousegestr")
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let secs = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let level = match record.level() {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        };
        let line = format!("[{secs} {level} mousegestr] {}\n", record.args());

        // Write to stderr (→ journald when running as systemd service)
        eprint!("{line}");

        // Write to log file if configured
        if let Some(ref file_mutex) = self.file {
            if let Ok(mut f) = file_mutex.lock() {
                let _ = f.write_all(line.as_bytes());
            }
        }
    }

    fn flush(&self) {
        if let Some(ref file_mutex) = self.file {
            if let Ok(mut f) = file_mutex.lock() {
                let _ = f.flush();
            }
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.list_devices {
        return list_pointer_devices();
    }

    // Parse config first (before logger init) so we can read the configured log level.
    let mut manager = match GestureManager::new(&cli.config) {
        Ok(m) => m,
        Err(e) => {
            eprintln!(
                "Error: {e}\n\n\
                 To find available pointer devices, run:\n\
                 \x20 mousegestr --list-devices"
            );
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging: CLI --verbose overrides the config file setting.
    let log_level: LevelFilter = if cli.verbose {
        LevelFilter::Debug
    } else {
        manager
            .config_log_level()
            .parse()
            .unwrap_or(LevelFilter::Info)
    };

    let log_file = manager.config_log_file().and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(Mutex::new(file)),
            Err(e) => {
                eprintln!("Warning: cannot open log file '{path}': {e}");
                None
            }
        }
    });

    let logger = MousegestrLogger {
        level: log_level,
        file: log_file,
    };
    log::set_boxed_logger(Box::new(logger)).expect("Failed to set logger");
    log::set_max_level(log_level);

    manager.check_gestures();

    if let Some(trace) = cli.replay.as_deref() {
        return replay(&manager, trace);
    }
    if let Some(trace) = cli.record.as_deref() {
        return record(&manager, trace);
    }

    // Set up signal handling for graceful shutdown
    let running = manager.running_flag();
    ctrlc::set_handler(move || {
        running.store(false, Ordering::Relaxed);
    })
    .expect("Error setting Ctrl-C handler");

    log::info!("Loading configuration from: {}", cli.config.display());
    manager.start();

    ExitCode::SUCCESS
}

/// Print every outcome of a replayed trace.
fn replay(manager: &GestureManager, trace: &Path) -> ExitCode {
    let events = match manager.replay(trace) {
        Ok(events) => events,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    for event in events {
        match event {
            SessionEvent::Recognized { label, pattern } => {
                println!("recognized: {label}  ({})", format_pattern(&pattern));
            }
            SessionEvent::Unrecognized { pattern } => {
                println!("unrecognized  ({})", format_pattern(&pattern));
            }
            SessionEvent::Aborted => println!("aborted"),
            SessionEvent::Rocker(side) => println!("{side}"),
            SessionEvent::Wheel(direction) => println!("{direction}"),
            SessionEvent::ContextMenu { suppressed } => {
                println!("context menu {}", if suppressed { "suppressed" } else { "shown" });
            }
            SessionEvent::Registered | SessionEvent::Started | SessionEvent::Changed { .. } => {}
        }
    }
    ExitCode::SUCCESS
}

/// Print the pattern of a recorded trace, ready to paste into the config.
fn record(manager: &GestureManager, trace: &Path) -> ExitCode {
    match manager.record(trace) {
        Ok(recorded) => {
            println!("{}", format_pattern(&recorded.pattern));
            if let Some(similar) = recorded.similar {
                eprintln!("Warning: this pattern is similar to the existing gesture '{similar}'");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
