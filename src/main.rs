//! Clapsense - acoustic clap gesture recognizer
//!
//! Entry point for the command line detector.

use anyhow::{bail, Context, Result};
use chrono::Local;
use clapsense::audio::engine::{self, CaptureEngine};
use clapsense::audio::pipeline::{self, GestureSink, TracingSink};
use clapsense::audio::replay::{RecordingSource, ReplayCapture, ReplaySource};
use clapsense::gesture::clock::{ManualClock, MonotonicClock};
use clapsense::{AppConfig, ClapPipeline, SessionStats};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use tracing::{error, info};

/// Options collected from the command line
#[derive(Debug, Default)]
struct CliOptions {
    device: Option<String>,
    config_path: Option<PathBuf>,
    threshold: Option<f64>,
    window_ms: Option<u64>,
    replay: Option<PathBuf>,
    record: Option<PathBuf>,
    save_config: bool,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("clapsense=info".parse().unwrap()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut options = CliOptions::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--list" | "-l" => {
                list_devices();
                return Ok(());
            }
            "--version" | "-v" => {
                println!("clapsense {} ({})", clapsense::VERSION, clapsense::BUILD_DATE);
                return Ok(());
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--save-config" => options.save_config = true,
            flag @ ("--device" | "-d" | "--config" | "-c" | "--threshold" | "-t" | "--window"
            | "-w" | "--replay" | "--record") => {
                let Some(value) = args.get(i + 1) else {
                    eprintln!("Error: {} requires a value", flag);
                    return Ok(());
                };
                match flag {
                    "--device" | "-d" => options.device = Some(value.clone()),
                    "--config" | "-c" => options.config_path = Some(PathBuf::from(value)),
                    "--replay" => options.replay = Some(PathBuf::from(value)),
                    "--record" => options.record = Some(PathBuf::from(value)),
                    "--threshold" | "-t" => match value.parse() {
                        Ok(t) => options.threshold = Some(t),
                        Err(_) => {
                            eprintln!("Error: Invalid threshold: {}", value);
                            return Ok(());
                        }
                    },
                    _ => match value.parse() {
                        Ok(ms) => options.window_ms = Some(ms),
                        Err(_) => {
                            eprintln!("Error: Invalid window: {}", value);
                            return Ok(());
                        }
                    },
                }
                i += 2;
                continue;
            }
            arg => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                return Ok(());
            }
        }
        i += 1;
    }

    run(options)
}

fn print_help() {
    println!("Usage: clapsense [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -l, --list              List available input devices");
    println!("  -d, --device NAME       Capture from the named input device");
    println!("  -c, --config PATH       Use an alternative config file");
    println!("  -t, --threshold VALUE   Clap threshold (default: 50)");
    println!("  -w, --window MS         Gesture window in milliseconds (default: 1000)");
    println!("      --replay FILE       Process a recorded capture instead of the microphone");
    println!("      --record FILE       Record the live session to a capture file");
    println!("      --save-config       Persist device and tuning options to the config file");
    println!("  -v, --version           Show version");
    println!("  -h, --help              Show this help");
    println!();
    println!("Examples:");
    println!("  clapsense -d \"USB Audio Device\" -t 45");
    println!("  clapsense --record session.json");
    println!("  clapsense --replay session.json -t 40");
    println!();
    println!("Set RUST_LOG=clapsense=debug to see the metric of every cycle.");
}

fn list_devices() {
    println!("Scanning for input devices...");
    println!();

    match engine::list_devices() {
        Ok(devices) if devices.is_empty() => println!("No input devices found."),
        Ok(devices) => {
            println!("Found {} device(s):", devices.len());
            println!();
            for (i, device) in devices.iter().enumerate() {
                let default_marker = if device.is_default { " [DEFAULT]" } else { "" };
                println!("  {}. {}{}", i + 1, device.name, default_marker);
                println!(
                    "     {} channel(s) @ {} Hz",
                    device.channels, device.sample_rate
                );
            }
        }
        Err(e) => {
            error!("Failed to list devices: {}", e);
            println!("Error: {}", e);
        }
    }
}

fn run(options: CliOptions) -> Result<()> {
    let config_path = options.config_path.unwrap_or_else(AppConfig::path);
    let mut app = AppConfig::load_from(&config_path);

    if let Some(device) = options.device {
        app.device = Some(device);
    }
    if let Some(threshold) = options.threshold {
        app.detector.threshold = threshold;
    }
    if let Some(ms) = options.window_ms {
        app.detector.gesture_window_us = ms.saturating_mul(1000);
    }
    app.detector
        .validate()
        .context("Invalid detector configuration")?;

    if options.save_config {
        app.save(&config_path)
            .with_context(|| format!("Failed to save config to {}", config_path.display()))?;
    }

    let mut pipeline = ClapPipeline::new(app.detector.clone())?;
    let mut stats = SessionStats::new();
    let mut log = TracingSink;

    {
        let mut sinks: [&mut dyn GestureSink; 2] = [&mut log, &mut stats];
        match options.replay {
            Some(path) => run_replay(&mut pipeline, &path, &mut sinks)?,
            None => run_live(&mut pipeline, &app, options.record, &mut sinks)?,
        }
    }

    print_summary(&stats);
    Ok(())
}

fn run_replay(
    pipeline: &mut ClapPipeline,
    path: &Path,
    sinks: &mut [&mut dyn GestureSink],
) -> Result<()> {
    let capture = ReplayCapture::load(path)
        .with_context(|| format!("Failed to load capture {}", path.display()))?;
    if capture.sample_count != pipeline.config().sample_count {
        bail!(
            "Capture uses {} samples per buffer but the detector is configured for {}",
            capture.sample_count,
            pipeline.config().sample_count
        );
    }

    let mut source = ReplaySource::from_capture(capture)?;
    println!("Replaying {} ({} cycles)", path.display(), source.remaining());

    let clock = ManualClock::new(0);
    pipeline::run(pipeline, &mut source, &clock, sinks)?;
    Ok(())
}

fn run_live(
    pipeline: &mut ClapPipeline,
    app: &AppConfig,
    record: Option<PathBuf>,
    sinks: &mut [&mut dyn GestureSink],
) -> Result<()> {
    let engine = CaptureEngine::start(app.device.as_deref(), &app.detector)
        .context("Failed to start capture. Use --list to see available devices")?;

    let running = engine.stop_handle();
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .context("Failed to install Ctrl+C handler")?;

    println!(
        "Listening on {} @ {} Hz. Press Ctrl+C to stop.",
        engine.device_name(),
        engine.sample_rate()
    );
    println!();

    let clock = MonotonicClock::new();
    let engine = match record {
        Some(path) => {
            let mut source = RecordingSource::new(engine, &clock, app.detector.sample_count);
            let result = pipeline::run(pipeline, &mut source, &clock, sinks);
            let (engine, capture) = source.into_parts();
            // Keep whatever was captured even if the loop failed
            capture
                .save(&path)
                .with_context(|| format!("Failed to save capture {}", path.display()))?;
            println!("Capture saved to {}", path.display());
            result?;
            engine
        }
        None => {
            let mut engine = engine;
            pipeline::run(pipeline, &mut engine, &clock, sinks)?;
            engine
        }
    };

    info!(
        triggers = engine.triggers(),
        dropped = engine.dropped_samples(),
        "Capture stopped"
    );
    Ok(())
}

fn print_summary(stats: &SessionStats) {
    let c = stats.counters();
    let fmt_metric = |m: Option<f64>| m.map_or_else(|| "-".to_string(), |m| format!("{:.1}", m));

    println!();
    println!("Session summary");
    println!("────────────────────────────────────────");
    println!(
        "Started:       {}",
        stats.started().with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
    );
    println!("Cycles:        {} ({} buffers)", c.cycles, c.buffers);
    println!("Claps:         {}", c.claps);
    println!("Double claps:  {}", c.double_claps);
    println!("Triple claps:  {}", c.triple_claps);
    println!(
        "Metric:        min {} / avg {} / max {}",
        fmt_metric(c.min_metric),
        fmt_metric(c.avg_metric),
        fmt_metric(c.max_metric)
    );
    for event in stats.events() {
        println!(
            "  {} {}",
            event.timestamp.with_timezone(&Local).format("%H:%M:%S%.3f"),
            event.gesture
        );
    }
}
