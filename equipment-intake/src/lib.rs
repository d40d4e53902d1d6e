// Equipment Intake
// Main library entry point

pub mod api;
pub mod error;
pub mod models;
pub mod notify;
pub mod scan;
pub mod services;
pub mod settings;
mod tui;
pub mod utils;
pub mod wizard;

use anyhow::Context;
use log::{error, info};
use std::path::Path;

use settings::{Settings, SettingsOverrides};

/// Initialize logging system with dual format (JSON + human-readable)
fn init_logging(with_stdout: bool) -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = utils::path_resolver::resolve_log_folder()?;

    let timestamp = chrono::Utc::now().format("%Y-%m-%d-%H%M%S");

    // JSON log file for structured parsing
    let json_log_file = log_dir.join(format!("intake-{}.log", timestamp));

    // Human-readable log file (.txt)
    let txt_log_file = log_dir.join(format!("intake-{}.txt", timestamp));

    // - JSON format to .log file
    // - Human-readable format to .txt file
    // - Optional: human-readable to stdout (disabled for TUI to avoid corrupting the terminal UI)
    let mut dispatch = fern::Dispatch::new().level(log::LevelFilter::Debug);

    if with_stdout {
        dispatch = dispatch.chain(
            fern::Dispatch::new()
                .level(log::LevelFilter::Info)
                .format(move |out, message, record| {
                    let timestamp_local = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
                    let message_str = format!("{}", message);
                    let (phase, step, cleaned_message) =
                        utils::logging::parse_log_metadata(&message_str);
                    let txt_line = utils::logging::format_human_readable_log(
                        &timestamp_local.to_string(),
                        record.level(),
                        record.target(),
                        &cleaned_message,
                        phase.as_deref(),
                        step.as_deref(),
                    );
                    out.finish(format_args!("{}", txt_line));
                })
                .chain(std::io::stdout()),
        );
    }

    dispatch = dispatch
        .chain(
            fern::Dispatch::new()
                .format(move |out, message, record| {
                    let timestamp_utc = chrono::Utc::now().to_rfc3339();
                    let message_str = format!("{}", message);
                    let (phase, step, cleaned_message) =
                        utils::logging::parse_log_metadata(&message_str);
                    let json_line = utils::logging::format_json_log(
                        &timestamp_utc,
                        record.level(),
                        record.target(),
                        &cleaned_message,
                        phase.as_deref(),
                        step.as_deref(),
                    );
                    out.finish(format_args!("{}\n", json_line));
                })
                .chain(fern::log_file(json_log_file)?),
        )
        .chain(
            fern::Dispatch::new()
                .format(move |out, message, record| {
                    let timestamp_local = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
                    let message_str = format!("{}", message);
                    let (phase, step, cleaned_message) =
                        utils::logging::parse_log_metadata(&message_str);
                    let txt_line = utils::logging::format_human_readable_log(
                        &timestamp_local.to_string(),
                        record.level(),
                        record.target(),
                        &cleaned_message,
                        phase.as_deref(),
                        step.as_deref(),
                    );
                    out.finish(format_args!("{}\n", txt_line));
                })
                .chain(fern::log_file(txt_log_file)?),
        );

    dispatch.apply()?;

    log::info!(
        "[PHASE: initialization] Logging initialized, log directory: {:?}",
        log_dir
    );
    Ok(())
}

/// Interactive terminal wizard.
pub fn run_tui(args: &[String]) {
    // Initialize logging (no stdout to avoid corrupting the TUI)
    if let Err(e) = init_logging(false) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    info!(
        "[PHASE: initialization] Equipment intake starting at {}",
        chrono::Utc::now()
    );

    if let Err(e) = start_tui(args) {
        error!("[PHASE: tui] [STEP: fatal] Wizard exited with error: {:#}", e);
        eprintln!("Intake error: {:#}", e);
        std::process::exit(1);
    }
}

fn start_tui(args: &[String]) -> anyhow::Result<()> {
    let overrides = SettingsOverrides::from_args(args);
    let settings = Settings::load(&overrides).context("Failed to load settings")?;
    info!(
        "[PHASE: initialization] [STEP: settings] form_variant={} timeout_secs={} scan_min_length={} connectivity_check={}",
        settings.form_variant,
        settings.request_timeout_secs,
        settings.scan_min_length,
        settings.connectivity_check
    );

    // Services build reqwest clients and spawn timers, so they need the runtime entered.
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("Failed to create async runtime")?;
    let _guard = rt.enter();

    let services = services::Services::from_settings(&settings)?;
    tui::run(&settings, services, rt.handle().clone())
}

/// Non-interactive TUI smoke mode (for automated checks).
/// Renders a single frame to an in-memory backend and exits 0/1.
pub fn run_tui_smoke(target: Option<String>) {
    if let Err(e) = init_logging(false) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    info!(
        "[PHASE: initialization] Headless TUI smoke starting at {}",
        chrono::Utc::now()
    );

    let target = target.as_deref().unwrap_or("reference");
    if let Err(e) = tui::smoke(target) {
        error!(
            "[PHASE: tui] [STEP: smoke] TUI smoke exited with error: {:?}",
            e
        );
        eprintln!("Intake error: {}", e);
        std::process::exit(1);
    }
}

/// Runs the active scan pipeline once on an image file and prints the outcome. Exits 0/1.
pub fn run_scan_smoke(path: &Path, args: &[String]) {
    if let Err(e) = init_logging(true) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    info!(
        "[PHASE: scan] [STEP: smoke] Scan smoke starting for {:?}",
        path
    );

    match scan_once(path, args) {
        Ok(value) => println!("Scanned: {}", value),
        Err(e) => {
            error!("[PHASE: scan] [STEP: smoke] Scan smoke failed: {:#}", e);
            eprintln!("Scan failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn scan_once(path: &Path, args: &[String]) -> anyhow::Result<String> {
    let settings = Settings::load(&SettingsOverrides::from_args(args))
        .context("Failed to load settings")?;
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create async runtime")?;

    // The precheck targets the submission endpoint when one is configured.
    let endpoint = settings.endpoint().ok();
    let scanner = services::scanner_for(&settings, endpoint.as_ref());
    let value = rt.block_on(scanner.scan_file(path))?;
    Ok(value)
}
