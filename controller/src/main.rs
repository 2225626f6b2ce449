//! Booth Controller – terminal front end for the recording appliance.
//!
//! Modes:
//!   tablet                      one-button recording with live status
//!   download                    latest + archived videos, re-polled
//!   status                      system status overview
//!   admin [show]                current settings and status
//!   admin set KEY=VALUE...      edit and save settings
//!   admin test-connection       check that the appliance reaches OBS
//!   admin record                start a manual recording
//!
//! The config file is read from `$BOOTH_CONFIG`, else the default path
//! when it exists.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tokio::sync::{mpsc, watch};
use tracing::info;

use booth_common::config::{self, Config};
use booth_controller::api::HttpApi;
use booth_controller::discovery::DiscoveryController;
use booth_controller::lifecycle::{self, LifecycleController, Timeline};
use booth_controller::render;
use booth_controller::settings::{ConnectionCheck, SettingsController};
use booth_controller::status;

const USAGE: &str = "usage: booth-controller <tablet|download|status|admin [show|set KEY=VALUE...|test-connection|record]>";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let mode = args.next().unwrap_or_else(|| "tablet".to_string());
    let rest: Vec<String> = args.collect();

    // ── load config ──────────────────────────────────────────────────
    let config = load_config()?;
    info!(
        "Booth Controller starting (mode={mode}, appliance={})",
        config.appliance_url
    );

    let api = HttpApi::new(&config)?;

    // ── ctrl-c ───────────────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    ctrlc::set_handler(move || {
        shutdown_tx.send_replace(true);
        info!("Shutdown signal received");
    })
    .context("Cannot set Ctrl-C handler")?;

    match mode.as_str() {
        "tablet" => run_tablet(&config, api, shutdown_rx).await?,
        "download" => run_download(&config, api, shutdown_rx).await,
        "status" => print!("{}", render::system_status(&status::poll_status(&api).await)),
        "admin" => run_admin(api, &rest, shutdown_rx).await?,
        other => bail!("unknown mode {other:?}\n{USAGE}"),
    }

    info!("Booth Controller stopped");
    Ok(())
}

fn load_config() -> Result<Config> {
    if let Ok(path) = std::env::var("BOOTH_CONFIG") {
        return config::load(&PathBuf::from(path)).context("Config load failed");
    }
    let default = Path::new(Config::default_path());
    if default.exists() {
        config::load(default).context("Config load failed")
    } else {
        info!("No config at {}, using defaults", default.display());
        Ok(Config::default())
    }
}

// ── tablet ───────────────────────────────────────────────────────────────

async fn run_tablet(
    config: &Config,
    api: HttpApi,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let mut controller = LifecycleController::new(api, Timeline::from_config(&config.timeline()));
    let printer = tokio::spawn(render::follow_status(controller.subscribe()));
    println!("Enter = record, c = cancel, q = quit");

    // Stdin is read on its own thread so a pending read never holds up
    // runtime shutdown.
    let (line_tx, mut lines) = mpsc::channel::<String>(8);
    std::thread::Builder::new()
        .name("stdin".into())
        .spawn(move || {
            for line in std::io::stdin().lines().map_while(Result::ok) {
                if line_tx.blocking_send(line).is_err() {
                    break;
                }
            }
        })
        .context("Cannot spawn stdin thread")?;

    loop {
        let line = tokio::select! {
            line = lines.recv() => line,
            _ = shutdown.changed() => break,
        };
        let Some(line) = line else { break };

        match line.trim() {
            "" => {
                if config.timeline_from_settings && controller.phase().accepts_trigger() {
                    let timeline = lifecycle::appliance_timeline(controller.api(), config.timeline()).await;
                    controller.set_timeline(timeline);
                }
                if let Err(e) = controller.trigger().await {
                    println!("{e}");
                }
            }
            "c" => controller.cancel(),
            "q" => break,
            other => println!("Unknown command {other:?} (Enter = record, c = cancel, q = quit)"),
        }
    }

    printer.abort();
    Ok(())
}

// ── download ─────────────────────────────────────────────────────────────

async fn run_download(config: &Config, api: HttpApi, shutdown: watch::Receiver<bool>) {
    let discovery = DiscoveryController::new(api);
    discovery.refresh_all().await;
    print!("{}", render::discovery_view(&discovery.state()));

    let mut updates = discovery.subscribe();
    updates.mark_unchanged();
    let printer = async {
        while updates.changed().await.is_ok() {
            let view = render::discovery_view(&updates.borrow_and_update());
            print!("{view}");
        }
    };

    tokio::select! {
        _ = discovery.run(config.poll_interval(), shutdown) => {}
        _ = printer => {}
    }
}

// ── admin ────────────────────────────────────────────────────────────────

async fn run_admin(
    api: HttpApi,
    args: &[String],
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let controller = SettingsController::new(api);
    let command = args.first().map(String::as_str).unwrap_or("show");

    match command {
        "show" => {
            let settings = controller.load().await.context("Cannot load settings")?;
            print!("{}", render::settings(&settings));
            let status = status::poll_status(controller.api()).await;
            print!("{}", render::system_status(&status));
        }
        "set" => {
            if args.len() < 2 {
                bail!("nothing to set\n{USAGE}");
            }
            let mut form = controller.edit().await.context("Cannot load settings")?;
            for pair in &args[1..] {
                form.apply_pair(pair)?;
            }
            let message = controller
                .save(form.settings())
                .await
                .context("Cannot save settings")?;
            println!("{message}");
        }
        "test-connection" => match controller.test_connection().await {
            ConnectionCheck::Connected => println!("Connected: the appliance reached OBS"),
            ConnectionCheck::Unreachable(reason) => {
                println!("Could not reach OBS ({reason}); check the settings")
            }
        },
        "record" => {
            let delay = controller
                .manual_recording()
                .await
                .context("Cannot start manual recording")?;
            println!("Manual recording started; refreshing status in {}s", delay.as_secs());
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    let status = status::poll_status(controller.api()).await;
                    print!("{}", render::system_status(&status));
                }
                _ = shutdown.changed() => {}
            }
        }
        other => bail!("unknown admin command {other:?}\n{USAGE}"),
    }
    Ok(())
}
