/*
 *  main.rs
 *
 *  mpd-panel - front panel for the music player daemon
 *  (c) 2020-26 Stuart Hunter
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use env_logger::Env;
use log::{error, info};

use tokio::signal::unix::{SignalKind, signal};

use mpd_panel::config;
use mpd_panel::display::CharDisplay;
use mpd_panel::display::drivers::i2c::I2cCharBus;
use mpd_panel::mpdinfo::StatusSynchronizer;
use mpd_panel::render::queue::render_queue;
use mpd_panel::render::{PanelSettings, RenderEngine};
use mpd_panel::translate::Transliteration;
use mpd_panel::transport::MpcTransport;

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Waits for SIGINT, SIGTERM or SIGHUP and logs which one arrived.
async fn signal_handler() -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let (cfg, _cli) = config::load()?;

    let level = cfg.log_level.clone().unwrap_or_else(|| "info".to_string());
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();

    info!("{} - mpd on a 16x2", env!("CARGO_PKG_NAME"));
    info!("v.{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);

    // display, owned by the render consumer from here on
    let display_cfg = cfg.display();
    let bus = I2cCharBus::new(&display_cfg.bus(), display_cfg.address())
        .with_context(|| format!("opening display on {}", display_cfg.bus()))?;
    info!("Display at {:#04x} on {}", bus.address(), display_cfg.bus());
    let display = CharDisplay::new(bus, &display_cfg.line_addresses(), display_cfg.width());
    let (queue, consumer) = render_queue(display);
    let render_handle = consumer.spawn().context("starting render thread")?;

    // player
    let player_cfg = cfg.player();
    let sync = Arc::new(StatusSynchronizer::new(MpcTransport::new(&player_cfg), &player_cfg));

    let translit = Arc::new(Transliteration::new(&cfg.transliterate()));
    if translit.is_enabled() {
        info!("Transliteration via kakasi enabled");
    }

    let engine = RenderEngine::new(
        Arc::clone(&sync),
        queue.clone(),
        translit,
        PanelSettings::from_config(&cfg),
    );
    engine.attach();
    engine.startup();

    let running = Arc::new(AtomicBool::new(true));
    let ticker = engine.spawn_ticker(Arc::clone(&running)).context("starting ticker")?;
    // the status thread parks in `mpc idle`, it is not joined
    sync.spawn().context("starting status thread")?;

    signal_handler().await?;

    info!("Shutting down");
    running.store(false, Ordering::SeqCst);
    sync.stop();
    queue.shutdown();

    let ticker_done = ticker.join().is_ok();
    match render_handle.join() {
        Ok(display) => info!("Display left {}", if display.is_on() { "on" } else { "off" }),
        Err(_) => error!("Render thread panicked during shutdown"),
    }
    if !ticker_done {
        error!("Ticker thread panicked");
    }
    info!("Bye");
    Ok(())
}
