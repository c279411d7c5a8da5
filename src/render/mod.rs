/*
 *  render/mod.rs
 *
 *  mpd-panel - front panel for the music player daemon
 *  (c) 2020-26 Stuart Hunter
 *
 *  Render engine - turns player events and ticks into display jobs
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

pub mod deadline;
pub mod pacer;
pub mod queue;
pub mod text;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info};

use crate::config::{Config, ProgressStyle};
use crate::display::glyphs::progress_bar;
use crate::display::{CharBus, CharDisplay, DisplayError, encode_text};
use crate::mpdinfo::{PlayerSnapshot, StatusEvent, StatusSynchronizer};
use crate::translate::Transliterate;
use crate::transport::PlayerTransport;

use deadline::{Clock, Deadline};
use pacer::Pacer;
use queue::RenderQueue;
use text::{center, clock_suffix, fit_left, title_line};

/// Panel behaviour knobs, resolved from config
#[derive(Debug, Clone)]
pub struct PanelSettings {
    pub width: usize,
    pub brightness: u8,
    pub tick: Duration,
    pub suspend: Duration,
    pub hold: Duration,
    pub scroll_dwell: u32,
    pub progress_width: usize,
    pub progress_style: ProgressStyle,
    pub splash: String,
    pub splash_time: Duration,
}

impl PanelSettings {
    pub fn from_config(cfg: &Config) -> Self {
        let display = cfg.display();
        let panel = cfg.panel();
        Self {
            width: display.width(),
            brightness: display.brightness(),
            tick: panel.tick(),
            suspend: panel.suspend(),
            hold: panel.hold(),
            scroll_dwell: panel.scroll_dwell(),
            progress_width: panel.progress_width(),
            progress_style: panel.progress_style(),
            splash: panel.splash(),
            splash_time: panel.splash_time(),
        }
    }
}

/// Decides what the panel shows.
///
/// Event handlers run on the status thread and the ticker on its own thread;
/// neither touches the display. Everything that does is a job on the queue.
pub struct RenderEngine<B: CharBus + 'static, T: PlayerTransport + 'static> {
    sync: Arc<StatusSynchronizer<T>>,
    queue: RenderQueue<B>,
    translit: Arc<dyn Transliterate>,
    settings: PanelSettings,
    clock: Clock,
    hold: Deadline,
    suspend: Deadline,
}

impl<B: CharBus + 'static, T: PlayerTransport + 'static> RenderEngine<B, T> {
    pub fn new(
        sync: Arc<StatusSynchronizer<T>>,
        queue: RenderQueue<B>,
        translit: Arc<dyn Transliterate>,
        settings: PanelSettings,
    ) -> Arc<Self> {
        Arc::new(Self {
            sync,
            queue,
            translit,
            settings,
            clock: Clock::new(),
            hold: Deadline::new(),
            suspend: Deadline::new(),
        })
    }

    pub fn settings(&self) -> &PanelSettings {
        &self.settings
    }

    /// Suspend deadline in engine milliseconds, if armed
    pub fn suspend_at(&self) -> Option<u64> {
        self.suspend.get()
    }

    /// Title hold deadline in engine milliseconds, if armed
    pub fn hold_at(&self) -> Option<u64> {
        self.hold.get()
    }

    /// Subscribe to the synchronizer; call once before it starts polling.
    pub fn attach(self: &Arc<Self>) {
        self.on(StatusEvent::Started, |engine, _| engine.cancel_suspend());
        self.on(StatusEvent::Started, |engine, _| engine.show_title());
        self.on(StatusEvent::TrackChanged, |engine, _| engine.show_title());
        self.on(StatusEvent::Paused, |engine, ev| engine.show_idle(ev));
        self.on(StatusEvent::Stopped, |engine, ev| engine.show_idle(ev));
        self.on(StatusEvent::ServerDown, |engine, ev| engine.show_server_error(ev));
        self.on(StatusEvent::ServerHangUp, |engine, ev| engine.show_server_error(ev));
        self.on(StatusEvent::ServerWakeUp, |_, _| info!("Player reachable again"));
    }

    fn on<F>(self: &Arc<Self>, event: StatusEvent, handler: F)
    where
        F: Fn(&Arc<Self>, StatusEvent) + Send + Sync + 'static,
    {
        // weak, the synchronizer must not keep the engine alive
        let weak: Weak<Self> = Arc::downgrade(self);
        self.sync.bind(event, move |ev| {
            if let Some(engine) = weak.upgrade() {
                handler(&engine, ev);
            }
        });
    }

    /// Queue the power-up: brightness, display on, splash held for a moment.
    pub fn startup(&self) -> bool {
        let brightness = self.settings.brightness;
        let hold = self.settings.splash_time;
        let splash = center(&self.settings.splash, self.settings.width);
        let blank = " ".repeat(self.settings.width);
        self.queue.submit("splash", move |d| {
            d.set_brightness(brightness)?;
            d.power_on()?;
            if !hold.is_zero() {
                d.write_line(&splash, 0)?;
                d.write_line(&blank, 1)?;
                thread::sleep(hold);
            }
            Ok(())
        })
    }

    /// Queue one periodic update; false once the consumer is gone.
    pub fn tick(self: &Arc<Self>) -> bool {
        let engine = Arc::clone(self);
        self.queue.submit("tick", move |d| engine.run_tick(d))
    }

    /// Enqueue a tick every period until `running` clears
    pub fn spawn_ticker(self: &Arc<Self>, running: Arc<AtomicBool>) -> std::io::Result<JoinHandle<()>> {
        let engine = Arc::clone(self);
        thread::Builder::new().name("panel-tick".into()).spawn(move || {
            let mut pacer = Pacer::new(engine.settings.tick);
            debug!("Ticker running every {:?}", pacer.period());
            while running.load(Ordering::SeqCst) {
                pacer.wait();
                if !engine.tick() {
                    break;
                }
            }
            debug!("Ticker stopped");
        })
    }

    fn fold(&self, text: &str) -> String {
        self.translit.transliterate(text).to_uppercase()
    }

    fn cancel_suspend(&self) {
        if self.suspend.is_armed() {
            debug!("suspend cancelled");
        }
        self.suspend.disarm();
    }

    fn show_title(&self) {
        let snap = self.sync.snapshot();
        let width = self.settings.width;

        self.hold.arm(self.clock.after(self.settings.hold));
        if self.suspend.extend_if_armed(self.clock.after(self.settings.suspend)) {
            debug!("suspend pushed back");
        }

        let top = fit_left(&self.fold(&title_line(&snap.song)), width);
        let bottom = center(&self.fold(&snap.song.artist), width);
        self.queue.submit("title", move |d| {
            if !d.is_on() {
                d.power_on()?;
            }
            d.write_line(&top, 0)?;
            d.write_line(&bottom, 1)
        });
    }

    fn show_idle(&self, event: StatusEvent) {
        self.suspend.arm(self.clock.after(self.settings.suspend));
        let message = center(&event.label().to_uppercase(), self.settings.width);
        self.queue.submit("status", move |d| d.write_line(&message, 1));
    }

    fn show_server_error(&self, event: StatusEvent) {
        self.cancel_suspend();
        let message = center(&event.label().to_uppercase(), self.settings.width);
        self.queue.submit("server", move |d| {
            if !d.is_on() {
                d.power_on()?;
            }
            d.write_line(&message, 1)
        });
    }

    fn run_tick(&self, d: &mut CharDisplay<B>) -> Result<(), DisplayError> {
        let now = self.clock.now_ms();
        let snap = self.sync.snapshot();

        // a server message stays up until the player answers again
        let stale = self.sync.is_faulted();
        if snap.is_playing() && !stale && !self.hold.is_pending(now) && d.is_on() {
            self.draw_progress(d, &snap)?;
        }
        if self.suspend.has_passed(now) && d.is_on() {
            info!("Suspending display");
            d.power_off()?;
        }
        if d.is_on() {
            d.shift(0, self.settings.scroll_dwell)?;
        }
        Ok(())
    }

    fn draw_progress(&self, d: &mut CharDisplay<B>, snap: &PlayerSnapshot) -> Result<(), DisplayError> {
        let frame = progress_bar(
            self.settings.progress_style,
            snap.elapsed,
            snap.length,
            self.settings.progress_width,
        );
        for (slot, rows) in &frame.glyphs {
            d.set_glyph(*slot, rows)?;
        }
        let mut line = frame.cells;
        line.extend(encode_text(&clock_suffix(snap.elapsed)));
        if line.len() < d.width() {
            line.resize(d.width(), b' ');
        }
        d.write_raw(&line, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::drivers::mock::MockBus;
    use crate::display::glyphs::{SLOT_EMPTY, SLOT_FULL, SLOT_PARTIAL};
    use crate::translate::Passthrough;
    use crate::transport::{ScriptStep, ScriptedTransport};
    use super::queue::{RenderConsumer, render_queue};

    type Engine = RenderEngine<MockBus, ScriptedTransport>;

    fn playing(pos: u32, elapsed: &str) -> ScriptStep {
        ScriptStep::Reply(vec![
            "Miles Davis\u{1}So What\u{1}1\u{1}Kind of Blue".to_string(),
            format!("[playing] #{}/5   {}/4:00 (12%)", pos, elapsed),
            "volume: 80%   repeat: off   random: off".to_string(),
        ])
    }

    fn paused(pos: u32) -> ScriptStep {
        ScriptStep::Reply(vec![
            "Miles Davis\u{1}So What\u{1}1\u{1}Kind of Blue".to_string(),
            format!("[paused]  #{}/5   0:30/4:00 (12%)", pos),
            "volume: 80%   repeat: off   random: off".to_string(),
        ])
    }

    fn settings() -> PanelSettings {
        let mut s = PanelSettings::from_config(&Config::default());
        s.hold = Duration::ZERO;
        s.splash_time = Duration::ZERO;
        s
    }

    fn build(
        steps: Vec<ScriptStep>,
        settings: PanelSettings,
    ) -> (Arc<StatusSynchronizer<ScriptedTransport>>, Arc<Engine>, RenderConsumer<MockBus>) {
        let sync = Arc::new(StatusSynchronizer::with_backoff(
            ScriptedTransport::new(steps),
            Duration::ZERO,
        ));
        let display = CharDisplay::new(MockBus::new(), &[0x00, 0x20], settings.width);
        let (queue, consumer) = render_queue(display);
        let engine = RenderEngine::new(Arc::clone(&sync), queue, Arc::new(Passthrough), settings);
        engine.attach();
        (sync, engine, consumer)
    }

    fn line(consumer: &RenderConsumer<MockBus>, n: usize) -> Vec<u8> {
        consumer.display().line(n).unwrap().cached().to_vec()
    }

    #[test]
    fn test_start_writes_title_and_artist() {
        let (sync, _engine, mut consumer) = build(vec![playing(1, "0:30")], settings());
        sync.step();
        consumer.drain_pending();

        assert!(consumer.display().is_on());
        assert_eq!(line(&consumer, 0), b"SO WHAT / KIND OF BLUE #01".to_vec());
        assert_eq!(line(&consumer, 1), b"  MILES DAVIS   ".to_vec());
    }

    #[test]
    fn test_tick_draws_progress_after_hold() {
        let (sync, engine, mut consumer) = build(vec![playing(1, "0:30")], settings());
        sync.step();
        engine.tick();
        consumer.drain_pending();

        // 30/240 of 50 dots = 6: one full cell, one partial, eight empty
        let mut expected = vec![SLOT_FULL, SLOT_PARTIAL];
        expected.extend([SLOT_EMPTY; 8]);
        expected.extend(b" 00:30");
        assert_eq!(line(&consumer, 1), expected);
        assert!(consumer.display().glyph(SLOT_PARTIAL).is_some());
    }

    #[test]
    fn test_hold_window_protects_title() {
        let mut s = settings();
        s.hold = Duration::from_secs(60);
        let (sync, engine, mut consumer) = build(vec![playing(1, "0:30")], s);
        sync.step();
        engine.tick();
        consumer.drain_pending();

        assert!(engine.hold_at().is_some());
        assert_eq!(line(&consumer, 1), b"  MILES DAVIS   ".to_vec());
    }

    #[test]
    fn test_pause_suspends_and_play_resumes() {
        let mut s = settings();
        s.suspend = Duration::ZERO;
        let (sync, engine, mut consumer) =
            build(vec![playing(1, "0:30"), paused(1), playing(1, "0:31")], s);

        sync.step();
        consumer.drain_pending();
        sync.step();
        assert!(engine.suspend_at().is_some());
        engine.tick();
        consumer.drain_pending();
        assert_eq!(line(&consumer, 1), b"     PAUSED     ".to_vec());
        assert!(!consumer.display().is_on());

        sync.step();
        assert!(engine.suspend_at().is_none());
        consumer.drain_pending();
        assert!(consumer.display().is_on());
    }

    #[test]
    fn test_title_update_extends_armed_suspend() {
        let (sync, engine, mut consumer) = build(vec![paused(1), paused(2)], settings());
        sync.step();
        consumer.drain_pending();
        let first = engine.suspend_at().unwrap();

        thread::sleep(Duration::from_millis(10));
        sync.step();
        let second = engine.suspend_at().unwrap();
        assert!(second > first);
    }

    #[test]
    fn test_server_down_message_cancels_suspend() {
        let (sync, engine, mut consumer) =
            build(vec![paused(1), ScriptStep::Fail { alive: false }], settings());
        sync.step();
        assert!(engine.suspend_at().is_some());
        sync.step();
        assert!(engine.suspend_at().is_none());
        consumer.drain_pending();
        assert_eq!(line(&consumer, 1), b"  SERVER DOWN   ".to_vec());
        assert!(consumer.display().is_on());
    }

    #[test]
    fn test_server_down_while_playing_survives_tick() {
        let (sync, engine, mut consumer) = build(
            vec![playing(1, "0:30"), ScriptStep::Fail { alive: false }, playing(1, "0:31")],
            settings(),
        );
        sync.step();
        sync.step();
        engine.tick();
        consumer.drain_pending();
        assert!(sync.snapshot().is_playing());
        assert_eq!(line(&consumer, 1), b"  SERVER DOWN   ".to_vec());

        // the next good sample lets the bar back in
        sync.step();
        engine.tick();
        consumer.drain_pending();
        assert_eq!(&line(&consumer, 1)[10..], b" 00:31");
    }

    #[test]
    fn test_startup_splash() {
        let mut s = settings();
        s.splash_time = Duration::from_millis(1);
        let (_sync, engine, mut consumer) = build(vec![], s);
        assert!(engine.startup());
        consumer.drain_pending();
        assert!(consumer.display().is_on());
        assert_eq!(consumer.display().brightness(), 0xff);
        assert_eq!(line(&consumer, 0), b"   RuneAudio    ".to_vec());
    }

    #[test]
    fn test_long_title_scrolls_on_tick() {
        let mut s = settings();
        s.scroll_dwell = 0;
        s.hold = Duration::from_secs(60);
        let (sync, engine, mut consumer) = build(vec![playing(1, "0:30")], s);
        sync.step();
        consumer.drain_pending();
        engine.tick();
        engine.tick();
        consumer.drain_pending();
        assert_eq!(consumer.display().line(0).unwrap().offset(), 2);
    }
}
