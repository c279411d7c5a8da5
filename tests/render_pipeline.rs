/*
 *  tests/render_pipeline.rs
 *
 *  Status events through the render queue onto a recording bus
 *
 *  mpd-panel - front panel for the music player daemon
 *  (c) 2020-26 Stuart Hunter
 */

use std::sync::Arc;
use std::time::Duration;

use mpd_panel::config::parse_yaml;
use mpd_panel::display::CharDisplay;
use mpd_panel::display::drivers::mock::{BusOp, MockBus};
use mpd_panel::display::glyphs::{SLOT_CENTRE_EMPTY, SLOT_CENTRE_FULL, SLOT_EMPTY, SLOT_FULL, SLOT_LEFT, SLOT_RIGHT};
use mpd_panel::mpdinfo::StatusSynchronizer;
use mpd_panel::render::queue::render_queue;
use mpd_panel::render::{PanelSettings, RenderEngine};
use mpd_panel::translate::Passthrough;
use mpd_panel::transport::{ScriptStep, ScriptedTransport};

const CONFIG: &str = r#"
panel:
  hold_secs: 0
  splash_secs: 0
  suspend_secs: 0
  progress_style: simple
"#;

fn active(state: &str, pos: u32, elapsed: &str) -> ScriptStep {
    ScriptStep::Reply(vec![
        "Nina Simone\u{1}Feeling Good\u{1}3\u{1}I Put a Spell on You".into(),
        format!("[{}] #{}/12   {}/2:00 (50%)", state, pos, elapsed),
        "volume: 90%   repeat: on   random: off   single: off   consume: off".into(),
    ])
}

fn settings(yaml: &str) -> PanelSettings {
    PanelSettings::from_config(&parse_yaml(yaml).unwrap())
}

#[test]
fn test_threaded_pipeline_draws_title_and_progress() {
    let bus = MockBus::new();
    let probe = bus.clone();
    let display = CharDisplay::new(bus, &[0x00, 0x20], 16);
    let (queue, consumer) = render_queue(display);
    let handle = consumer.spawn().unwrap();

    let sync = Arc::new(StatusSynchronizer::with_backoff(
        ScriptedTransport::new([active("playing", 1, "1:00")]),
        Duration::ZERO,
    ));
    let engine = RenderEngine::new(Arc::clone(&sync), queue, Arc::new(Passthrough), settings(CONFIG));
    engine.attach();

    assert!(engine.startup());
    sync.step();
    assert!(engine.tick());

    // the last engine handle goes, the queue drains, the consumer exits
    drop(engine);
    let display = handle.join().unwrap();

    assert!(display.is_on());
    assert_eq!(display.line(0).unwrap().cached(), b"FEELING GOOD / I PUT A SPELL ON YOU #03");

    // 60/120 of 50 dots lands on a cell edge: no partial cell
    let mut expected = vec![SLOT_FULL; 5];
    expected.extend([SLOT_EMPTY; 5]);
    expected.extend(b" 01:00");
    assert_eq!(display.line(1).unwrap().cached(), expected.as_slice());

    let ops = probe.ops();
    assert_eq!(ops.first(), Some(&BusOp::Command(0x2a)));
    assert!(ops.contains(&BusOp::Block(b"  NINA SIMONE   ".to_vec())));
    // title block is clipped to the panel width
    assert!(ops.contains(&BusOp::Block(b"FEELING GOOD / I".to_vec())));
}

#[test]
fn test_suspend_then_shutdown_leaves_display_on() {
    let bus = MockBus::new();
    let probe = bus.clone();
    let display = CharDisplay::new(bus, &[0x00, 0x20], 16);
    let (queue, mut consumer) = render_queue(display);

    let sync = Arc::new(StatusSynchronizer::with_backoff(
        ScriptedTransport::new([active("playing", 1, "0:10"), active("paused", 1, "0:12")]),
        Duration::ZERO,
    ));
    let engine = RenderEngine::new(Arc::clone(&sync), queue.clone(), Arc::new(Passthrough), settings(CONFIG));
    engine.attach();

    sync.step();
    sync.step();
    engine.tick();
    consumer.drain_pending();
    assert!(!consumer.display().is_on());
    assert_eq!(consumer.display().line(1).unwrap().cached(), b"     PAUSED     ");

    // anything still queued at shutdown is dropped
    engine.tick();
    queue.shutdown();
    probe.reset();
    let display = consumer.run();

    assert!(display.is_on());
    assert_eq!(probe.ops().first(), Some(&BusOp::Command(0x0c)));
}

#[test]
fn test_outage_messages_hold_through_ticks() {
    let display = CharDisplay::new(MockBus::new(), &[0x00, 0x20], 16);
    let (queue, mut consumer) = render_queue(display);

    let sync = Arc::new(StatusSynchronizer::with_backoff(
        ScriptedTransport::new([
            active("playing", 1, "0:10"),
            ScriptStep::Fail { alive: true },
            ScriptStep::Fail { alive: false },
        ]),
        Duration::ZERO,
    ));
    let engine = RenderEngine::new(Arc::clone(&sync), queue, Arc::new(Passthrough), settings(CONFIG));
    engine.attach();

    sync.step();
    engine.tick();
    consumer.drain_pending();
    assert_eq!(&consumer.display().line(1).unwrap().cached()[10..], b" 00:10");

    // daemon process alive but not answering
    sync.step();
    engine.tick();
    consumer.drain_pending();
    assert!(consumer.display().is_on());
    assert_eq!(consumer.display().line(1).unwrap().cached(), b" SERVER HANG-UP ");

    // process gone
    sync.step();
    engine.tick();
    consumer.drain_pending();
    assert!(sync.is_server_down());
    assert_eq!(consumer.display().line(1).unwrap().cached(), b"  SERVER DOWN   ");
    assert!(engine.suspend_at().is_none());
}

#[test]
fn test_bordered_style_fills_width() {
    let bus = MockBus::new();
    let display = CharDisplay::new(bus, &[0x00, 0x20], 16);
    let (queue, mut consumer) = render_queue(display);

    let sync = Arc::new(StatusSynchronizer::with_backoff(
        ScriptedTransport::new([active("playing", 4, "1:00")]),
        Duration::ZERO,
    ));
    let yaml = CONFIG.replace("progress_style: simple", "progress_style: bordered");
    let engine = RenderEngine::new(Arc::clone(&sync), queue, Arc::new(Passthrough), settings(&yaml));
    engine.attach();

    sync.step();
    engine.tick();
    consumer.drain_pending();

    // 3 + 3 + 5 x 8 = 46 dots, half is 23: left cap plus four full centre cells
    let mut expected = vec![SLOT_LEFT];
    expected.extend([SLOT_CENTRE_FULL; 4]);
    expected.extend([SLOT_CENTRE_EMPTY; 4]);
    expected.push(SLOT_RIGHT);
    expected.extend(b" 01:00");
    assert_eq!(consumer.display().line(1).unwrap().cached(), expected.as_slice());
}
