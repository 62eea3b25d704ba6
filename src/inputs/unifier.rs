//! Merges the terminal event stream and the optional global hook into one
//! channel of navigation events.
//!
//! Each producer runs on its own thread and pushes into a channel with room
//! for a single pending event, so producers wait for the reader to catch up.
//! Only one producer is active for navigation input at a time: the terminal
//! while the hook switch is off, the hook while it is on. Chords are always
//! detected on the hook side so they work without terminal focus.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crossterm::event::{Event, KeyEvent, KeyEventKind, MouseEventKind};
use flume::{Receiver, Sender};
use log::{debug, info, warn};

use super::chord::{ChordMachine, ChordOutcome};
use super::event_source::EventSource;
use super::hook::{GlobalHook, HookEvent};

/// Normalized input delivered to the navigation loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Key(KeyEvent),
    /// Wheel notches, positive scrolls down.
    Wheel(i32),
    Resize(u16, u16),
    Record(String),
    Restore(String),
    /// Short status line to flash on screen.
    Notice(String),
    SourceFailed(String),
}

/// Shared on/off flag for the global hook.
#[derive(Debug, Clone, Default)]
pub struct HookSwitch(Arc<AtomicBool>);

impl HookSwitch {
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(enabled)))
    }

    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Flips the switch and returns the new state.
    pub fn toggle(&self) -> bool {
        !self.0.fetch_xor(true, Ordering::SeqCst)
    }
}

/// Translates a terminal event, dropping what navigation has no use for.
pub fn terminal_event(event: Event) -> Option<InputEvent> {
    match event {
        Event::Key(key) if key.kind != KeyEventKind::Release => Some(InputEvent::Key(key)),
        Event::Mouse(mouse) => match mouse.kind {
            MouseEventKind::ScrollDown => Some(InputEvent::Wheel(1)),
            MouseEventKind::ScrollUp => Some(InputEvent::Wheel(-1)),
            _ => None,
        },
        Event::Resize(width, height) => Some(InputEvent::Resize(width, height)),
        _ => None,
    }
}

pub struct EventUnifier {
    receiver: Receiver<InputEvent>,
    switch: HookSwitch,
}

impl EventUnifier {
    /// Spawns the producer threads. Without a hook, `switch` still decides
    /// whether terminal navigation keys are forwarded.
    pub fn start(
        source: Box<dyn EventSource>,
        hook: Option<Box<dyn GlobalHook>>,
        switch: HookSwitch,
        toggle_sequence: &str,
    ) -> Self {
        let (tx, receiver) = flume::bounded(1);

        if let Some(hook) = hook {
            let mut listener = HookListener::new(
                ChordMachine::new(toggle_sequence),
                switch.clone(),
                tx.clone(),
            );
            thread::spawn(move || {
                info!("global hook listener started");
                hook.listen(Box::new(move |event| listener.handle(event)));
                info!("global hook listener exited");
            });
        }

        let terminal_switch = switch.clone();
        thread::spawn(move || run_terminal_source(source, tx, terminal_switch));

        Self { receiver, switch }
    }

    pub fn receiver(&self) -> &Receiver<InputEvent> {
        &self.receiver
    }

    pub fn switch(&self) -> &HookSwitch {
        &self.switch
    }
}

fn run_terminal_source(mut source: Box<dyn EventSource>, tx: Sender<InputEvent>, switch: HookSwitch) {
    loop {
        if tx.is_disconnected() {
            break;
        }
        let event = match source.read() {
            Ok(event) => event,
            Err(e) => {
                warn!("terminal event source failed: {e}");
                let _ = tx.send(InputEvent::SourceFailed(e.to_string()));
                break;
            }
        };
        let Some(input) = terminal_event(event) else {
            continue;
        };
        // the hook owns navigation while it is switched on
        if switch.is_enabled() && !matches!(input, InputEvent::Resize(..)) {
            continue;
        }
        if tx.send(input).is_err() {
            break;
        }
    }
    debug!("terminal event source stopped");
}

/// Hook-side consumer: runs raw events through the chord machine and
/// forwards the results.
pub struct HookListener {
    machine: ChordMachine,
    switch: HookSwitch,
    tx: Sender<InputEvent>,
}

impl HookListener {
    pub fn new(machine: ChordMachine, switch: HookSwitch, tx: Sender<InputEvent>) -> Self {
        Self { machine, switch, tx }
    }

    pub fn handle(&mut self, event: HookEvent) {
        let Some(outcome) = self.machine.feed(event, self.switch.is_enabled()) else {
            return;
        };
        let input = match outcome {
            ChordOutcome::Forward(key) => InputEvent::Key(key),
            ChordOutcome::Wheel(delta) => InputEvent::Wheel(delta),
            ChordOutcome::ToggleHook => {
                let enabled = self.switch.toggle();
                info!("switch global hook: {enabled}");
                InputEvent::Notice(format!("global hook: {}", if enabled { "on" } else { "off" }))
            }
            ChordOutcome::Record(name) => {
                info!("mark record hook: {name:?}");
                InputEvent::Record(name)
            }
            ChordOutcome::Restore(name) => {
                info!("mark restore hook: {name:?}");
                InputEvent::Restore(name)
            }
        };
        if self.tx.send(input).is_err() {
            debug!("navigation loop is gone, dropping hook event");
        }
    }
}
