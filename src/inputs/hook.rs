//! Raw vocabulary of the system-wide input hook.
//!
//! A hook backend reports key presses and releases plus wheel rotation,
//! regardless of which window has focus. The backend itself is only compiled
//! with the `global-hook` feature; everything else works on [`HookEvent`]s so
//! it can be driven from tests.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKey {
    Ctrl,
    Char(char),
    Up,
    Down,
    Left,
    Right,
    Esc,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
    KeyDown(HookKey),
    KeyUp(HookKey),
    /// Wheel rotation in notches, positive scrolls down.
    Wheel(i32),
}

/// Maps a hook key onto the key vocabulary of the terminal backend.
pub fn hook_key_to_event(key: HookKey) -> Option<KeyEvent> {
    let code = match key {
        HookKey::Char(c) => KeyCode::Char(c),
        HookKey::Up => KeyCode::Up,
        HookKey::Down => KeyCode::Down,
        HookKey::Left => KeyCode::Left,
        HookKey::Right => KeyCode::Right,
        HookKey::Esc => KeyCode::Esc,
        HookKey::Ctrl | HookKey::Other => return None,
    };
    Some(KeyEvent::new(code, KeyModifiers::NONE))
}

/// A system-wide listener. `listen` blocks its thread and hands every raw
/// event to `sink` until the process exits.
pub trait GlobalHook: Send + 'static {
    fn listen(self: Box<Self>, sink: Box<dyn FnMut(HookEvent) + Send>);
}

/// Scripted hook used by tests: replays events, then returns.
pub struct SimulatedHook {
    events: Vec<HookEvent>,
}

impl SimulatedHook {
    pub fn new(events: Vec<HookEvent>) -> Self {
        Self { events }
    }
}

impl GlobalHook for SimulatedHook {
    fn listen(self: Box<Self>, mut sink: Box<dyn FnMut(HookEvent) + Send>) {
        for event in self.events {
            sink(event);
        }
    }
}

#[cfg(feature = "global-hook")]
pub use rdev_backend::RdevHook;

#[cfg(feature = "global-hook")]
mod rdev_backend {
    use super::{GlobalHook, HookEvent, HookKey};
    use rdev::{EventType, Key};

    /// Listener backed by `rdev`.
    pub struct RdevHook;

    impl GlobalHook for RdevHook {
        fn listen(self: Box<Self>, mut sink: Box<dyn FnMut(HookEvent) + Send>) {
            let result = rdev::listen(move |event| {
                let raw = match event.event_type {
                    EventType::KeyPress(key) => {
                        HookEvent::KeyDown(translate(key, event.name.as_deref()))
                    }
                    EventType::KeyRelease(key) => HookEvent::KeyUp(translate(key, None)),
                    EventType::Wheel { delta_y, .. } if delta_y != 0 => {
                        // rdev reports positive delta_y for scrolling up
                        HookEvent::Wheel(-(delta_y.clamp(-64, 64) as i32))
                    }
                    _ => return,
                };
                sink(raw);
            });
            if let Err(e) = result {
                log::error!("global hook stopped: {e:?}");
            }
        }
    }

    fn translate(key: Key, name: Option<&str>) -> HookKey {
        match key {
            Key::ControlLeft | Key::ControlRight | Key::MetaLeft | Key::MetaRight => {
                return HookKey::Ctrl;
            }
            Key::UpArrow => return HookKey::Up,
            Key::DownArrow => return HookKey::Down,
            Key::LeftArrow => return HookKey::Left,
            Key::RightArrow => return HookKey::Right,
            Key::Escape => return HookKey::Esc,
            _ => {}
        }
        if let Some(ch) = name.and_then(single_char) {
            return HookKey::Char(ch);
        }
        key_char(key).map(HookKey::Char).unwrap_or(HookKey::Other)
    }

    fn single_char(name: &str) -> Option<char> {
        let mut chars = name.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) if !ch.is_control() => Some(ch),
            _ => None,
        }
    }

    /// Key releases carry no text, so letters and digits are named here.
    fn key_char(key: Key) -> Option<char> {
        let ch = match key {
            Key::KeyA => 'a',
            Key::KeyB => 'b',
            Key::KeyC => 'c',
            Key::KeyD => 'd',
            Key::KeyE => 'e',
            Key::KeyF => 'f',
            Key::KeyG => 'g',
            Key::KeyH => 'h',
            Key::KeyI => 'i',
            Key::KeyJ => 'j',
            Key::KeyK => 'k',
            Key::KeyL => 'l',
            Key::KeyM => 'm',
            Key::KeyN => 'n',
            Key::KeyO => 'o',
            Key::KeyP => 'p',
            Key::KeyQ => 'q',
            Key::KeyR => 'r',
            Key::KeyS => 's',
            Key::KeyT => 't',
            Key::KeyU => 'u',
            Key::KeyV => 'v',
            Key::KeyW => 'w',
            Key::KeyX => 'x',
            Key::KeyY => 'y',
            Key::KeyZ => 'z',
            Key::Num0 => '0',
            Key::Num1 => '1',
            Key::Num2 => '2',
            Key::Num3 => '3',
            Key::Num4 => '4',
            Key::Num5 => '5',
            Key::Num6 => '6',
            Key::Num7 => '7',
            Key::Num8 => '8',
            Key::Num9 => '9',
            _ => return None,
        };
        Some(ch)
    }
}
