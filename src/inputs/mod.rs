pub mod chord;
pub mod event_source;
pub mod hook;
pub mod unifier;

pub use chord::{ChordMachine, ChordOutcome, ChordState};
pub use event_source::{EventSource, KeyboardEventSource, SimulatedEventSource};
pub use hook::{GlobalHook, HookEvent, HookKey};
pub use unifier::{EventUnifier, HookListener, HookSwitch, InputEvent};
