//! Chord capture over the raw hook stream.
//!
//! Three chords are recognised, whether or not the terminal has focus:
//!
//! - hold Ctrl, type the toggle sequence (`123` by default), release Ctrl:
//!   switch the global hook on or off;
//! - hold `m`, type a name, release `m`: record a named mark;
//! - hold `n`, type a name, release `n`: restore a named mark.
//!
//! Outside a chord, key presses and wheel rotation are forwarded only while
//! the hook is the active input source.

use crossterm::event::KeyEvent;

use super::hook::{HookEvent, HookKey, hook_key_to_event};

pub const DEFAULT_TOGGLE_SEQUENCE: &str = "123";

const RECORD_KEY: char = 'm';
const RESTORE_KEY: char = 'n';

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChordState {
    #[default]
    Idle,
    CtrlHeld(String),
    MarkRecordHeld(String),
    MarkRestoreHeld(String),
}

/// What a completed chord (or a plain forwarded input) asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChordOutcome {
    Forward(KeyEvent),
    Wheel(i32),
    ToggleHook,
    Record(String),
    Restore(String),
}

#[derive(Debug)]
pub struct ChordMachine {
    state: ChordState,
    toggle_sequence: String,
}

impl Default for ChordMachine {
    fn default() -> Self {
        Self::new(DEFAULT_TOGGLE_SEQUENCE)
    }
}

impl ChordMachine {
    pub fn new(toggle_sequence: &str) -> Self {
        Self {
            state: ChordState::Idle,
            toggle_sequence: toggle_sequence.to_string(),
        }
    }

    pub fn state(&self) -> &ChordState {
        &self.state
    }

    /// Advances the machine by one raw event. `hook_enabled` tells whether
    /// plain input should be forwarded.
    pub fn feed(&mut self, event: HookEvent, hook_enabled: bool) -> Option<ChordOutcome> {
        let state = std::mem::take(&mut self.state);
        let previous = std::mem::discriminant(&state);
        let (next, outcome) = match (state, event) {
            (ChordState::Idle, HookEvent::KeyDown(HookKey::Ctrl)) => {
                (ChordState::CtrlHeld(String::new()), None)
            }
            (ChordState::Idle, HookEvent::KeyDown(HookKey::Char(RECORD_KEY))) => {
                (ChordState::MarkRecordHeld(String::new()), None)
            }
            (ChordState::Idle, HookEvent::KeyDown(HookKey::Char(RESTORE_KEY))) => {
                (ChordState::MarkRestoreHeld(String::new()), None)
            }
            (ChordState::Idle, HookEvent::KeyDown(key)) => {
                let forwarded = if hook_enabled {
                    hook_key_to_event(key).map(ChordOutcome::Forward)
                } else {
                    None
                };
                (ChordState::Idle, forwarded)
            }
            (ChordState::Idle, HookEvent::Wheel(delta)) => {
                let forwarded = (hook_enabled && delta != 0).then_some(ChordOutcome::Wheel(delta));
                (ChordState::Idle, forwarded)
            }

            (ChordState::CtrlHeld(buffer), HookEvent::KeyUp(HookKey::Ctrl)) => {
                let outcome = (buffer == self.toggle_sequence).then_some(ChordOutcome::ToggleHook);
                (ChordState::Idle, outcome)
            }
            (ChordState::CtrlHeld(mut buffer), HookEvent::KeyDown(HookKey::Char(ch))) => {
                buffer.push(ch);
                (ChordState::CtrlHeld(buffer), None)
            }

            (ChordState::MarkRecordHeld(name), HookEvent::KeyUp(HookKey::Char(RECORD_KEY))) => {
                (ChordState::Idle, Some(ChordOutcome::Record(name)))
            }
            (ChordState::MarkRestoreHeld(name), HookEvent::KeyUp(HookKey::Char(RESTORE_KEY))) => {
                (ChordState::Idle, Some(ChordOutcome::Restore(name)))
            }
            (ChordState::MarkRecordHeld(mut name), HookEvent::KeyDown(HookKey::Char(ch)))
                if ch != RECORD_KEY =>
            {
                name.push(ch);
                (ChordState::MarkRecordHeld(name), None)
            }
            (ChordState::MarkRestoreHeld(mut name), HookEvent::KeyDown(HookKey::Char(ch)))
                if ch != RESTORE_KEY =>
            {
                name.push(ch);
                (ChordState::MarkRestoreHeld(name), None)
            }

            // key repeats of the held key, releases of other keys, wheel
            // rotation mid-chord
            (state, _) => (state, None),
        };
        if std::mem::discriminant(&next) != previous {
            log::debug!("chord state -> {next:?}");
        }
        self.state = next;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyCode;

    fn down(c: char) -> HookEvent {
        HookEvent::KeyDown(HookKey::Char(c))
    }

    fn up(c: char) -> HookEvent {
        HookEvent::KeyUp(HookKey::Char(c))
    }

    fn feed_all(machine: &mut ChordMachine, events: &[HookEvent], enabled: bool) -> Vec<ChordOutcome> {
        events
            .iter()
            .filter_map(|e| machine.feed(*e, enabled))
            .collect()
    }

    fn ctrl_chord(digits: &str) -> Vec<HookEvent> {
        let mut events = vec![HookEvent::KeyDown(HookKey::Ctrl)];
        for c in digits.chars() {
            events.push(down(c));
            events.push(up(c));
        }
        events.push(HookEvent::KeyUp(HookKey::Ctrl));
        events
    }

    #[test]
    fn toggle_sequence_toggles() {
        let mut machine = ChordMachine::default();
        let outcomes = feed_all(&mut machine, &ctrl_chord("123"), false);
        assert_eq!(outcomes, vec![ChordOutcome::ToggleHook]);
        assert_eq!(*machine.state(), ChordState::Idle);
    }

    #[test]
    fn other_sequences_do_not_toggle() {
        for digits in ["", "12", "321", "1234", "124"] {
            let mut machine = ChordMachine::default();
            let outcomes = feed_all(&mut machine, &ctrl_chord(digits), true);
            assert!(outcomes.is_empty(), "sequence {digits:?} toggled");
            assert_eq!(*machine.state(), ChordState::Idle);
        }
    }

    #[test]
    fn buffer_is_cleared_between_chords() {
        let mut machine = ChordMachine::default();
        feed_all(&mut machine, &ctrl_chord("12"), true);
        let outcomes = feed_all(&mut machine, &ctrl_chord("3"), true);
        assert!(outcomes.is_empty());
    }

    #[test]
    fn held_ctrl_repeats_keep_the_buffer() {
        let mut machine = ChordMachine::default();
        let events = [
            HookEvent::KeyDown(HookKey::Ctrl),
            down('1'),
            HookEvent::KeyDown(HookKey::Ctrl),
            down('2'),
            down('3'),
            HookEvent::KeyUp(HookKey::Ctrl),
        ];
        assert_eq!(
            feed_all(&mut machine, &events, false),
            vec![ChordOutcome::ToggleHook]
        );
    }

    #[test]
    fn custom_toggle_sequence() {
        let mut machine = ChordMachine::new("99");
        assert!(feed_all(&mut machine, &ctrl_chord("123"), false).is_empty());
        assert_eq!(
            feed_all(&mut machine, &ctrl_chord("99"), false),
            vec![ChordOutcome::ToggleHook]
        );
    }

    #[test]
    fn mark_record_collects_name() {
        let mut machine = ChordMachine::default();
        let events = [down('m'), down('m'), down('a'), up('a'), down('b'), up('b'), up('m')];
        assert_eq!(
            feed_all(&mut machine, &events, true),
            vec![ChordOutcome::Record("ab".to_string())]
        );
    }

    #[test]
    fn mark_restore_collects_name_even_when_disabled() {
        let mut machine = ChordMachine::default();
        let events = [down('n'), down('x'), up('x'), up('n')];
        assert_eq!(
            feed_all(&mut machine, &events, false),
            vec![ChordOutcome::Restore("x".to_string())]
        );
    }

    #[test]
    fn empty_mark_name_is_allowed() {
        let mut machine = ChordMachine::default();
        assert_eq!(
            feed_all(&mut machine, &[down('m'), up('m')], true),
            vec![ChordOutcome::Record(String::new())]
        );
    }

    #[test]
    fn plain_keys_forward_only_when_enabled() {
        let mut machine = ChordMachine::default();
        assert_eq!(machine.feed(down('j'), false), None);
        match machine.feed(down('j'), true) {
            Some(ChordOutcome::Forward(key)) => assert_eq!(key.code, KeyCode::Char('j')),
            other => panic!("unexpected {other:?}"),
        }
        match machine.feed(HookEvent::KeyDown(HookKey::Down), true) {
            Some(ChordOutcome::Forward(key)) => assert_eq!(key.code, KeyCode::Down),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(machine.feed(HookEvent::KeyDown(HookKey::Other), true), None);
    }

    #[test]
    fn escape_is_forwarded_when_enabled() {
        let mut machine = ChordMachine::default();
        assert_eq!(machine.feed(HookEvent::KeyDown(HookKey::Esc), false), None);
        match machine.feed(HookEvent::KeyDown(HookKey::Esc), true) {
            Some(ChordOutcome::Forward(key)) => {
                assert_eq!(key.code, KeyCode::Esc);
                assert_eq!(
                    crate::navigation::action_for(&key),
                    Some(crate::navigation::Action::Exit)
                );
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(machine.state(), &ChordState::Idle);
    }

    #[test]
    fn wheel_forwards_only_when_enabled() {
        let mut machine = ChordMachine::default();
        assert_eq!(machine.feed(HookEvent::Wheel(3), false), None);
        assert_eq!(
            machine.feed(HookEvent::Wheel(-2), true),
            Some(ChordOutcome::Wheel(-2))
        );
    }

    #[test]
    fn keys_inside_chords_are_not_forwarded() {
        let mut machine = ChordMachine::default();
        let events = [HookEvent::KeyDown(HookKey::Ctrl), down('j'), HookEvent::Wheel(1)];
        assert!(feed_all(&mut machine, &events, true).is_empty());
        assert_eq!(*machine.state(), ChordState::CtrlHeld("j".to_string()));
    }
}
