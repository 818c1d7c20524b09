//! Keyboard handling for the interactive remote
//!
//! Terminal key events are turned into [`Action`]s; the event loop carries
//! them out against the selected device. In typing mode every key goes to
//! the device's on-screen keyboard instead.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::config::ChannelPreset;
use crate::models::{InputSource, Key};

/// Input mode for keyboard handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Keys map to remote buttons
    #[default]
    Normal,
    /// Keys are typed as characters
    Typing,
}

/// What a key press asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,
    Press(Key),
    /// Character plus keysym name, as fed to the literal-key mapping
    Type { ch: Option<char>, keysym: String },
    SwitchInput(InputSource),
    Launch(ChannelPreset),
    TogglePower,
    NextDevice,
    PrevDevice,
    Rediscover,
}

/// UI-side state that is not part of the remote itself
#[derive(Debug)]
pub struct Controls {
    pub mode: InputMode,
    pub running: bool,
    pub show_help: bool,
    /// Input that `i` switches to next
    pub input: InputSource,
    /// Last thing sent, for the status bar
    pub last_sent: Option<String>,
    /// Launch presets; digit n launches entry n-1
    pub channels: Vec<ChannelPreset>,
}

impl Default for Controls {
    fn default() -> Self {
        Self::new()
    }
}

impl Controls {
    pub fn new() -> Self {
        Self {
            mode: InputMode::Normal,
            running: true,
            show_help: false,
            input: InputSource::Hdmi1,
            last_sent: None,
            channels: Vec::new(),
        }
    }

    pub fn with_channels(mut self, channels: Vec<ChannelPreset>) -> Self {
        self.channels = channels;
        self
    }

    /// Handle a key event. UI-only keys are applied here; anything that
    /// needs the device is returned.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Action> {
        // Ctrl+C always quits
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.running = false;
            return Some(Action::Quit);
        }

        match self.mode {
            InputMode::Typing => self.handle_typing(key),
            InputMode::Normal => self.handle_normal(key),
        }
    }

    fn handle_typing(&mut self, key: KeyEvent) -> Option<Action> {
        let (ch, keysym) = match key.code {
            KeyCode::Esc => {
                self.mode = InputMode::Normal;
                return None;
            }
            KeyCode::Char(c) => (Some(c), c.to_string()),
            KeyCode::Enter => (None, "Return".to_string()),
            KeyCode::Backspace => (None, "BackSpace".to_string()),
            KeyCode::Delete => (None, "Delete".to_string()),
            KeyCode::Up => (None, "Up".to_string()),
            KeyCode::Down => (None, "Down".to_string()),
            KeyCode::Left => (None, "Left".to_string()),
            KeyCode::Right => (None, "Right".to_string()),
            KeyCode::Home => (None, "Home".to_string()),
            KeyCode::F(n) => (None, format!("F{}", n)),
            _ => return None,
        };
        Some(Action::Type { ch, keysym })
    }

    fn handle_normal(&mut self, key: KeyEvent) -> Option<Action> {
        let action = match key.code {
            KeyCode::Char('q') => {
                self.running = false;
                Action::Quit
            }
            KeyCode::Char('?') => {
                self.show_help = !self.show_help;
                return None;
            }
            KeyCode::Char('t') | KeyCode::Char('/') => {
                self.mode = InputMode::Typing;
                return None;
            }

            KeyCode::Up | KeyCode::Char('k') => Action::Press(Key::Up),
            KeyCode::Down | KeyCode::Char('j') => Action::Press(Key::Down),
            KeyCode::Left | KeyCode::Char('h') => Action::Press(Key::Left),
            KeyCode::Right | KeyCode::Char('l') => Action::Press(Key::Right),
            KeyCode::Enter => Action::Press(Key::Select),
            KeyCode::Backspace | KeyCode::Esc => Action::Press(Key::Back),
            KeyCode::Home | KeyCode::Char('H') => Action::Press(Key::Home),

            KeyCode::Char(' ') | KeyCode::Char('p') => Action::Press(Key::Play),
            KeyCode::Char('<') | KeyCode::Char(',') => Action::Press(Key::Rev),
            KeyCode::Char('>') | KeyCode::Char('.') => Action::Press(Key::Fwd),
            KeyCode::Char('r') => Action::Press(Key::InstantReplay),
            KeyCode::Char('*') => Action::Press(Key::Info),
            KeyCode::Char('s') => Action::Press(Key::Search),
            KeyCode::Char('g') => Action::Press(Key::LiveTv),

            KeyCode::Char('+') | KeyCode::Char('=') => Action::Press(Key::VolumeUp),
            KeyCode::Char('-') => Action::Press(Key::VolumeDown),
            KeyCode::Char('m') => Action::Press(Key::VolumeMute),
            KeyCode::PageUp => Action::Press(Key::ChannelUp),
            KeyCode::PageDown => Action::Press(Key::ChannelDown),

            KeyCode::Char('i') => {
                let input = self.input;
                self.input = input.next();
                Action::SwitchInput(input)
            }
            KeyCode::Char(c @ '1'..='9') => {
                let index = c as usize - '1' as usize;
                Action::Launch(self.channels.get(index)?.clone())
            }
            KeyCode::Char('o') => Action::TogglePower,
            KeyCode::Tab => Action::NextDevice,
            KeyCode::BackTab => Action::PrevDevice,
            KeyCode::Char('d') => Action::Rediscover,

            _ => return None,
        };
        Some(action)
    }
}

/// Key help shown in the help panel: (keys, what they do)
pub const HELP: &[(&str, &str)] = &[
    ("←↑↓→ / hjkl", "navigate"),
    ("Enter", "OK"),
    ("Backspace/Esc", "back"),
    ("H / Home", "home"),
    ("Space / p", "play/pause"),
    ("< >", "rewind / fast forward"),
    ("r", "instant replay"),
    ("*", "options"),
    ("s", "search"),
    ("g", "guide"),
    ("+ - m", "volume up / down / mute"),
    ("PgUp PgDn", "channel up / down"),
    ("i", "next input"),
    ("1-9", "launch channel preset"),
    ("o", "power"),
    ("t or /", "type text (Esc to stop)"),
    ("Tab / Shift+Tab", "next / previous device"),
    ("d", "rediscover"),
    ("?", "toggle help"),
    ("q", "quit"),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_navigation_keys() {
        let mut controls = Controls::new();
        assert_eq!(
            controls.handle_key(press(KeyCode::Up)),
            Some(Action::Press(Key::Up))
        );
        assert_eq!(
            controls.handle_key(press(KeyCode::Enter)),
            Some(Action::Press(Key::Select))
        );
        assert_eq!(
            controls.handle_key(press(KeyCode::Esc)),
            Some(Action::Press(Key::Back))
        );
    }

    #[test]
    fn test_quit() {
        let mut controls = Controls::new();
        assert_eq!(controls.handle_key(press(KeyCode::Char('q'))), Some(Action::Quit));
        assert!(!controls.running);

        let mut controls = Controls::new();
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(controls.handle_key(ctrl_c), Some(Action::Quit));
        assert!(!controls.running);
    }

    #[test]
    fn test_typing_mode_sends_characters() {
        let mut controls = Controls::new();
        assert_eq!(controls.handle_key(press(KeyCode::Char('t'))), None);
        assert_eq!(controls.mode, InputMode::Typing);

        assert_eq!(
            controls.handle_key(press(KeyCode::Char('q'))),
            Some(Action::Type {
                ch: Some('q'),
                keysym: "q".to_string()
            })
        );
        assert!(controls.running);

        assert_eq!(
            controls.handle_key(press(KeyCode::Enter)),
            Some(Action::Type {
                ch: None,
                keysym: "Return".to_string()
            })
        );

        assert_eq!(controls.handle_key(press(KeyCode::Esc)), None);
        assert_eq!(controls.mode, InputMode::Normal);
    }

    #[test]
    fn test_input_cycles() {
        let mut controls = Controls::new();
        assert_eq!(
            controls.handle_key(press(KeyCode::Char('i'))),
            Some(Action::SwitchInput(InputSource::Hdmi1))
        );
        assert_eq!(
            controls.handle_key(press(KeyCode::Char('i'))),
            Some(Action::SwitchInput(InputSource::Hdmi2))
        );
    }

    #[test]
    fn test_digits_launch_presets() {
        let netflix = ChannelPreset {
            id: "12".to_string(),
            label: "Netflix".to_string(),
        };
        let youtube = ChannelPreset {
            id: "837".to_string(),
            label: "YouTube".to_string(),
        };
        let mut controls = Controls::new().with_channels(vec![netflix.clone(), youtube.clone()]);

        assert_eq!(
            controls.handle_key(press(KeyCode::Char('1'))),
            Some(Action::Launch(netflix))
        );
        assert_eq!(
            controls.handle_key(press(KeyCode::Char('2'))),
            Some(Action::Launch(youtube))
        );
        // No third preset
        assert_eq!(controls.handle_key(press(KeyCode::Char('3'))), None);
    }

    #[test]
    fn test_digits_are_typed_in_typing_mode() {
        let mut controls = Controls::new().with_channels(vec![ChannelPreset {
            id: "12".to_string(),
            label: "Netflix".to_string(),
        }]);
        controls.mode = InputMode::Typing;
        assert_eq!(
            controls.handle_key(press(KeyCode::Char('1'))),
            Some(Action::Type {
                ch: Some('1'),
                keysym: "1".to_string()
            })
        );
    }

    #[test]
    fn test_help_toggle_is_local() {
        let mut controls = Controls::new();
        assert_eq!(controls.handle_key(press(KeyCode::Char('?'))), None);
        assert!(controls.show_help);
    }
}
