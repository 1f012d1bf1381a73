use std::path::Path;

use chip8::KeyCode;
use serde::Deserialize;
use smol_str::SmolStr;

use crate::error::AppError;

/// Named action that stops the interpreter and exits.
pub const ACTION_QUIT: &str = "quit";

/// Left-hand side of a qwerty keyboard, laid out like the hexadecimal keypad.
///
/// ```text
/// 1 2 3 4      1 2 3 C
/// q w e r  ->  4 5 6 D
/// a s d f      7 8 9 E
/// z x c v      A 0 B F
/// ```
const CONVENTIONAL_KEYMAP: [(char, KeyCode); 16] = [
    ('x', KeyCode::Key0),
    ('1', KeyCode::Key1),
    ('2', KeyCode::Key2),
    ('3', KeyCode::Key3),
    ('q', KeyCode::Key4),
    ('w', KeyCode::Key5),
    ('e', KeyCode::Key6),
    ('a', KeyCode::Key7),
    ('s', KeyCode::Key8),
    ('d', KeyCode::Key9),
    ('z', KeyCode::KeyA),
    ('c', KeyCode::KeyB),
    ('4', KeyCode::KeyC),
    ('r', KeyCode::KeyD),
    ('f', KeyCode::KeyE),
    ('v', KeyCode::KeyF),
];

/// Input mapper
///
/// Maps terminal key presses to either Chip8 keycodes (suitable to be used in the VM),
/// or application specific named actions.
///
/// - *Chip8 Keycode*: These are the 16 keys of the old COSMAC VIP computer.
/// - *Named Action*: These are application specific input events that are
///   identified by a readable string.
#[derive(Debug)]
pub struct InputMap {
    /// Mapping of host keyboard keys to inputs.
    keys: Box<[(char, InputKind)]>,
}

#[derive(Debug, Deserialize)]
struct InputDef {
    chip8: Option<KeyCode>,
    action: Option<SmolStr>,
    keyboard_keys: Option<Vec<char>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    Action(SmolStr),
    Chip8(KeyCode),
}

impl InputMap {
    pub fn from_file(filepath: impl AsRef<Path>) -> Result<Self, AppError> {
        let source = std::fs::read_to_string(filepath.as_ref())?;
        Self::from_yaml(&source)
    }

    /// Parse a list of input definitions.
    ///
    /// Each definition maps its `keyboard_keys` to either a `chip8` key or
    /// a named `action`. A key that appears twice keeps its first mapping.
    pub fn from_yaml(source: &str) -> Result<Self, AppError> {
        let defs: Vec<InputDef> = serde_yaml::from_str(source)?;
        log::debug!("loaded input definitions: {:#?}", defs);

        let mut keys = Vec::new();

        for (index, def) in defs.into_iter().enumerate() {
            let kind = match (def.chip8, def.action) {
                (Some(keycode), None) => InputKind::Chip8(keycode),
                (None, Some(action)) => InputKind::Action(action),
                _ => {
                    return Err(AppError::config(format!(
                        "input definition {index} must have exactly one of `chip8` or `action`"
                    )))
                }
            };

            // lift keycodes out of the definitions
            for key in def.keyboard_keys.unwrap_or_default() {
                keys.push((key.to_ascii_lowercase(), kind.clone()));
            }
        }

        Ok(InputMap {
            keys: keys.into_boxed_slice(),
        })
    }

    /// Built-in layout, with `p` bound to quit.
    pub fn conventional() -> Self {
        let keys = CONVENTIONAL_KEYMAP
            .iter()
            .map(|(key, keycode)| (*key, InputKind::Chip8(*keycode)))
            .chain(std::iter::once(('p', InputKind::Action(ACTION_QUIT.into()))))
            .collect();

        InputMap { keys }
    }

    /// Given a user input key, map it to either a Chip8 key, or a named action.
    pub fn map_key(&self, key: char) -> Option<&InputKind> {
        let key = key.to_ascii_lowercase();
        self.keys
            .iter()
            .find(|(keycode, _)| *keycode == key)
            .map(|(_, kind)| kind)
    }
}

impl Default for InputMap {
    fn default() -> Self {
        Self::conventional()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_conventional() {
        let inputmap = InputMap::conventional();
        assert_eq!(inputmap.map_key('1'), Some(&InputKind::Chip8(KeyCode::Key1)));
        assert_eq!(inputmap.map_key('4'), Some(&InputKind::Chip8(KeyCode::KeyC)));
        assert_eq!(inputmap.map_key('x'), Some(&InputKind::Chip8(KeyCode::Key0)));
        assert_eq!(inputmap.map_key('V'), Some(&InputKind::Chip8(KeyCode::KeyF)));
        assert_eq!(
            inputmap.map_key('p'),
            Some(&InputKind::Action(ACTION_QUIT.into()))
        );
        assert_eq!(inputmap.map_key('m'), None);
    }

    #[test]
    fn test_actions() {
        let inputmap = InputMap::from_yaml(
            r#"
- chip8: 5
  keyboard_keys: ["k", "5"]
- action: quit
  keyboard_keys: ["Q"]
- chip8: 15
"#,
        )
        .unwrap();

        assert_eq!(inputmap.map_key('k'), Some(&InputKind::Chip8(KeyCode::Key5)));
        assert_eq!(inputmap.map_key('5'), Some(&InputKind::Chip8(KeyCode::Key5)));
        assert_eq!(
            inputmap.map_key('q'),
            Some(&InputKind::Action(ACTION_QUIT.into()))
        );
        assert_eq!(inputmap.map_key('f'), None);
    }

    #[test]
    fn test_invalid_definitions() {
        // out of keypad range
        assert!(InputMap::from_yaml("- chip8: 16\n  keyboard_keys: [\"a\"]\n").is_err());
        // neither key nor action
        assert!(InputMap::from_yaml("- keyboard_keys: [\"a\"]\n").is_err());
        // both key and action
        assert!(InputMap::from_yaml("- chip8: 1\n  action: quit\n").is_err());
    }

    #[test]
    fn test_sample_keymap() {
        let inputmap = InputMap::from_yaml(include_str!("../keymap.yaml")).unwrap();
        let conventional = InputMap::conventional();

        for (key, _) in CONVENTIONAL_KEYMAP.iter() {
            assert_eq!(inputmap.map_key(*key), conventional.map_key(*key));
        }
        assert_eq!(
            inputmap.map_key('p'),
            Some(&InputKind::Action(ACTION_QUIT.into()))
        );
    }
}
