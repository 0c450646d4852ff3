use egui::{Key, Modifiers};
use serde::{Deserialize, Serialize};

use super::InputFrame;

/// Clip commands triggered from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EditCommand {
    Delete,
    Copy,
    Paste,
    Duplicate,
}

/// A single keybind (modifier + key)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keybind {
    pub command: bool,
    pub shift: bool,
    pub key: Key,
}

impl Keybind {
    const fn plain(key: Key) -> Self {
        Self {
            command: false,
            shift: false,
            key,
        }
    }

    const fn cmd(key: Key) -> Self {
        Self {
            command: true,
            shift: false,
            key,
        }
    }

    pub fn modifiers_match(&self, m: &Modifiers) -> bool {
        let command = m.command || m.ctrl;
        command == self.command && m.shift == self.shift && !m.alt
    }
}

#[derive(Debug, Clone)]
pub struct ShortcutMap {
    bindings: Vec<(EditCommand, Keybind)>,
}

impl Default for ShortcutMap {
    fn default() -> Self {
        Self {
            bindings: vec![
                (EditCommand::Delete, Keybind::plain(Key::Delete)),
                (EditCommand::Delete, Keybind::plain(Key::Backspace)),
                (EditCommand::Copy, Keybind::cmd(Key::C)),
                (EditCommand::Paste, Keybind::cmd(Key::V)),
                (EditCommand::Duplicate, Keybind::cmd(Key::D)),
            ],
        }
    }
}

impl ShortcutMap {
    pub fn bind(&mut self, command: EditCommand, bind: Keybind) {
        self.bindings.retain(|(c, b)| !(*c == command && *b == bind));
        self.bindings.push((command, bind));
    }

    /// Commands whose key was pressed this frame with matching modifiers.
    pub fn commands(&self, frame: &InputFrame) -> Vec<EditCommand> {
        let mut out = Vec::new();
        for (command, bind) in &self.bindings {
            if frame.key_pressed(bind.key)
                && bind.modifiers_match(&frame.modifiers)
                && !out.contains(command)
            {
                out.push(*command);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    #[test]
    fn ctrl_letters_map_to_clipboard_commands() {
        let map = ShortcutMap::default();
        let frame = InputFrame::hover(pos2(0.0, 0.0))
            .with_key(Key::V)
            .with_modifiers(Modifiers::CTRL);
        assert_eq!(map.commands(&frame), vec![EditCommand::Paste]);

        let bare = InputFrame::hover(pos2(0.0, 0.0)).with_key(Key::V);
        assert!(map.commands(&bare).is_empty());
    }

    #[test]
    fn delete_needs_no_modifier() {
        let map = ShortcutMap::default();
        let frame = InputFrame::default().with_key(Key::Delete);
        assert_eq!(map.commands(&frame), vec![EditCommand::Delete]);
    }
}
