pub mod shortcuts;

pub use shortcuts::{EditCommand, ShortcutMap};

use egui::{Event, Key, Modifiers, PointerButton, Pos2, Vec2};

/// Input sampled once per tick.
///
/// Positions are relative to the timeline viewport's top-left corner; the
/// host translates from window coordinates before handing the frame over.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputFrame {
    pub pointer: Option<Pos2>,
    pub primary_pressed: bool,
    pub primary_down: bool,
    pub primary_released: bool,
    pub secondary_clicked: bool,
    pub double_clicked: bool,
    pub scroll_delta: Vec2,
    pub modifiers: Modifiers,
    pub keys_pressed: Vec<Key>,
}

impl InputFrame {
    /// Read an egui input state, translating positions so `origin` becomes (0, 0).
    pub fn from_egui(input: &egui::InputState, origin: Pos2) -> Self {
        let pointer = &input.pointer;
        let keys_pressed = input
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Key {
                    key, pressed: true, ..
                } => Some(*key),
                _ => None,
            })
            .collect();

        Self {
            pointer: pointer.hover_pos().map(|p| (p - origin).to_pos2()),
            primary_pressed: pointer.primary_pressed(),
            primary_down: pointer.primary_down(),
            primary_released: pointer.primary_released(),
            secondary_clicked: pointer.button_clicked(PointerButton::Secondary),
            double_clicked: pointer.button_double_clicked(PointerButton::Primary),
            scroll_delta: input.raw_scroll_delta,
            modifiers: input.modifiers,
            keys_pressed,
        }
    }

    pub fn key_pressed(&self, key: Key) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// Ctrl on Linux/Windows, Cmd on macOS.
    pub fn zoom_modifier(&self) -> bool {
        self.modifiers.command || self.modifiers.ctrl
    }

    /// Horizontal scroll amount; vertical wheels scroll horizontally too.
    pub fn horizontal_scroll(&self) -> f32 {
        if self.scroll_delta.x != 0.0 {
            self.scroll_delta.x
        } else {
            self.scroll_delta.y
        }
    }

    // ---------- builders for synthetic input ----------

    pub fn hover(pos: Pos2) -> Self {
        Self {
            pointer: Some(pos),
            ..Default::default()
        }
    }

    pub fn press(pos: Pos2) -> Self {
        Self {
            pointer: Some(pos),
            primary_pressed: true,
            primary_down: true,
            ..Default::default()
        }
    }

    pub fn drag(pos: Pos2) -> Self {
        Self {
            pointer: Some(pos),
            primary_down: true,
            ..Default::default()
        }
    }

    pub fn release(pos: Pos2) -> Self {
        Self {
            pointer: Some(pos),
            primary_released: true,
            ..Default::default()
        }
    }

    pub fn double_click(pos: Pos2) -> Self {
        Self {
            pointer: Some(pos),
            primary_released: true,
            double_clicked: true,
            ..Default::default()
        }
    }

    pub fn right_click(pos: Pos2) -> Self {
        Self {
            pointer: Some(pos),
            secondary_clicked: true,
            ..Default::default()
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_key(mut self, key: Key) -> Self {
        self.keys_pressed.push(key);
        self
    }

    pub fn with_scroll(mut self, delta: Vec2) -> Self {
        self.scroll_delta = delta;
        self
    }
}
