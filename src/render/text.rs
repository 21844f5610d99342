use std::fmt::Write;

use super::RenderHook;
use crate::game::{GameInstance, Position};

/// Plain-text grid renderer
///
/// Keeps the latest frame of every instance; the focused one can be dumped to
/// the log by the training loop.
#[derive(Debug, Default)]
pub struct TextRenderer {
    frames: Vec<String>,
    focused: Option<usize>,
}

impl TextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest frame drawn for an instance
    pub fn frame(&self, index: usize) -> Option<&str> {
        self.frames.get(index).map(String::as_str)
    }

    /// Latest frame of the focused instance
    pub fn focused_frame(&self) -> Option<&str> {
        self.focused.and_then(|index| self.frame(index))
    }

    fn render_grid(instance: &GameInstance) -> String {
        let head = instance.head();
        let mut out = String::new();

        for y in 0..instance.height() {
            for x in 0..instance.width() {
                let pos = Position::new(x as i32, y as i32);

                let cell = if pos == head {
                    "■ "
                } else if instance.body().contains(&pos) {
                    "□ "
                } else if pos == instance.food() {
                    "O "
                } else {
                    ". "
                };
                out.push_str(cell);
            }
            out.truncate(out.trim_end().len());
            out.push('\n');
        }

        let _ = write!(
            out,
            "score {} | steps {}{}",
            instance.score(),
            instance.step_count(),
            if instance.is_terminal() { " | dead" } else { "" }
        );
        out
    }
}

impl RenderHook for TextRenderer {
    fn draw(&mut self, index: usize, instance: &GameInstance, focused: bool) {
        if self.frames.len() <= index {
            self.frames.resize(index + 1, String::new());
        }
        self.frames[index] = Self::render_grid(instance);

        if focused {
            self.focused = Some(index);
        }
    }
}
