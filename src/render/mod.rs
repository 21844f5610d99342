//! Render hooks
//!
//! The scheduler never draws anything itself. Once per frame it hands every
//! instance to a [`RenderHook`], read-only, and the hook decides what to do
//! with it.

mod text;

pub use text::TextRenderer;

use crate::game::GameInstance;

/// Receives a read-only view of every instance once per frame
pub trait RenderHook {
    fn draw(&mut self, index: usize, instance: &GameInstance, focused: bool);
}
