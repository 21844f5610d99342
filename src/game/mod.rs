//! Core game logic module for Snake
//!
//! This module contains all the game logic without any I/O or rendering dependencies.
//! A [`GameInstance`] is a deterministic state machine driven by relative actions;
//! randomness (food placement) comes from the generator passed to it.

pub mod action;
pub mod config;
pub mod error;
pub mod instance;
pub mod state;

// Re-export commonly used types
pub use action::{Heading, RelativeAction};
pub use config::GameConfig;
pub use error::GameError;
pub use instance::{GameInstance, StepInfo, StepResult};
pub use state::{CollisionType, Position, Snake};
