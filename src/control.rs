//! In-process control plane between the trainer and an external surface
//!
//! Three channels connect the two sides:
//! - settings: latest value wins (`watch`)
//! - commands: bounded FIFO, drained at the start of every scheduler iteration (`mpsc`)
//! - telemetry: latest value wins (`watch`), overwritten once per iteration
//!
//! The scheduler owns the [`ControlEndpoint`]; anything that wants to steer or
//! observe training holds a cloneable [`ControlHandle`].

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::game::Position;

/// Default depth of the command queue
pub const DEFAULT_COMMAND_CAPACITY: usize = 64;

/// Externally adjustable run settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Simulation ticks per second
    pub tick_rate: f64,
    pub paused: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tick_rate: 30.0,
            paused: false,
        }
    }
}

/// State of the focused instance plus training progress
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Telemetry {
    pub focused: usize,
    /// Focused instance shown on its own instead of the grid of all instances
    pub fullscreen: bool,
    pub score: u32,
    pub episode_count: usize,
    pub body: Vec<Position>,
    pub food: Option<Position>,
    pub tick_rate: f64,
    pub paused: bool,
    pub total_ticks: u64,
    pub best_score: u32,
    pub mean_score: f32,
    pub epsilon: f64,
}

/// Errors returned to the external side when submitting commands
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    #[error("command queue is full; retry later")]
    CommandQueueFull,
    #[error("command queue has been closed")]
    CommandQueueClosed,
    #[error("trainer has shut down")]
    Disconnected,
}

/// Create a connected handle/endpoint pair
pub fn channel(settings: Settings, command_capacity: usize) -> (ControlHandle, ControlEndpoint) {
    let (settings_tx, settings_rx) = watch::channel(settings);
    let (command_tx, command_rx) = mpsc::channel(command_capacity.max(1));
    let (telemetry_tx, telemetry_rx) = watch::channel(Telemetry::default());

    let handle = ControlHandle {
        settings: settings_tx,
        commands: command_tx,
        telemetry: telemetry_rx,
    };
    let endpoint = ControlEndpoint {
        settings: settings_rx,
        commands: command_rx,
        telemetry: telemetry_tx,
    };
    (handle, endpoint)
}

/// External side of the control plane
#[derive(Debug, Clone)]
pub struct ControlHandle {
    settings: watch::Sender<Settings>,
    commands: mpsc::Sender<String>,
    telemetry: watch::Receiver<Telemetry>,
}

impl ControlHandle {
    /// Replace the settings; the trainer picks them up on its next iteration
    pub fn update_settings(&self, settings: Settings) -> Result<(), ControlError> {
        self.settings
            .send(settings)
            .map_err(|_| ControlError::Disconnected)
    }

    /// Edit the current settings in place
    pub fn modify_settings(&self, edit: impl FnOnce(&mut Settings)) {
        self.settings.send_modify(edit);
    }

    /// Queue a command string without waiting
    pub fn send_command(&self, command: impl Into<String>) -> Result<(), ControlError> {
        match self.commands.try_send(command.into()) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(command)) => {
                warn!(%command, "control command queue full; dropping command");
                Err(ControlError::CommandQueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(command)) => {
                warn!(%command, "control command queue disconnected");
                Err(ControlError::CommandQueueClosed)
            }
        }
    }

    /// Most recently published telemetry
    pub fn telemetry(&self) -> Telemetry {
        self.telemetry.borrow().clone()
    }

    /// Receiver that is notified on every publish
    pub fn subscribe(&self) -> watch::Receiver<Telemetry> {
        self.telemetry.clone()
    }
}

/// Trainer side of the control plane
#[derive(Debug)]
pub struct ControlEndpoint {
    settings: watch::Receiver<Settings>,
    commands: mpsc::Receiver<String>,
    telemetry: watch::Sender<Telemetry>,
}

impl ControlEndpoint {
    /// Copy of the latest settings
    pub fn settings(&self) -> Settings {
        self.settings.borrow().clone()
    }

    /// Latest settings if they changed since the last call
    pub fn changed_settings(&mut self) -> Option<Settings> {
        match self.settings.has_changed() {
            Ok(true) => Some(self.settings.borrow_and_update().clone()),
            _ => None,
        }
    }

    /// Take every queued command, oldest first
    pub fn drain_commands(&mut self) -> Vec<String> {
        let mut drained = Vec::new();
        while let Ok(command) = self.commands.try_recv() {
            debug!(%command, "received control command");
            drained.push(command);
        }
        drained
    }

    /// Overwrite the published telemetry
    ///
    /// Succeeds even when nobody is listening.
    pub fn publish(&self, telemetry: Telemetry) {
        self.telemetry.send_replace(telemetry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_latest_value_wins() {
        let (handle, endpoint) = channel(Settings::default(), 4);

        handle
            .update_settings(Settings {
                tick_rate: 10.0,
                paused: false,
            })
            .unwrap();
        handle.modify_settings(|s| s.paused = true);

        assert_eq!(
            endpoint.settings(),
            Settings {
                tick_rate: 10.0,
                paused: true
            }
        );
    }

    #[test]
    fn test_changed_settings_reported_once() {
        let (handle, mut endpoint) = channel(Settings::default(), 4);
        assert_eq!(endpoint.changed_settings(), None);

        handle.modify_settings(|s| s.tick_rate = 5.0);

        assert_eq!(endpoint.changed_settings().map(|s| s.tick_rate), Some(5.0));
        assert_eq!(endpoint.changed_settings(), None);
    }

    #[test]
    fn test_commands_drain_in_order_once() {
        let (handle, mut endpoint) = channel(Settings::default(), 4);
        handle.send_command("RESET").unwrap();
        handle.send_command("FOCUS_2").unwrap();

        assert_eq!(endpoint.drain_commands(), vec!["RESET", "FOCUS_2"]);
        assert!(endpoint.drain_commands().is_empty());
    }

    #[test]
    fn test_full_queue_rejects_command() {
        let (handle, _endpoint) = channel(Settings::default(), 1);
        handle.send_command("PAUSE").unwrap();

        assert_eq!(
            handle.send_command("RESUME"),
            Err(ControlError::CommandQueueFull)
        );
    }

    #[test]
    fn test_closed_queue_rejects_command() {
        let (handle, endpoint) = channel(Settings::default(), 4);
        drop(endpoint);

        assert_eq!(
            handle.send_command("RESET"),
            Err(ControlError::CommandQueueClosed)
        );
        assert_eq!(
            handle.update_settings(Settings::default()),
            Err(ControlError::Disconnected)
        );
    }

    #[test]
    fn test_telemetry_overwritten() {
        let (handle, endpoint) = channel(Settings::default(), 4);
        let mut subscriber = handle.subscribe();

        endpoint.publish(Telemetry {
            score: 1,
            ..Telemetry::default()
        });
        endpoint.publish(Telemetry {
            score: 2,
            ..Telemetry::default()
        });

        assert!(subscriber.has_changed().unwrap());
        assert_eq!(subscriber.borrow_and_update().score, 2);
        assert_eq!(handle.telemetry().score, 2);
    }

    #[test]
    fn test_telemetry_serializes() {
        let telemetry = Telemetry {
            body: vec![Position::new(8, 8), Position::new(7, 8)],
            food: Some(Position::new(1, 2)),
            ..Telemetry::default()
        };

        let json = serde_json::to_value(&telemetry).unwrap();
        assert_eq!(json["body"][0]["x"], 8);
        assert_eq!(json["food"]["y"], 2);
    }
}
