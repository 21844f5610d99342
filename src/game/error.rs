use thiserror::Error;

/// Faults raised by a single game instance
///
/// These are confined to the instance that raised them; the scheduler resets
/// that instance and carries on with the others.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("action index {0} is not a valid relative action")]
    InvalidAction(usize),

    #[error("episode already terminated; reset before stepping")]
    EpisodeOver,

    #[error("no free cell left to place food")]
    BoardFull,
}
