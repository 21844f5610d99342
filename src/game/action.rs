use super::GameError;

/// Absolute heading of the snake on the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Heading {
    Right,
    Down,
    Left,
    Up,
}

impl Heading {
    /// Clockwise rotation order used for relative turns
    pub const CLOCKWISE: [Heading; 4] = [Heading::Right, Heading::Down, Heading::Left, Heading::Up];

    /// Returns the delta (dx, dy) for moving in this heading
    ///
    /// The y axis grows downwards, so `Up` decreases y.
    pub fn delta(&self) -> (i32, i32) {
        match self {
            Heading::Up => (0, -1),
            Heading::Down => (0, 1),
            Heading::Left => (-1, 0),
            Heading::Right => (1, 0),
        }
    }

    /// Heading after applying a relative action
    pub fn rotate(self, action: RelativeAction) -> Heading {
        let idx = Self::CLOCKWISE
            .iter()
            .position(|&h| h == self)
            .unwrap_or(0);

        match action {
            RelativeAction::Forward => self,
            RelativeAction::TurnRight => Self::CLOCKWISE[(idx + 1) % 4],
            RelativeAction::TurnLeft => Self::CLOCKWISE[(idx + 3) % 4],
        }
    }
}

/// Action relative to the current heading
///
/// The discriminants are the output indices of the Q-network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelativeAction {
    /// Keep the current heading
    Forward = 0,
    /// Rotate one step clockwise
    TurnRight = 1,
    /// Rotate one step counter-clockwise
    TurnLeft = 2,
}

impl RelativeAction {
    /// All actions in network output order
    pub const ALL: [RelativeAction; 3] = [
        RelativeAction::Forward,
        RelativeAction::TurnRight,
        RelativeAction::TurnLeft,
    ];

    /// Number of discrete actions
    pub const COUNT: usize = 3;

    /// Network output index of this action
    pub fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<usize> for RelativeAction {
    type Error = GameError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(GameError::InvalidAction(index))
    }
}
