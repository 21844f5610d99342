/// Control command understood by the scheduler
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Reset every instance (and maybe the agent, see `ResetPolicy`)
    Reset,
    SaveModel,
    /// Pin exploration to a percentage
    SetEpsilon(f64),
    /// Return exploration to its decay schedule
    SetEpsilonAuto,
    /// Show one instance on its own
    Focus(usize),
    /// Back to the grid of all instances
    ViewGrid,
    Pause,
    Resume,
}

impl Command {
    /// Parse a wire command, `None` for anything unrecognized
    ///
    /// ```rust
    /// use snake_dqn::scheduler::Command;
    ///
    /// assert_eq!(Command::parse("FOCUS_3"), Some(Command::Focus(3)));
    /// assert_eq!(Command::parse("SET_EPSILON_25"), Some(Command::SetEpsilon(0.25)));
    /// assert_eq!(Command::parse("JUMP"), None);
    /// ```
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        match raw {
            "RESET" => return Some(Self::Reset),
            "SAVE_MODEL" => return Some(Self::SaveModel),
            "SET_EPSILON_AUTO" => return Some(Self::SetEpsilonAuto),
            "VIEW_GRID" => return Some(Self::ViewGrid),
            "PAUSE" => return Some(Self::Pause),
            "RESUME" => return Some(Self::Resume),
            _ => {}
        }

        if let Some(pct) = raw.strip_prefix("SET_EPSILON_") {
            let pct: f64 = pct.parse().ok()?;
            if !(0.0..=100.0).contains(&pct) {
                return None;
            }
            return Some(Self::SetEpsilon(pct / 100.0));
        }

        if let Some(index) = raw.strip_prefix("FOCUS_") {
            return index.parse().ok().map(Self::Focus);
        }

        None
    }
}
