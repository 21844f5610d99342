use super::{
    action::{Heading, RelativeAction},
    config::GameConfig,
    error::GameError,
    state::{CollisionType, Position, Snake},
};
use rand::Rng;

/// Information about a step
#[derive(Debug, Clone, PartialEq)]
pub struct StepInfo {
    /// Whether the snake ate food this step
    pub ate_food: bool,
    /// Reason the episode ended, if it did
    pub collision: Option<CollisionType>,
}

/// Result of a game step
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    /// Reward for this step
    pub reward: f32,
    /// Whether the episode has terminated
    pub terminal: bool,
    /// Score after the step
    pub score: u32,
    /// Additional information about the step
    pub info: StepInfo,
}

/// One snake episode on its own grid
///
/// The instance is created once and reset in place between episodes. Every
/// random draw comes from the generator passed in by the caller, so a seeded
/// generator gives a reproducible episode.
#[derive(Debug, Clone, PartialEq)]
pub struct GameInstance {
    config: GameConfig,
    snake: Snake,
    food: Position,
    score: u32,
    step_count: u32,
    terminal: bool,
}

impl GameInstance {
    /// Create an instance and start its first episode
    pub fn new<R: Rng + ?Sized>(config: GameConfig, rng: &mut R) -> Result<Self, GameError> {
        let snake = Self::initial_snake(&config);
        let mut instance = Self {
            config,
            food: snake.head(),
            snake,
            score: 0,
            step_count: 0,
            terminal: false,
        };
        instance.reset(rng)?;
        Ok(instance)
    }

    /// Build an instance from an explicit layout
    ///
    /// Used to set up precise scenarios; the caller is responsible for the food
    /// not overlapping the body.
    pub fn with_state(config: GameConfig, snake: Snake, food: Position) -> Self {
        Self {
            config,
            snake,
            food,
            score: 0,
            step_count: 0,
            terminal: false,
        }
    }

    fn initial_snake(config: &GameConfig) -> Snake {
        let center_x = (config.grid_width / 2) as i32;
        let center_y = (config.grid_height / 2) as i32;

        Snake::new(
            Position::new(center_x, center_y),
            Heading::Right,
            config.initial_snake_length,
        )
    }

    /// Start a new episode in place
    pub fn reset<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), GameError> {
        self.snake = Self::initial_snake(&self.config);
        self.score = 0;
        self.step_count = 0;
        self.terminal = false;
        self.food = self.spawn_food(rng)?;
        Ok(())
    }

    /// Advance the episode by one tick
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        action: RelativeAction,
        rng: &mut R,
    ) -> Result<StepResult, GameError> {
        if self.terminal {
            return Err(GameError::EpisodeOver);
        }

        self.step_count += 1;
        self.snake.heading = self.snake.heading.rotate(action);
        let new_head = self.snake.head().moved_in(self.snake.heading);

        if let Some(collision) = self.check_termination(new_head) {
            self.terminal = true;

            return Ok(StepResult {
                reward: self.config.death_penalty,
                terminal: true,
                score: self.score,
                info: StepInfo {
                    ate_food: false,
                    collision: Some(collision),
                },
            });
        }

        let ate_food = new_head == self.food;
        self.snake.advance_to(new_head, ate_food);

        let reward = if ate_food {
            self.score += 1;
            if self.snake.len() >= self.cell_count() {
                // Nowhere left to place food: the episode ends as a win.
                self.terminal = true;
                return Ok(StepResult {
                    reward: self.config.food_reward,
                    terminal: true,
                    score: self.score,
                    info: StepInfo {
                        ate_food: true,
                        collision: Some(CollisionType::BoardCleared),
                    },
                });
            }
            self.food = self.spawn_food(rng)?;
            self.config.food_reward
        } else {
            self.config.step_penalty
        };

        Ok(StepResult {
            reward,
            terminal: false,
            score: self.score,
            info: StepInfo {
                ate_food,
                collision: None,
            },
        })
    }

    /// Boundary or self-intersection test for a cell, defaulting to the head
    pub fn is_collision(&self, point: Option<Position>) -> bool {
        let point = point.unwrap_or_else(|| self.snake.head());
        !self.is_in_bounds(point) || self.snake.collides_with_body(point)
    }

    fn cell_count(&self) -> usize {
        self.config.grid_width * self.config.grid_height
    }

    /// Check if a position is within the grid bounds
    pub fn is_in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0
            && pos.x < self.config.grid_width as i32
            && pos.y >= 0
            && pos.y < self.config.grid_height as i32
    }

    fn check_termination(&self, new_head: Position) -> Option<CollisionType> {
        if !self.is_in_bounds(new_head) {
            return Some(CollisionType::Wall);
        }

        if self.snake.collides_with_body(new_head) {
            return Some(CollisionType::SelfCollision);
        }

        // Longer snakes get proportionally more time before the episode is cut.
        let budget = self.config.timeout_factor as usize * self.snake.len();
        if self.step_count as usize > budget {
            return Some(CollisionType::Timeout);
        }

        None
    }

    /// Spawn food at a random empty position
    fn spawn_food<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Position, GameError> {
        if self.snake.len() >= self.cell_count() {
            return Err(GameError::BoardFull);
        }

        loop {
            let x = rng.gen_range(0..self.config.grid_width) as i32;
            let y = rng.gen_range(0..self.config.grid_height) as i32;
            let pos = Position::new(x, y);

            if !self.snake.occupies(pos) {
                return Ok(pos);
            }
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn width(&self) -> usize {
        self.config.grid_width
    }

    pub fn height(&self) -> usize {
        self.config.grid_height
    }

    pub fn snake(&self) -> &Snake {
        &self.snake
    }

    pub fn head(&self) -> Position {
        self.snake.head()
    }

    pub fn heading(&self) -> Heading {
        self.snake.heading
    }

    pub fn body(&self) -> &[Position] {
        &self.snake.body
    }

    pub fn food(&self) -> Position {
        self.food
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn step_count(&self) -> u32 {
        self.step_count
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }
}
