//! Fixed-timestep training scheduler
//!
//! Drives every game instance against one shared agent. Simulated time is
//! decoupled from the caller's loop: elapsed wall time is banked in an
//! accumulator and spent in fixed ticks of `1000 / tick_rate` ms, at most
//! `max_ticks_per_advance` per call so a stalled caller cannot trigger a
//! catch-up spiral.
//!
//! A fault in one instance resets that instance only; learning and
//! persistence failures are logged and skipped. Nothing escapes `advance`.

mod command;
mod config;

pub use command::Command;
pub use config::{ResetPolicy, SchedulerConfig};

use anyhow::{Result, anyhow};
use burn::tensor::backend::AutodiffBackend;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::control::{ControlEndpoint, Settings, Telemetry};
use crate::game::{GameError, GameInstance};
use crate::render::RenderHook;
use crate::rl::{ActivationSnapshot, DqnAgent, Experience};

/// Multi-instance training loop state
pub struct Scheduler<B: AutodiffBackend> {
    config: SchedulerConfig,
    agent: DqnAgent<B>,
    instances: Vec<GameInstance>,

    /// Remaining wait before a dead instance is reset
    cooldown: Vec<u32>,

    /// Banked simulated time in milliseconds
    accumulator: f64,
    tick_rate: f64,
    paused: bool,

    focused: usize,
    fullscreen: bool,
    focused_activations: Option<ActivationSnapshot>,

    total_ticks: u64,
    rng: StdRng,
}

impl<B: AutodiffBackend> Scheduler<B> {
    /// Create the instances and start their first episodes
    pub fn new(config: SchedulerConfig, agent: DqnAgent<B>) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow!("invalid scheduler configuration: {e}"))?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let instances = (0..config.instances)
            .map(|_| GameInstance::new(config.game.clone(), &mut rng))
            .collect::<Result<Vec<_>, GameError>>()?;

        Ok(Self {
            cooldown: vec![0; instances.len()],
            instances,
            agent,
            accumulator: 0.0,
            tick_rate: config.tick_rate,
            paused: false,
            focused: 0,
            fullscreen: false,
            focused_activations: None,
            total_ticks: 0,
            rng,
            config,
        })
    }

    /// Spend elapsed wall time on fixed ticks
    ///
    /// Returns the number of ticks executed. While paused nothing runs and the
    /// accumulator is cleared. Backlog left after the per-call cap is dropped.
    pub fn advance(&mut self, elapsed_ms: f64) -> usize {
        if self.paused {
            self.accumulator = 0.0;
            return 0;
        }

        if elapsed_ms.is_finite() && elapsed_ms > 0.0 {
            self.accumulator += elapsed_ms;
        }

        let interval = 1000.0 / self.tick_rate;
        let mut ticks = 0;
        while self.accumulator >= interval && ticks < self.config.max_ticks_per_advance {
            self.accumulator -= interval;
            self.tick();
            ticks += 1;
        }

        if self.accumulator >= interval {
            debug!(
                backlog_ms = self.accumulator,
                ticks, "dropping simulation backlog"
            );
            self.accumulator = 0.0;
        }

        ticks
    }

    /// One simulation step for every instance, in index order
    pub fn tick(&mut self) {
        self.total_ticks += 1;

        for index in 0..self.instances.len() {
            if self.cooldown[index] > 0 {
                self.cooldown[index] -= 1;
                if self.cooldown[index] == 0 {
                    self.reset_instance(index);
                }
                continue;
            }

            if let Err(err) = self.step_instance(index) {
                warn!(instance = index, error = %err, "instance fault, resetting");
                self.reset_instance(index);
            }
        }
    }

    fn step_instance(&mut self, index: usize) -> Result<(), GameError> {
        let observation = self.agent.observe(&self.instances[index]);
        let action = self.agent.select_action(&observation, &mut self.rng);
        if index == self.focused {
            self.focused_activations = self.agent.activations().cloned();
        }
        let action = action?;

        let result = self.instances[index].step(action, &mut self.rng)?;
        let next_observation = self.agent.observe(&self.instances[index]);

        let experience = Experience {
            observation,
            action,
            reward: result.reward,
            next_observation,
            terminal: result.terminal,
        };
        if let Err(err) = self.agent.learn_step(&experience) {
            warn!(instance = index, error = %err, "skipping online update");
        }
        self.agent.remember(experience);

        if result.terminal {
            debug!(
                instance = index,
                score = result.score,
                cause = ?result.info.collision,
                "episode finished"
            );
            self.finish_episode(index, result.score);
        }

        Ok(())
    }

    fn finish_episode(&mut self, index: usize, score: u32) {
        if self.config.death_cooldown_ticks == 0 {
            self.reset_instance(index);
        } else {
            self.cooldown[index] = self.config.death_cooldown_ticks;
        }

        match self.agent.learn_batch(&mut self.rng) {
            Ok(Some(loss)) => debug!(loss, "replay update"),
            Ok(None) => {}
            Err(err) => warn!(error = %err, "skipping replay update"),
        }

        if self.agent.record_episode(score) {
            info!(
                instance = index,
                score,
                episode = self.agent.episode_count(),
                "new best score"
            );
            self.save_agent();
        }
    }

    fn reset_instance(&mut self, index: usize) {
        self.cooldown[index] = 0;
        if let Err(err) = self.instances[index].reset(&mut self.rng) {
            warn!(instance = index, error = %err, "failed to reset instance");
        }
    }

    fn save_agent(&self) {
        match self.agent.save() {
            Ok(()) => {
                if let Some(path) = self.agent.model_path() {
                    info!(path = %path.display(), "model saved");
                }
            }
            Err(err) => warn!(error = %err, "failed to save model"),
        }
    }

    /// One outer-loop iteration: settings, commands, simulation, telemetry
    pub fn run_iteration(&mut self, elapsed_ms: f64, endpoint: &mut ControlEndpoint) -> usize {
        if let Some(settings) = endpoint.changed_settings() {
            self.apply_settings(&settings);
        }

        for raw in endpoint.drain_commands() {
            match Command::parse(&raw) {
                Some(command) => self.apply_command(command),
                None => debug!(command = %raw, "ignoring unknown command"),
            }
        }

        let ticks = self.advance(elapsed_ms);
        endpoint.publish(self.telemetry());
        ticks
    }

    /// Adopt externally supplied settings
    pub fn apply_settings(&mut self, settings: &Settings) {
        if settings.tick_rate.is_finite() && settings.tick_rate > 0.0 {
            self.tick_rate = settings.tick_rate;
        } else {
            warn!(tick_rate = settings.tick_rate, "ignoring invalid tick rate");
        }
        self.set_paused(settings.paused);
    }

    pub fn apply_command(&mut self, command: Command) {
        debug!(?command, "applying control command");

        match command {
            Command::Reset => {
                for index in 0..self.instances.len() {
                    self.reset_instance(index);
                }
                self.accumulator = 0.0;
                if self.config.reset_policy == ResetPolicy::InstancesAndAgent {
                    self.agent.reset_progress();
                }
                info!(policy = ?self.config.reset_policy, "all instances reset");
            }
            Command::SaveModel => self.save_agent(),
            Command::SetEpsilon(epsilon) => self.agent.set_exploration_override(Some(epsilon)),
            Command::SetEpsilonAuto => self.agent.set_exploration_override(None),
            Command::Focus(index) if index < self.instances.len() => {
                self.focused = index;
                self.fullscreen = true;
            }
            Command::Focus(index) => debug!(index, "focus index out of range"),
            Command::ViewGrid => self.fullscreen = false,
            Command::Pause => self.set_paused(true),
            Command::Resume => self.set_paused(false),
        }
    }

    fn set_paused(&mut self, paused: bool) {
        if paused && !self.paused {
            self.accumulator = 0.0;
        }
        self.paused = paused;
    }

    /// Snapshot of the focused instance and overall progress
    pub fn telemetry(&self) -> Telemetry {
        let instance = &self.instances[self.focused];
        let stats = self.agent.stats();

        Telemetry {
            focused: self.focused,
            fullscreen: self.fullscreen,
            score: instance.score(),
            episode_count: self.agent.episode_count(),
            body: instance.body().to_vec(),
            food: Some(instance.food()),
            tick_rate: self.tick_rate,
            paused: self.paused,
            total_ticks: self.total_ticks,
            best_score: stats.best_score(),
            mean_score: stats.mean_score(),
            epsilon: self.agent.epsilon(),
        }
    }

    /// Hand every instance to a render hook
    pub fn render(&self, hook: &mut dyn RenderHook) {
        for (index, instance) in self.instances.iter().enumerate() {
            hook.draw(index, instance, index == self.focused);
        }
    }

    /// Activations captured while stepping the focused instance
    pub fn focused_activations(&self) -> Option<&ActivationSnapshot> {
        self.focused_activations.as_ref()
    }

    pub fn agent(&self) -> &DqnAgent<B> {
        &self.agent
    }

    pub fn agent_mut(&mut self) -> &mut DqnAgent<B> {
        &mut self.agent
    }

    pub fn instances(&self) -> &[GameInstance] {
        &self.instances
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn focused(&self) -> usize {
        self.focused
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn tick_rate(&self) -> f64 {
        self.tick_rate
    }

    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    pub fn best_score(&self) -> u32 {
        self.agent.stats().best_score()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control;
    use crate::game::{GameConfig, Heading, Position, Snake};
    use crate::rl::DqnConfig;
    use burn::backend::{
        Autodiff,
        ndarray::{NdArray, NdArrayDevice},
    };
    use tempfile::TempDir;

    type TestBackend = Autodiff<NdArray<f32>>;

    fn test_agent() -> DqnAgent<TestBackend> {
        let config = DqnConfig {
            hidden_size: 8,
            batch_size: 16,
            replay_capacity: 256,
            ..DqnConfig::default()
        };
        DqnAgent::new(config, NdArrayDevice::default())
    }

    fn test_config() -> SchedulerConfig {
        SchedulerConfig {
            instances: 3,
            game: GameConfig::new(17, 17),
            tick_rate: 30.0,
            death_cooldown_ticks: 0,
            seed: Some(7),
            ..SchedulerConfig::default()
        }
    }

    fn scheduler(config: SchedulerConfig) -> Scheduler<TestBackend> {
        Scheduler::new(config, test_agent()).unwrap()
    }

    /// Heading left in the top-left corner with the body below: every action is fatal
    fn doomed_instance() -> GameInstance {
        let snake = Snake {
            body: vec![
                Position::new(0, 0),
                Position::new(1, 0),
                Position::new(1, 1),
                Position::new(0, 1),
            ],
            heading: Heading::Left,
        };
        GameInstance::with_state(GameConfig::new(17, 17), snake, Position::new(9, 9))
    }

    #[test]
    fn test_new_creates_fresh_instances() {
        let scheduler = scheduler(test_config());
        assert_eq!(scheduler.instances().len(), 3);
        for instance in scheduler.instances() {
            assert!(!instance.is_terminal());
            assert_eq!(instance.step_count(), 0);
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SchedulerConfig {
            instances: 0,
            ..test_config()
        };
        assert!(Scheduler::new(config, test_agent()).is_err());
    }

    #[test]
    fn test_backlog_capped_per_advance() {
        let mut scheduler = scheduler(test_config());

        assert_eq!(scheduler.advance(10_000.0), 5);
        assert_eq!(scheduler.total_ticks(), 5);
        // Leftover backlog was dropped
        assert_eq!(scheduler.advance(0.0), 0);
    }

    #[test]
    fn test_advance_accumulates_partial_intervals() {
        let mut scheduler = scheduler(SchedulerConfig {
            tick_rate: 10.0,
            ..test_config()
        });

        assert_eq!(scheduler.advance(50.0), 0);
        assert_eq!(scheduler.advance(60.0), 1);
        assert_eq!(scheduler.advance(250.0), 2);
        assert_eq!(scheduler.total_ticks(), 3);
    }

    #[test]
    fn test_paused_advance_is_noop() {
        let mut scheduler = scheduler(test_config());
        scheduler.apply_command(Command::Pause);

        assert_eq!(scheduler.advance(1_000.0), 0);

        scheduler.apply_command(Command::Resume);
        assert_eq!(scheduler.advance(0.0), 0);
        assert_eq!(scheduler.total_ticks(), 0);
    }

    #[test]
    fn test_tick_steps_every_instance() {
        let mut scheduler = scheduler(test_config());
        scheduler.tick();

        for instance in scheduler.instances() {
            assert_eq!(instance.step_count(), 1);
        }
        assert_eq!(scheduler.agent().memory().len(), 3);
        assert_eq!(scheduler.agent().loss_history().len(), 3);
        assert!(scheduler.focused_activations().is_some());
    }

    #[test]
    fn test_fault_isolated_to_one_instance() {
        let mut scheduler = scheduler(test_config());
        let mut rng = StdRng::seed_from_u64(0);
        let mut dead = doomed_instance();
        let result = dead
            .step(crate::game::RelativeAction::Forward, &mut rng)
            .unwrap();
        assert!(result.terminal);
        scheduler.instances[1] = dead;

        // Stepping a finished episode is a fault for that instance only
        scheduler.tick();

        assert!(!scheduler.instances[1].is_terminal());
        assert_eq!(scheduler.instances[1].step_count(), 0);
        assert_eq!(scheduler.instances[0].step_count(), 1);
        assert_eq!(scheduler.instances[2].step_count(), 1);
        assert_eq!(scheduler.agent().episode_count(), 0);
    }

    #[test]
    fn test_death_resets_immediately_without_cooldown() {
        let mut scheduler = scheduler(test_config());
        scheduler.instances[0] = doomed_instance();

        scheduler.tick();

        assert_eq!(scheduler.agent().episode_count(), 1);
        assert_eq!(scheduler.agent().score_history(), &[0]);
        assert!(!scheduler.instances[0].is_terminal());
        assert_eq!(scheduler.instances[0].step_count(), 0);
        assert_eq!(scheduler.instances[0].body().len(), 3);
    }

    #[test]
    fn test_cooldown_skips_stepping() {
        let mut scheduler = scheduler(SchedulerConfig {
            death_cooldown_ticks: 2,
            ..test_config()
        });
        scheduler.instances[0] = doomed_instance();

        scheduler.tick();
        assert!(scheduler.instances[0].is_terminal());
        assert_eq!(scheduler.cooldown[0], 2);

        scheduler.tick();
        assert!(scheduler.instances[0].is_terminal());
        assert_eq!(scheduler.cooldown[0], 1);

        scheduler.tick();
        assert!(!scheduler.instances[0].is_terminal());
        assert_eq!(scheduler.instances[0].step_count(), 0);

        scheduler.tick();
        assert_eq!(scheduler.instances[0].step_count(), 1);
        assert_eq!(scheduler.agent().episode_count(), 1);
    }

    #[test]
    fn test_reset_keeps_agent_progress_by_default() {
        let mut scheduler = scheduler(test_config());
        scheduler.advance(100.0);
        scheduler.agent_mut().record_episode(2);

        scheduler.apply_command(Command::Reset);

        for instance in scheduler.instances() {
            assert_eq!(instance.step_count(), 0);
            assert_eq!(instance.score(), 0);
        }
        assert_eq!(scheduler.agent().episode_count(), 1);
    }

    #[test]
    fn test_reset_with_agent_policy_zeroes_episode_count() {
        let mut scheduler = scheduler(SchedulerConfig {
            reset_policy: ResetPolicy::InstancesAndAgent,
            ..test_config()
        });
        scheduler.agent_mut().record_episode(2);
        scheduler.apply_command(Command::SetEpsilon(0.9));

        scheduler.apply_command(Command::Reset);

        assert_eq!(scheduler.agent().episode_count(), 0);
        assert!((scheduler.agent().epsilon() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_epsilon_commands() {
        let mut scheduler = scheduler(test_config());

        scheduler.apply_command(Command::SetEpsilon(0.25));
        assert_eq!(scheduler.agent().epsilon(), 0.25);

        scheduler.apply_command(Command::SetEpsilonAuto);
        assert!((scheduler.agent().epsilon() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_focus_and_view_grid() {
        let mut scheduler = scheduler(test_config());

        scheduler.apply_command(Command::Focus(2));
        assert_eq!(scheduler.focused(), 2);
        assert!(scheduler.is_fullscreen());

        scheduler.apply_command(Command::Focus(3));
        assert_eq!(scheduler.focused(), 2);

        scheduler.apply_command(Command::ViewGrid);
        assert_eq!(scheduler.focused(), 2);
        assert!(!scheduler.is_fullscreen());
    }

    #[test]
    fn test_new_best_saves_model() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snake");
        let agent = DqnAgent::<TestBackend>::load_or_init(
            DqnConfig {
                hidden_size: 8,
                ..DqnConfig::default()
            },
            path.clone(),
            NdArrayDevice::default(),
        )
        .unwrap();
        let mut scheduler = Scheduler::new(test_config(), agent).unwrap();

        scheduler.finish_episode(0, 0);
        assert!(!dir.path().join("snake.meta.json").exists());

        scheduler.finish_episode(0, 4);
        assert!(dir.path().join("snake.meta.json").exists());
        assert_eq!(scheduler.best_score(), 4);
    }

    #[test]
    fn test_failed_save_does_not_stop_training() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let agent = DqnAgent::<TestBackend>::load_or_init(
            DqnConfig {
                hidden_size: 8,
                ..DqnConfig::default()
            },
            blocker.join("snake"),
            NdArrayDevice::default(),
        )
        .unwrap();
        assert!(agent.save().is_err());
        let mut scheduler = Scheduler::new(test_config(), agent).unwrap();

        scheduler.apply_command(Command::SaveModel);
        scheduler.finish_episode(0, 4);
        scheduler.tick();

        assert_eq!(scheduler.best_score(), 4);
        assert_eq!(scheduler.agent().episode_count(), 1);
        assert_eq!(scheduler.total_ticks(), 1);
        for instance in scheduler.instances() {
            assert_eq!(instance.step_count(), 1);
        }
    }

    fn seeded_run(seed: u64) -> (Vec<GameInstance>, Vec<u32>, usize) {
        let agent = DqnAgent::<TestBackend>::new(
            DqnConfig {
                hidden_size: 8,
                batch_size: 16,
                replay_capacity: 256,
                seed: Some(seed),
                ..DqnConfig::default()
            },
            NdArrayDevice::default(),
        );
        let game = GameConfig {
            timeout_factor: 10,
            ..GameConfig::small()
        };
        let mut scheduler = Scheduler::new(
            SchedulerConfig {
                game,
                seed: Some(seed),
                ..test_config()
            },
            agent,
        )
        .unwrap();
        scheduler.apply_command(Command::SetEpsilon(0.0));

        for _ in 0..300 {
            scheduler.tick();
        }

        (
            scheduler.instances().to_vec(),
            scheduler.agent().score_history().to_vec(),
            scheduler.agent().episode_count(),
        )
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let first = seeded_run(42);
        let second = seeded_run(42);

        assert!(first.2 > 0);
        assert_eq!(first, second);
    }

    #[test]
    fn test_run_iteration_applies_commands_and_publishes() {
        let mut scheduler = scheduler(test_config());
        let (handle, mut endpoint) = control::channel(Settings::default(), 8);
        let mut subscriber = handle.subscribe();

        handle.send_command("FOCUS_1").unwrap();
        handle.send_command("NOT_A_COMMAND").unwrap();
        let ticks = scheduler.run_iteration(110.0, &mut endpoint);

        assert_eq!(ticks, 3);
        assert_eq!(scheduler.focused(), 1);
        assert!(subscriber.has_changed().unwrap());
        let telemetry = subscriber.borrow_and_update().clone();
        assert_eq!(telemetry.focused, 1);
        assert!(telemetry.fullscreen);
        assert_eq!(telemetry.total_ticks, 3);
        assert_eq!(telemetry.body, scheduler.instances()[1].body());

        // Published even when no tick ran
        scheduler.run_iteration(0.0, &mut endpoint);
        assert!(subscriber.has_changed().unwrap());
    }

    #[test]
    fn test_run_iteration_applies_changed_settings() {
        let mut scheduler = scheduler(test_config());
        let (handle, mut endpoint) = control::channel(Settings::default(), 8);

        handle
            .update_settings(Settings {
                tick_rate: 10.0,
                paused: true,
            })
            .unwrap();
        assert_eq!(scheduler.run_iteration(500.0, &mut endpoint), 0);
        assert!(scheduler.is_paused());
        assert_eq!(scheduler.tick_rate(), 10.0);
        assert!(handle.telemetry().paused);

        // An unchanged snapshot does not override a RESUME command
        handle.send_command("RESUME").unwrap();
        assert_eq!(scheduler.run_iteration(100.0, &mut endpoint), 1);
        assert!(!scheduler.is_paused());
    }

    #[test]
    fn test_render_visits_every_instance() {
        struct Recorder(Vec<(usize, bool)>);

        impl RenderHook for Recorder {
            fn draw(&mut self, index: usize, _instance: &GameInstance, focused: bool) {
                self.0.push((index, focused));
            }
        }

        let mut scheduler = scheduler(test_config());
        scheduler.apply_command(Command::Focus(1));

        let mut recorder = Recorder(Vec::new());
        scheduler.render(&mut recorder);

        assert_eq!(recorder.0, vec![(0, false), (1, true), (2, false)]);
    }
}
