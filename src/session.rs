// session.rs - The game manager: score, high score, health, water and round outcome.
//
// GameSession is plain data with plain methods so the rules can be tested
// without an App. The systems below only move it through time and states.

use bevy::prelude::*;

use crate::{
    collect::collect_system,
    config::{GameConfig, SessionConfig},
    save_load::{save_to_disk, SaveData, SavePath},
    screens::{RoundState, Screen},
};

pub struct SessionPlugin;

impl Plugin for SessionPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<RestartRequested>()
            .add_systems(Startup, init_session)
            .add_systems(OnEnter(Screen::Playing), start_round)
            .add_systems(
                Update,
                (score_tick_system, check_round_end_system)
                    .chain()
                    .after(collect_system)
                    .run_if(in_state(RoundState::Running)),
            )
            .add_systems(
                Update,
                restart_round_system.run_if(in_state(Screen::Playing)),
            )
            .add_systems(OnEnter(RoundState::GameOver), persist_high_score)
            .add_systems(OnEnter(RoundState::LevelComplete), persist_high_score)
            .add_systems(OnExit(Screen::Playing), persist_high_score)
            .add_systems(Last, persist_on_exit);
    }
}

/// How a round ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    GameOver,
    LevelComplete,
}

/// Written by the HUD (button or key) to start the round over.
/// Every module that owns round state listens for it and resets itself.
#[derive(Message, Debug, Clone, Copy, Default)]
pub struct RestartRequested;

#[derive(Resource, Debug, Clone, PartialEq)]
pub struct GameSession {
    pub score: u32,
    pub high_score: u32,
    pub health: f32,
    pub max_health: f32,
    pub water: f32,
    pub max_water: f32,
    /// False once the round has ended; passive scoring stops.
    pub active: bool,
    /// Some once the round ended, None while it is still going.
    pub outcome: Option<RoundOutcome>,
    score_timer: f32,
    score_interval: f32,
}

impl GameSession {
    pub fn new(config: &SessionConfig, high_score: u32) -> Self {
        GameSession {
            score: 0,
            high_score,
            health: config.max_health,
            max_health: config.max_health,
            water: 0.0,
            max_water: config.max_water,
            active: true,
            outcome: None,
            score_timer: 0.0,
            score_interval: config.score_interval,
        }
    }

    /// Fresh round values. The high score is kept.
    pub fn reset(&mut self) {
        self.score = 0;
        self.health = self.max_health;
        self.water = 0.0;
        self.score_timer = 0.0;
        self.active = true;
        self.outcome = None;
    }

    /// One point per full score interval survived.
    pub fn tick(&mut self, delta: f32) {
        if !self.active {
            return;
        }
        self.score_timer += delta;
        if self.score_timer >= self.score_interval {
            self.score_timer = 0.0;
            self.add_points(1);
        }
    }

    pub fn add_points(&mut self, points: u32) {
        self.score += points;
        if self.score > self.high_score {
            self.high_score = self.score;
        }
    }

    /// Damage applies even after the round ended, but only an active round
    /// can be lost. Returns the outcome if this hit ended the round.
    pub fn take_damage(&mut self, damage: f32) -> Option<RoundOutcome> {
        self.health = (self.health - damage).max(0.0);
        debug!("Took {} damage, health now {}", damage, self.health);

        if self.health <= 0.0 && self.active {
            self.end_round(RoundOutcome::GameOver);
            return Some(RoundOutcome::GameOver);
        }
        None
    }

    /// Water is capped at max. Filling it during an active round wins it.
    pub fn add_water(&mut self, amount: f32) -> Option<RoundOutcome> {
        self.water = (self.water + amount).min(self.max_water);
        debug!("Collected {} water, level now {}", amount, self.water);

        if self.water >= self.max_water && self.active {
            self.end_round(RoundOutcome::LevelComplete);
            return Some(RoundOutcome::LevelComplete);
        }
        None
    }

    fn end_round(&mut self, outcome: RoundOutcome) {
        self.active = false;
        self.outcome = Some(outcome);
    }

    pub fn health_fraction(&self) -> f32 {
        if self.max_health > 0.0 {
            self.health / self.max_health
        } else {
            0.0
        }
    }

    pub fn water_fraction(&self) -> f32 {
        if self.max_water > 0.0 {
            self.water / self.max_water
        } else {
            0.0
        }
    }
}

fn init_session(mut commands: Commands, config: Res<GameConfig>, save_data: Res<SaveData>) {
    let session = GameSession::new(&config.session, save_data.high_score);
    info!(
        "Session ready: health {}, water {}, high score {}",
        session.health, session.water, session.high_score
    );
    commands.insert_resource(session);
}

fn start_round(mut session: ResMut<GameSession>) {
    session.reset();
    info!("Round started");
}

fn score_tick_system(time: Res<Time>, mut session: ResMut<GameSession>) {
    session.tick(time.delta_secs());
}

/// Moves the round into its end state once the session reports an outcome.
fn check_round_end_system(session: Res<GameSession>, mut next_round: ResMut<NextState<RoundState>>) {
    let Some(outcome) = session.outcome else {
        return;
    };

    match outcome {
        RoundOutcome::GameOver => {
            info!("Game Over! Final score {}", session.score);
            next_round.set(RoundState::GameOver);
        }
        RoundOutcome::LevelComplete => {
            info!("Level Complete! Final score {}", session.score);
            next_round.set(RoundState::LevelComplete);
        }
    }
}

fn restart_round_system(
    mut restarts: MessageReader<RestartRequested>,
    mut session: ResMut<GameSession>,
    mut next_round: ResMut<NextState<RoundState>>,
) {
    // Several requests in one frame still mean one restart.
    if restarts.read().count() == 0 {
        return;
    }

    session.reset();
    next_round.set(RoundState::Running);
    info!("Game restarted, all values reset");
}

/// Writes the high score to disk if this session beat the saved one.
pub fn persist_high_score(
    session: Option<Res<GameSession>>,
    mut save_data: ResMut<SaveData>,
    save_path: Res<SavePath>,
) {
    let Some(session) = session else {
        return;
    };
    if session.high_score > save_data.high_score {
        save_data.high_score = session.high_score;
        info!("New high score {}", save_data.high_score);
        save_to_disk(&save_path.0, &save_data);
    }
}

fn persist_on_exit(
    mut exits: MessageReader<AppExit>,
    session: Option<Res<GameSession>>,
    save_data: ResMut<SaveData>,
    save_path: Res<SavePath>,
) {
    if exits.read().count() > 0 {
        persist_high_score(session, save_data, save_path);
    }
}
