// timeline.rs - The authored spawn script and the director that plays it.
//
// A timeline is a sorted list of cues. Each cue names a signal ("SpawnSnow",
// "Spawn1", "StopAutoSpawning", ...) and a track, which is the spawn point.
// The director walks through the cues with gameplay time and turns them into
// SpawnRequest messages.

use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    screens::{RoundState, Screen},
    session::RestartRequested,
    spawner::{
        process_spawn_requests, AutoSpawner, FallingCatalog, PointChoice, SpawnRequest,
        SpawnSpeed, SpawnWhat,
    },
    storage::{self, StorageError},
};

const TIMELINE_PATH: &str = "assets/timelines/level.ron";
/// Shorter loops are ignored; the director would rewind every frame.
pub const MIN_LOOP_SECS: f32 = 0.5;

pub struct TimelinePlugin;

impl Plugin for TimelinePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(load_or_default(Path::new(TIMELINE_PATH)))
            .init_resource::<TimelineDirector>()
            .add_systems(OnEnter(Screen::Playing), play_timeline)
            .add_systems(OnExit(Screen::Playing), stop_timeline)
            .add_systems(OnEnter(RoundState::GameOver), pause_timeline)
            .add_systems(OnEnter(RoundState::LevelComplete), pause_timeline)
            .add_systems(
                Update,
                timeline_system
                    .before(process_spawn_requests)
                    .run_if(in_state(RoundState::Running)),
            )
            .add_systems(
                Update,
                restart_timeline_on_restart.run_if(in_state(Screen::Playing)),
            );
    }
}

fn random_track() -> i32 {
    -1
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TimelineCue {
    /// Seconds from the start of the timeline.
    pub time: f32,
    /// Spawn point index; -1 picks a random point.
    #[serde(default = "random_track")]
    pub track: i32,
    pub signal: String,
    /// Overrides the spawn point's speed.
    #[serde(default)]
    pub speed: Option<f32>,
}

#[derive(Resource, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SpawnTimeline {
    pub cues: Vec<TimelineCue>,
    /// Rewinds to the start once this many seconds have played.
    #[serde(default)]
    pub loop_after: Option<f32>,
}

impl SpawnTimeline {
    pub fn new(mut cues: Vec<TimelineCue>, loop_after: Option<f32>) -> Self {
        cues.sort_by(|a, b| a.time.total_cmp(&b.time));
        let loop_after = match loop_after {
            Some(length) if length.is_nan() || length < MIN_LOOP_SECS => {
                warn!(
                    "Timeline loop of {}s is under {}s, playing it once instead",
                    length, MIN_LOOP_SECS
                );
                None
            }
            other => other,
        };
        SpawnTimeline { cues, loop_after }
    }
}

impl Default for SpawnTimeline {
    /// An opening wave across all four tracks, then a mix that repeats.
    fn default() -> Self {
        let cue = |time: f32, track: i32, signal: &str| TimelineCue {
            time,
            track,
            signal: signal.to_string(),
            speed: None,
        };

        SpawnTimeline::new(
            vec![
                cue(1.0, 0, "SpawnSnow"),
                cue(2.0, 3, "SpawnSnow"),
                cue(3.5, 1, "SpawnDebris"),
                cue(4.5, 2, "SpawnSnow"),
                cue(6.0, -1, "SpawnRandom"),
                cue(7.0, 2, "SpawnDebris"),
                cue(8.0, -1, "SpawnChance"),
                cue(9.5, 0, "SpawnDebris"),
                cue(10.5, 3, "SpawnSnow"),
            ],
            Some(12.0),
        )
    }
}

pub fn load(path: &Path) -> Result<Option<SpawnTimeline>, StorageError> {
    storage::read_ron::<SpawnTimeline>(path)
        .map(|timeline| timeline.map(|t| SpawnTimeline::new(t.cues, t.loop_after)))
}

fn load_or_default(path: &Path) -> SpawnTimeline {
    match load(path) {
        Ok(Some(timeline)) => {
            info!("Loaded {} timeline cues from {:?}", timeline.cues.len(), path);
            timeline
        }
        Ok(None) => {
            info!("No timeline at {:?}. Using the built-in one.", path);
            SpawnTimeline::default()
        }
        Err(e) => {
            error!("{}. Using the built-in timeline.", e);
            SpawnTimeline::default()
        }
    }
}

/// What a cue's signal asks for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimelineSignal {
    Spawn(SpawnWhat),
    StartAutoSpawning,
    StopAutoSpawning,
}

/// Reads a signal name. Anything that is not a known control signal is
/// treated as a spawn; unknown spawn names fall back to prefab 0.
pub fn parse_signal(name: &str, catalog: &FallingCatalog) -> TimelineSignal {
    let name = name.trim();
    if name.eq_ignore_ascii_case("StartAutoSpawning") {
        return TimelineSignal::StartAutoSpawning;
    }
    if name.eq_ignore_ascii_case("StopAutoSpawning") {
        return TimelineSignal::StopAutoSpawning;
    }

    let rest = match name.get(..5) {
        Some(prefix) if prefix.eq_ignore_ascii_case("spawn") => &name[5..],
        _ => name,
    };

    let what = match rest.to_ascii_lowercase().as_str() {
        "snow" => SpawnWhat::Snow,
        "debris" => SpawnWhat::Debris,
        "random" => SpawnWhat::Random,
        "chance" => SpawnWhat::Chance,
        "" => SpawnWhat::Prefab(0),
        _ => {
            if let Some(index) = catalog.find_by_name(rest) {
                SpawnWhat::Prefab(index as i32)
            } else if let Ok(index) = rest.parse::<i32>() {
                SpawnWhat::Prefab(index)
            } else {
                warn!("Unknown signal {:?}, spawning the default prefab", name);
                SpawnWhat::Prefab(0)
            }
        }
    };
    TimelineSignal::Spawn(what)
}

/// The spawn request for one cue, with its track and speed applied.
pub fn cue_request(what: SpawnWhat, cue: &TimelineCue) -> SpawnRequest {
    let point = if cue.track < 0 {
        PointChoice::Random
    } else {
        PointChoice::Index(cue.track)
    };
    let speed = match cue.speed {
        Some(speed) => SpawnSpeed::Exact(speed),
        None => SpawnSpeed::Point,
    };
    SpawnRequest::new(what, point).with_speed(speed)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct TimelineDirector {
    pub state: PlaybackState,
    /// Seconds played since the last rewind.
    pub time: f32,
    /// Index of the first cue that has not fired yet.
    next_cue: usize,
}

impl TimelineDirector {
    pub fn play(&mut self) {
        self.state = PlaybackState::Playing;
    }

    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
    }

    /// Rewinds to the start and halts.
    pub fn stop(&mut self) {
        self.state = PlaybackState::Stopped;
        self.time = 0.0;
        self.next_cue = 0;
    }

    pub fn restart(&mut self) {
        self.stop();
        self.play();
    }

    /// Moves time forward and returns every cue reached, each once per pass.
    pub fn advance<'t>(&mut self, delta: f32, timeline: &'t SpawnTimeline) -> Vec<&'t TimelineCue> {
        let mut fired = Vec::new();
        if self.state != PlaybackState::Playing {
            return fired;
        }

        self.time += delta;
        loop {
            while let Some(cue) = timeline.cues.get(self.next_cue) {
                if cue.time > self.time {
                    break;
                }
                fired.push(cue);
                self.next_cue += 1;
            }

            match timeline.loop_after {
                Some(length) if length >= MIN_LOOP_SECS && self.time >= length => {
                    self.time -= length;
                    self.next_cue = 0;
                }
                _ => break,
            }
        }
        fired
    }
}

fn play_timeline(mut director: ResMut<TimelineDirector>) {
    director.restart();
    info!("Timeline playing");
}

fn stop_timeline(mut director: ResMut<TimelineDirector>) {
    director.stop();
}

fn pause_timeline(mut director: ResMut<TimelineDirector>) {
    director.pause();
    debug!("Timeline paused at {:.2}s", director.time);
}

fn restart_timeline_on_restart(
    mut restarts: MessageReader<RestartRequested>,
    mut director: ResMut<TimelineDirector>,
) {
    if restarts.read().count() > 0 {
        director.restart();
        debug!("Timeline restarted from 0");
    }
}

fn timeline_system(
    time: Res<Time>,
    timeline: Res<SpawnTimeline>,
    catalog: Res<FallingCatalog>,
    mut director: ResMut<TimelineDirector>,
    mut auto_spawner: ResMut<AutoSpawner>,
    mut requests: MessageWriter<SpawnRequest>,
) {
    for cue in director.advance(time.delta_secs(), &timeline) {
        debug!("Cue {:?} on track {} at {:.2}s", cue.signal, cue.track, cue.time);
        match parse_signal(&cue.signal, &catalog) {
            TimelineSignal::Spawn(what) => {
                requests.write(cue_request(what, cue));
            }
            TimelineSignal::StartAutoSpawning => auto_spawner.start(&mut rand::thread_rng()),
            TimelineSignal::StopAutoSpawning => auto_spawner.stop(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;

    fn catalog() -> FallingCatalog {
        FallingCatalog::from_config(&GameConfig::default())
    }

    fn cue(time: f32, signal: &str) -> TimelineCue {
        TimelineCue {
            time,
            track: 0,
            signal: signal.to_string(),
            speed: None,
        }
    }

    #[test]
    fn signal_names_map_to_spawns() {
        let catalog = catalog();
        let spawn = |name| parse_signal(name, &catalog);

        assert_eq!(spawn("SpawnSnow"), TimelineSignal::Spawn(SpawnWhat::Snow));
        assert_eq!(spawn("SpawnDebris"), TimelineSignal::Spawn(SpawnWhat::Debris));
        assert_eq!(spawn("SpawnRandom"), TimelineSignal::Spawn(SpawnWhat::Random));
        assert_eq!(spawn("SpawnChance"), TimelineSignal::Spawn(SpawnWhat::Chance));
        assert_eq!(spawn("Spawn1"), TimelineSignal::Spawn(SpawnWhat::Prefab(1)));
        assert_eq!(spawn("SpawnAsteroid"), TimelineSignal::Spawn(SpawnWhat::Prefab(1)));
        assert_eq!(spawn("spawnflake"), TimelineSignal::Spawn(SpawnWhat::Prefab(0)));
        assert_eq!(spawn("SpawnComet"), TimelineSignal::Spawn(SpawnWhat::Prefab(0)));
        assert_eq!(spawn("StopAutoSpawning"), TimelineSignal::StopAutoSpawning);
        assert_eq!(spawn("StartAutoSpawning"), TimelineSignal::StartAutoSpawning);
    }

    #[test]
    fn cue_track_and_speed_shape_the_request() {
        let mut random = cue(0.0, "SpawnSnow");
        random.track = -1;
        random.speed = Some(2.0);

        let request = cue_request(SpawnWhat::Snow, &random);
        assert_eq!(request.point, PointChoice::Random);
        assert_eq!(request.speed, SpawnSpeed::Exact(2.0));

        let request = cue_request(SpawnWhat::Snow, &cue(0.0, "SpawnSnow"));
        assert_eq!(request.point, PointChoice::Index(0));
        assert_eq!(request.speed, SpawnSpeed::Point);
    }

    #[test]
    fn cues_are_sorted_and_fire_once() {
        let timeline = SpawnTimeline::new(
            vec![cue(2.0, "SpawnDebris"), cue(0.5, "SpawnSnow"), cue(1.0, "Spawn1")],
            None,
        );
        let mut director = TimelineDirector::default();
        director.play();

        let fired: Vec<_> = director.advance(1.0, &timeline).iter().map(|c| c.time).collect();
        assert_eq!(fired, vec![0.5, 1.0]);

        assert!(director.advance(0.5, &timeline).is_empty());

        let fired = director.advance(1.0, &timeline);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].signal, "SpawnDebris");

        assert!(director.advance(100.0, &timeline).is_empty());
    }

    #[test]
    fn paused_and_stopped_directors_do_not_advance() {
        let timeline = SpawnTimeline::new(vec![cue(0.5, "SpawnSnow")], None);
        let mut director = TimelineDirector::default();

        assert!(director.advance(1.0, &timeline).is_empty());

        director.play();
        director.pause();
        assert!(director.advance(1.0, &timeline).is_empty());
        assert_eq!(director.time, 0.0);

        director.play();
        assert_eq!(director.advance(1.0, &timeline).len(), 1);
    }

    #[test]
    fn restart_replays_from_the_beginning() {
        let timeline = SpawnTimeline::new(vec![cue(0.5, "SpawnSnow")], None);
        let mut director = TimelineDirector::default();
        director.play();
        assert_eq!(director.advance(1.0, &timeline).len(), 1);

        director.restart();
        assert_eq!(director.time, 0.0);
        assert_eq!(director.state, PlaybackState::Playing);
        assert_eq!(director.advance(1.0, &timeline).len(), 1);
    }

    #[test]
    fn looping_timeline_fires_again_each_pass() {
        let timeline = SpawnTimeline::new(vec![cue(1.0, "SpawnSnow")], Some(2.0));
        let mut director = TimelineDirector::default();
        director.play();

        let mut total = 0;
        for _ in 0..60 {
            total += director.advance(0.1, &timeline).len();
        }
        // Six seconds over a two second loop.
        assert_eq!(total, 3);
        assert!(director.time < 2.0);
    }

    #[test]
    fn tiny_loop_lengths_are_dropped() {
        for length in [0.001, 0.0, -3.0, f32::NAN] {
            let timeline = SpawnTimeline::new(vec![cue(0.0, "SpawnSnow")], Some(length));
            assert_eq!(timeline.loop_after, None);
        }

        let timeline = SpawnTimeline::new(vec![cue(0.0, "SpawnSnow")], Some(MIN_LOOP_SECS));
        assert_eq!(timeline.loop_after, Some(MIN_LOOP_SECS));
    }

    #[test]
    fn degenerate_loop_does_not_spin() {
        // Built by hand, skipping the check in `new`.
        let timeline = SpawnTimeline {
            cues: vec![cue(0.0, "SpawnSnow")],
            loop_after: Some(0.001),
        };
        let mut director = TimelineDirector::default();
        director.play();

        assert_eq!(director.advance(10.0, &timeline).len(), 1);
        assert_eq!(director.time, 10.0);
    }

    fn dispatch_app(cues: Vec<TimelineCue>, spawner_enabled: bool) -> App {
        let config = GameConfig::default();
        let mut auto_spawner = AutoSpawner::new(&config.spawner);
        if spawner_enabled {
            auto_spawner.start(&mut rand::thread_rng());
        }
        let mut director = TimelineDirector::default();
        director.play();

        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .add_message::<SpawnRequest>()
            .insert_resource(SpawnTimeline::new(cues, None))
            .insert_resource(catalog())
            .insert_resource(director)
            .insert_resource(auto_spawner)
            .add_systems(Update, timeline_system);
        app
    }

    fn requests(app: &mut App) -> Vec<SpawnRequest> {
        app.world_mut()
            .resource_mut::<Messages<SpawnRequest>>()
            .drain()
            .collect()
    }

    #[test]
    fn cues_become_spawn_requests_and_control_the_auto_spawner() {
        let mut app = dispatch_app(
            vec![cue(0.0, "StopAutoSpawning"), cue(0.0, "SpawnDebris")],
            true,
        );

        app.update();

        assert!(!app.world().resource::<AutoSpawner>().enabled);
        assert_eq!(
            requests(&mut app),
            vec![SpawnRequest::new(SpawnWhat::Debris, PointChoice::Index(0))]
        );
    }

    #[test]
    fn start_signal_enables_the_auto_spawner() {
        let mut app = dispatch_app(vec![cue(0.0, "StartAutoSpawning")], false);

        app.update();

        assert!(app.world().resource::<AutoSpawner>().enabled);
        assert!(requests(&mut app).is_empty());
    }

    #[test]
    fn restart_message_replays_a_stopped_timeline() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .add_message::<RestartRequested>()
            .insert_resource(TimelineDirector {
                state: PlaybackState::Paused,
                time: 3.0,
                next_cue: 2,
            })
            .add_systems(Update, restart_timeline_on_restart);

        app.update();
        assert_eq!(app.world().resource::<TimelineDirector>().time, 3.0);

        app.world_mut().write_message(RestartRequested);
        app.update();

        let director = app.world().resource::<TimelineDirector>();
        assert_eq!(director.state, PlaybackState::Playing);
        assert_eq!(director.time, 0.0);
        assert_eq!(director.next_cue, 0);
    }

    #[test]
    fn round_end_pauses_the_timeline() {
        use bevy::state::app::StatesPlugin;

        let mut app = App::new();
        app.add_plugins((MinimalPlugins, StatesPlugin))
            .init_state::<Screen>()
            .add_sub_state::<RoundState>()
            .init_resource::<TimelineDirector>()
            .add_systems(OnEnter(Screen::Playing), play_timeline)
            .add_systems(OnEnter(RoundState::GameOver), pause_timeline);

        app.world_mut()
            .resource_mut::<NextState<Screen>>()
            .set(Screen::Playing);
        app.update();
        assert_eq!(
            app.world().resource::<TimelineDirector>().state,
            PlaybackState::Playing
        );

        app.world_mut()
            .resource_mut::<NextState<RoundState>>()
            .set(RoundState::GameOver);
        app.update();
        assert_eq!(
            app.world().resource::<TimelineDirector>().state,
            PlaybackState::Paused
        );
    }

    #[test]
    fn shipped_timeline_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(TIMELINE_PATH);
        let timeline = load(&path).unwrap().expect("timeline ships with the game");

        assert!(!timeline.cues.is_empty());
        assert!(timeline
            .cues
            .windows(2)
            .all(|pair| pair[0].time <= pair[1].time));
    }
}
