// spawner.rs - One pipeline for every spawn: the timeline, the auto-spawner and
// anything else write a SpawnRequest message, and process_spawn_requests
// resolves it against the catalog and spawn points.

use std::time::Duration;

use bevy::prelude::*;
use rand::Rng;

use crate::{
    config::{GameConfig, SpawnPointConfig, SpawnerConfig},
    falling::{spawn_falling, FallingKind, FallingSpawn, FallingTemplate},
    screens::{RoundState, Screen},
    session::RestartRequested,
};

pub struct SpawnerPlugin;

impl Plugin for SpawnerPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<SpawnRequest>()
            .add_systems(Startup, setup_spawner)
            .add_systems(OnEnter(Screen::Playing), start_auto_spawner)
            .add_systems(OnExit(Screen::Playing), stop_auto_spawner)
            .add_systems(
                Update,
                (auto_spawn_system, process_spawn_requests)
                    .chain()
                    .run_if(in_state(RoundState::Running)),
            )
            .add_systems(
                Update,
                restart_auto_spawner.run_if(in_state(Screen::Playing)),
            );
    }
}

/// The spawnable prefabs. Index 0 is snow and index 1 is debris, which is
/// what numeric timeline signals rely on.
#[derive(Resource, Debug, Clone, Default)]
pub struct FallingCatalog {
    pub prefabs: Vec<FallingTemplate>,
}

impl FallingCatalog {
    pub fn from_config(config: &GameConfig) -> Self {
        FallingCatalog {
            prefabs: vec![
                FallingTemplate::from_tuning(FallingKind::Snow, &config.falling.snow),
                FallingTemplate::from_tuning(FallingKind::Debris, &config.falling.debris),
            ],
        }
    }

    pub fn first_of_kind(&self, kind: FallingKind) -> Option<usize> {
        self.prefabs.iter().position(|prefab| prefab.kind == kind)
    }

    /// First prefab whose name contains `fragment`, ignoring case.
    pub fn find_by_name(&self, fragment: &str) -> Option<usize> {
        let fragment = fragment.to_lowercase();
        self.prefabs
            .iter()
            .position(|prefab| prefab.name.to_lowercase().contains(&fragment))
    }
}

#[derive(Resource, Debug, Clone, Default)]
pub struct SpawnPoints(pub Vec<SpawnPointConfig>);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpawnWhat {
    Snow,
    Debris,
    /// Catalog index. Out of range falls back to 0.
    Prefab(i32),
    /// Uniformly random catalog entry.
    Random,
    /// Snow with `snow_chance`, otherwise debris.
    Chance,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointChoice {
    /// Spawn point index. Out of range falls back to a random point.
    Index(i32),
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpawnSpeed {
    /// The template's own fall speed, drifting.
    Template,
    /// The spawn point's speed policy, straight down.
    Point,
    /// This exact speed, straight down.
    Exact(f32),
}

#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub struct SpawnRequest {
    pub what: SpawnWhat,
    pub point: PointChoice,
    pub speed: SpawnSpeed,
}

impl SpawnRequest {
    pub fn new(what: SpawnWhat, point: PointChoice) -> Self {
        SpawnRequest {
            what,
            point,
            speed: SpawnSpeed::Point,
        }
    }

    pub fn with_speed(mut self, speed: SpawnSpeed) -> Self {
        self.speed = speed;
        self
    }
}

/// Turns a request into a concrete spawn, applying the fallbacks for bad
/// indices. None means nothing can be spawned for it.
pub fn resolve(
    request: &SpawnRequest,
    catalog: &FallingCatalog,
    points: &SpawnPoints,
    snow_chance: f32,
    rng: &mut impl Rng,
) -> Option<FallingSpawn> {
    if catalog.prefabs.is_empty() {
        error!("No falling prefabs in the catalog, ignoring {:?}", request);
        return None;
    }
    if points.0.is_empty() {
        error!("No spawn points configured, ignoring {:?}", request);
        return None;
    }

    let prefab_index = match request.what {
        SpawnWhat::Snow => kind_index(catalog, FallingKind::Snow)?,
        SpawnWhat::Debris => kind_index(catalog, FallingKind::Debris)?,
        SpawnWhat::Chance => {
            let kind = if rng.gen::<f32>() < snow_chance {
                FallingKind::Snow
            } else {
                FallingKind::Debris
            };
            kind_index(catalog, kind)?
        }
        SpawnWhat::Random => rng.gen_range(0..catalog.prefabs.len()),
        SpawnWhat::Prefab(index) => match usize::try_from(index) {
            Ok(i) if i < catalog.prefabs.len() => i,
            _ => {
                warn!("Invalid prefab index: {}. Using default prefab.", index);
                0
            }
        },
    };

    let point_index = match request.point {
        PointChoice::Random => rng.gen_range(0..points.0.len()),
        PointChoice::Index(index) => match usize::try_from(index) {
            Ok(i) if i < points.0.len() => i,
            _ => {
                warn!("Invalid spawn point index: {}. Using random spawn point.", index);
                rng.gen_range(0..points.0.len())
            }
        },
    };

    let template = catalog.prefabs[prefab_index].clone();
    let point = &points.0[point_index];
    let (speed, straight) = match request.speed {
        SpawnSpeed::Template => (template.fall_speed, false),
        SpawnSpeed::Point => (point.speed.sample(rng), true),
        SpawnSpeed::Exact(speed) => (speed, true),
    };

    Some(FallingSpawn {
        template,
        position: point.position,
        speed,
        straight,
    })
}

fn kind_index(catalog: &FallingCatalog, kind: FallingKind) -> Option<usize> {
    let index = catalog.first_of_kind(kind);
    if index.is_none() {
        warn!("No {:?} prefab in the catalog", kind);
    }
    index
}

/// Emits a chance spawn after a random delay, over and over, while enabled.
#[derive(Resource, Debug)]
pub struct AutoSpawner {
    pub enabled: bool,
    timer: Timer,
    min_delay: f32,
    max_delay: f32,
}

impl AutoSpawner {
    /// Negative delays are treated as 0.
    pub fn new(config: &SpawnerConfig) -> Self {
        let low = config.min_delay.max(0.0);
        let high = config.max_delay.max(0.0);
        if low != config.min_delay || high != config.max_delay {
            warn!(
                "Negative auto spawn delay ({}..{}), clamping to 0",
                config.min_delay, config.max_delay
            );
        }

        AutoSpawner {
            enabled: false,
            timer: Timer::from_seconds(high, TimerMode::Once),
            min_delay: low.min(high),
            max_delay: low.max(high),
        }
    }

    pub fn start(&mut self, rng: &mut impl Rng) {
        self.enabled = true;
        self.roll_delay(rng);
    }

    pub fn stop(&mut self) {
        self.enabled = false;
    }

    #[cfg(test)]
    pub fn delay(&self) -> Duration {
        self.timer.duration()
    }

    fn roll_delay(&mut self, rng: &mut impl Rng) {
        let delay = if self.max_delay > self.min_delay {
            rng.gen_range(self.min_delay..=self.max_delay)
        } else {
            self.min_delay
        };
        self.timer = Timer::from_seconds(delay.max(0.0), TimerMode::Once);
    }

    /// True when a spawn is due. The next delay is rolled right away.
    pub fn tick(&mut self, delta: Duration, rng: &mut impl Rng) -> bool {
        if !self.enabled {
            return false;
        }
        self.timer.tick(delta);
        if self.timer.is_finished() {
            self.roll_delay(rng);
            return true;
        }
        false
    }
}

fn setup_spawner(mut commands: Commands, config: Res<GameConfig>) {
    let catalog = FallingCatalog::from_config(&config);
    let points = SpawnPoints(config.spawner.points.clone());
    info!(
        "Spawner ready: {} prefabs, {} spawn points",
        catalog.prefabs.len(),
        points.0.len()
    );

    commands.insert_resource(catalog);
    commands.insert_resource(points);
    commands.insert_resource(AutoSpawner::new(&config.spawner));
}

fn start_auto_spawner(config: Res<GameConfig>, mut auto_spawner: ResMut<AutoSpawner>) {
    if config.spawner.auto_spawn {
        auto_spawner.start(&mut rand::thread_rng());
        info!("Auto spawning started");
    }
}

fn stop_auto_spawner(mut auto_spawner: ResMut<AutoSpawner>) {
    auto_spawner.stop();
}

fn restart_auto_spawner(
    mut restarts: MessageReader<RestartRequested>,
    config: Res<GameConfig>,
    mut auto_spawner: ResMut<AutoSpawner>,
) {
    if restarts.read().count() > 0 && config.spawner.auto_spawn {
        auto_spawner.start(&mut rand::thread_rng());
    }
}

fn auto_spawn_system(
    time: Res<Time>,
    mut auto_spawner: ResMut<AutoSpawner>,
    mut requests: MessageWriter<SpawnRequest>,
) {
    if auto_spawner.tick(time.delta(), &mut rand::thread_rng()) {
        requests.write(
            SpawnRequest::new(SpawnWhat::Chance, PointChoice::Random)
                .with_speed(SpawnSpeed::Template),
        );
    }
}

pub fn process_spawn_requests(
    mut commands: Commands,
    mut requests: MessageReader<SpawnRequest>,
    catalog: Res<FallingCatalog>,
    points: Res<SpawnPoints>,
    config: Res<GameConfig>,
) {
    let mut rng = rand::thread_rng();
    for request in requests.read() {
        if let Some(spawn) = resolve(
            request,
            &catalog,
            &points,
            config.spawner.snow_chance,
            &mut rng,
        ) {
            spawn_falling(&mut commands, &spawn, &config.falling, &mut rng);
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::{config::FallSpeed, falling::Falling};

    fn catalog() -> FallingCatalog {
        FallingCatalog::from_config(&GameConfig::default())
    }

    fn points() -> SpawnPoints {
        SpawnPoints(GameConfig::default().spawner.points)
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn catalog_lookup_by_kind_and_name() {
        let catalog = catalog();
        assert_eq!(catalog.first_of_kind(FallingKind::Snow), Some(0));
        assert_eq!(catalog.first_of_kind(FallingKind::Debris), Some(1));
        assert_eq!(catalog.find_by_name("flake"), Some(0));
        assert_eq!(catalog.find_by_name("ASTER"), Some(1));
        assert_eq!(catalog.find_by_name("comet"), None);
    }

    #[test]
    fn snow_at_a_valid_point_uses_the_point_speed() {
        let request = SpawnRequest::new(SpawnWhat::Snow, PointChoice::Index(2));
        let spawn = resolve(&request, &catalog(), &points(), 0.7, &mut rng()).unwrap();

        assert_eq!(spawn.template.kind, FallingKind::Snow);
        assert_eq!(spawn.position, Vec2::new(2.0, 7.0));
        assert_eq!(spawn.speed, 1.5);
        assert!(spawn.straight);
    }

    #[test]
    fn invalid_prefab_index_falls_back_to_the_first_prefab() {
        for index in [-3, 2, 99] {
            let request = SpawnRequest::new(SpawnWhat::Prefab(index), PointChoice::Index(0));
            let spawn = resolve(&request, &catalog(), &points(), 0.7, &mut rng()).unwrap();
            assert_eq!(spawn.template.kind, FallingKind::Snow);
        }
    }

    #[test]
    fn invalid_point_index_falls_back_to_some_point() {
        let points = points();
        let request = SpawnRequest::new(SpawnWhat::Debris, PointChoice::Index(-1))
            .with_speed(SpawnSpeed::Exact(3.0));
        let spawn = resolve(&request, &catalog(), &points, 0.7, &mut rng()).unwrap();

        assert_eq!(spawn.template.kind, FallingKind::Debris);
        assert!(points.0.iter().any(|p| p.position == spawn.position));
        assert_eq!(spawn.speed, 3.0);
    }

    #[test]
    fn template_speed_drifts() {
        let request = SpawnRequest::new(SpawnWhat::Debris, PointChoice::Random)
            .with_speed(SpawnSpeed::Template);
        let spawn = resolve(&request, &catalog(), &points(), 0.7, &mut rng()).unwrap();

        assert_eq!(spawn.speed, 4.0);
        assert!(!spawn.straight);
    }

    #[test]
    fn chance_follows_snow_chance() {
        let mut rng = rng();
        let request = SpawnRequest::new(SpawnWhat::Chance, PointChoice::Random);

        let always_snow = resolve(&request, &catalog(), &points(), 1.0, &mut rng).unwrap();
        assert_eq!(always_snow.template.kind, FallingKind::Snow);

        let never_snow = resolve(&request, &catalog(), &points(), 0.0, &mut rng).unwrap();
        assert_eq!(never_snow.template.kind, FallingKind::Debris);
    }

    #[test]
    fn nothing_spawns_without_prefabs_points_or_the_requested_kind() {
        let request = SpawnRequest::new(SpawnWhat::Snow, PointChoice::Random);

        assert!(resolve(&request, &FallingCatalog::default(), &points(), 0.7, &mut rng()).is_none());
        assert!(resolve(&request, &catalog(), &SpawnPoints::default(), 0.7, &mut rng()).is_none());

        let debris_only = FallingCatalog {
            prefabs: vec![catalog().prefabs[1].clone()],
        };
        assert!(resolve(&request, &debris_only, &points(), 0.7, &mut rng()).is_none());
    }

    #[test]
    fn random_point_speed_range_is_respected() {
        let points = SpawnPoints(vec![SpawnPointConfig {
            position: Vec2::new(0.0, 7.0),
            speed: FallSpeed::Between(1.0, 2.5),
        }]);
        let mut rng = rng();
        for _ in 0..20 {
            let request = SpawnRequest::new(SpawnWhat::Random, PointChoice::Index(0));
            let spawn = resolve(&request, &catalog(), &points, 0.7, &mut rng).unwrap();
            assert!((1.0..=2.5).contains(&spawn.speed));
        }
    }

    #[test]
    fn auto_spawner_fires_after_its_delay_only_while_enabled() {
        let config = SpawnerConfig::default();
        let mut rng = rng();
        let mut spawner = AutoSpawner::new(&config);

        assert!(!spawner.tick(Duration::from_secs(10), &mut rng));

        spawner.start(&mut rng);
        let delay = spawner.delay().as_secs_f32();
        assert!((config.min_delay..=config.max_delay).contains(&delay));

        assert!(!spawner.tick(Duration::from_secs_f32(delay * 0.5), &mut rng));
        assert!(spawner.tick(Duration::from_secs_f32(delay * 0.6), &mut rng));

        spawner.stop();
        assert!(!spawner.tick(Duration::from_secs(10), &mut rng));
    }

    #[test]
    fn negative_delays_fire_on_the_next_tick() {
        let config = SpawnerConfig {
            min_delay: -2.0,
            max_delay: -1.0,
            ..default()
        };
        let mut rng = rng();
        let mut spawner = AutoSpawner::new(&config);

        spawner.start(&mut rng);
        assert_eq!(spawner.delay(), Duration::ZERO);
        assert!(spawner.tick(Duration::from_millis(16), &mut rng));
        assert!(spawner.tick(Duration::from_millis(16), &mut rng));
    }

    #[test]
    fn restart_turns_auto_spawning_back_on() {
        let config = GameConfig::default();
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .add_message::<RestartRequested>()
            .insert_resource(AutoSpawner::new(&config.spawner))
            .insert_resource(config)
            .add_systems(Update, restart_auto_spawner);

        app.update();
        assert!(!app.world().resource::<AutoSpawner>().enabled);

        app.world_mut().write_message(RestartRequested);
        app.update();

        let spawner = app.world().resource::<AutoSpawner>();
        assert!(spawner.enabled);
        let delay = spawner.delay().as_secs_f32();
        assert!((1.0..=3.0).contains(&delay));
    }

    #[test]
    fn restart_leaves_auto_spawning_off_when_disabled() {
        let mut config = GameConfig::default();
        config.spawner.auto_spawn = false;
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .add_message::<RestartRequested>()
            .insert_resource(AutoSpawner::new(&config.spawner))
            .insert_resource(config)
            .add_systems(Update, restart_auto_spawner);

        app.world_mut().write_message(RestartRequested);
        app.update();

        assert!(!app.world().resource::<AutoSpawner>().enabled);
    }

    #[test]
    fn spawn_request_message_spawns_a_falling_object() {
        let mut app = App::new();
        let config = GameConfig::default();
        app.add_plugins(MinimalPlugins)
            .add_message::<SpawnRequest>()
            .insert_resource(catalog())
            .insert_resource(points())
            .insert_resource(config)
            .add_systems(Update, process_spawn_requests);

        app.world_mut()
            .write_message(SpawnRequest::new(SpawnWhat::Debris, PointChoice::Index(1)));
        app.world_mut()
            .write_message(SpawnRequest::new(SpawnWhat::Snow, PointChoice::Index(3)));
        app.update();

        let mut query = app.world_mut().query::<(&FallingKind, &Falling, &Transform)>();
        let spawned: Vec<_> = query.iter(app.world()).collect();
        assert_eq!(spawned.len(), 2);
        assert!(spawned
            .iter()
            .any(|(kind, _, transform)| **kind == FallingKind::Debris && transform.translation.x == -2.0));
        assert!(spawned.iter().all(|(_, falling, _)| falling.straight));
    }
}
