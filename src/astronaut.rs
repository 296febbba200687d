// astronaut.rs - The player character: input, walking, jumping and leaping.
//
// Input is gathered into an AstronautIntent resource first, then a single
// motion system feeds it through AstronautMotion::step. The step function is
// pure so the jump arc and wall handling can be tested without an App.

use bevy::{math::bounding::Aabb2d, prelude::*, window::PrimaryWindow};

use crate::{
    boundary::{walls_from_query, Boundary, WallContact, WallSet},
    config::{AstronautConfig, GameConfig},
    screens::{RoundState, Screen},
    session::RestartRequested,
    tints::BaseColor,
};

pub struct AstronautPlugin;

impl Plugin for AstronautPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<AstronautIntent>()
            .add_systems(OnEnter(Screen::Playing), spawn_astronaut)
            .add_systems(
                Update,
                (gather_intent_system, astronaut_motion_system, face_direction_system)
                    .chain()
                    .run_if(in_state(RoundState::Running)),
            )
            .add_systems(
                Update,
                reset_astronaut_system.run_if(in_state(Screen::Playing)),
            );
    }
}

/// Extra ray length past the frame's leap distance.
const LEAP_RAY_MARGIN: f32 = 0.1;
/// Horizontal input below this counts as standing still for bobbing.
const BOB_THRESHOLD: f32 = 0.1;
/// Descent gives up and snaps to the floor after this share of jump_duration.
const MAX_FALL_SHARE: f32 = 0.75;

#[derive(Component)]
pub struct Astronaut;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JumpKind {
    /// Straight up and down.
    Jump,
    /// Sideways arc; `direction` is -1 or 1.
    Leap { direction: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum JumpPhase {
    #[default]
    Grounded,
    Ascending {
        kind: JumpKind,
        start_y: f32,
        elapsed: f32,
    },
    Descending {
        kind: JumpKind,
        fall_time: f32,
    },
}

/// What the player is asking for this frame, from whichever device.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub struct AstronautIntent {
    /// -1.0 (left) to 1.0 (right).
    pub horizontal: f32,
    /// Jump key held, or a swipe-up finished this frame.
    pub jump_held: bool,
}

#[derive(Component, Debug, Clone, PartialEq)]
pub struct AstronautMotion {
    pub phase: JumpPhase,
    pub facing_right: bool,
    /// Cleared when a jump fires, set again once the jump input is released.
    pub jump_armed: bool,
    /// Wall contact from the last check.
    pub blocked: WallContact,
}

impl Default for AstronautMotion {
    fn default() -> Self {
        AstronautMotion {
            phase: JumpPhase::Grounded,
            facing_right: true,
            jump_armed: true,
            blocked: WallContact::default(),
        }
    }
}

/// Everything a motion step reads besides the astronaut itself.
pub struct MotionContext<'a> {
    pub config: &'a AstronautConfig,
    /// Center height while standing on the floor.
    pub rest_y: f32,
    /// Seconds since startup, drives the walking bob.
    pub elapsed: f32,
    pub dt: f32,
    pub walls: &'a WallSet,
}

impl AstronautMotion {
    pub fn is_grounded(&self) -> bool {
        self.phase == JumpPhase::Grounded
    }

    pub fn reset(&mut self) {
        *self = AstronautMotion::default();
    }

    /// Advances the astronaut by one frame, moving `position` (its center).
    pub fn step(&mut self, position: &mut Vec2, intent: &AstronautIntent, ctx: &MotionContext) {
        let horizontal = intent.horizontal.clamp(-1.0, 1.0);

        // Mid-air the astronaut keeps facing the way it took off.
        if self.is_grounded() {
            if horizontal > 0.0 {
                self.facing_right = true;
            } else if horizontal < 0.0 {
                self.facing_right = false;
            }
        }

        let jump_pressed = intent.jump_held && self.jump_armed;
        self.jump_armed = !intent.jump_held;

        let half_size = ctx.config.body_size / 2.0;
        self.blocked = ctx.walls.contact(&Aabb2d::new(*position, half_size));

        match self.phase {
            JumpPhase::Grounded if jump_pressed => {
                let kind = if horizontal == 0.0 {
                    JumpKind::Jump
                } else {
                    JumpKind::Leap {
                        direction: horizontal.signum(),
                    }
                };
                debug!("Astronaut starts {:?}", kind);
                self.phase = JumpPhase::Ascending {
                    kind,
                    start_y: position.y,
                    elapsed: 0.0,
                };
                self.ascend(position, ctx);
            }
            JumpPhase::Grounded => self.walk(position, horizontal, ctx),
            JumpPhase::Ascending { .. } => self.ascend(position, ctx),
            JumpPhase::Descending { .. } => self.descend(position, ctx),
        }

        position.x += ctx
            .walls
            .push_out(&Aabb2d::new(*position, half_size));
    }

    fn walk(&self, position: &mut Vec2, horizontal: f32, ctx: &MotionContext) {
        let config = ctx.config;

        if horizontal != 0.0 && !self.blocked.blocks(horizontal) {
            position.x += horizontal * config.move_speed * ctx.dt;
        }
        position.x = position
            .x
            .clamp(-config.horizontal_boundary, config.horizontal_boundary);

        position.y = if horizontal.abs() > BOB_THRESHOLD {
            ctx.rest_y + (ctx.elapsed * config.bob_speed).sin() * config.bob_amount
        } else {
            ctx.rest_y
        };
    }

    fn ascend(&mut self, position: &mut Vec2, ctx: &MotionContext) {
        let JumpPhase::Ascending {
            kind,
            start_y,
            elapsed,
        } = self.phase
        else {
            return;
        };
        let config = ctx.config;

        if elapsed < config.jump_duration {
            // Parabola through 0 at both ends, peaking at `force` halfway.
            let progress = elapsed / config.jump_duration;
            let force = match kind {
                JumpKind::Jump => config.jump_force,
                JumpKind::Leap { .. } => config.leap_force,
            };
            position.y = start_y + force * 4.0 * progress * (1.0 - progress);

            if let JumpKind::Leap { direction } = kind {
                self.leap_sideways(position, direction, ctx);
            }
            self.phase = JumpPhase::Ascending {
                kind,
                start_y,
                elapsed: elapsed + ctx.dt,
            };
        } else {
            self.phase = JumpPhase::Descending {
                kind,
                fall_time: 0.0,
            };
            self.descend(position, ctx);
        }
    }

    fn descend(&mut self, position: &mut Vec2, ctx: &MotionContext) {
        let JumpPhase::Descending { kind, fall_time } = self.phase else {
            return;
        };
        let config = ctx.config;

        if position.y > ctx.rest_y && fall_time < MAX_FALL_SHARE * config.jump_duration {
            position.y = (position.y - config.gravity * fall_time * ctx.dt).max(ctx.rest_y);

            if let JumpKind::Leap { direction } = kind {
                self.leap_sideways(position, direction, ctx);
            }
            self.phase = JumpPhase::Descending {
                kind,
                fall_time: fall_time + ctx.dt,
            };
        } else {
            position.y = ctx.rest_y;
            self.phase = JumpPhase::Grounded;
            debug!("Astronaut landed at x = {:.2}", position.x);
        }
    }

    fn leap_sideways(&self, position: &mut Vec2, direction: f32, ctx: &MotionContext) {
        let config = ctx.config;
        let distance = direction * config.leap_force * config.horizontal_multiplier * ctx.dt;
        let edge = Vec2::new(position.x + direction * config.body_size.x / 2.0, position.y);

        let blocked = self.blocked.blocks(direction)
            || ctx
                .walls
                .ray_hits(edge, direction, distance.abs() + LEAP_RAY_MARGIN);
        if !blocked {
            position.x += distance;
        }
        position.x = position
            .x
            .clamp(-config.horizontal_boundary, config.horizontal_boundary);
    }
}

/// Touch held on the left half of the window walks left, right half walks right.
pub fn touch_horizontal(touch_x: f32, window_width: f32) -> f32 {
    if touch_x < window_width / 2.0 {
        -1.0
    } else {
        1.0
    }
}

/// Window coordinates grow downwards, so an upward swipe has end.y < start.y.
pub fn is_swipe_up(start: Vec2, end: Vec2, window_height: f32) -> bool {
    start.y - end.y > window_height / 4.0
}

fn spawn_astronaut(mut commands: Commands, config: Res<GameConfig>) {
    spawn_astronaut_entity(&mut commands, &config);
}

fn spawn_astronaut_entity(commands: &mut Commands, config: &GameConfig) {
    let spawn = config.astronaut_spawn();
    let body_size = config.astronaut.body_size;
    let suit = Color::srgb(0.92, 0.93, 0.96);

    commands
        .spawn((
            Name::new("Astronaut"),
            Astronaut,
            AstronautMotion::default(),
            Sprite::from_color(suit, body_size),
            BaseColor(suit),
            Transform::from_translation(spawn.extend(1.0)),
            DespawnOnExit(Screen::Playing),
        ))
        .with_children(|parent| {
            // Visor, offset towards the facing side so flips are visible.
            parent.spawn((
                Name::new("Visor"),
                Sprite::from_color(Color::srgb(0.25, 0.55, 0.9), body_size * Vec2::new(0.45, 0.2)),
                Transform::from_xyz(body_size.x * 0.2, body_size.y * 0.25, 0.1),
            ));
        });
    info!("Astronaut spawned at {}", spawn);
}

fn gather_intent_system(
    keyboard: Res<ButtonInput<KeyCode>>,
    touches: Option<Res<Touches>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut intent: ResMut<AstronautIntent>,
) {
    let mut horizontal = 0.0;
    if keyboard.any_pressed([KeyCode::ArrowLeft, KeyCode::KeyA]) {
        horizontal -= 1.0;
    }
    if keyboard.any_pressed([KeyCode::ArrowRight, KeyCode::KeyD]) {
        horizontal += 1.0;
    }
    let mut jump_held = keyboard.any_pressed([KeyCode::ArrowUp, KeyCode::KeyW, KeyCode::Space]);

    if let (Some(touches), Ok(window)) = (touches, windows.single()) {
        if horizontal == 0.0 {
            if let Some(touch) = touches.iter().next() {
                horizontal = touch_horizontal(touch.position().x, window.width());
            }
        }
        if touches
            .iter_just_released()
            .any(|touch| is_swipe_up(touch.start_position(), touch.position(), window.height()))
        {
            jump_held = true;
        }
    }

    *intent = AstronautIntent {
        horizontal,
        jump_held,
    };
}

fn astronaut_motion_system(
    time: Res<Time>,
    config: Res<GameConfig>,
    intent: Res<AstronautIntent>,
    walls: Query<(&Boundary, &Transform), Without<Astronaut>>,
    mut astronauts: Query<(&mut Transform, &mut AstronautMotion), With<Astronaut>>,
) {
    let walls = walls_from_query(walls.iter());
    let rest_y = config.astronaut_rest_y();
    let ctx = MotionContext {
        config: &config.astronaut,
        rest_y,
        elapsed: time.elapsed_secs(),
        dt: time.delta_secs(),
        walls: &walls,
    };

    for (mut transform, mut motion) in &mut astronauts {
        let mut position = transform.translation.truncate();
        motion.step(&mut position, &intent, &ctx);
        transform.translation.x = position.x;
        transform.translation.y = position.y;
    }
}

/// Mirrors the astronaut (and its visor) to match the facing direction.
fn face_direction_system(
    mut astronauts: Query<(&mut Transform, &AstronautMotion), Changed<AstronautMotion>>,
) {
    for (mut transform, motion) in &mut astronauts {
        transform.scale.x = if motion.facing_right { 1.0 } else { -1.0 };
    }
}

fn reset_astronaut_system(
    mut commands: Commands,
    mut restarts: MessageReader<RestartRequested>,
    config: Res<GameConfig>,
    mut astronauts: Query<(&mut Transform, &mut AstronautMotion), With<Astronaut>>,
    mut intent: ResMut<AstronautIntent>,
) {
    if restarts.read().count() == 0 {
        return;
    }
    *intent = AstronautIntent::default();

    if astronauts.is_empty() {
        warn!("Astronaut missing on restart, spawning a new one");
        spawn_astronaut_entity(&mut commands, &config);
        return;
    }

    let spawn = config.astronaut_spawn();
    for (mut transform, mut motion) in &mut astronauts {
        transform.translation.x = spawn.x;
        transform.translation.y = spawn.y;
        transform.scale.x = 1.0;
        motion.reset();
    }
    debug!("Astronaut reset to {}", spawn);
}
