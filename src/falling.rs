// falling.rs - Snowflakes and debris: how they fall, spin and leave the screen.
//
// Spawning decisions (what, where, how fast) live in spawner.rs. This module
// only turns a resolved FallingSpawn into an entity and moves it every frame.

use std::f32::consts::TAU;

use bevy::prelude::*;
use rand::Rng;

use crate::{
    config::{FallingConfig, FallingTuning, GameConfig},
    screens::{RoundState, Screen},
    session::RestartRequested,
    sprite_modifications::PopIn,
};

pub struct FallingPlugin;

impl Plugin for FallingPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            fall_system.run_if(in_state(RoundState::Running)),
        )
        .add_systems(
            Update,
            clear_falling_on_restart.run_if(in_state(Screen::Playing)),
        );
    }
}

pub const MIN_SPEED: f32 = 0.05;
pub const MAX_SPEED: f32 = 5.0;
pub const MIN_MULTIPLIER: f32 = 0.1;
pub const MAX_MULTIPLIER: f32 = 2.0;

/// How long the spawn pop-in lasts.
const POP_IN_SECS: f32 = 0.3;

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FallingKind {
    Snow,
    Debris,
}

/// A spawnable falling object: one entry of the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct FallingTemplate {
    pub name: String,
    pub kind: FallingKind,
    pub fall_speed: f32,
    /// Degrees per second before randomization.
    pub spin: f32,
    pub size: Vec2,
}

impl FallingTemplate {
    pub fn from_tuning(kind: FallingKind, tuning: &FallingTuning) -> Self {
        FallingTemplate {
            name: tuning.name.clone(),
            kind,
            fall_speed: tuning.fall_speed,
            spin: tuning.spin,
            size: tuning.size,
        }
    }

    pub fn color(&self) -> Color {
        match self.kind {
            FallingKind::Snow => Color::srgb(0.85, 0.93, 1.0),
            FallingKind::Debris => Color::srgb(0.45, 0.38, 0.33),
        }
    }
}

/// Everything needed to put one falling object into the world.
#[derive(Debug, Clone, PartialEq)]
pub struct FallingSpawn {
    pub template: FallingTemplate,
    pub position: Vec2,
    pub speed: f32,
    /// Straight objects fall plumb down from their spawn x.
    pub straight: bool,
}

#[derive(Component, Debug, Clone, PartialEq)]
pub struct Falling {
    base_speed: f32,
    multiplier: f32,
    pub straight: bool,
    /// Radians per second, signed.
    pub spin: f32,
    /// Spawn x, held by straight objects.
    pub anchor_x: f32,
    /// Unit direction of travel, pointing downwards.
    pub heading: Vec2,
    pub half_size: Vec2,
}

impl Falling {
    /// Rolls the per-object randomness: spin direction, spin variance and
    /// drift heading. Returns the component and a random initial rotation.
    pub fn roll(spawn: &FallingSpawn, config: &FallingConfig, rng: &mut impl Rng) -> (Self, f32) {
        let initial_rotation = rng.gen_range(0.0..TAU);

        let variance = config.rotation_variance.max(1.0);
        let factor = if variance > 1.0 {
            rng.gen_range(1.0 / variance..=variance)
        } else {
            1.0
        };
        let direction = if rng.gen_bool(0.5) { -1.0 } else { 1.0 };
        let spin = spawn.template.spin.to_radians() * factor * direction;

        let heading = if spawn.straight || config.drift_degrees <= 0.0 {
            Vec2::NEG_Y
        } else {
            let drift = config.drift_degrees.to_radians();
            let angle = rng.gen_range(-drift..=drift);
            Vec2::new(angle.sin(), -angle.cos())
        };

        let mut falling = Falling {
            base_speed: 0.0,
            multiplier: 1.0,
            straight: spawn.straight,
            spin,
            anchor_x: spawn.position.x,
            heading,
            half_size: spawn.template.size / 2.0,
        };
        falling.set_speed(spawn.speed, 1.0);
        (falling, initial_rotation)
    }

    pub fn set_speed(&mut self, speed: f32, multiplier: f32) {
        self.base_speed = speed.clamp(MIN_SPEED, MAX_SPEED);
        self.multiplier = multiplier.clamp(MIN_MULTIPLIER, MAX_MULTIPLIER);
    }

    pub fn speed(&self) -> f32 {
        self.base_speed * self.multiplier
    }

    /// Where an object at `position` is `dt` seconds later.
    pub fn advance(&self, position: Vec2, dt: f32) -> Vec2 {
        let mut next = position + self.heading * self.speed() * dt;
        if self.straight {
            next.x = self.anchor_x;
        }
        next
    }
}

pub fn spawn_falling(
    commands: &mut Commands,
    spawn: &FallingSpawn,
    config: &FallingConfig,
    rng: &mut impl Rng,
) -> Entity {
    let (falling, rotation) = Falling::roll(spawn, config, rng);
    let template = &spawn.template;

    debug!(
        "Spawning {} at {} (speed {:.2}, straight {})",
        template.name, spawn.position, falling.speed(), falling.straight
    );

    commands
        .spawn((
            Name::new(template.name.clone()),
            template.kind,
            falling,
            Sprite::from_color(template.color(), template.size),
            Transform::from_translation(spawn.position.extend(0.5))
                .with_rotation(Quat::from_rotation_z(rotation))
                .with_scale(Vec3::splat(0.25)),
            PopIn::new(POP_IN_SECS),
            DespawnOnExit(Screen::Playing),
        ))
        .id()
}

fn fall_system(
    mut commands: Commands,
    time: Res<Time>,
    config: Res<GameConfig>,
    mut query: Query<(Entity, &mut Transform, &Falling)>,
) {
    let dt = time.delta_secs();

    for (entity, mut transform, falling) in &mut query {
        let next = falling.advance(transform.translation.truncate(), dt);
        transform.translation.x = next.x;
        transform.translation.y = next.y;
        transform.rotate_z(falling.spin * dt);

        if next.y < config.falling.bottom_boundary {
            commands.entity(entity).despawn();
        }
    }
}

fn clear_falling_on_restart(
    mut commands: Commands,
    mut restarts: MessageReader<RestartRequested>,
    query: Query<Entity, With<Falling>>,
) {
    if restarts.read().count() == 0 {
        return;
    }

    let mut cleared = 0;
    for entity in &query {
        commands.entity(entity).despawn();
        cleared += 1;
    }
    debug!("Cleared {} falling objects", cleared);
}
