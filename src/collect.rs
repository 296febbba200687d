// collect.rs - What happens when the astronaut touches something falling.

use bevy::{
    math::bounding::{Aabb2d, IntersectsVolume},
    prelude::*,
};

use crate::{
    astronaut::Astronaut,
    config::GameConfig,
    falling::{Falling, FallingKind},
    screens::RoundState,
    session::GameSession,
    tints::Tint,
};

pub struct CollectPlugin;

impl Plugin for CollectPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            collect_system.run_if(in_state(RoundState::Running)),
        )
        .add_observer(on_snow_collected)
        .add_observer(on_astronaut_hit);
    }
}

#[derive(Event, Debug, Clone, Copy)]
pub struct SnowCollected {
    pub astronaut: Entity,
}

#[derive(Event, Debug, Clone, Copy)]
pub struct AstronautHit {
    pub astronaut: Entity,
}

pub fn collect_system(
    mut commands: Commands,
    config: Res<GameConfig>,
    mut session: ResMut<GameSession>,
    astronauts: Query<(Entity, &Transform), With<Astronaut>>,
    falling: Query<(Entity, &Transform, &Falling, &FallingKind)>,
) {
    let half_body = config.astronaut.body_size / 2.0;

    for (entity, transform, object, kind) in &falling {
        // Once the round is decided nothing else is picked up, even later
        // in this same pass.
        if !session.active {
            return;
        }
        let aabb = Aabb2d::new(transform.translation.truncate(), object.half_size);

        // First astronaut touching it takes it; the object is gone after that.
        let Some(astronaut) = astronauts.iter().find_map(|(astronaut, body)| {
            Aabb2d::new(body.translation.truncate(), half_body)
                .intersects(&aabb)
                .then_some(astronaut)
        }) else {
            continue;
        };

        commands.entity(entity).despawn();
        match kind {
            FallingKind::Snow => {
                session.add_water(config.session.snow_water);
                session.add_points(config.session.snow_points);
                commands.trigger(SnowCollected { astronaut });
            }
            FallingKind::Debris => {
                session.take_damage(config.session.debris_damage);
                commands.trigger(AstronautHit { astronaut });
            }
        }
    }
}

fn on_snow_collected(trigger: On<SnowCollected>, mut commands: Commands) {
    if let Ok(mut astronaut) = commands.get_entity(trigger.astronaut) {
        astronaut.insert(Tint::glow());
    }
}

fn on_astronaut_hit(trigger: On<AstronautHit>, mut commands: Commands) {
    if let Ok(mut astronaut) = commands.get_entity(trigger.astronaut) {
        astronaut.insert(Tint::damage());
    }
}
