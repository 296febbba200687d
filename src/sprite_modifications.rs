use bevy::prelude::*;

pub struct SpriteModificationsPlugin;

impl Plugin for SpriteModificationsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, pop_in_system);
    }
}

/// Scale the entity starts from when it pops in.
const POP_IN_FROM: f32 = 0.25;

/// Grows a freshly spawned sprite to full size, overshooting slightly.
/// Removed once finished.
#[derive(Component, Debug)]
pub struct PopIn {
    pub timer: Timer,
}

impl PopIn {
    pub fn new(seconds: f32) -> Self {
        PopIn {
            timer: Timer::from_seconds(seconds, TimerMode::Once),
        }
    }
}

/// BackOut overshoots past 1.0 then settles, so the sprite briefly exceeds
/// full size before landing exactly on it.
pub fn pop_in_scale(fraction: f32) -> f32 {
    let eased = EaseFunction::BackOut.sample_clamped(fraction);
    POP_IN_FROM + (1.0 - POP_IN_FROM) * eased
}

fn pop_in_system(
    mut commands: Commands,
    mut query: Query<(Entity, &mut Transform, &mut PopIn)>,
    time: Res<Time>,
) {
    for (entity, mut transform, mut pop_in) in &mut query {
        pop_in.timer.tick(time.delta());

        if pop_in.timer.is_finished() {
            transform.scale = Vec3::ONE;
            commands.entity(entity).remove::<PopIn>();
        } else {
            transform.scale = Vec3::splat(pop_in_scale(pop_in.timer.fraction()));
        }
    }
}
