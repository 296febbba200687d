use bevy::prelude::*;

pub struct TintsPlugin;

impl Plugin for TintsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, tint_system);
    }
}

/// The color a sprite goes back to once a tint wears off.
/// Sprites without one go back to white.
#[derive(Component, Debug, Clone, Copy)]
pub struct BaseColor(pub Color);

/// Short color flash on a sprite. Inserting a new one replaces the old one
/// and starts the timer over.
#[derive(Component, Debug, Clone)]
pub struct Tint {
    pub color: Color,
    pub timer: Timer,
}

impl Tint {
    pub fn new(color: Color, seconds: f32) -> Self {
        Tint {
            color,
            timer: Timer::from_seconds(seconds, TimerMode::Once),
        }
    }

    /// Red flash when debris hits.
    pub fn damage() -> Self {
        Tint::new(Color::srgb(1.0, 0.35, 0.35), 0.1)
    }

    /// Pale blue glow when snow is caught.
    pub fn glow() -> Self {
        Tint::new(Color::srgb(0.7, 0.9, 1.0), 0.15)
    }
}

fn tint_system(
    mut commands: Commands,
    mut query: Query<(Entity, &mut Sprite, &mut Tint, Option<&BaseColor>)>,
    time: Res<Time>,
) {
    for (entity, mut sprite, mut tint, base) in &mut query {
        tint.timer.tick(time.delta());
        if tint.timer.is_finished() {
            commands.entity(entity).remove::<Tint>();
            sprite.color = base.map_or(Color::WHITE, |base| base.0);
        } else {
            sprite.color = tint.color;
        }
    }
}
