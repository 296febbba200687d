use bevy::{camera::ScalingMode, prelude::*};

use crate::config::GameConfig;

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Snowfall".into(),
                ..default()
            }),
            ..default()
        }))
        .insert_resource(ClearColor(Color::srgb(0.03, 0.04, 0.09)))
        // Config and save data first: later plugins read them at Startup.
        .add_plugins((
            config::ConfigPlugin,
            save_load::SaveLoadPlugin,
            screens::ScreensPlugin,
            session::SessionPlugin,
        ))
        .add_plugins((
            boundary::BoundaryPlugin,
            astronaut::AstronautPlugin,
            falling::FallingPlugin,
            spawner::SpawnerPlugin,
            timeline::TimelinePlugin,
            collect::CollectPlugin,
        ))
        .add_plugins((
            tints::TintsPlugin,
            sprite_modifications::SpriteModificationsPlugin,
            hud::HudPlugin,
            menu::MenuPlugin,
            audio::AudioPlugin,
        ))
        .add_systems(Startup, spawn_camera)
        .run();
}

/// World units, not pixels: the camera always shows `view_height` units
/// vertically and the width follows the window's aspect ratio.
fn spawn_camera(mut commands: Commands, config: Res<GameConfig>) {
    commands.spawn((
        Camera2d,
        Projection::Orthographic(OrthographicProjection {
            scaling_mode: ScalingMode::FixedVertical {
                viewport_height: config.arena.view_height,
            },
            ..OrthographicProjection::default_2d()
        }),
    ));
}

mod astronaut;
mod audio;
mod boundary;
mod collect;
mod config;
mod falling;
mod hud;
mod menu;
mod save_load;
mod screens;
mod session;
mod spawner;
mod sprite_modifications;
mod storage;
mod timeline;
mod tints;
