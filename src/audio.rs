use bevy::{audio::Volume, prelude::*};

use crate::{
    collect::{AstronautHit, SnowCollected},
    screens::RoundState,
};

pub struct AudioPlugin;

impl Plugin for AudioPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_audio)
            .add_systems(OnEnter(RoundState::GameOver), play_game_over)
            .add_systems(OnEnter(RoundState::LevelComplete), play_level_complete)
            .add_observer(play_collect)
            .add_observer(play_hit);
    }
}

#[derive(Resource)]
pub struct GameAudio {
    pub collect: Handle<AudioSource>,
    pub hit: Handle<AudioSource>,
    pub game_over: Handle<AudioSource>,
    pub level_complete: Handle<AudioSource>,
}

pub fn setup_audio(mut commands: Commands, asset_server: Res<AssetServer>) {
    // load() returns right away; the handles become valid once loading finishes.
    commands.insert_resource(GameAudio {
        collect: asset_server.load("audio/collect.wav"),
        hit: asset_server.load("audio/hit.wav"),
        game_over: asset_server.load("audio/game_over.wav"),
        level_complete: asset_server.load("audio/level_complete.wav"),
    });
}

fn play_one_shot(commands: &mut Commands, sound: &Handle<AudioSource>, volume: f32) {
    commands.spawn((
        AudioPlayer::new(sound.clone()),
        PlaybackSettings::DESPAWN.with_volume(Volume::Linear(volume)),
    ));
}

fn play_collect(_trigger: On<SnowCollected>, mut commands: Commands, audio: Option<Res<GameAudio>>) {
    if let Some(audio) = audio {
        play_one_shot(&mut commands, &audio.collect, 0.6);
    }
}

fn play_hit(_trigger: On<AstronautHit>, mut commands: Commands, audio: Option<Res<GameAudio>>) {
    if let Some(audio) = audio {
        play_one_shot(&mut commands, &audio.hit, 0.8);
    }
}

fn play_game_over(mut commands: Commands, audio: Res<GameAudio>) {
    play_one_shot(&mut commands, &audio.game_over, 1.0);
}

fn play_level_complete(mut commands: Commands, audio: Res<GameAudio>) {
    play_one_shot(&mut commands, &audio.level_complete, 1.0);
}
