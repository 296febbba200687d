use std::path::{Path, PathBuf};

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::storage::{self, StorageError};

pub struct SaveLoadPlugin;

impl Plugin for SaveLoadPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SavePath>()
            .add_systems(PreStartup, load_save_data);
    }
}

/// The player's persistent save data.
///
/// Only the best score survives between sessions. New fields must carry
/// #[serde(default)] so older save files keep loading.
#[derive(Resource, Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveData {
    #[serde(default)]
    pub high_score: u32,
}

/// Where the save file lives. Defaults to `save_file_path()`; insert a
/// different one before adding the plugin to redirect it.
#[derive(Resource, Debug, Clone, PartialEq, Eq)]
pub struct SavePath(pub PathBuf);

impl Default for SavePath {
    fn default() -> Self {
        SavePath(save_file_path())
    }
}

/// `<data dir>/snowfall/save.ron`, or `save.ron` in the working directory when
/// the platform has no data directory.
pub fn save_file_path() -> PathBuf {
    match dirs::data_dir() {
        Some(dir) => dir.join("snowfall").join("save.ron"),
        None => {
            warn!("{}; saving next to the executable", StorageError::NoDataDir);
            PathBuf::from("save.ron")
        }
    }
}

fn load_save_data(mut commands: Commands, save_path: Res<SavePath>) {
    let path = &save_path.0;
    let save_data = match storage::read_ron::<SaveData>(path) {
        Ok(Some(data)) => {
            info!("Loaded save data from {:?}: {:?}", path, data);
            data
        }
        Ok(None) => {
            info!("No save file found at {:?}. Starting fresh.", path);
            SaveData::default()
        }
        Err(e) => {
            // Corrupted or outdated; losing a high score beats refusing to start.
            error!("{}. Using defaults.", e);
            SaveData::default()
        }
    };
    commands.insert_resource(save_data);
}

/// Writes the save data to disk. Call at specific moments (round end,
/// leaving play, app exit) rather than every frame.
pub fn save_to_disk(path: &Path, save_data: &SaveData) {
    match storage::write_ron(path, save_data) {
        Ok(()) => info!("Game saved to {:?}", path),
        Err(e) => error!("Failed to save game: {}", e),
    }
}
