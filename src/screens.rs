use bevy::prelude::*;

pub struct ScreensPlugin;

impl Plugin for ScreensPlugin {
    fn build(&self, app: &mut App) {
        app.init_state::<Screen>()
            .add_sub_state::<RoundState>()
            .add_systems(OnEnter(RoundState::GameOver), pause_gameplay)
            .add_systems(OnEnter(RoundState::LevelComplete), pause_gameplay)
            .add_systems(OnExit(RoundState::GameOver), resume_gameplay)
            .add_systems(OnExit(RoundState::LevelComplete), resume_gameplay)
            .add_systems(OnExit(Screen::Playing), resume_gameplay);
    }
}

/// Top-level screen. The menu and the arena never coexist.
#[derive(States, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Screen {
    #[default]
    MainMenu,
    Playing,
}

/// Where the current round stands. Only exists while on `Screen::Playing`.
#[derive(SubStates, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[source(Screen = Screen::Playing)]
pub enum RoundState {
    #[default]
    Running,
    GameOver,
    LevelComplete,
}

/// Freezes gameplay time so falling objects, the timeline and the astronaut
/// all stop while a result panel is up. UI keeps working on real time.
fn pause_gameplay(mut time: ResMut<Time<Virtual>>) {
    time.pause();
}

fn resume_gameplay(mut time: ResMut<Time<Virtual>>) {
    if time.is_paused() {
        time.unpause();
    }
}

#[cfg(test)]
mod tests {
    use bevy::state::{app::StatesPlugin, state::FreelyMutableState};

    use super::*;

    fn set<S: FreelyMutableState>(app: &mut App, state: S) {
        app.world_mut().resource_mut::<NextState<S>>().set(state);
        app.update();
    }

    fn paused(app: &App) -> bool {
        app.world().resource::<Time<Virtual>>().is_paused()
    }

    #[test]
    fn result_panels_pause_gameplay_time() {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, StatesPlugin, ScreensPlugin));
        app.update();

        set(&mut app, Screen::Playing);
        assert!(!paused(&app));

        set(&mut app, RoundState::GameOver);
        assert!(paused(&app));

        // Restart.
        set(&mut app, RoundState::Running);
        assert!(!paused(&app));

        set(&mut app, RoundState::LevelComplete);
        assert!(paused(&app));

        // Back to the menu straight from a result panel.
        set(&mut app, Screen::MainMenu);
        assert!(!paused(&app));
        assert!(app.world().get_resource::<State<RoundState>>().is_none());
    }
}
