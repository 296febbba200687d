// hud.rs - In-game readouts and the end-of-round panels.

use bevy::prelude::*;

use crate::{
    menu::spawn_button,
    screens::{RoundState, Screen},
    session::{GameSession, RestartRequested},
};

pub struct HudPlugin;

impl Plugin for HudPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(Screen::Playing), spawn_hud)
            .add_systems(OnEnter(RoundState::GameOver), spawn_game_over_panel)
            .add_systems(OnEnter(RoundState::LevelComplete), spawn_level_complete_panel)
            .add_systems(
                Update,
                (update_hud_system, panel_button_system, hud_keyboard_system)
                    .run_if(in_state(Screen::Playing)),
            );
    }
}

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
enum HudText {
    Score,
    HighScore,
    Health,
    Water,
}

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
enum HudBar {
    Health,
    Water,
}

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
enum PanelButton {
    Restart,
    MainMenu,
}

pub fn score_label(score: u32) -> String {
    format!("Score: {}", score)
}

pub fn high_score_label(high_score: u32) -> String {
    format!("High Score: {}", high_score)
}

/// `value` out of `max` as a rounded percentage, e.g. "Health: 90%".
pub fn percent_label(prefix: &str, value: f32, max: f32) -> String {
    let percent = if max > 0.0 { value / max * 100.0 } else { 0.0 };
    format!("{}: {}%", prefix, percent.round() as i32)
}

fn hud_text(label: String, size: f32, marker: HudText) -> impl Bundle {
    (
        Text::new(label),
        TextFont {
            font_size: size,
            ..default()
        },
        TextColor(Color::WHITE),
        marker,
    )
}

fn spawn_bar(parent: &mut ChildSpawnerCommands, bar: HudBar, fill: Color, text: HudText) {
    parent.spawn(hud_text(String::new(), 20.0, text));
    parent
        .spawn((
            Node {
                width: Val::Px(200.0),
                height: Val::Px(14.0),
                margin: UiRect::bottom(Val::Px(8.0)),
                ..default()
            },
            BackgroundColor(Color::srgba(1.0, 1.0, 1.0, 0.15)),
        ))
        .with_children(|track| {
            track.spawn((
                Node {
                    width: Val::Percent(0.0),
                    height: Val::Percent(100.0),
                    ..default()
                },
                BackgroundColor(fill),
                bar,
            ));
        });
}

fn spawn_hud(mut commands: Commands) {
    commands
        .spawn((
            Name::new("HUD"),
            Node {
                position_type: PositionType::Absolute,
                left: Val::Px(16.0),
                top: Val::Px(12.0),
                flex_direction: FlexDirection::Column,
                ..default()
            },
            DespawnOnExit(Screen::Playing),
        ))
        .with_children(|hud| {
            hud.spawn(hud_text(String::new(), 28.0, HudText::Score));
            hud.spawn(hud_text(String::new(), 20.0, HudText::HighScore));
            spawn_bar(hud, HudBar::Health, Color::srgb(0.85, 0.25, 0.25), HudText::Health);
            spawn_bar(hud, HudBar::Water, Color::srgb(0.3, 0.6, 0.95), HudText::Water);
        });
}

fn update_hud_system(
    session: Res<GameSession>,
    mut texts: Query<(&mut Text, &HudText)>,
    mut bars: Query<(&mut Node, &HudBar)>,
) {
    // Runs once more on the frame the HUD appears, even if the session is unchanged.
    if !session.is_changed() && texts.iter().all(|(text, _)| !text.0.is_empty()) {
        return;
    }

    for (mut text, kind) in &mut texts {
        text.0 = match kind {
            HudText::Score => score_label(session.score),
            HudText::HighScore => high_score_label(session.high_score),
            HudText::Health => percent_label("Health", session.health, session.max_health),
            HudText::Water => percent_label("Water", session.water, session.max_water),
        };
    }

    for (mut node, bar) in &mut bars {
        let fraction = match bar {
            HudBar::Health => session.health_fraction(),
            HudBar::Water => session.water_fraction(),
        };
        node.width = Val::Percent(fraction.clamp(0.0, 1.0) * 100.0);
    }
}

fn spawn_round_panel(commands: &mut Commands, title: &str, color: Color, score: u32, state: RoundState) {
    commands
        .spawn((
            Name::new(format!("{} Panel", title)),
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                flex_direction: FlexDirection::Column,
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                ..default()
            },
            BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.6)),
            GlobalZIndex(10),
            DespawnOnExit(state),
        ))
        .with_children(|panel| {
            panel.spawn((
                Text::new(title),
                TextFont {
                    font_size: 96.0,
                    ..default()
                },
                TextColor(color),
                TextLayout::new_with_justify(Justify::Center),
            ));
            panel.spawn((
                Text::new(score_label(score)),
                TextFont {
                    font_size: 32.0,
                    ..default()
                },
                TextColor(Color::WHITE),
                Node {
                    margin: UiRect::vertical(Val::Px(16.0)),
                    ..default()
                },
            ));
            spawn_button(panel, "Restart", PanelButton::Restart);
            spawn_button(panel, "Main Menu", PanelButton::MainMenu);
        });
}

fn spawn_game_over_panel(mut commands: Commands, session: Res<GameSession>) {
    spawn_round_panel(
        &mut commands,
        "GAME OVER",
        Color::srgb(0.95, 0.35, 0.35),
        session.score,
        RoundState::GameOver,
    );
}

fn spawn_level_complete_panel(mut commands: Commands, session: Res<GameSession>) {
    spawn_round_panel(
        &mut commands,
        "LEVEL COMPLETE",
        Color::srgb(0.5, 0.85, 1.0),
        session.score,
        RoundState::LevelComplete,
    );
}

fn panel_button_system(
    buttons: Query<(&Interaction, &PanelButton), Changed<Interaction>>,
    mut restarts: MessageWriter<RestartRequested>,
    mut next_screen: ResMut<NextState<Screen>>,
) {
    for (interaction, button) in &buttons {
        if *interaction != Interaction::Pressed {
            continue;
        }
        match button {
            PanelButton::Restart => {
                restarts.write(RestartRequested);
            }
            PanelButton::MainMenu => {
                info!("Returning to main menu");
                next_screen.set(Screen::MainMenu);
            }
        }
    }
}

fn hud_keyboard_system(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut restarts: MessageWriter<RestartRequested>,
    mut next_screen: ResMut<NextState<Screen>>,
) {
    if keyboard.just_pressed(KeyCode::KeyR) {
        restarts.write(RestartRequested);
    } else if keyboard.just_pressed(KeyCode::Escape) {
        info!("Returning to main menu");
        next_screen.set(Screen::MainMenu);
    }
}
