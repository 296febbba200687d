use bevy::prelude::*;

use crate::{screens::Screen, session::GameSession};

pub struct MenuPlugin;

impl Plugin for MenuPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(Screen::MainMenu), setup_main_menu)
            .add_systems(
                Update,
                (menu_button_system, menu_keyboard_system).run_if(in_state(Screen::MainMenu)),
            )
            .add_systems(Update, button_hover_system);
    }
}

const BUTTON_IDLE: Color = Color::srgb(0.16, 0.2, 0.32);
const BUTTON_HOVER: Color = Color::srgb(0.24, 0.32, 0.5);
const BUTTON_PRESSED: Color = Color::srgb(0.35, 0.5, 0.75);

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
enum MenuButton {
    Start,
    Exit,
}

/// A labelled button used by the menu and the round panels.
pub fn spawn_button(parent: &mut ChildSpawnerCommands, label: &str, action: impl Component) {
    parent
        .spawn((
            Button,
            Node {
                width: Val::Px(220.0),
                height: Val::Px(50.0),
                margin: UiRect::all(Val::Px(8.0)),
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                ..default()
            },
            BackgroundColor(BUTTON_IDLE),
            action,
        ))
        .with_children(|button| {
            button.spawn((
                Text::new(label),
                TextFont {
                    font_size: 24.0,
                    ..default()
                },
                TextColor(Color::WHITE),
            ));
        });
}

fn setup_main_menu(mut commands: Commands) {
    commands
        .spawn((
            Name::new("Main Menu"),
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                flex_direction: FlexDirection::Column,
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                ..default()
            },
            BackgroundColor(Color::srgb(0.03, 0.04, 0.09)),
            DespawnOnExit(Screen::MainMenu),
        ))
        .with_children(|root| {
            root.spawn((
                Text::new("SNOWFALL"),
                TextFont {
                    font_size: 72.0,
                    ..default()
                },
                TextColor(Color::srgb(0.85, 0.93, 1.0)),
                Node {
                    margin: UiRect::bottom(Val::Px(12.0)),
                    ..default()
                },
            ));
            root.spawn((
                Text::new("Catch the snow. Dodge the debris."),
                TextFont {
                    font_size: 20.0,
                    ..default()
                },
                TextColor(Color::srgb(0.6, 0.65, 0.75)),
                Node {
                    margin: UiRect::bottom(Val::Px(40.0)),
                    ..default()
                },
            ));

            spawn_button(root, "Start", MenuButton::Start);
            spawn_button(root, "Exit", MenuButton::Exit);
        });
}

fn start_game(session: &mut GameSession, next_screen: &mut NextState<Screen>) {
    session.reset();
    next_screen.set(Screen::Playing);
    info!("Starting game");
}

fn menu_button_system(
    buttons: Query<(&Interaction, &MenuButton), Changed<Interaction>>,
    mut session: ResMut<GameSession>,
    mut next_screen: ResMut<NextState<Screen>>,
    mut exit: MessageWriter<AppExit>,
) {
    for (interaction, button) in &buttons {
        if *interaction != Interaction::Pressed {
            continue;
        }
        match button {
            MenuButton::Start => start_game(&mut session, &mut next_screen),
            MenuButton::Exit => {
                info!("Exiting game");
                exit.write(AppExit::Success);
            }
        }
    }
}

fn menu_keyboard_system(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut session: ResMut<GameSession>,
    mut next_screen: ResMut<NextState<Screen>>,
    mut exit: MessageWriter<AppExit>,
) {
    if keyboard.just_pressed(KeyCode::Enter) {
        start_game(&mut session, &mut next_screen);
    } else if keyboard.just_pressed(KeyCode::Escape) {
        info!("Exiting game");
        exit.write(AppExit::Success);
    }
}

fn button_hover_system(
    mut buttons: Query<(&Interaction, &mut BackgroundColor), (Changed<Interaction>, With<Button>)>,
) {
    for (interaction, mut background) in &mut buttons {
        background.0 = match interaction {
            Interaction::Pressed => BUTTON_PRESSED,
            Interaction::Hovered => BUTTON_HOVER,
            Interaction::None => BUTTON_IDLE,
        };
    }
}
