use bevy::{
    math::bounding::{Aabb2d, BoundingVolume, RayCast2d},
    prelude::*,
};

use crate::{config::GameConfig, screens::Screen};

pub struct BoundaryPlugin;

impl Plugin for BoundaryPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(Screen::Playing), spawn_walls);
    }
}

/// Gap between the body edge and the overlap check point.
const CONTACT_GAP: f32 = 0.05;
/// Length of the edge ray cast while walking.
const CONTACT_RAY: f32 = 0.2;
/// How far an overlapping body is shoved back out of a wall.
const PUSH_OUT: f32 = 0.1;
/// Walls are never thinner than this.
const MIN_WALL_THICKNESS: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Unit x direction pointing from the arena into this wall.
    pub fn outward(self) -> f32 {
        match self {
            Side::Left => -1.0,
            Side::Right => 1.0,
        }
    }
}

/// A static side wall. The half size is kept here so contact checks don't need
/// to look at the sprite.
#[derive(Component, Debug, Clone, Copy)]
pub struct Boundary {
    pub side: Side,
    pub half_size: Vec2,
}

impl Boundary {
    pub fn aabb(&self, center: Vec2) -> Aabb2d {
        Aabb2d::new(center, self.half_size)
    }
}

/// Which sides currently block horizontal movement.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WallContact {
    pub left: bool,
    pub right: bool,
}

impl WallContact {
    /// True when moving in `direction` would push further into a wall.
    pub fn blocks(&self, direction: f32) -> bool {
        (self.left && direction < 0.0) || (self.right && direction > 0.0)
    }

    pub fn mark(&mut self, side: Side) {
        match side {
            Side::Left => self.left = true,
            Side::Right => self.right = true,
        }
    }
}

/// Snapshot of every wall for one frame of movement queries.
#[derive(Debug, Default, Clone)]
pub struct WallSet {
    walls: Vec<(Side, Aabb2d)>,
}

fn contains_point(aabb: &Aabb2d, point: Vec2) -> bool {
    point.cmpge(aabb.min).all() && point.cmple(aabb.max).all()
}

impl WallSet {
    pub fn new(walls: impl IntoIterator<Item = (Side, Aabb2d)>) -> Self {
        WallSet {
            walls: walls.into_iter().collect(),
        }
    }

    /// Checks both sides of `body`: a point just outside each vertical edge
    /// at mid height, then a short ray outward from that edge. Either hit
    /// blocks the side.
    pub fn contact(&self, body: &Aabb2d) -> WallContact {
        let mut contact = WallContact::default();
        let center = body.center();

        for (edge_x, side) in [(body.min.x, Side::Left), (body.max.x, Side::Right)] {
            let edge = Vec2::new(edge_x, center.y);
            let point = edge + Vec2::X * side.outward() * CONTACT_GAP;

            let overlapping = self.walls.iter().any(|(_, wall)| contains_point(wall, point));
            if overlapping || self.ray_hits(edge, side.outward(), CONTACT_RAY) {
                debug!("{:?} boundary detected", side);
                contact.mark(side);
            }
        }
        contact
    }

    /// Casts a horizontal ray from `origin` toward `direction` (sign only).
    pub fn ray_hits(&self, origin: Vec2, direction: f32, distance: f32) -> bool {
        let dir = if direction < 0.0 { Dir2::NEG_X } else { Dir2::X };
        let ray = RayCast2d::new(origin, dir, distance);
        self.walls
            .iter()
            .any(|(_, wall)| ray.aabb_intersection_at(wall).is_some())
    }

    /// Horizontal correction for a body that ended up inside a wall:
    /// a small shove away from the wall it overlaps, or zero.
    pub fn push_out(&self, body: &Aabb2d) -> f32 {
        self.walls
            .iter()
            .find(|(_, wall)| {
                body.min.x < wall.max.x
                    && body.max.x > wall.min.x
                    && body.min.y < wall.max.y
                    && body.max.y > wall.min.y
            })
            .map(|(side, _)| -side.outward() * PUSH_OUT)
            .unwrap_or(0.0)
    }
}

pub fn walls_from_query<'a>(
    walls: impl IntoIterator<Item = (&'a Boundary, &'a Transform)>,
) -> WallSet {
    WallSet::new(
        walls
            .into_iter()
            .map(|(boundary, transform)| (boundary.side, boundary.aabb(transform.translation.truncate()))),
    )
}

fn spawn_walls(mut commands: Commands, config: Res<GameConfig>) {
    let arena = &config.arena;
    let thickness = arena.wall_thickness.max(MIN_WALL_THICKNESS);
    let height = arena.view_height * 2.0;
    let half_size = Vec2::new(thickness / 2.0, height / 2.0);

    for side in [Side::Left, Side::Right] {
        let x = side.outward() * (arena.wall_x + half_size.x);
        commands.spawn((
            Name::new(format!("{:?} Boundary", side)),
            Boundary { side, half_size },
            Sprite::from_color(Color::srgb(0.18, 0.2, 0.3), half_size * 2.0),
            Transform::from_xyz(x, 0.0, -1.0),
            DespawnOnExit(Screen::Playing),
        ));
        debug!("Boundary {:?} placed at x = {}", side, x);
    }
}
