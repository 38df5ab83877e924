mod class;
mod template;
mod world;

use std::sync::Arc;

use glam::DVec3;

use crate::net::Appearance;

pub use class::{ClassRegistry, PlayerClass, BASE_CLASS};
pub use template::{PlayerTemplate, TemplatePlayerRef};
pub use world::World;

pub type PlayerId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerMode {
    #[default]
    Active,
    Inactive,
    Killed,
    Crashed,
    Detonated,
    Deleted,
}

impl PlayerMode {
    pub fn is_dead(self) -> bool {
        matches!(
            self,
            Self::Killed | Self::Crashed | Self::Detonated | Self::Deleted
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkOrigin {
    pub network_id: u16,
    pub remote_id: u32,
    pub federate: String,
}

#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    class: Arc<PlayerClass>,
    type_string: String,
    pub mode: PlayerMode,
    pub appearance: Appearance,
    pub position: DVec3,
    pub velocity: DVec3,
    pub acceleration: DVec3,
    /// Euler angles (roll, pitch, yaw) in radians.
    pub orientation: DVec3,
    pub angular_velocity: DVec3,
    pub origin: Option<NetworkOrigin>,
    pub published_on: Vec<u16>,
}

impl Player {
    pub fn new(id: PlayerId, class: Arc<PlayerClass>, type_string: &str) -> Self {
        Self {
            id,
            name: String::new(),
            class,
            type_string: type_string.to_string(),
            mode: PlayerMode::Active,
            appearance: Appearance::empty(),
            position: DVec3::ZERO,
            velocity: DVec3::ZERO,
            acceleration: DVec3::ZERO,
            orientation: DVec3::ZERO,
            angular_velocity: DVec3::ZERO,
            origin: None,
            published_on: Vec::new(),
        }
    }

    pub fn class(&self) -> &Arc<PlayerClass> {
        &self.class
    }

    pub fn factory_name(&self) -> &str {
        self.class.name()
    }

    pub fn is_factory_name(&self, name: &str) -> bool {
        self.class.is_kind_of(name)
    }

    pub fn type_string(&self) -> &str {
        &self.type_string
    }

    pub fn is_active(&self) -> bool {
        self.mode == PlayerMode::Active
    }

    pub fn is_dead(&self) -> bool {
        self.mode.is_dead()
    }

    pub fn is_proxy(&self) -> bool {
        self.origin.is_some()
    }

    pub fn is_published_on(&self, network_id: u16) -> bool {
        self.published_on.contains(&network_id)
    }

    pub fn mark_published(&mut self, network_id: u16) {
        if !self.is_published_on(network_id) {
            self.published_on.push(network_id);
        }
    }

    pub fn unmark_published(&mut self, network_id: u16) {
        self.published_on.retain(|&id| id != network_id);
    }

    pub fn range_to(&self, position: DVec3) -> f64 {
        self.position.distance(position)
    }
}
