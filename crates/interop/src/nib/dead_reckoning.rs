use std::f64::consts::{PI, TAU};

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::player::Player;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum DeadReckoningModel {
    Static = 1,
    #[default]
    Fpw = 2,
    Rpw = 3,
    Rvw = 4,
    Fvw = 5,
}

impl From<u8> for DeadReckoningModel {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Static,
            2 => Self::Fpw,
            3 => Self::Rpw,
            4 => Self::Rvw,
            5 => Self::Fvw,
            _ => Self::Static,
        }
    }
}

impl DeadReckoningModel {
    pub fn rotates(self) -> bool {
        matches!(self, Self::Rpw | Self::Rvw)
    }

    pub fn accelerates(self) -> bool {
        matches!(self, Self::Rvw | Self::Fvw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct KinematicState {
    pub position: DVec3,
    pub velocity: DVec3,
    pub acceleration: DVec3,
    pub orientation: DVec3,
    pub angular_velocity: DVec3,
}

impl KinematicState {
    pub fn of(player: &Player) -> Self {
        Self {
            position: player.position,
            velocity: player.velocity,
            acceleration: player.acceleration,
            orientation: player.orientation,
            angular_velocity: player.angular_velocity,
        }
    }

    pub fn apply_to(&self, player: &mut Player) {
        player.position = self.position;
        player.velocity = self.velocity;
        player.acceleration = self.acceleration;
        player.orientation = self.orientation;
        player.angular_velocity = self.angular_velocity;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DeadReckoning {
    pub model: DeadReckoningModel,
    pub basis: KinematicState,
    pub time: f64,
}

impl DeadReckoning {
    pub fn new(model: DeadReckoningModel, basis: KinematicState, time: f64) -> Self {
        Self { model, basis, time }
    }

    pub fn extrapolate(&self, dt: f64) -> (DVec3, DVec3) {
        let b = &self.basis;
        let mut position = b.position;
        let mut orientation = b.orientation;

        if self.model != DeadReckoningModel::Static {
            position += b.velocity * dt;
            if self.model.accelerates() {
                position += b.acceleration * (0.5 * dt * dt);
            }
            if self.model.rotates() {
                orientation = wrap_angles(orientation + b.angular_velocity * dt);
            }
        }

        (position, orientation)
    }

    /// Extrapolates to absolute time `now`; never projects backwards.
    pub fn extrapolate_at(&self, now: f64) -> (DVec3, DVec3) {
        self.extrapolate((now - self.time).max(0.0))
    }

    pub fn velocity_at(&self, dt: f64) -> DVec3 {
        if self.model.accelerates() {
            self.basis.velocity + self.basis.acceleration * dt
        } else {
            self.basis.velocity
        }
    }
}

pub fn normalize_angle(angle: f64) -> f64 {
    let mut normalized = angle % TAU;
    if normalized > PI {
        normalized -= TAU;
    } else if normalized < -PI {
        normalized += TAU;
    }
    normalized
}

fn wrap_angles(angles: DVec3) -> DVec3 {
    DVec3::new(
        normalize_angle(angles.x),
        normalize_angle(angles.y),
        normalize_angle(angles.z),
    )
}

/// Largest per-axis angular difference, wrapped to [-pi, pi].
pub fn orientation_error(a: DVec3, b: DVec3) -> f64 {
    let d = a - b;
    normalize_angle(d.x)
        .abs()
        .max(normalize_angle(d.y).abs())
        .max(normalize_angle(d.z).abs())
}
