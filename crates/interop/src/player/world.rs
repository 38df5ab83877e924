use std::collections::BTreeMap;

use glam::DVec3;

use crate::nib::normalize_angle;

use super::{Player, PlayerId, TemplatePlayerRef};

#[derive(Debug)]
pub struct World {
    time: f64,
    players: BTreeMap<PlayerId, Player>,
    next_player_id: PlayerId,
    ownship: Option<PlayerId>,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        Self {
            time: 0.0,
            players: BTreeMap::new(),
            next_player_id: 1,
            ownship: None,
        }
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    /// Steps the clock and moves local players along their rates.
    /// Proxy players are driven by their input nibs instead.
    pub fn advance(&mut self, dt: f64) {
        self.time += dt;

        for player in self.players.values_mut() {
            if player.is_proxy() || player.is_dead() {
                continue;
            }
            player.velocity += player.acceleration * dt;
            player.position += player.velocity * dt;
            let turned = player.orientation + player.angular_velocity * dt;
            player.orientation = DVec3::new(
                normalize_angle(turned.x),
                normalize_angle(turned.y),
                normalize_angle(turned.z),
            );
        }
    }

    pub fn spawn(&mut self, template: &TemplatePlayerRef) -> PlayerId {
        let id = self.allocate_id();
        self.players.insert(id, template.instantiate(id));
        id
    }

    pub fn insert(&mut self, mut player: Player) -> PlayerId {
        let id = self.allocate_id();
        player.id = id;
        self.players.insert(id, player);
        id
    }

    pub fn despawn(&mut self, id: PlayerId) -> Option<Player> {
        if self.ownship == Some(id) {
            self.ownship = None;
        }
        self.players.remove(&id)
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.players.contains_key(&id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn players_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.values_mut()
    }

    pub fn local_players(&self) -> impl Iterator<Item = &Player> {
        self.players.values().filter(|p| !p.is_proxy())
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn set_ownship(&mut self, id: PlayerId) -> bool {
        if self.players.contains_key(&id) {
            self.ownship = Some(id);
            true
        } else {
            false
        }
    }

    pub fn ownship(&self) -> Option<&Player> {
        self.ownship.and_then(|id| self.players.get(&id))
    }

    fn allocate_id(&mut self) -> PlayerId {
        let id = self.next_player_id;
        self.next_player_id += 1;
        id
    }
}
