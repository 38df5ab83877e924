mod dead_reckoning;
mod registry;

use std::cmp::Ordering;

use crate::config::DrLimits;
use crate::entity_type::EntityTypeCode;
use crate::ntm::NtmRef;
use crate::player::PlayerId;

pub use dead_reckoning::{
    normalize_angle, orientation_error, DeadReckoning, DeadReckoningModel, KinematicState,
};
pub use registry::NibRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoType {
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NibState {
    Created,
    Active,
    Stale,
    Retired,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NibKey {
    pub player_id: u32,
    pub federate: String,
}

impl NibKey {
    pub fn new(player_id: u32, federate: &str) -> Self {
        Self {
            player_id,
            federate: federate.to_string(),
        }
    }

    pub fn cmp_parts(&self, player_id: u32, federate: &str) -> Ordering {
        self.player_id
            .cmp(&player_id)
            .then_with(|| self.federate.as_str().cmp(federate))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Rebased,
    Absorbed,
    OutOfOrder,
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendReason {
    Initial,
    Heartbeat,
    Drift,
}

#[derive(Debug, Clone)]
pub struct Nib {
    io_type: IoType,
    key: NibKey,
    network_id: u16,
    player: PlayerId,
    entity_type: EntityTypeCode,
    state: NibState,
    ntm: Option<NtmRef>,
    limits: DrLimits,
    dead_reckoning: DeadReckoning,
    last_update_time: f64,
    update_count: u64,
    time_offset: f64,
}

impl Nib {
    pub fn new(io_type: IoType, key: NibKey, player: PlayerId) -> Self {
        Self {
            io_type,
            key,
            network_id: 0,
            player,
            entity_type: EntityTypeCode::default(),
            state: NibState::Created,
            ntm: None,
            limits: DrLimits::default(),
            dead_reckoning: DeadReckoning::default(),
            last_update_time: 0.0,
            update_count: 0,
            time_offset: 0.0,
        }
    }

    pub fn with_network_id(mut self, network_id: u16) -> Self {
        self.network_id = network_id;
        self
    }

    pub fn with_limits(mut self, limits: DrLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_ntm(mut self, ntm: NtmRef) -> Self {
        self.ntm = Some(ntm);
        self
    }

    /// Offset added to sender timestamps to bring them onto the local clock.
    pub fn with_time_offset(mut self, offset: f64) -> Self {
        self.time_offset = offset;
        self
    }

    pub fn io_type(&self) -> IoType {
        self.io_type
    }

    pub fn key(&self) -> &NibKey {
        &self.key
    }

    pub fn network_id(&self) -> u16 {
        self.network_id
    }

    pub fn player(&self) -> PlayerId {
        self.player
    }

    pub fn entity_type(&self) -> &EntityTypeCode {
        &self.entity_type
    }

    pub fn set_entity_type(&mut self, entity_type: EntityTypeCode) {
        self.entity_type = entity_type;
    }

    pub fn state(&self) -> NibState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == NibState::Active
    }

    pub fn ntm(&self) -> Option<&NtmRef> {
        self.ntm.as_ref()
    }

    pub fn limits(&self) -> &DrLimits {
        &self.limits
    }

    pub fn dead_reckoning(&self) -> &DeadReckoning {
        &self.dead_reckoning
    }

    pub fn last_update_time(&self) -> f64 {
        self.last_update_time
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    pub fn local_time(&self, sender_timestamp: f64) -> f64 {
        sender_timestamp + self.time_offset
    }

    pub fn age(&self, now: f64) -> f64 {
        now - self.last_update_time
    }

    pub fn apply_update(
        &mut self,
        update: &KinematicState,
        model: DeadReckoningModel,
        timestamp: f64,
    ) -> UpdateOutcome {
        match self.state {
            NibState::Stale | NibState::Retired => return UpdateOutcome::Ignored,
            NibState::Created => {
                self.rebase(update, model, timestamp);
                self.state = NibState::Active;
                return UpdateOutcome::Rebased;
            }
            NibState::Active => {}
        }

        if timestamp < self.last_update_time {
            log::debug!(
                "dropping out-of-order update for {}:{} ({} < {})",
                self.key.federate,
                self.key.player_id,
                timestamp,
                self.last_update_time
            );
            return UpdateOutcome::OutOfOrder;
        }

        let (position, orientation) = self
            .dead_reckoning
            .extrapolate(timestamp - self.dead_reckoning.time);

        let drifted = position.distance(update.position) > self.limits.max_position_error
            || orientation_error(orientation, update.orientation) > self.limits.max_orientation_error
            || model != self.dead_reckoning.model;

        if drifted {
            self.rebase(update, model, timestamp);
            UpdateOutcome::Rebased
        } else {
            self.last_update_time = timestamp;
            self.update_count += 1;
            UpdateOutcome::Absorbed
        }
    }

    pub fn extrapolate(&self, dt_since_update: f64) -> (glam::DVec3, glam::DVec3) {
        self.dead_reckoning.extrapolate(dt_since_update)
    }

    /// Marks an active nib stale once it has gone `max_age` without updates.
    pub fn check_age(&mut self, now: f64) -> bool {
        if self.state == NibState::Active && self.age(now) >= self.limits.max_age {
            self.state = NibState::Stale;
            true
        } else {
            false
        }
    }

    pub fn retire(&mut self) {
        self.state = NibState::Retired;
    }

    /// Whether the published state of `current` needs a new wire update.
    pub fn output_due(&self, current: &KinematicState, now: f64) -> Option<SendReason> {
        if self.state == NibState::Created {
            return Some(SendReason::Initial);
        }

        let (position, orientation) = self.dead_reckoning.extrapolate_at(now);
        if position.distance(current.position) > self.limits.max_position_error
            || orientation_error(orientation, current.orientation) > self.limits.max_orientation_error
        {
            return Some(SendReason::Drift);
        }

        if now - self.last_update_time >= self.limits.max_time_dr {
            return Some(SendReason::Heartbeat);
        }

        None
    }

    pub fn record_sent(&mut self, current: &KinematicState, model: DeadReckoningModel, now: f64) {
        self.rebase(current, model, now);
        if self.state == NibState::Created {
            self.state = NibState::Active;
        }
    }

    pub fn was_published(&self) -> bool {
        self.io_type == IoType::Output && self.update_count > 0
    }

    fn rebase(&mut self, basis: &KinematicState, model: DeadReckoningModel, time: f64) {
        self.dead_reckoning = DeadReckoning::new(model, *basis, time);
        self.last_update_time = time;
        self.update_count += 1;
    }
}
