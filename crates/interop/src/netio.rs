use std::collections::BTreeSet;
use std::sync::Arc;

use crate::config::{LoadReport, NetIoConfig, NtmTables};
use crate::entity_type::EntityTypeCode;
use crate::error::{InteropError, RegistryError};
use crate::net::{Appearance, EntityCodec, EntityStateRecord, NetIoStats, RkyvCodec};
use crate::nib::{
    IoType, KinematicState, Nib, NibKey, NibRegistry, NibState, SendReason, UpdateOutcome,
};
use crate::player::{NetworkOrigin, PlayerId, PlayerMode, World};

/// Bridges one network to the host world: discovers and publishes local
/// players, and turns incoming entity states into proxy players.
pub struct NetIo {
    config: NetIoConfig,
    tables: NtmTables,
    report: LoadReport,
    registry: NibRegistry,
    codec: Box<dyn EntityCodec>,
    stats: NetIoStats,
    // Local players that matched no output mapping or failed the filter.
    unpublishable: BTreeSet<PlayerId>,
}

impl NetIo {
    pub fn new(config: NetIoConfig) -> Self {
        Self::with_codec(config, Box::new(RkyvCodec))
    }

    pub fn with_codec(config: NetIoConfig, codec: Box<dyn EntityCodec>) -> Self {
        let (tables, report) = NtmTables::build(&config);
        if tables.input.is_empty() && config.input_enabled {
            log::warn!("no input entity types configured; all incoming entities will be dropped");
        }
        if tables.output.is_empty() && config.output_enabled {
            log::warn!("no output entity types configured; nothing will be published");
        }

        Self {
            registry: NibRegistry::new(config.max_entities),
            config,
            tables,
            report,
            codec,
            stats: NetIoStats::default(),
            unpublishable: BTreeSet::new(),
        }
    }

    pub fn config(&self) -> &NetIoConfig {
        &self.config
    }

    pub fn load_report(&self) -> &LoadReport {
        &self.report
    }

    pub fn tables(&self) -> &NtmTables {
        &self.tables
    }

    pub fn registry(&self) -> &NibRegistry {
        &self.registry
    }

    pub fn stats(&self) -> &NetIoStats {
        &self.stats
    }

    pub fn set_queue_drops(&mut self, drops: u64) {
        self.stats.queue_drops = drops;
    }

    pub fn federate_name(&self) -> &str {
        &self.config.federate_name
    }

    pub fn network_id(&self) -> u16 {
        self.config.network_id
    }

    pub fn find_nib(&self, player_id: u32, federate: &str, io: IoType) -> Option<&Nib> {
        self.registry.find_nib(player_id, federate, io)
    }

    pub fn find_output_nib(&self, player: PlayerId) -> Option<&Nib> {
        self.registry
            .find_nib(player, &self.config.federate_name, IoType::Output)
    }

    /// Decodes and applies incoming datagrams in receive order, drives proxy
    /// players along their dead-reckoned paths and retires stale entities.
    pub fn input_frame<I, B>(&mut self, world: &mut World, datagrams: I)
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        if !self.config.input_enabled {
            return;
        }
        let now = world.time();

        for data in datagrams {
            match self.codec.decode(data.as_ref()) {
                Ok(record) => {
                    self.stats.records_received += 1;
                    self.process_record(world, &record, now);
                }
                Err(err) => {
                    self.stats.decode_errors += 1;
                    log::debug!("dropping undecodable datagram: {}", err);
                }
            }
        }

        self.update_proxies(world, now);

        for nib in self.registry.sweep_stale(now) {
            log::debug!(
                "retiring stale entity {}:{}",
                nib.key().federate,
                nib.key().player_id
            );
            self.drop_proxy(world, &nib);
        }

        // Stale proxies stay in the world for one more frame but must not
        // look live to the host.
        for nib in self.registry.nibs(IoType::Input) {
            if nib.state() != NibState::Stale {
                continue;
            }
            if let Some(player) = world.get_mut(nib.player()) {
                if player.mode == PlayerMode::Active {
                    player.mode = PlayerMode::Inactive;
                }
            }
        }
    }

    pub fn output_frame(&mut self, world: &mut World) -> Vec<Vec<u8>> {
        let now = world.time();
        let mut out = Vec::new();

        if !self.config.output_enabled {
            self.retire_outputs(world, now, &mut out);
            return out;
        }

        self.unpublishable.retain(|id| world.contains(*id));

        // Retire first so departed players free their slots for this frame.
        let departed: Vec<PlayerId> = self
            .registry
            .nibs(IoType::Output)
            .iter()
            .map(|nib| nib.key().player_id)
            .filter(|id| !self.still_publishable(world, *id))
            .collect();
        for id in departed {
            self.retire_output(world, id, now, &mut out);
        }

        let candidates: Vec<PlayerId> = world
            .local_players()
            .filter(|p| !p.is_dead() && !self.unpublishable.contains(&p.id))
            .filter(|p| {
                self.registry
                    .find_nib(p.id, &self.config.federate_name, IoType::Output)
                    .is_none()
            })
            .map(|p| p.id)
            .collect();

        for id in candidates {
            match self.create_new_output_nib(world, id) {
                Ok(_) => {}
                Err(InteropError::Unmatched(id)) => {
                    self.stats.unmatched_outgoing += 1;
                    self.unpublishable.insert(id);
                    log::debug!("player {} matches no output entity type", id);
                }
                Err(InteropError::Filtered(id)) => {
                    self.stats.filtered_outgoing += 1;
                    self.unpublishable.insert(id);
                    log::debug!("player {} excluded by output filter", id);
                }
                Err(InteropError::Registry(RegistryError::ListFull { capacity, .. })) => {
                    self.stats.capacity_drops += 1;
                    log::warn!("output nib list full ({}), player {} not published", capacity, id);
                }
                Err(err) => log::warn!("cannot publish player {}: {}", id, err),
            }
        }

        let published: Vec<PlayerId> = self
            .registry
            .nibs(IoType::Output)
            .iter()
            .map(|nib| nib.key().player_id)
            .collect();

        for id in published {
            self.publish(world, id, now, &mut out);
        }

        out
    }

    fn still_publishable(&self, world: &World, id: PlayerId) -> bool {
        match world.get(id) {
            Some(player) if !player.is_dead() && !player.is_proxy() => self
                .find_output_nib(id)
                .and_then(|nib| nib.ntm())
                .is_some_and(|ntm| ntm.matches_player(player)),
            _ => false,
        }
    }

    pub fn create_new_output_nib(
        &mut self,
        world: &mut World,
        id: PlayerId,
    ) -> Result<&Nib, InteropError> {
        if !self.config.output_enabled {
            return Err(InteropError::OutputDisabled);
        }
        let player = world.get_mut(id).ok_or(InteropError::NoSuchPlayer(id))?;
        if player.is_proxy() {
            return Err(InteropError::ProxyPlayer(id));
        }

        let ntm = self
            .tables
            .output
            .find_by_player(player)
            .ok_or(InteropError::Unmatched(id))?;
        if !self.config.output_allowed(ntm.entity_type()) {
            return Err(InteropError::Filtered(id));
        }

        let mut nib = Nib::new(
            IoType::Output,
            NibKey::new(id, &self.config.federate_name),
            id,
        )
        .with_network_id(self.config.network_id)
        .with_limits(self.config.limits_for(ntm.entity_type()))
        .with_ntm(Arc::clone(ntm));
        ntm.copy_entity_type(Some(&mut nib));

        let nib = self.registry.insert(nib)?;
        player.mark_published(self.config.network_id);
        log::debug!(
            "publishing player {} ({}) as {}",
            id,
            player.type_string(),
            nib.entity_type()
        );
        Ok(nib)
    }

    pub fn destroy_input_nib(&mut self, world: &mut World, remote_id: u32, federate: &str) -> bool {
        match self.registry.remove(remote_id, federate, IoType::Input) {
            Some(nib) => {
                log::debug!("retiring entity {}:{}", federate, remote_id);
                self.drop_proxy(world, &nib);
                true
            }
            None => false,
        }
    }

    /// Retires everything: published players get a final deactivation
    /// record and proxies leave the world.
    pub fn shutdown(&mut self, world: &mut World) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        self.retire_outputs(world, world.time(), &mut out);

        let inputs: Vec<NibKey> = self
            .registry
            .nibs(IoType::Input)
            .iter()
            .map(|nib| nib.key().clone())
            .collect();
        for key in inputs {
            self.destroy_input_nib(world, key.player_id, &key.federate);
        }
        out
    }

    fn process_record(&mut self, world: &mut World, record: &EntityStateRecord, now: f64) {
        if record.federate == self.config.federate_name {
            self.stats.own_federate_ignored += 1;
            return;
        }

        let code = match record.entity_type() {
            Ok(code) => code,
            Err(err) => {
                self.stats.decode_errors += 1;
                log::debug!("record {}:{}: {}", record.federate, record.remote_id, err);
                return;
            }
        };

        let existing = self
            .registry
            .find_nib(record.remote_id, &record.federate, IoType::Input)
            .map(|nib| nib.state());

        if record.is_deactivated() {
            if existing.is_some() {
                self.destroy_input_nib(world, record.remote_id, &record.federate);
            }
            return;
        }

        match existing {
            Some(NibState::Stale) => {
                // Stale nibs are never revived; start over with a fresh one.
                self.destroy_input_nib(world, record.remote_id, &record.federate);
                self.create_input_nib(world, record, code, now);
            }
            Some(_) => self.update_input_nib(world, record),
            None => self.create_input_nib(world, record, code, now),
        }
    }

    fn update_input_nib(&mut self, world: &mut World, record: &EntityStateRecord) {
        let Some(nib) =
            self.registry
                .find_nib_mut(record.remote_id, &record.federate, IoType::Input)
        else {
            return;
        };

        let timestamp = nib.local_time(record.timestamp);
        match nib.apply_update(&record.kinematics(), record.dead_reckoning(), timestamp) {
            UpdateOutcome::OutOfOrder => self.stats.stale_updates += 1,
            UpdateOutcome::Ignored => {}
            UpdateOutcome::Rebased | UpdateOutcome::Absorbed => {
                if let Some(player) = world.get_mut(nib.player()) {
                    player.appearance = record.appearance();
                }
            }
        }
    }

    fn create_input_nib(
        &mut self,
        world: &mut World,
        record: &EntityStateRecord,
        code: EntityTypeCode,
        now: f64,
    ) {
        let Some((ntm, quality)) = self.tables.input.find_with_quality(&code) else {
            self.stats.unmatched_incoming += 1;
            log::debug!(
                "no input mapping for {} ({}:{})",
                code,
                record.federate,
                record.remote_id
            );
            return;
        };
        let ntm = Arc::clone(ntm);

        let limits = self.config.limits_for(&code);
        let state = record.kinematics();
        if let Some(ownship) = world.ownship() {
            let range = ownship.range_to(state.position);
            if !limits.in_range(range) {
                self.stats.out_of_range += 1;
                log::debug!(
                    "{}:{} out of range ({:.0} m)",
                    record.federate,
                    record.remote_id,
                    range
                );
                return;
            }
        }

        if self.registry.is_full(IoType::Input) {
            self.stats.capacity_drops += 1;
            log::warn!(
                "input nib list full ({}), dropping {}:{}",
                self.registry.capacity(),
                record.federate,
                record.remote_id
            );
            return;
        }

        let network_id = self.config.network_id;
        let mut player = ntm.template().instantiate(0);
        player.name = format!("{}:{}", record.federate, record.remote_id);
        player.appearance = record.appearance();
        player.origin = Some(NetworkOrigin {
            network_id,
            remote_id: record.remote_id,
            federate: record.federate.clone(),
        });
        player.mark_published(network_id);
        state.apply_to(&mut player);
        let player_id = world.insert(player);

        let mut nib = Nib::new(
            IoType::Input,
            NibKey::new(record.remote_id, &record.federate),
            player_id,
        )
        .with_network_id(network_id)
        .with_limits(limits)
        .with_ntm(Arc::clone(&ntm))
        .with_time_offset(now - record.timestamp);
        nib.set_entity_type(code);
        nib.apply_update(&state, record.dead_reckoning(), now);

        match self.registry.insert(nib) {
            Ok(nib) => {
                self.stats.proxies_created += 1;
                log::debug!(
                    "new entity {}:{} {} as `{}` (player {}, {} fields matched)",
                    record.federate,
                    record.remote_id,
                    code,
                    ntm.template().name(),
                    nib.player(),
                    quality.matched
                );
            }
            Err(err) => {
                log::warn!("{}", err);
                world.despawn(player_id);
            }
        }
    }

    fn update_proxies(&mut self, world: &mut World, now: f64) {
        let ownship = world.ownship().map(|p| p.position);
        let mut gone = Vec::new();

        for nib in self.registry.nibs(IoType::Input) {
            let Some(player) = world.get_mut(nib.player()) else {
                gone.push(nib.key().clone());
                continue;
            };
            if !nib.is_active() {
                continue;
            }

            let dr = nib.dead_reckoning();
            let dt = (now - dr.time).max(0.0);
            let (position, orientation) = dr.extrapolate(dt);
            player.position = position;
            player.orientation = orientation;
            player.velocity = dr.velocity_at(dt);
            player.acceleration = dr.basis.acceleration;
            player.angular_velocity = dr.basis.angular_velocity;

            if let Some(origin) = ownship {
                if !nib.limits().in_range(origin.distance(position)) {
                    self.stats.out_of_range += 1;
                    gone.push(nib.key().clone());
                }
            }
        }

        for key in gone {
            self.destroy_input_nib(world, key.player_id, &key.federate);
        }
    }

    fn drop_proxy(&mut self, world: &mut World, nib: &Nib) {
        if world.despawn(nib.player()).is_some() {
            self.stats.proxies_retired += 1;
        }
    }

    fn publish(&mut self, world: &World, id: PlayerId, now: f64, out: &mut Vec<Vec<u8>>) {
        let Some(player) = world.get(id) else {
            return;
        };
        let current = KinematicState::of(player);
        let federate = self.config.federate_name.clone();
        let model = self.config.dead_reckoning;

        let Some(nib) = self.registry.find_nib_mut(id, &federate, IoType::Output) else {
            return;
        };
        let Some(reason) = nib.output_due(&current, now) else {
            return;
        };

        let record = build_record(nib, &federate, model as u8, player.appearance, &current, now);
        match self.codec.encode(&record) {
            Ok(bytes) => {
                nib.record_sent(&current, model, now);
                out.push(bytes);
                self.stats.records_sent += 1;
                if reason == SendReason::Heartbeat {
                    self.stats.heartbeats += 1;
                }
            }
            Err(err) => {
                self.stats.encode_errors += 1;
                log::warn!("encoding player {} failed: {}", id, err);
            }
        }
    }

    fn retire_output(&mut self, world: &mut World, id: PlayerId, now: f64, out: &mut Vec<Vec<u8>>) {
        let federate = self.config.federate_name.clone();
        let Some(nib) = self.registry.remove(id, &federate, IoType::Output) else {
            return;
        };

        let player = world.get_mut(id);
        if nib.was_published() {
            let (state, appearance) = match &player {
                Some(p) => (KinematicState::of(p), p.appearance),
                None => {
                    let dr = nib.dead_reckoning();
                    let (position, orientation) = dr.extrapolate_at(now);
                    let state = KinematicState {
                        position,
                        orientation,
                        ..KinematicState::default()
                    };
                    (state, Appearance::empty())
                }
            };
            let record = build_record(
                &nib,
                &federate,
                self.config.dead_reckoning as u8,
                appearance | Appearance::DEACTIVATED,
                &state,
                now,
            );
            match self.codec.encode(&record) {
                Ok(bytes) => {
                    out.push(bytes);
                    self.stats.records_sent += 1;
                }
                Err(err) => {
                    self.stats.encode_errors += 1;
                    log::warn!("encoding final record for player {} failed: {}", id, err);
                }
            }
        }

        if let Some(player) = player {
            player.unmark_published(self.config.network_id);
        }
        log::debug!("player {} no longer published", id);
    }

    fn retire_outputs(&mut self, world: &mut World, now: f64, out: &mut Vec<Vec<u8>>) {
        let published: Vec<PlayerId> = self
            .registry
            .nibs(IoType::Output)
            .iter()
            .map(|nib| nib.key().player_id)
            .collect();
        for id in published {
            self.retire_output(world, id, now, out);
        }
    }
}

fn build_record(
    nib: &Nib,
    federate: &str,
    dead_reckoning: u8,
    appearance: Appearance,
    state: &KinematicState,
    now: f64,
) -> EntityStateRecord {
    let mut record = EntityStateRecord::new(nib.key().player_id, federate);
    record.set_entity_type(nib.entity_type());
    record.dead_reckoning = dead_reckoning;
    record.appearance = appearance.bits();
    record.set_kinematics(state);
    record.timestamp = now;
    record
}

impl std::fmt::Debug for NetIo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetIo")
            .field("federate", &self.config.federate_name)
            .field("network_id", &self.config.network_id)
            .field("inputs", &self.registry.len(IoType::Input))
            .field("outputs", &self.registry.len(IoType::Output))
            .field("stats", &self.stats)
            .finish()
    }
}
