use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use glam::DVec3;

use interop::{NetIo, UdpTransport, World};

use crate::config::{PlayerEntry, StationConfig};
use crate::simulation::steer_players;

/// One federate: a world of local players plus the network bridge.
pub struct Station {
    netio: NetIo,
    world: World,
    transport: UdpTransport,
    peer: SocketAddr,
    tick_duration: Duration,
    last_tick_time: Instant,
    accumulator: Duration,
    stats_interval: Duration,
    last_stats_time: Instant,
}

impl Station {
    pub fn new(config: StationConfig) -> Result<Self> {
        let netio = NetIo::new(config.netio.clone());
        let report = netio.load_report();
        if !report.is_clean() {
            log::warn!("{} configuration entries skipped", report.errors.len());
        }

        let peer: SocketAddr = config
            .peer
            .parse()
            .with_context(|| format!("invalid peer address `{}`", config.peer))?;
        let transport = UdpTransport::bind(config.bind.as_str(), config.queue_capacity)
            .with_context(|| format!("failed to bind {}", config.bind))?;
        if let IpAddr::V4(ip) = peer.ip() {
            if ip.is_broadcast() {
                transport.set_broadcast(true)?;
            }
        }

        let mut world = World::new();
        for entry in &config.players {
            spawn_player(&netio, &mut world, entry);
        }
        if let Some(name) = &config.ownship {
            let ownship_id = world.players().find(|p| &p.name == name).map(|p| p.id);
            match ownship_id {
                Some(id) => {
                    world.set_ownship(id);
                }
                None => log::warn!("ownship `{}` is not one of the configured players", name),
            }
        }

        Ok(Self {
            netio,
            world,
            transport,
            peer,
            tick_duration: Duration::from_secs_f64(1.0 / config.tick_rate.max(1) as f64),
            last_tick_time: Instant::now(),
            accumulator: Duration::ZERO,
            stats_interval: Duration::from_secs_f64(config.stats_interval_secs.max(0.1)),
            last_stats_time: Instant::now(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.transport.local_addr()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn run(&mut self, duration: Option<Duration>) {
        let start = Instant::now();
        while !duration.is_some_and(|d| start.elapsed() >= d) {
            self.tick_once();
            std::thread::sleep(Duration::from_millis(1));
        }
        self.shutdown();
    }

    pub fn tick_once(&mut self) {
        let now = Instant::now();
        self.accumulator += now - self.last_tick_time;
        self.last_tick_time = now;

        while self.accumulator >= self.tick_duration {
            self.accumulator -= self.tick_duration;
            self.tick();
        }

        if self.last_stats_time.elapsed() >= self.stats_interval {
            self.last_stats_time = Instant::now();
            log::info!(
                "t={:.1}s players={} {}",
                self.world.time(),
                self.world.player_count(),
                self.netio.stats()
            );
        }
    }

    fn tick(&mut self) {
        let dt = self.tick_duration.as_secs_f64();
        steer_players(&mut self.world);
        self.world.advance(dt);

        let datagrams = self.transport.poll();
        self.netio
            .input_frame(&mut self.world, datagrams.iter().map(|d| &d.data));
        self.netio.set_queue_drops(self.transport.stats().queue_drops);

        let outgoing = self.netio.output_frame(&mut self.world);
        self.send(outgoing);
    }

    fn send(&mut self, datagrams: Vec<Vec<u8>>) {
        for bytes in datagrams {
            if let Err(e) = self.transport.send_to(&bytes, self.peer) {
                log::warn!("send to {} failed: {}", self.peer, e);
            }
        }
    }

    pub fn shutdown(&mut self) {
        let last = self.netio.shutdown(&mut self.world);
        self.send(last);
        self.transport.shutdown();
        log::info!("final counters: {}", self.netio.stats());
    }
}

fn spawn_player(netio: &NetIo, world: &mut World, entry: &PlayerEntry) {
    let Some(template) = netio.tables().template(&entry.template) else {
        log::warn!(
            "player `{}` uses unknown template `{}`",
            entry.name,
            entry.template
        );
        return;
    };

    let id = world.spawn(template);
    if let Some(player) = world.get_mut(id) {
        player.name = entry.name.clone();
        player.position = DVec3::from_array(entry.position);
        player.velocity = DVec3::from_array(entry.velocity);
        player.orientation = DVec3::from_array(entry.orientation.map(f64::to_radians));
        player.angular_velocity = DVec3::from_array(entry.angular_velocity.map(f64::to_radians));
    }
    log::info!("spawned `{}` as player {}", entry.name, id);
}
