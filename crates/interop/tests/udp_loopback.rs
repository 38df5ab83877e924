use std::thread;
use std::time::{Duration, Instant};

use glam::DVec3;

use interop::{IoType, NetIo, NetIoConfig, UdpTransport, World};

const CONFIG: &str = r#"
    [[templates]]
    name = "heli"
    class = "Helicopter"
    type_string = "AH-64"

    [[input_entity_types]]
    entity_type = [1, 2, 225, 20, 0, 0, 0]
    template = "heli"

    [[output_entity_types]]
    entity_type = [1, 2, 225, 20, 1, 0, 0]
    template = "heli"
"#;

fn config(federate: &str) -> NetIoConfig {
    let mut config = NetIoConfig::from_toml_str(CONFIG).unwrap();
    config.federate_name = federate.to_string();
    config
}

fn wait_for_datagrams(transport: &UdpTransport, timeout_ms: u64) -> Vec<Vec<u8>> {
    let start = Instant::now();
    while start.elapsed() < Duration::from_millis(timeout_ms) {
        let received = transport.poll();
        if !received.is_empty() {
            return received.into_iter().map(|d| d.data).collect();
        }
        thread::sleep(Duration::from_millis(1));
    }
    Vec::new()
}

#[test]
fn test_entity_state_over_udp() {
    let mut sender = UdpTransport::bind("127.0.0.1:0", 64).unwrap();
    let receiver = UdpTransport::bind("127.0.0.1:0", 64).unwrap();

    let mut alpha = NetIo::new(config("alpha"));
    let mut alpha_world = World::new();
    let heli = alpha_world.spawn(alpha.tables().template("heli").unwrap());
    alpha_world.get_mut(heli).unwrap().position = DVec3::new(-5.0, 100.0, 2.0);

    for bytes in alpha.output_frame(&mut alpha_world) {
        sender.send_to(&bytes, receiver.local_addr()).unwrap();
    }

    let datagrams = wait_for_datagrams(&receiver, 500);
    assert_eq!(datagrams.len(), 1);

    let mut bravo = NetIo::new(config("bravo"));
    let mut bravo_world = World::new();
    bravo.input_frame(&mut bravo_world, &datagrams);

    let nib = bravo.find_nib(heli, "alpha", IoType::Input).unwrap();
    let proxy = bravo_world.get(nib.player()).unwrap();
    assert_eq!(proxy.position, DVec3::new(-5.0, 100.0, 2.0));
    assert!(proxy.is_factory_name("AirVehicle"));
    assert_eq!(receiver.stats().queue_drops, 0);
}

#[test]
fn test_own_broadcast_is_ignored() {
    let mut transport = UdpTransport::bind("127.0.0.1:0", 64).unwrap();
    let mut netio = NetIo::new(config("alpha"));
    let mut world = World::new();
    world.spawn(netio.tables().template("heli").unwrap());

    let own_addr = transport.local_addr();
    for bytes in netio.output_frame(&mut world) {
        transport.send_to(&bytes, own_addr).unwrap();
    }

    let datagrams = wait_for_datagrams(&transport, 500);
    netio.input_frame(&mut world, &datagrams);

    assert_eq!(netio.stats().own_federate_ignored, 1);
    assert!(netio.registry().is_empty(IoType::Input));
    assert_eq!(world.player_count(), 1);
}
