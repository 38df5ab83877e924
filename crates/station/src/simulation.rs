use glam::DVec3;

use interop::World;

/// Points each local player's horizontal velocity along its heading so a
/// yaw rate flies a circle. Vertical speed is left alone.
pub fn steer_players(world: &mut World) {
    for player in world.players_mut() {
        if player.is_proxy() || !player.is_active() || player.angular_velocity.z == 0.0 {
            continue;
        }

        let speed = player.velocity.truncate().length();
        let (sin_yaw, cos_yaw) = player.orientation.z.sin_cos();
        player.velocity = DVec3::new(speed * cos_yaw, speed * sin_yaw, player.velocity.z);
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_PI_2;
    use std::sync::Arc;

    use interop::{ClassRegistry, PlayerTemplate};

    use super::*;

    #[test]
    fn test_heading_turns_velocity() {
        let classes = ClassRegistry::with_builtin();
        let template = PlayerTemplate::new("uav", Arc::clone(classes.get("UnmannedAirVehicle").unwrap()), "MQ-9");

        let mut world = World::new();
        let id = world.spawn(&template);
        let player = world.get_mut(id).unwrap();
        player.velocity = DVec3::new(40.0, 0.0, 1.0);
        player.orientation.z = FRAC_PI_2;
        player.angular_velocity.z = 0.1;

        steer_players(&mut world);

        let velocity = world.get(id).unwrap().velocity;
        assert!((velocity - DVec3::new(0.0, 40.0, 1.0)).length() < 1e-9);
    }

    #[test]
    fn test_straight_flyers_untouched() {
        let classes = ClassRegistry::with_builtin();
        let template = PlayerTemplate::new("ship", Arc::clone(classes.get("Ship").unwrap()), "DDG");

        let mut world = World::new();
        let id = world.spawn(&template);
        world.get_mut(id).unwrap().velocity = DVec3::new(5.0, 0.0, 0.0);
        world.get_mut(id).unwrap().orientation.z = 1.0;

        steer_players(&mut world);
        assert_eq!(world.get(id).unwrap().velocity, DVec3::new(5.0, 0.0, 0.0));
    }
}
