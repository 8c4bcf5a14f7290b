//! Steering input derivation and the kinematic vehicle actuator
//!
//! The AI expresses movement only as throttle/steer/brake scalars; this
//! module derives them from world geometry and integrates them into the
//! agent's transform, standing in for the external vehicle physics.

use glam::Vec2;

use crate::game::agent::Agent;

/// Arrival tolerance for destination checks (cm)
pub const ARRIVAL_TOLERANCE: f32 = 100.0;

/// Movement intent scalars handed to the vehicle actuator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Drive {
    /// Forward thrust, -1.0 (reverse) to 1.0 (full ahead)
    pub throttle: f32,
    /// Positive steers toward the right axis
    pub steer: f32,
    /// 0.0 (released) to 1.0 (full brake)
    pub brake: f32,
}

impl Drive {
    pub fn stop() -> Self {
        Self {
            throttle: 0.0,
            steer: 0.0,
            brake: 1.0,
        }
    }
}

/// Kinematic profile for the vehicle actuator
#[derive(Debug, Clone, Copy)]
pub struct VehicleStats {
    /// Maximum speed (cm/s)
    pub max_speed: f32,
    /// Acceleration at full throttle (cm/s^2)
    pub acceleration: f32,
    /// Per-tick velocity retention
    pub drag: f32,
    /// Turn rate at full steer (rad/s)
    pub turn_rate: f32,
}

impl Default for VehicleStats {
    fn default() -> Self {
        Self {
            max_speed: 800.0,
            acceleration: 400.0,
            drag: 0.95,
            turn_rate: 2.5,
        }
    }
}

/// Derive throttle/steer scalars pointing the agent at a destination.
/// Throttle is the forward-axis alignment, steering the right-axis
/// alignment, both clamped to [-1, 1].
pub fn drive_towards(agent: &Agent, destination: Vec2) -> Drive {
    let to_dest = destination - agent.position;
    if to_dest.length_squared() < 1.0 {
        return Drive::stop();
    }

    let dir = to_dest.normalize();
    Drive {
        throttle: agent.forward().dot(dir).clamp(-1.0, 1.0),
        steer: agent.right().dot(dir).clamp(-1.0, 1.0),
        brake: 0.0,
    }
}

/// Has the agent arrived at a destination, within tolerance
pub fn has_reached(position: Vec2, destination: Vec2, tolerance: f32) -> bool {
    position.distance(destination) <= tolerance
}

/// Advance the agent's transform one step under the given drive scalars.
/// Thrust acts along the facing, drag and brake bleed speed, and the
/// result is clamped to the profile's maximum.
pub fn integrate(agent: &mut Agent, drive: Drive, stats: &VehicleStats, dt: f32) {
    let throttle = drive.throttle.clamp(-1.0, 1.0);
    let steer = drive.steer.clamp(-1.0, 1.0);
    let brake = drive.brake.clamp(0.0, 1.0);

    // Positive steer turns toward the right axis, which is clockwise here
    let new_rotation = (agent.rotation - steer * stats.turn_rate * dt)
        .rem_euclid(std::f32::consts::TAU);
    agent.rotation = new_rotation;

    // Reverse runs at reduced power
    let thrust_power = if throttle >= 0.0 {
        throttle * stats.acceleration
    } else {
        throttle * stats.acceleration * 0.5
    };

    let mut velocity = agent.velocity + agent.forward() * thrust_power * dt;
    velocity *= stats.drag;
    velocity *= 1.0 - 0.3 * brake;

    let speed = velocity.length();
    if speed > stats.max_speed {
        velocity *= stats.max_speed / speed;
    }

    agent.velocity = velocity;
    agent.position += velocity * dt;
}
