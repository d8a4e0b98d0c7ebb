//! Closed-loop balance demo
//!
//! Wires the control core to the planar pendulum model and runs a scripted
//! drive: catch the initial lean, drive forward, steer, stop, then take a
//! shove past the fall threshold. Time is simulated, so the whole run
//! finishes instantly.
//!
//! Usage: upright-sim [seconds]

use upright_core::command::{CommandCell, Direction, DriveCommand};
use upright_core::control::BalanceConfig;
use upright_core::hardware::{MockPort, SharedTilt};
use upright_core::robot::{Robot, RobotConfig};
use upright_core::sim::{InvertedPendulum, PendulumConfig};
use upright_core::time::ManualClock;

/// Simulation tick, milliseconds.
const TICK_MS: u64 = 1;

fn main() -> upright_core::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let seconds: u64 = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(12);

    // gains hot enough to hold the simulated chassis; the library defaults
    // are tuned for a heavier frame
    let config = RobotConfig::default().with_balance(
        BalanceConfig::default()
            .with_inner_gains(600.0, 5_000.0, 15.0)
            .with_outer_gain(3.0),
    );

    let tilt = SharedTilt::new();
    let commands = CommandCell::new();
    let clock = ManualClock::new();
    let mut robot = Robot::new(
        config,
        tilt.clone(),
        MockPort::new(),
        MockPort::new(),
        commands.clone(),
        clock.clone(),
    )?;
    robot.begin();

    let mut pendulum = InvertedPendulum::new(PendulumConfig::default().with_initial_tilt(1.5))?;

    let dt = TICK_MS as f64 / 1_000.0;
    for tick in 0..seconds * 1_000 / TICK_MS {
        let t_ms = tick * TICK_MS;

        match t_ms {
            3_000 => {
                tracing::info!("command: forward");
                commands.store(DriveCommand::new(Direction::Forward, 120, 50));
            }
            6_000 => {
                tracing::info!("command: forward with right steer");
                commands.store(DriveCommand::new(Direction::Forward, 120, 70));
            }
            8_000 => {
                tracing::info!("command: stop");
                commands.store(DriveCommand::stop());
            }
            10_000 => {
                tracing::info!("shoving the chassis past the fall threshold");
                pendulum.nudge(50.0);
            }
            _ => {}
        }

        // the model sees the signed mix the orchestrator last commanded
        let status = robot.status();
        pendulum.step((status.left_speed + status.right_speed) / 2.0, dt);
        tilt.set_degrees(pendulum.tilt_degrees());

        clock.advance_millis(TICK_MS);
        robot.run();

        if t_ms % 500 == 0 {
            let status = robot.status();
            tracing::info!(
                t_s = t_ms as f64 / 1_000.0,
                tilt_deg = status.tilt_deg,
                base = status.base_speed,
                target = status.target_speed,
                left = status.left_position,
                right = status.right_position,
                fallen = status.fallen,
                "status"
            );
        }
    }

    let end = robot.status();
    tracing::info!(
        fallen = end.fallen,
        tilt_deg = end.tilt_deg,
        "run complete"
    );
    Ok(())
}
