// THEORY:
// The `controller` turns "where is the target" into "what should the wheels do".
// It is a proportional controller with a dead zone, and it comes in two flavours
// that match the two rovers this code drives:
//
// 1.  **Steering** (horizontal axis, discrete): the error is the target's x
//     offset from the middle column. Inside the dead zone the rover drives
//     FORWARD, otherwise it turns toward the target. The magnitude is the pixel
//     error so a downstream collaborator can scale the turn.
// 2.  **Drive** (vertical axis, continuous): the error is the target's y offset
//     from the middle row. Inside the dead zone both motors stop (CENTERED).
//     Outside it the speed grows with the error, normalised by the frame height,
//     then clamped between a floor and a ceiling. A target below center drives
//     forward (positive speed), above center drives backward.
//
// The speed floor means any nonzero command is at least `min_speed`. Small
// motors stall below that; it stays a tunable so it can be lowered.
//
// Both flavours are pure: the output depends only on the arguments.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core_modules::blob::Point;

/// Which image axis the error is measured along, and which signal it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlAxis {
    /// x error, discrete steering commands.
    #[default]
    Horizontal,
    /// y error, signed motor speed.
    Vertical,
}

/// Discrete rover command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    Forward,
    TurnLeft,
    TurnRight,
    Stop,
    Centered,
    Backward,
}

impl Command {
    /// The wire token for this command.
    pub fn token(self) -> &'static str {
        match self {
            Command::Forward => "FORWARD",
            Command::TurnLeft => "TURN_LEFT",
            Command::TurnRight => "TURN_RIGHT",
            Command::Stop => "STOP",
            Command::Centered => "CENTERED",
            Command::Backward => "BACKWARD",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Tunables for both controller flavours.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub axis: ControlAxis,
    /// Half-width of the no-correction band for steering, in pixels.
    pub horizontal_dead_zone: u32,
    /// Half-height of the no-correction band for drive, in pixels.
    pub vertical_dead_zone: u32,
    /// Speed commanded for an error equal to the full frame height.
    pub base_speed: u32,
    /// Lowest nonzero speed ever commanded.
    pub min_speed: u32,
    /// Highest speed ever commanded.
    pub max_speed: u32,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            axis: ControlAxis::Horizontal,
            horizontal_dead_zone: 50,
            vertical_dead_zone: 20,
            base_speed: 150,
            min_speed: 50,
            max_speed: 255,
        }
    }
}

impl ControlConfig {
    /// Dead zone of the active axis.
    pub fn dead_zone(&self) -> u32 {
        match self.axis {
            ControlAxis::Horizontal => self.horizontal_dead_zone,
            ControlAxis::Vertical => self.vertical_dead_zone,
        }
    }

    pub fn set_dead_zone(&mut self, dead_zone: u32) {
        match self.axis {
            ControlAxis::Horizontal => self.horizontal_dead_zone = dead_zone,
            ControlAxis::Vertical => self.vertical_dead_zone = dead_zone,
        }
    }
}

/// What the controller wants the rover to do this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlSignal {
    /// Discrete steering with the absolute pixel error.
    Steer { command: Command, magnitude: u32 },
    /// Signed motor speed with the signed pixel error it came from.
    Drive { command: Command, speed: i32, error: i32 },
}

impl ControlSignal {
    /// The stop signal for a given axis.
    pub fn stop(axis: ControlAxis) -> Self {
        match axis {
            ControlAxis::Horizontal => ControlSignal::Steer {
                command: Command::Stop,
                magnitude: 0,
            },
            ControlAxis::Vertical => ControlSignal::Drive {
                command: Command::Stop,
                speed: 0,
                error: 0,
            },
        }
    }

    pub fn command(&self) -> Command {
        match *self {
            ControlSignal::Steer { command, .. } | ControlSignal::Drive { command, .. } => command,
        }
    }

    /// Signed motor speed. Steering signals carry no speed.
    pub fn speed(&self) -> i32 {
        match *self {
            ControlSignal::Steer { .. } => 0,
            ControlSignal::Drive { speed, .. } => speed,
        }
    }

    pub fn is_stop(&self) -> bool {
        self.command() == Command::Stop
    }
}

impl fmt::Display for ControlSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ControlSignal::Steer { command, magnitude } => match command {
                Command::Stop => write!(f, "STOP - Lost tracking"),
                Command::Forward | Command::Centered => write!(f, "FORWARD - Centered"),
                Command::TurnRight => write!(f, "TURN RIGHT - Error: {magnitude}px"),
                Command::TurnLeft => write!(f, "TURN LEFT - Error: {magnitude}px"),
                Command::Backward => write!(f, "BACKWARD - Error: {magnitude}px"),
            },
            ControlSignal::Drive { command, speed, error } => match command {
                Command::Stop => write!(f, "STOP - Lost tracking"),
                Command::Centered => write!(f, "CENTERED - In dead zone"),
                Command::Forward => write!(f, "FORWARD {speed} - Object below (Err: +{error}px)"),
                Command::Backward => {
                    write!(f, "BACKWARD {} - Object above (Err: {error}px)", speed.unsigned_abs())
                }
                Command::TurnLeft | Command::TurnRight => write!(f, "{command} {speed}"),
            },
        }
    }
}

pub mod error_controller {
    use super::*;

    /// Computes the control signal for `position` in a `frame_width` x
    /// `frame_height` frame, dispatching on `config.axis`.
    pub fn compute_signal(
        position: Option<Point>,
        frame_width: u32,
        frame_height: u32,
        config: &ControlConfig,
    ) -> ControlSignal {
        match config.axis {
            ControlAxis::Horizontal => steer(position, frame_width, config.horizontal_dead_zone),
            ControlAxis::Vertical => drive(position, frame_height, config),
        }
    }

    /// Discrete steering on the x axis.
    pub fn steer(position: Option<Point>, frame_width: u32, dead_zone: u32) -> ControlSignal {
        let Some(position) = position else {
            return ControlSignal::stop(ControlAxis::Horizontal);
        };

        let reference = (frame_width / 2) as i64;
        let error = position.x as i64 - reference;
        let magnitude = error.unsigned_abs() as u32;

        let command = if error.unsigned_abs() < dead_zone as u64 {
            Command::Forward
        } else if error > 0 {
            Command::TurnRight
        } else {
            Command::TurnLeft
        };
        ControlSignal::Steer { command, magnitude }
    }

    /// Proportional signed speed on the y axis.
    pub fn drive(position: Option<Point>, frame_height: u32, config: &ControlConfig) -> ControlSignal {
        let Some(position) = position else {
            return ControlSignal::stop(ControlAxis::Vertical);
        };

        let reference = (frame_height / 2) as i64;
        let error = position.y as i64 - reference;

        if error.unsigned_abs() < config.vertical_dead_zone as u64 {
            return ControlSignal::Drive {
                command: Command::Centered,
                speed: 0,
                error: error as i32,
            };
        }

        let speed = proportional_speed(error.unsigned_abs(), frame_height, config);
        if error > 0 {
            ControlSignal::Drive {
                command: Command::Forward,
                speed,
                error: error as i32,
            }
        } else {
            ControlSignal::Drive {
                command: Command::Backward,
                speed: -speed,
                error: error as i32,
            }
        }
    }

    /// `round(base * min(|error| / height, 1))`, then clamped so that the floor
    /// wins over the ceiling if they are misconfigured.
    pub fn proportional_speed(abs_error: u64, frame_height: u32, config: &ControlConfig) -> i32 {
        let speed_factor = if frame_height == 0 {
            1.0
        } else {
            (abs_error as f64 / frame_height as f64).min(1.0)
        };
        let speed = (config.base_speed as f64 * speed_factor).round() as u32;
        i32::try_from(speed.min(config.max_speed).max(config.min_speed)).unwrap_or(i32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::error_controller::*;
    use super::*;

    fn at_x(x: u32) -> Option<Point> {
        Some(Point::new(x, 240))
    }

    fn at_y(y: u32) -> Option<Point> {
        Some(Point::new(320, y))
    }

    fn drive_config() -> ControlConfig {
        ControlConfig {
            axis: ControlAxis::Vertical,
            vertical_dead_zone: 20,
            base_speed: 150,
            max_speed: 255,
            min_speed: 50,
            ..ControlConfig::default()
        }
    }

    #[test]
    fn steering_inside_the_dead_zone_goes_forward() {
        let signal = steer(at_x(320), 640, 50);
        assert_eq!(signal.command(), Command::Forward);
        assert_eq!(signal.to_string(), "FORWARD - Centered");
        // 49 px off is still inside a 50 px dead zone.
        assert_eq!(steer(at_x(369), 640, 50).command(), Command::Forward);
        assert_eq!(steer(at_x(370), 640, 50).command(), Command::TurnRight);
    }

    #[test]
    fn steering_turns_toward_the_target() {
        assert_eq!(
            steer(at_x(400), 640, 50),
            ControlSignal::Steer {
                command: Command::TurnRight,
                magnitude: 80
            }
        );
        assert_eq!(
            steer(at_x(250), 640, 50),
            ControlSignal::Steer {
                command: Command::TurnLeft,
                magnitude: 70
            }
        );
        assert_eq!(steer(at_x(400), 640, 50).to_string(), "TURN RIGHT - Error: 80px");
        assert_eq!(steer(at_x(250), 640, 50).to_string(), "TURN LEFT - Error: 70px");
    }

    #[test]
    fn steering_without_a_target_stops() {
        let signal = steer(None, 640, 50);
        assert!(signal.is_stop());
        assert_eq!(signal.to_string(), "STOP - Lost tracking");
    }

    #[test]
    fn drive_centered_is_zero_speed() {
        let signal = drive(at_y(240), 480, &drive_config());
        assert_eq!(
            signal,
            ControlSignal::Drive {
                command: Command::Centered,
                speed: 0,
                error: 0
            }
        );
    }

    #[test]
    fn drive_small_error_is_lifted_to_the_floor() {
        // error 60 -> factor 0.125 -> round(18.75) = 19 -> floor 50
        let below = drive(at_y(300), 480, &drive_config());
        assert_eq!(
            below,
            ControlSignal::Drive {
                command: Command::Forward,
                speed: 50,
                error: 60
            }
        );
        assert_eq!(below.to_string(), "FORWARD 50 - Object below (Err: +60px)");

        let above = drive(at_y(180), 480, &drive_config());
        assert_eq!(
            above,
            ControlSignal::Drive {
                command: Command::Backward,
                speed: -50,
                error: -60
            }
        );
        assert_eq!(above.to_string(), "BACKWARD 50 - Object above (Err: -60px)");
    }

    #[test]
    fn drive_speed_is_proportional_between_floor_and_ceiling() {
        let config = ControlConfig {
            base_speed: 480,
            ..drive_config()
        };
        // error 200 of 480 -> 200
        assert_eq!(drive(at_y(440), 480, &config).speed(), 200);
        // base 480 capped at 255
        let config = ControlConfig {
            base_speed: 1000,
            ..drive_config()
        };
        assert_eq!(drive(at_y(479), 480, &config).speed(), 255);
        assert_eq!(drive(at_y(0), 480, &config).speed(), -255);
    }

    #[test]
    fn misconfigured_floor_wins_over_ceiling() {
        let config = ControlConfig {
            min_speed: 100,
            max_speed: 80,
            ..drive_config()
        };
        assert_eq!(proportional_speed(240, 480, &config), 100);
    }

    #[test]
    fn drive_without_a_target_stops() {
        let signal = drive(None, 480, &drive_config());
        assert!(signal.is_stop());
        assert_eq!(signal.speed(), 0);
    }

    #[test]
    fn compute_signal_follows_the_configured_axis() {
        let steering = ControlConfig::default();
        assert!(matches!(
            compute_signal(Some(Point::new(400, 0)), 640, 480, &steering),
            ControlSignal::Steer {
                command: Command::TurnRight,
                ..
            }
        ));
        assert_eq!(
            compute_signal(Some(Point::new(0, 300)), 640, 480, &drive_config()).command(),
            Command::Forward
        );
    }

    #[test]
    fn dead_zone_accessors_track_the_axis() {
        let mut config = drive_config();
        config.set_dead_zone(33);
        assert_eq!(config.vertical_dead_zone, 33);
        assert_eq!(config.horizontal_dead_zone, 50);
        assert_eq!(config.dead_zone(), 33);
    }

    #[test]
    fn huge_speed_limits_saturate_instead_of_wrapping() {
        let config = ControlConfig {
            base_speed: u32::MAX,
            max_speed: u32::MAX,
            ..drive_config()
        };
        assert_eq!(proportional_speed(480, 480, &config), i32::MAX);
        let signal = drive(at_y(0), 480, &config);
        assert_eq!(signal.command(), Command::Backward);
        assert!(signal.speed() < 0);
    }
}
