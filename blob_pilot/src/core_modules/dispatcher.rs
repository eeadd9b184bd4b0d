// THEORY:
// The `dispatcher` is the boundary between the tracker and whatever actually
// moves the rover. The transport itself (HTTP to an ESP32, serial, a test
// double) lives behind the `CommandSink` trait and only ever answers "did it
// work": transport errors are the sink's business and never reach the tracking
// state.
//
// Two policies live here:
// 1.  **Rate gate**: commands go out no more often than `interval`. The check is
//     a wall-clock gate (`now - last_dispatch >= interval`), the signal is still
//     computed every frame, and only a successful send moves the gate forward
//     so a failed send is retried on the next frame.
// 2.  **Safe stop**: whatever ends the run (quit key, Ctrl-C, a dead camera, a
//     panic unwinding through the loop) a final stop command is sent, bypassing
//     the gate. `Drop` guarantees it if nobody called `shutdown` explicitly.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::core_modules::controller::{Command, ControlAxis, ControlSignal};

/// Reference interval between two transmitted commands.
pub const DEFAULT_COMMAND_INTERVAL: Duration = Duration::from_millis(300);

/// What gets put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotorCommand {
    /// A discrete direction token.
    Direction(Command),
    /// Per-side motor speeds.
    Speeds { left: i32, right: i32 },
}

impl MotorCommand {
    /// The stop command in the vocabulary of a given axis.
    pub fn stop(axis: ControlAxis) -> Self {
        MotorCommand::from(&ControlSignal::stop(axis))
    }
}

impl From<&ControlSignal> for MotorCommand {
    fn from(signal: &ControlSignal) -> Self {
        match *signal {
            ControlSignal::Steer { command, .. } => MotorCommand::Direction(command),
            // Linear motion: both sides get the same speed.
            ControlSignal::Drive { speed, .. } => MotorCommand::Speeds {
                left: speed,
                right: speed,
            },
        }
    }
}

/// The transport to the motor controller.
pub trait CommandSink {
    /// Sends one command. Returns `false` on any transport failure.
    fn send(&mut self, command: &MotorCommand) -> bool;
}

impl<S: CommandSink + ?Sized> CommandSink for Box<S> {
    fn send(&mut self, command: &MotorCommand) -> bool {
        (**self).send(command)
    }
}

/// A sink that drops everything, for running without hardware.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl CommandSink for NullSink {
    fn send(&mut self, command: &MotorCommand) -> bool {
        debug!(?command, "no motor controller attached");
        true
    }
}

/// Outcome of a single dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent,
    /// Too soon after the previous successful send.
    RateLimited,
    /// The sink reported a failure; the gate was not advanced.
    Failed,
}

/// Rate-limited command dispatcher with a guaranteed stop on shutdown.
pub struct CommandDispatcher<S: CommandSink> {
    sink: S,
    stop_command: MotorCommand,
    last_dispatch: Option<Instant>,
    shut_down: bool,
}

impl<S: CommandSink> CommandDispatcher<S> {
    /// `stop_command` is what `shutdown` (or drop) sends.
    pub fn new(sink: S, stop_command: MotorCommand) -> Self {
        Self {
            sink,
            stop_command,
            last_dispatch: None,
            shut_down: false,
        }
    }

    /// Attempts a rate-limited send at time `now`.
    pub fn dispatch_at(&mut self, command: &MotorCommand, interval: Duration, now: Instant) -> DispatchOutcome {
        if let Some(last) = self.last_dispatch {
            if now.saturating_duration_since(last) < interval {
                return DispatchOutcome::RateLimited;
            }
        }

        if self.sink.send(command) {
            self.last_dispatch = Some(now);
            debug!(?command, "command dispatched");
            DispatchOutcome::Sent
        } else {
            warn!(?command, "motor controller did not accept command");
            DispatchOutcome::Failed
        }
    }

    pub fn dispatch(&mut self, command: &MotorCommand, interval: Duration) -> DispatchOutcome {
        self.dispatch_at(command, interval, Instant::now())
    }

    /// Sends the stop command immediately, ignoring the rate gate. Used for
    /// emergency stops; the dispatcher stays usable afterwards.
    pub fn stop_now(&mut self) -> bool {
        let sent = self.sink.send(&self.stop_command);
        if sent {
            self.last_dispatch = Some(Instant::now());
        } else {
            warn!("stop command was not accepted by the motor controller");
        }
        sent
    }

    /// Sends the final stop and disarms the drop guard.
    pub fn shutdown(&mut self) -> bool {
        if self.shut_down {
            return true;
        }
        self.shut_down = true;
        info!("sending final stop command");
        self.stop_now()
    }

    pub fn last_dispatch(&self) -> Option<Instant> {
        self.last_dispatch
    }
}

impl<S: CommandSink> Drop for CommandDispatcher<S> {
    fn drop(&mut self) {
        if !self.shut_down {
            self.shutdown();
        }
    }
}
