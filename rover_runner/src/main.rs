// THEORY:
// `rover_runner` is the loop that closes the circuit between the camera and the
// wheels. Per frame it:
//
//     1. picks up settings-file edits (live tuning),
//     2. grabs a frame, runs the tracking pipeline on it,
//     3. offers the resulting command to the rate-limited dispatcher,
//     4. optionally draws the preview and handles its keys.
//
// The loop itself is synchronous and runs on tokio's blocking pool; the async
// side only waits for Ctrl-C and raises a flag the loop checks every frame.
// However the loop ends, the dispatcher sends one last stop before the process
// exits.

mod camera;
mod esp32;
mod overlay;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use blob_pilot::core_modules::dispatcher::NullSink;
use blob_pilot::core_modules::localizer::LocalizerStrategy;
use blob_pilot::core_modules::presets;
use blob_pilot::pipeline::{Command, CommandDispatcher, CommandSink, MotorCommand};
use blob_pilot::settings::SETTINGS_FILE;
use blob_pilot::{Settings, SettingsWatcher, TrackerConfig, TrackingPipeline};
use clap::{Parser, ValueEnum};
use opencv::highgui;
use tracing::{info, warn};

use camera::{Camera, CaptureFormat};
use esp32::{Esp32Sink, DEFAULT_ESP32_ADDR};

const WINDOW: &str = "Blob Tracker";
const FPS_LOG_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "rover_runner")]
#[command(about = "Follow a colored blob with a camera and drive an ESP32 rover toward it")]
#[command(version)]
struct Cli {
    /// Rover build: discrete steering or continuous forward/backward drive.
    #[arg(long, value_enum, default_value_t = Mode::Steer)]
    mode: Mode,

    /// Override the localizer the mode would pick.
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Named color range (orange, red, blue, green, yellow).
    #[arg(long)]
    preset: Option<String>,

    /// Settings file, loaded at start and re-read whenever it changes.
    #[arg(long, default_value = SETTINGS_FILE)]
    settings: PathBuf,

    /// Camera index.
    #[arg(long, default_value_t = 0)]
    camera: i32,

    /// Motor controller address, `ip` or `ip:port`.
    #[arg(long, default_value = DEFAULT_ESP32_ADDR)]
    esp32: String,

    /// Track without sending anything to the motors.
    #[arg(long)]
    no_motors: bool,

    /// Show the annotated camera feed (q quits, space stops, s saves settings).
    #[arg(long)]
    preview: bool,

    #[arg(long, default_value_t = 640)]
    width: u32,

    #[arg(long, default_value_t = 480)]
    height: u32,

    #[arg(long, default_value_t = 30)]
    fps: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Steer,
    Drive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StrategyArg {
    Contour,
    Mean,
}

impl StrategyArg {
    fn to_core(self) -> LocalizerStrategy {
        match self {
            Self::Contour => LocalizerStrategy::LargestContour,
            Self::Mean => LocalizerStrategy::MeanPixel,
        }
    }
}

impl Cli {
    /// Mode defaults, then the settings file, then command-line overrides.
    fn tracker_config(&self, watcher: &mut SettingsWatcher) -> anyhow::Result<TrackerConfig> {
        let mut config = match self.mode {
            Mode::Steer => TrackerConfig::steering(),
            Mode::Drive => TrackerConfig::drive(),
        };
        if !watcher.poll(&mut config) {
            info!(path = %watcher.path().display(), "no usable settings file, using mode defaults");
        }
        if let Some(strategy) = self.strategy {
            config.strategy = strategy.to_core();
        }
        if let Some(name) = &self.preset {
            let preset = presets::preset(name)?;
            info!(preset = preset.name, description = preset.description, "using color preset");
            config.color_range = preset.range;
        }
        Ok(config)
    }

    fn capture_format(&self) -> CaptureFormat {
        CaptureFormat {
            width: self.width,
            height: self.height,
            fps: self.fps,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Key {
    Quit,
    EmergencyStop,
    Save,
}

impl Key {
    fn from_code(code: i32) -> Option<Self> {
        match u8::try_from(code & 0xFF).ok()? {
            b'q' => Some(Key::Quit),
            b' ' => Some(Key::EmergencyStop),
            b's' => Some(Key::Save),
            _ => None,
        }
    }
}

/// Frames per second over a rolling window.
struct FpsMeter {
    since: Instant,
    frames: u32,
}

impl FpsMeter {
    fn new(now: Instant) -> Self {
        Self { since: now, frames: 0 }
    }

    fn tick(&mut self, now: Instant) -> Option<f64> {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.since);
        if elapsed < FPS_LOG_INTERVAL {
            return None;
        }
        let fps = f64::from(self.frames) / elapsed.as_secs_f64();
        *self = Self::new(now);
        Some(fps)
    }
}

struct Runner {
    config: TrackerConfig,
    watcher: SettingsWatcher,
    camera: Camera,
    pipeline: TrackingPipeline,
    preview: bool,
    interrupted: Arc<AtomicBool>,
}

impl Runner {
    fn track<S: CommandSink>(&mut self, dispatcher: &mut CommandDispatcher<S>) -> anyhow::Result<()> {
        let mut fps = FpsMeter::new(Instant::now());
        let mut last_command: Option<Command> = None;

        while !self.interrupted.load(Ordering::SeqCst) {
            self.watcher.poll(&mut self.config);

            let frame = self.camera.read()?;
            let report = self.pipeline.process_frame(&frame, &self.config);

            let command = report.signal.command();
            if last_command != Some(command) {
                info!(%command, signal = %report.signal, "command changed");
                last_command = Some(command);
            }
            dispatcher.dispatch(&report.motor_command(), self.config.command_interval);

            if let Some(rate) = fps.tick(Instant::now()) {
                info!(fps = rate, frame = report.frame_index, "tracking");
            }

            if !self.preview {
                continue;
            }
            let mut view = self.camera.last_bgr().try_clone()?;
            overlay::draw(&mut view, &report, &self.config.control)?;
            highgui::imshow(WINDOW, &view)?;
            match Key::from_code(highgui::wait_key(1)?) {
                Some(Key::Quit) => {
                    info!("quit requested");
                    return Ok(());
                }
                Some(Key::EmergencyStop) => {
                    warn!("emergency stop");
                    dispatcher.stop_now();
                }
                Some(Key::Save) => {
                    if let Err(error) = Settings::from_config(&self.config).save(self.watcher.path()) {
                        warn!(%error, "could not save settings");
                    }
                }
                None => {}
            }
        }

        info!("interrupted");
        Ok(())
    }
}

fn run(cli: Cli, interrupted: Arc<AtomicBool>) -> anyhow::Result<()> {
    let mut watcher = SettingsWatcher::new(&cli.settings);
    let config = cli.tracker_config(&mut watcher)?;
    info!(mode = ?cli.mode, strategy = ?config.strategy, range = ?config.color_range, "tracker configured");

    let camera = Camera::open(cli.camera, cli.capture_format())?;

    let sink: Box<dyn CommandSink> = if cli.no_motors {
        info!("motors disabled");
        Box::new(NullSink)
    } else {
        let esp32 = Esp32Sink::new(&cli.esp32);
        esp32.test_connection();
        Box::new(esp32)
    };
    let mut dispatcher = CommandDispatcher::new(sink, MotorCommand::stop(config.control.axis));

    if cli.preview {
        highgui::named_window(WINDOW, highgui::WINDOW_AUTOSIZE).context("opening preview window")?;
    }

    let mut runner = Runner {
        config,
        watcher,
        camera,
        pipeline: TrackingPipeline::new(),
        preview: cli.preview,
        interrupted,
    };
    let result = runner.track(&mut dispatcher);
    dispatcher.shutdown();

    if cli.preview {
        if let Err(error) = highgui::destroy_all_windows() {
            warn!(%error, "could not close preview window");
        }
    }
    info!(frames = runner.pipeline.frame_count(), "shutdown complete");
    result
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = interrupted.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received, stopping motors");
            flag.store(true, Ordering::SeqCst);
        }
    });

    tokio::task::spawn_blocking(move || run(cli, interrupted)).await?
}
