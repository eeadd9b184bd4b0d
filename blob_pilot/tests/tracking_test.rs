use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use blob_pilot::core_modules::blob::{Detection, Point, SizeBounds};
use blob_pilot::core_modules::controller::{ControlAxis, ControlSignal};
use blob_pilot::core_modules::localizer::{BlobLocalizer, LocalizerStrategy};
use blob_pilot::core_modules::mask::Mask;
use blob_pilot::core_modules::tracker::{position_tracker, TrackState};
use blob_pilot::pipeline::{Command, CommandDispatcher, CommandSink, DispatchOutcome, MotorCommand};
use blob_pilot::{TrackerConfig, TrackingPipeline};
use image::{Rgb, RgbImage};

const GREEN_TARGET: Rgb<u8> = Rgb([90, 160, 100]);

fn frame_with_target(x0: u32, y0: u32, side: u32, color: Rgb<u8>) -> RgbImage {
    RgbImage::from_fn(640, 480, |x, y| {
        if x >= x0 && x < x0 + side && y >= y0 && y < y0 + side {
            color
        } else {
            Rgb([20, 20, 25])
        }
    })
}

#[test]
fn test_both_strategies_agree_on_a_clean_square() {
    let mask = Mask::from_fn(320, 240, |x, y| (100..130).contains(&x) && (50..80).contains(&y));
    let inside = SizeBounds::new(899, 901);
    let expected = Some(Detection {
        position: Point::new(114, 64),
        size: 900,
    });

    for strategy in [LocalizerStrategy::LargestContour, LocalizerStrategy::MeanPixel] {
        assert_eq!(strategy.locate(&mask, &inside), expected);
        assert_eq!(strategy.locate(&mask, &SizeBounds::new(900, 5000)), None);
        assert_eq!(strategy.locate(&mask, &SizeBounds::new(10, 900)), None);
        assert_eq!(strategy.locate(&Mask::new(320, 240), &inside), None);
    }
}

#[test]
fn test_tracker_sequence() {
    let d = |x, y| {
        Some(Detection {
            position: Point::new(x, y),
            size: 600,
        })
    };
    let sequence = [d(10, 10), None, None, d(12, 12)];

    let mut state = TrackState::new();
    let resolved: Vec<_> = sequence
        .iter()
        .map(|detection| position_tracker::resolve(detection.as_ref(), &mut state, 3))
        .collect();
    assert_eq!(
        resolved,
        vec![
            Some(Point::new(10, 10)),
            Some(Point::new(10, 10)),
            Some(Point::new(10, 10)),
            Some(Point::new(12, 12)),
        ]
    );

    let mut state = TrackState::new();
    let resolved: Vec<_> = sequence
        .iter()
        .map(|detection| position_tracker::resolve(detection.as_ref(), &mut state, 2))
        .collect();
    assert_eq!(resolved[2], None);
}

#[test]
fn test_drive_pipeline_moves_toward_the_target() {
    let config = TrackerConfig::drive();
    let mut pipeline = TrackingPipeline::new();

    // Target 60 px below the middle row: error 60, floor speed.
    let report = pipeline.process_frame(&frame_with_target(300, 280, 41, GREEN_TARGET), &config);
    assert_eq!(report.detection.map(|d| d.position), Some(Point::new(320, 300)));
    assert_eq!(
        report.signal,
        ControlSignal::Drive {
            command: Command::Forward,
            speed: 50,
            error: 60
        }
    );
    assert_eq!(report.motor_command(), MotorCommand::Speeds { left: 50, right: 50 });

    // Far above center: proportional speed, backwards.
    let report = pipeline.process_frame(&frame_with_target(300, 0, 41, GREEN_TARGET), &config);
    assert_eq!(report.signal.command(), Command::Backward);
    // error = 20 - 240 = -220 -> round(150 * 220 / 480) = 69
    assert_eq!(report.signal.speed(), -69);
}

#[test]
fn test_identical_frames_give_identical_results() {
    let frame = frame_with_target(150, 320, 50, Rgb([0, 40, 255]));
    for config in [TrackerConfig::steering(), TrackerConfig::drive()] {
        let first = TrackingPipeline::new().process_frame(&frame, &config);
        let second = TrackingPipeline::new().process_frame(&frame, &config);
        assert_eq!(first.detection, second.detection);
        assert_eq!(first.signal, second.signal);
        assert_eq!(first.mask, second.mask);
    }
}

#[derive(Clone, Default)]
struct Wire(Rc<RefCell<Vec<MotorCommand>>>);

impl CommandSink for Wire {
    fn send(&mut self, command: &MotorCommand) -> bool {
        self.0.borrow_mut().push(*command);
        true
    }
}

#[test]
fn test_rate_limited_loop_with_final_stop() {
    let wire = Wire::default();
    let config = TrackerConfig::steering();
    let mut pipeline = TrackingPipeline::new();
    let frame = frame_with_target(500, 200, 40, Rgb([0, 0, 255]));

    {
        let mut dispatcher = CommandDispatcher::new(wire.clone(), MotorCommand::stop(ControlAxis::Horizontal));
        let t0 = Instant::now();
        let mut outcomes = Vec::new();
        for ms in [0u64, 100, 200, 350] {
            let report = pipeline.process_frame(&frame, &config);
            outcomes.push(dispatcher.dispatch_at(
                &report.motor_command(),
                Duration::from_millis(300),
                t0 + Duration::from_millis(ms),
            ));
        }
        assert_eq!(
            outcomes,
            vec![
                DispatchOutcome::Sent,
                DispatchOutcome::RateLimited,
                DispatchOutcome::RateLimited,
                DispatchOutcome::Sent,
            ]
        );
        // Dispatcher dropped here, as on an abnormal exit.
    }

    assert_eq!(
        *wire.0.borrow(),
        vec![
            MotorCommand::Direction(Command::TurnRight),
            MotorCommand::Direction(Command::TurnRight),
            MotorCommand::Direction(Command::Stop),
        ]
    );
}
