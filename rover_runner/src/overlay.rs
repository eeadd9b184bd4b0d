// Preview overlay: reference line, dead-zone band, target marker and status
// text drawn over the BGR camera frame.

use blob_pilot::core_modules::controller::{Command, ControlAxis, ControlConfig, ControlSignal};
use blob_pilot::pipeline::FrameReport;
use opencv::{
    core::{Mat, Point, Rect, Scalar},
    imgproc,
    prelude::*,
};

const WHITE: (f64, f64, f64) = (255.0, 255.0, 255.0);
const GREY: (f64, f64, f64) = (200.0, 200.0, 200.0);
const RED: (f64, f64, f64) = (0.0, 0.0, 255.0);
const GREEN: (f64, f64, f64) = (0.0, 255.0, 0.0);
const YELLOW: (f64, f64, f64) = (0.0, 255.0, 255.0);

fn bgr((b, g, r): (f64, f64, f64)) -> Scalar {
    Scalar::new(b, g, r, 0.0)
}

fn text(frame: &mut Mat, label: &str, origin: Point, scale: f64, color: (f64, f64, f64)) -> opencv::Result<()> {
    imgproc::put_text(
        frame,
        label,
        origin,
        imgproc::FONT_HERSHEY_SIMPLEX,
        scale,
        bgr(color),
        2,
        imgproc::LINE_8,
        false,
    )
}

/// Draws everything the report knows about onto `frame`.
pub fn draw(frame: &mut Mat, report: &FrameReport, control: &ControlConfig) -> opencv::Result<()> {
    let width = frame.cols();
    let height = frame.rows();
    let center = Point::new(width / 2, height / 2);
    let dead_zone = i32::try_from(control.dead_zone()).unwrap_or(i32::MAX / 4);

    match control.axis {
        ControlAxis::Horizontal => {
            imgproc::line(frame, Point::new(center.x, 0), Point::new(center.x, height), bgr(WHITE), 2, imgproc::LINE_8, 0)?;
            let band = Rect::new(center.x - dead_zone, 0, dead_zone * 2, height);
            imgproc::rectangle(frame, band, bgr(GREY), 1, imgproc::LINE_8, 0)?;
        }
        ControlAxis::Vertical => {
            imgproc::line(frame, Point::new(0, center.y), Point::new(width, center.y), bgr(WHITE), 2, imgproc::LINE_8, 0)?;
            let band = Rect::new(0, center.y - dead_zone, width, dead_zone * 2);
            imgproc::rectangle(frame, band, bgr(GREY), 1, imgproc::LINE_8, 0)?;
        }
    }

    if let Some(position) = report.position {
        let target = Point::new(position.x as i32, position.y as i32);
        imgproc::circle(frame, target, 10, bgr(RED), -1, imgproc::LINE_8, 0)?;
        imgproc::circle(frame, target, 15, bgr(RED), 2, imgproc::LINE_8, 0)?;

        let foot = match control.axis {
            ControlAxis::Horizontal => Point::new(center.x, target.y),
            ControlAxis::Vertical => Point::new(target.x, center.y),
        };
        imgproc::line(frame, target, foot, bgr(YELLOW), 2, imgproc::LINE_8, 0)?;

        let pixels = if report.is_coasting() {
            "Pixels: - (last known position)".to_string()
        } else {
            format!("Pixels: {}", report.area())
        };
        text(frame, &pixels, Point::new(10, 30), 0.7, RED)?;
        text(frame, &format!("Position: ({}, {})", position.x, position.y), Point::new(10, 60), 0.7, RED)?;
        let detail = match report.signal {
            ControlSignal::Steer { magnitude, .. } => format!("Error: {magnitude}px"),
            ControlSignal::Drive { speed, .. } => format!("Motor Speed: {speed}"),
        };
        text(frame, &detail, Point::new(10, 90), 0.7, GREEN)?;
    }

    text(frame, &report.signal.to_string(), Point::new(10, height - 20), 0.8, YELLOW)?;

    let (x, y) = (width - 50, height - 50);
    let arrow = match report.signal.command() {
        Command::Forward => Some((Point::new(x, y), Point::new(x, y - 50), GREEN)),
        Command::Backward => Some((Point::new(x, y - 50), Point::new(x, y), RED)),
        Command::TurnLeft => Some((Point::new(x, y), Point::new(x - 50, y), GREEN)),
        Command::TurnRight => Some((Point::new(x - 50, y), Point::new(x, y), GREEN)),
        Command::Stop | Command::Centered => None,
    };
    if let Some((from, to, color)) = arrow {
        imgproc::arrowed_line(frame, from, to, bgr(color), 3, imgproc::LINE_8, 0, 0.3)?;
    }

    Ok(())
}
