// THEORY:
// The camera is the frame source of the run loop. OpenCV hands out BGR `Mat`s;
// the tracker wants `image::RgbImage`. `Camera::read` does the capture and the
// conversion and keeps the BGR frame around for the preview overlay, which is
// drawn in OpenCV's native layout.
//
// A failed or empty read is terminal for the run.

use anyhow::{bail, Context};
use image::RgbImage;
use opencv::{
    core::Mat,
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture},
};
use tracing::{debug, info};

/// Requested capture format. Drivers may round to what they support.
#[derive(Debug, Clone, Copy)]
pub struct CaptureFormat {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for CaptureFormat {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

pub struct Camera {
    capture: VideoCapture,
    bgr: Mat,
    rgb: Mat,
}

impl Camera {
    pub fn open(index: i32, format: CaptureFormat) -> anyhow::Result<Self> {
        let mut capture = VideoCapture::new(index, videoio::CAP_ANY)
            .with_context(|| format!("opening camera {index}"))?;
        if !capture.is_opened()? {
            bail!("camera {index} could not be opened");
        }

        capture.set(videoio::CAP_PROP_FRAME_WIDTH, f64::from(format.width))?;
        capture.set(videoio::CAP_PROP_FRAME_HEIGHT, f64::from(format.height))?;
        capture.set(videoio::CAP_PROP_FPS, f64::from(format.fps))?;
        // Shorter exposure for less motion blur. Many drivers ignore it.
        if !capture.set(videoio::CAP_PROP_EXPOSURE, -6.0).unwrap_or(false) {
            debug!("camera ignored the exposure hint");
        }

        info!(
            index,
            width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)?,
            height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)?,
            fps = capture.get(videoio::CAP_PROP_FPS)?,
            "camera opened"
        );

        Ok(Self {
            capture,
            bgr: Mat::default(),
            rgb: Mat::default(),
        })
    }

    /// Grabs the next frame and returns it as RGB.
    pub fn read(&mut self) -> anyhow::Result<RgbImage> {
        if !self.capture.read(&mut self.bgr)? || self.bgr.empty() {
            bail!("failed to grab frame");
        }
        imgproc::cvt_color(&self.bgr, &mut self.rgb, imgproc::COLOR_BGR2RGB, 0)?;

        let width = u32::try_from(self.rgb.cols())?;
        let height = u32::try_from(self.rgb.rows())?;
        let bytes = self.rgb.data_bytes()?.to_vec();
        RgbImage::from_raw(width, height, bytes).context("frame buffer does not match its size")
    }

    /// The BGR frame from the last successful `read`.
    pub fn last_bgr(&self) -> &Mat {
        &self.bgr
    }
}
