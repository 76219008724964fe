//! Per-frame signals and their aggregates.

use opencv::core::{self, Mat, Scalar, Vector};
use opencv::imgproc;
use opencv::prelude::*;

use crate::error::MediaResult;

/// Aggregates over the sampled frames (population statistics).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeuristicFeatures {
    pub sharpness_mean: f64,
    pub sharpness_std: f64,
    pub sharpness_min: f64,
    pub sharpness_max: f64,
    pub motion_mean: f64,
    pub motion_std: f64,
    pub colour_mean: f64,
    pub colour_std: f64,
}

/// Population mean and standard deviation; `(0, 0)` for no samples.
pub(crate) fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// Raw signal samples collected while walking the video.
#[derive(Debug, Default)]
pub struct SignalSamples {
    pub sharpness: Vec<f64>,
    pub motion: Vec<f64>,
    pub colour: Vec<f64>,
    prev_gray: Option<Mat>,
}

impl SignalSamples {
    pub fn new() -> Self {
        Self::default()
    }

    /// Measure one sampled BGR frame.
    pub fn push_frame(&mut self, frame: &Mat) -> MediaResult<()> {
        let mut gray = Mat::default();
        imgproc::cvt_color(
            frame,
            &mut gray,
            imgproc::COLOR_BGR2GRAY,
            0,
            core::AlgorithmHint::ALGO_HINT_DEFAULT,
        )?;

        self.sharpness.push(laplacian_variance(&gray)?);

        if let Some(prev) = &self.prev_gray {
            self.motion.push(mean_abs_diff(&gray, prev)?);
        }

        self.colour.push(hue_std(frame)?);
        self.prev_gray = Some(gray);
        Ok(())
    }

    /// Aggregate the samples, or `None` when there is not enough to score
    /// (no sharpness sample, or fewer than two frames for motion).
    pub fn features(&self) -> Option<HeuristicFeatures> {
        if self.sharpness.is_empty() || self.motion.is_empty() {
            return None;
        }
        let (sharpness_mean, sharpness_std) = mean_std(&self.sharpness);
        let (motion_mean, motion_std) = mean_std(&self.motion);
        let (colour_mean, colour_std) = mean_std(&self.colour);
        let sharpness_min = self.sharpness.iter().copied().fold(f64::INFINITY, f64::min);
        let sharpness_max = self.sharpness.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Some(HeuristicFeatures {
            sharpness_mean,
            sharpness_std,
            sharpness_min,
            sharpness_max,
            motion_mean,
            motion_std,
            colour_mean,
            colour_std,
        })
    }
}

/// Variance of the Laplacian (aperture 1) of a grayscale image.
pub fn laplacian_variance(gray: &Mat) -> MediaResult<f64> {
    let mut laplacian = Mat::default();
    imgproc::laplacian(gray, &mut laplacian, core::CV_64F, 1, 1.0, 0.0, core::BORDER_DEFAULT)?;

    let mut mean = Scalar::default();
    let mut stddev = Scalar::default();
    core::mean_std_dev(&laplacian, &mut mean, &mut stddev, &Mat::default())?;
    Ok(stddev[0] * stddev[0])
}

/// Mean absolute difference of two grayscale images.
pub fn mean_abs_diff(a: &Mat, b: &Mat) -> MediaResult<f64> {
    let mut diff = Mat::default();
    core::absdiff(a, b, &mut diff)?;
    let m = core::mean(&diff, &Mat::default())?;
    Ok(m[0])
}

/// Standard deviation of the HSV hue channel of a BGR image.
pub fn hue_std(frame: &Mat) -> MediaResult<f64> {
    let mut hsv = Mat::default();
    imgproc::cvt_color(
        frame,
        &mut hsv,
        imgproc::COLOR_BGR2HSV,
        0,
        core::AlgorithmHint::ALGO_HINT_DEFAULT,
    )?;

    let mut channels = Vector::<Mat>::new();
    core::split(&hsv, &mut channels)?;
    let hue = channels.get(0)?;

    let mut mean = Scalar::default();
    let mut stddev = Scalar::default();
    core::mean_std_dev(&hue, &mut mean, &mut stddev, &Mat::default())?;
    Ok(stddev[0])
}
