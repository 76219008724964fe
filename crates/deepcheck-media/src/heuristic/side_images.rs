//! Display images written alongside a heuristic verdict.

use std::path::Path;

use opencv::core::{self, Mat, Rect, Scalar, Size, Vector};
use opencv::imgcodecs;
use opencv::imgproc;
use opencv::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{MediaError, MediaResult};

/// Height of the display copy of each sampled frame.
pub const DISPLAY_HEIGHT: i32 = 400;

/// Maximum side of the centre crop.
pub const CROP_SIZE: i32 = 180;

/// Border width around the centre crop.
pub const BORDER: i32 = 5;

const JPEG_QUALITY: i32 = 95;

/// Relative paths of the images written for one analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideImages {
    /// Resized sampled frames
    pub frames: Vec<String>,
    /// Bordered centre crops
    pub faces: Vec<String>,
}

impl SideImages {
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty() && self.faces.is_empty()
    }
}

/// Resize to `DISPLAY_HEIGHT`, keeping the aspect ratio (width rounded down).
pub fn display_copy(frame: &Mat) -> MediaResult<Mat> {
    let (w, h) = (frame.cols(), frame.rows());
    if w <= 0 || h <= 0 {
        return Err(MediaError::invalid_input("empty frame"));
    }
    let width = ((DISPLAY_HEIGHT as f64 * w as f64 / h as f64) as i32).max(1);

    let mut out = Mat::default();
    imgproc::resize(
        frame,
        &mut out,
        Size::new(width, DISPLAY_HEIGHT),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )?;
    Ok(out)
}

/// Centre square of side `min(CROP_SIZE, h, w)` with a green border.
pub fn bordered_centre_crop(display: &Mat) -> MediaResult<Mat> {
    let (w, h) = (display.cols(), display.rows());
    let side = CROP_SIZE.min(h).min(w);
    let x = ((w - side) / 2).max(0);
    let y = ((h - side) / 2).max(0);

    let crop = Mat::roi(display, Rect::new(x, y, side, side))?;
    let mut bordered = Mat::default();
    core::copy_make_border(
        &crop,
        &mut bordered,
        BORDER,
        BORDER,
        BORDER,
        BORDER,
        core::BORDER_CONSTANT,
        Scalar::new(0.0, 255.0, 0.0, 0.0),
    )?;
    Ok(bordered)
}

fn write_jpeg(path: &Path, image: &Mat) -> MediaResult<()> {
    let params = Vector::<i32>::from_slice(&[imgcodecs::IMWRITE_JPEG_QUALITY, JPEG_QUALITY]);
    let path_str = path.to_string_lossy();
    let written = imgcodecs::imwrite(&path_str, image, &params)?;
    if !written {
        return Err(MediaError::internal(format!(
            "failed to write image {}",
            path.display()
        )));
    }
    Ok(())
}

/// Write the display copy and the bordered crop for sample `index`.
///
/// Returns the relative paths (`<url_prefix>/demo_frame_NN.jpg`,
/// `<url_prefix>/demo_face_NN.jpg`).
pub fn write_side_images(
    frame: &Mat,
    index: usize,
    out_dir: &Path,
    url_prefix: &str,
) -> MediaResult<(String, String)> {
    let display = display_copy(frame)?;
    let frame_name = format!("demo_frame_{index:02}.jpg");
    write_jpeg(&out_dir.join(&frame_name), &display)?;

    let crop = bordered_centre_crop(&display)?;
    let face_name = format!("demo_face_{index:02}.jpg");
    write_jpeg(&out_dir.join(&face_name), &crop)?;

    let prefix = url_prefix.trim_end_matches('/');
    Ok((
        format!("{prefix}/{frame_name}"),
        format!("{prefix}/{face_name}"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::CV_8UC3;

    fn frame(w: i32, h: i32) -> Mat {
        Mat::new_rows_cols_with_default(h, w, CV_8UC3, Scalar::all(60.0)).unwrap()
    }

    #[test]
    fn test_display_copy_keeps_aspect() {
        let out = display_copy(&frame(640, 480)).unwrap();
        assert_eq!((out.cols(), out.rows()), (533, 400));
    }

    #[test]
    fn test_crop_has_border() {
        let display = display_copy(&frame(320, 240)).unwrap();
        let crop = bordered_centre_crop(&display).unwrap();
        assert_eq!((crop.cols(), crop.rows()), (190, 190));

        let corner = crop.at_2d::<core::Vec3b>(0, 0).unwrap();
        assert_eq!((corner[0], corner[1], corner[2]), (0, 255, 0));
    }

    #[test]
    fn test_narrow_frame_crop_is_limited_by_width() {
        // 40x400 stays 40 wide at height 400
        let display = display_copy(&frame(40, 400)).unwrap();
        let crop = bordered_centre_crop(&display).unwrap();
        assert_eq!((crop.cols(), crop.rows()), (50, 50));
    }

    #[test]
    fn test_write_side_images() {
        let dir = tempfile::TempDir::new().unwrap();
        let (f, c) = write_side_images(&frame(64, 48), 3, dir.path(), "images/demo/").unwrap();
        assert_eq!(f, "images/demo/demo_frame_03.jpg");
        assert_eq!(c, "images/demo/demo_face_03.jpg");
        assert!(dir.path().join("demo_frame_03.jpg").is_file());
        assert!(dir.path().join("demo_face_03.jpg").is_file());
    }
}
