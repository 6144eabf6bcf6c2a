use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbaImage};
use thiserror::Error;

use crate::atomic_io::write_bytes_atomic;

const CAPTURE_FILE_PREFIX: &str = "lattice_";
const MAX_CAPTURE_SEQUENCE: u32 = 9999;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("frame buffer holds {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("failed to encode png: {0}")]
    Encode(#[source] image::ImageError),
    #[error("failed to write capture '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no free capture file name left in {0}")]
    Exhausted(PathBuf),
}

/// Encodes an RGBA8 frame as PNG and writes it atomically to `path`.
pub fn write_frame_png(
    path: &Path,
    width: u32,
    height: u32,
    rgba: &[u8],
) -> Result<(), CaptureError> {
    let expected = width as usize * height as usize * 4;
    let image = RgbaImage::from_raw(width, height, rgba.to_vec()).ok_or(
        CaptureError::SizeMismatch {
            width,
            height,
            expected,
            actual: rgba.len(),
        },
    )?;

    let mut encoded = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut encoded), ImageFormat::Png)
        .map_err(CaptureError::Encode)?;
    write_bytes_atomic(path, &encoded).map_err(|source| CaptureError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// First unused `lattice_NNNN.png` in `dir`.
pub(crate) fn next_capture_path(dir: &Path) -> Result<PathBuf, CaptureError> {
    (1..=MAX_CAPTURE_SEQUENCE)
        .map(|sequence| dir.join(format!("{CAPTURE_FILE_PREFIX}{sequence:04}.png")))
        .find(|candidate| !candidate.exists())
        .ok_or_else(|| CaptureError::Exhausted(dir.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn written_png_decodes_to_same_pixels() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("frame.png");
        let rgba = [
            255, 0, 0, 255, 0, 255, 0, 255, //
            0, 0, 255, 255, 128, 132, 140, 255,
        ];

        write_frame_png(&path, 2, 2, &rgba).expect("write png");

        let decoded = image::open(&path).expect("decode png").to_rgba8();
        assert_eq!(decoded.dimensions(), (2, 2));
        assert_eq!(decoded.as_raw().as_slice(), &rgba);
    }

    #[test]
    fn short_buffer_is_rejected_without_writing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("frame.png");

        let error = write_frame_png(&path, 4, 4, &[0; 12]).expect_err("size mismatch");

        assert!(matches!(
            error,
            CaptureError::SizeMismatch {
                expected: 64,
                actual: 12,
                ..
            }
        ));
        assert!(!path.exists());
    }

    #[test]
    fn capture_paths_skip_existing_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = next_capture_path(dir.path()).expect("first");
        assert!(first.ends_with("lattice_0001.png"));

        std::fs::write(&first, b"taken").expect("occupy");
        let second = next_capture_path(dir.path()).expect("second");
        assert!(second.ends_with("lattice_0002.png"));
    }
}
