/// Image loading
///
/// Reads the file with tokio and decodes it on a blocking task. The session
/// only starts once this has finished.

use image::DynamicImage;
use std::path::{Path, PathBuf};
use tokio::task;

use crate::error::CounterError;

/// Read and decode an image file
pub async fn load_image(path: PathBuf) -> Result<DynamicImage, CounterError> {
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|source| CounterError::Read {
            path: path.clone(),
            source,
        })?;

    // Decoding is CPU-bound
    task::spawn_blocking(move || decode(&path, &bytes)).await?
}

/// Load an image from synchronous code
pub fn load_image_blocking(path: PathBuf) -> Result<DynamicImage, CounterError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .map_err(CounterError::Runtime)?;

    runtime.block_on(load_image(path))
}

fn decode(path: &Path, bytes: &[u8]) -> Result<DynamicImage, CounterError> {
    let image = image::load_from_memory(bytes).map_err(|source| CounterError::Load {
        path: path.to_path_buf(),
        source,
    })?;

    log::info!(
        "Loaded {} ({}x{}, {:?})",
        path.display(),
        image.width(),
        image.height(),
        image.color()
    );
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Write;

    #[tokio::test]
    async fn test_missing_file_is_a_read_error() {
        let result = load_image(PathBuf::from("/nonexistent/path.png")).await;
        assert!(matches!(result, Err(CounterError::Read { .. })));
    }

    #[tokio::test]
    async fn test_garbage_is_a_load_error() {
        let mut file = tempfile::Builder::new()
            .prefix("circle-counter-")
            .suffix(".png")
            .tempfile()
            .unwrap();
        file.write_all(b"definitely not a png").unwrap();

        let result = load_image(file.path().to_path_buf()).await;

        assert!(matches!(result, Err(CounterError::Load { .. })));
    }

    #[test]
    fn test_blocking_load_decodes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dots.png");
        let mut image = RgbImage::new(40, 30);
        image.put_pixel(5, 5, Rgb([255, 0, 0]));
        image.save_with_format(&path, ImageFormat::Png).unwrap();

        let loaded = load_image_blocking(path).unwrap();

        assert_eq!((loaded.width(), loaded.height()), (40, 30));
        assert_eq!(loaded.to_rgb8().get_pixel(5, 5), &Rgb([255, 0, 0]));
    }
}
