use anyhow::{Context, Result};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

/// Asynchronously load an image from bytes using spawn_blocking.
///
/// Image decoding is CPU-intensive, especially for large scan pages.
pub async fn load_image_from_memory_async(bytes: &[u8]) -> Result<DynamicImage> {
    let bytes = bytes.to_vec(); // Clone to move into blocking task
    tokio::task::spawn_blocking(move || {
        image::load_from_memory(&bytes).context("failed to load image from memory")
    })
    .await
    .context("failed to spawn blocking task for image loading")?
}

/// Asynchronously encode an image to PNG bytes using spawn_blocking.
///
/// PNG encoding can block the async runtime if done synchronously.
pub async fn encode_png_async(img: DynamicImage) -> Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || {
        let mut png_bytes = Vec::new();
        let mut cursor = Cursor::new(&mut png_bytes);
        img.write_to(&mut cursor, ImageFormat::Png)
            .context("failed to encode image as PNG")?;
        Ok(png_bytes)
    })
    .await
    .context("failed to spawn blocking task for PNG encoding")?
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[tokio::test]
    async fn test_encode_then_load_roundtrip() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            8,
            4,
            Rgba([255, 0, 0, 255]),
        ));

        let png_bytes = encode_png_async(img).await.unwrap();
        assert!(!png_bytes.is_empty());

        let loaded = load_image_from_memory_async(&png_bytes).await.unwrap();
        assert_eq!((loaded.width(), loaded.height()), (8, 4));
    }

    #[tokio::test]
    async fn test_load_rejects_garbage() {
        let result = load_image_from_memory_async(b"definitely not an image").await;
        assert!(result.is_err());
    }
}
