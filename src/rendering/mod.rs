// Region re-rendering: blank each detected region and draw its
// translated text, wrapped and centered, into the original bounds.
//
// Text shaping uses cosmic-text with fonts loaded from the configured
// directory only (no system font scan).

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use cosmic_text::{
    Align, Attrs, Buffer, Color as CosmicColor, Family, FontSystem, Metrics as TextMetrics,
    Shaping, SwashCache, Wrap,
};
use image::{DynamicImage, Rgba, RgbaImage};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::core::types::PixelBox;
use crate::utils::image_ops::encode_png_async;

pub struct TextRenderer {
    font_system: Arc<Mutex<FontSystem>>,
    swash_cache: Arc<Mutex<SwashCache>>,
    font_size: f32,
    // Shaping with an empty font database panics inside cosmic-text;
    // with no usable faces we blank regions and draw nothing.
    has_fonts: bool,
}

impl TextRenderer {
    /// Create a renderer with fonts from `font_dir`.
    ///
    /// Loads every readable font file in the directory. When none load,
    /// rendering still proceeds: regions are blanked, no glyphs are drawn.
    pub fn new(font_dir: &Path, font_size: f32) -> Self {
        use cosmic_text::fontdb;

        let mut db = fontdb::Database::new();

        match std::fs::read_dir(font_dir) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if !path.is_file() {
                        continue;
                    }
                    match std::fs::read(&path) {
                        Ok(font_data) => {
                            db.load_font_data(font_data);
                            debug!("loaded font file {}", path.display());
                        }
                        Err(e) => warn!("could not read font file {}: {e}", path.display()),
                    }
                }
            }
            Err(e) => warn!("could not read font directory {}: {e}", font_dir.display()),
        }

        // Count faces, not files: an unparseable file adds nothing to the db
        let face_count = db.len();
        if face_count == 0 {
            warn!(
                "no usable fonts in {}; translated text will not be drawn",
                font_dir.display()
            );
        } else {
            info!("renderer ready with {face_count} font face(s)");
        }

        let font_system = FontSystem::new_with_locale_and_db("en-US".to_string(), db);

        Self {
            font_system: Arc::new(Mutex::new(font_system)),
            swash_cache: Arc::new(Mutex::new(SwashCache::new())),
            font_size,
            has_fonts: face_count > 0,
        }
    }

    /// Blank every region and overlay its translated text, then encode
    /// the page to PNG bytes.
    ///
    /// A region with empty text is blanked but receives no overlay.
    pub async fn render_page(
        &self,
        image: DynamicImage,
        translations: &[(PixelBox, String)],
    ) -> Result<Vec<u8>> {
        let mut canvas = image.to_rgba8();

        for (region, text) in translations {
            // A collaborator may hand back an inverted or empty region;
            // drop it instead of underflowing the extent math.
            if region.right <= region.left || region.bottom <= region.top {
                debug!("skipping degenerate region {region:?}");
                continue;
            }
            Self::fill_white(&mut canvas, region);
            if self.has_fonts && !text.trim().is_empty() {
                self.draw_region_text(&mut canvas, region, text).await;
            }
        }

        encode_png_async(DynamicImage::ImageRgba8(canvas)).await
    }

    fn fill_white(canvas: &mut RgbaImage, region: &PixelBox) {
        let right = region.right.min(canvas.width());
        let bottom = region.bottom.min(canvas.height());

        for y in region.top..bottom {
            for x in region.left..right {
                canvas.put_pixel(x, y, Rgba([255, 255, 255, 255]));
            }
        }
    }

    async fn draw_region_text(&self, canvas: &mut RgbaImage, region: &PixelBox, text: &str) {
        let max_width = region.width() as f32;
        let max_height = region.height() as f32;
        let line_height = (self.font_size * 1.4).max(self.font_size * 1.2);

        // Shape under the font-system lock, releasing it before drawing
        let buffer = {
            let mut font_system = self.font_system.lock().await;

            let metrics = TextMetrics::new(self.font_size, line_height);
            let mut buffer = Buffer::new(&mut font_system, metrics);
            buffer.set_size(&mut font_system, Some(max_width), Some(max_height));
            buffer.set_wrap(&mut font_system, Wrap::Word);

            let attrs = Attrs::new().family(Family::SansSerif);
            buffer.set_text(&mut font_system, text, &attrs, Shaping::Advanced);

            for line in &mut buffer.lines {
                line.set_align(Some(Align::Center));
            }

            buffer.shape_until_scroll(&mut font_system, false);
            buffer
        };

        // Center the shaped block vertically inside the region
        let line_count = buffer.layout_runs().count();
        let text_height = line_count as f32 * line_height;
        let y_offset = ((max_height - text_height) / 2.0).max(0.0) as i32;

        let origin_x = region.left as i32;
        let origin_y = region.top as i32 + y_offset;
        let color = CosmicColor::rgba(0, 0, 0, 255);

        let mut font_system = self.font_system.lock().await;
        let mut swash_cache = self.swash_cache.lock().await;

        let (min_x, min_y) = (region.left as i32, region.top as i32);
        let (max_x, max_y) = (region.right as i32, region.bottom as i32);

        buffer.draw(
            &mut font_system,
            &mut swash_cache,
            color,
            |px_x, px_y, _w, _h, pixel_color| {
                let img_x = origin_x + px_x;
                let img_y = origin_y + px_y;

                let within_canvas = img_x >= 0
                    && img_x < canvas.width() as i32
                    && img_y >= 0
                    && img_y < canvas.height() as i32;
                let within_region =
                    img_x >= min_x && img_x < max_x && img_y >= min_y && img_y < max_y;

                if within_canvas && within_region {
                    let existing = canvas.get_pixel(img_x as u32, img_y as u32);

                    // Alpha blend the glyph pixel over the blanked region
                    let alpha = pixel_color.a() as f32 / 255.0;
                    let inv_alpha = 1.0 - alpha;

                    let blended = Rgba([
                        ((pixel_color.r() as f32 * alpha) + (existing[0] as f32 * inv_alpha)) as u8,
                        ((pixel_color.g() as f32 * alpha) + (existing[1] as f32 * inv_alpha)) as u8,
                        ((pixel_color.b() as f32 * alpha) + (existing[2] as f32 * inv_alpha)) as u8,
                        existing[3].max(pixel_color.a()),
                    ]);

                    canvas.put_pixel(img_x as u32, img_y as u32, blended);
                }
            },
        );
    }
}
