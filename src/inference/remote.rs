// HTTP client for the transformer service (detection + OCR + translation).
//
// The service location comes from configuration; the client itself is
// built lazily on first use and memoized, so a misconfigured client
// surfaces as an error on the first call instead of a startup panic or
// a silent pass-through fallback.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

use crate::core::config::TransformerConfig;
use crate::core::types::{NormalizedBox, PixelBox};
use crate::inference::{clamp_region, map_boxes, RegionTransformer};
use crate::utils::image_ops::encode_png_async;

pub struct RemoteTransformer {
    base_url: String,
    timeout: Duration,
    client: OnceCell<reqwest::Client>,
}

#[derive(Serialize)]
struct DetectRequest<'a> {
    image_base64: &'a str,
}

#[derive(Deserialize)]
struct DetectResponse {
    boxes: Vec<NormalizedBox>,
}

#[derive(Serialize)]
struct TranslateRequest<'a> {
    image_base64: &'a str,
    regions: &'a [PixelBox],
}

#[derive(Deserialize)]
struct TranslateResponse {
    translations: Vec<RegionTranslation>,
}

#[derive(Deserialize)]
struct RegionTranslation {
    region: PixelBox,
    text: String,
}

impl RemoteTransformer {
    pub fn new(config: &TransformerConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_seconds),
            client: OnceCell::new(),
        }
    }

    async fn client(&self) -> Result<&reqwest::Client> {
        self.client
            .get_or_try_init(|| async {
                reqwest::Client::builder()
                    .timeout(self.timeout)
                    .connect_timeout(Duration::from_secs(10))
                    .build()
                    .context("failed to build transformer HTTP client")
            })
            .await
    }

    async fn encode_image(&self, image: &DynamicImage) -> Result<String> {
        let png = encode_png_async(image.clone()).await?;
        Ok(general_purpose::STANDARD.encode(png))
    }
}

#[async_trait]
impl RegionTransformer for RemoteTransformer {
    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    async fn detect_regions(&self, image: &DynamicImage) -> Result<Vec<NormalizedBox>> {
        let client = self.client().await?;
        let image_base64 = self.encode_image(image).await?;

        let response = client
            .post(format!("{}/detect", self.base_url))
            .json(&DetectRequest {
                image_base64: &image_base64,
            })
            .send()
            .await
            .context("detection request failed")?
            .error_for_status()
            .context("detection service returned an error status")?
            .json::<DetectResponse>()
            .await
            .context("invalid detection response")?;

        debug!("detected {} raw boxes", response.boxes.len());
        Ok(response.boxes)
    }

    #[instrument(skip(self, image, boxes), fields(box_count = boxes.len()))]
    async fn extract_and_translate(
        &self,
        image: &DynamicImage,
        boxes: &[NormalizedBox],
    ) -> Result<Vec<(PixelBox, String)>> {
        // Degenerate boxes are dropped here, before the service sees them
        let regions = map_boxes(boxes, image.width(), image.height());
        if regions.is_empty() {
            return Ok(Vec::new());
        }

        let client = self.client().await?;
        let image_base64 = self.encode_image(image).await?;

        let response = client
            .post(format!("{}/translate", self.base_url))
            .json(&TranslateRequest {
                image_base64: &image_base64,
                regions: &regions,
            })
            .send()
            .await
            .context("translation request failed")?
            .error_for_status()
            .context("translation service returned an error status")?
            .json::<TranslateResponse>()
            .await
            .context("invalid translation response")?;

        // The service response is untrusted: drop inverted or
        // out-of-image regions instead of forwarding them downstream
        Ok(response
            .translations
            .into_iter()
            .filter_map(|t| {
                clamp_region(&t.region, image.width(), image.height())
                    .map(|region| (region, t.text))
            })
            .collect())
    }
}
