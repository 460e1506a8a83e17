//! 版面检测客户端
//!
//! 将页面图片 POST 到 `{layout_api_base_url}/detect`，响应格式：
//!
//! ```json
//! { "figures": [ { "left": 0.1, "top": 0.2, "width": 0.3, "height": 0.25 } ] }
//! ```
//!
//! 坐标为相对页面的归一化值。过小的区域（页眉图标、装饰线等）在这里丢弃，保持检测顺序。

use super::LayoutDetector;
use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::models::BoundingBox;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct DetectResponse {
    #[serde(default)]
    figures: Vec<BoundingBox>,
}

/// HTTP 版面检测客户端
pub struct HttpLayoutDetector {
    http: reqwest::Client,
    base_url: String,
    min_width: f64,
    min_height: f64,
}

impl HttpLayoutDetector {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.layout_api_base_url.trim_end_matches('/').to_string(),
            min_width: config.min_figure_width,
            min_height: config.min_figure_height,
        }
    }

    /// 丢弃过小的区域
    fn validate(&self, figures: Vec<BoundingBox>) -> Vec<BoundingBox> {
        figures
            .into_iter()
            .filter(|bbox| bbox.is_at_least(self.min_width, self.min_height))
            .collect()
    }
}

#[async_trait]
impl LayoutDetector for HttpLayoutDetector {
    async fn detect_figures(&self, image_path: &Path) -> Result<Vec<BoundingBox>> {
        let layout_error = |reason: String| PipelineError::LayoutDetection {
            path: image_path.display().to_string(),
            reason,
        };

        let bytes = tokio::fs::read(image_path).await?;
        let response = self
            .http
            .post(format!("{}/detect", self.base_url))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await
            .map_err(|e| layout_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(layout_error(format!("HTTP {}", response.status())));
        }

        let detected: DetectResponse = response
            .json()
            .await
            .map_err(|e| layout_error(e.to_string()))?;

        let total = detected.figures.len();
        let figures = self.validate(detected.figures);
        debug!(
            "版面检测 {}: {} 个区域，校验后保留 {} 个",
            image_path.display(),
            total,
            figures.len()
        );

        Ok(figures)
    }
}
