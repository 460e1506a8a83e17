//! 图片工具：下载页面图片、按区域裁切配图

use super::ImageUtility;
use crate::error::{PipelineError, Result};
use crate::models::BoundingBox;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

pub struct HttpImageUtility {
    http: reqwest::Client,
}

impl HttpImageUtility {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

impl Default for HttpImageUtility {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageUtility for HttpImageUtility {
    async fn download(&self, url: &str, dest_dir: &Path) -> Result<PathBuf> {
        let download_error = |reason: String| PipelineError::DownloadFailure {
            url: url.to_string(),
            reason,
        };

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| download_error(e.to_string()))?;
        if !response.status().is_success() {
            return Err(download_error(format!("HTTP {}", response.status())));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| download_error(e.to_string()))?;

        // 并发下载可能同名，先原子占用文件再写入
        let (path, mut file) = claim_path(dest_dir, &file_name_from_url(url)).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        debug!("页面已下载: {} → {}", url, path.display());
        Ok(path)
    }

    async fn crop(&self, image_path: &Path, coordinates: &BoundingBox) -> Result<Vec<u8>> {
        let bytes = tokio::fs::read(image_path).await?;
        let coordinates = *coordinates;
        tokio::task::spawn_blocking(move || crop_png(&bytes, &coordinates))
            .await
            .map_err(|e| PipelineError::Image(format!("裁切任务失败: {}", e)))?
    }
}

/// 按归一化区域裁切并编码为 PNG
pub fn crop_png(page_image: &[u8], coordinates: &BoundingBox) -> Result<Vec<u8>> {
    use image::GenericImageView;

    let img = image::load_from_memory(page_image)
        .map_err(|e| PipelineError::Image(format!("加载页面图片失败: {}", e)))?;
    let (width, height) = img.dimensions();

    let (x, y, w, h) = coordinates
        .to_pixels(width, height)
        .ok_or_else(|| PipelineError::Image("裁切区域无效：宽度或高度为 0".to_string()))?;

    let cropped = image::imageops::crop_imm(&img, x, y, w, h).to_image();
    let mut buffer = std::io::Cursor::new(Vec::new());
    cropped
        .write_to(&mut buffer, image::ImageOutputFormat::Png)
        .map_err(|e| PipelineError::Image(format!("编码裁切图片失败: {}", e)))?;

    Ok(buffer.into_inner())
}

/// URL 最后一段作为文件名（去掉查询串）
fn file_name_from_url(url: &str) -> String {
    let name = reqwest::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|segments| segments.last().map(|s| s.to_string()))
        })
        .unwrap_or_default();

    let name: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
        .collect();

    if name.is_empty() || name.chars().all(|c| c == '.') {
        "page.png".to_string()
    } else {
        name
    }
}

/// 以 `create_new` 占用目录内的文件名，已存在时追加序号
async fn claim_path(dir: &Path, file_name: &str) -> Result<(PathBuf, tokio::fs::File)> {
    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((stem, ext)) => (stem.to_string(), format!(".{}", ext)),
        None => (file_name.to_string(), String::new()),
    };

    let mut attempt = 0usize;
    loop {
        let candidate = match attempt {
            0 => dir.join(file_name),
            n => dir.join(format!("{}-{}{}", stem, n, ext)),
        };
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await
        {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e.into()),
        }
    }
}
