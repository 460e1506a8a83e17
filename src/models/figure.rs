use super::page_number::PageNumber;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// 页码 → 本地页面图片路径
pub type ExercisePages = BTreeMap<PageNumber, PathBuf>;

/// 页码 → 该页配图 URL（按检测顺序）
pub type PageFigures = BTreeMap<PageNumber, Vec<String>>;

/// 配图区域，坐标相对页面宽高归一化到 0..1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// 将归一化坐标换算为像素矩形 (x, y, w, h)，裁剪到图片范围内
    ///
    /// 区域为空时返回 None。
    pub fn to_pixels(&self, image_width: u32, image_height: u32) -> Option<(u32, u32, u32, u32)> {
        let x1 = self.left.clamp(0.0, 1.0);
        let y1 = self.top.clamp(0.0, 1.0);
        let x2 = (self.left + self.width).clamp(0.0, 1.0);
        let y2 = (self.top + self.height).clamp(0.0, 1.0);

        let px = ((x1 * image_width as f64).round() as u32).min(image_width.saturating_sub(1));
        let py = ((y1 * image_height as f64).round() as u32).min(image_height.saturating_sub(1));
        let pw = (((x2 - x1) * image_width as f64).round() as u32).min(image_width - px);
        let ph = (((y2 - y1) * image_height as f64).round() as u32).min(image_height - py);

        if pw == 0 || ph == 0 {
            None
        } else {
            Some((px, py, pw, ph))
        }
    }

    pub fn is_at_least(&self, min_width: f64, min_height: f64) -> bool {
        self.width >= min_width && self.height >= min_height
    }
}

/// 已上传的配图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    pub page_number: PageNumber,
    /// 本页内的序号，从 1 开始
    pub ordinal_index: usize,
    pub crop_coordinates: BoundingBox,
    pub uploaded_url: String,
}

impl Figure {
    /// 上传用的对象键，按章节 / 页码 / 序号唯一
    pub fn image_key(chapter_id: &str, page_number: &PageNumber, ordinal_index: usize) -> String {
        format!("chapter_id_{}_{}.{}", chapter_id, page_number, ordinal_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_pixels() {
        let bbox = BoundingBox::new(0.1, 0.2, 0.5, 0.25);
        assert_eq!(bbox.to_pixels(1000, 800), Some((100, 160, 500, 200)));
    }

    #[test]
    fn test_to_pixels_clamps_and_rejects_empty() {
        let bbox = BoundingBox::new(0.9, 0.9, 0.5, 0.5);
        assert_eq!(bbox.to_pixels(100, 100), Some((90, 90, 10, 10)));

        let empty = BoundingBox::new(0.5, 0.5, 0.0, 0.3);
        assert_eq!(empty.to_pixels(100, 100), None);
    }

    #[test]
    fn test_image_key() {
        assert_eq!(
            Figure::image_key("42", &PageNumber::from(7), 2),
            "chapter_id_42_7.2"
        );
    }
}
