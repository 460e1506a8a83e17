//! 程序配置
//!
//! 默认值 → 可选 TOML 文件（`PIPELINE_CONFIG`）→ 环境变量，后者覆盖前者。

use crate::error::{PipelineError, Result};
use crate::infrastructure::Stage;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 程序配置文件
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 书籍 JSON（数组，取第一个元素）
    pub book_file: String,
    /// 章节 JSON（数组）
    pub chapters_file: String,
    /// 检查点目录
    pub output_progress_dir: String,
    /// 只处理这些章节（按章节文件中的下标，从 0 开始）；None 表示全部
    pub chapter_indices: Option<Vec<usize>>,
    /// 从指定阶段开始（之前阶段的产物从检查点读取）
    pub resume_from: Option<Stage>,
    /// 抽取响应校验失败时是否中止章节
    pub strict_validation: bool,
    /// 页面级并发数（下载 / 配图提取），1 表示完全串行
    pub max_concurrent_pages: usize,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub vision_model_name: String,
    pub text_model_name: String,
    pub llm_max_retries: usize,
    pub vision_max_tokens: u32,
    pub text_max_tokens: u32,
    // --- 版面检测配置 ---
    pub layout_api_base_url: String,
    /// 配图最小宽度（相对页面宽度，0..1）
    pub min_figure_width: f64,
    /// 配图最小高度（相对页面高度，0..1）
    pub min_figure_height: f64,
    // --- 对象存储配置 ---
    pub storage_endpoint: String,
    pub storage_bucket: String,
    pub storage_public_base_url: String,
    pub storage_token: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            book_file: "input_data/book.json".to_string(),
            chapters_file: "input_data/book_library_bookchapter.json".to_string(),
            output_progress_dir: "output_progress".to_string(),
            chapter_indices: None,
            resume_from: None,
            strict_validation: false,
            max_concurrent_pages: 1,
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            vision_model_name: "gpt-4-vision-preview".to_string(),
            text_model_name: "gpt-4-1106-preview".to_string(),
            llm_max_retries: 3,
            vision_max_tokens: 4096,
            text_max_tokens: 4096,
            layout_api_base_url: "http://127.0.0.1:8500".to_string(),
            min_figure_width: 0.05,
            min_figure_height: 0.03,
            storage_endpoint: "http://127.0.0.1:9000".to_string(),
            storage_bucket: "exercise-figures".to_string(),
            storage_public_base_url: "http://127.0.0.1:9000/exercise-figures".to_string(),
            storage_token: String::new(),
        }
    }
}

impl Config {
    /// 从 TOML 文件加载，缺失字段使用默认值
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| PipelineError::Config(format!("解析 {} 失败: {}", path.display(), e)))
    }

    pub fn from_env() -> Result<Self> {
        let default = match std::env::var("PIPELINE_CONFIG") {
            Ok(path) => Self::load(Path::new(&path))?,
            Err(_) => Self::default(),
        };

        let resume_from = match std::env::var("RESUME_FROM") {
            Ok(v) if !v.trim().is_empty() => Some(v.parse::<Stage>()?),
            _ => default.resume_from,
        };

        Ok(Self {
            book_file: std::env::var("BOOK_FILE").unwrap_or(default.book_file),
            chapters_file: std::env::var("CHAPTERS_FILE").unwrap_or(default.chapters_file),
            output_progress_dir: std::env::var("OUTPUT_PROGRESS_DIR").unwrap_or(default.output_progress_dir),
            chapter_indices: std::env::var("CHAPTER_INDICES").ok().map(|v| parse_indices(&v)).unwrap_or(default.chapter_indices),
            resume_from,
            strict_validation: std::env::var("STRICT_VALIDATION").ok().and_then(|v| v.parse().ok()).unwrap_or(default.strict_validation),
            max_concurrent_pages: std::env::var("MAX_CONCURRENT_PAGES").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_concurrent_pages),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            vision_model_name: std::env::var("VISION_MODEL_NAME").unwrap_or(default.vision_model_name),
            text_model_name: std::env::var("TEXT_MODEL_NAME").unwrap_or(default.text_model_name),
            llm_max_retries: std::env::var("LLM_MAX_RETRIES").ok().and_then(|v| v.parse().ok()).unwrap_or(default.llm_max_retries),
            vision_max_tokens: std::env::var("VISION_MAX_TOKENS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.vision_max_tokens),
            text_max_tokens: std::env::var("TEXT_MAX_TOKENS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.text_max_tokens),
            layout_api_base_url: std::env::var("LAYOUT_API_BASE_URL").unwrap_or(default.layout_api_base_url),
            min_figure_width: std::env::var("MIN_FIGURE_WIDTH").ok().and_then(|v| v.parse().ok()).unwrap_or(default.min_figure_width),
            min_figure_height: std::env::var("MIN_FIGURE_HEIGHT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.min_figure_height),
            storage_endpoint: std::env::var("STORAGE_ENDPOINT").unwrap_or(default.storage_endpoint),
            storage_bucket: std::env::var("STORAGE_BUCKET").unwrap_or(default.storage_bucket),
            storage_public_base_url: std::env::var("STORAGE_PUBLIC_BASE_URL").unwrap_or(default.storage_public_base_url),
            storage_token: std::env::var("STORAGE_TOKEN").unwrap_or(default.storage_token),
        })
    }

    /// 第 `index` 个章节是否在本次处理范围内
    pub fn selects_chapter(&self, index: usize) -> bool {
        match &self.chapter_indices {
            Some(indices) => indices.contains(&index),
            None => true,
        }
    }
}

/// 解析 "3,4, 7" 形式的章节下标列表，忽略无法解析的项
fn parse_indices(raw: &str) -> Option<Vec<usize>> {
    let indices: Vec<usize> = raw
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();
    if indices.is_empty() {
        None
    } else {
        Some(indices)
    }
}
