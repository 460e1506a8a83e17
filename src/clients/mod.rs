//! 外部协作方
//!
//! 每个 trait 对应一个黑盒外部服务，流水线只依赖这些接口；
//! 同目录下是基于 HTTP / OpenAI 兼容接口的实现，测试中可替换为脚本化替身。

pub mod image_client;
pub mod layout_client;
pub mod llm_client;
pub mod storage_client;

use crate::config::Config;
use crate::error::Result;
use crate::infrastructure::{ArtifactStore, FsArtifactStore};
use crate::models::{BoundingBox, PageNumber};
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use image_client::HttpImageUtility;
pub use layout_client::HttpLayoutDetector;
pub use llm_client::LlmClient;
pub use storage_client::HttpObjectStorage;

/// 模型调用点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    ExtractExercises,
    ExtractConstructedResponse,
    LinkImages,
    SolveQuestions,
    ShortAnswerMarking,
    LongAnswerMarking,
    ConstructedMarking,
}

impl PromptKind {
    pub fn name(self) -> &'static str {
        match self {
            PromptKind::ExtractExercises => "extract-exercises",
            PromptKind::ExtractConstructedResponse => "extract-constructed-response",
            PromptKind::LinkImages => "link-images",
            PromptKind::SolveQuestions => "solve-questions",
            PromptKind::ShortAnswerMarking => "short-answer-marking",
            PromptKind::LongAnswerMarking => "long-answer-marking",
            PromptKind::ConstructedMarking => "constructed-marking",
        }
    }
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 视觉调用的图片来源
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    /// 本地页面图片（按页码排序）
    LocalFiles(Vec<(PageNumber, PathBuf)>),
    /// 远程图片链接
    Links(Vec<String>),
}

impl ImageSource {
    pub fn len(&self) -> usize {
        match self {
            ImageSource::LocalFiles(files) => files.len(),
            ImageSource::Links(links) => links.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 视觉 / 文本模型
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// 带图片的调用，返回原始文本响应
    async fn vision(&self, kind: PromptKind, prompt: &str, images: &ImageSource) -> Result<String>;

    /// 纯文本的大上下文调用，返回原始文本响应
    async fn complete(&self, kind: PromptKind, prompt: &str) -> Result<String>;
}

/// 版面检测
#[async_trait]
pub trait LayoutDetector: Send + Sync {
    /// 检测页面中的配图区域；空列表是合法结果
    async fn detect_figures(&self, image_path: &Path) -> Result<Vec<BoundingBox>>;
}

/// 对象存储
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// 上传图片，返回公开 URL；`key` 在章节 / 页码 / 序号上唯一
    async fn upload(&self, image: Vec<u8>, key: &str) -> Result<String>;
}

/// 图片下载与裁切
#[async_trait]
pub trait ImageUtility: Send + Sync {
    async fn download(&self, url: &str, dest_dir: &Path) -> Result<PathBuf>;

    async fn crop(&self, image_path: &Path, coordinates: &BoundingBox) -> Result<Vec<u8>>;
}

/// 流水线依赖的全部协作方
#[derive(Clone)]
pub struct Collaborators {
    pub model: Arc<dyn ModelClient>,
    pub layout: Arc<dyn LayoutDetector>,
    pub storage: Arc<dyn ObjectStorage>,
    pub images: Arc<dyn ImageUtility>,
    pub artifacts: Arc<dyn ArtifactStore>,
}

impl Collaborators {
    /// 按配置创建真实的外部服务客户端
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: Arc::new(LlmClient::new(config)),
            layout: Arc::new(HttpLayoutDetector::new(config)),
            storage: Arc::new(HttpObjectStorage::new(config)),
            images: Arc::new(HttpImageUtility::new()),
            artifacts: Arc::new(FsArtifactStore::new(&config.output_progress_dir)),
        }
    }
}
