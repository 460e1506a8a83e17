//! 错误类型
//!
//! 流水线内部统一使用 [`PipelineError`]，顶层（main / App）再用 anyhow 包装上下文。

use thiserror::Error;

/// 流水线错误
#[derive(Debug, Error)]
pub enum PipelineError {
    /// 章节没有 chapter_text（良性，跳过章节）
    #[error("章节 {chapter_id} 缺少 chapter_text")]
    MissingChapterText { chapter_id: String },

    /// 章节有 chapter_text 但没有练习题（良性，跳过章节）
    #[error("章节 {chapter_id} 没有练习题")]
    NoExercisesFound { chapter_id: String },

    /// 检查点不存在，后续阶段无法运行
    #[error("检查点不存在: {key}")]
    ArtifactNotFound { key: String },

    /// 模型响应无法解析为预期结构
    #[error("模型响应校验失败: {0}")]
    ResponseValidation(#[from] ValidationError),

    /// 页面图片下载失败
    #[error("下载失败 ({url}): {reason}")]
    DownloadFailure { url: String, reason: String },

    /// 配图上传失败
    #[error("上传失败 ({key}): {reason}")]
    UploadFailure { key: String, reason: String },

    /// 版面检测调用失败
    #[error("版面检测失败 ({path}): {reason}")]
    LayoutDetection { path: String, reason: String },

    /// 模型调用失败（已重试）
    #[error("模型调用失败 ({kind}): {reason}")]
    Model { kind: String, reason: String },

    /// 图片解码/裁切/编码失败
    #[error("图片处理失败: {0}")]
    Image(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON 错误: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// 是否是"章节无练习"一类的良性提前退出
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            PipelineError::MissingChapterText { .. } | PipelineError::NoExercisesFound { .. }
        )
    }
}

/// 模型响应校验错误
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// 响应中找不到任何 JSON
    #[error("响应不是 JSON: {preview}")]
    NotJson { preview: String },

    /// JSON 对象缺少必需的键
    #[error("响应缺少键 `{0}`")]
    MissingKey(&'static str),

    /// JSON 结构不是预期的数组/对象
    #[error("响应结构不符合预期: 需要 {expected}")]
    UnexpectedShape { expected: &'static str },

    /// 结构正确但字段不合法
    #[error("响应字段不合法: {0}")]
    Malformed(String),
}

/// 流水线结果类型
pub type Result<T> = std::result::Result<T, PipelineError>;
