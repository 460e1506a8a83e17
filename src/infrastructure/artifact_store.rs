//! 检查点存储 - 基础设施层
//!
//! 按 (book_id, chapter_id, stage) 持久化各阶段产物，是断点续跑的唯一依据。
//!
//! - 整体写入、覆盖旧值（last-writer-wins，无版本）
//! - 读取不存在的键返回 [`PipelineError::ArtifactNotFound`]
//! - 文件名固定为 `{book_id}_{chapter_id}_{stage}.json`，可直接 grep

use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;
use tokio::fs;
use tracing::debug;

/// 流水线阶段（同时也是检查点名称），按执行顺序排列
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    #[serde(rename = "exercise_pages")]
    ExercisePages,
    #[serde(rename = "questions")]
    Questions,
    #[serde(rename = "page_wise_figures")]
    PageWiseFigures,
    #[serde(rename = "Linked_images")]
    LinkedImages,
    #[serde(rename = "solved")]
    Solved,
    #[serde(rename = "marking_scheme")]
    MarkingScheme,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::ExercisePages,
        Stage::Questions,
        Stage::PageWiseFigures,
        Stage::LinkedImages,
        Stage::Solved,
        Stage::MarkingScheme,
    ];

    /// 检查点名称
    pub fn name(self) -> &'static str {
        match self {
            Stage::ExercisePages => "exercise_pages",
            Stage::Questions => "questions",
            Stage::PageWiseFigures => "page_wise_figures",
            Stage::LinkedImages => "Linked_images",
            Stage::Solved => "solved",
            Stage::MarkingScheme => "marking_scheme",
        }
    }

    /// 本阶段是否需要本地页面图片
    pub fn needs_page_images(self) -> bool {
        matches!(
            self,
            Stage::ExercisePages | Stage::Questions | Stage::PageWiseFigures
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stage {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Stage::ALL
            .into_iter()
            .find(|stage| stage.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| PipelineError::Config(format!("未知阶段: {}", s)))
    }
}

/// 检查点键
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    pub book_id: String,
    pub chapter_id: String,
    pub stage: Stage,
}

impl ArtifactKey {
    pub fn new(book_id: impl Into<String>, chapter_id: impl Into<String>, stage: Stage) -> Self {
        Self {
            book_id: book_id.into(),
            chapter_id: chapter_id.into(),
            stage,
        }
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.book_id, self.chapter_id, self.stage)
    }
}

/// 检查点存储能力
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// 整体写入（覆盖）
    async fn write(&self, key: &ArtifactKey, data: &[u8]) -> Result<()>;

    /// 读取最近一次写入的内容
    async fn load(&self, key: &ArtifactKey) -> Result<Vec<u8>>;
}

/// 以 JSON 写入检查点
pub async fn save_json<T>(store: &dyn ArtifactStore, key: &ArtifactKey, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
{
    let bytes = serde_json::to_vec_pretty(value)?;
    store.write(key, &bytes).await
}

/// 读取 JSON 检查点并反序列化为指定类型
pub async fn load_json<T: DeserializeOwned>(store: &dyn ArtifactStore, key: &ArtifactKey) -> Result<T> {
    let bytes = store.load(key).await?;
    let value = serde_json::from_slice(&bytes)?;
    Ok(value)
}

/// 文件系统检查点存储
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 检查点文件路径：`{root}/{book_id}_{chapter_id}_{stage}.json`
    pub fn path_for(&self, key: &ArtifactKey) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn write(&self, key: &ArtifactKey, data: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.root).await?;

        // 先写临时文件再 rename，避免留下半个检查点
        let path = self.path_for(key);
        let tmp = self.root.join(format!(".{}.json.tmp", key));
        fs::write(&tmp, data).await?;
        fs::rename(&tmp, &path).await?;

        debug!("检查点已写入: {} ({} 字节)", path.display(), data.len());
        Ok(())
    }

    async fn load(&self, key: &ArtifactKey) -> Result<Vec<u8>> {
        let path = self.path_for(key);
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(PipelineError::ArtifactNotFound {
                key: key.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

/// 内存检查点存储（测试 / 试运行）
#[derive(Default)]
pub struct MemoryArtifactStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已写入的键（排序后）
    pub fn keys(&self) -> Vec<String> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn contains(&self, key: &ArtifactKey) -> bool {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.contains_key(&key.to_string())
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn write(&self, key: &ArtifactKey, data: &[u8]) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), data.to_vec());
        Ok(())
    }

    async fn load(&self, key: &ArtifactKey) -> Result<Vec<u8>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .get(&key.to_string())
            .cloned()
            .ok_or_else(|| PipelineError::ArtifactNotFound {
                key: key.to_string(),
            })
    }
}
