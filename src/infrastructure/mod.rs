//! 基础设施层：持有稀缺资源，只暴露能力
//!
//! - `artifact_store` - 检查点存储（断点续跑）
//! - `page_cache` - 章节级页面图片临时目录

pub mod artifact_store;
pub mod page_cache;

pub use artifact_store::{
    load_json, save_json, ArtifactKey, ArtifactStore, FsArtifactStore, MemoryArtifactStore, Stage,
};
pub use page_cache::PageCache;
