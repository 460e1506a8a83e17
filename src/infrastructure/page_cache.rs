//! 页面图片缓存目录 - 基础设施层
//!
//! 每个章节一个临时目录：页面下载前创建，配图提取结束后释放。
//! 显式 [`PageCache::close`] 只能调用一次（按值消费）；
//! 任何提前失败的路径由 `Drop` 兜底删除目录。

use std::io;
use std::path::Path;
use tempfile::TempDir;
use tracing::debug;

/// 章节级页面图片缓存
#[derive(Debug)]
pub struct PageCache {
    dir: TempDir,
}

impl PageCache {
    /// 创建新的临时目录
    pub fn create() -> io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("exercise-pages-")
            .tempdir()?;
        debug!("页面缓存目录: {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// 删除目录
    pub fn close(self) -> io::Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        debug!("页面缓存目录已删除: {}", path.display());
        Ok(())
    }
}
