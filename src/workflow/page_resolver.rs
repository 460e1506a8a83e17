//! 页面解析 - 流程层
//!
//! 练习引用的页码去重 → 在 book_text 中找到对应图片 URL → 下载到章节缓存目录。
//! book_text 中没有 URL 的页码直接丢弃，不是错误。

use crate::clients::{Collaborators, ImageUtility};
use crate::error::{PipelineError, Result};
use crate::infrastructure::{save_json, ArtifactStore, PageCache, Stage};
use crate::models::{BookPage, Exercise, ExercisePages, PageNumber};
use crate::workflow::ChapterCtx;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};

/// 页面解析器
pub struct PageResolver {
    images: Arc<dyn ImageUtility>,
    artifacts: Arc<dyn ArtifactStore>,
    max_concurrent: usize,
}

impl PageResolver {
    pub fn new(collaborators: &Collaborators, max_concurrent: usize) -> Self {
        Self {
            images: collaborators.images.clone(),
            artifacts: collaborators.artifacts.clone(),
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// 下载练习页面并写入 `exercise_pages` 检查点
    pub async fn run(
        &self,
        ctx: &ChapterCtx,
        exercises: &[Exercise],
        book_pages: &[BookPage],
        cache: &PageCache,
    ) -> Result<ExercisePages> {
        info!("{} 📥 下载练习页面...", ctx);

        let needed = needed_pages(exercises);
        let targets = download_targets(&needed, book_pages);
        debug!(
            "{} 练习引用 {} 个页码，其中 {} 个有图片 URL",
            ctx,
            needed.len(),
            targets.len()
        );

        let dest_dir = cache.path();
        let pages: ExercisePages = stream::iter(targets)
            .map(|(page, url)| async move {
                let path = self.images.download(&url, dest_dir).await?;
                Ok::<_, PipelineError>((page, path))
            })
            .buffer_unordered(self.max_concurrent)
            .try_collect()
            .await?;

        save_json(self.artifacts.as_ref(), &ctx.key(Stage::ExercisePages), &pages).await?;
        info!("{} ✓ 已下载 {} 个页面", ctx, pages.len());
        Ok(pages)
    }
}

/// 练习引用的不同页码
fn needed_pages(exercises: &[Exercise]) -> BTreeSet<PageNumber> {
    exercises
        .iter()
        .filter_map(|exercise| exercise.page_number.clone())
        .collect()
}

/// 需要下载的 (页码, URL)，同一页码只取第一条记录
fn download_targets(needed: &BTreeSet<PageNumber>, book_pages: &[BookPage]) -> BTreeMap<PageNumber, String> {
    let mut targets = BTreeMap::new();
    for (page, url) in book_pages.iter().filter_map(BookPage::image_source) {
        if needed.contains(page) {
            targets
                .entry(page.clone())
                .or_insert_with(|| url.to_string());
        }
    }
    targets
}
