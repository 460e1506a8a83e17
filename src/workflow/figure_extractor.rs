//! 配图提取 - 流程层
//!
//! 对含图题所在的每一页：版面检测 → 逐个裁切 → 上传，得到 页码 → 配图 URL 列表。
//!
//! - 检测不到配图的页不出现在结果中
//! - 同一页的 URL 保持检测顺序，序号从 1 开始
//! - 页面缓存目录在所有页面处理完后释放（成功或失败都只释放一次）

use crate::clients::{Collaborators, ImageUtility, LayoutDetector, ObjectStorage};
use crate::error::Result;
use crate::infrastructure::{load_json, save_json, ArtifactStore, PageCache, Stage};
use crate::models::{ExercisePages, Figure, PageFigures, PageNumber, Question};
use crate::workflow::ChapterCtx;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 配图提取器
pub struct FigureExtractor {
    layout: Arc<dyn LayoutDetector>,
    images: Arc<dyn ImageUtility>,
    storage: Arc<dyn ObjectStorage>,
    artifacts: Arc<dyn ArtifactStore>,
    max_concurrent: usize,
}

impl FigureExtractor {
    pub fn new(collaborators: &Collaborators, max_concurrent: usize) -> Self {
        Self {
            layout: collaborators.layout.clone(),
            images: collaborators.images.clone(),
            storage: collaborators.storage.clone(),
            artifacts: collaborators.artifacts.clone(),
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// 读取 `exercise_pages` 和 `questions`，提取配图并写入 `page_wise_figures` 检查点
    ///
    /// 消费页面缓存：无论结果如何，返回前目录已被删除。
    pub async fn run(&self, ctx: &ChapterCtx, cache: PageCache) -> Result<PageFigures> {
        info!("{} 🖼️ 提取配图...", ctx);

        let result = self.load_and_extract(ctx).await;

        if let Err(e) = cache.close() {
            warn!("{} ⚠️ 删除页面缓存目录失败: {}", ctx, e);
        }

        let figures = result?;
        save_json(self.artifacts.as_ref(), &ctx.key(Stage::PageWiseFigures), &figures).await?;
        info!(
            "{} ✓ {} 个页面共 {} 张配图",
            ctx,
            figures.len(),
            figures.values().map(Vec::len).sum::<usize>()
        );
        Ok(figures)
    }

    async fn load_and_extract(&self, ctx: &ChapterCtx) -> Result<PageFigures> {
        let pages: ExercisePages =
            load_json(self.artifacts.as_ref(), &ctx.key(Stage::ExercisePages)).await?;
        let questions: Vec<Question> =
            load_json(self.artifacts.as_ref(), &ctx.key(Stage::Questions)).await?;
        self.extract(ctx, &questions, &pages).await
    }

    /// 按页并发提取，每个任务返回自己页面的结果，最后统一合并
    pub async fn extract(
        &self,
        ctx: &ChapterCtx,
        questions: &[Question],
        pages: &ExercisePages,
    ) -> Result<PageFigures> {
        let image_pages: BTreeSet<PageNumber> = questions
            .iter()
            .filter(|q| q.image_based_question)
            .map(|q| q.question_page_number.clone())
            .collect();
        debug!("{} 含图题所在页: {:?}", ctx, image_pages);

        let entries: Vec<Option<(PageNumber, Vec<String>)>> = stream::iter(image_pages)
            .map(|page| self.page_entry(ctx, page, pages))
            .buffer_unordered(self.max_concurrent)
            .try_collect()
            .await?;

        Ok(entries.into_iter().flatten().collect())
    }

    /// 单页任务：没有页面图片或没有配图时返回 None
    async fn page_entry(
        &self,
        ctx: &ChapterCtx,
        page: PageNumber,
        pages: &ExercisePages,
    ) -> Result<Option<(PageNumber, Vec<String>)>> {
        let Some(page_path) = pages.get(&page) else {
            warn!("{} ⚠️ 第 {} 页没有页面图片，跳过", ctx, page);
            return Ok(None);
        };

        let figures = self.extract_page(ctx, &page, page_path).await?;
        if figures.is_empty() {
            info!("{} 第 {} 页未检测到配图", ctx, page);
            return Ok(None);
        }

        let urls = figures.into_iter().map(|f| f.uploaded_url).collect();
        Ok(Some((page, urls)))
    }

    /// 单页：检测 → 裁切 → 上传（页内按检测顺序串行）
    async fn extract_page(
        &self,
        ctx: &ChapterCtx,
        page: &PageNumber,
        page_path: &Path,
    ) -> Result<Vec<Figure>> {
        let boxes = self.layout.detect_figures(page_path).await?;
        if !boxes.is_empty() {
            info!("{} 第 {} 页检测到 {} 张配图", ctx, page, boxes.len());
        }

        let mut figures = Vec::with_capacity(boxes.len());
        for (ordinal_index, crop_coordinates) in boxes.into_iter().enumerate().map(|(i, b)| (i + 1, b)) {
            let image = self.images.crop(page_path, &crop_coordinates).await?;
            let key = Figure::image_key(&ctx.chapter_id, page, ordinal_index);
            let uploaded_url = self.storage.upload(image, &key).await?;
            debug!("{} 配图 {} → {}", ctx, key, uploaded_url);

            figures.push(Figure {
                page_number: page.clone(),
                ordinal_index,
                crop_coordinates,
                uploaded_url,
            });
        }
        Ok(figures)
    }
}
