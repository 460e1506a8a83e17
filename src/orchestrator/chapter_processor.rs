//! 单个章节处理器 - 编排层
//!
//! ## 职责
//!
//! 按固定顺序运行章节流水线的各阶段，并维护章节状态：
//!
//! ```text
//! NotStarted → PagesDownloaded → QuestionsExtracted → FiguresExtracted
//!            → ImagesLinked → Solved → MarkingSchemeAssigned → Done
//! NotStarted → SkippedNoExercises   (没有 chapter_text / 练习)
//! 任意阶段出错 → Failed             (之前阶段的检查点保留，可续跑)
//! ```
//!
//! ## 断点续跑
//!
//! `resume_from = S` 时跳过 S 之前的阶段，所需输入从检查点读取。
//! 页面图片不落盘：只要需要页面图片的阶段会运行，就先重新下载并重写 `exercise_pages`。
//!
//! ## 资源
//!
//! 页面缓存目录由本模块创建，交给配图提取阶段释放；提前失败时由 `Drop` 删除。

use crate::clients::Collaborators;
use crate::config::Config;
use crate::error::Result;
use crate::infrastructure::{PageCache, Stage};
use crate::models::{Book, Chapter, Exercise};
use crate::services::Prompts;
use crate::workflow::{
    ChapterCtx, FigureExtractor, ImageLinker, PageResolver, QuestionExtractor, Scorer, Solver,
};
use std::fmt;
use tracing::{error, info};

/// 章节状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChapterState {
    NotStarted,
    PagesDownloaded,
    QuestionsExtracted,
    FiguresExtracted,
    ImagesLinked,
    Solved,
    MarkingSchemeAssigned,
    Done,
    SkippedNoExercises,
    Failed,
}

impl ChapterState {
    /// 阶段完成后进入的状态
    pub fn after(stage: Stage) -> Self {
        match stage {
            Stage::ExercisePages => ChapterState::PagesDownloaded,
            Stage::Questions => ChapterState::QuestionsExtracted,
            Stage::PageWiseFigures => ChapterState::FiguresExtracted,
            Stage::LinkedImages => ChapterState::ImagesLinked,
            Stage::Solved => ChapterState::Solved,
            Stage::MarkingScheme => ChapterState::MarkingSchemeAssigned,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ChapterState::Done | ChapterState::SkippedNoExercises | ChapterState::Failed
        )
    }
}

impl fmt::Display for ChapterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// 章节处理结果
#[derive(Debug, Clone)]
pub struct ChapterReport {
    pub chapter_id: String,
    pub state: ChapterState,
    /// 本次运行完成（已写检查点）的阶段，按顺序
    pub completed_stages: Vec<Stage>,
    /// 最终题目数（Done 时有效）
    pub questions: usize,
    /// 失败原因
    pub error: Option<String>,
}

/// 阶段推进记录
#[derive(Debug)]
struct Progress {
    state: ChapterState,
    completed: Vec<Stage>,
}

impl Progress {
    fn new() -> Self {
        Self {
            state: ChapterState::NotStarted,
            completed: Vec::new(),
        }
    }

    fn complete(&mut self, ctx: &ChapterCtx, stage: Stage) {
        self.state = ChapterState::after(stage);
        self.completed.push(stage);
        info!("{} 状态 → {}", ctx, self.state);
    }
}

/// 章节处理器（每本书创建一次，复用于所有章节）
pub struct ChapterProcessor {
    page_resolver: PageResolver,
    question_extractor: QuestionExtractor,
    figure_extractor: FigureExtractor,
    image_linker: ImageLinker,
    solver: Solver,
    scorer: Scorer,
    resume_from: Stage,
    strict_validation: bool,
}

impl ChapterProcessor {
    pub fn new(config: &Config, collaborators: &Collaborators, prompts: Prompts) -> Self {
        let concurrency = config.max_concurrent_pages;
        Self {
            page_resolver: PageResolver::new(collaborators, concurrency),
            question_extractor: QuestionExtractor::new(collaborators, prompts.clone()),
            figure_extractor: FigureExtractor::new(collaborators, concurrency),
            image_linker: ImageLinker::new(collaborators, prompts.clone(), concurrency),
            solver: Solver::new(collaborators, prompts.clone()),
            scorer: Scorer::new(collaborators, prompts),
            resume_from: config.resume_from.unwrap_or(Stage::ExercisePages),
            strict_validation: config.strict_validation,
        }
    }

    /// 处理单个章节；阶段错误不会向上传播，而是体现在 [`ChapterReport`] 中
    pub async fn process(&self, book: &Book, chapter: &Chapter, chapter_index: usize) -> ChapterReport {
        let ctx = ChapterCtx::new(&book.id, &chapter.id, chapter_index, &book.grade_subject_id);
        info!("{} 📖 开始处理章节《{}》", ctx, chapter.title);

        let mut report = ChapterReport {
            chapter_id: chapter.id.clone(),
            state: ChapterState::NotStarted,
            completed_stages: Vec::new(),
            questions: 0,
            error: None,
        };

        let exercises = match chapter.exercises() {
            Ok(exercises) => exercises,
            Err(e) => {
                info!("{} ⏭️ 跳过章节: {}", ctx, e);
                report.state = ChapterState::SkippedNoExercises;
                return report;
            }
        };

        let mut progress = Progress::new();
        match self.run_stages(&ctx, book, chapter, exercises, &mut progress).await {
            Ok(questions) => {
                report.state = ChapterState::Done;
                report.questions = questions;
                info!("{} ✅ 章节完成，共 {} 道题目", ctx, questions);
            }
            Err(e) => {
                error!(
                    "{} ❌ 章节处理失败（最后状态 {}）: {}",
                    ctx, progress.state, e
                );
                report.state = ChapterState::Failed;
                report.error = Some(e.to_string());
            }
        }
        report.completed_stages = progress.completed;
        report
    }

    async fn run_stages(
        &self,
        ctx: &ChapterCtx,
        book: &Book,
        chapter: &Chapter,
        exercises: &[Exercise],
        progress: &mut Progress,
    ) -> Result<usize> {
        if self.resume_from != Stage::ExercisePages {
            info!("{} ⏩ 从阶段 {} 继续", ctx, self.resume_from);
        }

        if self.resume_from.needs_page_images() {
            let cache = PageCache::create()?;
            self.run_page_stages(ctx, book, exercises, cache, progress).await?;
        }

        if self.resume_from <= Stage::LinkedImages {
            self.image_linker.run(ctx).await?;
            progress.complete(ctx, Stage::LinkedImages);
        }

        if self.resume_from <= Stage::Solved {
            self.solver.run(ctx, &chapter.learning_content()).await?;
            progress.complete(ctx, Stage::Solved);
        }

        let scored = self.scorer.run(ctx).await?;
        progress.complete(ctx, Stage::MarkingScheme);

        Ok(scored.len())
    }

    /// 需要页面图片的阶段：下载 → 抽取 → 配图提取（释放缓存）
    async fn run_page_stages(
        &self,
        ctx: &ChapterCtx,
        book: &Book,
        exercises: &[Exercise],
        cache: PageCache,
        progress: &mut Progress,
    ) -> Result<()> {
        self.page_resolver
            .run(ctx, exercises, &book.book_text, &cache)
            .await?;
        progress.complete(ctx, Stage::ExercisePages);

        if self.resume_from <= Stage::Questions {
            self.question_extractor
                .run(ctx, self.strict_validation)
                .await?;
            progress.complete(ctx, Stage::Questions);
        }

        self.figure_extractor.run(ctx, cache).await?;
        progress.complete(ctx, Stage::PageWiseFigures);
        Ok(())
    }
}
