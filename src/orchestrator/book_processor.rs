//! 书籍处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责一本书的章节调度和全局统计。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：输出启动信息、创建外部服务客户端
//! 2. **内容加载**：读取书籍和章节文档
//! 3. **章节筛选**：按 `chapter_indices` 选择要处理的章节
//! 4. **顺序处理**：一次一个章节，委托 `ChapterProcessor`
//! 5. **全局统计**：汇总所有章节的处理结果
//!
//! 单个章节失败不会中止整本书的处理。

use crate::clients::Collaborators;
use crate::config::Config;
use crate::models::{Book, Chapter};
use crate::orchestrator::chapter_processor::{ChapterProcessor, ChapterReport, ChapterState};
use crate::services::{ContentStore, Prompts};
use crate::utils::logging::{log_chapter_complete, log_chapters_selected, log_startup, print_final_stats};
use anyhow::{Context, Result};
use tracing::warn;

/// 处理统计
#[derive(Debug, Default)]
pub struct BookStats {
    pub total: usize,
    pub done: usize,
    pub skipped: usize,
    pub failed: usize,
    pub reports: Vec<ChapterReport>,
}

impl BookStats {
    fn record(&mut self, report: ChapterReport) {
        match report.state {
            ChapterState::Done => self.done += 1,
            ChapterState::SkippedNoExercises => self.skipped += 1,
            _ => self.failed += 1,
        }
        self.reports.push(report);
    }
}

/// 应用主结构
pub struct App {
    config: Config,
    collaborators: Collaborators,
}

impl App {
    /// 初始化应用（使用真实的外部服务）
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        if config.llm_api_key.is_empty() {
            warn!("⚠️ 未配置 LLM_API_KEY，模型调用可能失败");
        }

        let collaborators = Collaborators::from_config(&config);
        Ok(Self::with_collaborators(config, collaborators))
    }

    /// 使用指定的外部服务创建应用
    pub fn with_collaborators(config: Config, collaborators: Collaborators) -> Self {
        Self {
            config,
            collaborators,
        }
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<BookStats> {
        let store = ContentStore::new(&self.config.book_file, &self.config.chapters_file);
        let book = store
            .load_book()
            .await
            .with_context(|| format!("加载书籍失败: {}", self.config.book_file))?;
        let chapters = store
            .load_chapters()
            .await
            .with_context(|| format!("加载章节失败: {}", self.config.chapters_file))?;

        let stats = self.process_book(&book, &chapters).await;

        print_final_stats(&stats, &self.config.output_log_file);
        Ok(stats)
    }

    /// 顺序处理选中的章节
    pub async fn process_book(&self, book: &Book, chapters: &[Chapter]) -> BookStats {
        let processor = ChapterProcessor::new(
            &self.config,
            &self.collaborators,
            Prompts::new(&book.grade_subject_id),
        );

        let selected: Vec<(usize, &Chapter)> = chapters
            .iter()
            .enumerate()
            .filter(|(index, _)| self.config.selects_chapter(*index))
            .collect();
        log_chapters_selected(selected.len(), chapters.len());

        let mut stats = BookStats {
            total: selected.len(),
            ..Default::default()
        };

        for (index, chapter) in selected {
            let report = processor.process(book, chapter, index).await;
            log_chapter_complete(&report);
            stats.record(report);
        }

        stats
    }
}
