use crate::config::Config;
use crate::orchestrator::{BookStats, ChapterReport, ChapterState};
/// 日志工具模块
///
/// 提供日志格式化和输出的辅助函数
use std::fs;
use std::io;
use tracing::{info, warn};

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
///
/// 覆盖旧文件，写入带时间戳的文件头
pub fn init_log_file(log_file_path: &str) -> io::Result<()> {
    let log_header = format!(
        "{}\n练习题抽取日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 练习题抽取流水线");
    info!("📚 书籍文件: {}", config.book_file);
    info!("📑 章节文件: {}", config.chapters_file);
    info!("💾 检查点目录: {}", config.output_progress_dir);
    info!("📊 页面并发数: {}", config.max_concurrent_pages);
    if let Some(stage) = config.resume_from {
        info!("⏩ 从阶段 {} 继续", stage);
    }
    if config.strict_validation {
        info!("🔒 严格校验：抽取响应校验失败将中止章节");
    }
    info!("{}", "=".repeat(60));
}

/// 记录章节筛选信息
///
/// # 参数
/// - `selected`: 本次处理的章节数
/// - `total`: 章节总数
pub fn log_chapters_selected(selected: usize, total: usize) {
    info!("✓ 共 {} 个章节，本次处理 {} 个", total, selected);
}

/// 记录章节完成信息
pub fn log_chapter_complete(report: &ChapterReport) {
    info!("\n{}", "─".repeat(60));
    match report.state {
        ChapterState::Done => info!(
            "✓ 章节 {} 完成: {} 道题目",
            report.chapter_id, report.questions
        ),
        ChapterState::SkippedNoExercises => {
            info!("⏭️ 章节 {} 无练习题，已跳过", report.chapter_id)
        }
        state => warn!(
            "❌ 章节 {} 结束于 {}，已完成阶段: {:?}，原因: {}",
            report.chapter_id,
            state,
            report
                .completed_stages
                .iter()
                .map(|s| s.name())
                .collect::<Vec<_>>(),
            report.error.as_deref().unwrap_or("未知")
        ),
    }
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `stats`: 全书统计
/// - `log_file_path`: 日志文件路径
pub fn print_final_stats(stats: &BookStats, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 完成: {}/{}", stats.done, stats.total);
    info!("⏭️ 跳过: {}", stats.skipped);
    info!("❌ 失败: {}", stats.failed);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
