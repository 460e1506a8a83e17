//! 流程层：每个模块是章节流水线的一个阶段
//!
//! 各阶段从检查点读取输入、写入自己的检查点，可以单独重跑。

pub mod chapter_ctx;
pub mod figure_extractor;
pub mod image_linker;
pub mod page_resolver;
pub mod question_extractor;
pub mod scorer;
pub mod solver;

pub use chapter_ctx::ChapterCtx;
pub use figure_extractor::FigureExtractor;
pub use image_linker::{ImageLinker, LinkReport};
pub use page_resolver::PageResolver;
pub use question_extractor::{CallOutcome, ExtractionOutcome, QuestionExtractor};
pub use scorer::{Scorer, ScoringBuckets};
pub use solver::Solver;
