pub mod book;
pub mod figure;
pub mod page_number;
pub mod question;

pub use book::{Book, BookPage, Chapter, ChapterContent, ChapterText, Exercise};
pub use figure::{BoundingBox, ExercisePages, Figure, PageFigures};
pub use page_number::PageNumber;
pub use question::{ImageLink, Question, QuestionType, ScoredQuestion, SolvedQuestion};
