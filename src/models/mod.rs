pub mod post;

pub use post::{AnalysisResult, Performance, Post, NOT_SPECIFIED};
