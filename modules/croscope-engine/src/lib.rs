pub mod audit;
pub mod cache;
pub mod collector;
pub mod elements;
pub mod engine;
pub mod framework;
pub mod merge;
pub mod persist;
pub mod pool;
pub mod report;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

pub use engine::AnalysisEngine;
