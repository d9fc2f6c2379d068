//! Raster fallback for presentations that cannot be trusted to render in the
//! browser: external office -> PDF -> PNG conversion, the on-disk image cache
//! that serves the results, and a worker pool that keeps the blocking
//! conversions off latency-sensitive threads.

pub mod cache;
pub mod pipeline;
pub mod tools;
pub mod worker;

pub use cache::ImageCache;
pub use pipeline::{RasterPipeline, ToolConfig, DEFAULT_DPI, DEFAULT_TIMEOUT};
pub use tools::{run_tool, ToolOutput};
pub use worker::{RasterJobHandle, RasterWorkerPool};
