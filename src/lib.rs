//! xliff-translate - XLIFF 1.2 翻译填充工具库
//!
//! 这个库提供了XLIFF文档解析与写出、trans-unit对齐、翻译后端和批量文件处理等核心功能。

pub mod api_constants;
pub mod config;
pub mod error;
pub mod google_translator;
pub mod languages;
pub mod reconciler;
pub mod stats;
pub mod translator;
pub mod utils;
pub mod xliff_document;
pub mod xliff_processor;

pub use error::{Result, TranslationError};
pub use reconciler::{reconcile, ReconcileStats, ReconciledDocument};
pub use translator::{translate_with_fallback, Translator};
pub use xliff_processor::{process_path, process_xliff};
