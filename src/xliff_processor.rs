//! XLIFF处理流程
//!
//! 单个文件的完整流程：推导输出路径 → 加载 → 对齐trans-unit → 保存。
//! 目录输入时递归处理所有匹配扩展名的文件，单个文件失败不影响其余文件。

// 标准库导入
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

// 第三方crate导入
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

// 本地模块导入
use crate::api_constants::xliff_config;
use crate::config::XliffTranslationConfig;
use crate::error::{Result, TranslationError};
use crate::reconciler::{reconcile, ReconciledDocument};
use crate::stats::TranslationStats;
use crate::translator::Translator;
use crate::xliff_document::{derive_output_path, load_document, save_document};

/// 单个文件的处理结果
#[derive(Debug)]
pub struct ProcessOutcome {
    pub output_path: PathBuf,
    pub stats: TranslationStats,
}

/// 一次运行（单文件或目录）的汇总
#[derive(Debug, Default)]
pub struct RunReport {
    /// 成功创建的输出文件
    pub outputs: Vec<PathBuf>,
    /// 处理失败的输入文件及原因
    pub failures: Vec<(PathBuf, TranslationError)>,
    pub stats: TranslationStats,
}

impl RunReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// 翻译单个XLIFF文件，写入 `<name>.modified.<ext>`
///
/// 扩展名校验在任何文件I/O之前完成。加载、解析或写入失败时返回错误，
/// 输出路径上不会留下文件；单个片段的翻译失败不会导致整个文件失败。
pub async fn process_xliff(
    input: &Path,
    source_lang: &str,
    target_lang: &str,
    file_extension: &str,
    translator: &dyn Translator,
) -> Result<ProcessOutcome> {
    let output_path = derive_output_path(input, file_extension)?;
    info!("📂 处理文件: {}", input.display());

    let mut stats = TranslationStats {
        files_processed: 1,
        ..Default::default()
    };

    // 读取并解析
    let read_start = Instant::now();
    let dom = load_document(input)?;
    stats.file_read_time = read_start.elapsed();
    stats.input_size = file_size(input);

    // 对齐trans-unit
    let reconcile_start = Instant::now();
    let ReconciledDocument { dom, stats: units } =
        reconcile(dom, source_lang, target_lang, translator).await;
    stats.reconcile_time = reconcile_start.elapsed();
    stats.units = units;

    // 写入输出
    let write_start = Instant::now();
    save_document(&dom, &output_path)?;
    stats.file_write_time = write_start.elapsed();
    stats.output_size = file_size(&output_path);

    info!("💾 已写入: {}", output_path.display());
    Ok(ProcessOutcome { output_path, stats })
}

/// 处理文件或目录
pub async fn process_path(
    input: &Path,
    config: &XliffTranslationConfig,
    translator: &dyn Translator,
) -> RunReport {
    let files = if input.is_dir() {
        let files = collect_xliff_files(input, config.file_extension());
        info!(
            "🗂️  在 {} 中找到 {} 个 .{} 文件",
            input.display(),
            files.len(),
            config.file_extension()
        );
        if files.is_empty() {
            warn!("⚠️  目录中没有需要处理的文件");
        }
        files
    } else {
        vec![input.to_path_buf()]
    };

    let mut report = RunReport::default();
    for file in files {
        match process_xliff(
            &file,
            config.source_lang(),
            config.target_lang(),
            config.file_extension(),
            translator,
        )
        .await
        {
            Ok(outcome) => {
                report.stats.accumulate(&outcome.stats);
                report.outputs.push(outcome.output_path);
            }
            Err(e) => {
                error!("❌ 处理失败 {}: {}", file.display(), e);
                report.stats.files_failed += 1;
                report.failures.push((file, e));
            }
        }
    }

    report
}

/// 递归收集目录中以 `.<ext>` 结尾的文件，跳过已生成的 `.modified.<ext>` 输出
pub fn collect_xliff_files(dir: &Path, file_extension: &str) -> Vec<PathBuf> {
    let suffix = format!(".{}", file_extension.trim_start_matches('.').to_lowercase());
    let output_suffix = format!(".{}{}", xliff_config::OUTPUT_MARKER, suffix);

    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("⚠️  无法访问目录项: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy().to_lowercase();
            let wanted = name.ends_with(&suffix) && !name.ends_with(&output_suffix);
            if !wanted {
                debug!("跳过文件: {}", entry.path().display());
            }
            wanted
        })
        .map(|entry| entry.into_path())
        .collect()
}

fn file_size(path: &Path) -> usize {
    fs::metadata(path).map(|m| m.len() as usize).unwrap_or(0)
}
