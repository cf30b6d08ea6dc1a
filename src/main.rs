use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use xliff_translate::config::Cli;
use xliff_translate::stats::{format_duration, print_performance_stats};
use xliff_translate::translator::build_translator;
use xliff_translate::utils::{init_logging, validate_input_path};
use xliff_translate::xliff_processor::process_path;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志系统
    init_logging(cli.verbose, cli.quiet);

    // 验证输入路径
    validate_input_path(&cli.input)?;

    let config = cli.to_config();

    if !cli.quiet {
        info!("🚀 启动XLIFF翻译");
        info!("📂 输入: {}", cli.input.display());
        info!("🌐 语言: {} -> {}", config.source_lang(), config.target_lang());
        info!("🔧 翻译后端: {:?}", config.backend());
    }

    let translator = build_translator(&config).context("创建翻译器失败")?;

    // 开始计时
    let total_start = Instant::now();
    let report = process_path(&cli.input, &config, translator.as_ref()).await;
    let total_duration = total_start.elapsed();

    for output in &report.outputs {
        println!("✅ 输出文件已创建: {}", output.display());
    }

    if report.stats.units.is_degraded() {
        warn!(
            "⚠️  {} 个片段翻译失败，已保留原文",
            report.stats.units.fragments_failed
        );
    }

    // 显示性能统计
    if cli.stats || cli.verbose {
        print_performance_stats(&report.stats, total_duration);
    }

    if report.has_failures() {
        error!(
            "❌ 未能创建输出文件: {} 个文件处理失败",
            report.failures.len()
        );
        std::process::exit(1);
    }

    if report.outputs.is_empty() {
        warn!("⚠️  没有处理任何文件");
    } else if !cli.quiet {
        info!("✅ 处理完成！总耗时: {}", format_duration(total_duration));
    }

    Ok(())
}
