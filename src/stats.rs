use std::time::Duration;

use crate::reconciler::ReconcileStats;

/// 一次运行的统计（目录模式下为所有文件的累计）
#[derive(Debug, Default, Clone)]
pub struct TranslationStats {
    /// 读取并解析输入文件
    pub file_read_time: Duration,
    /// 对齐trans-unit（包含翻译调用）
    pub reconcile_time: Duration,
    /// 序列化并写入输出文件
    pub file_write_time: Duration,
    pub input_size: usize,
    pub output_size: usize,
    pub files_processed: usize,
    pub files_failed: usize,
    pub units: ReconcileStats,
}

impl TranslationStats {
    /// 累加另一个文件的统计
    pub fn accumulate(&mut self, other: &TranslationStats) {
        self.file_read_time += other.file_read_time;
        self.reconcile_time += other.reconcile_time;
        self.file_write_time += other.file_write_time;
        self.input_size += other.input_size;
        self.output_size += other.output_size;
        self.files_processed += other.files_processed;
        self.files_failed += other.files_failed;

        self.units.units_total += other.units.units_total;
        self.units.units_translated += other.units.units_translated;
        self.units.units_unchanged += other.units.units_unchanged;
        self.units.units_without_source += other.units.units_without_source;
        self.units.fragments_translated += other.units.fragments_translated;
        self.units.fragments_failed += other.units.fragments_failed;
        self.units.fragments_blank += other.units.fragments_blank;
    }
}

/// 打印性能统计
pub fn print_performance_stats(stats: &TranslationStats, total_duration: Duration) {
    println!("\n📊 性能统计报告:");
    println!("═══════════════════════════════════════");

    // 时间分解
    println!("⏱️  时间分解:");
    println!("   文件读取: {}", format_duration(stats.file_read_time));
    println!("   单元对齐: {}", format_duration(stats.reconcile_time));
    println!("   文件写入: {}", format_duration(stats.file_write_time));
    println!("   总耗时: {}", format_duration(total_duration));

    // 文件统计
    println!("\n📏 文件统计:");
    println!("   处理文件: {} 个", stats.files_processed);
    if stats.files_failed > 0 {
        println!("   失败文件: {} 个", stats.files_failed);
    }
    println!(
        "   输入大小: {} 字节 ({:.1} KB)",
        stats.input_size,
        stats.input_size as f64 / 1024.0
    );
    println!(
        "   输出大小: {} 字节 ({:.1} KB)",
        stats.output_size,
        stats.output_size as f64 / 1024.0
    );
    if stats.input_size > 0 {
        println!(
            "   大小变化: {:.1}%",
            (stats.output_size as f64 / stats.input_size as f64 - 1.0) * 100.0
        );
    }

    // 翻译统计
    let units = &stats.units;
    println!("\n🔤 翻译统计:");
    println!("   trans-unit: {} 个", units.units_total);
    println!("   新增译文: {} 个", units.units_translated);
    println!("   已有译文: {} 个", units.units_unchanged);
    println!("   缺少source: {} 个", units.units_without_source);
    println!("   翻译片段: {} 个", units.fragments_translated);
    println!("   空白片段: {} 个", units.fragments_blank);
    if units.is_degraded() {
        println!("   ⚠️  失败片段: {} 个 (保留原文)", units.fragments_failed);
    }

    // 性能指标
    let fragments = units.fragments_translated + units.fragments_failed;
    let reconcile_secs = stats.reconcile_time.as_secs_f64();
    if fragments > 0 && reconcile_secs > 0.0 {
        println!("\n🚀 性能指标:");
        println!("   翻译速度: {:.1} 片段/秒", fragments as f64 / reconcile_secs);
        println!(
            "   平均延迟: {}",
            format_duration(stats.reconcile_time / fragments as u32)
        );
    }
}

/// 格式化持续时间
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else {
        format!("{:.3}s", duration.as_secs_f64())
    }
}
