use std::path::Path;

use anyhow::Result;

/// 初始化日志系统
pub fn init_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// 验证输入路径存在（文件或目录）
pub fn validate_input_path(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("输入路径不存在: {}", path.display());
    }

    if !path.is_file() && !path.is_dir() {
        anyhow::bail!("输入路径既不是文件也不是目录: {}", path.display());
    }

    Ok(())
}

/// 判断文本是否只有空白
pub fn is_blank(text: &str) -> bool {
    text.chars().all(char::is_whitespace)
}

/// 拆分文本的前导空白、正文和尾随空白
///
/// 翻译服务通常会吞掉首尾空白，而XLIFF片段里的空白是有意义的（例如
/// 占位符和尾随文本之间的空格），所以只翻译中间部分。
pub fn split_whitespace_bounds(text: &str) -> (&str, &str, &str) {
    let start = text.len() - text.trim_start().len();
    let end = text.trim_end().len();

    if start >= end {
        return (text, "", "");
    }

    (&text[..start], &text[start..end], &text[end..])
}
