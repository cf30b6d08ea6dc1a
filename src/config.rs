//! 配置管理模块
//!
//! 提供CLI参数解析和XLIFF翻译配置管理功能

// 标准库导入
use std::path::PathBuf;

// 第三方crate导入
use clap::{Parser, ValueEnum};

// 本地模块导入
use crate::api_constants::{
    api_config, get_api_url, is_supported_extension, service_config, xliff_config,
};

/// 翻译后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TranslatorBackend {
    /// Google翻译网页版（无需API密钥）
    Google,
    /// 通用JSON翻译API
    Api,
}

/// XLIFF翻译配置
///
/// 支持Builder模式进行链式配置，未设置的项使用 `api_constants` 中的默认值。
///
/// # Examples
///
/// ```rust
/// use xliff_translate::config::{TranslatorBackend, XliffTranslationConfig};
///
/// let config = XliffTranslationConfig::new()
///     .with_source_lang("english")
///     .with_target_lang("german")
///     .with_backend(TranslatorBackend::Api)
///     .with_api_url("http://localhost:1188/translate");
/// assert_eq!(config.target_lang(), "german");
/// ```
#[derive(Debug, Clone)]
pub struct XliffTranslationConfig {
    /// 源语言（语言名称或代码，原样传给翻译器）
    source_lang: String,
    /// 目标语言
    target_lang: String,
    /// 输入文件扩展名，不带点
    file_extension: String,
    backend: TranslatorBackend,
    /// 翻译API服务地址，仅 `Api` 后端使用
    api_url: String,
    /// HTTP请求超时（秒）
    timeout_secs: u64,
}

impl XliffTranslationConfig {
    /// 创建新的配置实例
    ///
    /// 默认值：
    /// - 源语言: english
    /// - 目标语言: spanish
    /// - 扩展名: xlf
    /// - 后端: Google网页版
    /// - 超时: 30秒
    pub fn new() -> Self {
        Self {
            source_lang: service_config::DEFAULT_SOURCE_LANG.to_string(),
            target_lang: service_config::DEFAULT_TARGET_LANG.to_string(),
            file_extension: xliff_config::DEFAULT_EXTENSION.to_string(),
            backend: TranslatorBackend::Google,
            api_url: api_config::DEFAULT_API_URL.to_string(),
            timeout_secs: service_config::REQUEST_TIMEOUT_SECONDS,
        }
    }

    pub fn source_lang(&self) -> &str {
        &self.source_lang
    }

    pub fn target_lang(&self) -> &str {
        &self.target_lang
    }

    pub fn file_extension(&self) -> &str {
        &self.file_extension
    }

    pub fn backend(&self) -> TranslatorBackend {
        self.backend
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// 设置源语言
    pub fn with_source_lang(mut self, lang: &str) -> Self {
        self.source_lang = lang.to_string();
        self
    }

    /// 设置目标语言
    pub fn with_target_lang(mut self, lang: &str) -> Self {
        self.target_lang = lang.to_string();
        self
    }

    /// 设置文件扩展名，会去掉前导的点并转为小写
    pub fn with_file_extension(mut self, ext: &str) -> Self {
        self.file_extension = ext.trim().trim_start_matches('.').to_lowercase();
        self
    }

    /// 设置翻译后端
    pub fn with_backend(mut self, backend: TranslatorBackend) -> Self {
        self.backend = backend;
        self
    }

    /// 设置API地址
    pub fn with_api_url(mut self, url: &str) -> Self {
        self.api_url = url.to_string();
        self
    }

    /// 设置请求超时，最少1秒
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs.max(1);
        self
    }
}

impl Default for XliffTranslationConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// CLI参数结构
#[derive(Parser, Debug)]
#[command(author, version, about = "XLIFF翻译填充工具 - 为缺少译文的trans-unit生成target", long_about = None)]
pub struct Cli {
    /// 输入XLIFF文件或目录
    #[arg(short, long, value_name = "FILE_OR_DIR")]
    pub input: PathBuf,

    /// 源语言 (语言名称如 english，或代码如 en)
    #[arg(short, long, default_value = service_config::DEFAULT_SOURCE_LANG)]
    pub source_lang: String,

    /// 目标语言 (语言名称如 spanish，或代码如 es)
    #[arg(short, long, default_value = service_config::DEFAULT_TARGET_LANG)]
    pub target_lang: String,

    /// 输入文件扩展名
    #[arg(
        short,
        long,
        default_value = xliff_config::DEFAULT_EXTENSION,
        value_parser = parse_extension
    )]
    pub ext: String,

    /// 翻译后端
    #[arg(short, long, value_enum, default_value_t = TranslatorBackend::Google)]
    pub backend: TranslatorBackend,

    /// 翻译API地址 (仅api后端，默认 localhost:1188)
    #[arg(short, long, value_name = "URL")]
    pub api: Option<String>,

    /// HTTP请求超时时间（秒）
    #[arg(long, default_value_t = service_config::REQUEST_TIMEOUT_SECONDS)]
    pub timeout: u64,

    /// 详细输出模式
    #[arg(short, long)]
    pub verbose: bool,

    /// 静默模式 (仅输出错误)
    #[arg(short, long)]
    pub quiet: bool,

    /// 显示性能统计
    #[arg(long)]
    pub stats: bool,
}

/// 校验 `--ext`，接受 `xml`/`xlf`/`xliff`（大小写不敏感，允许前导点）
fn parse_extension(value: &str) -> Result<String, String> {
    if is_supported_extension(value) {
        Ok(value.trim_start_matches('.').to_lowercase())
    } else {
        Err(format!(
            "不支持的扩展名 '{}'，可选: {}",
            value,
            xliff_config::SUPPORTED_EXTENSIONS.join(", ")
        ))
    }
}

impl Cli {
    /// 由命令行参数构建翻译配置
    pub fn to_config(&self) -> XliffTranslationConfig {
        XliffTranslationConfig::new()
            .with_source_lang(&self.source_lang)
            .with_target_lang(&self.target_lang)
            .with_file_extension(&self.ext)
            .with_backend(self.backend)
            .with_api_url(get_api_url(self.api.as_deref()))
            .with_timeout_secs(self.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = XliffTranslationConfig::default();

        assert_eq!(config.source_lang(), "english");
        assert_eq!(config.target_lang(), "spanish");
        assert_eq!(config.file_extension(), "xlf");
        assert_eq!(config.backend(), TranslatorBackend::Google);
        assert_eq!(config.api_url(), api_config::DEFAULT_API_URL);
        assert_eq!(config.timeout_secs(), 30);
    }

    #[test]
    fn test_config_builder() {
        let config = XliffTranslationConfig::new()
            .with_source_lang("en")
            .with_target_lang("de")
            .with_file_extension(".XLIFF")
            .with_backend(TranslatorBackend::Api)
            .with_api_url("http://127.0.0.1:9000/translate")
            .with_timeout_secs(0);

        assert_eq!(config.source_lang(), "en");
        assert_eq!(config.target_lang(), "de");
        assert_eq!(config.file_extension(), "xliff");
        assert_eq!(config.backend(), TranslatorBackend::Api);
        assert_eq!(config.api_url(), "http://127.0.0.1:9000/translate");
        assert_eq!(config.timeout_secs(), 1);
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["xliff-translate", "-i", "messages.xlf"]).unwrap();
        let config = cli.to_config();

        assert_eq!(cli.input, PathBuf::from("messages.xlf"));
        assert_eq!(config.source_lang(), "english");
        assert_eq!(config.target_lang(), "spanish");
        assert_eq!(config.file_extension(), "xlf");
        assert_eq!(config.backend(), TranslatorBackend::Google);
        assert_eq!(config.api_url(), api_config::DEFAULT_API_URL);
        assert!(!cli.stats);
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from([
            "xliff-translate",
            "--input",
            "locale",
            "-s",
            "en",
            "-t",
            "french",
            "-e",
            "xliff",
            "-b",
            "api",
            "-a",
            "http://10.0.0.2:1188/translate",
            "--timeout",
            "5",
            "--stats",
        ])
        .unwrap();
        let config = cli.to_config();

        assert_eq!(config.target_lang(), "french");
        assert_eq!(config.file_extension(), "xliff");
        assert_eq!(config.backend(), TranslatorBackend::Api);
        assert_eq!(config.api_url(), "http://10.0.0.2:1188/translate");
        assert_eq!(config.timeout_secs(), 5);
        assert!(cli.stats);
    }

    #[test]
    fn test_cli_extension_values() {
        let cli = Cli::try_parse_from(["xliff-translate", "-i", "a.XLF", "-e", ".XLF"]).unwrap();
        assert_eq!(cli.ext, "xlf");

        let result = Cli::try_parse_from(["xliff-translate", "-i", "a.po", "-e", "po"]);
        assert!(result.is_err());
    }
}
