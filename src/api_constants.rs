/// 翻译服务与XLIFF处理相关的常量配置
///
/// 该文件定义了所有翻译后端、XLIFF格式和输出命名相关的常量，方便统一管理和维护

/// 翻译API配置
pub mod api_config {
    /// Google翻译移动版网页地址
    pub const GOOGLE_WEB_URL: &str = "https://translate.google.com/m";

    /// 本地开发API地址
    pub const LOCAL_API_URL: &str = "http://localhost:1188/translate";

    /// 默认通用翻译API地址
    pub const DEFAULT_API_URL: &str = LOCAL_API_URL;

    /// 请求Google网页时使用的User-Agent
    pub const DEFAULT_USER_AGENT: &str =
        "Mozilla/5.0 (compatible; xliff-translate/0.1.0; +https://github.com/xliff-translate)";
}

/// 翻译服务配置
pub mod service_config {
    /// 默认源语言
    pub const DEFAULT_SOURCE_LANG: &str = "english";

    /// 默认目标语言
    pub const DEFAULT_TARGET_LANG: &str = "spanish";

    /// 单次翻译允许的最大字符数
    pub const MAX_TEXT_LENGTH: usize = 5000;

    /// 请求超时时间（秒）
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;
}

/// XLIFF格式配置
pub mod xliff_config {
    /// XLIFF 1.2 命名空间
    pub const XLIFF_NAMESPACE: &str = "urn:oasis:names:tc:xliff:document:1.2";

    /// 默认文件扩展名
    pub const DEFAULT_EXTENSION: &str = "xlf";

    /// 支持的文件扩展名
    pub const SUPPORTED_EXTENSIONS: &[&str] = &["xml", "xlf", "xliff"];

    /// 输出文件名中插入的标记
    pub const OUTPUT_MARKER: &str = "modified";

    /// 内容不参与重新缩进的片段容器元素
    pub const SEGMENT_CONTAINERS: &[&str] = &["source", "target", "seg-source", "note"];
}

/// 错误消息常量
pub mod error_messages {
    /// 文件读取错误
    pub const FILE_READ_ERROR: &str = "无法读取输入文件";

    /// 文件写入错误
    pub const FILE_WRITE_ERROR: &str = "无法写入输出文件";

    /// XML解析错误
    pub const XML_PARSE_ERROR: &str = "XML内容解析失败";

    /// 扩展名不匹配错误
    pub const EXTENSION_MISMATCH: &str = "文件扩展名与声明的扩展名不一致";
}

// 实用工具函数

/// 获取API URL，未指定时使用默认地址
pub fn get_api_url(custom_api: Option<&str>) -> &str {
    if let Some(custom) = custom_api {
        if !custom.trim().is_empty() {
            return custom;
        }
    }

    api_config::DEFAULT_API_URL
}

/// 验证API URL是否有效
pub fn is_valid_api_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// 验证扩展名是否受支持（大小写不敏感，允许前导点）
pub fn is_supported_extension(ext: &str) -> bool {
    let ext = ext.trim_start_matches('.').to_lowercase();
    xliff_config::SUPPORTED_EXTENSIONS.contains(&ext.as_str())
}
