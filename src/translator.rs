//! 翻译器模块
//!
//! 定义翻译后端的统一接口 `Translator`，以及XLIFF处理核心使用的
//! 失败回退边界 `translate_with_fallback`。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use crate::api_constants::service_config;
use crate::config::{TranslatorBackend, XliffTranslationConfig};
use crate::error::Result;
use crate::google_translator::GoogleWebTranslator;
use crate::translation_error;
use crate::utils::{is_blank, split_whitespace_bounds};

/// 翻译后端接口
///
/// 语言标识按调用方给出的原样传入，是否需要解析由具体后端决定。
#[async_trait]
pub trait Translator: Send + Sync {
    /// 后端名称，用于日志
    fn name(&self) -> &str;

    /// 翻译一段文本
    async fn translate(&self, text: &str, source_lang: &str, target_lang: &str) -> Result<String>;
}

/// 单个文本片段的翻译结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentTranslation {
    /// 空文本或纯空白，未调用后端
    Blank(String),
    /// 翻译成功
    Translated(String),
    /// 翻译失败，保留原文
    Fallback(String),
}

impl FragmentTranslation {
    /// 最终写入文档的文本
    pub fn into_text(self) -> String {
        match self {
            FragmentTranslation::Blank(text)
            | FragmentTranslation::Translated(text)
            | FragmentTranslation::Fallback(text) => text,
        }
    }

    /// 是否因失败回退到原文
    pub fn is_fallback(&self) -> bool {
        matches!(self, FragmentTranslation::Fallback(_))
    }
}

/// 翻译单个片段，任何后端错误都降级为原文
///
/// 首尾空白不交给后端，翻译完成后原样拼回。失败时输出一条 `warn!`
/// 记录，调用方可以通过返回值统计降级的片段数。
pub async fn translate_with_fallback(
    translator: &dyn Translator,
    text: &str,
    source_lang: &str,
    target_lang: &str,
) -> FragmentTranslation {
    if is_blank(text) {
        return FragmentTranslation::Blank(text.to_string());
    }

    let (leading, core, trailing) = split_whitespace_bounds(text);

    match translator.translate(core, source_lang, target_lang).await {
        Ok(translated) => {
            debug!("翻译片段: '{}' -> '{}'", core, translated);
            FragmentTranslation::Translated(format!("{}{}{}", leading, translated, trailing))
        }
        Err(e) => {
            warn!(
                backend = translator.name(),
                fragment = core,
                error = %e,
                "⚠️  翻译失败，保留原文"
            );
            FragmentTranslation::Fallback(text.to_string())
        }
    }
}

/// 根据配置创建翻译后端
pub fn build_translator(config: &XliffTranslationConfig) -> Result<Box<dyn Translator>> {
    let translator: Box<dyn Translator> = match config.backend() {
        TranslatorBackend::Google => Box::new(GoogleWebTranslator::new(config.timeout_secs())?),
        TranslatorBackend::Api => Box::new(ApiTranslator::new(
            config.api_url(),
            config.timeout_secs(),
        )?),
    };

    Ok(translator)
}

/// 通用JSON翻译API后端
///
/// 请求体为 `{"text", "source_lang", "target_lang"}`，响应可以是带
/// `data`/`text`/`result` 字段的JSON，也可以是纯文本。
pub struct ApiTranslator {
    client: Client,
    api_url: String,
}

impl ApiTranslator {
    /// 创建API翻译器
    pub fn new(api_url: &str, timeout_secs: u64) -> Result<Self> {
        if !crate::api_constants::is_valid_api_url(api_url) {
            return Err(translation_error!(config, "api_url", format!("无效的API地址: {}", api_url)));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| translation_error!(network, format!("创建HTTP客户端失败: {}", e)))?;

        Ok(Self {
            client,
            api_url: api_url.to_string(),
        })
    }
}

#[async_trait]
impl Translator for ApiTranslator {
    fn name(&self) -> &str {
        "api"
    }

    async fn translate(&self, text: &str, source_lang: &str, target_lang: &str) -> Result<String> {
        if text.chars().count() > service_config::MAX_TEXT_LENGTH {
            return Err(translation_error!(
                input_validation,
                format!("{}...", text.chars().take(20).collect::<String>()),
                format!("文本超过 {} 个字符", service_config::MAX_TEXT_LENGTH)
            ));
        }

        // 发送翻译请求
        let response = self
            .client
            .post(&self.api_url)
            .json(&json!({
                "text": text,
                "source_lang": source_lang,
                "target_lang": target_lang
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(translation_error!(
                translation_api,
                status.as_u16(),
                body,
                self.api_url
            ));
        }

        let response_text = response.text().await?;
        parse_api_response(&response_text)
    }
}

/// 解析翻译API的响应体
pub fn parse_api_response(response_text: &str) -> Result<String> {
    // 尝试解析JSON响应
    let translated_text =
        if let Ok(json_val) = serde_json::from_str::<serde_json::Value>(response_text) {
            json_val
                .get("data")
                .or_else(|| json_val.get("text"))
                .or_else(|| json_val.get("result"))
                .and_then(|v| v.as_str())
                .unwrap_or(response_text)
                .to_string()
        } else {
            response_text.to_string()
        };

    let translated_text = translated_text.trim();
    if translated_text.is_empty() {
        return Err(translation_error!(network, "翻译API返回了空结果"));
    }

    Ok(translated_text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TranslationError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct SuffixTranslator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Translator for SuffixTranslator {
        fn name(&self) -> &str {
            "suffix"
        }

        async fn translate(&self, text: &str, _source: &str, target: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("{}_{}", text, target))
        }
    }

    struct FailingTranslator;

    #[async_trait]
    impl Translator for FailingTranslator {
        fn name(&self) -> &str {
            "failing"
        }

        async fn translate(&self, _text: &str, _source: &str, _target: &str) -> Result<String> {
            Err(translation_error!(network, "quota exceeded", 429))
        }
    }

    #[tokio::test]
    async fn test_fallback_preserves_whitespace() {
        let translator = SuffixTranslator {
            calls: AtomicUsize::new(0),
        };
        let result = translate_with_fallback(&translator, " world\n", "english", "es").await;

        assert_eq!(result, FragmentTranslation::Translated(" world_es\n".to_string()));
        assert_eq!(translator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_blank_text_skips_backend() {
        let translator = SuffixTranslator {
            calls: AtomicUsize::new(0),
        };

        for text in ["", "  ", "\n\t"] {
            let result = translate_with_fallback(&translator, text, "english", "es").await;
            assert_eq!(result, FragmentTranslation::Blank(text.to_string()));
        }
        assert_eq!(translator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failure_returns_original_text() {
        let result = translate_with_fallback(&FailingTranslator, " Hello ", "english", "es").await;

        assert!(result.is_fallback());
        assert_eq!(result.into_text(), " Hello ");
    }

    #[test]
    fn test_parse_api_response() {
        assert_eq!(parse_api_response(r#"{"data": "Hola"}"#).unwrap(), "Hola");
        assert_eq!(parse_api_response(r#"{"text": "Bonjour"}"#).unwrap(), "Bonjour");
        assert_eq!(parse_api_response(r#"{"result": " Hallo "}"#).unwrap(), "Hallo");
        assert_eq!(parse_api_response("Ciao").unwrap(), "Ciao");
        assert!(parse_api_response("   ").is_err());
    }

    #[test]
    fn test_api_translator_rejects_invalid_url() {
        let result = ApiTranslator::new("localhost:1188", 5);
        assert!(matches!(result, Err(TranslationError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_api_translator_rejects_oversized_text() {
        let translator = ApiTranslator::new("http://localhost:1188/translate", 5).unwrap();
        let text = "a".repeat(service_config::MAX_TEXT_LENGTH + 1);

        let result = translator.translate(&text, "en", "es").await;
        assert!(matches!(result, Err(TranslationError::InputValidation { .. })));
    }
}
