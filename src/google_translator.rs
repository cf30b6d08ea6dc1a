//! Google翻译网页后端
//!
//! 请求 `translate.google.com/m` 的移动版页面，并从返回的HTML中读取译文，
//! 不需要API密钥。语言名称（如 `english`）会先解析为Google语言代码。

// 标准库导入
use std::collections::VecDeque;
use std::time::Duration;

// 第三方crate导入
use async_trait::async_trait;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use reqwest::{Client, StatusCode};
use tracing::debug;
use url::Url;

// 本地模块导入
use crate::api_constants::{api_config, service_config};
use crate::error::Result;
use crate::languages::resolve_google_language;
use crate::translation_error;
use crate::translator::Translator;

/// 译文所在元素的class，按优先级排列
const RESULT_CLASSES: &[&str] = &["result-container", "t0"];

/// Google翻译网页后端
pub struct GoogleWebTranslator {
    client: Client,
    base_url: String,
}

impl GoogleWebTranslator {
    /// 创建Google网页翻译器
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(api_config::DEFAULT_USER_AGENT)
            .build()
            .map_err(|e| translation_error!(network, format!("创建HTTP客户端失败: {}", e)))?;

        Ok(Self {
            client,
            base_url: api_config::GOOGLE_WEB_URL.to_string(),
        })
    }

    /// 构造请求URL
    fn request_url(&self, text: &str, source: &str, target: &str) -> Result<Url> {
        Url::parse_with_params(&self.base_url, &[("tl", target), ("sl", source), ("q", text)])
            .map_err(|e| translation_error!(config, "base_url", e))
    }
}

#[async_trait]
impl Translator for GoogleWebTranslator {
    fn name(&self) -> &str {
        "google"
    }

    async fn translate(&self, text: &str, source_lang: &str, target_lang: &str) -> Result<String> {
        let source = resolve_google_language(source_lang)?;
        let target = resolve_google_language(target_lang)?;
        if target == "auto" {
            return Err(translation_error!(config, "target_lang", "目标语言不能为auto"));
        }

        if source == target {
            return Ok(text.to_string());
        }

        if text.chars().count() > service_config::MAX_TEXT_LENGTH {
            return Err(translation_error!(
                input_validation,
                format!("{}...", text.chars().take(20).collect::<String>()),
                format!("文本超过 {} 个字符", service_config::MAX_TEXT_LENGTH)
            ));
        }

        let url = self.request_url(text, &source, &target)?;
        debug!("请求Google翻译: {} -> {} ({} 字符)", source, target, text.len());

        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(translation_error!(network, "请求过于频繁，已被Google限流", 429));
        }
        if !status.is_success() {
            return Err(translation_error!(
                translation_api,
                status.as_u16(),
                status.canonical_reason().unwrap_or("请求失败"),
                self.base_url
            ));
        }

        let html = response.text().await?;
        extract_google_result(&html).ok_or_else(|| {
            translation_error!(
                translation_api,
                status.as_u16(),
                "响应中没有找到译文",
                self.base_url
            )
        })
    }
}

/// 从Google翻译移动版页面中提取译文
pub fn extract_google_result(html: &str) -> Option<String> {
    let dom = parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())
        .ok()?;

    RESULT_CLASSES.iter().find_map(|class| {
        find_element_with_class(&dom.document, class)
            .map(|node| collect_text(&node).trim().to_string())
            .filter(|text| !text.is_empty())
    })
}

/// 广度优先查找第一个带有指定class的元素
fn find_element_with_class(root: &Handle, class: &str) -> Option<Handle> {
    let mut queue = VecDeque::new();
    queue.push_back(root.clone());

    while let Some(node) = queue.pop_front() {
        if let NodeData::Element { ref attrs, .. } = node.data {
            let has_class = attrs.borrow().iter().any(|attr| {
                &*attr.name.local == "class"
                    && attr.value.split_whitespace().any(|c| c == class)
            });
            if has_class {
                return Some(node.clone());
            }
        }

        for child in node.children.borrow().iter() {
            queue.push_back(child.clone());
        }
    }

    None
}

fn collect_text(node: &Handle) -> String {
    let mut text = String::new();
    if let NodeData::Text { ref contents } = node.data {
        text.push_str(&contents.borrow());
    }
    for child in node.children.borrow().iter() {
        text.push_str(&collect_text(child));
    }
    text
}
