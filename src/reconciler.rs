//! trans-unit 对齐模块
//!
//! 遍历XLIFF文档中的每个 `trans-unit`，为缺少译文的单元补全 `target`：
//! 前导文本和各子元素的尾随文本交给翻译器，子元素本身（XLIFF内联代码）
//! 连同属性和内部文本原样复制。

use markup5ever_rcdom::{Handle, RcDom};
use tracing::{debug, info, warn};
use xml5ever::{LocalName, QualName};

use crate::translator::{translate_with_fallback, FragmentTranslation, Translator};
use crate::xliff_document::{
    append_child, child_index, child_markup, element_attrs, element_name, find_xliff_child,
    find_xliff_elements, has_content, insert_child, leading_text, new_element, new_text,
    preceding_whitespace, tail_text,
};

/// 一次对齐的统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileStats {
    /// 找到的trans-unit数量
    pub units_total: usize,
    /// 本次补全了译文的单元
    pub units_translated: usize,
    /// 已有译文、保持不变的单元
    pub units_unchanged: usize,
    /// 没有source、被跳过的单元
    pub units_without_source: usize,
    /// 翻译成功的片段
    pub fragments_translated: usize,
    /// 翻译失败、保留原文的片段
    pub fragments_failed: usize,
    /// 空白片段（未调用翻译器）
    pub fragments_blank: usize,
}

impl ReconcileStats {
    /// 是否有片段因翻译失败保留了原文
    pub fn is_degraded(&self) -> bool {
        self.fragments_failed > 0
    }

    fn record(&mut self, fragment: &FragmentTranslation) {
        match fragment {
            FragmentTranslation::Blank(_) => self.fragments_blank += 1,
            FragmentTranslation::Translated(_) => self.fragments_translated += 1,
            FragmentTranslation::Fallback(_) => self.fragments_failed += 1,
        }
    }
}

/// 对齐后的文档及统计
pub struct ReconciledDocument {
    pub dom: RcDom,
    pub stats: ReconcileStats,
}

/// 单个trans-unit的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnitOutcome {
    NoSource,
    Unchanged,
    Translated,
}

/// 新建target的内容，先在树外构建，完成后一次性挂到target上
struct TargetContent {
    text: String,
    inline: Vec<Handle>,
}

/// 为文档中所有缺少译文的trans-unit补全target
///
/// 按文档顺序逐个处理，翻译调用串行执行。翻译失败不会中断处理，
/// 对应片段保留原文并计入 `fragments_failed`。
pub async fn reconcile(
    dom: RcDom,
    source_lang: &str,
    target_lang: &str,
    translator: &dyn Translator,
) -> ReconciledDocument {
    let mut stats = ReconcileStats::default();
    let units = find_xliff_elements(&dom.document, "trans-unit");

    info!(
        "📝 找到 {} 个trans-unit ({} -> {}, 后端: {})",
        units.len(),
        source_lang,
        target_lang,
        translator.name()
    );

    for unit in &units {
        stats.units_total += 1;
        let outcome = reconcile_unit(unit, source_lang, target_lang, translator, &mut stats).await;
        debug!(unit = %unit_id(unit), ?outcome, "trans-unit处理完成");

        match outcome {
            UnitOutcome::NoSource => stats.units_without_source += 1,
            UnitOutcome::Unchanged => stats.units_unchanged += 1,
            UnitOutcome::Translated => stats.units_translated += 1,
        }
    }

    info!(
        "✅ 对齐完成: 翻译 {} 个, 已有译文 {} 个, 缺少source {} 个",
        stats.units_translated, stats.units_unchanged, stats.units_without_source
    );
    if stats.is_degraded() {
        warn!(
            "⚠️  {} 个片段翻译失败，输出中保留了原文",
            stats.fragments_failed
        );
    }

    ReconciledDocument { dom, stats }
}

async fn reconcile_unit(
    unit: &Handle,
    source_lang: &str,
    target_lang: &str,
    translator: &dyn Translator,
    stats: &mut ReconcileStats,
) -> UnitOutcome {
    let Some(source) = find_xliff_child(unit, "source") else {
        return UnitOutcome::NoSource;
    };

    let target = match find_xliff_child(unit, "target") {
        Some(target) => target,
        None => insert_target_after(unit, &source),
    };

    if has_content(&target) {
        return UnitOutcome::Unchanged;
    }

    let content = build_target_content(&source, source_lang, target_lang, translator, stats).await;
    attach_target_content(&target, content);

    UnitOutcome::Translated
}

/// 在source之后插入空的target，沿用source的命名空间、前缀和缩进
fn insert_target_after(unit: &Handle, source: &Handle) -> Handle {
    let target_name = match element_name(source) {
        Some(name) => QualName::new(name.prefix.clone(), name.ns.clone(), LocalName::from("target")),
        None => QualName::new(None, Default::default(), LocalName::from("target")),
    };
    let target = new_element(target_name, Vec::new());

    let source_index = child_index(unit, source).unwrap_or_else(|| unit.children.borrow().len());
    let mut insert_at = source_index + 1;

    if let Some(indentation) = preceding_whitespace(unit, source_index) {
        insert_child(unit, insert_at, new_text(&indentation));
        insert_at += 1;
    }
    insert_child(unit, insert_at, target.clone());

    target
}

async fn build_target_content(
    source: &Handle,
    source_lang: &str,
    target_lang: &str,
    translator: &dyn Translator,
    stats: &mut ReconcileStats,
) -> TargetContent {
    let source_text = leading_text(source);
    let translated = translate_with_fallback(translator, &source_text, source_lang, target_lang).await;
    stats.record(&translated);

    let mut content = TargetContent {
        text: translated.into_text(),
        inline: Vec::new(),
    };

    for (index, child) in child_markup(source) {
        // 内联代码的属性和内部文本原样复制，不翻译；注释和处理指令只保留其后的文本
        if let Some(name) = element_name(&child).cloned() {
            let copy = new_element(name, element_attrs(&child));
            let inner_text = leading_text(&child);
            if !inner_text.is_empty() {
                append_child(&copy, new_text(&inner_text));
            }
            content.inline.push(copy);
        }

        let tail = tail_text(source, index);
        if tail.is_empty() {
            continue;
        }
        let translated_tail = translate_with_fallback(translator, &tail, source_lang, target_lang).await;
        stats.record(&translated_tail);
        content.inline.push(new_text(&translated_tail.into_text()));
    }

    content
}

fn attach_target_content(target: &Handle, content: TargetContent) {
    if !content.text.is_empty() {
        insert_child(target, 0, new_text(&content.text));
    }
    for node in content.inline {
        append_child(target, node);
    }
}

fn unit_id(unit: &Handle) -> String {
    element_attrs(unit)
        .iter()
        .find(|attr| attr.name.prefix.is_none() && &*attr.name.local == "id")
        .map(|attr| attr.value.to_string())
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::translation_error;
    use crate::xliff_document::{
        child_elements, document_root, is_xliff_element, parse_document_bytes,
        serialize_document,
    };
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const XLIFF_NS: &str = "urn:oasis:names:tc:xliff:document:1.2";

    /// 按映射表翻译，记录每次调用，指定文本会失败
    struct MappingTranslator {
        mappings: HashMap<&'static str, &'static str>,
        failures: Vec<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    impl MappingTranslator {
        fn new(mappings: &[(&'static str, &'static str)]) -> Self {
            Self {
                mappings: mappings.iter().copied().collect(),
                failures: Vec::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing_on(mut self, text: &'static str) -> Self {
            self.failures.push(text);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Translator for MappingTranslator {
        fn name(&self) -> &str {
            "mapping"
        }

        async fn translate(&self, text: &str, _source: &str, target: &str) -> Result<String> {
            self.calls.lock().unwrap().push(text.to_string());
            if self.failures.contains(&text) {
                return Err(translation_error!(network, "backend unavailable", 503));
            }
            Ok(self
                .mappings
                .get(text)
                .map(|t| t.to_string())
                .unwrap_or_else(|| format!("[{}] {}", target, text)))
        }
    }

    fn xliff(units: &str) -> String {
        format!(
            r#"<xliff xmlns="{}" version="1.2"><file source-language="en" datatype="plaintext" original="app"><body>{}</body></file></xliff>"#,
            XLIFF_NS, units
        )
    }

    async fn run(input: &str, translator: &MappingTranslator) -> (RcDom, ReconcileStats, String) {
        let dom = parse_document_bytes(input.as_bytes()).unwrap();
        let ReconciledDocument { dom, stats } = reconcile(dom, "english", "spanish", translator).await;
        let output = String::from_utf8(serialize_document(&dom).unwrap()).unwrap();
        (dom, stats, output)
    }

    fn units(dom: &RcDom) -> Vec<Handle> {
        find_xliff_elements(&document_root(dom).unwrap(), "trans-unit")
    }

    #[tokio::test]
    async fn test_translates_text_and_tails_but_copies_inline_codes() {
        let input = xliff(r#"<trans-unit id="1"><source>Hello<bpt id="1">x</bpt>world</source></trans-unit>"#);
        let translator = MappingTranslator::new(&[("Hello", "Hola"), ("world", "mundo")]);

        let (dom, stats, output) = run(&input, &translator).await;

        assert!(output.contains(r#"<target>Hola<bpt id="1">x</bpt>mundo</target>"#));
        assert_eq!(translator.calls(), vec!["Hello", "world"]);
        assert_eq!(stats.units_translated, 1);
        assert_eq!(stats.fragments_translated, 2);

        // target是source之后的下一个元素
        let unit = &units(&dom)[0];
        let elements: Vec<Handle> = child_elements(unit).into_iter().map(|(_, e)| e).collect();
        assert_eq!(elements.len(), 2);
        assert!(is_xliff_element(&elements[0], "source"));
        assert!(is_xliff_element(&elements[1], "target"));
    }

    #[tokio::test]
    async fn test_second_run_changes_nothing() {
        let input = xliff(
            r#"<trans-unit id="1"><source>Hello<bpt id="1">x</bpt>world</source></trans-unit><trans-unit id="2"><source>Bye</source><target/></trans-unit>"#,
        );
        let first = MappingTranslator::new(&[("Hello", "Hola"), ("world", "mundo")]);
        let (_, first_stats, first_output) = run(&input, &first).await;
        assert_eq!(first_stats.units_translated, 2);

        let second = MappingTranslator::new(&[]);
        let (_, second_stats, second_output) = run(&first_output, &second).await;

        assert!(second.calls().is_empty());
        assert_eq!(second_stats.units_unchanged, 2);
        assert_eq!(second_stats.units_translated, 0);
        assert_eq!(first_output, second_output);
    }

    #[tokio::test]
    async fn test_unit_without_source_is_untouched() {
        let input = xliff(r#"<trans-unit id="1"><note>no source here</note></trans-unit>"#);
        let translator = MappingTranslator::new(&[]);

        let (dom, stats, output) = run(&input, &translator).await;

        assert!(!output.contains("<target"));
        assert!(find_xliff_child(&units(&dom)[0], "target").is_none());
        assert_eq!(stats.units_without_source, 1);
        assert!(translator.calls().is_empty());
    }

    #[tokio::test]
    async fn test_existing_targets() {
        let input = xliff(
            r#"<trans-unit id="empty"><source>Save</source><target/></trans-unit><trans-unit id="done"><source>Open</source><target>Abrir</target></trans-unit>"#,
        );
        let translator = MappingTranslator::new(&[("Save", "Guardar")]);

        let (dom, stats, output) = run(&input, &translator).await;

        assert!(output.contains("<target>Guardar</target>"));
        assert!(output.contains("<target>Abrir</target>"));
        assert_eq!(output.matches("<target").count(), 2);
        assert_eq!(translator.calls(), vec!["Save"]);
        assert_eq!(stats.units_translated, 1);
        assert_eq!(stats.units_unchanged, 1);

        // 已有的空target被填充，没有再插入新的target
        let first = &units(&dom)[0];
        let targets = child_elements(first)
            .into_iter()
            .filter(|(_, e)| is_xliff_element(e, "target"))
            .count();
        assert_eq!(targets, 1);
    }

    #[tokio::test]
    async fn test_inline_elements_mirror_tags_and_attributes() {
        let input = xliff(
            r#"<trans-unit id="1"><source>Click <g id="1" ctype="x-html-a" xid="link">here</g> to <x id="2" ctype="lb"/> continue</source></trans-unit>"#,
        );
        let translator = MappingTranslator::new(&[
            ("Click", "Haga clic"),
            ("here", "aquí"),
            ("to", "para"),
            ("continue", "continuar"),
        ]);

        let (_, stats, output) = run(&input, &translator).await;

        assert!(output.contains(
            r#"<target>Haga clic <g id="1" ctype="x-html-a" xid="link">here</g> para <x id="2" ctype="lb"/> continuar</target>"#
        ));
        assert!(!translator.calls().contains(&"here".to_string()));
        assert_eq!(stats.fragments_translated, 3);
    }

    #[tokio::test]
    async fn test_text_after_comment_is_translated() {
        let input = xliff(
            r#"<trans-unit id="1"><source>Hello<!-- greeting --> world</source></trans-unit><trans-unit id="2"><source><!-- lead -->Bye</source></trans-unit>"#,
        );
        let translator =
            MappingTranslator::new(&[("Hello", "Hola"), ("world", "mundo"), ("Bye", "Adiós")]);

        let (_, stats, output) = run(&input, &translator).await;

        assert!(output.contains("<target>Hola mundo</target>"));
        assert!(output.contains("<target>Adiós</target>"));
        assert_eq!(translator.calls(), vec!["Hello", "world", "Bye"]);
        assert_eq!(stats.fragments_translated, 3);

        // 再次运行不会重复追加
        let second = MappingTranslator::new(&[]);
        let (_, second_stats, _) = run(&output, &second).await;
        assert!(second.calls().is_empty());
        assert_eq!(second_stats.units_unchanged, 2);
    }

    #[tokio::test]
    async fn test_failed_fragment_keeps_source_text() {
        let input = xliff(
            r#"<trans-unit id="1"><source>Broken</source></trans-unit><trans-unit id="2"><source>Hello</source></trans-unit>"#,
        );
        let translator = MappingTranslator::new(&[("Hello", "Hola")]).failing_on("Broken");

        let (_, stats, output) = run(&input, &translator).await;

        assert!(output.contains("<target>Broken</target>"));
        assert!(output.contains("<target>Hola</target>"));
        assert_eq!(stats.units_translated, 2);
        assert_eq!(stats.fragments_failed, 1);
        assert_eq!(stats.fragments_translated, 1);
        assert!(stats.is_degraded());
    }

    #[tokio::test]
    async fn test_created_target_follows_source_indentation() {
        let input = format!(
            "<xliff xmlns=\"{}\" version=\"1.2\">\n  <file>\n    <body>\n      <trans-unit id=\"1\">\n        <source>Hello</source>\n      </trans-unit>\n    </body>\n  </file>\n</xliff>",
            XLIFF_NS
        );
        let translator = MappingTranslator::new(&[("Hello", "Hola")]);

        let (_, _, output) = run(&input, &translator).await;

        assert!(output.contains(
            "        <source>Hello</source>\n        <target>Hola</target>\n      </trans-unit>"
        ));
    }

    #[tokio::test]
    async fn test_units_processed_in_document_order() {
        let input = xliff(
            r#"<group id="g1"><trans-unit id="1"><source>one</source></trans-unit><group id="g2"><trans-unit id="2"><source>two</source></trans-unit></group></group><trans-unit id="3"><source>three</source></trans-unit>"#,
        );
        let translator = MappingTranslator::new(&[]);

        let (_, stats, output) = run(&input, &translator).await;

        assert_eq!(translator.calls(), vec!["one", "two", "three"]);
        assert_eq!(stats.units_total, 3);
        assert!(output.contains("<target>[spanish] two</target>"));
    }

    #[tokio::test]
    async fn test_blank_source_creates_empty_target() {
        let input = xliff(r#"<trans-unit id="1"><source><ph id="1"/></source></trans-unit>"#);
        let translator = MappingTranslator::new(&[]);

        let (_, stats, output) = run(&input, &translator).await;

        assert!(output.contains(r#"<target><ph id="1"/></target>"#));
        assert!(translator.calls().is_empty());
        assert_eq!(stats.fragments_blank, 1);
        assert_eq!(stats.units_translated, 1);
    }

    #[tokio::test]
    async fn test_units_outside_namespace_are_ignored() {
        let input = r#"<xliff version="1.2"><file><body><trans-unit id="1"><source>Hello</source></trans-unit></body></file></xliff>"#;
        let translator = MappingTranslator::new(&[]);

        let (_, stats, output) = run(input, &translator).await;

        assert_eq!(stats.units_total, 0);
        assert!(!output.contains("<target"));
    }

    #[tokio::test]
    async fn test_prefixed_namespace_is_reused_for_target() {
        let input = format!(
            r#"<x:xliff xmlns:x="{}" version="1.2"><x:file><x:body><x:trans-unit id="1"><x:source>Hello</x:source></x:trans-unit></x:body></x:file></x:xliff>"#,
            XLIFF_NS
        );
        let translator = MappingTranslator::new(&[("Hello", "Hola")]);

        let (_, _, output) = run(&input, &translator).await;

        assert!(output.contains("<x:target>Hola</x:target>"));
        assert_eq!(output.matches("xmlns:x=").count(), 1);
    }
}
