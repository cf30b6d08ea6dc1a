//! XLIFF文档处理模块
//!
//! 提供XML解析、DOM节点操作、序列化和输出路径推导功能。
//! 文档树使用 `markup5ever_rcdom`，由 `xml5ever` 负责解析。

// 标准库导入
use std::borrow::Cow;
use std::cell::RefCell;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

// 第三方crate导入
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom};
use quick_xml::escape::{escape, partial_escape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;
use xml5ever::driver::{parse_document, XmlParseOpts};
use xml5ever::tendril::{StrTendril, TendrilSink};
use xml5ever::{Attribute, LocalName, Namespace, Prefix, QualName};

// 本地模块导入
use crate::api_constants::{error_messages, xliff_config};
use crate::error::{Result, TranslationError};
use crate::translation_error;

/// 每一级缩进使用的空白
const INDENT_UNIT: &str = "  ";

/// `xmlns` 声明属性所在的命名空间
const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// 源文件中某个元素上的命名空间声明，按文档顺序记录
struct NamespaceDeclarations {
    local: String,
    bindings: Vec<(Option<String>, String)>,
}

/// 从文件加载XLIFF文档
///
/// 读取失败返回 `FileOperation`，内容不是格式良好的XML时返回 `XmlParse`。
/// 不做XLIFF schema校验。
pub fn load_document(path: &Path) -> Result<RcDom> {
    let bytes = fs::read(path).map_err(|e| {
        translation_error!(
            file_op,
            path.display(),
            "读取",
            format!("{}: {}", error_messages::FILE_READ_ERROR, e)
        )
    })?;

    debug!("读取文件完成: {} ({} 字节)", path.display(), bytes.len());
    parse_document_bytes(&bytes)
}

/// 把原始字节解析为DOM
///
/// xml5ever会对错误做恢复（例如自动闭合截断的文档），所以先用quick-xml
/// 严格检查格式良好性，同时记录各元素上原有的命名空间声明。
pub fn parse_document_bytes(bytes: &[u8]) -> Result<RcDom> {
    let declarations = scan_well_formed(bytes)?;

    let mut reader = bytes;
    let dom = parse_document(RcDom::default(), XmlParseOpts::default())
        .from_utf8()
        .read_from(&mut reader)
        .map_err(|e| translation_error!(xml_parse, e))?;

    let parse_errors = {
        let errors = dom.errors.borrow();
        if errors.is_empty() {
            None
        } else {
            Some(errors.join("; "))
        }
    };

    if let Some(details) = parse_errors {
        return Err(translation_error!(
            xml_parse,
            format!("{}: {}", error_messages::XML_PARSE_ERROR, details)
        ));
    }

    if document_root(&dom).is_none() {
        return Err(translation_error!(
            xml_parse,
            format!("{}: 缺少根元素", error_messages::XML_PARSE_ERROR)
        ));
    }

    restore_namespace_declarations(&dom, declarations);
    Ok(dom)
}

/// 严格检查XML格式良好性，返回按文档顺序排列的命名空间声明
fn scan_well_formed(bytes: &[u8]) -> Result<Vec<NamespaceDeclarations>> {
    let mut reader = Reader::from_reader(bytes);
    reader.trim_text(false);

    let mut buf = Vec::new();
    let mut open_elements = 0usize;
    let mut declarations = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                open_elements += 1;
                declarations.push(collect_declarations(&e)?);
            }
            Ok(Event::Empty(e)) => declarations.push(collect_declarations(&e)?),
            Ok(Event::End(_)) => {
                open_elements = open_elements
                    .checked_sub(1)
                    .ok_or_else(|| parse_error(reader.buffer_position(), "多余的结束标签"))?;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(parse_error(reader.buffer_position(), e)),
        }
        buf.clear();
    }

    if open_elements > 0 {
        return Err(parse_error(
            reader.buffer_position(),
            format!("文档不完整，{} 个元素未闭合", open_elements),
        ));
    }

    Ok(declarations)
}

fn collect_declarations(start: &BytesStart) -> Result<NamespaceDeclarations> {
    let local = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let mut bindings = Vec::new();

    for attr in start.attributes() {
        let attr = attr.map_err(|e| parse_error(0, format!("<{}> 属性错误: {}", local, e)))?;
        let key = attr.key.as_ref();
        let prefix = if key == b"xmlns" {
            None
        } else if let Some(prefix) = key.strip_prefix(b"xmlns:") {
            Some(String::from_utf8_lossy(prefix).into_owned())
        } else {
            continue;
        };

        let uri = attr
            .unescape_value()
            .map_err(|e| parse_error(0, format!("<{}> 命名空间声明错误: {}", local, e)))?;
        bindings.push((prefix, uri.into_owned()));
    }

    Ok(NamespaceDeclarations { local, bindings })
}

fn parse_error(position: usize, reason: impl std::fmt::Display) -> TranslationError {
    translation_error!(
        xml_parse,
        format!("{} (位置 {}): {}", error_messages::XML_PARSE_ERROR, position, reason)
    )
}

/// 把源文件中的命名空间声明放回对应元素的属性中
///
/// xml5ever只保留解析后的限定名，不保留 `xmlns` 属性。写出时按这些属性
/// 原样输出声明，只在属性值中引用的前缀（如 `xsi:type="xs:string"`）也能保留。
fn restore_namespace_declarations(dom: &RcDom, declarations: Vec<NamespaceDeclarations>) {
    let elements = elements_in_order(&dom.document);
    if elements.len() != declarations.len() {
        debug!(
            "元素数量不一致: DOM {} 个, 扫描 {} 个",
            elements.len(),
            declarations.len()
        );
    }

    for (element, scanned) in elements.iter().zip(declarations) {
        if scanned.bindings.is_empty() {
            continue;
        }
        let NodeData::Element {
            ref name,
            ref attrs,
            ..
        } = element.data
        else {
            continue;
        };
        if &*name.local != scanned.local.as_str() {
            debug!("跳过命名空间声明: <{}> 与 <{}> 不对应", name.local, scanned.local);
            continue;
        }

        let mut attrs = attrs.borrow_mut();
        for (prefix, uri) in scanned.bindings {
            let declaration = declaration_attribute(prefix.as_deref(), &uri);
            if !attrs.iter().any(|attr| attr.name == declaration.name) {
                attrs.push(declaration);
            }
        }
    }
}

fn declaration_attribute(prefix: Option<&str>, uri: &str) -> Attribute {
    let name = match prefix {
        Some(prefix) => QualName::new(
            Some(Prefix::from("xmlns")),
            Namespace::from(XMLNS_NAMESPACE),
            LocalName::from(prefix),
        ),
        None => QualName::new(None, Namespace::from(XMLNS_NAMESPACE), LocalName::from("xmlns")),
    };

    Attribute {
        name,
        value: StrTendril::from_slice(uri),
    }
}

fn is_namespace_declaration(attr: &Attribute) -> bool {
    &*attr.name.ns == XMLNS_NAMESPACE
}

/// 序列化DOM为带UTF-8声明的XML字节
pub fn serialize_document(dom: &RcDom) -> Result<Vec<u8>> {
    let mut writer = XliffWriter::new(Vec::new());

    writer
        .write_document(&dom.document)
        .map_err(|e| anyhow::Error::new(e).context("序列化XML失败"))?;

    Ok(writer.into_inner())
}

/// 保存DOM到文件
///
/// 先在内存中完成序列化，再写入同目录下的临时文件并重命名，
/// 失败时输出路径上不会留下不完整的文件。
pub fn save_document(dom: &RcDom, path: &Path) -> Result<()> {
    let bytes = serialize_document(dom)?;
    let temp_path = temp_sibling_path(path);

    if let Err(e) = fs::write(&temp_path, &bytes) {
        let _ = fs::remove_file(&temp_path);
        return Err(translation_error!(
            file_op,
            path.display(),
            "写入",
            format!("{}: {}", error_messages::FILE_WRITE_ERROR, e)
        ));
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(translation_error!(
            file_op,
            path.display(),
            "重命名",
            format!("{}: {}", error_messages::FILE_WRITE_ERROR, e)
        ));
    }

    debug!("写入文件完成: {} ({} 字节)", path.display(), bytes.len());
    Ok(())
}

/// 根据输入路径推导输出路径：`name.xlf` -> `name.modified.xlf`
///
/// 扩展名比较不区分大小写，只替换最后一次出现的扩展名，保留原后缀的大小写。
/// 路径不以声明的扩展名结尾时返回 `InputValidation`，不做任何文件I/O。
pub fn derive_output_path(path: &Path, file_extension: &str) -> Result<PathBuf> {
    let ext = file_extension.trim().trim_start_matches('.').to_lowercase();
    if ext.is_empty() {
        return Err(translation_error!(
            input_validation,
            path.display(),
            "文件扩展名不能为空"
        ));
    }

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| translation_error!(input_validation, path.display(), "无法识别文件名"))?;

    let suffix = format!(".{}", ext);
    let matches_suffix = file_name.len() >= suffix.len()
        && file_name.is_char_boundary(file_name.len() - suffix.len())
        && file_name[file_name.len() - suffix.len()..].eq_ignore_ascii_case(&suffix);

    if !matches_suffix {
        return Err(translation_error!(
            input_validation,
            path.display(),
            format!("{}，期望 {}", error_messages::EXTENSION_MISMATCH, suffix)
        ));
    }

    let (stem, original_suffix) = file_name.split_at(file_name.len() - suffix.len());
    let output_name = format!("{}.{}{}", stem, xliff_config::OUTPUT_MARKER, original_suffix);

    Ok(path.with_file_name(output_name))
}

fn temp_sibling_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    path.with_file_name(format!(".{}.tmp", file_name))
}

// ---------------------------------------------------------------------------
// DOM节点操作
// ---------------------------------------------------------------------------

/// 文档的根元素
pub fn document_root(dom: &RcDom) -> Option<Handle> {
    dom.document
        .children
        .borrow()
        .iter()
        .find(|child| matches!(child.data, NodeData::Element { .. }))
        .cloned()
}

/// 元素的限定名，非元素节点返回None
pub fn element_name(node: &Handle) -> Option<&QualName> {
    match node.data {
        NodeData::Element { ref name, .. } => Some(name),
        _ => None,
    }
}

/// 元素的属性副本
pub fn element_attrs(node: &Handle) -> Vec<Attribute> {
    match node.data {
        NodeData::Element { ref attrs, .. } => attrs.borrow().clone(),
        _ => Vec::new(),
    }
}

/// 是否为XLIFF 1.2命名空间下指定本地名的元素
pub fn is_xliff_element(node: &Handle, local: &str) -> bool {
    element_name(node)
        .map(|name| &*name.ns == xliff_config::XLIFF_NAMESPACE && &*name.local == local)
        .unwrap_or(false)
}

/// 按文档顺序收集所有XLIFF命名空间下指定本地名的后代元素
pub fn find_xliff_elements(root: &Handle, local: &str) -> Vec<Handle> {
    elements_in_order(root)
        .into_iter()
        .filter(|node| is_xliff_element(node, local))
        .collect()
}

/// 先序遍历收集所有元素（文档顺序）
fn elements_in_order(root: &Handle) -> Vec<Handle> {
    let mut found = Vec::new();
    let mut stack = vec![root.clone()];

    while let Some(node) = stack.pop() {
        if matches!(node.data, NodeData::Element { .. }) {
            found.push(node.clone());
        }

        // 逆序入栈，保证先序遍历的文档顺序
        for child in node.children.borrow().iter().rev() {
            if matches!(child.data, NodeData::Element { .. } | NodeData::Document) {
                stack.push(child.clone());
            }
        }
    }

    found
}

/// 第一个匹配的XLIFF子元素
pub fn find_xliff_child(parent: &Handle, local: &str) -> Option<Handle> {
    parent
        .children
        .borrow()
        .iter()
        .find(|child| is_xliff_element(child, local))
        .cloned()
}

/// 元素的前导文本（第一个非文本子节点之前的文本）
pub fn leading_text(node: &Handle) -> String {
    collect_text_run(&node.children.borrow(), 0)
}

/// 第 `index` 个子节点之后紧跟的文本（tail）
pub fn tail_text(parent: &Handle, index: usize) -> String {
    collect_text_run(&parent.children.borrow(), index + 1)
}

fn collect_text_run(children: &[Handle], start: usize) -> String {
    let mut text = String::new();
    for child in children.iter().skip(start) {
        match child.data {
            NodeData::Text { ref contents } => text.push_str(&contents.borrow()),
            _ => break,
        }
    }
    text
}

/// 元素是否已有内容：非空前导文本或任意子元素
pub fn has_content(node: &Handle) -> bool {
    !leading_text(node).is_empty()
        || node
            .children
            .borrow()
            .iter()
            .any(|child| matches!(child.data, NodeData::Element { .. }))
}

/// 子元素及其在父节点children中的位置
pub fn child_elements(parent: &Handle) -> Vec<(usize, Handle)> {
    parent
        .children
        .borrow()
        .iter()
        .enumerate()
        .filter(|(_, child)| matches!(child.data, NodeData::Element { .. }))
        .map(|(index, child)| (index, child.clone()))
        .collect()
}

/// 所有非文本子节点（元素、注释、处理指令）及其位置
pub fn child_markup(parent: &Handle) -> Vec<(usize, Handle)> {
    parent
        .children
        .borrow()
        .iter()
        .enumerate()
        .filter(|(_, child)| !matches!(child.data, NodeData::Text { .. }))
        .map(|(index, child)| (index, child.clone()))
        .collect()
}

/// 子节点在父节点中的位置
pub fn child_index(parent: &Handle, child: &Handle) -> Option<usize> {
    parent
        .children
        .borrow()
        .iter()
        .position(|candidate| Rc::ptr_eq(candidate, child))
}

/// 紧邻 `index` 之前的纯空白文本节点内容
pub fn preceding_whitespace(parent: &Handle, index: usize) -> Option<String> {
    if index == 0 {
        return None;
    }

    let children = parent.children.borrow();
    match children[index - 1].data {
        NodeData::Text { ref contents } => {
            let text = contents.borrow();
            if !text.is_empty() && text.chars().all(char::is_whitespace) {
                Some(text.to_string())
            } else {
                None
            }
        }
        _ => None,
    }
}

/// 创建游离的元素节点
pub fn new_element(name: QualName, attrs: Vec<Attribute>) -> Handle {
    Node::new(NodeData::Element {
        name,
        attrs: RefCell::new(attrs),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    })
}

/// 创建游离的文本节点
pub fn new_text(text: &str) -> Handle {
    Node::new(NodeData::Text {
        contents: RefCell::new(StrTendril::from_slice(text)),
    })
}

/// 把节点追加为最后一个子节点
pub fn append_child(parent: &Handle, child: Handle) {
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child);
}

/// 把节点插入到指定位置
pub fn insert_child(parent: &Handle, index: usize, child: Handle) {
    child.parent.set(Some(Rc::downgrade(parent)));
    let mut children = parent.children.borrow_mut();
    let index = index.min(children.len());
    children.insert(index, child);
}

// ---------------------------------------------------------------------------
// 序列化
// ---------------------------------------------------------------------------

/// RcDom的XML写出器
///
/// xml5ever在解析时会把 `xmlns` 声明从属性中移除，只保留解析后的限定名，
/// 所以写出时根据作用域栈重新生成命名空间声明。
struct XliffWriter<W: Write> {
    out: W,
    /// 当前作用域内的 (前缀, 命名空间URI) 绑定
    scopes: Vec<(Option<String>, String)>,
}

impl<W: Write> XliffWriter<W> {
    fn new(out: W) -> Self {
        Self {
            out,
            scopes: Vec::new(),
        }
    }

    fn into_inner(self) -> W {
        self.out
    }

    fn write_document(&mut self, document: &Handle) -> io::Result<()> {
        self.out
            .write_all(b"<?xml version='1.0' encoding='UTF-8'?>\n")?;

        for child in document.children.borrow().iter() {
            // 根元素之外的空白由写出器统一换行
            if is_xml_declaration(child) || matches!(child.data, NodeData::Text { .. }) {
                continue;
            }
            self.write_node(child, 0, true)?;
            self.out.write_all(b"\n")?;
        }

        Ok(())
    }

    fn write_node(&mut self, node: &Handle, depth: usize, reformat: bool) -> io::Result<()> {
        match node.data {
            NodeData::Document => {
                for child in node.children.borrow().iter() {
                    self.write_node(child, depth, reformat)?;
                }
                Ok(())
            }
            NodeData::Doctype {
                ref name,
                ref public_id,
                ref system_id,
            } => {
                if !public_id.is_empty() {
                    write!(
                        self.out,
                        "<!DOCTYPE {} PUBLIC \"{}\" \"{}\">",
                        name, public_id, system_id
                    )
                } else if !system_id.is_empty() {
                    write!(self.out, "<!DOCTYPE {} SYSTEM \"{}\">", name, system_id)
                } else {
                    write!(self.out, "<!DOCTYPE {}>", name)
                }
            }
            NodeData::Text { ref contents } => {
                self.out.write_all(escape_text(&contents.borrow()).as_bytes())
            }
            NodeData::Comment { ref contents } => write!(self.out, "<!--{}-->", contents),
            NodeData::ProcessingInstruction {
                ref target,
                ref contents,
            } => {
                if contents.is_empty() {
                    write!(self.out, "<?{}?>", target)
                } else {
                    write!(self.out, "<?{} {}?>", target, contents)
                }
            }
            NodeData::Element {
                ref name,
                ref attrs,
                ..
            } => self.write_element(node, name, &attrs.borrow(), depth, reformat),
        }
    }

    fn write_element(
        &mut self,
        node: &Handle,
        name: &QualName,
        attrs: &[Attribute],
        depth: usize,
        reformat: bool,
    ) -> io::Result<()> {
        let scope_mark = self.scopes.len();
        let mut declarations = Vec::new();

        // 源文件中的声明原样保留在原来的元素上
        for attr in attrs.iter().filter(|attr| is_namespace_declaration(attr)) {
            let prefix = attr.name.prefix.as_ref().map(|_| attr.name.local.to_string());
            let binding = (prefix, attr.value.to_string());
            self.scopes.push(binding.clone());
            declarations.push(binding);
        }

        self.bind(name.prefix.as_deref(), &name.ns, &mut declarations);
        for attr in attrs.iter().filter(|attr| !is_namespace_declaration(attr)) {
            if attr.name.prefix.is_some() {
                self.bind(attr.name.prefix.as_deref(), &attr.name.ns, &mut declarations);
            }
        }

        let tag = qualified_name(name);
        write!(self.out, "<{}", tag)?;
        for (prefix, uri) in &declarations {
            match prefix {
                Some(prefix) => write!(self.out, " xmlns:{}=\"{}\"", prefix, escape_attr(uri))?,
                None => write!(self.out, " xmlns=\"{}\"", escape_attr(uri))?,
            }
        }
        for attr in attrs.iter().filter(|attr| !is_namespace_declaration(attr)) {
            write!(
                self.out,
                " {}=\"{}\"",
                qualified_name(&attr.name),
                escape_attr(&attr.value)
            )?;
        }

        let children = node.children.borrow();
        if children.is_empty() {
            self.out.write_all(b"/>")?;
            self.scopes.truncate(scope_mark);
            return Ok(());
        }
        self.out.write_all(b">")?;

        // 片段容器内的空白属于译文内容，不参与重新缩进
        let child_reformat = reformat && !is_segment_container(name);
        let indent_children = child_reformat
            && children
                .iter()
                .all(|child| !matches!(child.data, NodeData::Text { .. }));

        for child in children.iter() {
            if indent_children {
                write!(self.out, "\n{}", INDENT_UNIT.repeat(depth + 1))?;
            }
            self.write_node(child, depth + 1, child_reformat)?;
        }
        if indent_children {
            write!(self.out, "\n{}", INDENT_UNIT.repeat(depth))?;
        }

        write!(self.out, "</{}>", tag)?;
        self.scopes.truncate(scope_mark);
        Ok(())
    }

    /// 确保 `prefix` 在当前作用域内绑定到 `uri`，必要时记录新的声明
    fn bind(
        &mut self,
        prefix: Option<&str>,
        uri: &str,
        declarations: &mut Vec<(Option<String>, String)>,
    ) {
        if matches!(prefix, Some("xml") | Some("xmlns")) {
            return;
        }

        let current = self
            .scopes
            .iter()
            .rev()
            .find(|(bound, _)| bound.as_deref() == prefix)
            .map(|(_, bound_uri)| bound_uri.as_str());

        let needs_declaration = match current {
            Some(bound_uri) => bound_uri != uri,
            None => !uri.is_empty(),
        };

        if needs_declaration {
            let binding = (prefix.map(str::to_string), uri.to_string());
            self.scopes.push(binding.clone());
            declarations.push(binding);
        }
    }
}

fn is_xml_declaration(node: &Handle) -> bool {
    match node.data {
        NodeData::ProcessingInstruction { ref target, .. } => target.eq_ignore_ascii_case("xml"),
        _ => false,
    }
}

fn is_segment_container(name: &QualName) -> bool {
    &*name.ns == xliff_config::XLIFF_NAMESPACE
        && xliff_config::SEGMENT_CONTAINERS.contains(&&*name.local)
}

fn qualified_name(name: &QualName) -> String {
    match name.prefix {
        Some(ref prefix) => format!("{}:{}", prefix, name.local),
        None => name.local.to_string(),
    }
}

fn escape_text(text: &str) -> Cow<'_, str> {
    partial_escape(text)
}

/// 属性值中的换行和制表符也要转义，否则再次解析时会被规范化为空格
fn escape_attr(text: &str) -> Cow<'_, str> {
    let escaped = escape(text);
    if escaped.contains(|c| c == '\n' || c == '\t') {
        Cow::Owned(escaped.replace('\n', "&#10;").replace('\t', "&#9;"))
    } else {
        escaped
    }
}
