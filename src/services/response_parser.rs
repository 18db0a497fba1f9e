//! 响应解析 - 业务能力层
//!
//! 服务端的响应是一段类 XML 的文本，这里用两个互不依赖的提取过程扫描：
//!
//! 1. 自闭合的拼写标记 `<error from="N" to="M" word="W" corrections="a,b"/>`
//! 2. 成对的语法标记 `<error from="N" to="M">...<em>...</em>...</error>`
//!
//! 这是一个尽力而为的扫描器，不是校验型解析器：无法识别的片段逐条跳过，
//! 不会产生残缺的标注，也不会中断整个响应。

use std::collections::HashMap;

use once_cell::sync::Lazy;
use quick_xml::escape::unescape;
use regex::Regex;

use crate::models::AnnotationSpan;

/// `<em>` 内容以此开头时，表示"删除该区间"而不是"替换为文本"
pub const REMOVE_SENTINEL: &str = "_remove";

static SELF_CLOSING_ERROR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<error\b([^<>]*?)/>").expect("拼写标记正则无效"));

static OPEN_ERROR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<error\b([^<>]*)>").expect("语法标记正则无效"));

static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z_][\w.-]*)\s*=\s*"([^"]*)""#).expect("属性正则无效")
});

static INLINE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<(/?)([A-Za-z][\w-]*)[^<>]*?(/?)>").expect("内联标签正则无效"));

const ERROR_CLOSE: &str = "</error>";
const ERROR_OPEN: &str = "<error";

/// 一次响应的解析结果
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ParsedResponse {
    pub spans: Vec<AnnotationSpan>,
    /// 被跳过的片段，仅用于日志
    pub skipped: Vec<String>,
}

/// 解析完整的响应文本
pub fn parse_response(response: &str) -> ParsedResponse {
    let mut parsed = ParsedResponse::default();
    extract_spelling(response, &mut parsed);
    extract_grammar(response, &mut parsed);
    parsed
}

fn extract_spelling(response: &str, parsed: &mut ParsedResponse) {
    for caps in SELF_CLOSING_ERROR.captures_iter(response) {
        let fragment = &caps[0];
        let attrs = parse_attributes(&caps[1]);
        let span = span_range(&attrs).and_then(|(start, end)| {
            let word = attrs.get("word")?;
            let corrections = attrs
                .get("corrections")
                .map(|c| split_corrections(c))
                .unwrap_or_default();
            Some(AnnotationSpan::spelling(start, end, word.clone(), corrections))
        });
        match span {
            Some(span) => parsed.spans.push(span),
            None => parsed.skipped.push(fragment.to_string()),
        }
    }
}

fn extract_grammar(response: &str, parsed: &mut ParsedResponse) {
    for caps in OPEN_ERROR.captures_iter(response) {
        let attr_text = &caps[1];
        // 自闭合标记属于拼写过程
        if attr_text.trim_end().ends_with('/') {
            continue;
        }
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let rest = &response[whole.end()..];
        let close = rest.find(ERROR_CLOSE);
        let next_open = rest.find(ERROR_OPEN);
        let inner = match (close, next_open) {
            (Some(c), Some(o)) if o < c => None,
            (Some(c), _) => Some(&rest[..c]),
            (None, _) => None,
        };
        let Some(inner) = inner else {
            parsed.skipped.push(whole.as_str().to_string());
            continue;
        };

        let attrs = parse_attributes(attr_text);
        match span_range(&attrs) {
            Some((start, end)) => {
                let replacement = extract_inline_text(inner);
                let corrections = if replacement.is_empty() {
                    Vec::new()
                } else {
                    vec![replacement]
                };
                parsed
                    .spans
                    .push(AnnotationSpan::grammar(start, end, corrections));
            }
            None => parsed.skipped.push(whole.as_str().to_string()),
        }
    }
}

fn parse_attributes(text: &str) -> HashMap<String, String> {
    ATTRIBUTE
        .captures_iter(text)
        .map(|c| (c[1].to_string(), decode_entities(&c[2])))
        .collect()
}

/// 读取 from / to，要求 `from <= to`
fn span_range(attrs: &HashMap<String, String>) -> Option<(usize, usize)> {
    let start = attrs.get("from")?.trim().parse::<usize>().ok()?;
    let end = attrs.get("to")?.trim().parse::<usize>().ok()?;
    (start <= end).then_some((start, end))
}

fn split_corrections(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

/// 递归提取内联内容
///
/// 文本节点按原样拼接；`<em>` 的内容被提取后拼入外层，
/// 以 [`REMOVE_SENTINEL`] 开头的 `<em>` 不贡献任何文本。其他标签只保留内容。
fn extract_inline_text(inner: &str) -> String {
    // 每一层：(是否为 em, 已收集的文本)
    let mut stack: Vec<(bool, String)> = vec![(false, String::new())];
    let mut last = 0;

    for caps in INLINE_TAG.captures_iter(inner) {
        let Some(tag) = caps.get(0) else {
            continue;
        };
        if let Some(top) = stack.last_mut() {
            top.1.push_str(&decode_entities(&inner[last..tag.start()]));
        }
        last = tag.end();

        let closing = !caps[1].is_empty();
        let self_closing = !caps[3].is_empty();
        if &caps[2] != "em" || self_closing {
            continue;
        }
        if !closing {
            stack.push((true, String::new()));
        } else if stack.len() > 1 {
            close_em(&mut stack);
        }
    }
    if let Some(top) = stack.last_mut() {
        top.1.push_str(&decode_entities(&inner[last..]));
    }
    // 未闭合的 em 视为在末尾闭合
    while stack.len() > 1 {
        close_em(&mut stack);
    }

    let text = stack.pop().map(|(_, text)| text).unwrap_or_default();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn close_em(stack: &mut Vec<(bool, String)>) {
    if let Some((_, content)) = stack.pop() {
        if content.trim_start().starts_with(REMOVE_SENTINEL) {
            return;
        }
        if let Some(parent) = stack.last_mut() {
            parent.1.push_str(&content);
        }
    }
}

/// 解码预定义实体和数字字符引用，无法解码时保留原文
pub fn decode_entities(text: &str) -> String {
    match unescape(text) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => text.to_string(),
    }
}
