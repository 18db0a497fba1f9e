//! 服务端配置指令
//!
//! 规则配置变化后，在下一行段落文本之前发送一次：
//!
//! ```text
//! <config textlanguage="en" mothertongue="de" grammar="A,B" falsefriends="_NO_RULE" words="" max-sentence-length="0" builtin="SPELL"/>
//! ```

/// 关闭某一类规则时发送的占位值
pub const NO_RULE: &str = "_NO_RULE";

/// 发送给检查服务的规则配置
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServiceOptions {
    pub text_language: String,
    pub mother_tongue: String,
    /// `None` 表示关闭语法规则
    pub grammar: Option<Vec<String>>,
    /// `None` 表示关闭 false friends 规则
    pub false_friends: Option<Vec<String>>,
    /// `None` 表示关闭易混词规则
    pub words: Option<Vec<String>>,
    /// 0 表示不限制
    pub max_sentence_length: u32,
    pub builtin: Vec<String>,
}

impl ServiceOptions {
    /// 序列化为一行自闭合标签（不含换行）
    pub fn to_directive(&self) -> String {
        format!(
            r#"<config textlanguage="{}" mothertongue="{}" grammar="{}" falsefriends="{}" words="{}" max-sentence-length="{}" builtin="{}"/>"#,
            escape_attr(&self.text_language),
            escape_attr(&self.mother_tongue),
            rule_list(self.grammar.as_deref()),
            rule_list(self.false_friends.as_deref()),
            rule_list(self.words.as_deref()),
            self.max_sentence_length,
            escape_attr(&self.builtin.join(",")),
        )
    }
}

fn rule_list(rules: Option<&[String]>) -> String {
    match rules {
        Some(rules) => escape_attr(&rules.join(",")),
        None => NO_RULE.to_string(),
    }
}

/// 转义属性值中的 XML 特殊字符
pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\n' | '\r' => out.push(' '),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_lists_every_attribute() {
        let options = ServiceOptions {
            text_language: "en".to_string(),
            mother_tongue: "de".to_string(),
            grammar: Some(vec!["COMMA_WHICH".to_string(), "DOUBLE_PUNCT".to_string()]),
            false_friends: None,
            words: Some(Vec::new()),
            max_sentence_length: 40,
            builtin: vec!["SPELL".to_string()],
        };

        assert_eq!(
            options.to_directive(),
            r#"<config textlanguage="en" mothertongue="de" grammar="COMMA_WHICH,DOUBLE_PUNCT" falsefriends="_NO_RULE" words="" max-sentence-length="40" builtin="SPELL"/>"#
        );
    }

    #[test]
    fn test_escape_attr() {
        assert_eq!(escape_attr(r#"a<b>"c"&d"#), "a&lt;b&gt;&quot;c&quot;&amp;d");
        assert!(!escape_attr("x\ny").contains('\n'));
    }
}
