//! Markup generation from the host tree
//!
//! Output uses the same syntax the parser accepts, so a rendered tree can be
//! fed back in as a page or a template body.

use crate::dom::{Document, ElementData, NodeId, NodeKind};

use super::MarkupConfig;

/// Render the subtree at `node`. Root and fragments render only their children.
pub fn render_markup(doc: &Document, node: NodeId, config: &MarkupConfig) -> String {
    let mut builder = MarkupBuilder::new(config.clone());
    match doc.node(node).map(|n| n.kind()) {
        Some(NodeKind::Root) | Some(NodeKind::Fragment) => {
            for &child in doc.children(node) {
                builder.add_node(doc, child);
            }
        }
        Some(_) => builder.add_node(doc, node),
        None => {}
    }
    builder.build()
}

/// Build markup lines incrementally
pub struct MarkupBuilder {
    config: MarkupConfig,
    lines: Vec<String>,
    indent: usize,
}

impl MarkupBuilder {
    pub fn new(config: MarkupConfig) -> Self {
        Self {
            config,
            lines: vec![],
            indent: 0,
        }
    }

    fn indent_str(&self) -> String {
        if self.config.pretty_print {
            " ".repeat(self.indent * self.config.indent_width)
        } else {
            String::new()
        }
    }

    fn push(&mut self, line: String) {
        let indent = self.indent_str();
        self.lines.push(format!("{}{}", indent, line));
    }

    /// Add one node and everything below it
    pub fn add_node(&mut self, doc: &Document, node: NodeId) {
        let Some(n) = doc.node(node) else {
            return;
        };
        match n.kind() {
            NodeKind::Text(text) => self.push(quote(text)),
            NodeKind::Root | NodeKind::Fragment => {
                for &child in n.children() {
                    self.add_node(doc, child);
                }
            }
            NodeKind::Element(element) => {
                let head = element_head(element);
                let children = n.children();
                let texts: Option<Vec<String>> = children
                    .iter()
                    .map(|&c| match doc.node(c).map(|c| c.kind()) {
                        Some(NodeKind::Text(t)) => Some(quote(t)),
                        _ => None,
                    })
                    .collect();

                match texts {
                    _ if children.is_empty() => self.push(head),
                    Some(texts) => self.push(format!("{} {{ {} }}", head, texts.join(" "))),
                    None => {
                        self.push(format!("{} {{", head));
                        self.indent += 1;
                        for &child in children {
                            self.add_node(doc, child);
                        }
                        self.indent -= 1;
                        self.push("}".to_string());
                    }
                }
            }
        }
    }

    pub fn build(self) -> String {
        if self.config.pretty_print {
            let mut out = self.lines.join("\n");
            if !out.is_empty() {
                out.push('\n');
            }
            out
        } else {
            self.lines.join(" ")
        }
    }
}

/// `tag#id.class [attr: "value", flag]`
fn element_head(element: &ElementData) -> String {
    let mut head = element.tag.clone();
    let id_inline = element.id().is_some_and(is_identifier);
    let classes_inline = element.classes().all(is_identifier);

    // The parser wants the id before the classes
    if let Some(id) = element.id().filter(|_| id_inline) {
        head.push('#');
        head.push_str(id);
    }
    if classes_inline {
        for class in element.classes() {
            head.push('.');
            head.push_str(class);
        }
    }

    let attributes: Vec<String> = element
        .attributes
        .iter()
        .filter(|attr| match attr.name.as_str() {
            "id" => !id_inline,
            "class" => !classes_inline,
            _ => true,
        })
        .map(|attr| {
            if attr.value.is_empty() {
                attr.name.clone()
            } else {
                format!("{}: {}", attr.name, quote(&attr.value))
            }
        })
        .collect();

    if !attributes.is_empty() {
        head.push_str(&format!(" [{}]", attributes.join(", ")));
    }
    head
}

/// Whether the text lexes as a non-keyword identifier
fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    let starts_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    starts_ok
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        && text != "template"
        && text != "from"
}

fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
