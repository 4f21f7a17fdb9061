//! Lightweight markup tree for one field's text.
//!
//! [`Fragment::parse`] is forgiving in the way browsers and tag-soup parsers
//! are: it never fails. Text and attribute values are stored exactly as they
//! appear in the source (entities stay encoded), so re-serializing an
//! unmodified, well-formed fragment with [`Fragment::to_html`] reproduces the
//! input byte for byte.
//!
//! Output is always well-formed, so parsing it again yields the same tree.
//! Normalisations applied on the way through:
//! - tag and attribute names are lowercased;
//! - attribute values are re-emitted double-quoted, valueless attributes bare;
//! - a `<`, `>` or `&` that text took literally is written as a character
//!   reference; references already in the source are kept as they are;
//! - void elements (`<br>`, `<hr>`, …) never get an end tag, `<br/>` becomes `<br>`;
//! - a self-closed non-void element (`<span/>`) becomes `<span></span>`;
//! - elements left open at end of input are closed;
//! - an unterminated comment runs to the end of input and is closed there;
//! - end tags with no matching open element are dropped;
//! - `<script>` and `<style>` bodies are parsed as markup, not raw text.

use std::borrow::Cow;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// A single attribute. `value` is `None` for bare attributes like `hidden`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: Option<String>,
}

/// A node in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Character data, entity-encoded as in the source.
    Text(String),
    /// Comments, doctypes and processing instructions, verbatim.
    Raw(String),
    Element(Element),
}

impl Node {
    pub fn text(s: impl Into<String>) -> Self {
        Node::Text(s.into())
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    fn write_html(&self, out: &mut String) {
        match self {
            Node::Text(s) => write_encoded(out, s, Encoding::Text),
            Node::Raw(s) => out.push_str(s),
            Node::Element(e) => e.write_html(out),
        }
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum Encoding {
    Text,
    DoubleQuotedAttribute,
}

impl Encoding {
    fn apply(self, s: &str) -> Cow<'_, str> {
        match self {
            Encoding::Text => html_escape::encode_text(s),
            Encoding::DoubleQuotedAttribute => html_escape::encode_double_quoted_attribute(s),
        }
    }
}

/// Longest run accepted as a character reference after `&`.
const MAX_REFERENCE_LEN: usize = 32;

/// Append `s` encoded for `encoding`, keeping the character references it
/// already holds. A bare `&` becomes `&amp;`.
fn write_encoded(out: &mut String, s: &str, encoding: Encoding) {
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&encoding.apply(&rest[..amp]));
        let tail = &rest[amp..];
        match reference_len(tail) {
            Some(len) => {
                out.push_str(&tail[..len]);
                rest = &tail[len..];
            }
            None => {
                out.push_str("&amp;");
                rest = &tail[1..];
            }
        }
    }
    out.push_str(&encoding.apply(rest));
}

// Length of the character reference `s` starts with, if it is one that
// decodes (`&nbsp;`, `&#160;`, `&#xA0;`).
fn reference_len(s: &str) -> Option<usize> {
    let semi = s.char_indices().take(MAX_REFERENCE_LEN).find(|&(_, c)| c == ';')?.0;
    let body = &s[1..semi];
    if body.is_empty() || !body.chars().all(|c| c.is_ascii_alphanumeric() || c == '#') {
        return None;
    }
    let reference = &s[..=semi];
    (html_escape::decode_html_entities(reference) != reference).then_some(semi + 1)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<Attribute>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: vec![],
            children: vec![],
        }
    }

    /// `<name>text</name>`.
    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        let mut e = Self::new(name);
        e.children.push(Node::text(text));
        e
    }

    /// Value of attribute `name`; bare attributes read as `""`.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_deref().unwrap_or(""))
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|a| a.name == name)
    }

    /// Set `name` to `value`, replacing an existing value in place or
    /// appending the attribute after the existing ones.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = Some(value.into());
        match self.attrs.iter_mut().find(|a| a.name == name) {
            Some(a) => a.value = value,
            None => self.attrs.push(Attribute {
                name: name.to_owned(),
                value,
            }),
        }
    }

    /// Whether the whitespace-separated `class` list contains `class`.
    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|list| list.split_ascii_whitespace().any(|c| c == class))
    }

    /// A copy with the same name and attributes and no children.
    pub fn emptied(&self) -> Self {
        Self {
            name: self.name.clone(),
            attrs: self.attrs.clone(),
            children: vec![],
        }
    }

    /// The element's string content: the text of a sole text child, or the
    /// string of a sole element child. `None` for empty or mixed content.
    pub fn string(&self) -> Option<String> {
        match self.children.as_slice() {
            [Node::Text(t)] => Some(t.clone()),
            [Node::Element(e)] => e.string(),
            _ => None,
        }
    }

    /// True when the element has no children other than empty text.
    pub fn is_empty(&self) -> bool {
        self.children
            .iter()
            .all(|n| matches!(n, Node::Text(t) if t.is_empty()))
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    pub fn inner_html(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.write_html(&mut out);
        }
        out
    }

    fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for attr in &self.attrs {
            out.push(' ');
            out.push_str(&attr.name);
            if let Some(value) = &attr.value {
                out.push_str("=\"");
                write_encoded(out, value, Encoding::DoubleQuotedAttribute);
                out.push('"');
            }
        }
        out.push('>');
        if is_void(&self.name) {
            return;
        }
        for child in &self.children {
            child.write_html(out);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

/// Parsed field text: the list of top-level nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    pub nodes: Vec<Node>,
}

impl Fragment {
    pub fn parse(input: &str) -> Self {
        Parser::new(input).run()
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            node.write_html(&mut out);
        }
        out
    }

    /// Top-level elements with their position in [`Fragment::nodes`].
    pub fn elements(&self) -> impl Iterator<Item = (usize, &Element)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_element().map(|e| (i, e)))
    }

    pub fn element_mut(&mut self, index: usize) -> Option<&mut Element> {
        self.nodes.get_mut(index).and_then(Node::as_element_mut)
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct StartTag {
    name: String,
    attrs: Vec<Attribute>,
    self_closing: bool,
    /// Byte offset just past the closing `>`.
    end: usize,
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    root: Vec<Node>,
    open: Vec<Element>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            root: vec![],
            open: vec![],
        }
    }

    fn run(mut self) -> Fragment {
        let input = self.input;
        while self.pos < input.len() {
            let rest = &input[self.pos..];
            if !rest.starts_with('<') {
                let len = rest.find('<').unwrap_or(rest.len());
                self.push_text(&rest[..len]);
                self.pos += len;
                continue;
            }

            let next = rest.as_bytes().get(1).copied();
            match next {
                Some(b'!') | Some(b'?') => self.declaration(rest),
                Some(b'/') if rest.as_bytes().get(2).is_some_and(u8::is_ascii_alphabetic) => {
                    self.end_tag(rest)
                }
                Some(c) if c.is_ascii_alphabetic() => match parse_start_tag(rest) {
                    Some(tag) => {
                        self.pos += tag.end;
                        self.start_tag(tag);
                    }
                    None => self.literal_lt(),
                },
                _ => self.literal_lt(),
            }
        }

        while !self.open.is_empty() {
            self.close_top();
        }
        Fragment { nodes: self.root }
    }

    fn current(&mut self) -> &mut Vec<Node> {
        match self.open.last_mut() {
            Some(e) => &mut e.children,
            None => &mut self.root,
        }
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let nodes = self.current();
        if let Some(Node::Text(prev)) = nodes.last_mut() {
            prev.push_str(text);
        } else {
            nodes.push(Node::text(text));
        }
    }

    fn literal_lt(&mut self) {
        self.push_text("<");
        self.pos += 1;
    }

    fn declaration(&mut self, rest: &str) {
        let (len, terminator) = if let Some(body) = rest.strip_prefix("<!--") {
            (body.find("-->").map(|i| i + 4 + 3), "-->")
        } else {
            (rest.find('>').map(|i| i + 1), ">")
        };
        let raw = match len {
            Some(len) => rest[..len].to_owned(),
            None => format!("{rest}{terminator}"),
        };
        self.current().push(Node::Raw(raw));
        self.pos += len.unwrap_or(rest.len());
    }

    fn end_tag(&mut self, rest: &str) {
        let Some(close) = rest.find('>') else {
            self.push_text(rest);
            self.pos += rest.len();
            return;
        };
        let name: String = rest[2..close]
            .split(|c: char| c.is_ascii_whitespace() || c == '/')
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();
        self.pos += close + 1;

        if let Some(depth) = self.open.iter().rposition(|e| e.name == name) {
            while self.open.len() > depth {
                self.close_top();
            }
        }
    }

    fn start_tag(&mut self, tag: StartTag) {
        let element = Element {
            name: tag.name,
            attrs: tag.attrs,
            children: vec![],
        };
        if tag.self_closing || is_void(&element.name) {
            self.current().push(Node::Element(element));
        } else {
            self.open.push(element);
        }
    }

    fn close_top(&mut self) {
        if let Some(element) = self.open.pop() {
            self.current().push(Node::Element(element));
        }
    }
}

/// Parse `<name attr=...>` at the start of `s`. `None` when the tag is not
/// terminated, in which case the `<` is treated as text.
fn parse_start_tag(s: &str) -> Option<StartTag> {
    let bytes = s.as_bytes();
    let mut i = 1;
    while i < bytes.len() && is_name_byte(bytes[i]) {
        i += 1;
    }
    let name = s[1..i].to_ascii_lowercase();
    let mut attrs: Vec<Attribute> = vec![];

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match *bytes.get(i)? {
            b'>' => {
                return Some(StartTag { name, attrs, self_closing: false, end: i + 1 });
            }
            b'/' if bytes.get(i + 1) == Some(&b'>') => {
                return Some(StartTag { name, attrs, self_closing: true, end: i + 2 });
            }
            b'/' => {
                i += 1;
                continue;
            }
            _ => {}
        }

        let name_start = i;
        while i < bytes.len()
            && !matches!(bytes[i], b'=' | b'>' | b'/')
            && !bytes[i].is_ascii_whitespace()
        {
            i += 1;
        }
        let attr_name = s[name_start..i].to_ascii_lowercase();

        let mut j = i;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        let mut value = None;
        if bytes.get(j) == Some(&b'=') {
            j += 1;
            while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            match *bytes.get(j)? {
                q @ (b'"' | b'\'') => {
                    let close = s[j + 1..].find(q as char)? + j + 1;
                    value = Some(s[j + 1..close].to_owned());
                    i = close + 1;
                }
                _ => {
                    let start = j;
                    while j < bytes.len() && bytes[j] != b'>' && !bytes[j].is_ascii_whitespace() {
                        j += 1;
                    }
                    value = Some(s[start..j].to_owned());
                    i = j;
                }
            }
        }

        if !attr_name.is_empty() && !attrs.iter().any(|a| a.name == attr_name) {
            attrs.push(Attribute { name: attr_name, value });
        }
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':'
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
