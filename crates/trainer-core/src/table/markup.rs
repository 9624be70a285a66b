//! Minimal element-tree reader for cheat table markup.
//!
//! Open and close tags are matched on an explicit stack, so same-named
//! elements nested to any depth (`CheatEntry` inside `CheatEntries` inside
//! `CheatEntry`...) always close at the right boundary. Only the subset of
//! XML that table files use is supported: declarations, comments, CDATA,
//! attributes, self-closing tags and character references.

use memchr::{memchr, memmem};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    /// Concatenated direct character data (entities decoded)
    pub text: String,
}

impl Element {
    fn new(name: &str, attributes: Vec<(String, String)>) -> Self {
        Self {
            name: name.to_string(),
            attributes,
            children: Vec::new(),
            text: String::new(),
        }
    }

    /// First direct child named `name`
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All direct children named `name`, in document order
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Trimmed text of the first direct child named `name`
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text())
    }

    pub fn text(&self) -> &str {
        self.text.trim()
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Parse `input` into its top-level elements
pub fn parse_document(input: &str) -> Result<Vec<Element>> {
    Reader::new(input).run()
}

struct Reader<'a> {
    src: &'a str,
    pos: usize,
    stack: Vec<Element>,
}

impl<'a> Reader<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            stack: vec![Element::default()],
        }
    }

    fn run(mut self) -> Result<Vec<Element>> {
        let src = self.src;
        let bytes = src.as_bytes();

        while self.pos < bytes.len() {
            let Some(offset) = memchr(b'<', &bytes[self.pos..]) else {
                self.push_text(&src[self.pos..]);
                break;
            };

            let text_end = self.pos + offset;
            self.push_text(&src[self.pos..text_end]);
            self.pos = text_end;

            let rest = &src[self.pos..];
            if rest.starts_with("<!--") {
                self.pos = self.find_after(self.pos + 4, "-->", "comment")?;
            } else if rest.starts_with("<![CDATA[") {
                let start = self.pos + 9;
                let end = self.find_after(start, "]]>", "CDATA section")?;
                self.top().text.push_str(&src[start..end - 3]);
                self.pos = end;
            } else if rest.starts_with("<?") {
                self.pos = self.find_after(self.pos + 2, "?>", "declaration")?;
            } else if rest.starts_with("<!") {
                self.pos = self.find_after(self.pos + 2, ">", "declaration")?;
            } else if rest.starts_with("</") {
                self.close_tag()?;
            } else {
                self.open_tag()?;
            }
        }

        if self.stack.len() > 1 {
            let open = self.stack.last().map(|e| e.name.clone()).unwrap_or_default();
            return Err(Error::MalformedTable(format!("unclosed <{}>", open)));
        }

        Ok(self.stack.pop().map(|root| root.children).unwrap_or_default())
    }

    fn top(&mut self) -> &mut Element {
        // The root sentinel is never popped before `run` finishes.
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    fn push_text(&mut self, raw: &str) {
        if !raw.is_empty() {
            let decoded = decode_entities(raw);
            self.top().text.push_str(&decoded);
        }
    }

    /// Position just past the next `needle` at or after `from`
    fn find_after(&self, from: usize, needle: &str, what: &str) -> Result<usize> {
        memmem::find(&self.src.as_bytes()[from..], needle.as_bytes())
            .map(|i| from + i + needle.len())
            .ok_or_else(|| self.error(format!("unterminated {}", what)))
    }

    fn close_tag(&mut self) -> Result<()> {
        let src = self.src;
        let end = self.find_after(self.pos + 2, ">", "closing tag")?;
        let name = src[self.pos + 2..end - 1].trim();

        if self.stack.len() == 1 {
            return Err(self.error(format!("unexpected </{}>", name)));
        }

        let element = self.stack.pop().unwrap_or_default();
        if element.name != name {
            return Err(self.error(format!(
                "expected </{}>, found </{}>",
                element.name, name
            )));
        }

        self.top().children.push(element);
        self.pos = end;
        Ok(())
    }

    fn open_tag(&mut self) -> Result<()> {
        let src = self.src;
        let bytes = src.as_bytes();
        let start = self.pos + 1;
        let mut quote: Option<u8> = None;
        let mut end = None;

        for (i, &b) in bytes[start..].iter().enumerate() {
            match (quote, b) {
                (Some(q), _) if b == q => quote = None,
                (Some(_), _) => {}
                (None, b'"' | b'\'') => quote = Some(b),
                (None, b'>') => {
                    end = Some(start + i);
                    break;
                }
                _ => {}
            }
        }

        let end = end.ok_or_else(|| self.error("unterminated tag".to_string()))?;
        let mut inner = &src[start..end];
        let self_closing = inner.ends_with('/');
        if self_closing {
            inner = &inner[..inner.len() - 1];
        }

        let (name, attributes) =
            parse_tag(inner).ok_or_else(|| self.error("empty tag name".to_string()))?;
        let element = Element::new(name, attributes);

        if self_closing {
            self.top().children.push(element);
        } else {
            self.stack.push(element);
        }

        self.pos = end + 1;
        Ok(())
    }

    fn error(&self, message: String) -> Error {
        let line = self.src[..self.pos.min(self.src.len())].matches('\n').count() + 1;
        Error::MalformedTable(format!("{} (line {})", message, line))
    }
}

fn parse_tag(inner: &str) -> Option<(&str, Vec<(String, String)>)> {
    let inner = inner.trim();
    let name_end = inner
        .find(|c: char| c.is_whitespace())
        .unwrap_or(inner.len());
    let name = &inner[..name_end];
    if name.is_empty() {
        return None;
    }

    let mut attributes = Vec::new();
    let mut rest = inner[name_end..].trim_start();
    while let Some(eq) = rest.find('=') {
        let key = rest[..eq].trim().to_string();
        let after = rest[eq + 1..].trim_start();
        let Some(q) = after.chars().next().filter(|c| *c == '"' || *c == '\'') else {
            break;
        };
        let Some(close) = after[1..].find(q) else {
            break;
        };
        attributes.push((key, decode_entities(&after[1..close + 1])));
        rest = after[close + 2..].trim_start();
    }

    Some((name, attributes))
}

/// Decode the predefined entities and numeric character references
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest.find(';').and_then(|semi| {
            let entity = &rest[1..semi];
            let c = match entity {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "amp" => Some('&'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                    .and_then(char::from_u32),
            };
            c.map(|c| (c, semi))
        });

        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
