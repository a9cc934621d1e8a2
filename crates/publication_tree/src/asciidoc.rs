//! Minimal AsciiDoc block parser
//!
//! Only the block structure is parsed: the document header, sections and
//! the terminal blocks inside them. Inline markup is left untouched in each
//! block's source so it can be republished verbatim.

use crate::document::{DocumentSource, SECTION_CONTEXT};

/// Handle to a block inside its [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(usize);

/// Structural kind of a block, named after AsciiDoc's block contexts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    Section,
    Paragraph,
    Admonition,
    Listing,
    Literal,
    Example,
    Quote,
    Sidebar,
    Pass,
    Table,
    Ulist,
    Olist,
    Image,
}

impl Context {
    /// Context label used for fallback d-tags
    pub fn as_str(&self) -> &'static str {
        match self {
            Context::Section => SECTION_CONTEXT,
            Context::Paragraph => "paragraph",
            Context::Admonition => "admonition",
            Context::Listing => "listing",
            Context::Literal => "literal",
            Context::Example => "example",
            Context::Quote => "quote",
            Context::Sidebar => "sidebar",
            Context::Pass => "pass",
            Context::Table => "table",
            Context::Ulist => "ulist",
            Context::Olist => "olist",
            Context::Image => "image",
        }
    }

    fn from_delimiter(line: &str) -> Option<Self> {
        if line == "|===" {
            return Some(Context::Table);
        }

        let first = line.chars().next()?;
        if line.len() < 4 || !line.chars().all(|c| c == first) {
            return None;
        }

        match first {
            '-' => Some(Context::Listing),
            '.' => Some(Context::Literal),
            '=' => Some(Context::Example),
            '_' => Some(Context::Quote),
            '*' => Some(Context::Sidebar),
            '+' => Some(Context::Pass),
            _ => None,
        }
    }
}

/// One parsed block. Sections hold children, everything else holds lines.
#[derive(Debug, Clone)]
pub struct Block {
    pub context: Context,
    pub id: Option<String>,
    pub title: Option<String>,
    /// Section level; `==` is 1. Zero for non-section blocks.
    pub level: usize,
    pub lines: Vec<String>,
    pub children: Vec<BlockId>,
    pub parent: Option<BlockId>,
}

/// A parsed AsciiDoc document: header, attributes and the block tree
#[derive(Debug, Clone, Default)]
pub struct Document {
    title: Option<String>,
    id: Option<String>,
    attributes: Vec<(String, String)>,
    blocks: Vec<Block>,
    top: Vec<BlockId>,
}

/// Anchor, title and attribute lines waiting for the block they describe
#[derive(Default)]
struct Pending {
    id: Option<String>,
    title: Option<String>,
    /// The metadata lines as written, in order
    lines: Vec<String>,
}

impl Document {
    /// Parse `src`. Parsing never fails; unrecognised lines become
    /// paragraphs.
    pub fn parse(src: &str) -> Self {
        let lines: Vec<&str> = src.lines().collect();
        let mut doc = Document::default();
        let mut pending = Pending::default();
        let mut sections: Vec<(usize, BlockId)> = Vec::new();
        let mut header_seen = false;
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i].trim_end();

            if line.trim().is_empty() {
                i += 1;
                continue;
            }

            if line.starts_with("////") {
                i = skip_past(&lines, i, line);
                continue;
            }

            if line.starts_with("//") {
                i += 1;
                continue;
            }

            if let Some(id) = parse_anchor(line) {
                pending.id = Some(id);
                pending.lines.push(line.to_string());
                i += 1;
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                pending.lines.push(line.to_string());
                i += 1;
                continue;
            }

            if let Some(title) = parse_block_title(line) {
                pending.title = Some(title);
                pending.lines.push(line.to_string());
                i += 1;
                continue;
            }

            if let Some((name, value)) = parse_attribute_entry(line) {
                doc.attributes.push((name, value));
                i += 1;
                continue;
            }

            if let Some((level, title)) = parse_heading(line) {
                if level == 0 {
                    if !header_seen {
                        header_seen = true;
                        doc.title = Some(title);
                        doc.id = pending.id.take();
                        pending = Pending::default();
                    }
                    i += 1;
                    continue;
                }

                while sections.last().is_some_and(|(l, _)| *l >= level) {
                    sections.pop();
                }

                let parent = sections.last().map(|(_, id)| *id);
                let block = doc.push_block(
                    Context::Section,
                    level,
                    Vec::new(),
                    std::mem::take(&mut pending),
                    parent,
                    Some(title),
                );
                sections.push((level, block));
                i += 1;
                continue;
            }

            let parent = sections.last().map(|(_, id)| *id);
            let (context, block_lines, next) = read_block(&lines, i);
            doc.push_block(
                context,
                0,
                block_lines,
                std::mem::take(&mut pending),
                parent,
                None,
            );
            i = next;
        }

        doc
    }

    /// Get a block by handle
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0]
    }

    /// Total number of blocks, nested ones included
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Value of a `:name: value` attribute entry
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    fn push_block(
        &mut self,
        context: Context,
        level: usize,
        body: Vec<String>,
        pending: Pending,
        parent: Option<BlockId>,
        heading_title: Option<String>,
    ) -> BlockId {
        let id = BlockId(self.blocks.len());

        // terminal blocks keep their metadata lines in the source
        let mut lines = match context {
            Context::Section => Vec::new(),
            _ => pending.lines,
        };
        lines.extend(body);

        self.blocks.push(Block {
            context,
            id: pending.id,
            title: heading_title.or(pending.title),
            level,
            lines,
            children: Vec::new(),
            parent,
        });

        match parent {
            Some(parent) => self.blocks[parent.0].children.push(id),
            None => self.top.push(id),
        }

        id
    }
}

impl DocumentSource for Document {
    type Block = BlockId;

    fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn blocks(&self) -> Vec<BlockId> {
        self.top.clone()
    }

    fn children(&self, block: BlockId) -> Vec<BlockId> {
        self.block(block).children.clone()
    }

    fn context(&self, block: BlockId) -> &str {
        self.block(block).context.as_str()
    }

    fn block_id(&self, block: BlockId) -> Option<&str> {
        self.block(block).id.as_deref()
    }

    fn block_title(&self, block: BlockId) -> Option<&str> {
        self.block(block).title.as_deref()
    }

    fn parent(&self, block: BlockId) -> Option<BlockId> {
        self.block(block).parent
    }

    fn source(&self, block: BlockId) -> String {
        self.block(block).lines.join("\n")
    }
}

/// Read one terminal block starting at `start`.
/// Returns its context, its lines and the index of the next unread line.
fn read_block(lines: &[&str], start: usize) -> (Context, Vec<String>, usize) {
    let first = lines[start].trim_end();

    if let Some(context) = Context::from_delimiter(first) {
        let end = skip_past(lines, start, first);
        let body = lines[start..end].iter().map(|l| l.to_string()).collect();
        return (context, body, end);
    }

    if first.starts_with("image::") {
        return (Context::Image, vec![first.to_string()], start + 1);
    }

    let context = if is_admonition(first) {
        Context::Admonition
    } else if is_ulist_item(first) {
        Context::Ulist
    } else if is_olist_item(first) {
        Context::Olist
    } else {
        Context::Paragraph
    };

    let mut end = start;
    while end < lines.len() && !lines[end].trim().is_empty() {
        end += 1;
    }

    let body = lines[start..end]
        .iter()
        .map(|l| l.trim_end().to_string())
        .collect();
    (context, body, end)
}

/// Index just past the line closing the delimited block opened at `start`.
/// An unterminated block runs to the end of the document.
fn skip_past(lines: &[&str], start: usize, delimiter: &str) -> usize {
    lines[start + 1..]
        .iter()
        .position(|l| l.trim_end() == delimiter)
        .map(|pos| start + 1 + pos + 1)
        .unwrap_or(lines.len())
}

/// `= Title` is level 0, `== Title` level 1, up to level 5
fn parse_heading(line: &str) -> Option<(usize, String)> {
    let markers = line.chars().take_while(|c| *c == '=').count();
    if markers == 0 || markers > 6 {
        return None;
    }

    let rest = &line[markers..];
    if !rest.starts_with(' ') {
        return None;
    }

    let title = rest.trim();
    if title.is_empty() {
        return None;
    }

    Some((markers - 1, title.to_string()))
}

/// `[[id]]`, `[[id,label]]` or `[#id]`, `[#id.role]`
fn parse_anchor(line: &str) -> Option<String> {
    let id = if let Some(inner) = line.strip_prefix("[[").and_then(|l| l.strip_suffix("]]")) {
        inner.split(',').next()?
    } else if let Some(inner) = line.strip_prefix("[#").and_then(|l| l.strip_suffix(']')) {
        inner.split(['.', '%', ',']).next()?
    } else {
        return None;
    };

    let id = id.trim();
    (!id.is_empty()).then(|| id.to_string())
}

/// `.Title` but not `..` list items, `....` delimiters or `. item`
fn parse_block_title(line: &str) -> Option<String> {
    let rest = line.strip_prefix('.')?;
    let next = rest.chars().next()?;
    if next == '.' || next.is_whitespace() {
        return None;
    }
    Some(rest.trim().to_string())
}

/// `:name: value`
fn parse_attribute_entry(line: &str) -> Option<(String, String)> {
    let rest = line.strip_prefix(':')?;
    let (name, value) = rest.split_once(':')?;
    if name.is_empty() || name.contains(char::is_whitespace) {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}

fn is_admonition(line: &str) -> bool {
    ["NOTE: ", "TIP: ", "IMPORTANT: ", "WARNING: ", "CAUTION: "]
        .iter()
        .any(|label| line.starts_with(label))
}

fn is_ulist_item(line: &str) -> bool {
    let markers = line.chars().take_while(|c| *c == '*').count();
    (markers > 0 && line[markers..].starts_with(' ')) || line.starts_with("- ")
}

fn is_olist_item(line: &str) -> bool {
    let dots = line.chars().take_while(|c| *c == '.').count();
    if dots > 0 {
        return line[dots..].starts_with(' ');
    }

    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    digits > 0 && line[digits..].starts_with(". ")
}
