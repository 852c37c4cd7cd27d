use super::{
    CollectionStyle, Entry, Mapping, Node, NodeId, NodeKind, Scalar, ScalarStyle, Sequence, Span,
};
use crate::error::{DpcError, Result};

#[derive(Debug)]
pub(super) struct Parsed {
    pub nodes: Vec<Node>,
    pub documents: Vec<Option<NodeId>>,
    pub indent_unit: Option<usize>,
}

/// Indentation-driven recursive descent over the source bytes.
///
/// All YAML indicators are ASCII, so scanning bytes never splits a UTF-8
/// sequence and every span boundary is a valid `str` index.
pub(super) struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    /// Where the first line starts; past a leading byte order mark.
    first_line: usize,
    nodes: Vec<Node>,
    indent_unit: Option<usize>,
}

fn is_ws(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

fn is_break(b: u8) -> bool {
    b == b'\n' || b == b'\r'
}

fn is_flow_indicator(b: u8) -> bool {
    matches!(b, b',' | b'[' | b']' | b'{' | b'}')
}

impl<'a> Parser<'a> {
    pub fn new(src: &'a str) -> Self {
        let first_line = if src.starts_with('\u{feff}') {
            '\u{feff}'.len_utf8()
        } else {
            0
        };
        Self {
            src,
            bytes: src.as_bytes(),
            pos: first_line,
            first_line,
            nodes: Vec::new(),
            indent_unit: None,
        }
    }

    pub fn parse(mut self) -> Result<Parsed> {
        let mut documents = Vec::new();
        loop {
            self.skip_trivia();
            while self.column(self.pos) == 0 && self.peek() == Some(b'%') {
                self.skip_to_line_end();
                self.skip_trivia();
            }
            if self.at_eof() {
                break;
            }
            if self.at_marker(b"---") {
                self.pos += 3;
            }
            let root = self.parse_block_node(-1, false)?;
            documents.push(if self.is_null(root) { None } else { Some(root) });

            self.skip_trivia();
            if self.at_marker(b"...") {
                self.pos += 3;
                self.skip_to_line_end();
                continue;
            }
            if self.at_eof() || self.at_marker(b"---") {
                continue;
            }
            return Err(self.error("unexpected content after document"));
        }
        Ok(Parsed {
            nodes: self.nodes,
            documents,
            indent_unit: self.indent_unit,
        })
    }

    // -----------------------------------------------------------------------
    // Cursor helpers
    // -----------------------------------------------------------------------

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn at_eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// True when the byte at `offset` is whitespace, a line break, or EOF.
    fn blank_at(&self, offset: usize) -> bool {
        self.peek_at(offset).map_or(true, |b| is_ws(b) || is_break(b))
    }

    fn column(&self, pos: usize) -> usize {
        let line_start = self.bytes[..pos]
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(self.first_line, |i| i + 1);
        pos.saturating_sub(line_start)
    }

    fn at_marker(&self, marker: &[u8; 3]) -> bool {
        self.column(self.pos) == 0 && self.bytes[self.pos..].starts_with(marker) && self.blank_at(3)
    }

    fn at_document_boundary(&self) -> bool {
        self.at_marker(b"---") || self.at_marker(b"...")
    }

    fn skip_inline_ws(&mut self) {
        while self.peek().is_some_and(is_ws) {
            self.pos += 1;
        }
    }

    fn skip_to_line_end(&mut self) {
        while self.peek().is_some_and(|b| !is_break(b)) {
            self.pos += 1;
        }
    }

    fn at_line_end(&self) -> bool {
        match self.peek() {
            None => true,
            Some(b) => is_break(b) || b == b'#',
        }
    }

    /// Skip whitespace, comments and line breaks.
    fn skip_trivia(&mut self) {
        loop {
            self.skip_inline_ws();
            match self.peek() {
                Some(b'#') => self.skip_to_line_end(),
                Some(b) if is_break(b) => self.pos += 1,
                _ => break,
            }
        }
    }

    fn error(&self, message: &str) -> DpcError {
        let pos = self.pos.min(self.bytes.len());
        let line = self.bytes[..pos].iter().filter(|&&b| b == b'\n').count() + 1;
        DpcError::Syntax {
            line,
            column: self.column(pos) + 1,
            message: message.to_string(),
        }
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    fn is_null(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Null)
    }

    fn span_end(&self, id: NodeId) -> usize {
        self.nodes[id.0].span.map_or(0, |s| s.end)
    }

    fn null_at(&mut self, pos: usize) -> NodeId {
        self.push(Node {
            span: Some(Span { start: pos, end: pos }),
            anchor: None,
            tag: None,
            kind: NodeKind::Null,
        })
    }

    fn scalar(&mut self, start: usize, style: ScalarStyle, value: String) -> NodeId {
        self.push(Node {
            span: Some(Span { start, end: self.pos }),
            anchor: None,
            tag: None,
            kind: NodeKind::Scalar(Scalar {
                style,
                value,
                replacement: None,
            }),
        })
    }

    // -----------------------------------------------------------------------
    // Block context
    // -----------------------------------------------------------------------

    /// Parse the node that follows, or an empty node if the next content is
    /// not indented past `parent`. With `indentless` a sequence may sit at
    /// exactly the parent's column, as in `steps:\n- run: x`.
    fn parse_block_node(&mut self, parent: isize, indentless: bool) -> Result<NodeId> {
        let start = self.pos;
        self.skip_trivia();
        if self.at_eof() || self.at_document_boundary() {
            self.pos = start;
            return Ok(self.null_at(start));
        }
        let col = self.column(self.pos) as isize;
        let seq_here = self.peek() == Some(b'-') && self.blank_at(1);
        if col < parent || (col == parent && !(indentless && seq_here)) {
            self.pos = start;
            return Ok(self.null_at(start));
        }

        let (anchor, tag) = self.parse_properties()?;
        if anchor.is_some() || tag.is_some() {
            self.skip_inline_ws();
            if self.at_line_end() {
                let id = self.parse_block_node(parent, indentless)?;
                self.attach(id, anchor, tag);
                return Ok(id);
            }
        }
        let id = self.parse_block_content(parent)?;
        self.attach(id, anchor, tag);
        Ok(id)
    }

    fn attach(&mut self, id: NodeId, anchor: Option<String>, tag: Option<String>) {
        let node = &mut self.nodes[id.0];
        if anchor.is_some() {
            node.anchor = anchor;
        }
        if tag.is_some() {
            node.tag = tag;
        }
    }

    fn parse_properties(&mut self) -> Result<(Option<String>, Option<String>)> {
        let mut anchor = None;
        let mut tag = None;
        loop {
            match self.peek() {
                Some(b'&') if anchor.is_none() => {
                    self.pos += 1;
                    anchor = Some(self.scan_name()?);
                }
                Some(b'!') if tag.is_none() => {
                    let start = self.pos;
                    while self.peek().is_some_and(|b| !is_ws(b) && !is_break(b)) {
                        self.pos += 1;
                    }
                    tag = Some(self.src[start..self.pos].to_string());
                }
                _ => return Ok((anchor, tag)),
            }
            self.skip_inline_ws();
        }
    }

    fn scan_name(&mut self) -> Result<String> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| !is_ws(b) && !is_break(b) && !is_flow_indicator(b))
        {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("empty anchor or alias name"));
        }
        Ok(self.src[start..self.pos].to_string())
    }

    fn parse_block_content(&mut self, parent: isize) -> Result<NodeId> {
        let col = self.column(self.pos);
        match self.peek() {
            Some(b'-') if self.blank_at(1) => self.parse_block_sequence(col),
            Some(b'?') if self.blank_at(1) => Err(self.error("explicit mapping keys are not supported")),
            Some(b'|') | Some(b'>') => self.parse_block_scalar(parent),
            Some(b'[') | Some(b'{') => {
                let id = self.parse_flow_node()?;
                self.reject_complex_key()?;
                Ok(id)
            }
            Some(b'*') => {
                let id = self.parse_alias()?;
                self.reject_complex_key()?;
                Ok(id)
            }
            _ => {
                let start = self.pos;
                let id = self.parse_inline_scalar(false)?;
                self.skip_inline_ws();
                if self.peek() == Some(b':') && self.blank_at(1) {
                    self.nodes.pop();
                    self.pos = start;
                    return self.parse_block_mapping(col);
                }
                self.pos = self.span_end(id);
                if self.is_plain(id) {
                    self.continue_plain(id, parent);
                }
                Ok(id)
            }
        }
    }

    fn reject_complex_key(&mut self) -> Result<()> {
        let save = self.pos;
        self.skip_inline_ws();
        if self.peek() == Some(b':') && self.blank_at(1) {
            return Err(self.error("complex mapping keys are not supported"));
        }
        self.pos = save;
        Ok(())
    }

    fn is_plain(&self, id: NodeId) -> bool {
        matches!(
            &self.nodes[id.0].kind,
            NodeKind::Scalar(Scalar { style: ScalarStyle::Plain, .. })
        )
    }

    /// Extend a plain scalar over continuation lines indented past `parent`.
    fn continue_plain(&mut self, id: NodeId, parent: isize) {
        loop {
            let save = self.pos;
            self.skip_inline_ws();
            if self.peek() == Some(b'#') || !self.peek().is_some_and(is_break) {
                self.pos = save;
                return;
            }
            // Skip breaks and blank lines, but not comments.
            while let Some(b) = self.peek() {
                if is_break(b) || is_ws(b) {
                    self.pos += 1;
                } else {
                    break;
                }
            }
            if self.at_eof()
                || self.peek() == Some(b'#')
                || self.at_document_boundary()
                || (self.column(self.pos) as isize) <= parent
            {
                self.pos = save;
                return;
            }
            let (start, end) = self.scan_plain(false);
            if start == end {
                self.pos = save;
                return;
            }
            let line = self.src[start..end].to_string();
            let node = &mut self.nodes[id.0];
            if let Some(span) = node.span.as_mut() {
                span.end = end;
            }
            if let NodeKind::Scalar(s) = &mut node.kind {
                s.value.push(' ');
                s.value.push_str(&line);
            }
            self.pos = end;
        }
    }

    fn parse_block_mapping(&mut self, col: usize) -> Result<NodeId> {
        let start = self.pos;
        let mut entries = Vec::new();
        loop {
            let (anchor, tag) = self.parse_properties()?;
            let key = match self.peek() {
                Some(b'"') | Some(b'\'') => self.parse_quoted()?,
                Some(b'*') => self.parse_alias()?,
                _ => self.parse_inline_scalar(false)?,
            };
            self.attach(key, anchor, tag);
            self.skip_inline_ws();
            if !(self.peek() == Some(b':') && self.blank_at(1)) {
                return Err(self.error("expected ':' after mapping key"));
            }
            self.pos += 1;
            let value = self.parse_block_node(col as isize, true)?;
            self.note_indent(col, value);
            entries.push(Entry { key, value });

            let save = self.pos;
            self.skip_trivia();
            if self.at_eof() || self.at_document_boundary() {
                self.pos = save;
                break;
            }
            let next = self.column(self.pos);
            if next < col {
                self.pos = save;
                break;
            }
            if next > col {
                return Err(self.error("unexpected indentation"));
            }
        }
        let end = entries
            .last()
            .map_or(start, |e| self.span_end(e.key).max(self.span_end(e.value)));
        Ok(self.push(Node {
            span: Some(Span { start, end }),
            anchor: None,
            tag: None,
            kind: NodeKind::Mapping(Mapping {
                style: CollectionStyle::Block,
                column: col,
                entries,
            }),
        }))
    }

    fn note_indent(&mut self, col: usize, value: NodeId) {
        if self.indent_unit.is_some() {
            return;
        }
        if let NodeKind::Mapping(m) = &self.nodes[value.0].kind {
            if m.style == CollectionStyle::Block && m.column > col {
                self.indent_unit = Some(m.column - col);
            }
        }
    }

    fn parse_block_sequence(&mut self, col: usize) -> Result<NodeId> {
        let start = self.pos;
        let mut items = Vec::new();
        loop {
            // Consume the '-' indicator.
            self.pos += 1;
            items.push(self.parse_block_node(col as isize, false)?);

            let save = self.pos;
            self.skip_trivia();
            if self.at_eof() || self.at_document_boundary() {
                self.pos = save;
                break;
            }
            if self.column(self.pos) == col && self.peek() == Some(b'-') && self.blank_at(1) {
                continue;
            }
            self.pos = save;
            break;
        }
        let end = items.last().map_or(start + 1, |&id| self.span_end(id).max(start + 1));
        Ok(self.push(Node {
            span: Some(Span { start, end }),
            anchor: None,
            tag: None,
            kind: NodeKind::Sequence(Sequence {
                style: CollectionStyle::Block,
                items,
            }),
        }))
    }

    fn parse_block_scalar(&mut self, parent: isize) -> Result<NodeId> {
        let start = self.pos;
        let style = if self.peek() == Some(b'|') {
            ScalarStyle::Literal
        } else {
            ScalarStyle::Folded
        };
        self.pos += 1;
        let mut explicit = None;
        for _ in 0..2 {
            match self.peek() {
                Some(b @ b'1'..=b'9') => {
                    explicit = Some((b - b'0') as usize);
                    self.pos += 1;
                }
                Some(b'+') | Some(b'-') => self.pos += 1,
                _ => break,
            }
        }
        self.skip_inline_ws();
        if !self.at_line_end() {
            return Err(self.error("unexpected text after block scalar header"));
        }
        self.skip_to_line_end();
        let header_end = self.pos;

        let base = parent.max(0) as usize;
        let mut indent = explicit.map(|n| base + n);
        let mut content_end = header_end;
        let mut lines = Vec::new();
        let mut cursor = header_end;
        loop {
            // Step over the line break ending the previous line.
            if self.bytes.get(cursor) == Some(&b'\r') {
                cursor += 1;
            }
            if self.bytes.get(cursor) != Some(&b'\n') {
                break;
            }
            cursor += 1;
            let line_start = cursor;
            let line_end = self.bytes[line_start..]
                .iter()
                .position(|&b| is_break(b))
                .map_or(self.bytes.len(), |i| line_start + i);
            let line = &self.src[line_start..line_end];
            let leading = line.len() - line.trim_start_matches(' ').len();
            if line.trim().is_empty() {
                lines.push(String::new());
                cursor = line_end;
                continue;
            }
            let required = *indent.get_or_insert(leading);
            if leading < required || (leading as isize) <= parent {
                break;
            }
            lines.push(line[required..].to_string());
            content_end = line_end;
            cursor = line_end;
        }
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        self.pos = content_end;
        let value = lines.join("\n");
        Ok(self.scalar(start, style, value))
    }

    // -----------------------------------------------------------------------
    // Scalars
    // -----------------------------------------------------------------------

    /// Parse a quoted scalar, or a plain scalar that ends at the end of the
    /// line, a comment, or a `: ` separator.
    fn parse_inline_scalar(&mut self, flow: bool) -> Result<NodeId> {
        match self.peek() {
            Some(b'"') | Some(b'\'') => self.parse_quoted(),
            _ => {
                let (start, end) = self.scan_plain(flow);
                if start == end {
                    return Err(self.error("expected a scalar"));
                }
                self.pos = end;
                let value = self.src[start..end].to_string();
                Ok(self.scalar(start, ScalarStyle::Plain, value))
            }
        }
    }

    /// Scan one line of plain scalar, returning its trimmed bounds.
    fn scan_plain(&self, flow: bool) -> (usize, usize) {
        let start = self.pos;
        let mut i = start;
        let mut end = start;
        while let Some(&b) = self.bytes.get(i) {
            if is_break(b) {
                break;
            }
            if b == b'#' && i > start && is_ws(self.bytes[i - 1]) {
                break;
            }
            if b == b':' {
                let next = self.bytes.get(i + 1).copied();
                let terminates = match next {
                    None => true,
                    Some(n) => is_ws(n) || is_break(n) || (flow && is_flow_indicator(n)),
                };
                if terminates {
                    break;
                }
            }
            if flow && is_flow_indicator(b) {
                break;
            }
            i += 1;
            if !is_ws(b) {
                end = i;
            }
        }
        (start, end)
    }

    fn parse_quoted(&mut self) -> Result<NodeId> {
        let start = self.pos;
        let Some(quote) = self.peek() else {
            return Err(self.error("expected a quoted scalar"));
        };
        self.pos += 1;
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated quoted scalar")),
                Some(b'\'') if quote == b'\'' && self.peek_at(1) == Some(b'\'') => self.pos += 2,
                Some(b'\\') if quote == b'"' => self.pos += 2,
                Some(b) if b == quote => {
                    self.pos += 1;
                    break;
                }
                Some(_) => self.pos += 1,
            }
        }
        let inner = &self.src[start + 1..self.pos - 1];
        let (style, value) = if quote == b'\'' {
            (ScalarStyle::SingleQuoted, fold_lines(&inner.replace("''", "'")))
        } else {
            (ScalarStyle::DoubleQuoted, unescape(&fold_lines(inner)))
        };
        Ok(self.scalar(start, style, value))
    }

    fn parse_alias(&mut self) -> Result<NodeId> {
        let start = self.pos;
        self.pos += 1;
        let name = self.scan_name()?;
        Ok(self.push(Node {
            span: Some(Span { start, end: self.pos }),
            anchor: None,
            tag: None,
            kind: NodeKind::Alias(name),
        }))
    }

    // -----------------------------------------------------------------------
    // Flow context
    // -----------------------------------------------------------------------

    fn parse_flow_node(&mut self) -> Result<NodeId> {
        self.skip_trivia();
        let (anchor, tag) = self.parse_properties()?;
        self.skip_trivia();
        let id = match self.peek() {
            Some(b'{') => self.parse_flow_mapping()?,
            Some(b'[') => self.parse_flow_sequence()?,
            Some(b'*') => self.parse_alias()?,
            Some(b',') | Some(b'}') | Some(b']') => self.null_at(self.pos),
            _ => self.parse_inline_scalar(true)?,
        };
        self.attach(id, anchor, tag);
        Ok(id)
    }

    fn parse_flow_mapping(&mut self) -> Result<NodeId> {
        let start = self.pos;
        self.pos += 1;
        let mut entries = Vec::new();
        loop {
            self.skip_trivia();
            match self.peek() {
                None => return Err(self.error("unterminated flow mapping")),
                Some(b'}') => {
                    self.pos += 1;
                    break;
                }
                Some(b'{') | Some(b'[') => {
                    return Err(self.error("complex mapping keys are not supported"))
                }
                _ => {}
            }
            let key = self.parse_inline_scalar(true)?;
            self.skip_trivia();
            let value = if self.peek() == Some(b':') {
                self.pos += 1;
                self.skip_trivia();
                if matches!(self.peek(), Some(b',') | Some(b'}')) {
                    self.null_at(self.pos)
                } else {
                    self.parse_flow_node()?
                }
            } else {
                let end = self.span_end(key);
                self.null_at(end)
            };
            entries.push(Entry { key, value });
            self.skip_trivia();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {
                    self.pos += 1;
                    break;
                }
                None => return Err(self.error("unterminated flow mapping")),
                Some(_) => return Err(self.error("expected ',' or '}' in flow mapping")),
            }
        }
        Ok(self.push(Node {
            span: Some(Span { start, end: self.pos }),
            anchor: None,
            tag: None,
            kind: NodeKind::Mapping(Mapping {
                style: CollectionStyle::Flow,
                column: self.column(start),
                entries,
            }),
        }))
    }

    fn parse_flow_sequence(&mut self) -> Result<NodeId> {
        let start = self.pos;
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            match self.peek() {
                None => return Err(self.error("unterminated flow sequence")),
                Some(b']') => {
                    self.pos += 1;
                    break;
                }
                _ => {}
            }
            items.push(self.parse_flow_node()?);
            self.skip_trivia();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b']') => {
                    self.pos += 1;
                    break;
                }
                Some(b':') => return Err(self.error("mappings inside flow sequences are not supported")),
                None => return Err(self.error("unterminated flow sequence")),
                Some(_) => return Err(self.error("expected ',' or ']' in flow sequence")),
            }
        }
        Ok(self.push(Node {
            span: Some(Span { start, end: self.pos }),
            anchor: None,
            tag: None,
            kind: NodeKind::Sequence(Sequence {
                style: CollectionStyle::Flow,
                items,
            }),
        }))
    }
}

/// Fold the line breaks of a multi-line quoted scalar: a single break
/// becomes a space, each empty line becomes a newline.
fn fold_lines(s: &str) -> String {
    if !s.contains('\n') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let lines: Vec<&str> = s.split('\n').collect();
    let last = lines.len() - 1;
    let mut pending_space = false;
    for (i, line) in lines.iter().enumerate() {
        let mut line = line.trim_end_matches('\r');
        if i > 0 {
            line = line.trim_start();
        }
        if i < last {
            line = line.trim_end();
        }
        if i > 0 && line.is_empty() && i < last {
            out.push('\n');
            pending_space = false;
            continue;
        }
        if pending_space {
            out.push(' ');
        }
        out.push_str(line);
        pending_space = true;
    }
    out
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some(' ') => out.push(' '),
            Some(c @ ('x' | 'u' | 'U')) => {
                let width = match c {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let hex: String = chars.by_ref().take(width).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(ch) => out.push(ch),
                    None => {
                        out.push('\\');
                        out.push(c);
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Parsed {
        Parser::new(src).parse().unwrap()
    }

    fn value(parsed: &Parsed, id: NodeId) -> &NodeKind {
        &parsed.nodes[id.0].kind
    }

    #[test]
    fn block_mapping_with_nested_sequence() {
        let parsed = parse("jobs:\n  build:\n    steps:\n      - uses: a\n      - run: b\n");
        let root = parsed.documents[0].unwrap();
        let NodeKind::Mapping(m) = value(&parsed, root) else {
            panic!("root is not a mapping");
        };
        assert_eq!(m.column, 0);
        assert_eq!(m.entries.len(), 1);
        assert_eq!(parsed.indent_unit, Some(2));
    }

    #[test]
    fn leading_byte_order_mark_is_not_part_of_first_key() {
        let parsed = parse("\u{feff}jobs:\n  a: 1\n");
        let root = parsed.documents[0].unwrap();
        let NodeKind::Mapping(m) = value(&parsed, root) else {
            panic!("root is not a mapping");
        };
        assert_eq!(m.column, 0);
        let NodeKind::Scalar(key) = value(&parsed, m.entries[0].key) else {
            panic!("key is not a scalar");
        };
        assert_eq!(key.value, "jobs");
    }

    #[test]
    fn indentless_sequence_under_key() {
        let parsed = parse("steps:\n- uses: a\n- uses: b\nname: x\n");
        let root = parsed.documents[0].unwrap();
        let NodeKind::Mapping(m) = value(&parsed, root) else {
            panic!("root is not a mapping");
        };
        assert_eq!(m.entries.len(), 2);
        let NodeKind::Sequence(seq) = value(&parsed, m.entries[0].value) else {
            panic!("steps is not a sequence");
        };
        assert_eq!(seq.items.len(), 2);
    }

    #[test]
    fn block_scalar_span_stops_at_last_content_line() {
        let src = "run: |\n  echo a\n\n  echo b\n\nnext: 1\n";
        let parsed = parse(src);
        let root = parsed.documents[0].unwrap();
        let NodeKind::Mapping(m) = value(&parsed, root) else {
            panic!("root is not a mapping");
        };
        let run = &parsed.nodes[m.entries[0].value.0];
        let span = run.span.unwrap();
        assert_eq!(&src[span.start..span.end], "|\n  echo a\n\n  echo b");
        let NodeKind::Scalar(s) = &run.kind else {
            panic!("run is not a scalar");
        };
        assert_eq!(s.value, "echo a\n\necho b");
        assert_eq!(m.entries.len(), 2);
    }

    #[test]
    fn quoted_scalars_decode() {
        let parsed = parse("a: 'it''s'\nb: \"x\\ty\"\n");
        let root = parsed.documents[0].unwrap();
        let NodeKind::Mapping(m) = value(&parsed, root) else {
            panic!("root is not a mapping");
        };
        let NodeKind::Scalar(a) = value(&parsed, m.entries[0].value) else {
            panic!("a is not a scalar");
        };
        let NodeKind::Scalar(b) = value(&parsed, m.entries[1].value) else {
            panic!("b is not a scalar");
        };
        assert_eq!(a.value, "it's");
        assert_eq!(a.style, ScalarStyle::SingleQuoted);
        assert_eq!(b.value, "x\ty");
    }

    #[test]
    fn flow_mapping_entries() {
        let parsed = parse("with: { fetch-depth: 0, persist-credentials: true }\n");
        let root = parsed.documents[0].unwrap();
        let NodeKind::Mapping(m) = value(&parsed, root) else {
            panic!("root is not a mapping");
        };
        let NodeKind::Mapping(with) = value(&parsed, m.entries[0].value) else {
            panic!("with is not a mapping");
        };
        assert_eq!(with.style, CollectionStyle::Flow);
        assert_eq!(with.entries.len(), 2);
    }

    #[test]
    fn anchors_tags_and_aliases() {
        let parsed = parse("a: &x !!str true\nb: *x\n");
        let root = parsed.documents[0].unwrap();
        let NodeKind::Mapping(m) = value(&parsed, root) else {
            panic!("root is not a mapping");
        };
        let a = &parsed.nodes[m.entries[0].value.0];
        assert_eq!(a.anchor.as_deref(), Some("x"));
        assert_eq!(a.tag.as_deref(), Some("!!str"));
        assert!(matches!(value(&parsed, m.entries[1].value), NodeKind::Alias(n) if n == "x"));
    }

    #[test]
    fn multiple_documents_and_empty_ones() {
        let parsed = parse("---\na: 1\n---\n# nothing here\n---\nb: 2\n...\n");
        assert_eq!(parsed.documents.len(), 3);
        assert!(parsed.documents[1].is_none());
    }

    #[test]
    fn multi_line_plain_scalar() {
        let parsed = parse("name: first\n  second\nnext: 1\n");
        let root = parsed.documents[0].unwrap();
        let NodeKind::Mapping(m) = value(&parsed, root) else {
            panic!("root is not a mapping");
        };
        let NodeKind::Scalar(s) = value(&parsed, m.entries[0].value) else {
            panic!("name is not a scalar");
        };
        assert_eq!(s.value, "first second");
        assert_eq!(m.entries.len(), 2);
    }

    #[test]
    fn reports_position_of_syntax_errors() {
        let err = Parser::new("a: 1\n  b: 2\n").parse().unwrap_err();
        match err {
            DpcError::Syntax { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
        assert!(Parser::new("a: \"open\n").parse().is_err());
        assert!(Parser::new("a: {b: 1\n").parse().is_err());
    }

    #[test]
    fn fold_and_unescape() {
        assert_eq!(fold_lines("a\n  b"), "a b");
        assert_eq!(fold_lines("a\n\n  b"), "a\nb");
        assert_eq!(unescape("\\u00e9\\n"), "é\n");
    }
}
