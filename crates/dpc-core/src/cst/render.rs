use super::{CollectionStyle, Entry, Mapping, NodeId, NodeKind, Span, Tree};

/// A replacement of `remove` source bytes at `at` by `text`.
struct Splice {
    at: usize,
    remove: usize,
    text: String,
}

impl Tree {
    /// Serialize the tree. Source nodes are copied verbatim; only replaced
    /// scalars and synthetic entries produce new text.
    pub fn render(&self) -> String {
        let mut splices = Vec::new();
        for root in self.documents() {
            self.collect(root, &mut splices);
        }
        // Stable: a nested insertion collected first stays ahead of its
        // parent's insertion at the same offset.
        splices.sort_by_key(|s| s.at);

        let mut out = String::with_capacity(self.src.len() + 64 * splices.len());
        let mut cursor = 0;
        for splice in splices {
            out.push_str(&self.src[cursor..splice.at]);
            out.push_str(&splice.text);
            cursor = splice.at + splice.remove;
        }
        out.push_str(&self.src[cursor..]);
        out
    }

    fn collect(&self, id: NodeId, out: &mut Vec<Splice>) {
        let node = self.node(id);
        let Some(span) = node.span else {
            return;
        };
        match &node.kind {
            NodeKind::Scalar(s) => {
                if let Some(token) = s.replacement() {
                    out.push(Splice {
                        at: span.start,
                        remove: span.len(),
                        text: token.to_string(),
                    });
                }
            }
            NodeKind::Mapping(m) => {
                for entry in &m.entries {
                    self.collect(entry.key, out);
                    self.collect(entry.value, out);
                }
                let appended: Vec<&Entry> = m
                    .entries
                    .iter()
                    .filter(|e| self.is_synthetic(e.key))
                    .collect();
                if !appended.is_empty() {
                    out.push(self.append_splice(span, m, &appended));
                }
            }
            NodeKind::Sequence(s) => {
                for &item in &s.items {
                    self.collect(item, out);
                }
            }
            NodeKind::Null | NodeKind::Alias(_) => {}
        }
    }

    fn append_splice(&self, span: Span, m: &Mapping, appended: &[&Entry]) -> Splice {
        let last = m
            .entries
            .iter()
            .rev()
            .find(|e| !self.is_synthetic(e.key))
            .map(|e| self.end_of(e.key).max(self.end_of(e.value)));

        match m.style {
            CollectionStyle::Block => {
                let at = self.line_end(last.unwrap_or(span.end));
                let mut text = String::new();
                for entry in appended {
                    text.push_str(self.newline);
                    text.push_str(&" ".repeat(m.column));
                    self.emit_entry(entry, m.column, &mut text);
                }
                Splice { at, remove: 0, text }
            }
            CollectionStyle::Flow => {
                let mut text = String::new();
                let at = match last {
                    Some(end) => {
                        text.push_str(", ");
                        end
                    }
                    None => span.start + 1,
                };
                let rendered: Vec<String> = appended
                    .iter()
                    .map(|e| {
                        let mut s = String::new();
                        self.emit_flow_entry(e, &mut s);
                        s
                    })
                    .collect();
                text.push_str(&rendered.join(", "));
                Splice { at, remove: 0, text }
            }
        }
    }

    fn end_of(&self, id: NodeId) -> usize {
        self.node(id).span.map_or(0, |s| s.end)
    }

    /// Offset of the line break ending the line that contains `pos`.
    fn line_end(&self, pos: usize) -> usize {
        let bytes = self.src.as_bytes();
        match bytes[pos..].iter().position(|&b| b == b'\n') {
            Some(i) if i > 0 && bytes[pos + i - 1] == b'\r' => pos + i - 1,
            Some(i) => pos + i,
            None => bytes.len(),
        }
    }

    // -----------------------------------------------------------------------
    // Emitting synthetic nodes
    // -----------------------------------------------------------------------

    fn emit_entry(&self, entry: &Entry, column: usize, out: &mut String) {
        self.emit_scalar_token(entry.key, out);
        out.push(':');
        let value = self.node(entry.value);
        match &value.kind {
            NodeKind::Mapping(m) if m.style == CollectionStyle::Block => {
                let inner = column + self.indent_unit;
                for child in &m.entries {
                    out.push_str(self.newline);
                    out.push_str(&" ".repeat(inner));
                    self.emit_entry(child, inner, out);
                }
            }
            NodeKind::Null => {}
            _ => {
                out.push(' ');
                self.emit_flow(entry.value, out);
            }
        }
    }

    fn emit_flow_entry(&self, entry: &Entry, out: &mut String) {
        self.emit_scalar_token(entry.key, out);
        out.push(':');
        if !matches!(self.node(entry.value).kind, NodeKind::Null) {
            out.push(' ');
            self.emit_flow(entry.value, out);
        }
    }

    fn emit_flow(&self, id: NodeId, out: &mut String) {
        let node = self.node(id);
        if let Some(span) = node.span {
            // A source node reached from a synthetic parent is copied as-is.
            out.push_str(&self.src[span.start..span.end]);
            return;
        }
        match &node.kind {
            NodeKind::Scalar(_) => self.emit_scalar_token(id, out),
            NodeKind::Alias(name) => {
                out.push('*');
                out.push_str(name);
            }
            NodeKind::Mapping(m) => {
                out.push('{');
                for (i, entry) in m.entries.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.emit_flow_entry(entry, out);
                }
                out.push('}');
            }
            NodeKind::Sequence(s) => {
                out.push('[');
                for (i, &item) in s.items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.emit_flow(item, out);
                }
                out.push(']');
            }
            NodeKind::Null => {}
        }
    }

    fn emit_scalar_token(&self, id: NodeId, out: &mut String) {
        if let NodeKind::Scalar(s) = &self.node(id).kind {
            out.push_str(s.replacement().unwrap_or(&s.value));
        }
    }
}
