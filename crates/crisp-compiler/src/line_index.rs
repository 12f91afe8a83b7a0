//! Line/column mapping and position-based CST lookups.

use rowan::{TextRange, TextSize};

use crate::parser::{SyntaxNode, SyntaxToken};

/// Zero-based line/column position.
pub type LineCol = (u32, u32);

/// Precomputed line starts for a source text.
///
/// `\n`, `\r\n`, and bare `\r` each count as one line terminator
/// (`\r\n` is a single break).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    /// Byte offset of the first character of each line. Always starts with 0.
    line_starts: Vec<u32>,
    len: u32,
}

impl LineIndex {
    pub fn new(text: &str) -> LineIndex {
        let mut line_starts = vec![0u32];
        let bytes = text.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\n' => {
                    line_starts.push((i + 1) as u32);
                    i += 1;
                }
                b'\r' => {
                    let next = if i + 1 < bytes.len() && bytes[i + 1] == b'\n' {
                        i + 2
                    } else {
                        i + 1
                    };
                    line_starts.push(next as u32);
                    i = next;
                }
                _ => i += 1,
            }
        }
        LineIndex {
            line_starts,
            len: text.len() as u32,
        }
    }

    pub fn line_count(&self) -> u32 {
        self.line_starts.len() as u32
    }

    /// Offset of a zero-based line/column, clamped to the source length.
    ///
    /// Panics on a negative-like out-of-range line only in the sense that a
    /// line past the end clamps to the end of the text.
    pub fn offset(&self, line: u32, col: u32) -> TextSize {
        let start = match self.line_starts.get(line as usize) {
            Some(&s) => s,
            None => return TextSize::from(self.len),
        };
        let offset = start.saturating_add(col).min(self.len);
        TextSize::from(offset)
    }

    /// Zero-based line/column of a byte offset (clamped to the source length).
    pub fn line_col(&self, offset: TextSize) -> LineCol {
        let offset = u32::from(offset).min(self.len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let col = offset - self.line_starts[line];
        (line as u32, col)
    }

    /// Start and end positions of a span.
    pub fn range(&self, span: TextRange) -> (LineCol, LineCol) {
        (self.line_col(span.start()), self.line_col(span.end()))
    }
}

/// The innermost node whose span satisfies `start <= offset < end`.
pub fn node_at_offset(root: &SyntaxNode, offset: TextSize) -> Option<SyntaxNode> {
    if !contains(root.text_range(), offset) {
        return None;
    }
    let mut current = root.clone();
    loop {
        match current
            .children()
            .find(|child| contains(child.text_range(), offset))
        {
            Some(child) => current = child,
            None => return Some(current),
        }
    }
}

/// The token at `offset`, if any.
pub fn token_at_offset(root: &SyntaxNode, offset: TextSize) -> Option<SyntaxToken> {
    let node = node_at_offset(root, offset)?;
    node.children_with_tokens()
        .filter_map(|it| it.into_token())
        .find(|t| contains(t.text_range(), offset))
}

fn contains(range: TextRange, offset: TextSize) -> bool {
    range.start() <= offset && offset < range.end()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_all_line_break_styles() {
        let index = LineIndex::new("a\nb\r\nc\rd");
        assert_eq!(index.line_count(), 4);
        assert_eq!(index.line_col(TextSize::from(0)), (0, 0));
        assert_eq!(index.line_col(TextSize::from(2)), (1, 0));
        assert_eq!(index.line_col(TextSize::from(5)), (2, 0));
        assert_eq!(index.line_col(TextSize::from(7)), (3, 0));
    }

    #[test]
    fn offset_round_trips() {
        let text = "(tree T\n  (.Patrol))";
        let index = LineIndex::new(text);
        for (i, _) in text.char_indices() {
            let offset = TextSize::from(i as u32);
            let (line, col) = index.line_col(offset);
            assert_eq!(index.offset(line, col), offset);
        }
    }

    #[test]
    fn offset_clamps_to_source_length() {
        let index = LineIndex::new("ab");
        assert_eq!(index.offset(0, 99), TextSize::from(2));
        assert_eq!(index.offset(7, 0), TextSize::from(2));
    }

    #[test]
    fn finds_innermost_node_and_token() {
        let source = "(tree T (check true))";
        let parsed = crate::parser::parse(source).unwrap();
        let root = parsed.syntax().clone();

        // Offset of `true`.
        let offset = TextSize::from(15);
        let node = node_at_offset(&root, offset).unwrap();
        assert_eq!(node.kind(), crate::parser::SyntaxKind::Literal);

        let token = token_at_offset(&root, offset).unwrap();
        assert_eq!(token.text(), "true");
    }
}
