//! Canonical, comment-preserving formatter.
//!
//! Works on the CST so no byte of commentary is lost. Every node is tried
//! flat first (one line, no comments inside); nodes that do not fit within
//! `max_line_width`, or that contain comments, fall back to multi-line:
//! the keyword and leading expressions on the head line, child nodes
//! indented, the close paren either trailing the last child or on its own
//! line. Comments attached as leading trivia re-emit as own-lines at the
//! node's indent; trailing comments stay on their line.

#[cfg(test)]
mod tests;

use std::collections::HashMap;

use crate::parser::{SyntaxKind, SyntaxNode, SyntaxToken};

#[derive(Clone, Debug)]
pub struct FormatOptions {
    /// Spaces per indent level.
    pub indent_size: usize,
    /// Line-width budget for flat rendering. At least 20.
    pub max_line_width: usize,
    /// Close paren on its own line instead of trailing the last child.
    pub align_close_paren: bool,
    pub blank_line_between_trees: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            indent_size: 2,
            max_line_width: 80,
            align_close_paren: false,
            blank_line_between_trees: true,
        }
    }
}

/// Formats a parsed program back to canonical source. Option minimums
/// (indent ≥ 1, width ≥ 20) are enforced here.
pub fn format(root: &SyntaxNode, options: &FormatOptions) -> String {
    let normalized = FormatOptions {
        indent_size: options.indent_size.max(1),
        max_line_width: options.max_line_width.max(20),
        ..options.clone()
    };
    Formatter::new(root, &normalized).run(root)
}

/// Parse-and-format convenience.
pub fn format_source(source: &str, options: &FormatOptions) -> crate::Result<String> {
    let parsed = crate::parser::parse(source)?;
    Ok(format(parsed.syntax(), options))
}

struct Formatter<'o> {
    options: &'o FormatOptions,
    /// Own-line comments attached before a token.
    leading: HashMap<SyntaxToken, Vec<String>>,
    /// Same-line comment following a token.
    trailing: HashMap<SyntaxToken, String>,
    /// Comments after the last significant token of the file.
    dangling: Vec<String>,
    out: String,
    /// Whether the last emitted line ends in a comment (a trailing close
    /// paren must then move to its own line).
    last_line_commented: bool,
}

impl<'o> Formatter<'o> {
    fn new(root: &SyntaxNode, options: &'o FormatOptions) -> Self {
        let mut leading: HashMap<SyntaxToken, Vec<String>> = HashMap::new();
        let mut trailing: HashMap<SyntaxToken, String> = HashMap::new();
        let mut dangling = Vec::new();

        let mut pending: Vec<String> = Vec::new();
        let mut last: Option<SyntaxToken> = None;
        let mut newline_since_last = true;
        for element in root.descendants_with_tokens() {
            let Some(token) = element.into_token() else {
                continue;
            };
            match token.kind() {
                SyntaxKind::Comment => {
                    if newline_since_last || last.is_none() {
                        pending.push(token.text().to_string());
                    } else if let Some(prev) = &last {
                        trailing.insert(prev.clone(), token.text().to_string());
                    }
                }
                SyntaxKind::Newline => newline_since_last = true,
                SyntaxKind::Whitespace => {}
                _ => {
                    if token.text().is_empty() {
                        continue;
                    }
                    if !pending.is_empty() {
                        leading
                            .entry(token.clone())
                            .or_default()
                            .append(&mut pending);
                    }
                    last = Some(token);
                    newline_since_last = false;
                }
            }
        }
        dangling.append(&mut pending);

        Self {
            options,
            leading,
            trailing,
            dangling,
            out: String::new(),
            last_line_commented: false,
        }
    }

    fn run(mut self, root: &SyntaxNode) -> String {
        let mut first = true;
        for child in root.children() {
            if !first {
                if self.options.blank_line_between_trees {
                    self.out.push('\n');
                }
            }
            first = false;
            self.emit_node(&child, 0);
        }
        for comment in std::mem::take(&mut self.dangling) {
            self.out.push_str(&comment);
            self.out.push('\n');
        }
        self.out
    }

    fn emit_node(&mut self, node: &SyntaxNode, indent: usize) {
        let pad = " ".repeat(indent);

        if let Some(first) = first_token(node)
            && let Some(comments) = self.leading.remove(&first)
        {
            for comment in comments {
                self.out.push_str(&pad);
                self.out.push_str(&comment);
                self.out.push('\n');
            }
            self.last_line_commented = true;
        }

        let flat = flat_text(node);
        if !self.has_internal_comments(node) && indent + flat.len() <= self.options.max_line_width
        {
            self.out.push_str(&pad);
            self.out.push_str(&flat);
            self.finish_line(node);
            return;
        }

        self.emit_multiline(node, indent);
    }

    fn emit_multiline(&mut self, node: &SyntaxNode, indent: usize) {
        let pad = " ".repeat(indent);
        let inner = indent + self.options.indent_size;

        // Head line: `(` + keyword tokens + comment-free expressions, up to
        // the first behavior-tree child.
        let mut head = String::from("(");
        let mut rest: Vec<rowan::NodeOrToken<SyntaxNode, SyntaxToken>> = Vec::new();
        let mut in_head = true;
        let mut head_last_token: Option<SyntaxToken> = None;

        for element in node.children_with_tokens() {
            match &element {
                rowan::NodeOrToken::Token(token) => {
                    if token.kind().is_trivia()
                        || token.text().is_empty()
                        || matches!(token.kind(), SyntaxKind::LeftParen | SyntaxKind::RightParen)
                    {
                        continue;
                    }
                    if in_head {
                        if head.len() > 1 {
                            head.push(' ');
                        }
                        head.push_str(token.text());
                        head_last_token = Some(token.clone());
                        // A commented token ends the head line here; the
                        // comment would otherwise swallow what follows.
                        if self.trailing.contains_key(token) {
                            in_head = false;
                        }
                    } else {
                        rest.push(element);
                    }
                }
                rowan::NodeOrToken::Node(child) => {
                    if child.kind() == SyntaxKind::Missing {
                        continue;
                    }
                    let can_inline = in_head
                        && child.kind().is_expr_node()
                        && !self.node_has_comments(child);
                    if can_inline {
                        if head.len() > 1 {
                            head.push(' ');
                        }
                        head.push_str(&flat_text(child));
                        head_last_token = last_token(child);
                    } else {
                        in_head = false;
                        rest.push(element);
                    }
                }
            }
        }

        self.out.push_str(&pad);
        self.out.push_str(&head);
        self.last_line_commented = false;
        if let Some(token) = head_last_token
            && let Some(comment) = self.trailing.remove(&token)
        {
            self.out.push(' ');
            self.out.push_str(&comment);
            self.last_line_commented = true;
        }
        self.out.push('\n');

        for element in rest {
            match element {
                rowan::NodeOrToken::Node(child) => self.emit_node(&child, inner),
                rowan::NodeOrToken::Token(token) => {
                    self.out.push_str(&" ".repeat(inner));
                    self.out.push_str(token.text());
                    self.out.push('\n');
                    self.last_line_commented = false;
                }
            }
        }

        if self.options.align_close_paren || self.last_line_commented {
            self.out.push_str(&pad);
            self.out.push(')');
            self.finish_line(node);
        } else {
            // Attach the close paren to the last emitted line.
            if self.out.ends_with('\n') {
                self.out.pop();
            }
            self.out.push(')');
            self.finish_line(node);
        }
    }

    /// Appends the trailing comment of the node's last token and terminates
    /// the line.
    fn finish_line(&mut self, node: &SyntaxNode) {
        self.last_line_commented = false;
        if let Some(last) = last_token(node)
            && let Some(comment) = self.trailing.remove(&last)
        {
            self.out.push(' ');
            self.out.push_str(&comment);
            self.last_line_commented = true;
        }
        self.out.push('\n');
    }

    /// Comments anywhere inside the node other than the already-emitted
    /// leading block of its first token.
    fn has_internal_comments(&self, node: &SyntaxNode) -> bool {
        let first = first_token(node);
        for element in node.descendants_with_tokens() {
            let Some(token) = element.into_token() else {
                continue;
            };
            if token.kind().is_trivia() || token.text().is_empty() {
                continue;
            }
            let is_last = last_token(node).as_ref() == Some(&token);
            if self.leading.contains_key(&token) && Some(&token) != first.as_ref() {
                return true;
            }
            // A trailing comment on the final token rides along after the
            // close paren; anywhere else it forces multi-line.
            if self.trailing.contains_key(&token) && !is_last {
                return true;
            }
        }
        false
    }

    fn node_has_comments(&self, node: &SyntaxNode) -> bool {
        for element in node.descendants_with_tokens() {
            let Some(token) = element.into_token() else {
                continue;
            };
            if self.leading.contains_key(&token) || self.trailing.contains_key(&token) {
                return true;
            }
        }
        false
    }
}

fn first_token(node: &SyntaxNode) -> Option<SyntaxToken> {
    node.descendants_with_tokens()
        .filter_map(|e| e.into_token())
        .find(|t| !t.kind().is_trivia() && !t.text().is_empty())
}

fn last_token(node: &SyntaxNode) -> Option<SyntaxToken> {
    node.descendants_with_tokens()
        .filter_map(|e| e.into_token())
        .filter(|t| !t.kind().is_trivia() && !t.text().is_empty())
        .last()
}

/// One-line canonical rendering: tokens joined by single spaces, no space
/// after `(` or before `)`.
fn flat_text(node: &SyntaxNode) -> String {
    let mut out = String::new();
    let mut prev: Option<SyntaxKind> = None;
    for element in node.descendants_with_tokens() {
        let Some(token) = element.into_token() else {
            continue;
        };
        if token.kind().is_trivia() || token.text().is_empty() {
            continue;
        }
        let joined = prev.is_none()
            || prev == Some(SyntaxKind::LeftParen)
            || token.kind() == SyntaxKind::RightParen;
        if !joined {
            out.push(' ');
        }
        out.push_str(token.text());
        prev = Some(token.kind());
    }
    out
}
