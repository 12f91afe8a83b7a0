//! Typed wrappers over CST nodes.
//!
//! Each struct wraps a `SyntaxNode` and provides typed accessors.
//! Cast is infallible for correct `SyntaxKind` - validation happens elsewhere.

use super::cst::{SyntaxKind, SyntaxNode, SyntaxToken};

macro_rules! ast_node {
    ($name:ident, $kind:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(SyntaxNode);

        impl $name {
            pub fn cast(node: SyntaxNode) -> Option<Self> {
                (node.kind() == SyntaxKind::$kind).then(|| Self(node))
            }

            pub fn syntax(&self) -> &SyntaxNode {
                &self.0
            }
        }
    };
}

ast_node!(Program, Program);
ast_node!(TreeDef, TreeDef);
ast_node!(Defdec, Defdec);
ast_node!(Defmacro, Defmacro);
ast_node!(Import, Import);
ast_node!(ParamList, ParamList);

/// Significant identifier tokens that are direct children of `node`.
fn identifiers(node: &SyntaxNode) -> impl Iterator<Item = SyntaxToken> + '_ {
    node.children_with_tokens()
        .filter_map(|it| it.into_token())
        .filter(|t| t.kind() == SyntaxKind::Identifier)
}

impl Program {
    pub fn trees(&self) -> impl Iterator<Item = TreeDef> + '_ {
        self.0.children().filter_map(TreeDef::cast)
    }

    pub fn defdecs(&self) -> impl Iterator<Item = Defdec> + '_ {
        self.0.children().filter_map(Defdec::cast)
    }

    pub fn defmacros(&self) -> impl Iterator<Item = Defmacro> + '_ {
        self.0.children().filter_map(Defmacro::cast)
    }

    pub fn imports(&self) -> impl Iterator<Item = Import> + '_ {
        self.0.children().filter_map(Import::cast)
    }
}

impl TreeDef {
    /// The tree name: the identifier after the `tree` keyword.
    pub fn name(&self) -> Option<SyntaxToken> {
        identifiers(&self.0).nth(1).filter(|t| !t.text().is_empty())
    }

    /// The type named by a `:blackboard Type` option.
    pub fn blackboard_type(&self) -> Option<SyntaxToken> {
        let mut after_keyword = false;
        for element in self.0.children_with_tokens() {
            if let Some(token) = element.into_token() {
                if after_keyword && token.kind() == SyntaxKind::Identifier {
                    return Some(token);
                }
                if token.kind() == SyntaxKind::Keyword && token.text() == ":blackboard" {
                    after_keyword = true;
                }
            }
        }
        None
    }

    pub fn body(&self) -> impl Iterator<Item = SyntaxNode> + '_ {
        self.0.children().filter(|n| n.kind().is_bt_node())
    }
}

impl Defdec {
    pub fn name(&self) -> Option<SyntaxToken> {
        identifiers(&self.0).nth(1).filter(|t| !t.text().is_empty())
    }

    pub fn params(&self) -> Option<ParamList> {
        self.0.children().find_map(ParamList::cast)
    }

    pub fn body(&self) -> Option<SyntaxNode> {
        self.0.children().find(|n| n.kind().is_bt_node())
    }
}

impl Defmacro {
    pub fn name(&self) -> Option<SyntaxToken> {
        identifiers(&self.0).nth(1).filter(|t| !t.text().is_empty())
    }

    pub fn params(&self) -> Option<ParamList> {
        self.0.children().find_map(ParamList::cast)
    }

    pub fn body(&self) -> Option<SyntaxNode> {
        self.0.children().find(|n| n.kind().is_bt_node())
    }
}

impl ParamList {
    pub fn names(&self) -> Vec<String> {
        identifiers(&self.0).map(|t| t.text().to_string()).collect()
    }
}

impl Import {
    pub fn path_token(&self) -> Option<SyntaxToken> {
        self.0
            .children_with_tokens()
            .filter_map(|it| it.into_token())
            .find(|t| t.kind() == SyntaxKind::StringLiteral)
    }

    /// The import path with quotes stripped.
    pub fn path(&self) -> Option<String> {
        let token = self.path_token()?;
        let text = token.text();
        let text = text.strip_prefix('"').unwrap_or(text);
        let text = text.strip_suffix('"').unwrap_or(text);
        Some(text.to_string())
    }
}
