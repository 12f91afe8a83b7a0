//! Syntax kinds for the Crisp language.
//!
//! `SyntaxKind` serves dual roles: token kinds (from lexer) and node kinds
//! (from parser). Logos derives token recognition; node kinds lack
//! token/regex attributes. `CrispLang` implements Rowan's `Language` trait
//! for tree construction.

use logos::Logos;
use rowan::Language;

/// All token and node kinds. Tokens first, then nodes, then `__LAST` sentinel.
/// `#[repr(u16)]` enables safe transmute in `kind_from_raw`.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum SyntaxKind {
    #[token("(")]
    LeftParen = 0,

    #[token(")")]
    RightParen,

    /// Digits with a fractional part. A leading `-` binds to the literal;
    /// the post-lex pass splits it off when the literal follows `(`.
    #[regex(r"-?[0-9]+\.[0-9]+")]
    FloatLiteral,

    #[regex(r"-?[0-9]+")]
    IntLiteral,

    /// Terminated or (second pattern) unterminated-to-EOF string.
    #[regex(r#""(?:[^"\\]|\\.)*""#)]
    #[regex(r#""(?:[^"\\]|\\.)*"#)]
    StringLiteral,

    #[token("true")]
    BoolTrue,

    #[token("false")]
    BoolFalse,

    #[token("null")]
    NullLiteral,

    /// Node keywords (`tree`, `select`, …) and expression keywords
    /// (`and`, `or`, `not`) stay identifiers; the parser distinguishes them.
    #[regex(r"[A-Za-z_][A-Za-z0-9_\-]*")]
    Identifier,

    /// `.Foo.Bar.Baz` is a single token.
    #[regex(r"\.[A-Za-z_][A-Za-z0-9_\-]*(\.[A-Za-z_][A-Za-z0-9_\-]*)*")]
    MemberAccess,

    /// `::Type.Member` as one token.
    #[regex(r"::[A-Za-z_][A-Za-z0-9_\-]*\.[A-Za-z_][A-Za-z0-9_\-]*")]
    EnumLiteral,

    /// `:all`, `:n`, `:blackboard`, …
    #[regex(r":[A-Za-z_][A-Za-z0-9_\-]*")]
    Keyword,

    /// `$.Foo.Bar` as one token.
    #[regex(r"\$\.[A-Za-z_][A-Za-z0-9_\-]*(\.[A-Za-z_][A-Za-z0-9_\-]*)*")]
    BlackboardAccess,

    #[token("<body>")]
    BodyPlaceholder,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("%")]
    Percent,

    #[token("<")]
    LessThan,

    #[token(">")]
    GreaterThan,

    #[token("<=")]
    LessEqual,

    #[token(">=")]
    GreaterEqual,

    #[token("=")]
    Equal,

    #[token("!=")]
    NotEqual,

    #[regex(r"[ \t]+")]
    Whitespace,

    #[token("\n")]
    #[token("\r\n")]
    #[token("\r")]
    Newline,

    /// `;` to end of line.
    #[regex(r";[^\n\r]*", allow_greedy = true)]
    Comment,

    /// Coalesced unrecognized characters; also used for error nodes.
    Error,

    /// Sentinel emitted after the last real token.
    EndOfFile,

    // --- Node kinds (non-terminals) ---
    Program,
    TreeDef,
    Selector,
    Sequence,
    Parallel,
    Check,
    Guard,
    If,
    Invert,
    Repeat,
    Timeout,
    Cooldown,
    While,
    Reactive,
    ReactiveSelect,
    Ref,
    Import,
    Defdec,
    Defmacro,
    ParamList,
    /// Action call in node position: bare `.Member` or `(.Member args…)`.
    Call,
    /// Call of a user-defined decorator or macro: `(name args…)`.
    TemplateCall,
    /// Member access in expression position.
    MemberExpr,
    BlackboardExpr,
    /// Any literal token wrapped as an expression.
    Literal,
    BinaryExpr,
    UnaryExpr,
    LogicExpr,
    /// Bare identifier in expression position (template parameter reference).
    NameExpr,
    /// `<body>` in node position inside a defdec body.
    Placeholder,
    /// Stands in for an absent closing paren.
    Missing,

    // Must be last - used for bounds checking in `kind_from_raw`
    #[doc(hidden)]
    __LAST,
}

use SyntaxKind::*;

impl SyntaxKind {
    #[inline]
    pub fn is_trivia(self) -> bool {
        matches!(self, Whitespace | Newline | Comment)
    }

    #[inline]
    pub fn is_literal_token(self) -> bool {
        matches!(
            self,
            IntLiteral | FloatLiteral | StringLiteral | BoolTrue | BoolFalse | NullLiteral
                | EnumLiteral
        )
    }

    #[inline]
    pub fn is_operator(self) -> bool {
        matches!(
            self,
            Plus | Minus
                | Star
                | Slash
                | Percent
                | LessThan
                | GreaterThan
                | LessEqual
                | GreaterEqual
                | Equal
                | NotEqual
        )
    }

    /// Node kinds that occur in node (tick) position.
    #[inline]
    pub fn is_bt_node(self) -> bool {
        matches!(
            self,
            Selector
                | Sequence
                | Parallel
                | Check
                | Guard
                | If
                | Invert
                | Repeat
                | Timeout
                | Cooldown
                | While
                | Reactive
                | ReactiveSelect
                | Ref
                | Call
                | TemplateCall
                | Placeholder
        )
    }

    /// Node kinds that occur in expression position.
    #[inline]
    pub fn is_expr_node(self) -> bool {
        matches!(
            self,
            MemberExpr | BlackboardExpr | Literal | BinaryExpr | UnaryExpr | LogicExpr | NameExpr
        )
    }
}

impl From<SyntaxKind> for rowan::SyntaxKind {
    #[inline]
    fn from(kind: SyntaxKind) -> Self {
        Self(kind as u16)
    }
}

/// Language tag for Rowan's tree types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CrispLang {}

impl Language for CrispLang {
    type Kind = SyntaxKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> Self::Kind {
        assert!(raw.0 < __LAST as u16);
        // SAFETY: We've verified the value is in bounds, and SyntaxKind is repr(u16)
        unsafe { std::mem::transmute::<u16, SyntaxKind>(raw.0) }
    }

    fn kind_to_raw(kind: Self::Kind) -> rowan::SyntaxKind {
        kind.into()
    }
}

/// Type aliases for Rowan types parameterized by our language.
pub type SyntaxNode = rowan::SyntaxNode<CrispLang>;
pub type SyntaxToken = rowan::SyntaxToken<CrispLang>;
pub type SyntaxElement = rowan::NodeOrToken<SyntaxNode, SyntaxToken>;

/// 64-bit bitset of token `SyntaxKind`s for O(1) membership testing.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TokenSet(u64);

impl TokenSet {
    pub const EMPTY: TokenSet = TokenSet(0);

    /// Panics at compile time if any kind's discriminant >= 64.
    #[inline]
    pub const fn new(kinds: &[SyntaxKind]) -> Self {
        let mut bits = 0u64;
        let mut i = 0;
        while i < kinds.len() {
            let kind = kinds[i] as u16;
            assert!(kind < 64, "SyntaxKind value exceeds TokenSet capacity");
            bits |= 1 << kind;
            i += 1;
        }
        TokenSet(bits)
    }

    #[inline]
    pub const fn contains(&self, kind: SyntaxKind) -> bool {
        let kind = kind as u16;
        if kind >= 64 {
            return false;
        }
        self.0 & (1 << kind) != 0
    }

    #[inline]
    pub const fn union(self, other: TokenSet) -> TokenSet {
        TokenSet(self.0 | other.0)
    }
}

impl std::fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut list = f.debug_set();
        for i in 0..64u16 {
            if self.0 & (1 << i) != 0 && i < __LAST as u16 {
                let kind: SyntaxKind = unsafe { std::mem::transmute::<u16, SyntaxKind>(i) };
                list.entry(&kind);
            }
        }
        list.finish()
    }
}

/// Pre-defined token sets for the parser.
pub mod token_sets {
    use super::*;

    /// FIRST set of expression position.
    pub const EXPR_FIRST: TokenSet = TokenSet::new(&[
        LeftParen,
        IntLiteral,
        FloatLiteral,
        StringLiteral,
        BoolTrue,
        BoolFalse,
        NullLiteral,
        EnumLiteral,
        MemberAccess,
        BlackboardAccess,
        Identifier,
    ]);

    /// FIRST set of node position.
    pub const NODE_FIRST: TokenSet = TokenSet::new(&[LeftParen, MemberAccess, BodyPlaceholder]);

    pub const LITERALS: TokenSet = TokenSet::new(&[
        IntLiteral,
        FloatLiteral,
        StringLiteral,
        BoolTrue,
        BoolFalse,
        NullLiteral,
        EnumLiteral,
    ]);

    pub const OPERATORS: TokenSet = TokenSet::new(&[
        Plus,
        Minus,
        Star,
        Slash,
        Percent,
        LessThan,
        GreaterThan,
        LessEqual,
        GreaterEqual,
        Equal,
        NotEqual,
    ]);

    pub const TRIVIA: TokenSet = TokenSet::new(&[Whitespace, Newline, Comment]);

    /// Synchronization points when a top-level form cannot be parsed.
    pub const TOP_RECOVERY: TokenSet = TokenSet::new(&[LeftParen]);

    /// Synchronization points inside a node list.
    pub const NODE_RECOVERY: TokenSet =
        TokenSet::new(&[LeftParen, RightParen, MemberAccess, BodyPlaceholder]);
}

/// Reserved words recognized in node position.
pub const NODE_KEYWORDS: &[&str] = &[
    "tree",
    "select",
    "seq",
    "parallel",
    "check",
    "guard",
    "if",
    "invert",
    "repeat",
    "timeout",
    "cooldown",
    "while",
    "reactive",
    "reactive-select",
    "ref",
    "import",
    "defdec",
    "defmacro",
];

/// Reserved words recognized in expression position.
pub const EXPR_KEYWORDS: &[&str] = &["and", "or", "not", "true", "false", "null"];
