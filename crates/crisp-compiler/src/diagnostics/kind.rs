//! The static diagnostic descriptor table.
//!
//! Every diagnostic the compiler can emit is one variant here, with a
//! stable string code, a fixed severity, and a default message. Codes are
//! grouped by concern: CR1xxx syntax, CR2xxx resolution, CR3xxx types,
//! CR4xxx structure, CR5xxx templates, CR6xxx generics, CR7xxx
//! nullability, CR8xxx other.

use serde::Serialize;

/// Severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Severity {
    #[default]
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Every diagnostic kind, with stable code, severity, and default message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticKind {
    // --- Syntax ---
    ParseError,
    UnexpectedToken,
    UnterminatedString,
    UnmatchedOpenParen,
    UnexpectedCloseParen,
    UnusedTree,

    // --- Resolution ---
    MemberNotFound,
    ExternalFileNotFound,
    AmbiguousOverload,
    MissingInterface,
    EnumTypeNotFound,
    EnumMemberNotFound,
    AmbiguousMemberName,

    // --- Types ---
    TypeMismatch,
    CannotCompare,
    InvalidArithmetic,
    ArgumentCountMismatch,
    ArgumentTypeMismatch,
    BoolRequired,
    BtStatusRequired,
    ReactiveConditionType,

    // --- Structure ---
    InvalidRepeatCount,
    InvalidDuration,
    InsufficientChildren,
    UnreachableNode,
    IfWithoutElse,

    // --- Templates (defdec / defmacro) ---
    RecursiveDefdec,
    DefdecNotFound,
    DefdecParamCountMismatch,
    MissingBodyPlaceholder,
    MultipleBodyPlaceholders,
    MacroNotFound,
    MacroArgCountMismatch,
    MacroDepthExceeded,
    RecursiveMacro,
    InvalidMacroExpansion,

    // --- Generic types ---
    TypeArgumentConstraintViolation,
    TypeArgumentCountMismatch,
    OpenGenericUsedAsContext,

    // --- Nullability ---
    DereferencePossiblyNull,
    CompareNullAlwaysTrue,
    CompareNullAlwaysFalse,
    NullCheckUnnecessary,

    // --- Other ---
    ObsoleteMember,
    InternalError,
}

impl DiagnosticKind {
    /// Stable identifier used in tooling and external interfaces.
    pub fn code(self) -> &'static str {
        use DiagnosticKind::*;
        match self {
            ParseError => "CR1001",
            UnexpectedToken => "CR1002",
            UnterminatedString => "CR1003",
            UnmatchedOpenParen => "CR1004",
            UnexpectedCloseParen => "CR1005",
            UnusedTree => "CR1006",

            MemberNotFound => "CR2001",
            ExternalFileNotFound => "CR2002",
            AmbiguousOverload => "CR2003",
            MissingInterface => "CR2004",
            EnumTypeNotFound => "CR2005",
            EnumMemberNotFound => "CR2006",
            AmbiguousMemberName => "CR2007",

            TypeMismatch => "CR3001",
            CannotCompare => "CR3002",
            InvalidArithmetic => "CR3003",
            ArgumentCountMismatch => "CR3004",
            ArgumentTypeMismatch => "CR3005",
            BoolRequired => "CR3006",
            BtStatusRequired => "CR3007",
            ReactiveConditionType => "CR3008",

            InvalidRepeatCount => "CR4001",
            InvalidDuration => "CR4002",
            InsufficientChildren => "CR4003",
            UnreachableNode => "CR4004",
            IfWithoutElse => "CR4005",

            RecursiveDefdec => "CR5001",
            DefdecNotFound => "CR5002",
            DefdecParamCountMismatch => "CR5003",
            MissingBodyPlaceholder => "CR5004",
            MultipleBodyPlaceholders => "CR5005",
            MacroNotFound => "CR5006",
            MacroArgCountMismatch => "CR5007",
            MacroDepthExceeded => "CR5008",
            RecursiveMacro => "CR5009",
            InvalidMacroExpansion => "CR5010",

            TypeArgumentConstraintViolation => "CR6001",
            TypeArgumentCountMismatch => "CR6002",
            OpenGenericUsedAsContext => "CR6003",

            DereferencePossiblyNull => "CR7001",
            CompareNullAlwaysTrue => "CR7002",
            CompareNullAlwaysFalse => "CR7003",
            NullCheckUnnecessary => "CR7004",

            ObsoleteMember => "CR8001",
            InternalError => "CR8002",
        }
    }

    pub fn severity(self) -> Severity {
        use DiagnosticKind::*;
        match self {
            UnusedTree | AmbiguousMemberName | UnreachableNode | DereferencePossiblyNull
            | CompareNullAlwaysTrue | CompareNullAlwaysFalse | ObsoleteMember => Severity::Warning,
            IfWithoutElse | NullCheckUnnecessary => Severity::Info,
            _ => Severity::Error,
        }
    }

    /// Taxonomy-level guidance rendered as a help footer, for the kinds
    /// whose fix is mechanical enough to state.
    pub fn help(self) -> Option<&'static str> {
        use DiagnosticKind::*;
        match self {
            UnterminatedString => Some("close the string with `\"`"),
            UnmatchedOpenParen => Some("add the missing `)`"),
            UnexpectedCloseParen => Some("remove this `)` or open a form before it"),
            BoolRequired | ReactiveConditionType => {
                Some("wrap the value in a comparison such as `(> … 0)` to get a Bool")
            }
            BtStatusRequired => {
                Some("point the action at a method declared to return BtStatus")
            }
            InvalidRepeatCount => {
                Some("write the count as an integer literal, e.g. `(repeat 3 …)`")
            }
            InvalidDuration => {
                Some("write the duration as a positive literal, e.g. `(timeout 1.5 …)`")
            }
            MissingBodyPlaceholder => {
                Some("put `<body>` where the wrapped child should run")
            }
            IfWithoutElse => {
                Some("add an else branch, or use `(guard …)` when failing is intended")
            }
            DereferencePossiblyNull => {
                Some("test the member against null before navigating through it")
            }
            ExternalFileNotFound => {
                Some("register the imported file in the session before analyzing")
            }
            _ => None,
        }
    }

    pub fn default_message(self) -> &'static str {
        use DiagnosticKind::*;
        match self {
            ParseError => "could not parse this form",
            UnexpectedToken => "unexpected token",
            UnterminatedString => "unterminated string literal",
            UnmatchedOpenParen => "unmatched `(`",
            UnexpectedCloseParen => "unexpected `)`",
            UnusedTree => "tree is never referenced",

            MemberNotFound => "member not found on context type",
            ExternalFileNotFound => "imported file not found",
            AmbiguousOverload => "ambiguous method overload",
            MissingInterface => "context type does not provide the required interface",
            EnumTypeNotFound => "enum type not found",
            EnumMemberNotFound => "enum member not found",
            AmbiguousMemberName => "member name resolves ambiguously",

            TypeMismatch => "mismatched types",
            CannotCompare => "these types cannot be compared",
            InvalidArithmetic => "arithmetic requires numeric operands",
            ArgumentCountMismatch => "wrong number of arguments",
            ArgumentTypeMismatch => "argument type does not match parameter",
            BoolRequired => "condition must be Bool",
            BtStatusRequired => "action must resolve to a method returning BtStatus",
            ReactiveConditionType => "reactive condition must be Bool",

            InvalidRepeatCount => "repeat count must be an integer literal of at least 1",
            InvalidDuration => "duration must be a positive numeric literal",
            InsufficientChildren => "this node needs more children",
            UnreachableNode => "node is unreachable",
            IfWithoutElse => "`if` without an `else` branch fails when the condition is false",

            RecursiveDefdec => "recursive defdec expansion",
            DefdecNotFound => "unknown decorator",
            DefdecParamCountMismatch => "wrong number of decorator arguments",
            MissingBodyPlaceholder => "defdec body must contain `<body>`",
            MultipleBodyPlaceholders => "defdec body may contain `<body>` only once",
            MacroNotFound => "unknown macro",
            MacroArgCountMismatch => "wrong number of macro arguments",
            MacroDepthExceeded => "macro expansion too deep",
            RecursiveMacro => "recursive macro expansion",
            InvalidMacroExpansion => "macro expansion produced an invalid form",

            TypeArgumentConstraintViolation => "type argument violates its constraint",
            TypeArgumentCountMismatch => "wrong number of type arguments",
            OpenGenericUsedAsContext => "open generic type cannot be used as a context",

            DereferencePossiblyNull => "member may be null here",
            CompareNullAlwaysTrue => "comparison against null is always true",
            CompareNullAlwaysFalse => "comparison against null is always false",
            NullCheckUnnecessary => "null check is unnecessary",

            ObsoleteMember => "member is obsolete",
            InternalError => "internal compiler error",
        }
    }
}
