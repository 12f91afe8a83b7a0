//! Runtime failures. Each one aborts the current tick; the embedding
//! receives the error and decides what to do with the agent.

use crisp_core::AccessError;

#[derive(Debug, Clone, thiserror::Error)]
pub enum RuntimeError {
    #[error("no tree named `{0}` is registered")]
    UnknownTree(String),

    #[error("no member `{member}` on the {on}")]
    MissingMember { member: String, on: &'static str },

    #[error("cannot read member `{member}` of a {found} value")]
    MemberOnValue {
        member: String,
        found: &'static str,
    },

    #[error("cannot call `{method}` on null")]
    NullReceiver { method: String },

    #[error("no blackboard is configured for this interpreter")]
    BlackboardMissing,

    #[error("action `{method}` returned {found}, expected BtStatus")]
    NotAStatus {
        method: String,
        found: &'static str,
    },

    #[error("condition evaluated to {0}, expected Bool")]
    NonBoolCondition(&'static str),

    #[error("`{op}` cannot combine {lhs} and {rhs}")]
    InvalidOperands {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },

    #[error("cannot convert {from} to {to}")]
    InvalidConversion { from: &'static str, to: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error(transparent)]
    Access(#[from] AccessError),
}
