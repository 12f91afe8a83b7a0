//! AST to IR lowering.

mod lower;


pub use lower::lower_program;
