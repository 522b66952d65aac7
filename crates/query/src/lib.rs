//! Path-expression queries over JSON evaluation documents.
//!
//! This crate provides:
//! - A compact ObjectPath-style expression language (lexer, parser, interpreter)
//! - [`QueryContext`], which normalizes heterogeneous results into
//!   null / scalar / sequence and exposes the first/specific/any match variants

pub mod ast;
pub mod context;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;

pub use context::{QueryContext, QueryOutput};
pub use error::{QueryError, Result};
pub use parser::parse;
