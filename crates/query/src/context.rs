//! Query evaluation context over an evaluation document.
//!
//! Wraps the document plus a cache of compiled expressions and normalizes
//! raw results: a scalar passes through, a one-element match sequence
//! unwraps to its element, an empty or absent result becomes
//! [`QueryOutput::Null`], and a longer sequence is returned whole unless a
//! match index is forced.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::debug;

use crate::ast::Expr;
use crate::error::{QueryError, Result};
use crate::interpreter::{evaluate, Evaluated};
use crate::parser::parse;

/// Normalized result of a query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    Null,
    Scalar(Value),
    Sequence(Vec<Value>),
}

impl QueryOutput {
    pub fn is_null(&self) -> bool {
        matches!(self, QueryOutput::Null)
    }

    /// Collapse into a plain JSON value (sequences become arrays).
    pub fn into_value(self) -> Value {
        match self {
            QueryOutput::Null => Value::Null,
            QueryOutput::Scalar(v) => v,
            QueryOutput::Sequence(vs) => Value::Array(vs),
        }
    }

    /// Classify the output as trigger matches.
    ///
    /// `Null` and `false` yield nothing, `true` yields `[true]`, any other
    /// scalar yields itself and a sequence yields one match per element.
    pub fn into_matches(self) -> Vec<Value> {
        match self {
            QueryOutput::Null => Vec::new(),
            QueryOutput::Scalar(Value::Bool(false)) => Vec::new(),
            QueryOutput::Scalar(v) => vec![v],
            QueryOutput::Sequence(vs) => vs,
        }
    }
}

/// Evaluates expressions against one evaluation document.
///
/// Shared read-only with action plugins and templates once the processor
/// has finished enriching the document.
#[derive(Debug)]
pub struct QueryContext {
    document: Arc<Value>,
    /// Propagate evaluation failures instead of treating them as `Null`.
    debug: bool,
    compiled: Mutex<HashMap<String, Arc<Expr>>>,
}

impl QueryContext {
    pub fn new(document: Value, debug: bool) -> Self {
        Self {
            document: Arc::new(document),
            debug,
            compiled: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the document queries run against.
    pub fn update(&mut self, document: Value) {
        self.document = Arc::new(document);
        self.compiled
            .get_mut()
            .expect("compiled expression cache poisoned")
            .clear();
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Shared handle to the current document.
    pub fn shared_document(&self) -> Arc<Value> {
        Arc::clone(&self.document)
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    /// First match when the expression matches more than once.
    pub fn first_match(&self, expr: &str) -> Result<QueryOutput> {
        self.evaluate(expr, Some(0))
    }

    /// The match at `index` when the expression matches more than once, all
    /// matches when `index` is `None`.
    pub fn specific_match(&self, expr: &str, index: Option<usize>) -> Result<QueryOutput> {
        self.evaluate(expr, index)
    }

    /// Fully normalized result without a forced index.
    pub fn any_match(&self, expr: &str) -> Result<QueryOutput> {
        self.evaluate(expr, None)
    }

    /// Evaluate and normalize `expr`.
    ///
    /// Parse and runtime failures yield `Null` unless debug mode is on. An
    /// out-of-range `force_index` is always an error.
    pub fn evaluate(&self, expr: &str, force_index: Option<usize>) -> Result<QueryOutput> {
        let raw = match self.compile(expr).and_then(|ast| evaluate(&ast, &self.document)) {
            Ok(raw) => raw,
            Err(e) => {
                if self.debug {
                    debug!(query = %expr, error = %e, "query evaluation failed");
                    return Err(e);
                }
                return Ok(QueryOutput::Null);
            }
        };

        let output = normalize(raw, force_index)?;
        if self.debug {
            debug!(query = %expr, result = ?output, "query evaluated");
        }
        Ok(output)
    }

    fn compile(&self, expr: &str) -> Result<Arc<Expr>> {
        let mut cache = self.compiled.lock().expect("compiled expression cache poisoned");
        if let Some(ast) = cache.get(expr) {
            return Ok(Arc::clone(ast));
        }
        let ast = Arc::new(parse(expr)?);
        cache.insert(expr.to_string(), Arc::clone(&ast));
        Ok(ast)
    }
}

/// An array value reached by a plain path normalizes like a multi-match.
fn normalize(raw: Evaluated, force_index: Option<usize>) -> Result<QueryOutput> {
    let values = match raw {
        Evaluated::Single(Value::Null) => return Ok(QueryOutput::Null),
        Evaluated::Single(Value::Array(items)) | Evaluated::Many(items) => items,
        Evaluated::Single(v) => return Ok(QueryOutput::Scalar(v)),
    };

    let mut values: Vec<Value> = values.into_iter().filter(|v| !v.is_null()).collect();
    match values.len() {
        0 => Ok(QueryOutput::Null),
        1 => Ok(QueryOutput::Scalar(values.remove(0))),
        len => match force_index {
            Some(index) if index < len => Ok(QueryOutput::Scalar(values.swap_remove(index))),
            Some(index) => Err(QueryError::IndexOutOfRange { index, len }),
            None => Ok(QueryOutput::Sequence(values)),
        },
    }
}
