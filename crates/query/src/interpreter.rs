//! Tree-walking evaluator for [`Expr`] over a JSON document.
//!
//! Paths that pass through a wildcard, recursive descent or filter produce
//! an [`Evaluated::Many`] match sequence; everything else produces a single
//! value. Child access on an array maps over its elements.

use serde_json::Value;

use crate::ast::{CmpOp, Expr, Path, Root, Step};
use crate::error::{QueryError, Result};

/// Raw evaluation result before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluated {
    Single(Value),
    Many(Vec<Value>),
}

impl Evaluated {
    fn truthy(&self) -> bool {
        match self {
            Evaluated::Single(v) => truthy(v),
            Evaluated::Many(vs) => !vs.is_empty(),
        }
    }

    fn items(&self) -> Vec<&Value> {
        match self {
            Evaluated::Single(v) => vec![v],
            Evaluated::Many(vs) => vs.iter().collect(),
        }
    }
}

/// Evaluate `expr` against `document`.
pub fn evaluate(expr: &Expr, document: &Value) -> Result<Evaluated> {
    Scope {
        document,
        current: document,
    }
    .eval(expr)
}

struct Scope<'a> {
    document: &'a Value,
    current: &'a Value,
}

impl<'a> Scope<'a> {
    fn eval(&self, expr: &Expr) -> Result<Evaluated> {
        match expr {
            Expr::Literal(v) => Ok(Evaluated::Single(v.clone())),
            Expr::Path(path) => self.path(path),
            Expr::Not(inner) => Ok(boolean(!self.eval(inner)?.truthy())),
            Expr::Neg(inner) => match self.eval(inner)? {
                Evaluated::Single(Value::Number(n)) => Ok(Evaluated::Single(
                    serde_json::Number::from_f64(-n.as_f64().unwrap_or(0.0))
                        .map(Value::Number)
                        .unwrap_or(Value::Null),
                )),
                other => Err(QueryError::Type(format!("cannot negate {other:?}"))),
            },
            Expr::And(lhs, rhs) => {
                Ok(boolean(self.eval(lhs)?.truthy() && self.eval(rhs)?.truthy()))
            }
            Expr::Or(lhs, rhs) => {
                Ok(boolean(self.eval(lhs)?.truthy() || self.eval(rhs)?.truthy()))
            }
            Expr::Compare { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                Ok(boolean(compare(*op, &lhs, &rhs)))
            }
            Expr::Call { name, args } => self.call(name, args),
        }
    }

    fn path(&self, path: &Path) -> Result<Evaluated> {
        let start = match path.root {
            Root::Document => self.document,
            Root::Current => self.current,
        };
        let mut nodes: Vec<Value> = vec![start.clone()];
        let mut many = false;

        for step in &path.steps {
            nodes = match step {
                Step::Child(name) => {
                    let mut next = Vec::new();
                    for node in &nodes {
                        match node {
                            Value::Object(map) => {
                                if let Some(v) = map.get(name) {
                                    next.push(v.clone());
                                }
                            }
                            Value::Array(items) => {
                                many = true;
                                next.extend(
                                    items
                                        .iter()
                                        .filter_map(|item| item.get(name.as_str()))
                                        .cloned(),
                                );
                            }
                            _ => {}
                        }
                    }
                    next
                }
                Step::Descend(name) => {
                    let mut next = Vec::new();
                    for node in &nodes {
                        descend(node, name.as_deref(), &mut next);
                    }
                    next
                }
                Step::Wildcard => {
                    let mut next = Vec::new();
                    for node in &nodes {
                        match node {
                            Value::Array(items) => next.extend(items.iter().cloned()),
                            Value::Object(map) => next.extend(map.values().cloned()),
                            _ => {}
                        }
                    }
                    next
                }
                Step::Index(index) => {
                    if many {
                        many = false;
                        pick(&nodes, *index).into_iter().collect()
                    } else {
                        match nodes.first() {
                            Some(Value::Array(items)) => pick(items, *index).into_iter().collect(),
                            _ => Vec::new(),
                        }
                    }
                }
                Step::Filter(predicate) => {
                    let candidates: Vec<Value> = if many {
                        nodes
                            .into_iter()
                            .flat_map(|node| match node {
                                Value::Array(items) => items,
                                Value::Null => Vec::new(),
                                other => vec![other],
                            })
                            .collect()
                    } else {
                        match nodes.into_iter().next() {
                            Some(Value::Array(items)) => items,
                            Some(Value::Null) | None => Vec::new(),
                            Some(other) => vec![other],
                        }
                    };
                    let mut kept = Vec::new();
                    for candidate in candidates {
                        let scope = Scope {
                            document: self.document,
                            current: &candidate,
                        };
                        if scope.eval(predicate)?.truthy() {
                            kept.push(candidate);
                        }
                    }
                    kept
                }
            };
            if step.yields_sequence() {
                many = true;
            }
        }

        if many {
            Ok(Evaluated::Many(nodes))
        } else {
            Ok(Evaluated::Single(nodes.into_iter().next().unwrap_or(Value::Null)))
        }
    }

    fn call(&self, name: &str, args: &[Expr]) -> Result<Evaluated> {
        let arity = |expected: usize| -> Result<()> {
            if args.len() == expected {
                Ok(())
            } else {
                Err(QueryError::Arity {
                    name: name.to_string(),
                    expected,
                    got: args.len(),
                })
            }
        };

        match name {
            "len" | "count" => {
                arity(1)?;
                let n = match self.eval(&args[0])? {
                    Evaluated::Many(vs) => vs.len(),
                    Evaluated::Single(Value::Array(a)) => a.len(),
                    Evaluated::Single(Value::Object(m)) => m.len(),
                    Evaluated::Single(Value::String(s)) => s.chars().count(),
                    Evaluated::Single(Value::Null) => 0,
                    Evaluated::Single(other) => {
                        return Err(QueryError::Type(format!("len() of {other}")))
                    }
                };
                Ok(Evaluated::Single(Value::from(n)))
            }
            "lower" | "upper" | "str" | "int" => {
                arity(1)?;
                let convert = |v: &Value| -> Result<Value> {
                    match name {
                        "lower" => Ok(Value::String(as_text(v).to_lowercase())),
                        "upper" => Ok(Value::String(as_text(v).to_uppercase())),
                        "str" => Ok(Value::String(as_text(v))),
                        _ => to_int(v),
                    }
                };
                match self.eval(&args[0])? {
                    Evaluated::Single(v) => Ok(Evaluated::Single(convert(&v)?)),
                    Evaluated::Many(vs) => Ok(Evaluated::Many(
                        vs.iter().map(convert).collect::<Result<Vec<_>>>()?,
                    )),
                }
            }
            "startswith" | "endswith" | "contains" => {
                arity(2)?;
                let subject = self.eval(&args[0])?;
                let needle = match self.eval(&args[1])? {
                    Evaluated::Single(v) => as_text(&v),
                    Evaluated::Many(_) => {
                        return Err(QueryError::Type(format!(
                            "{name}() needs a single value as its second argument"
                        )))
                    }
                };
                let hit = subject.items().into_iter().any(|v| {
                    let text = as_text(v);
                    match name {
                        "startswith" => text.starts_with(&needle),
                        "endswith" => text.ends_with(&needle),
                        _ => text.contains(&needle),
                    }
                });
                Ok(boolean(hit))
            }
            other => Err(QueryError::UnknownFunction(other.to_string())),
        }
    }
}

fn boolean(b: bool) -> Evaluated {
    Evaluated::Single(Value::Bool(b))
}

fn descend(node: &Value, name: Option<&str>, out: &mut Vec<Value>) {
    match node {
        Value::Object(map) => {
            for (key, child) in map {
                if name.map_or(true, |n| n == key) {
                    out.push(child.clone());
                }
                descend(child, name, out);
            }
        }
        Value::Array(items) => {
            for child in items {
                if name.is_none() {
                    out.push(child.clone());
                }
                descend(child, name, out);
            }
        }
        _ => {}
    }
}

fn pick(items: &[Value], index: i64) -> Option<Value> {
    let len = items.len() as i64;
    let resolved = if index < 0 { len + index } else { index };
    if resolved < 0 {
        return None;
    }
    items.get(resolved as usize).cloned()
}

/// Python-like truthiness: empty containers, zero, `""`, `false` and
/// `null` are false.
pub fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(m) => !m.is_empty(),
    }
}

fn as_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn to_int(v: &Value) -> Result<Value> {
    match v {
        Value::Number(n) => Ok(Value::from(n.as_f64().unwrap_or(0.0).trunc() as i64)),
        Value::Bool(b) => Ok(Value::from(*b as i64)),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(|f| Value::from(f.trunc() as i64))
            .map_err(|_| QueryError::Type(format!("int() of non-numeric string '{s}'"))),
        other => Err(QueryError::Type(format!("int() of {other}"))),
    }
}

fn compare(op: CmpOp, lhs: &Evaluated, rhs: &Evaluated) -> bool {
    match op {
        CmpOp::In => membership(lhs, rhs),
        CmpOp::NotIn => !membership(lhs, rhs),
        CmpOp::Ne => !lhs
            .items()
            .into_iter()
            .any(|l| rhs.items().into_iter().any(|r| values_equal(l, r))),
        _ => lhs.items().into_iter().any(|l| {
            rhs.items()
                .into_iter()
                .any(|r| compare_values(op, l, r))
        }),
    }
}

fn membership(lhs: &Evaluated, rhs: &Evaluated) -> bool {
    match rhs {
        Evaluated::Many(set) => lhs
            .items()
            .into_iter()
            .any(|l| set.iter().any(|r| values_equal(l, r))),
        Evaluated::Single(container) => lhs.items().into_iter().any(|l| match container {
            Value::Array(items) => items.iter().any(|r| values_equal(l, r)),
            Value::Object(map) => l.as_str().map_or(false, |k| map.contains_key(k)),
            Value::String(s) => s.contains(&as_text(l)),
            _ => false,
        }),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn compare_values(op: CmpOp, a: &Value, b: &Value) -> bool {
    use std::cmp::Ordering;

    if op == CmpOp::Eq {
        return values_equal(a, b);
    }
    let ordering = match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64().partial_cmp(&y.as_f64()),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    };
    let Some(ordering) = ordering else {
        return false;
    };
    match op {
        CmpOp::Lt => ordering == Ordering::Less,
        CmpOp::Le => ordering != Ordering::Greater,
        CmpOp::Gt => ordering == Ordering::Greater,
        CmpOp::Ge => ordering != Ordering::Less,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use serde_json::json;

    fn run(expr: &str, doc: &Value) -> Evaluated {
        evaluate(&parse(expr).unwrap(), doc).unwrap()
    }

    fn scan() -> Value {
        json!({
            "result_json": {
                "scanResult": [
                    {"id": "cipher_x", "finding": "weak-cipher", "severity": "HIGH"},
                    {"id": "cert_notAfter", "finding": "2030-01-01 00:00", "severity": "INFO"},
                    {"id": "protocol", "finding": "TLSv1.3", "severity": "OK"}
                ]
            },
            "cert_expires_in_days": 12
        })
    }

    #[test]
    fn plain_path_is_single() {
        assert_eq!(
            run("$.cert_expires_in_days", &scan()),
            Evaluated::Single(json!(12))
        );
        assert_eq!(run("$.missing.deeper", &scan()), Evaluated::Single(Value::Null));
    }

    #[test]
    fn filter_selects_matching_elements() {
        let out = run(r#"$.result_json.scanResult[@.finding is "weak-cipher"].id"#, &scan());
        assert_eq!(out, Evaluated::Many(vec![json!("cipher_x")]));
    }

    #[test]
    fn child_maps_over_arrays() {
        let out = run("$.result_json.scanResult.severity", &scan());
        assert_eq!(out, Evaluated::Many(vec![json!("HIGH"), json!("INFO"), json!("OK")]));
    }

    #[test]
    fn descent_collects_all_named_keys() {
        let out = run("$..id", &scan());
        assert_eq!(
            out,
            Evaluated::Many(vec![json!("cipher_x"), json!("cert_notAfter"), json!("protocol")])
        );
    }

    #[test]
    fn index_on_match_sequence() {
        let out = run("$..id[-1]", &scan());
        assert_eq!(out, Evaluated::Single(json!("protocol")));
    }

    #[test]
    fn comparison_against_sequence_is_existential() {
        assert_eq!(
            run(r#"$.result_json.scanResult.severity is "HIGH""#, &scan()),
            Evaluated::Single(json!(true))
        );
        assert_eq!(
            run(r#"$.result_json.scanResult.severity is "CRITICAL""#, &scan()),
            Evaluated::Single(json!(false))
        );
    }

    #[test]
    fn numeric_comparisons_and_boolean_ops() {
        let doc = scan();
        assert_eq!(run("$.cert_expires_in_days < 30", &doc), Evaluated::Single(json!(true)));
        assert_eq!(
            run("$.cert_expires_in_days < 30 and not ($.cert_expires_in_days < 0)", &doc),
            Evaluated::Single(json!(true))
        );
        assert_eq!(run("$.cert_expires_in_days >= 12.0", &doc), Evaluated::Single(json!(true)));
    }

    #[test]
    fn functions() {
        let doc = scan();
        assert_eq!(run("len($.result_json.scanResult)", &doc), Evaluated::Single(json!(3)));
        assert_eq!(
            run("startswith($..finding, 'TLS')", &doc),
            Evaluated::Single(json!(true))
        );
        assert_eq!(
            run(r#"$.result_json.scanResult[lower(@.severity) is "ok"].id"#, &doc),
            Evaluated::Many(vec![json!("protocol")])
        );
    }

    #[test]
    fn membership() {
        let doc = scan();
        assert_eq!(
            run(r#""HIGH" in $.result_json.scanResult.severity"#, &doc),
            Evaluated::Single(json!(true))
        );
        assert!(!run(r#"$.result_json.scanResult[@.severity in "LOW MEDIUM"]"#, &doc).truthy());
    }

    #[test]
    fn filter_after_sequence_applies_to_nested_elements() {
        let doc = json!({
            "scanResult": [
                {"serverDefaults": [{"id": "cert_notAfter", "finding": "2030-01-01 00:00"}]},
                {"serverDefaults": [{"id": "cert_notAfter", "finding": "2031-01-01 00:00"}, {"id": "other"}]}
            ]
        });
        let out = run("$.scanResult[*].serverDefaults[@.id is 'cert_notAfter'].finding", &doc);
        assert_eq!(
            out,
            Evaluated::Many(vec![json!("2030-01-01 00:00"), json!("2031-01-01 00:00")])
        );
    }

    #[test]
    fn unknown_function_is_error() {
        let err = evaluate(&parse("nope($.a)").unwrap(), &scan()).unwrap_err();
        assert_eq!(err, QueryError::UnknownFunction("nope".to_string()));
    }
}
