//! Grok patterns for extracting metadata from result file paths.
//!
//! A grok pattern is a regex with `%{NAME}` / `%{NAME:field}` references to
//! named sub-patterns. References are expanded recursively against the
//! built-in library plus per-configuration custom patterns, and `:field`
//! references become named capture groups.

use std::collections::HashMap;

use regex::Regex;

/// Capture group dropped from match results by convention.
pub const IGNORED_FIELD: &str = "ignored";

const MAX_EXPANSION_DEPTH: usize = 32;

/// Built-in sub-patterns (a subset of the standard grok library).
const BASE_PATTERNS: &[(&str, &str)] = &[
    ("USERNAME", r"[a-zA-Z0-9._-]+"),
    ("USER", r"%{USERNAME}"),
    ("INT", r"(?:[+-]?(?:[0-9]+))"),
    ("BASE10NUM", r"(?:[+-]?(?:[0-9]+(?:\.[0-9]+)?|\.[0-9]+))"),
    ("NUMBER", r"(?:%{BASE10NUM})"),
    ("POSINT", r"\b(?:[1-9][0-9]*)\b"),
    ("NONNEGINT", r"\b(?:[0-9]+)\b"),
    ("WORD", r"\b\w+\b"),
    ("NOTSPACE", r"\S+"),
    ("SPACE", r"\s*"),
    ("DATA", r".*?"),
    ("GREEDYDATA", r".*"),
    ("QUOTEDSTRING", r#""(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'"#),
    ("UUID", r"[A-Fa-f0-9]{8}-(?:[A-Fa-f0-9]{4}-){3}[A-Fa-f0-9]{12}"),
    ("HOSTNAME", r"\b(?:[0-9A-Za-z][0-9A-Za-z-]{0,62})(?:\.(?:[0-9A-Za-z][0-9A-Za-z-]{0,62}))*(?:\.?|\b)"),
    ("HOST", r"%{HOSTNAME}"),
    ("IPV4", r"(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)"),
    ("IP", r"%{IPV4}"),
    ("IPORHOST", r"(?:%{IP}|%{HOSTNAME})"),
    ("HOSTPORT", r"%{IPORHOST}:%{POSINT}"),
    ("UNIXPATH", r"(?:/[\w_%!$@:.,+~-]*)+"),
    ("PATH", r"%{UNIXPATH}"),
    ("YEAR", r"(?:\d\d){1,2}"),
    ("MONTHNUM", r"(?:0?[1-9]|1[0-2])"),
    ("MONTHDAY", r"(?:(?:0[1-9])|(?:[12][0-9])|(?:3[01])|[1-9])"),
    ("HOUR", r"(?:2[0123]|[01]?[0-9])"),
    ("MINUTE", r"(?:[0-5][0-9])"),
    ("SECOND", r"(?:(?:[0-5]?[0-9]|60)(?:[:.,][0-9]+)?)"),
    ("ISO8601_TIMEZONE", r"(?:Z|[+-]%{HOUR}(?::?%{MINUTE}))"),
    ("TIMESTAMP_ISO8601", r"%{YEAR}-%{MONTHNUM}-%{MONTHDAY}[T ]%{HOUR}:?%{MINUTE}(?::?%{SECOND})?%{ISO8601_TIMEZONE}?"),
];

/// Errors from compiling a grok pattern.
#[derive(Debug, thiserror::Error)]
pub enum GrokError {
    #[error("unknown grok pattern: {0}")]
    UnknownPattern(String),

    #[error("grok pattern nesting deeper than {MAX_EXPANSION_DEPTH} levels")]
    TooDeep,

    #[error("unterminated grok reference in: {0}")]
    Unterminated(String),

    #[error("invalid regex after grok expansion: {0}")]
    Regex(#[from] regex::Error),
}

/// A compiled grok pattern.
#[derive(Debug, Clone)]
pub struct Grok {
    regex: Regex,
}

impl Grok {
    /// Compile `pattern`, resolving references against the built-in library
    /// and `custom` (custom definitions shadow built-ins).
    pub fn compile(pattern: &str, custom: &HashMap<String, String>) -> Result<Self, GrokError> {
        let mut library: HashMap<&str, &str> = HashMap::new();
        for (name, body) in BASE_PATTERNS {
            library.insert(*name, *body);
        }
        for (name, body) in custom {
            library.insert(name.as_str(), body.as_str());
        }
        let expanded = expand(pattern, &library, 0)?;
        Ok(Self {
            regex: Regex::new(&expanded)?,
        })
    }

    /// Search `text` and return the named captures, or `None` if the pattern
    /// does not match. Groups that did not participate are omitted.
    pub fn captures(&self, text: &str) -> Option<HashMap<String, String>> {
        let caps = self.regex.captures(text)?;
        Some(
            self.regex
                .capture_names()
                .flatten()
                .filter_map(|name| {
                    caps.name(name)
                        .map(|m| (name.to_string(), m.as_str().to_string()))
                })
                .collect(),
        )
    }

    /// Like [`captures`](Self::captures) but without the conventional
    /// `ignored` group.
    pub fn metadata(&self, text: &str) -> Option<HashMap<String, String>> {
        let mut fields = self.captures(text)?;
        fields.remove(IGNORED_FIELD);
        Some(fields)
    }
}

fn expand(pattern: &str, library: &HashMap<&str, &str>, depth: usize) -> Result<String, GrokError> {
    if depth > MAX_EXPANSION_DEPTH {
        return Err(GrokError::TooDeep);
    }

    let mut out = String::with_capacity(pattern.len());
    let mut rest = pattern;
    while let Some(start) = rest.find("%{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| GrokError::Unterminated(pattern.to_string()))?;
        let reference = &after[..end];
        let (name, field) = match reference.split_once(':') {
            Some((name, field)) => (name, Some(field)),
            None => (reference, None),
        };
        let body = library
            .get(name)
            .ok_or_else(|| GrokError::UnknownPattern(name.to_string()))?;
        let inner = expand(body, library, depth + 1)?;
        match field {
            Some(field) => {
                out.push_str("(?P<");
                out.push_str(field);
                out.push('>');
                out.push_str(&inner);
                out.push(')');
            }
            None => {
                out.push_str("(?:");
                out.push_str(&inner);
                out.push(')');
            }
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
