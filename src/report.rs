//! Structured validation failures.
//!
//! A [`Report`] mirrors the shape of the value that failed: per-field,
//! per-index, or per-branch. Every branch bottoms out in a [`Report::Value`]
//! with at least one message. For presentation it flattens into a
//! [`PathHash`] keyed by JSON-pointer-like paths (`.person[0].name`).
use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;

/// Flattened report: path → messages. The root path is `.`.
pub type PathHash = IndexMap<String, Vec<String>>;

pub const ROOT_PATH: &str = ".";

#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    /// Leaf messages about the value itself.
    Value(Vec<String>),
    /// Failures keyed by object member.
    Object(IndexMap<String, Report>),
    /// Failures keyed by array index.
    List(BTreeMap<usize, Report>),
    /// Both branches of a union failed.
    Either(Box<Report>, Box<Report>),
    /// Parent and/or child of an inheritance merge failed.
    MergedObject(Box<Report>, Box<Report>),
}

impl Report {
    pub fn message(message: impl Into<String>) -> Self {
        Report::Value(vec![message.into()])
    }

    pub fn required() -> Self {
        Report::message("is required")
    }

    pub fn either(lhs: Report, rhs: Report) -> Self {
        Report::Either(Box::new(lhs), Box::new(rhs))
    }

    pub fn merged(parent: Report, child: Report) -> Self {
        Report::MergedObject(Box::new(parent), Box::new(child))
    }

    /// Flatten into `path → messages`. Messages reported twice at the same
    /// path (e.g. by both sides of an `Either`) are kept once.
    pub fn path_hash(&self) -> PathHash {
        let mut out = PathHash::new();
        self.collect("", &mut out);
        out
    }

    fn collect(&self, prefix: &str, out: &mut PathHash) {
        match self {
            Report::Value(problems) => {
                let key = if prefix.is_empty() { ROOT_PATH } else { prefix };
                let slot = out.entry(key.to_string()).or_default();
                for problem in problems {
                    if !slot.contains(problem) {
                        slot.push(problem.clone());
                    }
                }
            }
            Report::Object(fields) => {
                for (key, report) in fields {
                    report.collect(&format!("{prefix}.{key}"), out);
                }
            }
            Report::List(items) => {
                for (index, report) in items {
                    report.collect(&format!("{prefix}[{index}]"), out);
                }
            }
            Report::Either(lhs, rhs) | Report::MergedObject(lhs, rhs) => {
                lhs.collect(prefix, out);
                rhs.collect(prefix, out);
            }
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hash = self.path_hash();
        let mut first = true;
        for (path, messages) in &hash {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            write!(f, "{path}: {}", messages.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for Report {}

// ------------------------------- Tests ------------------------------------ //
