//! Refinements: run the inner node first, then check one more property of
//! the value it produced. Values of a kind a refinement does not understand
//! (a regex over a number, a range over a string) pass through untouched.
use std::fmt;
use std::ops::{Bound, RangeBounds};

use regex::Regex;
use serde_json::{Map, Value};

use super::{Input, InputRef};
use crate::report::Report;
use crate::schema::{self, SchemaPair};

/// Numbers as they should appear in a schema: `0` rather than `0.0`.
pub(crate) fn number_value(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

/// `1` and `1.0` are the same member; everything else compares structurally.
fn same_member(allowed: &Value, value: &Value) -> bool {
    match (allowed, value) {
        (Value::Number(a), Value::Number(b)) => a == b || a.as_f64().is_some_and(|a| b.as_f64() == Some(a)),
        _ => allowed == value,
    }
}

fn render(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
}

// ————————————————————————————————————————————————————————————————————————————
// ENUM
// ————————————————————————————————————————————————————————————————————————————

#[derive(Clone)]
pub struct Enum {
    inner: InputRef,
    values: Vec<Value>,
}

impl Enum {
    pub fn new(inner: InputRef, values: Vec<Value>) -> Self {
        Self { inner, values }
    }
}

impl Input for Enum {
    fn call(&self, value: &Value) -> Result<Value, Report> {
        let parsed = self.inner.call(value)?;
        if self.values.iter().any(|allowed| same_member(allowed, &parsed)) {
            return Ok(parsed);
        }
        let allowed: Vec<String> = self.values.iter().map(render).collect();
        Err(Report::message(format!("must be one of: {}", allowed.join(", "))))
    }

    fn schema(&self) -> SchemaPair {
        let values = Value::Array(self.values.clone());
        self.inner.schema().map_schema(|s| schema::merge_one(s, "enum", values))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// PATTERN
// ————————————————————————————————————————————————————————————————————————————

#[derive(Clone)]
pub struct Pattern {
    inner: InputRef,
    regex: Regex,
}

impl Pattern {
    pub fn new(inner: InputRef, regex: Regex) -> Self {
        Self { inner, regex }
    }
}

impl Input for Pattern {
    fn call(&self, value: &Value) -> Result<Value, Report> {
        let parsed = self.inner.call(value)?;
        match &parsed {
            Value::String(s) if !self.regex.is_match(s) => {
                Err(Report::message(format!("must match /{}/", self.regex.as_str())))
            }
            _ => Ok(parsed),
        }
    }

    fn schema(&self) -> SchemaPair {
        let pattern = Value::from(self.regex.as_str());
        self.inner.schema().map_schema(|s| schema::merge_one(s, "pattern", pattern))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// RANGE
// ————————————————————————————————————————————————————————————————————————————

/// Owned copy of a `RangeBounds<f64>`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub start: Bound<f64>,
    pub end: Bound<f64>,
}

impl Bounds {
    pub fn of(range: &impl RangeBounds<f64>) -> Self {
        Self { start: range.start_bound().cloned(), end: range.end_bound().cloned() }
    }

    pub fn contains(&self, n: f64) -> bool {
        let above = match self.start {
            Bound::Included(min) => n >= min,
            Bound::Excluded(min) => n > min,
            Bound::Unbounded => true,
        };
        let below = match self.end {
            Bound::Included(max) => n <= max,
            Bound::Excluded(max) => n < max,
            Bound::Unbounded => true,
        };
        above && below
    }
}

/// Interval notation: `[0, 10]`, `(0, ∞)`.
impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.start {
            Bound::Included(min) => write!(f, "[{}", number_value(min))?,
            Bound::Excluded(min) => write!(f, "({}", number_value(min))?,
            Bound::Unbounded => f.write_str("(-∞")?,
        }
        match self.end {
            Bound::Included(max) => write!(f, ", {}]", number_value(max)),
            Bound::Excluded(max) => write!(f, ", {})", number_value(max)),
            Bound::Unbounded => f.write_str(", ∞)"),
        }
    }
}

#[derive(Clone)]
pub struct InRange {
    inner: InputRef,
    bounds: Bounds,
}

impl InRange {
    pub fn new(inner: InputRef, range: impl RangeBounds<f64>) -> Self {
        Self { inner, bounds: Bounds::of(&range) }
    }
}

impl Input for InRange {
    fn call(&self, value: &Value) -> Result<Value, Report> {
        let parsed = self.inner.call(value)?;
        match parsed.as_f64() {
            Some(n) if !self.bounds.contains(n) => {
                Err(Report::message(format!("must be in range {}", self.bounds)))
            }
            _ => Ok(parsed),
        }
    }

    fn schema(&self) -> SchemaPair {
        let mut extra = Map::new();
        match self.bounds.start {
            Bound::Included(min) => {
                extra.insert("minimum".into(), number_value(min));
            }
            Bound::Excluded(min) => {
                extra.insert("minimum".into(), number_value(min));
                extra.insert("exclusiveMinimum".into(), Value::Bool(true));
            }
            Bound::Unbounded => {}
        }
        match self.bounds.end {
            Bound::Included(max) => {
                extra.insert("maximum".into(), number_value(max));
            }
            Bound::Excluded(max) => {
                extra.insert("maximum".into(), number_value(max));
                extra.insert("exclusiveMaximum".into(), Value::Bool(true));
            }
            Bound::Unbounded => {}
        }
        self.inner.schema().map_schema(|s| schema::merge(s, extra))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// MULTIPLE OF
// ————————————————————————————————————————————————————————————————————————————

#[derive(Clone)]
pub struct MultipleOf {
    inner: InputRef,
    factor: f64,
}

impl MultipleOf {
    pub fn new(inner: InputRef, factor: f64) -> Self {
        Self { inner, factor }
    }

    /// Exact for integers with an integral factor, float remainder otherwise.
    fn divides(&self, n: &serde_json::Number) -> bool {
        if self.factor == 0.0 {
            return false;
        }
        if let Some(i) = n.as_i64() {
            if self.factor.fract() == 0.0 && self.factor.abs() <= i64::MAX as f64 {
                // only `i64::MIN % -1` overflows, and its remainder is zero
                return i.checked_rem(self.factor as i64).is_none_or(|r| r == 0);
            }
        }
        n.as_f64().is_some_and(|x| x % self.factor == 0.0)
    }
}

impl Input for MultipleOf {
    fn call(&self, value: &Value) -> Result<Value, Report> {
        let parsed = self.inner.call(value)?;
        match &parsed {
            Value::Number(n) if !self.divides(n) => Err(Report::message(format!(
                "must be a multiple of {}",
                number_value(self.factor)
            ))),
            _ => Ok(parsed),
        }
    }

    fn schema(&self) -> SchemaPair {
        let factor = number_value(self.factor);
        self.inner.schema().map_schema(|s| schema::merge_one(s, "multipleOf", factor))
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{any, integer, number, text};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn enum_lists_the_allowed_values() {
        let colour = text().enum_([json!("red"), json!("green")]);
        assert_eq!(colour.call(&json!("red")), Ok(json!("red")));
        assert_eq!(
            colour.call(&json!("blue")),
            Err(Report::message(r#"must be one of: "red", "green""#))
        );
        // the inner type is checked first
        assert_eq!(colour.call(&json!(1)), Err(Report::message("must be a string")));
        assert_eq!(colour.schema().schema, json!({ "type": "string", "enum": ["red", "green"] }));
    }

    #[test]
    fn enum_numbers_compare_by_value() {
        let level = number().enum_([json!(1), json!(2.5)]);
        assert_eq!(level.call(&json!(1.0)), Ok(json!(1.0)));
        assert_eq!(level.call(&json!(2.5)), Ok(json!(2.5)));
        assert!(level.call(&json!(3)).is_err());
    }

    #[test]
    fn pattern_matches_strings() {
        let code = text().pattern(Regex::new("^[A-Z]{3}$").unwrap());
        assert!(code.call(&json!("EUR")).is_ok());
        assert_eq!(code.call(&json!("eur")), Err(Report::message("must match /^[A-Z]{3}$/")));
        assert_eq!(code.schema().schema["pattern"], json!("^[A-Z]{3}$"));
        // non-strings are the inner node's business
        assert!(any().pattern(Regex::new("^a$").unwrap()).call(&json!(5)).is_ok());
    }

    #[test]
    fn ranges_render_as_intervals() {
        let score = integer().in_range(0.0..=10.0);
        assert!(score.call(&json!(10)).is_ok());
        assert_eq!(score.call(&json!(11)), Err(Report::message("must be in range [0, 10]")));
        assert_eq!(
            score.schema().schema,
            json!({ "type": "integer", "minimum": 0, "maximum": 10 })
        );

        let positive = number().in_range((Bound::Excluded(0.0), Bound::Unbounded));
        assert_eq!(positive.call(&json!(0)), Err(Report::message("must be in range (0, ∞)")));
        assert_eq!(positive.schema().schema["exclusiveMinimum"], json!(true));

        let below = number().in_range(..1.5);
        assert_eq!(below.call(&json!(1.5)), Err(Report::message("must be in range (-∞, 1.5)")));
    }

    #[test]
    fn multiple_of_is_exact_for_integers() {
        let even = integer().multiple_of(2.0);
        assert!(even.call(&json!(4)).is_ok());
        assert_eq!(even.call(&json!(5)), Err(Report::message("must be a multiple of 2")));
        assert_eq!(even.schema().schema, json!({ "type": "integer", "multipleOf": 2 }));

        let halves = number().multiple_of(0.5);
        assert!(halves.call(&json!(1.5)).is_ok());
        assert!(halves.call(&json!(1.25)).is_err());
    }

    #[test]
    fn multiple_of_negative_one_accepts_the_smallest_integer() {
        let any_integer = integer().multiple_of(-1.0);
        assert_eq!(any_integer.call(&json!(i64::MIN)), Ok(json!(i64::MIN)));
        assert!(any_integer.call(&json!(7)).is_ok());
    }
}
