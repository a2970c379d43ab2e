//! Parameter constraints.
//!
//! A dynamic segment such as `{id:int:min(1)}` carries an ordered list of
//! constraints. Each constraint is a pure predicate over the candidate
//! segment text; a candidate binds only when every constraint accepts it.
//!
//! The set of kinds is closed: callers cannot register new validators.
//! An unrecognized constraint name parses into [`Constraint::Unknown`],
//! which rejects every candidate instead of failing registration.
//!
//! Parsed specifiers and compiled regular expressions are memoized in
//! process-wide append-only caches, so hot patterns are analyzed once.

use std::fmt;
use std::sync::OnceLock;

use dashmap::DashMap;
use regex::Regex;

use crate::error::ConstraintSpecError;

/// A single parsed constraint attached to a dynamic or catch-all segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// 32-bit integer.
    Int,
    /// 64-bit integer.
    Long,
    /// Case-insensitive `true` or `false`.
    Bool,
    /// Calendar date, optionally followed by a time of day.
    DateTime,
    /// Finite decimal number.
    Decimal,
    /// Finite double-precision number.
    Double,
    /// Finite floating-point number.
    Float,
    /// Canonical GUID, `8-4-4-4-12` hex digits.
    Guid,
    /// Non-empty, letters only.
    Alpha,
    /// Non-empty.
    Required,
    /// At least `n` characters.
    MinLength(usize),
    /// At most `n` characters.
    MaxLength(usize),
    /// Exactly `n` characters.
    ExactLength(usize),
    /// Between `min` and `max` characters inclusive.
    LengthBetween(usize, usize),
    /// Integer value of at least `n`.
    Min(i64),
    /// Integer value of at most `n`.
    Max(i64),
    /// Integer value within `[a, b]`.
    Range(i64, i64),
    /// Candidate matches the regular expression in full.
    ///
    /// The expression is compiled lazily; a malformed expression matches
    /// nothing rather than failing registration.
    Regex(String),
    /// Unrecognized constraint name. Rejects every candidate.
    Unknown(String),
}

impl Constraint {
    /// Parse a textual constraint specifier.
    ///
    /// Accepted forms are `name`, `name(arg)` and `name(arg,arg)`. The
    /// `regex(...)` form captures everything between the first `(` and the
    /// last `)`, embedded commas and parentheses included.
    pub(crate) fn parse(spec: &str) -> Result<Self, ConstraintSpecError> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(ConstraintSpecError::new(spec, "empty constraint specifier"));
        }

        let (name, args) = match spec.find('(') {
            Some(open) => {
                let name = &spec[..open];
                if name == "regex" {
                    let close = spec
                        .rfind(')')
                        .filter(|&close| close > open)
                        .ok_or_else(|| {
                            ConstraintSpecError::new(spec, "missing closing parenthesis")
                        })?;
                    return Ok(Self::Regex(spec[open + 1..close].to_owned()));
                }
                if !spec.ends_with(')') {
                    return Err(ConstraintSpecError::new(spec, "missing closing parenthesis"));
                }
                let inner = &spec[open + 1..spec.len() - 1];
                (name, inner.split(',').map(str::trim).collect())
            }
            None => (spec, Vec::new()),
        };

        let arity = args.len();
        let parsed = match (name, arity) {
            ("int", 0) => Self::Int,
            ("long", 0) => Self::Long,
            ("bool", 0) => Self::Bool,
            ("datetime", 0) => Self::DateTime,
            ("decimal", 0) => Self::Decimal,
            ("double", 0) => Self::Double,
            ("float", 0) => Self::Float,
            ("guid", 0) => Self::Guid,
            ("alpha", 0) => Self::Alpha,
            ("required", 0) => Self::Required,
            ("minlength", 1) => Self::MinLength(parse_length(spec, args[0])?),
            ("maxlength", 1) => Self::MaxLength(parse_length(spec, args[0])?),
            ("length", 1) => Self::ExactLength(parse_length(spec, args[0])?),
            ("length", 2) => {
                let min = parse_length(spec, args[0])?;
                let max = parse_length(spec, args[1])?;
                if min > max {
                    return Err(ConstraintSpecError::new(spec, "length bounds out of order"));
                }
                Self::LengthBetween(min, max)
            }
            ("min", 1) => Self::Min(parse_bound(spec, args[0])?),
            ("max", 1) => Self::Max(parse_bound(spec, args[0])?),
            ("range", 2) => Self::Range(parse_bound(spec, args[0])?, parse_bound(spec, args[1])?),
            (
                "int" | "long" | "bool" | "datetime" | "decimal" | "double" | "float" | "guid"
                | "alpha" | "required" | "minlength" | "maxlength" | "length" | "min" | "max"
                | "range",
                _,
            ) => {
                return Err(ConstraintSpecError::new(
                    spec,
                    format!("`{name}` does not take {arity} argument(s)"),
                ));
            }
            _ => Self::Unknown(name.to_owned()),
        };
        Ok(parsed)
    }

    /// Memoizing wrapper around [`Constraint::parse`].
    pub(crate) fn parse_cached(spec: &str) -> Result<Self, ConstraintSpecError> {
        static CACHE: OnceLock<DashMap<String, Result<Constraint, ConstraintSpecError>>> =
            OnceLock::new();
        let cache = CACHE.get_or_init(DashMap::new);
        if let Some(hit) = cache.get(spec) {
            return hit.clone();
        }
        let parsed = Self::parse(spec);
        cache.insert(spec.to_owned(), parsed.clone());
        parsed
    }

    /// Decide whether `candidate` satisfies this constraint.
    ///
    /// Pure and infallible: anomalies (unparseable numbers, malformed
    /// regular expressions) simply evaluate to `false`.
    #[must_use]
    pub fn evaluate(&self, candidate: &str) -> bool {
        match self {
            Self::Int => candidate.parse::<i32>().is_ok(),
            Self::Long => candidate.parse::<i64>().is_ok(),
            Self::Bool => {
                candidate.eq_ignore_ascii_case("true") || candidate.eq_ignore_ascii_case("false")
            }
            Self::DateTime => is_datetime(candidate),
            Self::Decimal | Self::Double | Self::Float => {
                candidate.parse::<f64>().is_ok_and(f64::is_finite)
            }
            Self::Guid => is_canonical_guid(candidate),
            Self::Alpha => !candidate.is_empty() && candidate.chars().all(char::is_alphabetic),
            Self::Required => !candidate.is_empty(),
            Self::MinLength(n) => candidate.chars().count() >= *n,
            Self::MaxLength(n) => candidate.chars().count() <= *n,
            Self::ExactLength(n) => candidate.chars().count() == *n,
            Self::LengthBetween(min, max) => {
                let len = candidate.chars().count();
                *min <= len && len <= *max
            }
            Self::Min(n) => candidate.parse::<i64>().is_ok_and(|v| v >= *n),
            Self::Max(n) => candidate.parse::<i64>().is_ok_and(|v| v <= *n),
            Self::Range(lo, hi) => candidate.parse::<i64>().is_ok_and(|v| *lo <= v && v <= *hi),
            Self::Regex(pattern) => regex_matches(pattern, candidate),
            Self::Unknown(_) => false,
        }
    }

    /// Ordering weight used to discriminate sibling dynamic candidates.
    ///
    /// Narrower types come first: `int` before `guid` before `long` before
    /// everything else. An unconstrained candidate sorts last.
    pub(crate) fn type_priority(&self) -> u32 {
        match self {
            Self::Int => 1,
            Self::Guid => 2,
            Self::Long => 3,
            _ => 10,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => f.write_str("int"),
            Self::Long => f.write_str("long"),
            Self::Bool => f.write_str("bool"),
            Self::DateTime => f.write_str("datetime"),
            Self::Decimal => f.write_str("decimal"),
            Self::Double => f.write_str("double"),
            Self::Float => f.write_str("float"),
            Self::Guid => f.write_str("guid"),
            Self::Alpha => f.write_str("alpha"),
            Self::Required => f.write_str("required"),
            Self::MinLength(n) => write!(f, "minlength({n})"),
            Self::MaxLength(n) => write!(f, "maxlength({n})"),
            Self::ExactLength(n) => write!(f, "length({n})"),
            Self::LengthBetween(min, max) => write!(f, "length({min},{max})"),
            Self::Min(n) => write!(f, "min({n})"),
            Self::Max(n) => write!(f, "max({n})"),
            Self::Range(lo, hi) => write!(f, "range({lo},{hi})"),
            Self::Regex(pattern) => write!(f, "regex({pattern})"),
            Self::Unknown(name) => f.write_str(name),
        }
    }
}

fn parse_length(spec: &str, arg: &str) -> Result<usize, ConstraintSpecError> {
    arg.parse::<usize>()
        .map_err(|_| ConstraintSpecError::new(spec, format!("`{arg}` is not a valid length")))
}

fn parse_bound(spec: &str, arg: &str) -> Result<i64, ConstraintSpecError> {
    arg.parse::<i64>()
        .map_err(|_| ConstraintSpecError::new(spec, format!("`{arg}` is not a valid integer")))
}

/// Match `candidate` against `pattern` in full.
///
/// Compiled expressions are memoized; a malformed expression is memoized
/// as matching nothing.
fn regex_matches(pattern: &str, candidate: &str) -> bool {
    static CACHE: OnceLock<DashMap<String, Option<Regex>>> = OnceLock::new();
    let cache = CACHE.get_or_init(DashMap::new);
    if let Some(compiled) = cache.get(pattern) {
        return compiled.as_ref().is_some_and(|re| re.is_match(candidate));
    }
    let compiled = Regex::new(&format!("^(?:{pattern})$")).ok();
    let matched = compiled.as_ref().is_some_and(|re| re.is_match(candidate));
    cache.insert(pattern.to_owned(), compiled);
    matched
}

/// Canonical GUID format: `8-4-4-4-12` hex digit groups.
fn is_canonical_guid(candidate: &str) -> bool {
    const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];
    let bytes = candidate.as_bytes();
    if bytes.len() != 36 {
        return false;
    }
    let mut pos = 0;
    for (i, &len) in GROUPS.iter().enumerate() {
        if i > 0 {
            if bytes[pos] != b'-' {
                return false;
            }
            pos += 1;
        }
        if !bytes[pos..pos + len].iter().all(u8::is_ascii_hexdigit) {
            return false;
        }
        pos += len;
    }
    true
}

/// A date (`YYYY-MM-DD` or `M/D/YYYY`), optionally followed by a time of
/// day separated by `T` or a space.
fn is_datetime(candidate: &str) -> bool {
    let candidate = candidate.trim();
    let (date, time) = match candidate.find(['T', ' ']) {
        Some(split) => (&candidate[..split], Some(&candidate[split + 1..])),
        None => (candidate, None),
    };
    if !is_date(date) {
        return false;
    }
    time.map_or(true, is_time)
}

fn is_date(date: &str) -> bool {
    let iso = date.contains('-');
    let parts: Vec<&str> = if iso {
        date.split('-').collect()
    } else {
        date.split('/').collect()
    };
    if parts.len() != 3 {
        return false;
    }
    let (year, month, day) = if iso {
        (parts[0], parts[1], parts[2])
    } else {
        (parts[2], parts[0], parts[1])
    };
    if year.len() != 4 {
        return false;
    }
    let Ok(year) = year.parse::<u32>() else {
        return false;
    };
    let Ok(month) = month.parse::<u32>() else {
        return false;
    };
    let Ok(day) = day.parse::<u32>() else {
        return false;
    };
    (1..=12).contains(&month) && day >= 1 && day <= days_in_month(year, month)
}

fn days_in_month(year: u32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

fn is_leap_year(year: u32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

fn is_time(time: &str) -> bool {
    // Fractional seconds are accepted and ignored.
    let time = time.split('.').next().unwrap_or(time);
    let parts: Vec<&str> = time.split(':').collect();
    if parts.len() != 2 && parts.len() != 3 {
        return false;
    }
    let Ok(hours) = parts[0].parse::<u32>() else {
        return false;
    };
    let Ok(minutes) = parts[1].parse::<u32>() else {
        return false;
    };
    let seconds = match parts.get(2) {
        Some(s) => match s.parse::<u32>() {
            Ok(v) => v,
            Err(_) => return false,
        },
        None => 0,
    };
    hours < 24 && minutes < 60 && seconds < 60
}
