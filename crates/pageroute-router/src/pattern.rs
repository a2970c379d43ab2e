//! Route pattern lexing and segment compilation.
//!
//! A pattern is a `/`-separated list of segments:
//!
//! ```text
//! pattern    := "/"? segment ("/" segment)*
//! segment    := literal | "{" param "}" | "*"
//! param      := name ("=" default)? "?"?  (":" constraint)*   // dynamic
//!             | "**" name                 (":" constraint)*   // catch-all
//! constraint := ident | ident "(" arg ")" | ident "(" arg "," arg ")"
//! ```
//!
//! Literals are compared case-insensitively and may escape braces as `{{`
//! and `}}`. The optional marker `?` may sit on the parameter name or on
//! the final constraint. A `regex(...)` constraint swallows the rest of
//! the segment up to its last `)`, so its expression may contain colons,
//! commas and nested parentheses.

use std::fmt;

use crate::constraint::Constraint;
use crate::error::RegistrationError;

/// One compiled segment of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteSegment {
    /// Literal text, stored lower-cased.
    Static { literal: String },
    /// Named single-segment capture, e.g. `{id:int}`.
    Dynamic {
        /// Lower-cased parameter name.
        name: String,
        constraints: Vec<Constraint>,
        optional: bool,
        default: Option<String>,
    },
    /// Bare `*`: swallows the remaining path under the `wildcard` key.
    Wildcard,
    /// `{**name}`: named capture of the remaining path.
    CatchAll {
        /// Lower-cased parameter name.
        name: String,
        constraints: Vec<Constraint>,
    },
}

impl RouteSegment {
    /// A segment that may be absent from a matching request: optional, or
    /// carrying a default value.
    #[must_use]
    pub fn is_optional_or_defaulted(&self) -> bool {
        matches!(
            self,
            Self::Dynamic { optional: true, .. } | Self::Dynamic { default: Some(_), .. }
        )
    }

    /// Wildcard and catch-all segments terminate a route.
    #[must_use]
    pub fn is_tail(&self) -> bool {
        matches!(self, Self::Wildcard | Self::CatchAll { .. })
    }
}

impl fmt::Display for RouteSegment {
    /// Canonical form of the segment, suitable for logs and route listings.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static { literal } => f.write_str(literal),
            Self::Dynamic {
                name,
                constraints,
                optional,
                default,
            } => {
                write!(f, "{{{name}")?;
                if let Some(default) = default {
                    write!(f, "={default}")?;
                }
                if *optional {
                    f.write_str("?")?;
                }
                for constraint in constraints {
                    write!(f, ":{constraint}")?;
                }
                f.write_str("}")
            }
            Self::Wildcard => f.write_str("*"),
            Self::CatchAll { name, constraints } => {
                write!(f, "{{**{name}")?;
                for constraint in constraints {
                    write!(f, ":{constraint}")?;
                }
                f.write_str("}")
            }
        }
    }
}

/// Compile a pattern string into its segment list.
///
/// This is the whole registration-time pipeline: lexing, per-segment
/// compilation, and the structural checks. Any error leaves no trace;
/// the caller only inserts fully compiled routes.
pub fn compile_route(pattern: &str) -> Result<Vec<RouteSegment>, RegistrationError> {
    let raw = split_raw_segments(pattern)?;
    let mut segments = Vec::with_capacity(raw.len());
    for part in raw {
        segments.push(compile_segment(pattern, part)?);
    }
    enforce_structure(pattern, &segments)?;
    Ok(segments)
}

/// Split a pattern into raw segment slices.
///
/// `/` separates segments only at brace depth zero; `{{` and `}}` are
/// literal braces and do not affect depth. Empty segments are dropped.
pub(crate) fn split_raw_segments(pattern: &str) -> Result<Vec<&str>, RegistrationError> {
    let bytes = pattern.as_bytes();
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => {
                if bytes.get(i + 1) == Some(&b'{') {
                    i += 2;
                    continue;
                }
                depth += 1;
                i += 1;
            }
            b'}' => {
                if bytes.get(i + 1) == Some(&b'}') {
                    i += 2;
                    continue;
                }
                if depth == 0 {
                    return Err(RegistrationError::syntax(pattern, "unmatched '}'"));
                }
                depth -= 1;
                i += 1;
            }
            b'/' if depth == 0 => {
                if i > start {
                    segments.push(&pattern[start..i]);
                }
                i += 1;
                start = i;
            }
            _ => i += 1,
        }
    }
    if depth != 0 {
        return Err(RegistrationError::syntax(pattern, "unmatched '{'"));
    }
    if start < bytes.len() {
        segments.push(&pattern[start..]);
    }
    Ok(segments)
}

fn compile_segment(pattern: &str, raw: &str) -> Result<RouteSegment, RegistrationError> {
    let trimmed = raw.trim();
    if trimmed == "*" {
        return Ok(RouteSegment::Wildcard);
    }
    if trimmed.len() >= 2 && trimmed.starts_with('{') && trimmed.ends_with('}') {
        return compile_parameter(pattern, &trimmed[1..trimmed.len() - 1]);
    }
    Ok(RouteSegment::Static {
        literal: unescape_braces(trimmed).to_lowercase(),
    })
}

fn compile_parameter(pattern: &str, interior: &str) -> Result<RouteSegment, RegistrationError> {
    let mut parts: Vec<&str> = interior.split(':').map(str::trim).collect();

    let mut optional = false;
    // The optional marker may sit on the final constraint.
    if parts.len() > 1 {
        if let Some(stripped) = parts[parts.len() - 1].strip_suffix('?') {
            let last = parts.len() - 1;
            parts[last] = stripped.trim_end();
            optional = true;
        }
    }

    let mut name_part = parts[0];
    if let Some(stripped) = name_part.strip_suffix('?') {
        name_part = stripped.trim_end();
        optional = true;
    }
    let (mut name, default) = match name_part.split_once('=') {
        Some((name, default)) => (name.trim(), Some(default.trim().to_owned())),
        None => (name_part, None),
    };
    if let Some(stripped) = name.strip_suffix('?') {
        name = stripped.trim_end();
        optional = true;
    }
    if optional && default.is_some() {
        return Err(RegistrationError::syntax(
            pattern,
            "a segment can not be optional and carry a default value",
        ));
    }

    let catch_all = name.strip_prefix("**");
    let display_name = catch_all.unwrap_or(name);
    if display_name.is_empty() {
        return Err(RegistrationError::syntax(pattern, "empty parameter name"));
    }

    let constraints = compile_constraints(pattern, &parts[1..])?;

    if let Some(catch_all_name) = catch_all {
        if optional {
            return Err(RegistrationError::structural(
                pattern,
                "a catch-all segment can not be optional",
            ));
        }
        if default.is_some() {
            return Err(RegistrationError::structural(
                pattern,
                "a catch-all segment can not carry a default value",
            ));
        }
        return Ok(RouteSegment::CatchAll {
            name: catch_all_name.to_lowercase(),
            constraints,
        });
    }

    Ok(RouteSegment::Dynamic {
        name: name.to_lowercase(),
        constraints,
        optional,
        default,
    })
}

fn compile_constraints(
    pattern: &str,
    specs: &[&str],
) -> Result<Vec<Constraint>, RegistrationError> {
    let mut constraints = Vec::with_capacity(specs.len());
    for (i, &spec) in specs.iter().enumerate() {
        // `regex(...)` swallows every remaining part: its expression may
        // itself contain colons that the split above cut through.
        if spec.starts_with("regex(") {
            let merged = specs[i..].join(":");
            let open = merged.find('(').unwrap_or(0);
            let close = merged.rfind(')').filter(|&close| close > open);
            let Some(close) = close else {
                return Err(RegistrationError::ConstraintFormat {
                    pattern: pattern.to_owned(),
                    specifier: merged,
                    message: "missing closing parenthesis".to_owned(),
                });
            };
            constraints.push(Constraint::Regex(merged[open + 1..close].to_owned()));
            break;
        }
        match Constraint::parse_cached(spec) {
            Ok(constraint) => constraints.push(constraint),
            Err(err) => {
                return Err(RegistrationError::ConstraintFormat {
                    pattern: pattern.to_owned(),
                    specifier: err.specifier,
                    message: err.message,
                });
            }
        }
    }
    Ok(constraints)
}

fn enforce_structure(
    pattern: &str,
    segments: &[RouteSegment],
) -> Result<(), RegistrationError> {
    let mut saw_optional = false;
    for (i, segment) in segments.iter().enumerate() {
        let last = i + 1 == segments.len();
        if segment.is_tail() && !last {
            return Err(RegistrationError::structural(
                pattern,
                "wildcard and catch-all segments must be the final segment",
            ));
        }
        if segment.is_optional_or_defaulted() {
            saw_optional = true;
        } else if saw_optional {
            return Err(RegistrationError::structural(
                pattern,
                "required segments can not follow optional segments",
            ));
        }
    }
    Ok(())
}

fn unescape_braces(text: &str) -> String {
    if !text.contains('{') && !text.contains('}') {
        return text.to_owned();
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if (c == '{' || c == '}') && chars.peek() == Some(&c) {
            chars.next();
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dynamic(name: &str) -> RouteSegment {
        RouteSegment::Dynamic {
            name: name.to_owned(),
            constraints: Vec::new(),
            optional: false,
            default: None,
        }
    }

    #[test]
    fn splits_on_slashes_outside_braces() {
        let raw = split_raw_segments("/products/{id:int}/details").expect("valid");
        assert_eq!(raw, vec!["products", "{id:int}", "details"]);
    }

    #[test]
    fn drops_empty_segments() {
        let raw = split_raw_segments("//a///b/").expect("valid");
        assert_eq!(raw, vec!["a", "b"]);
    }

    #[test]
    fn braces_protect_slashes_and_nest() {
        let raw = split_raw_segments("/files/{path:regex(a/b)}").expect("valid");
        assert_eq!(raw, vec!["files", "{path:regex(a/b)}"]);
    }

    #[test]
    fn doubled_braces_are_literal() {
        let raw = split_raw_segments("/docs/{{literal}}").expect("valid");
        assert_eq!(raw, vec!["docs", "{{literal}}"]);
        let compiled = compile_route("/docs/{{literal}}").expect("valid");
        assert_eq!(
            compiled[1],
            RouteSegment::Static {
                literal: "{literal}".to_owned()
            }
        );
    }

    #[test]
    fn unmatched_braces_are_syntax_errors() {
        assert!(matches!(
            split_raw_segments("/a/{b"),
            Err(RegistrationError::PatternSyntax { .. })
        ));
        assert!(matches!(
            split_raw_segments("/a/b}"),
            Err(RegistrationError::PatternSyntax { .. })
        ));
    }

    #[test]
    fn compiles_static_segments_lower_cased() {
        let compiled = compile_route("/Products/Featured").expect("valid");
        assert_eq!(
            compiled,
            vec![
                RouteSegment::Static {
                    literal: "products".to_owned()
                },
                RouteSegment::Static {
                    literal: "featured".to_owned()
                },
            ]
        );
    }

    #[test]
    fn compiles_dynamic_segment_with_constraints() {
        let compiled = compile_route("/search/{Page:int:min(1)}").expect("valid");
        assert_eq!(
            compiled[1],
            RouteSegment::Dynamic {
                name: "page".to_owned(),
                constraints: vec![Constraint::Int, Constraint::Min(1)],
                optional: false,
                default: None,
            }
        );
    }

    #[test]
    fn optional_marker_on_name_or_last_constraint() {
        let on_name = compile_route("/archive/{year?}").expect("valid");
        assert_eq!(
            on_name[1],
            RouteSegment::Dynamic {
                name: "year".to_owned(),
                constraints: Vec::new(),
                optional: true,
                default: None,
            }
        );

        let on_constraint = compile_route("/archive/{year:int?}").expect("valid");
        assert_eq!(
            on_constraint[1],
            RouteSegment::Dynamic {
                name: "year".to_owned(),
                constraints: vec![Constraint::Int],
                optional: true,
                default: None,
            }
        );
    }

    #[test]
    fn default_values_parse() {
        let compiled = compile_route("/blog/{page=1:int}").expect("valid");
        assert_eq!(
            compiled[1],
            RouteSegment::Dynamic {
                name: "page".to_owned(),
                constraints: vec![Constraint::Int],
                optional: false,
                default: Some("1".to_owned()),
            }
        );
    }

    #[test]
    fn optional_with_default_is_rejected() {
        assert!(matches!(
            compile_route("/blog/{page=1?}"),
            Err(RegistrationError::PatternSyntax { .. })
        ));
        assert!(matches!(
            compile_route("/blog/{page?=1}"),
            Err(RegistrationError::PatternSyntax { .. })
        ));
    }

    #[test]
    fn catch_all_segments() {
        let compiled = compile_route("/files/{**path}").expect("valid");
        assert_eq!(
            compiled[1],
            RouteSegment::CatchAll {
                name: "path".to_owned(),
                constraints: Vec::new(),
            }
        );
        assert!(matches!(
            compile_route("/files/{**}"),
            Err(RegistrationError::PatternSyntax { .. })
        ));
        assert!(matches!(
            compile_route("/files/{**path?}"),
            Err(RegistrationError::Structural { .. })
        ));
    }

    #[test]
    fn regex_constraint_keeps_colons_and_commas() {
        let compiled = compile_route("/time/{stamp:regex(^\\d{2}:\\d{2},\\d+$)}").expect("valid");
        assert_eq!(
            compiled[1],
            RouteSegment::Dynamic {
                name: "stamp".to_owned(),
                constraints: vec![Constraint::Regex("^\\d{2}:\\d{2},\\d+$".to_owned())],
                optional: false,
                default: None,
            }
        );
    }

    #[test]
    fn regex_constraint_with_optional_marker() {
        let compiled = compile_route("/color/{c:regex(colou?r)?}").expect("valid");
        assert_eq!(
            compiled[1],
            RouteSegment::Dynamic {
                name: "c".to_owned(),
                constraints: vec![Constraint::Regex("colou?r".to_owned())],
                optional: true,
                default: None,
            }
        );
    }

    #[test]
    fn structural_ordering_is_enforced() {
        assert!(compile_route("/a/{b?}/{c?}").is_ok());
        assert!(matches!(
            compile_route("/a/{b?}/c"),
            Err(RegistrationError::Structural { .. })
        ));
        assert!(matches!(
            compile_route("/a/{b=1}/{c}"),
            Err(RegistrationError::Structural { .. })
        ));
        assert!(matches!(
            compile_route("/a/*/b"),
            Err(RegistrationError::Structural { .. })
        ));
        assert!(matches!(
            compile_route("/a/{**rest}/b"),
            Err(RegistrationError::Structural { .. })
        ));
    }

    #[test]
    fn bad_constraint_arguments_fail_compilation() {
        assert!(matches!(
            compile_route("/a/{b:min(abc)}"),
            Err(RegistrationError::ConstraintFormat { .. })
        ));
    }

    #[test]
    fn display_renders_canonical_segments() {
        let compiled = compile_route("/Shop/{Category:alpha}/{page=1:int}/{**Rest:required}");
        // catch-all after a defaulted segment is rejected; build the parts
        // separately instead
        assert!(compiled.is_err());

        let dynamic_seg = compile_route("/{id:int:min(1)}").expect("valid");
        assert_eq!(dynamic_seg[0].to_string(), "{id:int:min(1)}");

        let tail = compile_route("/files/{**path:required}").expect("valid");
        assert_eq!(tail[1].to_string(), "{**path:required}");
        assert_eq!(tail[0].to_string(), "files");

        let defaulted = compile_route("/blog/{page=1}").expect("valid");
        assert_eq!(defaulted[1].to_string(), "{page=1}");

        let optional = compile_route("/a/{b?}").expect("valid");
        assert_eq!(optional[1].to_string(), "{b?}");
        assert_eq!(dynamic("b").to_string(), "{b}");
    }
}
