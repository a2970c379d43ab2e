//! Declarative page route table.
//!
//! This crate maps request paths to page handlers through a dense routing
//! grammar: literals, typed parameters, optional segments, default values,
//! and single- or multi-segment catch-alls, resolved by a radix-style tree
//! with deterministic priorities.
//!
//! # Grammar
//!
//! | Pattern | Matches |
//! |---|---|
//! | `/about` | the literal, case-insensitively |
//! | `/users/{id:int}` | one segment that parses as an integer |
//! | `/archive/{year?}` | with or without the trailing segment |
//! | `/blog/{page=1}` | missing segment binds `page` to `"1"` |
//! | `/files/{**path}` | the whole remaining path, named |
//! | `/docs/*` | the whole remaining path, under the `wildcard` key |
//!
//! Constraints chain after colons (`{id:int:min(1)}`) and the full set is
//! documented on [`Constraint`].
//!
//! # Resolution order
//!
//! At every tree level, static literals beat dynamic candidates, dynamic
//! candidates beat catch-alls, and catch-alls beat wildcards. Sibling
//! dynamic candidates are ranked by constraint specificity, then by route
//! priority, then by registration order. Matching is depth-first with
//! backtracking, so an early dead-end never hides a later route.
//!
//! # Example
//!
//! ```ignore
//! use pageroute_router::Router;
//!
//! let router = Router::new();
//! router.add("/test/{arg1:int}", "test-page")?;
//!
//! let outcome = router.match_path("/test/4");
//! assert!(outcome.is_match());
//! assert_eq!(outcome.params().get("arg1"), Some("4"));
//! assert!(!router.match_path("/test/abc").is_match());
//! ```

#![forbid(unsafe_code)]

mod constraint;
mod error;
mod r#match;
mod pattern;
mod registry;
mod trie;

pub use constraint::Constraint;
pub use error::RegistrationError;
pub use pattern::{compile_route, RouteSegment};
pub use r#match::{MatchOutcome, Params, RouteDescriptor, RouteId};
pub use registry::{Route, RouteSpec, Router};
