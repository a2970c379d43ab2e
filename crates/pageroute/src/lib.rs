//! Declarative page routing for Rust applications.
//!
//! pageroute resolves request paths to page handlers through a compact
//! routing grammar with deterministic precedence:
//!
//! - **Typed parameters** — `/users/{id:int}`, `/files/{**path}`
//! - **Optional segments and defaults** — `/blog/{page=1}`, `/archive/{year?}`
//! - **Deterministic precedence** — static beats dynamic beats wildcard,
//!   with explicit priorities breaking the remaining ties
//! - **Thread-safe registry** — many concurrent lookups alongside
//!   serialized registrations
//!
//! # Quick Start
//!
//! ```ignore
//! use pageroute::prelude::*;
//!
//! let router = Router::new();
//! router.set_index_route("home-page");
//! router.add("/products/{category:alpha}/{id:int}", "product-page")?;
//! router.add_route(RouteSpec::new("/admin/{**rest}", "admin-page").role("admin"))?;
//!
//! let outcome = router.match_path("/products/books/42");
//! assert_eq!(outcome.handler(), Some(&"product-page"));
//! assert_eq!(outcome.params().get_int("id"), Some(Ok(42)));
//! ```
//!
//! # Crate Structure
//!
//! - [`pageroute_router`] — the route table: pattern grammar, routing tree,
//!   matcher, and registry façade

#![forbid(unsafe_code)]

pub use pageroute_router as router;

pub use pageroute_router::{
    compile_route, Constraint, MatchOutcome, Params, RegistrationError, Route, RouteDescriptor,
    RouteId, RouteSegment, RouteSpec, Router,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        Constraint, MatchOutcome, Params, RegistrationError, Route, RouteDescriptor, RouteId,
        RouteSegment, RouteSpec, Router,
    };
}
