//! The route registry: the process-facing façade over the routing tree.
//!
//! A [`Router`] owns the tree and the list of registered routes. Writes
//! (`add_route`, `add_controller`, `set_index_route`) are serialized behind
//! a writer lock; `match_path` only takes the shared side, so lookups stay
//! cheap and always observe either the pre- or post-insertion tree, never a
//! half-inserted route.
//!
//! # Example
//!
//! ```ignore
//! use pageroute_router::{Router, RouteSpec};
//!
//! let router = Router::new();
//! router.add("/products/{category:alpha}/{id:int}", "product-page")?;
//! router.add_route(RouteSpec::new("/admin/{**rest}", "admin").priority(10))?;
//!
//! let outcome = router.match_path("/products/electronics/42");
//! assert_eq!(outcome.handler(), Some(&"product-page"));
//! assert_eq!(outcome.params().get("id"), Some("42"));
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::error::RegistrationError;
use crate::pattern::{compile_route, RouteSegment};
use crate::r#match::{MatchOutcome, Params, RouteDescriptor, RouteId};
use crate::trie::{BufferPool, RouteTree};

/// A registered route. Immutable once inserted.
#[derive(Debug)]
pub struct Route<T> {
    id: RouteId,
    pattern: String,
    segments: Vec<RouteSegment>,
    handler: T,
    priority: i32,
    roles: Vec<String>,
}

impl<T> Route<T> {
    /// Stable identifier assigned at registration.
    #[must_use]
    pub fn id(&self) -> RouteId {
        self.id
    }

    /// The pattern text as registered.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The compiled segments of the pattern.
    #[must_use]
    pub fn segments(&self) -> &[RouteSegment] {
        &self.segments
    }

    /// The handler the caller associated with this route.
    #[must_use]
    pub fn handler(&self) -> &T {
        &self.handler
    }

    /// Tie-break priority; higher wins, equals resolve last-writer-wins.
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Roles attached at registration, passed through untouched.
    #[must_use]
    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    /// The pattern re-rendered from its compiled segments.
    #[must_use]
    pub fn canonical_pattern(&self) -> String {
        if self.segments.is_empty() {
            return "/".to_owned();
        }
        let mut out = String::new();
        for segment in &self.segments {
            out.push('/');
            out.push_str(&segment.to_string());
        }
        out
    }

    fn descriptor(&self) -> RouteDescriptor {
        RouteDescriptor {
            id: self.id,
            pattern: self.pattern.clone(),
            priority: self.priority,
            roles: self.roles.clone(),
        }
    }
}

impl<T> fmt::Display for Route<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.pattern)
    }
}

/// Everything a caller can say about a route before it is registered.
///
/// ```ignore
/// let spec = RouteSpec::new("/reports/{year:int}", handler)
///     .priority(5)
///     .role("auditor");
/// router.add_route(spec)?;
/// ```
#[derive(Debug, Clone)]
pub struct RouteSpec<T> {
    pattern: String,
    handler: T,
    priority: i32,
    roles: Vec<String>,
}

impl<T> RouteSpec<T> {
    /// A spec with default priority (0) and no roles.
    pub fn new(pattern: impl Into<String>, handler: T) -> Self {
        Self {
            pattern: pattern.into(),
            handler,
            priority: 0,
            roles: Vec::new(),
        }
    }

    /// Set the tie-break priority.
    #[must_use]
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Attach a single role.
    #[must_use]
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Attach a list of roles.
    #[must_use]
    pub fn roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }
}

#[derive(Debug)]
struct RouterState<T> {
    tree: RouteTree,
    routes: Vec<Arc<Route<T>>>,
    controllers: HashSet<String>,
    index_route: Option<Arc<Route<T>>>,
}

impl<T> Default for RouterState<T> {
    fn default() -> Self {
        Self {
            tree: RouteTree::default(),
            routes: Vec::new(),
            controllers: HashSet::new(),
            index_route: None,
        }
    }
}

/// The route table façade.
///
/// Thread-safe: many concurrent `match_path` calls may run alongside
/// serialized registrations. After `add_route` returns, every subsequent
/// match observes the new route.
#[derive(Debug)]
pub struct Router<T> {
    state: RwLock<RouterState<T>>,
    pool: BufferPool,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Router<T> {
    /// An empty router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RouterState::default()),
            pool: BufferPool::default(),
        }
    }

    /// Register a route with default priority and no roles.
    ///
    /// Shorthand for `add_route(RouteSpec::new(pattern, handler))`.
    pub fn add(&self, pattern: &str, handler: T) -> Result<RouteId, RegistrationError> {
        self.add_route(RouteSpec::new(pattern, handler))
    }

    /// Register a route.
    ///
    /// The pattern is parsed and compiled before the tree is touched; any
    /// error leaves the table exactly as it was.
    pub fn add_route(&self, spec: RouteSpec<T>) -> Result<RouteId, RegistrationError> {
        let segments = compile_route(&spec.pattern)?;
        let mut state = self.state.write();
        let id = RouteId(state.routes.len() as u64);
        let route = Arc::new(Route {
            id,
            pattern: spec.pattern,
            segments,
            handler: spec.handler,
            priority: spec.priority,
            roles: spec.roles,
        });
        state.tree.insert(id, route.priority, &route.segments);
        debug!(pattern = %route.pattern, id = %route.id, priority = route.priority, "route registered");
        state.routes.push(route);
        Ok(id)
    }

    /// Register a controller name for implicit `<name>/index` resolution.
    ///
    /// A single-segment request that misses cleanly is retried with
    /// `index` appended when its segment names a registered controller.
    pub fn add_controller(&self, name: &str) {
        self.state.write().controllers.insert(name.to_lowercase());
    }

    /// Set the handler answering empty-path requests.
    pub fn set_index_route(&self, handler: T) -> RouteId {
        let mut state = self.state.write();
        let id = RouteId(state.routes.len() as u64);
        let route = Arc::new(Route {
            id,
            pattern: "/".to_owned(),
            segments: Vec::new(),
            handler,
            priority: 0,
            roles: Vec::new(),
        });
        state.routes.push(Arc::clone(&route));
        state.index_route = Some(route);
        id
    }

    /// Match a request path against the table.
    ///
    /// The path is split on `/` with empty segments dropped; literals are
    /// compared case-insensitively while captured values keep the request's
    /// original casing.
    pub fn match_path(&self, path: &str) -> MatchOutcome<T> {
        let raw: SmallVec<[&str; 8]> = path.split('/').filter(|s| !s.is_empty()).collect();
        let state = self.state.read();

        if raw.is_empty() {
            if let Some(index) = &state.index_route {
                return MatchOutcome::hit(Arc::clone(index), Params::default());
            }
            // an all-optional route may terminate at the root
            return Self::resolve(&state, &self.pool, &[], &[]);
        }

        let lowered_owned: SmallVec<[String; 8]> = raw.iter().map(|s| s.to_lowercase()).collect();
        let lowered: SmallVec<[&str; 8]> = lowered_owned.iter().map(String::as_str).collect();

        let outcome = Self::resolve(&state, &self.pool, &lowered, &raw);
        if outcome.is_match() {
            return outcome;
        }

        // A clean single-segment miss retries as `<controller>/index`.
        // A partial result is not clean: the caller may want it as-is.
        if raw.len() == 1
            && outcome.best_partial().is_none()
            && state.controllers.contains(lowered[0])
        {
            let retry = Self::resolve(
                &state,
                &self.pool,
                &[lowered[0], "index"],
                &[raw[0], "index"],
            );
            if retry.is_match() {
                return retry;
            }
        }

        trace!(path, "no route matched");
        outcome
    }

    /// Snapshot descriptors of every registered route, in registration
    /// order.
    #[must_use]
    pub fn routes(&self) -> Vec<RouteDescriptor> {
        self.state
            .read()
            .routes
            .iter()
            .map(|route| route.descriptor())
            .collect()
    }

    /// Number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().routes.len()
    }

    /// Whether no routes have been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().routes.is_empty()
    }

    fn resolve(
        state: &RouterState<T>,
        pool: &BufferPool,
        lowered: &[&str],
        raw: &[&str],
    ) -> MatchOutcome<T> {
        let found = state.tree.find(lowered, raw, pool);
        let best_partial = found
            .best_partial
            .map(|id| Arc::clone(&state.routes[id.0 as usize]));
        match found.matched {
            Some(id) => {
                let route = Arc::clone(&state.routes[id.0 as usize]);
                MatchOutcome::hit(route, found.params)
            }
            None => MatchOutcome::miss(best_partial),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_routes_leave_the_table_untouched() {
        let router: Router<&str> = Router::new();
        router.add("/ok", "ok").expect("valid");
        assert!(router.add("/bad/{", "bad").is_err());
        assert!(router.add("/bad/{x?}/y", "bad").is_err());
        assert_eq!(router.len(), 1);
        assert!(router.match_path("/ok").is_match());
        assert!(!router.match_path("/bad/z").is_match());
    }

    #[test]
    fn index_route_answers_the_empty_path() {
        let router: Router<&str> = Router::new();
        assert!(!router.match_path("/").is_match());
        router.set_index_route("home");
        let outcome = router.match_path("/");
        assert!(outcome.is_match());
        assert_eq!(outcome.handler(), Some(&"home"));
        assert!(outcome.params().is_empty());
        assert!(router.match_path("").is_match());
    }

    #[test]
    fn controller_retry_needs_a_clean_miss() {
        let router: Router<&str> = Router::new();
        router.add("/reports/index", "reports-index").expect("valid");
        router.add_controller("Reports");

        let retried = router.match_path("/reports");
        assert!(retried.is_match());
        assert_eq!(retried.handler(), Some(&"reports-index"));

        // unknown name: no retry, clean miss
        assert!(!router.match_path("/billing").is_match());
    }

    #[test]
    fn controller_retry_skipped_on_partial() {
        let router: Router<&str> = Router::new();
        // the all-optional route terminates at the root, so every request
        // passes a routable node and misses are never "clean"
        router.add("/{x:int?}", "numbers").expect("valid");
        router.add("/shop/index", "shop-index").expect("valid");
        router.add_controller("shop");

        let outcome = router.match_path("/shop");
        assert!(!outcome.is_match());
        assert_eq!(
            outcome.best_partial().map(Route::pattern),
            Some("/{x:int?}")
        );
    }

    #[test]
    fn roles_and_priority_pass_through() {
        let router: Router<u32> = Router::new();
        let id = router
            .add_route(
                RouteSpec::new("/admin/{section}", 7)
                    .priority(3)
                    .role("admin")
                    .roles(["ops", "root"]),
            )
            .expect("valid");

        let outcome = router.match_path("/Admin/users");
        let route = outcome.route().expect("matched");
        assert_eq!(route.id(), id);
        assert_eq!(route.priority(), 3);
        assert_eq!(route.roles(), ["admin", "ops", "root"]);
        assert_eq!(outcome.params().get("section"), Some("users"));
    }

    #[test]
    fn descriptors_list_routes_in_registration_order() {
        let router: Router<&str> = Router::new();
        router.add("/a", "a").expect("valid");
        router
            .add_route(RouteSpec::new("/b/{x:int}", "b").priority(2))
            .expect("valid");

        let routes = router.routes();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].pattern, "/a");
        assert_eq!(routes[1].priority, 2);
        assert_eq!(routes[1].id.as_u64(), 1);
    }

    #[test]
    fn canonical_pattern_round_trips() {
        let router: Router<&str> = Router::new();
        router
            .add("/Shop/{Category:alpha}/{page=1:int}", "shop")
            .expect("valid");
        let outcome = router.match_path("/shop/books/2");
        assert_eq!(
            outcome.route().expect("matched").canonical_pattern(),
            "/shop/{category:alpha}/{page=1:int}"
        );
    }
}
