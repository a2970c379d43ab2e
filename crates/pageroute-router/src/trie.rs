//! The routing tree: truncation expansion, insertion, and the matcher walk.
//!
//! Each inserted route is expanded into its *truncations* (prefixes whose
//! dropped suffix consists entirely of optional-or-defaulted segments) and
//! every truncation becomes a real path in the tree. Matching is a
//! depth-first walk with backtracking; at every node static children are
//! tried before dynamic candidates, dynamic before catch-all, catch-all
//! before wildcard.

use std::cmp::Reverse;
use std::collections::HashMap;

use parking_lot::Mutex;

use crate::constraint::Constraint;
use crate::pattern::RouteSegment;
use crate::r#match::{Params, RouteId};

/// Reserved capture key for bare `*` segments.
pub(crate) const WILDCARD_KEY: &str = "wildcard";

const POOL_LIMIT: usize = 16;

/// Scratch strings for assembling wildcard and catch-all captures.
///
/// Buffers are handed back on every path that does not move them into the
/// parameter map.
#[derive(Debug, Default)]
pub(crate) struct BufferPool {
    buffers: Mutex<Vec<String>>,
}

impl BufferPool {
    pub(crate) fn take(&self) -> String {
        self.buffers.lock().pop().unwrap_or_default()
    }

    pub(crate) fn put(&self, mut buffer: String) {
        buffer.clear();
        let mut buffers = self.buffers.lock();
        if buffers.len() < POOL_LIMIT {
            buffers.push(buffer);
        }
    }
}

/// A route that terminates at a node, with the data needed to rank it.
#[derive(Debug, Clone, Copy)]
struct Terminal {
    route: RouteId,
    priority: i32,
}

/// Catch-all slot: at most one per parent node.
#[derive(Debug)]
struct CatchAllNode {
    name: String,
    constraints: Vec<Constraint>,
    terminal: Terminal,
}

/// A dynamic candidate: one constraint set under a parameter name.
#[derive(Debug)]
struct DynCandidate {
    constraints: Vec<Constraint>,
    type_priority: u32,
    route_priority: i32,
    seq: u64,
    child: Node,
}

/// Dynamic candidates grouped by parameter name, kept in match order.
#[derive(Debug)]
struct DynGroup {
    name: String,
    candidates: Vec<DynCandidate>,
}

#[derive(Debug, Default)]
struct Node {
    statics: HashMap<String, Node>,
    dynamics: Vec<DynGroup>,
    catch_all: Option<Box<CatchAllNode>>,
    wildcard: Option<Terminal>,
    terminal: Option<Terminal>,
    /// Default values owed to parameters of segments truncated away below
    /// this node.
    defaults: Vec<(String, String)>,
}

impl Node {
    /// Record a terminating route, keeping the highest priority. Equal
    /// priority is last-writer-wins.
    fn set_terminal(&mut self, route: RouteId, priority: i32) -> bool {
        set_terminal_slot(&mut self.terminal, route, priority)
    }

    /// Rebuild the node's defaults from the current terminal-winner's
    /// truncation suffix. A previous winner's entries never survive: a
    /// route that redeclares nothing must not leak another route's values.
    fn rebuild_defaults(&mut self, suffix: &[RouteSegment]) {
        self.defaults.clear();
        for segment in suffix {
            if let RouteSegment::Dynamic {
                name,
                default: Some(value),
                ..
            } = segment
            {
                match self.defaults.iter_mut().find(|(n, _)| n == name) {
                    Some(entry) => entry.1 = value.clone(),
                    None => self.defaults.push((name.clone(), value.clone())),
                }
            }
        }
    }

    /// Find or create the dynamic candidate for `name` + `constraints` and
    /// return its child node. The candidate list is re-ranked afterwards.
    fn dynamic_child(
        &mut self,
        name: &str,
        constraints: &[Constraint],
        route_priority: i32,
        next_seq: &mut u64,
    ) -> &mut Node {
        let group = match self.dynamics.iter().position(|g| g.name == name) {
            Some(i) => &mut self.dynamics[i],
            None => {
                self.dynamics.push(DynGroup {
                    name: name.to_owned(),
                    candidates: Vec::new(),
                });
                let last = self.dynamics.len() - 1;
                &mut self.dynamics[last]
            }
        };

        match group.candidates.iter().position(|c| c.constraints == constraints) {
            Some(i) => {
                let candidate = &mut group.candidates[i];
                candidate.route_priority = candidate.route_priority.max(route_priority);
            }
            None => {
                let seq = *next_seq;
                *next_seq += 1;
                group.candidates.push(DynCandidate {
                    constraints: constraints.to_vec(),
                    type_priority: type_priority_of(constraints),
                    route_priority,
                    seq,
                    child: Node::default(),
                });
            }
        }

        group
            .candidates
            .sort_by_key(|c| (c.type_priority, Reverse(c.route_priority), c.seq));
        let i = group
            .candidates
            .iter()
            .position(|c| c.constraints == constraints)
            .expect("candidate present after re-ranking");
        &mut group.candidates[i].child
    }
}

fn set_terminal_slot(slot: &mut Option<Terminal>, route: RouteId, priority: i32) -> bool {
    match slot {
        Some(existing) if priority < existing.priority => false,
        _ => {
            *slot = Some(Terminal { route, priority });
            true
        }
    }
}

/// Narrowest constraint wins: `int` 1, `guid` 2, `long` 3, anything else
/// 10. An unconstrained candidate ranks after every constrained one.
fn type_priority_of(constraints: &[Constraint]) -> u32 {
    constraints
        .iter()
        .map(Constraint::type_priority)
        .min()
        .unwrap_or(u32::MAX)
}

/// The result of a tree walk, in route-id terms.
#[derive(Debug)]
pub(crate) struct TreeMatch {
    pub(crate) matched: Option<RouteId>,
    pub(crate) params: Params,
    pub(crate) best_partial: Option<RouteId>,
}

#[derive(Debug, Default)]
pub(crate) struct RouteTree {
    root: Node,
    next_seq: u64,
}

impl RouteTree {
    /// Insert every truncation of a compiled route.
    ///
    /// Infallible: structural validation happened at compile time.
    pub(crate) fn insert(&mut self, id: RouteId, priority: i32, segments: &[RouteSegment]) {
        let first_cut = segments
            .iter()
            .position(RouteSegment::is_optional_or_defaulted)
            .unwrap_or(segments.len());
        for cut in first_cut..=segments.len() {
            self.insert_truncation(id, priority, segments, cut);
        }
    }

    fn insert_truncation(
        &mut self,
        id: RouteId,
        priority: i32,
        segments: &[RouteSegment],
        cut: usize,
    ) {
        let mut node = &mut self.root;
        for segment in &segments[..cut] {
            match segment {
                RouteSegment::Static { literal } => {
                    node = node.statics.entry(literal.clone()).or_default();
                }
                RouteSegment::Dynamic {
                    name, constraints, ..
                } => {
                    node = node.dynamic_child(name, constraints, priority, &mut self.next_seq);
                }
                RouteSegment::Wildcard => {
                    set_terminal_slot(&mut node.wildcard, id, priority);
                    return;
                }
                RouteSegment::CatchAll { name, constraints } => {
                    match &mut node.catch_all {
                        Some(existing) => {
                            if priority >= existing.terminal.priority {
                                existing.terminal = Terminal { route: id, priority };
                                existing.name = name.clone();
                                existing.constraints = constraints.clone();
                            }
                        }
                        None => {
                            node.catch_all = Some(Box::new(CatchAllNode {
                                name: name.clone(),
                                constraints: constraints.clone(),
                                terminal: Terminal { route: id, priority },
                            }));
                        }
                    }
                    return;
                }
            }
        }
        if node.set_terminal(id, priority) {
            node.rebuild_defaults(&segments[cut..]);
        }
    }

    /// Walk the tree over a request.
    ///
    /// `lowered` drives literal comparison; `raw` preserves the request's
    /// original casing and is what gets captured. The two slices are the
    /// same segments, index for index.
    pub(crate) fn find(&self, lowered: &[&str], raw: &[&str], pool: &BufferPool) -> TreeMatch {
        debug_assert_eq!(lowered.len(), raw.len());
        let mut walker = Walker {
            lowered,
            raw,
            pool,
            params: Params::default(),
            journal: Vec::new(),
            matched: None,
            best: None,
        };
        let exact = walker.walk(&self.root, 0);
        TreeMatch {
            matched: walker.matched,
            params: if exact { walker.params } else { Params::default() },
            best_partial: walker.best.map(|best| best.route),
        }
    }
}

/// Undo journal entry for one parameter write, so backtracking can peel
/// off exactly the bindings made at the abandoned depth.
#[derive(Debug)]
enum Undo {
    Pushed,
    Replaced { index: usize, previous: String },
}

#[derive(Debug, Clone, Copy)]
struct Partial {
    depth: usize,
    priority: i32,
    route: RouteId,
}

struct Walker<'a> {
    lowered: &'a [&'a str],
    raw: &'a [&'a str],
    pool: &'a BufferPool,
    params: Params,
    journal: Vec<Undo>,
    matched: Option<RouteId>,
    best: Option<Partial>,
}

impl Walker<'_> {
    fn walk(&mut self, node: &Node, index: usize) -> bool {
        let checkpoint = self.journal.len();
        for (name, value) in &node.defaults {
            if self.params.insert_if_absent(name, value) {
                self.journal.push(Undo::Pushed);
            }
        }
        if let Some(terminal) = node.terminal {
            self.note_partial(index, terminal);
        }

        if index == self.lowered.len() {
            if let Some(terminal) = node.terminal {
                self.matched = Some(terminal.route);
                return true;
            }
            // `*` matches an empty remainder
            if let Some(terminal) = node.wildcard {
                self.bind(WILDCARD_KEY, "/".to_owned());
                self.matched = Some(terminal.route);
                return true;
            }
            self.unwind(checkpoint);
            return false;
        }

        let segment = self.lowered[index];

        if let Some(child) = node.statics.get(segment) {
            if self.walk(child, index + 1) {
                return true;
            }
        }

        for group in &node.dynamics {
            for candidate in &group.candidates {
                let value = self.raw[index];
                if !candidate.constraints.iter().all(|c| c.evaluate(value)) {
                    continue;
                }
                let bound_at = self.journal.len();
                self.bind(&group.name, value.to_owned());
                if self.walk(&candidate.child, index + 1) {
                    return true;
                }
                self.unwind(bound_at);
            }
        }

        if let Some(catch_all) = &node.catch_all {
            let mut buffer = self.pool.take();
            join_segments(&mut buffer, &self.raw[index..]);
            if catch_all.constraints.iter().all(|c| c.evaluate(&buffer)) {
                self.bind(&catch_all.name, buffer);
                self.matched = Some(catch_all.terminal.route);
                return true;
            }
            self.pool.put(buffer);
        }

        if let Some(terminal) = node.wildcard {
            let mut buffer = self.pool.take();
            buffer.push('/');
            for part in &self.raw[index..] {
                buffer.push_str(part);
                buffer.push('/');
            }
            self.bind(WILDCARD_KEY, buffer);
            self.matched = Some(terminal.route);
            return true;
        }

        self.unwind(checkpoint);
        false
    }

    fn bind(&mut self, name: &str, value: String) {
        match self.params.set(name, value) {
            Some((index, previous)) => self.journal.push(Undo::Replaced { index, previous }),
            None => self.journal.push(Undo::Pushed),
        }
    }

    fn unwind(&mut self, checkpoint: usize) {
        while self.journal.len() > checkpoint {
            match self.journal.pop() {
                Some(Undo::Pushed) => self.params.pop_last(),
                Some(Undo::Replaced { index, previous }) => self.params.restore(index, previous),
                None => break,
            }
        }
    }

    fn note_partial(&mut self, depth: usize, terminal: Terminal) {
        let better = match self.best {
            None => true,
            Some(best) => {
                depth > best.depth || (depth == best.depth && terminal.priority > best.priority)
            }
        };
        if better {
            self.best = Some(Partial {
                depth,
                priority: terminal.priority,
                route: terminal.route,
            });
        }
    }
}

fn join_segments(buffer: &mut String, parts: &[&str]) {
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            buffer.push('/');
        }
        buffer.push_str(part);
    }
}
