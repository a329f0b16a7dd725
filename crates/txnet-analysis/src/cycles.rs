//! Return-cycle search: does currency sent by an account ever flow back to it?
//!
//! For every seed account (at least one incoming and one outgoing transfer)
//! a depth-first search follows outgoing transfers and reports the first
//! path that comes back to the seed.
//!
//! ## Rules
//!
//! 1. A node may appear at most once on the current path. Sibling branches do
//!    not see each other's visits, so diamond-shaped reconvergence is explored
//!    along every route.
//! 2. A direct self-transfer of the seed never starts a cycle.
//! 3. A return only counts after at least [`MIN_CYCLE_EDGES`] transfers.
//!    Back-and-forth pairs (A → B → A) are not cycles.
//!
//! The search is exhaustive over simple paths, so its cost is exponential in
//! the branching factor on dense graphs. It runs on an explicit heap stack
//! instead of the call stack; [`CycleFinder::with_max_depth`] bounds the
//! explored path length when that cost matters.

use std::collections::HashSet;

use petgraph::graph::NodeIndex;
use petgraph::Direction;
use serde::Serialize;
use tracing::debug;

use crate::error::GraphError;
use crate::graph::TransactionGraph;

/// Minimum number of transfers for a return path to count as a cycle.
pub const MIN_CYCLE_EDGES: usize = 3;

/// Witness path for one seed account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReturnCycle {
    /// The account the funds left from and returned to.
    pub seed: String,
    /// Closed path: first and last entries are both `seed`.
    pub path: Vec<String>,
}

impl ReturnCycle {
    /// Number of transfers traversed.
    pub fn edge_count(&self) -> usize {
        self.path.len().saturating_sub(1)
    }
}

/// Outcome of searching every seed account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Number of seed accounts searched.
    pub seeds_searched: usize,
    /// One witness per seed that has a return cycle, in seed order.
    pub cycles: Vec<ReturnCycle>,
}

struct Frame {
    node: NodeIndex,
    successors: Vec<NodeIndex>,
    next: usize,
}

/// Configurable return-cycle search over a borrowed graph.
pub struct CycleFinder<'g> {
    graph: &'g TransactionGraph,
    max_depth: Option<usize>,
}

impl<'g> CycleFinder<'g> {
    pub fn new(graph: &'g TransactionGraph) -> Self {
        Self {
            graph,
            max_depth: None,
        }
    }

    /// Only consider cycles of at most `max_depth` transfers.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Search a single account. Accounts that are not seeds yield `Ok(None)`.
    pub fn find_from(&self, seed: &str) -> Result<Option<ReturnCycle>, GraphError> {
        let seed_ix = self.graph.index_of(seed)?;
        if !self.graph.is_seed(seed_ix) {
            return Ok(None);
        }
        Ok(self.search(seed_ix).map(|path| self.witness(seed_ix, &path)))
    }

    /// First witness across all seeds, stopping as soon as one is found.
    pub fn first(&self) -> Result<Option<ReturnCycle>, GraphError> {
        for seed_ix in self.seeds()? {
            if let Some(path) = self.search(seed_ix) {
                return Ok(Some(self.witness(seed_ix, &path)));
            }
        }
        Ok(None)
    }

    /// Like [`CycleFinder::first`], reporting how many seeds were visited
    /// before the search stopped.
    pub fn first_report(&self) -> Result<CycleReport, GraphError> {
        let mut report = CycleReport::default();
        for seed_ix in self.seeds()? {
            report.seeds_searched += 1;
            if let Some(path) = self.search(seed_ix) {
                report.cycles.push(self.witness(seed_ix, &path));
                break;
            }
        }
        Ok(report)
    }

    /// One witness per seed, searching every seed.
    pub fn report(&self) -> Result<CycleReport, GraphError> {
        let seeds = self.seeds()?;
        let mut report = CycleReport {
            seeds_searched: seeds.len(),
            cycles: Vec::new(),
        };

        for seed_ix in seeds {
            match self.search(seed_ix) {
                Some(path) => {
                    debug!(seed = %self.graph.address_of(seed_ix), edges = path.len() - 1, "cycle found");
                    report.cycles.push(self.witness(seed_ix, &path));
                }
                None => debug!(seed = %self.graph.address_of(seed_ix), "no cycle found"),
            }
        }

        Ok(report)
    }

    fn seeds(&self) -> Result<Vec<NodeIndex>, GraphError> {
        let seeds = self.graph.seed_indices();
        if seeds.is_empty() {
            return Err(GraphError::NoCandidateSeed);
        }
        Ok(seeds)
    }

    fn witness(&self, seed_ix: NodeIndex, path: &[NodeIndex]) -> ReturnCycle {
        ReturnCycle {
            seed: self.graph.address_of(seed_ix).to_string(),
            path: path
                .iter()
                .map(|&ix| self.graph.address_of(ix).to_string())
                .collect(),
        }
    }

    fn frame(&self, node: NodeIndex) -> Frame {
        Frame {
            node,
            successors: self.graph.neighbor_indices(node, Direction::Outgoing),
            next: 0,
        }
    }

    /// Depth-first search for a closed path from `seed` back to itself.
    ///
    /// `on_path` holds the intermediate accounts of the current path (never
    /// the seed). Entries are removed when their frame is popped, which gives
    /// every branch its own view of what has been visited.
    fn search(&self, seed: NodeIndex) -> Option<Vec<NodeIndex>> {
        let mut stack = vec![self.frame(seed)];
        let mut on_path: HashSet<NodeIndex> = HashSet::new();

        loop {
            // Transfers from the seed to the top-of-stack account.
            let depth = stack.len().checked_sub(1)?;

            let next = {
                let frame = stack.last_mut()?;
                let next = frame.successors.get(frame.next).copied();
                if next.is_some() {
                    frame.next += 1;
                }
                next
            };

            let Some(next) = next else {
                if let Some(done) = stack.pop() {
                    on_path.remove(&done.node);
                }
                continue;
            };

            if next == seed {
                if depth + 1 >= MIN_CYCLE_EDGES {
                    let mut path: Vec<NodeIndex> = stack.iter().map(|frame| frame.node).collect();
                    path.push(seed);
                    return Some(path);
                }
                continue;
            }

            if on_path.contains(&next) {
                continue;
            }
            if self.max_depth.is_some_and(|max| depth + 1 >= max) {
                continue;
            }

            on_path.insert(next);
            stack.push(self.frame(next));
        }
    }
}

/// Whether any seed account has a return cycle.
pub fn has_return_cycle(graph: &TransactionGraph) -> Result<bool, GraphError> {
    CycleFinder::new(graph).first().map(|cycle| cycle.is_some())
}

/// Witness from the first seed account (in insertion order) that has a return cycle.
pub fn find_return_cycle(graph: &TransactionGraph) -> Result<Option<ReturnCycle>, GraphError> {
    CycleFinder::new(graph).first()
}

/// Witnesses for every seed account.
pub fn find_return_cycles(graph: &TransactionGraph) -> Result<CycleReport, GraphError> {
    CycleFinder::new(graph).report()
}
