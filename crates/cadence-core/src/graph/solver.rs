//! Rate-balance solver.
//!
//! For every edge the balance equation
//! `production_rate * reps(source) == consumption_rate * reps(target)` must
//! hold. [`solve_repetitions`] finds the minimal positive-integer solution per
//! connected component by breadth-first propagation of exact rationals,
//! then clears denominators (lcm) and common factors (gcd).

#[cfg(not(feature = "std"))]
use alloc::{collections::VecDeque, vec, vec::Vec};
#[cfg(feature = "std")]
use std::collections::VecDeque;

use super::error::GraphError;
use super::model::SdfGraph;
use super::node::NodeId;

/// Activations per node per schedule period, indexed by [`NodeId`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RepetitionVector(Vec<u32>);

impl RepetitionVector {
    /// Returns the repetition count of `node` (0 for an unknown node).
    #[inline]
    pub fn get(&self, node: NodeId) -> u32 {
        self.0.get(node.index()).copied().unwrap_or(0)
    }

    /// Returns the counts in node declaration order.
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    /// Iterates over `(node, count)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, u32)> + '_ {
        self.0
            .iter()
            .enumerate()
            .map(|(i, &r)| (NodeId(i as u32), r))
    }

    /// Returns the number of nodes covered.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no node is covered.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total activations in one period.
    pub fn total_activations(&self) -> u64 {
        self.0.iter().map(|&r| u64::from(r)).sum()
    }
}

/// Greatest common divisor (Euclid).
pub(crate) fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Least common multiple, `None` on overflow.
pub(crate) fn lcm(a: u64, b: u64) -> Option<u64> {
    if a == 0 || b == 0 {
        return Some(0);
    }
    (a / gcd(a, b)).checked_mul(b)
}

/// Positive rational kept in lowest terms, so `==` is value equality.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Ratio {
    num: u64,
    den: u64,
}

impl Ratio {
    const ONE: Self = Self { num: 1, den: 1 };

    fn reduced(num: u64, den: u64) -> Self {
        let g = gcd(num, den).max(1);
        Self {
            num: num / g,
            den: den / g,
        }
    }

    /// Returns `self * mul / div`, or `None` on overflow.
    fn scale(self, mul: u64, div: u64) -> Option<Self> {
        // Cross-reduce first to keep intermediates small.
        let g1 = gcd(self.num, div).max(1);
        let g2 = gcd(mul, self.den).max(1);
        let num = (self.num / g1).checked_mul(mul / g2)?;
        let den = (self.den / g2).checked_mul(div / g1)?;
        Some(Self::reduced(num, den))
    }
}

/// Computes the minimal repetition vector of a validated graph.
///
/// Each connected component (edges taken as undirected) is solved
/// independently: the lowest-index unvisited node is seeded with 1 and the
/// ratio `production/consumption` is propagated along every edge. If two
/// paths reach a node with different ratios the rates are inconsistent and no
/// finite periodic schedule exists.
///
/// # Errors
///
/// - [`GraphError::Inconsistent`] if the balance equations only admit the
///   zero solution
/// - [`GraphError::RateOverflow`] if a count does not fit in `u32`
pub fn solve_repetitions(graph: &SdfGraph) -> Result<RepetitionVector, GraphError> {
    let n = graph.node_count();
    let mut ratios: Vec<Option<Ratio>> = vec![None; n];
    let mut reps = vec![0u32; n];
    let mut component: Vec<usize> = Vec::new();
    let mut queue: VecDeque<usize> = VecDeque::new();

    for seed in 0..n {
        if ratios[seed].is_some() {
            continue;
        }
        ratios[seed] = Some(Ratio::ONE);
        component.clear();
        queue.push_back(seed);

        while let Some(idx) = queue.pop_front() {
            component.push(idx);
            let Some(current) = ratios[idx] else {
                continue;
            };
            let node = &graph.nodes[idx];

            for edge_id in node.output_edges().chain(node.input_edges()) {
                let edge = &graph.edges[edge_id.index()];
                let production = u64::from(edge.production);
                let consumption = u64::from(edge.consumption);

                // reps(target) = reps(source) * production / consumption
                let (other, implied) = if edge.source.node.index() == idx {
                    (edge.target.node, current.scale(production, consumption))
                } else {
                    (edge.source.node, current.scale(consumption, production))
                };
                let implied = implied.ok_or(GraphError::RateOverflow { node: other })?;

                match ratios[other.index()] {
                    None => {
                        ratios[other.index()] = Some(implied);
                        queue.push_back(other.index());
                    }
                    Some(existing) if existing != implied => {
                        return Err(GraphError::Inconsistent { edge: edge_id });
                    }
                    Some(_) => {}
                }
            }
        }

        integerize(&component, &ratios, &mut reps)?;
    }

    #[cfg(feature = "tracing")]
    tracing::debug!("graph_solve: repetition vector {:?}", reps);
    Ok(RepetitionVector(reps))
}

/// Scales one component's ratios to the smallest all-integer solution.
fn integerize(
    component: &[usize],
    ratios: &[Option<Ratio>],
    reps: &mut [u32],
) -> Result<(), GraphError> {
    let ratio_of = |idx: usize| ratios[idx].unwrap_or(Ratio::ONE);

    let mut denominator_lcm = 1u64;
    for &idx in component {
        denominator_lcm = lcm(denominator_lcm, ratio_of(idx).den).ok_or(
            GraphError::RateOverflow {
                node: NodeId(idx as u32),
            },
        )?;
    }

    let mut numerator_gcd = 0u64;
    for &idx in component {
        let r = ratio_of(idx);
        let scaled = r
            .num
            .checked_mul(denominator_lcm / r.den)
            .ok_or(GraphError::RateOverflow {
                node: NodeId(idx as u32),
            })?;
        numerator_gcd = gcd(numerator_gcd, scaled);
    }

    for &idx in component {
        let r = ratio_of(idx);
        let value = r.num * (denominator_lcm / r.den) / numerator_gcd.max(1);
        reps[idx] = u32::try_from(value).map_err(|_| GraphError::RateOverflow {
            node: NodeId(idx as u32),
        })?;
    }
    Ok(())
}
