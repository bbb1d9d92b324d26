//! Defines the message passing inference engine
//!
//! Three algorithms share one traversal skeleton and differ only in their operator
//! pair and domain:
//!
//! | algorithm   | domain      | combine  | eliminate |
//! |-------------|-------------|----------|-----------|
//! | sum-product | probability | multiply | sum       |
//! | max-product | probability | multiply | max       |
//! | max-sum     | log         | add      | max       |
//!
//! A message from node A to node B is the combination of A's own contribution (its
//! potential, for a factor node; the neutral unit, for a variable node) with the
//! cached incoming messages on A's other edges, eliminated down to the variable
//! shared with B. Two schedules drive the updates: an exact two-pass `Tree` schedule
//! for acyclic graphs, and an approximate synchronous `Flooding` schedule with an
//! iteration budget and a convergence tolerance for graphs with cycles.
//!
//! # Example
//!
//! Sum-product on a two-variable chain (the factor is taken from the example on
//! page 409 of Bishop, *Pattern Recognition and Machine Learning*):
//!
//! ```
//! extern crate ndarray;
//! extern crate frey;
//!
//! use frey::graph::FactorGraph;
//! use frey::inference::sum_product;
//! use frey::potential::Potential;
//! use frey::variable::{Assignment, Domain};
//! use ndarray::{ArrayD, IxDyn};
//!
//! fn main() {
//!     let mut fg = FactorGraph::new();
//!     let x1 = fg.add_variable("x1", Domain::Discrete(2)).unwrap();
//!     let x2 = fg.add_variable("x2", Domain::Discrete(2)).unwrap();
//!
//!     let fa = fg.add_factor("fa").unwrap();
//!     fg.connect(x1, fa).unwrap();
//!     fg.connect(x2, fa).unwrap();
//!
//!     let table = ArrayD::from_shape_vec(IxDyn(&[2, 2]), vec![0.3, 0.4, 0.3, 0.0]).unwrap();
//!     fg.set_potential(fa, Potential::table(vec![x1, x2], table).unwrap()).unwrap();
//!
//!     let belief = sum_product(&mut fg, x2).unwrap();
//!
//!     let mut assn = Assignment::new();
//!     assn.set(&x2, 0);
//!     assert!((0.6 - belief.value(&assn).unwrap()).abs() < 1e-9);
//! }
//! ```

use graph::{Direction, EdgeId, FactorGraph, FactorId};
use init::MessageInit;
use potential::Potential;
use util::{FreyError, Result};
use variable::{Assignment, Variable};

use indexmap::IndexMap;

mod flooding;
mod tree;


/// The message passing algorithm: the combine/eliminate operator pair and the domain
/// the messages live in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Algorithm {

    /// Marginal beliefs: multiply, eliminate by summation
    SumProduct,

    /// Max-marginal beliefs: multiply, eliminate by maximization
    MaxProduct,

    /// Max-marginal beliefs in the log domain: add, eliminate by maximization
    MaxSum

}

impl Algorithm {

    /// Combine two potentials: pointwise product in the probability domain,
    /// pointwise sum in the log domain.
    pub fn combine(&self, a: &Potential, b: &Potential) -> Result<Potential> {
        match *self {
            Algorithm::MaxSum => a.sum(b),
            _ => a.product(b)
        }
    }


    /// Eliminate every variable outside `keep`: by summation for sum-product, by
    /// maximization otherwise.
    pub fn eliminate(&self, p: &Potential, keep: &[Variable]) -> Result<Potential> {
        match *self {
            Algorithm::SumProduct => p.marginalize(keep),
            _ => p.maximize(keep)
        }
    }


    /// Bring a factor potential into the algorithm's message domain
    pub fn prepare(&self, p: &Potential) -> Potential {
        if self.is_log_domain() {
            p.log()
        } else {
            p.clone()
        }
    }


    /// The neutral message over a scope: all-ones table, zero log-table, or vacuous
    /// Gaussian
    pub fn unit(&self, scope: &[Variable]) -> Result<Potential> {
        let unity = Potential::unity(scope)?;
        Ok(if self.is_log_domain() { unity.log() } else { unity })
    }


    /// The message of a variable fixed to an observed state
    pub fn indicator(&self, variable: Variable, state: usize) -> Result<Potential> {
        let indicator = Potential::indicator(variable, state)?;
        Ok(if self.is_log_domain() { indicator.log() } else { indicator })
    }


    /// Finish a raw belief. Probability-domain beliefs are normalized; max-sum
    /// beliefs keep their raw log values, so the belief maximum equals the log of
    /// the maximum joint mass.
    pub fn finish(&self, belief: Potential) -> Result<Potential> {
        match *self {
            Algorithm::MaxSum => Ok(belief),
            _ => belief.normalize()
        }
    }


    /// Check if the algorithm's messages live in the log domain
    pub fn is_log_domain(&self) -> bool {
        *self == Algorithm::MaxSum
    }

}


/// The update schedule.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Schedule {

    /// Two passes over the spanning structure of each component - inward from the
    /// leaves, then outward from the root. Exact, and each message is computed
    /// exactly once; requires an acyclic graph.
    Tree,

    /// Synchronous iteration for graphs with cycles: every edge in both directions
    /// is recomputed from the previous iteration's messages until the largest
    /// message change drops to `tolerance` or the iteration budget runs out.
    Flooding {
        max_iterations: usize,
        tolerance: f64,
        init: MessageInit
    }

}

impl Schedule {

    /// A flooding schedule with unity-initialized messages
    pub fn flooding(max_iterations: usize, tolerance: f64) -> Schedule {
        Schedule::Flooding {
            max_iterations,
            tolerance,
            init: MessageInit::Unity
        }
    }

}


/// Which variable nodes to extract beliefs for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Target {
    Node(Variable),
    All
}


/// How an inference run terminated. `NotConverged` is a reportable status, not a
/// failure: the accompanying beliefs are the best-effort result of the final
/// iteration, and the caller may retry with a larger budget or looser tolerance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Convergence {

    /// Tree schedule: messages are exact
    Exact,

    /// The flooding residual dropped to the tolerance at this iteration
    Converged { iterations: usize },

    /// The iteration budget ran out with the given residual still outstanding
    NotConverged { iterations: usize, residual: f64 }

}

impl Convergence {

    /// Check if the messages met the schedule's exactness or tolerance contract
    pub fn is_converged(&self) -> bool {
        match *self {
            Convergence::NotConverged { .. } => false,
            _ => true
        }
    }

}


/// The outcome of an inference run.
pub struct InferenceResult {

    /// Belief of each targeted variable node: the (finished) combination of all of
    /// its incoming messages
    pub beliefs: IndexMap<Variable, Potential>,

    /// Termination status of the schedule
    pub status: Convergence,

    /// For max-product and max-sum on all-discrete graphs: one maximizing joint
    /// assignment, obtained by back-tracking
    pub configuration: Option<Assignment>

}


/// Run an inference algorithm over the graph.
///
/// Computes per-edge messages under the chosen schedule, then extracts the belief of
/// the targeted variable node(s). For max-product and max-sum an additional
/// back-tracking pass derives one maximizing joint assignment; it is exact on
/// acyclic graphs and only locally consistent on cyclic ones, and is skipped
/// (`configuration: None`) when the graph has continuous variables, whose maximizer
/// is the Gaussian mode rather than a discrete assignment.
///
/// # Errors
/// * `FreyError::MissingPotential` / `FreyError::VariableSetMismatch` if some factor
///   node's potential is absent or inconsistent with its neighbors
/// * `FreyError::CyclicGraph` if the tree schedule meets a cycle
/// * algebra errors (`FreyError::DimensionMismatch`, `FreyError::UnknownVariable`)
///   abort the run; they indicate a structurally inconsistent graph
pub fn run(
    graph: &mut FactorGraph,
    algorithm: Algorithm,
    schedule: Schedule,
    target: Target
) -> Result<InferenceResult> {
    validate(graph)?;

    let status = match schedule {
        Schedule::Tree => {
            let root = match target {
                Target::Node(v) => Some(v),
                Target::All => None
            };
            tree::propagate(graph, algorithm, root)?;
            Convergence::Exact
        },
        Schedule::Flooding { max_iterations, tolerance, init } => {
            flooding::propagate(graph, algorithm, max_iterations, tolerance, init)?
        }
    };

    let targets = match target {
        Target::Node(v) => vec![v],
        Target::All => graph.variables()
    };

    let mut beliefs = IndexMap::new();
    for v in targets {
        let raw = belief(graph, algorithm, v)?;
        beliefs.insert(v, algorithm.finish(raw)?);
    }

    let configuration = match algorithm {
        Algorithm::SumProduct => None,
        _ => {
            if graph.variables().iter().all(|v| v.is_discrete()) {
                Some(tree::extract_configuration(graph, algorithm)?)
            } else {
                debug!("configuration extraction skipped: graph has continuous variables");
                None
            }
        }
    };

    Ok(InferenceResult { beliefs, status, configuration })
}


/// Sum-product over the tree schedule: the normalized marginal of `query`.
pub fn sum_product(graph: &mut FactorGraph, query: Variable) -> Result<Potential> {
    let mut result = run(graph, Algorithm::SumProduct, Schedule::Tree, Target::Node(query))?;
    result.beliefs.shift_remove(&query).ok_or(FreyError::UnknownVariable)
}


/// Max-product over the tree schedule: the normalized max-marginal of `query` and a
/// maximizing joint assignment.
pub fn max_product(graph: &mut FactorGraph, query: Variable) -> Result<(Potential, Assignment)> {
    query_maximizer(graph, Algorithm::MaxProduct, query)
}


/// Max-sum over the tree schedule: the log-domain max-marginal of `query` and a
/// maximizing joint assignment.
pub fn max_sum(graph: &mut FactorGraph, query: Variable) -> Result<(Potential, Assignment)> {
    query_maximizer(graph, Algorithm::MaxSum, query)
}


/// Loopy belief propagation: sum-product over the flooding schedule, beliefs for
/// every variable node.
pub fn loopy_belief_propagation(
    graph: &mut FactorGraph,
    max_iterations: usize,
    tolerance: f64
) -> Result<InferenceResult> {
    run(
        graph,
        Algorithm::SumProduct,
        Schedule::flooding(max_iterations, tolerance),
        Target::All
    )
}


fn query_maximizer(
    graph: &mut FactorGraph,
    algorithm: Algorithm,
    query: Variable
) -> Result<(Potential, Assignment)> {
    let mut result = run(graph, algorithm, Schedule::Tree, Target::Node(query))?;
    let belief = result.beliefs.shift_remove(&query).ok_or(FreyError::UnknownVariable)?;
    let configuration = result.configuration.ok_or(FreyError::TypeMismatch)?;
    Ok((belief, configuration))
}


/// Check the factor-potential invariant before any messages flow: every factor node
/// carries a potential over exactly its neighbor set.
fn validate(graph: &FactorGraph) -> Result<()> {
    for f in graph.factors() {
        match graph.potential(f) {
            None => return Err(FreyError::MissingPotential),
            Some(p) => {
                let scope = p.scope();
                let edges = graph.factor_edges(f)?;
                if scope.len() != edges.len()
                    || ! edges.iter().all(|&e| scope.contains(&graph.edge_variable(e))) {
                    return Err(FreyError::VariableSetMismatch);
                }
            }
        }
    }

    Ok(())
}


/// Message from a variable node along `edge`: the unit over the variable combined
/// with the cached messages on the variable's other edges. An observed variable
/// sends its indicator instead. A leaf variable's message is just the unit.
fn variable_message(
    graph: &FactorGraph,
    algorithm: Algorithm,
    variable: Variable,
    edge: EdgeId
) -> Result<Potential> {
    if let Some(state) = graph.observed(variable) {
        return algorithm.indicator(variable, state);
    }

    let mut msg = algorithm.unit(&[variable])?;
    for &e in graph.variable_edges(variable)?.iter() {
        if e == edge {
            continue;
        }
        msg = algorithm.combine(&msg, &stored(graph, e, Direction::FromFactor)?)?;
    }

    Ok(msg)
}


/// Message from a factor node along `edge`: the prepared factor potential combined
/// with the cached messages on the factor's other edges, eliminated down to the
/// receiving variable. A leaf factor's message is its own prepared potential.
fn factor_message(
    graph: &FactorGraph,
    algorithm: Algorithm,
    factor: FactorId,
    edge: EdgeId
) -> Result<Potential> {
    let receiver = graph.edge_variable(edge);
    let potential = graph.potential(factor).ok_or(FreyError::MissingPotential)?;

    let mut msg = algorithm.prepare(potential);
    for &e in graph.factor_edges(factor)?.iter() {
        if e == edge {
            continue;
        }
        msg = algorithm.combine(&msg, &stored(graph, e, Direction::FromVariable)?)?;
    }

    algorithm.eliminate(&msg, &[receiver])
}


/// The raw (unfinished) belief at a variable node: the combination of every cached
/// incoming message. An observed variable's belief is its indicator.
fn belief(graph: &FactorGraph, algorithm: Algorithm, variable: Variable) -> Result<Potential> {
    if let Some(state) = graph.observed(variable) {
        return algorithm.indicator(variable, state);
    }

    let mut b = algorithm.unit(&[variable])?;
    for &e in graph.variable_edges(variable)?.iter() {
        b = algorithm.combine(&b, &stored(graph, e, Direction::FromFactor)?)?;
    }

    Ok(b)
}


fn stored(graph: &FactorGraph, edge: EdgeId, direction: Direction) -> Result<Potential> {
    graph.message(edge, direction)
         .map(|m| m.potential.clone())
         .ok_or_else(|| FreyError::General(
             String::from("the scheduler read a message that was never computed")
         ))
}


#[cfg(test)]
/// Tests for the inference engine. Tests that exercise the full engine are hoisted
/// here to avoid duplication; anything specific to one schedule lives in that
/// submodule's tests.
///
/// The running example is the four-node chain-with-branch factor graph of Bishop,
/// PRML, section 8.4 (fa, fb, fc all equal to [[0.3, 0.4], [0.3, 0.0]]), whose
/// exact beliefs are known in closed form, cross-checked here against brute-force
/// enumeration.
mod tests {
    extern crate env_logger;

    use super::*;
    use graph::Node;
    use variable::{all_assignments, Domain};

    use nalgebra::{DMatrix, DVector};
    use ndarray::prelude as nd;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn pairwise(table: [[f64; 2]; 2]) -> Vec<f64> {
        vec![table[0][0], table[0][1], table[1][0], table[1][1]]
    }

    fn attach(graph: &mut FactorGraph, name: &str, scope: Vec<Variable>, values: Vec<f64>) {
        let f = graph.add_factor(name).unwrap();
        for v in scope.iter() {
            graph.connect(*v, f).unwrap();
        }
        let shape: Vec<usize> = scope.iter().map(|v| v.cardinality()).collect();
        let table = nd::ArrayD::from_shape_vec(nd::IxDyn(&shape), values).unwrap();
        graph.set_potential(f, Potential::table(scope, table).unwrap()).unwrap();
    }

    /// The four-node example graph:
    ///
    /// ```text
    /// x1 - fa - x2 - fb - x3
    ///           |
    ///           fc
    ///           |
    ///           x4
    /// ```
    fn bishop_example() -> (FactorGraph, Vec<Variable>) {
        let mut graph = FactorGraph::new();
        let x1 = graph.add_variable("x1", Domain::Discrete(2)).unwrap();
        let x2 = graph.add_variable("x2", Domain::Discrete(2)).unwrap();
        let x3 = graph.add_variable("x3", Domain::Discrete(2)).unwrap();
        let x4 = graph.add_variable("x4", Domain::Discrete(2)).unwrap();

        let dist = [[0.3, 0.4], [0.3, 0.0]];
        attach(&mut graph, "fa", vec![x1, x2], pairwise(dist));
        attach(&mut graph, "fb", vec![x2, x3], pairwise(dist));
        attach(&mut graph, "fc", vec![x2, x4], pairwise(dist));

        (graph, vec![x1, x2, x3, x4])
    }

    /// Unnormalized marginals by enumeration of the full joint, honoring any
    /// observations.
    fn brute_force_marginals(graph: &FactorGraph) -> IndexMap<Variable, Vec<f64>> {
        let vars = graph.variables();
        let mut marginals: IndexMap<Variable, Vec<f64>> = vars.iter()
            .map(|v| (*v, vec![0.0; v.cardinality()]))
            .collect();

        for assn in all_assignments(&vars) {
            let mut joint = 1.0;
            for v in vars.iter() {
                if let Some(state) = graph.observed(*v) {
                    if *assn.get(v).unwrap() != state {
                        joint = 0.0;
                    }
                }
            }
            for f in graph.factors() {
                joint *= graph.potential(f).unwrap().value(&assn).unwrap();
            }

            for v in vars.iter() {
                marginals.get_mut(v).unwrap()[*assn.get(v).unwrap()] += joint;
            }
        }

        marginals
    }

    /// The maximum joint mass and its first-encountered maximizer, by enumeration.
    fn brute_force_maximum(graph: &FactorGraph) -> (f64, Assignment) {
        let vars = graph.variables();
        let mut best_mass = ::std::f64::NEG_INFINITY;
        let mut best = Assignment::new();

        for assn in all_assignments(&vars) {
            let mut joint = 1.0;
            for f in graph.factors() {
                joint *= graph.potential(f).unwrap().value(&assn).unwrap();
            }
            if joint > best_mass {
                best_mass = joint;
                best = assn;
            }
        }

        (best_mass, best)
    }

    fn assert_belief(graph: &FactorGraph, belief: &Potential, var: Variable, expected: &[f64]) {
        let total: f64 = expected.iter().sum();
        for (state, mass) in expected.iter().enumerate() {
            let mut assn = Assignment::new();
            assn.set(&var, state);
            let actual = belief.value(&assn).unwrap();
            assert!(
                (mass / total - actual).abs() < 1e-9,
                "belief of {} at state {}: expected {}, got {}",
                graph.variable_name(var).unwrap(), state, mass / total, actual
            );
        }
    }

    #[test]
    /// On an acyclic graph the tree-scheduled sum-product beliefs equal the true
    /// marginals for every variable node.
    fn tree_exactness() {
        init_logging();
        let (mut graph, vars) = bishop_example();

        let result = run(&mut graph, Algorithm::SumProduct, Schedule::Tree, Target::All).unwrap();
        assert_eq!(Convergence::Exact, result.status);
        assert!(result.configuration.is_none());

        let exact = brute_force_marginals(&graph);
        for v in vars.iter() {
            assert_belief(&graph, &result.beliefs[v], *v, &exact[v]);
        }

        // the closed-form values for the same graph, worked out by hand
        assert_belief(&graph, &result.beliefs[&vars[0]], vars[0], &[0.183, 0.147]);
        assert_belief(&graph, &result.beliefs[&vars[1]], vars[1], &[0.294, 0.036]);
        assert_belief(&graph, &result.beliefs[&vars[2]], vars[2], &[0.162, 0.168]);
        assert_belief(&graph, &result.beliefs[&vars[3]], vars[3], &[0.162, 0.168]);
    }

    #[test]
    /// The concrete chain x1 - fa - x2 - fb - x3: the tree-scheduled belief at x3
    /// equals the exact marginal of fa(x1,x2) * fb(x2,x3).
    fn chain_scenario() {
        let mut graph = FactorGraph::new();
        let x1 = graph.add_variable("x1", Domain::Discrete(2)).unwrap();
        let x2 = graph.add_variable("x2", Domain::Discrete(2)).unwrap();
        let x3 = graph.add_variable("x3", Domain::Discrete(2)).unwrap();

        let dist = [[0.3, 0.4], [0.3, 0.0]];
        attach(&mut graph, "fa", vec![x1, x2], pairwise(dist));
        attach(&mut graph, "fb", vec![x2, x3], pairwise(dist));

        let belief = sum_product(&mut graph, x3).unwrap();
        let exact = brute_force_marginals(&graph);
        assert_belief(&graph, &belief, x3, &exact[&x3]);

        // sum over x1, x2 of fa * fb, by hand: [0.30, 0.24]
        assert_belief(&graph, &belief, x3, &[0.30, 0.24]);
    }

    #[test]
    /// Max-product recovers the maximizing joint assignment on a tree.
    fn max_product_configuration() {
        let (mut graph, vars) = bishop_example();

        let (belief, configuration) = max_product(&mut graph, vars[0]).unwrap();

        // max-marginal of x1 is [0.048, 0.048]; normalized it is uniform
        assert_belief(&graph, &belief, vars[0], &[0.5, 0.5]);

        let (_, expected) = brute_force_maximum(&graph);
        for v in vars.iter() {
            assert_eq!(expected.get(v), configuration.get(v));
        }

        // the tie at x1 breaks to the first state; the rest is forced
        assert_eq!(Some(&0), configuration.get(&vars[0]));
        assert_eq!(Some(&0), configuration.get(&vars[1]));
        assert_eq!(Some(&1), configuration.get(&vars[2]));
        assert_eq!(Some(&1), configuration.get(&vars[3]));
    }

    #[test]
    /// On a tree the max-sum belief maximum equals the log of the true maximum
    /// joint mass.
    fn max_sum_optimality() {
        let (mut graph, vars) = bishop_example();

        let (belief, configuration) = max_sum(&mut graph, vars[2]).unwrap();

        let (mass, expected) = brute_force_maximum(&graph);
        let at_max = belief.value(&belief.argmax().unwrap()).unwrap();
        assert!((mass.ln() - at_max).abs() < 1e-9);

        for v in vars.iter() {
            assert_eq!(expected.get(v), configuration.get(v));
        }
    }

    #[test]
    /// Flooding on an acyclic graph converges to the tree-exact beliefs.
    fn flooding_matches_tree_on_acyclic_graph() {
        init_logging();
        let (mut graph, vars) = bishop_example();

        let result = loopy_belief_propagation(&mut graph, 50, 1e-9).unwrap();
        assert!(result.status.is_converged());

        let exact = brute_force_marginals(&graph);
        for v in vars.iter() {
            assert_belief(&graph, &result.beliefs[v], *v, &exact[v]);
        }
    }

    #[test]
    /// Once the tolerance is met, a larger iteration budget changes nothing: the
    /// schedule stops at the same iteration with the same beliefs.
    fn flooding_convergence_is_stable() {
        let (mut graph, vars) = bishop_example();

        let first = loopy_belief_propagation(&mut graph, 50, 1e-9).unwrap();
        let second = loopy_belief_propagation(&mut graph, 5000, 1e-9).unwrap();

        assert_eq!(first.status, second.status);
        for v in vars.iter() {
            assert!(first.beliefs[v].distance(&second.beliefs[v]).unwrap() < 1e-12);
        }
    }

    /// A single loop: x1 - fa - x2 - fb - x1.
    fn loopy_example() -> (FactorGraph, Variable, Variable) {
        let mut graph = FactorGraph::new();
        let x1 = graph.add_variable("x1", Domain::Discrete(2)).unwrap();
        let x2 = graph.add_variable("x2", Domain::Discrete(2)).unwrap();

        attach(&mut graph, "fa", vec![x1, x2], pairwise([[0.9, 0.1], [0.2, 0.8]]));
        attach(&mut graph, "fb", vec![x2, x1], pairwise([[0.7, 0.3], [0.4, 0.6]]));

        (graph, x1, x2)
    }

    #[test]
    /// Exhausting the budget on a cyclic graph is reported, not fatal: the
    /// best-effort beliefs are still returned and usable.
    fn flooding_budget_exhaustion() {
        init_logging();
        let (mut graph, x1, _) = loopy_example();

        let result = loopy_belief_propagation(&mut graph, 1, 1e-12).unwrap();
        match result.status {
            Convergence::NotConverged { iterations, residual } => {
                assert_eq!(1, iterations);
                assert!(residual > 1e-12);
            },
            other => panic!("expected NotConverged, got {:?}", other)
        }

        // the approximate belief is a proper distribution
        let b = &result.beliefs[&x1];
        let total = b.marginalize(&[]).unwrap().value(&Assignment::new()).unwrap();
        assert!((1.0 - total).abs() < 1e-9);

        // with a real budget the same loop settles
        let result = loopy_belief_propagation(&mut graph, 1000, 1e-9).unwrap();
        assert!(result.status.is_converged());
    }

    #[test]
    /// The tree schedule refuses cyclic graphs outright.
    fn tree_schedule_rejects_cycles() {
        let (mut graph, x1, _) = loopy_example();
        assert_eq!(Err(FreyError::CyclicGraph), sum_product(&mut graph, x1));
    }

    #[test]
    /// Observing a variable conditions every downstream belief.
    fn observation_conditions_beliefs() {
        let (mut graph, vars) = bishop_example();
        graph.observe(vars[0], 0).unwrap();

        let result = run(&mut graph, Algorithm::SumProduct, Schedule::Tree, Target::All).unwrap();

        // the observed node's belief collapses to the indicator
        let mut assn = Assignment::new();
        assn.set(&vars[0], 0);
        assert_eq!(1.0, result.beliefs[&vars[0]].value(&assn).unwrap());

        // and the rest match the conditional marginals
        let exact = brute_force_marginals(&graph);
        for v in vars.iter().skip(1) {
            assert_belief(&graph, &result.beliefs[v], *v, &exact[v]);
        }
    }

    #[test]
    /// Sum-product on a Gaussian chain: the belief is the analytic marginal of the
    /// product of the attached potentials.
    fn gaussian_chain() {
        let mut graph = FactorGraph::new();
        let x = graph.add_variable("x", Domain::Continuous(1)).unwrap();
        let y = graph.add_variable("y", Domain::Continuous(1)).unwrap();

        let prior = graph.add_factor("prior").unwrap();
        graph.connect(x, prior).unwrap();
        graph.set_potential(prior, Potential::gaussian(
            vec![x],
            DVector::from_row_slice(&[0.0]),
            DMatrix::from_row_slice(1, 1, &[1.0])
        ).unwrap()).unwrap();

        let coupling = graph.add_factor("coupling").unwrap();
        graph.connect(x, coupling).unwrap();
        graph.connect(y, coupling).unwrap();
        graph.set_potential(coupling, Potential::gaussian(
            vec![x, y],
            DVector::from_row_slice(&[0.0, 0.0]),
            DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 2.0])
        ).unwrap()).unwrap();

        let belief = sum_product(&mut graph, y).unwrap();

        // precision of the exact marginal of y: 2/3 - (1/3)^2 / (1 + 2/3) = 3/5
        assert!((0.0 - belief.mean().unwrap()[0]).abs() < 1e-9);
        assert!((5.0 / 3.0 - belief.covariance().unwrap()[(0, 0)]).abs() < 1e-9);

        // no discrete assignment exists for a Gaussian graph
        let result = run(&mut graph, Algorithm::MaxSum, Schedule::Tree, Target::Node(y)).unwrap();
        assert!(result.configuration.is_none());
    }

    #[test]
    /// Every factor node needs a potential before inference starts.
    fn missing_potential() {
        let mut graph = FactorGraph::new();
        let x = graph.add_variable("x", Domain::Discrete(2)).unwrap();
        let f = graph.add_factor("f").unwrap();
        graph.connect(x, f).unwrap();

        assert_eq!(Err(FreyError::MissingPotential), sum_product(&mut graph, x));
    }

    #[test]
    /// Inference spans disconnected components independently.
    fn disconnected_components() {
        let mut graph = FactorGraph::new();
        let x1 = graph.add_variable("x1", Domain::Discrete(2)).unwrap();
        let x2 = graph.add_variable("x2", Domain::Discrete(2)).unwrap();
        let y = graph.add_variable("y", Domain::Discrete(3)).unwrap();

        attach(&mut graph, "fa", vec![x1, x2], pairwise([[0.5, 0.1], [0.2, 0.2]]));
        attach(&mut graph, "fy", vec![y], vec![0.2, 0.5, 0.3]);

        let result = run(&mut graph, Algorithm::SumProduct, Schedule::Tree, Target::All).unwrap();

        let exact = brute_force_marginals(&graph);
        for v in [x1, x2, y].iter() {
            assert_belief(&graph, &result.beliefs[v], *v, &exact[v]);
        }

        // roots exist per component even when the target is elsewhere
        let belief = sum_product(&mut graph, y).unwrap();
        assert_belief(&graph, &belief, y, &[0.2, 0.5, 0.3]);

        let components = graph.components();
        assert_eq!(2, components.len());
        assert!(components.iter().any(|c| c.contains(&Node::Variable(y))));
    }

}
