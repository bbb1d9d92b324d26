//! The synchronous flooding schedule for factor graphs with cycles.

use graph::{Direction, FactorGraph};
use init::MessageInit;
use util::{FreyError, Result};
use super::{factor_message, variable_message, Algorithm, Convergence};

/// Iterate every edge in both directions until the messages settle or the budget
/// runs out.
///
/// All messages of iteration `k` are computed from the stored iteration `k - 1`
/// messages only: the new values are staged and published together at the iteration
/// boundary, so no update of the current iteration observes a partial write. The
/// per-iteration residual is the largest message distance across all edges and
/// directions; once it drops to `tolerance` the schedule stops.
///
/// Exhausting `max_iterations` is not a failure: the last messages stay in the
/// store, usable as approximate beliefs, and the returned
/// [`Convergence::NotConverged`] status carries the outstanding residual.
pub fn propagate(
    graph: &mut FactorGraph,
    algorithm: Algorithm,
    max_iterations: usize,
    tolerance: f64,
    init: MessageInit
) -> Result<Convergence> {
    graph.clear_messages();

    // iteration 0: both directions of every edge start from the initializer
    for e in graph.edge_ids() {
        let variable = graph.edge_variable(e);
        let msg = init.build_message(algorithm, variable)?;
        graph.set_message(e, Direction::FromVariable, msg.clone(), 0);
        graph.set_message(e, Direction::FromFactor, msg, 0);
    }

    let mut residual = ::std::f64::INFINITY;
    for iteration in 1..=max_iterations {
        let mut staged = Vec::with_capacity(2 * graph.num_edges());
        for e in graph.edge_ids() {
            let variable = graph.edge_variable(e);
            let factor = graph.edge_factor(e);
            staged.push((e, Direction::FromVariable, variable_message(graph, algorithm, variable, e)?));
            staged.push((e, Direction::FromFactor, factor_message(graph, algorithm, factor, e)?));
        }

        residual = 0.0;
        for (e, direction, msg) in staged {
            let previous = graph.message(e, direction)
                                .map(|m| m.potential.clone())
                                .ok_or_else(|| FreyError::General(
                                    String::from("flooding read an uninitialized edge")
                                ))?;
            residual = residual.max(previous.distance(&msg)?);
            graph.set_message(e, direction, msg, iteration);
        }

        debug!("flooding iteration {}: residual {:e}", iteration, residual);

        if residual <= tolerance {
            info!("flooding converged after {} iterations", iteration);
            return Ok(Convergence::Converged { iterations: iteration });
        }
    }

    info!(
        "flooding exhausted {} iterations without convergence (residual {:e})",
        max_iterations, residual
    );
    Ok(Convergence::NotConverged { iterations: max_iterations, residual })
}
