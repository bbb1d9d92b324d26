//! The exact two-pass schedule for acyclic factor graphs, and the configuration
//! back-tracking pass of the max-product and max-sum algorithms.

use graph::{Direction, EdgeId, FactorGraph, Node};
use potential::Potential;
use util::{FreyError, Result};
use variable::{Assignment, Variable};
use super::{belief, factor_message, variable_message, Algorithm};

/// Run the two passes over every component: inward from the leaves to the root, then
/// outward from the root back to the leaves. Each message is computed exactly once,
/// from fully-available inputs; afterwards every edge carries both directions' final
/// messages.
///
/// The component containing `root` (if given) is rooted there, so the caller's query
/// node drives the traversal the way it would in a hand-rolled recursion; every
/// other component is rooted at its first-inserted node.
///
/// # Errors
/// * `FreyError::CyclicGraph` if any component contains a cycle
pub fn propagate(graph: &mut FactorGraph, algorithm: Algorithm, root: Option<Variable>) -> Result<()> {
    graph.clear_messages();

    for component in graph.components() {
        let at = match root {
            Some(v) if component.contains(&Node::Variable(v)) => Node::Variable(v),
            _ => component[0]
        };

        let edges = graph.spanning_edges(at)?;
        debug!("tree schedule: component of {} edges rooted at {:?}", edges.len(), at);

        // inward pass: child to parent, deepest edges first
        for &(_, child, e) in edges.iter().rev() {
            let msg = node_message(graph, algorithm, child, e)?;
            graph.set_message(e, direction_of(child), msg, 0);
        }

        // outward pass: parent to child
        for &(parent, _, e) in edges.iter() {
            let msg = node_message(graph, algorithm, parent, e)?;
            graph.set_message(e, direction_of(parent), msg, 1);
        }
    }

    Ok(())
}


fn node_message(graph: &FactorGraph, algorithm: Algorithm, node: Node, edge: EdgeId) -> Result<Potential> {
    match node {
        Node::Variable(v) => variable_message(graph, algorithm, v, edge),
        Node::Factor(f) => factor_message(graph, algorithm, f, edge)
    }
}


fn direction_of(node: Node) -> Direction {
    match node {
        Node::Variable(_) => Direction::FromVariable,
        Node::Factor(_) => Direction::FromFactor
    }
}


/// Back-track one maximizing joint assignment out of the cached messages.
///
/// Per component, the root variable is fixed at its belief argmax; walking the
/// spanning structure outward, each factor node fixes its not-yet-assigned
/// variables to the joint argmax of its prepared potential combined with the
/// children's inward messages, conditioned on the already-fixed neighbors. Observed
/// variables enter at their observed state. On an acyclic graph the result
/// maximizes the joint mass; on a cyclic one it is only locally consistent.
pub fn extract_configuration(graph: &FactorGraph, algorithm: Algorithm) -> Result<Assignment> {
    let mut assignment = Assignment::new();
    for v in graph.variables() {
        if let Some(state) = graph.observed(v) {
            assignment.set(&v, state);
        }
    }

    for component in graph.components() {
        let root = match component.iter().find(|n| match **n {
            Node::Variable(_) => true,
            _ => false
        }) {
            Some(&Node::Variable(v)) => v,
            // a component of bare factor nodes has nothing to assign
            _ => continue
        };

        if assignment.get(&root).is_none() {
            let b = belief(graph, algorithm, root)?;
            assignment.extend(&b.argmax()?);
        }

        for (_, child, via) in graph.spanning_tree(Node::Variable(root)) {
            let f = match child {
                Node::Factor(f) => f,
                // a variable child was fixed when its parent factor was handled
                Node::Variable(_) => continue
            };

            let potential = graph.potential(f).ok_or(FreyError::MissingPotential)?;
            let mut local = algorithm.prepare(potential);
            for &e in graph.factor_edges(f)?.iter() {
                if e == via {
                    continue;
                }
                if let Some(m) = graph.message(e, Direction::FromVariable) {
                    local = algorithm.combine(&local, &m.potential)?;
                }
            }

            let reduced = local.reduce(&assignment)?;
            if reduced.scope().is_empty() {
                continue;
            }
            assignment.extend(&reduced.argmax()?);
        }
    }

    Ok(assignment)
}
