//! Definition of the factor graph module
//!
//! A `FactorGraph` is the bipartite topology the inference engine runs on: variable
//! nodes, factor nodes, and the edges between them. The graph owns all nodes and
//! edges; nodes and edges are addressed by stable ids (`Variable`, `FactorId`,
//! `EdgeId`) rather than references, so there are no ownership cycles. Each edge
//! carries a two-slot message store, one slot per direction, which is the only part
//! of the graph the engine mutates once assembly is finished.

use potential::Potential;
use util::{FreyError, Result};
use variable::{Domain, Variable};

use bidir_map::BidirMap;
use indexmap::IndexMap;

use std::collections::{HashSet, VecDeque};

/// Identifies a factor node within its graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FactorId(usize);

impl FactorId {

    /// The position of the factor node in insertion order
    pub fn index(&self) -> usize {
        self.0
    }

}


/// Identifies an edge within its graph.
///
/// Edge ids are only minted by [`FactorGraph::connect`]; using an id with a graph
/// other than the one that created it is a caller error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EdgeId(usize);


/// A node of either kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Node {
    Variable(Variable),
    Factor(FactorId)
}


/// The direction of a message along an edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// variable node -> factor node
    FromVariable,

    /// factor node -> variable node
    FromFactor
}

impl Direction {

    fn slot(&self) -> usize {
        match *self {
            Direction::FromVariable => 0,
            Direction::FromFactor => 1
        }
    }

}


/// A message cached on one direction of an edge: the last-computed `Potential`
/// together with the iteration number at which it was computed.
#[derive(Clone, Debug)]
pub struct Message {
    pub potential: Potential,
    pub iteration: usize
}


struct VariableEntry {
    edges: Vec<EdgeId>,
    observed: Option<usize>
}


struct FactorEntry {
    name: String,
    potential: Option<Potential>,
    edges: Vec<EdgeId>
}


struct Edge {
    variable: Variable,
    factor: FactorId,
    messages: [Option<Message>; 2]
}


/// A bipartite factor graph.
///
/// Assembly is mutating (`add_variable`, `add_factor`, `connect`, `set_potential`,
/// `observe`); once inference begins the structure is read-only and only the per-edge
/// message slots change. Bipartiteness holds by construction: an edge can only ever
/// join a variable node to a factor node.
pub struct FactorGraph {
    variables: IndexMap<Variable, VariableEntry>,
    names: BidirMap<Variable, String>,
    factors: Vec<FactorEntry>,
    edges: Vec<Edge>
}

impl FactorGraph {

    /// Construct a new, empty `FactorGraph`
    pub fn new() -> FactorGraph {
        FactorGraph {
            variables: IndexMap::new(),
            names: BidirMap::new(),
            factors: Vec::new(),
            edges: Vec::new()
        }
    }


    /// Add a variable node with the given name and domain.
    ///
    /// # Errors
    /// * `FreyError::DuplicateNode` if a variable node of that name already exists
    pub fn add_variable(&mut self, name: &str, domain: Domain) -> Result<Variable> {
        if self.names.contains_second_key(&String::from(name)) {
            return Err(FreyError::DuplicateNode);
        }

        let var = Variable::new(domain);
        self.names.insert(var, String::from(name));
        self.variables.insert(var, VariableEntry { edges: Vec::new(), observed: None });

        Ok(var)
    }


    /// Add a factor node with the given name. The node's potential is attached
    /// separately with [`FactorGraph::set_potential`] once its edges exist.
    ///
    /// # Errors
    /// * `FreyError::DuplicateNode` if a factor node of that name already exists
    pub fn add_factor(&mut self, name: &str) -> Result<FactorId> {
        if self.factors.iter().any(|f| f.name == name) {
            return Err(FreyError::DuplicateNode);
        }

        self.factors.push(FactorEntry {
            name: String::from(name),
            potential: None,
            edges: Vec::new()
        });

        Ok(FactorId(self.factors.len() - 1))
    }


    /// Create an edge between a variable node and a factor node.
    ///
    /// # Errors
    /// * `FreyError::TypeMismatch` if either node does not belong to this graph
    /// * `FreyError::AlreadyConnected` if the pair is already linked
    pub fn connect(&mut self, variable: Variable, factor: FactorId) -> Result<EdgeId> {
        if ! self.variables.contains_key(&variable) || factor.0 >= self.factors.len() {
            return Err(FreyError::TypeMismatch);
        }

        if self.edge_between(variable, factor).is_some() {
            return Err(FreyError::AlreadyConnected);
        }

        let id = EdgeId(self.edges.len());
        self.edges.push(Edge { variable, factor, messages: [None, None] });

        // membership was checked above
        self.variables.get_mut(&variable).unwrap().edges.push(id);
        self.factors[factor.0].edges.push(id);

        Ok(id)
    }


    /// Attach a potential to a factor node. The potential must be defined over
    /// exactly the node's neighbor variables (in any order).
    ///
    /// # Errors
    /// * `FreyError::TypeMismatch` if the factor does not belong to this graph
    /// * `FreyError::VariableSetMismatch` if the potential's variable set differs
    ///   from the node's neighbor set
    pub fn set_potential(&mut self, factor: FactorId, potential: Potential) -> Result<()> {
        if factor.0 >= self.factors.len() {
            return Err(FreyError::TypeMismatch);
        }

        {
            let scope = potential.scope();
            let neighbors = &self.factors[factor.0].edges;
            if scope.len() != neighbors.len()
                || ! neighbors.iter().all(|&e| scope.contains(&self.edges[e.0].variable)) {
                return Err(FreyError::VariableSetMismatch);
            }
        }

        self.factors[factor.0].potential = Some(potential);
        Ok(())
    }


    /// Fix a discrete variable node to an observed state. Observed variables emit
    /// indicator messages during inference and their beliefs collapse to the
    /// observation.
    ///
    /// # Errors
    /// * `FreyError::UnknownVariable` if the variable is not in this graph
    /// * `FreyError::TypeMismatch` if the variable is continuous
    /// * `FreyError::DimensionMismatch` if the state is outside the domain
    pub fn observe(&mut self, variable: Variable, state: usize) -> Result<()> {
        if ! self.variables.contains_key(&variable) {
            return Err(FreyError::UnknownVariable);
        }

        if ! variable.is_discrete() {
            return Err(FreyError::TypeMismatch);
        }

        if state >= variable.cardinality() {
            return Err(FreyError::DimensionMismatch);
        }

        self.variables.get_mut(&variable).unwrap().observed = Some(state);
        Ok(())
    }


    /// Remove the observation of a variable node, if any.
    ///
    /// # Errors
    /// * `FreyError::UnknownVariable` if the variable is not in this graph
    pub fn clear_observation(&mut self, variable: Variable) -> Result<()> {
        match self.variables.get_mut(&variable) {
            Some(entry) => {
                entry.observed = None;
                Ok(())
            },
            None => Err(FreyError::UnknownVariable)
        }
    }


    /// The observed state of a variable node, if one was set
    pub fn observed(&self, variable: Variable) -> Option<usize> {
        self.variables.get(&variable).and_then(|e| e.observed)
    }


    /// All variable nodes, in insertion order
    pub fn variables(&self) -> Vec<Variable> {
        self.variables.keys().cloned().collect()
    }


    /// All factor nodes, in insertion order
    pub fn factors(&self) -> Vec<FactorId> {
        (0..self.factors.len()).map(FactorId).collect()
    }


    /// The number of variable nodes
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }


    /// The number of factor nodes
    pub fn num_factors(&self) -> usize {
        self.factors.len()
    }


    /// The number of edges
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }


    /// The name of a variable node
    pub fn variable_name(&self, variable: Variable) -> Option<&String> {
        self.names.get_by_first(&variable)
    }


    /// Look up a variable node by name
    pub fn variable_by_name(&self, name: &str) -> Option<Variable> {
        self.names.get_by_second(&String::from(name)).cloned()
    }


    /// The name of a factor node
    pub fn factor_name(&self, factor: FactorId) -> Option<&str> {
        self.factors.get(factor.0).map(|f| f.name.as_str())
    }


    /// Look up a factor node by name
    pub fn factor_by_name(&self, name: &str) -> Option<FactorId> {
        self.factors.iter().position(|f| f.name == name).map(FactorId)
    }


    /// The potential attached to a factor node, if one was set
    pub fn potential(&self, factor: FactorId) -> Option<&Potential> {
        self.factors.get(factor.0).and_then(|f| f.potential.as_ref())
    }


    /// The edges incident to a variable node, in creation order.
    ///
    /// # Errors
    /// * `FreyError::UnknownVariable` if the variable is not in this graph
    pub fn variable_edges(&self, variable: Variable) -> Result<&[EdgeId]> {
        self.variables
            .get(&variable)
            .map(|e| e.edges.as_slice())
            .ok_or(FreyError::UnknownVariable)
    }


    /// The edges incident to a factor node, in creation order.
    ///
    /// # Errors
    /// * `FreyError::TypeMismatch` if the factor does not belong to this graph
    pub fn factor_edges(&self, factor: FactorId) -> Result<&[EdgeId]> {
        self.factors
            .get(factor.0)
            .map(|f| f.edges.as_slice())
            .ok_or(FreyError::TypeMismatch)
    }


    /// The variable endpoint of an edge
    pub fn edge_variable(&self, edge: EdgeId) -> Variable {
        self.edges[edge.0].variable
    }


    /// The factor endpoint of an edge
    pub fn edge_factor(&self, edge: EdgeId) -> FactorId {
        self.edges[edge.0].factor
    }


    /// The edge between a variable and a factor node, if the pair is connected
    pub fn edge_between(&self, variable: Variable, factor: FactorId) -> Option<EdgeId> {
        self.edges
            .iter()
            .position(|e| e.variable == variable && e.factor == factor)
            .map(EdgeId)
    }


    /// All edge ids, in creation order
    pub fn edge_ids(&self) -> Vec<EdgeId> {
        (0..self.edges.len()).map(EdgeId).collect()
    }


    /// The neighbors of a node, in edge-creation order. A node that does not belong
    /// to this graph has no neighbors.
    pub fn neighbors(&self, node: Node) -> Vec<Node> {
        match node {
            Node::Variable(v) => self.variables
                                     .get(&v)
                                     .map(|entry| entry.edges
                                                       .iter()
                                                       .map(|&e| Node::Factor(self.edges[e.0].factor))
                                                       .collect())
                                     .unwrap_or_default(),
            Node::Factor(f) => self.factors
                                   .get(f.0)
                                   .map(|entry| entry.edges
                                                     .iter()
                                                     .map(|&e| Node::Variable(self.edges[e.0].variable))
                                                     .collect())
                                   .unwrap_or_default()
        }
    }


    /// Read the cached message on one direction of an edge. `None` is the defined
    /// starting condition before any schedule has run.
    pub fn message(&self, edge: EdgeId, direction: Direction) -> Option<&Message> {
        self.edges[edge.0].messages[direction.slot()].as_ref()
    }


    /// Store a message on one direction of an edge, replacing the previous value
    pub fn set_message(&mut self, edge: EdgeId, direction: Direction, potential: Potential, iteration: usize) {
        self.edges[edge.0].messages[direction.slot()] = Some(Message { potential, iteration });
    }


    /// Drop every cached message, returning the graph to its pre-inference state
    pub fn clear_messages(&mut self) {
        for e in self.edges.iter_mut() {
            e.messages = [None, None];
        }
    }


    /// The connected components of the graph. Each component lists its nodes in
    /// breadth-first discovery order from the component's first-inserted node;
    /// variable nodes are enumerated before factor nodes, so a component that
    /// contains any variable node starts with one.
    pub fn components(&self) -> Vec<Vec<Node>> {
        let mut seen = HashSet::new();
        let mut components = Vec::new();

        let all: Vec<Node> = self.variables()
                                 .into_iter()
                                 .map(Node::Variable)
                                 .chain(self.factors().into_iter().map(Node::Factor))
                                 .collect();

        for start in all {
            if seen.contains(&start) {
                continue;
            }

            let mut component = Vec::new();
            let mut queue = VecDeque::new();
            queue.push_back(start);
            seen.insert(start);

            while let Some(node) = queue.pop_front() {
                component.push(node);
                for neighbor in self.neighbors(node) {
                    if seen.insert(neighbor) {
                        queue.push_back(neighbor);
                    }
                }
            }

            components.push(component);
        }

        components
    }


    /// The spanning structure of `root`'s component: the depth-first preorder of its
    /// edges as `(parent, child, edge)` triples. Every parent appears before any of
    /// its children, which is the ordering contract the two-pass tree schedule and
    /// the configuration back-tracking rely on.
    ///
    /// # Errors
    /// * `FreyError::CyclicGraph` if the component contains a cycle
    pub fn spanning_edges(&self, root: Node) -> Result<Vec<(Node, Node, EdgeId)>> {
        let (order, cyclic) = self.dfs(root);
        if cyclic {
            Err(FreyError::CyclicGraph)
        } else {
            Ok(order)
        }
    }


    /// As [`FactorGraph::spanning_edges`], but on a cyclic component the non-tree
    /// edges are silently skipped and a spanning tree is still produced. Used for
    /// configuration extraction on loopy graphs, where the result is only locally
    /// consistent.
    pub fn spanning_tree(&self, root: Node) -> Vec<(Node, Node, EdgeId)> {
        self.dfs(root).0
    }


    fn dfs(&self, root: Node) -> (Vec<(Node, Node, EdgeId)>, bool) {
        let mut order = Vec::new();
        let mut cyclic = false;

        let mut visited = HashSet::new();
        visited.insert(root);

        let mut stack: Vec<(Node, Option<EdgeId>)> = vec![(root, None)];
        while let Some((node, via)) = stack.pop() {
            let incident: Vec<EdgeId> = match node {
                Node::Variable(v) => self.variable_edges(v).map(|e| e.to_vec()).unwrap_or_default(),
                Node::Factor(f) => self.factor_edges(f).map(|e| e.to_vec()).unwrap_or_default()
            };

            // reversed so the first-listed neighbor is explored first
            for &e in incident.iter().rev() {
                if Some(e) == via {
                    continue;
                }

                let other = match node {
                    Node::Variable(_) => Node::Factor(self.edges[e.0].factor),
                    Node::Factor(_) => Node::Variable(self.edges[e.0].variable)
                };

                if ! visited.insert(other) {
                    // reaching a visited node over a second edge proves a cycle
                    cyclic = true;
                    continue;
                }

                order.push((node, other, e));
                stack.push((other, Some(e)));
            }
        }

        (order, cyclic)
    }

}


// Unit tests
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::prelude as nd;

    fn chain() -> (FactorGraph, Variable, Variable, FactorId) {
        let mut g = FactorGraph::new();
        let x1 = g.add_variable("x1", Domain::Discrete(2)).unwrap();
        let x2 = g.add_variable("x2", Domain::Discrete(2)).unwrap();
        let fa = g.add_factor("fa").unwrap();
        g.connect(x1, fa).unwrap();
        g.connect(x2, fa).unwrap();
        (g, x1, x2, fa)
    }

    #[test]
    fn assembly() {
        let (g, x1, x2, fa) = chain();

        assert_eq!(2, g.num_variables());
        assert_eq!(1, g.num_factors());
        assert_eq!(2, g.num_edges());

        assert_eq!(Some(x1), g.variable_by_name("x1"));
        assert_eq!(Some(&String::from("x2")), g.variable_name(x2));
        assert_eq!(Some(fa), g.factor_by_name("fa"));
        assert_eq!(Some("fa"), g.factor_name(fa));

        assert_eq!(vec![Node::Factor(fa)], g.neighbors(Node::Variable(x1)));
        assert_eq!(
            vec![Node::Variable(x1), Node::Variable(x2)],
            g.neighbors(Node::Factor(fa))
        );
        assert!(g.edge_between(x1, fa).is_some());
    }

    #[test]
    fn assembly_errs() {
        let (mut g, x1, _, fa) = chain();

        // repeated pair
        assert_eq!(Err(FreyError::AlreadyConnected), g.connect(x1, fa));

        // duplicated names, per node kind
        assert_eq!(
            Err(FreyError::DuplicateNode),
            g.add_variable("x1", Domain::Discrete(2))
        );
        assert_eq!(Err(FreyError::DuplicateNode), g.add_factor("fa"));

        // nodes that belong to a different graph
        let mut other = FactorGraph::new();
        let foreign = other.add_variable("y", Domain::Discrete(2)).unwrap();
        other.add_factor("g").unwrap();
        let foreign_f = other.add_factor("h").unwrap();
        assert_eq!(Err(FreyError::TypeMismatch), g.connect(foreign, fa));
        assert_eq!(Err(FreyError::TypeMismatch), g.connect(x1, foreign_f));
    }

    #[test]
    fn set_potential() {
        let (mut g, x1, x2, fa) = chain();

        // scope must equal the neighbor set, order-insensitively
        let p = Potential::table(
            vec![x2, x1],
            nd::ArrayD::ones(nd::IxDyn(&[2, 2]))
        ).unwrap();
        assert!(g.set_potential(fa, p).is_ok());
        assert!(g.potential(fa).is_some());

        let narrow = Potential::table(vec![x1], nd::ArrayD::ones(nd::IxDyn(&[2]))).unwrap();
        assert_eq!(Err(FreyError::VariableSetMismatch), g.set_potential(fa, narrow));
    }

    #[test]
    fn observation() {
        let (mut g, x1, _, _) = chain();

        assert_eq!(None, g.observed(x1));
        g.observe(x1, 1).unwrap();
        assert_eq!(Some(1), g.observed(x1));
        g.clear_observation(x1).unwrap();
        assert_eq!(None, g.observed(x1));

        assert_eq!(Err(FreyError::DimensionMismatch), g.observe(x1, 2));

        let stranger = Variable::binary();
        assert_eq!(Err(FreyError::UnknownVariable), g.observe(stranger, 0));
    }

    #[test]
    fn message_store() {
        let (mut g, x1, _, fa) = chain();
        let e = g.edge_between(x1, fa).unwrap();

        // absence is the defined starting condition
        assert!(g.message(e, Direction::FromVariable).is_none());
        assert!(g.message(e, Direction::FromFactor).is_none());

        let p = Potential::unity(&[x1]).unwrap();
        g.set_message(e, Direction::FromVariable, p.clone(), 3);

        let m = g.message(e, Direction::FromVariable).unwrap();
        assert_eq!(3, m.iteration);
        assert_eq!(p, m.potential);
        assert!(g.message(e, Direction::FromFactor).is_none());

        g.clear_messages();
        assert!(g.message(e, Direction::FromVariable).is_none());
    }

    #[test]
    fn spanning_edges_ordering() {
        // x1 - fa - x2 - fb - x3
        let mut g = FactorGraph::new();
        let x1 = g.add_variable("x1", Domain::Discrete(2)).unwrap();
        let x2 = g.add_variable("x2", Domain::Discrete(2)).unwrap();
        let x3 = g.add_variable("x3", Domain::Discrete(2)).unwrap();
        let fa = g.add_factor("fa").unwrap();
        let fb = g.add_factor("fb").unwrap();
        g.connect(x1, fa).unwrap();
        g.connect(x2, fa).unwrap();
        g.connect(x2, fb).unwrap();
        g.connect(x3, fb).unwrap();

        let edges = g.spanning_edges(Node::Variable(x1)).unwrap();
        assert_eq!(4, edges.len());

        // every parent is discovered before its children
        let mut seen = vec![Node::Variable(x1)];
        for &(parent, child, _) in edges.iter() {
            assert!(seen.contains(&parent));
            assert!(! seen.contains(&child));
            seen.push(child);
        }
        assert_eq!(5, seen.len());
    }

    #[test]
    fn spanning_edges_cycle() {
        // x1 - fa - x2 - fb - x1 is a loop
        let mut g = FactorGraph::new();
        let x1 = g.add_variable("x1", Domain::Discrete(2)).unwrap();
        let x2 = g.add_variable("x2", Domain::Discrete(2)).unwrap();
        let fa = g.add_factor("fa").unwrap();
        let fb = g.add_factor("fb").unwrap();
        g.connect(x1, fa).unwrap();
        g.connect(x2, fa).unwrap();
        g.connect(x2, fb).unwrap();
        g.connect(x1, fb).unwrap();

        assert_eq!(
            Err(FreyError::CyclicGraph),
            g.spanning_edges(Node::Variable(x1))
        );

        // the lossy variant still produces a spanning tree
        let tree = g.spanning_tree(Node::Variable(x1));
        assert_eq!(3, tree.len());
    }

    #[test]
    fn components() {
        let mut g = FactorGraph::new();
        let x1 = g.add_variable("x1", Domain::Discrete(2)).unwrap();
        let x2 = g.add_variable("x2", Domain::Discrete(2)).unwrap();
        let fa = g.add_factor("fa").unwrap();
        g.connect(x1, fa).unwrap();

        let components = g.components();
        assert_eq!(2, components.len());
        assert_eq!(vec![Node::Variable(x1), Node::Factor(fa)], components[0]);
        assert_eq!(vec![Node::Variable(x2)], components[1]);
    }

}
