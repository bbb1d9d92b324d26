//! Definition of the variable module
//!
//! A `Variable` represents a random variable of a factor graph.

use indexmap::IndexMap;
use itertools::Itertools;

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counter backing the process-unique variable identities.
static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

/// The domain of a random variable - the range of values over which it is defined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Domain {

    /// A discrete variable taking one of the given number of states, tagged `0..n`
    Discrete(usize),

    /// A continuous variable with the given number of real coordinates
    Continuous(usize)

}

/// A random variable.
///
/// `Variable`s are lightweight, copyable values: an identity plus a `Domain`. They are
/// cheap to pass around and hash, which makes them usable as map keys and as the scope
/// entries of a `Potential`. The domain is fixed at creation. Display names are not
/// part of the variable itself - the `FactorGraph` owns the name mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Variable {
    id: usize,
    domain: Domain
}

impl Variable {

    /// Construct a new `Variable` with the given domain
    pub fn new(domain: Domain) -> Variable {
        Variable {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            domain: domain
        }
    }

    /// Construct a new discrete `Variable` with two states
    pub fn binary() -> Variable {
        Variable::discrete(2)
    }

    /// Construct a new discrete `Variable` with the given number of states
    pub fn discrete(cardinality: usize) -> Variable {
        Variable::new(Domain::Discrete(cardinality))
    }

    /// Construct a new continuous `Variable` with the given dimensionality
    pub fn continuous(dimension: usize) -> Variable {
        Variable::new(Domain::Continuous(dimension))
    }

    /// Get the identity of the `Variable`
    pub fn id(&self) -> usize {
        self.id
    }

    /// Get the domain of the `Variable`
    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// The size of the `Variable`'s domain: the number of states of a discrete
    /// variable, or the number of coordinates of a continuous one.
    pub fn cardinality(&self) -> usize {
        match self.domain {
            Domain::Discrete(n) | Domain::Continuous(n) => n
        }
    }

    /// Check if this `Variable` is discrete
    pub fn is_discrete(&self) -> bool {
        match self.domain {
            Domain::Discrete(_) => true,
            _ => false
        }
    }

    /// Check if this `Variable` is continuous
    pub fn is_continuous(&self) -> bool {
        ! self.is_discrete()
    }

}

impl fmt::Display for Variable {

    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "x{}", self.id)
    }

}


/// A (possibly partial) assignment of states to discrete `Variable`s.
///
/// Insertion order is preserved, so iterating an `Assignment` is deterministic.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Assignment {
    states: IndexMap<Variable, usize>
}

impl Assignment {

    /// Construct a new, empty `Assignment`
    pub fn new() -> Assignment {
        Assignment { states: IndexMap::new() }
    }

    /// Set the state of the given `Variable`
    pub fn set(&mut self, var: &Variable, state: usize) {
        self.states.insert(*var, state);
    }

    /// Get the state of the given `Variable`, if assigned
    pub fn get(&self, var: &Variable) -> Option<&usize> {
        self.states.get(var)
    }

    /// Remove the given `Variable` from the assignment, returning its state
    pub fn unset(&mut self, var: &Variable) -> Option<usize> {
        self.states.shift_remove(var)
    }

    /// Copy every binding of `other` into this assignment
    pub fn extend(&mut self, other: &Assignment) {
        for (var, &state) in other.states.iter() {
            self.states.insert(*var, state);
        }
    }

    /// The `Variable`s bound by this assignment, in insertion order
    pub fn variables(&self) -> Vec<Variable> {
        self.states.keys().cloned().collect()
    }

    /// The number of bound `Variable`s
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Check if no `Variable` is bound
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

}


/// Iterate every complete `Assignment` to the given discrete scope, in row-major
/// order over the scope (the last variable varies fastest).
///
/// An empty scope has exactly one assignment - the empty one.
pub fn all_assignments(scope: &[Variable]) -> impl Iterator<Item = Assignment> {
    let vars: Vec<Variable> = scope.to_vec();
    let head = if vars.is_empty() {
        vec![Assignment::new()]
    } else {
        vec![]
    };

    let ranges: Vec<::std::ops::Range<usize>> = vars.iter().map(|v| 0..v.cardinality()).collect();
    head.into_iter().chain(
        ranges.into_iter().multi_cartesian_product().map(move |states| {
            let mut assn = Assignment::new();
            for (v, s) in vars.iter().zip(states) {
                assn.set(v, s);
            }
            assn
        })
    )
}


// Unit tests
#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn identity() {
        let a = Variable::binary();
        let b = Variable::binary();

        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert_eq!(2, a.cardinality());
        assert!(a.is_discrete());
    }

    #[test]
    fn domains() {
        let d = Variable::discrete(5);
        assert_eq!(Domain::Discrete(5), d.domain());
        assert_eq!(5, d.cardinality());

        let c = Variable::continuous(3);
        assert_eq!(Domain::Continuous(3), c.domain());
        assert_eq!(3, c.cardinality());
        assert!(c.is_continuous());
        assert!(! c.is_discrete());
    }

    #[test]
    fn assignment() {
        let a = Variable::binary();
        let b = Variable::discrete(3);

        let mut assn = Assignment::new();
        assert!(assn.is_empty());

        assn.set(&a, 1);
        assn.set(&b, 2);
        assert_eq!(2, assn.len());
        assert_eq!(Some(&1), assn.get(&a));
        assert_eq!(Some(&2), assn.get(&b));

        assert_eq!(Some(1), assn.unset(&a));
        assert_eq!(None, assn.get(&a));
        assert_eq!(1, assn.len());
    }

    #[test]
    fn assignment_extend() {
        let a = Variable::binary();
        let b = Variable::binary();

        let mut x = Assignment::new();
        x.set(&a, 0);

        let mut y = Assignment::new();
        y.set(&a, 1);
        y.set(&b, 1);

        x.extend(&y);
        assert_eq!(Some(&1), x.get(&a));
        assert_eq!(Some(&1), x.get(&b));
    }

    #[test]
    fn assignments_row_major() {
        let a = Variable::discrete(3);
        let b = Variable::binary();

        let assignments: Vec<Assignment> = all_assignments(&[a, b]).collect();
        assert_eq!(6, assignments.len());

        // the last variable varies fastest
        let expected = [(0, 0), (0, 1), (1, 0), (1, 1), (2, 0), (2, 1)];
        for (assn, &(x, y)) in assignments.iter().zip(expected.iter()) {
            assert_eq!(Some(&x), assn.get(&a));
            assert_eq!(Some(&y), assn.get(&b));
        }
    }

    #[test]
    fn assignments_empty_scope() {
        let assignments: Vec<Assignment> = all_assignments(&[]).collect();
        assert_eq!(1, assignments.len());
        assert!(assignments[0].is_empty());
    }

}
