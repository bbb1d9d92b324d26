//! Defines the `Error` type for the frey library

use std::error::Error;
use std::fmt;
use std::result;

pub type Result<T> = result::Result<T, FreyError>;

#[derive(Clone, Debug, PartialEq)]
pub enum FreyError {

    /// A variable shared between two operands (or declared for a potential) has a
    /// domain size inconsistent with the data shape it is matched against.
    DimensionMismatch,

    /// A requested variable is not part of the operand's scope, or not part of the
    /// graph.
    UnknownVariable,

    /// A factor node's potential is defined over a different variable set than the
    /// node's neighbors.
    VariableSetMismatch,

    /// The variable and factor node are already linked by an edge.
    AlreadyConnected,

    /// The wrong kind of node or potential was supplied - a node that does not belong
    /// to the graph, a continuous variable where a discrete one is required, or a
    /// table combined with a Gaussian.
    TypeMismatch,

    /// A potential with no usable mass - an all-zero table under normalization, or a
    /// singular Gaussian parameter block.
    DegeneratePotential,

    /// A node name was used twice within one node kind, or a variable appeared twice
    /// in one scope.
    DuplicateNode,

    /// Represents an incomplete assignment where a complete assignment was required.
    IncompleteAssignment,

    /// The tree schedule was invoked on a graph component that contains a cycle.
    CyclicGraph,

    /// Inference was started while some factor node has no potential attached.
    MissingPotential,

    /// A general error with the given description
    General(String)

}

impl Error for FreyError {}

impl fmt::Display for FreyError {

    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            &FreyError::DimensionMismatch => write!(f, "Domain sizes do not match the data shape"),
            &FreyError::UnknownVariable => write!(f, "Requested variable is not in scope"),
            &FreyError::VariableSetMismatch => write!(f, "Potential variables differ from the factor's neighbors"),
            &FreyError::AlreadyConnected => write!(f, "The variable and factor are already connected"),
            &FreyError::TypeMismatch => write!(f, "Wrong node or potential kind for this operation"),
            &FreyError::DegeneratePotential => write!(f, "Encountered a degenerate potential"),
            &FreyError::DuplicateNode => write!(f, "A node or scope variable was encountered twice"),
            &FreyError::IncompleteAssignment => write!(f, "Missing assignments to the required variables"),
            &FreyError::CyclicGraph => write!(f, "The tree schedule requires an acyclic graph"),
            &FreyError::MissingPotential => write!(f, "A factor node has no potential attached"),
            &FreyError::General(ref err) => write!(f, "{}", err)
        }
    }

}
