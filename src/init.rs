//! Module containing initialization routines for the flooding schedule's start-up
//! messages.

use inference::Algorithm;
use potential::Potential;
use util::Result;
use variable::Variable;

use ndarray::prelude as nd;
use ndarray_rand::RandomExt;
use ndarray_rand::rand_distr::Uniform;

/// Defines how the flooding schedule initializes the iteration-0 message on every
/// edge, in both directions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MessageInit {

    /// The algorithm's neutral message: an all-ones table, a zero log-table, or the
    /// vacuous Gaussian
    Unity,

    /// A random normalized table. Continuous edges still start vacuous - a random
    /// canonical form is not a meaningful neutral starting point.
    Random

}

impl MessageInit {

    /// Construct the starting message for an edge carrying the given variable.
    pub fn build_message(&self, algorithm: Algorithm, variable: Variable) -> Result<Potential> {
        match *self {
            MessageInit::Unity => algorithm.unit(&[variable]),
            MessageInit::Random => {
                if variable.is_continuous() {
                    return algorithm.unit(&[variable]);
                }

                let values = nd::ArrayD::random_using(
                    nd::IxDyn(&[variable.cardinality()]),
                    Uniform::new(1.0, 100.0),
                    &mut ::rand::thread_rng()
                );

                let msg = Potential::table(vec![variable], values)?.normalize()?;
                Ok(if algorithm.is_log_domain() { msg.log() } else { msg })
            }
        }
    }

}
