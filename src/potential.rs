//! Definition of the potential module
//!
//! A `Potential` is the algebraic value carried by every factor and every message: an
//! unnormalized function from assignments of a set of `Variable`s to a real number.
//! Two representations are supported - dense tables over discrete variables, and
//! Gaussians in canonical (information) form over continuous variables - behind one
//! closed set of operations (combine, marginalize, normalize, argmax, log/exp).

use util::{FreyError, Result};
use variable::{all_assignments, Assignment, Variable};

use nalgebra::{DMatrix, DVector};
use ndarray::prelude as nd;

use std::f64::consts::PI;

/// Alias f64 ndarray::Array as Table
pub type Table = nd::ArrayD<f64>;


#[derive(Clone, Debug, PartialEq)]
pub enum Potential {
    /// The empty, identity `Potential` with no scope. It is the unit of combination in
    /// both the probability and the log domain.
    Identity,

    /// A dense table over an ordered list of discrete `Variable`s. The scope order is
    /// the axis order of the table; values are laid out row-major over the scope.
    Table {
        /// The scope of the `Potential`
        scope: Vec<Variable>,

        /// The values of the `Potential`, one entry per assignment to the scope
        values: Table
    },

    /// A Gaussian over an ordered list of continuous `Variable`s, held in canonical
    /// form: precision (information) matrix `W`, shift vector `h = W * mean`, and a
    /// scalar constant term. The constant does not change the shape of the density;
    /// it carries the accumulated log-mass needed for max-sum value bookkeeping.
    Gaussian {
        /// The scope of the `Potential`
        scope: Vec<Variable>,

        /// The information matrix
        precision: DMatrix<f64>,

        /// The information vector
        shift: DVector<f64>,

        /// Accumulated log-constant term
        constant: f64
    }
}


/// Which reduction eliminates a variable.
#[derive(Clone, Copy, PartialEq)]
enum Elimination {
    Sum,
    Max
}


impl Potential {

    /// Get the identity potential
    pub fn identity() -> Self {
        Potential::Identity
    }


    /// Create a new table `Potential` over the given discrete scope.
    ///
    /// The table is indexed row-major over the scope order: `values.shape()` must
    /// equal the scope's cardinalities exactly.
    ///
    /// # Errors
    /// * `FreyError::DuplicateNode` if a variable appears twice in the scope
    /// * `FreyError::TypeMismatch` if the scope contains a continuous variable
    /// * `FreyError::DimensionMismatch` if the table shape does not match the scope
    pub fn table(scope: Vec<Variable>, values: Table) -> Result<Self> {
        for (i, v) in scope.iter().enumerate() {
            if scope[i + 1..].contains(v) {
                return Err(FreyError::DuplicateNode);
            }

            if ! v.is_discrete() {
                return Err(FreyError::TypeMismatch);
            }
        }

        if scope.len() != values.ndim() {
            return Err(FreyError::DimensionMismatch);
        }

        for (v, n) in scope.iter().zip(values.shape().iter()) {
            if v.cardinality() != *n {
                return Err(FreyError::DimensionMismatch);
            }
        }

        Ok(Potential::Table { scope, values })
    }


    /// Create the unit `Potential` over the given scope: an all-ones table for a
    /// discrete scope, or the vacuous (zero-information) Gaussian for a continuous
    /// one. An empty scope yields the identity.
    ///
    /// # Errors
    /// * `FreyError::TypeMismatch` if the scope mixes discrete and continuous variables
    pub fn unity(scope: &[Variable]) -> Result<Self> {
        if scope.is_empty() {
            return Ok(Potential::Identity);
        }

        if scope.iter().all(|v| v.is_discrete()) {
            let shape: Vec<usize> = scope.iter().map(|v| v.cardinality()).collect();
            Ok(Potential::Table {
                scope: scope.to_vec(),
                values: nd::ArrayD::ones(nd::IxDyn(&shape))
            })
        } else if scope.iter().all(|v| v.is_continuous()) {
            let n = gaussian_len(scope);
            Ok(Potential::Gaussian {
                scope: scope.to_vec(),
                precision: DMatrix::zeros(n, n),
                shift: DVector::zeros(n),
                constant: 0.0
            })
        } else {
            Err(FreyError::TypeMismatch)
        }
    }


    /// Create the indicator `Potential` of a single observed state: a table over
    /// `[var]` that is 1 at `state` and 0 elsewhere.
    ///
    /// # Errors
    /// * `FreyError::TypeMismatch` if `var` is continuous
    /// * `FreyError::DimensionMismatch` if `state` is outside the domain
    pub fn indicator(var: Variable, state: usize) -> Result<Self> {
        if ! var.is_discrete() {
            return Err(FreyError::TypeMismatch);
        }

        if state >= var.cardinality() {
            return Err(FreyError::DimensionMismatch);
        }

        let mut values = nd::ArrayD::zeros(nd::IxDyn(&[var.cardinality()]));
        values[nd::IxDyn(&[state])] = 1.0;

        Ok(Potential::Table { scope: vec![var], values })
    }


    /// Create a Gaussian `Potential` from moment form (mean and covariance). The
    /// covariance is inverted into the canonical form at construction.
    ///
    /// # Errors
    /// * `FreyError::DuplicateNode` if a variable appears twice in the scope
    /// * `FreyError::TypeMismatch` if the scope contains a discrete variable
    /// * `FreyError::DimensionMismatch` if the parameter sizes do not match the scope
    /// * `FreyError::DegeneratePotential` if the covariance is singular
    pub fn gaussian(scope: Vec<Variable>, mean: DVector<f64>, cov: DMatrix<f64>) -> Result<Self> {
        check_gaussian_scope(&scope, cov.nrows(), cov.ncols(), mean.len())?;

        let precision = cov.try_inverse().ok_or(FreyError::DegeneratePotential)?;
        let shift = &precision * &mean;

        Ok(Potential::Gaussian { scope, precision, shift, constant: 0.0 })
    }


    /// Create a Gaussian `Potential` directly from canonical form.
    ///
    /// # Errors
    /// as [`Potential::gaussian`], except that a singular precision is permitted
    /// (the vacuous, zero-information potential is a legal message value)
    pub fn canonical(scope: Vec<Variable>, precision: DMatrix<f64>, shift: DVector<f64>) -> Result<Self> {
        check_gaussian_scope(&scope, precision.nrows(), precision.ncols(), shift.len())?;

        Ok(Potential::Gaussian { scope, precision, shift, constant: 0.0 })
    }


    /// Check if the `Potential` is the identity
    pub fn is_identity(&self) -> bool {
        match self {
            &Potential::Identity => true,
            _ => false
        }
    }


    /// Retrieve the scope of the `Potential`.
    pub fn scope(&self) -> &[Variable] {
        match self {
            &Potential::Identity => &[],
            &Potential::Table { ref scope, .. } => scope,
            &Potential::Gaussian { ref scope, .. } => scope
        }
    }


    /// Retrieve the value of a table `Potential` under a complete assignment to its
    /// scope. The assignment may bind a superset of the scope.
    ///
    /// # Errors
    /// * `FreyError::TypeMismatch` for Gaussian potentials (use [`Potential::mode`])
    /// * `FreyError::IncompleteAssignment` if a scope variable is unbound
    /// * `FreyError::DimensionMismatch` if a bound state is outside its domain
    pub fn value(&self, assignment: &Assignment) -> Result<f64> {
        match self {
            &Potential::Identity => {
                Err(FreyError::General(String::from("The identity potential has no value")))
            },
            &Potential::Gaussian { .. } => Err(FreyError::TypeMismatch),
            &Potential::Table { ref scope, ref values } => {
                let mut idx = Vec::with_capacity(scope.len());
                for v in scope.iter() {
                    match assignment.get(v) {
                        Some(&s) if s < v.cardinality() => idx.push(s),
                        Some(_) => return Err(FreyError::DimensionMismatch),
                        None => return Err(FreyError::IncompleteAssignment)
                    }
                }

                Ok(values[nd::IxDyn(&idx)])
            }
        }
    }


    /// Pointwise product of this `Potential` and another - the probability-domain
    /// combine operation.
    ///
    /// The result is defined over the union of the two scopes (this potential's
    /// variables first); a variable present in only one operand is broadcast across.
    /// Gaussian operands are embedded into the union coordinate space and their
    /// canonical parameters added, which is the same operation in either domain.
    ///
    /// # Errors
    /// * `FreyError::TypeMismatch` if one operand is a table and the other a Gaussian
    pub fn product(&self, other: &Self) -> Result<Self> {
        self.combine(other, false)
    }


    /// Pointwise sum of this `Potential` and another - the log-domain combine
    /// operation. Identical to [`Potential::product`] for Gaussians, which are
    /// log-domain internally.
    pub fn sum(&self, other: &Self) -> Result<Self> {
        self.combine(other, true)
    }


    fn combine(&self, other: &Self, log_domain: bool) -> Result<Self> {
        // the identity is the unit of both combine operations
        if let &Potential::Identity = self {
            return Ok(other.clone());
        } else if let &Potential::Identity = other {
            return Ok(self.clone());
        }

        match (self, other) {
            (&Potential::Table { scope: ref a, .. }, &Potential::Table { scope: ref b, .. }) => {
                let scope = union_scope(a, b);
                let shape: Vec<usize> = scope.iter().map(|v| v.cardinality()).collect();
                let mut values = nd::ArrayD::zeros(nd::IxDyn(&shape));

                for assn in all_assignments(&scope) {
                    // Unwrapping the index lookups is safe: the assignment binds the
                    // whole union scope by construction
                    let x = self.value(&assn)?;
                    let y = other.value(&assn)?;

                    let idx: Vec<usize> = scope.iter().map(|v| *assn.get(v).unwrap()).collect();
                    values[nd::IxDyn(&idx)] = if log_domain { x + y } else { x * y };
                }

                Ok(Potential::Table { scope, values })
            },

            (&Potential::Gaussian { scope: ref a, precision: ref pa, shift: ref ha, constant: ca },
             &Potential::Gaussian { scope: ref b, precision: ref pb, shift: ref hb, constant: cb }) => {
                let scope = union_scope(a, b);
                let n = gaussian_len(&scope);

                let mut precision = DMatrix::zeros(n, n);
                let mut shift = DVector::zeros(n);

                {
                    let mut add = |sub: &[Variable], p: &DMatrix<f64>, h: &DVector<f64>| {
                        let map = embedding(&scope, sub);
                        for i in 0..map.len() {
                            shift[map[i]] += h[i];
                            for j in 0..map.len() {
                                precision[(map[i], map[j])] += p[(i, j)];
                            }
                        }
                    };
                    add(a, pa, ha);
                    add(b, pb, hb);
                }

                Ok(Potential::Gaussian { scope, precision, shift, constant: ca + cb })
            },

            _ => Err(FreyError::TypeMismatch)
        }
    }


    /// Marginalize the `Potential` down to `keep`, eliminating every other scope
    /// variable by summation.
    ///
    /// For a Gaussian this is the Schur-complement projection onto the retained
    /// coordinates; the log-normalizer of the integrated-out block is folded into the
    /// constant term.
    ///
    /// # Errors
    /// * `FreyError::UnknownVariable` if a variable in `keep` is not in the scope
    /// * `FreyError::DegeneratePotential` if the eliminated Gaussian block is singular
    pub fn marginalize(&self, keep: &[Variable]) -> Result<Self> {
        self.eliminate(keep, Elimination::Sum)
    }


    /// Marginalize the `Potential` down to `keep`, eliminating every other scope
    /// variable by maximization. Works in either domain: maximization commutes with
    /// the elementwise logarithm.
    ///
    /// For a Gaussian the projection coincides with [`Potential::marginalize`] up to
    /// the constant term, which here picks up only the quadratic-completion value at
    /// the conditional optimum.
    ///
    /// # Errors
    /// as [`Potential::marginalize`]
    pub fn maximize(&self, keep: &[Variable]) -> Result<Self> {
        self.eliminate(keep, Elimination::Max)
    }


    fn eliminate(&self, keep: &[Variable], elim: Elimination) -> Result<Self> {
        match self {
            &Potential::Identity => {
                if keep.is_empty() {
                    Ok(Potential::Identity)
                } else {
                    Err(FreyError::UnknownVariable)
                }
            },

            &Potential::Table { ref scope, ref values } => {
                for v in keep.iter() {
                    if ! scope.contains(v) {
                        return Err(FreyError::UnknownVariable);
                    }
                }

                let mut scope = scope.clone();
                let mut values = values.clone();

                // eliminate from the highest axis down so indices stay valid
                for i in (0..scope.len()).rev() {
                    if keep.contains(&scope[i]) {
                        continue;
                    }

                    values = match elim {
                        Elimination::Sum => values.sum_axis(nd::Axis(i)),
                        Elimination::Max => values.fold_axis(
                            nd::Axis(i),
                            ::std::f64::NEG_INFINITY,
                            |m, &v| m.max(v)
                        )
                    };
                    scope.remove(i);
                }

                Ok(Potential::Table { scope, values })
            },

            &Potential::Gaussian { ref scope, ref precision, ref shift, constant } => {
                project_gaussian(scope, precision, shift, constant, keep, elim)
            }
        }
    }


    /// Rescale a table `Potential` to sum to 1. Gaussians are normalized by
    /// construction: the result is shape-identical to the input.
    ///
    /// # Errors
    /// * `FreyError::DegeneratePotential` if the table's total mass is zero or
    ///   not finite
    pub fn normalize(&self) -> Result<Self> {
        match self {
            &Potential::Identity => Ok(Potential::Identity),
            &Potential::Gaussian { .. } => Ok(self.clone()),
            &Potential::Table { ref scope, ref values } => {
                let z = values.sum();
                if ! (z > 0.0) || ! z.is_finite() {
                    return Err(FreyError::DegeneratePotential);
                }

                Ok(Potential::Table {
                    scope: scope.clone(),
                    values: values.mapv(|v| v / z)
                })
            }
        }
    }


    /// Return the assignment of the scope attaining the maximum value of a table
    /// `Potential`. Ties break to the first-encountered index in row-major order.
    ///
    /// # Errors
    /// * `FreyError::TypeMismatch` for Gaussian potentials (use [`Potential::mode`])
    pub fn argmax(&self) -> Result<Assignment> {
        match self {
            &Potential::Identity => {
                Err(FreyError::General(String::from("The identity potential has no argmax")))
            },
            &Potential::Gaussian { .. } => Err(FreyError::TypeMismatch),
            &Potential::Table { ref scope, .. } => {
                let mut best_val = ::std::f64::NEG_INFINITY;
                let mut best = None;

                for assn in all_assignments(scope) {
                    let val = self.value(&assn)?;
                    if best.is_none() || val > best_val {
                        best_val = val;
                        best = Some(assn);
                    }
                }

                best.ok_or(FreyError::DegeneratePotential)
            }
        }
    }


    /// Return the maximizing point of a Gaussian `Potential` - its mean vector.
    ///
    /// # Errors
    /// * `FreyError::TypeMismatch` for table potentials (use [`Potential::argmax`])
    /// * `FreyError::DegeneratePotential` if the precision is singular
    pub fn mode(&self) -> Result<DVector<f64>> {
        match self {
            &Potential::Gaussian { ref precision, ref shift, .. } => {
                precision.clone().lu().solve(shift).ok_or(FreyError::DegeneratePotential)
            },
            _ => Err(FreyError::TypeMismatch)
        }
    }


    /// Return the mean of a Gaussian `Potential`.
    pub fn mean(&self) -> Result<DVector<f64>> {
        self.mode()
    }


    /// Return the covariance matrix of a Gaussian `Potential`.
    ///
    /// # Errors
    /// as [`Potential::mode`]
    pub fn covariance(&self) -> Result<DMatrix<f64>> {
        match self {
            &Potential::Gaussian { ref precision, .. } => {
                precision.clone().try_inverse().ok_or(FreyError::DegeneratePotential)
            },
            _ => Err(FreyError::TypeMismatch)
        }
    }


    /// Move the `Potential` into the log domain: the elementwise natural logarithm of
    /// a table, with `log(0)` mapped to negative infinity. Gaussian canonical form is
    /// log-domain already, so it is returned unchanged.
    pub fn log(&self) -> Self {
        match self {
            &Potential::Table { ref scope, ref values } => Potential::Table {
                scope: scope.clone(),
                values: values.mapv(f64::ln)
            },
            _ => self.clone()
        }
    }


    /// Move the `Potential` out of the log domain: the elementwise exponential of a
    /// table. The inverse of [`Potential::log`].
    pub fn exp(&self) -> Self {
        match self {
            &Potential::Table { ref scope, ref values } => Potential::Table {
                scope: scope.clone(),
                values: values.mapv(f64::exp)
            },
            _ => self.clone()
        }
    }


    /// Reduce a table `Potential` over the given partial assignment: the assigned
    /// axes are fixed at their states and dropped from the scope. Reducing by every
    /// scope variable leaves a scalar (empty-scope) table.
    ///
    /// # Errors
    /// * `FreyError::TypeMismatch` for Gaussian potentials
    /// * `FreyError::DimensionMismatch` if a bound state is outside its domain
    pub fn reduce(&self, assignment: &Assignment) -> Result<Self> {
        match self {
            &Potential::Identity => Ok(Potential::Identity),
            &Potential::Gaussian { .. } => Err(FreyError::TypeMismatch),
            &Potential::Table { ref scope, ref values } => {
                let mut view = values.view();
                let mut new_scope = Vec::new();
                let mut removed = 0;

                for (i, v) in scope.iter().enumerate() {
                    if let Some(&s) = assignment.get(v) {
                        if s >= v.cardinality() {
                            return Err(FreyError::DimensionMismatch);
                        }
                        view = view.index_axis_move(nd::Axis(i - removed), s);
                        removed += 1;
                    } else {
                        new_scope.push(*v);
                    }
                }

                Ok(Potential::Table { scope: new_scope, values: view.to_owned() })
            }
        }
    }


    /// Distance between two `Potential`s over the same scope, used as the flooding
    /// schedule's convergence metric: the maximum absolute elementwise difference of
    /// tables, or the max-norm difference of Gaussian canonical parameters. A pair of
    /// equal infinities counts as zero difference.
    ///
    /// # Errors
    /// * `FreyError::DimensionMismatch` if the scopes or representations differ
    pub fn distance(&self, other: &Self) -> Result<f64> {
        match (self, other) {
            (&Potential::Identity, &Potential::Identity) => Ok(0.0),

            (&Potential::Table { scope: ref a, values: ref x },
             &Potential::Table { scope: ref b, values: ref y }) => {
                if a != b {
                    return Err(FreyError::DimensionMismatch);
                }

                Ok(x.iter().zip(y.iter()).fold(0.0, |d, (&p, &q)| d.max(abs_diff(p, q))))
            },

            (&Potential::Gaussian { scope: ref a, precision: ref pa, shift: ref ha, constant: ca },
             &Potential::Gaussian { scope: ref b, precision: ref pb, shift: ref hb, constant: cb }) => {
                if a != b {
                    return Err(FreyError::DimensionMismatch);
                }

                let d = pa.iter().zip(pb.iter())
                          .chain(ha.iter().zip(hb.iter()))
                          .fold(abs_diff(ca, cb), |d, (&p, &q)| d.max(abs_diff(p, q)));
                Ok(d)
            },

            _ => Err(FreyError::DimensionMismatch)
        }
    }

}


/// Absolute difference that treats a pair of equal infinities as zero.
fn abs_diff(p: f64, q: f64) -> f64 {
    if p == q { 0.0 } else { (p - q).abs() }
}


/// The union of two scopes, keeping `a`'s order and appending `b`'s new variables.
fn union_scope(a: &[Variable], b: &[Variable]) -> Vec<Variable> {
    let mut scope = a.to_vec();
    for v in b.iter() {
        if ! scope.contains(v) {
            scope.push(*v);
        }
    }
    scope
}


/// Total coordinate count of a continuous scope.
fn gaussian_len(scope: &[Variable]) -> usize {
    scope.iter().map(|v| v.cardinality()).sum()
}


/// Map every coordinate of `sub` to its coordinate in `scope`.
///
/// Unwrapping the position lookup is safe: callers only pass subscopes of `scope`.
fn embedding(scope: &[Variable], sub: &[Variable]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(scope.len());
    let mut total = 0;
    for v in scope.iter() {
        offsets.push(total);
        total += v.cardinality();
    }

    let mut map = Vec::new();
    for v in sub.iter() {
        let at = scope.iter().position(|u| u == v).unwrap();
        for k in 0..v.cardinality() {
            map.push(offsets[at] + k);
        }
    }
    map
}


fn check_gaussian_scope(scope: &[Variable], nrows: usize, ncols: usize, len: usize) -> Result<()> {
    for (i, v) in scope.iter().enumerate() {
        if scope[i + 1..].contains(v) {
            return Err(FreyError::DuplicateNode);
        }

        if ! v.is_continuous() {
            return Err(FreyError::TypeMismatch);
        }
    }

    let n = gaussian_len(scope);
    if nrows != n || ncols != n || len != n {
        return Err(FreyError::DimensionMismatch);
    }

    Ok(())
}


/// Schur-complement projection of a canonical-form Gaussian onto `keep`.
///
/// With the coordinates split into kept (a) and eliminated (b) blocks, the projected
/// parameters are `Waa - Wab Wbb^-1 Wba` and `ha - Wab Wbb^-1 hb`. Summation and
/// maximization share them; they differ only in the constant term, where summation
/// additionally picks up the log-normalizer of the eliminated block.
fn project_gaussian(
    scope: &[Variable],
    precision: &DMatrix<f64>,
    shift: &DVector<f64>,
    constant: f64,
    keep: &[Variable],
    elim: Elimination
) -> Result<Potential> {
    for v in keep.iter() {
        if ! scope.contains(v) {
            return Err(FreyError::UnknownVariable);
        }
    }

    let kept: Vec<Variable> = scope.iter().filter(|v| keep.contains(*v)).cloned().collect();
    let dropped: Vec<Variable> = scope.iter().filter(|v| ! keep.contains(*v)).cloned().collect();

    if dropped.is_empty() {
        return Ok(Potential::Gaussian {
            scope: scope.to_vec(),
            precision: precision.clone(),
            shift: shift.clone(),
            constant
        });
    }

    let ka = embedding(scope, &kept);
    let kb = embedding(scope, &dropped);
    let (na, nb) = (ka.len(), kb.len());

    let waa = DMatrix::from_fn(na, na, |i, j| precision[(ka[i], ka[j])]);
    let wab = DMatrix::from_fn(na, nb, |i, j| precision[(ka[i], kb[j])]);
    let wba = DMatrix::from_fn(nb, na, |i, j| precision[(kb[i], ka[j])]);
    let wbb = DMatrix::from_fn(nb, nb, |i, j| precision[(kb[i], kb[j])]);
    let ha = DVector::from_fn(na, |i, _| shift[ka[i]]);
    let hb = DVector::from_fn(nb, |i, _| shift[kb[i]]);

    let lu = wbb.lu();
    let x = lu.solve(&wba).ok_or(FreyError::DegeneratePotential)?;
    let y = lu.solve(&hb).ok_or(FreyError::DegeneratePotential)?;

    let new_precision = waa - &wab * &x;
    let new_shift = ha - &wab * &y;

    // quadratic completion at the conditional optimum of the eliminated block
    let mut new_constant = constant + 0.5 * hb.dot(&y);
    if elim == Elimination::Sum {
        let det = lu.determinant();
        if det <= 0.0 {
            return Err(FreyError::DegeneratePotential);
        }
        new_constant += 0.5 * ((nb as f64) * (2.0 * PI).ln() - det.ln());
    }

    Ok(Potential::Gaussian {
        scope: kept,
        precision: new_precision,
        shift: new_shift,
        constant: new_constant
    })
}
