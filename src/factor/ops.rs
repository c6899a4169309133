//! The algebra defined over a `DiscreteFactor`
//!
//! Every operation comes in two flavours: one that leaves its operands untouched and returns a
//! freshly allocated factor, and an `_inplace` flavour that replaces the receiver.

use super::{DiscreteFactor, Table};

use crate::index::{self, VarId};
use crate::util::{JunctionError, Result};


impl DiscreteFactor {

    /// `DiscreteFactor` product.
    ///
    /// Defined in Koller & Friedman Section 4.2.1
    ///
    /// # Args
    /// * `other`: the `DiscreteFactor` to multiply with.
    ///
    /// # Returns
    /// A new `DiscreteFactor` over the union of both scopes. The scope keeps the order of `self`
    /// and appends the variables only `other` has.
    ///
    /// # Errors
    /// * `JunctionError::CardinalityMismatch` if a shared variable has a different number of
    ///   states in each factor
    pub fn product(&self, other: &DiscreteFactor) -> Result<DiscreteFactor> {
        self.combine(other, |a, b| Ok(a * b))
    }


    /// In place variant of `product`
    pub fn product_inplace(&mut self, other: &DiscreteFactor) -> Result<()> {
        *self = self.product(other)?;
        Ok(())
    }


    /// `DiscreteFactor` division. Calculates Psi(X, Y) = Phi1(X, Y) / Phi2(Y) where Phi1 = self
    /// and Phi2 = other.
    ///
    /// Defined in Koller & Friedman Section 10.3.1
    ///
    /// # Notes
    /// In the context of this operation, 0/0 is defined as 0. However, X/0, where X != 0, is still
    /// undefined.
    ///
    /// # Errors
    /// * `JunctionError::CardinalityMismatch` as in `product`
    /// * `JunctionError::DivideByZero` if a divide by zero error is found
    pub fn division(&self, other: &DiscreteFactor) -> Result<DiscreteFactor> {
        self.combine(other, |a, b| {
            if b == 0. {
                if a == 0. {
                    Ok(0.)
                } else {
                    Err(JunctionError::DivideByZero)
                }
            } else {
                Ok(a / b)
            }
        })
    }


    /// In place variant of `division`
    pub fn division_inplace(&mut self, other: &DiscreteFactor) -> Result<()> {
        *self = self.division(other)?;
        Ok(())
    }


    /// Elementwise `DiscreteFactor` sum over the union of both scopes. Scope and errors as in
    /// `product`.
    pub fn sum(&self, other: &DiscreteFactor) -> Result<DiscreteFactor> {
        self.combine(other, |a, b| Ok(a + b))
    }


    /// In place variant of `sum`
    pub fn sum_inplace(&mut self, other: &DiscreteFactor) -> Result<()> {
        *self = self.sum(other)?;
        Ok(())
    }


    /// Elementwise `DiscreteFactor` difference, `self - other`. Scope and errors as in `product`.
    ///
    /// # Notes
    /// The result may hold negative entries, as may any table in the log domain.
    pub fn difference(&self, other: &DiscreteFactor) -> Result<DiscreteFactor> {
        self.combine(other, |a, b| Ok(a - b))
    }


    /// In place variant of `difference`
    pub fn difference_inplace(&mut self, other: &DiscreteFactor) -> Result<()> {
        *self = self.difference(other)?;
        Ok(())
    }


    /// Move the table into the log domain. Entries are clipped to at least `clip` first, so
    /// zeros map to `ln(clip)` rather than `-inf`.
    pub fn log(&self, clip: f64) -> DiscreteFactor {
        DiscreteFactor {
            scope: self.scope.clone(),
            cardinality: self.cardinality.clone(),
            parameters: self.parameters.mapv(|v| v.max(clip).ln()),
        }
    }


    /// In place variant of `log`
    pub fn log_inplace(&mut self, clip: f64) {
        self.parameters.mapv_inplace(|v| v.max(clip).ln());
    }


    /// Move the table out of the log domain
    pub fn exp(&self) -> DiscreteFactor {
        DiscreteFactor {
            scope: self.scope.clone(),
            cardinality: self.cardinality.clone(),
            parameters: self.parameters.mapv(f64::exp),
        }
    }


    /// In place variant of `exp`
    pub fn exp_inplace(&mut self) {
        self.parameters.mapv_inplace(f64::exp);
    }


    fn combine<F>(&self, other: &DiscreteFactor, op: F) -> Result<DiscreteFactor>
        where F: Fn(f64, f64) -> Result<f64>
    {
        let scope = index::ordered_union(&self.scope, &other.scope);

        let mut cardinality = Vec::with_capacity(scope.len());
        for &v in scope.iter() {
            match (self.card(v), other.card(v)) {
                (Some(left), Some(right)) if left != right => {
                    return Err(JunctionError::CardinalityMismatch { variable: v, left, right });
                },
                (Some(c), _) | (None, Some(c)) => cardinality.push(c),
                (None, None) => return Err(JunctionError::NotFound(v)),
            }
        }

        // where each operand's variables live in the combined scope
        let left_map = index::position_map(&self.scope, &scope)?;
        let right_map = index::position_map(&other.scope, &scope)?;
        let left_strides = index::strides(&self.cardinality);
        let right_strides = index::strides(&other.cardinality);

        let assignments = index::cartesian_product(&cardinality);
        let mut parameters = Vec::with_capacity(assignments.len());

        for assignment in assignments {
            let l = flat_index(&assignment, &left_map, &left_strides);
            let r = flat_index(&assignment, &right_map, &right_strides);
            parameters.push(op(self.parameters[l], other.parameters[r])?);
        }

        Ok(DiscreteFactor { scope, cardinality, parameters: Table::from(parameters) })
    }


    /// Marginalise the `DiscreteFactor` over the given variable by summing it out
    ///
    /// Defined in Koller & Friedman 9.3.1
    ///
    /// # Errors
    /// * `JunctionError::VariableNotFound` if `variable` is not in the scope
    pub fn marginalise(&self, variable: VarId) -> Result<DiscreteFactor> {
        self.collapse(variable, 0.0, |acc, v| acc + v)
    }


    /// In place variant of `marginalise`
    pub fn marginalise_inplace(&mut self, variable: VarId) -> Result<()> {
        *self = self.marginalise(variable)?;
        Ok(())
    }


    /// Sum out every variable in `variables`, in order
    pub fn marginalise_all(&self, variables: &[VarId]) -> Result<DiscreteFactor> {
        variables.iter().try_fold(self.clone(), |f, &v| f.marginalise(v))
    }


    /// Maximise the `DiscreteFactor` over the given variable
    ///
    /// Defined in Koller & Friedman 13.2.1
    ///
    /// # Errors
    /// * `JunctionError::VariableNotFound` if `variable` is not in the scope
    pub fn maximise(&self, variable: VarId) -> Result<DiscreteFactor> {
        self.collapse(variable, f64::NEG_INFINITY, f64::max)
    }


    /// In place variant of `maximise`
    pub fn maximise_inplace(&mut self, variable: VarId) -> Result<()> {
        *self = self.maximise(variable)?;
        Ok(())
    }


    /// Max out every variable in `variables`, in order
    pub fn maximise_all(&self, variables: &[VarId]) -> Result<DiscreteFactor> {
        variables.iter().try_fold(self.clone(), |f, &v| f.maximise(v))
    }


    fn collapse<F>(&self, variable: VarId, init: f64, op: F) -> Result<DiscreteFactor>
        where F: Fn(f64, f64) -> f64
    {
        let pos = self.position(variable).ok_or(JunctionError::VariableNotFound(variable))?;

        let mut scope = self.scope.clone();
        let mut cardinality = self.cardinality.clone();
        scope.remove(pos);
        cardinality.remove(pos);

        // the removed position contributes nothing to the bucket index
        let mut strides = index::strides(&self.cardinality);
        let kept = index::strides(&cardinality);
        strides.remove(pos);

        let size: usize = cardinality.iter().product();
        let mut buckets = vec![init; size];

        for (i, &value) in self.parameters.iter().enumerate() {
            let bucket: usize = strides.iter()
                                       .zip(cardinality.iter())
                                       .zip(kept.iter())
                                       .map(|((&s, &c), &k)| ((i / s) % c) * k)
                                       .sum();
            buckets[bucket] = op(buckets[bucket], value);
        }

        Ok(DiscreteFactor { scope, cardinality, parameters: Table::from(buckets) })
    }


    /// Reduce the `DiscreteFactor` by the observation `variable = state`.
    ///
    /// The scope is unchanged: entries inconsistent with the observation are set to zero. A factor
    /// that does not mention `variable` is returned unchanged.
    ///
    /// Defined in Koller & Friedman 4.2.3
    ///
    /// # Errors
    /// * `JunctionError::InvalidState` if `state` is out of range for `variable`
    pub fn reduce(&self, variable: VarId, state: usize) -> Result<DiscreteFactor> {
        self.reduce_with_fill(variable, state, 0.0)
    }


    /// In place variant of `reduce`
    pub fn reduce_inplace(&mut self, variable: VarId, state: usize) -> Result<()> {
        self.reduce_with_fill_inplace(variable, state, 0.0)
    }


    /// As `reduce`, writing `fill` into the inconsistent entries
    pub fn reduce_with_fill(&self, variable: VarId, state: usize, fill: f64)
        -> Result<DiscreteFactor>
    {
        let mut reduced = self.clone();
        reduced.reduce_with_fill_inplace(variable, state, fill)?;
        Ok(reduced)
    }


    /// In place variant of `reduce_with_fill`
    pub fn reduce_with_fill_inplace(&mut self, variable: VarId, state: usize, fill: f64)
        -> Result<()>
    {
        let pos = match self.position(variable) {
            Some(pos) => pos,
            None => return Ok(()),
        };

        let cardinality = self.cardinality[pos];
        if state >= cardinality {
            return Err(JunctionError::InvalidState { variable, state, cardinality });
        }

        let stride = index::strides(&self.cardinality)[pos];
        for (i, value) in self.parameters.iter_mut().enumerate() {
            if (i / stride) % cardinality != state {
                *value = fill;
            }
        }

        Ok(())
    }

}


fn flat_index(assignment: &[usize], positions: &[usize], strides: &[usize]) -> usize {
    positions.iter().zip(strides.iter()).map(|(&p, &s)| assignment[p] * s).sum()
}
