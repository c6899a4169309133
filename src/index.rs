//! Index algebra over scopes and flattened tables.
//!
//! Scopes are plain vectors of variable identifiers. Every set operation in this module returns
//! its result sorted and free of duplicates; the rest of the crate relies on that ordering when
//! it builds product scopes, clique scopes and separators.
//!
//! Tables are flattened row-major: the last scope position varies fastest.

use crate::util::{JunctionError, Result};

use itertools::Itertools;

use std::collections::BTreeSet;

/// Identifier of a random variable
pub type VarId = usize;

/// An ordered sequence of unique variable identifiers
pub type Scope = Vec<VarId>;

/// One state index per scope position
pub type Assignment = Vec<usize>;


/// Union of an arbitrary number of scopes
pub fn union(scopes: &[&[VarId]]) -> Scope {
    let set: BTreeSet<VarId> = scopes.iter().flat_map(|s| s.iter().cloned()).collect();
    set.into_iter().collect()
}


/// Union of two scopes that keeps the order of `a` and appends the elements only `b` has, in the
/// order of `b`
pub fn ordered_union(a: &[VarId], b: &[VarId]) -> Scope {
    a.iter().chain(b.iter()).cloned().unique().collect()
}


/// The elements of `a` that are not in `b`
pub fn difference(a: &[VarId], b: &[VarId]) -> Scope {
    a.iter()
     .filter(|v| ! b.contains(*v))
     .cloned()
     .sorted()
     .dedup()
     .collect()
}


/// Intersection of an arbitrary number of scopes. The intersection of nothing is empty.
pub fn intersect(scopes: &[&[VarId]]) -> Scope {
    match scopes.split_first() {
        None => Vec::new(),
        Some((first, rest)) => {
            first.iter()
                 .filter(|v| rest.iter().all(|s| s.contains(*v)))
                 .cloned()
                 .sorted()
                 .dedup()
                 .collect()
        }
    }
}


/// `true` if every element of `a` is in `b`
pub fn is_subset(a: &[VarId], b: &[VarId]) -> bool {
    a.iter().all(|v| b.contains(v))
}


/// `true` if `a` and `b` share at least one element
pub fn contains_any(a: &[VarId], b: &[VarId]) -> bool {
    a.iter().any(|v| b.contains(v))
}


/// For every element of `source`, find its position in `target`.
///
/// # Errors
/// * `JunctionError::NotFound` if an element of `source` is not in `target`
pub fn position_map(source: &[VarId], target: &[VarId]) -> Result<Vec<usize>> {
    source.iter()
          .map(|v| target.iter().position(|t| t == v).ok_or(JunctionError::NotFound(*v)))
          .collect()
}


/// Row-major strides for a cardinality vector
pub fn strides(cardinality: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; cardinality.len()];
    for i in (0..cardinality.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * cardinality[i + 1];
    }
    strides
}


/// Number of entries in a table over `cardinality`
///
/// # Errors
/// * `JunctionError::InvalidParameters` if the product does not fit in a `usize`
pub fn table_size(cardinality: &[usize]) -> Result<usize> {
    cardinality.iter()
               .try_fold(1usize, |size, &c| size.checked_mul(c))
               .ok_or_else(|| JunctionError::InvalidParameters(
                   format!("a table over cardinalities {:?} is too large", cardinality)
               ))
}


/// Flat offset of an assignment given precomputed strides. No bounds checking is done.
pub fn offset(assignment: &[usize], strides: &[usize]) -> usize {
    assignment.iter().zip(strides.iter()).map(|(a, s)| a * s).sum()
}


/// Encode an assignment as a flat index (mixed radix, last position fastest)
///
/// # Errors
/// * `JunctionError::InvalidAssignment` if the lengths differ or a state is out of range
pub fn ravel(assignment: &[usize], cardinality: &[usize]) -> Result<usize> {
    if assignment.len() != cardinality.len() {
        return Err(JunctionError::InvalidAssignment(
            format!("assignment of length {} for {} variables", assignment.len(), cardinality.len())
        ));
    }

    let mut index = 0;
    for (&state, &card) in assignment.iter().zip(cardinality.iter()) {
        if state >= card {
            return Err(JunctionError::InvalidAssignment(
                format!("state {} is out of range for cardinality {}", state, card)
            ));
        }
        index = index * card + state;
    }

    Ok(index)
}


/// Decode a flat index into an assignment. Inverse of `ravel`.
///
/// # Errors
/// * `JunctionError::InvalidAssignment` if the index is beyond the table
pub fn unravel(index: usize, cardinality: &[usize]) -> Result<Assignment> {
    let size = table_size(cardinality)?;
    if index >= size {
        return Err(JunctionError::InvalidAssignment(
            format!("index {} is out of range for a table of {} entries", index, size)
        ));
    }

    let mut assignment = vec![0; cardinality.len()];
    let mut rest = index;
    for (i, &card) in cardinality.iter().enumerate().rev() {
        assignment[i] = rest % card;
        rest /= card;
    }

    Ok(assignment)
}


/// Every assignment over the given cardinalities, in flat index order (the last dimension varies
/// fastest). The empty cardinality vector has exactly one, empty, assignment.
pub fn cartesian_product(cardinality: &[usize]) -> Vec<Assignment> {
    if cardinality.is_empty() {
        return vec![Vec::new()];
    }

    cardinality.iter()
               .map(|&c| 0..c)
               .multi_cartesian_product()
               .collect()
}


#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn set_operations() {
        assert_eq!(vec![0, 1, 2, 4], union(&[&[4, 1], &[2, 0, 1]]));
        assert_eq!(vec![4, 1, 2, 0], ordered_union(&[4, 1], &[2, 0, 1]));
        assert_eq!(vec![1, 3], difference(&[3, 2, 1], &[2, 5]));
        assert_eq!(vec![1, 2], intersect(&[&[2, 1, 0], &[1, 2, 3], &[5, 2, 1]]));
        assert!(intersect(&[]).is_empty());
        assert!(is_subset(&[2, 0], &[0, 1, 2]));
        assert!(! is_subset(&[3], &[0, 1, 2]));
        assert!(contains_any(&[3, 1], &[1]));
    }

    #[test]
    fn position_mapping() {
        assert_eq!(vec![2, 0], position_map(&[5, 1], &[1, 3, 5]).unwrap());
        assert_eq!(Err(JunctionError::NotFound(7)), position_map(&[1, 7], &[1, 3, 5]));
    }

    #[test]
    fn ravel_unravel() {
        let card = [3, 2, 4];
        assert_eq!(vec![8, 4, 1], strides(&card));
        assert_eq!(13, offset(&[1, 1, 1], &strides(&card)));

        for (i, a) in cartesian_product(&card).into_iter().enumerate() {
            assert_eq!(i, ravel(&a, &card).unwrap());
            assert_eq!(a, unravel(i, &card).unwrap());
        }

        assert!(ravel(&[0, 2, 0], &card).is_err());
        assert!(ravel(&[0, 1], &card).is_err());
        assert!(unravel(24, &card).is_err());
    }

    #[test]
    fn table_sizes() {
        assert_eq!(Ok(24), table_size(&[3, 2, 4]));
        assert_eq!(Ok(1), table_size(&[]));

        match table_size(&[usize::MAX, 2]) {
            Err(JunctionError::InvalidParameters(_)) => (),
            other => panic!("wrong result {:?}", other)
        };
        assert!(unravel(0, &[usize::MAX, 3]).is_err());
    }

    #[test]
    fn cartesian_order() {
        let expected = vec![
            vec![0, 0], vec![0, 1], vec![0, 2],
            vec![1, 0], vec![1, 1], vec![1, 2],
        ];
        assert_eq!(expected, cartesian_product(&[2, 3]));
        assert_eq!(vec![Vec::<usize>::new()], cartesian_product(&[]));
    }

}
