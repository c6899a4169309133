//! Property tests for the index algebra, the factor operations and the junction tree

use junction::index;
use junction::{DiscreteFactor, FactorCollection, InferenceEngine, JunctionTree, NormaliseMode};

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A factor over up to four variables with positive parameters
fn factor() -> impl Strategy<Value = DiscreteFactor> {
    prop::collection::vec(1usize..4, 1..4).prop_flat_map(|cardinality| {
        let size: usize = cardinality.iter().product();
        let scope: Vec<usize> = (0..cardinality.len()).map(|i| 3 * i + 1).collect();
        prop::collection::vec(0.01f64..10.0, size).prop_map(move |parameters| {
            DiscreteFactor::new(scope.clone(), cardinality.clone(), parameters).unwrap()
        })
    })
}

/// A random Bayesian network: every variable gets up to two parents among the earlier ones
fn network(seed: u64, n: usize) -> FactorCollection {
    let mut rng = StdRng::seed_from_u64(seed);
    let cardinality: Vec<usize> = (0..n).map(|_| rng.gen_range(2..4)).collect();

    let mut factors = Vec::with_capacity(n);
    for child in 0..n {
        let mut scope = vec![child];
        for _ in 0..2 {
            if child > 0 && rng.gen_bool(0.6) {
                let parent = rng.gen_range(0..child);
                if ! scope.contains(&parent) {
                    scope.push(parent);
                }
            }
        }

        let card = scope.iter().map(|&v| cardinality[v]).collect();
        let cpt = DiscreteFactor::random(scope, card, &mut rng)
            .unwrap()
            .normalise_with(NormaliseMode::RowWise, 1e-16);
        factors.push(cpt);
    }

    FactorCollection::from_factors(factors).unwrap()
}

proptest! {
    #[test]
    fn ravel_round_trip(
        (cardinality, flat) in prop::collection::vec(1usize..5, 0..5).prop_flat_map(|c| {
            let size: usize = c.iter().product();
            (Just(c), 0..size)
        })
    ) {
        let assignment = index::unravel(flat, &cardinality).unwrap();
        prop_assert_eq!(flat, index::ravel(&assignment, &cardinality).unwrap());
    }

    #[test]
    fn marginalisation_conserves_mass(f in factor(), pick in 0usize..4) {
        let variable = f.scope()[pick % f.scope().len()];
        let m = f.marginalise(variable).unwrap();

        let total = f.parameters().sum();
        prop_assert!((total - m.parameters().sum()).abs() <= 1e-9 * total);
        prop_assert!(! m.contains(variable));
    }

    #[test]
    fn table_normalisation_sums_to_one(f in factor()) {
        let n = f.normalise();
        prop_assert!((n.parameters().sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn row_wise_normalisation(f in factor()) {
        let n = f.normalise_with(NormaliseMode::RowWise, 1e-16);
        let child = n.cardinality()[0];

        for parents in index::cartesian_product(&n.cardinality()[1..]) {
            let mut total = 0.0;
            for state in 0..child {
                let mut assignment = vec![state];
                assignment.extend_from_slice(&parents);
                total += n.value(&assignment).unwrap();
            }
            prop_assert!((total - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn product_with_ones_is_identity(f in factor()) {
        let ones = DiscreteFactor::ones(f.scope().to_vec(), f.cardinality().to_vec()).unwrap();
        prop_assert_eq!(&f, &f.product(&ones).unwrap());
        prop_assert_eq!(&f, &f.product(&DiscreteFactor::identity()).unwrap());
    }

    #[test]
    fn junction_tree_matches_enumeration(seed in any::<u64>(), n in 2usize..7, observe in any::<bool>()) {
        let collection = network(seed, n);
        let evidence = if observe { vec![(seed as usize % n, 0)] } else { vec![] };

        let mut tree = JunctionTree::from_factors(&collection).unwrap();
        let posterior = tree.query(&evidence, &[]).unwrap();

        let mut joint = collection.product().unwrap();
        for &(v, s) in evidence.iter() {
            joint.reduce_inplace(v, s).unwrap();
        }

        for (v, p) in posterior.iter() {
            let extras = index::difference(joint.scope(), &[v]);
            let expected = joint.marginalise_all(&extras).unwrap().normalise();
            for (e, a) in expected.parameters().iter().zip(p.iter()) {
                prop_assert!((e - a).abs() < 1e-9, "variable {}: {} != {}", v, e, a);
            }
        }
    }
}
