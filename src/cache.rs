//! Memoisation of query results
//!
//! A `QueryCache` is a bounded least-recently-used map from a canonical `(evidence, variables)`
//! key to the `Posterior` it produced. `CachedEngine` layers it over any `InferenceEngine`.

use crate::config::InferenceConfig;
use crate::index::VarId;
use crate::inference::{InferenceEngine, Posterior};
use crate::util::Result;

use indexmap::IndexMap;
use itertools::Itertools;
use tracing::trace;


/// A query in canonical form: sorted, deduplicated evidence and query variables
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QueryKey {
    evidence: Vec<(VarId, usize)>,
    variables: Vec<VarId>,
}


impl QueryKey {

    pub fn new(evidence: &[(VarId, usize)], variables: &[VarId]) -> Self {
        QueryKey {
            evidence: evidence.iter().cloned().sorted().dedup().collect(),
            variables: variables.iter().cloned().sorted().dedup().collect(),
        }
    }


    pub fn evidence(&self) -> &[(VarId, usize)] {
        &self.evidence
    }


    pub fn variables(&self) -> &[VarId] {
        &self.variables
    }

}


#[derive(Clone, Debug)]
pub struct QueryCache {
    capacity: usize,

    /// Least recently used first
    entries: IndexMap<QueryKey, Posterior>,

    hits: u64,
    misses: u64,
}


impl QueryCache {

    /// A cache holding at most `capacity` results. A capacity of zero stores nothing.
    pub fn new(capacity: usize) -> Self {
        QueryCache { capacity, entries: IndexMap::new(), hits: 0, misses: 0 }
    }


    pub fn capacity(&self) -> usize {
        self.capacity
    }


    pub fn len(&self) -> usize {
        self.entries.len()
    }


    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }


    pub fn hits(&self) -> u64 {
        self.hits
    }


    pub fn misses(&self) -> u64 {
        self.misses
    }


    /// Look up `key`, marking it as the most recently used entry
    pub fn get(&mut self, key: &QueryKey) -> Option<&Posterior> {
        match self.entries.shift_remove(key) {
            Some(posterior) => {
                self.hits += 1;
                self.entries.insert(key.clone(), posterior);
                self.entries.get(key)
            },
            None => {
                self.misses += 1;
                None
            }
        }
    }


    /// Store a result, evicting the least recently used entry when full
    pub fn insert(&mut self, key: QueryKey, posterior: Posterior) {
        if self.capacity == 0 {
            return;
        }

        self.entries.shift_remove(&key);
        while self.entries.len() >= self.capacity {
            if let Some((evicted, _)) = self.entries.shift_remove_index(0) {
                trace!(key = ?evicted, "evicting cached query");
            }
        }

        self.entries.insert(key, posterior);
    }


    pub fn clear(&mut self) {
        self.entries.clear();
    }

}


/// An `InferenceEngine` with a `QueryCache` in front of it
pub struct CachedEngine<E> {
    engine: E,
    cache: QueryCache,
}


impl<E: InferenceEngine> CachedEngine<E> {

    pub fn new(engine: E, capacity: usize) -> Self {
        CachedEngine { engine, cache: QueryCache::new(capacity) }
    }


    /// Size the cache from `config.cache_capacity`
    pub fn from_config(engine: E, config: &InferenceConfig) -> Self {
        CachedEngine::new(engine, config.cache_capacity)
    }


    pub fn engine(&self) -> &E {
        &self.engine
    }


    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }


    pub fn into_inner(self) -> E {
        self.engine
    }


    /// Answer a query, from the cache when the same evidence and variables were seen before.
    /// The posterior lists the variables in ascending order.
    pub fn query(&mut self, evidence: &[(VarId, usize)], variables: &[VarId]) -> Result<Posterior> {
        let key = QueryKey::new(evidence, variables);

        if let Some(posterior) = self.cache.get(&key) {
            trace!(?key, "cache hit");
            return Ok(posterior.clone());
        }

        let posterior = self.engine.query(key.evidence(), key.variables())?;
        self.cache.insert(key, posterior.clone());
        Ok(posterior)
    }

}


#[cfg(test)]
mod tests {

    use super::*;
    use crate::collection::FactorCollection;
    use crate::factor::DiscreteFactor;
    use crate::inference::JunctionTree;

    fn posterior(p: f64) -> Posterior {
        let mut posterior = Posterior::default();
        posterior.insert(0, vec![p, 1. - p]);
        posterior
    }

    #[test]
    fn canonical_keys() {
        let a = QueryKey::new(&[(3, 1), (0, 0), (3, 1)], &[2, 1, 2]);
        let b = QueryKey::new(&[(0, 0), (3, 1)], &[1, 2]);

        assert_eq!(a, b);
        assert_eq!(&[(0, 0), (3, 1)], a.evidence());
        assert_eq!(&[1, 2], a.variables());
    }

    #[test]
    fn least_recently_used_is_evicted() {
        let mut cache = QueryCache::new(2);
        let k1 = QueryKey::new(&[(0, 0)], &[]);
        let k2 = QueryKey::new(&[(0, 1)], &[]);
        let k3 = QueryKey::new(&[(1, 0)], &[]);

        cache.insert(k1.clone(), posterior(0.1));
        cache.insert(k2.clone(), posterior(0.2));

        // touching k1 makes k2 the oldest entry
        assert_eq!(Some(&posterior(0.1)), cache.get(&k1));
        cache.insert(k3.clone(), posterior(0.3));

        assert_eq!(2, cache.len());
        assert!(cache.get(&k2).is_none());
        assert!(cache.get(&k1).is_some());
        assert!(cache.get(&k3).is_some());
        assert_eq!(3, cache.hits());
        assert_eq!(1, cache.misses());

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn zero_capacity_stores_nothing() {
        let mut cache = QueryCache::new(0);
        let key = QueryKey::new(&[], &[0]);
        cache.insert(key.clone(), posterior(0.5));

        assert!(cache.is_empty());
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn cached_engine() {
        let collection = FactorCollection::from_factors(vec![
            DiscreteFactor::new(vec![0], vec![2], vec![0.3, 0.7]).unwrap(),
            DiscreteFactor::new(vec![1, 0], vec![2, 2], vec![0.9, 0.2, 0.1, 0.8]).unwrap(),
        ]).unwrap();

        let tree = JunctionTree::from_factors(&collection).unwrap();
        let mut engine = CachedEngine::from_config(tree, &InferenceConfig::default());

        let first = engine.query(&[(1, 0)], &[0]).unwrap();
        let second = engine.query(&[(1, 0), (1, 0)], &[0]).unwrap();

        assert_eq!(first, second);
        assert_eq!(1, engine.cache().len());
        assert_eq!(1, engine.cache().hits());
        assert_eq!(&[(1, 0)], engine.engine().evidence());

        let tree = engine.into_inner();
        assert!(tree.is_calibrated());
    }

}
