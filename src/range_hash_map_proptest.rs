#![cfg(test)]

// Property tests for RangeHashMap kept inside the crate so they can run the
// structural audit (check_invariants) after every operation.

use crate::range_hash_map::RangeHashMap;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::Hasher;

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations to improve shrinking: indices shrink to earlier
// keys, pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i32),
    GetOrDefault(usize),
    Erase(usize),
    Find(usize),
    At(String),
    Mutate(usize, i32),
    Iterate,
    Clear,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=12).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let at_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            8 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Insert(i, v)),
            3 => idx.clone().prop_map(OpI::GetOrDefault),
            5 => idx.clone().prop_map(OpI::Erase),
            3 => idx.clone().prop_map(OpI::Find),
            2 => prop_oneof![
                at_pool.prop_map(|s: String| s),
                "[a-z]{0,5}".prop_map(|s| s)
            ]
            .prop_map(OpI::At),
            3 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            1 => Just(OpI::Iterate),
            1 => Just(OpI::Clear),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Property: state-machine equivalence against std::collections::HashMap.
// Invariants exercised across random operation sequences:
// - First-write-wins: inserting a present key never changes its value.
// - find/at parity with model membership; borrowed `str` queries.
// - erase returns the owned pair matching the model and is a no-op on
//   absent keys; the erased position stops resolving.
// - get_or_insert_default inserts 0 exactly when the key is absent.
// - iter yields each live entry exactly once; key set equals the model's.
// - len/is_empty parity, 2*len <= capacity, and the full structural audit
//   (span contiguity, occupancy counters, candidate residency, link
//   symmetry) after every op.
fn run_scenario<S>(make: impl Fn() -> RangeHashMap<Key, i32, S>, pool: Vec<String>, ops: Vec<OpI>)
where
    S: std::hash::BuildHasher,
{
    let mut sut = make();
    let mut model: HashMap<Key, i32> = HashMap::new();
    let mut positions: HashMap<Key, crate::Position> = HashMap::new();

    for op in ops {
        match op {
            OpI::Insert(i, v) => {
                let k = key_from(&pool, i);
                let already = model.contains_key(&k);
                let p = sut.insert(k.clone(), v);
                if already {
                    assert_eq!(
                        p,
                        *positions.get(&k).expect("present key has tracked position"),
                        "duplicate insert must return the original position"
                    );
                } else {
                    positions.insert(k.clone(), p);
                    model.insert(k.clone(), v);
                }
                assert_eq!(p.value(&sut), model.get(&k));
            }
            OpI::GetOrDefault(i) => {
                let k = key_from(&pool, i);
                let expected = *model.entry(k.clone()).or_insert(0);
                let got = *sut.get_or_insert_default(k.clone());
                assert_eq!(got, expected);
                if !positions.contains_key(&k) {
                    let p = sut.find(&k).expect("upserted key is findable");
                    positions.insert(k, p);
                }
            }
            OpI::Erase(i) => {
                let k = key_from(&pool, i);
                let removed = sut.erase(&k);
                let expected = model.remove(&k).map(|v| (k.clone(), v));
                assert_eq!(removed, expected);
                if let Some(p) = positions.remove(&k) {
                    assert!(p.value(&sut).is_none(), "erased position must not resolve");
                }
            }
            OpI::Find(i) => {
                let k = key_from(&pool, i);
                let found = sut.find(&k);
                assert_eq!(found.is_some(), model.contains_key(&k));
                if let Some(p) = found {
                    assert_eq!(Some(&p), positions.get(&k), "find returns the stable position");
                    assert_eq!(p.value(&sut), model.get(&k));
                }
            }
            OpI::At(s) => {
                let got = sut.at(s.as_str()).ok().copied();
                let expected = model.iter().find(|(k, _)| k.0 == s).map(|(_, v)| *v);
                assert_eq!(got, expected);
            }
            OpI::Mutate(i, d) => {
                let k = key_from(&pool, i);
                if let Some(&p) = positions.get(&k) {
                    let vr = p.value_mut(&mut sut).expect("live position resolves");
                    *vr = vr.saturating_add(d);
                    if let Some(mv) = model.get_mut(&k) {
                        *mv = mv.saturating_add(d);
                    }
                }
            }
            OpI::Iterate => {
                let s_keys: BTreeSet<Key> = sut.iter().map(|(_, k, _)| k.clone()).collect();
                let m_keys: BTreeSet<Key> = model.keys().cloned().collect();
                assert_eq!(s_keys, m_keys);
                assert_eq!(sut.iter().count(), sut.len(), "no entry yielded twice");
            }
            OpI::Clear => {
                let cap = sut.capacity();
                sut.clear();
                model.clear();
                positions.clear();
                assert_eq!(sut.capacity(), cap, "clear keeps capacity");
            }
        }

        // Post-conditions after each op.
        assert_eq!(sut.len(), model.len());
        assert_eq!(sut.is_empty(), model.is_empty());
        assert!(2 * sut.len() <= sut.capacity());
        sut.check_invariants();
    }

    // Every surviving key is findable with the model's value.
    for (k, v) in &model {
        assert_eq!(sut.at(k.0.as_str()), Ok(v));
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_scenario(RangeHashMap::new, pool, ops);
    }
}

// Collision variant using a constant hasher: every key shares the same
// candidate pair, so all entries pile into one span. This stresses span
// endpoint maintenance, interior unlinks, and growth re-placement under the
// worst case the double-hash scheme admits.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl std::hash::BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_scenario(|| RangeHashMap::with_hasher(ConstBuildHasher), pool, ops);
    }
}
