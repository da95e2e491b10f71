#![cfg(test)]

// Property tests for RecordTable kept inside the crate so they can reach
// the crate-private structural layer.

use crate::record::Record;
use crate::record_table::{InsertError, RecordHandle, RecordTable};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::hash::{BuildHasher, Hasher};

// Pool-indexed operations to improve shrinking: indices shrink to earlier
// ids, pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, u8),
    Remove(usize),
    Find(usize),
    Contains(i32),
    Rename(usize, u8),
    Iterate,
    Drain,
}

fn record(id: i32, tag: u8) -> Record {
    Record::new(id, &format!("{tag:x}")).expect("small allocation")
}

fn arb_scenario() -> impl Strategy<Value = (Vec<i32>, Vec<OpI>)> {
    proptest::collection::vec(any::<i32>(), 1..=8).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            4 => (idx.clone(), any::<u8>()).prop_map(|(i, t)| OpI::Insert(i, t)),
            2 => idx.clone().prop_map(OpI::Remove),
            2 => idx.clone().prop_map(OpI::Find),
            1 => prop_oneof![contains_pool, any::<i32>()].prop_map(OpI::Contains),
            2 => (idx.clone(), any::<u8>()).prop_map(|(i, t)| OpI::Rename(i, t)),
            1 => Just(OpI::Iterate),
            1 => Just(OpI::Drain),
        ];
        proptest::collection::vec(op, 1..60).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn run_state_machine<S: BuildHasher>(
    mut sut: RecordTable<S>,
    pool: Vec<i32>,
    ops: Vec<OpI>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<i32, String> = HashMap::new();
    let mut live: HashMap<i32, RecordHandle> = HashMap::new();
    let mut stale: Vec<RecordHandle> = Vec::new();

    for op in ops {
        match op {
            OpI::Insert(i, t) => {
                let id = pool[i];
                let already = model.contains_key(&id);
                let r = record(id, t);
                let name = r.name().to_string();
                match sut.insert(r) {
                    Ok(h) => {
                        prop_assert!(!already, "insert must fail on duplicate");
                        prop_assert!(live.insert(id, h).is_none());
                        model.insert(id, name);
                    }
                    Err(InsertError::DuplicateKey) => {
                        prop_assert!(already, "duplicate error only when id exists");
                    }
                }
            }
            OpI::Remove(i) => {
                let id = pool[i];
                if let Some(h) = live.remove(&id) {
                    let r = sut.remove(h).expect("handle valid for removal");
                    prop_assert_eq!(r.id(), id);
                    let expected = model.remove(&id).expect("present in model");
                    prop_assert_eq!(r.name(), expected.as_str());
                    stale.push(h);
                } else {
                    prop_assert!(sut.find(id).is_none());
                }
            }
            OpI::Find(i) => {
                let id = pool[i];
                let found = sut.find(id);
                prop_assert_eq!(found.is_some(), model.contains_key(&id));
                if let Some(h) = found {
                    prop_assert_eq!(Some(&h), live.get(&id));
                    let got = sut.get(h).map(|r| r.name().to_string());
                    prop_assert_eq!(got.as_ref(), model.get(&id));
                }
            }
            OpI::Contains(id) => {
                prop_assert_eq!(sut.contains(id), model.contains_key(&id));
            }
            OpI::Rename(i, t) => {
                let id = pool[i];
                if let Some(&h) = live.get(&id) {
                    let name = format!("{t:x}");
                    match sut.get_mut(h) {
                        Some(r) => r.rename(&name).expect("small allocation"),
                        None => prop_assert!(false, "live handle should resolve"),
                    }
                    model.insert(id, name);
                }
            }
            OpI::Iterate => {
                let ids: Vec<i32> = sut.iter().map(|(_, r)| r.id()).collect();
                let s_ids: BTreeSet<i32> = ids.iter().copied().collect();
                prop_assert_eq!(ids.len(), s_ids.len(), "each record visited once");
                let m_ids: BTreeSet<i32> = model.keys().copied().collect();
                prop_assert_eq!(s_ids, m_ids);
            }
            OpI::Drain => {
                let drained: BTreeSet<i32> = sut.drain().map(|r| r.id()).collect();
                let m_ids: BTreeSet<i32> = model.keys().copied().collect();
                prop_assert_eq!(drained, m_ids);
                model.clear();
                stale.extend(live.drain().map(|(_, h)| h));
            }
        }

        // Post-conditions after each op
        for &h in &stale {
            prop_assert!(sut.get(h).is_none(), "stale handle resolved");
        }
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
    }
    Ok(())
}

// Collision hasher to stress id equality during probing.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
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

// Property: State-machine equivalence against std::collections::HashMap.
// - Duplicate ids are rejected; success returns a unique stable handle.
// - `find`/`contains` agree with the model and with tracked handles.
// - `remove(handle)` returns the owned record and invalidates the handle.
// - `iter` yields every live record exactly once; `drain` empties the table.
// - Stale handles never resolve; `len`/`is_empty` match the model.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_state_machine(RecordTable::new(), pool, ops)?;
    }

    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_state_machine(
            RecordTable::with_capacity_and_hasher(0, ConstBuildHasher),
            pool,
            ops,
        )?;
    }
}
