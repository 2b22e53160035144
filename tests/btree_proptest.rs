//! Randomized insert/delete sequences checked against `BTreeSet`.

use std::collections::BTreeSet;

use proptest::prelude::*;
use stratadb::{BPlusTree, Config, Error, Key};
use tempfile::tempdir;

#[derive(Debug, Clone)]
enum Op {
    Insert(Key),
    Delete(Key),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..200i64).prop_map(Op::Insert),
        2 => (0..200i64).prop_map(Op::Delete),
    ]
}

fn run_ops(page_size: usize, ops: &[Op]) -> Result<(), TestCaseError> {
    let dir = tempdir().unwrap();
    let path = dir.path().join("prop.db");
    let config = Config::default().with_page_size(page_size);
    let mut tree = BPlusTree::open_with(&path, config).unwrap();
    let mut reference = BTreeSet::new();

    for op in ops {
        match *op {
            Op::Insert(key) => match tree.insert(key) {
                Ok(()) => prop_assert!(reference.insert(key)),
                Err(Error::DuplicateKey(k)) => {
                    prop_assert_eq!(k, key);
                    prop_assert!(reference.contains(&key));
                }
                Err(e) => return Err(TestCaseError::fail(e.to_string())),
            },
            Op::Delete(key) => match tree.delete(key) {
                Ok(()) => prop_assert!(reference.remove(&key)),
                Err(Error::KeyNotFound(k)) => {
                    prop_assert_eq!(k, key);
                    prop_assert!(!reference.contains(&key));
                }
                Err(e) => return Err(TestCaseError::fail(e.to_string())),
            },
        }
        if let Err(e) = tree.check_invariants() {
            return Err(TestCaseError::fail(format!("after {:?}: {}", op, e)));
        }
    }

    let expected: Vec<Key> = reference.iter().copied().collect();
    prop_assert_eq!(tree.scan().unwrap(), expected.clone());
    for key in 0..200 {
        prop_assert_eq!(tree.search(key).unwrap(), reference.contains(&key));
    }

    // Everything must come back the same after a reopen.
    let root = tree.root();
    tree.close().unwrap();
    let mut tree = BPlusTree::open_with(&path, config).unwrap();
    prop_assert_eq!(tree.root(), root);
    prop_assert_eq!(tree.scan().unwrap(), expected);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn tiny_pages_match_btreeset(ops in prop::collection::vec(op_strategy(), 1..300)) {
        run_ops(60, &ops)?;
    }

    #[test]
    fn medium_pages_match_btreeset(ops in prop::collection::vec(op_strategy(), 1..400)) {
        run_ops(109, &ops)?;
    }

    #[test]
    fn odd_key_capacity_matches_btreeset(ops in prop::collection::vec(op_strategy(), 1..400)) {
        // 85-byte pages hold 3 keys per internal node, so some merges
        // are skipped for lack of room.
        run_ops(85, &ops)?;
    }
}
