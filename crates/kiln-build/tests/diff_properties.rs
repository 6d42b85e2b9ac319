//! Properties of the input set diff

use kiln_build::CompilerIO;
use proptest::collection::btree_set;
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::path::PathBuf;

fn inputs() -> impl Strategy<Value = BTreeSet<PathBuf>> {
    btree_set("[a-e]{1,2}\\.cs".prop_map(PathBuf::from), 0..8)
}

fn io(inputs: BTreeSet<PathBuf>) -> CompilerIO {
    CompilerIO {
        inputs,
        outputs: BTreeSet::new(),
    }
}

proptest! {
    #[test]
    fn test_diff_is_symmetric(previous in inputs(), current in inputs()) {
        let forward = io(current.clone()).diff_inputs(&io(previous.clone()));
        let backward = io(previous).diff_inputs(&io(current));

        prop_assert_eq!(forward.additions, backward.deletions);
        prop_assert_eq!(forward.deletions, backward.additions);
    }

    #[test]
    fn test_diff_reconstructs_current(previous in inputs(), current in inputs()) {
        let diff = io(current.clone()).diff_inputs(&io(previous.clone()));

        let mut rebuilt = previous;
        for deleted in &diff.deletions {
            rebuilt.remove(deleted);
        }
        rebuilt.extend(diff.additions);
        prop_assert_eq!(rebuilt, current);
    }

    #[test]
    fn test_diff_with_itself_is_empty(current in inputs()) {
        prop_assert!(io(current.clone()).diff_inputs(&io(current)).is_empty());
    }
}
