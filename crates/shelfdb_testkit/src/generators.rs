//! Property-based test generators using proptest.
//!
//! Provides strategies for identifiers, keys and values that stay within
//! the engine limits.

use proptest::prelude::*;
use serde::{Deserialize, Serialize};

/// Strategy for generating valid reference identifiers.
pub fn ref_id_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9_]{0,31}").expect("Invalid regex")
}

/// Strategy for generating text keys well under the key size limit.
pub fn text_key_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z0-9:/_-]{0,64}").expect("Invalid regex")
}

/// Strategy for generating arbitrary byte values.
pub fn bytes_value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..1024)
}

/// A structured value used by round-trip tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Display name.
    pub name: String,
    /// A counter.
    pub count: u64,
    /// Optional score.
    pub score: Option<i32>,
    /// Free-form tags.
    pub tags: Vec<String>,
}

/// Strategy for generating [`Record`] values.
pub fn record_strategy() -> impl Strategy<Value = Record> {
    (
        "[a-zA-Z ]{0,24}",
        any::<u64>(),
        any::<Option<i32>>(),
        prop::collection::vec("[a-z]{1,8}", 0..4),
    )
        .prop_map(|(name, count, score, tags)| Record {
            name,
            count,
            score,
            tags,
        })
}

/// Strategy for generating a batch of puts, later writes to the same key
/// replacing earlier ones.
pub fn put_batch_strategy(max_len: usize) -> impl Strategy<Value = Vec<(String, Record)>> {
    prop::collection::vec((text_key_strategy(), record_strategy()), 0..max_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::strategy::ValueTree;
    use proptest::test_runner::TestRunner;

    #[test]
    fn test_ref_id_strategy() {
        let mut runner = TestRunner::default();
        for _ in 0..100 {
            let id = ref_id_strategy().new_tree(&mut runner).unwrap().current();
            assert!(!id.is_empty());
            assert!(id.len() <= 32);
        }
    }

    #[test]
    fn test_text_key_strategy() {
        let mut runner = TestRunner::default();
        for _ in 0..100 {
            let key = text_key_strategy().new_tree(&mut runner).unwrap().current();
            assert!(key.len() <= 64);
        }
    }

    #[test]
    fn test_put_batch_strategy() {
        let mut runner = TestRunner::default();
        let batch = put_batch_strategy(10).new_tree(&mut runner).unwrap().current();
        assert!(batch.len() < 10);
    }
}
