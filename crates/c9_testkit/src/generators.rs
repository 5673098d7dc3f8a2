//! Property-based test generators using proptest.
//!
//! Provides strategies for generating names, payloads and operation
//! sequences that the repository must accept.

use c9_repo::RecordId;
use c9_server::{GroupPatch, UserPatch};
use proptest::prelude::*;

/// Strategy for generating valid user and group names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9]{0,15}").expect("Invalid regex")
}

/// Strategy for generating a name together with a differently cased
/// spelling of it.
pub fn case_variant_strategy() -> impl Strategy<Value = (String, String)> {
    (name_strategy(), prop::collection::vec(any::<bool>(), 16)).prop_map(|(name, flips)| {
        let variant = name
            .chars()
            .zip(flips.iter().cycle())
            .map(|(c, &flip)| {
                if flip {
                    if c.is_ascii_uppercase() {
                        c.to_ascii_lowercase()
                    } else {
                        c.to_ascii_uppercase()
                    }
                } else {
                    c
                }
            })
            .collect();
        (name, variant)
    })
}

/// Strategy for generating blob payloads (arbitrary bytes).
pub fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..512)
}

/// Strategy for generating record ids that have been allocated.
pub fn record_id_strategy() -> impl Strategy<Value = RecordId> {
    (1..u64::MAX).prop_map(RecordId::new)
}

/// Strategy for generating a complete user create request.
pub fn user_patch_strategy() -> impl Strategy<Value = UserPatch> {
    (
        name_strategy(),
        prop::option::of(prop::string::string_regex("[A-Za-z ]{0,24}").expect("Invalid regex")),
        prop::option::of(prop::string::string_regex("[a-z]{1,12}").expect("Invalid regex")),
    )
        .prop_map(|(user_name, display_name, site)| UserPatch {
            email: Some(format!("{}@example.com", user_name.to_lowercase())),
            url: site.map(|site| format!("https://{site}.example.com/")),
            user_name: Some(user_name),
            display_name,
        })
}

/// Strategy for generating a complete group create request.
pub fn group_patch_strategy() -> impl Strategy<Value = GroupPatch> {
    (
        name_strategy(),
        prop::collection::vec(record_id_strategy(), 0..8),
    )
        .prop_map(|(group_name, users)| GroupPatch {
            group_name: Some(group_name),
            users: Some(users),
            ..GroupPatch::default()
        })
}

/// One step of a blob workload.
#[derive(Debug, Clone)]
pub enum BlobOperation {
    /// Store a new blob
    Create {
        /// Blob contents
        payload: Vec<u8>,
    },
    /// Delete a previously created blob, possibly already deleted
    Delete {
        /// Picks among the ids created so far
        pick: prop::sample::Index,
    },
    /// Read a previously created blob, possibly already deleted
    Get {
        /// Picks among the ids created so far
        pick: prop::sample::Index,
    },
}

/// Strategy for generating blob operations.
pub fn blob_operation_strategy() -> impl Strategy<Value = BlobOperation> {
    prop_oneof![
        3 => payload_strategy().prop_map(|payload| BlobOperation::Create { payload }),
        1 => any::<prop::sample::Index>().prop_map(|pick| BlobOperation::Delete { pick }),
        2 => any::<prop::sample::Index>().prop_map(|pick| BlobOperation::Get { pick }),
    ]
}

/// Strategy for generating a sequence of operations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<BlobOperation>> {
    prop::collection::vec(blob_operation_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    ///
    /// Every case opens its own store on disk, so this is what the
    /// store-backed properties use.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 24,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
