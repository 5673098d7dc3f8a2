//! Stress tests for the object store.
//!
//! These tests verify behavior under heavy load and concurrent access.

use crate::fixtures::put_blob;
use c9_repo::{
    conditional, EntityType, ObjectStore, Reader, RecordId, RepoError, ValidationError, Versioned,
};
use c9_server::{User, UserPatch};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of operations to perform.
    pub operations: usize,
    /// Number of concurrent threads (for concurrent tests).
    pub threads: usize,
    /// Size of blob payloads in bytes.
    pub payload_size: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 2_000,
            threads: 4,
            payload_size: 256,
        }
    }
}

fn counters() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
    (Arc::new(AtomicUsize::new(0)), Arc::new(AtomicUsize::new(0)))
}

fn join_all(handles: Vec<thread::JoinHandle<()>>) {
    for handle in handles {
        handle.join().expect("Thread panicked");
    }
}

/// Run a sequential blob create stress test.
pub fn stress_sequential_creates(store: &ObjectStore, config: &StressConfig) -> StressTestResult {
    let data = vec![0xABu8; config.payload_size];

    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for _ in 0..config.operations {
        let result = store.update(EntityType::Blob, |tx| {
            let id = tx.allocate_id()?;
            tx.put(id, &data)
        });
        match result {
            Ok(()) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Run a concurrent blob create stress test.
///
/// Returns every id handed out, in no particular order.
pub fn stress_concurrent_creates(
    store: Arc<ObjectStore>,
    config: &StressConfig,
) -> (StressTestResult, Vec<RecordId>) {
    let (successful, failed) = counters();
    let ids = Arc::new(Mutex::new(Vec::with_capacity(config.operations)));
    let ops_per_thread = config.operations / config.threads;

    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let store = Arc::clone(&store);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let ids = Arc::clone(&ids);
            let data = vec![t as u8; config.payload_size];

            thread::spawn(move || {
                for _ in 0..ops_per_thread {
                    let result = store.update(EntityType::Blob, |tx| {
                        let id = tx.allocate_id()?;
                        tx.put(id, &data)?;
                        Ok::<_, RepoError>(id)
                    });
                    match result {
                        Ok(id) => {
                            ids.lock().expect("id list poisoned").push(id);
                            successful.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(_) => {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            })
        })
        .collect();

    join_all(handles);

    let result = StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    );
    let ids = std::mem::take(&mut *ids.lock().expect("id list poisoned"));
    (result, ids)
}

/// Run readers against a store while one writer keeps appending blobs.
///
/// A read fails if the record count and a full walk of the same snapshot
/// disagree, or if the count ever goes backwards for a reader.
pub fn stress_readers_during_writes(
    store: Arc<ObjectStore>,
    config: &StressConfig,
) -> StressTestResult {
    let (successful, failed) = counters();
    let readers = config.threads.saturating_sub(1).max(1);
    let ops_per_thread = config.operations / (readers + 1);

    let start = Instant::now();

    let mut handles: Vec<_> = (0..readers)
        .map(|_| {
            let store = Arc::clone(&store);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);

            thread::spawn(move || {
                let mut last_count = 0u64;
                for _ in 0..ops_per_thread {
                    let result = store.view(EntityType::Blob, |tx| {
                        let count = tx.count()?;
                        let mut walked = 0u64;
                        tx.for_each(|_, _| {
                            walked += 1;
                            Ok(())
                        })?;
                        Ok::<_, RepoError>((count, walked))
                    });
                    match result {
                        Ok((count, walked)) if count == walked && count >= last_count => {
                            last_count = count;
                            successful.fetch_add(1, Ordering::Relaxed);
                        }
                        _ => {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            })
        })
        .collect();

    {
        let store = Arc::clone(&store);
        let successful = Arc::clone(&successful);
        let failed = Arc::clone(&failed);
        let data = vec![0xCDu8; config.payload_size];

        handles.push(thread::spawn(move || {
            for _ in 0..ops_per_thread {
                let result = store.update(EntityType::Blob, |tx| {
                    let id = tx.allocate_id()?;
                    tx.put(id, &data)
                });
                match result {
                    Ok(()) => successful.fetch_add(1, Ordering::Relaxed),
                    Err(_) => failed.fetch_add(1, Ordering::Relaxed),
                };
            }
        }));
    }

    join_all(handles);

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Have every thread try to create a user under the same name.
///
/// Only `Duplicate` counts as an expected failure; any other error is
/// returned as-is so the caller can see it.
pub fn stress_name_contention(
    store: Arc<ObjectStore>,
    config: &StressConfig,
    name: &str,
) -> Result<StressTestResult, RepoError> {
    let (successful, failed) = counters();
    let unexpected: Arc<Mutex<Option<RepoError>>> = Arc::new(Mutex::new(None));

    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let store = Arc::clone(&store);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let unexpected = Arc::clone(&unexpected);
            let patch = UserPatch {
                user_name: Some(name.to_string()),
                email: Some(format!("thread{t}@example.com")),
                ..UserPatch::default()
            };

            thread::spawn(move || {
                match conditional::create::<User, _>(&store, &patch) {
                    Ok(_) => {
                        successful.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(err) if err.is_duplicate() => {
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(err) => {
                        *unexpected.lock().expect("error slot poisoned") = Some(err);
                    }
                }
            })
        })
        .collect();

    join_all(handles);

    if let Some(err) = unexpected.lock().expect("error slot poisoned").take() {
        return Err(err);
    }
    Ok(StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    ))
}

/// Run a transaction abort stress test.
///
/// Every other update allocates an id and writes, then fails validation.
pub fn stress_transaction_aborts(store: &ObjectStore, config: &StressConfig) -> StressTestResult {
    let data = vec![0xABu8; config.payload_size];

    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        let should_fail = i % 2 == 0;

        let result = store.update(EntityType::Blob, |tx| {
            let id = tx.allocate_id()?;
            tx.put(id, &data)?;

            if should_fail {
                Err(RepoError::from(ValidationError::new("intentional")))
            } else {
                Ok(id)
            }
        });

        match result {
            Ok(_) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Creates `count` users named `user0`, `user1`, ... and returns them.
pub fn populate_users(store: &ObjectStore, count: usize) -> Result<Vec<Versioned<User>>, RepoError> {
    (0..count)
        .map(|i| {
            let patch = UserPatch {
                user_name: Some(format!("user{i}")),
                email: Some(format!("user{i}@example.com")),
                ..UserPatch::default()
            };
            conditional::create(store, &patch)
        })
        .collect()
}

/// Fills the blob bucket with `count` payloads of `size` bytes.
pub fn populate_blobs(store: &ObjectStore, count: usize, size: usize) -> Vec<RecordId> {
    let data = vec![0x5Au8; size];
    (0..count).map(|_| put_blob(store, &data)).collect()
}
