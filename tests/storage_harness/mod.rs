//! Shared test harness for adapter backend testing
//!
//! Provides the six-user fixture every backend is seeded with, helpers to
//! inspect results, and the `adapter_contract_tests!` macro.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//! use storage_harness::*;
//! ```

#![allow(dead_code)]

mod adapter_contract_tests;

use docquery::prelude::*;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

/// One fixture user
fn user(name: &str, lastname: &str, midlename: &str, age: i64) -> Record {
    Record::new()
        .with("name", name)
        .with("lastname", lastname)
        .with("midlename", midlename)
        .with("age", age)
}

/// Six users: two named John, two older than 60
pub fn users() -> Vec<Record> {
    vec![
        user("John", "Snow", "Valentine", 25),
        user("Marie", "Claire", "Angelique", 75),
        user("John", "Travolta", "Joseph", 65),
        user("Peter", "Parker", "Benjamin", 30),
        user("Bruce", "Wayne", "Thomas", 45),
        user("Anakin", "Skywalker", "Luke", 20),
    ]
}

/// Insert the fixture users and return the stored records.
pub async fn seed<A: DataAdapter + ?Sized>(adapter: &A) -> Vec<Record> {
    let mut stored = Vec::new();
    for record in users() {
        stored.push(adapter.insert(record).await.expect("Failed to seed fixture user"));
    }
    stored
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Install a test subscriber; `RUST_LOG` controls verbosity.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn ages(records: &[Record]) -> Vec<i64> {
    records
        .iter()
        .map(|r| r.get_i64("age").expect("fixture records carry an age"))
        .collect()
}

/// Last names, sorted, for order-independent comparisons.
pub fn lastnames(records: &[Record]) -> Vec<String> {
    let mut names: Vec<String> = records
        .iter()
        .map(|r| r.get_str("lastname").expect("fixture records carry a lastname").to_string())
        .collect();
    names.sort();
    names
}
