//! Macro-generated test suite for `DataAdapter` contract validation.
//!
//! The `adapter_contract_tests!` macro generates a test module that checks
//! any `DataAdapter` implementation against the shared contract: structured
//! queries, free-text search, paging, sort, find-one, count and mutations.
//!
//! Structured queries are written in each backend's own dialect, so the
//! invoking file supplies them.
//!
//! # Usage
//!
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//!
//! use storage_harness::*;
//!
//! adapter_contract_tests!(
//!     factory: connected_adapter().await,
//!     name_is_john: json!({"name": "John"}),
//!     age_over_60: json!({"age": {"$gt": 60}}),
//!     john_or_claire: json!({"$or": [{"name": "John"}, {"lastname": "Claire"}]}),
//!     invalid: json!({"$bogus": 1}),
//! );
//! ```
//!
//! # Generated Tests
//!
//! ## Find
//! - `test_find_all` / `test_find_by_name` / `test_find_age_range` / `test_find_or`
//! - `test_search_with_fields` / `test_search_default_fields`
//! - `test_search_and_query_combine`
//! - `test_limit` / `test_offset` / `test_zero_limit` / `test_offset_past_end`
//! - `test_empty_query_with_limit`
//! - `test_sort_descending` / `test_sort_array_form` / `test_sort_skips_bare_dash`
//! - `test_sort_with_paging`
//! - `test_invalid_query_is_error`
//!
//! ## Find one / by id
//! - `test_find_one_returns_first_in_order` / `test_find_one_no_match`
//! - `test_find_one_on_empty_collection`
//! - `test_find_by_id` / `test_find_by_id_missing`
//!
//! ## Mutations
//! - `test_insert_assigns_fresh_id` / `test_concurrent_inserts`
//! - `test_count` / `test_count_ignores_search`
//! - `test_remove_all` / `test_remove_by_id`

/// Generate a full `DataAdapter` conformance test suite.
///
/// `factory` must evaluate to a connected adapter over an empty collection.
/// It is re-evaluated for each test to ensure isolation.
#[macro_export]
macro_rules! adapter_contract_tests {
    (
        factory: $factory:expr,
        name_is_john: $name_is_john:expr,
        age_over_60: $age_over_60:expr,
        john_or_claire: $john_or_claire:expr,
        invalid: $invalid:expr $(,)?
    ) => {
        mod adapter_contract_tests {
            use super::*;
            use docquery::prelude::*;

            // ==================================================================
            // Find: structured queries
            // ==================================================================

            #[tokio::test]
            async fn test_find_all() {
                let adapter = $factory;
                seed(&adapter).await;

                let found = adapter.find(&Filter::new()).await.unwrap();
                assert_eq!(found.len(), 6);
                assert!(found.iter().all(|r| r.id().is_some()));
            }

            #[tokio::test]
            async fn test_find_by_name() {
                let adapter = $factory;
                seed(&adapter).await;

                let found = adapter
                    .find(&Filter::new().with_query($name_is_john))
                    .await
                    .unwrap();
                assert_eq!(lastnames(&found), vec!["Snow", "Travolta"]);
            }

            #[tokio::test]
            async fn test_find_age_range() {
                let adapter = $factory;
                seed(&adapter).await;

                let found = adapter
                    .find(&Filter::new().with_query($age_over_60))
                    .await
                    .unwrap();
                assert_eq!(lastnames(&found), vec!["Claire", "Travolta"]);
            }

            #[tokio::test]
            async fn test_find_or() {
                let adapter = $factory;
                seed(&adapter).await;

                let found = adapter
                    .find(&Filter::new().with_query($john_or_claire))
                    .await
                    .unwrap();
                assert_eq!(lastnames(&found), vec!["Claire", "Snow", "Travolta"]);
            }

            #[tokio::test]
            async fn test_invalid_query_is_error() {
                let adapter = $factory;
                seed(&adapter).await;

                let err = adapter
                    .find(&Filter::new().with_query($invalid))
                    .await
                    .unwrap_err();
                assert!(!err.is_connection(), "unexpected error kind: {err}");
            }

            // ==================================================================
            // Find: free-text search
            // ==================================================================

            #[tokio::test]
            async fn test_search_with_fields() {
                let adapter = $factory;
                seed(&adapter).await;

                let filter = Filter::new().with_search("John").with_search_fields(["name"]);
                let found = adapter.find(&filter).await.unwrap();
                assert_eq!(lastnames(&found), vec!["Snow", "Travolta"]);

                let filter = Filter::new()
                    .with_search("Luke")
                    .with_search_fields(["name", "midlename"]);
                let found = adapter.find(&filter).await.unwrap();
                assert_eq!(lastnames(&found), vec!["Skywalker"]);
            }

            #[tokio::test]
            async fn test_search_default_fields() {
                let adapter = $factory;
                seed(&adapter).await;

                let found = adapter
                    .find(&Filter::new().with_search("John"))
                    .await
                    .unwrap();
                assert_eq!(lastnames(&found), vec!["Snow", "Travolta"]);
            }

            #[tokio::test]
            async fn test_search_and_query_combine() {
                let adapter = $factory;
                seed(&adapter).await;

                let filter = Filter::new()
                    .with_query($age_over_60)
                    .with_search("John")
                    .with_search_fields(["name"]);
                let found = adapter.find(&filter).await.unwrap();
                assert_eq!(lastnames(&found), vec!["Travolta"]);
            }

            // ==================================================================
            // Find: paging and sort
            // ==================================================================

            #[tokio::test]
            async fn test_limit() {
                let adapter = $factory;
                seed(&adapter).await;

                let found = adapter.find(&Filter::new().with_limit(2)).await.unwrap();
                assert_eq!(found.len(), 2);
            }

            #[tokio::test]
            async fn test_empty_query_with_limit() {
                let adapter = $factory;
                seed(&adapter).await;

                let filter = Filter::new().with_query(json!({})).with_limit(3);
                let found = adapter.find(&filter).await.unwrap();
                assert_eq!(found.len(), 3);
            }

            #[tokio::test]
            async fn test_offset() {
                let adapter = $factory;
                seed(&adapter).await;

                let found = adapter.find(&Filter::new().with_offset(4)).await.unwrap();
                assert_eq!(found.len(), 2);
            }

            #[tokio::test]
            async fn test_zero_limit() {
                let adapter = $factory;
                seed(&adapter).await;

                let found = adapter.find(&Filter::new().with_limit(0)).await.unwrap();
                assert!(found.is_empty());
            }

            #[tokio::test]
            async fn test_offset_past_end() {
                let adapter = $factory;
                seed(&adapter).await;

                let found = adapter.find(&Filter::new().with_offset(10)).await.unwrap();
                assert!(found.is_empty());
            }

            #[tokio::test]
            async fn test_sort_descending() {
                let adapter = $factory;
                seed(&adapter).await;

                let found = adapter.find(&Filter::new().with_sort("-age")).await.unwrap();
                assert_eq!(ages(&found), vec![75, 65, 45, 30, 25, 20]);
            }

            #[tokio::test]
            async fn test_sort_array_form() {
                let adapter = $factory;
                seed(&adapter).await;

                let found = adapter
                    .find(&Filter::new().with_sort(vec!["age"]))
                    .await
                    .unwrap();
                assert_eq!(ages(&found), vec![20, 25, 30, 45, 65, 75]);
            }

            #[tokio::test]
            async fn test_sort_skips_bare_dash() {
                let adapter = $factory;
                seed(&adapter).await;

                let found = adapter
                    .find(&Filter::new().with_sort("- -age"))
                    .await
                    .unwrap();
                assert_eq!(ages(&found), vec![75, 65, 45, 30, 25, 20]);
            }

            #[tokio::test]
            async fn test_sort_with_paging() {
                let adapter = $factory;
                seed(&adapter).await;

                let filter = Filter::new().with_sort("age").with_offset(1).with_limit(2);
                let found = adapter.find(&filter).await.unwrap();
                assert_eq!(ages(&found), vec![25, 30]);
            }

            // ==================================================================
            // Find one / find by id
            // ==================================================================

            #[tokio::test]
            async fn test_find_one_returns_first_in_order() {
                let adapter = $factory;
                seed(&adapter).await;

                let filter = Filter::new().with_query($name_is_john).with_sort("-age");
                let found = adapter.find_one(&filter).await.unwrap().unwrap();
                assert_eq!(found.get_str("lastname"), Ok("Travolta"));
            }

            #[tokio::test]
            async fn test_find_one_no_match() {
                let adapter = $factory;
                seed(&adapter).await;

                let filter = Filter::new()
                    .with_search("Nobody")
                    .with_search_fields(["name"]);
                assert!(adapter.find_one(&filter).await.unwrap().is_none());
            }

            #[tokio::test]
            async fn test_find_one_on_empty_collection() {
                let adapter = $factory;
                seed(&adapter).await;
                adapter.remove_all().await.unwrap();

                assert!(adapter.find_one(&Filter::new()).await.unwrap().is_none());
            }

            #[tokio::test]
            async fn test_find_by_id() {
                let adapter = $factory;
                let stored = seed(&adapter).await;
                let id = stored[3].id().unwrap().to_string();

                let found = adapter.find_by_id(&id).await.unwrap().unwrap();
                assert_eq!(found.id(), Some(id.as_str()));
                assert_eq!(found.get_str("name"), Ok("Peter"));
                assert_eq!(found.get_i64("age"), Ok(30));
            }

            #[tokio::test]
            async fn test_find_by_id_missing() {
                let adapter = $factory;
                seed(&adapter).await;

                assert!(adapter.find_by_id("missing12345").await.unwrap().is_none());
            }

            // ==================================================================
            // Mutations
            // ==================================================================

            #[tokio::test]
            async fn test_insert_assigns_fresh_id() {
                let adapter = $factory;

                let record = Record::new()
                    .with("_id", "caller-chosen")
                    .with("name", "Leia")
                    .with("age", 20);
                let created = adapter.insert(record).await.unwrap();

                let id = created.id().expect("inserted record has an id").to_string();
                assert_ne!(id, "caller-chosen");
                assert_eq!(created.get_str("result"), Ok("created"));
                assert_eq!(created.get_str("name"), Ok("Leia"));

                let stored = adapter.find_by_id(&id).await.unwrap().unwrap();
                assert_eq!(stored.get_str("name"), Ok("Leia"));
                assert!(stored.get("result").is_none());
            }

            #[tokio::test]
            async fn test_concurrent_inserts() {
                let adapter = $factory;

                let inserts = (0..10).map(|i| {
                    adapter.insert(Record::new().with("name", format!("user{}", i)).with("age", i))
                });
                let created = futures::future::join_all(inserts).await;

                let mut ids: Vec<String> = created
                    .into_iter()
                    .map(|r| r.unwrap().id().unwrap().to_string())
                    .collect();
                ids.sort();
                ids.dedup();
                assert_eq!(ids.len(), 10);
                assert_eq!(adapter.count(&Filter::new()).await.unwrap(), 10);
            }

            #[tokio::test]
            async fn test_count() {
                let adapter = $factory;
                seed(&adapter).await;

                assert_eq!(adapter.count(&Filter::new()).await.unwrap(), 6);
                assert_eq!(
                    adapter
                        .count(&Filter::new().with_query($name_is_john))
                        .await
                        .unwrap(),
                    2
                );
                assert_eq!(
                    adapter
                        .count(&Filter::new().with_query($age_over_60))
                        .await
                        .unwrap(),
                    2
                );
            }

            #[tokio::test]
            async fn test_count_ignores_search() {
                let adapter = $factory;
                seed(&adapter).await;

                let filter = Filter::new().with_search("Peter").with_limit(1);
                assert_eq!(adapter.count(&filter).await.unwrap(), 6);
            }

            #[tokio::test]
            async fn test_remove_all() {
                let adapter = $factory;
                seed(&adapter).await;

                let summary = adapter.remove_all().await.unwrap();
                assert_eq!(summary.deleted, 6);
                assert_eq!(adapter.count(&Filter::new()).await.unwrap(), 0);
                assert!(adapter.find(&Filter::new()).await.unwrap().is_empty());
            }

            #[tokio::test]
            async fn test_remove_by_id() {
                let adapter = $factory;
                let stored = seed(&adapter).await;
                let id = stored[0].id().unwrap().to_string();

                adapter.remove_by_id(&id).await.unwrap();
                assert!(adapter.find_by_id(&id).await.unwrap().is_none());
                assert_eq!(adapter.count(&Filter::new()).await.unwrap(), 5);

                let err = adapter.remove_by_id(&id).await.unwrap_err();
                assert!(err.is_not_found(), "expected NotFound, got {err}");
            }
        }
    };
}
