//! End-to-end tests of the model surface against the in-memory backend.

use bson::{doc, Bson, Document};
use docmodel::memory::MemoryStore;
use docmodel::prelude::*;

async fn open_model(name: &str) -> Model<MemoryStore> {
    Model::open(name, MemoryStore::new(), None)
        .await
        .unwrap()
}

/// Creates the calibration records [{test: 2}, {test: 1}, {test: 3}] and
/// returns the model.
async fn seeded_model() -> Model<MemoryStore> {
    let model = open_model("test").await;

    model
        .create(vec![doc! { "test": 2 }, doc! { "test": 1 }, doc! { "test": 3 }])
        .await
        .unwrap();

    model
}

fn test_values(records: &[Document]) -> Vec<i32> {
    records
        .iter()
        .map(|r| r.get_i32("test").unwrap())
        .collect()
}

#[tokio::test]
async fn create_assigns_keys_and_created_at() {
    let model = seeded_model().await;

    let records = model.find(FindOptions::new()).await.unwrap();
    assert_eq!(records.len(), 3);

    let mut keys = records
        .iter()
        .map(|r| r.get_str("_key").unwrap().to_string())
        .collect::<Vec<_>>();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), 3);

    // One batch shares a single createdAt stamp.
    let stamps = records
        .iter()
        .map(|r| r.get_i64("createdAt").unwrap())
        .collect::<Vec<_>>();
    assert!(stamps.iter().all(|s| *s == stamps[0]));
    assert!(stamps[0] > 0);
}

#[tokio::test]
async fn sort_directions_and_numeric_aliases_agree() {
    let model = seeded_model().await;

    let asc = model
        .find(FindOptions::new().sort("test ASC").unwrap())
        .await
        .unwrap();
    assert_eq!(test_values(&asc), vec![1, 2, 3]);

    let asc_numeric = model
        .find(FindOptions::new().sort("test 1").unwrap())
        .await
        .unwrap();
    assert_eq!(test_values(&asc_numeric), test_values(&asc));

    let desc = model
        .find(FindOptions::new().sort("test DESC").unwrap())
        .await
        .unwrap();
    assert_eq!(test_values(&desc), vec![3, 2, 1]);

    let desc_numeric = model
        .find(FindOptions::new().sort("test 0").unwrap())
        .await
        .unwrap();
    assert_eq!(test_values(&desc_numeric), test_values(&desc));
}

#[tokio::test]
async fn unsorted_find_returns_insertion_order() {
    let model = seeded_model().await;

    let records = model.find(FindOptions::new()).await.unwrap();
    assert_eq!(test_values(&records), vec![2, 1, 3]);
}

#[tokio::test]
async fn filter_operators_select_expected_records() {
    let model = seeded_model().await;

    let cases = [
        ("test == 2", vec![2]),
        ("test != 2", vec![1, 3]),
        ("test > 2", vec![3]),
        ("test >= 2", vec![2, 3]),
        ("test < 2", vec![1]),
        ("test <= 2", vec![1, 2]),
    ];

    for (expr, expected) in cases {
        let records = model
            .find(
                FindOptions::new()
                    .filter(expr)
                    .unwrap()
                    .sort("test ASC")
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(test_values(&records), expected, "filter {expr:?}");
    }
}

#[tokio::test]
async fn like_filter_matches_string_patterns() {
    let model = open_model("test").await;

    model
        .create(vec![
            doc! { "test": "qwe123" },
            doc! { "test": "qwe321" },
            doc! { "test": "qwe312" },
        ])
        .await
        .unwrap();

    let records = model
        .find(FindOptions::new().filter("test LIKE qwe3%").unwrap())
        .await
        .unwrap();

    let values = records
        .iter()
        .map(|r| r.get_str("test").unwrap())
        .collect::<Vec<_>>();
    assert_eq!(values, vec!["qwe321", "qwe312"]);
}

#[tokio::test]
async fn find_by_matches_example_within_limit() {
    let model = open_model("test").await;

    model
        .create(vec![
            doc! { "kind": "a", "n": 1 },
            doc! { "kind": "a", "n": 2 },
            doc! { "kind": "b", "n": 3 },
        ])
        .await
        .unwrap();

    let all = model.find_by(doc! { "kind": "a" }, 100).await.unwrap();
    assert_eq!(all.len(), 2);

    let limited = model.find_by(doc! { "kind": "a" }, 1).await.unwrap();
    assert_eq!(limited.len(), 1);

    let none = model.find_by(doc! { "kind": "c" }, 100).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn find_by_defaults_to_one_hundred_records() {
    let model = open_model("test").await;

    model
        .create(
            (0..120)
                .map(|n| doc! { "kind": "a", "n": n })
                .collect::<Vec<_>>(),
        )
        .await
        .unwrap();

    let records = model.find_by(doc! { "kind": "a" }, None).await.unwrap();
    assert_eq!(records.len(), 100);
}

#[tokio::test]
async fn find_one_applies_filter_sort_and_skip() {
    let model = seeded_model().await;

    let first = model
        .find_one(FindOptions::new().sort("test ASC").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.get_i32("test").unwrap(), 1);

    let second = model
        .find_one(FindOptions::new().sort("test ASC").unwrap().skip(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.get_i32("test").unwrap(), 2);

    let filtered = model
        .find_one(FindOptions::new().filter("test > 2").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(filtered.get_i32("test").unwrap(), 3);

    let missing = model
        .find_one(FindOptions::new().filter("test > 99").unwrap())
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn get_fetches_by_key() {
    let model = seeded_model().await;

    let record = model
        .find_one(FindOptions::new().filter("test == 2").unwrap())
        .await
        .unwrap()
        .unwrap();
    let key = record.get_str("_key").unwrap();

    let fetched = model.get(key).await.unwrap().unwrap();
    assert_eq!(fetched.get_i32("test").unwrap(), 2);

    assert!(model.get("absent").await.unwrap().is_none());
}

#[tokio::test]
async fn update_by_key_merges_and_stamps_updated_at() {
    let model = seeded_model().await;

    let record = model
        .find_one(FindOptions::new().filter("test == 1").unwrap())
        .await
        .unwrap()
        .unwrap();
    let key = record.get_str("_key").unwrap().to_string();
    let created_at = record.get_i64("createdAt").unwrap();

    let updated_count = model
        .update(Update::ByKey {
            key: key.clone(),
            new_value: doc! { "test": 9, "extra": true },
        })
        .await
        .unwrap();
    assert_eq!(updated_count, 1);

    let updated = model.get(&key).await.unwrap().unwrap();
    assert_eq!(updated.get_i32("test").unwrap(), 9);
    assert!(updated.get_bool("extra").unwrap());
    assert_eq!(updated.get_i64("createdAt").unwrap(), created_at);
    assert!(updated.get_i64("updatedAt").unwrap() >= created_at);
}

#[tokio::test]
async fn bulk_update_writes_every_record() {
    let model = seeded_model().await;

    let updates = model
        .find(FindOptions::new())
        .await
        .unwrap()
        .into_iter()
        .map(|mut record| {
            let bumped = record.get_i32("test").unwrap() + 10;
            record.insert("test", bumped);
            record
        })
        .collect::<Vec<_>>();

    let updated_count = model.update(Update::Bulk(updates)).await.unwrap();
    assert_eq!(updated_count, 3);

    let records = model
        .find(FindOptions::new().sort("test ASC").unwrap())
        .await
        .unwrap();
    assert_eq!(test_values(&records), vec![11, 12, 13]);
    assert!(records
        .iter()
        .all(|r| r.get_i64("updatedAt").is_ok()));
}

#[tokio::test]
async fn update_by_example_reports_matched_count() {
    let model = open_model("test").await;

    model
        .create(vec![
            doc! { "kind": "a", "n": 1 },
            doc! { "kind": "a", "n": 2 },
            doc! { "kind": "b", "n": 3 },
        ])
        .await
        .unwrap();

    let updated = model
        .update(Update::ByExample {
            example: doc! { "kind": "a" },
            new_value: doc! { "n": 0 },
        })
        .await
        .unwrap();
    assert_eq!(updated, 2);

    let zeroed = model
        .count(FindOptions::new().filter("n == 0").unwrap())
        .await
        .unwrap();
    assert_eq!(zeroed, 2);
}

#[tokio::test]
async fn delete_variants_remove_expected_records() {
    let model = seeded_model().await;

    let record = model
        .find_one(FindOptions::new().filter("test == 2").unwrap())
        .await
        .unwrap()
        .unwrap();
    let key = record.get_str("_key").unwrap().to_string();

    let removed = model.delete(Delete::ByKey(key)).await.unwrap();
    assert_eq!(removed, 1);
    assert_eq!(model.count(FindOptions::new()).await.unwrap(), 2);

    let keys = model
        .find(FindOptions::new())
        .await
        .unwrap()
        .iter()
        .map(|r| r.get_str("_key").unwrap().to_string())
        .collect::<Vec<_>>();

    let removed = model.delete(Delete::ByKeys(keys)).await.unwrap();
    assert_eq!(removed, 2);
    assert_eq!(model.count(FindOptions::new()).await.unwrap(), 0);
}

#[tokio::test]
async fn delete_by_example_and_delete_all() {
    let model = open_model("test").await;

    model
        .create(vec![
            doc! { "kind": "a" },
            doc! { "kind": "a" },
            doc! { "kind": "b" },
        ])
        .await
        .unwrap();

    let removed = model
        .delete(Delete::ByExample(doc! { "kind": "a" }))
        .await
        .unwrap();
    assert_eq!(removed, 2);
    assert_eq!(model.count(FindOptions::new()).await.unwrap(), 1);

    model.delete_all().await.unwrap();
    assert_eq!(model.count(FindOptions::new()).await.unwrap(), 0);

    // The collection survives a full truncation.
    model.create(doc! { "kind": "c" }).await.unwrap();
    assert_eq!(model.count(FindOptions::new()).await.unwrap(), 1);
}

#[tokio::test]
async fn count_with_and_without_filters() {
    let model = seeded_model().await;

    assert_eq!(model.count(FindOptions::new()).await.unwrap(), 3);

    let filtered = model
        .count(FindOptions::new().filter("test == 2").unwrap())
        .await
        .unwrap();
    assert_eq!(filtered, 1);

    // Sort and window settings do not affect the count.
    let windowed = model
        .count(
            FindOptions::new()
                .filter("test >= 1")
                .unwrap()
                .sort("test DESC")
                .unwrap()
                .skip(2)
                .limit(1),
        )
        .await
        .unwrap();
    assert_eq!(windowed, 3);
}

#[tokio::test]
async fn pagination_windows_partition_sorted_results() {
    let model = open_model("test").await;

    model
        .create((0..10).map(|n| doc! { "n": n }).collect::<Vec<_>>())
        .await
        .unwrap();

    let sorted = |skip| {
        FindOptions::new()
            .sort("n ASC")
            .unwrap()
            .skip(skip)
            .limit(4)
    };

    let first = model.find(sorted(0)).await.unwrap();
    let second = model.find(sorted(4)).await.unwrap();
    let third = model.find(sorted(8)).await.unwrap();

    let values = |records: &[Document]| {
        records
            .iter()
            .map(|r| r.get_i32("n").unwrap())
            .collect::<Vec<_>>()
    };

    assert_eq!(values(&first), vec![0, 1, 2, 3]);
    assert_eq!(values(&second), vec![4, 5, 6, 7]);
    assert_eq!(values(&third), vec![8, 9]);
}

#[tokio::test]
async fn schema_validates_and_coerces_on_create() {
    let schema = Schema::new()
        .required_field("s", FieldType::String)
        .field("n", FieldType::Number)
        .field("o", FieldType::Object)
        .field("a", FieldType::Array);

    let model = Model::open("test", MemoryStore::new(), Some(schema))
        .await
        .unwrap();

    model
        .create(doc! {
            "s": "hello",
            "n": "1234",
            "o": { "nested": true },
            "a": [1, 2, 3],
        })
        .await
        .unwrap();

    let record = model.find_one(FindOptions::new()).await.unwrap().unwrap();
    // Numeric strings are converted to numbers by validation.
    assert_eq!(record.get("n"), Some(&Bson::Double(1234.0)));

    let err = model
        .create(doc! { "n": 5 })
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::Validation { .. }));

    let err = model
        .create(doc! { "s": "x", "unknown": 1 })
        .await
        .unwrap_err();
    match err {
        ModelError::Validation { violations } => {
            assert!(violations[0].contains("not allowed"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }

    // Nothing from the failed batches was committed.
    assert_eq!(model.count(FindOptions::new()).await.unwrap(), 1);
}

#[tokio::test]
async fn schema_validates_updates() {
    let schema = Schema::new().field("n", FieldType::Number);
    let model = Model::open("test", MemoryStore::new(), Some(schema))
        .await
        .unwrap();

    model.create(doc! { "n": 1 }).await.unwrap();

    let err = model
        .update(Update::ByExample {
            example: doc! { "n": 1 },
            new_value: doc! { "n": "not a number" },
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::Validation { .. }));

    let record = model.find_one(FindOptions::new()).await.unwrap().unwrap();
    let mut bulk = record.clone();
    bulk.insert("bogus", true);

    let err = model.update(Update::Bulk(vec![bulk])).await.unwrap_err();
    assert!(matches!(err, ModelError::Validation { .. }));

    // By-key updates are raw patches and skip the schema.
    let key = record.get_str("_key").unwrap().to_string();
    model
        .update(Update::ByKey { key, new_value: doc! { "note": "patched" } })
        .await
        .unwrap();
}

#[tokio::test]
async fn zero_operand_compares_numerically() {
    let model = open_model("test").await;

    model
        .create(vec![doc! { "test": 0 }, doc! { "test": 1 }])
        .await
        .unwrap();

    let zeros = model
        .find(FindOptions::new().filter("test == 0").unwrap())
        .await
        .unwrap();
    assert_eq!(zeros.len(), 1);
    assert_eq!(zeros[0].get_i32("test").unwrap(), 0);
}

#[tokio::test]
async fn malformed_expressions_fail_before_any_store_call() {
    assert!(matches!(
        FindOptions::new().filter("test >"),
        Err(ModelError::InvalidExpression(_))
    ));
    assert!(matches!(
        FindOptions::new().filter("test ~= 2"),
        Err(ModelError::UnsupportedOperator(_))
    ));
    assert!(matches!(
        FindOptions::new().sort("test SIDEWAYS"),
        Err(ModelError::InvalidSortDirection(_))
    ));
}

#[tokio::test]
async fn open_rejects_invalid_collection_names() {
    let store = MemoryStore::new();

    let err = Model::open("bad name", store, None).await.unwrap_err();
    assert!(matches!(err, ModelError::InvalidExpression(_)));
}

#[tokio::test]
async fn models_share_a_cloned_store() {
    let store = MemoryStore::new();

    let writer = Model::open("test", store.clone(), None).await.unwrap();
    let reader = Model::open("test", store, None).await.unwrap();

    writer.create(doc! { "test": 1 }).await.unwrap();

    assert_eq!(reader.count(FindOptions::new()).await.unwrap(), 1);
}
