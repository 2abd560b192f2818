//! Integration tests for Pathcan

use serde_json::json;
use std::sync::{Arc, Mutex};

use pathcan::{
    use_store, Observer, Result, Settings, StoreConfig, StoreError, StoreProvider, Value,
    WriteOptions,
};

/// Render `observer` reading `selector` from the scoped store.
fn render_read(observer: &Observer, selector: &str, settings: Settings) -> Result<Option<Value>> {
    observer.render(|| use_store()?.get_store_data(selector, settings))
}

#[test]
fn sibling_write_wakes_only_matching_observer() {
    let provider = StoreProvider::new(Value::from(json!({"a": {"b": 1, "c": 2}})));
    let x = Observer::new(|| {});
    let y = Observer::new(|| {});

    provider.mount(|| {
        render_read(&x, "a.b", Settings::default()).unwrap();
        render_read(&y, "a.c", Settings::default()).unwrap();
    });
    assert_eq!(x.wake_count(), 1);
    assert_eq!(y.wake_count(), 1);

    provider.scope(|| {
        let store = use_store().unwrap();
        store.set_store_data(99, "a.b", WriteOptions::default()).unwrap();

        assert_eq!(x.wake_count(), 2);
        assert_eq!(y.wake_count(), 1);
        assert_eq!(render_read(&x, "a.b", Settings::default()).unwrap(), Some(Value::from(99)));
        assert_eq!(render_read(&y, "a.c", Settings::default()).unwrap(), Some(Value::from(2)));
    });
}

#[test]
fn provider_activation_wakes_every_mounted_observer_once() {
    let provider = StoreProvider::new(Value::from(json!({"data1": "x", "data3": {"data2": {}}})));
    let observers: Vec<Observer> = (0..3).map(|_| Observer::new(|| {})).collect();
    let selectors = ["data1", "data3.data2.data1", ""];

    provider.mount(|| {
        for (observer, selector) in observers.iter().zip(selectors) {
            render_read(observer, selector, Settings::default()).unwrap();
        }
    });

    assert!(provider.is_initialized());
    for observer in &observers {
        assert_eq!(observer.wake_count(), 1);
    }

    // Re-mounting the same provider does not fire again.
    provider.mount(|| {});
    for observer in &observers {
        assert_eq!(observer.wake_count(), 1);
    }
}

#[test]
fn silent_functional_update_wakes_nobody() {
    let provider = StoreProvider::new(Value::from(json!({"counter": 1})));
    provider.activate();
    let watcher = Observer::new(|| {});

    provider.scope(|| {
        render_read(&watcher, "counter", Settings::default()).unwrap();
        let store = use_store().unwrap();
        store
            .update_store_data(
                |prev| Value::from(prev.and_then(Value::as_i64).unwrap_or(0) + 1),
                "counter",
                WriteOptions::silent(),
            )
            .unwrap();

        assert_eq!(watcher.wake_count(), 0);
        assert_eq!(
            store.get_store_data("counter", Settings::default()).unwrap(),
            Some(Value::from(2))
        );
    });
}

#[test]
fn ancestor_and_descendant_writes_cross_wake() {
    let provider = StoreProvider::new(Value::from(json!({"a": {"b": {"c": 1}}, "z": 0})));
    provider.activate();
    let leaf = Observer::new(|| {});
    let branch = Observer::new(|| {});
    let other = Observer::new(|| {});

    provider.scope(|| {
        render_read(&leaf, "a.b.c", Settings::default()).unwrap();
        render_read(&branch, "a", Settings::default()).unwrap();
        render_read(&other, "z", Settings::default()).unwrap();

        let store = use_store().unwrap();
        store
            .set_store_data(Value::from(json!({"c": 5})), "a.b", WriteOptions::default())
            .unwrap();
    });

    assert_eq!(leaf.wake_count(), 1);
    assert_eq!(branch.wake_count(), 1);
    assert_eq!(other.wake_count(), 0);
}

#[test]
fn force_setting_wakes_on_unrelated_writes() {
    let provider = StoreProvider::empty();
    provider.activate();
    let forced = Observer::new(|| {});

    provider.scope(|| {
        render_read(&forced, "a", Settings::force()).unwrap();
        use_store()
            .unwrap()
            .set_store_data(1, "unrelated", WriteOptions::default())
            .unwrap();
    });

    assert_eq!(forced.wake_count(), 1);
}

#[test]
fn update_with_selector_refreshes_without_changing_data() {
    let provider = StoreProvider::new(Value::from(json!({"a": {"b": 1}, "c": 2})));
    provider.activate();
    let ab = Observer::new(|| {});
    let c = Observer::new(|| {});

    provider.scope(|| {
        render_read(&ab, "a.b", Settings::default()).unwrap();
        render_read(&c, "c", Settings::default()).unwrap();

        let store = use_store().unwrap();
        let version = store.core().version();
        let report = store.update_with_selector("a").unwrap();

        assert_eq!(report.woken, 1);
        assert_eq!(store.core().version(), version);
    });

    assert_eq!(ab.wake_count(), 1);
    assert_eq!(c.wake_count(), 0);
}

#[test]
fn unmounted_observer_is_not_woken() {
    let provider = StoreProvider::new(Value::from(json!({"a": 1})));
    provider.activate();
    let hits = Arc::new(Mutex::new(0));
    let hits_clone = Arc::clone(&hits);
    let observer = Observer::new(move || {
        *hits_clone.lock().unwrap() += 1;
    });

    provider.scope(|| {
        render_read(&observer, "a", Settings::default()).unwrap();
        assert_eq!(use_store().unwrap().core().subscriber_count(), 1);

        drop(observer);
        let store = use_store().unwrap();
        assert_eq!(store.core().subscriber_count(), 0);
        store.set_store_data(2, "a", WriteOptions::default()).unwrap();
    });

    assert_eq!(*hits.lock().unwrap(), 0);
}

#[test]
fn woken_observer_rerenders_from_callback() {
    let provider = StoreProvider::new(Value::from(json!({"n": 0})));
    provider.activate();
    let seen = Arc::new(Mutex::new(Vec::new()));

    // The host re-reads the slice as soon as it is woken.
    let store = provider.store();
    let seen_clone = Arc::clone(&seen);
    let observer = Observer::new(move || {
        let value = store.get_store_data("n", Settings::default()).unwrap();
        seen_clone.lock().unwrap().push(value);
    });

    provider.scope(|| {
        render_read(&observer, "n", Settings::default()).unwrap();
        let store = use_store().unwrap();
        for i in 1..=3 {
            store.set_store_data(i, "n", WriteOptions::default()).unwrap();
        }
    });

    let seen = seen.lock().unwrap();
    assert_eq!(
        *seen,
        vec![
            Some(Value::from(1)),
            Some(Value::from(2)),
            Some(Value::from(3))
        ]
    );
}

#[test]
fn panicking_observer_does_not_block_others_or_writer() {
    let provider = StoreProvider::new(Value::from(json!({"a": 0})));
    provider.activate();
    let bad = Observer::new(|| panic!("render host crashed"));
    let good = Observer::new(|| {});

    provider.scope(|| {
        render_read(&bad, "a", Settings::default()).unwrap();
        render_read(&good, "a", Settings::default()).unwrap();

        let store = use_store().unwrap();
        store.set_store_data(1, "a", WriteOptions::default()).unwrap();
        assert_eq!(
            store.get_store_data("a", Settings::default()).unwrap(),
            Some(Value::from(1))
        );
    });

    assert_eq!(good.wake_count(), 1);
}

#[test]
fn scope_missing_is_reported() {
    let observer = Observer::new(|| {});
    let result = render_read(&observer, "a", Settings::default());
    assert!(matches!(result, Err(StoreError::ScopeMissing)));
}

#[test]
fn sibling_providers_do_not_share_state() {
    let left = StoreProvider::new(Value::from(json!({"v": "left"})));
    let right = StoreProvider::new(Value::from(json!({"v": "right"})));
    left.activate();
    right.activate();
    let watcher = Observer::new(|| {});

    left.scope(|| render_read(&watcher, "v", Settings::default()).unwrap());
    right.scope(|| {
        use_store()
            .unwrap()
            .set_store_data("changed", "v", WriteOptions::default())
            .unwrap();
    });

    assert_eq!(watcher.wake_count(), 0);
    assert_eq!(
        left.store().get_store_data("v", Settings::default()).unwrap(),
        Some(Value::from("left"))
    );
}

#[test]
fn initialization_guard_rejects_early_writes() {
    let config = StoreConfig {
        guard_writes_before_init: true,
        ..StoreConfig::default()
    };
    let provider = StoreProvider::with_config(Value::object(), config);

    let early = provider.scope(|| {
        use_store()
            .unwrap()
            .set_store_data(1, "a", WriteOptions::default())
    });
    assert!(matches!(early, Err(StoreError::Uninitialized { .. })));

    provider.activate();
    provider
        .store()
        .set_store_data(1, "a", WriteOptions::default())
        .unwrap();
    assert_eq!(provider.store().core().get().to_json(), json!({"a": 1}));
}

#[test]
fn structural_sharing_across_writes() {
    let provider = StoreProvider::new(Value::from(json!({
        "array1": ["el1", "el2", "el3"],
        "data2": {"data1": "data2-1"},
        "data3": {"data1": "data3-1", "data2": {"data1": "data3-2-1"}}
    })));
    let store = provider.store();
    let before = store.core().get();

    store
        .set_store_data("new", "data3.data2.data1", WriteOptions::default())
        .unwrap();
    let after = store.core().get();

    assert!(Value::ptr_eq(before.get("array1").unwrap(), after.get("array1").unwrap()));
    assert!(Value::ptr_eq(before.get("data2").unwrap(), after.get("data2").unwrap()));
    assert!(!Value::ptr_eq(before.get("data3").unwrap(), after.get("data3").unwrap()));
    assert_eq!(
        after.get("data3").and_then(|d| d.get("data1")),
        Some(&Value::from("data3-1"))
    );
}
