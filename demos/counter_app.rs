//! Counter application: two views reading different slices of one store

use pathcan::{use_store, Observer, Settings, StoreProvider, Value, WriteOptions};
use serde_json::json;
use tracing_subscriber::EnvFilter;

fn render(view: &Observer, name: &str, selector: &str) -> pathcan::Result<()> {
    let value = view.render(|| use_store()?.get_store_data(selector, Settings::default()))?;
    let shown = value.map_or_else(|| "<missing>".to_string(), |v| v.to_string());
    println!("   [{name}] {selector} = {shown}");
    Ok(())
}

fn main() -> pathcan::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Counter Application ===\n");

    println!("1. Creating the provider");
    let provider = StoreProvider::new(Value::from(json!({
        "counter": {"count": 0, "step": 1},
        "history": [0],
        "profile": {"name": "guest"}
    })));

    let counter_view = Observer::new(|| {});
    let profile_view = Observer::new(|| {});

    println!("\n2. Mounting views");
    provider.mount(|| -> pathcan::Result<()> {
        render(&counter_view, "counter", "counter.count")?;
        render(&profile_view, "profile", "profile.name")?;
        Ok(())
    })?;
    println!(
        "   wakes after activation: counter={}, profile={}",
        counter_view.wake_count(),
        profile_view.wake_count()
    );

    provider.scope(|| -> pathcan::Result<()> {
        let store = use_store()?;

        println!("\n3. Incrementing three times");
        for _ in 0..3 {
            let step = store
                .get_store_data("counter.step", Settings::default())?
                .and_then(|v| v.as_i64())
                .unwrap_or(1);
            store.update_store_data(
                |prev| Value::from(prev.and_then(Value::as_i64).unwrap_or(0) + step),
                "counter.count",
                WriteOptions::default(),
            )?;
            if counter_view.is_stale() {
                render(&counter_view, "counter", "counter.count")?;
            }
        }

        println!("\n4. Changing step size to 5 (silently)");
        store.set_store_data(5, "counter.step", WriteOptions::silent())?;
        store.update_store_data(
            |prev| Value::from(prev.and_then(Value::as_i64).unwrap_or(0) + 5),
            "counter.count",
            WriteOptions::default(),
        )?;
        render(&counter_view, "counter", "counter.count")?;

        println!("\n5. Renaming the profile");
        store.set_store_data("ada", "profile.name", WriteOptions::default())?;
        println!(
            "   stale: counter={}, profile={}",
            counter_view.is_stale(),
            profile_view.is_stale()
        );
        render(&profile_view, "profile", "profile.name")?;

        println!("\n6. Forcing a refresh of the counter subtree");
        let report = store.update_with_selector("counter")?;
        println!("   woken: {}", report.woken);

        println!("\n7. Final graph:");
        println!("   {}", store.core().get());
        Ok(())
    })?;

    println!(
        "\nTotal wakes: counter={}, profile={}",
        counter_view.wake_count(),
        profile_view.wake_count()
    );
    println!("\n✓ Counter application complete!");
    Ok(())
}
