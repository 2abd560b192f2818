//! Adapter between "subscribe + read current value" and an [`Observer`].

use super::observer::{Observer, Wake};
use crate::store::Subscription;

/// Read a snapshot and keep the rendering observer subscribed to it.
///
/// `key` identifies what `subscribe` registers for. On the first render
/// (or when the key at this hook position changes) `subscribe` is called
/// with the observer's wake signal. The snapshot is read both before and
/// after subscribing; a change in between means a write landed in the
/// gap, and the observer is marked stale immediately so the host renders
/// again instead of showing the older value.
///
/// Outside a render, this is just `get_snapshot()`.
pub fn subscribe_snapshot<T, S, G>(key: &str, subscribe: S, get_snapshot: G) -> T
where
    T: PartialEq,
    S: FnOnce(Wake) -> Subscription,
    G: Fn() -> T,
{
    let Some(observer) = Observer::current() else {
        return get_snapshot();
    };

    let slot = observer.next_slot();
    if observer.slot_matches(slot, key) {
        return get_snapshot();
    }

    let before = get_snapshot();
    let subscription = subscribe(observer.waker());
    observer.fill_slot(slot, key, subscription);

    let after = get_snapshot();
    if after != before {
        tracing::debug!(slot, key, "snapshot changed while subscribing");
        observer.mark_stale();
    }
    after
}
