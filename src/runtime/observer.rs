use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::store::Subscription;

static NEXT_OBSERVER_ID: AtomicUsize = AtomicUsize::new(0);

// Observers currently rendering on this thread; the last one is current.
thread_local! {
    static OBSERVER_STACK: RefCell<Vec<Arc<ObserverInner>>> = const { RefCell::new(Vec::new()) };
}

/// Shareable wake signal handed to a subscribe function.
pub type Wake = Arc<dyn Fn() + Send + Sync>;

struct Slot {
    key: String,
    _subscription: Subscription,
}

pub(crate) struct ObserverInner {
    id: usize,
    on_wake: Box<dyn Fn() + Send + Sync>,
    stale: AtomicBool,
    wakes: AtomicUsize,
    cursor: AtomicUsize,
    rendering: AtomicBool,
    slots: Mutex<Vec<Slot>>,
}

impl ObserverInner {
    fn wake(&self) {
        self.stale.store(true, Ordering::SeqCst);
        self.wakes.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(observer = self.id, "observer woken");
        (self.on_wake)();
    }

    fn slots(&self) -> MutexGuard<'_, Vec<Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the next hook position of the current render.
    pub(crate) fn next_slot(&self) -> usize {
        self.cursor.fetch_add(1, Ordering::SeqCst)
    }

    /// True if `slot` already holds a subscription registered under `key`.
    pub(crate) fn slot_matches(&self, slot: usize, key: &str) -> bool {
        self.slots().get(slot).is_some_and(|s| s.key == key)
    }

    pub(crate) fn fill_slot(&self, slot: usize, key: &str, subscription: Subscription) {
        let entry = Slot {
            key: key.to_string(),
            _subscription: subscription,
        };
        let mut slots = self.slots();
        if slot < slots.len() {
            // Same hook position, different selector: the old
            // subscription is dropped here.
            slots[slot] = entry;
        } else {
            slots.push(entry);
        }
    }

    pub(crate) fn mark_stale(&self) {
        self.wake();
    }

    /// Wake signal that does not keep the observer alive.
    pub(crate) fn waker(self: &Arc<Self>) -> Wake {
        let weak: Weak<ObserverInner> = Arc::downgrade(self);
        Arc::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.wake();
            }
        })
    }
}

/// The consuming side of the store: something that reads slices during a
/// render and must be told when to render again.
///
/// Reads made with `get_store_data` inside [`Observer::render`] subscribe
/// this observer. Each read occupies a slot in call order, so a re-render
/// that reads the same selectors in the same order reuses its
/// subscriptions. Dropping the observer unsubscribes all of them.
///
/// # Examples
///
/// ```
/// use pathcan::{use_store, Observer, Settings, StoreProvider, Value, WriteOptions};
///
/// let provider = StoreProvider::new(Value::from(serde_json::json!({"n": 1})));
/// let view = Observer::new(|| {});
///
/// provider.mount(|| {
///     view.render(|| use_store()?.get_store_data("n", Settings::default()))
/// })
/// .unwrap();
/// // Activation wakes everything mounted so far.
/// assert_eq!(view.wake_count(), 1);
///
/// provider.store().set_store_data(2, "n", WriteOptions::default()).unwrap();
/// assert_eq!(view.wake_count(), 2);
/// assert!(view.is_stale());
/// ```
pub struct Observer {
    inner: Arc<ObserverInner>,
}

impl Observer {
    /// Create an observer. `on_wake` runs synchronously inside the notify
    /// that woke it.
    pub fn new<F>(on_wake: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(ObserverInner {
                id: NEXT_OBSERVER_ID.fetch_add(1, Ordering::SeqCst),
                on_wake: Box::new(on_wake),
                stale: AtomicBool::new(false),
                wakes: AtomicUsize::new(0),
                cursor: AtomicUsize::new(0),
                rendering: AtomicBool::new(false),
                slots: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn id(&self) -> usize {
        self.inner.id
    }

    /// Run `f` as this observer's render pass.
    ///
    /// Clears the stale flag. Slots not reached by this pass are released
    /// afterwards.
    ///
    /// Rendering again from inside a render of the same observer (an
    /// `on_wake` that re-renders on the spot) runs a nested pass over the
    /// same slots. The outer pass resumes at its own position afterwards,
    /// and only the outermost pass releases slots.
    pub fn render<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let resume_at = self.inner.cursor.swap(0, Ordering::SeqCst);
        let nested = self.inner.rendering.swap(true, Ordering::SeqCst);
        self.inner.stale.store(false, Ordering::SeqCst);

        OBSERVER_STACK.with(|stack| {
            stack.borrow_mut().push(Arc::clone(&self.inner));
        });

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

        OBSERVER_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });

        let used = self.inner.cursor.swap(resume_at, Ordering::SeqCst);
        if nested {
            tracing::trace!(observer = self.inner.id, used, resume_at, "nested render finished");
        } else {
            self.inner.rendering.store(false, Ordering::SeqCst);
        }

        match result {
            Ok(r) => {
                if !nested {
                    self.inner.slots().truncate(used);
                }
                r
            }
            Err(e) => std::panic::resume_unwind(e),
        }
    }

    /// Woken since the last render.
    pub fn is_stale(&self) -> bool {
        self.inner.stale.load(Ordering::SeqCst)
    }

    /// Total wakes received.
    pub fn wake_count(&self) -> usize {
        self.inner.wakes.load(Ordering::SeqCst)
    }

    /// Live subscriptions held by this observer.
    pub fn subscription_count(&self) -> usize {
        self.inner.slots().len()
    }

    /// The observer currently rendering on this thread, if any.
    pub(crate) fn current() -> Option<Arc<ObserverInner>> {
        OBSERVER_STACK.with(|stack| stack.borrow().last().cloned())
    }
}

impl Drop for Observer {
    fn drop(&mut self) {
        let released = {
            let mut slots = self.inner.slots();
            let n = slots.len();
            slots.clear();
            n
        };
        tracing::debug!(observer = self.inner.id, released, "observer unmounted");
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("id", &self.inner.id)
            .field("stale", &self.is_stale())
            .field("wakes", &self.wake_count())
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}
