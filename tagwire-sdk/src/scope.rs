//! The per-thread current-context slot.
//!
//! Every thread carries its own slot, lazily initialized to the empty
//! context. Reads are point-in-time snapshots; installing a context is
//! scoped through an RAII guard that restores the previous value on drop.
//! Because the slot is `thread_local!`, no synchronization exists or is
//! needed, and no thread can observe or mutate another thread's context.

use std::cell::RefCell;
use std::marker::PhantomData;

use tagwire_types::TagContext;

thread_local! {
    static CURRENT: RefCell<TagContext> = RefCell::new(TagContext::empty());
}

/// Snapshot of the calling thread's current tag context.
///
/// Before any [`attach`] on this thread, this is [`TagContext::empty`].
/// The returned value is a snapshot: later attaches on this thread do not
/// change it.
pub fn current() -> TagContext {
    CURRENT.with(|slot| slot.borrow().clone())
}

/// Install `context` as the calling thread's current context.
///
/// Returns a guard that restores the previously current context when
/// dropped. Guards nest: attaching inside an attached scope works, as
/// long as guards are dropped in reverse order (which scoping gives you
/// for free).
///
/// # Example
///
/// ```rust
/// use tagwire_sdk::{attach, current, TagContext};
///
/// let ctx = TagContext::builder().insert("request", "42").build();
/// {
///     let _guard = attach(ctx.clone());
///     assert_eq!(current(), ctx);
/// }
/// assert_eq!(current(), TagContext::empty());
/// ```
#[must_use = "dropping the guard restores the previous context immediately"]
pub fn attach(context: TagContext) -> ScopeGuard {
    let previous = CURRENT.with(|slot| slot.replace(context));
    ScopeGuard {
        previous: Some(previous),
        // The guard must drop on the thread it was created on.
        _not_send: PhantomData,
    }
}

/// Restores the previously current context when dropped.
///
/// Not `Send`: the guard has to be dropped on the thread whose slot it
/// will restore.
#[derive(Debug)]
pub struct ScopeGuard {
    previous: Option<TagContext>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            CURRENT.with(|slot| {
                *slot.borrow_mut() = previous;
            });
        }
    }
}
