//! Allocation fault injection.
//!
//! Every allocation point of the element store consults this module before it
//! allocates. A test arms a countdown with [`fail_after`]; once the countdown
//! runs out, the next allocation point reports [`Error::AllocFailed`] and the
//! countdown disarms itself, so each armed run sees at most one failure.
//!
//! The state is thread-local, so tests running on different threads do not
//! interfere with each other.
//!
//! ```
//! use bitreap::{fault, BiMap, Error};
//!
//! let mut map = BiMap::new();
//! map.insert(1, 2).unwrap();
//! fault::fail_after(0);
//! assert_eq!(map.insert(3, 4), Err(Error::AllocFailed));
//! assert_eq!(map.len(), 1);
//! ```

use crate::{Error, Result};
use std::cell::Cell;

thread_local! {
    static COUNTDOWN: Cell<Option<usize>> = Cell::new(None);
    static SUSPENDED: Cell<usize> = Cell::new(0);
    static INJECTED: Cell<bool> = Cell::new(false);
}

/// Lets the next `n` allocation points succeed, and makes the one after them fail.
pub fn fail_after(n: usize) {
    COUNTDOWN.with(|c| c.set(Some(n)));
    INJECTED.with(|i| i.set(false));
}

/// Disarms any pending failure.
pub fn reset() {
    COUNTDOWN.with(|c| c.set(None));
    INJECTED.with(|i| i.set(false));
}

/// Returns `true` if a failure was injected since the last [`fail_after`] or [`reset`].
pub fn was_injected() -> bool {
    INJECTED.with(Cell::get)
}

/// Called at every allocation point.
pub(crate) fn check() -> Result<()> {
    if SUSPENDED.with(Cell::get) > 0 {
        return Ok(());
    }
    COUNTDOWN.with(|c| match c.get() {
        None => Ok(()),
        Some(0) => {
            c.set(None);
            INJECTED.with(|i| i.set(true));
            Err(Error::AllocFailed)
        }
        Some(n) => {
            c.set(Some(n - 1));
            Ok(())
        }
    })
}

struct SuspendGuard;

impl Drop for SuspendGuard {
    fn drop(&mut self) {
        SUSPENDED.with(|s| s.set(s.get() - 1));
    }
}

/// Runs `f` with fault injection switched off. The countdown is left untouched,
/// so it resumes once `f` returns.
pub fn suspend<T, F: FnOnce() -> T>(f: F) -> T {
    SUSPENDED.with(|s| s.set(s.get() + 1));
    let _guard = SuspendGuard;
    f()
}

/// Reruns `f`, injecting a failure at allocation point `0`, then `1`, then `2`, and so on,
/// until `f` runs to completion without any failure being injected.
/// Returns the number of runs that saw an injected failure.
///
/// `f` is expected to propagate [`Error::AllocFailed`] with `?`.
/// Any other error, or an allocation failure that was not injected, panics.
pub fn faulty_run<F: FnMut() -> Result<()>>(mut f: F) -> usize {
    let mut failures = 0;
    loop {
        fail_after(failures);
        let res = f();
        let injected = was_injected();
        reset();
        match res {
            Ok(()) if !injected => return failures,
            Ok(()) => (),
            Err(Error::AllocFailed) if injected => (),
            Err(err) => panic!("unexpected error during faulty run: {}", err),
        }
        failures += 1;
    }
}

/// Runs `op` on `target`, and if it fails, asserts that `target` compares equal to a
/// snapshot taken before the call. The error is passed through.
pub fn guarded<T, R, F>(target: &mut T, op: F) -> Result<R>
where
    T: Clone + PartialEq + std::fmt::Debug,
    F: FnOnce(&mut T) -> Result<R>,
{
    let snapshot = suspend(|| target.clone());
    let res = op(target);
    if res.is_err() {
        suspend(|| assert_eq!(*target, snapshot, "a failed operation modified its target"));
    }
    res
}
