pub mod logging;

use std::sync::{Mutex, MutexGuard};

/// Lock a mutex, recovering the guard if another thread panicked while holding it.
pub fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
