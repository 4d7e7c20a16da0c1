//! Poison-tolerant `RwLock` access
//!
//! A panic inside a processor or builder must not wedge the tree or forest
//! it ran under, so a poisoned lock hands back its guard as-is.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic;

    #[test]
    fn test_poisoned_lock_stays_usable() {
        let lock = RwLock::new(1);
        let _ = panic::catch_unwind(|| {
            let _guard = lock.write().unwrap();
            panic!("poison");
        });
        assert!(lock.is_poisoned());

        *write(&lock) += 1;
        assert_eq!(*read(&lock), 2);
    }
}
