//! Lock helpers shared by the registry and the serialization context.
//!
//! A panic while a lock is held leaves plain configuration data behind,
//! which stays usable. These helpers take the guard back out of the
//! [`PoisonError`] instead of propagating the panic.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Takes a read lock, recovering the guard if the lock is poisoned.
#[inline]
pub fn read<T: ?Sized>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

/// Takes a write lock, recovering the guard if the lock is poisoned.
#[inline]
pub fn write<T: ?Sized>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, RwLock};

    #[test]
    fn poisoned_lock_is_recovered() {
        let lock = Arc::new(RwLock::new(1));
        let cloned = lock.clone();
        let _ = std::thread::spawn(move || {
            let _guard = cloned.write().unwrap();
            panic!("poison");
        })
        .join();

        assert!(lock.is_poisoned());
        *super::write(&lock) += 1;
        assert_eq!(*super::read(&lock), 2);
    }
}
