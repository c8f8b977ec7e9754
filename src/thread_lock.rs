/*
 * Process-wide gate for state shared between message loops.
 *
 * In `ThreadingMode::SingleThread` every helper here is a no-op. In
 * `ThreadingMode::MultiThread` each message-loop thread holds the global
 * message-loop lock while it touches shared window state and drops it around
 * blocking calls with `run_unlocked`.
 *
 * Guards wrap a `MutexGuard` and are therefore `!Send`: a lock taken on a
 * thread is released on that same thread.
 */
use crate::types::ThreadingMode;

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

static MULTI_THREAD: AtomicBool = AtomicBool::new(false);
static MSG_LOOP_MUTEX: Mutex<()> = Mutex::new(());

thread_local! {
    static ENTERED: Cell<bool> = const { Cell::new(false) };
}

pub fn set_threading_mode(mode: ThreadingMode) {
    log::debug!("ThreadLock: threading mode set to {mode:?}");
    MULTI_THREAD.store(mode == ThreadingMode::MultiThread, Ordering::SeqCst);
}

pub fn threading_mode() -> ThreadingMode {
    if MULTI_THREAD.load(Ordering::SeqCst) {
        ThreadingMode::MultiThread
    } else {
        ThreadingMode::SingleThread
    }
}

fn acquire() -> MutexGuard<'static, ()> {
    MSG_LOOP_MUTEX.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
pub struct ThreadLockGuard {
    guard: Option<MutexGuard<'static, ()>>,
}

impl ThreadLockGuard {
    pub fn is_held(&self) -> bool {
        self.guard.is_some()
    }

    /*
     * Runs `f` with the lock released and takes it back afterwards, also when
     * `f` unwinds. Without a held lock this simply runs `f`.
     */
    pub fn run_unlocked<R>(&mut self, f: impl FnOnce() -> R) -> R {
        let Some(guard) = self.guard.take() else {
            return f();
        };
        drop(guard);

        struct Relock<'a>(&'a mut Option<MutexGuard<'static, ()>>);

        impl Drop for Relock<'_> {
            fn drop(&mut self) {
                *self.0 = Some(acquire());
            }
        }

        let _relock = Relock(&mut self.guard);
        f()
    }
}

/// Takes the message-loop lock when running in multi-thread mode.
pub fn lock_thread() -> ThreadLockGuard {
    let guard = (threading_mode() == ThreadingMode::MultiThread).then(acquire);
    ThreadLockGuard { guard }
}

/*
 * A message-loop thread that has entered the shared context. Dropping it
 * releases the lock and allows the thread to enter again later.
 */
#[derive(Debug)]
pub struct ThreadEntry {
    lock: ThreadLockGuard,
}

impl ThreadEntry {
    pub fn run_unlocked<R>(&mut self, f: impl FnOnce() -> R) -> R {
        self.lock.run_unlocked(f)
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_held()
    }
}

impl Drop for ThreadEntry {
    fn drop(&mut self) {
        self.lock.guard = None;
        ENTERED.with(|entered| entered.set(false));
        log::trace!("ThreadLock: left message-loop context");
    }
}

/*
 * Pins the calling thread into the shared message-loop context.
 * Only valid in multi-thread mode, and at most once per thread at a time;
 * anything else is a caller defect and panics.
 */
pub fn enter_thread() -> ThreadEntry {
    if threading_mode() != ThreadingMode::MultiThread {
        log::error!("ThreadLock: enter_thread called outside multi-thread mode");
        panic!("windowgroups: enter_thread() is only valid in multi-thread mode");
    }
    if ENTERED.with(|entered| entered.replace(true)) {
        log::error!("ThreadLock: enter_thread called twice on the same thread");
        panic!("windowgroups: thread already entered the message-loop context");
    }
    log::trace!("ThreadLock: entered message-loop context");
    ThreadEntry {
        lock: ThreadLockGuard {
            guard: Some(acquire()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::mpsc::channel;
    use std::thread;
    use std::time::Duration;

    // The mode flag and lock are process-wide; these tests must not interleave.
    static SERIAL: Mutex<()> = Mutex::new(());

    fn serial() -> MutexGuard<'static, ()> {
        SERIAL.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[test]
    fn test_single_thread_mode_lock_is_a_no_op() {
        let _serial = serial();
        set_threading_mode(ThreadingMode::SingleThread);

        let mut guard = lock_thread();
        assert!(!guard.is_held());
        assert_eq!(guard.run_unlocked(|| 5), 5);
        assert!(!guard.is_held());
    }

    #[test]
    #[should_panic(expected = "only valid in multi-thread mode")]
    fn test_enter_thread_outside_multi_thread_mode_is_fatal() {
        let _serial = serial();
        set_threading_mode(ThreadingMode::SingleThread);
        let _entry = enter_thread();
    }

    #[test]
    fn test_enter_thread_excludes_other_threads() {
        let _serial = serial();
        set_threading_mode(ThreadingMode::MultiThread);

        let entry = enter_thread();
        assert!(entry.is_locked());
        assert!(MSG_LOOP_MUTEX.try_lock().is_err());

        let (tx, rx) = channel();
        let waiter = thread::spawn(move || {
            let guard = lock_thread();
            tx.send(guard.is_held()).unwrap();
        });
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

        drop(entry);
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(true));
        waiter.join().unwrap();
        set_threading_mode(ThreadingMode::SingleThread);
    }

    #[test]
    fn test_run_unlocked_releases_and_reacquires() {
        let _serial = serial();
        set_threading_mode(ThreadingMode::MultiThread);

        let mut entry = enter_thread();
        let other_got_lock = entry.run_unlocked(|| {
            thread::spawn(|| lock_thread().is_held()).join().unwrap()
        });
        assert!(other_got_lock);
        assert!(entry.is_locked());
        assert!(MSG_LOOP_MUTEX.try_lock().is_err());

        drop(entry);
        set_threading_mode(ThreadingMode::SingleThread);
    }

    #[test]
    fn test_run_unlocked_reacquires_after_panic() {
        let _serial = serial();
        set_threading_mode(ThreadingMode::MultiThread);

        let mut entry = enter_thread();
        let result = catch_unwind(AssertUnwindSafe(|| {
            let _: () = entry.run_unlocked(|| panic!("callout failed"));
        }));
        assert!(result.is_err());
        assert!(entry.is_locked());

        drop(entry);
        set_threading_mode(ThreadingMode::SingleThread);
    }

    #[test]
    fn test_thread_can_enter_again_after_leaving() {
        let _serial = serial();
        set_threading_mode(ThreadingMode::MultiThread);

        drop(enter_thread());
        let entry = enter_thread();
        assert!(entry.is_locked());

        drop(entry);
        set_threading_mode(ThreadingMode::SingleThread);
    }

    #[test]
    fn test_entering_twice_is_fatal() {
        let _serial = serial();
        set_threading_mode(ThreadingMode::MultiThread);

        // Run on a fresh thread so the panic does not leave this one marked as entered.
        let outcome = thread::spawn(|| {
            let _first = enter_thread();
            catch_unwind(|| {
                let _second = enter_thread();
            })
            .is_err()
        })
        .join()
        .unwrap();

        assert!(outcome);
        set_threading_mode(ThreadingMode::SingleThread);
    }
}
