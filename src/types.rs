/*
 * Platform-agnostic value types shared by the window group layer and the
 * windowing code that consumes it. None of these carry ownership of a native
 * resource; they are plain identifiers that can cross threads freely.
 */

/*
 * Identifies the OS thread a window group is bound to.
 * On Windows this is the value returned by `GetCurrentThreadId`, which is also
 * what `PostThreadMessageW` expects. Other targets hand out process-unique
 * values lazily, one per thread.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadId(pub u32);

impl ThreadId {
    pub fn raw(self) -> u32 {
        self.0
    }

    #[cfg(target_os = "windows")]
    pub fn current() -> Self {
        Self(unsafe { windows::Win32::System::Threading::GetCurrentThreadId() })
    }

    #[cfg(not(target_os = "windows"))]
    pub fn current() -> Self {
        use std::sync::atomic::{AtomicU32, Ordering};

        static NEXT_THREAD_ID: AtomicU32 = AtomicU32::new(1);
        thread_local! {
            static CURRENT: u32 = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
        }
        Self(CURRENT.with(|id| *id))
    }
}

/// Logical identity of a top-level form. The group never looks past it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormId(pub usize);

/*
 * A native window handle stored as its integer value so layout batches
 * computed on a worker thread can be sent to the owning thread. Converting
 * back into an `HWND` only happens on the thread that owns the window.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NativeHandle(pub isize);

impl NativeHandle {
    pub const NULL: NativeHandle = NativeHandle(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    #[cfg(target_os = "windows")]
    pub(crate) fn to_hwnd(self) -> windows::Win32::Foundation::HWND {
        windows::Win32::Foundation::HWND(self.0 as *mut std::ffi::c_void)
    }

    #[cfg(target_os = "windows")]
    pub(crate) fn from_hwnd(hwnd: windows::Win32::Foundation::HWND) -> Self {
        Self(hwnd.0 as isize)
    }
}

/// Bounds in parent client coordinates, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rectangle {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/*
 * Whether more than one OS thread runs its own message loop.
 * Cross-thread locking in `thread_lock` only engages in `MultiThread` mode.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThreadingMode {
    #[default]
    SingleThread,
    MultiThread,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_thread_id_is_stable_within_a_thread() {
        assert_eq!(ThreadId::current(), ThreadId::current());
    }

    #[test]
    fn current_thread_id_differs_between_threads() {
        let here = ThreadId::current();
        let there = std::thread::spawn(ThreadId::current).join().unwrap();
        assert_ne!(here, there);
    }

    #[test]
    fn null_handle_is_null() {
        assert!(NativeHandle::NULL.is_null());
        assert!(!NativeHandle(0x1234).is_null());
    }
}
