/*
 * Thread-affinity layer for Win32 UI toolkits that host one message loop per
 * OS thread.
 *
 * Every thread that owns windows gets a reference-counted `WindowGroup` from
 * the `WindowGroupManager`. The group carries the thread's tooltip control and
 * active form, and a queue through which any thread can marshal callbacks and
 * layout batches onto the owning message loop. `thread_lock` gates global
 * state when several message loops run in parallel.
 *
 * The group/manager core is portable so the lifecycle and queue semantics can
 * be compiled and tested anywhere; the native tooltip, deferred layout and
 * message loop are Windows-only.
 */
#[cfg(target_os = "windows")]
pub mod controls;
pub mod error;
pub mod group_manager;
pub mod layout;
#[cfg(target_os = "windows")]
pub mod message_loop;
#[cfg(test)]
pub(crate) mod test_support;
pub mod thread_lock;
pub mod tooltip;
pub mod types;
pub mod window_group;

pub use error::{PlatformError, Result as PlatformResult};
pub use group_manager::{GroupServices, WindowGroupManager};
pub use layout::{LayoutApplier, LayoutResult, LayoutResultItem, LoggingLayoutApplier, Stopwatch};
pub use thread_lock::{
    ThreadEntry, ThreadLockGuard, enter_thread, lock_thread, set_threading_mode, threading_mode,
};
pub use tooltip::{ToolTip, ToolTipHandle, ToolTipProvider, UnsupportedToolTipProvider};
pub use types::{FormId, NativeHandle, Rectangle, ThreadId, ThreadingMode};
pub use window_group::{Form, GroupPhase, PendingWork, WindowGroup};
