/*
 * The Win32 message loop for a window group's thread.
 *
 * Each iteration drains the group's synchronized work and then blocks in
 * GetMessageW. Other threads that queue work call `synchronize` (or
 * `wake_thread` after `synchronize_layout`) so the blocked loop receives a
 * private thread message and drains promptly. In multi-thread mode the loop
 * holds the message-loop lock except while blocked waiting for messages.
 */
use crate::error::{PlatformError, Result as PlatformResult};
use crate::thread_lock;
use crate::types::ThreadId;
use crate::window_group::WindowGroup;

use std::sync::Arc;
use windows::Win32::{
    Foundation::{LPARAM, WPARAM},
    UI::WindowsAndMessaging::{
        DispatchMessageW, GetMessageW, MSG, PostThreadMessageW, TranslateMessage, WM_APP,
    },
};

// Thread message (no target HWND) that only exists to wake GetMessageW.
pub(crate) const WM_APP_RUN_SYNCHRONIZED: u32 = WM_APP + 0x200;

pub fn wake_thread(thread_id: ThreadId) -> PlatformResult<()> {
    unsafe {
        PostThreadMessageW(
            thread_id.raw(),
            WM_APP_RUN_SYNCHRONIZED,
            WPARAM(0),
            LPARAM(0),
        )
    }
    .map_err(|err| {
        log::warn!("MessageLoop: failed to wake thread {thread_id:?}: {err:?}");
        PlatformError::OperationFailed(format!(
            "PostThreadMessageW to thread {thread_id:?} failed: {err:?}"
        ))
    })
}

/// Queues `f` on `group` and wakes the group's message loop.
pub fn synchronize<F>(group: &WindowGroup, f: F) -> PlatformResult<()>
where
    F: FnOnce() + Send + 'static,
{
    group.synchronize(f);
    wake_thread(group.thread_id())
}

/*
 * Runs the message loop until WM_QUIT and returns its exit code.
 * Must be called on `group`'s thread.
 */
pub fn run_message_loop(group: &Arc<WindowGroup>) -> PlatformResult<i32> {
    if ThreadId::current() != group.thread_id() {
        return Err(PlatformError::OperationFailed(format!(
            "message loop for thread {:?} started on thread {:?}",
            group.thread_id(),
            ThreadId::current()
        )));
    }

    log::debug!(
        "MessageLoop: entering loop for thread {:?}",
        group.thread_id()
    );
    let mut lock = thread_lock::lock_thread();
    let mut msg = MSG::default();

    loop {
        group.run_synchronized();

        let ret = lock.run_unlocked(|| unsafe { GetMessageW(&mut msg, None, 0, 0) });
        match ret.0 {
            -1 => {
                log::error!(
                    "MessageLoop: GetMessageW failed on thread {:?}",
                    group.thread_id()
                );
                return Err(PlatformError::OperationFailed(
                    "GetMessageW returned -1".into(),
                ));
            }
            0 => break,
            _ => {}
        }

        if msg.hwnd.is_invalid() && msg.message == WM_APP_RUN_SYNCHRONIZED {
            continue;
        }

        unsafe {
            _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }

    // Work queued while the loop shut down still runs on this thread.
    group.run_synchronized();
    log::debug!(
        "MessageLoop: leaving loop for thread {:?}",
        group.thread_id()
    );
    Ok(msg.wParam.0 as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group_manager::{GroupServices, WindowGroupManager};
    use std::sync::mpsc::channel;
    use std::time::Duration;
    use windows::Win32::UI::WindowsAndMessaging::PostQuitMessage;

    #[test]
    fn test_loop_drains_work_queued_from_another_thread() {
        let manager = WindowGroupManager::new(GroupServices::headless());
        let (ready_tx, ready_rx) = channel();
        let (ran_tx, ran_rx) = channel();

        let loop_manager = manager.clone();
        let ui = std::thread::spawn(move || {
            let group = loop_manager.create_current_group();
            ready_tx.send(Arc::clone(&group)).unwrap();
            let code = run_message_loop(&group);
            group.done();
            code
        });

        let group = ready_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        // The first wake can race the loop's message queue creation, so retry.
        let mut posted = synchronize(&group, move || {
            ran_tx.send(()).unwrap();
            unsafe { PostQuitMessage(7) };
        });
        for _ in 0..50 {
            if posted.is_ok() {
                break;
            }
            std::thread::sleep(Duration::from_millis(20));
            posted = wake_thread(group.thread_id());
        }

        assert!(ran_rx.recv_timeout(Duration::from_secs(5)).is_ok());
        assert_eq!(ui.join().unwrap(), Ok(7));
        assert!(manager.is_empty());
    }
}
