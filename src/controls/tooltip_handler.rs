/*
 * Native tooltip control owned by a window group.
 *
 * The control is a top-level `tooltips_class32` popup created on the group's
 * thread. Like every window, it attaches to its group with one reference and
 * releases that reference when destroyed; the group treats that reference as
 * ignored so the tooltip never keeps it alive.
 */
use crate::error::{PlatformError, Result as PlatformResult};
use crate::tooltip::{ToolTip, ToolTipHandle, ToolTipProvider};
use crate::types::{NativeHandle, ThreadId};
use crate::window_group::WindowGroup;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use windows::Win32::{
    Foundation::{HINSTANCE, LPARAM, WPARAM},
    System::LibraryLoader::GetModuleHandleW,
    UI::{
        Controls::{TOOLTIPS_CLASSW, TTS_ALWAYSTIP, TTS_NOPREFIX},
        WindowsAndMessaging::{
            CW_USEDEFAULT, CreateWindowExW, DestroyWindow, HWND_TOPMOST, PostMessageW,
            SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE, SetWindowPos, WINDOW_STYLE, WM_CLOSE,
            WS_EX_TOPMOST, WS_POPUP,
        },
    },
};

#[derive(Debug)]
pub(crate) struct NativeToolTip {
    hwnd: NativeHandle,
    owner: ThreadId,
    group: Weak<WindowGroup>,
    disposed: AtomicBool,
}

impl ToolTip for NativeToolTip {
    fn handle(&self) -> NativeHandle {
        self.hwnd
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        if ThreadId::current() == self.owner {
            if let Err(err) = unsafe { DestroyWindow(self.hwnd.to_hwnd()) } {
                log::warn!("ToolTip: DestroyWindow failed for {:?}: {err:?}", self.hwnd);
            }
        } else {
            // Windows can only be destroyed by their own thread.
            log::debug!(
                "ToolTip: disposing {:?} off thread {:?}; posting WM_CLOSE",
                self.hwnd,
                self.owner
            );
            if let Err(err) =
                unsafe { PostMessageW(Some(self.hwnd.to_hwnd()), WM_CLOSE, WPARAM(0), LPARAM(0)) }
            {
                log::warn!("ToolTip: posting WM_CLOSE to {:?} failed: {err:?}", self.hwnd);
            }
        }

        if let Some(group) = self.group.upgrade() {
            group.done();
        }
    }
}

#[derive(Debug, Default)]
pub struct Win32ToolTipProvider;

impl ToolTipProvider for Win32ToolTipProvider {
    fn create_tool_tip(&self, group: &Arc<WindowGroup>) -> PlatformResult<ToolTipHandle> {
        let owner = ThreadId::current();
        if owner != group.thread_id() {
            return Err(PlatformError::OperationFailed(format!(
                "tooltip for thread {:?} requested from thread {owner:?}",
                group.thread_id()
            )));
        }

        let h_module = unsafe { GetModuleHandleW(None) }.map_err(|err| {
            PlatformError::InitializationFailed(format!("GetModuleHandleW failed: {err:?}"))
        })?;

        let hwnd = unsafe {
            CreateWindowExW(
                WS_EX_TOPMOST,
                TOOLTIPS_CLASSW,
                None,
                WS_POPUP | WINDOW_STYLE(TTS_ALWAYSTIP | TTS_NOPREFIX),
                CW_USEDEFAULT,
                CW_USEDEFAULT,
                CW_USEDEFAULT,
                CW_USEDEFAULT,
                None,
                None,
                Some(HINSTANCE(h_module.0)),
                None,
            )
        }
        .map_err(|err| {
            log::warn!("ToolTip: CreateWindowExW failed for thread {owner:?}: {err:?}");
            PlatformError::OperationFailed(format!("CreateWindowExW(tooltip) failed: {err:?}"))
        })?;

        unsafe {
            _ = SetWindowPos(
                hwnd,
                Some(HWND_TOPMOST),
                0,
                0,
                0,
                0,
                SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE,
            );
        }

        group.add(1);
        log::debug!("ToolTip: created {hwnd:?} for thread {owner:?}");

        Ok(Arc::new(NativeToolTip {
            hwnd: NativeHandle::from_hwnd(hwnd),
            owner,
            group: Arc::downgrade(group),
            disposed: AtomicBool::new(false),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group_manager::{GroupServices, WindowGroupManager};
    use crate::layout::LoggingLayoutApplier;

    #[test]
    fn test_tool_tip_from_foreign_thread_is_rejected() {
        let manager = WindowGroupManager::new(GroupServices::new(
            Arc::new(Win32ToolTipProvider),
            Arc::new(LoggingLayoutApplier),
        ));
        let group = manager.create_group(ThreadId(u32::MAX));

        let result = group.create_tool_tip();

        assert!(matches!(result, Err(PlatformError::OperationFailed(_))));
        assert!(group.tool_tip().is_none());
        assert_eq!(group.liveness(), 1);
    }
}
