/*
 * Applies layout batches to native child windows.
 *
 * Each container's items are moved with one deferred-window-position
 * transaction so siblings reposition atomically without intermediate
 * repaints. If the transaction cannot be started the items are moved one by
 * one with MoveWindow instead.
 */
use crate::error::Result as PlatformResult;
use crate::layout::{LayoutApplier, LayoutResult, LayoutResultItem, Stopwatch};

use windows::Win32::UI::WindowsAndMessaging::{
    BeginDeferWindowPos, DeferWindowPos, EndDeferWindowPos, MoveWindow, SWP_NOACTIVATE,
    SWP_NOZORDER,
};

// Items that can actually be moved: a live handle and a non-negative size.
pub(crate) fn positionable_items(
    result: &LayoutResult,
) -> impl Iterator<Item = &LayoutResultItem> {
    result.items.iter().filter(|item| {
        !item.widget.is_null() && item.bounds.width >= 0 && item.bounds.height >= 0
    })
}

#[derive(Debug, Default)]
pub struct Win32LayoutApplier;

impl Win32LayoutApplier {
    fn apply_container(&self, result: &LayoutResult) -> usize {
        let items: Vec<_> = positionable_items(result).collect();
        if items.is_empty() {
            return 0;
        }

        unsafe {
            let mut hdwp = match BeginDeferWindowPos(items.len() as i32) {
                Ok(hdwp) if !hdwp.is_invalid() => hdwp,
                _ => {
                    log::warn!(
                        "[Layout] BeginDeferWindowPos failed for {:?}; using MoveWindow",
                        result.container
                    );
                    let mut moved = 0usize;
                    for item in &items {
                        let b = item.bounds;
                        let hwnd = item.widget.to_hwnd();
                        if MoveWindow(hwnd, b.x, b.y, b.width, b.height, true).is_ok() {
                            moved += 1;
                        }
                    }
                    return moved;
                }
            };

            let mut moved = 0usize;
            for item in &items {
                let b = item.bounds;
                match DeferWindowPos(
                    hdwp,
                    item.widget.to_hwnd(),
                    None,
                    b.x,
                    b.y,
                    b.width,
                    b.height,
                    SWP_NOZORDER | SWP_NOACTIVATE,
                ) {
                    Ok(next) if !next.is_invalid() => {
                        hdwp = next;
                        moved += 1;
                    }
                    _ => {
                        log::warn!("[Layout] DeferWindowPos failed for widget {:?}", item.widget);
                    }
                }
            }

            if let Err(err) = EndDeferWindowPos(hdwp) {
                log::warn!(
                    "[Layout] EndDeferWindowPos failed for container {:?}: {err:?}",
                    result.container
                );
            }
            moved
        }
    }
}

impl LayoutApplier for Win32LayoutApplier {
    fn apply_layout_results(
        &self,
        results: &[LayoutResult],
        stopwatch: Option<&Stopwatch>,
    ) -> PlatformResult<()> {
        if let Some(sw) = stopwatch {
            sw.start("apply");
        }

        let moved: usize = results.iter().map(|r| self.apply_container(r)).sum();

        if let Some(sw) = stopwatch {
            sw.stop("apply");
            sw.log_summary();
        }
        log::debug!(
            "[Layout] Applied {} container(s), moved={moved}",
            results.len()
        );
        Ok(())
    }
}
