/*
 * The tooltip collaborator contract used by `WindowGroup`.
 *
 * A group owns at most one tooltip control, created lazily through the
 * `ToolTipProvider` its manager was configured with. Constructing a tooltip
 * is a window creation like any other, so the provider is expected to attach
 * the new control to the group by taking one reference (`group.add(1)`) and
 * to release it again (`group.done()`) from `ToolTip::dispose`. The group
 * compensates for that self-reference so it does not keep itself alive.
 */
use crate::error::{PlatformError, Result as PlatformResult};
use crate::types::NativeHandle;
use crate::window_group::WindowGroup;

use std::sync::Arc;

pub trait ToolTip: Send + Sync {
    fn handle(&self) -> NativeHandle;

    // Called exactly once, by the owning group while it disposes.
    fn dispose(&self);
}

pub type ToolTipHandle = Arc<dyn ToolTip>;

pub trait ToolTipProvider: Send + Sync {
    /*
     * Creates the tooltip control for `group` on the calling thread.
     * Must not call `group.create_tool_tip()`.
     */
    fn create_tool_tip(&self, group: &Arc<WindowGroup>) -> PlatformResult<ToolTipHandle>;
}

#[derive(Debug, Default)]
pub struct UnsupportedToolTipProvider;

impl ToolTipProvider for UnsupportedToolTipProvider {
    fn create_tool_tip(&self, group: &Arc<WindowGroup>) -> PlatformResult<ToolTipHandle> {
        Err(PlatformError::Unsupported(format!(
            "no native tooltip control available for thread {:?}",
            group.thread_id()
        )))
    }
}
