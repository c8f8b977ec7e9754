/*
 * Win32 implementations of the collaborators a window group is wired to.
 * `GroupServices::platform_default()` selects these on Windows.
 */
pub(crate) mod layout_handler;
pub(crate) mod tooltip_handler;

pub use layout_handler::Win32LayoutApplier;
pub use tooltip_handler::Win32ToolTipProvider;
