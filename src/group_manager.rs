/*
 * Registry of window groups keyed by OS thread.
 *
 * A window created on thread T calls `create_group(T)` and holds the returned
 * reference for its lifetime; the last `done()` disposes the group, which
 * removes itself from the registry. The manager is an explicit context object:
 * independent instances can coexist (tests do this), and `global()` provides
 * the lazily created process-wide instance the windowing layer uses.
 *
 * Lock order is registry lock -> group state lock. A group never holds its
 * own state lock while calling back into the registry.
 */
use crate::layout::{LayoutApplier, LoggingLayoutApplier};
use crate::tooltip::{ToolTipProvider, UnsupportedToolTipProvider};
use crate::types::ThreadId;
use crate::window_group::{Completion, WindowGroup};

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

type GroupMap = HashMap<ThreadId, Arc<WindowGroup>>;

/*
 * The collaborators every group created by a manager is wired to: how to
 * build the thread's tooltip control and how to apply a layout batch.
 */
#[derive(Clone)]
pub struct GroupServices {
    pub tool_tips: Arc<dyn ToolTipProvider>,
    pub layout: Arc<dyn LayoutApplier>,
}

impl GroupServices {
    pub fn new(tool_tips: Arc<dyn ToolTipProvider>, layout: Arc<dyn LayoutApplier>) -> Self {
        Self { tool_tips, layout }
    }

    #[cfg(target_os = "windows")]
    pub fn platform_default() -> Self {
        use crate::controls::{Win32LayoutApplier, Win32ToolTipProvider};
        Self::new(Arc::new(Win32ToolTipProvider), Arc::new(Win32LayoutApplier))
    }

    #[cfg(not(target_os = "windows"))]
    pub fn platform_default() -> Self {
        Self::new(
            Arc::new(UnsupportedToolTipProvider),
            Arc::new(LoggingLayoutApplier),
        )
    }

    // Services for code paths that never create tooltips nor apply layouts natively.
    pub fn headless() -> Self {
        Self::new(
            Arc::new(UnsupportedToolTipProvider),
            Arc::new(LoggingLayoutApplier),
        )
    }
}

impl fmt::Debug for GroupServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupServices").finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct WindowGroupManager {
    groups: Arc<RwLock<GroupMap>>,
    services: GroupServices,
}

impl WindowGroupManager {
    pub fn new(services: GroupServices) -> Self {
        Self {
            groups: Arc::new(RwLock::new(HashMap::new())),
            services,
        }
    }

    pub fn global() -> &'static WindowGroupManager {
        static GLOBAL: OnceLock<WindowGroupManager> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            log::debug!("WindowGroupManager: initializing process-wide manager");
            WindowGroupManager::new(GroupServices::platform_default())
        })
    }

    pub fn services(&self) -> &GroupServices {
        &self.services
    }

    /// Returns the group for `thread_id` without touching its reference count.
    pub fn group(&self, thread_id: ThreadId) -> Option<Arc<WindowGroup>> {
        self.read_groups().get(&thread_id).cloned()
    }

    pub fn current_group(&self) -> Option<Arc<WindowGroup>> {
        self.group(ThreadId::current())
    }

    /*
     * Returns the group for `thread_id`, creating and registering it if needed.
     * The returned group carries one extra reference on behalf of the caller,
     * who must release it with `done()`.
     *
     * An entry whose group already began disposing is treated as absent and
     * replaced; the disposing group's own removal then leaves the new entry
     * alone.
     */
    pub fn create_group(&self, thread_id: ThreadId) -> Arc<WindowGroup> {
        {
            let groups = self.read_groups();
            if let Some(group) = groups.get(&thread_id)
                && group.try_retain()
            {
                return Arc::clone(group);
            }
        }

        let mut groups = self.write_groups();
        if let Some(group) = groups.get(&thread_id)
            && group.try_retain()
        {
            log::trace!(
                "WindowGroupManager: lost creation race for thread {thread_id:?}"
            );
            return Arc::clone(group);
        }

        let group = Arc::new(WindowGroup::new(
            thread_id,
            self.services.clone(),
            self.removal_callback(),
        ));
        group.add(1);
        groups.insert(thread_id, Arc::clone(&group));
        log::debug!(
            "WindowGroupManager: created group for thread {thread_id:?} ({} live)",
            groups.len()
        );
        group
    }

    pub fn create_current_group(&self) -> Arc<WindowGroup> {
        self.create_group(ThreadId::current())
    }

    pub fn len(&self) -> usize {
        self.read_groups().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_groups().is_empty()
    }

    // Groups only keep a weak handle on the registry; a dropped manager makes removal a no-op.
    fn removal_callback(&self) -> Completion {
        let groups = Arc::downgrade(&self.groups);
        Box::new(move |thread_id: ThreadId, group: &WindowGroup| {
            if let Some(groups) = groups.upgrade() {
                remove_group(&groups, thread_id, group);
            }
        })
    }

    fn read_groups(&self) -> RwLockReadGuard<'_, GroupMap> {
        self.groups.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_groups(&self) -> RwLockWriteGuard<'_, GroupMap> {
        self.groups.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for WindowGroupManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowGroupManager")
            .field("groups", &self.len())
            .finish_non_exhaustive()
    }
}

/*
 * Drops the registry entry for `thread_id`, but only if it still points at
 * the group being disposed.
 */
fn remove_group(groups: &RwLock<GroupMap>, thread_id: ThreadId, group: &WindowGroup) {
    let mut groups = groups.write().unwrap_or_else(PoisonError::into_inner);
    let is_current = groups
        .get(&thread_id)
        .map(|entry| std::ptr::eq(Arc::as_ptr(entry), group));
    match is_current {
        Some(true) => {
            groups.remove(&thread_id);
            log::debug!(
                "WindowGroupManager: removed group for thread {thread_id:?} ({} live)",
                groups.len()
            );
        }
        Some(false) => {
            log::debug!(
                "WindowGroupManager: group for thread {thread_id:?} was already replaced"
            );
        }
        None => {}
    }
}
