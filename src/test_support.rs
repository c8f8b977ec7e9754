// Collaborator doubles shared by the unit tests of the group modules.
use crate::error::{PlatformError, Result as PlatformResult};
use crate::group_manager::GroupServices;
use crate::layout::{LayoutApplier, LayoutResult, Stopwatch};
use crate::tooltip::{ToolTip, ToolTipHandle, ToolTipProvider};
use crate::types::{FormId, NativeHandle};
use crate::window_group::{Form, WindowGroup};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread;
use std::time::Duration;

pub(crate) struct TestForm(pub FormId);

impl Form for TestForm {
    fn form_id(&self) -> FormId {
        self.0
    }
}

// Behaves like a native tooltip: holds one reference on its group until disposed.
struct TestToolTip {
    handle: NativeHandle,
    group: Weak<WindowGroup>,
    disposed: Arc<AtomicUsize>,
}

impl ToolTip for TestToolTip {
    fn handle(&self) -> NativeHandle {
        self.handle
    }

    fn dispose(&self) {
        self.disposed.fetch_add(1, Ordering::SeqCst);
        if let Some(group) = self.group.upgrade() {
            group.done();
        }
    }
}

#[derive(Default)]
pub(crate) struct TestToolTipProvider {
    created: AtomicUsize,
    disposed: Arc<AtomicUsize>,
}

impl TestToolTipProvider {
    pub(crate) fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub(crate) fn disposed(&self) -> usize {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl ToolTipProvider for TestToolTipProvider {
    fn create_tool_tip(&self, group: &Arc<WindowGroup>) -> PlatformResult<ToolTipHandle> {
        let n = self.created.fetch_add(1, Ordering::SeqCst);
        group.add(1);
        Ok(Arc::new(TestToolTip {
            handle: NativeHandle(0x1000 + n as isize),
            group: Arc::downgrade(group),
            disposed: Arc::clone(&self.disposed),
        }))
    }
}

// Fails the first `failures` creations, then behaves like `TestToolTipProvider`.
pub(crate) struct FailingToolTipProvider {
    remaining_failures: AtomicUsize,
    inner: TestToolTipProvider,
}

impl FailingToolTipProvider {
    pub(crate) fn new(failures: usize) -> Self {
        Self {
            remaining_failures: AtomicUsize::new(failures),
            inner: TestToolTipProvider::default(),
        }
    }
}

impl ToolTipProvider for FailingToolTipProvider {
    fn create_tool_tip(&self, group: &Arc<WindowGroup>) -> PlatformResult<ToolTipHandle> {
        let failed = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(PlatformError::OperationFailed(
                "tooltip class not registered".into(),
            ));
        }
        self.inner.create_tool_tip(group)
    }
}

// Stalls inside every creation so concurrent callers overlap in the provider.
pub(crate) struct SlowToolTipProvider {
    delay: Duration,
    inner: TestToolTipProvider,
}

impl SlowToolTipProvider {
    pub(crate) fn new(delay: Duration) -> Self {
        Self {
            delay,
            inner: TestToolTipProvider::default(),
        }
    }

    pub(crate) fn created(&self) -> usize {
        self.inner.created()
    }
}

impl ToolTipProvider for SlowToolTipProvider {
    fn create_tool_tip(&self, group: &Arc<WindowGroup>) -> PlatformResult<ToolTipHandle> {
        thread::sleep(self.delay);
        self.inner.create_tool_tip(group)
    }
}

// A control that never attaches to its group: no reference taken, none released.
struct DetachedToolTip {
    disposed: Arc<AtomicUsize>,
}

impl ToolTip for DetachedToolTip {
    fn handle(&self) -> NativeHandle {
        NativeHandle(0x2000)
    }

    fn dispose(&self) {
        self.disposed.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub(crate) struct DetachedToolTipProvider {
    disposed: Arc<AtomicUsize>,
}

impl DetachedToolTipProvider {
    pub(crate) fn disposed(&self) -> usize {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl ToolTipProvider for DetachedToolTipProvider {
    fn create_tool_tip(&self, _group: &Arc<WindowGroup>) -> PlatformResult<ToolTipHandle> {
        Ok(Arc::new(DetachedToolTip {
            disposed: Arc::clone(&self.disposed),
        }))
    }
}

// Misbehaving control: tries to take a fresh group reference while being disposed.
struct ReattachingToolTip {
    group: Weak<WindowGroup>,
}

impl ToolTip for ReattachingToolTip {
    fn handle(&self) -> NativeHandle {
        NativeHandle(0x3000)
    }

    fn dispose(&self) {
        if let Some(group) = self.group.upgrade() {
            group.add(1);
        }
    }
}

pub(crate) struct ReattachingToolTipProvider;

impl ToolTipProvider for ReattachingToolTipProvider {
    fn create_tool_tip(&self, group: &Arc<WindowGroup>) -> PlatformResult<ToolTipHandle> {
        group.add(1);
        Ok(Arc::new(ReattachingToolTip {
            group: Arc::downgrade(group),
        }))
    }
}

// Records each applied batch and whether it carried a stopwatch.
#[derive(Default)]
pub(crate) struct RecordingLayoutApplier {
    applied: Mutex<Vec<(Vec<LayoutResult>, bool)>>,
}

impl RecordingLayoutApplier {
    pub(crate) fn applied(&self) -> Vec<(Vec<LayoutResult>, bool)> {
        self.applied.lock().unwrap().clone()
    }
}

impl LayoutApplier for RecordingLayoutApplier {
    fn apply_layout_results(
        &self,
        results: &[LayoutResult],
        stopwatch: Option<&Stopwatch>,
    ) -> PlatformResult<()> {
        self.applied
            .lock()
            .unwrap()
            .push((results.to_vec(), stopwatch.is_some()));
        Ok(())
    }
}

pub(crate) fn test_services() -> (
    GroupServices,
    Arc<TestToolTipProvider>,
    Arc<RecordingLayoutApplier>,
) {
    let provider = Arc::new(TestToolTipProvider::default());
    let applier = Arc::new(RecordingLayoutApplier::default());
    let services = GroupServices::new(provider.clone(), applier.clone());
    (services, provider, applier)
}
