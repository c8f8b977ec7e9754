/*
 * A `WindowGroup` holds the state shared by every window living on one OS
 * thread: the reference count that keeps the group alive, the thread's tooltip
 * control, the active form, and the queue of work other threads marshal onto
 * the thread's message loop.
 *
 * Lifecycle: Active -> Disposing -> Removed. A group becomes Disposing inside
 * the call that brings its liveness (`refs - ignored`) to zero, releases its
 * tooltip, becomes Removed, and finally asks its manager to drop the registry
 * entry. Changing the counters of a Removed group, or driving a counter below
 * zero, is a defect in the caller and stops the call with a panic.
 *
 * Locking: the counters and the synchronized-work queue sit behind two
 * separate mutexes. Neither is held while calling out to collaborators
 * (tooltip provider, layout applier, queued callbacks, manager removal).
 */
use crate::error::Result as PlatformResult;
use crate::group_manager::GroupServices;
use crate::layout::{LayoutResult, Stopwatch};
use crate::tooltip::ToolTipHandle;
use crate::types::{FormId, ThreadId};

use std::fmt;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// A top-level form. The group only tracks which one is active.
pub trait Form: Send + Sync {
    fn form_id(&self) -> FormId;
}

pub(crate) type Completion = Box<dyn Fn(ThreadId, &WindowGroup) + Send + Sync>;

type SyncFunc = Box<dyn FnOnce() + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupPhase {
    Active,
    Disposing,
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PendingWork {
    pub callbacks: usize,
    pub layout_pending: bool,
}

struct RefState {
    refs: i32,
    // References the group created on itself (its tooltip); they do not count toward liveness.
    ignored: i32,
    phase: GroupPhase,
    tool_tip: Option<ToolTipHandle>,
    active_form: Option<Weak<dyn Form>>,
}

impl RefState {
    fn liveness(&self) -> i32 {
        self.refs - self.ignored
    }
}

#[derive(Default)]
struct SyncQueue {
    funcs: Vec<SyncFunc>,
    layout_results: Vec<LayoutResult>,
    layout_stopwatch: Option<Arc<Stopwatch>>,
}

// What a liveness-reaching-zero transition hands over to `dispose`.
struct Disposal {
    tool_tip: Option<ToolTipHandle>,
}

pub struct WindowGroup {
    thread_id: ThreadId,
    services: GroupServices,
    completion: Completion,
    state: Mutex<RefState>,
    sync: Mutex<SyncQueue>,
    // Serializes tooltip creation; never taken while `state` is held.
    tool_tip_creation: Mutex<()>,
}

impl WindowGroup {
    /*
     * Creates a group with zero references. `completion` runs once, at the end
     * of disposal, so the owner can forget the group.
     */
    pub(crate) fn new(
        thread_id: ThreadId,
        services: GroupServices,
        completion: Completion,
    ) -> Self {
        Self {
            thread_id,
            services,
            completion,
            state: Mutex::new(RefState {
                refs: 0,
                ignored: 0,
                phase: GroupPhase::Active,
                tool_tip: None,
                active_form: None,
            }),
            sync: Mutex::new(SyncQueue::default()),
            tool_tip_creation: Mutex::new(()),
        }
    }

    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    pub fn refs(&self) -> i32 {
        self.lock_state().refs
    }

    pub fn liveness(&self) -> i32 {
        self.lock_state().liveness()
    }

    pub fn phase(&self) -> GroupPhase {
        self.lock_state().phase
    }

    pub fn is_removed(&self) -> bool {
        self.phase() == GroupPhase::Removed
    }

    /*
     * Changes the reference counter by `delta`, which may be negative.
     * Disposes the group synchronously when liveness reaches zero.
     *
     * Panics if the group was already removed, if a positive `delta` arrives
     * while it is disposing, or if the counter would go negative.
     */
    pub fn add(&self, delta: i32) {
        let disposal = {
            let mut state = self.lock_state();
            // While disposing, attached controls may only let go of the group.
            let removed = match state.phase {
                GroupPhase::Active => false,
                GroupPhase::Disposing => delta > 0,
                GroupPhase::Removed => true,
            };
            if removed {
                drop(state);
                self.fatal(
                    "add() called on a WindowGroup that has been removed from its manager",
                );
            }
            let refs = state.refs + delta;
            if refs < 0 {
                drop(state);
                self.fatal("negative WindowGroup refs counter");
            }
            state.refs = refs;
            Self::begin_disposal_if_dead(&mut state)
        };

        if let Some(disposal) = disposal {
            self.dispose(disposal);
        }
    }

    pub fn done(&self) {
        self.add(-1);
    }

    /*
     * Takes one reference for the manager's lookup path, but only while the
     * group is Active. A group that already started disposing must not be
     * handed out again, so the caller treats it as absent.
     */
    pub(crate) fn try_retain(&self) -> bool {
        let mut state = self.lock_state();
        if state.phase != GroupPhase::Active {
            return false;
        }
        state.refs += 1;
        true
    }

    // Same contract as `add`, applied to the self-reference counter.
    fn ignore(&self, delta: i32) {
        let disposal = {
            let mut state = self.lock_state();
            if state.phase == GroupPhase::Removed {
                drop(state);
                self.fatal(
                    "ignore() called on a WindowGroup that has been removed from its manager",
                );
            }
            let ignored = state.ignored + delta;
            if ignored < 0 {
                drop(state);
                self.fatal("negative WindowGroup ignored counter");
            }
            state.ignored = ignored;
            Self::begin_disposal_if_dead(&mut state)
        };

        if let Some(disposal) = disposal {
            self.dispose(disposal);
        }
    }

    fn begin_disposal_if_dead(state: &mut RefState) -> Option<Disposal> {
        if state.phase != GroupPhase::Active || state.liveness() != 0 {
            return None;
        }
        state.phase = GroupPhase::Disposing;
        Some(Disposal {
            tool_tip: state.tool_tip.take(),
        })
    }

    /*
     * Reached only from the Active -> Disposing transition, so it runs once.
     * The tooltip releases its own reference while we are still Disposing;
     * that drives liveness below zero but cannot trigger a second disposal.
     */
    fn dispose(&self, disposal: Disposal) {
        log::debug!(
            "WindowGroup: disposing group for thread {:?}",
            self.thread_id
        );
        if let Some(tool_tip) = disposal.tool_tip {
            tool_tip.dispose();
        }
        {
            let mut state = self.lock_state();
            state.phase = GroupPhase::Removed;
            state.active_form = None;
        }
        (self.completion)(self.thread_id, self);
    }

    /*
     * Queues `f` to run on the group's thread during the next drain.
     * Can be called from any thread, including from inside a queued callback.
     */
    pub fn synchronize<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.lock_sync().funcs.push(Box::new(f));
    }

    /*
     * Replaces any layout batch that has not been applied yet.
     * Can be called from any thread.
     */
    pub fn synchronize_layout(
        &self,
        results: Vec<LayoutResult>,
        stopwatch: Option<Arc<Stopwatch>>,
    ) {
        let mut queue = self.lock_sync();
        if !queue.layout_results.is_empty() {
            log::trace!(
                "WindowGroup: thread {:?} replacing {} unapplied layout result(s)",
                self.thread_id,
                queue.layout_results.len()
            );
        }
        queue.layout_results = results;
        queue.layout_stopwatch = stopwatch;
    }

    pub fn pending_work(&self) -> PendingWork {
        let queue = self.lock_sync();
        PendingWork {
            callbacks: queue.funcs.len(),
            layout_pending: !queue.layout_results.is_empty(),
        }
    }

    /*
     * Drains the queue: applies the pending layout batch, then runs the queued
     * callbacks in submission order. Must be called by the group's thread.
     *
     * The queue is swapped out before anything runs, so callbacks that call
     * `synchronize` again land in the next drain. Returns the number of
     * callbacks executed.
     */
    pub fn run_synchronized(&self) -> usize {
        debug_assert_eq!(
            ThreadId::current(),
            self.thread_id,
            "run_synchronized() called off the group's thread"
        );

        let (funcs, results, stopwatch) = {
            let mut queue = self.lock_sync();
            (
                mem::take(&mut queue.funcs),
                mem::take(&mut queue.layout_results),
                queue.layout_stopwatch.take(),
            )
        };

        if !results.is_empty() {
            if let Err(err) = self
                .services
                .layout
                .apply_layout_results(&results, stopwatch.as_deref())
            {
                log::warn!(
                    "WindowGroup: applying {} layout result(s) on thread {:?} failed: {err}",
                    results.len(),
                    self.thread_id
                );
            }
        }

        let count = funcs.len();
        if count > 0 {
            log::trace!(
                "WindowGroup: running {count} synchronized call(s) on thread {:?}",
                self.thread_id
            );
        }
        for f in funcs {
            f();
        }
        count
    }

    pub fn tool_tip(&self) -> Option<ToolTipHandle> {
        self.lock_state().tool_tip.clone()
    }

    /*
     * Returns the group's tooltip, creating it on first use.
     * A failed creation leaves the group without a tooltip; the next call retries.
     * Concurrent first calls wait for one another, so the provider runs once.
     */
    pub fn create_tool_tip(self: &Arc<Self>) -> PlatformResult<ToolTipHandle> {
        if let Some(tool_tip) = self.tool_tip() {
            return Ok(tool_tip);
        }

        let _creating = self
            .tool_tip_creation
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(tool_tip) = self.tool_tip() {
            return Ok(tool_tip);
        }

        let tool_tip = self
            .services
            .tool_tips
            .create_tool_tip(self)
            .inspect_err(|err| {
                log::warn!(
                    "WindowGroup: tooltip creation failed for thread {:?}: {err}",
                    self.thread_id
                );
            })?;
        self.lock_state().tool_tip = Some(Arc::clone(&tool_tip));

        // The new control attached itself to this group while initializing.
        // That reference must not keep the group alive.
        self.ignore(1);

        Ok(tool_tip)
    }

    pub fn active_form(&self) -> Option<Arc<dyn Form>> {
        self.lock_state()
            .active_form
            .as_ref()
            .and_then(Weak::upgrade)
    }

    pub fn set_active_form(&self, form: Option<&Arc<dyn Form>>) {
        self.lock_state().active_form = form.map(Arc::downgrade);
    }

    fn fatal(&self, msg: &str) -> ! {
        log::error!("WindowGroup: {msg} (thread {:?})", self.thread_id);
        panic!("windowgroups: {msg}");
    }

    fn lock_state(&self) -> MutexGuard<'_, RefState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_sync(&self) -> MutexGuard<'_, SyncQueue> {
        self.sync.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for WindowGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock_state();
        f.debug_struct("WindowGroup")
            .field("thread_id", &self.thread_id)
            .field("refs", &state.refs)
            .field("ignored", &state.ignored)
            .field("phase", &state.phase)
            .field("has_tool_tip", &state.tool_tip.is_some())
            .finish()
    }
}
