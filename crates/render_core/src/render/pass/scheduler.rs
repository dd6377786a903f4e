//! Pass scheduler
//!
//! Keeps a non-owning registry of passes and drives them through the
//! setup → execute → cleanup lifecycle once per frame.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::foundation::collections::{PassHandle, SlotMap};
use crate::render::gpu::GpuBackend;
use crate::render::resources::RenderTarget;
use crate::render::Camera;
use super::{FrameContext, PassPhase, PassState, RenderPass};

struct PassEntry {
    pass: Weak<RefCell<dyn RenderPass>>,
    name: String,
    sequence: u64,
    state: PassState,
}

/// What happened during one [`RenderQueueScheduler::run_frame`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Frame counter passed in through the context
    pub frame_index: u64,
    /// Names of passes whose `execute` succeeded, in execution order
    pub executed: Vec<String>,
    /// Successful executes with keys in the opaque band
    pub opaque: usize,
    /// Successful executes with keys in the transparent band
    pub transparent: usize,
    /// Successful executes with keys in the post-processing band
    pub post_processing: usize,
    /// Passes whose `frame_setup` returned an error
    pub failed_setups: usize,
    /// Passes whose `execute` returned an error
    pub failed_executes: usize,
    /// Passes skipped because they were already borrowed
    pub skipped: usize,
}

impl FrameReport {
    /// Whether every pass ran cleanly
    pub fn is_clean(&self) -> bool {
        self.failed_setups == 0 && self.failed_executes == 0 && self.skipped == 0
    }
}

struct Scheduled {
    handle: PassHandle,
    pass: Rc<RefCell<dyn RenderPass>>,
    key: i32,
    sequence: u64,
    setup_ok: bool,
}

/// Orders and runs registered [`RenderPass`]es each frame
#[derive(Default)]
pub struct RenderQueueScheduler {
    entries: SlotMap<PassHandle, PassEntry>,
    next_sequence: u64,
}

impl RenderQueueScheduler {
    /// Create an empty scheduler
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pass owned by the caller
    ///
    /// Registering the same pass twice returns the existing handle.
    pub fn register<P: RenderPass + 'static>(&mut self, pass: &Rc<RefCell<P>>) -> PassHandle {
        let shared: Rc<RefCell<dyn RenderPass>> = pass.clone();
        let weak = Rc::downgrade(&shared);

        if let Some((handle, _)) = self.entries.iter().find(|(_, entry)| entry.pass.ptr_eq(&weak)) {
            log::debug!("Pass already registered as {:?}", handle);
            return handle;
        }

        let name = pass
            .try_borrow()
            .map(|p| p.name().to_string())
            .unwrap_or_else(|_| "<borrowed>".to_string());
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let handle = self.entries.insert(PassEntry {
            pass: weak,
            name,
            sequence,
            state: PassState::NotRun,
        });
        log::debug!("Registered pass '{}' as {:?}", self.entries[handle].name, handle);
        handle
    }

    /// Remove a pass from the registry without disposing it
    pub fn unregister(&mut self, handle: PassHandle) -> bool {
        match self.entries.remove(handle) {
            Some(entry) => {
                log::debug!("Unregistered pass '{}'", entry.name);
                true
            }
            None => false,
        }
    }

    /// Dispose a pass and remove it from the registry
    ///
    /// Returns `false` without doing anything when the handle is stale,
    /// which makes a second dispose a no-op.
    pub fn dispose(&mut self, handle: PassHandle, backend: &mut dyn GpuBackend) -> bool {
        let Some(entry) = self.entries.remove(handle) else {
            log::debug!("Dispose of unknown pass {:?} ignored", handle);
            return false;
        };

        if let Some(pass) = entry.pass.upgrade() {
            match pass.try_borrow_mut() {
                Ok(mut pass) => pass.dispose(backend),
                Err(_) => log::error!("Pass '{}' is borrowed, cannot dispose", entry.name),
            }
        }
        log::debug!("Disposed pass '{}'", entry.name);
        true
    }

    /// Lifecycle state of a registered pass
    pub fn pass_state(&self, handle: PassHandle) -> Option<PassState> {
        self.entries.get(handle).map(|entry| entry.state)
    }

    /// Whether `handle` is still registered
    pub fn contains(&self, handle: PassHandle) -> bool {
        self.entries.contains_key(handle)
    }

    /// Number of registered passes
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no pass is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run every live pass through one frame
    pub fn run_frame(&mut self, ctx: &mut FrameContext<'_>, camera: &Camera, target: &RenderTarget) -> FrameReport {
        let mut report = FrameReport {
            frame_index: ctx.frame_index,
            ..FrameReport::default()
        };

        let mut frame = self.collect(&mut report);
        frame.sort_by_key(|scheduled| (scheduled.key, scheduled.sequence));

        for scheduled in &mut frame {
            let Ok(mut pass) = scheduled.pass.try_borrow_mut() else {
                continue;
            };
            match pass.frame_setup(ctx, camera) {
                Ok(()) => scheduled.setup_ok = true,
                Err(e) => {
                    log::error!("Pass '{}' failed during setup: {}", pass.name(), e);
                    report.failed_setups += 1;
                }
            }
            drop(pass);
            self.set_state(scheduled.handle, PassState::SetupDone);
        }

        for scheduled in frame.iter().filter(|s| s.setup_ok) {
            let Ok(mut pass) = scheduled.pass.try_borrow_mut() else {
                continue;
            };
            match pass.execute(ctx, target) {
                Ok(()) => {
                    report.executed.push(pass.name().to_string());
                    match PassPhase::from_key(scheduled.key) {
                        PassPhase::Opaque => report.opaque += 1,
                        PassPhase::Transparent => report.transparent += 1,
                        PassPhase::PostProcessing => report.post_processing += 1,
                    }
                }
                Err(e) => {
                    log::error!("Pass '{}' failed during execute: {}", pass.name(), e);
                    report.failed_executes += 1;
                }
            }
            drop(pass);
            self.set_state(scheduled.handle, PassState::Executed);
        }

        for scheduled in &frame {
            let Ok(mut pass) = scheduled.pass.try_borrow_mut() else {
                continue;
            };
            pass.frame_cleanup(ctx);
            drop(pass);
            self.set_state(scheduled.handle, PassState::CleanedUp);
        }

        log::trace!(
            "Frame {}: {} passes executed ({} opaque, {} transparent, {} post)",
            report.frame_index,
            report.executed.len(),
            report.opaque,
            report.transparent,
            report.post_processing
        );
        report
    }

    /// Upgrade live entries, prune dead ones and read keys once for the frame
    fn collect(&mut self, report: &mut FrameReport) -> Vec<Scheduled> {
        let dead: Vec<PassHandle> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.pass.strong_count() == 0)
            .map(|(handle, _)| handle)
            .collect();
        for handle in dead {
            if let Some(entry) = self.entries.remove(handle) {
                log::debug!("Pruned pass '{}': owner dropped it", entry.name);
            }
        }

        let mut frame = Vec::with_capacity(self.entries.len());
        for (handle, entry) in self.entries.iter_mut() {
            entry.state = PassState::NotRun;
            let Some(pass) = entry.pass.upgrade() else {
                continue;
            };
            let key = match pass.try_borrow() {
                Ok(pass) => pass.ordering_key(),
                Err(_) => {
                    log::error!("Pass '{}' is already borrowed, skipping this frame", entry.name);
                    report.skipped += 1;
                    continue;
                }
            };
            frame.push(Scheduled {
                handle,
                pass,
                key,
                sequence: entry.sequence,
                setup_ok: false,
            });
        }
        frame
    }

    fn set_state(&mut self, handle: PassHandle, state: PassState) {
        if let Some(entry) = self.entries.get_mut(handle) {
            entry.state = state;
        }
    }
}
