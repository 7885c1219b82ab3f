use std::time::{Duration, Instant};

/// Raw input the host forwards; each one asks for a position recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerEvent {
    SelectionChange,
    KeyDown,
    KeyUp,
    Input,
    MouseDown,
    MouseUp,
    TouchStart,
    TouchEnd,
    Scroll,
    Resize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecomputeReason {
    Trigger(TriggerEvent),
    Boot(u32),
    Init,
    Sync,
}

/// How the host offers rendering opportunities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSource {
    /// The host calls back once per visual frame.
    AnimationFrame,
    /// No frame callbacks; run after a fixed delay instead.
    Timer(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingRecompute {
    reason: RecomputeReason,
    due: Instant,
}

/// Single-slot debounce: at most one recompute is ever pending.
#[derive(Debug, Clone)]
pub struct PositionScheduler {
    frames: FrameSource,
    pending: Option<PendingRecompute>,
    coalesced: u64,
}

impl PositionScheduler {
    pub fn new(frames: FrameSource) -> Self {
        Self {
            frames,
            pending: None,
            coalesced: 0,
        }
    }

    pub fn frame_source(&self) -> FrameSource {
        self.frames
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Triggers folded into an already pending recompute so far.
    pub fn coalesced(&self) -> u64 {
        self.coalesced
    }

    /// Request a recompute. Returns `false` when one is already pending.
    pub fn schedule(&mut self, reason: RecomputeReason, now: Instant) -> bool {
        if self.pending.is_some() {
            self.coalesced += 1;
            return false;
        }
        let due = match self.frames {
            FrameSource::AnimationFrame => now,
            FrameSource::Timer(delay) => now + delay,
        };
        self.pending = Some(PendingRecompute { reason, due });
        true
    }

    /// Claim the pending recompute for this frame. The slot is cleared before
    /// the caller runs it so triggers raised meanwhile schedule a fresh one.
    pub fn take_for_frame(&mut self) -> Option<RecomputeReason> {
        match self.frames {
            FrameSource::AnimationFrame => self.pending.take().map(|p| p.reason),
            FrameSource::Timer(_) => None,
        }
    }

    /// Claim the pending recompute if its fallback delay has elapsed.
    pub fn take_due(&mut self, now: Instant) -> Option<RecomputeReason> {
        match (self.frames, self.pending) {
            (FrameSource::Timer(_), Some(p)) if p.due <= now => {
                self.pending = None;
                Some(p.reason)
            }
            _ => None,
        }
    }
}
