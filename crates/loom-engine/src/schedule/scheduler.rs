use std::time::{Duration, Instant};

use super::mode::{FramePlan, RenderMode, RenderPass};

/// Refinement delays.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Draft frame → medium frame.
    pub medium_delay: Duration,
    /// Medium frame → high quality frame.
    pub high_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            medium_delay: Duration::from_millis(85),
            high_delay: Duration::from_millis(120),
        }
    }
}

/// Identifies one arming of the timer slot. A token that no longer matches
/// the pending timer is stale and firing it does nothing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum TimerStep {
    /// Deferred `render()`.
    Render,
    Medium,
    High,
}

#[derive(Debug, Copy, Clone)]
struct PendingTimer {
    token: TimerToken,
    deadline: Instant,
    step: TimerStep,
}

/// State machine deciding which passes to record and when.
///
/// At most one animation frame and one timer are pending at any time.
#[derive(Debug)]
pub struct RenderScheduler {
    config: SchedulerConfig,
    mode: RenderMode,
    frame_pending: bool,
    timer: Option<PendingTimer>,
    next_token: u64,
}

impl Default for RenderScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl RenderScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            mode: RenderMode::Draft,
            frame_pending: false,
            timer: None,
            next_token: 0,
        }
    }

    pub fn config(&self) -> SchedulerConfig {
        self.config
    }

    /// Mode of the next pass to be recorded.
    #[inline]
    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    #[inline]
    pub fn frame_pending(&self) -> bool {
        self.frame_pending
    }

    pub fn pending_timer(&self) -> Option<(TimerToken, Instant)> {
        self.timer.map(|t| (t.token, t.deadline))
    }

    /// Requests a fresh draft frame.
    ///
    /// Returns `true` if a new animation frame must be requested, `false`
    /// when the call coalesced into the already pending one.
    pub fn render(&mut self) -> bool {
        if self.frame_pending {
            log::trace!("render coalesced into pending frame");
            return false;
        }
        if let Some(t) = self.timer.take() {
            log::trace!("render cancels {:?} timer", t.step);
        }
        self.mode = RenderMode::Draft;
        self.frame_pending = true;
        true
    }

    /// Defers a [`render`](Self::render) by `delay`, replacing an earlier
    /// deferred render.
    ///
    /// Ignored while a frame or a refinement step is pending: only `render()`
    /// cancels refinement.
    pub fn schedule_render(&mut self, now: Instant, delay: Duration) -> Option<TimerToken> {
        if self.frame_pending {
            log::trace!("schedule_render ignored, frame pending");
            return None;
        }
        if let Some(t) = self.timer.filter(|t| t.step != TimerStep::Render) {
            log::debug!("schedule_render ignored, {:?} refinement pending", t.step);
            return None;
        }
        Some(self.arm(now + delay, TimerStep::Render))
    }

    /// Animation frame callback: draft to the surface, then the picking frame.
    pub fn on_animation_frame(&mut self, now: Instant) -> FramePlan {
        if !self.frame_pending {
            log::debug!("animation frame without pending request");
            return FramePlan::empty();
        }
        self.frame_pending = false;

        let plan = FramePlan::new(vec![
            RenderPass::surface(RenderMode::Draft, true),
            RenderPass::picking(),
        ]);
        self.mode = RenderMode::Medium;
        self.arm(now + self.config.medium_delay, TimerStep::Medium);
        log::trace!("draft frame recorded, medium armed");
        plan
    }

    /// Timer callback for `token`.
    ///
    /// A deferred render only requests the animation frame (check
    /// [`frame_pending`](Self::frame_pending)); refinement steps return
    /// their passes.
    pub fn on_timer(&mut self, now: Instant, token: TimerToken) -> FramePlan {
        let Some(timer) = self.timer.filter(|t| t.token == token) else {
            log::debug!("stale timer {token:?} ignored");
            return FramePlan::empty();
        };
        self.timer = None;

        match timer.step {
            TimerStep::Render => {
                self.render();
                FramePlan::empty()
            }
            TimerStep::Medium => {
                let plan = FramePlan::new(vec![RenderPass::surface(RenderMode::Medium, true)]);
                self.mode = RenderMode::HighPass1;
                self.arm(now + self.config.high_delay, TimerStep::High);
                log::trace!("medium frame recorded, high armed");
                plan
            }
            TimerStep::High => {
                self.mode = RenderMode::HighPass2;
                log::trace!("high frame recorded, refinement done");
                FramePlan::new(vec![
                    RenderPass::surface(RenderMode::HighPass1, true),
                    RenderPass::surface(RenderMode::HighPass2, false),
                ])
            }
        }
    }

    /// Fires the pending timer if its deadline has passed.
    pub fn fire_due(&mut self, now: Instant) -> FramePlan {
        match self.timer {
            Some(t) if t.deadline <= now => self.on_timer(now, t.token),
            _ => FramePlan::empty(),
        }
    }

    /// Drops the pending timer and frame request.
    pub fn cancel(&mut self) {
        self.timer = None;
        self.frame_pending = false;
    }

    fn arm(&mut self, deadline: Instant, step: TimerStep) -> TimerToken {
        let token = TimerToken(self.next_token);
        self.next_token += 1;
        self.timer = Some(PendingTimer { token, deadline, step });
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::PassTarget;

    fn modes(plan: &FramePlan) -> Vec<(RenderMode, PassTarget, bool)> {
        plan.passes().iter().map(|p| (p.mode, p.target, p.clear)).collect()
    }

    #[test]
    fn two_renders_before_frame_coalesce() {
        let mut s = RenderScheduler::default();
        assert!(s.render());
        assert!(!s.render());

        let t0 = Instant::now();
        let plan = s.on_animation_frame(t0);
        assert_eq!(
            modes(&plan),
            vec![
                (RenderMode::Draft, PassTarget::Surface, true),
                (RenderMode::Picking, PassTarget::Picking, true),
            ]
        );
        assert!(s.on_animation_frame(t0).is_empty());
    }

    #[test]
    fn refinement_chain_runs_to_completion() {
        let mut s = RenderScheduler::default();
        let t0 = Instant::now();
        s.render();
        s.on_animation_frame(t0);
        assert_eq!(s.mode(), RenderMode::Medium);

        let (tok, at) = s.pending_timer().unwrap();
        assert_eq!(at, t0 + Duration::from_millis(85));
        let plan = s.on_timer(at, tok);
        assert_eq!(modes(&plan), vec![(RenderMode::Medium, PassTarget::Surface, true)]);
        assert_eq!(s.mode(), RenderMode::HighPass1);

        let (tok, at2) = s.pending_timer().unwrap();
        assert_eq!(at2, at + Duration::from_millis(120));
        let plan = s.on_timer(at2, tok);
        assert_eq!(
            modes(&plan),
            vec![
                (RenderMode::HighPass1, PassTarget::Surface, true),
                (RenderMode::HighPass2, PassTarget::Surface, false),
            ]
        );
        assert!(s.pending_timer().is_none());
        assert!(!s.frame_pending());
    }

    #[test]
    fn render_cancels_refinement_and_stale_token_is_noop() {
        let mut s = RenderScheduler::default();
        let t0 = Instant::now();
        s.render();
        s.on_animation_frame(t0);
        let (stale, _) = s.pending_timer().unwrap();

        assert!(s.render());
        assert!(s.pending_timer().is_none());
        assert!(s.on_timer(t0 + Duration::from_secs(1), stale).is_empty());
        assert_eq!(s.mode(), RenderMode::Draft);
        assert!(s.frame_pending());
    }

    #[test]
    fn deferred_render_requests_frame_on_fire() {
        let mut s = RenderScheduler::default();
        let t0 = Instant::now();
        let tok = s.schedule_render(t0, Duration::from_millis(10)).unwrap();
        assert!(s.fire_due(t0).is_empty());
        assert!(!s.frame_pending());

        assert!(s.fire_due(t0 + Duration::from_millis(10)).is_empty());
        assert!(s.frame_pending());
        assert!(s.schedule_render(t0, Duration::ZERO).is_none());
        assert!(s.on_timer(t0, tok).is_empty());
    }

    #[test]
    fn deferred_render_replaces_only_deferred_render() {
        let mut s = RenderScheduler::default();
        let t0 = Instant::now();
        let first = s.schedule_render(t0, Duration::from_millis(50)).unwrap();
        let second = s.schedule_render(t0, Duration::from_millis(20)).unwrap();
        assert!(s.on_timer(t0, first).is_empty());
        assert_eq!(s.pending_timer(), Some((second, t0 + Duration::from_millis(20))));
    }

    #[test]
    fn deferred_render_keeps_pending_refinement() {
        let mut s = RenderScheduler::default();
        let t0 = Instant::now();
        s.render();
        s.on_animation_frame(t0);
        let (medium, at) = s.pending_timer().unwrap();

        assert!(s.schedule_render(t0, Duration::from_secs(5)).is_none());
        assert_eq!(s.pending_timer(), Some((medium, at)));
        let plan = s.on_timer(at, medium);
        assert_eq!(modes(&plan), vec![(RenderMode::Medium, PassTarget::Surface, true)]);
    }
}
