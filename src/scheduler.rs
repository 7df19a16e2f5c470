//! Spawn pacing: when a new fish may appear, and the initial staggered burst.
//!
//! The scheduler owns timer *handles* only; timers live in the shared
//! [`TimerQueue`] and come back to [`crate::Shoal`] as [`Task`]s. At most one
//! spawn-or-backoff timer is ever pending: arming a new one cancels the old.

use crate::entity::rand_between;
use crate::timers::{Millis, TimerId, TimerQueue};
use crate::viewport::ViewportMonitor;
use rand::Rng;
use std::str::FromStr;
use thiserror::Error;

/// Retry window while the registry is full.
pub const BACKOFF_MS: (f32, f32) = (600.0, 1500.0);

/// Burst stagger: base + index * step + jitter.
const BURST_BASE_MS: f32 = 200.0;
const BURST_STEP_MS: f32 = 450.0;
const BURST_JITTER_MS: f32 = 700.0;

#[derive(Debug)]
pub enum Task {
    /// Re-run the capacity check (registry was full last time).
    Decide,
    /// Spawn one fish, then decide again.
    Spawn,
    /// One staggered fish from `start_flow`.
    Burst,
    /// Debounced viewport reset.
    Reset,
    /// Release a retired fish's visual.
    Detach(crate::surface::SpriteHandle),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Spawn { delay_ms: u32 },
    Backoff { delay_ms: u32 },
}

/// Named or explicit concurrency level.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Density {
    Low,
    Normal,
    High,
    Count(f64),
}

impl Density {
    pub fn max_concurrent(self) -> usize {
        match self {
            Density::Low => 1,
            Density::Normal => 3,
            Density::High => 6,
            Density::Count(n) if n.is_finite() => n.round().max(1.0) as usize,
            Density::Count(_) => 1,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown density level {0:?} (expected low, normal, high or a number)")]
pub struct DensityError(pub String);

impl FromStr for Density {
    type Err = DensityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        match t.to_ascii_lowercase().as_str() {
            "low" => Ok(Density::Low),
            "normal" => Ok(Density::Normal),
            "high" => Ok(Density::High),
            _ => t
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Density::Count)
                .ok_or_else(|| DensityError(s.to_string())),
        }
    }
}

#[derive(Debug)]
pub struct SpawnScheduler {
    max_concurrent: usize,
    adapt_max_on_small: usize,
    delay: (f32, f32),
    initial_burst: usize,
    spawn_timer: Option<TimerId>,
    bursts: Vec<TimerId>,
}

impl SpawnScheduler {
    pub fn new(cfg: &crate::config::Config) -> Self {
        Self {
            max_concurrent: cfg.max_concurrent.max(1),
            adapt_max_on_small: cfg.adapt_max_on_small,
            delay: (cfg.spawn_min_delay, cfg.spawn_max_delay),
            initial_burst: cfg.initial_burst,
            spawn_timer: None,
            bursts: Vec::new(),
        }
    }

    /// Capacity for the viewport as it is right now.
    pub fn max_concurrent(&self, viewport: &ViewportMonitor) -> usize {
        if viewport.is_small() {
            self.adapt_max_on_small.max(1)
        } else {
            self.max_concurrent
        }
    }

    pub fn set_density(&mut self, density: Density) {
        self.max_concurrent = density.max_concurrent();
    }

    pub fn has_spawn_timer(&self) -> bool {
        self.spawn_timer.is_some()
    }

    pub fn pending_bursts(&self) -> usize {
        self.bursts.len()
    }

    /// Arm the next spawn or backoff, replacing whatever was pending.
    /// `occupied` counts live fish plus bursts still in flight.
    pub fn schedule_next<R: Rng>(
        &mut self,
        now: Millis,
        occupied: usize,
        capacity: usize,
        timers: &mut TimerQueue<Task>,
        rng: &mut R,
    ) -> Decision {
        self.cancel_spawn(timers);
        if occupied >= capacity {
            let delay_ms = rand_between(rng, BACKOFF_MS.0, BACKOFF_MS.1) as u32;
            self.spawn_timer = Some(timers.schedule(now + delay_ms as Millis, Task::Decide));
            Decision::Backoff { delay_ms }
        } else {
            let delay_ms = rand_between(rng, self.delay.0, self.delay.1) as u32;
            self.spawn_timer = Some(timers.schedule(now + delay_ms as Millis, Task::Spawn));
            Decision::Spawn { delay_ms }
        }
    }

    /// Arm the staggered burst for a fresh start. Returns how many fish it will bring.
    pub fn start_burst<R: Rng>(
        &mut self,
        now: Millis,
        capacity: usize,
        timers: &mut TimerQueue<Task>,
        rng: &mut R,
    ) -> usize {
        self.cancel(timers);
        let burst = self.initial_burst.min(capacity).max(1);
        for i in 0..burst {
            let delay = BURST_BASE_MS
                + i as f32 * BURST_STEP_MS
                + rand_between(rng, 0.0, BURST_JITTER_MS);
            self.bursts
                .push(timers.schedule(now + delay as Millis, Task::Burst));
        }
        burst
    }

    /// Claim a fired spawn/decide timer. `false` means it was superseded.
    pub fn take_spawn_timer(&mut self, id: TimerId) -> bool {
        if self.spawn_timer == Some(id) {
            self.spawn_timer = None;
            true
        } else {
            false
        }
    }

    pub fn take_burst(&mut self, id: TimerId) -> bool {
        match self.bursts.iter().position(|b| *b == id) {
            Some(i) => {
                self.bursts.swap_remove(i);
                true
            }
            None => false,
        }
    }

    pub fn cancel_spawn(&mut self, timers: &mut TimerQueue<Task>) {
        if let Some(id) = self.spawn_timer.take() {
            timers.cancel(id);
        }
    }

    /// Cancel the spawn timer and any burst still in flight.
    pub fn cancel(&mut self, timers: &mut TimerQueue<Task>) {
        self.cancel_spawn(timers);
        for id in self.bursts.drain(..) {
            timers.cancel(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::geom::Size;
    use rand::{rngs::StdRng, SeedableRng};

    fn spawn_timers(q: &TimerQueue<Task>) -> usize {
        q.tasks()
            .filter(|t| matches!(t, Task::Spawn | Task::Decide))
            .count()
    }

    #[test]
    fn small_viewport_adapts_capacity() {
        let cfg = Config::default();
        let s = SpawnScheduler::new(&cfg);
        let phone = ViewportMonitor::new(Size::new(375.0, 600.0));
        let desk = ViewportMonitor::new(Size::new(1920.0, 1080.0));
        assert_eq!(s.max_concurrent(&phone), 2);
        assert_eq!(s.max_concurrent(&desk), 10);
    }

    #[test]
    fn rescheduling_keeps_one_timer() {
        let mut s = SpawnScheduler::new(&Config::default());
        let mut q = TimerQueue::new();
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..5 {
            s.schedule_next(0.0, 0, 10, &mut q, &mut rng);
        }
        assert_eq!(spawn_timers(&q), 1);
        assert!(s.has_spawn_timer());
    }

    #[test]
    fn full_registry_backs_off() {
        let mut s = SpawnScheduler::new(&Config::default());
        let mut q = TimerQueue::new();
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..50 {
            match s.schedule_next(0.0, 3, 3, &mut q, &mut rng) {
                Decision::Backoff { delay_ms } => assert!((600..1500).contains(&delay_ms)),
                other => panic!("expected backoff, got {other:?}"),
            }
        }
        assert!(matches!(q.tasks().next(), Some(Task::Decide)));
    }

    #[test]
    fn spawn_delay_within_bounds() {
        let mut s = SpawnScheduler::new(&Config::default());
        let mut q = TimerQueue::new();
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..50 {
            match s.schedule_next(1000.0, 0, 3, &mut q, &mut rng) {
                Decision::Spawn { delay_ms } => assert!((100..2000).contains(&delay_ms)),
                other => panic!("expected spawn, got {other:?}"),
            }
        }
    }

    #[test]
    fn burst_is_capped_and_staggered() {
        let mut s = SpawnScheduler::new(&Config::default());
        let mut q = TimerQueue::new();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(s.start_burst(0.0, 2, &mut q, &mut rng), 2);
        assert_eq!(s.pending_bursts(), 2);
        assert_eq!(s.start_burst(0.0, 10, &mut q, &mut rng), 4);
        assert_eq!(q.len(), 4);
        let mut fired = Vec::new();
        while let Some((id, _)) = q.pop_due(f64::MAX) {
            assert!(s.take_burst(id));
            fired.push(id);
        }
        assert_eq!(fired.len(), 4);
        assert_eq!(s.pending_bursts(), 0);
    }

    #[test]
    fn cancel_is_total() {
        let mut s = SpawnScheduler::new(&Config::default());
        let mut q = TimerQueue::new();
        let mut rng = StdRng::seed_from_u64(1);
        s.start_burst(0.0, 10, &mut q, &mut rng);
        s.schedule_next(0.0, 4, 10, &mut q, &mut rng);
        s.cancel(&mut q);
        assert!(q.is_empty());
        assert!(!s.has_spawn_timer());
    }

    #[test]
    fn density_levels() {
        assert_eq!("low".parse::<Density>().unwrap().max_concurrent(), 1);
        assert_eq!("Normal".parse::<Density>().unwrap().max_concurrent(), 3);
        assert_eq!(" high ".parse::<Density>().unwrap().max_concurrent(), 6);
        assert_eq!("4.6".parse::<Density>().unwrap().max_concurrent(), 5);
        assert_eq!(Density::Count(-3.0).max_concurrent(), 1);
        assert_eq!(
            "lots".parse::<Density>(),
            Err(DensityError("lots".to_string()))
        );
    }
}
