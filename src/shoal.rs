//! The simulation object: registry, scheduler, timers and inputs behind one control surface.

use crate::config::Config;
use crate::entity::Entity;
use crate::geom::{Size, Vec2};
use crate::kinematics::{self, Step};
use crate::registry::Registry;
use crate::scheduler::{Decision, Density, SpawnScheduler, Task};
use crate::surface::{SpriteSpec, Surface};
use crate::timers::{Millis, TimerId, TimerQueue};
use crate::viewport::{PointerTracker, ViewportMonitor, RESIZE_DEBOUNCE_MS};
use rand::{rngs::StdRng, SeedableRng};
use tracing::{debug, info, trace};

/// Delay between an exit's fade-out request and releasing its visual.
pub const DETACH_DELAY_MS: Millis = 700.0;

pub struct Shoal<S: Surface> {
    config: Config,
    surface: S,
    rng: StdRng,
    registry: Registry,
    timers: TimerQueue<Task>,
    scheduler: SpawnScheduler,
    viewport: ViewportMonitor,
    pointer: PointerTracker,
    now: Millis,
    last_frame: Option<Millis>,
    paused: bool,
    /// A reset landed while paused; the flow restarts on resume.
    restart_on_resume: bool,
}

impl<S: Surface> Shoal<S> {
    pub fn new(config: Config, surface: S, viewport: Size, seed: u64) -> Self {
        let config = config.normalized();
        let scheduler = SpawnScheduler::new(&config);
        Self {
            config,
            surface,
            rng: StdRng::seed_from_u64(seed),
            registry: Registry::new(),
            timers: TimerQueue::new(),
            scheduler,
            viewport: ViewportMonitor::new(viewport),
            pointer: PointerTracker::default(),
            now: 0.0,
            last_frame: None,
            paused: false,
            restart_on_resume: false,
        }
    }

    /// Kick off the first burst and the spawn chain at `now`.
    pub fn start(&mut self, now: Millis) {
        self.now = now;
        self.start_flow();
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.registry.iter()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn viewport(&self) -> Size {
        self.viewport.size()
    }

    pub fn max_concurrent(&self) -> usize {
        self.scheduler.max_concurrent(&self.viewport)
    }

    /// Spawn or backoff timers currently pending; never more than one.
    pub fn pending_spawn_timers(&self) -> usize {
        self.timers
            .tasks()
            .filter(|t| matches!(t, Task::Spawn | Task::Decide))
            .count()
    }

    pub fn pending_bursts(&self) -> usize {
        self.scheduler.pending_bursts()
    }

    pub fn pending_detaches(&self) -> usize {
        self.timers
            .tasks()
            .filter(|t| matches!(t, Task::Detach(_)))
            .count()
    }

    pub fn pointer_moved(&mut self, pos: Vec2) {
        self.pointer.observe(pos);
    }

    /// Feed new viewport metrics. The reset itself waits out the debounce window.
    pub fn resize(&mut self, document: Size, window: Size) {
        if let Some(stale) = self.viewport.observe(document, window) {
            self.timers.cancel(stale);
        }
        let id = self.timers.schedule(self.now + RESIZE_DEBOUNCE_MS, Task::Reset);
        self.viewport.arm(id);
    }

    /// One host frame: fire every timer due by `now`, then move every fish.
    pub fn frame(&mut self, now: Millis) {
        self.now = self.now.max(now);
        while let Some((id, task)) = self.timers.pop_due(self.now) {
            self.fire(id, task);
        }
        let dt = match self.last_frame {
            Some(last) => kinematics::clamp_dt(self.now - last),
            None => 0.0,
        };
        self.last_frame = Some(self.now);
        self.tick(dt);
    }

    pub fn pause(&mut self) {
        self.scheduler.cancel(&mut self.timers);
        for e in self.registry.iter() {
            if let Some(h) = &e.sprite {
                self.surface.set_visible(h, false);
            }
        }
        if !self.paused {
            info!(fish = self.registry.len(), "paused");
        }
        self.paused = true;
    }

    pub fn resume(&mut self) {
        for e in self.registry.iter() {
            if let Some(h) = &e.sprite {
                self.surface.set_visible(h, true);
            }
        }
        if self.paused {
            info!(fish = self.registry.len(), "resumed");
        }
        self.paused = false;
        if std::mem::take(&mut self.restart_on_resume) {
            self.start_flow();
        } else if !self.scheduler.has_spawn_timer() {
            self.schedule_next();
        }
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        let opacity = if opacity.is_finite() {
            opacity.clamp(0.0, 1.0)
        } else {
            self.config.opacity
        };
        for e in self.registry.iter() {
            if let Some(h) = &e.sprite {
                self.surface.fade_to(h, opacity);
            }
        }
    }

    pub fn set_density(&mut self, density: Density) {
        self.scheduler.set_density(density);
        info!(
            ?density,
            max = self.scheduler.max_concurrent(&self.viewport),
            "density changed"
        );
    }

    fn fire(&mut self, id: TimerId, task: Task) {
        match task {
            Task::Decide => {
                if self.scheduler.take_spawn_timer(id) {
                    self.schedule_next();
                }
            }
            Task::Spawn => {
                if self.scheduler.take_spawn_timer(id) {
                    if self.registry.len() < self.max_concurrent() {
                        self.spawn();
                    }
                    self.schedule_next();
                }
            }
            Task::Burst => {
                if self.scheduler.take_burst(id) && self.registry.len() < self.max_concurrent() {
                    self.spawn();
                }
            }
            Task::Reset => {
                if self.viewport.take_debounce(id) {
                    self.reset();
                }
            }
            Task::Detach(handle) => {
                debug!(sprite = handle.raw(), "detached");
                self.surface.detach(handle);
            }
        }
    }

    fn tick(&mut self, dt: f32) {
        let viewport = self.viewport.size();
        let pointer = self.pointer.position();
        for e in self.registry.iter_mut() {
            match kinematics::advance(e, dt, &self.config, viewport, pointer, &mut self.rng) {
                Step::Moved => {
                    if let Some(h) = &e.sprite {
                        self.surface.place(h, e.x, e.render_y);
                    }
                }
                Step::Exited => {
                    if let Some(h) = &e.sprite {
                        self.surface.fade_to(h, 0.0);
                    }
                }
                Step::Skipped => {}
            }
        }

        let retired = self.registry.take_retired();
        if retired.is_empty() {
            return;
        }
        for mut e in retired {
            debug!(id = e.id, "fish left the viewport");
            if let Some(handle) = e.sprite.take() {
                self.timers
                    .schedule(self.now + DETACH_DELAY_MS, Task::Detach(handle));
            }
        }
        if !self.paused && !self.scheduler.has_spawn_timer() {
            self.schedule_next();
        }
    }

    fn schedule_next(&mut self) {
        let occupied = self.registry.len() + self.scheduler.pending_bursts();
        let capacity = self.max_concurrent();
        match self
            .scheduler
            .schedule_next(self.now, occupied, capacity, &mut self.timers, &mut self.rng)
        {
            Decision::Backoff { delay_ms } => trace!(occupied, capacity, delay_ms, "at capacity"),
            Decision::Spawn { delay_ms } => trace!(delay_ms, "next spawn armed"),
        }
    }

    fn start_flow(&mut self) {
        let capacity = self.max_concurrent();
        let burst = self
            .scheduler
            .start_burst(self.now, capacity, &mut self.timers, &mut self.rng);
        info!(burst, capacity, "flow started");
        self.schedule_next();
    }

    fn spawn(&mut self) {
        let id = self.registry.next_id();
        let mut e = Entity::spawn(id, &self.config, self.viewport.size(), &mut self.rng);
        e.sprite = self.surface.attach(&SpriteSpec {
            source: self.config.sprite.clone(),
            size: e.size,
            x: e.x,
            y: e.y,
        });
        if let Some(h) = &e.sprite {
            self.surface.fade_to(h, self.config.opacity);
        }
        debug!(id, size = e.size, speed = e.speed, "spawned");
        self.registry.insert(e);
    }

    fn reset(&mut self) {
        let dropped = self.registry.drain();
        info!(dropped = dropped.len(), viewport = ?self.viewport.size(), "viewport reset");
        for mut e in dropped {
            if let Some(handle) = e.sprite.take() {
                self.surface.detach(handle);
            }
        }
        if self.paused {
            self.scheduler.cancel(&mut self.timers);
            self.restart_on_resume = true;
        } else {
            self.start_flow();
        }
    }
}
