use crate::config::{Config, Repulsion};
use crate::entity::{band, rand_int, Entity, Lifecycle};
use crate::geom::{Size, Vec2};
use rand::Rng;

/// Upper bound on one tick, so a stalled host cannot teleport fish.
pub const MAX_DT_MS: f32 = 40.0;
/// Oscillator advance per millisecond.
pub const PHASE_RATE: f32 = 0.002;
/// How far past the left edge (beyond its own size) a fish travels before it exits.
pub const EXIT_MARGIN: f32 = 120.0;
/// Past `width + size + WRAP_MARGIN` a fish is considered lost to the right.
pub const WRAP_MARGIN: f32 = 320.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Moved,
    /// Crossed the exit threshold this tick; the entity is now retired.
    Exited,
    /// Already retired, nothing done.
    Skipped,
}

pub fn clamp_dt(elapsed_ms: f64) -> f32 {
    if elapsed_ms.is_finite() {
        (elapsed_ms as f32).clamp(0.0, MAX_DT_MS)
    } else {
        0.0
    }
}

/// Advance one fish by `dt` milliseconds.
pub fn advance<R: Rng>(
    e: &mut Entity,
    dt: f32,
    cfg: &Config,
    viewport: Size,
    pointer: Vec2,
    rng: &mut R,
) -> Step {
    if !e.alive() {
        return Step::Skipped;
    }
    if e.state == Lifecycle::Spawning {
        e.state = Lifecycle::Active;
    }
    let (top, bottom) = band(cfg, viewport.height);

    // Fish only ever swim left.
    e.x -= e.speed * dt;

    e.phase += dt * PHASE_RATE;
    let bob = e.phase.sin() * e.bob_amplitude;
    e.render_y = (e.y + bob).clamp(top, bottom);

    if let Some(field) = cfg.repulsion {
        let push = repel(e, pointer, field, dt);
        e.x += push.x;
        e.y = (e.y + push.y).clamp(top, bottom);
        e.render_y = (e.render_y + push.y).clamp(top, bottom);
    }

    if e.x > viewport.width + e.size + WRAP_MARGIN {
        e.x = -(e.size + rand_int(rng, 40, 200) as f32);
    }

    if e.x < -(e.size + EXIT_MARGIN) {
        e.retire();
        return Step::Exited;
    }
    Step::Moved
}

/// Displacement pushing the fish's centre away from `pointer`, zero outside the radius.
pub fn repel(e: &Entity, pointer: Vec2, field: Repulsion, dt: f32) -> Vec2 {
    let center = Vec2::new(e.x + e.size / 2.0, e.render_y + e.size / 2.0);
    let away = center - pointer;
    let dist = away.len();
    if dist <= 0.0 || dist >= field.mouse_radius {
        return Vec2::new(0.0, 0.0);
    }
    let strength = (1.0 - dist / field.mouse_radius) * field.mouse_force * dt;
    away.norm() * strength
}
