use crate::config::Config;
use crate::geom::Size;
use crate::surface::SpriteHandle;
use rand::Rng;
use std::f32::consts::PI;

/// Smallest bob amplitude drawn at spawn.
pub const MIN_BOB: f32 = 4.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    /// Created; the fade-in runs on the surface and does not gate motion.
    Spawning,
    Active,
    /// Past the left exit; no more motion, waiting to be compacted out of the registry.
    FadingOut,
}

/// One fish.
#[derive(Debug)]
pub struct Entity {
    pub id: u64,
    pub x: f32,
    /// Anchor height. The bob is applied on top of it, see [`Entity::render_y`].
    pub y: f32,
    pub render_y: f32,
    pub size: f32,
    pub speed: f32,
    pub phase: f32,
    pub bob_amplitude: f32,
    pub state: Lifecycle,
    pub sprite: Option<SpriteHandle>,
}

impl Entity {
    /// Roll a fresh fish just beyond the right edge of `viewport`.
    pub fn spawn<R: Rng>(id: u64, cfg: &Config, viewport: Size, rng: &mut R) -> Self {
        let size = rand_int(rng, cfg.min_size.ceil() as i64, cfg.max_size.floor() as i64) as f32;
        let size = size.clamp(cfg.min_size, cfg.max_size);
        let (top, bottom) = band(cfg, viewport.height);
        let y = rand_between(rng, top, bottom);
        let x = viewport.width + rand_int(rng, 40, 320) as f32;
        let speed = (rand_between(rng, cfg.min_speed, cfg.max_speed) * (size / cfg.mid_size()))
            .max(f32::MIN_POSITIVE);

        Self {
            id,
            x,
            y,
            render_y: y,
            size,
            speed,
            phase: rand_between(rng, 0.0, PI * 2.0),
            bob_amplitude: rand_between(rng, MIN_BOB, cfg.jitter_y),
            state: Lifecycle::Spawning,
            sprite: None,
        }
    }

    pub fn alive(&self) -> bool {
        self.state != Lifecycle::FadingOut
    }

    /// Flip to [`Lifecycle::FadingOut`]. Returns `false` if it already happened.
    pub fn retire(&mut self) -> bool {
        if self.alive() {
            self.state = Lifecycle::FadingOut;
            true
        } else {
            false
        }
    }
}

/// Allowed vertical band for a viewport of height `h`.
pub fn band(cfg: &Config, h: f32) -> (f32, f32) {
    let top = h * cfg.vertical_margin;
    let bottom = h * (1.0 - cfg.vertical_margin);
    (top, bottom.max(top))
}

/// Uniform in `[min, max)`; `min` when the range is empty.
pub fn rand_between<R: Rng>(rng: &mut R, min: f32, max: f32) -> f32 {
    if max > min {
        rng.gen_range(min..max)
    } else {
        min
    }
}

/// Uniform integer in `[min, max]`.
pub fn rand_int<R: Rng>(rng: &mut R, min: i64, max: i64) -> i64 {
    if max > min {
        rng.gen_range(min..=max)
    } else {
        min
    }
}
