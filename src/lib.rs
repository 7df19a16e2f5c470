//! Drifting-fish background simulation.
//!
//! A [`Shoal`] keeps a small population of fish that spawn beyond the right edge
//! of the viewport, swim left while bobbing, optionally shy away from the
//! pointer, and are retired once they leave on the left. Drawing is delegated to
//! a [`Surface`]; time is whatever the host passes to [`Shoal::frame`].

pub mod config;
pub mod entity;
pub mod geom;
pub mod kinematics;
pub mod registry;
pub mod scheduler;
pub mod shoal;
pub mod surface;
pub mod timers;
pub mod viewport;

pub use config::{Config, ConfigError, Repulsion};
pub use geom::{Size, Vec2};
pub use scheduler::{Density, DensityError};
pub use shoal::Shoal;
pub use surface::{SpriteHandle, SpriteSpec, Surface};
pub use timers::Millis;
