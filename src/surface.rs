//! The seam between the simulation and whatever draws the fish.
//!
//! A surface hands out [`SpriteHandle`]s. Each handle is owned by exactly one
//! entity (or, after exit, by its pending detach timer) and is given back with
//! [`Surface::detach`]. Surfaces must ignore handles they no longer know about.

/// Owned token for one visual. Not `Clone`: whoever holds it is responsible for detaching it.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct SpriteHandle(u64);

impl SpriteHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// What a surface needs to create a visual. Sprites are drawn mirrored so they face
/// left, never take pointer input, and sit behind foreground content.
#[derive(Clone, Debug, PartialEq)]
pub struct SpriteSpec {
    pub source: String,
    pub size: f32,
    pub x: f32,
    pub y: f32,
}

pub trait Surface {
    /// Create a visual at zero opacity. `None` when the surface cannot provide one;
    /// the entity then simulates without a visual.
    fn attach(&mut self, spec: &SpriteSpec) -> Option<SpriteHandle>;
    fn place(&mut self, handle: &SpriteHandle, x: f32, y: f32);
    /// Start a transition towards `opacity`.
    fn fade_to(&mut self, handle: &SpriteHandle, opacity: f32);
    fn set_visible(&mut self, handle: &SpriteHandle, visible: bool);
    fn detach(&mut self, handle: SpriteHandle);
}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Clone, Debug, PartialEq)]
    pub(crate) struct Sprite {
        pub(crate) spec: SpriteSpec,
        pub(crate) x: f32,
        pub(crate) y: f32,
        pub(crate) opacity: f32,
        pub(crate) visible: bool,
    }

    /// Keeps sprite state in memory so tests can look at what the simulation asked for.
    #[derive(Default)]
    pub(crate) struct RecordingSurface {
        next: u64,
        pub(crate) sprites: BTreeMap<u64, Sprite>,
        pub(crate) detached: Vec<u64>,
        pub(crate) refuse: bool,
    }

    impl RecordingSurface {
        pub(crate) fn live(&self) -> usize {
            self.sprites.len()
        }
    }

    impl Surface for RecordingSurface {
        fn attach(&mut self, spec: &SpriteSpec) -> Option<SpriteHandle> {
            if self.refuse {
                return None;
            }
            self.next += 1;
            self.sprites.insert(
                self.next,
                Sprite {
                    spec: spec.clone(),
                    x: spec.x,
                    y: spec.y,
                    opacity: 0.0,
                    visible: true,
                },
            );
            Some(SpriteHandle::new(self.next))
        }

        fn place(&mut self, handle: &SpriteHandle, x: f32, y: f32) {
            if let Some(s) = self.sprites.get_mut(&handle.raw()) {
                s.x = x;
                s.y = y;
            }
        }

        fn fade_to(&mut self, handle: &SpriteHandle, opacity: f32) {
            if let Some(s) = self.sprites.get_mut(&handle.raw()) {
                s.opacity = opacity;
            }
        }

        fn set_visible(&mut self, handle: &SpriteHandle, visible: bool) {
            if let Some(s) = self.sprites.get_mut(&handle.raw()) {
                s.visible = visible;
            }
        }

        fn detach(&mut self, handle: SpriteHandle) {
            if self.sprites.remove(&handle.raw()).is_some() {
                self.detached.push(handle.raw());
            }
        }
    }
}
