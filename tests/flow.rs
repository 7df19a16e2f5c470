use shoal::{Config, Density, Shoal, Size, SpriteHandle, SpriteSpec, Surface, Vec2};
use std::collections::HashSet;

/// Counts live handles and checks every handle is released exactly once.
#[derive(Default)]
struct Ledger {
    next: u64,
    live: HashSet<u64>,
    released: Vec<u64>,
    hidden: HashSet<u64>,
}

impl Surface for Ledger {
    fn attach(&mut self, _spec: &SpriteSpec) -> Option<SpriteHandle> {
        self.next += 1;
        self.live.insert(self.next);
        Some(SpriteHandle::new(self.next))
    }

    fn place(&mut self, _handle: &SpriteHandle, _x: f32, _y: f32) {}

    fn fade_to(&mut self, _handle: &SpriteHandle, _opacity: f32) {}

    fn set_visible(&mut self, handle: &SpriteHandle, visible: bool) {
        if visible {
            self.hidden.remove(&handle.raw());
        } else {
            self.hidden.insert(handle.raw());
        }
    }

    fn detach(&mut self, handle: SpriteHandle) {
        assert!(self.live.remove(&handle.raw()), "double release of {}", handle.raw());
        self.released.push(handle.raw());
    }
}

fn frames(s: &mut Shoal<Ledger>, from: f64, to: f64) -> f64 {
    let mut t = from;
    while t < to {
        t += 16.0;
        s.frame(t);
    }
    t
}

#[test]
fn long_run_with_resizes_and_pauses_never_leaks_visuals() {
    let cfg = Config {
        min_speed: 0.4,
        max_speed: 0.8,
        ..Config::default()
    };
    let mut s = Shoal::new(cfg, Ledger::default(), Size::new(1400.0, 900.0), 99);
    s.start(0.0);
    let mut t = frames(&mut s, 0.0, 20_000.0);

    s.resize(Size::new(500.0, 800.0), Size::new(480.0, 820.0));
    t = frames(&mut s, t, t + 100.0);
    s.resize(Size::new(520.0, 800.0), Size::new(480.0, 820.0));
    t = frames(&mut s, t, t + 5_000.0);
    assert!(s.len() <= 2);

    s.pause();
    t = frames(&mut s, t, t + 10_000.0);
    s.resume();
    s.set_density(Density::High);
    s.resize(Size::new(1920.0, 1080.0), Size::new(1920.0, 1080.0));
    t = frames(&mut s, t, t + 30_000.0);
    assert!(s.len() <= 6);

    // Everything left over must be exactly the registry plus fading fish.
    let in_registry = s.entities().filter(|e| e.sprite.is_some()).count();
    assert_eq!(s.surface().live.len(), in_registry + s.pending_detaches());

    // A reset while paused empties the registry; the fading stragglers follow within 700 ms.
    s.pause();
    s.resize(Size::new(1000.0, 1000.0), Size::new(0.0, 0.0));
    frames(&mut s, t, t + 1_000.0);
    assert_eq!(s.len(), 0);
    assert_eq!(s.pending_detaches(), 0);
    assert!(s.surface().live.is_empty());
}

#[test]
fn pointer_is_read_only_input() {
    let mut s = Shoal::new(Config::default(), Ledger::default(), Size::new(1400.0, 900.0), 3);
    s.pointer_moved(Vec2::new(300.0, 300.0));
    s.start(0.0);
    frames(&mut s, 0.0, 3_000.0);
    assert!(s.len() > 0);
    assert_eq!(s.surface().hidden.len(), 0);
}
