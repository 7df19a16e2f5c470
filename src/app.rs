use crate::input::{collect_actions, Action};
use crate::render::{canvas_to_cells, viewport_px, BrailleCanvas, Species, SpriteLayer, Terminal};
use crossterm::style::Color;
use shoal::{Config, Density, Shoal};
use std::time::{Duration, Instant};
use tracing::info;

const BG: Color = Color::AnsiValue(16);
const HUD_FG: Color = Color::AnsiValue(159);
const KEYS: &str = "space pause  1-3 density  +/- opacity  h hud  q quit ";

pub(crate) struct Options {
    pub(crate) config: Config,
    pub(crate) seed: u64,
    pub(crate) density: Option<Density>,
    pub(crate) fps: u32,
}

pub(crate) struct App {
    shoal: Shoal<SpriteLayer>,
    term: Terminal,
    canvas: BrailleCanvas,
    species: Species,
    opacity: f32,
    show_hud: bool,
    should_quit: bool,
    started: Instant,
    fps: u32,
}

impl App {
    fn init(opts: Options) -> anyhow::Result<Self> {
        let term = Terminal::begin()?;
        let canvas = BrailleCanvas::new(term.cols, term.rows);
        let viewport = viewport_px(term.cols, term.rows);
        let species = Species::from_source(&opts.config.sprite);
        let opacity = opts.config.opacity;

        let mut shoal = Shoal::new(opts.config, SpriteLayer::new(), viewport, opts.seed);
        if let Some(d) = opts.density {
            shoal.set_density(d);
        }
        info!(
            cols = term.cols,
            rows = term.rows,
            max = shoal.max_concurrent(),
            "terminal ready"
        );

        Ok(Self {
            shoal,
            term,
            canvas,
            species,
            opacity,
            show_hud: true,
            should_quit: false,
            started: Instant::now(),
            fps: opts.fps.clamp(10, 240),
        })
    }

    fn now_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    fn run(&mut self) -> anyhow::Result<()> {
        let frame_dt = Duration::from_secs_f32(1.0 / self.fps as f32);
        self.shoal.start(self.now_ms());

        while !self.should_quit {
            let frame_start = Instant::now();

            let actions = collect_actions(frame_dt)?;
            let now = self.now_ms();
            self.shoal.surface_mut().set_clock(now);
            for action in actions {
                self.apply(action);
            }
            self.shoal.frame(now);

            self.render()?;
            spin_sleep(frame_dt, frame_start);
        }
        Ok(())
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::TogglePause => {
                if self.shoal.is_paused() {
                    self.shoal.resume();
                } else {
                    self.shoal.pause();
                }
            }
            Action::Density(d) => self.shoal.set_density(d),
            Action::Opacity(delta) => {
                self.opacity = (self.opacity + delta).clamp(0.0, 1.0);
                self.shoal.set_opacity(self.opacity);
            }
            Action::ToggleHud => self.show_hud = !self.show_hud,
            Action::Redraw => self.term.redraw_all(),
            Action::Pointer(p) => self.shoal.pointer_moved(p),
            Action::Resize(cols, rows) => {
                self.term.resize(cols, rows);
                self.canvas.resize(cols, rows);
                let px = viewport_px(cols, rows);
                self.shoal.resize(px, px);
            }
        }
    }

    fn render(&mut self) -> anyhow::Result<()> {
        self.term.clear(BG);
        self.shoal.surface().draw(&mut self.canvas);

        // The HUD row is foreground content; fish stay behind it.
        let hud_rows = u16::from(self.show_hud);
        canvas_to_cells(&self.canvas, &mut self.term, self.species, BG, hud_rows);
        if self.show_hud {
            let line = format!(
                " shoal | fish {}/{} | sprites {} | {} | opacity {:.1} | {}",
                self.shoal.len(),
                self.shoal.max_concurrent(),
                self.shoal.surface().len(),
                if self.shoal.is_paused() { "paused" } else { "running" },
                self.opacity,
                KEYS,
            );
            let w = self.term.cols as usize;
            let line: String = line.chars().take(w).collect();
            self.term.text(0, 0, &line, HUD_FG, BG);
        }
        self.term.present()?;
        Ok(())
    }
}

pub(crate) fn run(opts: Options) -> anyhow::Result<()> {
    let mut app = App::init(opts)?;
    let result = app.run();
    drop(app);
    info!("bye");
    result
}

/* -----------------------------
   Frame pacing helper
------------------------------ */

fn spin_sleep(target: Duration, start: Instant) {
    let end = start + target;
    loop {
        let t = Instant::now();
        if t >= end {
            break;
        }
        let left = end - t;
        if left > Duration::from_millis(2) {
            std::thread::sleep(Duration::from_millis(1));
        } else {
            std::hint::spin_loop();
        }
    }
}
