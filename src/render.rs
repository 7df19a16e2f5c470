use crossterm::{
    cursor,
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use shoal::{Millis, Size, SpriteHandle, SpriteSpec, Surface};
use std::collections::BTreeMap;
use std::io::{self, Stdout, Write};

// Virtual pixels per terminal cell, and braille subpixels per cell.
pub(crate) const CELL_W: f32 = 8.0;
pub(crate) const CELL_H: f32 = 16.0;
const SUB_X: usize = 2;
const SUB_Y: usize = 4;
const PX_PER_SUB_X: f32 = CELL_W / SUB_X as f32;
const PX_PER_SUB_Y: f32 = CELL_H / SUB_Y as f32;

/// Opacity transition length, matching a CSS `opacity 650ms ease`.
const FADE_MS: Millis = 650.0;

pub(crate) fn viewport_px(cols: u16, rows: u16) -> Size {
    Size::new(cols as f32 * CELL_W, rows as f32 * CELL_H)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Color,
    pub(crate) bg: Color,
}

impl Cell {
    fn blank(bg: Color) -> Self {
        Self {
            ch: ' ',
            fg: Color::Reset,
            bg,
        }
    }
}

/* -----------------------------
   Terminal: double-buffered cells
------------------------------ */

pub(crate) struct Terminal {
    out: Stdout,
    pub(crate) cols: u16,
    pub(crate) rows: u16,
    front: Vec<Cell>,
    back: Vec<Cell>,
    full_redraw: bool,
    _restore: RestoreGuard,
}

impl Terminal {
    pub(crate) fn begin() -> anyhow::Result<Self> {
        let mut out = io::stdout();
        // Armed before anything changes, so an early `?` still restores the terminal.
        let restore = RestoreGuard;
        execute!(
            out,
            EnterAlternateScreen,
            cursor::Hide,
            DisableLineWrap,
            EnableMouseCapture,
            Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;

        let (cols, rows) = terminal::size()?;
        let n = cols as usize * rows as usize;
        Ok(Self {
            out,
            cols,
            rows,
            front: vec![Cell::blank(Color::Black); n],
            back: vec![Cell::blank(Color::Black); n],
            full_redraw: true,
            _restore: restore,
        })
    }

    pub(crate) fn resize(&mut self, cols: u16, rows: u16) {
        self.cols = cols;
        self.rows = rows;
        let n = cols as usize * rows as usize;
        self.front = vec![Cell::blank(Color::Black); n];
        self.back = vec![Cell::blank(Color::Black); n];
        self.full_redraw = true;
    }

    pub(crate) fn redraw_all(&mut self) {
        self.full_redraw = true;
    }

    fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.cols as usize) + (x as usize)
    }

    pub(crate) fn clear(&mut self, bg: Color) {
        self.back.fill(Cell::blank(bg));
    }

    pub(crate) fn put(&mut self, x: u16, y: u16, cell: Cell) {
        if x >= self.cols || y >= self.rows {
            return;
        }
        let i = self.idx(x, y);
        self.back[i] = cell;
    }

    pub(crate) fn text(&mut self, x: u16, y: u16, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            self.put(x.saturating_add(i as u16), y, Cell { ch, fg, bg });
        }
    }

    pub(crate) fn present(&mut self) -> io::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;

        let mut last_fg = None;
        let mut last_bg = None;
        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.idx(x, y);
                let b = self.back[i];
                if !self.full_redraw && b == self.front[i] {
                    continue;
                }
                if last_bg != Some(b.bg) {
                    queue!(self.out, SetBackgroundColor(b.bg))?;
                    last_bg = Some(b.bg);
                }
                if last_fg != Some(b.fg) {
                    queue!(self.out, SetForegroundColor(b.fg))?;
                    last_fg = Some(b.fg);
                }
                queue!(self.out, cursor::MoveTo(x, y), Print(b.ch))?;
                self.front[i] = b;
            }
        }
        self.full_redraw = false;

        queue!(self.out, ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()
    }
}

/// Puts the user's terminal back on drop, including on error returns and unwinding.
struct RestoreGuard;

impl Drop for RestoreGuard {
    fn drop(&mut self) {
        let mut out = io::stdout();
        let _ = write_restore(&mut out);
        let _ = out.flush();
        let _ = terminal::disable_raw_mode();
    }
}

fn write_restore<W: Write>(out: &mut W) -> io::Result<()> {
    queue!(
        out,
        EndSynchronizedUpdate,
        ResetColor,
        Clear(ClearType::All),
        cursor::Show,
        EnableLineWrap,
        DisableMouseCapture,
        LeaveAlternateScreen
    )
}

/* -----------------------------
   Braille canvas: 2x4 subpixels per cell
------------------------------ */

pub(crate) struct BrailleCanvas {
    sw: usize,
    sh: usize,
    sub: Vec<u8>,
}

impl BrailleCanvas {
    pub(crate) fn new(cols: u16, rows: u16) -> Self {
        let sw = cols as usize * SUB_X;
        let sh = rows as usize * SUB_Y;
        Self {
            sw,
            sh,
            sub: vec![0; sw * sh],
        }
    }

    pub(crate) fn resize(&mut self, cols: u16, rows: u16) {
        *self = Self::new(cols, rows);
    }

    fn clear(&mut self) {
        self.sub.fill(0);
    }

    fn add(&mut self, x: i32, y: i32, v: u8) {
        if x < 0 || y < 0 || x as usize >= self.sw || y as usize >= self.sh {
            return;
        }
        let i = y as usize * self.sw + x as usize;
        self.sub[i] = self.sub[i].saturating_add(v);
    }

    fn cell(&self, tx: usize, ty: usize, threshold: u8) -> (u8, u8) {
        // Dot numbering: (0,0)=1 (0,1)=2 (0,2)=3 (0,3)=7 (1,0)=4 (1,1)=5 (1,2)=6 (1,3)=8
        const BITS: [[u8; SUB_Y]; SUB_X] = [[0x01, 0x02, 0x04, 0x40], [0x08, 0x10, 0x20, 0x80]];
        let mut mask = 0u8;
        let mut peak = 0u8;
        for (ox, col) in BITS.iter().enumerate() {
            for (oy, bit) in col.iter().enumerate() {
                let v = self.sub[(ty * SUB_Y + oy) * self.sw + tx * SUB_X + ox];
                if v >= threshold {
                    mask |= bit;
                }
                peak = peak.max(v);
            }
        }
        (mask, peak)
    }
}

/* -----------------------------
   Sprite layer: the terminal's Surface
------------------------------ */

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Species {
    Minnow,
    Goldfish,
    Angelfish,
}

impl Species {
    pub(crate) fn from_source(source: &str) -> Self {
        match source.trim().to_ascii_lowercase().as_str() {
            "minnow" => Species::Minnow,
            "angelfish" | "angel" => Species::Angelfish,
            _ => Species::Goldfish,
        }
    }

    /// (height / length, tail share of length, tail flare, wiggle amplitude)
    fn shape(self) -> (f32, f32, f32, f32) {
        match self {
            Species::Minnow => (0.32, 0.22, 0.60, 0.10),
            Species::Goldfish => (0.48, 0.28, 1.10, 0.08),
            Species::Angelfish => (0.62, 0.24, 0.85, 0.09),
        }
    }

    /// Dim, mid and bright shades.
    fn palette(self) -> [Color; 3] {
        match self {
            Species::Minnow => [
                Color::AnsiValue(66),
                Color::AnsiValue(152),
                Color::AnsiValue(229),
            ],
            Species::Goldfish => [
                Color::AnsiValue(130),
                Color::AnsiValue(208),
                Color::AnsiValue(221),
            ],
            Species::Angelfish => [
                Color::AnsiValue(97),
                Color::AnsiValue(183),
                Color::AnsiValue(225),
            ],
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Fade {
    from: f32,
    to: f32,
    start: Millis,
}

impl Fade {
    fn at(&self, now: Millis) -> f32 {
        let t = ((now - self.start) / FADE_MS).clamp(0.0, 1.0) as f32;
        let eased = t * t * (3.0 - 2.0 * t);
        self.from + (self.to - self.from) * eased
    }
}

#[derive(Clone, Debug)]
struct Sprite {
    x: f32,
    y: f32,
    size: f32,
    species: Species,
    fade: Fade,
    visible: bool,
}

/// Holds one sprite per handle and rasterizes them into a [`BrailleCanvas`].
pub(crate) struct SpriteLayer {
    next: u64,
    now: Millis,
    sprites: BTreeMap<u64, Sprite>,
}

impl SpriteLayer {
    pub(crate) fn new() -> Self {
        Self {
            next: 0,
            now: 0.0,
            sprites: BTreeMap::new(),
        }
    }

    /// Fades are timed against this clock; set it before each simulation frame.
    pub(crate) fn set_clock(&mut self, now: Millis) {
        self.now = now;
    }

    pub(crate) fn len(&self) -> usize {
        self.sprites.len()
    }

    pub(crate) fn draw(&self, canvas: &mut BrailleCanvas) {
        canvas.clear();
        for (id, s) in &self.sprites {
            let opacity = s.fade.at(self.now);
            if !s.visible || opacity <= 0.01 {
                continue;
            }
            let wiggle = (self.now * 0.006) as f32 + *id as f32 * 1.7;
            draw_fish(canvas, s, opacity, wiggle);
        }
    }
}

impl Surface for SpriteLayer {
    fn attach(&mut self, spec: &SpriteSpec) -> Option<SpriteHandle> {
        self.next += 1;
        self.sprites.insert(
            self.next,
            Sprite {
                x: spec.x,
                y: spec.y,
                size: spec.size,
                species: Species::from_source(&spec.source),
                fade: Fade {
                    from: 0.0,
                    to: 0.0,
                    start: self.now,
                },
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
        let now = self.now;
        if let Some(s) = self.sprites.get_mut(&handle.raw()) {
            s.fade = Fade {
                from: s.fade.at(now),
                to: opacity,
                start: now,
            };
        }
    }

    fn set_visible(&mut self, handle: &SpriteHandle, visible: bool) {
        if let Some(s) = self.sprites.get_mut(&handle.raw()) {
            s.visible = visible;
        }
    }

    fn detach(&mut self, handle: SpriteHandle) {
        self.sprites.remove(&handle.raw());
    }
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Rasterize one fish facing left. `(x, y)` is the sprite's top-left corner in pixels.
fn draw_fish(canvas: &mut BrailleCanvas, s: &Sprite, opacity: f32, wiggle: f32) {
    let (height_ratio, tail_ratio, tail_flare, wiggle_amp) = s.species.shape();
    let len = s.size;
    let height = len * height_ratio;
    let body_len = len * (1.0 - tail_ratio);
    let half_h = height * 0.5;
    let cy = s.y + half_h;
    // Head at the left edge, tail at the right.
    let head = s.x;
    let tail_base = s.x + body_len;
    let tail_tip = s.x + len;

    let minx = (s.x / PX_PER_SUB_X) as i32 - 1;
    let maxx = ((s.x + len) / PX_PER_SUB_X) as i32 + 1;
    let miny = (s.y / PX_PER_SUB_Y) as i32 - 1;
    let maxy = ((s.y + height) / PX_PER_SUB_Y) as i32 + 1;

    let shade = |v: f32| (v * opacity).clamp(0.0, 255.0) as u8;

    for sy in miny..=maxy {
        for sx in minx..=maxx {
            let px = (sx as f32 + 0.5) * PX_PER_SUB_X;
            let py = (sy as f32 + 0.5) * PX_PER_SUB_Y;
            // u runs 0 at the nose to 1 at the tail tip.
            let u = (px - head) / len;
            if !(0.0..=1.0).contains(&u) {
                continue;
            }
            let sway = (wiggle + u * 5.0).sin() * wiggle_amp * height * u * u;
            let v = py - cy - sway;

            if px <= tail_base {
                let along = (px - head) / body_len;
                let r = half_h * (1.0 - (2.0 * along - 0.8).powi(2) / 1.44).max(0.0).sqrt();
                if v.abs() <= r {
                    let dist = (v.abs() / r.max(1e-3)).clamp(0.0, 1.0);
                    let mut val = 210.0 - 70.0 * dist;
                    // Eye.
                    let ex = head + body_len * 0.16;
                    let ey = cy - half_h * 0.18;
                    if ((px - ex).powi(2) + (py - ey).powi(2)).sqrt() < height * 0.07 {
                        val *= 0.25;
                    }
                    canvas.add(sx, sy, shade(val));
                }
            } else if px <= tail_tip {
                let t = (px - tail_base) / (tail_tip - tail_base);
                let fin = half_h * (0.2 + tail_flare * t) * smoothstep(0.0, 0.15, t + 0.1);
                if v.abs() < fin && v.abs() > half_h * 0.05 {
                    canvas.add(sx, sy, shade(140.0 - 40.0 * t));
                }
            }
        }
    }
}

/// Convert the canvas into cells, leaving the first `skip_rows` rows to foreground content.
pub(crate) fn canvas_to_cells(
    canvas: &BrailleCanvas,
    term: &mut Terminal,
    species: Species,
    bg: Color,
    skip_rows: u16,
) {
    let [dim, mid, bright] = species.palette();
    let cols = (canvas.sw / SUB_X).min(term.cols as usize);
    let rows = (canvas.sh / SUB_Y).min(term.rows as usize);
    for ty in skip_rows as usize..rows {
        for tx in 0..cols {
            let (mask, peak) = canvas.cell(tx, ty, 48);
            if mask == 0 {
                continue;
            }
            let fg = if peak < 110 {
                dim
            } else if peak < 170 {
                mid
            } else {
                bright
            };
            let ch = char::from_u32(0x2800 + mask as u32).unwrap_or(' ');
            term.put(tx as u16, ty as u16, Cell { ch, fg, bg });
        }
    }
}
