use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers, MouseEventKind};
use shoal::{Density, Vec2};
use std::time::Duration;

use crate::render::{CELL_H, CELL_W};

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Action {
    Quit,
    TogglePause,
    Density(Density),
    Opacity(f32),
    ToggleHud,
    Redraw,
    Pointer(Vec2),
    Resize(u16, u16),
}

pub(crate) fn collect_actions(max_wait: Duration) -> anyhow::Result<Vec<Action>> {
    let mut out = Vec::new();

    // poll with a tiny timeout so we stay responsive
    let timeout = std::cmp::min(Duration::from_millis(1), max_wait);
    while event::poll(timeout)? {
        if let Some(action) = map_event(event::read()?) {
            out.push(action);
            if out.len() >= 64 {
                break;
            }
        }
    }
    Ok(out)
}

pub(crate) fn map_event(ev: Event) -> Option<Action> {
    match ev {
        Event::Resize(w, h) => Some(Action::Resize(w, h)),
        Event::Mouse(m) => match m.kind {
            MouseEventKind::Moved | MouseEventKind::Drag(_) => Some(Action::Pointer(Vec2::new(
                m.column as f32 * CELL_W + CELL_W / 2.0,
                m.row as f32 * CELL_H + CELL_H / 2.0,
            ))),
            _ => None,
        },
        Event::Key(k) if k.kind == KeyEventKind::Press => {
            if k.modifiers.contains(KeyModifiers::CONTROL) {
                return match k.code {
                    KeyCode::Char('c') => Some(Action::Quit),
                    KeyCode::Char('l') => Some(Action::Redraw),
                    _ => None,
                };
            }
            match k.code {
                KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(Action::Quit),
                KeyCode::Char(' ') | KeyCode::Char('p') | KeyCode::Char('P') => {
                    Some(Action::TogglePause)
                }
                KeyCode::Char('1') => Some(Action::Density(Density::Low)),
                KeyCode::Char('2') => Some(Action::Density(Density::Normal)),
                KeyCode::Char('3') => Some(Action::Density(Density::High)),
                KeyCode::Char('+') | KeyCode::Char('=') => Some(Action::Opacity(0.1)),
                KeyCode::Char('-') => Some(Action::Opacity(-0.1)),
                KeyCode::Char('h') | KeyCode::Char('H') => Some(Action::ToggleHud),
                _ => None,
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEvent, MouseEvent};

    fn key(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent::new(code, modifiers))
    }

    #[test]
    fn keys_map_to_controls() {
        assert_eq!(map_event(key(KeyCode::Char('q'), KeyModifiers::NONE)), Some(Action::Quit));
        assert_eq!(
            map_event(key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Action::Quit)
        );
        assert_eq!(
            map_event(key(KeyCode::Char(' '), KeyModifiers::NONE)),
            Some(Action::TogglePause)
        );
        assert_eq!(
            map_event(key(KeyCode::Char('3'), KeyModifiers::NONE)),
            Some(Action::Density(Density::High))
        );
        assert_eq!(map_event(key(KeyCode::Char('x'), KeyModifiers::NONE)), None);
    }

    #[test]
    fn mouse_motion_becomes_pixel_pointer() {
        let ev = Event::Mouse(MouseEvent {
            kind: MouseEventKind::Moved,
            column: 10,
            row: 2,
            modifiers: KeyModifiers::NONE,
        });
        assert_eq!(
            map_event(ev),
            Some(Action::Pointer(Vec2::new(84.0, 40.0)))
        );
    }
}
