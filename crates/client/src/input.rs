use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use ridgeline::{InputFlags, MovementInput};

/// Degrees of look per arrow key press or repeat.
pub const LOOK_STEP: f32 = 3.0;

/// Without release events a key counts as held this long after its last press.
/// Long enough to bridge the terminal's initial autorepeat delay.
pub const HOLD_WINDOW: Duration = Duration::from_millis(500);

const TOGGLE_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Control {
    Forward,
    Back,
    Left,
    Right,
}

impl Control {
    fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'w' => Some(Control::Forward),
            's' => Some(Control::Back),
            'a' => Some(Control::Left),
            'd' => Some(Control::Right),
            _ => None,
        }
    }

    fn flag(self) -> InputFlags {
        match self {
            Control::Forward => InputFlags::FORWARD,
            Control::Back => InputFlags::BACK,
            Control::Left => InputFlags::LEFT,
            Control::Right => InputFlags::RIGHT,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Held {
    at: Instant,
    sprint: bool,
}

/// Turns terminal key events into per-frame movement input.
#[derive(Debug, Default)]
pub struct KeyboardInput {
    held: HashMap<Control, Held>,
    /// The terminal reports key releases.
    enhanced: bool,
    jump_pending: bool,
    toggle_pending: bool,
    last_toggle: Option<Instant>,
    look_h: f32,
    look_v: f32,
    quit: bool,
}

impl KeyboardInput {
    pub fn new(enhanced: bool) -> Self {
        Self {
            enhanced,
            ..Default::default()
        }
    }

    pub fn enhanced(&self) -> bool {
        self.enhanced
    }

    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    pub fn handle_event(&mut self, event: &KeyEvent, now: Instant) {
        if event.kind == KeyEventKind::Release {
            if let KeyCode::Char(c) = event.code {
                if let Some(control) = Control::from_char(c) {
                    self.held.remove(&control);
                }
            }
            return;
        }

        let repeat = event.kind == KeyEventKind::Repeat;
        match event.code {
            KeyCode::Char('q') | KeyCode::Esc => self.quit = true,
            KeyCode::Char(' ') if !repeat => self.jump_pending = true,
            KeyCode::Char(c) => {
                if let Some(control) = Control::from_char(c) {
                    let sprint =
                        c.is_ascii_uppercase() || event.modifiers.contains(KeyModifiers::SHIFT);
                    self.held.insert(control, Held { at: now, sprint });
                }
            }
            KeyCode::Tab if !repeat => self.request_toggle(now),
            KeyCode::Left => self.look_h += LOOK_STEP,
            KeyCode::Right => self.look_h -= LOOK_STEP,
            // positive pitch looks down
            KeyCode::Up => self.look_v -= LOOK_STEP,
            KeyCode::Down => self.look_v += LOOK_STEP,
            _ => {}
        }
    }

    fn request_toggle(&mut self, now: Instant) {
        if !self.enhanced {
            if let Some(last) = self.last_toggle {
                if now.saturating_duration_since(last) < TOGGLE_DEBOUNCE {
                    self.last_toggle = Some(now);
                    return;
                }
            }
        }
        self.last_toggle = Some(now);
        self.toggle_pending = true;
    }

    /// Input for the coming frame. Edges and look deltas are consumed.
    pub fn sample(&mut self, now: Instant) -> MovementInput {
        if !self.enhanced {
            self.held
                .retain(|_, held| now.saturating_duration_since(held.at) < HOLD_WINDOW);
        }

        let mut flags = InputFlags::empty();
        for (control, held) in &self.held {
            flags |= control.flag();
            if held.sprint {
                flags |= InputFlags::SPRINT;
            }
        }
        if std::mem::take(&mut self.jump_pending) {
            flags |= InputFlags::JUMP;
        }
        if std::mem::take(&mut self.toggle_pending) {
            flags |= InputFlags::MODE_TOGGLE;
        }

        let look_h = std::mem::take(&mut self.look_h);
        let look_v = std::mem::take(&mut self.look_v);
        MovementInput::new(flags).with_look(look_h, look_v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn release(code: KeyCode) -> KeyEvent {
        KeyEvent::new_with_kind(code, KeyModifiers::NONE, KeyEventKind::Release)
    }

    #[test]
    fn test_hold_expires_without_releases() {
        let mut input = KeyboardInput::new(false);
        let t0 = Instant::now();
        input.handle_event(&press(KeyCode::Char('w')), t0);

        assert!(input.sample(t0 + Duration::from_millis(100)).flags.contains(InputFlags::FORWARD));
        assert!(input.sample(t0 + HOLD_WINDOW).flags.is_empty());
    }

    #[test]
    fn test_release_ends_hold() {
        let mut input = KeyboardInput::new(true);
        let t0 = Instant::now();
        input.handle_event(&press(KeyCode::Char('d')), t0);

        let later = t0 + Duration::from_secs(5);
        assert_eq!(input.sample(later).move_axes(), (0.0, -1.0));

        input.handle_event(&release(KeyCode::Char('d')), later);
        assert_eq!(input.sample(later).move_axes(), (0.0, 0.0));
    }

    #[test]
    fn test_shifted_key_sprints() {
        let mut input = KeyboardInput::new(false);
        let now = Instant::now();
        input.handle_event(&KeyEvent::new(KeyCode::Char('W'), KeyModifiers::SHIFT), now);

        let sample = input.sample(now);
        assert!(sample.sprint());
        assert_eq!(sample.move_axes(), (1.0, 0.0));
    }

    #[test]
    fn test_jump_is_an_edge() {
        let mut input = KeyboardInput::new(false);
        let now = Instant::now();
        input.handle_event(&press(KeyCode::Char(' ')), now);

        assert!(input.sample(now).jump());
        assert!(!input.sample(now).jump());
    }

    #[test]
    fn test_toggle_autorepeat_debounced() {
        let mut input = KeyboardInput::new(false);
        let t0 = Instant::now();
        input.handle_event(&press(KeyCode::Tab), t0);
        input.handle_event(&press(KeyCode::Tab), t0 + Duration::from_millis(30));

        assert!(input.sample(t0).mode_toggle());

        input.handle_event(&press(KeyCode::Tab), t0 + Duration::from_millis(60));
        assert!(!input.sample(t0).mode_toggle());

        input.handle_event(&press(KeyCode::Tab), t0 + Duration::from_secs(1));
        assert!(input.sample(t0).mode_toggle());
    }

    #[test]
    fn test_arrows_accumulate_look() {
        let mut input = KeyboardInput::new(false);
        let now = Instant::now();
        input.handle_event(&press(KeyCode::Left), now);
        input.handle_event(&press(KeyCode::Left), now);
        input.handle_event(&press(KeyCode::Up), now);

        let sample = input.sample(now);
        assert_eq!(sample.look_h, 2.0 * LOOK_STEP);
        assert_eq!(sample.look_v, -LOOK_STEP);
        assert_eq!(input.sample(now).look_h, 0.0);
    }

    #[test]
    fn test_quit_keys() {
        let mut input = KeyboardInput::new(true);
        assert!(!input.quit_requested());
        input.handle_event(&press(KeyCode::Esc), Instant::now());
        assert!(input.quit_requested());
    }
}
