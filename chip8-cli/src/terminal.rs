//! Terminal screen and keyboard.
use std::{
    io::{self, Write},
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::RecvTimeoutError,
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use chip8::{constants::*, Frame, FrameReceiver, Interrupt, KeyCode, Keypad};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode as HostKey, KeyEvent, KeyModifiers},
    queue, style, terminal,
};

use crate::{
    error::AppError,
    inputmap::{InputKind, InputMap, ACTION_QUIT},
};

/// Terminals only report presses, so keys are released after this long
/// unless key repeat presses them again.
const KEY_HOLD_TIME: Duration = Duration::from_millis(120);

/// How long the worker threads block before checking whether to stop.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Raw mode terminal session driving the keypad and presenting frames.
///
/// Restores the terminal when dropped.
pub struct Terminal {
    running: Arc<AtomicBool>,
    input: Option<JoinHandle<()>>,
    presenter: Option<JoinHandle<()>>,
}

impl Terminal {
    pub fn start(
        keypad: Keypad,
        inputmap: InputMap,
        interrupt: Interrupt,
        frames: FrameReceiver,
    ) -> Result<Self, AppError> {
        terminal::enable_raw_mode()?;
        crossterm::execute!(
            io::stdout(),
            terminal::EnterAlternateScreen,
            cursor::Hide,
            terminal::Clear(terminal::ClearType::All)
        )?;

        let running = Arc::new(AtomicBool::new(true));

        let input = {
            let running = running.clone();
            thread::spawn(move || {
                if let Err(err) = read_input(&running, &keypad, &inputmap, &interrupt) {
                    log::error!("terminal input failed: {err}");
                    interrupt.trigger();
                }
            })
        };

        let presenter = {
            let running = running.clone();
            thread::spawn(move || {
                if let Err(err) = present(&running, &frames) {
                    log::error!("terminal output failed: {err}");
                }
            })
        };

        Ok(Self {
            running,
            input: Some(input),
            presenter: Some(presenter),
        })
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        for handle in [self.input.take(), self.presenter.take()].into_iter().flatten() {
            if handle.join().is_err() {
                log::error!("terminal thread panicked");
            }
        }

        let restored = crossterm::execute!(io::stdout(), cursor::Show, terminal::LeaveAlternateScreen)
            .and_then(|_| terminal::disable_raw_mode());
        if let Err(err) = restored {
            log::error!("failed to restore terminal: {err}");
        }
    }
}

fn read_input(
    running: &AtomicBool,
    keypad: &Keypad,
    inputmap: &InputMap,
    interrupt: &Interrupt,
) -> io::Result<()> {
    let mut held = KeyHold::default();

    while running.load(Ordering::SeqCst) {
        if event::poll(POLL_INTERVAL)? {
            if let Event::Key(KeyEvent { code, modifiers }) = event::read()? {
                match code {
                    HostKey::Esc => interrupt.trigger(),
                    // raw mode swallows the interrupt signal
                    HostKey::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                        interrupt.trigger()
                    }
                    HostKey::Char(key) => match inputmap.map_key(key) {
                        Some(InputKind::Chip8(keycode)) => {
                            held.press(keypad, *keycode, Instant::now())
                        }
                        Some(InputKind::Action(action)) if action == ACTION_QUIT => {
                            interrupt.trigger()
                        }
                        Some(InputKind::Action(action)) => {
                            log::trace!("unhandled action {action}");
                        }
                        None => log::trace!("no input mapping for {key:?}"),
                    },
                    _ => {}
                }
            }
        }

        held.release_expired(keypad, Instant::now());
    }

    keypad.release_all();

    Ok(())
}

/// Keys pressed on the keypad, and when they are due to be released.
#[derive(Debug, Default)]
struct KeyHold {
    deadlines: Vec<(KeyCode, Instant)>,
}

impl KeyHold {
    fn press(&mut self, keypad: &Keypad, keycode: KeyCode, now: Instant) {
        let deadline = now + KEY_HOLD_TIME;

        match self.deadlines.iter_mut().find(|(key, _)| *key == keycode) {
            // key repeat extends the hold
            Some(existing) => existing.1 = deadline,
            None => self.deadlines.push((keycode, deadline)),
        }

        keypad.press(keycode);
    }

    fn release_expired(&mut self, keypad: &Keypad, now: Instant) {
        self.deadlines.retain(|(keycode, deadline)| {
            let expired = *deadline <= now;
            if expired {
                keypad.release(*keycode);
            }
            !expired
        });
    }
}

fn present(running: &AtomicBool, frames: &FrameReceiver) -> io::Result<()> {
    let mut stdout = io::stdout();

    while running.load(Ordering::SeqCst) {
        match frames.recv_timeout(POLL_INTERVAL) {
            Ok(frame) => {
                for (row, line) in render_lines(&frame).iter().enumerate() {
                    queue!(stdout, cursor::MoveTo(0, row as u16), style::Print(line))?;
                }
                stdout.flush()?;
            }
            Err(RecvTimeoutError::Timeout) => {}
            // Virtual machine is gone.
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    Ok(())
}

/// Two rows of pixels per line of text, using half block characters.
fn render_lines(frame: &Frame) -> Vec<String> {
    frame
        .chunks(DISPLAY_WIDTH * 2)
        .map(|rows| {
            let (top, bottom) = rows.split_at(DISPLAY_WIDTH);
            top.iter()
                .zip(bottom)
                .map(|(top, bottom)| match (*top, *bottom) {
                    (false, false) => ' ',
                    (true, false) => '▀',
                    (false, true) => '▄',
                    (true, true) => '█',
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod test {
    use chip8::Keyboard;

    use super::*;

    #[test]
    fn test_render_lines() {
        let mut frame = [false; DISPLAY_BUFFER_SIZE];
        frame[0] = true;
        frame[DISPLAY_WIDTH + 1] = true;
        frame[2] = true;
        frame[DISPLAY_WIDTH + 2] = true;

        let lines = render_lines(&frame);
        assert_eq!(lines.len(), DISPLAY_HEIGHT / 2);
        assert_eq!(lines[0].chars().count(), DISPLAY_WIDTH);
        assert!(lines[0].starts_with("▀▄█ "));
        assert!(lines[1].chars().all(|c| c == ' '));
    }

    #[test]
    fn test_key_hold() {
        let keypad = Keypad::new();
        let mut held = KeyHold::default();
        let start = Instant::now();

        held.press(&keypad, KeyCode::Key4, start);
        assert!(keypad.is_held(KeyCode::Key4));

        held.release_expired(&keypad, start + KEY_HOLD_TIME / 2);
        assert!(keypad.is_held(KeyCode::Key4));

        // repeat extends the hold
        held.press(&keypad, KeyCode::Key4, start + KEY_HOLD_TIME / 2);
        held.release_expired(&keypad, start + KEY_HOLD_TIME);
        assert!(keypad.is_held(KeyCode::Key4));

        held.release_expired(&keypad, start + KEY_HOLD_TIME * 2);
        assert!(!keypad.is_held(KeyCode::Key4));
        assert_eq!(keypad.last_pressed(), Some(KeyCode::Key4));
    }
}
