//! Terminal display for the live strip

use crate::error::{Result, StripError};
use crate::strip::Frame;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::{Color as TermColor, Print, ResetColor, SetBackgroundColor};
use crossterm::{cursor, execute, queue, terminal};
use std::io::{self, Stdout, Write};
use std::time::Duration;
use tracing::debug;

/// Something that can show frames and report a user quit request
pub trait DisplaySurface {
    /// Show a frame
    fn present(&mut self, frame: &Frame) -> Result<()>;

    /// Whether the user asked to quit since the last call (non-blocking)
    fn quit_requested(&mut self) -> Result<bool>;
}

fn display_error(e: io::Error) -> StripError {
    StripError::Display(e.to_string())
}

/// Full-screen terminal display
///
/// Each terminal cell shows the frame pixel under its center. The terminal
/// is restored when the display is dropped.
pub struct TerminalDisplay<W: Write = Stdout> {
    out: W,
    cols: u16,
    rows: u16,
}

impl TerminalDisplay {
    /// Take over the terminal (alternate screen, raw mode, hidden cursor)
    pub fn new() -> Result<Self> {
        terminal::enable_raw_mode().map_err(display_error)?;
        Self::attach(io::stdout(), terminal::size)
    }
}

impl<W: Write> TerminalDisplay<W> {
    /// Enter the alternate screen on `out` and size the display
    ///
    /// The display exists before anything can fail, so Drop restores the
    /// terminal on every error path.
    fn attach(out: W, size: impl FnOnce() -> io::Result<(u16, u16)>) -> Result<Self> {
        let mut display = Self {
            out,
            cols: 0,
            rows: 0,
        };
        execute!(display.out, terminal::EnterAlternateScreen, cursor::Hide)
            .map_err(display_error)?;
        let (cols, rows) = size().map_err(display_error)?;
        display.resize(cols, rows);
        debug!("Terminal display {}x{} cells", cols, rows);

        Ok(display)
    }

    fn resize(&mut self, cols: u16, rows: u16) {
        self.cols = cols;
        self.rows = rows;
    }
}

impl<W: Write> DisplaySurface for TerminalDisplay<W> {
    fn present(&mut self, frame: &Frame) -> Result<()> {
        if self.cols == 0 || self.rows == 0 {
            return Ok(());
        }

        let (fw, fh) = frame.dimensions();
        let cols = self.cols as u32;
        let rows = self.rows as u32;

        for row in 0..rows {
            let y = ((2 * row + 1) * fh / (2 * rows)).min(fh - 1);
            queue!(self.out, cursor::MoveTo(0, row as u16)).map_err(display_error)?;

            let mut current: Option<[u8; 3]> = None;
            for col in 0..cols {
                let x = ((2 * col + 1) * fw / (2 * cols)).min(fw - 1);
                let px = frame.get_pixel(x, y).0;
                if current != Some(px) {
                    queue!(
                        self.out,
                        SetBackgroundColor(TermColor::Rgb {
                            r: px[0],
                            g: px[1],
                            b: px[2]
                        })
                    )
                    .map_err(display_error)?;
                    current = Some(px);
                }
                queue!(self.out, Print(' ')).map_err(display_error)?;
            }
        }

        queue!(self.out, ResetColor).map_err(display_error)?;
        self.out.flush().map_err(display_error)
    }

    fn quit_requested(&mut self) -> Result<bool> {
        while event::poll(Duration::ZERO).map_err(display_error)? {
            match event::read().map_err(display_error)? {
                Event::Key(key) if is_quit_key(&key) => return Ok(true),
                Event::Resize(cols, rows) => {
                    debug!("Terminal resized to {}x{}", cols, rows);
                    self.resize(cols, rows);
                    queue!(self.out, terminal::Clear(terminal::ClearType::All))
                        .map_err(display_error)?;
                }
                _ => {}
            }
        }
        Ok(false)
    }
}

impl<W: Write> Drop for TerminalDisplay<W> {
    fn drop(&mut self) {
        let _ = execute!(
            self.out,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        );
        let _ = terminal::disable_raw_mode();
    }
}

/// q, Esc, or Ctrl+C (raw mode swallows the signal)
fn is_quit_key(key: &KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}
