use crate::framebuffer::{Framebuffer, SCREEN_HEIGHT, SCREEN_WIDTH};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use std::io;
use tui::backend::{Backend, CrosstermBackend};
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders};
use tui::Terminal;

/// Display is used by the run loop to put frames on the screen. It should
/// abstract the implementation details, so a variety of kinds of screen would
/// work.
pub trait Display {
    /// blank the pending frame
    fn clear(&mut self) -> io::Result<()>;

    /// light one pixel of the pending frame; always in [0,64)x[0,32)
    fn set_pixel(&mut self, x: u8, y: u8);

    /// show the pending frame
    fn present(&mut self) -> io::Result<()>;

    /// clear, light every lit pixel of `frame`, present
    fn draw_frame(&mut self, frame: &Framebuffer) -> io::Result<()> {
        self.clear()?;
        for (x, y) in frame.lit_pixels() {
            self.set_pixel(x, y);
        }
        self.present()
    }
}

// store useful metadata about the terminal: the CHIP-8 screen and how many
// terminal cells each side of a pixel takes
struct Resolution(usize, usize, usize);

impl Resolution {
    fn x_bounds(&self) -> [f64; 2] {
        [0.0, (self.0 * self.2 - 1) as f64]
    }

    fn y_bounds(&self) -> [f64; 2] {
        [-1.0 * (self.1 * self.2 - 1) as f64, 0.0]
    }

    /// canvas size in cells, inside the border
    fn cells(&self) -> (u16, u16) {
        ((self.0 * self.2) as u16, (self.1 * self.2) as u16)
    }

    /// the scale x scale block of canvas points for one pixel; canvas
    /// coordinates have y pointing up
    fn to_canvas(&self, x: u8, y: u8) -> impl Iterator<Item = (f64, f64)> {
        let s = self.2;
        let (x0, y0) = (x as usize * s, y as usize * s);
        (0..s).flat_map(move |dy| (0..s).map(move |dx| ((x0 + dx) as f64, -1.0 * (y0 + dy) as f64)))
    }
}

/// `0xAARRGGBB` to a terminal colour, ignoring alpha
pub fn term_colour(argb: u32) -> Color {
    let [_, r, g, b] = argb.to_be_bytes();
    Color::Rgb(r, g, b)
}

/// monochrome display in a terminal, rendered using TUI; crossterm by default
pub struct TermDisplay<B: Backend = CrosstermBackend<io::Stdout>> {
    terminal: Terminal<B>,
    resolution: Resolution,
    fg: Color,
    bg: Color,
    lit: Vec<(f64, f64)>,
    alternate_screen: bool,
}

impl TermDisplay {
    pub fn new(scale: u16, fg: u32, bg: u32) -> io::Result<TermDisplay> {
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut display = TermDisplay::with_backend(CrosstermBackend::new(stdout), scale, fg, bg)?;
        display.alternate_screen = true;
        Ok(display)
    }
}

impl<B: Backend> TermDisplay<B> {
    /// draw on any tui backend, leaving the screen mode alone
    pub fn with_backend(backend: B, scale: u16, fg: u32, bg: u32) -> io::Result<Self> {
        let mut terminal = Terminal::new(backend)?;
        terminal.hide_cursor()?;
        terminal.clear()?;
        let resolution = Resolution(SCREEN_WIDTH, SCREEN_HEIGHT, scale.max(1) as usize);
        let (w, h) = resolution.cells();
        Ok(TermDisplay {
            terminal,
            resolution,
            fg: term_colour(fg),
            bg: term_colour(bg),
            lit: Vec::with_capacity(w as usize * h as usize),
            alternate_screen: false,
        })
    }

    pub fn backend(&self) -> &B {
        self.terminal.backend()
    }
}

impl<B: Backend> Drop for TermDisplay<B> {
    fn drop(&mut self) {
        let _ = self.terminal.show_cursor();
        if self.alternate_screen {
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
        }
    }
}

impl<B: Backend> Display for TermDisplay<B> {
    fn clear(&mut self) -> io::Result<()> {
        self.lit.clear();
        Ok(())
    }

    fn set_pixel(&mut self, x: u8, y: u8) {
        self.lit.extend(self.resolution.to_canvas(x, y));
    }

    fn present(&mut self) -> io::Result<()> {
        // one canvas point per terminal cell, plus the border
        let (w, h) = self.resolution.cells();
        let size = Rect::new(0, 0, 2 + w, 2 + h);
        let x_bounds = self.resolution.x_bounds();
        let y_bounds = self.resolution.y_bounds();
        let (fg, bg) = (self.fg, self.bg);
        let lit = &self.lit;
        self.terminal.draw(|f| {
            let size = size.intersection(f.size());
            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title("CHIP-8")
                        .borders(Borders::ALL)
                        .style(Style::default().bg(bg)),
                )
                .x_bounds(x_bounds)
                .y_bounds(y_bounds)
                .marker(Marker::Block)
                .paint(|ctx| {
                    ctx.draw(&Points {
                        coords: lit.as_slice(),
                        color: fg,
                    });
                });
            f.render_widget(canvas, size);
        })?;
        Ok(())
    }
}

/// useful for testing: remembers the last presented frame
#[derive(Debug, Default)]
pub struct HeadlessDisplay {
    pending: Vec<(u8, u8)>,
    presented: Vec<(u8, u8)>,
    pub presents: usize,
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// lit pixels of the last presented frame, in the order they were set
    pub fn presented(&self) -> &[(u8, u8)] {
        &self.presented
    }

    pub fn is_lit(&self, x: u8, y: u8) -> bool {
        self.presented.contains(&(x, y))
    }
}

impl Display for HeadlessDisplay {
    fn clear(&mut self) -> io::Result<()> {
        self.pending.clear();
        Ok(())
    }

    fn set_pixel(&mut self, x: u8, y: u8) {
        debug_assert!((x as usize) < SCREEN_WIDTH && (y as usize) < SCREEN_HEIGHT);
        self.pending.push((x, y));
    }

    fn present(&mut self) -> io::Result<()> {
        self.presented = self.pending.clone();
        self.presents += 1;
        Ok(())
    }
}
