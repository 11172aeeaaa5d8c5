//! grep-style result printing

use std::io::{self, Write};
use termcolor::{Color, ColorSpec, WriteColor};

/// Writes result lines, colouring file names, line numbers and match spans
/// when the underlying writer supports it.
pub struct Printer<W: WriteColor> {
    out: W,
}

impl<W: WriteColor> Printer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// `name` on its own line (for -l)
    pub fn print_name(&mut self, name: &str) -> io::Result<()> {
        self.write_colored(name.as_bytes(), Color::Magenta)?;
        writeln!(self.out)
    }

    /// `name:count`, or just `count` when `name` is None (for -c)
    pub fn print_count(&mut self, name: Option<&str>, count: usize) -> io::Result<()> {
        if let Some(name) = name {
            self.write_colored(name.as_bytes(), Color::Magenta)?;
            write!(self.out, ":")?;
        }
        writeln!(self.out, "{}", count)
    }

    /// One matching line with optional `name:` and `line:` prefixes.
    ///
    /// `line` excludes its newline; `spans` are byte ranges within it.
    pub fn print_line(
        &mut self,
        name: Option<&str>,
        line_number: Option<usize>,
        line: &[u8],
        spans: &[(usize, usize)],
    ) -> io::Result<()> {
        if let Some(name) = name {
            self.write_colored(name.as_bytes(), Color::Magenta)?;
            write!(self.out, ":")?;
        }
        if let Some(n) = line_number {
            self.write_colored(n.to_string().as_bytes(), Color::Green)?;
            write!(self.out, ":")?;
        }

        let mut pos = 0;
        for &(start, end) in spans {
            let start = start.clamp(pos, line.len());
            let end = end.clamp(start, line.len());
            self.out.write_all(&line[pos..start])?;
            if end > start {
                self.out
                    .set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
                self.out.write_all(&line[start..end])?;
                self.out.reset()?;
            }
            pos = end;
        }
        self.out.write_all(&line[pos..])?;
        writeln!(self.out)
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    fn write_colored(&mut self, bytes: &[u8], color: Color) -> io::Result<()> {
        self.out.set_color(ColorSpec::new().set_fg(Some(color)))?;
        self.out.write_all(bytes)?;
        self.out.reset()
    }
}
