//! Verification pass: runs the real regex over each candidate file.

use crate::output::Printer;
use crate::utils::searchable_view;
use anyhow::Result;
use regex::bytes::Regex;
use std::fs;
use termcolor::WriteColor;
use tracing::warn;

/// Output switches, as in grep
#[derive(Debug, Clone, Copy, Default)]
pub struct GrepOptions {
    /// -c: print a match count per file
    pub count: bool,
    /// -l: print only names of matching files
    pub names_only: bool,
    /// -n: prefix lines with their line number
    pub line_numbers: bool,
    /// -h: omit file names
    pub no_filename: bool,
}

pub struct Grep<'a, W: WriteColor> {
    regex: &'a Regex,
    options: GrepOptions,
    max_line_len: usize,
    printer: Printer<W>,
    matched: bool,
}

impl<'a, W: WriteColor> Grep<'a, W> {
    /// `max_line_len` must be the cut the index was built with.
    pub fn new(
        regex: &'a Regex,
        options: GrepOptions,
        max_line_len: usize,
        printer: Printer<W>,
    ) -> Self {
        Self {
            regex,
            options,
            max_line_len,
            printer,
            matched: false,
        }
    }

    /// Search a file on disk. An unreadable file is reported and skipped.
    pub fn file(&mut self, path: &str) -> Result<()> {
        match fs::read(path) {
            Ok(content) => self.content(path, &content),
            Err(e) => {
                warn!("{}: {}", path, e);
                Ok(())
            }
        }
    }

    /// Search `content`, reporting it as `name`
    pub fn content(&mut self, name: &str, content: &[u8]) -> Result<()> {
        let view = searchable_view(content, self.max_line_len);
        let buf: &[u8] = &view;
        let opts = self.options;
        let shown_name = if opts.no_filename { None } else { Some(name) };

        let mut count = 0usize;
        let mut line_number = 1usize;
        let mut counted_to = 0usize;
        let mut pos = 0usize;

        while pos <= buf.len() {
            let Some(m) = self.regex.find_at(buf, pos) else {
                break;
            };
            // An empty match after the final newline is not on any line.
            if m.start() == buf.len() && (buf.is_empty() || buf.ends_with(b"\n")) {
                break;
            }

            let line_start = memchr::memrchr(b'\n', &buf[..m.start()]).map_or(0, |i| i + 1);
            let line_end =
                memchr::memchr(b'\n', &buf[m.start()..]).map_or(buf.len(), |i| m.start() + i);

            count += 1;
            self.matched = true;

            if opts.names_only {
                self.printer.print_name(name)?;
                return Ok(());
            }

            if !opts.count {
                let number = if opts.line_numbers {
                    line_number += memchr::memchr_iter(b'\n', &buf[counted_to..line_start]).count();
                    counted_to = line_start;
                    Some(line_number)
                } else {
                    None
                };
                let spans = self.spans(buf, line_start, line_end, m.start(), m.end());
                self.printer
                    .print_line(shown_name, number, &buf[line_start..line_end], &spans)?;
            }

            // Continue on the next line.
            pos = line_end + 1;
        }

        if opts.count && count > 0 {
            self.printer.print_count(shown_name, count)?;
        }
        Ok(())
    }

    /// Whether any line matched so far
    pub fn matched(&self) -> bool {
        self.matched
    }

    /// Flush output and report whether anything matched
    pub fn finish(mut self) -> Result<bool> {
        self.printer.flush()?;
        Ok(self.matched)
    }

    /// Match spans within one line, relative to `line_start`
    fn spans(
        &self,
        buf: &[u8],
        line_start: usize,
        line_end: usize,
        first_start: usize,
        first_end: usize,
    ) -> Vec<(usize, usize)> {
        let mut spans = vec![(first_start - line_start, first_end.min(line_end) - line_start)];
        let mut at = if first_end > first_start { first_end } else { first_end + 1 };
        while at < line_end {
            let Some(m) = self.regex.find_at(buf, at) else {
                break;
            };
            if m.start() >= line_end {
                break;
            }
            if m.end() > m.start() {
                spans.push((m.start() - line_start, m.end().min(line_end) - line_start));
                at = m.end();
            } else {
                at = m.end() + 1;
            }
        }
        spans
    }
}
