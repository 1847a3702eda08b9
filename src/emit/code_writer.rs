//! Line-oriented writer with indentation tracking for generated source.
//!
//! Indentation is held in an `Rc<Cell<usize>>` so that an [`IndentGuard`]
//! does not borrow the writer: output can keep flowing while the guard is
//! alive, and dropping it dedents.
//!
//! Text may contain newlines. Every non-empty line is indented to the current
//! level; empty lines are written bare, so the output never carries trailing
//! whitespace. This makes `write!` and `writeln!` usable directly:
//!
//! ```
//! use std::fmt::Write as _;
//! use wl_scanner::emit::code_writer::CodeWriter;
//!
//! let mut w = CodeWriter::new(String::new(), "\t");
//! w.block("func f()", |w| writeln!(w, "return\n")).unwrap();
//! assert_eq!(w.into_inner(), "func f() {\n\treturn\n\n}\n");
//! ```

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

pub struct CodeWriter<W> {
    writer: W,
    indent_level: Rc<Cell<usize>>,
    indent_string: String,
    at_line_start: bool,
}

impl<W: fmt::Write> CodeWriter<W> {
    pub fn new(writer: W, indent_string: &str) -> Self {
        CodeWriter {
            writer,
            indent_level: Rc::new(Cell::new(0)),
            indent_string: indent_string.to_string(),
            at_line_start: true,
        }
    }

    /// Write a fragment that contains no newline.
    fn write_fragment(&mut self, text: &str) -> fmt::Result {
        if text.is_empty() {
            return Ok(());
        }
        if self.at_line_start {
            for _ in 0..self.indent_level.get() {
                self.writer.write_str(&self.indent_string)?;
            }
            self.at_line_start = false;
        }
        self.writer.write_str(text)
    }

    /// Write text, indenting every line that starts inside it.
    pub fn write(&mut self, text: &str) -> fmt::Result {
        let mut lines = text.split('\n');
        if let Some(first) = lines.next() {
            self.write_fragment(first)?;
        }
        for line in lines {
            self.writer.write_char('\n')?;
            self.at_line_start = true;
            self.write_fragment(line)?;
        }
        Ok(())
    }

    pub fn writeln(&mut self, text: &str) -> fmt::Result {
        self.write(text)?;
        self.blank_line()
    }

    /// Terminate the current line; on an empty line this writes a blank one.
    pub fn blank_line(&mut self) -> fmt::Result {
        self.writer.write_char('\n')?;
        self.at_line_start = true;
        Ok(())
    }

    /// Increase indentation until the returned guard is dropped.
    pub fn indent(&mut self) -> IndentGuard {
        self.indent_level.set(self.indent_level.get() + 1);
        IndentGuard {
            indent_level: Rc::clone(&self.indent_level),
        }
    }

    /// Write `// text` lines, one per line of `text`. Empty lines become a
    /// bare `//`.
    pub fn comment(&mut self, text: &str) -> fmt::Result {
        for line in text.split('\n') {
            if line.is_empty() {
                self.writeln("//")?;
            } else {
                self.write("// ")?;
                self.writeln(line)?;
            }
        }
        Ok(())
    }

    /// Write `header {`, the indented body, and the closing brace.
    pub fn block<F>(&mut self, header: &str, body: F) -> fmt::Result
    where
        F: FnOnce(&mut Self) -> fmt::Result,
    {
        self.write(header)?;
        self.writeln(" {")?;
        {
            let _indent = self.indent();
            body(self)?;
        }
        self.writeln("}")
    }

    /// Write items separated by `separator`.
    pub fn write_separated<I, F>(&mut self, items: I, separator: &str, mut item: F) -> fmt::Result
    where
        I: IntoIterator,
        F: FnMut(&mut Self, I::Item) -> fmt::Result,
    {
        for (i, it) in items.into_iter().enumerate() {
            if i > 0 {
                self.write(separator)?;
            }
            item(self, it)?;
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: fmt::Write> fmt::Write for CodeWriter<W> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write(s)
    }
}

/// Dedents on drop.
pub struct IndentGuard {
    indent_level: Rc<Cell<usize>>,
}

impl Drop for IndentGuard {
    fn drop(&mut self) {
        let current = self.indent_level.get();
        self.indent_level.set(current.saturating_sub(1));
    }
}
