//! Program I/O behind the `read` and `write` runtime imports.

use std::{
    collections::VecDeque,
    io::{self, BufRead, Write},
};

use crate::{Result, RuntimeFault};

/// Console abstraction used by the built-in runtime imports.
pub trait RuntimeIo {
    /// Reads the next integer.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeFault::EndOfInput`] when the input is exhausted and
    /// [`RuntimeFault::InvalidInput`] for anything that is not an `i32`.
    fn read_int(&mut self) -> Result<i32>;

    /// Writes one integer.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FileError`] if the sink fails.
    fn write_int(&mut self, value: i32) -> Result<()>;
}

/// Whitespace-separated integers from stdin, one integer per line on stdout.
#[derive(Debug, Default)]
pub struct StdIo {
    pending: VecDeque<String>,
}

impl StdIo {
    /// Creates a new console adapter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RuntimeIo for StdIo {
    fn read_int(&mut self) -> Result<i32> {
        while self.pending.is_empty() {
            let mut line = String::new();
            if io::stdin().lock().read_line(&mut line)? == 0 {
                return Err(RuntimeFault::EndOfInput.into());
            }
            self.pending
                .extend(line.split_whitespace().map(str::to_owned));
        }

        let token = self.pending.pop_front().unwrap_or_default();
        token
            .parse()
            .map_err(|_| RuntimeFault::InvalidInput(token).into())
    }

    fn write_int(&mut self, value: i32) -> Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{value}")?;
        out.flush()?;
        Ok(())
    }
}

/// In-memory I/O: a queue of inputs and a record of outputs.
///
/// # Examples
///
/// ```rust
/// use mila::execution::{BufferedIo, RuntimeIo};
///
/// let mut io = BufferedIo::new([7]);
/// assert_eq!(io.read_int()?, 7);
/// assert!(io.read_int().is_err());
/// io.write_int(3)?;
/// assert_eq!(io.output(), &[3]);
/// # Ok::<(), mila::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferedIo {
    input: VecDeque<i32>,
    output: Vec<i32>,
}

impl BufferedIo {
    /// Creates a buffer that will yield `input` in order.
    #[must_use]
    pub fn new(input: impl IntoIterator<Item = i32>) -> Self {
        Self {
            input: input.into_iter().collect(),
            output: Vec::new(),
        }
    }

    /// Queues another input value.
    pub fn push_input(&mut self, value: i32) {
        self.input.push_back(value);
    }

    /// Values not consumed yet.
    #[must_use]
    pub fn remaining_input(&self) -> usize {
        self.input.len()
    }

    /// Everything written so far.
    #[must_use]
    pub fn output(&self) -> &[i32] {
        &self.output
    }

    /// Takes the recorded output, leaving it empty.
    pub fn take_output(&mut self) -> Vec<i32> {
        std::mem::take(&mut self.output)
    }
}

impl RuntimeIo for BufferedIo {
    fn read_int(&mut self) -> Result<i32> {
        self.input
            .pop_front()
            .ok_or_else(|| RuntimeFault::EndOfInput.into())
    }

    fn write_int(&mut self, value: i32) -> Result<()> {
        self.output.push(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_buffered_io() {
        let mut io = BufferedIo::new([1, 2]);
        io.push_input(3);
        assert_eq!(io.remaining_input(), 3);
        assert_eq!(io.read_int().unwrap(), 1);
        assert_eq!(io.read_int().unwrap(), 2);
        assert_eq!(io.read_int().unwrap(), 3);
        assert!(matches!(
            io.read_int(),
            Err(Error::Fault(RuntimeFault::EndOfInput))
        ));

        io.write_int(-4).unwrap();
        io.write_int(5).unwrap();
        assert_eq!(io.take_output(), vec![-4, 5]);
        assert!(io.output().is_empty());
    }
}
