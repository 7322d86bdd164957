//! The byte-level I/O boundary of a running program.

use std::io::{ErrorKind, Read, Write};
use crate::BrainfuckError;

/// Where the `,` instruction takes its bytes from.
pub trait ByteSource {

    /// Produces the next byte, or `None` once the source is exhausted.
    fn read_byte(&mut self) -> Result<Option<u8>, BrainfuckError>;

}

/// Where the `.` instruction sends its bytes.
pub trait ByteSink {

    /// Accepts one byte. Calls arrive in program order.
    fn write_byte(&mut self, value: u8) -> Result<(), BrainfuckError>;

}

impl<R: Read> ByteSource for R {
    fn read_byte(&mut self) -> Result<Option<u8>, BrainfuckError> {
        let mut buf = [0u8; 1];
        loop {
            match self.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(buf[0])),
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(BrainfuckError::IoError(e))
            }
        }
    }
}

impl<W: Write> ByteSink for W {
    fn write_byte(&mut self, value: u8) -> Result<(), BrainfuckError> {
        self.write_all(&[value]).map_err(BrainfuckError::IoError)
    }
}
