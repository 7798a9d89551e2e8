use std::io::Write;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{AppError, Result};

/// OSC 52 "set clipboard" sequence; the terminal forwards it to the system clipboard.
fn osc52_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", STANDARD.encode(text))
}

pub fn copy_to_clipboard<W: Write>(out: &mut W, text: &str) -> Result<()> {
    out.write_all(osc52_sequence(text).as_bytes())
        .and_then(|_| out.flush())
        .map_err(|e| AppError::Clipboard(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writes_base64_payload() {
        let mut out = Vec::new();
        copy_to_clipboard(&mut out, "hi").unwrap();
        assert_eq!(out, b"\x1b]52;c;aGk=\x07");
    }

    #[test]
    fn write_failure_is_a_clipboard_error() {
        let err = copy_to_clipboard(&mut Broken, "hi").unwrap_err();
        assert!(matches!(err, AppError::Clipboard(_)));
    }
}
