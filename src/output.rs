use std::io::{self, Write};

/// Writes a user-facing line to stdout and, when given, to `writer` as well.
///
/// A failing stdout is logged and otherwise ignored; only errors from `writer`
/// are returned.
pub fn println(message: &str, writer: &mut Option<&mut dyn Write>) -> io::Result<()> {
    if let Err(e) = writeln!(io::stdout(), "{message}") {
        tracing::warn!("failed to write to stdout: {e}");
    }

    if let Some(w) = writer {
        writeln!(w, "{message}")?;
    }

    Ok(())
}
