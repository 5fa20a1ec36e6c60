use std::io::{self, Write};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

/// Line-oriented prompts over any async reader; `None` means the input closed.
pub struct Prompter<R> {
    lines: Lines<R>,
}

impl<R> Prompter<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }

    pub async fn ask<W: Write>(&mut self, out: &mut W, label: &str) -> io::Result<Option<String>> {
        write!(out, "{label}")?;
        out.flush()?;
        let line = self.lines.next_line().await?;
        Ok(line.map(|line| line.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn answers_are_trimmed_until_input_closes() -> io::Result<()> {
        let mut prompter = Prompter::new(&b"  first  \nsecond\n"[..]);
        let mut out = Vec::new();

        assert_eq!(prompter.ask(&mut out, "? ").await?.as_deref(), Some("first"));
        assert_eq!(prompter.ask(&mut out, "? ").await?.as_deref(), Some("second"));
        assert_eq!(prompter.ask(&mut out, "? ").await?, None);
        assert_eq!(String::from_utf8_lossy(&out), "? ? ? ");
        Ok(())
    }
}
