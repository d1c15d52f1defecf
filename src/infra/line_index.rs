//! Newline index with LF/CRLF-robust line access.
//!
//! - Single pass over bytes to record line starts.
//! - 0-based line indices (matches editor positions).
//! - Returned lines exclude the trailing '\n' and any '\r' before it.
//! - Binary search for byte→line mapping.
//!
//! An empty buffer has 0 lines; a non-empty buffer without '\n' has 1.

#[derive(Debug, Clone)]
pub struct LineIndex<'a>
{
    /// Indexed text
    text: &'a str,

    /// Byte offset where each line starts
    starts: Vec<usize>,
}

impl<'a> LineIndex<'a>
{
    /// Build the index by scanning for '\n'.
    pub fn build(text: &'a str) -> Self
    {
        let bytes = text.as_bytes();
        let mut starts = Vec::with_capacity(bytes.len() / 48 + 1);

        if !bytes.is_empty()
        {
            starts.push(0);
        }

        for nl in memchr::memchr_iter(b'\n', bytes)
        {
            // A trailing '\n' does not open a new line
            if nl + 1 < bytes.len()
            {
                starts.push(nl + 1);
            }
        }

        Self { text, starts }
    }

    pub fn line_count(&self) -> usize
    {
        self.starts
            .len()
    }

    /// Text of the 0-based line `idx`, without its terminator.
    pub fn line(
        &self,
        idx: usize,
    ) -> Option<&'a str>
    {
        let start = *self
            .starts
            .get(idx)?;
        let end = self
            .starts
            .get(idx + 1)
            .copied()
            .unwrap_or(
                self.text
                    .len(),
            );

        let line = &self.text[start..end];
        let line = line
            .strip_suffix('\n')
            .unwrap_or(line);

        Some(
            line.strip_suffix('\r')
                .unwrap_or(line),
        )
    }

    /// 0-based line containing the byte offset.
    /// Offsets past the end clamp to the last line.
    pub fn line_of_offset(
        &self,
        offset: usize,
    ) -> usize
    {
        match self
            .starts
            .binary_search(&offset)
        {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        }
    }
}
