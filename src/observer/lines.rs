//! Splits raw output chunks into lines for hosts that deliver bytes.

/// Reassembles `\n`-terminated lines from arbitrarily split chunks.
///
/// Lines longer than `max_line_length` bytes are dropped whole.
#[derive(Debug)]
pub struct LineBuffer {
    pending: Vec<u8>,
    max_line_length: usize,
    discarding: bool,
}

impl LineBuffer {
    pub fn new(max_line_length: usize) -> Self {
        Self {
            pending: Vec::new(),
            max_line_length,
            discarding: false,
        }
    }

    /// Feed a chunk and return the lines it completed, without terminators.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let head = &rest[..pos];
            rest = &rest[pos + 1..];

            if self.discarding {
                self.discarding = false;
                continue;
            }
            if self.pending.len() + head.len() > self.max_line_length {
                self.drop_long_line(self.pending.len() + head.len());
                self.discarding = false;
                continue;
            }
            self.pending.extend_from_slice(head);
            lines.push(String::from_utf8_lossy(&self.pending).into_owned());
            self.pending.clear();
        }

        if !self.discarding {
            self.pending.extend_from_slice(rest);
            if self.pending.len() > self.max_line_length {
                self.drop_long_line(self.pending.len());
            }
        }
        lines
    }

    /// Return a trailing unterminated line at end of stream.
    pub fn flush(&mut self) -> Option<String> {
        if std::mem::take(&mut self.discarding) || self.pending.is_empty() {
            self.pending.clear();
            return None;
        }
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Some(line)
    }

    fn drop_long_line(&mut self, seen: usize) {
        tracing::warn!(
            limit = self.max_line_length,
            "dropping output line longer than {} bytes ({} seen)",
            self.max_line_length,
            seen
        );
        self.pending.clear();
        self.discarding = true;
    }
}
