//! Bounded replay history.

/// Default replay budget in bytes.
pub const DEFAULT_REPLAY_BYTES: usize = 50_000;

/// Text history capped at a byte budget; the oldest text is dropped first.
///
/// Trimming always lands on a character boundary, so the retained history
/// may be a few bytes under the cap but is never invalid UTF-8.
#[derive(Debug, Clone)]
pub struct ReplayBuffer {
    text: String,
    capacity: usize,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            text: String::new(),
            capacity,
        }
    }

    pub fn push(&mut self, chunk: &str) {
        self.text.push_str(chunk);
        if self.text.len() > self.capacity {
            let mut cut = self.text.len() - self.capacity;
            while !self.text.is_char_boundary(cut) {
                cut += 1;
            }
            self.text.drain(..cut);
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl Default for ReplayBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_REPLAY_BYTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_everything_under_budget() {
        let mut buf = ReplayBuffer::new(16);
        buf.push("boot ");
        buf.push("ok\n");
        assert_eq!(buf.as_str(), "boot ok\n");
    }

    #[test]
    fn drops_oldest_bytes_first() {
        let mut buf = ReplayBuffer::new(8);
        buf.push("0123456789");
        assert_eq!(buf.as_str(), "23456789");
        buf.push("ab");
        assert_eq!(buf.as_str(), "456789ab");
    }

    #[test]
    fn trims_on_char_boundary() {
        let mut buf = ReplayBuffer::new(4);
        // 'é' is two bytes; cutting one byte in would split it.
        buf.push("aé€");
        assert!(buf.len() <= 4);
        assert_eq!(buf.as_str(), "€");
    }
}
