pub trait Navigator {
    fn location(&self) -> String;

    fn push(&mut self, location: String);
}

#[derive(Clone, Debug)]
pub struct History {
    entries: Vec<String>,
    cursor: usize,
}

impl History {
    pub fn new(location: &str) -> Self {
        Self {
            entries: vec![location.trim_start_matches('?').to_owned()],
            cursor: 0,
        }
    }

    pub fn back(&mut self) -> bool {
        if self.cursor > 0 {
            self.cursor -= 1;
            true
        } else {
            false
        }
    }

    pub fn forward(&mut self) -> bool {
        if self.cursor + 1 < self.entries.len() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new("")
    }
}

impl Navigator for History {
    fn location(&self) -> String {
        self.entries[self.cursor].clone()
    }

    // Forward entries are dropped. Pushing the current location again is
    // a no-op.
    fn push(&mut self, location: String) {
        if self.entries[self.cursor] == location {
            return;
        }
        self.entries.truncate(self.cursor + 1);
        self.entries.push(location);
        self.cursor += 1;
        tracing::trace!(location = %self.entries[self.cursor], "navigated");
    }
}
