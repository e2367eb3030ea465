/// Repeat-call guard. Stops a dispatch when the model keeps issuing the
/// same plugin call back to back.
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Detection state for a single dispatch.
#[derive(Debug, Default)]
pub struct LoopDetector {
    /// (plugin name, arguments hash) of the previous call.
    last: Option<(String, u64)>,
    /// How many times in a row `last` has been seen.
    streak: usize,
    /// Maximum allowed identical consecutive calls before a loop is declared.
    max_identical: usize,
}

impl LoopDetector {
    pub fn new(max_identical: usize) -> Self {
        Self {
            last: None,
            streak: 0,
            max_identical,
        }
    }

    /// Record a call and return whether a loop was detected.
    pub fn record(&mut self, name: &str, arguments: &str) -> bool {
        let key = (name.to_string(), hash_input(arguments));
        if self.last.as_ref() == Some(&key) {
            self.streak += 1;
        } else {
            self.last = Some(key);
            self.streak = 1;
        }
        self.streak > self.max_identical
    }

    /// Reset the detector for a new dispatch.
    pub fn reset(&mut self) {
        self.last = None;
        self.streak = 0;
    }
}

fn hash_input(input: &str) -> u64 {
    let mut h = DefaultHasher::new();
    input.hash(&mut h);
    h.finish()
}
