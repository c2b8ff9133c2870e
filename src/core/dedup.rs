use crate::model::locator;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Added,
    Duplicate,
    Malformed,
    MalformedRepeat,
}

#[derive(Debug, Default)]
pub struct CandidateSet {
    seen: HashSet<String>,
    ordered: Vec<String>,
    malformed: HashSet<String>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offer(&mut self, uri: &str) -> bool {
        if self.seen.contains(uri) {
            return false;
        }
        self.seen.insert(uri.to_string());
        self.ordered.push(uri.to_string());
        true
    }

    pub fn admit(&mut self, uri: &str) -> Admission {
        if !locator::is_valid_track_uri(uri) {
            return if self.malformed.insert(uri.to_string()) {
                Admission::Malformed
            } else {
                Admission::MalformedRepeat
            };
        }
        if self.offer(uri) {
            Admission::Added
        } else {
            Admission::Duplicate
        }
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn malformed_count(&self) -> usize {
        self.malformed.len()
    }

    pub fn into_ordered(self) -> Vec<String> {
        self.ordered
    }
}
