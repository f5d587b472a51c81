//! Process dictionary (spec §4.C, component C): an ordered per-process
//! key→value map of terms, touched only by the owning interpreter and
//! never addressed directly by another process.

use crate::term::Term;

#[derive(Debug, Default)]
pub struct Dictionary {
    entries: Vec<(Term, Term)>,
}

impl Dictionary {
    pub fn new() -> Self {
        Dictionary { entries: Vec::new() }
    }

    pub fn get(&self, key: &Term) -> Option<&Term> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Insert or overwrite `key`, returning the previous value if any.
    pub fn put(&mut self, key: Term, value: Term) -> Option<Term> {
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(std::mem::replace(&mut slot.1, value))
        } else {
            self.entries.push((key, value));
            None
        }
    }

    pub fn erase(&mut self, key: &Term) -> Option<Term> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, in insertion order — used as a GC root set (spec §4.A)
    /// and by the `erlang:get/0` builtin in a full VM.
    pub fn iter(&self) -> impl Iterator<Item = &(Term, Term)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let mut dict = Dictionary::new();
        assert_eq!(dict.put(Term::atom("name"), Term::atom("alice")), None);
        assert_eq!(dict.get(&Term::atom("name")), Some(&Term::atom("alice")));
    }

    #[test]
    fn put_overwrites_and_returns_previous_value() {
        let mut dict = Dictionary::new();
        dict.put(Term::atom("k"), Term::SmallInt(1));
        let previous = dict.put(Term::atom("k"), Term::SmallInt(2));
        assert_eq!(previous, Some(Term::SmallInt(1)));
        assert_eq!(dict.get(&Term::atom("k")), Some(&Term::SmallInt(2)));
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn erase_removes_the_entry() {
        let mut dict = Dictionary::new();
        dict.put(Term::atom("k"), Term::SmallInt(1));
        assert_eq!(dict.erase(&Term::atom("k")), Some(Term::SmallInt(1)));
        assert_eq!(dict.get(&Term::atom("k")), None);
        assert!(dict.is_empty());
    }
}
