//! Monitor/Link table (spec §4.D, component D): bidirectional links and
//! one-way monitors, both recorded in a single table keyed by the peer pid,
//! grounded on context.c's `struct Monitor` union (a link and a monitor
//! share the same linked-list node, distinguished by a tag).
//!
//! Links are symmetric: creating one touches both processes' tables.
//! Monitors are one-way: only the monitoring process gets an entry, tagged
//! with the `ref_ticks` the `'DOWN'` message must echo back.

use crate::term::Term;
use crate::types::{Pid, RefTicks};

/// What kind of peer is recorded: `Port` monitors tag their `'DOWN'` tuple
/// differently from `Process` ones (spec §4.I, scenario S3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerKind {
    Process,
    Port,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// A bidirectional link to `peer`.
    Link { peer: Pid },
    /// A one-way monitor of `peer`, tagged with the ref this monitor was
    /// created under and the monitoring process's view of what `peer` is.
    Monitor { peer: Pid, ref_ticks: RefTicks, kind: PeerKind },
}

/// The set of links and monitors a single process holds, in creation order
/// (teardown drains it front-to-back — spec §4.I doesn't mandate an order
/// among peers, but a stable one makes S1-S4 reproducible in tests).
#[derive(Debug, Default)]
pub struct MonitorTable {
    entries: Vec<Entry>,
}

impl MonitorTable {
    pub fn new() -> Self {
        MonitorTable { entries: Vec::new() }
    }

    pub fn add_link(&mut self, peer: Pid) {
        if !self.has_link(peer) {
            self.entries.push(Entry::Link { peer });
        }
    }

    pub fn remove_link(&mut self, peer: Pid) {
        self.entries.retain(|e| !matches!(e, Entry::Link { peer: p } if *p == peer));
    }

    pub fn has_link(&self, peer: Pid) -> bool {
        self.entries.iter().any(|e| matches!(e, Entry::Link { peer: p } if *p == peer))
    }

    pub fn add_monitor(&mut self, peer: Pid, ref_ticks: RefTicks, kind: PeerKind) {
        self.entries.push(Entry::Monitor { peer, ref_ticks, kind });
    }

    /// `demonitor(ref_ticks)` from spec §4.D: removes exactly the monitor
    /// entry carrying this ref, if present. Returns whether one was found.
    pub fn remove_monitor(&mut self, ref_ticks: RefTicks) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| !matches!(e, Entry::Monitor { ref_ticks: r, .. } if *r == ref_ticks));
        self.entries.len() != before
    }

    /// `demonitor(target_pid, linked)` from spec §4.D: first match by
    /// `(pid, linked)` is removed; silently succeeds (returns `false`) if
    /// absent.
    pub fn demonitor_by_target(&mut self, target: Pid, linked: bool) -> bool {
        let pos = self.entries.iter().position(|e| match e {
            Entry::Link { peer } => linked && *peer == target,
            Entry::Monitor { peer, .. } => !linked && *peer == target,
        });
        match pos {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Construct the `'DOWN'` tuple for a given monitor entry, per spec
    /// §4.I / context.c's `context_monitors_handle_terminate`:
    /// `{'DOWN', Ref, process | port, Pid, Reason}`.
    pub fn down_message(peer: Pid, ref_ticks: RefTicks, kind: PeerKind, reason: Term) -> Term {
        let kind_atom = match kind {
            PeerKind::Process => crate::term::atoms::process(),
            PeerKind::Port => crate::term::atoms::port(),
        };
        Term::Tuple(vec![
            Term::Atom(crate::term::atoms::down()),
            Term::Ref(ref_ticks),
            Term::Atom(kind_atom),
            Term::Pid(peer),
            reason,
        ])
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_link_is_idempotent() {
        let mut table = MonitorTable::new();
        let peer = Pid::new();
        table.add_link(peer);
        table.add_link(peer);
        assert_eq!(table.entries().len(), 1);
    }

    #[test]
    fn remove_monitor_by_ref_ticks_only_removes_that_entry() {
        let mut table = MonitorTable::new();
        let a = Pid::new();
        let b = Pid::new();
        table.add_monitor(a, 1, PeerKind::Process);
        table.add_monitor(b, 2, PeerKind::Process);
        assert!(table.remove_monitor(1));
        assert_eq!(table.entries().len(), 1);
        assert!(!table.remove_monitor(1));
    }

    /// Invariant 4 — monitor/demonitor round-trip.
    #[test]
    fn demonitor_round_trip_removes_exactly_one_record_then_is_a_no_op() {
        let mut table = MonitorTable::new();
        let target = Pid::new();
        table.add_monitor(target, 1, PeerKind::Process);
        assert!(table.demonitor_by_target(target, false));
        assert!(table.is_empty());
        assert!(!table.demonitor_by_target(target, false));
    }

    #[test]
    fn down_message_tags_port_kind_for_native_handlers() {
        let peer = Pid::new();
        let msg = MonitorTable::down_message(peer, 7, PeerKind::Port, Term::atom("normal"));
        assert_eq!(msg.tuple_element(2).unwrap().as_atom_str(), Some("port"));
    }
}
