//! Mailbox (spec §4.B, component B): an ordered sequence of user messages
//! plus a disjoint ordered sequence of signals, with a cursor into the user
//! sequence for selective receive.
//!
//! Grounded on `ream::runtime::message::Mailbox`'s `VecDeque`-backed FIFO,
//! extended with the cursor and the signal channel that teacher didn't need
//! (its mailbox had no selective receive and routed control messages through
//! `SystemMessage` on the same queue as user data).

use std::collections::VecDeque;

use crate::term::Term;
use crate::types::{Pid, RefTicks};

/// Out-of-band control messages, consumed only by Signal Processing
/// (`process::signal`), never by user `receive` (spec §3 Signal).
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// Deliver a fatal reason; sets `Killed` on the target.
    Kill(Term),
    /// A `process_info/2` request from `sender` for the atom-named key.
    ProcessInfoRequest { key_atom: String, sender: Pid },
    /// Answer to a trapped request, placed in `x[0]` on delivery.
    TrapAnswer(Term),
    /// A trapped request failed (e.g. an unrecognized `process_info/2` key);
    /// distinct from `TrapAnswer` so the interpreter can tell "the call
    /// returned this term" from "the call raised this error term" — matching
    /// context.c's separate `TrapAnswerSignal`/`TrapExceptionSignal` variants
    /// (spec §4.G).
    TrapException(Term),
    /// Flush `'DOWN'` messages tagged with `ref_ticks`; `info` requests a
    /// boolean report of whether anything was removed.
    FlushMonitor { ref_ticks: RefTicks, info: bool },
    Link(Pid),
    Unlink(Pid),
    GcSignal,
}

/// Rough per-message overhead, in bytes, charged on top of term payload
/// size for `size_bytes()` introspection — a fixed header cost, not a
/// literal sizeof of any Rust type.
const MESSAGE_HEADER_BYTES: usize = 16;

#[derive(Debug, Default)]
pub struct Mailbox {
    messages: VecDeque<Term>,
    cursor: usize,
    signals: VecDeque<Signal>,
}

impl Mailbox {
    pub fn new() -> Self {
        Mailbox { messages: VecDeque::new(), cursor: 0, signals: VecDeque::new() }
    }

    /// Append `msg` to the user sequence. The caller is responsible for
    /// having already copied `msg` into the receiver's heap (spec §4.B:
    /// "copies msg_term into the receiver's heap under the receiver's
    /// lock") before this is called — the mailbox itself only orders terms,
    /// it does not own heap allocation.
    pub fn send(&mut self, msg: Term) {
        self.messages.push_back(msg);
    }

    /// The message at the cursor, without removing it.
    pub fn peek(&self) -> Option<&Term> {
        self.messages.get(self.cursor)
    }

    /// Advance the cursor past the current message (selective receive:
    /// "this one doesn't match, try the next").
    pub fn next(&mut self) {
        if self.cursor < self.messages.len() {
            self.cursor += 1;
        }
    }

    /// Remove the message at the cursor; the cursor stays pointing at what
    /// is now the next message.
    pub fn remove_message(&mut self) -> Option<Term> {
        if self.cursor < self.messages.len() {
            self.messages.remove(self.cursor)
        } else {
            None
        }
    }

    /// Return the cursor to the head of the user sequence.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Append to the signal channel. Setting the `Trap` flag on the
    /// receiver is the caller's job (`Process::send_signal`) — the mailbox
    /// has no flag register of its own to touch atomically here.
    pub fn send_signal(&mut self, signal: Signal) {
        self.signals.push_back(signal);
    }

    /// Pop the oldest undelivered signal, in arrival order.
    pub fn next_signal(&mut self) -> Option<Signal> {
        self.signals.pop_front()
    }

    pub fn has_signals(&self) -> bool {
        !self.signals.is_empty()
    }

    /// `message_queue_len` (spec §4.G process-info table): user messages
    /// only, signals are not counted.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Iterate the user sequence in order, for `flush_monitor` and similar
    /// whole-mailbox scans.
    pub fn iter(&self) -> impl Iterator<Item = &Term> {
        self.messages.iter()
    }

    /// Remove every message for which `predicate` returns true, preserving
    /// relative order of what remains, and resetting the cursor — used by
    /// `process_flush_monitor_signal` (spec §4.G).
    pub fn retain_messages<F: FnMut(&Term) -> bool>(&mut self, mut predicate: F) -> usize {
        let before = self.messages.len();
        self.messages.retain(|m| predicate(m));
        self.cursor = 0;
        before - self.messages.len()
    }

    /// Approximate byte footprint of the user sequence, for
    /// `process_info(memory)` (spec §4.G): word-size of each term times the
    /// VM's word width, plus a fixed per-message header cost.
    pub fn size_bytes(&self, word_size_bytes: usize) -> usize {
        self.messages
            .iter()
            .map(|m| m.word_size() * word_size_bytes + MESSAGE_HEADER_BYTES)
            .sum()
    }

    /// Releases all undelivered messages and signals. Must only be called
    /// once the mailbox is unreachable from the registry (Teardown step 4).
    pub fn destroy(self) {
        tracing::debug!(
            undelivered_messages = self.messages.len(),
            undelivered_signals = self.signals.len(),
            "mailbox destroyed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_preserves_fifo_order_from_one_sender() {
        let mut mbox = Mailbox::new();
        mbox.send(Term::SmallInt(1));
        mbox.send(Term::SmallInt(2));
        assert_eq!(mbox.peek(), Some(&Term::SmallInt(1)));
        mbox.next();
        assert_eq!(mbox.peek(), Some(&Term::SmallInt(2)));
    }

    #[test]
    fn remove_message_advances_to_following_message() {
        let mut mbox = Mailbox::new();
        mbox.send(Term::SmallInt(1));
        mbox.send(Term::SmallInt(2));
        assert_eq!(mbox.remove_message(), Some(Term::SmallInt(1)));
        assert_eq!(mbox.peek(), Some(&Term::SmallInt(2)));
        assert_eq!(mbox.len(), 1);
    }

    #[test]
    fn reset_returns_cursor_to_head() {
        let mut mbox = Mailbox::new();
        mbox.send(Term::SmallInt(1));
        mbox.send(Term::SmallInt(2));
        mbox.next();
        mbox.reset();
        assert_eq!(mbox.peek(), Some(&Term::SmallInt(1)));
    }

    #[test]
    fn signals_are_disjoint_from_user_messages() {
        let mut mbox = Mailbox::new();
        mbox.send(Term::SmallInt(1));
        mbox.send_signal(Signal::Kill(Term::atom("crash")));
        assert_eq!(mbox.len(), 1);
        assert!(mbox.has_signals());
        assert_eq!(mbox.next_signal(), Some(Signal::Kill(Term::atom("crash"))));
        assert!(!mbox.has_signals());
    }

    /// S4 — selective flush with info, mailbox half of the scenario.
    #[test]
    fn retain_messages_removes_matching_down_tuples_and_reports_count() {
        let mut mbox = Mailbox::new();
        let down_for_r = Term::Tuple(vec![
            Term::atom("DOWN"),
            Term::Ref(7),
            Term::atom("process"),
            Term::Pid(Pid::new()),
            Term::atom("normal"),
        ]);
        mbox.send(Term::atom("m1"));
        mbox.send(down_for_r);
        mbox.send(Term::atom("m2"));

        let removed = mbox.retain_messages(|m| {
            !(m.is_tuple() && m.tuple_element(1).and_then(Term::as_ref_ticks) == Some(7))
        });

        assert_eq!(removed, 1);
        assert_eq!(mbox.len(), 2);
        assert_eq!(mbox.peek(), Some(&Term::atom("m1")));
    }
}
