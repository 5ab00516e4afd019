#![forbid(unsafe_code)]

//! Property tests for [`HistoryTimeline`] and [`ExecutionLedger`] invariants.
//!
//! Validates:
//! - Random append/step/truncate sequences match a two-stack reference model.
//! - The cursor never leaves `0..=len` and the depth limit is never exceeded.
//! - Ledger iteration order does not depend on insertion order.
//! - `first(n)` is always a prefix of the full ordering.

use std::sync::Arc;

use cmdx_core::{Command, Direction, Handler, Operation};
use cmdx_harness::{NamedCommand, RecordingHandler};
use cmdx_runtime::{ExecutionLedger, HistoryEntry, HistoryError, HistoryTimeline, LedgerEntry};
use proptest::prelude::*;

// ============================================================================
// Strategy helpers
// ============================================================================

/// Operations that can be performed on a HistoryTimeline.
#[derive(Debug, Clone)]
enum Op {
    Append(u8),
    Back,
    Forward,
    TruncateForward,
    TruncateBackward,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => any::<u8>().prop_map(Op::Append),
        3 => Just(Op::Back),
        3 => Just(Op::Forward),
        1 => Just(Op::TruncateForward),
        1 => Just(Op::TruncateBackward),
    ]
}

fn ops_strategy(max_len: usize) -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(op_strategy(), 1..=max_len)
}

fn entry(handler: &Arc<dyn Handler>, tag: u8) -> HistoryEntry {
    HistoryEntry::new(NamedCommand::edit(tag.to_string()).shared(), Arc::clone(handler))
}

fn name_of(entry: &HistoryEntry) -> String {
    entry.command().display_name().to_owned()
}

/// Reference model: done stack (top = most recent) and redo stack (top = next).
#[derive(Default)]
struct Model {
    done: Vec<String>,
    redo: Vec<String>,
    max_depth: usize,
}

impl Model {
    fn append(&mut self, name: String) {
        self.redo.clear();
        self.done.push(name);
        if self.max_depth > 0 && self.done.len() > self.max_depth {
            let excess = self.done.len() - self.max_depth;
            self.done.drain(..excess);
        }
    }

    fn back(&mut self) -> Option<String> {
        let name = self.done.pop()?;
        self.redo.push(name.clone());
        Some(name)
    }

    fn forward(&mut self) -> Option<String> {
        let name = self.redo.pop()?;
        self.done.push(name.clone());
        Some(name)
    }
}

// ============================================================================
// Timeline matches the two-stack model
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn timeline_matches_reference_model(ops in ops_strategy(60), max_depth in 0usize..6) {
        let handler: Arc<dyn Handler> = Arc::new(RecordingHandler::new("h"));
        let mut timeline = HistoryTimeline::with_max_depth(max_depth);
        let mut model = Model { max_depth, ..Model::default() };

        for op in ops {
            match op {
                Op::Append(tag) => {
                    timeline.append(entry(&handler, tag));
                    model.append(tag.to_string());
                }
                Op::Back => {
                    let got = timeline.step_back().map(|e| name_of(&e));
                    match model.back() {
                        Some(name) => prop_assert_eq!(got, Ok(name)),
                        None => prop_assert_eq!(got, Err(HistoryError::NoHistory(Direction::Back))),
                    }
                }
                Op::Forward => {
                    let got = timeline.step_forward().map(|e| name_of(&e));
                    match model.forward() {
                        Some(name) => prop_assert_eq!(got, Ok(name)),
                        None => prop_assert_eq!(got, Err(HistoryError::NoHistory(Direction::Forward))),
                    }
                }
                Op::TruncateForward => {
                    prop_assert_eq!(timeline.truncate_forward(), model.redo.len());
                    model.redo.clear();
                }
                Op::TruncateBackward => {
                    prop_assert_eq!(timeline.truncate_backward(), model.done.len());
                    model.done.clear();
                }
            }

            prop_assert!(timeline.cursor() <= timeline.len());
            if max_depth > 0 {
                prop_assert!(timeline.len() <= max_depth);
            }
            prop_assert_eq!(timeline.back_len(), model.done.len());
            prop_assert_eq!(timeline.forward_len(), model.redo.len());

            let expected_back: Vec<String> = model.done.iter().rev().cloned().collect();
            let expected_forward: Vec<String> = model.redo.iter().rev().cloned().collect();
            prop_assert_eq!(timeline.peek_back(usize::MAX), expected_back);
            prop_assert_eq!(timeline.peek_forward(usize::MAX), expected_forward);
        }
    }

    #[test]
    fn peeking_never_moves_cursor(ops in ops_strategy(30), n in 0usize..10) {
        let handler: Arc<dyn Handler> = Arc::new(RecordingHandler::new("h"));
        let mut timeline = HistoryTimeline::new();
        for op in ops {
            match op {
                Op::Append(tag) => timeline.append(entry(&handler, tag)),
                Op::Back => { let _ = timeline.step_back(); }
                Op::Forward => { let _ = timeline.step_forward(); }
                Op::TruncateForward => { timeline.truncate_forward(); }
                Op::TruncateBackward => { timeline.truncate_backward(); }
            }
            let cursor = timeline.cursor();
            let back = timeline.peek_back(n);
            let forward = timeline.peek_forward(n);
            prop_assert!(back.len() <= n.min(timeline.back_len()));
            prop_assert!(forward.len() <= n.min(timeline.forward_len()));
            prop_assert_eq!(timeline.cursor(), cursor);
        }
    }
}

// ============================================================================
// Ledger ordering is insertion-order independent
// ============================================================================

fn operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![Just(Operation::Do), Just(Operation::Undo), Just(Operation::Redo)]
}

/// (timestamp, name index or unnamed, operation)
fn record_strategy() -> impl Strategy<Value = (u64, Option<u8>, Operation)> {
    (0u64..5, prop::option::of(0u8..4), operation_strategy())
}

fn build_entries(specs: &[(u64, Option<u8>, Operation)]) -> Vec<LedgerEntry> {
    specs
        .iter()
        .enumerate()
        .map(|(seq, (ts, name, op))| {
            let command: Arc<dyn Command> = match name {
                Some(n) => NamedCommand::edit(format!("n{n}")).shared(),
                None => NamedCommand::unnamed(cmdx_harness::edit_type()).shared(),
            };
            LedgerEntry::new(command, *op, *ts, seq as u64)
        })
        .collect()
}

fn key(entry: &LedgerEntry) -> (u64, Option<String>, Operation, u64) {
    (
        entry.timestamp_ms(),
        entry.name().map(str::to_owned),
        entry.operation(),
        entry.sequence(),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn ledger_order_independent_of_insertion(
        (specs, shuffled) in prop::collection::vec(record_strategy(), 0..40)
            .prop_flat_map(|specs| {
                let indices: Vec<usize> = (0..specs.len()).collect();
                (Just(specs), Just(indices).prop_shuffle())
            })
    ) {
        let entries = build_entries(&specs);

        let mut forward = ExecutionLedger::new();
        for e in &entries {
            prop_assert!(forward.insert(e.clone()));
        }
        let mut permuted = ExecutionLedger::new();
        for &i in &shuffled {
            prop_assert!(permuted.insert(entries[i].clone()));
        }

        let a: Vec<_> = forward.iter().map(key).collect();
        let b: Vec<_> = permuted.iter().map(key).collect();
        prop_assert_eq!(&a, &b);

        // Newest first, then the documented tie-breaks.
        for pair in a.windows(2) {
            let (x, y) = (&pair[0], &pair[1]);
            prop_assert!(x >= y, "{:?} should sort before {:?}", x, y);
        }
    }

    #[test]
    fn first_n_is_prefix(specs in prop::collection::vec(record_strategy(), 0..30), n in 0usize..40) {
        let mut ledger = ExecutionLedger::new();
        for e in build_entries(&specs) {
            ledger.insert(e);
        }
        let all: Vec<_> = ledger.iter().map(key).collect();
        let head: Vec<_> = ledger.first(n).iter().map(key).collect();
        prop_assert_eq!(head.len(), n.min(all.len()));
        prop_assert_eq!(&all[..head.len()], &head[..]);
    }
}
