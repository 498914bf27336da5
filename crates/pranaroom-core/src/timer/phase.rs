//! Phase scheduling for breath cycles and item sequences.
//!
//! Stateless: every function works on a cursor owned by the caller.
//!
//! Overshoot policy: when a tick carries a phase past its duration, the
//! excess is carried into the next phase rather than discarded, so the
//! realized cycle length matches the technique exactly at any tick size.
//! A single long tick may therefore cross several phases.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::technique::{PhaseCycle, PhaseKind, PlannedItem};

/// Position within a breath cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CycleCursor {
    pub phase_index: usize,
    /// Time spent in the current phase. Always below the phase duration
    /// between ticks.
    pub phase_elapsed_ms: u64,
    pub phases_completed: u64,
    pub cycles_completed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: PhaseKind,
    pub to: PhaseKind,
    /// The transition wrapped back to the start of the cycle.
    pub cycle_completed: bool,
}

/// Position within an ordered item sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SequenceCursor {
    pub step_index: usize,
    pub item_elapsed_ms: u64,
    pub items_completed: usize,
    /// Every item has been held; the sequence does not wrap.
    pub exhausted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTransition {
    pub completed_index: usize,
    pub next_index: Option<usize>,
}

pub struct PhaseScheduler;

impl PhaseScheduler {
    /// First phase that will actually be entered.
    pub fn first_phase(cycle: &PhaseCycle) -> Option<usize> {
        cycle.phases().iter().position(|p| !p.is_skipped())
    }

    /// Refuse cycles in which no phase has a positive duration.
    pub fn validate(technique: &str, cycle: &PhaseCycle) -> Result<usize, ConfigError> {
        Self::first_phase(cycle).ok_or_else(|| ConfigError::EmptyCycle {
            technique: technique.to_string(),
        })
    }

    /// Next phase after `current`, skipping zero-duration phases and wrapping
    /// after the last. `None` only when the cycle has no enterable phase.
    pub fn next_phase(cycle: &PhaseCycle, current: usize) -> Option<usize> {
        let len = cycle.len();
        if len == 0 {
            return None;
        }
        (1..=len)
            .map(|step| (current + step) % len)
            .find(|&i| !cycle.phases()[i].is_skipped())
    }

    pub fn should_advance(phase_elapsed_ms: u64, duration_ms: u64) -> bool {
        phase_elapsed_ms >= duration_ms
    }

    /// Cursor positioned at the first enterable phase.
    pub fn start_cycle(cycle: &PhaseCycle) -> Option<CycleCursor> {
        Self::first_phase(cycle).map(|phase_index| CycleCursor {
            phase_index,
            ..CycleCursor::default()
        })
    }

    /// Advance a breath cycle by `delta_ms`, returning every transition taken.
    pub fn advance_cycle(
        cycle: &PhaseCycle,
        cursor: &mut CycleCursor,
        delta_ms: u64,
    ) -> Vec<PhaseTransition> {
        let mut transitions = Vec::new();
        cursor.phase_elapsed_ms = cursor.phase_elapsed_ms.saturating_add(delta_ms);

        while let Some(phase) = cycle.get(cursor.phase_index).copied() {
            let Some(next) = Self::next_phase(cycle, cursor.phase_index) else {
                break;
            };
            if phase.is_skipped() {
                // Never reached from start_cycle; recover without consuming time.
                cursor.phase_index = next;
                continue;
            }
            if !Self::should_advance(cursor.phase_elapsed_ms, phase.duration_ms) {
                break;
            }
            cursor.phase_elapsed_ms -= phase.duration_ms;
            cursor.phases_completed += 1;
            let cycle_completed = next <= cursor.phase_index;
            if cycle_completed {
                cursor.cycles_completed += 1;
            }
            transitions.push(PhaseTransition {
                from: phase.kind,
                to: cycle.phases()[next].kind,
                cycle_completed,
            });
            cursor.phase_index = next;
        }
        transitions
    }

    /// Time left in the cursor's current phase.
    pub fn phase_remaining_ms(cycle: &PhaseCycle, cursor: &CycleCursor) -> u64 {
        cycle
            .get(cursor.phase_index)
            .map(|p| p.duration_ms.saturating_sub(cursor.phase_elapsed_ms))
            .unwrap_or(0)
    }

    /// Next item in a sequence. Sequences terminate instead of wrapping.
    pub fn next_item(len: usize, current: usize) -> Option<usize> {
        let next = current + 1;
        (next < len).then_some(next)
    }

    /// Advance an item sequence by `delta_ms`, returning every item finished.
    pub fn advance_sequence(
        items: &[PlannedItem],
        cursor: &mut SequenceCursor,
        delta_ms: u64,
    ) -> Vec<ItemTransition> {
        let mut transitions = Vec::new();
        if cursor.exhausted || items.is_empty() {
            return transitions;
        }
        cursor.item_elapsed_ms = cursor.item_elapsed_ms.saturating_add(delta_ms);

        while let Some(item) = items.get(cursor.step_index) {
            if !Self::should_advance(cursor.item_elapsed_ms, item.hold_ms) {
                break;
            }
            cursor.items_completed += 1;
            let next_index = Self::next_item(items.len(), cursor.step_index);
            transitions.push(ItemTransition {
                completed_index: cursor.step_index,
                next_index,
            });
            match next_index {
                Some(next) => {
                    cursor.item_elapsed_ms -= item.hold_ms;
                    cursor.step_index = next;
                }
                None => {
                    cursor.item_elapsed_ms = item.hold_ms;
                    cursor.exhausted = true;
                    break;
                }
            }
        }
        transitions
    }

    pub fn item_remaining_ms(items: &[PlannedItem], cursor: &SequenceCursor) -> u64 {
        items
            .get(cursor.step_index)
            .map(|i| i.hold_ms.saturating_sub(cursor.item_elapsed_ms))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn items(holds: &[u64]) -> Vec<PlannedItem> {
        holds
            .iter()
            .enumerate()
            .map(|(i, &hold_ms)| PlannedItem {
                id: i.to_string(),
                name: format!("Item {i}"),
                hold_ms,
            })
            .collect()
    }

    #[test]
    fn next_phase_skips_zero_holds() {
        let cycle = PhaseCycle::four_slot(4000, 0, 4000, 0);
        assert_eq!(PhaseScheduler::next_phase(&cycle, 0), Some(2));
        assert_eq!(PhaseScheduler::next_phase(&cycle, 2), Some(0));
    }

    #[test]
    fn next_phase_on_empty_cycle_is_none() {
        let cycle = PhaseCycle::four_slot(0, 0, 0, 0);
        assert_eq!(PhaseScheduler::first_phase(&cycle), None);
        assert_eq!(PhaseScheduler::next_phase(&cycle, 0), None);
        assert!(PhaseScheduler::validate("flat", &cycle).is_err());
        assert!(PhaseScheduler::start_cycle(&cycle).is_none());
    }

    #[test]
    fn leading_zero_phase_is_never_entered() {
        let cycle = PhaseCycle::four_slot(0, 2000, 3000, 0);
        let cursor = PhaseScheduler::start_cycle(&cycle).unwrap();
        assert_eq!(cursor.phase_index, 1);
    }

    #[test]
    fn should_advance_at_boundary() {
        assert!(!PhaseScheduler::should_advance(3999, 4000));
        assert!(PhaseScheduler::should_advance(4000, 4000));
        assert!(PhaseScheduler::should_advance(4100, 4000));
    }

    #[test]
    fn overshoot_is_carried_into_next_phase() {
        // Kapalabhati: 1s inhale, 0.5s exhale, ticked at 300ms.
        let cycle = PhaseCycle::four_slot(1000, 0, 500, 0);
        let mut cursor = PhaseScheduler::start_cycle(&cycle).unwrap();
        for _ in 0..4 {
            PhaseScheduler::advance_cycle(&cycle, &mut cursor, 300);
        }
        // 1200ms: inhale done at 1000, 200ms into exhale.
        assert_eq!(cursor.phase_index, 2);
        assert_eq!(cursor.phase_elapsed_ms, 200);
        assert_eq!(PhaseScheduler::phase_remaining_ms(&cycle, &cursor), 300);
    }

    #[test]
    fn long_tick_crosses_several_phases() {
        let cycle = PhaseCycle::four_slot(1000, 0, 500, 0);
        let mut cursor = PhaseScheduler::start_cycle(&cycle).unwrap();
        let transitions = PhaseScheduler::advance_cycle(&cycle, &mut cursor, 3200);
        // 1000 + 500 + 1000 + 500 = 3000, then 200ms into inhale.
        assert_eq!(transitions.len(), 4);
        assert_eq!(cursor.cycles_completed, 2);
        assert_eq!(cursor.phase_index, 0);
        assert_eq!(cursor.phase_elapsed_ms, 200);
    }

    #[test]
    fn single_phase_cycle_wraps_to_itself() {
        let cycle = PhaseCycle::four_slot(2000, 0, 0, 0);
        let mut cursor = PhaseScheduler::start_cycle(&cycle).unwrap();
        let transitions = PhaseScheduler::advance_cycle(&cycle, &mut cursor, 2000);
        assert_eq!(transitions.len(), 1);
        assert!(transitions[0].cycle_completed);
        assert_eq!(cursor.phase_index, 0);
    }

    #[test]
    fn sequence_terminates_without_wrapping() {
        let seq = items(&[30_000, 30_000]);
        let mut cursor = SequenceCursor::default();
        let t = PhaseScheduler::advance_sequence(&seq, &mut cursor, 30_000);
        assert_eq!(
            t,
            vec![ItemTransition {
                completed_index: 0,
                next_index: Some(1)
            }]
        );
        let t = PhaseScheduler::advance_sequence(&seq, &mut cursor, 45_000);
        assert_eq!(t[0].next_index, None);
        assert!(cursor.exhausted);
        assert_eq!(cursor.step_index, 1);
        assert_eq!(cursor.items_completed, 2);
        assert!(PhaseScheduler::advance_sequence(&seq, &mut cursor, 1000).is_empty());
        assert_eq!(PhaseScheduler::item_remaining_ms(&seq, &cursor), 0);
    }

    #[test]
    fn next_item_stops_at_end() {
        assert_eq!(PhaseScheduler::next_item(3, 1), Some(2));
        assert_eq!(PhaseScheduler::next_item(3, 2), None);
    }

    fn traverse_one_cycle(cycle: &PhaseCycle, tick_ms: u64) -> (Vec<PhaseKind>, u64) {
        let mut cursor = PhaseScheduler::start_cycle(cycle).unwrap();
        let mut entered = vec![cycle.phases()[cursor.phase_index].kind];
        let mut elapsed = 0;
        while cursor.cycles_completed == 0 {
            elapsed += tick_ms;
            for t in PhaseScheduler::advance_cycle(cycle, &mut cursor, tick_ms) {
                if !t.cycle_completed {
                    entered.push(t.to);
                }
            }
        }
        (entered, elapsed - cursor.phase_elapsed_ms)
    }

    proptest! {
        #[test]
        fn hold_free_cycles_alternate(inhale in 1u64..20, exhale in 1u64..20) {
            let cycle = PhaseCycle::four_slot(inhale * 100, 0, exhale * 100, 0);
            let mut cursor = PhaseScheduler::start_cycle(&cycle).unwrap();
            let mut last = PhaseKind::Inhale;
            for _ in 0..200 {
                for t in PhaseScheduler::advance_cycle(&cycle, &mut cursor, 100) {
                    prop_assert_ne!(t.to, PhaseKind::Hold);
                    prop_assert_ne!(t.to, PhaseKind::HoldAfter);
                    prop_assert_ne!(t.to, last);
                    last = t.to;
                }
            }
        }

        #[test]
        fn one_traversal_sums_to_cycle_length(
            inhale in 1u64..10,
            hold in 0u64..10,
            exhale in 1u64..10,
            hold_after in 0u64..10,
        ) {
            let cycle = PhaseCycle::four_slot(inhale * 1000, hold * 1000, exhale * 1000, hold_after * 1000);
            let (entered, traversal_ms) = traverse_one_cycle(&cycle, 100);
            prop_assert_eq!(traversal_ms, (inhale + hold + exhale + hold_after) * 1000);
            prop_assert_eq!(entered.len(), cycle.active_phases().count());
        }

        #[test]
        fn phase_elapsed_stays_below_duration(
            inhale in 1u64..5000,
            exhale in 1u64..5000,
            tick in 10u64..2000,
        ) {
            let cycle = PhaseCycle::four_slot(inhale, 0, exhale, 0);
            let mut cursor = PhaseScheduler::start_cycle(&cycle).unwrap();
            for _ in 0..100 {
                PhaseScheduler::advance_cycle(&cycle, &mut cursor, tick);
                let duration = cycle.phases()[cursor.phase_index].duration_ms;
                prop_assert!(cursor.phase_elapsed_ms < duration);
            }
        }
    }
}
