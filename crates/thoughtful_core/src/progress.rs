//! Merging section completions into per-unit progress items.

use std::collections::BTreeMap;

use crate::models::progress::{SectionCompletionInput, UserProgress, UserUnitProgress};
use crate::types::{UnitId, UserId};

/// Groups completions by unit, keeping input order within each unit.
pub fn group_by_unit(
    completions: &[SectionCompletionInput],
) -> BTreeMap<UnitId, Vec<&SectionCompletionInput>> {
    let mut grouped: BTreeMap<UnitId, Vec<&SectionCompletionInput>> = BTreeMap::new();
    for completion in completions {
        grouped
            .entry(completion.unit_id.clone())
            .or_default()
            .push(completion);
    }
    grouped
}

/// Records `timestamp` for each section not already completed. Returns how
/// many sections were newly marked.
pub fn apply_completions(
    progress: &mut UserUnitProgress,
    completions: &[&SectionCompletionInput],
    timestamp: &str,
) -> usize {
    let mut added = 0;
    for completion in completions {
        let sections = progress
            .completion
            .entry(completion.lesson_id.clone())
            .or_default();
        if !sections.contains_key(&completion.section_id) {
            sections.insert(completion.section_id.clone(), timestamp.to_string());
            added += 1;
        }
    }
    added
}

/// Folds unit items into the user-wide view. Units with no completions are
/// left out.
pub fn aggregate(user_id: &UserId, units: Vec<UserUnitProgress>) -> UserProgress {
    let completion = units
        .into_iter()
        .filter(|unit| !unit.completion.is_empty())
        .map(|unit| (unit.unit_id, unit.completion))
        .collect();
    UserProgress {
        user_id: user_id.clone(),
        completion,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completion(unit: &str, lesson: &str, section: &str) -> SectionCompletionInput {
        SectionCompletionInput {
            unit_id: unit.into(),
            lesson_id: lesson.into(),
            section_id: section.into(),
        }
    }

    #[test]
    fn groups_completions_per_unit() {
        let inputs = vec![
            completion("u1", "l1", "s1"),
            completion("u2", "l1", "s1"),
            completion("u1", "l2", "s3"),
        ];
        let grouped = group_by_unit(&inputs);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["u1"].len(), 2);
        assert_eq!(grouped["u1"][1].section_id, "s3");
    }

    #[test]
    fn keeps_first_completion_timestamp() {
        let mut progress = UserUnitProgress {
            user_id: "user".into(),
            unit_id: "u1".into(),
            completion: BTreeMap::new(),
        };
        let first = completion("u1", "l1", "s1");
        let second = completion("u1", "l1", "s2");

        assert_eq!(apply_completions(&mut progress, &[&first], "T1"), 1);
        assert_eq!(
            apply_completions(&mut progress, &[&first, &second], "T2"),
            1
        );

        assert_eq!(progress.completion["l1"]["s1"], "T1");
        assert_eq!(progress.completion["l1"]["s2"], "T2");
    }

    #[test]
    fn aggregate_skips_empty_units() {
        let mut filled = UserUnitProgress {
            user_id: "user".into(),
            unit_id: "u1".into(),
            completion: BTreeMap::new(),
        };
        apply_completions(&mut filled, &[&completion("u1", "l1", "s1")], "T");
        let empty = UserUnitProgress {
            user_id: "user".into(),
            unit_id: "u2".into(),
            completion: BTreeMap::new(),
        };

        let progress = aggregate(&"user".to_string(), vec![filled, empty]);
        assert_eq!(progress.completion.len(), 1);
        assert!(progress.completion.contains_key("u1"));
    }
}
