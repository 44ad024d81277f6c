//! Weighted rule scoring.
//!
//! A rule scores in [0, 1]:
//! - incomplete required coverage is capped at 0.5 (`coverage * 0.5`),
//! - complete coverage starts at 0.8 and gains up to 0.2 from optional symptoms,
//! - the result is scaled by the share of symptom weight actually present.

use std::collections::{BTreeSet, HashMap, HashSet};

const INCOMPLETE_CAP: f64 = 0.5;
const COMPLETE_BASE: f64 = 0.8;
const OPTIONAL_BONUS: f64 = 0.2;
const DEFAULT_WEIGHT: f64 = 1.0;

/// Score one rule against the user's symptom set.
///
/// An empty `required` set counts as fully covered. Symptoms missing from `weights`
/// weigh 1.0.
pub fn score(
    user_symptoms: &HashSet<&str>,
    required: &BTreeSet<String>,
    optional: &BTreeSet<String>,
    weights: &HashMap<String, f64>,
) -> f64 {
    let present_required: Vec<&String> = required
        .iter()
        .filter(|s| user_symptoms.contains(s.as_str()))
        .collect();

    if present_required.len() < required.len() {
        return present_required.len() as f64 / required.len() as f64 * INCOMPLETE_CAP;
    }

    let present_optional: Vec<&String> = optional
        .iter()
        .filter(|s| user_symptoms.contains(s.as_str()))
        .collect();

    let mut base = COMPLETE_BASE;
    if !optional.is_empty() {
        base += present_optional.len() as f64 / optional.len() as f64 * OPTIONAL_BONUS;
    }

    let weight_of = |id: &String| weights.get(id).copied().unwrap_or(DEFAULT_WEIGHT);
    let involved: BTreeSet<&String> = required.iter().chain(optional.iter()).collect();
    let present: BTreeSet<&String> = present_required
        .into_iter()
        .chain(present_optional)
        .collect();

    let weight_total: f64 = involved.iter().map(|&id| weight_of(id)).sum();
    let weight_present: f64 = present.iter().map(|&id| weight_of(id)).sum();

    let scored = if weight_total > 0.0 {
        base * (weight_present / weight_total)
    } else {
        base
    };
    scored.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn user<'a>(ids: &[&'a str]) -> HashSet<&'a str> {
        ids.iter().copied().collect()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn complete_required_without_optional_scores_base() {
        let required = set(&["fumee_noire", "consommation_elevee"]);
        let s = score(
            &user(&["fumee_noire", "consommation_elevee"]),
            &required,
            &BTreeSet::new(),
            &HashMap::new(),
        );
        assert!(close(s, 0.8), "got {s}");
    }

    #[test]
    fn partial_required_is_capped_at_half() {
        let required = set(&["a", "b"]);
        let s = score(&user(&["a"]), &required, &set(&["c"]), &HashMap::new());
        assert!(close(s, 0.25), "got {s}");

        let s = score(&user(&["a", "c"]), &set(&["a", "b", "d"]), &set(&["c"]), &HashMap::new());
        assert!(close(s, 1.0 / 3.0 * 0.5), "optional does not help an incomplete match");
    }

    #[test]
    fn nothing_present_scores_zero() {
        let s = score(&user(&["x"]), &set(&["a", "b"]), &set(&["c"]), &HashMap::new());
        assert_eq!(s, 0.0);
    }

    #[test]
    fn optional_bonus_and_weights() {
        let required = set(&["a"]);
        let optional = set(&["b", "c"]);
        let weights: HashMap<String, f64> = [("a", 1.0), ("b", 0.5), ("c", 0.5)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        // all present: base 1.0, full weight
        let s = score(&user(&["a", "b", "c"]), &required, &optional, &weights);
        assert!(close(s, 1.0), "got {s}");

        // one optional: base 0.9, weight 1.5 / 2.0
        let s = score(&user(&["a", "b"]), &required, &optional, &weights);
        assert!(close(s, 0.9 * 0.75), "got {s}");

        // required only: base 0.8, weight 1.0 / 2.0
        let s = score(&user(&["a"]), &required, &optional, &weights);
        assert!(close(s, 0.4), "got {s}");
    }

    #[test]
    fn weight_factor_over_required_set() {
        let required = set(&["a", "b"]);
        let weights: HashMap<String, f64> = [("a", 0.2), ("b", 0.6)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let s = score(&user(&["a", "b"]), &required, &BTreeSet::new(), &weights);
        // every involved symptom is present, so the weight factor is 1
        assert!(close(s, 0.8));
    }

    #[test]
    fn missing_weights_default_to_one() {
        let required = set(&["a"]);
        let optional = set(&["b"]);
        let weights: HashMap<String, f64> = [("a".to_string(), 1.0)].into_iter().collect();
        let s = score(&user(&["a"]), &required, &optional, &weights);
        assert!(close(s, 0.8 * 0.5), "got {s}");
    }

    #[test]
    fn empty_required_is_vacuously_complete() {
        let optional = set(&["a", "b"]);
        let s = score(&user(&["a"]), &BTreeSet::new(), &optional, &HashMap::new());
        assert!(close(s, 0.9 * 0.5), "got {s}");

        let s = score(&user(&["z"]), &BTreeSet::new(), &optional, &HashMap::new());
        assert_eq!(s, 0.0);
    }

    #[test]
    fn zero_total_weight_keeps_base() {
        let required = set(&["a"]);
        let weights: HashMap<String, f64> = [("a".to_string(), 0.0)].into_iter().collect();
        let s = score(&user(&["a"]), &required, &BTreeSet::new(), &weights);
        assert!(close(s, 0.8));

        let s = score(&user(&[]), &BTreeSet::new(), &BTreeSet::new(), &HashMap::new());
        assert!(close(s, 0.8));
    }

    #[test]
    fn score_stays_in_unit_interval() {
        let all = ["a", "b", "c", "d", "e"];
        let weights: HashMap<String, f64> = all
            .iter()
            .enumerate()
            .map(|(i, id)| (id.to_string(), i as f64 / 4.0))
            .collect();
        for mask in 0u32..(1 << all.len()) {
            let chosen: Vec<&str> = all
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, id)| *id)
                .collect();
            let s = score(&user(&chosen), &set(&["a", "b"]), &set(&["c", "d", "e"]), &weights);
            assert!((0.0..=1.0).contains(&s), "mask {mask:b} scored {s}");
        }
    }

    #[test]
    fn adding_required_symptoms_never_lowers_score() {
        let required = set(&["a", "b", "c", "d"]);
        let optional = set(&["e"]);
        let weights: HashMap<String, f64> = [("a", 0.3), ("b", 0.9), ("c", 0.1), ("d", 1.0)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        let mut chosen: Vec<&str> = vec![];
        let mut last = score(&user(&chosen), &required, &optional, &weights);
        for id in ["a", "b", "c", "d"] {
            chosen.push(id);
            let next = score(&user(&chosen), &required, &optional, &weights);
            assert!(next >= last, "{last} -> {next} after adding {id}");
            last = next;
        }
    }
}
