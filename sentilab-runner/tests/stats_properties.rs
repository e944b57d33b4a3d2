//! Property tests for descriptive statistics and Pearson correlation.

use proptest::prelude::*;
use sentilab_runner::stats::{describe, pearson};

// ── Strategies ──

fn sample() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-1_000.0f64..1_000.0, 1..60)
}

fn paired_sample() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    (2usize..40).prop_flat_map(|n| {
        (
            prop::collection::vec(-1_000.0f64..1_000.0, n),
            prop::collection::vec(-1_000.0f64..1_000.0, n),
        )
    })
}

// ── Properties ──

proptest! {
    #[test]
    fn describe_is_ordered(values in sample()) {
        let s = describe(&values).unwrap();
        let tol = 1e-9;
        prop_assert_eq!(s.count, values.len());
        prop_assert!(s.min <= s.q25 + tol);
        prop_assert!(s.q25 <= s.median + tol);
        prop_assert!(s.median <= s.q75 + tol);
        prop_assert!(s.q75 <= s.max + tol);
        prop_assert!(s.mean >= s.min - tol && s.mean <= s.max + tol);
        prop_assert!(s.std >= 0.0);
    }

    #[test]
    fn describe_ignores_nan(values in sample()) {
        let mut padded = values.clone();
        padded.push(f64::NAN);
        padded.insert(0, f64::INFINITY);
        prop_assert_eq!(describe(&padded), describe(&values));
    }

    #[test]
    fn pearson_is_bounded_and_symmetric((xs, ys) in paired_sample()) {
        match pearson(&xs, &ys) {
            Some(r) => {
                prop_assert!((-1.0..=1.0).contains(&r));
                prop_assert_eq!(pearson(&ys, &xs), Some(r));
            }
            None => prop_assert!(pearson(&ys, &xs).is_none()),
        }
    }

    #[test]
    fn pearson_flips_sign_with_negated_series((xs, ys) in paired_sample()) {
        let neg: Vec<f64> = ys.iter().map(|y| -y).collect();
        match (pearson(&xs, &ys), pearson(&xs, &neg)) {
            (Some(a), Some(b)) => prop_assert_eq!(a, -b),
            (None, None) => {}
            other => prop_assert!(false, "definedness differs: {:?}", other),
        }
    }
}
