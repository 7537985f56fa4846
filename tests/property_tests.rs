/// Property-based tests using proptest
/// Tests invariants that should hold for all inputs
use proptest::prelude::*;
use lead_scout::core::domain::normalize_domain;
use lead_scout::core::evaluation::{priority_score, ICP_WEIGHT, KEYWORD_SCALE, KEYWORD_WEIGHT};

// Property: Domain normalization should never panic
proptest! {
    #[test]
    fn normalization_never_panics(input in "\\PC*") {
        let _ = normalize_domain(&input);
    }

    #[test]
    fn normalization_is_idempotent_on_its_output(
        sub in "[a-z]{1,8}",
        name in "[a-z]{1,12}",
        tld in "(com|io|net|de|co\\.uk|com\\.br|org\\.au)"
    ) {
        let domain = normalize_domain(&format!("https://{}.{}.{}/path?q=1", sub, name, tld));
        prop_assert!(!domain.is_empty());
        prop_assert_eq!(normalize_domain(&format!("http://{}", domain)), domain.clone());
    }

    #[test]
    fn subdomains_are_stripped(
        subs in proptest::collection::vec("[a-z]{1,6}", 0..4),
        // Longer than any second-level label, so it is never mistaken for one.
        name in "[a-z]{4,12}",
        tld in "(com|io|net)"
    ) {
        let mut host = subs.join(".");
        if !host.is_empty() {
            host.push('.');
        }
        host.push_str(&format!("{}.{}", name, tld));

        prop_assert_eq!(normalize_domain(&format!("https://{}", host)), format!("{}.{}", name, tld));
    }

    #[test]
    fn normalized_domain_is_lowercase(name in "[A-Za-z]{1,12}", tld in "(COM|Io|net)") {
        let domain = normalize_domain(&format!("HTTPS://WWW.{}.{}", name, tld));
        prop_assert_eq!(domain.clone(), domain.to_lowercase());
    }
}

// Property: Priority score stays on the 0-100 scale and follows the weights
proptest! {
    #[test]
    fn priority_score_within_bounds(icp in 0i32..=100, keyword in 1i32..=5) {
        let score = priority_score(icp, keyword);
        prop_assert!(score >= 0.0 && score <= 100.0);
    }

    #[test]
    fn priority_score_matches_formula(icp in 0i32..=100, keyword in 1i32..=5) {
        let expected = icp as f64 * ICP_WEIGHT + keyword as f64 * KEYWORD_SCALE * KEYWORD_WEIGHT;
        prop_assert!((priority_score(icp, keyword) - expected).abs() < 1e-9);
    }

    #[test]
    fn priority_score_monotonic_in_icp(icp in 0i32..100, keyword in 1i32..=5) {
        prop_assert!(priority_score(icp + 1, keyword) > priority_score(icp, keyword));
    }
}
