use integrity_guard::{
    aggregate_risk, build_inform_block, extract_signals, rewrite_description, rewrite_title,
};
use proptest::prelude::*;

fn unit(v: f64) -> bool {
    (0.0..=1.0).contains(&v)
}

proptest! {
    #[test]
    fn scores_and_signals_stay_in_unit_range(
        title in ".{0,160}",
        description in ".{0,300}",
        links in prop::collection::vec(".{0,40}", 0..5),
    ) {
        let signals = extract_signals(&title, &description, &links);
        let (scores, _) = aggregate_risk(&signals, &title, &description);
        prop_assert!(unit(signals.clickbait));
        prop_assert!(unit(signals.engagement_bait));
        prop_assert!(unit(signals.misleading_thumb));
        prop_assert!(unit(signals.low_quality_landing));
        prop_assert!(unit(signals.repeat_offender_hint));
        prop_assert!(unit(scores.risk_remove));
        prop_assert!(unit(scores.risk_reduce));
    }

    #[test]
    fn inform_block_present_iff_needed(
        needs in any::<bool>(),
        links in prop::collection::vec("[a-z:/.]{1,30}", 0..6),
    ) {
        let block = build_inform_block(needs, &links);
        prop_assert_eq!(needs, !block.is_empty());
    }

    #[test]
    fn rewrites_respect_length_caps(title in ".{0,200}", description in ".{0,600}") {
        let fixed = rewrite_title(&title);
        prop_assert!(fixed.chars().count() <= 80);
        if fixed != title.replace("You'll never guess", "Here's what we learned")
            .replace("You\u{2019}ll never guess", "Here's what we learned")
            .replace("You'll never", "Here's what we learned")
            .replace("You\u{2019}ll never", "Here's what we learned")
            .replace("Incredible", "Concrete")
            .replace("Secret", "Method")
        {
            prop_assert!(fixed.ends_with('…'));
        }
        prop_assert!(rewrite_description(&description).chars().count() <= 220);
    }

    #[test]
    fn extraction_is_pure(title in ".{0,80}", description in ".{0,80}") {
        let links = vec!["https://bit.ly/x".to_string()];
        prop_assert_eq!(
            extract_signals(&title, &description, &links),
            extract_signals(&title, &description, &links)
        );
    }
}
