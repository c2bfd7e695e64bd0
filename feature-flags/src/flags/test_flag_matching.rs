#[cfg(test)]
mod tests {
    use rstest::rstest;

    use crate::flags::{
        flag_match_reason::FeatureFlagMatchReason,
        flag_matching::{FeatureFlagMatch, FeatureFlagMatcher},
        flag_matching_utils::BucketingHash,
        flag_models::{EvaluationContext, FlagDefinition, UserOverride},
    };

    fn beta_ui() -> FlagDefinition {
        FlagDefinition::new("beta_ui", true, 50).with_target_users(["admin-1"])
    }

    #[test]
    fn test_repeated_evaluation_is_deterministic() {
        let matcher = FeatureFlagMatcher::default();
        let definitions = vec![FlagDefinition::new("f", true, 37)];

        for i in 0..200 {
            let context = EvaluationContext::for_user(format!("user-{i}"), ["f"]);
            let first = matcher.evaluate(&context, &definitions, &[]);
            for _ in 0..5 {
                assert_eq!(matcher.evaluate(&context, &definitions, &[]), first);
            }
        }
    }

    #[test]
    fn test_override_beats_global_off() {
        let matcher = FeatureFlagMatcher::default();
        let definitions = vec![FlagDefinition::new("f", false, 0)];
        let overrides = vec![UserOverride::new("u1", "f", true)];

        let result = matcher.evaluate(
            &EvaluationContext::for_user("u1", ["f"]),
            &definitions,
            &overrides,
        );

        assert!(result.is_enabled("f"));
    }

    #[test]
    fn test_override_can_force_a_flag_off() {
        let matcher = FeatureFlagMatcher::default();
        let definitions = vec![FlagDefinition::new("f", true, 100).with_target_users(["u1"])];
        let overrides = vec![UserOverride::new("u1", "f", false)];

        let matches = matcher.evaluate_with_reasons(
            &EvaluationContext::for_user("u1", ["f"]),
            &definitions,
            &overrides,
        );

        assert_eq!(
            matches["f"],
            FeatureFlagMatch {
                matches: false,
                reason: FeatureFlagMatchReason::UserOverride,
            }
        );
    }

    #[test]
    fn test_override_applies_even_without_definition() {
        let matcher = FeatureFlagMatcher::default();
        let overrides = vec![UserOverride::new("u1", "ghost", true)];

        let result = matcher.evaluate(
            &EvaluationContext::for_user("u1", ["ghost"]),
            &[],
            &overrides,
        );

        assert!(result.is_enabled("ghost"));
    }

    #[test]
    fn test_overrides_for_other_users_are_ignored() {
        let matcher = FeatureFlagMatcher::default();
        let definitions = vec![FlagDefinition::new("f", false, 0)];
        let overrides = vec![UserOverride::new("someone-else", "f", true)];

        let result = matcher.evaluate(
            &EvaluationContext::for_user("u1", ["f"]),
            &definitions,
            &overrides,
        );

        assert!(!result.is_enabled("f"));
    }

    #[test]
    fn test_last_override_wins() {
        let matcher = FeatureFlagMatcher::default();
        let overrides = vec![
            UserOverride::new("u1", "f", true),
            UserOverride::new("u1", "f", false),
        ];

        let result = matcher.evaluate(
            &EvaluationContext::for_user("u1", ["f"]),
            &[FlagDefinition::new("f", true, 100)],
            &overrides,
        );

        assert!(!result.is_enabled("f"));
    }

    #[test]
    fn test_target_list_beats_zero_percentage() {
        let matcher = FeatureFlagMatcher::default();
        let definitions = vec![FlagDefinition::new("f", true, 0).with_target_users(["u2"])];

        let target = matcher.evaluate(
            &EvaluationContext::for_user("u2", ["f"]),
            &definitions,
            &[],
        );
        assert!(target.is_enabled("f"));

        for i in 0..100 {
            let other = matcher.evaluate(
                &EvaluationContext::for_user(format!("user-{i}"), ["f"]),
                &definitions,
                &[],
            );
            assert!(!other.is_enabled("f"), "user-{i} should not get the flag");
        }
    }

    #[test]
    fn test_target_list_is_not_gated_by_global_switch() {
        let matcher = FeatureFlagMatcher::default();
        let definitions = vec![FlagDefinition::new("f", false, 0).with_target_users(["beta-tester"])];

        let matches = matcher.evaluate_with_reasons(
            &EvaluationContext::for_user("beta-tester", ["f"]),
            &definitions,
            &[],
        );

        assert!(matches["f"].matches);
        assert_eq!(matches["f"].reason, FeatureFlagMatchReason::TargetUser);
    }

    #[rstest]
    #[case(BucketingHash::Sha1)]
    #[case(BucketingHash::CharSum)]
    fn test_full_rollout_enables_everyone(#[case] hash: BucketingHash) {
        let matcher = FeatureFlagMatcher::new(hash);
        let definitions = vec![FlagDefinition::new("f", true, 100)];

        for i in 0..500 {
            let result = matcher.evaluate(
                &EvaluationContext::for_user(format!("user-{i}"), ["f"]),
                &definitions,
                &[],
            );
            assert!(result.is_enabled("f"));
        }
    }

    #[test]
    fn test_full_rollout_respects_global_switch() {
        let matcher = FeatureFlagMatcher::default();
        let definitions = vec![FlagDefinition::new("f", false, 100)];

        let matches = matcher.evaluate_with_reasons(
            &EvaluationContext::for_user("u1", ["f"]),
            &definitions,
            &[],
        );

        assert_eq!(
            matches["f"],
            FeatureFlagMatch {
                matches: false,
                reason: FeatureFlagMatchReason::FlagDisabled,
            }
        );
    }

    #[rstest]
    #[case(BucketingHash::Sha1)]
    #[case(BucketingHash::CharSum)]
    fn test_zero_rollout_disables_everyone(#[case] hash: BucketingHash) {
        let matcher = FeatureFlagMatcher::new(hash);
        let definitions = vec![FlagDefinition::new("f", true, 0)];

        for i in 0..500 {
            let matches = matcher.evaluate_with_reasons(
                &EvaluationContext::for_user(format!("user-{i}"), ["f"]),
                &definitions,
                &[],
            );
            assert_eq!(matches["f"].reason, FeatureFlagMatchReason::ZeroRollout);
            assert!(!matches["f"].matches);
        }
    }

    #[test]
    fn test_partial_rollout_off_when_globally_disabled() {
        let matcher = FeatureFlagMatcher::default();
        // user-7 sits in bucket 18, inside a 50% rollout
        let definitions = vec![FlagDefinition::new("f", false, 50)];

        let matches = matcher.evaluate_with_reasons(
            &EvaluationContext::for_user("user-7", ["f"]),
            &definitions,
            &[],
        );

        assert_eq!(matches["f"].reason, FeatureFlagMatchReason::FlagDisabled);
        assert!(!matches["f"].matches);
    }

    #[test]
    fn test_unknown_flag_is_off() {
        let matcher = FeatureFlagMatcher::default();

        let matches = matcher.evaluate_with_reasons(
            &EvaluationContext::for_user("u1", ["nope"]),
            &[FlagDefinition::new("f", true, 100)],
            &[],
        );

        assert_eq!(
            matches["nope"],
            FeatureFlagMatch {
                matches: false,
                reason: FeatureFlagMatchReason::UnknownFlag,
            }
        );
    }

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    #[case(Some("  "))]
    fn test_missing_identity_disables_everything(#[case] user_id: Option<&str>) {
        let matcher = FeatureFlagMatcher::default();
        let definitions = vec![
            FlagDefinition::new("everyone", true, 100),
            FlagDefinition::new("targeted", true, 0).with_target_users([""]),
        ];
        let overrides = vec![UserOverride::new("", "everyone", true)];
        let context = EvaluationContext::new(user_id.map(str::to_string), ["everyone", "targeted"]);

        let matches = matcher.evaluate_with_reasons(&context, &definitions, &overrides);

        assert_eq!(matches.len(), 2);
        for flag_match in matches.values() {
            assert!(!flag_match.matches);
            assert_eq!(flag_match.reason, FeatureFlagMatchReason::MissingIdentity);
        }
    }

    #[test]
    fn test_example_scenario_with_sha1_buckets() {
        let matcher = FeatureFlagMatcher::new(BucketingHash::Sha1);
        let definitions = vec![beta_ui()];

        // admin-1 is target listed, user-7 is in bucket 18, user-2 is in bucket 80
        let cases = [
            ("admin-1", true, FeatureFlagMatchReason::TargetUser),
            ("user-7", true, FeatureFlagMatchReason::InRolloutBucket),
            ("user-2", false, FeatureFlagMatchReason::OutOfRolloutBucket),
        ];

        for (user_id, expected, reason) in cases {
            let matches = matcher.evaluate_with_reasons(
                &EvaluationContext::for_user(user_id, ["beta_ui"]),
                &definitions,
                &[],
            );
            assert_eq!(matches["beta_ui"].matches, expected, "{user_id}");
            assert_eq!(matches["beta_ui"].reason, reason, "{user_id}");
        }
    }

    #[test]
    fn test_example_scenario_with_legacy_buckets() {
        let matcher = FeatureFlagMatcher::new(BucketingHash::CharSum);
        let definitions = vec![beta_ui()];

        // code point sums: zzz-low-hash-user -> 1706 (bucket 6), user-a -> 589 (bucket 89)
        let low = matcher.evaluate(
            &EvaluationContext::for_user("zzz-low-hash-user", ["beta_ui"]),
            &definitions,
            &[],
        );
        let high = matcher.evaluate(
            &EvaluationContext::for_user("user-a", ["beta_ui"]),
            &definitions,
            &[],
        );

        assert!(low.is_enabled("beta_ui"));
        assert!(!high.is_enabled("beta_ui"));
    }

    #[test]
    fn test_bucket_comparison_is_strict() {
        // u1 is in sha1 bucket 26
        let matcher = FeatureFlagMatcher::new(BucketingHash::Sha1);

        let at_bucket = matcher.evaluate(
            &EvaluationContext::for_user("u1", ["f"]),
            &[FlagDefinition::new("f", true, 26)],
            &[],
        );
        let above_bucket = matcher.evaluate(
            &EvaluationContext::for_user("u1", ["f"]),
            &[FlagDefinition::new("f", true, 27)],
            &[],
        );

        assert!(!at_bucket.is_enabled("f"));
        assert!(above_bucket.is_enabled("f"));
    }

    #[test]
    fn test_rollout_grows_monotonically() {
        let matcher = FeatureFlagMatcher::default();
        let users: Vec<String> = (0..300).map(|i| format!("user-{i}")).collect();
        let mut previously_enabled = 0;

        for percentage in [10u8, 25, 50, 75, 99] {
            let definitions = vec![FlagDefinition::new("f", true, percentage)];
            let enabled = users
                .iter()
                .filter(|user_id| {
                    matcher
                        .evaluate(
                            &EvaluationContext::for_user(user_id.as_str(), ["f"]),
                            &definitions,
                            &[],
                        )
                        .is_enabled("f")
                })
                .count();
            assert!(enabled >= previously_enabled);
            previously_enabled = enabled;
        }
    }

    #[test]
    fn test_out_of_range_percentage_is_clamped() {
        let matcher = FeatureFlagMatcher::default();
        let mut flag = FlagDefinition::new("f", true, 100);
        flag.rollout_percentage = 200;

        let matches = matcher.evaluate_with_reasons(
            &EvaluationContext::for_user("u1", ["f"]),
            &[flag],
            &[],
        );

        assert_eq!(matches["f"].reason, FeatureFlagMatchReason::FullRollout);
    }

    #[test]
    fn test_negative_percentage_is_clamped_to_zero() {
        let matcher = FeatureFlagMatcher::default();
        let mut flag = FlagDefinition::new("f", true, 100);
        flag.rollout_percentage = -10;

        let matches = matcher.evaluate_with_reasons(
            &EvaluationContext::for_user("u1", ["f"]),
            &[flag],
            &[],
        );

        assert!(!matches["f"].matches);
        assert_eq!(matches["f"].reason, FeatureFlagMatchReason::ZeroRollout);
    }

    #[test]
    fn test_batch_resolves_each_key_independently() {
        let matcher = FeatureFlagMatcher::default();
        let definitions = vec![
            FlagDefinition::new("on", true, 100),
            FlagDefinition::new("off", false, 100),
            FlagDefinition::new("targeted", true, 0).with_target_users(["u1"]),
        ];
        let context = EvaluationContext::for_user("u1", ["on", "off", "targeted", "missing", "on"]);

        let result = matcher.evaluate(&context, &definitions, &[]);

        assert_eq!(result.len(), 4);
        assert_eq!(result.get("on"), Some(true));
        assert_eq!(result.get("off"), Some(false));
        assert_eq!(result.get("targeted"), Some(true));
        assert_eq!(result.get("missing"), Some(false));
    }

    #[test]
    fn test_empty_request_yields_empty_result() {
        let matcher = FeatureFlagMatcher::default();
        let context = EvaluationContext::for_user("u1", Vec::<String>::new());

        assert!(matcher
            .evaluate(&context, &[FlagDefinition::new("f", true, 100)], &[])
            .is_empty());
    }
}
