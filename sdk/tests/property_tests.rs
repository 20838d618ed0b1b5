use proptest::prelude::*;
use sdk::errors::{OrchestrationError, OrchestrationErrorExt};
use sdk::types::{GenerationParams, RequestContext, TaskCategory};

proptest! {
    #[test]
    fn test_error_user_hint_completeness(detail in "\\PC*") {
        // Every variant carrying free-form detail must still produce a
        // non-empty hint that does not leak the raw detail back out
        let errors = vec![
            OrchestrationError::Config(detail.clone()),
            OrchestrationError::Persistence(detail.clone()),
            OrchestrationError::ModelNotRegistered(detail.clone()),
            OrchestrationError::ModelNotLoaded(detail.clone()),
            OrchestrationError::NoSuitableModel(detail.clone()),
            OrchestrationError::MissingCredential(detail.clone()),
            OrchestrationError::InvalidResponse(detail.clone()),
            OrchestrationError::ModelGenerationFailed {
                model_id: detail.clone(),
                reason: detail.clone(),
            },
        ];

        for error in errors {
            let hint = error.user_hint();
            prop_assert!(!hint.is_empty());
            // Hints are fixed strings; recoverability never panics
            let _ = error.is_recoverable();
        }
    }

    #[test]
    fn test_category_json_round_trip(index in 0usize..TaskCategory::ALL.len()) {
        let category = TaskCategory::ALL[index];
        let json = serde_json::to_string(&category).expect("serialize");
        let back: TaskCategory = serde_json::from_str(&json).expect("deserialize");
        prop_assert_eq!(category, back);
    }

    #[test]
    fn test_derived_context_never_mutates_original(
        prompt in "\\PC{0,64}",
        derived_prompt in "\\PC{0,64}",
        temperature in -5.0f64..5.0,
    ) {
        let original = RequestContext::new(
            prompt.clone(),
            TaskCategory::General,
            GenerationParams::default(),
        );

        let with_prompt = original.with_prompt(derived_prompt.clone());
        let with_temperature = original.with_temperature(temperature);

        // The original is untouched
        prop_assert_eq!(&original.prompt, &prompt);
        prop_assert_eq!(original.params.temperature, GenerationParams::default().temperature);

        // Derived copies carry the changes within bounds
        prop_assert_eq!(&with_prompt.prompt, &derived_prompt);
        prop_assert!(with_temperature.params.temperature >= 0.0);
        prop_assert!(with_temperature.params.temperature <= 2.0);
    }
}
