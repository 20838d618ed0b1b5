use proptest::prelude::*;
use relay_engine::executor::combine::{combine, truncate_chars, Combination, TaggedOutput};
use relay_engine::executor::confidence::confidence_score;
use relay_engine::memory::MemoryContextManager;
use relay_engine::registry::{ModelCapabilities, ModelDescriptor, ModelRegistry};
use sdk::types::{ReasoningTier, TaskCategory};
use std::sync::Arc;

mod support;
use support::ScriptedBackend;

fn any_tier() -> impl Strategy<Value = ReasoningTier> {
    prop_oneof![
        Just(ReasoningTier::Low),
        Just(ReasoningTier::Medium),
        Just(ReasoningTier::High),
    ]
}

proptest! {
    #[test]
    fn test_confidence_always_in_unit_interval(
        tier in any_tier(),
        length in 0usize..50_000,
    ) {
        let text = "a".repeat(length);
        let confidence = confidence_score(tier, &text);
        prop_assert!((0.0..=1.0).contains(&confidence));
    }

    #[test]
    fn test_interaction_ring_never_exceeds_capacity(
        capacity in 1usize..20,
        insertions in 0usize..60,
    ) {
        let memory = MemoryContextManager::new(capacity);
        for i in 0..insertions {
            memory.store_interaction(&format!("p{i}"), "r", &["m".to_string()]);
        }

        prop_assert!(memory.len() <= capacity);

        // Newest first: the head is always the last insertion
        if insertions > 0 {
            let head = &memory.recent(1)[0];
            prop_assert_eq!(&head.prompt, &format!("p{}", insertions - 1));
        }
    }

    #[test]
    fn test_registry_listing_non_decreasing_priority(
        priorities in proptest::collection::vec(-100i32..100, 1..20),
    ) {
        let registry = ModelRegistry::new();
        for (i, priority) in priorities.iter().enumerate() {
            let descriptor = ModelDescriptor::new(
                format!("m{i}"),
                format!("m{i}"),
                ModelCapabilities::new(
                    &[TaskCategory::General],
                    ReasoningTier::Medium,
                    4096,
                    true,
                ),
                *priority,
            );
            registry.register(descriptor, Arc::new(ScriptedBackend::fixed("x")));
        }

        let listed = registry.list_all();
        for pair in listed.windows(2) {
            prop_assert!(pair[0].priority <= pair[1].priority);
            // Equal priorities preserve registration order (ids are
            // registered in index order)
            if pair[0].priority == pair[1].priority {
                let left: usize = pair[0].id[1..].parse().expect("id suffix");
                let right: usize = pair[1].id[1..].parse().expect("id suffix");
                prop_assert!(left < right);
            }
        }
    }

    #[test]
    fn test_truncate_chars_bounded(text in "\\PC{0,400}", limit in 1usize..300) {
        let truncated = truncate_chars(&text, limit);
        // At most limit characters plus the three-dot ellipsis
        prop_assert!(truncated.chars().count() <= limit + 3);
    }

    #[test]
    fn test_vote_annotation_consistent(
        texts in proptest::collection::vec("[ab]", 1..10),
    ) {
        let outputs: Vec<TaggedOutput> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| TaggedOutput::new(format!("m{i}"), i, t.clone()))
            .collect();

        let result = combine(Combination::Vote, &outputs).expect("non-empty vote");
        let needle = format!("/{} models agreed", outputs.len());
        prop_assert!(result.contains(&needle));
    }

    #[test]
    fn test_concatenate_has_one_block_per_candidate(
        count in 1usize..10,
    ) {
        let outputs: Vec<TaggedOutput> = (0..count)
            .map(|i| TaggedOutput::new(format!("m{i}"), i, format!("text {i}")))
            .collect();

        let result = combine(Combination::Concatenate, &outputs).expect("non-empty");
        for i in 0..count {
            let needle = format!("=== m{i} ===");
            prop_assert!(result.contains(&needle));
        }
    }
}
