//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::*;
use crate::prompts;
use crate::session::{Phase, Session};
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_phase() -> impl Strategy<Value = Phase> {
    prop_oneof![
        Just(Phase::Initial),
        Just(Phase::Category),
        Just(Phase::Topic),
    ]
}

fn arb_session() -> impl Strategy<Value = Session> {
    (
        arb_phase(),
        "[A-Za-z]{0,12}",
        "[A-Za-z ]{0,20}",
        "[A-Za-z .\n]{0,200}",
    )
        .prop_map(|(phase, category, topic, script)| Session {
            phase,
            category,
            topic,
            script,
            ..Session::new()
        })
}

fn arb_stage() -> impl Strategy<Value = GenerationStage> {
    prop_oneof![
        Just(GenerationStage::Topics),
        Just(GenerationStage::Script),
        Just(GenerationStage::Speech),
        Just(GenerationStage::AudioFile),
    ]
}

fn arb_selection() -> impl Strategy<Value = Event> {
    ("[a-z0-9]{1,16}", "[A-Za-z ]{0,24}")
        .prop_map(|(callback_id, label)| Event::Selection { callback_id, label })
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        Just(Event::Command(Command::NewSession)),
        Just(Event::Command(Command::GetText)),
        "[a-z ]{0,20}".prop_map(|text| Event::Text { text }),
        arb_selection(),
        "[A-Za-z ,]{0,80}".prop_map(|text| Event::TopicsGenerated { text }),
        "[A-Za-z .]{0,80}".prop_map(|script| Event::ScriptGenerated { script }),
        proptest::collection::vec(any::<u8>(), 0..32)
            .prop_map(|audio| Event::SpeechSynthesized { audio }),
        (arb_stage(), "[a-z ]{0,20}")
            .prop_map(|(stage, message)| Event::GenerationFailed { stage, message }),
    ]
}

fn count_acks(effects: &[Effect]) -> usize {
    effects
        .iter()
        .filter(|e| matches!(e, Effect::AnswerCallback { .. }))
        .count()
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn new_session_always_lands_in_category_with_cleared_fields(session in arb_session()) {
        let result = transition(&session, Event::Command(Command::NewSession));
        prop_assert_eq!(result.new_session.phase, Phase::Category);
        prop_assert!(result.new_session.category.is_empty());
        prop_assert!(result.new_session.topic.is_empty());
        prop_assert!(result.new_session.script.is_empty());
        prop_assert_eq!(result.effects, vec![Effect::offer_categories()]);
    }

    #[test]
    fn every_selection_is_acknowledged_exactly_once(session in arb_session(), event in arb_selection()) {
        let result = transition(&session, event);
        prop_assert_eq!(count_acks(&result.effects), 1);
        // Acknowledgment comes before any slow generation call
        prop_assert!(
            matches!(result.effects[0], Effect::AnswerCallback { .. }),
            "first effect was {:?}",
            result.effects[0]
        );
    }

    #[test]
    fn only_selections_acknowledge(session in arb_session(), event in arb_event()) {
        let is_selection = matches!(event, Event::Selection { .. });
        let result = transition(&session, event);
        prop_assert_eq!(count_acks(&result.effects), usize::from(is_selection));
    }

    #[test]
    fn topic_phase_requires_category(session in arb_session(), event in arb_event()) {
        // Start from a session that already satisfies the invariant
        prop_assume!(session.phase != Phase::Topic || !session.category.is_empty());
        let result = transition(&session, event);
        if result.new_session.phase == Phase::Topic {
            prop_assert!(!result.new_session.category.is_empty());
        }
    }

    #[test]
    fn script_generation_requires_topic(session in arb_session(), event in arb_event()) {
        let result = transition(&session, event);
        if result.effects.iter().any(|e| matches!(e, Effect::GenerateScript { .. })) {
            prop_assert!(!result.new_session.topic.is_empty());
        }
    }

    #[test]
    fn script_only_changes_on_success_or_reset(session in arb_session(), event in arb_event()) {
        let is_success = matches!(&event, Event::ScriptGenerated { script } if !script.trim().is_empty());
        let is_reset = matches!(event, Event::Command(Command::NewSession));
        let result = transition(&session, event);
        if !is_success && !is_reset {
            prop_assert_eq!(&result.new_session.script, &session.script);
        }
    }

    #[test]
    fn generation_failure_preserves_fields(session in arb_session(), stage in arb_stage()) {
        let result = transition(&session, Event::GenerationFailed { stage, message: "x".to_string() });
        prop_assert_eq!(&result.new_session.category, &session.category);
        prop_assert_eq!(&result.new_session.topic, &session.topic);
        prop_assert_eq!(&result.new_session.script, &session.script);
        prop_assert_eq!(
            result.effects,
            vec![Effect::send_text(prompts::GENERATION_ERROR), Effect::offer_categories()]
        );
    }

    #[test]
    fn get_text_never_mutates_and_never_exceeds_limit(
        mut session in arb_session(),
        script in "[a-zA-Z ]{0,5000}",
    ) {
        session.script = script;
        let result = transition(&session, Event::Command(Command::GetText));
        prop_assert_eq!(&result.new_session, &session);
        prop_assert_eq!(result.effects.len(), 1);
        match &result.effects[0] {
            Effect::SendText { text, .. } => {
                prop_assert!(text.chars().count() <= 4096);
                if session.script.is_empty() {
                    prop_assert_eq!(text.as_str(), prompts::NO_SCRIPT);
                }
            }
            other => prop_assert!(false, "unexpected effect {:?}", other),
        }
    }

    #[test]
    fn offered_topics_are_never_blank(text in "[A-Za-z ,]{0,120}") {
        let session = Session { phase: Phase::Topic, category: "ML".to_string(), ..Session::new() };
        let result = transition(&session, Event::TopicsGenerated { text });
        for effect in &result.effects {
            if let Effect::SendOptions { rows, .. } = effect {
                prop_assert!(rows.len() <= 2);
                prop_assert!(rows.iter().flatten().all(|label| !label.trim().is_empty()));
            }
        }
    }
}
