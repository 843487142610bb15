//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::state::*;
use super::transition::*;
use super::*;
use crate::backend::{ChatResponse, ReplyMessage};
use crate::transcript::{Message, Transcript};
use chrono::{TimeZone, Utc};
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_id() -> impl Strategy<Value = String> {
    "[a-z0-9]{6}".prop_map(String::from)
}

fn arb_state() -> impl Strategy<Value = ConvState> {
    prop_oneof![
        Just(ConvState::Idle),
        arb_id().prop_map(|request_id| ConvState::Sending { request_id }),
    ]
}

fn arb_context() -> impl Strategy<Value = ConvContext> {
    proptest::option::of(arb_id()).prop_map(|conversation_id| ConvContext { conversation_id })
}

fn arb_response() -> impl Strategy<Value = ChatResponse> {
    (
        any::<bool>(),
        proptest::option::of(arb_id()),
        "[a-zA-Z ¡!¿?]{0,30}",
    )
        .prop_map(|(success, conversation_id, content)| {
            if success {
                let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
                ChatResponse::ok(conversation_id.as_deref(), ReplyMessage::new("m", content, at))
            } else {
                ChatResponse::rejected(None)
            }
        })
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        ("[ a-z]{0,12}", arb_id()).prop_map(|(text, message_id)| Event::UserSubmit {
            text,
            message_id,
            at: Utc::now(),
        }),
        Just(Event::NewConversation),
        (arb_id(), arb_response())
            .prop_map(|(request_id, response)| Event::ReplyReceived { request_id, response }),
        arb_id().prop_map(|request_id| Event::dispatch_failed(request_id, "boom")),
        (arb_id(), 0usize..3).prop_map(|(conversation_id, n)| Event::ConversationLoaded {
            conversation_id,
            messages: (0..n)
                .map(|i| Message::user(i.to_string(), "hola", Utc::now()))
                .collect(),
        }),
        arb_id().prop_map(|conversation_id| Event::ConversationDeleted { conversation_id }),
    ]
}

/// Settlement events that answer the in-flight request
fn arb_settlement(request_id: String) -> impl Strategy<Value = Event> {
    prop_oneof![
        arb_response().prop_map({
            let request_id = request_id.clone();
            move |response| Event::ReplyReceived {
                request_id: request_id.clone(),
                response,
            }
        }),
        Just(Event::dispatch_failed(request_id, "connection reset")),
    ]
}

/// Apply effects the way the runtime does, for the transcript-level invariants
fn apply(transcript: &mut Transcript, effects: &[Effect]) {
    for effect in effects {
        match effect {
            Effect::AppendMessage { message } => transcript.append(message.clone()),
            Effect::BindConversation { conversation_id } => {
                transcript.bind(conversation_id.clone());
            }
            Effect::ResetTranscript => transcript.reset(),
            Effect::ReplaceTranscript {
                conversation_id,
                messages,
            } => transcript.replace(conversation_id.clone(), messages.clone()),
            _ => {}
        }
    }
}

proptest! {
    // Invariant 1: every settlement of the in-flight request returns to Idle
    #[test]
    fn prop_settlement_always_clears_pending(
        (request_id, event) in arb_id().prop_flat_map(|id| (Just(id.clone()), arb_settlement(id))),
        context in arb_context(),
    ) {
        let state = ConvState::Sending { request_id };
        let result = transition(&state, &context, event);
        prop_assert!(result.is_ok(), "Settlement rejected: {:?}", result);
        prop_assert_eq!(result.unwrap().new_state, ConvState::Idle);
    }

    // Invariant 2: whitespace-only input never changes anything
    #[test]
    fn prop_blank_submit_is_noop(
        state in arb_state(),
        context in arb_context(),
        text in "[ \t\n]{0,8}",
        message_id in arb_id(),
    ) {
        let event = Event::UserSubmit { text, message_id, at: Utc::now() };
        let result = transition(&state, &context, event);
        prop_assert!(result.is_err());
    }

    // Invariant 3: a busy session rejects every submit
    #[test]
    fn prop_sending_rejects_submit(
        request_id in arb_id(),
        context in arb_context(),
        text in "[a-z]{1,12}",
        message_id in arb_id(),
    ) {
        let state = ConvState::Sending { request_id };
        let event = Event::UserSubmit { text, message_id, at: Utc::now() };
        prop_assert_eq!(transition(&state, &context, event).unwrap_err(), TransitionError::Busy);
    }

    // Invariant 4: an accepted submit emits exactly one dispatch, after the optimistic append
    #[test]
    fn prop_submit_appends_before_dispatch(
        context in arb_context(),
        text in "[a-z]{1,12}",
        message_id in arb_id(),
    ) {
        let event = Event::UserSubmit { text, message_id, at: Utc::now() };
        let result = transition(&ConvState::Idle, &context, event).unwrap();

        let append = result.effects.iter().position(|e| matches!(e, Effect::AppendMessage { .. }));
        let dispatches: Vec<usize> = result.effects.iter().enumerate()
            .filter(|(_, e)| matches!(e, Effect::Dispatch { .. }))
            .map(|(i, _)| i)
            .collect();
        prop_assert_eq!(dispatches.len(), 1);
        prop_assert!(append.is_some_and(|a| a < dispatches[0]));
        prop_assert!(result.new_state.is_pending());
    }

    // Invariant 5: only a submit leaves Idle, and a pending session never changes request
    #[test]
    fn prop_pending_only_via_submit(state in arb_state(), context in arb_context(), event in arb_event()) {
        let is_submit = matches!(event, Event::UserSubmit { .. });
        if let Ok(result) = transition(&state, &context, event) {
            match (&state, &result.new_state) {
                (ConvState::Idle, ConvState::Sending { .. }) => prop_assert!(is_submit),
                (ConvState::Sending { request_id: a }, ConvState::Sending { request_id: b }) => {
                    prop_assert_eq!(a, b);
                }
                _ => {}
            }
        }
    }

    // Invariant 6: within one session lifetime the conversation id changes at most once,
    // and only from None to Some
    #[test]
    fn prop_conversation_id_bound_once(events in proptest::collection::vec(arb_event(), 1..40)) {
        let mut state = ConvState::Idle;
        let mut transcript = Transcript::new();
        let mut changes = 0;

        for event in events {
            let lifetime_ends = matches!(
                event,
                Event::NewConversation | Event::ConversationLoaded { .. } | Event::ConversationDeleted { .. }
            );
            let before = transcript.conversation_id().map(str::to_string);
            let context = ConvContext::new(before.as_deref());

            if let Ok(result) = transition(&state, &context, event) {
                let resets = result.effects.iter().any(|e| matches!(
                    e,
                    Effect::ResetTranscript | Effect::ReplaceTranscript { .. }
                ));
                apply(&mut transcript, &result.effects);
                state = result.new_state;

                if lifetime_ends && resets {
                    changes = 0;
                    continue;
                }
                let after = transcript.conversation_id().map(str::to_string);
                if before != after {
                    prop_assert!(before.is_none(), "id reassigned: {:?} -> {:?}", before, after);
                    changes += 1;
                }
            }
            prop_assert!(changes <= 1);
        }
    }

    // Invariant 7: new conversation from Idle always yields an empty, unbound, idle session
    #[test]
    fn prop_new_conversation_resets(
        context in arb_context(),
        seeded in proptest::collection::vec("[a-z]{1,5}", 0..5),
    ) {
        let mut transcript = Transcript::new();
        if let Some(id) = &context.conversation_id {
            transcript.bind(id.clone());
        }
        for (i, text) in seeded.iter().enumerate() {
            transcript.append(Message::user(i.to_string(), text.clone(), Utc::now()));
        }

        let result = transition(&ConvState::Idle, &context, Event::NewConversation).unwrap();
        apply(&mut transcript, &result.effects);

        prop_assert_eq!(result.new_state, ConvState::Idle);
        prop_assert!(transcript.conversation_id().is_none());
        prop_assert!(transcript.messages().is_empty());
    }
}

// ============================================================================
// Scenario tests
// ============================================================================

#[test]
fn test_hola_round_trip() {
    let mut state = ConvState::Idle;
    let mut transcript = Transcript::new();

    let result = transition(
        &state,
        &ConvContext::new(transcript.conversation_id()),
        Event::UserSubmit {
            text: "Hola".to_string(),
            message_id: "u1".to_string(),
            at: Utc::now(),
        },
    )
    .unwrap();
    apply(&mut transcript, &result.effects);
    state = result.new_state;

    assert!(state.is_pending());
    assert_eq!(transcript.messages().len(), 1);

    // A second submit before settlement is rejected outright
    let busy = transition(
        &state,
        &ConvContext::new(transcript.conversation_id()),
        Event::user_submit("¿Qué tal?"),
    );
    assert_eq!(busy.unwrap_err(), TransitionError::Busy);

    let created = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 1).unwrap();
    let result = transition(
        &state,
        &ConvContext::new(transcript.conversation_id()),
        Event::ReplyReceived {
            request_id: "u1".to_string(),
            response: ChatResponse::ok(Some("abc"), ReplyMessage::new("m1", "¡Hola!", created)),
        },
    )
    .unwrap();
    apply(&mut transcript, &result.effects);
    state = result.new_state;

    assert_eq!(state, ConvState::Idle);
    assert_eq!(transcript.conversation_id(), Some("abc"));
    let contents: Vec<&str> = transcript.messages().iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["Hola", "¡Hola!"]);
}
