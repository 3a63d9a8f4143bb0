use std::time::Duration;

use adventure_tale_model::{Role, TextPart, Turn};
use adventure_tale_test_model::{PresetEvent, PresetResponse, TestModelProvider};
use serde_json::json;

use crate::conversation::RawTurn;
use crate::{StoryError, StoryTellerBuilder};

const DRAGON_REPLY: &str = "Pip the dragon found an egg. [IMAGE: a dragon and an egg]\n\
                            CHOICE: Hatch it\n\
                            CHOICE: Hide it";

fn scripted_provider(replies: &[PresetResponse]) -> TestModelProvider {
    let mut model_provider = TestModelProvider::default();
    for reply in replies {
        model_provider.add_user_input_step();
        model_provider.add_assistant_response_step(reply.clone());
    }
    model_provider
}

fn raw_history(value: serde_json::Value) -> Vec<RawTurn> {
    serde_json::from_value(value).unwrap()
}

#[tokio::test]
async fn test_start_story() {
    let model_provider =
        scripted_provider(&[PresetResponse::with_text(DRAGON_REPLY)]);
    let teller =
        StoryTellerBuilder::with_model_provider(model_provider.clone()).build();

    let step = teller.start_story("dragons").await.unwrap();
    assert_eq!(step.segment.story_text, "Pip the dragon found an egg.");
    assert_eq!(step.segment.image_prompt, "a dragon and an egg");
    assert_eq!(step.segment.choices, ["Hatch it", "Hide it"]);

    let turns = step.history.turns();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role, Role::User);
    assert!(
        turns[0]
            .text()
            .ends_with("Start a new adventure story about: dragons")
    );
    // The model turn keeps the parts the provider reported.
    assert_eq!(turns[1].role, Role::Model);
    assert_eq!(turns[1].parts.len(), 3);
    assert_eq!(turns[1].text(), DRAGON_REPLY);

    let received = model_provider.received_requests();
    assert_eq!(received.len(), 1);
    assert!(received[0].history.is_empty());
}

#[tokio::test]
async fn test_start_story_provider_failure() {
    let model_provider = scripted_provider(&[
        PresetResponse::with_text("never told").with_failures(0)
    ]);
    let teller = StoryTellerBuilder::with_model_provider(model_provider).build();

    let step = teller.start_story("pirates").await.unwrap();
    assert_eq!(
        step.segment.story_text,
        "The storyteller seems to have wandered off! Let's try to find them."
    );
    assert_eq!(step.segment.choices, ["Try to continue?", "Start a new story?"]);

    let turns = step.history.turns();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role, Role::User);
    assert_eq!(turns[1].role, Role::Model);
    assert!(turns[1].text().contains("CHOICE: Try to continue?"));
    assert!(!turns[1].text().contains("Start a new story?"));
}

#[tokio::test]
async fn test_without_model() {
    let teller = StoryTellerBuilder::without_model().build();

    let step = teller.start_story("space").await.unwrap();
    assert_eq!(step.segment.image_prompt, "A locked storybook with a keyhole.");
    assert_eq!(step.segment.choices, ["Try again later"]);
    assert_eq!(step.history.len(), 2);

    let step = teller
        .continue_story(step.history.into_raw(), "Try again later")
        .await
        .unwrap();
    assert_eq!(step.segment.choices, ["Try again later"]);
    assert_eq!(step.history.len(), 4);
    assert_eq!(
        step.history.turns()[2],
        Turn::user("The child chose: \"Try again later\". Continue the story.")
    );
}

#[tokio::test]
async fn test_invalid_requests() {
    let teller = StoryTellerBuilder::without_model().build();

    for theme in ["", "   ", "\n\t"] {
        let err = teller.start_story(theme).await.unwrap_err();
        assert!(matches!(err, StoryError::InvalidRequest(_)));
    }

    let err = teller.continue_story(vec![], "Go left").await.unwrap_err();
    assert!(matches!(err, StoryError::InvalidRequest(_)));

    let history = raw_history(json!([
        { "role": "user", "parts": ["Start"] },
        { "role": "model", "parts": ["Once upon a time"] }
    ]));
    let err = teller.continue_story(history, "  ").await.unwrap_err();
    assert!(matches!(err, StoryError::InvalidRequest(_)));
    assert!(err.is_client_error());
}

#[tokio::test]
async fn test_continue_story() {
    let model_provider = scripted_provider(&[
        PresetResponse::with_text("unused"),
        PresetResponse::with_events([
            PresetEvent::MessageDelta("The egg cracked open. ".to_owned()),
            PresetEvent::MessageDelta("[IMAGE: a baby dragon]\n".to_owned()),
            PresetEvent::MessageDelta("CHOICE: Name it".to_owned()),
        ]),
    ]);
    let teller =
        StoryTellerBuilder::with_model_provider(model_provider.clone()).build();

    let history = raw_history(json!([
        { "role": "user", "parts": ["Start", 3, { "text": " about dragons" }] },
        { "role": "model", "parts": [{ "text": "Pip found an egg." }, ""] }
    ]));
    let step = teller.continue_story(history, " Hatch it ").await.unwrap();
    assert_eq!(step.segment.story_text, "The egg cracked open.");
    assert_eq!(step.segment.image_prompt, "a baby dragon");
    assert_eq!(step.segment.choices, ["Name it"]);
    assert_eq!(step.history.len(), 4);

    let received = model_provider.received_requests();
    assert_eq!(received.len(), 1);
    assert_eq!(
        received[0].history,
        [
            Turn {
                role: Role::User,
                parts: vec![
                    TextPart::new("Start"),
                    TextPart::new(" about dragons"),
                ],
            },
            Turn::model("Pip found an egg."),
        ]
    );
    assert_eq!(
        received[0].message,
        "The child chose: \"Hatch it\". Continue the story."
    );
    assert_eq!(&step.history.turns()[..2], received[0].history.as_slice());
}

#[tokio::test]
async fn test_empty_reply() {
    let model_provider = scripted_provider(&[PresetResponse::with_text("  ")]);
    let teller = StoryTellerBuilder::with_model_provider(model_provider).build();

    let step = teller.start_story("owls").await.unwrap();
    assert_eq!(step.segment.choices, ["Try to continue?", "Start a new story?"]);
    assert_eq!(step.history.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_timeout() {
    let mut model_provider =
        scripted_provider(&[PresetResponse::with_text(DRAGON_REPLY)]);
    model_provider.set_delay(Duration::from_secs(60));
    let teller = StoryTellerBuilder::with_model_provider(model_provider)
        .with_timeout(Duration::from_secs(10))
        .build();

    let step = teller.start_story("dragons").await.unwrap();
    assert_eq!(
        step.segment.image_prompt,
        "A 'missing storyteller' sign on a path in a forest."
    );
    assert_eq!(step.history.len(), 2);
}

#[tokio::test]
async fn test_story_round_trip() {
    let model_provider = scripted_provider(&[
        PresetResponse::with_text(DRAGON_REPLY),
        PresetResponse::with_text("It hatched!\nCHOICE: Celebrate"),
    ]);
    let teller = StoryTellerBuilder::with_model_provider(model_provider).build();

    let first = teller.start_story("dragons").await.unwrap();
    let wire = serde_json::to_string(&first.history).unwrap();
    let history: Vec<RawTurn> = serde_json::from_str(&wire).unwrap();

    let second = teller
        .continue_story(history, &first.segment.choices[0])
        .await
        .unwrap();
    assert_eq!(second.segment.story_text, "It hatched!");
    assert_eq!(second.segment.choices, ["Celebrate"]);
    assert_eq!(second.history.len(), 4);
    assert_eq!(&second.history.turns()[..2], first.history.turns());
}
