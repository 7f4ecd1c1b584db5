//! Quiz synthesis against a scripted collaborator: the AI path when it
//! answers well, the local fallback when it does not.

use chrono::Utc;
use fynix_core::quiz::{QuizDirection, QuizError, QuizMode, QuizSynthesizer};
use fynix_core::state::{VocabEntry, VocabEntryId, VocabList, VocabListId};
use fynix_core::testing::MockCompleter;

fn sample_list() -> VocabList {
    let entries = [
        ("Hund", "dog"),
        ("Katze", "cat"),
        ("Baum", "tree"),
        ("Haus", "house"),
        ("Apfel", "apple"),
        ("Brot", "bread"),
    ]
    .into_iter()
    .map(|(term, translation)| VocabEntry {
        id: VocabEntryId::new(),
        term: term.to_string(),
        translation: translation.to_string(),
        created_at: Utc::now(),
    })
    .collect();

    VocabList {
        id: VocabListId::new(),
        name: "Unit 3".to_string(),
        source_lang: "Deutsch".to_string(),
        target_lang: "Englisch".to_string(),
        entries,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn ai_quiz_is_used_when_well_formed() {
    let completer = MockCompleter::new();
    completer.queue_text(
        r#"```json
        {"questions":[
            {"question":"Was heisst Hund?","answer":"dog","options":["dog","cat","tree","house"]},
            {"question":"Was heisst Katze?","answer":"cat","options":["dog","cat","tree","house"]},
            {"question":"Was heisst Baum?","answer":"tree","options":["dog","cat","tree","house"]}
        ]}
        ```"#
            .to_string(),
    );

    let synthesizer = QuizSynthesizer::new(&completer);
    let quiz = synthesizer
        .vocab_quiz(&sample_list(), QuizMode::MultipleChoice, QuizDirection::SourceToTarget)
        .await
        .unwrap();

    assert_eq!(quiz.len(), 3);
    assert_eq!(quiz[0].answer, "dog");
    assert_eq!(completer.remaining(), 0);
}

#[tokio::test]
async fn transport_failure_falls_back_to_local() {
    let completer = MockCompleter::failing();
    let synthesizer = QuizSynthesizer::new(&completer);
    let quiz = synthesizer
        .vocab_quiz(&sample_list(), QuizMode::MultipleChoice, QuizDirection::SourceToTarget)
        .await
        .unwrap();

    assert_eq!(quiz.len(), 5);
    for item in &quiz {
        let options = item.options.as_ref().unwrap();
        assert!(options.len() >= 2 && options.len() <= 4);
        assert!(options.contains(&item.answer));

        let mut unique = options.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), options.len());
    }
}

#[tokio::test]
async fn malformed_reply_falls_back_to_local() {
    let completer = MockCompleter::new();
    completer.queue_text("Sorry, I cannot produce JSON today.".to_string());

    let synthesizer = QuizSynthesizer::new(&completer);
    let quiz = synthesizer
        .vocab_quiz(&sample_list(), QuizMode::Input, QuizDirection::TargetToSource)
        .await
        .unwrap();

    assert_eq!(quiz.len(), 5);
    assert!(quiz.iter().all(|i| i.options.is_none()));
}

#[tokio::test]
async fn single_question_reply_falls_back_to_local() {
    let completer = MockCompleter::new();
    completer
        .queue_text(r#"{"questions":[{"question":"Was heisst Hund?","answer":"dog"}]}"#.to_string());

    let synthesizer = QuizSynthesizer::new(&completer);
    let quiz = synthesizer
        .vocab_quiz(&sample_list(), QuizMode::Input, QuizDirection::SourceToTarget)
        .await
        .unwrap();
    assert_eq!(quiz.len(), 5);
}

#[tokio::test]
async fn empty_list_has_no_fallback() {
    let mut list = sample_list();
    list.entries.clear();

    let completer = MockCompleter::failing();
    let synthesizer = QuizSynthesizer::new(&completer);
    let err = synthesizer
        .vocab_quiz(&list, QuizMode::MultipleChoice, QuizDirection::Mixed)
        .await
        .unwrap_err();
    assert!(matches!(err, QuizError::NoItems));
}

#[tokio::test]
async fn material_quiz_happy_path() {
    let completer = MockCompleter::new();
    completer.queue_text(
        r#"{"questions":[
            {"question":"Q1?","answer":"A","options":["A","B","C","D"]},
            {"question":"Q2?","answer":"B","options":["A","B","C","D"]}
        ]}"#
        .to_string(),
    );

    let synthesizer = QuizSynthesizer::new(&completer);
    let quiz = synthesizer
        .material_quiz("Photosynthese wandelt Licht in chemische Energie um.")
        .await
        .unwrap();
    assert_eq!(quiz.len(), 2);
}

#[tokio::test]
async fn material_quiz_has_no_local_fallback() {
    let failing = MockCompleter::failing();
    let synthesizer = QuizSynthesizer::new(&failing);
    let err = synthesizer.material_quiz("some notes").await.unwrap_err();
    assert!(matches!(err, QuizError::Ai(_)));

    let completer = MockCompleter::new();
    completer.queue_text("not json".to_string());
    let synthesizer = QuizSynthesizer::new(&completer);
    let err = synthesizer.material_quiz("some notes").await.unwrap_err();
    assert!(matches!(err, QuizError::MalformedResponse));
}
