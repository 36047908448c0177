use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use services::{
    Clock, NextOutcome, NoticeLevel, PlayerError, PlayerState, SessionError, StudySessionService,
};
use storage::repository::{
    InMemoryRepository, SessionReporter, Storage, StorageError, StudySetRepository,
};
use study_core::model::{
    Choice, ChoiceId, Flashcard, ItemId, Note, OrderSequence, QuizQuestion, SessionOutcome,
    SessionReport, StudyItem, StudySetId, WrittenAnswer,
};
use study_core::time::fixed_now;

const SET: u64 = 11;

fn cid(i: u64) -> ChoiceId {
    ChoiceId::new(i)
}

fn choices(n: u64) -> Vec<Choice> {
    (1..=n)
        .map(|i| Choice::new(cid(i), format!("choice {i}")).unwrap())
        .collect()
}

fn study_set() -> Vec<StudyItem> {
    vec![
        StudyItem::Note(Note::new(ItemId::new(1), "Chapter 1", "Greetings").unwrap()),
        StudyItem::Flashcard(Flashcard::new(ItemId::new(2), "bonjour", "hello").unwrap()),
        StudyItem::Quiz(QuizQuestion::new(ItemId::new(3), "merci?", choices(3), cid(2)).unwrap()),
        StudyItem::Written(
            WrittenAnswer::new(ItemId::new(4), "Translate 'oui'", ["yes"]).unwrap(),
        ),
        StudyItem::Order(OrderSequence::new(ItemId::new(5), "Days", choices(3)).unwrap()),
    ]
}

fn seeded_repo() -> InMemoryRepository {
    let repo = InMemoryRepository::new();
    repo.put_set(StudySetId::new(SET), study_set()).unwrap();
    repo
}

fn service(repo: &InMemoryRepository) -> StudySessionService {
    StudySessionService::from_storage(Clock::fixed(fixed_now()), &Storage::from_in_memory(repo.clone()))
        .with_seed(Some(7))
}

#[tokio::test]
async fn full_session_reports_results_once() {
    let repo = seeded_repo();
    repo.set_outcome(SessionOutcome {
        xp_awarded: Some(30),
        level: Some(4),
    })
    .unwrap();
    let svc = service(&repo).with_shuffle(false);

    let mut player = svc.start(StudySetId::new(SET)).await.unwrap();
    assert_eq!(player.state(), PlayerState::Presenting { index: 0 });

    // note: nothing to answer
    assert_eq!(svc.next(&mut player).await.unwrap(), NextOutcome::Presenting { index: 1 });

    player.flip().unwrap();
    assert!(player.assess(true).unwrap());
    svc.next(&mut player).await.unwrap();

    player.select_choice(cid(1)).unwrap();
    assert!(!player.check().unwrap());
    svc.next(&mut player).await.unwrap();

    player.set_text("  Yes ").unwrap();
    assert!(player.check().unwrap());
    svc.next(&mut player).await.unwrap();

    // unshuffled steps start in canonical order
    assert!(player.check().unwrap());

    let NextOutcome::Finished(report) = svc.next(&mut player).await.unwrap() else {
        panic!("expected the session to finish");
    };

    assert!(player.is_finished());
    assert_eq!(report.outcome.as_ref().and_then(|o| o.xp_awarded), Some(30));
    assert_eq!(report.summary.total_items(), 5);
    assert_eq!(report.summary.scored_items(), 4);
    assert_eq!(report.summary.answered(), 4);
    assert_eq!(report.summary.correct(), 3);
    assert_eq!(report.summary.accuracy_percent(), 75);
    assert_eq!(report.notices.len(), 1);
    assert_eq!(report.notices[0].level, NoticeLevel::Success);

    let sent = repo.reports().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].set_id, StudySetId::new(SET));
    assert_eq!(sent[0].session_id, player.session_id());
    assert_eq!(sent[0].results.get(ItemId::new(1)), None);
    assert_eq!(sent[0].results.get(ItemId::new(3)), Some(false));

    let err = svc.next(&mut player).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Player(PlayerError::InvalidState { .. })
    ));
    assert_eq!(repo.reports().unwrap().len(), 1);
}

#[tokio::test]
async fn failed_report_is_surfaced_as_notice_and_session_ends() {
    let repo = seeded_repo();
    repo.fail_reports(true);
    let svc = service(&repo);

    let mut player = svc.start(StudySetId::new(SET)).await.unwrap();
    let mut last = None;
    for _ in 0..study_set().len() {
        last = Some(svc.next(&mut player).await.unwrap());
    }

    let Some(NextOutcome::Finished(report)) = last else {
        panic!("expected the session to finish");
    };
    assert!(player.is_finished());
    assert!(report.outcome.is_none());
    assert_eq!(report.notices.len(), 1);
    assert_eq!(report.notices[0].level, NoticeLevel::Error);
    assert_eq!(report.summary.answered(), 0);
    assert!(repo.reports().unwrap().is_empty());
}

#[tokio::test]
async fn revisiting_keeps_and_overwrites_results() {
    let repo = seeded_repo();
    let svc = service(&repo);
    let mut player = svc.start(StudySetId::new(SET)).await.unwrap();

    svc.next(&mut player).await.unwrap();
    player.flip().unwrap();
    player.assess(false).unwrap();
    svc.next(&mut player).await.unwrap();

    assert_eq!(player.prev().unwrap(), 1);
    assert_eq!(player.recorded_result(), Some(false));
    assert_eq!(player.results().answered(), 1);

    player.flip().unwrap();
    player.assess(true).unwrap();
    assert_eq!(player.results().get(ItemId::new(2)), Some(true));
    assert_eq!(player.results().correct(), 1);
}

#[tokio::test]
async fn missing_set_is_a_storage_error() {
    let repo = InMemoryRepository::new();
    let err = service(&repo).start(StudySetId::new(404)).await.unwrap_err();
    assert!(matches!(err, SessionError::Storage(StorageError::NotFound)));
}

#[tokio::test]
async fn empty_set_cannot_start() {
    let repo = InMemoryRepository::new();
    repo.put_set(StudySetId::new(1), Vec::new()).unwrap();
    let err = service(&repo).start(StudySetId::new(1)).await.unwrap_err();
    assert!(matches!(err, SessionError::Player(PlayerError::Empty)));
}

#[tokio::test]
async fn set_with_repeated_item_id_cannot_start() {
    let repo = InMemoryRepository::new();
    repo.put_set(
        StudySetId::new(3),
        vec![
            StudyItem::Flashcard(Flashcard::new(ItemId::new(5), "uno", "one").unwrap()),
            StudyItem::Flashcard(Flashcard::new(ItemId::new(5), "dos", "two").unwrap()),
        ],
    )
    .unwrap();
    let err = service(&repo).start(StudySetId::new(3)).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Player(PlayerError::DuplicateItem(id)) if id == ItemId::new(5)
    ));
}

#[tokio::test]
async fn same_seed_gives_same_presentation() {
    let repo = InMemoryRepository::new();
    repo.put_set(
        StudySetId::new(2),
        vec![StudyItem::Order(
            OrderSequence::new(ItemId::new(1), "Sort", choices(8)).unwrap(),
        )],
    )
    .unwrap();

    let first = service(&repo).start(StudySetId::new(2)).await.unwrap();
    let second = service(&repo).start(StudySetId::new(2)).await.unwrap();
    assert_eq!(
        first.visit().unwrap().order(),
        second.visit().unwrap().order()
    );
    assert_ne!(first.session_id(), second.session_id());
}

/// Reporter that counts calls, to pin down the single aggregation call.
#[derive(Default)]
struct CountingReporter {
    calls: AtomicUsize,
}

#[async_trait]
impl SessionReporter for CountingReporter {
    async fn report_session(&self, _report: &SessionReport) -> Result<SessionOutcome, StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(SessionOutcome::default())
    }
}

#[tokio::test]
async fn navigating_back_and_forth_reports_once() {
    let repo = seeded_repo();
    let reporter = Arc::new(CountingReporter::default());
    let sets: Arc<dyn StudySetRepository> = Arc::new(repo);
    let svc = StudySessionService::new(Clock::fixed(fixed_now()), sets, reporter.clone());

    let mut player = svc.start(StudySetId::new(SET)).await.unwrap();
    svc.next(&mut player).await.unwrap();
    svc.next(&mut player).await.unwrap();
    player.prev().unwrap();
    player.prev().unwrap();
    while !player.is_finished() {
        svc.next(&mut player).await.unwrap();
    }

    assert_eq!(reporter.calls.load(Ordering::SeqCst), 1);
    let notices = player.take_notices();
    assert!(notices.is_empty(), "notices were handed out with the finish report");
}
