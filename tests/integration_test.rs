use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures::stream::BoxStream;
use icebreaker::api::CreateSessionResponse;
use icebreaker::client::{IcebreakerClient, IcebreakerProps};
use icebreaker::config::RetryConfig;
use icebreaker::error::{AdminError, EngineError, SyncError, SyncResult, VotingError};
use icebreaker::patch::Patch;
use icebreaker::store::DocumentStore;
use icebreaker::sync::{MemoryChannel, Snapshot, SyncChannel};
use icebreaker::types::{Guess, Phase, RosterEntry, Variant};
use icebreaker::variant::SubmissionInput;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

const SESSION: &str = "01HZX3TESTSESSION";

fn users(ids: &[&str]) -> Vec<RosterEntry> {
    ids.iter().map(|id| RosterEntry::new(*id)).collect()
}

fn pid(id: &str) -> String {
    id.to_string()
}

/// One client per participant, all on the same channel; the first id is
/// the creator
async fn mount_all<C: SyncChannel + 'static>(
    channel: Arc<C>,
    variant: Variant,
    ids: &[&str],
) -> Vec<Arc<IcebreakerClient<C>>> {
    let mut clients = Vec::new();
    for id in ids {
        let props = IcebreakerProps {
            session_id: SESSION.to_string(),
            current_user: id.to_string(),
            creator: ids[0].to_string(),
            users: users(ids),
            variant,
        };
        let client = Arc::new(IcebreakerClient::new(
            channel.clone(),
            props,
            RetryConfig::immediate(2),
        ));
        client.mount().await.expect("mount should succeed");
        clients.push(client);
    }
    clients
}

async fn refresh<C: SyncChannel>(clients: &[Arc<IcebreakerClient<C>>]) {
    for client in clients {
        client.load().await.expect("load should succeed");
    }
}

fn statements(lie_index: usize) -> SubmissionInput {
    SubmissionInput::Statements {
        texts: [
            "I was born on a boat".to_string(),
            "I speak four languages".to_string(),
            "I have never seen snow".to_string(),
        ],
        lie_index,
    }
}

fn drawing(description: &str) -> SubmissionInput {
    SubmissionInput::Drawing {
        image: "data:image/png;base64,iVBORw0KGgo=".to_string(),
        description: description.to_string(),
    }
}

fn song(link: &str) -> SubmissionInput {
    SubmissionInput::Music {
        link: link.to_string(),
    }
}

async fn score<C: SyncChannel>(client: &IcebreakerClient<C>, id: &str) -> u32 {
    client.document().await.players[id].score
}

/// Three participants, lies at 2, 1 and 0; B and C find A's lie, A misses
/// B's. Revealing A scores B and C once, even when revealed again.
#[tokio::test]
async fn test_statements_round_end_to_end() {
    let channel = Arc::new(MemoryChannel::default());
    let clients = mount_all(channel, Variant::Statements, &["a", "b", "c"]).await;
    let (a, b, c) = (&clients[0], &clients[1], &clients[2]);

    a.submit(statements(2)).await.unwrap();
    b.submit(statements(1)).await.unwrap();
    assert_eq!(a.phase().await, Phase::Waiting);
    assert_eq!(c.phase().await, Phase::Submitting);
    c.submit(statements(0)).await.unwrap();

    refresh(&clients).await;
    for client in &clients {
        assert_eq!(client.phase().await, Phase::Voting);
    }

    b.vote(&pid("a"), Guess::Statement(2)).await.unwrap();
    c.vote(&pid("a"), Guess::Statement(2)).await.unwrap();
    a.vote(&pid("b"), Guess::Statement(0)).await.unwrap();
    c.vote(&pid("b"), Guess::Statement(1)).await.unwrap();
    a.vote(&pid("c"), Guess::Statement(1)).await.unwrap();
    assert_eq!(a.phase().await, Phase::Voting);
    b.vote(&pid("c"), Guess::Statement(2)).await.unwrap();

    refresh(&clients).await;
    for client in &clients {
        assert_eq!(client.phase().await, Phase::Results);
    }

    // Only the creator walks the results
    assert_eq!(
        b.next().await,
        Err(EngineError::Admin(AdminError::NotCreator("navigate")))
    );

    a.next().await.unwrap();
    assert_eq!(a.document().await.active_participant, Some(pid("a")));
    a.reveal().await.unwrap();

    assert_eq!(score(a, "a").await, 0);
    assert_eq!(score(a, "b").await, 1);
    assert_eq!(score(a, "c").await, 1);

    // Revealing again does not score again
    a.reveal().await.unwrap();
    a.next().await.unwrap();
    a.prev().await.unwrap();
    assert!(a.document().await.revealed);
    a.reveal().await.unwrap();
    assert_eq!(score(a, "b").await, 1);
    assert_eq!(score(a, "c").await, 1);

    // Votes on a revealed slot are frozen
    assert_eq!(
        c.vote(&pid("a"), Guess::Statement(0)).await,
        Err(EngineError::Voting(VotingError::NotVotingPhase))
    );

    refresh(&clients).await;
    let (_, digest) = a.version().await;
    for client in &clients {
        assert_eq!(client.version().await.1, digest);
    }
}

#[tokio::test]
async fn test_concurrent_votes_are_all_kept() {
    let ids = ["a", "b", "c", "d"];
    let channel = Arc::new(MemoryChannel::default());
    let clients = mount_all(channel, Variant::Music, &ids).await;

    let links = [
        "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
        "https://youtu.be/9bZkp7q19f0",
        "https://youtube.com/shorts/kJQP7kiw5Fk",
        "https://m.youtube.com/watch?v=JGwWNGJdvx8&t=42",
    ];
    let submissions = clients
        .iter()
        .zip(links)
        .map(|(client, link)| client.submit(song(link)));
    for result in futures::future::join_all(submissions).await {
        result.unwrap();
    }

    refresh(&clients).await;
    let mut votes = Vec::new();
    for (voter, client) in ids.iter().zip(&clients) {
        for target in ids.iter().filter(|t| *t != voter) {
            let client = client.clone();
            let target = pid(target);
            votes.push(tokio::spawn(async move {
                client.vote(&target, Guess::Owner(target.clone())).await
            }));
        }
    }
    for handle in votes {
        handle.await.unwrap().unwrap();
    }

    refresh(&clients).await;
    let doc = clients[0].document().await;
    for id in ids {
        assert_eq!(doc.players[id].votes.len(), 3, "votes on {}", id);
    }
    assert_eq!(clients[3].phase().await, Phase::Results);
}

#[tokio::test]
async fn test_removed_participant_unblocks_voting() {
    let channel = Arc::new(MemoryChannel::default());
    let clients = mount_all(channel.clone(), Variant::Statements, &["a", "b", "c"]).await;
    let (a, b, c) = (&clients[0], &clients[1], &clients[2]);

    a.submit(statements(0)).await.unwrap();
    b.submit(statements(1)).await.unwrap();
    c.submit(statements(2)).await.unwrap();
    a.vote(&pid("b"), Guess::Statement(1)).await.unwrap();
    b.vote(&pid("a"), Guess::Statement(0)).await.unwrap();
    c.vote(&pid("a"), Guess::Statement(1)).await.unwrap();
    assert_eq!(a.phase().await, Phase::Voting);

    let kicked = vec![
        RosterEntry::new("a"),
        RosterEntry::new("b"),
        RosterEntry {
            removed: true,
            ..RosterEntry::new("c")
        },
    ];
    assert!(a.update_roster(kicked.clone()).await.unwrap());

    // Every client reconciles; only the first one writes anything
    let version = channel.snapshot(SESSION).await.unwrap().version;
    assert!(b.update_roster(kicked).await.unwrap());
    assert_eq!(channel.snapshot(SESSION).await.unwrap().version, version);

    let doc = a.document().await;
    assert!(!doc.players.contains_key("c"));
    assert!(!doc.players["a"].votes.contains_key("c"));
    assert_eq!(a.phase().await, Phase::Results);
    b.load().await.unwrap();
    assert_eq!(b.phase().await, Phase::Results);

    // c comes back with an empty slot and has to submit again
    let back = users(&["a", "b", "c"]);
    a.update_roster(back.clone()).await.unwrap();
    b.update_roster(back).await.unwrap();
    assert_eq!(a.document().await.players["c"].payload, None);
    assert_eq!(a.phase().await, Phase::Waiting);
}

#[tokio::test]
async fn test_single_participant_needs_forced_leaderboard() {
    let channel = Arc::new(MemoryChannel::default());
    let clients = mount_all(channel, Variant::Drawing, &["solo"]).await;
    let solo = &clients[0];

    solo.submit(drawing("a lighthouse")).await.unwrap();
    assert_eq!(solo.phase().await, Phase::Voting);
    assert!(matches!(
        solo.next().await,
        Err(EngineError::Admin(AdminError::WrongPhase {
            actual: Phase::Voting,
            ..
        }))
    ));
    assert!(matches!(
        solo.show_leaderboard().await,
        Err(EngineError::Admin(AdminError::WrongPhase { .. }))
    ));

    solo.force_leaderboard().await.unwrap();
    assert_eq!(solo.phase().await, Phase::Leaderboard);
    assert_eq!(
        solo.submit(drawing("a boat")).await,
        Err(EngineError::Submission(icebreaker::error::SubmissionError::GameFinished))
    );
}

#[tokio::test]
async fn test_drawing_verdict_can_be_overridden() {
    let channel = Arc::new(MemoryChannel::default());
    let clients = mount_all(channel, Variant::Drawing, &["a", "b"]).await;
    let (a, b) = (&clients[0], &clients[1]);

    a.submit(drawing("A cat on a skateboard")).await.unwrap();
    b.submit(drawing("sunset")).await.unwrap();
    b.vote(&pid("a"), Guess::Description("cat riding a board".to_string()))
        .await
        .unwrap();
    a.vote(&pid("b"), Guess::Description("  SUNSET ".to_string()))
        .await
        .unwrap();
    assert_eq!(a.phase().await, Phase::Results);

    a.next().await.unwrap();
    a.reveal().await.unwrap();
    let doc = a.document().await;
    assert_eq!(doc.players["a"].correct_guesses.get("b"), Some(&false));
    assert_eq!(score(a, "b").await, 0);

    // The creator accepts the close guess, then changes their mind
    a.toggle_correct_guess(&pid("a"), &pid("b")).await.unwrap();
    assert_eq!(score(a, "b").await, 1);
    a.toggle_correct_guess(&pid("a"), &pid("b")).await.unwrap();
    assert_eq!(score(a, "b").await, 0);

    // Nothing to judge for a guess that was never made
    assert_eq!(
        a.toggle_correct_guess(&pid("a"), &pid("a")).await,
        Err(EngineError::Admin(AdminError::NoGuess(pid("a"))))
    );
    assert_eq!(score(a, "a").await, 0);

    // b's slot has not been revealed yet
    assert_eq!(
        a.toggle_correct_guess(&pid("b"), &pid("a")).await,
        Err(EngineError::Admin(AdminError::NotRevealed(pid("b"))))
    );

    a.next().await.unwrap();
    a.reveal().await.unwrap();
    assert_eq!(score(a, "a").await, 1);
    assert_eq!(
        a.document().await.players["b"].correct_guesses.get("a"),
        Some(&true)
    );
}

#[tokio::test]
async fn test_music_walkthrough_to_retrospective() {
    let ids = ["host", "p1", "p2"];
    let channel = Arc::new(MemoryChannel::default());
    let clients = mount_all(channel, Variant::Music, &ids).await;

    let completions = Arc::new(AtomicUsize::new(0));
    let runners: Vec<_> = clients
        .iter()
        .map(|client| {
            let client = client.clone();
            let completions = completions.clone();
            tokio::spawn(async move {
                client
                    .run(move || {
                        completions.fetch_add(1, Ordering::SeqCst);
                    })
                    .await
            })
        })
        .collect();

    clients[0]
        .submit(song("https://www.youtube.com/watch?v=dQw4w9WgXcQ"))
        .await
        .unwrap();
    clients[1]
        .submit(song("https://youtu.be/9bZkp7q19f0?si=abc"))
        .await
        .unwrap();
    clients[2]
        .submit(song("https://www.youtube.com/embed/kJQP7kiw5Fk"))
        .await
        .unwrap();

    // host and p2 always guess p1; p1 guesses wrong both times
    for (voter, client) in ids.iter().zip(&clients) {
        for target in ids.iter().filter(|t| *t != voter) {
            let guess = match (*voter, *target) {
                ("p1", "host") => "p2",
                ("p1", _) => "host",
                _ => "p1",
            };
            client
                .vote(&pid(target), Guess::Owner(pid(guess)))
                .await
                .unwrap();
        }
    }

    refresh(&clients).await;
    let host = &clients[0];
    assert_eq!(host.phase().await, Phase::Results);
    for _ in &ids {
        host.next().await.unwrap();
        host.reveal().await.unwrap();
    }
    assert_eq!(host.document().await.active_participant, Some(pid("p2")));

    // Past the last revealed participant comes the leaderboard
    host.next().await.unwrap();
    refresh(&clients).await;
    for client in &clients {
        assert_eq!(client.phase().await, Phase::Leaderboard);
    }

    let standings = host.standings().await;
    let order: Vec<_> = standings
        .iter()
        .map(|s| (s.participant.as_str(), s.score))
        .collect();
    assert_eq!(order, vec![("host", 1), ("p2", 1), ("p1", 0)]);

    assert!(matches!(
        clients[1].start_retrospective().await,
        Err(EngineError::Admin(AdminError::NotCreator(_)))
    ));
    host.start_retrospective().await.unwrap();

    for runner in runners {
        runner.await.unwrap().unwrap();
    }
    assert_eq!(completions.load(Ordering::SeqCst), ids.len());
}

/// Rejects patches wider than `max_ops`, and any write once `budget`
/// successful writes have gone through, with a transport error
struct NarrowChannel {
    inner: MemoryChannel,
    max_ops: AtomicUsize,
    budget: AtomicUsize,
    rejected: AtomicUsize,
}

impl NarrowChannel {
    fn new(max_ops: usize) -> Self {
        Self {
            inner: MemoryChannel::default(),
            max_ops: AtomicUsize::new(max_ops),
            budget: AtomicUsize::new(usize::MAX),
            rejected: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SyncChannel for NarrowChannel {
    async fn subscribe(&self, document: &str) -> SyncResult<BoxStream<'static, Snapshot>> {
        self.inner.subscribe(document).await
    }

    async fn snapshot(&self, document: &str) -> SyncResult<Snapshot> {
        self.inner.snapshot(document).await
    }

    async fn write(&self, document: &str, patch: &Patch) -> SyncResult<u64> {
        if patch.len() > self.max_ops.load(Ordering::SeqCst) {
            self.rejected.fetch_add(1, Ordering::SeqCst);
            return Err(SyncError::Transport("payload too large".to_string()));
        }
        if self
            .budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_err()
        {
            self.rejected.fetch_add(1, Ordering::SeqCst);
            return Err(SyncError::Transport("connection dropped".to_string()));
        }
        self.inner.write(document, patch).await
    }

    fn name(&self) -> &str {
        "narrow"
    }
}

/// Two participants who both found the other's lie, cursor on `a`
async fn narrow_round(
    channel: Arc<NarrowChannel>,
) -> Vec<Arc<IcebreakerClient<NarrowChannel>>> {
    let clients = mount_all(channel, Variant::Statements, &["a", "b"]).await;
    let (a, b) = (&clients[0], &clients[1]);

    a.submit(statements(1)).await.unwrap();
    b.submit(statements(2)).await.unwrap();
    b.vote(&pid("a"), Guess::Statement(1)).await.unwrap();
    a.vote(&pid("b"), Guess::Statement(2)).await.unwrap();
    a.next().await.unwrap();
    clients
}

#[tokio::test]
async fn test_reveal_that_cannot_land_whole_lands_nothing() {
    let channel = Arc::new(NarrowChannel::new(2));
    let clients = narrow_round(channel.clone()).await;
    let (a, b) = (&clients[0], &clients[1]);

    // One score plus two latches is wider than the channel allows
    let result = a.reveal().await;
    assert_eq!(
        result,
        Err(EngineError::Sync(SyncError::Exhausted { attempts: 2 }))
    );
    assert!(result.unwrap_err().is_retryable());
    assert!(channel.rejected.load(Ordering::SeqCst) > 0);

    b.load().await.unwrap();
    let doc = b.document().await;
    assert_eq!(doc.players["b"].score, 0);
    assert!(!doc.players["a"].revealed);
    assert!(!doc.revealed);

    // Once the channel recovers, revealing again scores exactly once
    channel.max_ops.store(usize::MAX, Ordering::SeqCst);
    a.reveal().await.unwrap();
    a.reveal().await.unwrap();

    b.load().await.unwrap();
    let doc = b.document().await;
    assert_eq!(doc.players["b"].score, 1);
    assert_eq!(doc.players["a"].score, 0);
    assert!(doc.players["a"].revealed);
    assert!(doc.revealed);
}

#[tokio::test]
async fn test_submission_resent_after_partial_single_writes() {
    let channel = Arc::new(NarrowChannel::new(1));
    let clients = mount_all(channel.clone(), Variant::Statements, &["a", "b"]).await;
    let (a, b) = (&clients[0], &clients[1]);

    // The payload lands on its own, then the connection drops
    channel.budget.store(1, Ordering::SeqCst);
    let result = a.submit(statements(0)).await;
    assert_eq!(
        result,
        Err(EngineError::Sync(SyncError::Exhausted { attempts: 2 }))
    );
    assert!(result.unwrap_err().is_retryable());

    b.load().await.unwrap();
    let slot = b.document().await.players["a"].clone();
    assert!(slot.payload.is_some());
    assert_eq!(slot.submitted_at, None);

    channel.budget.store(usize::MAX, Ordering::SeqCst);
    a.submit(statements(0)).await.unwrap();

    b.submit(statements(2)).await.unwrap();
    let slot = b.document().await.players["a"].clone();
    assert!(slot.payload.is_some());
    assert!(slot.submitted_at.is_some());
    assert_eq!(b.phase().await, Phase::Voting);
}

#[tokio::test]
async fn test_relay_health() {
    let app = icebreaker::router(DocumentStore::default());
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn test_relay_session_lifecycle() {
    let store = DocumentStore::default();
    let app = icebreaker::router(store.clone());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/sessions")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"variant":"drawing"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let created: CreateSessionResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(created.snapshot.data["variant"], "drawing");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/sessions/{}", created.session_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let snapshot: Snapshot = serde_json::from_slice(&body).unwrap();
    assert_eq!(snapshot.digest, created.snapshot.digest);

    // A client on the same store joins the session and keeps its variant
    let props = IcebreakerProps {
        session_id: created.session_id.clone(),
        current_user: "a".to_string(),
        creator: "a".to_string(),
        users: users(&["a"]),
        variant: Variant::Music,
    };
    let client = IcebreakerClient::new(
        Arc::new(MemoryChannel::new(store)),
        props,
        RetryConfig::default(),
    );
    client.mount().await.unwrap();
    assert_eq!(client.document().await.variant, Variant::Drawing);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/sessions/does-not-exist")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
