//! Per-participant client runtime.
//!
//! Wraps the pure transitions in [`crate::engine`] with I/O: every operation
//! fetches the latest snapshot, computes a patch against it and commits the
//! patch through the [`SyncChannel`] with the shared retry policy. Rejected
//! operations never write.

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::RetryConfig;
use crate::engine::{self, phase, Standing};
use crate::error::{EngineError, SyncError};
use crate::patch::{DocPath, Patch};
use crate::roster::{resolve_roster, Roster};
use crate::sync::{commit_with_fallback, Snapshot, SyncChannel};
use crate::types::{GameDocument, Guess, ParticipantId, Phase, RosterEntry, SessionId, Variant};
use crate::variant::SubmissionInput;
use futures::StreamExt;

/// What the host application hands to a client when mounting the minigame
#[derive(Debug, Clone)]
pub struct IcebreakerProps {
    pub session_id: SessionId,
    pub current_user: ParticipantId,
    pub creator: ParticipantId,
    pub users: Vec<RosterEntry>,
    pub variant: Variant,
}

struct ClientState {
    roster: Roster,
    document: GameDocument,
    version: u64,
    digest: String,
}

pub struct IcebreakerClient<C: SyncChannel + ?Sized> {
    channel: Arc<C>,
    session_id: SessionId,
    current_user: ParticipantId,
    creator: ParticipantId,
    variant: Variant,
    retry: RetryConfig,
    state: RwLock<ClientState>,
}

impl<C: SyncChannel + ?Sized> IcebreakerClient<C> {
    pub fn new(channel: Arc<C>, props: IcebreakerProps, retry: RetryConfig) -> Self {
        let roster = resolve_roster(&props.users);
        Self {
            channel,
            session_id: props.session_id,
            current_user: props.current_user,
            creator: props.creator,
            variant: props.variant,
            retry,
            state: RwLock::new(ClientState {
                roster,
                document: GameDocument::new(props.variant),
                version: 0,
                digest: String::new(),
            }),
        }
    }

    /// Join the session: stamp the variant on a fresh document and make sure
    /// every roster member (this participant included) has a slot.
    pub async fn mount(&self) -> Result<(), EngineError> {
        let snapshot = self.load().await?;
        tracing::info!(
            "{} mounted session {} via {} at version {}",
            self.current_user,
            self.session_id,
            self.channel.name(),
            snapshot.version
        );

        let mut patch = Patch::new();
        if snapshot.data.get("variant").is_none() {
            let variant = serde_json::to_value(self.variant).map_err(decode_error)?;
            patch.set(DocPath::field("variant"), variant);
        }
        {
            let state = self.state.read().await;
            if state.document.variant != self.variant {
                tracing::warn!(
                    "Session {} is a {:?} game, ignoring requested {:?}",
                    self.session_id,
                    state.document.variant,
                    self.variant
                );
            }
            patch.extend(engine::reconcile(&state.document, &state.roster));
        }
        self.commit(&patch).await
    }

    /// Replace the roster. Returns whether it changed; a change reconciles
    /// the document against the new roster.
    pub async fn update_roster(&self, users: Vec<RosterEntry>) -> Result<bool, EngineError> {
        let roster = resolve_roster(&users);
        {
            let mut state = self.state.write().await;
            if state.roster == roster {
                return Ok(false);
            }
            tracing::info!(
                "Roster of {} changed: {} -> {} participants",
                self.session_id,
                state.roster.len(),
                roster.len()
            );
            state.roster = roster;
        }

        self.transact(|doc, roster| Ok::<_, EngineError>(engine::reconcile(doc, roster)))
            .await?;
        Ok(true)
    }

    pub async fn submit(&self, input: SubmissionInput) -> Result<(), EngineError> {
        let me = self.current_user.clone();
        self.transact(move |doc, _| engine::submit(doc, &me, input))
            .await
    }

    pub async fn vote(&self, target: &ParticipantId, guess: Guess) -> Result<(), EngineError> {
        let me = self.current_user.clone();
        self.transact(move |doc, roster| engine::vote(doc, roster, &me, target, guess))
            .await
    }

    pub async fn reveal(&self) -> Result<(), EngineError> {
        self.transact(|doc, roster| engine::reveal(doc, roster, &self.current_user, &self.creator))
            .await
    }

    pub async fn toggle_correct_guess(
        &self,
        target: &ParticipantId,
        voter: &ParticipantId,
    ) -> Result<(), EngineError> {
        self.transact(|doc, _| {
            engine::toggle_correct_guess(doc, &self.current_user, &self.creator, target, voter)
        })
        .await
    }

    pub async fn next(&self) -> Result<(), EngineError> {
        self.transact(|doc, roster| engine::next(doc, roster, &self.current_user, &self.creator))
            .await
    }

    pub async fn prev(&self) -> Result<(), EngineError> {
        self.transact(|doc, roster| engine::prev(doc, roster, &self.current_user, &self.creator))
            .await
    }

    pub async fn select(&self, target: &ParticipantId) -> Result<(), EngineError> {
        self.transact(|doc, roster| {
            engine::select(doc, roster, &self.current_user, &self.creator, target)
        })
        .await
    }

    pub async fn show_leaderboard(&self) -> Result<(), EngineError> {
        self.transact(|doc, roster| {
            engine::show_leaderboard(doc, roster, &self.current_user, &self.creator)
        })
        .await
    }

    pub async fn force_leaderboard(&self) -> Result<(), EngineError> {
        self.transact(|doc, _| engine::force_leaderboard(doc, &self.current_user, &self.creator))
            .await
    }

    pub async fn start_retrospective(&self) -> Result<(), EngineError> {
        self.transact(|doc, roster| {
            engine::start_retrospective(doc, roster, &self.current_user, &self.creator)
        })
        .await
    }

    /// Follow the document until the retrospective starts, then call
    /// `on_complete` exactly once and return. Fails if the subscription ends
    /// first.
    pub async fn run<F>(&self, on_complete: F) -> Result<(), EngineError>
    where
        F: FnOnce() + Send,
    {
        let mut updates = self.channel.subscribe(&self.session_id).await?;
        while let Some(snapshot) = updates.next().await {
            self.observe(&snapshot).await?;
            if self.state.read().await.document.retrospective_started {
                tracing::info!(
                    "{} observed the retrospective, leaving the minigame",
                    self.current_user
                );
                on_complete();
                return Ok(());
            }
        }
        Err(SyncError::Closed.into())
    }

    /// Fetch the latest snapshot into the local cache
    pub async fn load(&self) -> Result<Snapshot, EngineError> {
        let snapshot = self.channel.snapshot(&self.session_id).await?;
        self.observe(&snapshot).await?;
        Ok(snapshot)
    }

    pub async fn phase(&self) -> Phase {
        let state = self.state.read().await;
        phase::derive_phase(&state.roster, &state.document, &self.current_user)
    }

    /// Targets this participant still has to vote on
    pub async fn pending_votes(&self) -> Vec<ParticipantId> {
        let state = self.state.read().await;
        phase::pending_votes(&state.roster, &state.document, &self.current_user)
    }

    pub async fn standings(&self) -> Vec<Standing> {
        let state = self.state.read().await;
        engine::standings(&state.document, &state.roster)
    }

    pub async fn document(&self) -> GameDocument {
        self.state.read().await.document.clone()
    }

    pub async fn roster(&self) -> Roster {
        self.state.read().await.roster.clone()
    }

    /// Version and digest of the cached snapshot
    pub async fn version(&self) -> (u64, String) {
        let state = self.state.read().await;
        (state.version, state.digest.clone())
    }

    pub fn current_user(&self) -> &ParticipantId {
        &self.current_user
    }

    pub fn is_creator(&self) -> bool {
        self.current_user == self.creator
    }

    /// Cache `snapshot` unless a newer one is already cached
    async fn observe(&self, snapshot: &Snapshot) -> Result<(), EngineError> {
        let document =
            GameDocument::from_value(&snapshot.data, self.variant).map_err(decode_error)?;

        let mut state = self.state.write().await;
        if snapshot.version < state.version {
            return Ok(());
        }
        tracing::debug!(
            "{} observed version {} of {}",
            self.current_user,
            snapshot.version,
            self.session_id
        );
        state.document = document;
        state.version = snapshot.version;
        state.digest = snapshot.digest.clone();
        Ok(())
    }

    /// Compute a patch from the latest snapshot and commit it. The lock is
    /// released before any write.
    async fn transact<F, E>(&self, build: F) -> Result<(), EngineError>
    where
        F: FnOnce(&GameDocument, &Roster) -> Result<Patch, E>,
        E: Into<EngineError>,
    {
        self.load().await?;
        let patch = {
            let state = self.state.read().await;
            build(&state.document, &state.roster).map_err(Into::<EngineError>::into)?
        };
        self.commit(&patch).await
    }

    async fn commit(&self, patch: &Patch) -> Result<(), EngineError> {
        if patch.is_empty() {
            return Ok(());
        }
        commit_with_fallback(self.channel.as_ref(), &self.session_id, patch, &self.retry).await?;
        self.load().await?;
        Ok(())
    }
}

fn decode_error(e: serde_json::Error) -> EngineError {
    SyncError::Decode(e.to_string()).into()
}
