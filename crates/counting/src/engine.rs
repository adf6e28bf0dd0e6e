//! The turn-taking counting state machine.
//!
//! `transition` is a pure function from `(state, participant, text)` to an
//! outcome plus an optional replacement state; [`CountingEngine`] wraps it
//! with store access so every event sees the current durable state and every
//! mutation is persisted before the outcome is handed to the caller.

use std::sync::Arc;

use {
    tokio::sync::Mutex,
    tracing::{debug, info},
};

use crate::{
    Result,
    milestones::Milestones,
    parse,
    state::{ChannelKey, ChannelState},
    store::{CounterStore, StartOutcome, StopOutcome},
};

/// Why a submission failed. Either way the channel resets to zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The value was not `count + 1`. `expected` is computed before the
    /// reset so the reply can name the number that would have counted.
    WrongNumber { expected: u64 },
    /// Right value, but the same participant counted twice in a row.
    RepeatUser,
}

/// Structured result of processing one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Untracked channel or bot author: no reaction, no reply, no persist.
    Ignored,
    /// No numeric prefix. State untouched; marker reaction only.
    Unparseable,
    /// Submission failed; the channel has been reset (record kept).
    Failed {
        reason: FailureReason,
        state: ChannelState,
    },
    /// Submission accepted.
    Counted {
        state: ChannelState,
        new_record: bool,
        /// Reaction override when the new count is a milestone. Presentation
        /// only; precedence over the record/plain symbol.
        milestone: Option<String>,
    },
}

/// Announcement produced when the last counter deletes their own message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionNotice {
    pub user_id: String,
    /// The next expected value, unchanged by the deletion.
    pub next: u64,
}

/// Administrative slash commands that reach the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Count,
    Record,
    Start,
    Stop,
}

/// Structured reply to an administrative command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandReply {
    /// `count`/`record` on an untracked channel.
    NoData,
    Count {
        count: u64,
        last_user: Option<String>,
    },
    Record {
        record: u64,
    },
    Started,
    AlreadyTracked,
    Stopped,
    NotTracked,
}

/// Pure transition: outcome plus the state to persist (if any).
///
/// Checks run in the reference bot's order: parse, then sequence, then the
/// repeat-user rule. A repeat participant with a wrong number therefore gets
/// the wrong-number message; the reset is identical either way.
pub fn transition(
    state: &ChannelState,
    user_id: &str,
    text: &str,
    milestones: &Milestones,
) -> (MessageOutcome, Option<ChannelState>) {
    let Some(value) = parse::submitted_value(text) else {
        return (MessageOutcome::Unparseable, None);
    };

    let expected = state.count + 1;
    let mut next = state.clone();

    if value != expected {
        next.reset();
        return (
            MessageOutcome::Failed {
                reason: FailureReason::WrongNumber { expected },
                state: next.clone(),
            },
            Some(next),
        );
    }

    if state.last_user.as_deref() == Some(user_id) {
        next.reset();
        return (
            MessageOutcome::Failed {
                reason: FailureReason::RepeatUser,
                state: next.clone(),
            },
            Some(next),
        );
    }

    next.count += 1;
    next.last_user = Some(user_id.to_string());
    let new_record = next.count > next.record;
    if new_record {
        next.record = next.count;
    }
    let milestone = milestones.reaction_for(next.count).map(str::to_string);

    (
        MessageOutcome::Counted {
            state: next.clone(),
            new_record,
            milestone,
        },
        Some(next),
    )
}

/// Applies the counting rules to inbound events, backed by a [`CounterStore`].
///
/// The engine never caches channel state across events: each event re-fetches
/// from the store, and each mutation is persisted before the outcome is
/// returned. Events are processed one at a time in arrival order, so no two
/// transitions ever interleave.
pub struct CountingEngine {
    store: Arc<dyn CounterStore>,
    milestones: Milestones,
    /// Gateway events arrive on separate tasks; taking them one at a time
    /// keeps every transition reading the state the previous one wrote.
    events: Mutex<()>,
}

impl CountingEngine {
    pub fn new(store: Arc<dyn CounterStore>, milestones: Milestones) -> Self {
        Self {
            store,
            milestones,
            events: Mutex::new(()),
        }
    }

    /// Process one inbound chat message.
    pub async fn process_message(
        &self,
        key: &ChannelKey,
        user_id: &str,
        text: &str,
        is_bot: bool,
    ) -> Result<MessageOutcome> {
        if is_bot {
            return Ok(MessageOutcome::Ignored);
        }
        let _turn = self.events.lock().await;
        let Some(state) = self.store.get(key).await? else {
            return Ok(MessageOutcome::Ignored);
        };

        let (outcome, next) = transition(&state, user_id, text, &self.milestones);
        if let Some(next) = next {
            self.store.apply(key, Box::new(move |s| *s = next)).await?;
        }

        match &outcome {
            MessageOutcome::Counted {
                state, new_record, ..
            } => {
                debug!(channel = %key, count = state.count, new_record, user_id, "counted");
                if *new_record {
                    info!(channel = %key, record = state.record, "new channel record");
                }
            },
            MessageOutcome::Failed { reason, .. } => {
                debug!(channel = %key, ?reason, user_id, "count failed, channel reset");
            },
            _ => {},
        }
        Ok(outcome)
    }

    /// Handle deletion of a message by its author.
    ///
    /// Notification-only: when the participant who counted the current value
    /// deletes that message, the channel announces that the next number is
    /// unchanged. Never mutates state. Returns `None` for untracked channels,
    /// non-`last_user` deleters, or stale/non-numeric deletions.
    pub async fn process_deletion(
        &self,
        key: &ChannelKey,
        user_id: &str,
        text: &str,
    ) -> Result<Option<DeletionNotice>> {
        let _turn = self.events.lock().await;
        let Some(state) = self.store.get(key).await? else {
            return Ok(None);
        };
        if state.last_user.as_deref() != Some(user_id) {
            return Ok(None);
        }
        let Some(value) = parse::submitted_value(text) else {
            return Ok(None);
        };
        if value != state.count {
            return Ok(None);
        }
        debug!(channel = %key, count = state.count, user_id, "last count deleted");
        Ok(Some(DeletionNotice {
            user_id: user_id.to_string(),
            next: state.count + 1,
        }))
    }

    /// Handle an administrative command. Idempotent; already-tracked and
    /// not-tracked are reported as no-op replies, never errors.
    pub async fn handle_command(&self, key: &ChannelKey, command: Command) -> Result<CommandReply> {
        let _turn = self.events.lock().await;
        match command {
            Command::Count => Ok(match self.store.get(key).await? {
                None => CommandReply::NoData,
                Some(state) => CommandReply::Count {
                    count: state.count,
                    last_user: state.last_user,
                },
            }),
            Command::Record => Ok(match self.store.get(key).await? {
                None => CommandReply::NoData,
                Some(state) => CommandReply::Record {
                    record: state.record,
                },
            }),
            Command::Start => Ok(match self.store.start(key).await? {
                StartOutcome::Started => {
                    info!(channel = %key, "counting started");
                    CommandReply::Started
                },
                StartOutcome::AlreadyTracked => CommandReply::AlreadyTracked,
            }),
            Command::Stop => Ok(match self.store.stop(key).await? {
                StopOutcome::Stopped => {
                    info!(channel = %key, "counting stopped");
                    CommandReply::Stopped
                },
                StopOutcome::NotTracked => CommandReply::NotTracked,
            }),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{store::Mutation, store_memory::MemoryStore},
        async_trait::async_trait,
    };

    /// Wraps [`MemoryStore`] and hands control back to the scheduler after
    /// every read, standing in for the gateway's task-per-event dispatch: a
    /// second event gets a chance to run between one event's read and its
    /// write.
    struct YieldingStore(MemoryStore);

    #[async_trait]
    impl CounterStore for YieldingStore {
        async fn load(&self) -> Result<()> {
            self.0.load().await
        }

        async fn get(&self, key: &ChannelKey) -> Result<Option<ChannelState>> {
            let state = self.0.get(key).await;
            tokio::task::yield_now().await;
            state
        }

        async fn start(&self, key: &ChannelKey) -> Result<StartOutcome> {
            self.0.start(key).await
        }

        async fn stop(&self, key: &ChannelKey) -> Result<StopOutcome> {
            self.0.stop(key).await
        }

        async fn apply(&self, key: &ChannelKey, mutation: Mutation) -> Result<ChannelState> {
            self.0.apply(key, mutation).await
        }
    }

    fn engine() -> (Arc<MemoryStore>, CountingEngine) {
        let store = Arc::new(MemoryStore::new());
        let engine = CountingEngine::new(store.clone(), Milestones::default());
        (store, engine)
    }

    fn key() -> ChannelKey {
        ChannelKey::new("g1", "c1")
    }

    fn state(count: u64, record: u64, last_user: Option<&str>) -> ChannelState {
        ChannelState {
            count,
            record,
            last_user: last_user.map(String::from),
        }
    }

    async fn stored(store: &MemoryStore) -> ChannelState {
        store.get(&key()).await.unwrap().unwrap()
    }

    // Scenario: start an untracked channel, then count "1".
    #[tokio::test]
    async fn first_count_after_start_is_a_new_record() {
        let (store, engine) = engine();
        assert_eq!(
            engine.handle_command(&key(), Command::Start).await.unwrap(),
            CommandReply::Started
        );
        assert_eq!(stored(&store).await, state(0, 0, None));

        let outcome = engine
            .process_message(&key(), "u1", "1", false)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            MessageOutcome::Counted {
                state: state(1, 1, Some("u1")),
                new_record: true,
                milestone: None,
            }
        );
        assert_eq!(stored(&store).await, state(1, 1, Some("u1")));
    }

    // Scenario: repeat participant with the *correct* number.
    #[tokio::test]
    async fn repeat_user_fails_and_resets() {
        let (store, engine) = engine();
        store.seed(&key(), state(5, 10, Some("u1")));

        let outcome = engine
            .process_message(&key(), "u1", "6", false)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            MessageOutcome::Failed {
                reason: FailureReason::RepeatUser,
                state: state(0, 10, None),
            }
        );
        assert_eq!(stored(&store).await, state(0, 10, None));
    }

    // Scenario: wrong number from a fresh participant.
    #[tokio::test]
    async fn wrong_number_fails_with_expected_value() {
        let (store, engine) = engine();
        store.seed(&key(), state(5, 10, Some("u1")));

        let outcome = engine
            .process_message(&key(), "u2", "7", false)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            MessageOutcome::Failed {
                reason: FailureReason::WrongNumber { expected: 6 },
                state: state(0, 10, None),
            }
        );
        assert_eq!(stored(&store).await, state(0, 10, None));
    }

    // A digit run too large for u64 is still a submission, and a wrong one.
    #[tokio::test]
    async fn oversized_number_is_a_wrong_number() {
        let (store, engine) = engine();
        store.seed(&key(), state(5, 10, Some("u1")));

        let outcome = engine
            .process_message(&key(), "u2", "99999999999999999999999999", false)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            MessageOutcome::Failed {
                reason: FailureReason::WrongNumber { expected: 6 },
                state: state(0, 10, None),
            }
        );
        assert_eq!(stored(&store).await, state(0, 10, None));
    }

    // Two tasks submit the same number at once: exactly one counts, the
    // other hits the sequence check against the state the first one wrote.
    #[tokio::test]
    async fn simultaneous_submissions_take_turns() {
        let store = Arc::new(YieldingStore(MemoryStore::new()));
        store.0.seed(&key(), state(5, 10, Some("u0")));
        let engine = Arc::new(CountingEngine::new(store, Milestones::default()));

        let a = tokio::spawn({
            let engine = engine.clone();
            async move { engine.process_message(&key(), "u1", "6", false).await.unwrap() }
        });
        let b = tokio::spawn({
            let engine = engine.clone();
            async move { engine.process_message(&key(), "u2", "6", false).await.unwrap() }
        });
        let outcomes = [a.await.unwrap(), b.await.unwrap()];

        let accepted = outcomes
            .iter()
            .filter(|o| matches!(o, MessageOutcome::Counted { state, .. } if state.count == 6))
            .count();
        assert_eq!(accepted, 1);
        assert!(outcomes.iter().any(|o| matches!(
            o,
            MessageOutcome::Failed {
                reason: FailureReason::WrongNumber { expected: 7 },
                ..
            }
        )));
        // The loser's failure reset the channel; the record survives.
        assert_eq!(
            engine.handle_command(&key(), Command::Record).await.unwrap(),
            CommandReply::Record { record: 10 }
        );
        assert_eq!(
            engine.handle_command(&key(), Command::Count).await.unwrap(),
            CommandReply::Count {
                count: 0,
                last_user: None,
            }
        );
    }

    // When both rules are broken, the wrong-number message wins.
    #[tokio::test]
    async fn repeat_user_with_wrong_number_reports_wrong_number() {
        let (store, engine) = engine();
        store.seed(&key(), state(5, 10, Some("u1")));

        let outcome = engine
            .process_message(&key(), "u1", "9", false)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            MessageOutcome::Failed {
                reason: FailureReason::WrongNumber { expected: 6 },
                state: state(0, 10, None),
            }
        );
        assert_eq!(stored(&store).await, state(0, 10, None));
    }

    // Scenario: milestone count that is also a new record.
    #[tokio::test]
    async fn milestone_overrides_reaction_but_not_state() {
        let (store, engine) = engine();
        store.seed(&key(), state(99, 99, Some("u1")));

        let outcome = engine
            .process_message(&key(), "u2", "100", false)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            MessageOutcome::Counted {
                state: state(100, 100, Some("u2")),
                new_record: true,
                milestone: Some("💯".into()),
            }
        );
        assert_eq!(stored(&store).await, state(100, 100, Some("u2")));
    }

    #[tokio::test]
    async fn plain_success_below_record() {
        let (store, engine) = engine();
        store.seed(&key(), state(2, 50, Some("u1")));

        let outcome = engine
            .process_message(&key(), "u2", "3", false)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            MessageOutcome::Counted {
                state: state(3, 50, Some("u2")),
                new_record: false,
                milestone: None,
            }
        );
    }

    #[tokio::test]
    async fn non_numeric_message_leaves_state_alone() {
        let (store, engine) = engine();
        store.seed(&key(), state(5, 10, Some("u1")));

        let outcome = engine
            .process_message(&key(), "u2", "six!", false)
            .await
            .unwrap();
        assert_eq!(outcome, MessageOutcome::Unparseable);
        assert_eq!(stored(&store).await, state(5, 10, Some("u1")));
    }

    #[tokio::test]
    async fn untracked_channel_is_ignored() {
        let (_, engine) = engine();
        let outcome = engine
            .process_message(&key(), "u1", "1", false)
            .await
            .unwrap();
        assert_eq!(outcome, MessageOutcome::Ignored);
    }

    #[tokio::test]
    async fn bot_messages_are_ignored() {
        let (store, engine) = engine();
        store.seed(&key(), state(5, 10, Some("u1")));

        let outcome = engine
            .process_message(&key(), "bot", "6", true)
            .await
            .unwrap();
        assert_eq!(outcome, MessageOutcome::Ignored);
        assert_eq!(stored(&store).await, state(5, 10, Some("u1")));
    }

    // record >= count after a long mixed run; failures leave {0, record, None}.
    #[tokio::test]
    async fn record_dominates_count_across_runs() {
        let (store, engine) = engine();
        engine.handle_command(&key(), Command::Start).await.unwrap();

        for (user, text) in [
            ("u1", "1"),
            ("u2", "2"),
            ("u1", "3"),
            ("u2", "wrong"),
            ("u2", "9"), // wrong number, reset
            ("u1", "1"),
            ("u2", "2"),
        ] {
            engine
                .process_message(&key(), user, text, false)
                .await
                .unwrap();
            let s = stored(&store).await;
            assert!(s.record >= s.count);
            if s.count == 0 {
                assert_eq!(s.last_user, None);
            }
        }
        assert_eq!(stored(&store).await, state(2, 3, Some("u2")));
    }

    #[tokio::test]
    async fn start_twice_reports_already_tracked() {
        let (store, engine) = engine();
        engine.handle_command(&key(), Command::Start).await.unwrap();
        engine.process_message(&key(), "u1", "1", false).await.unwrap();

        assert_eq!(
            engine.handle_command(&key(), Command::Start).await.unwrap(),
            CommandReply::AlreadyTracked
        );
        assert_eq!(stored(&store).await, state(1, 1, Some("u1")));
    }

    // Scenario: stop on an untracked channel.
    #[tokio::test]
    async fn stop_untracked_reports_not_tracked() {
        let (_, engine) = engine();
        assert_eq!(
            engine.handle_command(&key(), Command::Stop).await.unwrap(),
            CommandReply::NotTracked
        );
    }

    #[tokio::test]
    async fn count_and_record_queries() {
        let (store, engine) = engine();
        assert_eq!(
            engine.handle_command(&key(), Command::Count).await.unwrap(),
            CommandReply::NoData
        );

        store.seed(&key(), state(4, 11, Some("u3")));
        assert_eq!(
            engine.handle_command(&key(), Command::Count).await.unwrap(),
            CommandReply::Count {
                count: 4,
                last_user: Some("u3".into()),
            }
        );
        assert_eq!(
            engine
                .handle_command(&key(), Command::Record)
                .await
                .unwrap(),
            CommandReply::Record { record: 11 },
        );
    }

    #[tokio::test]
    async fn deletion_by_last_user_announces_without_mutating() {
        let (store, engine) = engine();
        store.seed(&key(), state(7, 9, Some("u1")));

        let notice = engine.process_deletion(&key(), "u1", "7").await.unwrap();
        assert_eq!(
            notice,
            Some(DeletionNotice {
                user_id: "u1".into(),
                next: 8,
            })
        );
        assert_eq!(stored(&store).await, state(7, 9, Some("u1")));
    }

    #[tokio::test]
    async fn deletion_by_other_user_is_ignored() {
        let (store, engine) = engine();
        store.seed(&key(), state(7, 9, Some("u1")));
        assert_eq!(engine.process_deletion(&key(), "u2", "7").await.unwrap(), None);
    }

    #[tokio::test]
    async fn stale_or_non_numeric_deletions_are_ignored() {
        let (store, engine) = engine();
        store.seed(&key(), state(7, 9, Some("u1")));

        // Deleted an older count, not the current one.
        assert_eq!(engine.process_deletion(&key(), "u1", "5").await.unwrap(), None);
        assert_eq!(
            engine.process_deletion(&key(), "u1", "nope").await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn deletion_in_untracked_channel_is_ignored() {
        let (_, engine) = engine();
        assert_eq!(engine.process_deletion(&key(), "u1", "7").await.unwrap(), None);
    }
}
