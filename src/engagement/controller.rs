use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::db::Database;
use crate::engagement::config::EngagementConfig;
use crate::engagement::dispatcher::{SuggestionCallback, SuggestionDispatcher};
use crate::engagement::evaluator::evaluate_tick;
use crate::engagement::state::{EvaluatorStatus, SessionState};
use crate::models::{BehaviorEvent, BehaviorEventType, VisitorSession};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

struct SessionHandle {
    state: Arc<Mutex<SessionState>>,
    cancel: CancellationToken,
    ticker: JoinHandle<()>,
}

/// Drives the per-session behavioral tick loop: one periodic evaluation
/// task per visitor session, cancelled with the session lifetime. A single
/// scheduled tick replaces ad hoc one-shot timers so a session is never
/// evaluated twice concurrently from competing schedules.
pub struct EngagementController {
    db: Database,
    config: EngagementConfig,
    dispatcher: SuggestionDispatcher,
    on_fired: Option<SuggestionCallback>,
    sessions: Arc<Mutex<HashMap<String, SessionHandle>>>,
}

impl EngagementController {
    pub fn new(db: Database, config: EngagementConfig) -> Self {
        Self {
            dispatcher: SuggestionDispatcher::new(db.clone()),
            db,
            config,
            on_fired: None,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Chat-surface hand-off invoked when a suggestion wins its dispatch.
    pub fn on_suggestion_fired(mut self, callback: SuggestionCallback) -> Self {
        self.on_fired = Some(callback);
        self
    }

    pub fn dispatcher(&self) -> &SuggestionDispatcher {
        &self.dispatcher
    }

    /// Start (or re-attach to) a visitor session and spawn its tick loop.
    /// Re-attaching replays the persisted event log, so a reloaded tab
    /// resumes with the counters it had, and a session whose suggestion was
    /// already consumed comes back in the terminal state.
    pub async fn begin_session(
        &self,
        session_id: &str,
        agent_id: &str,
        page_url: &str,
    ) -> Result<()> {
        let mut sessions = self.sessions.lock().await;
        if sessions.contains_key(session_id) {
            log_info!("session {session_id} already active; ignoring begin");
            return Ok(());
        }

        let state = match self.db.get_visitor_session(session_id).await? {
            Some(existing) => {
                let events = self.db.get_events_for_session(session_id).await?;
                let mut state = SessionState::replay(
                    existing.id,
                    existing.agent_id,
                    existing.first_page_url,
                    existing.created_at,
                    &events,
                );
                if self
                    .db
                    .get_suggestion_for_session(session_id)
                    .await?
                    .is_some()
                {
                    // Another tab already consumed this session.
                    state.status = EvaluatorStatus::Fired;
                }
                state
            }
            None => {
                let now = Utc::now();
                let session = VisitorSession::new(
                    session_id.to_string(),
                    agent_id.to_string(),
                    page_url.to_string(),
                    now,
                );
                self.db.insert_visitor_session(&session).await?;
                SessionState::new(
                    session.id,
                    session.agent_id,
                    session.first_page_url,
                    now,
                )
            }
        };

        let state = Arc::new(Mutex::new(state));
        let cancel = CancellationToken::new();
        let ticker = self.spawn_ticker(state.clone(), cancel.clone());

        sessions.insert(
            session_id.to_string(),
            SessionHandle {
                state,
                cancel,
                ticker,
            },
        );
        Ok(())
    }

    /// Persist one behavior event, fold it into the session state, and
    /// update the stored session aggregates.
    pub async fn record_event(&self, event: &BehaviorEvent) -> Result<()> {
        let state = {
            let sessions = self.sessions.lock().await;
            let handle = sessions
                .get(&event.session_id)
                .ok_or_else(|| anyhow!("no active session '{}'", event.session_id))?;
            handle.state.clone()
        };

        self.db.insert_behavior_event(event).await?;

        let snapshot = {
            let mut guard = state.lock().await;
            guard.apply_event(event);
            guard.clone()
        };

        self.db
            .update_session_activity(
                &snapshot.session_id,
                &snapshot.current_page_url,
                snapshot.total_page_views,
                snapshot.total_time_spent_secs,
                Utc::now(),
            )
            .await
    }

    /// Tear down a session on page unload. The final time-on-page
    /// measurement is flushed and one last evaluation runs synchronously
    /// before the tick loop is cancelled, since nothing asynchronous is
    /// guaranteed to complete after unload.
    pub async fn end_session(
        &self,
        session_id: &str,
        final_time_on_page_secs: Option<u64>,
    ) -> Result<()> {
        let handle = {
            let mut sessions = self.sessions.lock().await;
            sessions
                .remove(session_id)
                .ok_or_else(|| anyhow!("no active session '{session_id}'"))?
        };
        handle.cancel.cancel();

        if let Some(secs) = final_time_on_page_secs {
            let page_url = handle.state.lock().await.current_page_url.clone();
            let event = BehaviorEvent {
                id: None,
                session_id: session_id.to_string(),
                event_type: BehaviorEventType::TimeSpent,
                page_url,
                scroll_depth: None,
                element_selector: None,
                time_on_page_secs: Some(secs),
                created_at: Utc::now(),
            };
            self.db.insert_behavior_event(&event).await?;

            let snapshot = {
                let mut guard = handle.state.lock().await;
                guard.apply_event(&event);
                guard.clone()
            };
            self.db
                .update_session_activity(
                    &snapshot.session_id,
                    &snapshot.current_page_url,
                    snapshot.total_page_views,
                    snapshot.total_time_spent_secs,
                    Utc::now(),
                )
                .await?;
        }

        evaluate_and_dispatch(
            &self.db,
            &self.config,
            &self.dispatcher,
            self.on_fired.as_ref(),
            &handle.state,
        )
        .await?;

        handle.ticker.abort();
        log_info!("session {session_id} ended");
        Ok(())
    }

    fn spawn_ticker(
        &self,
        state: Arc<Mutex<SessionState>>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let db = self.db.clone();
        let config = self.config.clone();
        let dispatcher = self.dispatcher.clone();
        let on_fired = self.on_fired.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.tick_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match evaluate_and_dispatch(
                            &db,
                            &config,
                            &dispatcher,
                            on_fired.as_ref(),
                            &state,
                        )
                        .await
                        {
                            Ok(true) => break,
                            Ok(false) => {}
                            Err(err) => {
                                // One bad tick must not kill the loop; the
                                // next tick re-evaluates from scratch.
                                log_error!("trigger evaluation tick failed: {err:#}");
                            }
                        }
                    }
                    _ = cancel.cancelled() => {
                        log_info!("tick loop shutting down");
                        break;
                    }
                }
            }
        })
    }
}

/// One evaluation pass for a session. Returns true once the session is in
/// its terminal state and the loop can stop.
async fn evaluate_and_dispatch(
    db: &Database,
    config: &EngagementConfig,
    dispatcher: &SuggestionDispatcher,
    on_fired: Option<&SuggestionCallback>,
    state: &Arc<Mutex<SessionState>>,
) -> Result<bool> {
    let agent_id = {
        let guard = state.lock().await;
        if guard.has_fired() {
            return Ok(true);
        }
        guard.agent_id.clone()
    };

    let rows = db.list_enabled_trigger_rows(&agent_id).await?;
    let definitions: Vec<_> = rows
        .into_iter()
        .filter_map(|row| {
            let row_id = row.id.clone();
            match row.into_definition() {
                Ok(definition) => Some(definition),
                Err(err) => {
                    // One tenant's bad config must not break the rest.
                    log_warn!("skipping malformed trigger definition {row_id}: {err:#}");
                    None
                }
            }
        })
        .collect();

    let mut guard = state.lock().await;
    let Some(fired) = evaluate_tick(&mut guard, &definitions, config, Utc::now()) else {
        return Ok(false);
    };
    let session_id = guard.session_id.clone();
    let agent_id = guard.agent_id.clone();
    drop(guard);

    dispatcher
        .dispatch(&session_id, &agent_id, &fired, on_fired)
        .await?;
    Ok(true)
}
