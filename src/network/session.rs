//! Session Store
//!
//! Authoritative table of every match, plus accounts, the matchmaking queue
//! and rankings. One instance is built at startup and shared by handle.
//!
//! Lock order, always: queue → session map → one session → rankings.
//! Every mutation of a session happens under that session's mutex, including
//! the idle sweep and server AI moves.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, instrument, warn};

use crate::ai::{spawn_decision, DecisionHandle, Difficulty};
use crate::core::clock::Clock;
use crate::core::rng::DeterministicRng;
use crate::game::events::GameEvent;
use crate::game::state::{FirstPlayer, MatchState, MatchStatus, TurnPhase};
use crate::network::auth::{AccountStore, RegisterOutcome};
use crate::network::broadcast::{Broadcaster, Subscription};
use crate::network::error::CommandError;
use crate::network::matchmaking::{MatchmakingQueue, QueueEntry};
use crate::network::persist::{Snapshot, SNAPSHOT_VERSION};
use crate::network::protocol::{
    parse_difficulty, parse_first, validate_account, validate_cell, validate_credentials,
    validate_group, validate_size, Command, Reply, StateUpdate, AI_NICK_PREFIX,
};
use crate::network::ranking::{RankingRow, RankingTable};

// =============================================================================
// CONFIG
// =============================================================================

/// Store tunables.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// A playing session untouched this long is forfeited by the turn holder.
    pub idle_timeout: Duration,
    /// Waiting queue entries older than this are discarded on the next join.
    pub queue_ttl: Duration,
    /// Finished sessions are dropped this long after they end.
    pub finished_retention: Duration,
    /// Pause before a server AI acts.
    pub ai_delay: Duration,
    /// Rows returned by `ranking`.
    pub ranking_limit: usize,
    /// Per-viewer delta queue length.
    pub subscriber_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(120),
            queue_ttl: Duration::from_secs(120),
            finished_retention: Duration::from_secs(3600),
            ai_delay: Duration::from_millis(600),
            ranking_limit: 10,
            subscriber_capacity: 64,
        }
    }
}

fn to_chrono(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or_else(|_| chrono::Duration::days(3650))
}

// =============================================================================
// MATCH SESSION
// =============================================================================

/// Server AI occupying one seat of a practice session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiSeat {
    pub nick: String,
    pub difficulty: Difficulty,
}

/// A match plus its server-side bookkeeping.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatchSession {
    pub state: MatchState,
    /// Set for practice sessions.
    pub ai: Option<AiSeat>,
    /// When the match reached `Finished`.
    pub finished_at: Option<DateTime<Utc>>,
    /// Cancel flag of an in-flight AI search.
    #[serde(skip)]
    ai_cancel: Option<Arc<AtomicBool>>,
    /// An AI driver task is attached to this session.
    #[serde(skip)]
    ai_driving: bool,
}

impl MatchSession {
    /// Session around `state`.
    pub fn new(state: MatchState, ai: Option<AiSeat>) -> Self {
        Self { state, ai, finished_at: None, ai_cancel: None, ai_driving: false }
    }

    /// Session id.
    pub fn id(&self) -> &str {
        &self.state.id
    }

    /// Whether the server AI holds the turn of a live match.
    pub fn is_ai_turn(&self) -> bool {
        match &self.ai {
            Some(seat) => {
                self.state.status == MatchStatus::Playing
                    && self.state.turn.as_deref() == Some(seat.nick.as_str())
            }
            None => false,
        }
    }
}

/// Outcome of one idle sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Sessions forfeited for inactivity.
    pub forfeited: Vec<String>,
    /// Finished sessions dropped from the table.
    pub expired: Vec<String>,
}

enum AiStep {
    Done,
    Acted,
    Think(DecisionHandle, u64),
}

// =============================================================================
// SESSION STORE
// =============================================================================

/// Shared handle type.
pub type SessionHandle = Arc<Mutex<MatchSession>>;

/// Owner of all mutable server state.
pub struct SessionStore {
    config: StoreConfig,
    clock: Arc<dyn Clock>,
    accounts: RwLock<AccountStore>,
    queue: Mutex<MatchmakingQueue>,
    sessions: RwLock<BTreeMap<String, SessionHandle>>,
    rankings: RwLock<RankingTable>,
    broadcaster: Broadcaster,
    rng: Mutex<DeterministicRng>,
}

impl SessionStore {
    /// Empty store.
    pub fn new(config: StoreConfig, clock: Arc<dyn Clock>) -> Arc<Self> {
        Self::with_rng(config, clock, entropy_rng())
    }

    /// Empty store with a fixed seed for session dice.
    pub fn with_rng(config: StoreConfig, clock: Arc<dyn Clock>, rng: DeterministicRng) -> Arc<Self> {
        let queue = MatchmakingQueue::new(to_chrono(config.queue_ttl));
        let broadcaster = Broadcaster::new(config.subscriber_capacity);
        Arc::new(Self {
            config,
            clock,
            accounts: RwLock::new(AccountStore::new()),
            queue: Mutex::new(queue),
            sessions: RwLock::new(BTreeMap::new()),
            rankings: RwLock::new(RankingTable::new()),
            broadcaster,
            rng: Mutex::new(rng),
        })
    }

    /// Store rebuilt from a snapshot. Call [`SessionStore::resume_ai`] once
    /// inside the runtime to restart AI seats.
    pub fn restore(config: StoreConfig, clock: Arc<dyn Clock>, snapshot: Snapshot) -> Arc<Self> {
        let queue = MatchmakingQueue::with_entries(to_chrono(config.queue_ttl), snapshot.queue);
        let sessions = snapshot
            .sessions
            .into_iter()
            .map(|s| (s.state.id.clone(), Arc::new(Mutex::new(s))))
            .collect();
        let broadcaster = Broadcaster::new(config.subscriber_capacity);

        Arc::new(Self {
            config,
            clock,
            accounts: RwLock::new(AccountStore::from_digests(snapshot.accounts)),
            queue: Mutex::new(queue),
            sessions: RwLock::new(sessions),
            rankings: RwLock::new(RankingTable::from_buckets(snapshot.rankings)),
            broadcaster,
            rng: Mutex::new(entropy_rng()),
        })
    }

    /// Store tunables.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Delta fan-out.
    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // =========================================================================
    // COMMAND TABLE
    // =========================================================================

    /// Run one command from the shared table.
    pub async fn execute(self: &Arc<Self>, command: Command) -> Result<Reply, CommandError> {
        let name = command.name();
        let result = match command {
            Command::Register(r) => self.register(&r.nick, &r.password).await.map(|_| Reply::Ack {}),
            Command::Join(r) => {
                let group = validate_group(r.group)?;
                let size = validate_size(r.size)?;
                let first = parse_first(r.first.as_deref())?;
                self.join(group, size, first, &r.nick, &r.password)
                    .await
                    .map(|game| Reply::Game { game })
            }
            Command::Practice(r) => {
                let size = validate_size(r.size)?;
                let difficulty = parse_difficulty(&r.difficulty)?;
                let first = parse_first(r.first.as_deref())?;
                self.practice(&r.nick, &r.password, size, difficulty, first)
                    .await
                    .map(|game| Reply::Game { game })
            }
            Command::Roll(r) => self.roll(&r.nick, &r.password, &r.game).await,
            Command::Notify(r) => {
                let cell = validate_cell(r.cell)?;
                self.notify(&r.nick, &r.password, &r.game, cell).await.map(|_| Reply::Ack {})
            }
            Command::Pass(r) => self.pass(&r.nick, &r.password, &r.game).await.map(|_| Reply::Ack {}),
            Command::Leave(r) => self.leave(&r.nick, &r.password, &r.game).await.map(|_| Reply::Ack {}),
            Command::Ranking(r) => {
                let group = validate_group(r.group)?;
                let size = validate_size(r.size)?;
                Ok(Reply::Ranking { ranking: self.ranking(group, size).await })
            }
        };

        if let Err(e) = &result {
            debug!(command = name, kind = ?e.kind(), error = %e, "command rejected");
        }
        result
    }

    // =========================================================================
    // ACCOUNTS
    // =========================================================================

    /// Create an account or check its password.
    pub async fn register(&self, nick: &str, password: &str) -> Result<RegisterOutcome, CommandError> {
        validate_account(nick, password)?;
        let outcome = self.accounts.write().await.register(nick, password)?;
        if outcome == RegisterOutcome::Created {
            info!(nick, "account created");
        }
        Ok(outcome)
    }

    async fn authenticate(&self, nick: &str, password: &str) -> Result<(), CommandError> {
        validate_credentials(nick, password)?;
        self.accounts.read().await.verify(nick, password)?;
        Ok(())
    }

    // =========================================================================
    // MATCHMAKING
    // =========================================================================

    /// Pair with a compatible waiting session or open a new one.
    #[instrument(skip(self, password))]
    pub async fn join(
        self: &Arc<Self>,
        group: u32,
        size: usize,
        first: FirstPlayer,
        nick: &str,
        password: &str,
    ) -> Result<String, CommandError> {
        self.authenticate(nick, password).await?;
        let now = self.now();

        if let Some(id) = self.active_session_of(nick).await {
            debug!(game = %id, "rejoining active game");
            return Ok(id);
        }

        let mut queue = self.queue.lock().await;

        let stale = queue.purge_stale(now);
        if !stale.is_empty() {
            info!(count = stale.len(), "purging stale queue entries");
        }
        let abandoned = queue.cancel_for(nick);
        for entry in stale.iter().chain(abandoned.iter()) {
            self.discard_waiting(&entry.session_id, now).await;
        }

        while let Some(entry) = queue.take_compatible(group, size, first, nick) {
            let Some(handle) = self.sessions.read().await.get(&entry.session_id).cloned() else {
                warn!(game = %entry.session_id, "queue entry without session");
                continue;
            };
            let mut session = handle.lock().await;
            match session.state.attach_opponent(nick, now) {
                Ok(event) => {
                    info!(game = %entry.session_id, creator = %entry.nick, joiner = nick, "game paired");
                    self.commit(&mut session, vec![event]).await;
                    return Ok(entry.session_id);
                }
                Err(e) => warn!(game = %entry.session_id, error = %e, "could not attach to waiting game"),
            }
        }

        let id = new_session_id();
        let rng = self.rng.lock().await.fork();
        let state = MatchState::new(id.clone(), group, size, nick, first, now, rng)?;
        self.sessions
            .write()
            .await
            .insert(id.clone(), Arc::new(Mutex::new(MatchSession::new(state, None))));
        queue.enqueue(QueueEntry {
            nick: nick.to_string(),
            group,
            size,
            first_preference: first,
            session_id: id.clone(),
            enqueued_at: now,
        });

        info!(game = %id, "game created, waiting for opponent");
        Ok(id)
    }

    /// Start a match against a server AI. Results stay out of the ranking.
    #[instrument(skip(self, password))]
    pub async fn practice(
        self: &Arc<Self>,
        nick: &str,
        password: &str,
        size: usize,
        difficulty: Difficulty,
        first: FirstPlayer,
    ) -> Result<String, CommandError> {
        self.authenticate(nick, password).await?;
        let now = self.now();

        let id = new_session_id();
        let rng = self.rng.lock().await.fork();
        let mut state = MatchState::new(id.clone(), 0, size, nick, first, now, rng)?;
        let ai_nick = format!("{}{}", AI_NICK_PREFIX, difficulty);
        let started = state.attach_opponent(ai_nick.clone(), now)?;

        let handle = Arc::new(Mutex::new(MatchSession::new(
            state,
            Some(AiSeat { nick: ai_nick, difficulty }),
        )));
        self.sessions.write().await.insert(id.clone(), Arc::clone(&handle));

        let mut session = handle.lock().await;
        self.commit(&mut session, vec![started]).await;

        info!(game = %id, %difficulty, "practice game started");
        Ok(id)
    }

    /// Live (playing, human-only) session `nick` takes part in.
    async fn active_session_of(&self, nick: &str) -> Option<String> {
        let sessions = self.sessions.read().await;
        for (id, handle) in sessions.iter() {
            let session = handle.lock().await;
            if session.ai.is_none()
                && session.state.status == MatchStatus::Playing
                && session.state.is_participant(nick)
            {
                return Some(id.clone());
            }
        }
        None
    }

    /// Cancel and drop a waiting session whose queue entry is gone.
    async fn discard_waiting(self: &Arc<Self>, id: &str, now: DateTime<Utc>) {
        let mut sessions = self.sessions.write().await;
        let Some(handle) = sessions.get(id).cloned() else {
            return;
        };
        let mut session = handle.lock().await;
        if session.state.status != MatchStatus::Waiting {
            return;
        }
        sessions.remove(id);
        drop(sessions);
        let creator = session.state.players.keys().next().cloned().unwrap_or_default();
        match session.state.leave(&creator, now) {
            Ok(event) => {
                debug!(game = id, "discarded waiting game");
                self.commit(&mut session, vec![event]).await;
            }
            Err(e) => warn!(game = id, error = %e, "could not cancel waiting game"),
        }
    }

    // =========================================================================
    // TURN COMMANDS
    // =========================================================================

    async fn session(&self, id: &str) -> Result<SessionHandle, CommandError> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| CommandError::unknown_game(id))
    }

    /// Throw the sticks.
    pub async fn roll(self: &Arc<Self>, nick: &str, password: &str, game: &str) -> Result<Reply, CommandError> {
        self.authenticate(nick, password).await?;
        let handle = self.session(game).await?;
        let mut session = handle.lock().await;

        let event = session.state.roll(nick, self.now())?;
        let size = session.state.size();
        let reply = match &event {
            GameEvent::Rolled { dice, movable, must_pass, .. } => Reply::Roll {
                dice: *dice,
                movable: movable.iter().map(|c| c.index(size)).collect(),
                must_pass: must_pass.clone(),
            },
            _ => Reply::Ack {},
        };

        self.commit(&mut session, vec![event]).await;
        Ok(reply)
    }

    /// Select, deselect or move via a cell click.
    pub async fn notify(
        self: &Arc<Self>,
        nick: &str,
        password: &str,
        game: &str,
        cell: usize,
    ) -> Result<(), CommandError> {
        self.authenticate(nick, password).await?;
        let handle = self.session(game).await?;
        let mut session = handle.lock().await;

        let events = session.state.notify(nick, cell, self.now())?;
        self.commit(&mut session, events).await;
        Ok(())
    }

    /// Forced hand-off.
    pub async fn pass(self: &Arc<Self>, nick: &str, password: &str, game: &str) -> Result<(), CommandError> {
        self.authenticate(nick, password).await?;
        let handle = self.session(game).await?;
        let mut session = handle.lock().await;

        let event = session.state.pass(nick, self.now())?;
        self.commit(&mut session, vec![event]).await;
        Ok(())
    }

    /// Forfeit an active match or cancel a waiting one.
    pub async fn leave(self: &Arc<Self>, nick: &str, password: &str, game: &str) -> Result<(), CommandError> {
        self.authenticate(nick, password).await?;
        let handle = self.session(game).await?;

        let mut queue = self.queue.lock().await;
        let mut session = handle.lock().await;
        let event = session.state.leave(nick, self.now())?;
        queue.remove_session(game);
        drop(queue);

        info!(game, nick, "player left");
        self.commit(&mut session, vec![event]).await;
        Ok(())
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Top rows of a (group, size) bracket.
    pub async fn ranking(&self, group: u32, size: usize) -> Vec<RankingRow> {
        self.rankings.read().await.top(group, size, self.config.ranking_limit)
    }

    /// Stream of deltas for one viewer. A game in progress is pushed
    /// immediately; a finished game yields its final state and ends.
    pub async fn subscribe(&self, nick: &str, game: &str) -> Result<Subscription, CommandError> {
        if nick.trim().is_empty() {
            return Err(CommandError::validation("nick is empty"));
        }
        let handle = self.session(game).await?;
        let session = handle.lock().await;

        let rx = match session.state.status {
            MatchStatus::Waiting => self.broadcaster.subscribe(game, nick, None).await,
            MatchStatus::Playing => {
                let initial = encode_update(&session.state, None);
                self.broadcaster.subscribe(game, nick, initial).await
            }
            MatchStatus::Finished => {
                let payload = encode_update(&session.state, None)
                    .ok_or_else(|| CommandError::Transport("could not encode game state".into()))?;
                self.broadcaster.detached(payload)
            }
        };
        debug!(game, nick, "viewer subscribed");
        Ok(rx)
    }

    /// Copy of a session's match state.
    pub async fn session_state(&self, game: &str) -> Option<MatchState> {
        let handle = self.session(game).await.ok()?;
        let session = handle.lock().await;
        Some(session.state.clone())
    }

    /// Number of sessions in the table.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Number of waiting queue entries.
    pub async fn queue_len(&self) -> usize {
        self.queue.lock().await.len()
    }

    // =========================================================================
    // BACKGROUND
    // =========================================================================

    /// Forfeit idle playing sessions and drop long-finished ones.
    pub async fn sweep(self: &Arc<Self>) -> SweepReport {
        let now = self.now();
        let idle = to_chrono(self.config.idle_timeout);
        let retention = to_chrono(self.config.finished_retention);
        let mut report = SweepReport::default();

        let handles: Vec<(String, SessionHandle)> = self
            .sessions
            .read()
            .await
            .iter()
            .map(|(id, h)| (id.clone(), Arc::clone(h)))
            .collect();

        for (id, handle) in handles {
            let mut session = handle.lock().await;
            if session.state.status == MatchStatus::Playing && session.state.idle_for(now) > idle {
                let loser = session.state.turn.clone().unwrap_or_default();
                if let Some(event) = session.state.forfeit_idle(now) {
                    info!(game = %id, loser = %loser, "idle timeout, game forfeited");
                    self.commit(&mut session, vec![event]).await;
                    report.forfeited.push(id);
                }
            } else if let Some(at) = session.finished_at {
                if now - at > retention {
                    report.expired.push(id);
                }
            }
        }

        if !report.expired.is_empty() {
            let mut sessions = self.sessions.write().await;
            for id in &report.expired {
                sessions.remove(id);
            }
            debug!(count = report.expired.len(), "expired finished games");
        }
        report
    }

    /// Consistent copy of everything that persists.
    pub async fn snapshot(&self) -> Snapshot {
        let queue = self.queue.lock().await.entries().to_vec();

        let sessions = {
            let map = self.sessions.read().await;
            let mut out = Vec::with_capacity(map.len());
            for handle in map.values() {
                out.push(handle.lock().await.clone());
            }
            out
        };

        Snapshot {
            version: SNAPSHOT_VERSION,
            saved_at: self.now(),
            accounts: self.accounts.read().await.digests().clone(),
            sessions,
            rankings: self.rankings.read().await.to_buckets(),
            queue,
        }
    }

    /// Restart AI drivers for restored practice sessions.
    pub async fn resume_ai(self: &Arc<Self>) {
        let handles: Vec<(String, SessionHandle)> = self
            .sessions
            .read()
            .await
            .iter()
            .map(|(id, h)| (id.clone(), Arc::clone(h)))
            .collect();

        for (id, handle) in handles {
            let mut session = handle.lock().await;
            if session.is_ai_turn() && !session.ai_driving {
                session.ai_driving = true;
                self.spawn_ai_driver(id);
            }
        }
    }

    // =========================================================================
    // POST-MUTATION
    // =========================================================================

    /// Publish deltas, then settle a finish or hand the turn to the AI.
    async fn commit(self: &Arc<Self>, session: &mut MatchSession, events: Vec<GameEvent>) {
        let id = session.state.id.clone();
        for event in events {
            if let Some(payload) = encode_update(&session.state, Some(event)) {
                self.broadcaster.publish(&id, payload).await;
            }
        }

        if session.state.is_finished() {
            if session.finished_at.is_some() {
                return;
            }
            session.finished_at = Some(self.now());
            if let Some(flag) = session.ai_cancel.take() {
                flag.store(true, Ordering::Relaxed);
            }

            if session.ai.is_none() {
                if let Some(winner) = session.state.winner.clone() {
                    let loser = session.state.opponent_of(&winner).unwrap_or_default().to_string();
                    self.rankings
                        .write()
                        .await
                        .record(session.state.group, session.state.size(), &winner, &loser);
                }
            }

            let closed = self.broadcaster.close_session(&id).await;
            info!(
                game = %id,
                winner = session.state.winner.as_deref().unwrap_or("-"),
                streams = closed,
                "game finished"
            );
        } else if session.is_ai_turn() && !session.ai_driving {
            session.ai_driving = true;
            self.spawn_ai_driver(id);
        }
    }

    // =========================================================================
    // AI DRIVER
    // =========================================================================

    fn spawn_ai_driver(self: &Arc<Self>, id: String) {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            store.drive_ai(id).await;
        });
    }

    /// Play the AI seat until the turn leaves it or the match ends.
    async fn drive_ai(self: Arc<Self>, id: String) {
        loop {
            tokio::time::sleep(self.config.ai_delay).await;
            let Ok(handle) = self.session(&id).await else {
                return;
            };

            let (decision, revision) = {
                let mut session = handle.lock().await;
                match self.ai_step(&mut session).await {
                    AiStep::Done => {
                        session.ai_driving = false;
                        return;
                    }
                    AiStep::Acted => {
                        if !session.is_ai_turn() {
                            session.ai_driving = false;
                            return;
                        }
                        continue;
                    }
                    AiStep::Think(decision, revision) => (decision, revision),
                }
            };

            let chosen = decision.join().await;

            let mut session = handle.lock().await;
            session.ai_cancel = None;
            if !session.is_ai_turn() {
                session.ai_driving = false;
                return;
            }
            if session.state.revision != revision {
                continue;
            }
            let Some(seat) = session.ai.clone() else {
                session.ai_driving = false;
                return;
            };

            let result = match chosen {
                Some(mv) => session.state.play_move(&seat.nick, mv, self.now()),
                None => {
                    warn!(game = %id, "AI produced no move");
                    session.ai_driving = false;
                    return;
                }
            };
            match result {
                Ok(events) => {
                    self.commit(&mut session, events).await;
                    if !session.is_ai_turn() {
                        session.ai_driving = false;
                        return;
                    }
                }
                Err(e) => {
                    error!(game = %id, error = %e, "AI move rejected");
                    session.ai_driving = false;
                    return;
                }
            }
        }
    }

    async fn ai_step(self: &Arc<Self>, session: &mut MatchSession) -> AiStep {
        if !session.is_ai_turn() {
            return AiStep::Done;
        }
        let Some(seat) = session.ai.clone() else {
            return AiStep::Done;
        };
        let now = self.now();

        match session.state.phase {
            TurnPhase::AwaitingRoll => match session.state.roll(&seat.nick, now) {
                Ok(event) => {
                    self.commit(session, vec![event]).await;
                    AiStep::Acted
                }
                Err(e) => {
                    error!(game = %session.id(), error = %e, "AI roll rejected");
                    AiStep::Done
                }
            },
            TurnPhase::AwaitingPass => match session.state.pass(&seat.nick, now) {
                Ok(event) => {
                    self.commit(session, vec![event]).await;
                    AiStep::Acted
                }
                Err(e) => {
                    error!(game = %session.id(), error = %e, "AI pass rejected");
                    AiStep::Done
                }
            },
            TurnPhase::AwaitingOrigin | TurnPhase::AwaitingDestination => {
                let (Some(dice), Some(side)) = (session.state.dice, session.state.side_of(&seat.nick)) else {
                    return AiStep::Done;
                };
                let rng = self.rng.lock().await.fork();
                let cancel = Arc::new(AtomicBool::new(false));
                let decision = spawn_decision(
                    seat.difficulty,
                    session.state.board.clone(),
                    side,
                    dice.value,
                    rng,
                    Arc::clone(&cancel),
                );
                session.ai_cancel = Some(cancel);
                debug!(game = %session.id(), tier = %seat.difficulty, steps = dice.value, "AI thinking");
                AiStep::Think(decision, session.state.revision)
            }
            TurnPhase::Finished => AiStep::Done,
        }
    }
}

/// Generator seeded from a fresh v4 UUID.
fn entropy_rng() -> DeterministicRng {
    let (hi, lo) = uuid::Uuid::new_v4().as_u64_pair();
    DeterministicRng::new(hi ^ lo.rotate_left(17))
}

/// Serialize a delta for the wire.
fn encode_update(state: &MatchState, event: Option<GameEvent>) -> Option<Arc<str>> {
    match StateUpdate::from_state(state, event).to_json() {
        Ok(json) => Some(Arc::from(json)),
        Err(e) => {
            error!(game = %state.id, error = %e, "failed to encode state update");
            None
        }
    }
}

fn new_session_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
