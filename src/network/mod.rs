//! Network Layer
//!
//! Session store, matchmaking, accounts, rankings, persistence and the two
//! front ends (HTTP/SSE and WebSocket). This layer is **non-deterministic**;
//! all rules run through `game/`.

pub mod auth;
pub mod broadcast;
pub mod error;
pub mod http;
pub mod matchmaking;
pub mod persist;
pub mod protocol;
pub mod ranking;
pub mod server;
pub mod session;
pub mod ws;

pub use auth::{AccountStore, AuthError, RegisterOutcome};
pub use broadcast::{Broadcaster, Subscription};
pub use error::{CommandError, ErrorBody, ErrorKind};
pub use matchmaking::{MatchmakingQueue, QueueEntry};
pub use persist::{FileSnapshotStore, MemorySnapshotStore, PersistError, Snapshot, SnapshotFormat, SnapshotStore};
pub use protocol::{ClientMessage, Command, Reply, ServerMessage, StateUpdate};
pub use ranking::{RankingRow, RankingTable};
pub use server::{GameServer, GameServerError, ServerConfig};
pub use session::{MatchSession, SessionStore, StoreConfig, SweepReport};
