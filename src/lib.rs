pub mod config;
pub mod engine;
pub mod game;
pub mod message;
pub mod room;
pub mod storage;

pub use config::Config;
pub use engine::{Outcome, RejectionReason, ScoreBreakdown};
pub use game::{ChainState, Move, Player, PlayerId, RoundPhase};
pub use message::{ErrorCode, TurnReport};
pub use room::Room;
pub use storage::*;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("内部错误: {0}")]
    Internal(#[from] anyhow::Error),
    #[error("房间错误: {0}")]
    Room(String),
    #[error("存储错误: {0}")]
    Storage(String),
    #[error("配置错误: {0}")]
    Config(String),
    #[error("结算错误: {0}")]
    Outcome(#[from] engine::OutcomeError),
}

pub type Result<T> = std::result::Result<T, Error>;
