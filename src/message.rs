use crate::engine::{RejectionReason, ScoreBreakdown};
use crate::game::PlayerId;
use serde::{Deserialize, Serialize};

/// 交给界面层的错误码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    GameAlreadyOver,
    RoundNotStarted,
    NotYourTurn,
    PlayerNotActive,
    InvalidCharacters,
    WrongStartingLetter,
    WordAlreadyUsed,
}

impl From<RejectionReason> for ErrorCode {
    fn from(reason: RejectionReason) -> Self {
        match reason {
            RejectionReason::GameAlreadyOver => ErrorCode::GameAlreadyOver,
            RejectionReason::RoundNotStarted => ErrorCode::RoundNotStarted,
            RejectionReason::NotYourTurn => ErrorCode::NotYourTurn,
            RejectionReason::PlayerNotActive => ErrorCode::PlayerNotActive,
            RejectionReason::InvalidCharacters => ErrorCode::InvalidCharacters,
            RejectionReason::WrongStartingLetter => ErrorCode::WrongStartingLetter,
            RejectionReason::WordAlreadyUsed => ErrorCode::WordAlreadyUsed,
        }
    }
}

impl ErrorCode {
    /// 是否应该让同一位玩家重新出词
    pub fn should_reprompt(&self) -> bool {
        matches!(
            self,
            ErrorCode::InvalidCharacters | ErrorCode::WrongStartingLetter | ErrorCode::WordAlreadyUsed
        )
    }
}

/// 一次出词的处理结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnReport {
    Accepted {
        word: String,
        score: ScoreBreakdown,
        next_player_id: PlayerId,
        game_over: bool,
    },
    Rejected {
        code: ErrorCode,
        message: String,
    },
}

impl TurnReport {
    pub fn rejected(reason: RejectionReason) -> Self {
        TurnReport::Rejected {
            code: reason.into(),
            message: reason.to_string(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, TurnReport::Accepted { .. })
    }
}
