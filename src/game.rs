use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// 玩家ID类型
pub type PlayerId = String;

/// 玩家信息，由房间管理方维护，引擎只读
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    #[serde(alias = "name")]
    pub display_name: String,
    #[serde(default)]
    pub is_host: bool,
}

impl Player {
    pub fn new(id: impl Into<PlayerId>, display_name: impl Into<String>) -> Self {
        Player {
            id: id.into(),
            display_name: display_name.into(),
            is_host: false,
        }
    }

    pub fn host(id: impl Into<PlayerId>, display_name: impl Into<String>) -> Self {
        Player {
            is_host: true,
            ..Player::new(id, display_name)
        }
    }
}

/// 一次出词
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Move {
    pub word: String,
    pub player_id: PlayerId,
}

impl Move {
    pub fn new(player_id: impl Into<PlayerId>, word: impl Into<String>) -> Self {
        Move {
            word: word.into(),
            player_id: player_id.into(),
        }
    }
}

/// 回合阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    NotStarted,
    InProgress,
    Finished,
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundPhase::NotStarted => write!(f, "未开始"),
            RoundPhase::InProgress => write!(f, "进行中"),
            RoundPhase::Finished => write!(f, "已结束"),
        }
    }
}

/// 房间内共享的接龙状态，每次出词后整体替换
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainState {
    #[serde(default)]
    pub chain: Vec<String>,
    #[serde(rename = "currentPlayer", alias = "currentPlayerId", default)]
    pub current_player_id: PlayerId,
    #[serde(default)]
    pub scores: HashMap<PlayerId, u32>,
    #[serde(default)]
    pub game_over: bool,
}

impl ChainState {
    /// 开局状态：空链，名单第一位先手，所有人 0 分
    pub fn start(roster: &[PlayerId]) -> Result<Self, String> {
        let first = roster.first().ok_or_else(|| "玩家名单为空".to_string())?;

        Ok(ChainState {
            chain: Vec::new(),
            current_player_id: first.clone(),
            scores: roster.iter().map(|id| (id.clone(), 0)).collect(),
            game_over: false,
        })
    }

    pub fn phase(&self) -> RoundPhase {
        if self.game_over {
            RoundPhase::Finished
        } else if self.current_player_id.is_empty() {
            RoundPhase::NotStarted
        } else {
            RoundPhase::InProgress
        }
    }

    pub fn last_word(&self) -> Option<&str> {
        self.chain.last().map(String::as_str)
    }

    pub fn score_of(&self, player_id: &str) -> u32 {
        self.scores.get(player_id).copied().unwrap_or(0)
    }
}
