use crate::Result;
use crate::config::RoomConfig;
use crate::engine::{self, Outcome};
use crate::game::{ChainState, Move, Player, PlayerId};
use crate::message::TurnReport;
use crate::storage::DocumentStore;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// 一个房间的接龙回合，负责读取快照、调用引擎并写回结果
pub struct Room<S> {
    code: String,
    store: Arc<S>,
}

impl<S: DocumentStore> Room<S> {
    pub fn new(code: impl Into<String>, store: Arc<S>) -> Self {
        Room {
            code: code.into(),
            store,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// 写入玩家名单和开局状态
    pub async fn start_round(&self, players: &[Player], limits: &RoomConfig) -> Result<ChainState> {
        if players.len() < limits.min_players {
            return Err(crate::Error::Room(format!(
                "玩家数量不足，需要至少 {} 名玩家",
                limits.min_players
            )));
        }
        if players.len() > limits.max_players {
            return Err(crate::Error::Room(format!(
                "玩家数量超过上限 {}",
                limits.max_players
            )));
        }

        let roster: Vec<PlayerId> = players.iter().map(|p| p.id.clone()).collect();
        for (i, id) in roster.iter().enumerate() {
            if roster[..i].contains(id) {
                return Err(crate::Error::Room(format!("玩家 {} 重复", id)));
            }
        }

        let state = ChainState::start(&roster).map_err(crate::Error::Room)?;
        self.store.save_roster(&self.code, players).await?;
        self.store.save_state(&self.code, &state).await?;

        info!("房间 {} 开局，共 {} 名玩家", self.code, players.len());
        Ok(state)
    }

    /// 当前状态快照
    pub async fn snapshot(&self) -> Result<ChainState> {
        self.store
            .load_state(&self.code)
            .await?
            .ok_or_else(|| crate::Error::Room(format!("房间 {} 不存在", self.code)))
    }

    /// 玩家名单，顺序即出词顺序
    pub async fn players(&self) -> Result<Vec<Player>> {
        Ok(self.store.load_roster(&self.code).await?.unwrap_or_default())
    }

    /// 提交一次出词
    ///
    /// 被拒绝的出词不会写入存储。写入失败时返回存储错误，
    /// 房间状态保持为写入前的样子，玩家可以原样重试。
    pub async fn submit(&self, mv: &Move) -> Result<TurnReport> {
        let state = self.snapshot().await?;
        let roster: Vec<PlayerId> = self.players().await?.into_iter().map(|p| p.id).collect();

        let applied = match engine::play_move(&state, mv, &roster) {
            Ok(applied) => applied,
            Err(reason) => {
                debug!(
                    "房间 {} 拒绝玩家 {} 的单词 {:?}: {}",
                    self.code, mv.player_id, mv.word, reason
                );
                return Ok(TurnReport::rejected(reason));
            }
        };

        if let Err(e) = self.store.save_state(&self.code, &applied.state).await {
            warn!("房间 {} 写入失败: {}", self.code, e);
            return Err(e);
        }

        info!(
            "房间 {} 玩家 {} 出词 {} 得 {} 分",
            self.code, mv.player_id, applied.word, applied.score.total
        );
        if applied.state.game_over {
            info!("房间 {} 本局结束，共 {} 个单词", self.code, applied.state.chain.len());
        }

        Ok(TurnReport::Accepted {
            word: applied.word.into_inner(),
            score: applied.score,
            next_player_id: applied.state.current_player_id,
            game_over: applied.state.game_over,
        })
    }

    /// 本局结果，只有结束后才能计算
    pub async fn outcome(&self) -> Result<Outcome> {
        let state = self.snapshot().await?;
        let players = self.players().await?;
        Ok(engine::determine_outcome(&state, &players)?)
    }

    /// 订阅房间状态变化
    pub async fn watch(&self) -> Result<mpsc::Receiver<ChainState>> {
        self.store.subscribe(&self.code).await
    }
}
