use crate::game::{ChainState, Move, Player, PlayerId, RoundPhase};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 链长达到该值时本局结束
pub const CHAIN_CAP: usize = 10;
/// 成环结束所需的最短链长（含新词）
pub const CIRCLE_MIN_LENGTH: usize = 3;
/// 出词前链长至少为该值才可能拿到成环奖励
pub const CIRCLE_BONUS_MIN_CHAIN: usize = 2;

/// 出词被拒绝的原因，按检查顺序排列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
pub enum RejectionReason {
    #[error("游戏已经结束")]
    GameAlreadyOver,
    #[error("本局尚未开始")]
    RoundNotStarted,
    #[error("还没轮到您出词")]
    NotYourTurn,
    #[error("您不在本局的玩家名单中")]
    PlayerNotActive,
    #[error("只能输入英文字母，不能包含数字、空格或符号")]
    InvalidCharacters,
    #[error("单词必须以上一个单词的最后一个字母开头")]
    WrongStartingLetter,
    #[error("这个单词已经用过了")]
    WordAlreadyUsed,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OutcomeError {
    #[error("本局还没有结束")]
    RoundInProgress,
    #[error("没有任何得分记录")]
    NoScores,
}

/// 通过校验的单词（已去空格并转为小写）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedWord(String);

impl ValidatedWord {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ValidatedWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 单词得分明细
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub word_length_points: u32,
    pub chain_length_points: u32,
    pub circle_bonus: u32,
    pub total: u32,
}

/// 一次被接受的出词
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMove {
    pub state: ChainState,
    pub word: ValidatedWord,
    pub score: ScoreBreakdown,
}

/// 本局结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Outcome {
    #[serde(rename_all = "camelCase")]
    SingleWinner { player_id: PlayerId, score: u32 },
    #[serde(rename_all = "camelCase")]
    Tie { player_ids: Vec<PlayerId>, score: u32 },
}

impl Outcome {
    pub fn max_score(&self) -> u32 {
        match self {
            Outcome::SingleWinner { score, .. } | Outcome::Tie { score, .. } => *score,
        }
    }

    pub fn winners(&self) -> Vec<PlayerId> {
        match self {
            Outcome::SingleWinner { player_id, .. } => vec![player_id.clone()],
            Outcome::Tie { player_ids, .. } => player_ids.clone(),
        }
    }

    /// 用玩家昵称生成结果播报，找不到昵称时退回玩家ID
    pub fn announce(&self, players: &[Player]) -> String {
        let name_of = |id: &PlayerId| {
            players
                .iter()
                .find(|p| &p.id == id)
                .map(|p| p.display_name.clone())
                .unwrap_or_else(|| id.clone())
        };

        match self {
            Outcome::SingleWinner { player_id, score } => {
                format!("{} 以 {} 分获胜！", name_of(player_id), score)
            }
            Outcome::Tie { player_ids, score } => {
                let names: Vec<String> = player_ids.iter().map(name_of).collect();
                format!("平局！{} 同为 {} 分！", names.join(" 和 "), score)
            }
        }
    }
}

/// 去掉首尾空白并转为小写
pub fn normalize_word(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn is_letters_only(word: &str) -> bool {
    !word.is_empty() && word.chars().all(|c| c.is_ascii_lowercase())
}

/// 名单中当前玩家的下一位，末尾回到第一位；当前玩家不在名单中时从第一位开始
pub fn next_player(roster: &[PlayerId], current: &str) -> Option<PlayerId> {
    if roster.is_empty() {
        return None;
    }

    let next_index = match roster.iter().position(|id| id == current) {
        Some(index) => (index + 1) % roster.len(),
        None => 0,
    };
    Some(roster[next_index].clone())
}

/// 校验一次出词，第一个命中的规则决定拒绝原因
pub fn validate_move(
    state: &ChainState,
    mv: &Move,
    active_player_ids: &[PlayerId],
) -> Result<ValidatedWord, RejectionReason> {
    match state.phase() {
        RoundPhase::Finished => return Err(RejectionReason::GameAlreadyOver),
        RoundPhase::NotStarted => return Err(RejectionReason::RoundNotStarted),
        RoundPhase::InProgress => {}
    }

    if mv.player_id != state.current_player_id {
        return Err(RejectionReason::NotYourTurn);
    }

    if !active_player_ids.contains(&mv.player_id) {
        return Err(RejectionReason::PlayerNotActive);
    }

    let word = normalize_word(&mv.word);
    if !is_letters_only(&word) {
        return Err(RejectionReason::InvalidCharacters);
    }

    if let Some(last_word) = state.last_word() {
        if last_word.chars().last() != word.chars().next() {
            return Err(RejectionReason::WrongStartingLetter);
        }
    }

    if state.chain.iter().any(|used| used.to_lowercase() == word) {
        return Err(RejectionReason::WordAlreadyUsed);
    }

    Ok(ValidatedWord(word))
}

/// 按出词前的链计算得分
///
/// 成环奖励比较的是新词的首字母和开局词的首字母，
/// 与结束判定（新词的尾字母）不是同一个条件。
pub fn score_word(chain: &[String], word: &str) -> ScoreBreakdown {
    let chain_len = chain.len() as u32;
    let word_length_points = word.chars().count() as u32;
    let chain_length_points = 2 * chain_len;

    let opens_like_first = chain.len() >= CIRCLE_BONUS_MIN_CHAIN
        && word.chars().next() == chain[0].chars().next();
    let circle_bonus = if opens_like_first {
        2 * (chain_len + 1)
    } else {
        0
    };

    ScoreBreakdown {
        word_length_points,
        chain_length_points,
        circle_bonus,
        total: word_length_points + chain_length_points + circle_bonus,
    }
}

/// 接受出词并返回新状态及得分明细；被拒绝时原状态不变
pub fn play_move(
    state: &ChainState,
    mv: &Move,
    active_player_ids: &[PlayerId],
) -> Result<AppliedMove, RejectionReason> {
    let word = validate_move(state, mv, active_player_ids)?;
    let score = score_word(&state.chain, word.as_str());

    let mut chain = state.chain.clone();
    chain.push(word.as_str().to_string());

    let mut scores = state.scores.clone();
    *scores.entry(state.current_player_id.clone()).or_insert(0) += score.total;

    let closes_circle = chain.len() >= CIRCLE_MIN_LENGTH
        && word.as_str().chars().last() == chain[0].chars().next()
        && word.as_str() != chain[0];
    let chain_full = chain.len() >= CHAIN_CAP;

    let current_player_id = next_player(active_player_ids, &state.current_player_id)
        .unwrap_or_else(|| state.current_player_id.clone());

    Ok(AppliedMove {
        state: ChainState {
            chain,
            current_player_id,
            scores,
            game_over: closes_circle || chain_full,
        },
        word,
        score,
    })
}

pub fn apply_move(
    state: &ChainState,
    mv: &Move,
    active_player_ids: &[PlayerId],
) -> Result<ChainState, RejectionReason> {
    play_move(state, mv, active_player_ids).map(|applied| applied.state)
}

/// 计算最终结果，平局的玩家按名单顺序列出
pub fn determine_outcome(
    final_state: &ChainState,
    players: &[Player],
) -> Result<Outcome, OutcomeError> {
    if !final_state.game_over {
        return Err(OutcomeError::RoundInProgress);
    }

    let max_score = final_state
        .scores
        .values()
        .copied()
        .max()
        .ok_or(OutcomeError::NoScores)?;

    let mut winners: Vec<PlayerId> = final_state
        .scores
        .iter()
        .filter(|(_, score)| **score == max_score)
        .map(|(id, _)| id.clone())
        .collect();
    winners.sort_by_key(|id| {
        let seat = players.iter().position(|p| &p.id == id).unwrap_or(usize::MAX);
        (seat, id.clone())
    });

    if winners.len() == 1 {
        Ok(Outcome::SingleWinner {
            player_id: winners.remove(0),
            score: max_score,
        })
    } else {
        Ok(Outcome::Tie {
            player_ids: winners,
            score: max_score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn roster() -> Vec<PlayerId> {
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    }

    fn state_with(chain: &[&str], current: &str) -> ChainState {
        ChainState {
            chain: chain.iter().map(|w| w.to_string()).collect(),
            current_player_id: current.to_string(),
            scores: HashMap::new(),
            game_over: false,
        }
    }

    #[test]
    fn first_word_scores_its_length() {
        let state = ChainState::start(&roster()).unwrap();
        let applied = play_move(&state, &Move::new("a", "red"), &roster()).unwrap();

        assert_eq!(applied.score.total, 3);
        assert_eq!(applied.score.chain_length_points, 0);
        assert_eq!(applied.score.circle_bonus, 0);
        assert_eq!(applied.state.chain, vec!["red"]);
        assert_eq!(applied.state.score_of("a"), 3);
        assert_eq!(applied.state.current_player_id, "b");
        assert!(!applied.state.game_over);
    }

    #[test]
    fn second_word_adds_chain_points() {
        let state = state_with(&["red"], "b");
        let applied = play_move(&state, &Move::new("b", "drum"), &roster()).unwrap();

        assert_eq!(applied.score.total, 6);
        assert_eq!(applied.state.chain, vec!["red", "drum"]);
        assert_eq!(applied.state.score_of("b"), 6);
    }

    #[test]
    fn input_is_trimmed_and_lowercased() {
        let state = state_with(&["red"], "b");
        let applied = play_move(&state, &Move::new("b", "  DRUM \n"), &roster()).unwrap();
        assert_eq!(applied.word.as_str(), "drum");
    }

    #[test]
    fn tenth_word_ends_the_round() {
        let chain = [
            "ab", "bc", "cd", "de", "ef", "fg", "gh", "hi", "ij",
        ];
        let state = state_with(&chain, "a");
        let next = apply_move(&state, &Move::new("a", "jk"), &roster()).unwrap();

        assert_eq!(next.chain.len(), CHAIN_CAP);
        assert!(next.game_over);
        assert_eq!(next.phase(), RoundPhase::Finished);
    }

    #[test]
    fn duplicate_is_rejected_before_circle_check() {
        let state = state_with(&["red", "door"], "c");
        assert_eq!(
            apply_move(&state, &Move::new("c", "red"), &roster()),
            Err(RejectionReason::WordAlreadyUsed)
        );
    }

    #[test]
    fn closing_circle_ends_the_round() {
        let state = state_with(&["tap", "pot"], "c");
        let applied = play_move(&state, &Move::new("c", "tart"), &roster()).unwrap();

        assert!(applied.state.game_over);
        assert_eq!(applied.state.current_player_id, "a");
    }

    #[test]
    fn circle_needs_three_words() {
        let state = state_with(&["tent"], "b");
        let next = apply_move(&state, &Move::new("b", "tot"), &roster()).unwrap();
        assert!(!next.game_over);
    }

    // 奖励看新词首字母，结束看新词尾字母，两者故意不统一
    #[test]
    fn circle_bonus_and_circle_close_use_different_letters() {
        let state = state_with(&["tap", "pot"], "c");

        let bonus_only = play_move(&state, &Move::new("c", "tub"), &roster()).unwrap();
        assert_eq!(bonus_only.score.circle_bonus, 6);
        assert_eq!(bonus_only.score.total, 3 + 4 + 6);
        assert!(!bonus_only.state.game_over);

        let state = state_with(&["pat", "tap"], "c");
        let both = play_move(&state, &Move::new("c", "pep"), &roster()).unwrap();
        assert!(both.state.game_over);
        assert_eq!(both.score.circle_bonus, 6);

        let state = state_with(&["sat", "tap"], "c");
        let close_without_bonus = play_move(&state, &Move::new("c", "pus"), &roster()).unwrap();
        assert!(close_without_bonus.state.game_over);
        assert_eq!(close_without_bonus.score.circle_bonus, 0);
    }

    #[test]
    fn score_word_formula() {
        let chain: Vec<String> = vec!["apple".into(), "egg".into(), "goat".into()];
        let score = score_word(&chain, "animal");
        assert_eq!(score.word_length_points, 6);
        assert_eq!(score.chain_length_points, 6);
        assert_eq!(score.circle_bonus, 8);
        assert_eq!(score.total, 20);

        assert_eq!(score_word(&chain[..1], "apex").circle_bonus, 0);
    }

    #[test]
    fn rejections_follow_check_order() {
        let mut over = state_with(&["red"], "a");
        over.game_over = true;
        assert_eq!(
            validate_move(&over, &Move::new("b", "12"), &roster()),
            Err(RejectionReason::GameAlreadyOver)
        );

        assert_eq!(
            validate_move(&ChainState::default(), &Move::new("a", "red"), &roster()),
            Err(RejectionReason::RoundNotStarted)
        );

        let state = state_with(&["red"], "a");
        assert_eq!(
            validate_move(&state, &Move::new("b", "dog"), &roster()),
            Err(RejectionReason::NotYourTurn)
        );
        assert_eq!(
            validate_move(&state, &Move::new("a", "dog"), &["b".to_string()]),
            Err(RejectionReason::PlayerNotActive)
        );
        assert_eq!(
            validate_move(&state, &Move::new("a", "d0g"), &roster()),
            Err(RejectionReason::InvalidCharacters)
        );
        assert_eq!(
            validate_move(&state, &Move::new("a", "cat"), &roster()),
            Err(RejectionReason::WrongStartingLetter)
        );

        let state = state_with(&["dad", "dad"], "a");
        assert_eq!(
            validate_move(&state, &Move::new("a", "DAD"), &roster()),
            Err(RejectionReason::WordAlreadyUsed)
        );
    }

    #[test]
    fn invalid_characters() {
        let state = state_with(&[], "a");
        for word in ["", "   ", "two words", "it's", "héllo", "abc1", "-"] {
            assert_eq!(
                validate_move(&state, &Move::new("a", word), &roster()),
                Err(RejectionReason::InvalidCharacters),
                "{word:?}"
            );
        }
    }

    #[test]
    fn empty_chain_accepts_any_letter() {
        let state = state_with(&[], "a");
        let word = validate_move(&state, &Move::new("a", "Zebra"), &roster()).unwrap();
        assert_eq!(word.into_inner(), "zebra");
    }

    #[test]
    fn rejection_leaves_state_alone() {
        let state = state_with(&["red"], "a");
        let snapshot = state.clone();
        let mv = Move::new("a", "cat");

        let first = apply_move(&state, &mv, &roster());
        let second = apply_move(&state, &mv, &roster());
        assert_eq!(first, Err(RejectionReason::WrongStartingLetter));
        assert_eq!(first, second);
        assert_eq!(state, snapshot);
    }

    #[test]
    fn turn_rotation_cycles_roster() {
        let roster = roster();
        assert_eq!(next_player(&roster, "b").as_deref(), Some("c"));
        assert_eq!(next_player(&roster, "c").as_deref(), Some("a"));
        assert_eq!(next_player(&roster, "gone").as_deref(), Some("a"));
        assert_eq!(next_player(&[], "a"), None);
    }

    #[test]
    fn tie_lists_winners_in_roster_order() {
        let players = vec![Player::host("a", "Ann"), Player::new("b", "Bob")];
        let state = ChainState {
            chain: vec!["red".into(), "drum".into()],
            current_player_id: "a".into(),
            scores: HashMap::from([("b".to_string(), 10), ("a".to_string(), 10)]),
            game_over: true,
        };

        let outcome = determine_outcome(&state, &players).unwrap();
        assert_eq!(
            outcome,
            Outcome::Tie {
                player_ids: vec!["a".into(), "b".into()],
                score: 10
            }
        );
        assert_eq!(outcome.announce(&players), "平局！Ann 和 Bob 同为 10 分！");
    }

    #[test]
    fn single_winner() {
        let players = vec![Player::host("a", "Ann"), Player::new("b", "Bob")];
        let state = ChainState {
            chain: vec!["red".into()],
            current_player_id: "b".into(),
            scores: HashMap::from([("a".to_string(), 3), ("b".to_string(), 12)]),
            game_over: true,
        };

        let outcome = determine_outcome(&state, &players).unwrap();
        assert_eq!(outcome.winners(), vec!["b".to_string()]);
        assert_eq!(outcome.max_score(), 12);
        assert_eq!(outcome.announce(&players), "Bob 以 12 分获胜！");
    }

    #[test]
    fn outcome_requires_finished_round_with_scores() {
        let mut state = state_with(&["red"], "a");
        assert_eq!(
            determine_outcome(&state, &[]),
            Err(OutcomeError::RoundInProgress)
        );
        state.game_over = true;
        assert_eq!(determine_outcome(&state, &[]), Err(OutcomeError::NoScores));
    }
}
