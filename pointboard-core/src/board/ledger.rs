/// Per-board points ledger and reward catalog.
///
/// `total_points` is unsigned and only changes through `earn` and `spend`;
/// `spend` checks the balance before deducting, so it can never go negative.
use super::{Kanban, KanbanError};
use crate::colors::is_hex_color;
use crate::types::{generate_id, BoardData, Reward, RewardInput, DEFAULT_REWARD_COLOR};

/// A successful reward redemption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redemption {
    pub reward_id: String,
    pub reward_title: String,
    pub cost: u32,
    /// Balance after the deduction.
    pub balance: u64,
}

fn validate_reward(input: &RewardInput) -> Result<(), KanbanError> {
    if input.title.trim().is_empty() {
        return Err(KanbanError::EmptyRewardTitle);
    }
    match &input.color {
        Some(c) if !is_hex_color(c) => Err(KanbanError::InvalidColor(c.clone())),
        _ => Ok(()),
    }
}

impl BoardData {
    /// Add `points` to the balance and return the new balance.
    pub fn earn(&mut self, points: u32) -> u64 {
        self.total_points = self.total_points.saturating_add(u64::from(points));
        self.total_points
    }

    /// Redeem a reward. `Ok(None)` if the reward does not exist.
    pub fn spend(&mut self, reward_id: &str) -> Result<Option<Redemption>, KanbanError> {
        let Some(reward) = self.reward(reward_id) else {
            return Ok(None);
        };
        let cost = reward.points;
        if self.total_points < u64::from(cost) {
            return Err(KanbanError::InsufficientPoints {
                cost,
                balance: self.total_points,
            });
        }

        let reward_title = reward.title.clone();
        self.total_points -= u64::from(cost);
        Ok(Some(Redemption {
            reward_id: reward_id.to_string(),
            reward_title,
            cost,
            balance: self.total_points,
        }))
    }

    pub fn can_afford(&self, reward_id: &str) -> bool {
        self.reward(reward_id)
            .is_some_and(|r| self.total_points >= u64::from(r.points))
    }

    pub fn reward(&self, reward_id: &str) -> Option<&Reward> {
        self.rewards.iter().find(|r| r.id == reward_id)
    }

    pub fn add_reward(&mut self, input: RewardInput) -> Result<Reward, KanbanError> {
        validate_reward(&input)?;
        let reward = Reward {
            id: generate_id("reward"),
            title: input.title.trim().to_string(),
            points: input.points,
            color: input.color.unwrap_or_else(|| DEFAULT_REWARD_COLOR.to_string()),
        };
        self.rewards.push(reward.clone());
        Ok(reward)
    }

    /// Replace title, cost and (if given) color of a reward.
    pub fn edit_reward(&mut self, reward_id: &str, input: RewardInput) -> Result<Option<Reward>, KanbanError> {
        validate_reward(&input)?;
        let Some(reward) = self.rewards.iter_mut().find(|r| r.id == reward_id) else {
            return Ok(None);
        };
        reward.title = input.title.trim().to_string();
        reward.points = input.points;
        if let Some(color) = input.color {
            reward.color = color;
        }
        Ok(Some(reward.clone()))
    }

    pub fn delete_reward(&mut self, reward_id: &str) -> bool {
        let before = self.rewards.len();
        self.rewards.retain(|r| r.id != reward_id);
        self.rewards.len() != before
    }
}

impl Kanban {
    /// Add points to a board. Returns the new balance, `None` for unknown boards.
    pub fn earn(&self, board_id: &str, points: u32) -> Result<Option<u64>, KanbanError> {
        self.update_board(board_id, |data| Ok(data.earn(points)))
    }

    /// Redeem a reward. Fails with `InsufficientPoints` and leaves the balance
    /// untouched when the board cannot afford it.
    pub fn spend(&self, board_id: &str, reward_id: &str) -> Result<Option<Redemption>, KanbanError> {
        let result = self.update_board(board_id, |data| data.spend(reward_id));
        match &result {
            Ok(Some(Some(r))) => log::info!(
                "[pointboard.ledger] Redeemed {:?} on board {} for {} points (balance {})",
                r.reward_title,
                board_id,
                r.cost,
                r.balance
            ),
            Err(KanbanError::InsufficientPoints { cost, balance }) => log::debug!(
                "[pointboard.ledger] Rejected redemption of {} on board {}: costs {}, balance {}",
                reward_id,
                board_id,
                cost,
                balance
            ),
            _ => {}
        }
        Ok(result?.flatten())
    }

    pub fn balance(&self, board_id: &str) -> Option<u64> {
        self.state().board_data(board_id).map(|d| d.total_points)
    }

    pub fn can_afford(&self, board_id: &str, reward_id: &str) -> bool {
        self.state()
            .board_data(board_id)
            .is_some_and(|d| d.can_afford(reward_id))
    }

    pub fn rewards(&self, board_id: &str) -> Vec<Reward> {
        self.state()
            .boards_data
            .remove(board_id)
            .map(|d| d.rewards)
            .unwrap_or_default()
    }

    pub fn add_reward(&self, board_id: &str, input: RewardInput) -> Result<Option<Reward>, KanbanError> {
        self.update_board(board_id, |data| data.add_reward(input))
    }

    pub fn edit_reward(&self, board_id: &str, reward_id: &str, input: RewardInput) -> Result<Option<Reward>, KanbanError> {
        Ok(self
            .update_board(board_id, |data| data.edit_reward(reward_id, input))?
            .flatten())
    }

    pub fn delete_reward(&self, board_id: &str, reward_id: &str) -> Result<bool, KanbanError> {
        Ok(self
            .update_board(board_id, |data| Ok(data.delete_reward(reward_id)))?
            .unwrap_or(false))
    }
}
