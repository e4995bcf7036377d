use serde::{Deserialize, Serialize};

use crate::model::{ChatMessage, Role};

/// Prompt-window accounting for a completion call. `reserved_generation_budget`
/// is carved out of `max_tokens` up front so the model always has room to
/// answer.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct HistoryBudget {
	pub max_tokens: u32,
	pub reserved_generation_budget: u32,
}

impl HistoryBudget {
	pub fn available(&self) -> u32 {
		self.max_tokens.saturating_sub(self.reserved_generation_budget)
	}
}

/// Character-based token estimate, ~4 characters per token rounded up.
/// Deliberately model-agnostic; the ceiling keeps the estimate conservative.
pub fn approximate_tokens(text: &str) -> u32 {
	text.chars().count().div_ceil(4) as _
}

/// Trims a conversation to fit the available budget.
///
/// System messages always survive, as does the most recent user/assistant
/// exchange. Older messages are re-admitted newest first until one would
/// overrun the budget. If even the essentials do not fit, the result degrades
/// to the system messages plus the latest user message so the conversation is
/// never truncated to nothing.
pub fn limit_messages_by_tokens(
	messages: &[ChatMessage],
	budget: HistoryBudget,
) -> Vec<ChatMessage> {
	let available = budget.available();
	let cost = |index: usize| approximate_tokens(&messages[index].content);
	let mut keep = vec![false; messages.len()];
	let mut used = 0_u32;

	for (index, message) in messages.iter().enumerate() {
		if message.role.is_system() {
			keep[index] = true;
			used += cost(index);
		}
	}

	let non_system: Vec<usize> = (0..messages.len())
		.filter(|&index| !messages[index].role.is_system())
		.collect();
	let essential: Vec<usize> = non_system.iter().rev().take(2).copied().collect();
	let essential_cost = essential.iter().map(|&index| cost(index)).sum::<u32>();

	if used + essential_cost > available {
		let mut keep = vec![false; messages.len()];

		for (index, message) in messages.iter().enumerate() {
			if message.role.is_system() {
				keep[index] = true;
			}
		}
		if let Some(&latest_user) =
			non_system.iter().rev().find(|&&index| messages[index].role == Role::User)
		{
			keep[latest_user] = true;
		}

		return collect_kept(messages, &keep);
	}

	for &index in &essential {
		keep[index] = true;
		used += cost(index);
	}
	for &index in non_system.iter().rev().skip(essential.len()) {
		if used + cost(index) > available {
			break;
		}

		keep[index] = true;
		used += cost(index);
	}

	collect_kept(messages, &keep)
}

fn collect_kept(messages: &[ChatMessage], keep: &[bool]) -> Vec<ChatMessage> {
	messages
		.iter()
		.enumerate()
		.filter(|(index, _)| keep[*index])
		.map(|(_, message)| message.clone())
		.collect()
}
