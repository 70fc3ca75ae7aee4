//! Actions the decision function can submit for one turn.
//!
//! [`Action`] is a closed, internally tagged union: the `action` key on the
//! wire selects the variant and only that variant's fields follow it. The
//! optional `reasoning` note is left out of the payload when unset.

use serde::{Deserialize, Serialize};
use std::{fmt, num::NonZeroU32};

use crate::models::types::Direction;

/// One turn's action.
///
/// # Examples
///
/// ```
/// use crawlerverse::models::{Action, Direction};
///
/// let action = Action::move_to(Direction::North).with_reasoning("explore");
/// let json = serde_json::to_value(&action).unwrap();
/// assert_eq!(json["action"], "move");
/// assert_eq!(json["direction"], "north");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Action {
    Move {
        direction: Direction,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reasoning: Option<String>,
    },
    Attack {
        direction: Direction,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reasoning: Option<String>,
    },
    RangedAttack {
        direction: Direction,
        /// Number of tiles to shoot across, never zero.
        distance: NonZeroU32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reasoning: Option<String>,
    },
    Wait {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reasoning: Option<String>,
    },
    Pickup {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reasoning: Option<String>,
    },
    Drop {
        item_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reasoning: Option<String>,
    },
    Use {
        item_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reasoning: Option<String>,
    },
    Equip {
        item_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reasoning: Option<String>,
    },
    EnterPortal {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reasoning: Option<String>,
    },
}

impl Action {
    pub fn move_to(direction: Direction) -> Self {
        Action::Move {
            direction,
            reasoning: None,
        }
    }

    pub fn attack(direction: Direction) -> Self {
        Action::Attack {
            direction,
            reasoning: None,
        }
    }

    pub fn ranged_attack(direction: Direction, distance: NonZeroU32) -> Self {
        Action::RangedAttack {
            direction,
            distance,
            reasoning: None,
        }
    }

    pub fn wait() -> Self {
        Action::Wait { reasoning: None }
    }

    pub fn pickup() -> Self {
        Action::Pickup { reasoning: None }
    }

    pub fn drop_item(item_type: impl Into<String>) -> Self {
        Action::Drop {
            item_type: item_type.into(),
            reasoning: None,
        }
    }

    pub fn use_item(item_type: impl Into<String>) -> Self {
        Action::Use {
            item_type: item_type.into(),
            reasoning: None,
        }
    }

    pub fn equip(item_type: impl Into<String>) -> Self {
        Action::Equip {
            item_type: item_type.into(),
            reasoning: None,
        }
    }

    pub fn enter_portal() -> Self {
        Action::EnterPortal { reasoning: None }
    }

    /// Attaches a free-form note explaining the choice, shown to spectators.
    pub fn with_reasoning(mut self, text: impl Into<String>) -> Self {
        *self.reasoning_mut() = Some(text.into());
        self
    }

    pub fn reasoning(&self) -> Option<&str> {
        match self {
            Action::Move { reasoning, .. }
            | Action::Attack { reasoning, .. }
            | Action::RangedAttack { reasoning, .. }
            | Action::Wait { reasoning }
            | Action::Pickup { reasoning }
            | Action::Drop { reasoning, .. }
            | Action::Use { reasoning, .. }
            | Action::Equip { reasoning, .. }
            | Action::EnterPortal { reasoning } => reasoning.as_deref(),
        }
    }

    fn reasoning_mut(&mut self) -> &mut Option<String> {
        match self {
            Action::Move { reasoning, .. }
            | Action::Attack { reasoning, .. }
            | Action::RangedAttack { reasoning, .. }
            | Action::Wait { reasoning }
            | Action::Pickup { reasoning }
            | Action::Drop { reasoning, .. }
            | Action::Use { reasoning, .. }
            | Action::Equip { reasoning, .. }
            | Action::EnterPortal { reasoning } => reasoning,
        }
    }

    /// Wire tag of the variant.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Move { .. } => "move",
            Action::Attack { .. } => "attack",
            Action::RangedAttack { .. } => "ranged_attack",
            Action::Wait { .. } => "wait",
            Action::Pickup { .. } => "pickup",
            Action::Drop { .. } => "drop",
            Action::Use { .. } => "use",
            Action::Equip { .. } => "equip",
            Action::EnterPortal { .. } => "enter_portal",
        }
    }

    /// Checks the constraints the type system cannot express.
    ///
    /// Item-based actions need a non-empty item type. Returns a description
    /// of the problem when the action would be rejected by the server.
    pub fn check(&self) -> Result<(), String> {
        match self {
            Action::Drop { item_type, .. }
            | Action::Use { item_type, .. }
            | Action::Equip { item_type, .. }
                if item_type.is_empty() =>
            {
                Err(format!("{} action requires a non-empty item type", self.name()))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Action::Move { direction, .. } | Action::Attack { direction, .. } => {
                write!(f, "{} {}", self.name(), direction)
            }
            Action::RangedAttack {
                direction,
                distance,
                ..
            } => write!(f, "{} {} x{}", self.name(), direction, distance),
            Action::Drop { item_type, .. }
            | Action::Use { item_type, .. }
            | Action::Equip { item_type, .. } => write!(f, "{} {}", self.name(), item_type),
            _ => f.write_str(self.name()),
        }
    }
}
