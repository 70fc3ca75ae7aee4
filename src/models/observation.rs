//! Per-turn snapshot of what the agent can see.
//!
//! An [`Observation`] is produced once per turn by the server and handed to
//! the decision function. All the helper queries below are computed from the
//! snapshot only, nothing is cached or mutated.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::types::{Direction, TileType};

/// A monster standing on a visible tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Monster {
    /// Monster kind, e.g. `rat`.
    #[serde(rename = "type")]
    pub kind: String,
    pub hp: i32,
    pub max_hp: i32,
}

/// One tile of the visible grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibleTile {
    pub x: i32,
    pub y: i32,
    #[serde(rename = "type")]
    pub tile_type: TileType,
    /// Item types lying on the tile.
    pub items: Vec<String>,
    /// Monster occupying the tile, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monster: Option<Monster>,
}

/// An item carried by the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: String,
    /// Item type, used by `drop`, `use` and `equip` actions.
    #[serde(rename = "type")]
    pub item_type: String,
    pub name: String,
}

/// Player position and stats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// `(x, y)`, transmitted as a two element array.
    pub position: (i32, i32),
    pub hp: i32,
    pub max_hp: i32,
    pub attack: i32,
    pub defense: i32,
    #[serde(default)]
    pub equipped_weapon: Option<String>,
    #[serde(default)]
    pub equipped_armor: Option<String>,
}

/// The agent's view of the game world for a single turn.
///
/// # Examples
///
/// ```
/// use crawlerverse::models::{Direction, Observation};
///
/// let json = r#"{
///     "turn": 1, "floor": 1,
///     "player": {"position": [5, 5], "hp": 20, "maxHp": 20, "attack": 5,
///                "defense": 3, "equippedWeapon": null, "equippedArmor": null},
///     "inventory": [],
///     "visibleTiles": [{"x": 5, "y": 4, "type": "floor", "items": []}],
///     "messages": []
/// }"#;
/// let observation: Observation = serde_json::from_str(json).unwrap();
/// assert!(observation.can_move(Direction::North));
/// assert!(observation.nearest_monster().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub turn: u32,
    pub floor: u32,
    pub player: Player,
    pub inventory: Vec<InventoryItem>,
    pub visible_tiles: Vec<VisibleTile>,
    /// Game log lines for this turn, oldest first.
    pub messages: Vec<String>,
}

impl Observation {
    /// Returns the visible tile at `(x, y)`, or `None` if it is not visible.
    pub fn tile_at(&self, x: i32, y: i32) -> Option<&VisibleTile> {
        self.visible_tiles
            .iter()
            .find(|tile| tile.x == x && tile.y == y)
    }

    /// Returns every visible tile holding a monster, with that monster.
    pub fn monsters(&self) -> Vec<(&VisibleTile, &Monster)> {
        self.visible_tiles
            .iter()
            .filter_map(|tile| tile.monster.as_ref().map(|monster| (tile, monster)))
            .collect()
    }

    /// Returns the closest visible monster by Manhattan distance.
    ///
    /// When several monsters are at the same distance the one with the
    /// lexicographically smallest `(x, y)` wins, so the answer does not
    /// depend on the order the server listed the tiles in.
    pub fn nearest_monster(&self) -> Option<(&VisibleTile, &Monster)> {
        let (px, py) = self.player.position;
        self.monsters().into_iter().min_by_key(|(tile, _)| {
            let distance = (tile.x - px).abs() + (tile.y - py).abs();
            (distance, tile.x, tile.y)
        })
    }

    /// Items lying on the tile the player stands on.
    pub fn items_at_feet(&self) -> &[String] {
        let (px, py) = self.player.position;
        self.tile_at(px, py)
            .map(|tile| tile.items.as_slice())
            .unwrap_or_default()
    }

    /// Whether the inventory holds an item with this name, ignoring case.
    pub fn has_item(&self, name: &str) -> bool {
        self.inventory
            .iter()
            .any(|item| item.name.eq_ignore_ascii_case(name))
    }

    /// Whether one step in `direction` lands on a visible, walkable and
    /// unoccupied tile.
    pub fn can_move(&self, direction: Direction) -> bool {
        let (px, py) = self.player.position;
        let (dx, dy) = direction.offset();
        match self.tile_at(px + dx, py + dy) {
            Some(tile) => tile.monster.is_none() && tile.tile_type.is_walkable(),
            None => false,
        }
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let player = &self.player;
        let item_count: usize = self.visible_tiles.iter().map(|t| t.items.len()).sum();
        let inventory = if self.inventory.is_empty() {
            "empty".to_owned()
        } else {
            self.inventory
                .iter()
                .map(|item| item.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };

        writeln!(
            f,
            "Turn {} | Floor {} | HP {}/{} | Pos ({},{})",
            self.turn, self.floor, player.hp, player.max_hp, player.position.0, player.position.1
        )?;
        writeln!(f, "Inventory: {}", inventory)?;
        write!(
            f,
            "Visible: {} monsters, {} items",
            self.monsters().len(),
            item_count
        )?;
        if let Some(last) = self.messages.last() {
            write!(f, "\nMessages: \"{}\"", last)?;
        }
        Ok(())
    }
}
