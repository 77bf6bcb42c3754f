//! The fixed achievement catalogue.
//!
//! The catalogue is seeded once. Records are never added or removed; only
//! their unlocked flag and timestamp change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::EnumIter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
pub enum AchievementCategory {
  Storage,
  Items,
  Value,
  Collection,
  Efficiency,
}

impl AchievementCategory {
  pub fn display_name(self) -> &'static str {
    match self {
      Self::Storage => "Storage Master",
      Self::Items => "Item Collector",
      Self::Value => "Value Expert",
      Self::Collection => "Collection Pro",
      Self::Efficiency => "Efficiency Guru",
    }
  }
}

/// The aggregate an achievement's requirement is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
  /// Furniture plus equipment storages.
  StorageCount,
  /// Sum of item quantities across both families.
  ItemCount,
  /// Sum of `value × quantity` across both families.
  TotalValue,
  /// Distinct furniture categories plus distinct equipment categories in use.
  DistinctCategories,
  /// `ItemCount / StorageCount` (integer division); never met with zero
  /// storages.
  ItemsPerStorage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
  /// Stable key, e.g. `"first_storage"`.
  pub id:          String,
  pub title:       String,
  pub description: String,
  pub emoji:       String,
  pub category:    AchievementCategory,
  pub requirement: i64,
  pub is_unlocked: bool,
  pub unlocked_at: Option<DateTime<Utc>>,
  pub points:      i64,
}

impl Achievement {
  fn seed(
    id: &str,
    title: &str,
    description: &str,
    emoji: &str,
    category: AchievementCategory,
    requirement: i64,
    points: i64,
  ) -> Self {
    Self {
      id: id.to_owned(),
      title: title.to_owned(),
      description: description.to_owned(),
      emoji: emoji.to_owned(),
      category,
      requirement,
      is_unlocked: false,
      unlocked_at: None,
      points,
    }
  }

  /// The aggregate this record is judged on. Unknown ids never unlock.
  pub fn metric(&self) -> Option<Metric> {
    match self.id.as_str() {
      "first_storage" | "storage_master" => Some(Metric::StorageCount),
      "first_item" | "item_collector" => Some(Metric::ItemCount),
      "value_expert" => Some(Metric::TotalValue),
      "collection_pro" => Some(Metric::DistinctCategories),
      "efficiency_guru" => Some(Metric::ItemsPerStorage),
      _ => None,
    }
  }
}

/// The seven catalogue records in display order, all locked.
pub fn default_catalog() -> Vec<Achievement> {
  use AchievementCategory as C;
  vec![
    Achievement::seed("first_storage", "First Storage", "Create your first storage", "📦", C::Storage, 1, 10),
    Achievement::seed("storage_master", "Storage Master", "Create 5 storages", "🏆", C::Storage, 5, 50),
    Achievement::seed("first_item", "First Item", "Add your first item", "✨", C::Items, 1, 15),
    Achievement::seed("item_collector", "Item Collector", "Add 20 items", "📚", C::Items, 20, 100),
    Achievement::seed("value_expert", "Value Expert", "Reach $1000 total value", "💰", C::Value, 1000, 75),
    Achievement::seed("collection_pro", "Collection Pro", "Have items in all categories", "🎯", C::Collection, 8, 150),
    Achievement::seed("efficiency_guru", "Efficiency Guru", "Have 10+ items per storage", "⚡", C::Efficiency, 10, 200),
  ]
}
