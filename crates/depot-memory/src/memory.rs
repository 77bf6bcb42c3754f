//! [`UserMemory`]: both storage collections plus the achievement catalogue.

use std::collections::HashSet;

use chrono::Utc;
use depot_core::{
  achievement::{Achievement, AchievementCategory, Metric, default_catalog},
  kv::{KeyValueStore, Preferences, keys},
  storage::{
    Category, Condition, EquipmentCategory, FurnitureCategory, Item, Shelves, Storage,
  },
};
use serde::Serialize;
use uuid::Uuid;

use crate::Result;

/// Aggregates over one storage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageStats {
  pub total_items:     i64,
  pub total_value:     f64,
  pub new_items:       i64,
  pub used_items:      i64,
  pub item_categories: usize,
}

/// Aggregates over every storage of both families.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalStats {
  pub total_storages:            usize,
  pub total_items:               i64,
  pub total_value:               f64,
  pub new_items:                 i64,
  pub used_items:                i64,
  /// Integer division; zero when there are no storages.
  pub average_items_per_storage: i64,
}

/// In-memory model of the user's data, written through to `S` on every
/// mutation.
///
/// Each mutation rewrites the whole blob it touches. Aggregates are
/// recomputed by full traversal on every call.
pub struct UserMemory<S> {
  prefs:        Preferences<S>,
  shelves:      Shelves,
  achievements: Vec<Achievement>,
  total_points: i64,
  onboarded:    bool,
}

impl<S: KeyValueStore> UserMemory<S> {
  /// Load everything from `prefs`. Missing or undecodable collections load
  /// empty; a missing or undecodable catalogue is reseeded.
  pub async fn load(prefs: Preferences<S>) -> Result<Self> {
    let shelves = Shelves {
      furniture: prefs
        .json(FurnitureCategory::STORAGE_KEY)
        .await?
        .unwrap_or_default(),
      equipment: prefs
        .json(EquipmentCategory::STORAGE_KEY)
        .await?
        .unwrap_or_default(),
    };

    let achievements = match prefs.json::<Vec<Achievement>>(keys::ACHIEVEMENTS).await? {
      Some(catalog) => catalog,
      None => {
        let catalog = default_catalog();
        prefs.set_json(keys::ACHIEVEMENTS, &catalog).await?;
        tracing::info!("seeded achievement catalogue");
        catalog
      }
    };

    let total_points = prefs.int(keys::TOTAL_POINTS).await?;
    let onboarded = prefs.bool(keys::ONBOARDING_COMPLETED).await?;

    tracing::debug!(
      furniture = shelves.furniture.len(),
      equipment = shelves.equipment.len(),
      total_points,
      "loaded user memory"
    );

    Ok(Self {
      prefs,
      shelves,
      achievements,
      total_points,
      onboarded,
    })
  }

  async fn save_shelf<C: Category>(&self) -> Result<()> {
    self
      .prefs
      .set_json(C::STORAGE_KEY, C::shelf(&self.shelves))
      .await?;
    Ok(())
  }

  fn shelf_mut<C: Category>(&mut self) -> &mut Vec<Storage<C>> {
    C::shelf_mut(&mut self.shelves)
  }

  fn storage_mut<C: Category>(&mut self, id: Uuid) -> Result<&mut Storage<C>> {
    self
      .shelf_mut::<C>()
      .iter_mut()
      .find(|s| s.id == id)
      .ok_or_else(|| depot_core::Error::StorageNotFound(id).into())
  }

  // ─── Storages ──────────────────────────────────────────────────────────────

  pub fn storages<C: Category>(&self) -> &[Storage<C>] { C::shelf(&self.shelves) }

  pub fn storage<C: Category>(&self, id: Uuid) -> Option<&Storage<C>> {
    self.storages::<C>().iter().find(|s| s.id == id)
  }

  pub fn shelves(&self) -> &Shelves { &self.shelves }

  pub async fn add_storage<C: Category>(&mut self, storage: Storage<C>) -> Result<()> {
    tracing::info!(id = %storage.id, family = ?C::FAMILY, name = %storage.name, "adding storage");
    self.shelf_mut::<C>().push(storage);
    self.save_shelf::<C>().await
  }

  /// Replace the storage with the same id. Its `created_at` is kept.
  pub async fn update_storage<C: Category>(&mut self, mut storage: Storage<C>) -> Result<()> {
    let slot = self.storage_mut::<C>(storage.id)?;
    storage.created_at = slot.created_at;
    storage.updated_at = Utc::now().max(slot.updated_at);
    *slot = storage;
    self.save_shelf::<C>().await
  }

  /// Delete a storage and its items. Returns whether anything was removed.
  pub async fn delete_storage<C: Category>(&mut self, id: Uuid) -> Result<bool> {
    let shelf = self.shelf_mut::<C>();
    let before = shelf.len();
    shelf.retain(|s| s.id != id);
    if shelf.len() == before {
      return Ok(false);
    }
    tracing::info!(%id, family = ?C::FAMILY, "deleted storage");
    self.save_shelf::<C>().await?;
    Ok(true)
  }

  /// Delete every storage of both families.
  pub async fn clear_storages(&mut self) -> Result<()> {
    self.shelves = Shelves::default();
    self.save_shelf::<FurnitureCategory>().await?;
    self.save_shelf::<EquipmentCategory>().await
  }

  // ─── Items ─────────────────────────────────────────────────────────────────

  /// Items of a storage; empty if the storage does not exist.
  pub fn items<C: Category>(&self, storage_id: Uuid) -> &[Item<C>] {
    self
      .storage::<C>(storage_id)
      .map(|s| s.items.as_slice())
      .unwrap_or_default()
  }

  pub async fn add_item<C: Category>(&mut self, storage_id: Uuid, item: Item<C>) -> Result<()> {
    self.storage_mut::<C>(storage_id)?.add_item(item);
    self.save_shelf::<C>().await
  }

  pub async fn update_item<C: Category>(&mut self, storage_id: Uuid, item: Item<C>) -> Result<()> {
    self
      .storage_mut::<C>(storage_id)?
      .update_item(item)?;
    self.save_shelf::<C>().await
  }

  /// Remove an item. Returns whether anything was removed; a missing storage
  /// counts as nothing removed.
  pub async fn remove_item<C: Category>(&mut self, storage_id: Uuid, item_id: Uuid) -> Result<bool> {
    let removed = match self.storage_mut::<C>(storage_id) {
      Ok(storage) => storage.remove_item(item_id),
      Err(_) => false,
    };
    if removed {
      self.save_shelf::<C>().await?;
    }
    Ok(removed)
  }

  // ─── Queries ───────────────────────────────────────────────────────────────

  fn all_items<C: Category>(&self) -> impl Iterator<Item = &Item<C>> {
    self.storages::<C>().iter().flat_map(|s| s.items.iter())
  }

  pub fn items_by_category<C: Category>(&self, category: C) -> Vec<&Item<C>> {
    self.all_items::<C>().filter(|i| i.category == category).collect()
  }

  pub fn items_by_condition<C: Category>(&self, condition: Condition) -> Vec<&Item<C>> {
    self.all_items::<C>().filter(|i| i.condition == condition).collect()
  }

  /// Sum of item quantities across both families.
  pub fn total_item_count(&self) -> i64 {
    self.family_count::<FurnitureCategory>() + self.family_count::<EquipmentCategory>()
  }

  /// Sum of `value × quantity` across both families.
  pub fn total_item_value(&self) -> f64 {
    self.family_value::<FurnitureCategory>() + self.family_value::<EquipmentCategory>()
  }

  fn family_count<C: Category>(&self) -> i64 {
    self.all_items::<C>().map(|i| i.quantity).sum()
  }

  fn family_value<C: Category>(&self) -> f64 {
    self.all_items::<C>().map(Item::total_value).sum()
  }

  fn family_condition_count<C: Category>(&self, condition: Condition) -> i64 {
    self
      .all_items::<C>()
      .filter(|i| i.condition == condition)
      .map(|i| i.quantity)
      .sum()
  }

  fn distinct_categories<C: Category>(&self) -> usize {
    self.all_items::<C>().map(|i| i.category).collect::<HashSet<_>>().len()
  }

  pub fn storage_stats<C: Category>(&self, id: Uuid) -> Option<StorageStats> {
    let storage = self.storage::<C>(id)?;
    let by_condition = |condition: Condition| -> i64 {
      storage
        .items
        .iter()
        .filter(|i| i.condition == condition)
        .map(|i| i.quantity)
        .sum()
    };
    Some(StorageStats {
      total_items:     storage.total_quantity(),
      total_value:     storage.total_value(),
      new_items:       by_condition(Condition::New),
      used_items:      by_condition(Condition::Used),
      item_categories: storage
        .items
        .iter()
        .map(|i| i.category)
        .collect::<HashSet<_>>()
        .len(),
    })
  }

  pub fn global_stats(&self) -> GlobalStats {
    let total_storages = self.shelves.storage_count();
    let total_items = self.total_item_count();
    let condition_count = |condition: Condition| {
      self.family_condition_count::<FurnitureCategory>(condition)
        + self.family_condition_count::<EquipmentCategory>(condition)
    };
    GlobalStats {
      total_storages,
      total_items,
      total_value: self.total_item_value(),
      new_items: condition_count(Condition::New),
      used_items: condition_count(Condition::Used),
      average_items_per_storage: match total_storages {
        0 => 0,
        n => total_items / n as i64,
      },
    }
  }

  // ─── Achievements ──────────────────────────────────────────────────────────

  fn meets(&self, metric: Metric, requirement: i64) -> bool {
    let storages = self.shelves.storage_count() as i64;
    match metric {
      Metric::StorageCount => storages >= requirement,
      Metric::ItemCount => self.total_item_count() >= requirement,
      Metric::TotalValue => self.total_item_value() >= requirement as f64,
      Metric::DistinctCategories => {
        let distinct = self.distinct_categories::<FurnitureCategory>()
          + self.distinct_categories::<EquipmentCategory>();
        distinct as i64 >= requirement
      }
      Metric::ItemsPerStorage => {
        storages > 0 && self.total_item_count() / storages >= requirement
      }
    }
  }

  /// Unlock every locked achievement whose requirement is now met and award
  /// its points. Returns the ids unlocked by this call. Already-unlocked
  /// records are never touched, so repeated calls are harmless.
  pub async fn check_and_unlock_achievements(&mut self) -> Result<Vec<String>> {
    let due: Vec<usize> = self
      .achievements
      .iter()
      .enumerate()
      .filter(|(_, a)| {
        !a.is_unlocked && a.metric().is_some_and(|m| self.meets(m, a.requirement))
      })
      .map(|(index, _)| index)
      .collect();

    if due.is_empty() {
      return Ok(Vec::new());
    }

    let now = Utc::now();
    let mut unlocked = Vec::with_capacity(due.len());
    for index in due {
      let achievement = &mut self.achievements[index];
      achievement.is_unlocked = true;
      achievement.unlocked_at = Some(now);
      self.total_points += achievement.points;
      tracing::info!(id = %achievement.id, points = achievement.points, "achievement unlocked");
      unlocked.push(achievement.id.clone());
    }

    self
      .prefs
      .set_json(keys::ACHIEVEMENTS, &self.achievements)
      .await?;
    self
      .prefs
      .set_int(keys::TOTAL_POINTS, self.total_points)
      .await?;
    Ok(unlocked)
  }

  pub fn achievements(&self) -> &[Achievement] { &self.achievements }

  pub fn unlocked_achievements(&self) -> Vec<&Achievement> {
    self.achievements.iter().filter(|a| a.is_unlocked).collect()
  }

  pub fn locked_achievements(&self) -> Vec<&Achievement> {
    self.achievements.iter().filter(|a| !a.is_unlocked).collect()
  }

  pub fn achievements_by_category(&self, category: AchievementCategory) -> Vec<&Achievement> {
    self
      .achievements
      .iter()
      .filter(|a| a.category == category)
      .collect()
  }

  pub fn total_points(&self) -> i64 { self.total_points }

  // ─── Onboarding ────────────────────────────────────────────────────────────

  pub fn has_completed_onboarding(&self) -> bool { self.onboarded }

  pub async fn complete_onboarding(&mut self) -> Result<()> {
    self.set_onboarded(true).await
  }

  pub async fn reset_onboarding(&mut self) -> Result<()> {
    self.set_onboarded(false).await
  }

  async fn set_onboarded(&mut self, value: bool) -> Result<()> {
    self.prefs.set_bool(keys::ONBOARDING_COMPLETED, value).await?;
    self.onboarded = value;
    Ok(())
  }
}
