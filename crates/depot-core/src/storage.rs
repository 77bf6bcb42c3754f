//! Storages and items: the user's catalogue of office furniture and
//! equipment.
//!
//! Both families share one shape. [`Storage`] and [`Item`] are generic over a
//! [`Category`], and the category type decides which collection and which
//! persisted key a value belongs to.

use std::{fmt::Debug, hash::Hash};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use strum::{EnumIter, EnumString, IntoEnumIterator};
use uuid::Uuid;

use crate::{Error, Result, kv::keys};

// ─── Families ────────────────────────────────────────────────────────────────

/// The two parallel collection families.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Family {
  Furniture,
  Equipment,
}

// ─── Condition ───────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  EnumIter,
  EnumString,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum Condition {
  #[default]
  #[serde(rename = "New")]
  New,
  #[serde(rename = "Used")]
  Used,
  #[serde(rename = "Needs Repair")]
  NeedsRepair,
}

impl Condition {
  pub fn display_name(self) -> &'static str {
    match self {
      Self::New => "New",
      Self::Used => "Used",
      Self::NeedsRepair => "Needs Repair",
    }
  }
}

// ─── Categories ──────────────────────────────────────────────────────────────

/// Both collections, held side by side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shelves {
  pub furniture: Vec<FurnitureStorage>,
  pub equipment: Vec<EquipmentStorage>,
}

impl Shelves {
  pub fn storage_count(&self) -> usize {
    self.furniture.len() + self.equipment.len()
  }
}

/// A family-specific closed set of item categories.
///
/// Implementors route generic storage operations to their own collection in
/// [`Shelves`] and name the key their collection is persisted under.
pub trait Category:
  Copy
  + Eq
  + Hash
  + Debug
  + Serialize
  + DeserializeOwned
  + IntoEnumIterator
  + Send
  + Sync
  + 'static
{
  const FAMILY: Family;

  /// Preference key holding the serialised collection for this family.
  const STORAGE_KEY: &'static str;

  fn display_name(self) -> &'static str;

  fn emoji(self) -> &'static str;

  fn shelf(shelves: &Shelves) -> &[Storage<Self>];

  fn shelf_mut(shelves: &mut Shelves) -> &mut Vec<Storage<Self>>;
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  EnumIter,
  EnumString,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum FurnitureCategory {
  #[serde(rename = "Chairs")]
  Chairs,
  #[serde(rename = "Desks")]
  Desks,
  #[serde(rename = "Storage")]
  Storage,
  #[serde(rename = "Tables")]
  Tables,
  #[serde(rename = "Other")]
  Other,
}

impl Category for FurnitureCategory {
  const FAMILY: Family = Family::Furniture;
  const STORAGE_KEY: &'static str = keys::FURNITURE_STORAGE;

  fn display_name(self) -> &'static str {
    match self {
      Self::Chairs => "Chairs",
      Self::Desks => "Desks",
      Self::Storage => "Storage",
      Self::Tables => "Tables",
      Self::Other => "Other",
    }
  }

  fn emoji(self) -> &'static str {
    match self {
      Self::Chairs => "🪑",
      Self::Desks => "🪚",
      Self::Storage => "🗄️",
      Self::Tables => "🪞",
      Self::Other => "📦",
    }
  }

  fn shelf(shelves: &Shelves) -> &[Storage<Self>] { &shelves.furniture }

  fn shelf_mut(shelves: &mut Shelves) -> &mut Vec<Storage<Self>> {
    &mut shelves.furniture
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  EnumIter,
  EnumString,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum EquipmentCategory {
  #[serde(rename = "Computers")]
  Computers,
  #[serde(rename = "Electronics")]
  Electronics,
  #[serde(rename = "Office Supplies")]
  OfficeSupplies,
  #[serde(rename = "Equipment")]
  Equipment,
  #[serde(rename = "Other")]
  Other,
}

impl Category for EquipmentCategory {
  const FAMILY: Family = Family::Equipment;
  const STORAGE_KEY: &'static str = keys::EQUIPMENT_STORAGE;

  fn display_name(self) -> &'static str {
    match self {
      Self::Computers => "Computers",
      Self::Electronics => "Electronics",
      Self::OfficeSupplies => "Office Supplies",
      Self::Equipment => "Equipment",
      Self::Other => "Other",
    }
  }

  fn emoji(self) -> &'static str {
    match self {
      Self::Computers => "💻",
      Self::Electronics => "📱",
      Self::OfficeSupplies => "📋",
      Self::Equipment => "⚙️",
      Self::Other => "📦",
    }
  }

  fn shelf(shelves: &Shelves) -> &[Storage<Self>] { &shelves.equipment }

  fn shelf_mut(shelves: &mut Shelves) -> &mut Vec<Storage<Self>> {
    &mut shelves.equipment
  }
}

// ─── Item ────────────────────────────────────────────────────────────────────

/// A single catalogue entry, owned by exactly one [`Storage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item<C> {
  pub id:         Uuid,
  pub name:       String,
  #[serde(default)]
  pub model:      Option<String>,
  pub emoji:      String,
  pub category:   C,
  pub condition:  Condition,
  /// Expected to be at least 1; not enforced.
  pub quantity:   i64,
  /// Unit value. Expected to be non-negative; not enforced.
  pub value:      f64,
  #[serde(default)]
  pub notes:      String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl<C: Category> Item<C> {
  /// A new item with quantity 1, zero value, condition `New` and the
  /// category's emoji.
  pub fn new(name: impl Into<String>, category: C) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      name: name.into(),
      model: None,
      emoji: category.emoji().to_owned(),
      category,
      condition: Condition::default(),
      quantity: 1,
      value: 0.0,
      notes: String::new(),
      created_at: now,
      updated_at: now,
    }
  }

  pub fn with_model(mut self, model: impl Into<String>) -> Self {
    self.model = Some(model.into());
    self
  }

  pub fn with_condition(mut self, condition: Condition) -> Self {
    self.condition = condition;
    self
  }

  pub fn with_quantity(mut self, quantity: i64) -> Self {
    self.quantity = quantity;
    self
  }

  pub fn with_value(mut self, value: f64) -> Self {
    self.value = value;
    self
  }

  pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
    self.notes = notes.into();
    self
  }

  pub fn with_emoji(mut self, emoji: impl Into<String>) -> Self {
    self.emoji = emoji.into();
    self
  }

  /// `value × quantity`.
  pub fn total_value(&self) -> f64 { self.value * self.quantity as f64 }
}

// ─── Storage ─────────────────────────────────────────────────────────────────

/// A user-named collection of items of one family.
///
/// `id` never changes after creation. `updated_at` strictly advances on every
/// item mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Storage<C> {
  pub id:          Uuid,
  pub name:        String,
  pub location:    String,
  #[serde(default)]
  pub description: String,
  #[serde(default = "Vec::new")]
  pub items:       Vec<Item<C>>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

pub type FurnitureStorage = Storage<FurnitureCategory>;
pub type EquipmentStorage = Storage<EquipmentCategory>;
pub type FurnitureItem = Item<FurnitureCategory>;
pub type EquipmentItem = Item<EquipmentCategory>;

impl<C: Category> Storage<C> {
  pub fn new(
    name: impl Into<String>,
    location: impl Into<String>,
    description: impl Into<String>,
  ) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      name: name.into(),
      location: location.into(),
      description: description.into(),
      items: Vec::new(),
      created_at: now,
      updated_at: now,
    }
  }

  pub fn item(&self, item_id: Uuid) -> Option<&Item<C>> {
    self.items.iter().find(|i| i.id == item_id)
  }

  pub fn add_item(&mut self, item: Item<C>) {
    self.items.push(item);
    self.touch();
  }

  /// Remove an item. Returns `false` (and leaves `updated_at` alone) if the
  /// item was not present.
  pub fn remove_item(&mut self, item_id: Uuid) -> bool {
    let before = self.items.len();
    self.items.retain(|i| i.id != item_id);
    let removed = self.items.len() != before;
    if removed {
      self.touch();
    }
    removed
  }

  /// Replace the item with the same id.
  pub fn update_item(&mut self, mut item: Item<C>) -> Result<()> {
    let storage = self.id;
    let slot = self
      .items
      .iter_mut()
      .find(|i| i.id == item.id)
      .ok_or(Error::ItemNotFound { storage, item: item.id })?;
    item.created_at = slot.created_at;
    item.updated_at = Utc::now();
    *slot = item;
    self.touch();
    Ok(())
  }

  /// Sum of item quantities.
  pub fn total_quantity(&self) -> i64 {
    self.items.iter().map(|i| i.quantity).sum()
  }

  /// Sum of `value × quantity` over all items.
  pub fn total_value(&self) -> f64 {
    self.items.iter().map(Item::total_value).sum()
  }

  fn touch(&mut self) {
    let now = Utc::now();
    self.updated_at = if now > self.updated_at {
      now
    } else {
      self.updated_at + Duration::nanoseconds(1)
    };
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn new_item_takes_category_emoji_and_defaults() {
    let item = Item::new("Aeron", FurnitureCategory::Chairs);
    assert_eq!(item.emoji, "🪑");
    assert_eq!(item.quantity, 1);
    assert_eq!(item.condition, Condition::New);
    assert!(item.model.is_none());
  }

  #[test]
  fn item_mutations_advance_updated_at() {
    let mut storage = FurnitureStorage::new("Conference Room A", "3rd Floor", "");
    let first = storage.updated_at;

    let item = Item::new("Chair", FurnitureCategory::Chairs);
    let item_id = item.id;
    storage.add_item(item);
    let after_add = storage.updated_at;
    assert!(after_add > first);

    let changed = storage.item(item_id).unwrap().clone().with_quantity(4);
    storage.update_item(changed).unwrap();
    assert!(storage.updated_at > after_add);
    assert_eq!(storage.item(item_id).unwrap().quantity, 4);

    let after_update = storage.updated_at;
    assert!(storage.remove_item(item_id));
    assert!(storage.updated_at > after_update);
  }

  #[test]
  fn removing_missing_item_is_a_no_op() {
    let mut storage = EquipmentStorage::new("IT closet", "Basement", "");
    let before = storage.updated_at;
    assert!(!storage.remove_item(Uuid::new_v4()));
    assert_eq!(storage.updated_at, before);
  }

  #[test]
  fn update_missing_item_is_reported() {
    let mut storage = EquipmentStorage::new("IT closet", "Basement", "");
    let stray = Item::new("Laptop", EquipmentCategory::Computers);
    let err = storage.update_item(stray).unwrap_err();
    assert!(err.is_not_found());
    assert!(storage.items.is_empty());
  }

  #[test]
  fn totals_weight_value_by_quantity() {
    let mut storage = EquipmentStorage::new("IT closet", "Basement", "");
    storage.add_item(
      Item::new("Monitor", EquipmentCategory::Electronics)
        .with_quantity(3)
        .with_value(150.0),
    );
    storage.add_item(
      Item::new("Laptop", EquipmentCategory::Computers).with_value(1200.0),
    );
    assert_eq!(storage.total_quantity(), 4);
    assert_eq!(storage.total_value(), 1650.0);
  }

  #[test]
  fn categories_serialise_by_display_name() {
    let json = serde_json::to_string(&EquipmentCategory::OfficeSupplies).unwrap();
    assert_eq!(json, "\"Office Supplies\"");
    let json = serde_json::to_string(&Condition::NeedsRepair).unwrap();
    assert_eq!(json, "\"Needs Repair\"");
    let parsed: EquipmentCategory = "office-supplies".parse().unwrap();
    assert_eq!(parsed, EquipmentCategory::OfficeSupplies);
  }
}
