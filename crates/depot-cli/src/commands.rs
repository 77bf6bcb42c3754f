//! Subcommand handlers. Each takes the shared [`Services`] by reference.

use std::str::FromStr;

use anyhow::{Context as _, Result, anyhow, bail};
use chrono::Utc;
use depot_core::{
  kv::keys,
  storage::{Category, EquipmentCategory, Family, FurnitureCategory, Item, Storage},
};
use depot_memory::ProfileUpdate;
use depot_net::{
  check,
  readiness::{FixedAnswer, Readiness, ReadinessGate, request_notifications},
  redirect::RedirectAction,
};
use serde::Serialize;
use strum::IntoEnumIterator;
use uuid::Uuid;

use crate::{ItemCommand, ItemFields, ProfileCommand, StorageCommand, services::Services};

/// Run a generic handler for the collection `family` names.
macro_rules! for_family {
  ($family:expr, $handler:ident($($arg:expr),* $(,)?)) => {
    match $family {
      Family::Furniture => $handler::<FurnitureCategory>($($arg),*).await,
      Family::Equipment => $handler::<EquipmentCategory>($($arg),*).await,
    }
  };
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

fn parse_category<C: Category + FromStr>(raw: &str) -> Result<C> {
  raw.parse().map_err(|_| {
    let known: Vec<_> = C::iter().map(|c| c.display_name()).collect();
    anyhow!(
      "unknown {:?} category {raw:?} (expected one of: {})",
      C::FAMILY,
      known.join(", ")
    )
  })
}

// ─── Onboarding ──────────────────────────────────────────────────────────────

pub async fn onboard(services: &Services, device_token: Option<&str>) -> Result<()> {
  if let Some(token) = device_token {
    let bytes = hex::decode(token).context("device token is not valid hex")?;
    check::save_device_token(&services.prefs, &bytes).await?;
  }

  let resolver = services.resolver()?;
  let prompt = FixedAnswer(services.settings.grant_notifications);
  let gate = ReadinessGate::new(|readiness: Readiness| {
    println!(
      "notifications: {}, addresses: {}",
      if readiness.notifications_granted { "granted" } else { "denied" },
      if readiness.addresses_resolved { "resolved" } else { "unavailable" },
    );
  });

  gate
    .run(request_notifications(&prompt, &services.prefs), async {
      match resolver.resolve().await {
        Ok(resolution) => resolution.any(),
        Err(e) => {
          tracing::warn!(error = %e, "address resolution failed");
          false
        }
      }
    })
    .await;

  let check_url = check::check_url(&services.prefs, services.net()).await?;
  let flow = services.redirect_flow();
  let action = match flow
    .run_check(&services.fetcher, check_url.as_str(), Utc::now())
    .await?
  {
    RedirectAction::None => flow.resume().await?,
    action => action,
  };
  flow.follow(&services.fetcher, action).await?;

  let mut memory = services.memory().await?;
  memory.complete_onboarding().await?;

  print_json(&flow.state().await?.phase())
}

// ─── Addresses ───────────────────────────────────────────────────────────────

pub async fn ip(services: &Services, refresh: bool) -> Result<()> {
  if refresh {
    let resolution = services.resolver()?.resolve().await?;
    for (family, resolved) in [("ipv4", resolution.ipv4), ("ipv6", resolution.ipv6)] {
      match resolved {
        Some(r) => println!("{family}: {} ({:?})", r.address, r.source),
        None => println!("{family}: -"),
      }
    }
    return Ok(());
  }

  for (family, key) in [("ipv4", keys::IPV4), ("ipv6", keys::IPV6)] {
    let cached = services.prefs.non_empty_string(key).await?;
    println!("{family}: {}", cached.as_deref().unwrap_or("-"));
  }
  Ok(())
}

// ─── Storages ────────────────────────────────────────────────────────────────

pub async fn storage(services: &Services, cmd: StorageCommand) -> Result<()> {
  match cmd {
    StorageCommand::Add {
      family,
      name,
      location,
      description,
    } => for_family!(family, add_storage(services, name, location, description)),
    StorageCommand::List { family } => {
      let families = match family {
        Some(family) => vec![family],
        None => vec![Family::Furniture, Family::Equipment],
      };
      for family in families {
        for_family!(family, list_storages(services))?;
      }
      Ok(())
    }
    StorageCommand::Show { family, id } => for_family!(family, show_storage(services, id)),
    StorageCommand::Rename {
      family,
      id,
      name,
      location,
    } => for_family!(family, rename_storage(services, id, name, location)),
    StorageCommand::Delete { family, id } => for_family!(family, delete_storage(services, id)),
  }
}

async fn add_storage<C: Category>(
  services: &Services,
  name: String,
  location: String,
  description: String,
) -> Result<()> {
  let mut memory = services.memory().await?;
  let storage = Storage::<C>::new(name, location, description);
  let id = storage.id;
  memory.add_storage(storage).await?;
  println!("{id}");
  Ok(())
}

async fn list_storages<C: Category>(services: &Services) -> Result<()> {
  let memory = services.memory().await?;
  for s in memory.storages::<C>() {
    println!(
      "{}  {:<9}  {} @ {}  ({} items, {:.2})",
      s.id,
      format!("{:?}", C::FAMILY).to_lowercase(),
      s.name,
      s.location,
      s.total_quantity(),
      s.total_value()
    );
  }
  Ok(())
}

async fn show_storage<C: Category>(services: &Services, id: Uuid) -> Result<()> {
  let memory = services.memory().await?;
  let storage = memory
    .storage::<C>(id)
    .ok_or_else(|| anyhow!("no {:?} storage {id}", C::FAMILY))?;
  print_json(storage)
}

async fn rename_storage<C: Category>(
  services: &Services,
  id: Uuid,
  name: String,
  location: Option<String>,
) -> Result<()> {
  let mut memory = services.memory().await?;
  let mut storage = memory
    .storage::<C>(id)
    .cloned()
    .ok_or_else(|| anyhow!("no {:?} storage {id}", C::FAMILY))?;
  storage.name = name;
  if let Some(location) = location {
    storage.location = location;
  }
  memory.update_storage(storage).await?;
  Ok(())
}

async fn delete_storage<C: Category>(services: &Services, id: Uuid) -> Result<()> {
  let mut memory = services.memory().await?;
  if !memory.delete_storage::<C>(id).await? {
    println!("no {:?} storage {id}; nothing deleted", C::FAMILY);
  }
  Ok(())
}

// ─── Items ───────────────────────────────────────────────────────────────────

fn apply_fields<C: Category>(mut item: Item<C>, fields: ItemFields) -> Item<C> {
  if let Some(model) = fields.model {
    item.model = Some(model).filter(|m| !m.is_empty());
  }
  if let Some(condition) = fields.condition {
    item.condition = condition;
  }
  if let Some(quantity) = fields.quantity {
    item.quantity = quantity;
  }
  if let Some(value) = fields.value {
    item.value = value;
  }
  if let Some(notes) = fields.notes {
    item.notes = notes;
  }
  if let Some(emoji) = fields.emoji {
    item.emoji = emoji;
  }
  item
}

pub async fn item(services: &Services, cmd: ItemCommand) -> Result<()> {
  match cmd {
    ItemCommand::Add {
      family,
      storage,
      name,
      category,
      fields,
    } => for_family!(family, add_item(services, storage, name, &category, fields)),
    ItemCommand::Update {
      family,
      storage,
      item,
      name,
      category,
      fields,
    } => for_family!(
      family,
      update_item(services, storage, item, name, category.as_deref(), fields)
    ),
    ItemCommand::Remove {
      family,
      storage,
      item,
    } => for_family!(family, remove_item(services, storage, item)),
  }
}

async fn add_item<C>(
  services: &Services,
  storage: Uuid,
  name: String,
  category: &str,
  fields: ItemFields,
) -> Result<()>
where
  C: Category + FromStr,
{
  let mut memory = services.memory().await?;
  let item = apply_fields(Item::new(name, parse_category::<C>(category)?), fields);
  let id = item.id;
  memory.add_item(storage, item).await?;
  println!("{id}");
  Ok(())
}

async fn update_item<C>(
  services: &Services,
  storage: Uuid,
  item_id: Uuid,
  name: Option<String>,
  category: Option<&str>,
  fields: ItemFields,
) -> Result<()>
where
  C: Category + FromStr,
{
  let mut memory = services.memory().await?;
  let Some(existing) = memory.items::<C>(storage).iter().find(|i| i.id == item_id) else {
    bail!("item {item_id} not found in {:?} storage {storage}", C::FAMILY);
  };

  let mut item = apply_fields(existing.clone(), fields);
  if let Some(name) = name {
    item.name = name;
  }
  if let Some(category) = category {
    item.category = parse_category(category)?;
  }
  memory.update_item(storage, item).await?;
  Ok(())
}

async fn remove_item<C: Category>(services: &Services, storage: Uuid, item: Uuid) -> Result<()> {
  let mut memory = services.memory().await?;
  if !memory.remove_item::<C>(storage, item).await? {
    println!("no item {item} in {:?} storage {storage}; nothing removed", C::FAMILY);
  }
  Ok(())
}

// ─── Stats & achievements ────────────────────────────────────────────────────

pub async fn stats(services: &Services, storage: Option<(Family, Uuid)>) -> Result<()> {
  let memory = services.memory().await?;
  let Some((family, id)) = storage else {
    return print_json(&memory.global_stats());
  };
  let stats = match family {
    Family::Furniture => memory.storage_stats::<FurnitureCategory>(id),
    Family::Equipment => memory.storage_stats::<EquipmentCategory>(id),
  };
  print_json(&stats.ok_or_else(|| anyhow!("no {family:?} storage {id}"))?)
}

pub async fn achievements(services: &Services, check: bool) -> Result<()> {
  let mut memory = services.memory().await?;
  if check {
    for id in memory.check_and_unlock_achievements().await? {
      println!("unlocked: {id}");
    }
  }

  for a in memory.achievements() {
    println!(
      "[{}] {} {:<16} {:>4} pts  {}",
      if a.is_unlocked { "x" } else { " " },
      a.emoji,
      a.title,
      a.points,
      a.description
    );
  }
  println!("total points: {}", memory.total_points());
  Ok(())
}

// ─── Profile ─────────────────────────────────────────────────────────────────

pub async fn profile(services: &Services, cmd: ProfileCommand) -> Result<()> {
  let profiles = services.profiles();
  match cmd {
    ProfileCommand::Show => print_json(&profiles.load().await?),
    ProfileCommand::Set {
      name,
      age,
      position,
    } => {
      let profile = profiles
        .update(ProfileUpdate {
          name,
          age,
          position,
        })
        .await?;
      print_json(&profile)
    }
    ProfileCommand::Reset { all } => {
      profiles.reset().await?;
      if all {
        services.memory().await?.clear_storages().await?;
      }
      Ok(())
    }
    ProfileCommand::Photo { path, delete } => {
      if delete {
        profiles.delete_photo().await?;
        return Ok(());
      }
      if let Some(path) = path {
        let bytes = tokio::fs::read(&path)
          .await
          .with_context(|| format!("failed to read {}", path.display()))?;
        return print_json(&profiles.save_photo(&bytes).await?);
      }
      match profiles.load_photo().await? {
        Some(bytes) => println!(
          "{} ({} bytes)",
          profiles.photo_path().display(),
          bytes.len()
        ),
        None => println!("no profile photo"),
      }
      Ok(())
    }
  }
}

// ─── Redirect ────────────────────────────────────────────────────────────────

pub async fn redirect(services: &Services) -> Result<()> {
  let state = services.redirect_flow().state().await?;
  print_json(&state.phase())
}
