//! The user's profile: three text fields and an optional photo on disk.

use std::path::{Path, PathBuf};

use depot_core::kv::{KeyValueStore, Preferences, keys};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Error, Result};

pub const DEFAULT_NAME: &str = "Worker";
pub const DEFAULT_AGE: &str = "0";
pub const DEFAULT_POSITION: &str = "Office Manager";

const PHOTO_FILE: &str = "profile.png";

/// Where the profile photo lives and what it should hash to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRef {
  pub path:   PathBuf,
  /// Lowercase hex SHA-256 of the file contents.
  pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
  pub name:     String,
  pub age:      String,
  pub position: String,
  pub photo:    Option<PhotoRef>,
}

/// Fields to change; `None` leaves a field alone.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
  pub name:     Option<String>,
  pub age:      Option<String>,
  pub position: Option<String>,
}

pub struct ProfileStore<S> {
  prefs:     Preferences<S>,
  photo_dir: PathBuf,
}

fn digest(bytes: &[u8]) -> String { hex::encode(Sha256::digest(bytes)) }

impl<S: KeyValueStore> ProfileStore<S> {
  pub fn new(prefs: Preferences<S>, photo_dir: impl Into<PathBuf>) -> Self {
    Self {
      prefs,
      photo_dir: photo_dir.into(),
    }
  }

  pub fn photo_path(&self) -> PathBuf { self.photo_dir.join(PHOTO_FILE) }

  /// Unset fields read as their defaults.
  pub async fn load(&self) -> Result<Profile> {
    let field = |key: &'static str, default: &'static str| async move {
      Ok::<_, Error>(
        self
          .prefs
          .string(key)
          .await?
          .unwrap_or_else(|| default.to_owned()),
      )
    };

    Ok(Profile {
      name:     field(keys::PROFILE_NAME, DEFAULT_NAME).await?,
      age:      field(keys::PROFILE_AGE, DEFAULT_AGE).await?,
      position: field(keys::PROFILE_POSITION, DEFAULT_POSITION).await?,
      photo:    self.prefs.json(keys::PROFILE_PHOTO).await?,
    })
  }

  pub async fn update(&self, update: ProfileUpdate) -> Result<Profile> {
    let fields = [
      (keys::PROFILE_NAME, update.name),
      (keys::PROFILE_AGE, update.age),
      (keys::PROFILE_POSITION, update.position),
    ];
    for (key, value) in fields {
      if let Some(value) = value {
        self.prefs.set_string(key, value).await?;
      }
    }
    self.load().await
  }

  /// Forget every field and delete the photo.
  pub async fn reset(&self) -> Result<()> {
    for key in [keys::PROFILE_NAME, keys::PROFILE_AGE, keys::PROFILE_POSITION] {
      self.prefs.remove(key).await?;
    }
    self.delete_photo().await?;
    tracing::info!("profile reset");
    Ok(())
  }

  /// Write `bytes` as the profile photo, replacing any previous one.
  pub async fn save_photo(&self, bytes: &[u8]) -> Result<PhotoRef> {
    tokio::fs::create_dir_all(&self.photo_dir)
      .await
      .map_err(|e| Error::io(&self.photo_dir, e))?;

    let path = self.photo_path();
    tokio::fs::write(&path, bytes)
      .await
      .map_err(|e| Error::io(&path, e))?;

    let photo = PhotoRef {
      path,
      sha256: digest(bytes),
    };
    self.prefs.set_json(keys::PROFILE_PHOTO, &photo).await?;
    tracing::info!(path = %photo.path.display(), sha256 = %photo.sha256, "saved profile photo");
    Ok(photo)
  }

  /// Read the photo back. A missing file, or one whose contents no longer
  /// match the recorded hash, reads as no photo.
  pub async fn load_photo(&self) -> Result<Option<Vec<u8>>> {
    let Some(photo) = self.prefs.json::<PhotoRef>(keys::PROFILE_PHOTO).await? else {
      return Ok(None);
    };
    let bytes = match tokio::fs::read(&photo.path).await {
      Ok(bytes) => bytes,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        tracing::warn!(path = %photo.path.display(), "profile photo missing");
        return Ok(None);
      }
      Err(e) => return Err(Error::io(&photo.path, e)),
    };
    if digest(&bytes) != photo.sha256 {
      tracing::warn!(path = %photo.path.display(), "profile photo does not match its hash");
      return Ok(None);
    }
    Ok(Some(bytes))
  }

  /// Delete the photo file and its record. Returns whether a file was
  /// removed.
  pub async fn delete_photo(&self) -> Result<bool> {
    let path = match self.prefs.json::<PhotoRef>(keys::PROFILE_PHOTO).await? {
      Some(photo) => photo.path,
      None => self.photo_path(),
    };
    self.prefs.remove(keys::PROFILE_PHOTO).await?;
    remove_if_present(&path).await
  }
}

async fn remove_if_present(path: &Path) -> Result<bool> {
  match tokio::fs::remove_file(path).await {
    Ok(()) => Ok(true),
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
    Err(e) => Err(Error::io(path, e)),
  }
}
