//! On-disk catalog and state files
//!
//! - The catalog is a read-only CSV file with columns `id,title,author,price`.
//! - The mutable state lives in a data directory as one generation
//!   directory holding `users.csv` (`id,handle,credential,token,balance,version`)
//!   and `ownership.csv` (`user,item`), plus a `CURRENT` file naming the
//!   live generation.
//!
//! Saving writes a complete new generation, then replaces `CURRENT` through
//! a temporary file and a rename. The two tables therefore switch together:
//! a crash at any point leaves `CURRENT` naming a generation whose files were
//! fully written. Referential integrity between the tables is checked by the
//! caller once both are loaded.

use crate::io::csv_format::{convert_catalog_record, CatalogCsvRecord};
use crate::types::{BookstoreError, Item, ItemId, User, UserId};
use csv::{ReaderBuilder, Trim};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::{Builder, NamedTempFile};

pub const USERS_FILE: &str = "users.csv";
pub const OWNERSHIP_FILE: &str = "ownership.csv";
pub const CURRENT_FILE: &str = "CURRENT";

const GENERATION_PREFIX: &str = "snapshot-";

/// Persisted bookstore state
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub users: Vec<User>,
    pub ownership: Vec<(UserId, ItemId)>,
}

#[derive(Debug, Serialize, Deserialize)]
struct UserRow {
    id: UserId,
    handle: String,
    credential: String,
    token: Option<String>,
    balance: String,
    version: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct OwnershipRow {
    user: UserId,
    item: ItemId,
}

impl From<&User> for UserRow {
    fn from(user: &User) -> Self {
        UserRow {
            id: user.id,
            handle: user.handle.clone(),
            credential: user.credential.clone(),
            token: user.token.clone(),
            balance: user.balance.to_string(),
            version: user.version,
        }
    }
}

impl TryFrom<UserRow> for User {
    type Error = BookstoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let balance = Decimal::from_str(&row.balance).map_err(|_| {
            BookstoreError::corrupt_snapshot(format!(
                "invalid balance '{}' for user {}",
                row.balance, row.id
            ))
        })?;
        if balance < Decimal::ZERO {
            return Err(BookstoreError::corrupt_snapshot(format!(
                "negative balance for user {}",
                row.id
            )));
        }

        Ok(User {
            id: row.id,
            handle: row.handle,
            credential: row.credential,
            token: row.token.filter(|token| !token.is_empty()),
            balance,
            version: row.version,
        })
    }
}

fn open_csv(path: &Path) -> Result<csv::Reader<File>, BookstoreError> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => BookstoreError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => BookstoreError::from(e),
    })?;
    Ok(ReaderBuilder::new().trim(Trim::All).from_reader(file))
}

/// Load the item catalog
///
/// # Errors
///
/// * `FileNotFound` - the file does not exist
/// * `ParseError` - a row is malformed
pub fn load_catalog(path: &Path) -> Result<Vec<Item>, BookstoreError> {
    let mut reader = open_csv(path)?;
    let mut items = Vec::new();

    for result in reader.deserialize::<CatalogCsvRecord>() {
        let record = result?;
        let item = convert_catalog_record(record).map_err(|message| BookstoreError::ParseError {
            line: None,
            message,
        })?;
        items.push(item);
    }

    tracing::debug!(path = %path.display(), items = items.len(), "Catalog loaded");
    Ok(items)
}

/// Load the state saved in a data directory
///
/// Returns `None` if the directory has no `CURRENT` file yet.
pub fn load_snapshot(dir: &Path) -> Result<Option<Snapshot>, BookstoreError> {
    let Some(generation) = current_generation(dir)? else {
        return Ok(None);
    };
    let generation_dir = dir.join(&generation);
    if !generation_dir.is_dir() {
        return Err(BookstoreError::corrupt_snapshot(format!(
            "{} names missing generation '{}'",
            CURRENT_FILE, generation
        )));
    }

    let mut users = Vec::new();
    for result in open_csv(&generation_dir.join(USERS_FILE))?.deserialize::<UserRow>() {
        users.push(User::try_from(result?)?);
    }

    let mut ownership = Vec::new();
    for result in open_csv(&generation_dir.join(OWNERSHIP_FILE))?.deserialize::<OwnershipRow>() {
        let row = result?;
        ownership.push((row.user, row.item));
    }

    tracing::info!(
        dir = %dir.display(),
        generation = %generation,
        users = users.len(),
        records = ownership.len(),
        "Snapshot loaded"
    );
    Ok(Some(Snapshot { users, ownership }))
}

/// Write the state into a data directory, creating it if needed
///
/// Generations left behind by earlier saves or interrupted writes are
/// removed once the new one is live.
pub fn save_snapshot(dir: &Path, snapshot: &Snapshot) -> Result<(), BookstoreError> {
    fs::create_dir_all(dir)?;

    let generation_dir = write_generation(dir, snapshot)?;
    let generation = generation_dir
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| BookstoreError::IoError {
            message: format!("invalid generation path {}", generation_dir.display()),
        })?
        .to_string();
    switch_current(dir, &generation)?;
    remove_stale_generations(dir, &generation);

    tracing::info!(
        dir = %dir.display(),
        generation = %generation,
        users = snapshot.users.len(),
        records = snapshot.ownership.len(),
        "Snapshot saved"
    );
    Ok(())
}

/// Generation named by `CURRENT`, if the file exists
fn current_generation(dir: &Path) -> Result<Option<String>, BookstoreError> {
    let generation = match fs::read_to_string(dir.join(CURRENT_FILE)) {
        Ok(contents) => contents.trim().to_string(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if !generation.starts_with(GENERATION_PREFIX) || generation.contains(['/', '\\']) {
        return Err(BookstoreError::corrupt_snapshot(format!(
            "{} holds invalid generation '{}'",
            CURRENT_FILE, generation
        )));
    }
    Ok(Some(generation))
}

/// Write both tables into a fresh generation directory
///
/// Nothing refers to the directory until `CURRENT` is switched to it.
fn write_generation(dir: &Path, snapshot: &Snapshot) -> Result<PathBuf, BookstoreError> {
    let generation_dir = Builder::new()
        .prefix(GENERATION_PREFIX)
        .tempdir_in(dir)?
        .keep();

    write_table(
        &generation_dir.join(USERS_FILE),
        snapshot.users.iter().map(UserRow::from),
    )?;
    write_table(
        &generation_dir.join(OWNERSHIP_FILE),
        snapshot
            .ownership
            .iter()
            .map(|&(user, item)| OwnershipRow { user, item }),
    )?;
    Ok(generation_dir)
}

fn write_table<T, I>(path: &Path, rows: I) -> Result<(), BookstoreError>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

/// Point `CURRENT` at a generation with a single rename
fn switch_current(dir: &Path, generation: &str) -> Result<(), BookstoreError> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    writeln!(tmp, "{}", generation)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dir.join(CURRENT_FILE))
        .map_err(|e| BookstoreError::from(e.error))?;
    Ok(())
}

fn remove_stale_generations(dir: &Path, live: &str) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "Cannot list old generations");
            return;
        }
    };

    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if name == live || !name.starts_with(GENERATION_PREFIX) {
            continue;
        }
        if let Err(e) = fs::remove_dir_all(entry.path()) {
            tracing::warn!(generation = name, error = %e, "Failed to remove old generation");
        }
    }
}
