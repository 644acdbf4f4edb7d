//! Save files.
//!
//! Only the authoritative [`GameState`] is written. Plots and interiors are
//! regenerated from coordinates on load, so the document records the
//! generator version it was written against.

use std::collections::HashSet;
use std::fmt::Display;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sim::alloc::audit_exclusivity;
use sim::state::OperationPayload;
use sim::{Catalog, GameState, GENERATOR_VERSION};
use tracing::{info, warn};

pub(crate) const SAVE_VERSION: u32 = 1;

pub(crate) type SaveLoadResult<T> = Result<T, String>;

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct SaveDocument {
    pub(crate) save_version: u32,
    pub(crate) generator_version: u32,
    pub(crate) catalog_hash: String,
    pub(crate) state: GameState,
}

pub(crate) fn write_save(path: &Path, state: &GameState, catalog: &Catalog) -> SaveLoadResult<()> {
    let document = SaveDocument {
        save_version: SAVE_VERSION,
        generator_version: GENERATOR_VERSION,
        catalog_hash: catalog.fingerprint().to_string(),
        state: state.clone(),
    };
    let json = serde_json::to_string_pretty(&document)
        .map_err(|error| format!("encode save json: {error}"))?;
    write_text_atomic(path, &json)
        .map_err(|error| format!("write save '{}': {error}", path.display()))?;
    info!(path = %path.display(), revision = state.revision, "game_saved");
    Ok(())
}

/// Reads and validates a save. A missing file is not an error; it means a
/// new character.
pub(crate) fn read_save(path: &Path, catalog: &Catalog) -> SaveLoadResult<Option<GameState>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(error) => return Err(format!("read save '{}': {error}", path.display())),
    };
    let document = parse_save_json(&raw)?;
    validate_save(&document, catalog)?;
    info!(
        path = %path.display(),
        revision = document.state.revision,
        holdings = document.state.holdings.len(),
        "game_loaded"
    );
    Ok(Some(document.state))
}

fn parse_save_json(raw: &str) -> SaveLoadResult<SaveDocument> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, SaveDocument>(&mut deserializer) {
        Ok(document) => Ok(document),
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            if path.is_empty() || path == "." {
                Err(format!("parse save json: {source}"))
            } else {
                Err(format!("parse save json at {path}: {source}"))
            }
        }
    }
}

fn validation_err(path: &str, message: impl Into<String>) -> String {
    format!("validation failed at {path}: {}", message.into())
}

fn expected_actual(path: &str, expected: impl Display, actual: impl Display) -> String {
    validation_err(path, format!("expected {expected}, got {actual}"))
}

fn validate_save(document: &SaveDocument, catalog: &Catalog) -> SaveLoadResult<()> {
    if document.save_version != SAVE_VERSION {
        return Err(expected_actual(
            "save_version",
            SAVE_VERSION,
            document.save_version,
        ));
    }
    if document.generator_version != GENERATOR_VERSION {
        return Err(expected_actual(
            "generator_version",
            GENERATOR_VERSION,
            document.generator_version,
        ));
    }
    if document.catalog_hash != catalog.fingerprint() {
        warn!(
            saved = %document.catalog_hash,
            current = %catalog.fingerprint(),
            "catalog_changed_since_save"
        );
    }

    let state = &document.state;
    if state.ledger.money < 0 {
        return Err(expected_actual(
            "state.ledger.money",
            "non-negative amount",
            state.ledger.money,
        ));
    }

    let leaders = state.crew.iter().filter(|member| member.is_leader).count();
    if leaders != 1 {
        return Err(expected_actual("state.crew", "exactly one leader", leaders));
    }
    let mut crew_ids = HashSet::with_capacity(state.crew.len());
    for (index, member) in state.crew.iter().enumerate() {
        if !crew_ids.insert(member.id) {
            return Err(validation_err(
                &format!("state.crew[{index}].id"),
                format!("duplicate crew id {}", member.id),
            ));
        }
        if member.id.0 >= state.next_crew_id {
            return Err(validation_err(
                &format!("state.crew[{index}].id"),
                format!("{} is not below next_crew_id {}", member.id, state.next_crew_id),
            ));
        }
    }

    let mut holding_ids = HashSet::with_capacity(state.holdings.len());
    let mut triples = HashSet::with_capacity(state.holdings.len());
    for (index, holding) in state.holdings.iter().enumerate() {
        let path = format!("state.holdings[{index}]");
        if !holding_ids.insert(holding.id) {
            return Err(validation_err(
                &format!("{path}.id"),
                format!("duplicate holding id {}", holding.id),
            ));
        }
        if holding.id.0 >= state.next_holding_id {
            return Err(validation_err(
                &format!("{path}.id"),
                format!(
                    "{} is not below next_holding_id {}",
                    holding.id, state.next_holding_id
                ),
            ));
        }
        if !triples.insert((holding.coordinate, holding.slot_index, holding.unit_id)) {
            return Err(validation_err(
                &path,
                format!(
                    "second holding for {} slot {}",
                    holding.coordinate, holding.slot_index
                ),
            ));
        }
        if holding.level == 0 || holding.level > sim::state::MAX_HOLDING_LEVEL {
            return Err(expected_actual(
                &format!("{path}.level"),
                format!("1..={}", sim::state::MAX_HOLDING_LEVEL),
                holding.level,
            ));
        }
        if let Some(operation) = &holding.operation {
            let posted = operation.post().map(|post| post.crew.as_slice()).unwrap_or(&[]);
            if posted.len() > operation.post_capacity() {
                return Err(expected_actual(
                    &format!("{path}.operation"),
                    format!("at most {} crew", operation.post_capacity()),
                    posted.len(),
                ));
            }
            if let Some(missing) = posted.iter().find(|id| !crew_ids.contains(*id)) {
                return Err(validation_err(
                    &format!("{path}.operation"),
                    format!("{} post references unknown {missing}", operation.label()),
                ));
            }
        }
    }

    for (index, officer) in state.officers.iter().enumerate() {
        if let Some(id) = officer.filter(|id| !crew_ids.contains(id)) {
            return Err(validation_err(
                &format!("state.officers[{index}]"),
                format!("references unknown {id}"),
            ));
        }
    }

    let mut operation_ids = HashSet::new();
    for operation in state.operations() {
        if !operation_ids.insert(operation.id) {
            return Err(validation_err(
                "state.operations",
                format!("duplicate operation id {}", operation.id),
            ));
        }
        if operation.id.0 >= state.next_operation_id {
            return Err(validation_err(
                "state.operations",
                format!(
                    "{} is not below next_operation_id {}",
                    operation.id, state.next_operation_id
                ),
            ));
        }
        if let Some(missing) = operation.crew.iter().find(|id| !crew_ids.contains(*id)) {
            return Err(validation_err(
                "state.operations",
                format!("{} references unknown {missing}", operation.id),
            ));
        }
        if let OperationPayload::Batch { recipe, .. } = &operation.payload {
            if catalog.recipe(recipe).is_none() {
                return Err(validation_err(
                    "state.operations",
                    format!("{} brews unknown recipe '{recipe}'", operation.id),
                ));
            }
        }
    }

    if state.collected_floor > state.next_operation_id {
        return Err(expected_actual(
            "state.collected_floor",
            format!("at most next_operation_id {}", state.next_operation_id),
            state.collected_floor,
        ));
    }

    audit_exclusivity(state).map_err(|error| validation_err("state", error.to_string()))
}

fn write_text_atomic(path: &Path, text: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = temp_path_for(path);
    fs::write(&tmp_path, text.as_bytes())?;
    if let Err(error) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("save.json");
    let tmp_name = format!("{file_name}.tmp");
    match path.parent() {
        Some(parent) => parent.join(tmp_name),
        None => PathBuf::from(tmp_name),
    }
}
