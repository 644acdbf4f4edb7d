use std::path::{Path, PathBuf};

use sim::{
    load_catalog, resolve_app_paths, ActionError, Catalog, ContentError, GameState,
    InvariantViolation, Session, StartupError,
};
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::config::HostConfig;
use super::save::read_save;

#[derive(Debug, Error)]
pub(crate) enum HostError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("content load failed: {0}")]
    Content(#[from] ContentError),
    #[error("{0}")]
    Config(String),
    #[error("save: {0}")]
    Save(String),
    #[error("loaded state rejected: {0}")]
    Invariant(#[from] InvariantViolation),
    #[error("action aborted: {0}")]
    Fatal(ActionError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub(crate) struct AppWiring {
    pub(crate) config: HostConfig,
    pub(crate) session: Session,
    pub(crate) save_path: PathBuf,
}

pub(crate) fn build_app(args: &[String]) -> Result<AppWiring, HostError> {
    init_tracing();
    info!("=== Turf Startup ===");

    let config = HostConfig::from_env_and_args(args).map_err(HostError::Config)?;
    let paths = resolve_app_paths()?;
    let catalog = load_base_catalog(&paths.base_content_dir)?;
    let save_path = paths.saves_dir.join(&config.save_file);
    let state = match read_save(&save_path, &catalog).map_err(HostError::Save)? {
        Some(state) => state,
        None => {
            info!(leader = %config.leader_name, "new_character");
            GameState::new_character(&config.leader_name)
        }
    };
    let session = Session::new(state, catalog)?;

    Ok(AppWiring {
        config,
        session,
        save_path,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn load_base_catalog(content_dir: &Path) -> Result<Catalog, ContentError> {
    if !content_dir.is_dir() {
        warn!(path = %content_dir.display(), "base_content_missing_using_builtin");
        return Ok(Catalog::builtin());
    }
    load_catalog(content_dir)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn missing_content_dir_falls_back_to_builtin() {
        let temp = TempDir::new().expect("temp");
        let catalog = load_base_catalog(&temp.path().join("absent")).expect("catalog");
        assert_eq!(catalog.fingerprint(), Catalog::builtin().fingerprint());
    }

    #[test]
    fn content_dir_recipes_replace_builtin() {
        let temp = TempDir::new().expect("temp");
        fs::write(
            temp.path().join("recipes.xml"),
            r#"<Defs>
  <RecipeDef>
    <defName>recipe.house_special</defName>
    <label>House Special</label>
    <baseTimeMs>60000</baseTimeMs>
    <batchSize>5</batchSize>
  </RecipeDef>
</Defs>"#,
        )
        .expect("write");
        let catalog = load_base_catalog(temp.path()).expect("catalog");
        assert!(catalog.recipe("recipe.house_special").is_some());
        assert!(catalog.recipe("recipe.street_weed").is_none());
    }
}
