use std::path::PathBuf;

const TICK_MS_ENV_VAR: &str = "TURF_TICK_MS";
const SAVE_ENV_VAR: &str = "TURF_SAVE";
const LEADER_ENV_VAR: &str = "TURF_LEADER";

const DEFAULT_TICK_MS: u64 = 1_000;
const MIN_TICK_MS: u64 = 50;
const DEFAULT_SAVE_FILE: &str = "turf.save.json";
const DEFAULT_LEADER: &str = "Boss";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CommandSource {
    Stdin,
    Script(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HostConfig {
    pub(crate) tick_ms: u64,
    pub(crate) save_file: String,
    pub(crate) leader_name: String,
    pub(crate) source: CommandSource,
}

impl HostConfig {
    pub(crate) fn from_env_and_args(args: &[String]) -> Result<Self, String> {
        Self::from_parts(
            std::env::var(TICK_MS_ENV_VAR).ok().as_deref(),
            std::env::var(SAVE_ENV_VAR).ok().as_deref(),
            std::env::var(LEADER_ENV_VAR).ok().as_deref(),
            args,
        )
    }

    fn from_parts(
        tick_ms: Option<&str>,
        save_file: Option<&str>,
        leader_name: Option<&str>,
        args: &[String],
    ) -> Result<Self, String> {
        Ok(Self {
            tick_ms: parse_tick_ms_or_default(tick_ms),
            save_file: non_empty_or(save_file, DEFAULT_SAVE_FILE),
            leader_name: non_empty_or(leader_name, DEFAULT_LEADER),
            source: parse_source(args)?,
        })
    }
}

fn parse_tick_ms_or_default(raw: Option<&str>) -> u64 {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .map(|value| value.max(MIN_TICK_MS))
        .unwrap_or(DEFAULT_TICK_MS)
}

fn non_empty_or(raw: Option<&str>, default: &str) -> String {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(default)
        .to_string()
}

fn parse_source(args: &[String]) -> Result<CommandSource, String> {
    match args {
        [] => Ok(CommandSource::Stdin),
        [command, script] if command == "run" => Ok(CommandSource::Script(PathBuf::from(script))),
        _ => Err("usage: turf [run <script>]".to_string()),
    }
}
