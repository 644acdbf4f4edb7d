//! Line commands accepted by the host front end.

use sim::alloc::AssignmentContext;
use sim::scheduler::StartRequest;
use sim::state::{EquipmentKind, OperationKind, OperationPayload};
use sim::world::UnitId;
use sim::{Action, Coordinate, CrewId, HoldingId, OperationId};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum HostCommand {
    Help,
    Status,
    Plots(Coordinate),
    Units { coordinate: Coordinate, slot_index: u8 },
    Crew(AssignmentContext),
    Tick,
    Wait { ms: u64 },
    Save,
    Quit,
    Sim(Action),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CommandParseError {
    pub(crate) reason: String,
    pub(crate) usage: String,
}

type ParseFn = fn(&[String]) -> Result<HostCommand, CommandParseError>;

pub(crate) struct CommandSpec {
    pub(crate) name: &'static str,
    pub(crate) help: &'static str,
    pub(crate) arg_schema: &'static str,
    parse: ParseFn,
}

pub(crate) const COMMANDS: &[CommandSpec] = &[
    CommandSpec { name: "help", help: "List commands", arg_schema: "", parse: parse_help },
    CommandSpec { name: "status", help: "Show ledger, crew and operations", arg_schema: "", parse: parse_status },
    CommandSpec { name: "plots", help: "List plots on a block", arg_schema: "<x> <y>", parse: parse_plots },
    CommandSpec { name: "units", help: "List units inside a building", arg_schema: "<x> <y> <slot>", parse: parse_units },
    CommandSpec { name: "crew", help: "List crew free for a context", arg_schema: "[context]", parse: parse_crew },
    CommandSpec { name: "buy", help: "Buy a plot or a unit", arg_schema: "<x> <y> <slot> [unit]", parse: parse_buy },
    CommandSpec { name: "upgrade", help: "Upgrade a holding", arg_schema: "<holding> <cost>", parse: parse_upgrade },
    CommandSpec { name: "lab-upgrade", help: "Upgrade lab equipment", arg_schema: "<holding> <ventilation|scale> <cost>", parse: parse_lab_upgrade },
    CommandSpec { name: "income", help: "Collect income from a holding", arg_schema: "<holding>", parse: parse_income },
    CommandSpec { name: "assign", help: "Assign crew to a post or officer slot", arg_schema: "<context> <crew>", parse: parse_assign },
    CommandSpec { name: "unassign", help: "Release crew from a post or officer slot", arg_schema: "<context> <crew>", parse: parse_unassign },
    CommandSpec { name: "start", help: "Start a timed operation", arg_schema: "<kind> <x> <y> <duration_ms> <crew...>", parse: parse_start },
    CommandSpec { name: "batch", help: "Start a lab batch", arg_schema: "<holding> <recipe> <crew...>", parse: parse_batch },
    CommandSpec { name: "collect", help: "Collect a finished operation", arg_schema: "<operation>", parse: parse_collect },
    CommandSpec { name: "sell", help: "Sell product from inventory", arg_schema: "<recipe> <units>", parse: parse_sell },
    CommandSpec { name: "travel", help: "Queue travel through blocks", arg_schema: "<x> <y> [<x> <y>...]", parse: parse_travel },
    CommandSpec { name: "cancel-travel", help: "Cancel queued travel", arg_schema: "", parse: parse_cancel_travel },
    CommandSpec { name: "settle", help: "Settle finished operations", arg_schema: "", parse: parse_settle },
    CommandSpec { name: "tick", help: "Run one presentation tick now", arg_schema: "", parse: parse_tick },
    CommandSpec { name: "wait", help: "Let time pass", arg_schema: "<ms>", parse: parse_wait },
    CommandSpec { name: "save", help: "Write the save file", arg_schema: "", parse: parse_save },
    CommandSpec { name: "quit", help: "Save and exit", arg_schema: "", parse: parse_quit },
];

/// Parses one input line. Blank lines and `#` comments yield `Ok(None)`.
pub(crate) fn parse_line(line: &str) -> Result<Option<HostCommand>, CommandParseError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    let tokens = tokenize_line(trimmed).map_err(|reason| CommandParseError {
        reason,
        usage: "<command> [args...]".to_string(),
    })?;
    let Some((name, args)) = tokens.split_first() else {
        return Ok(None);
    };
    let lower = name.to_ascii_lowercase();
    let spec = COMMANDS
        .iter()
        .find(|spec| spec.name == lower)
        .ok_or_else(|| CommandParseError {
            reason: format!("unknown command '{name}'"),
            usage: "help".to_string(),
        })?;
    (spec.parse)(args).map(Some)
}

impl CommandSpec {
    pub(crate) fn usage(&self) -> String {
        if self.arg_schema.is_empty() {
            self.name.to_string()
        } else {
            format!("{} {}", self.name, self.arg_schema)
        }
    }
}

fn tokenize_line(line: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut pending = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                pending = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if pending {
                    tokens.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            _ => {
                current.push(ch);
                pending = true;
            }
        }
    }

    if in_quotes {
        return Err("unterminated quoted string".to_string());
    }
    if pending {
        tokens.push(current);
    }
    Ok(tokens)
}

fn usage_of(name: &str) -> String {
    COMMANDS
        .iter()
        .find(|spec| spec.name == name)
        .map(CommandSpec::usage)
        .unwrap_or_else(|| name.to_string())
}

fn err(name: &str, reason: impl Into<String>) -> CommandParseError {
    CommandParseError {
        reason: reason.into(),
        usage: usage_of(name),
    }
}

fn expect_len(args: &[String], len: usize, name: &str) -> Result<(), CommandParseError> {
    if args.len() == len {
        Ok(())
    } else {
        Err(err(
            name,
            format!("expected {len} argument(s), got {}", args.len()),
        ))
    }
}

fn number<T: std::str::FromStr>(raw: &str, what: &str, name: &str) -> Result<T, CommandParseError> {
    raw.parse::<T>()
        .map_err(|_| err(name, format!("invalid {what} '{raw}'")))
}

fn coordinate(x: &str, y: &str, name: &str) -> Result<Coordinate, CommandParseError> {
    Ok(Coordinate::new(number(x, "x", name)?, number(y, "y", name)?))
}

fn crew_list(args: &[String], name: &str) -> Result<Vec<CrewId>, CommandParseError> {
    if args.is_empty() {
        return Err(err(name, "missing crew ids"));
    }
    args.iter()
        .map(|raw| number(raw, "crew id", name).map(CrewId))
        .collect()
}

/// `holding:N`, `officer:N`, `op:N` or `fresh`.
fn context(raw: &str, name: &str) -> Result<AssignmentContext, CommandParseError> {
    if raw.eq_ignore_ascii_case("fresh") {
        return Ok(AssignmentContext::Fresh);
    }
    let (kind, id) = raw
        .split_once(':')
        .ok_or_else(|| err(name, format!("invalid context '{raw}'")))?;
    match kind.to_ascii_lowercase().as_str() {
        "holding" => Ok(AssignmentContext::Holding(HoldingId(number(id, "holding id", name)?))),
        "officer" => Ok(AssignmentContext::Officer(number(id, "officer slot", name)?)),
        "op" => Ok(AssignmentContext::Operation(OperationId(number(id, "operation id", name)?))),
        _ => Err(err(
            name,
            format!("unknown context kind '{kind}' (expected holding|officer|op|fresh)"),
        )),
    }
}

fn parse_help(args: &[String]) -> Result<HostCommand, CommandParseError> {
    expect_len(args, 0, "help")?;
    Ok(HostCommand::Help)
}

fn parse_status(args: &[String]) -> Result<HostCommand, CommandParseError> {
    expect_len(args, 0, "status")?;
    Ok(HostCommand::Status)
}

fn parse_plots(args: &[String]) -> Result<HostCommand, CommandParseError> {
    expect_len(args, 2, "plots")?;
    Ok(HostCommand::Plots(coordinate(&args[0], &args[1], "plots")?))
}

fn parse_units(args: &[String]) -> Result<HostCommand, CommandParseError> {
    expect_len(args, 3, "units")?;
    Ok(HostCommand::Units {
        coordinate: coordinate(&args[0], &args[1], "units")?,
        slot_index: number(&args[2], "slot", "units")?,
    })
}

fn parse_crew(args: &[String]) -> Result<HostCommand, CommandParseError> {
    match args {
        [] => Ok(HostCommand::Crew(AssignmentContext::Fresh)),
        [raw] => Ok(HostCommand::Crew(context(raw, "crew")?)),
        _ => Err(err("crew", "expected at most one context")),
    }
}

fn parse_buy(args: &[String]) -> Result<HostCommand, CommandParseError> {
    if args.len() != 3 && args.len() != 4 {
        return Err(err("buy", "expected <x> <y> <slot> or <x> <y> <slot> <unit>"));
    }
    let unit = match args.get(3) {
        Some(raw) => Some(UnitId(number(raw, "unit", "buy")?)),
        None => None,
    };
    Ok(HostCommand::Sim(Action::PurchaseHolding {
        coordinate: coordinate(&args[0], &args[1], "buy")?,
        slot_index: number(&args[2], "slot", "buy")?,
        unit,
    }))
}

fn parse_upgrade(args: &[String]) -> Result<HostCommand, CommandParseError> {
    expect_len(args, 2, "upgrade")?;
    Ok(HostCommand::Sim(Action::UpgradeHolding {
        holding: HoldingId(number(&args[0], "holding id", "upgrade")?),
        cost: number(&args[1], "cost", "upgrade")?,
    }))
}

fn parse_lab_upgrade(args: &[String]) -> Result<HostCommand, CommandParseError> {
    expect_len(args, 3, "lab-upgrade")?;
    let equipment = EquipmentKind::from_token(&args[1].to_ascii_lowercase()).ok_or_else(|| {
        err(
            "lab-upgrade",
            format!("unknown equipment '{}' (expected ventilation|scale)", args[1]),
        )
    })?;
    Ok(HostCommand::Sim(Action::UpgradeLab {
        holding: HoldingId(number(&args[0], "holding id", "lab-upgrade")?),
        equipment,
        cost: number(&args[2], "cost", "lab-upgrade")?,
    }))
}

fn parse_income(args: &[String]) -> Result<HostCommand, CommandParseError> {
    expect_len(args, 1, "income")?;
    Ok(HostCommand::Sim(Action::CollectIncome {
        holding: HoldingId(number(&args[0], "holding id", "income")?),
    }))
}

fn parse_assign(args: &[String]) -> Result<HostCommand, CommandParseError> {
    expect_len(args, 2, "assign")?;
    Ok(HostCommand::Sim(Action::AssignCrew {
        context: context(&args[0], "assign")?,
        crew: CrewId(number(&args[1], "crew id", "assign")?),
    }))
}

fn parse_unassign(args: &[String]) -> Result<HostCommand, CommandParseError> {
    expect_len(args, 2, "unassign")?;
    Ok(HostCommand::Sim(Action::UnassignCrew {
        context: context(&args[0], "unassign")?,
        crew: CrewId(number(&args[1], "crew id", "unassign")?),
    }))
}

fn parse_start(args: &[String]) -> Result<HostCommand, CommandParseError> {
    if args.len() < 5 {
        return Err(err("start", "expected <kind> <x> <y> <duration_ms> <crew...>"));
    }
    let kind = OperationKind::from_token(&args[0].to_ascii_lowercase())
        .filter(|kind| *kind != OperationKind::LabBatch)
        .ok_or_else(|| {
            err(
                "start",
                format!(
                    "unknown kind '{}' (expected mission|heist|raid|tagging|erasing|recruitment)",
                    args[0]
                ),
            )
        })?;
    let target = coordinate(&args[1], &args[2], "start")?;
    let duration_ms: u64 = number(&args[3], "duration", "start")?;
    let crew = crew_list(&args[4..], "start")?;
    Ok(HostCommand::Sim(Action::StartOperation(StartRequest {
        kind,
        target,
        payload: default_payload(kind, duration_ms, crew.len()),
        crew,
        duration_ms,
        cost: 0,
    })))
}

/// Reward the host offers for a job of this size. Longer jobs with bigger
/// crews pay more and draw more heat.
fn default_payload(kind: OperationKind, duration_ms: u64, crew: usize) -> OperationPayload {
    let (per_crew_second, heat) = match kind {
        OperationKind::Mission => (5, 1),
        OperationKind::Raid => (8, 3),
        OperationKind::Heist => (20, 6),
        OperationKind::Tagging | OperationKind::Erasing => return OperationPayload::Territory,
        OperationKind::Recruitment => return OperationPayload::Recruit,
        OperationKind::LabBatch => (0, 0),
    };
    let seconds = i64::try_from(duration_ms / 1_000).unwrap_or(i64::MAX);
    OperationPayload::Reward {
        money: seconds.saturating_mul(per_crew_second * crew as i64),
        respect: crew as i64,
        heat,
    }
}

fn parse_batch(args: &[String]) -> Result<HostCommand, CommandParseError> {
    if args.len() < 3 {
        return Err(err("batch", "expected <holding> <recipe> <crew...>"));
    }
    Ok(HostCommand::Sim(Action::StartLabBatch {
        holding: HoldingId(number(&args[0], "holding id", "batch")?),
        recipe: args[1].clone(),
        crew: crew_list(&args[2..], "batch")?,
    }))
}

fn parse_collect(args: &[String]) -> Result<HostCommand, CommandParseError> {
    expect_len(args, 1, "collect")?;
    Ok(HostCommand::Sim(Action::CollectOperation {
        operation: OperationId(number(&args[0], "operation id", "collect")?),
    }))
}

fn parse_sell(args: &[String]) -> Result<HostCommand, CommandParseError> {
    expect_len(args, 2, "sell")?;
    Ok(HostCommand::Sim(Action::SellProduct {
        recipe: args[0].clone(),
        units: number(&args[1], "units", "sell")?,
    }))
}

fn parse_travel(args: &[String]) -> Result<HostCommand, CommandParseError> {
    if args.is_empty() || args.len() % 2 != 0 {
        return Err(err("travel", "expected one or more <x> <y> pairs"));
    }
    let path = args
        .chunks(2)
        .map(|pair| coordinate(&pair[0], &pair[1], "travel"))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(HostCommand::Sim(Action::QueueTravel { path }))
}

fn parse_cancel_travel(args: &[String]) -> Result<HostCommand, CommandParseError> {
    expect_len(args, 0, "cancel-travel")?;
    Ok(HostCommand::Sim(Action::CancelTravel))
}

fn parse_settle(args: &[String]) -> Result<HostCommand, CommandParseError> {
    expect_len(args, 0, "settle")?;
    Ok(HostCommand::Sim(Action::Settle))
}

fn parse_tick(args: &[String]) -> Result<HostCommand, CommandParseError> {
    expect_len(args, 0, "tick")?;
    Ok(HostCommand::Tick)
}

fn parse_wait(args: &[String]) -> Result<HostCommand, CommandParseError> {
    expect_len(args, 1, "wait")?;
    Ok(HostCommand::Wait {
        ms: number(&args[0], "milliseconds", "wait")?,
    })
}

fn parse_save(args: &[String]) -> Result<HostCommand, CommandParseError> {
    expect_len(args, 0, "save")?;
    Ok(HostCommand::Save)
}

fn parse_quit(args: &[String]) -> Result<HostCommand, CommandParseError> {
    expect_len(args, 0, "quit")?;
    Ok(HostCommand::Quit)
}
