use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use sim::alloc::{AssignmentContext, AssignmentIndex};
use sim::scheduler::OperationView;
use sim::world::{ownable_plot_count, PlotKind};
use sim::{
    generate_plots, generate_units, Action, ActionResult, Coordinate, EpochMs, Notification,
    OperationStatus, Session,
};
use tracing::error;

use super::bootstrap::{AppWiring, HostError};
use super::commands::{parse_line, HostCommand, COMMANDS};
use super::config::CommandSource;
use super::save::write_save;

/// Wall-clock source for the host. Tests drive a manual clock instead.
pub(crate) trait Clock {
    fn now_ms(&self) -> EpochMs;
    fn sleep_ms(&mut self, ms: u64);
}

pub(crate) struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> EpochMs {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }

    fn sleep_ms(&mut self, ms: u64) {
        thread::sleep(Duration::from_millis(ms));
    }
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let AppWiring {
        config,
        session,
        save_path,
    } = app;
    let stdout = io::stdout();
    let mut runner = Runner::new(session, SystemClock, stdout.lock(), save_path, config.tick_ms);

    let result = match &config.source {
        CommandSource::Stdin => runner.run_lines(io::stdin().lock()),
        CommandSource::Script(path) => match File::open(path) {
            Ok(file) => runner.run_lines(BufReader::new(file)),
            Err(err) => {
                error!(path = %path.display(), error = %err, "script_open_failed");
                return ExitCode::FAILURE;
            }
        },
    };

    if let Err(err) = result {
        error!(error = %err, "host_stopped");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub(crate) struct Runner<C, W> {
    session: Session,
    clock: C,
    out: W,
    save_path: PathBuf,
    tick_ms: u64,
}

impl<C: Clock, W: Write> Runner<C, W> {
    pub(crate) fn new(session: Session, clock: C, out: W, save_path: PathBuf, tick_ms: u64) -> Self {
        Self {
            session,
            clock,
            out,
            save_path,
            tick_ms: tick_ms.max(1),
        }
    }

    /// Executes lines until `quit` or end of input, then saves. A fatal
    /// action error stops the loop without saving.
    pub(crate) fn run_lines<R: BufRead>(&mut self, input: R) -> Result<(), HostError> {
        for line in input.lines() {
            let line = line?;
            if self.execute(&line)? == Flow::Quit {
                break;
            }
        }
        self.save()?;
        writeln!(self.out, "ok: saved {}", self.save_path.display())?;
        Ok(())
    }

    fn execute(&mut self, line: &str) -> Result<Flow, HostError> {
        let command = match parse_line(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Ok(Flow::Continue),
            Err(err) => {
                writeln!(self.out, "err: parse: {} (usage: {})", err.reason, err.usage)?;
                return Ok(Flow::Continue);
            }
        };

        let now = self.clock.now_ms();
        match command {
            HostCommand::Help => {
                for spec in COMMANDS {
                    writeln!(self.out, "  {:<48} {}", spec.usage(), spec.help)?;
                }
            }
            HostCommand::Status => self.print_status(now)?,
            HostCommand::Plots(coordinate) => self.print_plots(coordinate)?,
            HostCommand::Units {
                coordinate,
                slot_index,
            } => self.print_units(coordinate, slot_index)?,
            HostCommand::Crew(context) => self.print_crew(&context)?,
            HostCommand::Tick => {
                let report = self.session.tick(now);
                writeln!(
                    self.out,
                    "ok: tick at {now}: {} running, {} ready",
                    report.operations.len() - report.ready.len(),
                    report.ready.len()
                )?;
            }
            HostCommand::Wait { ms } => {
                let mut remaining = ms;
                while remaining > 0 {
                    let step = remaining.min(self.tick_ms);
                    self.clock.sleep_ms(step);
                    remaining -= step;
                    self.session.tick(self.clock.now_ms());
                    self.flush_events()?;
                }
                writeln!(self.out, "ok: waited {ms}ms")?;
            }
            HostCommand::Save => {
                self.save()?;
                writeln!(self.out, "ok: saved {}", self.save_path.display())?;
            }
            HostCommand::Quit => return Ok(Flow::Quit),
            HostCommand::Sim(action) => self.dispatch(action, now)?,
        }

        self.session.tick(self.clock.now_ms());
        self.flush_events()?;
        Ok(Flow::Continue)
    }

    fn dispatch(&mut self, action: Action, now: EpochMs) -> Result<(), HostError> {
        match self.session.dispatch(action, now) {
            Ok(result) => writeln!(self.out, "ok: {}", describe_result(&result))?,
            Err(err) if err.is_fatal() => return Err(HostError::Fatal(err)),
            Err(err) => writeln!(self.out, "err: {}: {err}", err.code())?,
        }
        Ok(())
    }

    fn save(&mut self) -> Result<(), HostError> {
        write_save(&self.save_path, self.session.state(), self.session.catalog())
            .map_err(HostError::Save)
    }

    fn flush_events(&mut self) -> Result<(), HostError> {
        for event in self.session.drain_events() {
            writeln!(self.out, "event: {}", describe_event(&event))?;
        }
        Ok(())
    }

    fn print_status(&mut self, now: EpochMs) -> Result<(), HostError> {
        let state = self.session.state();
        let ledger = state.ledger;
        writeln!(
            self.out,
            "ok: revision {} money {} heat {} respect {} energy {} at {}",
            state.revision,
            ledger.money,
            ledger.heat,
            ledger.respect,
            ledger.energy,
            state.travel.position
        )?;

        let index = AssignmentIndex::build(state)?;
        for member in &state.crew {
            let job = index
                .slot_of(member.id)
                .map(ToString::to_string)
                .unwrap_or_else(|| "idle".to_string());
            writeln!(self.out, "  {} {} ({job})", member.id, member.name)?;
        }
        for holding in &state.holdings {
            writeln!(
                self.out,
                "  {} {} {:?} level {} yield {}/day",
                holding.id, holding.name, holding.kind, holding.level, holding.daily_yield
            )?;
        }
        for (recipe, units) in &state.inventory {
            writeln!(self.out, "  stock {recipe} x{units}")?;
        }

        let report = sim::tick(state, now);
        for view in &report.operations {
            writeln!(self.out, "  {}", describe_operation(view))?;
        }
        Ok(())
    }

    fn print_plots(&mut self, coordinate: Coordinate) -> Result<(), HostError> {
        let plots = generate_plots(coordinate);
        writeln!(
            self.out,
            "ok: {} plot(s) at {coordinate}, {} for sale",
            plots.len(),
            ownable_plot_count(&plots)
        )?;
        for plot in &plots {
            let owner = plot.owner_coordinate(coordinate);
            let owned = self
                .session
                .state()
                .holding_at(owner, plot.slot_index, None)
                .is_some();
            writeln!(
                self.out,
                "  slot {} {:?} \"{}\" cost {} yield {}/day{}{}",
                plot.slot_index,
                plot.kind,
                plot.name,
                plot.cost,
                plot.daily_yield,
                if plot.purchasable { "" } else { " (not for sale)" },
                if owned { " (owned)" } else { "" }
            )?;
        }
        Ok(())
    }

    fn print_units(&mut self, coordinate: Coordinate, slot_index: u8) -> Result<(), HostError> {
        let Some(plot) = generate_plots(coordinate)
            .into_iter()
            .find(|plot| plot.slot_index == slot_index)
        else {
            writeln!(self.out, "err: invalid_target: no slot {slot_index} at {coordinate}")?;
            return Ok(());
        };
        if plot.kind != PlotKind::Residential {
            writeln!(self.out, "err: invalid_target: {} has no units", plot.name)?;
            return Ok(());
        }

        let interior = generate_units(&plot.seed);
        let owner = plot.owner_coordinate(coordinate);
        writeln!(
            self.out,
            "ok: {} {:?} {} floor(s) x {}",
            plot.name, interior.tier, interior.floors, interior.units_per_floor
        )?;
        for unit in &interior.units {
            let owned = self
                .session
                .state()
                .holding_at(owner, slot_index, Some(unit.id))
                .is_some();
            writeln!(
                self.out,
                "  unit {} floor {} col {} price {} yield {}/day{}{}{}",
                unit.id.0,
                unit.floor + 1,
                unit.column + 1,
                unit.price,
                unit.daily_yield,
                if unit.occupied { " (tenant)" } else { "" },
                if unit.damaged { " (damaged)" } else { "" },
                if owned { " (owned)" } else { "" }
            )?;
        }
        Ok(())
    }

    fn print_crew(&mut self, context: &AssignmentContext) -> Result<(), HostError> {
        let names: Vec<String> = self
            .session
            .available_crew(context)?
            .into_iter()
            .map(|member| format!("{} {}", member.id, member.name))
            .collect();
        writeln!(self.out, "ok: {} available for {context}", names.len())?;
        for name in names {
            writeln!(self.out, "  {name}")?;
        }
        Ok(())
    }
}

fn describe_result(result: &ActionResult) -> String {
    match result {
        ActionResult::Purchased(holding) => format!("purchased {holding}"),
        ActionResult::Upgraded { holding, level } => format!("{holding} upgraded to level {level}"),
        ActionResult::LabUpgraded {
            holding,
            equipment,
            level,
        } => format!("{holding} {} now level {level}", equipment.as_token()),
        ActionResult::IncomeCollected { holding, amount } => {
            format!("collected {amount} from {holding}")
        }
        ActionResult::Assigned => "assigned".to_string(),
        ActionResult::Unassigned => "unassigned".to_string(),
        ActionResult::OperationStarted(operation) => format!("started {operation}"),
        ActionResult::Collected(collected) => match &collected.product {
            Some((recipe, units)) => format!("{} yielded {recipe} x{units}", collected.operation),
            None => format!(
                "{} paid {} money, {} respect, {} heat",
                collected.operation, collected.money, collected.respect, collected.heat
            ),
        },
        ActionResult::Sold { money } => format!("sold for {money}"),
        ActionResult::TravelQueued { arrives_at } => format!("travel arrives at {arrives_at}"),
        ActionResult::TravelCancelled { dropped } => format!("dropped {dropped} leg(s)"),
        ActionResult::Settled { count } => format!("settled {count} operation(s)"),
    }
}

fn describe_event(event: &Notification) -> String {
    match event {
        Notification::OperationReady { operation, kind } => {
            format!("{operation} ({}) ready to collect", kind.as_token())
        }
        Notification::OperationSettled { operation, kind } => {
            format!("{operation} ({}) finished", kind.as_token())
        }
        Notification::ArrivedAt { coordinate } => format!("arrived at {coordinate}"),
        Notification::CrewRecruited { crew, name } => format!("{name} joined as {crew}"),
        Notification::QuestTrigger { event } => format!("milestone {event}"),
    }
}

fn describe_operation(view: &OperationView) -> String {
    match view.status {
        OperationStatus::Ready => format!("{} {} at {}: ready", view.id, view.kind.as_token(), view.target),
        OperationStatus::Running {
            progress,
            remaining_ms,
        } => format!(
            "{} {} at {}: {:.0}% ({remaining_ms}ms left)",
            view.id,
            view.kind.as_token(),
            view.target,
            progress * 100.0
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use sim::{Catalog, GameState, OperationId};
    use tempfile::TempDir;

    use super::*;
    use crate::app::save::read_save;

    struct ManualClock {
        now: EpochMs,
    }

    impl Clock for ManualClock {
        fn now_ms(&self) -> EpochMs {
            self.now
        }

        fn sleep_ms(&mut self, ms: u64) {
            self.now += ms;
        }
    }

    fn runner(temp: &TempDir) -> Runner<ManualClock, Vec<u8>> {
        let session =
            Session::new(GameState::new_character("Vic"), Catalog::builtin()).expect("session");
        Runner::new(
            session,
            ManualClock { now: 10_000 },
            Vec::new(),
            temp.path().join("turf.save.json"),
            500,
        )
    }

    fn output(runner: &Runner<ManualClock, Vec<u8>>) -> String {
        String::from_utf8(runner.out.clone()).expect("utf8")
    }

    #[test]
    fn heist_script_collects_once_and_saves() {
        let temp = TempDir::new().expect("temp");
        let mut runner = runner(&temp);
        let script = "\
# corner first, then a quick heist
buy 0 0 2
assign holding:0 1
start heist 5 -2 2000 2
collect 0
wait 2000
collect 0
collect 0
quit
status
";
        runner.run_lines(Cursor::new(script)).expect("run");
        let text = output(&runner);

        assert!(text.contains("ok: purchased holding#0"), "{text}");
        assert!(text.contains("err: not_ready:"), "{text}");
        assert!(text.contains("event: op#0 (heist) ready to collect"), "{text}");
        assert!(text.contains("ok: op#0 paid 40 money"), "{text}");
        assert!(text.contains("err: already_collected:"), "{text}");
        assert!(!text.contains("revision"), "status ran after quit: {text}");

        let saved = read_save(&runner.save_path, &Catalog::builtin())
            .expect("read")
            .expect("saved");
        assert!(saved.collected_operations.contains(&OperationId(0)));
        assert_eq!(&saved, runner.session.state());
    }

    #[test]
    fn bad_lines_report_and_continue() {
        let temp = TempDir::new().expect("temp");
        let mut runner = runner(&temp);
        runner
            .run_lines(Cursor::new("launder 5\nassign holding:9 1\ncrew\n"))
            .expect("run");
        let text = output(&runner);
        assert!(text.contains("err: parse: unknown command 'launder'"), "{text}");
        assert!(text.contains("err: invalid_target:"), "{text}");
        assert!(text.contains("ok: 3 available for fresh"), "{text}");
        assert!(runner.save_path.exists());
    }

    #[test]
    fn plots_mark_owned_slots() {
        let temp = TempDir::new().expect("temp");
        let mut runner = runner(&temp);
        runner
            .run_lines(Cursor::new("buy 0 0 2\nplots 0 0\nunits 1 3 0\n"))
            .expect("run");
        let text = output(&runner);
        assert!(text.contains("\"Street Corner\" cost 2500"), "{text}");
        assert!(text.contains("for sale"), "{text}");
        assert!(text.contains("(owned)"), "{text}");
        assert!(text.contains("(not for sale)"), "{text}");
        assert!(text.contains("ok: Tenement 13-2"), "{text}");
    }
}
