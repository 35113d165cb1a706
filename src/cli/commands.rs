use std::io;

use chrono::{Datelike, NaiveDate};
use dialoguer::Confirm;
use rustyline::error::ReadlineError;
use strsim::levenshtein;
use thiserror::Error;
use uuid::Uuid;

use super::{
    calendar,
    output::{self, format_money, format_number, paint},
    table::{Table, TableColumn},
};
use crate::{
    currency::{Conversion, Currency, RefreshOutcome},
    errors::TrackerError,
    ledger::{SortKey, SortOrder, DATE_FORMAT},
    utils::build_info,
    Tracker,
};

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Tracker(#[from] TrackerError),
    #[error(transparent)]
    Readline(#[from] ReadlineError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    InvalidArguments(String),
    #[error(transparent)]
    Tracker(#[from] TrackerError),
    #[error(transparent)]
    Dialoguer(#[from] dialoguer::Error),
    #[error("exit requested")]
    ExitRequested,
}

pub type CommandResult = Result<(), CommandError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Exit,
}

type Handler = fn(&mut ShellContext, &[&str]) -> CommandResult;

pub struct CommandEntry {
    pub name: &'static str,
    pub usage: &'static str,
    pub description: &'static str,
    handler: Handler,
}

const COMMANDS: &[CommandEntry] = &[
    CommandEntry {
        name: "help",
        usage: "help [command]",
        description: "Show available commands",
        handler: cmd_help,
    },
    CommandEntry {
        name: "add",
        usage: "add <YYYY-MM-DD|today> <amount> [USD|ARS|EUR]",
        description: "Record a transaction (currency defaults to the principal one)",
        handler: cmd_add,
    },
    CommandEntry {
        name: "list",
        usage: "list [date|amount|currency|state] [asc|desc]",
        description: "Show recorded transactions",
        handler: cmd_list,
    },
    CommandEntry {
        name: "delete",
        usage: "delete <index>",
        description: "Delete a transaction by its index in the last listing",
        handler: cmd_delete,
    },
    CommandEntry {
        name: "stats",
        usage: "stats",
        description: "Show totals and balance in the principal currency",
        handler: cmd_stats,
    },
    CommandEntry {
        name: "calendar",
        usage: "calendar [YYYY-MM]",
        description: "Show daily totals for a month",
        handler: cmd_calendar,
    },
    CommandEntry {
        name: "convert",
        usage: "convert <amount> <from> <to>",
        description: "Convert an amount between currencies",
        handler: cmd_convert,
    },
    CommandEntry {
        name: "rates",
        usage: "rates [refresh]",
        description: "Show or refresh the exchange rates in use",
        handler: cmd_rates,
    },
    CommandEntry {
        name: "config",
        usage: "config [principal <CODE> | balance <amount>]",
        description: "Show or change settings",
        handler: cmd_config,
    },
    CommandEntry {
        name: "version",
        usage: "version",
        description: "Show build information",
        handler: cmd_version,
    },
    CommandEntry {
        name: "exit",
        usage: "exit",
        description: "Leave the shell",
        handler: cmd_exit,
    },
];

fn find_command(name: &str) -> Option<&'static CommandEntry> {
    let name = if name == "quit" { "exit" } else { name };
    COMMANDS.iter().find(|entry| entry.name == name)
}

/// Shell state shared by every command handler.
pub struct ShellContext {
    pub(crate) tracker: Tracker,
    pub(crate) mode: CliMode,
    pub(crate) running: bool,
    last_listing: Vec<Uuid>,
}

impl ShellContext {
    pub fn new(tracker: Tracker, mode: CliMode) -> Self {
        Self {
            tracker,
            mode,
            running: true,
            last_listing: Vec::new(),
        }
    }

    pub fn command_names(&self) -> Vec<&'static str> {
        COMMANDS.iter().map(|entry| entry.name).collect()
    }

    pub fn prompt(&self) -> String {
        format!("finance [{}]> ", self.tracker.principal())
    }

    pub(crate) fn dispatch(
        &mut self,
        command: &str,
        raw: &str,
        args: &[&str],
    ) -> Result<LoopControl, CommandError> {
        let Some(entry) = find_command(command) else {
            self.suggest_command(raw);
            return Ok(LoopControl::Continue);
        };

        if let Some(outcome) = self.tracker.converter_mut().refresh_if_stale() {
            report_refresh(outcome);
        }

        match (entry.handler)(self, args) {
            Ok(()) => Ok(LoopControl::Continue),
            Err(CommandError::ExitRequested) => Ok(LoopControl::Exit),
            Err(err) => Err(err),
        }
    }

    fn suggest_command(&self, input: &str) {
        output::warning(format!(
            "Unknown command `{}`. Type `help` to see available commands.",
            input
        ));
        let best = COMMANDS
            .iter()
            .map(|entry| (levenshtein(entry.name, &input.to_lowercase()), entry.name))
            .min_by_key(|(distance, _)| *distance);
        if let Some((distance, name)) = best {
            if distance <= 3 {
                output::info(format!("Suggestion: `{}`?", name));
            }
        }
    }

    pub(crate) fn report_error(&self, err: CommandError) {
        match err {
            CommandError::ExitRequested => {}
            CommandError::InvalidArguments(message) => {
                output::error(message);
                output::info("Use `help <command>` for usage details.");
            }
            other => output::error(other),
        }
    }

    fn confirm(&self, prompt: &str) -> Result<bool, CommandError> {
        if self.mode == CliMode::Script {
            return Ok(true);
        }
        Ok(Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()?)
    }
}

fn report_refresh(outcome: RefreshOutcome) {
    match outcome {
        RefreshOutcome::Fetched => output::info("Exchange rates refreshed."),
        RefreshOutcome::UsedBackup => {
            output::warning("Rate service unavailable; using backup exchange rates.")
        }
    }
}

fn invalid(message: impl Into<String>) -> CommandError {
    CommandError::InvalidArguments(message.into())
}

fn parse_amount(raw: &str) -> Result<f64, CommandError> {
    raw.replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite())
        .ok_or_else(|| invalid(format!("`{}` is not a valid amount", raw)))
}

fn parse_currency(raw: &str) -> Result<Currency, CommandError> {
    raw.parse().map_err(|err: crate::currency::UnknownCurrency| invalid(err.to_string()))
}

fn cmd_help(_ctx: &mut ShellContext, args: &[&str]) -> CommandResult {
    if let Some(name) = args.first() {
        let entry = find_command(&name.to_lowercase())
            .ok_or_else(|| invalid(format!("Unknown command `{}`", name)))?;
        output::section(format!("Help: {}", entry.name));
        output::info(format!("  Description: {}", entry.description));
        output::info(format!("  Usage: {}", entry.usage));
        return Ok(());
    }
    output::section("Available commands");
    for entry in COMMANDS {
        output::info(format!("  {:<10} {}", entry.name, entry.description));
    }
    output::info("Use `help <command>` for details.");
    Ok(())
}

fn cmd_add(ctx: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [date, amount, rest @ ..] = args else {
        return Err(invalid("usage: add <YYYY-MM-DD|today> <amount> [currency]"));
    };
    let date = if date.eq_ignore_ascii_case("today") {
        ctx.tracker.today()
    } else {
        NaiveDate::parse_from_str(date, DATE_FORMAT)
            .map_err(|_| invalid(format!("`{}` is not a date in YYYY-MM-DD format", date)))?
    };
    let amount = parse_amount(amount)?;
    let currency = match rest.first() {
        Some(code) => parse_currency(code)?,
        None => ctx.tracker.principal(),
    };

    ctx.tracker.add_transaction(date, amount, currency)?;
    ctx.last_listing.clear();
    output::success(format!(
        "Recorded {} on {}.",
        format_money(amount, currency),
        date.format(DATE_FORMAT)
    ));
    Ok(())
}

fn cmd_list(ctx: &mut ShellContext, args: &[&str]) -> CommandResult {
    let key: SortKey = match args.first() {
        Some(raw) => raw.parse()?,
        None => SortKey::default(),
    };
    let order: SortOrder = match args.get(1) {
        Some(raw) => raw.parse()?,
        None => SortOrder::default(),
    };

    let principal = ctx.tracker.principal();
    let records = ctx.tracker.sorted_transactions(key, order);
    if records.is_empty() {
        output::info("No transactions recorded yet.");
        ctx.last_listing.clear();
        return Ok(());
    }

    let mut table = Table::new(vec![
        TableColumn::right("#"),
        TableColumn::left("Date"),
        TableColumn::right("Amount"),
        TableColumn::left("Currency"),
        TableColumn::left("State"),
        TableColumn::right(format!("In {}", principal)),
    ]);
    for (idx, txn) in records.iter().enumerate() {
        let state = txn.state();
        table.push_row(vec![
            (idx + 1).to_string(),
            txn.date.format(DATE_FORMAT).to_string(),
            paint(&format_money(txn.amount, txn.currency), state),
            txn.currency.to_string(),
            state.to_string(),
            format_money(ctx.tracker.converted_amount(txn), principal),
        ]);
    }
    let ids = records.iter().map(|txn| txn.id).collect();

    output::info(table.render());
    ctx.last_listing = ids;
    Ok(())
}

fn cmd_delete(ctx: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [raw] = args else {
        return Err(invalid("usage: delete <index>"));
    };
    let index: usize = raw
        .parse()
        .ok()
        .filter(|index| *index > 0)
        .ok_or_else(|| invalid(format!("`{}` is not a valid index", raw)))?;

    if ctx.last_listing.is_empty() {
        ctx.last_listing = ctx
            .tracker
            .sorted_transactions(SortKey::default(), SortOrder::default())
            .iter()
            .map(|txn| txn.id)
            .collect();
    }
    let id = *ctx
        .last_listing
        .get(index - 1)
        .ok_or_else(|| invalid(format!("No transaction at index {}", index)))?;

    let Some(txn) = ctx.tracker.store().get(id).cloned() else {
        return Err(invalid(format!("No transaction at index {}", index)));
    };
    let summary = format!(
        "{} on {}",
        format_money(txn.amount, txn.currency),
        txn.date.format(DATE_FORMAT)
    );
    if !ctx.confirm(&format!("Delete {}?", summary))? {
        output::info("Deletion cancelled.");
        return Ok(());
    }

    ctx.tracker.remove_transaction(id)?;
    ctx.last_listing.clear();
    output::success(format!("Deleted {}.", summary));
    Ok(())
}

fn cmd_stats(ctx: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let stats = ctx.tracker.statistics();
    let currency = stats.currency;
    output::section(format!("Statistics ({})", currency));
    output::info(format!("  Total:          {}", format_money(stats.total, currency)));
    output::info(format!("  Average:        {}", format_money(stats.average, currency)));
    output::info(format!("  Days recorded:  {}", stats.days_recorded));
    output::info(format!(
        "  Initial balance: {}",
        format_money(stats.initial_balance, currency)
    ));
    output::info(format!("  Balance:        {}", format_money(stats.balance, currency)));
    Ok(())
}

fn cmd_calendar(ctx: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (year, month) = match args.first() {
        Some(raw) => calendar::parse_month(raw)
            .ok_or_else(|| invalid(format!("`{}` is not a month in YYYY-MM format", raw)))?,
        None => {
            let today = ctx.tracker.today();
            (today.year(), today.month())
        }
    };

    let totals = ctx.tracker.month_totals(year, month);
    output::section(format!(
        "{:04}-{:02} daily totals ({})",
        year,
        month,
        ctx.tracker.principal()
    ));
    output::info(calendar::render_month(year, month, &totals));
    let month_total: f64 = totals.values().sum();
    output::info(format!(
        "Month total: {}",
        format_money(month_total, ctx.tracker.principal())
    ));
    Ok(())
}

fn cmd_convert(ctx: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [amount, from, to] = args else {
        return Err(invalid("usage: convert <amount> <from> <to>"));
    };
    let amount = parse_amount(amount)?;

    match ctx.tracker.converter().conversion(amount, from, to) {
        Conversion::Converted { amount: converted, rate } => output::info(format!(
            "{} {} = {} {} (rate {})",
            format_number(amount, 2),
            from.to_uppercase(),
            format_number(converted, 2),
            to.to_uppercase(),
            format_number(rate, 6)
        )),
        Conversion::Identity(same) => output::info(format!(
            "{} {} = {} {}",
            format_number(amount, 2),
            from.to_uppercase(),
            format_number(same, 2),
            to.to_uppercase()
        )),
        Conversion::Unchanged(same) => output::warning(format!(
            "No rate for {} -> {}; amount left unchanged at {}.",
            from,
            to,
            format_number(same, 2)
        )),
    }
    Ok(())
}

fn cmd_rates(ctx: &mut ShellContext, args: &[&str]) -> CommandResult {
    match args.first() {
        Some(arg) if arg.eq_ignore_ascii_case("refresh") => {
            report_refresh(ctx.tracker.converter_mut().refresh());
        }
        Some(other) => return Err(invalid(format!("unknown rates option `{}`", other))),
        None => {}
    }

    let converter = ctx.tracker.converter();
    let snapshot = converter.snapshot();
    output::section(format!("Exchange rates ({})", converter.source()));
    output::info(format!(
        "  Last update: {}",
        snapshot.last_update().format("%Y-%m-%d %H:%M UTC")
    ));
    for currency in converter.supported_currencies() {
        let rate = snapshot
            .rate(*currency)
            .map(|rate| format_number(rate, 4))
            .unwrap_or_else(|| "n/a".to_string());
        output::info(format!("  1 USD = {} {}", rate, currency));
    }
    Ok(())
}

fn cmd_config(ctx: &mut ShellContext, args: &[&str]) -> CommandResult {
    match args {
        [] => {
            let config = ctx.tracker.config();
            output::section("Configuration");
            output::info(format!("  principal: {}", config.principal_currency));
            output::info(format!(
                "  balance:   {}",
                format_money(config.initial_balance, config.principal_currency)
            ));
            output::info(format!("  rates:     {}", config.rates.endpoint));
            output::info(format!(
                "  data dir:  {}",
                ctx.tracker.base_dir().display()
            ));
            output::info(format!("  config:    {}", ctx.tracker.config_path().display()));
            output::info(format!(
                "  records:   {}",
                ctx.tracker.store().path().display()
            ));
            Ok(())
        }
        [key, value] => {
            ctx.tracker.update_config(key, value)?;
            output::success(format!("Updated {}.", key));
            Ok(())
        }
        _ => Err(invalid("usage: config [principal <CODE> | balance <amount>]")),
    }
}

fn cmd_version(_ctx: &mut ShellContext, _args: &[&str]) -> CommandResult {
    output::info(build_info::current().summary());
    Ok(())
}

fn cmd_exit(_ctx: &mut ShellContext, _args: &[&str]) -> CommandResult {
    Err(CommandError::ExitRequested)
}
