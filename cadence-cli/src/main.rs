use anyhow::{anyhow, bail, Context, Result};
use cadence_core::time::parse_timestamp;
use cadence_core::{DaySlots, Plan, ReconcileAction, ReconcileReport, SchedulerKernel};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod calendar;
mod config;
mod sources;
mod state;
mod store;
mod weather;

use config::Config;
use sources::{CalendarFile, TaskFile, TemplateFiles};
use store::JsonCalendarStore;
use weather::LookedUpWeather;

#[derive(Parser, Debug)]
#[command(
    name = "cadence",
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("CADENCE_BUILD_SHA"), ")"),
    about = "Energy-aware time-slot scheduler"
)]
struct Cli {
    /// Config file (default: $CADENCE_HOME/config.toml, else ~/.cadence/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level for stderr output (overrides [logging] level)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default config.toml and a sample weekly template
    Init,

    /// Rank tasks, allocate them into free slots and write them to the calendar file
    Plan {
        /// Plan as if it were this instant (RFC 3339 or local "YYYY-MM-DD HH:MM")
        #[arg(long)]
        now: Option<String>,

        /// Compute the plan without touching the calendar file
        #[arg(long)]
        dry_run: bool,

        /// Also export the allocations as an ICS file
        #[arg(long)]
        ics: Option<PathBuf>,

        /// Print the result as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the ranked task list with scores
    Score {
        #[arg(long)]
        now: Option<String>,
    },

    /// Print the candidate slots for one task
    Slots {
        /// Task id
        #[arg(long)]
        task: String,

        #[arg(long)]
        now: Option<String>,
    },
}

fn setup_logging(level: &str) -> Result<()> {
    let level: tracing::Level = level
        .trim()
        .parse()
        .map_err(|_| anyhow!("invalid log level '{level}' (expected trace, debug, info, warn or error)"))?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    debug!("Logging initialized (level: {})", level);
    Ok(())
}

fn resolve_now(arg: Option<&str>, tz: Tz) -> Result<DateTime<Utc>> {
    match arg {
        Some(s) => parse_timestamp(s, tz).ok_or_else(|| anyhow!("--now: unreadable timestamp '{s}'")),
        None => Ok(calendar::ceil_to_quarter_hour(Utc::now())),
    }
}

type Kernel = SchedulerKernel<TaskFile, TemplateFiles, CalendarFile, LookedUpWeather>;

struct Session {
    cfg: Config,
    base: PathBuf,
    tz: Tz,
}

impl Session {
    fn load(config: Option<&Path>, log_level: Option<&str>) -> Result<Self> {
        let path = config::config_path(config)?;
        let cfg = config::load_config(&path)?;
        setup_logging(log_level.unwrap_or(&cfg.logging.level))?;
        debug!(config = %path.display(), "config loaded");

        let tz = cfg.scheduler.validate().context("invalid [scheduler] configuration")?;
        Ok(Self {
            base: config::config_dir(&path),
            cfg,
            tz,
        })
    }

    fn path(&self, configured: &Path) -> PathBuf {
        state::resolve_path(&self.base, configured)
    }

    fn calendar_path(&self) -> PathBuf {
        self.path(&self.cfg.sources.calendar)
    }

    async fn kernel(&self) -> Kernel {
        let sources = &self.cfg.sources;
        let weather = weather::lookup(&self.cfg.weather, &self.base, self.cfg.scheduler.weather.hot_threshold_c).await;
        SchedulerKernel::new(
            self.cfg.scheduler.clone(),
            TaskFile {
                path: self.path(&sources.tasks),
                tz: self.tz,
            },
            TemplateFiles {
                standard: self.path(&sources.template),
                hot_weather: sources.hot_template.as_deref().map(|p| self.path(p)),
            },
            CalendarFile {
                path: self.calendar_path(),
                tz: self.tz,
                marker: self.cfg.scheduler.marker.clone(),
            },
            weather,
        )
    }
}

fn local(dt: DateTime<Utc>, tz: Tz) -> String {
    dt.with_timezone(&tz).format("%a %d %b %H:%M").to_string()
}

fn print_ranked(plan: &Plan) {
    println!("Ranked tasks ({}):", plan.ranked.len());
    for (i, s) in plan.ranked.iter().enumerate() {
        println!(
            "  {:>2}. [{:.3}] {} ({} min, {} energy) id={}",
            i + 1,
            s.score,
            s.task.name,
            s.task.duration_minutes,
            s.task.energy,
            s.task.id
        );
    }
}

fn print_plan(plan: &Plan, tz: Tz) {
    println!("Template: {}", plan.variant);
    print_ranked(plan);

    println!();
    println!("Allocations ({}):", plan.allocations.len());
    for a in &plan.allocations {
        let name = plan.task(&a.task_id).map(|t| t.name.as_str()).unwrap_or("?");
        let split = if plan.is_split(&a.task_id) { "  [split]" } else { "" };
        println!(
            "  {} - {}  {}{}",
            local(a.interval.start, tz),
            a.interval.end.with_timezone(&tz).format("%H:%M"),
            name,
            split
        );
    }

    if !plan.unscheduled.is_empty() {
        println!();
        println!("Unscheduled ({}):", plan.unscheduled.len());
        for u in &plan.unscheduled {
            let name = plan.task(&u.task_id).map(|t| t.name.as_str()).unwrap_or("?");
            if u.is_partial() {
                println!(
                    "  {} - placed {} of {} min, {} min left",
                    name,
                    u.placed_minutes,
                    u.requested_minutes,
                    u.remaining_minutes()
                );
            } else {
                println!("  {} - no free slot ({} min)", name, u.requested_minutes);
            }
        }
    }

    if !plan.issues.is_empty() {
        println!();
        println!("Issues ({}):", plan.issues.len());
        for issue in &plan.issues {
            println!("  {issue}");
        }
    }
}

fn print_reconcile(actions: &[ReconcileAction], report: Option<&ReconcileReport>, tz: Tz) {
    println!();
    let Some(report) = report else {
        println!("Calendar not updated (existing allocations could not be read).");
        return;
    };
    println!(
        "Calendar: {} created, {} moved, {} unchanged",
        report.created.len(),
        report.updated.len(),
        report.skipped
    );
    for action in actions {
        if let ReconcileAction::Update { task_id, from, to, .. } = action {
            println!("  moved {}: {} -> {}", task_id, local(from.start, tz), local(to.start, tz));
        }
    }
    for f in &report.failures {
        println!("  failed: {f}");
    }
}

fn print_slots(task_id: &str, days: &[DaySlots], tz: Tz) {
    if days.is_empty() {
        println!("No candidate slots for task {task_id}.");
        return;
    }
    for day in days {
        println!("{} ({} min free):", day.date.format("%a %d %b"), day.total_minutes());
        for s in &day.slots {
            println!(
                "  {} - {} ({} min)",
                s.start.with_timezone(&tz).format("%H:%M"),
                s.end.with_timezone(&tz).format("%H:%M"),
                s.minutes()
            );
        }
    }
}

fn write_ics(path: &Path, plan: &Plan, session: &Session) -> Result<()> {
    let ics = calendar::allocations_to_ics(plan, &session.cfg.scheduler);
    std::fs::write(path, ics).with_context(|| format!("write {}", path.display()))?;
    info!(path = %path.display(), blocks = plan.allocations.len(), "ICS exported");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Init => {
            let path = config::config_path(cli.config.as_deref())?;
            if config::init_config(&path)? {
                println!("Wrote {}", path.display());
            } else {
                println!("Config already exists: {}", path.display());
            }
            let cfg = config::load_config(&path)?;
            let template = state::resolve_path(&config::config_dir(&path), &cfg.sources.template);
            if state::write_sample_template(&template)? {
                println!("Wrote sample template {}", template.display());
            }
        }

        Command::Plan {
            now,
            dry_run,
            ics,
            json,
        } => {
            let session = Session::load(cli.config.as_deref(), cli.log_level.as_deref())?;
            let now = resolve_now(now.as_deref(), session.tz)?;
            let kernel = session.kernel().await;
            info!(now = %now, dry_run, "planning");

            if dry_run {
                let plan = kernel.plan(now)?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&plan)?);
                } else {
                    print_plan(&plan, session.tz);
                }
                if let Some(p) = ics {
                    write_ics(&p, &plan, &session)?;
                }
            } else {
                let mut store = JsonCalendarStore::open(session.calendar_path(), session.tz, &session.cfg.scheduler.marker)?;
                let report = kernel.run(&mut store, now)?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else {
                    print_plan(&report.plan, session.tz);
                    print_reconcile(&report.actions, report.reconcile.as_ref(), session.tz);
                }
                if let Some(p) = ics {
                    write_ics(&p, &report.plan, &session)?;
                }
                if let Some(r) = report.reconcile.as_ref().filter(|r| !r.is_clean()) {
                    bail!(
                        "{} allocation(s) could not be written to {}",
                        r.failures.len(),
                        store.path().display()
                    );
                }
            }
        }

        Command::Score { now } => {
            let session = Session::load(cli.config.as_deref(), cli.log_level.as_deref())?;
            let now = resolve_now(now.as_deref(), session.tz)?;
            let plan = session.kernel().await.plan(now)?;
            print_ranked(&plan);
        }

        Command::Slots { task, now } => {
            let session = Session::load(cli.config.as_deref(), cli.log_level.as_deref())?;
            let now = resolve_now(now.as_deref(), session.tz)?;
            let Some(days) = session.kernel().await.slots_for(&task, now)? else {
                bail!("no schedulable task with id '{task}'");
            };
            print_slots(&task, &days, session.tz);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_cli_parses_plan_flags() {
        let cli = Cli::parse_from(["cadence", "--log-level", "debug", "plan", "--dry-run", "--now", "2026-03-02T08:00:00Z"]);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Command::Plan { now, dry_run, ics, json } => {
                assert_eq!(now.as_deref(), Some("2026-03-02T08:00:00Z"));
                assert!(dry_run);
                assert!(ics.is_none());
                assert!(!json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_resolve_now_accepts_local_time() {
        let tz: Tz = "Europe/London".parse().unwrap();
        // BST in July.
        let now = resolve_now(Some("2026-07-10 09:00"), tz).unwrap();
        assert_eq!(now, Utc.with_ymd_and_hms(2026, 7, 10, 8, 0, 0).unwrap());
        assert!(resolve_now(Some("tomorrow"), tz).is_err());
    }

    #[test]
    fn test_slots_requires_task() {
        assert!(Cli::try_parse_from(["cadence", "slots"]).is_err());
    }
}
