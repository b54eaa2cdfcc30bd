use std::io::Write;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{Datelike, NaiveDate};
use clap::{Parser, Subcommand};
use lexitrack_core::auth::AuthClient;
use lexitrack_core::calendar::{parse_month, DayTier, MonthView};
use lexitrack_core::config::{resolve_user_id, LexitrackConfig, StoredSession};
use lexitrack_core::gateway::{create_gateway, Gateway};
use lexitrack_core::model::*;
use lexitrack_core::session::{Session, SessionOptions};
use lexitrack_core::template::TemplateCatalog;
use owo_colors::OwoColorize;
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "lexitrack",
    about = "Lexitrack: daily practice schedules, milestones and streaks",
    version
)]
enum Cli {
    /// Log in and remember the session token
    Login {
        #[arg(long)]
        email: String,
        /// Password (prompted on stdin, or read from LEXITRACK_PASSWORD, when omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account and log in
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: Option<String>,
        /// Display name for the new profile
        #[arg(long)]
        name: Option<String>,
    },
    /// Forget the stored session token
    Logout,
    /// Show user, gateway and progress overview
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Show or edit the profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Show today's schedule
    Schedule {
        #[arg(long)]
        json: bool,
    },
    /// Add, edit, remove or complete schedule tasks
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },
    /// Log a task as done today without touching its checkbox
    Log {
        /// Task position in `lexitrack schedule` or id prefix
        task: String,
    },
    /// List milestones for the current severity
    Milestones {
        #[arg(long)]
        json: bool,
    },
    /// Complete or redo a milestone
    Milestone {
        #[command(subcommand)]
        action: MilestoneAction,
    },
    /// Progress tracking controls
    Track {
        #[command(subcommand)]
        action: TrackAction,
    },
    /// Show the progress calendar for a month
    Calendar {
        /// Month as YYYY-MM (default: current month)
        #[arg(long)]
        month: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Show current and best streak
    Streak {
        #[arg(long)]
        json: bool,
    },
    /// Manage emergency contacts
    Contacts {
        #[command(subcommand)]
        action: ContactAction,
    },
    /// Manage checkup logs
    Checkups {
        #[command(subcommand)]
        action: CheckupAction,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Show every profile field
    Show {
        #[arg(long)]
        json: bool,
    },
    /// Set a field (see `lexitrack profile fields`). An empty value clears it.
    Set { key: String, value: String },
    /// List editable fields
    Fields,
}

#[derive(Subcommand)]
enum TaskAction {
    /// Add a custom task
    Add {
        /// Time of day as HH:MM
        time: String,
        /// What to do
        #[arg(num_args = 1.., required = true)]
        activity: Vec<String>,
    },
    /// Edit a task's time or activity
    Edit {
        task: String,
        #[arg(long)]
        time: Option<String>,
        #[arg(long)]
        activity: Option<String>,
    },
    /// Remove a task
    Remove { task: String },
    /// Check a task off (logs it for today)
    Done {
        task: String,
        /// Uncheck instead
        #[arg(long)]
        undo: bool,
    },
}

#[derive(Subcommand)]
enum MilestoneAction {
    /// Complete a pending milestone
    Complete {
        /// Milestone id or position in `lexitrack milestones`
        id: String,
    },
    /// Redo a completed milestone for bonus points
    Redo { id: String },
}

#[derive(Subcommand)]
enum TrackAction {
    /// Start tracking from today. Resets milestones, points and daily logs.
    Start {
        /// Required, the reset cannot be undone
        #[arg(long)]
        confirm: bool,
    },
}

#[derive(Subcommand)]
enum ContactAction {
    List {
        #[arg(long)]
        json: bool,
    },
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        relationship: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        email: Option<String>,
    },
    /// Remove by position or id prefix
    Remove { id: String },
}

#[derive(Subcommand)]
enum CheckupAction {
    List {
        #[arg(long)]
        json: bool,
    },
    Add {
        #[arg(long)]
        practitioner: String,
        /// Visit date as YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Assessment score, 0-100
        #[arg(long)]
        score: Option<u8>,
    },
    /// Remove by position or id prefix
    Remove { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = std::env::var("LEXITRACK_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .compact()
        .init();

    let cli = Cli::parse();
    let config = LexitrackConfig::load(Some(&std::env::current_dir()?))
        .unwrap_or_else(|_| LexitrackConfig::default_config());

    run(cli, &config).await
}

async fn run(cli: Cli, config: &LexitrackConfig) -> Result<()> {
    match cli {
        Cli::Login { email, password } => cmd_login(config, &email, password).await,
        Cli::Signup {
            email,
            password,
            name,
        } => cmd_signup(config, &email, password, name).await,
        Cli::Logout => cmd_logout(),
        Cli::Status { json } => {
            let session = open_session(config).await?;
            cmd_status(&session, config, json)
        }
        Cli::Profile {
            action: ProfileAction::Fields,
        } => {
            cmd_profile_fields();
            Ok(())
        }
        Cli::Profile {
            action: ProfileAction::Show { json },
        } => {
            let session = open_session(config).await?;
            cmd_profile_show(&session, json)
        }
        Cli::Profile {
            action: ProfileAction::Set { key, value },
        } => {
            let mut session = open_session(config).await?;
            cmd_profile_set(&mut session, &key, &value).await?;
            finish(session).await
        }
        Cli::Schedule { json } => {
            let session = open_session(config).await?;
            cmd_schedule(&session, json)
        }
        Cli::Task { action } => {
            let mut session = open_session(config).await?;
            if !require_severity(&session) {
                return Ok(());
            }
            cmd_task(&mut session, action).await?;
            finish(session).await
        }
        Cli::Log { task } => {
            let mut session = open_session(config).await?;
            if !require_severity(&session) {
                return Ok(());
            }
            cmd_log(&mut session, &task).await?;
            finish(session).await
        }
        Cli::Milestones { json } => {
            let session = open_session(config).await?;
            cmd_milestones(&session, json)
        }
        Cli::Milestone { action } => {
            let mut session = open_session(config).await?;
            if !require_severity(&session) {
                return Ok(());
            }
            cmd_milestone(&mut session, action).await?;
            finish(session).await
        }
        Cli::Track {
            action: TrackAction::Start { confirm },
        } => {
            if !confirm {
                bail!("this resets milestones, points and daily logs; re-run with --confirm");
            }
            let mut session = open_session(config).await?;
            session.start_tracking_progress().await?;
            println!(
                "{} Tracking starts {}. Milestones, points and logs were reset.",
                "Done.".green(),
                session.today()
            );
            finish(session).await
        }
        Cli::Calendar { month, json } => {
            let session = open_session(config).await?;
            cmd_calendar(&session, month.as_deref(), json)
        }
        Cli::Streak { json } => {
            let session = open_session(config).await?;
            cmd_streak(&session, json)
        }
        Cli::Contacts { action } => {
            let mut session = open_session(config).await?;
            cmd_contacts(&mut session, action).await?;
            finish(session).await
        }
        Cli::Checkups { action } => {
            let mut session = open_session(config).await?;
            cmd_checkups(&mut session, action).await?;
            finish(session).await
        }
    }
}

// -- Session plumbing --

async fn open_session(config: &LexitrackConfig) -> Result<Session<Gateway>> {
    let stored = StoredSession::load();
    let user_id = resolve_user_id(&config.user, &stored).ok_or_else(|| {
        anyhow!("no user: run `lexitrack login --email <you@example.com>` or set user.email in config")
    })?;
    let gateway = create_gateway(config, stored.token()).context("failed to open gateway")?;
    let catalog = TemplateCatalog::load(&config.templates).context("failed to load templates")?;
    let session = Session::open(
        Arc::new(gateway),
        catalog,
        &user_id,
        SessionOptions::from_config(config),
    )
    .await?;

    if session.state().auth_expired() {
        eprintln!(
            "{} session expired, please run `lexitrack login` again",
            "warning:".yellow()
        );
    } else if let Some(error) = session.state().error() {
        eprintln!("{} {error}", "warning:".yellow());
    }
    Ok(session)
}

/// Drain the write queue and report failed saves.
async fn finish(mut session: Session<Gateway>) -> Result<()> {
    let status = session.flush().await;
    if status.auth_expired {
        eprintln!(
            "{} changes were not saved, session expired. Run `lexitrack login` again.",
            "warning:".yellow()
        );
    } else if status.failed > 0 {
        let error = status.last_error.unwrap_or_else(|| "unknown error".into());
        eprintln!("{} {error}", "warning:".yellow());
    }
    tracing::debug!(
        applied = status.applied,
        stale = status.stale,
        coalesced = status.coalesced,
        "saves flushed"
    );
    Ok(())
}

fn require_severity(session: &Session<Gateway>) -> bool {
    if session.state().needs_severity() {
        println!(
            "No severity set yet. Run {} first.",
            "lexitrack profile set severity <mild|moderate|severe>".cyan()
        );
        return false;
    }
    true
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// -- Auth --

fn read_password(flag: Option<String>) -> Result<String> {
    if let Some(password) = flag {
        return Ok(password);
    }
    if let Ok(password) = std::env::var("LEXITRACK_PASSWORD") {
        if !password.is_empty() {
            return Ok(password);
        }
    }
    eprint!("Password: ");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("password cannot be empty");
    }
    Ok(password)
}

async fn cmd_login(config: &LexitrackConfig, email: &str, password: Option<String>) -> Result<()> {
    let email = email.trim();
    if config.gateway.backend == "sqlite" {
        StoredSession::new(email, "").save()?;
        println!(
            "{} Using the local database as {}; no password needed.",
            "Logged in.".green(),
            email.cyan()
        );
        return Ok(());
    }
    let password = read_password(password)?;
    let client = AuthClient::new(config.gateway.auth_base_url(), config.gateway.timeout_secs)?;
    let token = client.login(email, &password).await.context("login failed")?;
    StoredSession::new(email, token).save()?;
    println!("{} as {}", "Logged in".green(), email.cyan());
    Ok(())
}

async fn cmd_signup(
    config: &LexitrackConfig,
    email: &str,
    password: Option<String>,
    name: Option<String>,
) -> Result<()> {
    let email = email.trim();
    if config.gateway.backend == "sqlite" {
        bail!("signup needs the http gateway; with the local database just run `lexitrack login`");
    }
    let password = read_password(password)?;
    let client = AuthClient::new(config.gateway.auth_base_url(), config.gateway.timeout_secs)?;
    let token = client
        .signup(email, &password, name.as_deref())
        .await
        .context("signup failed")?;
    StoredSession::new(email, token).save()?;
    println!("{} Logged in as {}", "Account created.".green(), email.cyan());
    Ok(())
}

fn cmd_logout() -> Result<()> {
    StoredSession::clear_token()?;
    println!("Logged out.");
    Ok(())
}

// -- Status --

fn cmd_status(session: &Session<Gateway>, config: &LexitrackConfig, json: bool) -> Result<()> {
    let state = session.state();
    let streak = session.streak();
    let current = state.milestones().current();

    if json {
        return print_json(&serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "user": state.user_id(),
            "gateway": session.gateway().describe(),
            "schema_version": session.gateway().schema_version(),
            "severity": state.severity(),
            "points": state.milestones().points(),
            "current_milestone": current.map(|m| &m.id),
            "tracking_started": state.tracking_started(),
            "streak": streak,
            "sync_policy": config.sync.policy,
            "error": state.error(),
            "auth_expired": state.auth_expired(),
        }));
    }

    let version = env!("CARGO_PKG_VERSION");
    println!("{}", format!("Lexitrack Status v{version}").bold());
    println!("  {}       {}", "User:".dimmed(), state.user_id());
    println!("  {}    {}", "Gateway:".dimmed(), session.gateway().describe());
    if let Some(schema) = session.gateway().schema_version() {
        println!("  {}   schema v{schema}", "Database:".dimmed());
    }
    match state.severity() {
        Some(s) => println!("  {}   {}", "Severity:".dimmed(), s.to_string().cyan()),
        None => println!("  {}   {}", "Severity:".dimmed(), "not set".yellow()),
    }
    println!(
        "  {}     {} ({} of {} milestones)",
        "Points:".dimmed(),
        state.milestones().points().to_string().cyan(),
        state.milestones().completed_count(),
        state.milestones().tasks().len()
    );
    match current {
        Some(m) => println!("  {}       {}", "Next:".dimmed(), m.task),
        None if !state.milestones().tasks().is_empty() => {
            println!("  {}       {}", "Next:".dimmed(), "all milestones complete".green())
        }
        None => {}
    }
    println!(
        "  {}   {}",
        "Tracking:".dimmed(),
        state
            .tracking_started()
            .map(|d| format!("since {d}"))
            .unwrap_or_else(|| "not started".to_string())
    );
    println!(
        "  {}     {} day(s), best {}",
        "Streak:".dimmed(),
        streak.current.to_string().cyan(),
        streak.best
    );
    println!("  {}       {}", "Sync:".dimmed(), config.sync.policy);
    if state.auth_expired() {
        println!("  {}       {}", "Auth:".dimmed(), "expired".red());
    }
    Ok(())
}

// -- Profile --

fn cmd_profile_show(session: &Session<Gateway>, json: bool) -> Result<()> {
    let profile = session.state().profile();
    if json {
        return print_json(profile);
    }
    for field in PROFILE_FIELDS {
        let value = profile.field(field.key);
        println!(
            "  {:<16} {}",
            format!("{}:", field.label).dimmed(),
            value.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

async fn cmd_profile_set(session: &mut Session<Gateway>, key: &str, value: &str) -> Result<()> {
    let before = session.state().severity();
    session.set_profile_field(key, value).await?;
    let label = field_descriptor(key).map(|d| d.label).unwrap_or(key);
    println!("{} {label} updated.", "Done.".green());
    let after = session.state().severity();
    if before != after {
        match after {
            Some(s) => println!(
                "Schedule and milestones switched to {} ({} tasks).",
                s.to_string().cyan(),
                session.state().schedule().len()
            ),
            None => println!("Severity cleared; the schedule is empty until one is set."),
        }
    }
    Ok(())
}

fn cmd_profile_fields() {
    for field in PROFILE_FIELDS {
        let kind = match field.kind {
            FieldKind::Text => "text".to_string(),
            FieldKind::Number => "number".to_string(),
            FieldKind::Choice(choices) => choices.join("|"),
        };
        let note = if field.editable { "" } else { " (read-only)" };
        println!(
            "  {:<16} {:<16} {}{}",
            field.key.cyan(),
            field.label,
            kind.dimmed(),
            note.dimmed()
        );
    }
}

// -- Schedule --

fn cmd_schedule(session: &Session<Gateway>, json: bool) -> Result<()> {
    let state = session.state();
    if json {
        return print_json(&state.schedule().tasks());
    }
    let Some(severity) = state.severity() else {
        require_severity(session);
        return Ok(());
    };
    println!(
        "{}",
        format!("Schedule ({severity}) for {}", session.today()).bold()
    );
    for (i, task) in state.schedule().tasks().iter().enumerate() {
        let check = if task.completed {
            "[x]".green().to_string()
        } else {
            "[ ]".to_string()
        };
        let custom = if task.is_custom {
            " custom".magenta().to_string()
        } else {
            String::new()
        };
        println!(
            "  {:>2}. {} {} {}{}",
            i + 1,
            check,
            task.time.cyan(),
            task.activity,
            custom
        );
    }
    let logged = state
        .daily_log_for(session.today())
        .map(|e| e.completed_tasks.len())
        .unwrap_or(0);
    println!("{}", format!("  {logged} logged today").dimmed());
    Ok(())
}

fn short_id(id: &Uuid) -> String {
    id.to_string()[..8].to_string()
}

async fn cmd_task(session: &mut Session<Gateway>, action: TaskAction) -> Result<()> {
    match action {
        TaskAction::Add { time, activity } => {
            let activity = activity.join(" ");
            let task = session.add_custom_task(&time, &activity).await?;
            println!(
                "{} Added {} {} ({})",
                "Done.".green(),
                task.time.cyan(),
                task.activity,
                short_id(&task.id).dimmed()
            );
        }
        TaskAction::Edit {
            task,
            time,
            activity,
        } => {
            if time.is_none() && activity.is_none() {
                bail!("nothing to change: pass --time and/or --activity");
            }
            let id = session.state().schedule().resolve(&task)?;
            session.update_task(id, TaskUpdate { time, activity }).await?;
            println!("{} Task updated.", "Done.".green());
        }
        TaskAction::Remove { task } => {
            let id = session.state().schedule().resolve(&task)?;
            let activity = session
                .state()
                .schedule()
                .get(id)
                .map(|t| t.activity.clone())
                .unwrap_or_default();
            session.delete_task(id).await?;
            println!("{} Removed \"{activity}\".", "Done.".green());
        }
        TaskAction::Done { task, undo } => {
            let id = session.state().schedule().resolve(&task)?;
            if undo {
                session.uncomplete_task(id).await?;
                println!("Unchecked. Today's log is kept.");
            } else if session.complete_task(id).await? {
                println!("{} Logged for {}.", "Nice work!".green(), session.today());
            } else {
                println!("Already logged today.");
            }
        }
    }
    Ok(())
}

async fn cmd_log(session: &mut Session<Gateway>, task: &str) -> Result<()> {
    let id = session.state().schedule().resolve(task)?;
    if session.log_task_for_today(id).await? {
        println!("{} Logged for {}.", "Done.".green(), session.today());
    } else {
        println!("Already logged today.");
    }
    Ok(())
}

// -- Milestones --

fn cmd_milestones(session: &Session<Gateway>, json: bool) -> Result<()> {
    let queue = session.state().milestones();
    if json {
        return print_json(&serde_json::json!({
            "points": queue.points(),
            "current": queue.current().map(|m| &m.id),
            "milestones": queue.tasks(),
        }));
    }
    if queue.tasks().is_empty() {
        require_severity(session);
        return Ok(());
    }
    println!(
        "{}",
        format!("Milestones: {} points", queue.points()).bold()
    );
    let current = queue.current().map(|m| m.id.as_str());
    for (i, m) in queue.tasks().iter().enumerate() {
        let marker = if m.completed {
            "[x]".green().to_string()
        } else if Some(m.id.as_str()) == current {
            "[>]".yellow().to_string()
        } else {
            "[ ]".to_string()
        };
        let done = m
            .completion_date
            .map(|d| format!(" done {d}"))
            .unwrap_or_default();
        println!(
            "  {:>2}. {} {} ({} pts, {}){}",
            i + 1,
            marker,
            m.task,
            m.points,
            m.id.dimmed(),
            done.dimmed()
        );
        if Some(m.id.as_str()) == current && !m.description.is_empty() {
            println!("        {}", m.description.dimmed());
        }
    }
    Ok(())
}

fn resolve_milestone(session: &Session<Gateway>, selector: &str) -> Result<(String, bool)> {
    session
        .state()
        .milestones()
        .resolve(selector)
        .map(|m| (m.id.clone(), m.completed))
        .ok_or_else(|| anyhow!("no milestone matching '{selector}'"))
}

async fn cmd_milestone(session: &mut Session<Gateway>, action: MilestoneAction) -> Result<()> {
    match action {
        MilestoneAction::Complete { id } => {
            let (id, completed) = resolve_milestone(session, &id)?;
            if completed {
                println!(
                    "Already completed. Use {} for bonus points.",
                    format!("lexitrack milestone redo {id}").cyan()
                );
                return Ok(());
            }
            if let Some(done) = session.mark_milestone_completed(&id).await? {
                println!(
                    "{} {} (+{} points, {} total)",
                    "Milestone reached!".green().bold(),
                    done.task,
                    done.points_awarded,
                    done.total_points
                );
                match done.next_milestone.and_then(|next| {
                    session
                        .state()
                        .milestones()
                        .get(&next)
                        .map(|m| m.task.clone())
                }) {
                    Some(next) => println!("  {} {next}", "Next up:".dimmed()),
                    None => println!("  {}", "Every milestone is complete.".green()),
                }
            }
        }
        MilestoneAction::Redo { id } => {
            let (id, completed) = resolve_milestone(session, &id)?;
            if !completed {
                bail!("milestone '{id}' is not completed yet; use `lexitrack milestone complete`");
            }
            if let Some(points) = session.redo_milestone(&id).await? {
                println!(
                    "{} +{points} bonus points ({} total)",
                    "Practice counts!".green(),
                    session.state().milestones().points()
                );
            }
        }
    }
    Ok(())
}

// -- Calendar --

fn cmd_calendar(session: &Session<Gateway>, month: Option<&str>, json: bool) -> Result<()> {
    let (year, month) = match month {
        Some(raw) => parse_month(raw)?,
        None => {
            let today = session.today();
            (today.year(), today.month())
        }
    };
    let view = session.calendar_month(year, month)?;
    if json {
        return print_json(&view);
    }
    print_month(&view);
    Ok(())
}

fn print_month(view: &MonthView) {
    let title = NaiveDate::from_ymd_opt(view.year, view.month, 1)
        .map(|d| d.format("%B %Y").to_string())
        .unwrap_or_default();
    println!("{}", title.bold());
    println!("{}", "  Su  Mo  Tu  We  Th  Fr  Sa".dimmed());

    let mut line = String::from(" ");
    let mut column = 0;
    for _ in 0..view.leading_blanks {
        line.push_str("    ");
        column += 1;
    }
    for cell in &view.days {
        let marker = if cell.has_milestone() { '*' } else { ' ' };
        let text = format!("{:>3}{marker}", cell.date.day());
        let styled = match cell.tier {
            DayTier::Outside => text.dimmed().to_string(),
            DayTier::Idle => text,
            DayTier::Low => text.yellow().to_string(),
            DayTier::Mid => text.cyan().to_string(),
            DayTier::High => text.green().bold().to_string(),
        };
        if cell.is_today {
            line.push_str(&styled.underline().to_string());
        } else {
            line.push_str(&styled);
        }
        column += 1;
        if column == 7 {
            println!("{line}");
            line = String::from(" ");
            column = 0;
        }
    }
    if column > 0 {
        println!("{line}");
    }
    println!(
        "{}",
        format!(
            "  {} active day(s), {} task(s) logged, {} milestone(s)   * = milestone",
            view.stats.active_days, view.stats.tasks_logged, view.stats.milestones_reached
        )
        .dimmed()
    );
}

fn cmd_streak(session: &Session<Gateway>, json: bool) -> Result<()> {
    let summary = session.streak();
    if json {
        return print_json(&summary);
    }
    if summary.current > 0 {
        println!(
            "{} {} day(s) in a row",
            "Streak:".bold(),
            summary.current.to_string().green()
        );
    } else {
        println!("{} none yet today, log a task to start one", "Streak:".bold());
    }
    println!(
        "  {} {}   {} {}",
        "Best:".dimmed(),
        summary.best,
        "Active days:".dimmed(),
        summary.active_days
    );
    Ok(())
}

// -- Records --

/// Resolve a record by 1-based position or id prefix.
fn resolve_record(ids: &[Uuid], selector: &str, what: &str) -> Result<Uuid> {
    let selector = selector.trim();
    if let Some(id) = selector
        .parse::<usize>()
        .ok()
        .and_then(|p| p.checked_sub(1))
        .and_then(|i| ids.get(i))
    {
        return Ok(*id);
    }
    let matches: Vec<&Uuid> = ids
        .iter()
        .filter(|id| id.to_string().starts_with(selector))
        .collect();
    match matches.as_slice() {
        [id] => Ok(**id),
        [] => bail!("no {what} matching '{selector}'"),
        _ => bail!("'{selector}' matches {} {what}s, use a longer prefix", matches.len()),
    }
}

async fn cmd_contacts(session: &mut Session<Gateway>, action: ContactAction) -> Result<()> {
    match action {
        ContactAction::List { json } => {
            let contacts = session.state().contacts();
            if json {
                return print_json(&contacts);
            }
            if contacts.is_empty() {
                println!("No emergency contacts yet.");
            }
            for (i, c) in contacts.iter().enumerate() {
                let email = c.email.as_deref().map(|e| format!(" <{e}>")).unwrap_or_default();
                println!(
                    "  {:>2}. {} ({}) {}{} {}",
                    i + 1,
                    c.name.bold(),
                    c.relationship,
                    c.phone.cyan(),
                    email,
                    short_id(&c.id).dimmed()
                );
            }
        }
        ContactAction::Add {
            name,
            relationship,
            phone,
            email,
        } => {
            let mut contact = EmergencyContact::new(name, relationship, phone);
            if let Some(email) = email {
                contact = contact.with_email(email);
            }
            let name = contact.name.clone();
            session.add_contact(contact).await?;
            println!("{} Added {name}.", "Done.".green());
        }
        ContactAction::Remove { id } => {
            let ids: Vec<Uuid> = session.state().contacts().iter().map(|c| c.id).collect();
            let id = resolve_record(&ids, &id, "contact")?;
            session.remove_contact(id).await?;
            println!("{} Contact removed.", "Done.".green());
        }
    }
    Ok(())
}

async fn cmd_checkups(session: &mut Session<Gateway>, action: CheckupAction) -> Result<()> {
    match action {
        CheckupAction::List { json } => {
            let logs = session.state().checkups();
            if json {
                return print_json(&logs);
            }
            if logs.is_empty() {
                println!("No checkups logged yet.");
            }
            for (i, log) in logs.iter().enumerate() {
                let score = log.score.map(|s| format!(" score {s}")).unwrap_or_default();
                println!(
                    "  {:>2}. {} {}{} {}",
                    i + 1,
                    log.date.to_string().cyan(),
                    log.practitioner.bold(),
                    score,
                    short_id(&log.id).dimmed()
                );
                if !log.notes.is_empty() {
                    println!("        {}", log.notes.dimmed());
                }
            }
        }
        CheckupAction::Add {
            practitioner,
            date,
            notes,
            score,
        } => {
            let date = match date {
                Some(raw) => parse_lenient_date(&raw)
                    .ok_or_else(|| anyhow!("date must be YYYY-MM-DD, got '{raw}'"))?,
                None => session.today(),
            };
            let mut log = CheckupLog::new(date, practitioner);
            if let Some(notes) = notes {
                log = log.with_notes(notes);
            }
            if let Some(score) = score {
                log = log.with_score(score);
            }
            session.add_checkup(log).await?;
            println!("{} Checkup on {date} logged.", "Done.".green());
        }
        CheckupAction::Remove { id } => {
            let ids: Vec<Uuid> = session.state().checkups().iter().map(|c| c.id).collect();
            let id = resolve_record(&ids, &id, "checkup")?;
            session.remove_checkup(id).await?;
            println!("{} Checkup removed.", "Done.".green());
        }
    }
    Ok(())
}
