//! goal-engine - weighted goal tracking for language learners
//!
//! Command-line front end and HTTP server for the goal engine.

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};

use goal_engine::analytics::GoalAnalytics;
use goal_engine::config::{default_data_dir, ConfigValidator, EngineConfig};
use goal_engine::consultation::BookingRequest;
use goal_engine::model::{
    Caller, Category, GoalDraft, GoalId, GoalView, MentorConsultation, MentorReview, TaskDraft,
    TaskId, TaskType, UserId,
};
use goal_engine::progress::{compute_progress, EXPECTED_WEIGHT_TOTAL};
use goal_engine::service::GoalService;
use goal_engine::tier::Tier;
use goal_engine::{EngineError, Result};

#[derive(Parser)]
#[command(name = "goal-engine")]
#[command(version)]
#[command(about = "Weighted goal progress, pace projection and mentor consultations", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Data directory holding the store, activity log and config
    #[arg(short, long, global = true, env = "GOAL_ENGINE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Config file (defaults to config.json or config.toml in the data directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Acting user id
    #[arg(short, long, global = true, env = "GOAL_ENGINE_USER", default_value = "local")]
    user: String,

    /// Membership tier (explorer, insider, visionary, or a billing plan name)
    #[arg(short, long, global = true, env = "GOAL_ENGINE_TIER", default_value = "explorer")]
    tier: Tier,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Listen address (overrides server.bind from config)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Manage goals
    Goal {
        #[command(subcommand)]
        action: GoalAction,
    },

    /// Act on a goal's tasks
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// Book and list mentor consultations
    Consult {
        #[command(subcommand)]
        action: ConsultAction,
    },

    /// Record a login for the acting user
    Login,

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum GoalAction {
    /// Create a goal with its task roadmap
    Create {
        /// What the learner wants to achieve
        objective: String,

        /// Target deadline (RFC 3339 or YYYY-MM-DD)
        #[arg(long, value_parser = parse_datetime)]
        deadline: DateTime<Utc>,

        /// Task as TYPE:CATEGORY:WEIGHT:TITLE; append `!` to TYPE to require verification
        #[arg(long = "task", value_parser = parse_task)]
        tasks: Vec<TaskDraft>,

        /// JSON file with an array of task drafts
        #[arg(long)]
        tasks_file: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the acting user's goals
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a goal and its tasks
    Show {
        goal_id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show progress, pace and activity analytics
    Analytics {
        goal_id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a goal and its tasks
    Delete { goal_id: String },
}

#[derive(Subcommand)]
enum TaskAction {
    /// Toggle completion of a system or self-tracked task
    Toggle {
        goal_id: String,
        task_id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Submit work for a mentor-assessed task
    Submit {
        goal_id: String,
        task_id: String,

        /// Link to the submitted work
        url: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record a mentor review, acting as `--user`
    Review {
        goal_id: String,
        task_id: String,

        /// Accept the work and complete the task
        #[arg(long)]
        approve: bool,

        /// Written feedback
        #[arg(long)]
        feedback: Option<String>,

        /// Score given by the mentor
        #[arg(long)]
        score: Option<u32>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ConsultAction {
    /// Book a consultation
    Book {
        goal_id: String,

        /// Start time (RFC 3339 or YYYY-MM-DD)
        #[arg(long, value_parser = parse_datetime)]
        at: DateTime<Utc>,

        /// Discussion topic (repeatable)
        #[arg(long = "topic")]
        topics: Vec<String>,

        /// Notes for the mentor
        #[arg(long)]
        notes: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List consultations for a goal
    List {
        goal_id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as JSON
    Show,

    /// Validate the configuration file
    Validate {
        /// Print the full report
        #[arg(long)]
        full: bool,
    },
}

fn parse_datetime(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("expected RFC 3339 or YYYY-MM-DD, got '{s}'"))
}

fn parse_task(s: &str) -> std::result::Result<TaskDraft, String> {
    let mut parts = s.splitn(4, ':');
    let (Some(kind), Some(category), Some(weight), Some(title)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(format!("expected TYPE:CATEGORY:WEIGHT:TITLE, got '{s}'"));
    };

    let (kind, requires_verification) = match kind.strip_suffix('!') {
        Some(kind) => (kind, true),
        None => (kind, false),
    };
    let task_type: TaskType = kind.parse().map_err(|e| format!("{e}"))?;
    let category: Category = category.parse().map_err(|e| format!("{e}"))?;
    let weight: u32 = weight
        .trim()
        .parse()
        .map_err(|_| format!("invalid weight '{weight}'"))?;

    Ok(TaskDraft {
        title: title.trim().to_string(),
        description: String::new(),
        task_type,
        category,
        weight,
        requires_verification,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; logs go to stderr so JSON output stays clean
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(if cli.verbose {
            "goal_engine=debug,info"
        } else {
            "goal_engine=info,warn"
        })
    });
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let data_dir = cli.data_dir.clone().unwrap_or_else(default_data_dir);

    if let Err(e) = run(cli, &data_dir).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(e.exit_code());
    }
    Ok(())
}

fn load_config(data_dir: &Path, explicit: Option<&Path>) -> Result<EngineConfig> {
    match explicit {
        Some(path) => EngineConfig::load(path),
        None => EngineConfig::load_from_data_dir(data_dir),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli, data_dir: &Path) -> Result<()> {
    // `config validate` must report a broken file instead of failing to load it
    if let Commands::Config {
        action: ConfigAction::Validate { full },
    } = &cli.command
    {
        let mut validator = ConfigValidator::new(data_dir);
        if let Some(path) = &cli.config {
            validator = validator.with_config_path(path.clone());
        }
        let report = validator.validate();
        if *full {
            println!("{}", report.verbose_report());
        } else {
            for error in &report.errors {
                eprintln!("{} {}", "Error:".red().bold(), error);
            }
            for warning in &report.warnings {
                println!("{} {}", "Warning:".yellow(), warning);
            }
            if report.is_valid() {
                println!("{} {}", "OK".green().bold(), report.summary());
            }
        }
        if !report.is_valid() {
            std::process::exit(report.exit_code());
        }
        return Ok(());
    }

    let config = load_config(data_dir, cli.config.as_deref())?;
    let service = GoalService::open(data_dir, &config);
    let caller = Caller::new(UserId::from_string(cli.user.clone()), cli.tier);
    let now = Utc::now();

    match cli.command {
        Commands::Serve { bind } => {
            let addr = match bind {
                Some(bind) => goal_engine::config::ServerConfig { bind }.bind_addr()?,
                None => config.server.bind_addr()?,
            };
            println!(
                "{} Serving {} from {}",
                "OK".green().bold(),
                addr.to_string().cyan(),
                data_dir.display()
            );
            goal_engine::server::serve(service, addr).await?;
        }

        Commands::Goal { action } => match action {
            GoalAction::Create {
                objective,
                deadline,
                mut tasks,
                tasks_file,
                json,
            } => {
                if let Some(path) = tasks_file {
                    let content = std::fs::read_to_string(&path)?;
                    let mut from_file: Vec<TaskDraft> = serde_json::from_str(&content)
                        .map_err(|e| {
                            EngineError::validation("tasks_file", format!("{}: {e}", path.display()))
                        })?;
                    from_file.append(&mut tasks);
                    tasks = from_file;
                }
                let draft = GoalDraft {
                    objective,
                    target_deadline: deadline,
                    tasks,
                };
                let goal = service.create_goal(&caller.user_id, draft, now)?;
                if json {
                    print_json(&goal)?;
                } else {
                    println!("{} Goal created: {}", "OK".green().bold(), goal.id);
                    let report = compute_progress(&goal.tasks);
                    if !report.weights_balanced {
                        println!(
                            "{} Task weights sum to {} (expected {})",
                            "Warning:".yellow(),
                            report.weight_total,
                            EXPECTED_WEIGHT_TOTAL
                        );
                    }
                }
            }

            GoalAction::List { json } => {
                let goals = service.list_goals(&caller.user_id)?;
                if json {
                    print_json(&goals)?;
                } else if goals.is_empty() {
                    println!("{} No goals yet", "Note:".yellow());
                } else {
                    for goal in &goals {
                        println!(
                            "{}  {:>3}%  {}  (due {})",
                            goal.id.to_string().dimmed(),
                            goal.overall_progress,
                            goal.objective.bold(),
                            goal.target_deadline.format("%Y-%m-%d")
                        );
                    }
                }
            }

            GoalAction::Show { goal_id, json } => {
                let view = service.goal_view(&GoalId::from_string(goal_id), &caller)?;
                if json {
                    print_json(&view)?;
                } else {
                    print_goal(&view);
                }
            }

            GoalAction::Analytics { goal_id, json } => {
                let analytics = service.analytics(&GoalId::from_string(goal_id), &caller.user_id, now)?;
                if json {
                    print_json(&analytics)?;
                } else {
                    print_analytics(&analytics);
                }
            }

            GoalAction::Delete { goal_id } => {
                let removed = service.delete_goal(&GoalId::from_string(goal_id), &caller.user_id)?;
                println!(
                    "{} Deleted goal {} ({} tasks)",
                    "OK".green().bold(),
                    removed.id,
                    removed.tasks.len()
                );
            }
        },

        Commands::Task { action } => match action {
            TaskAction::Toggle {
                goal_id,
                task_id,
                json,
            } => {
                let update = service.toggle_task(
                    &GoalId::from_string(goal_id),
                    &TaskId::from_string(task_id),
                    &caller,
                    now,
                )?;
                if json {
                    print_json(&update)?;
                } else {
                    let state = if update.task.is_completed {
                        "completed".green()
                    } else {
                        "reopened".yellow()
                    };
                    println!(
                        "{} {} {} - goal progress {}%",
                        "OK".green().bold(),
                        update.task.title.bold(),
                        state,
                        update.overall_progress
                    );
                }
            }

            TaskAction::Submit {
                goal_id,
                task_id,
                url,
                json,
            } => {
                let task = service.submit_assignment(
                    &GoalId::from_string(goal_id),
                    &TaskId::from_string(task_id),
                    &caller,
                    &url,
                    now,
                )?;
                if json {
                    print_json(&task)?;
                } else {
                    println!(
                        "{} Submitted {} for mentor review",
                        "OK".green().bold(),
                        task.title.bold()
                    );
                }
            }

            TaskAction::Review {
                goal_id,
                task_id,
                approve,
                feedback,
                score,
                json,
            } => {
                let review = MentorReview {
                    feedback,
                    score,
                    approved: approve,
                };
                let update = service.record_review(
                    &GoalId::from_string(goal_id),
                    &TaskId::from_string(task_id),
                    &caller,
                    review,
                    now,
                )?;
                if json {
                    print_json(&update)?;
                } else {
                    println!(
                        "{} Review recorded for {} - goal progress {}%",
                        "OK".green().bold(),
                        update.task.title.bold(),
                        update.overall_progress
                    );
                }
            }
        },

        Commands::Consult { action } => match action {
            ConsultAction::Book {
                goal_id,
                at,
                topics,
                notes,
                json,
            } => {
                let request = BookingRequest {
                    scheduled_at: at,
                    topics,
                    notes,
                };
                let booked =
                    service.book_consultation(&GoalId::from_string(goal_id), &caller, request, now)?;
                if json {
                    print_json(&booked)?;
                } else {
                    println!(
                        "{} Consultation booked for {}",
                        "OK".green().bold(),
                        booked.scheduled_at.format("%Y-%m-%d %H:%M UTC")
                    );
                }
            }

            ConsultAction::List { goal_id, json } => {
                let consultations =
                    service.consultations(&GoalId::from_string(goal_id), &caller.user_id)?;
                if json {
                    print_json(&consultations)?;
                } else {
                    print_consultations(&consultations);
                }
            }
        },

        Commands::Login => {
            service.record_login(&caller.user_id, now);
            println!("{} Login recorded for {}", "OK".green().bold(), caller.user_id);
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => print_json(&config)?,
            ConfigAction::Validate { .. } => {}
        },
    }

    Ok(())
}

fn progress_bar(percent: u8) -> String {
    let filled = usize::from(percent) / 5;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(20 - filled))
}

fn print_goal(view: &GoalView) {
    println!("\n{} {}", "Goal:".cyan().bold(), view.objective.bold());
    println!("{}", "─".repeat(40));
    println!(
        "Progress:  {} {}%",
        progress_bar(view.overall_progress),
        view.overall_progress
    );
    println!("Deadline:  {}", view.target_deadline.format("%Y-%m-%d"));
    println!("Tier:      {}", view.tier);
    println!();

    for entry in &view.tasks {
        let task = &entry.task;
        let mark = if task.is_completed {
            "✓".green().to_string()
        } else {
            " ".to_string()
        };
        let lock = if entry.is_actionable {
            String::new()
        } else {
            format!(" {}", "(upgrade to unlock)".yellow())
        };
        println!(
            "  [{}] {:>3}  {:<9} {:<16} {}{}",
            mark,
            task.weight,
            task.category.to_string(),
            task.task_type.to_string(),
            task.title,
            lock
        );
        println!("        {}", task.id.to_string().dimmed());
    }
}

fn print_analytics(a: &GoalAnalytics) {
    println!("\n{} {}", "Analytics:".cyan().bold(), a.goal_id);
    println!("{}", "─".repeat(40));
    println!(
        "Progress:          {} {}%",
        progress_bar(a.overall_progress),
        a.overall_progress
    );
    println!("Expected by now:   {:.1}%", a.expected_progress);
    let pace = if a.is_ahead_of_schedule {
        "ahead of schedule".green()
    } else {
        "behind schedule".red()
    };
    println!("Pace:              {}", pace);
    println!(
        "Days:              {} elapsed, {} remaining",
        a.days_elapsed, a.days_remaining
    );
    match a.projected_completion_date {
        Some(date) => println!("Projected finish:  {}", date.format("%Y-%m-%d")),
        None => println!("Projected finish:  -"),
    }
    println!("Weekly progress:   {:.2} points", a.average_progress_per_week);
    if !a.weights_balanced {
        println!(
            "{} Task weights sum to {}",
            "Warning:".yellow(),
            a.weight_total
        );
    }

    println!("\nBy category:");
    for (category, progress) in &a.category_progress {
        if progress.total > 0 {
            println!(
                "  {:<10} {}/{} ({}%)",
                category.to_string(),
                progress.completed,
                progress.total,
                progress.percentage
            );
        }
    }

    println!("\nActivity:");
    if a.activity_available {
        println!("  Days active:       {}", a.days_active);
        println!("  Completion streak: {}", a.completion_streak);
        match a.last_activity_date {
            Some(day) => println!("  Last activity:     {}", day),
            None => println!("  Last activity:     -"),
        }
    } else {
        println!("  {}", "activity log unavailable".yellow());
    }
}

fn print_consultations(consultations: &[MentorConsultation]) {
    if consultations.is_empty() {
        println!("{} No consultations booked", "Note:".yellow());
        return;
    }
    for c in consultations {
        let topics: Vec<&str> = c.discussion_topics.iter().map(String::as_str).collect();
        println!(
            "{}-{}  {}",
            c.scheduled_at.format("%Y-%m-%d %H:%M").to_string().bold(),
            c.ends_at().format("%H:%M UTC"),
            topics.join(", ")
        );
    }
}
