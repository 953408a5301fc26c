//! Taskboard CLI - track project tasks and checklist progress.

use clap::Parser;
use std::path::Path;
use std::process;
use std::time::Instant;
use taskboard::action_log;
use taskboard::auth::{GUEST_USER, Session};
use taskboard::cli::{ChecklistCommands, Cli, Commands, ConfigCommands};
use taskboard::commands::{self, CreateArgs, Output};
use taskboard::config::{self, ConfigOverrides, OutputFormat, ResolvedConfig, TaskboardConfig};
use taskboard::models::TaskPatch;
use taskboard::storage::JsonFileStore;
use taskboard::store::TaskStore;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Filter directive for diagnostics on stderr, e.g. `TB_LOG=debug`.
const LOG_ENV: &str = "TB_LOG";

/// Set to emit diagnostics as JSON lines.
const LOG_JSON_ENV: &str = "TB_LOG_JSON";

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let (cmd_name, args_json) = serialize_command(&cli.command);
    let start = Instant::now();

    let config_path = config::config_path(cli.config.as_deref());
    let file_config = match config::load_config(config_path.as_deref()) {
        Ok(c) => c,
        Err(e) => fail(&e, cli.human_readable),
    };

    let mut overrides = ConfigOverrides::new();
    if let Some(path) = cli.data_file.clone() {
        overrides = overrides.with_data_file(path);
    }
    if cli.human_readable {
        overrides = overrides.with_output_format(OutputFormat::Human);
    }
    let resolved = match config::resolve_config(&file_config, &overrides) {
        Ok(r) => r,
        Err(e) => fail(&e, cli.human_readable),
    };
    let human = *resolved.output_format() == OutputFormat::Human;

    let mut user = cli.user.clone().unwrap_or_else(|| GUEST_USER.to_string());
    let result = commands::open_session(
        &resolved.users,
        cli.user.as_deref(),
        cli.password.as_deref(),
    )
    .and_then(|session| {
        user = session.username.clone();
        let ctx = Context {
            config_path: config_path.as_deref(),
            file_config: &file_config,
            resolved: &resolved,
            session: &session,
            human,
        };
        run_command(cli.command, &ctx)
    });

    let duration = start.elapsed().as_millis() as u64;
    let (success, error) = match &result {
        Ok(_) => (true, None),
        Err(e) => (false, Some(e.to_string())),
    };
    action_log::log_action(
        &commands::data_dir_of(resolved.data_file()),
        &cmd_name,
        args_json,
        &user,
        success,
        error,
        duration,
    );

    if let Err(e) = result {
        fail(&e, human);
    }
}

/// Diagnostics go to stderr so stdout stays machine-readable.
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let json = std::env::var_os(LOG_JSON_ENV).is_some();
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
        }))
        .try_init();
}

fn fail(e: &taskboard::Error, human: bool) -> ! {
    if human {
        eprintln!("Error: {}", e);
    } else {
        eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
    }
    process::exit(1);
}

/// Everything a command needs besides its own arguments.
struct Context<'a> {
    config_path: Option<&'a Path>,
    file_config: &'a TaskboardConfig,
    resolved: &'a ResolvedConfig,
    session: &'a Session,
    human: bool,
}

impl Context<'_> {
    fn open_store(&self) -> TaskStore<JsonFileStore> {
        TaskStore::open(JsonFileStore::new(self.resolved.data_file()))
    }
}

fn run_command(command: Commands, ctx: &Context<'_>) -> Result<(), taskboard::Error> {
    let human = ctx.human;
    let session = ctx.session;

    match command {
        Commands::Whoami => output(&commands::whoami(session), human),

        Commands::List { status, category } => {
            let store = ctx.open_store();
            output(
                &commands::task_list(&store, status, category.as_deref()),
                human,
            );
        }

        Commands::Show { id } => {
            let store = ctx.open_store();
            output(&commands::task_show(&store, id)?, human);
        }

        Commands::Summary => {
            let store = ctx.open_store();
            output(&commands::summary(&store), human);
        }

        Commands::Create {
            name,
            start,
            finish,
            category,
            status,
            notes,
            checklist,
            item,
        } => {
            let mut store = ctx.open_store();
            let args = CreateArgs {
                name,
                start,
                finish,
                category,
                status,
                notes,
                checklist,
                items: item,
            };
            output(&commands::task_create(&mut store, session, args)?, human);
        }

        Commands::Update {
            id,
            name,
            start,
            finish,
            category,
            notes,
        } => {
            let mut store = ctx.open_store();
            let patch = TaskPatch {
                name,
                start,
                finish,
                category,
                notes,
            };
            output(&commands::task_update(&mut store, session, id, patch)?, human);
        }

        Commands::Delete { id } => {
            let mut store = ctx.open_store();
            output(&commands::task_delete(&mut store, session, id)?, human);
        }

        Commands::Status { id, status } => {
            let mut store = ctx.open_store();
            output(&commands::task_status(&mut store, session, id, status)?, human);
        }

        Commands::Notes { id, text } => {
            let mut store = ctx.open_store();
            output(&commands::task_notes(&mut store, session, id, &text)?, human);
        }

        Commands::Complete { id } => {
            let mut store = ctx.open_store();
            output(&commands::task_complete(&mut store, session, id)?, human);
        }

        Commands::Reopen { id } => {
            let mut store = ctx.open_store();
            output(&commands::task_reopen(&mut store, session, id)?, human);
        }

        Commands::Checklist { command } => {
            let mut store = ctx.open_store();
            match command {
                ChecklistCommands::Add { id, text } => {
                    output(&commands::checklist_add(&mut store, session, id, &text)?, human);
                }
                ChecklistCommands::Toggle { id, index } => {
                    output(
                        &commands::checklist_toggle(&mut store, session, id, index)?,
                        human,
                    );
                }
                ChecklistCommands::Remove { id, index } => {
                    output(
                        &commands::checklist_remove(&mut store, session, id, index)?,
                        human,
                    );
                }
                ChecklistCommands::Clear { id } => {
                    output(&commands::checklist_clear(&mut store, session, id)?, human);
                }
            }
        }

        Commands::Import { file } => {
            let mut store = ctx.open_store();
            output(&commands::import_csv(&mut store, session, &file)?, human);
        }

        Commands::Config { command } => match command {
            ConfigCommands::Show => output(
                &commands::config_show(ctx.config_path, ctx.file_config, ctx.resolved),
                human,
            ),
            ConfigCommands::SetUser {
                username,
                new_password,
                role,
            } => {
                let path = ctx.config_path.ok_or_else(|| {
                    taskboard::Error::Config(
                        "No config location; pass --config or set TB_CONFIG".to_string(),
                    )
                })?;
                output(
                    &commands::config_set_user(
                        path,
                        ctx.file_config,
                        session,
                        &username,
                        &new_password,
                        role,
                    )?,
                    human,
                );
            }
        },
    }

    Ok(())
}

/// Print output in JSON or human-readable format.
fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}

/// Serialize command to extract name and arguments for logging.
fn serialize_command(command: &Commands) -> (String, serde_json::Value) {
    use serde_json::json;

    match command {
        Commands::Whoami => ("whoami".to_string(), json!({})),
        Commands::List { status, category } => (
            "list".to_string(),
            json!({ "status": status, "category": category }),
        ),
        Commands::Show { id } => ("show".to_string(), json!({ "id": id })),
        Commands::Summary => ("summary".to_string(), json!({})),
        Commands::Create {
            name,
            start,
            finish,
            category,
            status,
            notes,
            checklist,
            item,
        } => (
            "create".to_string(),
            json!({
                "name": name,
                "start": start,
                "finish": finish,
                "category": category,
                "status": status,
                "notes": notes,
                "checklist": checklist,
                "item": item,
            }),
        ),
        Commands::Update {
            id,
            name,
            start,
            finish,
            category,
            notes,
        } => (
            "update".to_string(),
            json!({
                "id": id,
                "name": name,
                "start": start,
                "finish": finish,
                "category": category,
                "notes": notes,
            }),
        ),
        Commands::Delete { id } => ("delete".to_string(), json!({ "id": id })),
        Commands::Status { id, status } => (
            "status".to_string(),
            json!({ "id": id, "status": status }),
        ),
        Commands::Notes { id, text } => ("notes".to_string(), json!({ "id": id, "text": text })),
        Commands::Complete { id } => ("complete".to_string(), json!({ "id": id })),
        Commands::Reopen { id } => ("reopen".to_string(), json!({ "id": id })),
        Commands::Checklist { command } => match command {
            ChecklistCommands::Add { id, text } => (
                "checklist add".to_string(),
                json!({ "id": id, "text": text }),
            ),
            ChecklistCommands::Toggle { id, index } => (
                "checklist toggle".to_string(),
                json!({ "id": id, "index": index }),
            ),
            ChecklistCommands::Remove { id, index } => (
                "checklist remove".to_string(),
                json!({ "id": id, "index": index }),
            ),
            ChecklistCommands::Clear { id } => {
                ("checklist clear".to_string(), json!({ "id": id }))
            }
        },
        Commands::Import { file } => ("import".to_string(), json!({ "file": file })),
        Commands::Config { command } => match command {
            ConfigCommands::Show => ("config show".to_string(), json!({})),
            ConfigCommands::SetUser {
                username,
                new_password,
                role,
            } => (
                "config set-user".to_string(),
                json!({ "username": username, "new_password": new_password, "role": role }),
            ),
        },
    }
}
