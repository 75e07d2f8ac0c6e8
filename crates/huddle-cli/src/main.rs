use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "huddle")]
#[command(about = "Huddle CLI - workspace task boards, chat and presence", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ~/.config/huddle/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Acting user (defaults to identity.user_id)
    #[arg(long, global = true)]
    user: Option<String>,

    /// Workspace to open (defaults to identity.workspace_id)
    #[arg(long, global = true)]
    workspace: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the task board
    Board {
        /// Only show tasks whose title or description contains this text
        #[arg(long)]
        search: Option<String>,
    },
    /// Move a task to another column
    Move {
        task_id: String,
        /// Target column: planning, in_progress, at_risk, update_required, on_hold, completed
        column: String,
    },
    /// Create a task
    Task {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        assignee: Option<String>,
    },
    /// Conversations and messages
    Chat {
        #[command(subcommand)]
        action: ChatAction,
    },
    /// Group management
    Group {
        #[command(subcommand)]
        action: GroupAction,
    },
    /// Show the effective configuration
    Config,
    /// Run a scripted session against the in-memory backend
    Demo,
}

#[derive(Subcommand)]
pub enum ChatAction {
    /// List conversations, most recent first
    List,
    /// Print the messages of a conversation
    History { conversation_id: String },
    /// Send a message
    Send {
        conversation_id: String,
        text: String,
    },
    /// Open (or reuse) the direct conversation with a member
    Direct { user_id: String },
}

#[derive(Subcommand)]
pub enum GroupAction {
    /// Create a group owned by the acting user
    Create {
        name: String,
        #[arg(long = "member", required = true)]
        members: Vec<String>,
    },
    Rename {
        conversation_id: String,
        name: String,
    },
    Add {
        conversation_id: String,
        #[arg(required = true)]
        user_ids: Vec<String>,
    },
    Remove {
        conversation_id: String,
        user_id: String,
    },
    Promote {
        conversation_id: String,
        user_id: String,
    },
    Transfer {
        conversation_id: String,
        user_id: String,
    },
    Delete { conversation_id: String },
    Leave { conversation_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_service = commands::config_service(cli.config.as_deref())?;
    let config = config_service.get_config()?;
    let _log_guard = logging::init(&config.logging)?;

    if matches!(cli.command, Commands::Demo) {
        return commands::demo::run().await;
    }
    if matches!(cli.command, Commands::Config) {
        return commands::show_config(&config_service, &config);
    }

    let target = commands::Target::resolve(&config, cli.user, cli.workspace)?;
    let session = commands::connect(&config, &target).await?;

    let result = match cli.command {
        Commands::Board { search } => commands::board::show(&session, search).await,
        Commands::Move { task_id, column } => {
            commands::board::move_task(&session, &task_id, &column).await
        }
        Commands::Task {
            title,
            description,
            assignee,
        } => commands::board::create(&session, title, description, assignee).await,
        Commands::Chat { action } => commands::chat::run(&session, action).await,
        Commands::Group { action } => commands::group::run(&session, action).await,
        Commands::Config | Commands::Demo => Ok(()),
    };

    session.end().await?;
    result
}
