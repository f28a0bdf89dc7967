pub mod entries;
pub mod history;
pub mod report;
pub mod session;

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, level_filters::LevelFilter};

use crate::{
    auth::{local_session::LocalSessionAuth, AuthProvider},
    store::{entry_store::EntryStore, repository::FileEntryRepository},
    utils::{
        clock::DefaultClock,
        dir::{create_application_default_path, create_application_path},
        logging::{enable_logging, LogSettings},
        time::DateStyle,
    },
};

use entries::{AddCommand, EditCommand};
use history::ListCommand;
use report::ReportCommand;
use session::LoginCommand;

#[derive(Parser, Debug)]
#[command(name = "Timesheet", version, long_about = None)]
#[command(about = "Record daily achievements and summarize them", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging to the console")]
    log: bool,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default uses $XDG_STATE_HOME/timesheet or $HOME/.local/state/timesheet"
    )]
    dir: Option<PathBuf>,
    #[arg(long, global = true, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Sign in. Entries of the signed in user are used by every other command")]
    Login {
        #[command(flatten)]
        command: LoginCommand,
    },
    #[command(about = "Sign out")]
    Logout {},
    #[command(about = "Show the signed in user")]
    Whoami {},
    #[command(about = "Record work for a day")]
    Add {
        #[command(flatten)]
        command: AddCommand,
    },
    #[command(about = "Change an existing entry")]
    Edit {
        #[command(flatten)]
        command: EditCommand,
    },
    #[command(about = "Delete an entry")]
    Remove {
        #[arg(help = "Id of the entry, as shown by `list`")]
        id: String,
    },
    #[command(about = "Show recorded work for a year or a month")]
    List {
        #[command(flatten)]
        command: ListCommand,
    },
    #[command(about = "Show the years that have recorded work")]
    Years {},
    #[command(about = "Summarize recorded work with Gemini")]
    Report {
        #[command(flatten)]
        command: ReportCommand,
    },
}

const LOG_FILE_PREFIX: &str = "timesheet";

pub type CliStore = EntryStore<Arc<LocalSessionAuth>, FileEntryRepository>;

/// Everything a command needs: the session, the loaded entries and the listener keeping them in
/// sync with the session.
pub struct Workspace {
    pub auth: Arc<LocalSessionAuth>,
    pub store: Arc<CliStore>,
    pub clock: DefaultClock,
    pub date_style: DateStyle,
    shutdown: CancellationToken,
    listener: JoinHandle<()>,
}

impl Workspace {
    /// Resolves the stored session and waits for its entries to load.
    pub async fn open(app_dir: PathBuf, date_style: DateStyle) -> Result<Self> {
        let auth = Arc::new(LocalSessionAuth::new(&app_dir));
        let repository = FileEntryRepository::new(&app_dir)?;
        let store = Arc::new(EntryStore::new(auth.clone(), repository));

        let shutdown = CancellationToken::new();
        let listener = tokio::spawn({
            let store = store.clone();
            let events = auth.session_events();
            let shutdown = shutdown.clone();
            async move { store.follow_sessions(events, shutdown).await }
        });

        auth.announce_initial_session();
        let loaded = store.wait_until_loaded().await;
        debug!("Workspace opened with {} entries", loaded.entries.len());

        Ok(Self {
            auth,
            store,
            clock: DefaultClock,
            date_style,
            shutdown,
            listener,
        })
    }

    pub async fn close(self) -> Result<()> {
        self.shutdown.cancel();
        self.listener.await?;
        Ok(())
    }
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = args
        .dir
        .map_or_else(create_application_default_path, create_application_path)?;

    enable_logging(&LogSettings {
        dir: app_dir.join("logs"),
        file_prefix: LOG_FILE_PREFIX.to_string(),
        level: args.log.then_some(LevelFilter::TRACE),
        echo_to_stdout: args.log,
    })?;

    let workspace = Workspace::open(app_dir, args.date_style).await?;

    let result = match args.commands {
        Commands::Login { command } => session::login(&workspace, command).await,
        Commands::Logout {} => session::logout(&workspace).await,
        Commands::Whoami {} => session::whoami(&workspace).await,
        Commands::Add { command } => entries::add(&workspace, command).await,
        Commands::Edit { command } => entries::edit(&workspace, command).await,
        Commands::Remove { id } => entries::remove(&workspace, id).await,
        Commands::List { command } => history::list(&workspace, command),
        Commands::Years {} => history::years(&workspace),
        Commands::Report { command } => report::process_report_command(&workspace, command).await,
    };

    workspace.close().await?;
    result
}
