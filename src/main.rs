use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use colored::*;
use jiff::civil::Date;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use pm_tracker::{
    config::{Settings, SettingsFile},
    models::repository::{ProjectFilter, ProjectRepository, Upserted},
    services::{
        calendar::Calendar,
        projects::{SaveProjectParameters, delete_project, save_project},
        sync::{Notice, NoticeLevel, SyncCoordinator, SyncError},
        timeline,
    },
    storage::{DocumentStore, file::FileDocumentStore, github::GitHubStore},
    ui,
};

#[derive(Parser)]
#[command(
    name = "pm-tracker",
    about = "Track delivery projects kept in a shared JSON document"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure where the project document lives
    Config {
        /// Owner of the repository holding the document
        #[arg(long)]
        owner: Option<String>,

        /// Repository holding the document
        #[arg(long)]
        repo: Option<String>,

        /// Access token for the repository
        #[arg(long)]
        token: Option<String>,

        /// Path of the document inside the repository
        #[arg(long)]
        path: Option<String>,

        /// Keep the document in a local directory instead
        #[arg(long)]
        local_dir: Option<PathBuf>,
    },

    /// List projects by production release date
    List {
        /// Only projects whose name contains this text
        #[arg(short, long, default_value = "")]
        search: String,

        /// Only projects of this supplier
        #[arg(short = 'f', long)]
        supplier: Option<String>,
    },

    /// List every supplier
    Suppliers,

    /// Show the development timeline
    Timeline {
        /// Only projects of this supplier
        #[arg(short = 'f', long)]
        supplier: Option<String>,
    },

    /// Show milestones grouped by month
    Calendar,

    /// Create a project, or update one with --id
    Save(SaveArgs),

    /// Delete a project
    Delete {
        /// Project id
        id: String,

        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Create an empty project document
    Init,
}

#[derive(Args)]
struct SaveArgs {
    /// Id of the project to update
    #[arg(long)]
    id: Option<String>,

    /// Project name
    #[arg(short, long)]
    name: String,

    /// Comma-separated suppliers
    #[arg(short, long, default_value = "")]
    suppliers: String,

    /// Estimate date (YYYY-MM-DD)
    #[arg(long)]
    estimate: Date,

    /// Internal assessment delivery
    #[arg(long)]
    ia: Date,

    /// Development start
    #[arg(long)]
    dev_start: Date,

    /// Development end
    #[arg(long)]
    dev_end: Date,

    /// Test release
    #[arg(long)]
    test: Date,

    /// Production release
    #[arg(long)]
    prod: Date,

    /// User acceptance testing
    #[arg(long)]
    uat: Option<Date>,

    /// Business simulation
    #[arg(long)]
    bs: Option<Date>,

    /// Deadline for the supplier estimate
    #[arg(long)]
    estimate_deadline: Option<Date>,

    /// System configuration date
    #[arg(long)]
    config_date: Option<Date>,

    /// Estimated effort in person-days
    #[arg(long)]
    effort: Option<f64>,

    /// Supplier daily rate
    #[arg(long)]
    rate: Option<f64>,

    /// Ticket tracker link
    #[arg(short, long, default_value = "")]
    ticket: String,
}

impl From<SaveArgs> for SaveProjectParameters {
    fn from(args: SaveArgs) -> Self {
        SaveProjectParameters {
            id: args.id,
            name: args.name,
            suppliers: args.suppliers,
            estimate: args.estimate,
            internal_assessment: args.ia,
            dev_start: args.dev_start,
            dev_end: args.dev_end,
            test_release: args.test,
            prod_release: args.prod,
            uat: args.uat,
            business_simulation: args.bs,
            estimate_deadline: args.estimate_deadline,
            system_configuration: args.config_date,
            effort_days: args.effort,
            daily_rate: args.rate,
            ticket_url: args.ticket,
        }
    }
}

fn configure(
    settings_file: &SettingsFile,
    current: Option<Settings>,
    owner: Option<String>,
    repo: Option<String>,
    token: Option<String>,
    path: Option<String>,
    local_dir: Option<PathBuf>,
) {
    let mut settings = current.unwrap_or_default();
    if let Some(owner) = owner {
        settings.owner = owner.trim().to_string();
    }
    if let Some(repo) = repo {
        settings.repo = repo.trim().to_string();
    }
    if let Some(token) = token {
        settings.token = token.trim().to_string();
    }
    if let Some(path) = path {
        settings.path = path.trim().to_string();
    }
    if local_dir.is_some() {
        settings.local_dir = local_dir;
    }

    if let Err(e) = settings_file.save(&settings) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    println!(
        "Settings saved to {} ({})",
        settings_file.path().display(),
        settings.locator()
    );
}

/// Saves, then lists what to tell the user in order.
///
/// `done` is only reported once the document has actually been written;
/// conflicts are reported, never retried.
async fn persist<S: DocumentStore>(
    coordinator: &mut SyncCoordinator<S>,
    repository: &mut ProjectRepository,
    done: String,
) -> Vec<Notice> {
    match coordinator.save(repository).await {
        Ok(notice) => vec![Notice::new(NoticeLevel::Success, done), notice],
        Err(e) => vec![e.notice()],
    }
}

fn render_notices(notices: &[Notice]) {
    for notice in notices {
        ui::render_notice(notice);
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "pm_tracker=warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let settings_file = SettingsFile::default_location();
    let settings = match settings_file.load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let command = cli.command.unwrap_or(Commands::List {
        search: String::new(),
        supplier: None,
    });

    if let Commands::Config {
        owner,
        repo,
        token,
        path,
        local_dir,
    } = command
    {
        configure(&settings_file, settings, owner, repo, token, path, local_dir);
        return;
    }

    // Without a credential nothing is fetched or written
    let Some(settings) = settings.filter(Settings::can_sync) else {
        println!(
            "Not configured yet. Run {} first.",
            "pm-tracker config --owner <OWNER> --repo <REPO> --token <TOKEN>".bold()
        );
        return;
    };

    let store: Box<dyn DocumentStore> = match &settings.local_dir {
        Some(dir) => Box::new(FileDocumentStore::new(dir.clone())),
        None => match GitHubStore::new(settings.token.clone()) {
            Ok(store) => Box::new(store),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
    };

    let mut coordinator = SyncCoordinator::new(store, settings.locator());
    let mut repository = ProjectRepository::new();

    match coordinator.load(&mut repository).await {
        Ok(_) => {}
        Err(SyncError::DocumentMissing(_)) if matches!(command, Commands::Init) => {}
        Err(e) => {
            ui::render_notice(&e.notice());
            if matches!(e, SyncError::DocumentMissing(_)) {
                println!("Run {} to create it.", "pm-tracker init".bold());
            }
            return;
        }
    }

    match command {
        Commands::Config { .. } => {}
        Commands::List { search, supplier } => {
            let filter = ProjectFilter {
                name: search,
                supplier,
            };
            ui::render_project_table(repository.filter(&filter));
        }
        Commands::Suppliers => {
            ui::render_suppliers(&repository.distinct_suppliers());
        }
        Commands::Timeline { supplier } => {
            let filter = ProjectFilter {
                name: String::new(),
                supplier,
            };
            ui::render_timeline(&timeline::layout(repository.filter(&filter)));
        }
        Commands::Calendar => {
            ui::render_calendar(&Calendar::from_projects(repository.projects()));
        }
        Commands::Save(args) => match save_project(&mut repository, args.into()) {
            Ok(result) => {
                let verb = match result.outcome {
                    Upserted::Inserted => "Created",
                    Upserted::Replaced => "Updated",
                };
                let done = format!("{} {} ({})", verb, result.project.name, result.project.id);
                render_notices(&persist(&mut coordinator, &mut repository, done).await);
            }
            Err(e) => ui::render_notice(&Notice::new(NoticeLevel::Error, e.to_string())),
        },
        Commands::Delete { id, yes } => {
            let Some(project) = repository.get(&id) else {
                println!("No project with id {}", id);
                return;
            };
            if !yes {
                println!(
                    "Re-run with --yes to delete {}",
                    project.name.bold()
                );
                return;
            }
            if let Some(removed) = delete_project(&mut repository, &id) {
                let done = format!("Deleted {}", removed.name);
                render_notices(&persist(&mut coordinator, &mut repository, done).await);
            }
        }
        Commands::Init => {
            if coordinator.version().is_some() {
                println!("The project document already exists");
                return;
            }
            let done = "Created the project document".to_string();
            render_notices(&persist(&mut coordinator, &mut repository, done).await);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pm_tracker::{
        models::project::Project,
        storage::{DocumentLocator, json::encode_projects, memory::MemoryDocumentStore},
    };
    use pretty_assertions::assert_eq;

    fn locator() -> DocumentLocator {
        DocumentLocator::new("acme", "plans", "data/projects.json")
    }

    fn empty_store() -> MemoryDocumentStore {
        let empty: Vec<Project> = vec![];
        MemoryDocumentStore::with_document(locator(), encode_projects(&empty).unwrap())
    }

    #[tokio::test]
    async fn test_done_is_reported_after_the_write() {
        let store = empty_store();
        let mut coordinator = SyncCoordinator::new(store, locator());
        let mut repository = ProjectRepository::new();
        coordinator.load(&mut repository).await.unwrap();

        let notices = persist(&mut coordinator, &mut repository, "Created Billing".to_string()).await;

        assert_eq!(notices[0], Notice::new(NoticeLevel::Success, "Created Billing"));
        assert_eq!(notices.len(), 2);
    }

    #[tokio::test]
    async fn test_conflict_does_not_report_done() {
        let store = empty_store();
        let mut first = SyncCoordinator::new(store.clone(), locator());
        let mut second = SyncCoordinator::new(store, locator());
        let mut first_repository = ProjectRepository::new();
        let mut second_repository = ProjectRepository::new();
        first.load(&mut first_repository).await.unwrap();
        second.load(&mut second_repository).await.unwrap();

        first.save(&mut first_repository).await.unwrap();
        let notices = persist(&mut second, &mut second_repository, "Created Billing".to_string()).await;

        assert_eq!(notices, vec![SyncError::VersionConflict.notice()]);
    }
}
