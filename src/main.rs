//! lotto-store - drive the auth and agencies stores against a live backend.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use lotto_store::alert::LogAlertPresenter;
use lotto_store::api::{ApiLoginService, ApiStructureService, HttpApiClient};
use lotto_store::config::Config;
use lotto_store::core::{ApiClient, EffectHandlers, RemoteData, Store};
use lotto_store::features::agencies::{
    AgenciesEnv, AgenciesModel, AgenciesMsg, AgenciesUpdate, Session,
};
use lotto_store::features::auth::{AuthEnv, AuthMsg, AuthUpdate, Password, LOGIN_ROUTE};
use lotto_store::logging::init_tracing;
use lotto_store::router::HistoryRouter;

#[derive(Parser)]
#[command(name = "lotto-store")]
#[command(about = "Run lottery operator flows through the app state core", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: ~/.config/lotto-store/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and, for users bound to a structure, load its agencies
    Login {
        #[arg(long)]
        username: String,

        #[arg(long)]
        password: String,
    },

    /// Load the agencies of a structure with an existing token
    Agencies {
        #[arg(long)]
        token: String,

        #[arg(long)]
        structure_id: String,
    },

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    init_tracing(&config.logging.level, cli.verbose);

    match cli.command {
        Commands::Config => {
            let path = cli.config.unwrap_or_else(Config::config_path);
            println!("# {}", path.display());
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Login { username, password } => login(&config, username, password).await,
        Commands::Agencies {
            token,
            structure_id,
        } => agencies(&config, token, structure_id).await,
    }
}

struct Wiring {
    api: Arc<dyn ApiClient>,
    router: Arc<HistoryRouter>,
    handlers: EffectHandlers,
}

fn wire(config: &Config) -> Result<Wiring> {
    let api: Arc<dyn ApiClient> =
        Arc::new(HttpApiClient::new(&config.api).context("Failed to create API client")?);
    let router = Arc::new(HistoryRouter::new(LOGIN_ROUTE));
    let handlers = EffectHandlers::current()?
        .with_api(Arc::clone(&api))
        .with_router(router.clone())
        .with_alerts(Arc::new(LogAlertPresenter));
    Ok(Wiring {
        api,
        router,
        handlers,
    })
}

async fn login(config: &Config, username: String, password: String) -> Result<()> {
    let Wiring {
        api,
        router,
        handlers,
    } = wire(config)?;

    let auth = Store::<AuthUpdate>::create(
        AuthEnv {
            login: Arc::new(ApiLoginService::new(Arc::clone(&api))),
        },
        (),
        handlers.clone(),
    );
    let agencies = Store::<AgenciesUpdate>::create(
        AgenciesEnv {
            structures: Arc::new(ApiStructureService::new(api)),
            auth: Some(auth.clone()),
        },
        None,
        handlers,
    );

    auth.dispatch(AuthMsg::LoginRequested {
        username,
        password: Password::new(password),
    });
    auth.settled().await;
    agencies.settled().await;

    let session = auth.model();
    let Some(user) = &session.user else {
        match &session.login_session.error {
            Some(error) => bail!("Login failed: {}", error),
            None => bail!("Login did not complete"),
        }
    };
    println!("Signed in as {} ({})", user.username, user.role);
    println!("Route: {}", router.current().pathname);
    print_agencies(&agencies.model())
}

async fn agencies(config: &Config, token: String, structure_id: String) -> Result<()> {
    let Wiring { api, handlers, .. } = wire(config)?;

    let store = Store::<AgenciesUpdate>::create(
        AgenciesEnv {
            structures: Arc::new(ApiStructureService::new(api)),
            auth: None,
        },
        Some(structure_id),
        handlers,
    );
    store.dispatch(AgenciesMsg::SessionChanged {
        session: Some(Session {
            token,
            structure_id: None,
        }),
    });
    store.settled().await;

    print_agencies(&store.model())
}

fn print_agencies(model: &AgenciesModel) -> Result<()> {
    match &model.agencies {
        RemoteData::NotAsked => println!("No structure to load agencies for"),
        RemoteData::Loading => bail!("Agencies request did not finish"),
        RemoteData::Failure(error) => bail!("Failed to load agencies: {}", error),
        RemoteData::Success(agencies) => {
            println!(
                "Agencies of structure {}:",
                model.user_structure_id.as_deref().unwrap_or("?")
            );
            for agency in agencies {
                println!(
                    "  {:<12} {:<30} {} listeros",
                    agency.id, agency.name, agency.listero_count
                );
            }
        }
    }
    Ok(())
}
