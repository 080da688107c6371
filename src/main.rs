mod cli;

use cinedex::{
    auth::{self, AuthProvider, IdentityClient, SessionStore},
    catalog::{DetailState, ListState, MovieDetailModel, MovieListModel},
    config,
    images::{CloudinaryHost, ImageGateway},
};
use cinedex_common::{MovieId, Outcome};
use cinedex_store::models::{Movie, MoviePatch};
use cinedex_store::realtime::RealtimeDbStore;
use cinedex_store::repository::{messages, MovieRepository};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, MovieFields};
use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Clients shared by the catalog commands.
struct Catalog {
    repo: MovieRepository,
    auth: Arc<IdentityClient>,
    images: Option<ImageGateway>,
}

fn build_auth(config: &config::Config) -> Arc<IdentityClient> {
    let sessions = SessionStore::new(config::session_path(config));
    Arc::new(IdentityClient::new(&config.auth).with_session_store(sessions))
}

fn build_images(config: &config::Config) -> Option<ImageGateway> {
    if !config.images.is_configured() {
        return None;
    }
    let host = Arc::new(CloudinaryHost::new(&config.images));
    Some(ImageGateway::new(host))
}

/// Connect to the database, sending the signed-in user's token with every
/// request. An expired session is refreshed first.
async fn connect(config: &config::Config) -> Result<Catalog> {
    if config.database.url.is_empty() {
        anyhow::bail!("database.url is not configured");
    }

    let auth = build_auth(config);
    match auth.fresh_session().await {
        Ok(Some(session)) => tracing::debug!(user = %session.user_id, "Using saved session"),
        Ok(None) => tracing::warn!("Not signed in; requests are unauthenticated"),
        Err(e) => tracing::warn!(error = %e, "Continuing without a session"),
    }

    let store = Arc::new(RealtimeDbStore::with_timeout(
        &config.database.url,
        Duration::from_secs(config.database.timeout_secs),
    ));
    let source = auth.clone();
    store.set_token_source(Box::new(move || {
        source.current_session().map(|s| s.id_token)
    }));

    let repo = MovieRepository::with_collection(store, config.database.collection.clone());
    Ok(Catalog {
        repo,
        auth,
        images: build_images(config),
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "cinedex=trace,cinedex_store=trace,cinedex_common=debug,reqwest=debug".to_string()
        } else {
            "cinedex=warn,cinedex_store=warn".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init { path, force } => init_config(&path, force),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("cinedex {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        command => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run(command, config))
        }
    }
}

async fn run(command: Commands, config: config::Config) -> Result<()> {
    match command {
        Commands::Login { email, password } => {
            let password = password_or_prompt(password, "Password: ")?;
            let auth = build_auth(&config);
            let session = auth.sign_in(&email, &password).await?;
            println!("✓ Signed in as {}", session.email);
            Ok(())
        }
        Commands::Register {
            email,
            password,
            confirm,
        } => {
            let password = password_or_prompt(password, "Password: ")?;
            let confirm = password_or_prompt(confirm, "Confirm password: ")?;
            let catalog = connect(&config).await?;
            let store = catalog.repo.store();
            let session = auth::register(
                catalog.auth.as_ref(),
                store.as_ref(),
                &email,
                &password,
                &confirm,
            )
            .await?;
            println!("✓ Registered and signed in as {}", session.email);
            Ok(())
        }
        Commands::Logout => {
            build_auth(&config).sign_out()?;
            println!("✓ Signed out");
            Ok(())
        }
        Commands::Whoami => {
            match build_auth(&config).current_session() {
                Some(session) => {
                    println!("{} ({})", session.email, session.user_id);
                    if session.is_expired() {
                        println!("  session expired; it is refreshed on the next request");
                    }
                }
                None => println!("{}", auth::messages::NOT_SIGNED_IN),
            }
            Ok(())
        }
        Commands::List { json, name } => {
            let catalog = connect(&config).await?;
            let movies = match name {
                Some(name) => catalog.repo.find_by_name(&name).await?,
                None => catalog.repo.list_once().await?,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&movies)?);
            } else {
                print_list(&movies);
            }
            Ok(())
        }
        Commands::Show { id, json } => {
            let catalog = connect(&config).await?;
            let model = MovieDetailModel::load(&catalog.repo, &MovieId::from(id)).await;
            match model.into_state() {
                DetailState::Loaded(movie) if json => {
                    println!("{}", serde_json::to_string_pretty(&movie)?);
                    Ok(())
                }
                DetailState::Loaded(movie) => {
                    print_movie(&movie);
                    Ok(())
                }
                DetailState::NotFound(message) | DetailState::Failed(message) => {
                    anyhow::bail!(message)
                }
            }
        }
        Commands::Add { fields } => {
            let catalog = connect(&config).await?;
            add_movie(&catalog, fields).await
        }
        Commands::Update { id, fields } => {
            let catalog = connect(&config).await?;
            update_movie(&catalog, &MovieId::from(id), fields).await
        }
        Commands::Delete { id } => {
            let catalog = connect(&config).await?;
            let res = catalog.repo.delete(&MovieId::from(id)).await;
            report(Outcome::from_result(&res, messages::DELETED))
        }
        Commands::Watch => {
            let catalog = connect(&config).await?;
            watch_movies(catalog.repo).await
        }
        Commands::Upload { file } => {
            let images = build_images(&config)
                .context("images.cloud_name, api_key and api_secret must be configured")?;
            let image = images.upload_detailed(&file).await?;
            println!("{}", image.url);
            Ok(())
        }
        Commands::Seed => {
            let catalog = connect(&config).await?;
            let added = catalog.repo.seed_samples().await?;
            println!("✓ Added {} sample movies", added);
            Ok(())
        }
        Commands::Init { .. } | Commands::Validate { .. } | Commands::Version => Ok(()),
    }
}

fn report(outcome: Outcome) -> Result<()> {
    if outcome.success {
        println!("✓ {}", outcome.message);
        Ok(())
    } else {
        anyhow::bail!(outcome.message)
    }
}

/// Upload `--image` if given and return the URL to store.
async fn poster_url(catalog: &Catalog, fields: &MovieFields) -> Result<Option<String>> {
    let Some(path) = fields.image.as_deref() else {
        return Ok(fields.image_url.clone());
    };
    let images = catalog
        .images
        .as_ref()
        .context("--image needs images.cloud_name, api_key and api_secret configured")?;

    match images.upload(path).await {
        Some(url) => Ok(Some(url)),
        None => anyhow::bail!("Failed to upload {:?}", path),
    }
}

fn check_rating(rating: Option<f64>) -> Result<()> {
    if let Some(rating) = rating {
        if !(1.0..=10.0).contains(&rating) {
            anyhow::bail!("Rating must be between 1 and 10, got {}", rating);
        }
    }
    Ok(())
}

async fn add_movie(catalog: &Catalog, fields: MovieFields) -> Result<()> {
    check_rating(fields.rating)?;
    let Some(name) = fields.name.clone().filter(|n| !n.trim().is_empty()) else {
        anyhow::bail!("--name is required");
    };
    let image_url = poster_url(catalog, &fields).await?;

    let mut movie = Movie {
        name,
        description: fields.description.unwrap_or_default(),
        rating: fields.rating.unwrap_or_default(),
        image_url: image_url.unwrap_or_default(),
        trailer_url: fields.trailer_url.unwrap_or_default(),
        release_year: fields.release_year.unwrap_or_default(),
        duration: fields.duration.unwrap_or_default(),
        age_rating: fields.age_rating.unwrap_or_default(),
        genres: fields.genres,
        ..Default::default()
    };

    let res = catalog.repo.add(&mut movie).await;
    if res.is_ok() {
        println!("{}", movie.id);
    }
    report(Outcome::from_result(&res, messages::ADDED))
}

async fn update_movie(catalog: &Catalog, id: &MovieId, fields: MovieFields) -> Result<()> {
    check_rating(fields.rating)?;
    let image_url = poster_url(catalog, &fields).await?;

    let mut patch = MoviePatch::new();
    if let Some(name) = fields.name {
        patch = patch.name(name);
    }
    if let Some(description) = fields.description {
        patch = patch.description(description);
    }
    if let Some(rating) = fields.rating {
        patch = patch.rating(rating);
    }
    if let Some(url) = image_url {
        patch = patch.image_url(url);
    }
    if let Some(url) = fields.trailer_url {
        patch = patch.trailer_url(url);
    }
    if let Some(year) = fields.release_year {
        patch = patch.release_year(year);
    }
    if let Some(duration) = fields.duration {
        patch = patch.duration(duration);
    }
    if let Some(age_rating) = fields.age_rating {
        patch = patch.age_rating(age_rating);
    }
    if !fields.genres.is_empty() {
        patch = patch.genres(fields.genres);
    }

    let res = catalog.repo.update(id, patch).await;
    report(Outcome::from_result(&res, messages::UPDATED))
}

async fn watch_movies(repo: MovieRepository) -> Result<()> {
    let mut model = MovieListModel::spawn(repo);
    println!("Watching movies (Ctrl-C to stop)...");

    loop {
        let state = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            state = model.changed() => state,
        };
        match state {
            Some(ListState::Loading) => {}
            Some(ListState::Loaded(movies)) => {
                println!("\n--- {} ---", chrono::Local::now().format("%H:%M:%S"));
                print_list(&movies);
            }
            Some(ListState::Failed(message)) => eprintln!("✗ {}", message),
            None => {
                println!("Subscription ended");
                break;
            }
        }
    }

    Ok(())
}

fn print_list(movies: &[Movie]) {
    if movies.is_empty() {
        println!("No movies");
        return;
    }
    for movie in movies {
        let year = if movie.release_year.is_empty() {
            String::new()
        } else {
            format!(" ({})", movie.release_year)
        };
        println!("{}  {:>4.1}  {}{}", movie.id, movie.rating, movie.name, year);
    }
}

fn print_movie(movie: &Movie) {
    println!("{}", movie.name);
    println!("  Id: {}", movie.id);
    println!("  Rating: {:.1}", movie.rating);
    let optional = [
        ("Released", &movie.release_year),
        ("Duration", &movie.duration),
        ("Age rating", &movie.age_rating),
        ("Poster", &movie.image_url),
        ("Trailer", &movie.trailer_url),
    ];
    for (label, value) in optional {
        if !value.is_empty() {
            println!("  {}: {}", label, value);
        }
    }
    if !movie.genres.is_empty() {
        println!("  Genres: {}", movie.genres.join(", "));
    }
    if !movie.description.is_empty() {
        println!("\n{}", movie.description);
    }
}

fn password_or_prompt(given: Option<String>, prompt: &str) -> Result<String> {
    if let Some(password) = given {
        return Ok(password);
    }

    eprint!("{}", prompt);
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    config::persist::save_config(path, &config::Config::default(), force)?;
    println!("✓ Wrote {:?}", path);
    println!("  Set database.url and auth.api_key before signing in");
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            print_config_summary(&config);
        }
        None => {
            println!("No config file specified, using defaults");
            print_config_summary(&config::Config::default());
        }
    }

    Ok(())
}

fn print_config_summary(config: &config::Config) {
    let or_unset = |s: &str| if s.is_empty() { "(not set)".to_string() } else { s.to_string() };
    println!("  Database: {}", or_unset(&config.database.url));
    println!("  Collection: {}", config.database.collection);
    println!("  Auth endpoint: {}", config.auth.endpoint);
    println!("  Sign-in enabled: {}", !config.auth.api_key.is_empty());
    println!("  Image uploads enabled: {}", config.images.is_configured());
}
