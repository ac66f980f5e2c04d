use std::{env, fs, path::PathBuf, sync::Arc};

use clap::Parser;
use cli::{Args, Commands, OwnerArgs};
use horus_config::{
    config::{self, generate_default_config},
    get_config, CONFIG_PATH,
};
use horus_core::{
    cache::MemoryCache,
    error::{ErrorContext, HorusError},
    publish::Caller,
    registry::{CatalogPart, Registry},
    HorusResult,
};
use horus_db::DbConnection;
use logging::setup_logging;
use tracing::info;

mod cli;
mod logging;

impl From<OwnerArgs> for Caller {
    fn from(owner: OwnerArgs) -> Self {
        Caller {
            id: owner.owner_id,
            name: owner.owner_name,
            email: owner.owner_email,
        }
    }
}

fn create_registry() -> HorusResult<Registry> {
    let config = get_config();
    let db = DbConnection::open(config.db_path())?;
    Ok(Registry::new(db, Arc::new(MemoryCache::new()), config))
}

async fn handle_cli() -> HorusResult<()> {
    let args = Args::parse();

    setup_logging(&args);

    if let Some(ref path) = args.config {
        let mut config_path = CONFIG_PATH.write().unwrap();
        let path = PathBuf::from(path);
        *config_path = if path.is_absolute() {
            path
        } else {
            env::current_dir()
                .with_context(|| "retrieving current directory".to_string())?
                .join(path)
        };
    }

    match args.command {
        Commands::DefConfig => {
            generate_default_config()?;
            let path = CONFIG_PATH.read().unwrap().clone();
            info!("Wrote default config to {}", path.display());
        }
        command => {
            config::init()?;
            let registry = create_registry()?;

            match command {
                Commands::Publish {
                    url,
                    archive,
                    owner,
                } => {
                    let caller = Caller::from(owner);
                    let outcome = match archive {
                        Some(path) => {
                            let file = fs::File::open(&path)
                                .with_context(|| format!("opening archive {path}"))?;
                            registry.publish_from_archive(file, &caller).await?
                        }
                        // clap guarantees url is present when --archive is not
                        None => {
                            registry
                                .publish_from_git(url.as_deref().unwrap_or_default(), &caller)
                                .await?
                        }
                    };
                    match outcome {
                        horus_core::publish::PublishOutcome::Created { name, version } => {
                            info!("Published {name}@{version}")
                        }
                        horus_core::publish::PublishOutcome::VersionBumped { name, version } => {
                            info!("Updated {name} to {version}")
                        }
                    }
                }
                Commands::Catalog { index } => {
                    let part = if index {
                        CatalogPart::Index
                    } else {
                        CatalogPart::List
                    };
                    print!("{}", registry.catalog(part).await?);
                }
                Commands::List {
                    sort,
                    direction,
                    page,
                } => {
                    println!("{}", registry.list(sort.into(), direction.into(), page).await?);
                }
                Commands::Search {
                    term,
                    page,
                    per_page,
                } => {
                    let results = registry.search(&term, page, per_page).await?;
                    println!("{}", encode(&results)?);
                }
                Commands::Info { package } => {
                    let info = registry.info(&package).await?;
                    println!("{}", encode(&info)?);
                }
                Commands::Download {
                    package,
                    version,
                    output,
                } => {
                    let download = registry.download(&package, &version).await?;
                    let digest = horus_utils::hash::sha256_hex(&download.data);
                    if !horus_utils::hash::verify_digest(&digest, &download.hash) {
                        return Err(HorusError::ValidationError(format!(
                            "Artifact hash mismatch for {}@{}: stored {}, got {digest}",
                            download.name, download.version, download.hash
                        )));
                    }
                    let path = output.unwrap_or_else(|| {
                        format!("{}-{}.tar.gz", download.name, download.version)
                    });
                    fs::write(&path, &download.data)
                        .with_context(|| format!("writing artifact to {path}"))?;
                    info!(
                        "Downloaded {}@{} to {path} ({} bytes, sha256 {})",
                        download.name, download.version, download.size, download.hash
                    );
                }
                Commands::Remove { package, owner } => {
                    registry.remove(&package, &Caller::from(owner)).await?;
                    info!("Removed {package}");
                }
                Commands::Status => {
                    println!("{}", encode(&registry.metrics())?);
                }
                Commands::DefConfig => unreachable!(),
            }
        }
    }

    Ok(())
}

fn encode<T: serde::Serialize>(value: &T) -> HorusResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|err| HorusError::ValidationError(format!("failed to encode output: {err}")))
}

#[tokio::main]
async fn main() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    if let Err(err) = handle_cli().await {
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(1);
    }
}
