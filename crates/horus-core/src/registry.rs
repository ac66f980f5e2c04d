//! The registry facade.
//!
//! [`Registry`] owns the store connection, the cache coordinator, and the
//! metrics collector, and exposes one method per registry operation. The
//! HTTP layer maps requests onto these methods and never touches the store
//! or cache directly.

use std::{io::Read, sync::Arc};

use horus_config::Config;
use horus_db::{
    models::{Package, TarballMeta},
    repository::{RegistryRepository, SortDirection, SortField},
    DbConnection,
};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::info;

use crate::{
    cache::{CacheAside, CacheHandle},
    catalog::build_catalog,
    constants::{CACHE_KEY_INDEX, CACHE_KEY_LIST, MAX_PAGE, MAX_PER_PAGE, PAGE_LENGTH},
    error::HorusError,
    metrics::{incr, Metrics, MetricsSnapshot},
    publish::{publish, Caller, PublishOutcome},
    tarball::{build_from_archive, build_from_git, BuiltTarball},
    validate::{normalize_url, validate_remote_url},
    HorusResult,
};

/// Which half of the catalog pair a client is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogPart {
    List,
    Index,
}

/// A package together with its full release history.
#[derive(Debug, Serialize)]
pub struct PackageInfo {
    #[serde(flatten)]
    pub package: Package,
    pub releases: Vec<TarballMeta>,
}

/// A downloadable artifact with the metadata clients verify against.
#[derive(Debug)]
pub struct Download {
    pub name: String,
    pub version: String,
    pub size: i64,
    pub hash: String,
    pub data: Vec<u8>,
}

pub struct Registry {
    db: Mutex<DbConnection>,
    cache: CacheAside,
    metrics: Arc<Metrics>,
    config: Config,
}

impl Registry {
    pub fn new(db: DbConnection, cache: CacheHandle, config: Config) -> Self {
        Self {
            db: Mutex::new(db),
            cache: CacheAside::new(cache),
            metrics: Arc::new(Metrics::new()),
            config,
        }
    }

    /// Point-in-time operation and error counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Publishes a package from a remote git repository.
    ///
    /// The URL is normalized, probed for reachability, cloned, and built
    /// before the publish decision is made against the store.
    pub async fn publish_from_git(
        &self,
        url: &str,
        caller: &Caller,
    ) -> HorusResult<PublishOutcome> {
        let result = self.publish_from_git_inner(url, caller).await;
        self.track(result)
    }

    async fn publish_from_git_inner(
        &self,
        url: &str,
        caller: &Caller,
    ) -> HorusResult<PublishOutcome> {
        let url = normalize_url(url, &self.config)?;
        if !validate_remote_url(&url, &self.config).await {
            return Err(HorusError::InvalidUrl(url));
        }

        let built = build_from_git(&url, &self.config).await?;
        self.publish_built(&built, caller).await
    }

    /// Publishes a package from an uploaded gzip'd tar stream.
    pub async fn publish_from_archive<R: Read>(
        &self,
        stream: R,
        caller: &Caller,
    ) -> HorusResult<PublishOutcome> {
        let result = match build_from_archive(stream, &self.config) {
            Ok(built) => self.publish_built(&built, caller).await,
            Err(err) => Err(err),
        };
        self.track(result)
    }

    async fn publish_built(
        &self,
        built: &BuiltTarball,
        caller: &Caller,
    ) -> HorusResult<PublishOutcome> {
        let outcome = {
            let mut db = self.db.lock().await;
            publish(db.conn(), built, caller)?
        };

        if matches!(outcome, PublishOutcome::Created { .. }) {
            incr(&self.metrics.create_package);
        }
        // derived artifacts are stale the moment the store changes
        self.cache.invalidate();
        Ok(outcome)
    }

    /// Serves one half of the catalog pair, rebuilding both on a miss.
    pub async fn catalog(&self, part: CatalogPart) -> HorusResult<String> {
        match part {
            CatalogPart::List => incr(&self.metrics.get_package_list),
            CatalogPart::Index => incr(&self.metrics.get_package_index),
        }

        let result = self
            .cache
            .get_or_build_pair((CACHE_KEY_LIST, CACHE_KEY_INDEX), || async {
                let mut db = self.db.lock().await;
                let artifact = build_catalog(db.conn())?;
                info!(
                    list_bytes = artifact.list.len(),
                    entries = artifact.index.lines().count(),
                    "rebuilt catalog"
                );
                Ok((artifact.list, artifact.index))
            })
            .await;

        self.track(result.map(|(list, index)| match part {
            CatalogPart::List => list,
            CatalogPart::Index => index,
        }))
    }

    /// One page of the package listing as a JSON document.
    ///
    /// Pages are cached per `(sort, direction, page)` window; an empty page
    /// is served but never cached, so a first publish shows up immediately.
    pub async fn list(
        &self,
        sort: SortField,
        direction: SortDirection,
        page: i64,
    ) -> HorusResult<String> {
        incr(&self.metrics.all_packages);

        let page = page.clamp(1, MAX_PAGE);
        let key = format!(
            "packages:{}:{}:{page}",
            sort_key(sort),
            direction_key(direction)
        );

        let result = self
            .cache
            .get_or_build_with(&key, || async {
                let mut db = self.db.lock().await;
                let packages = RegistryRepository::list_packages(
                    db.conn(),
                    sort,
                    direction,
                    (page - 1) * PAGE_LENGTH,
                    Some(PAGE_LENGTH),
                )?;
                let cacheable = !packages.is_empty();
                let body = serde_json::to_string(&packages).map_err(|err| {
                    HorusError::ValidationError(format!("failed to encode listing: {err}"))
                })?;
                Ok((body, cacheable))
            })
            .await;

        self.track(result)
    }

    /// Searches packages by name, description, or tags. Never cached: the
    /// term space is unbounded and results must reflect the live store.
    pub async fn search(
        &self,
        term: &str,
        page: i64,
        per_page: i64,
    ) -> HorusResult<Vec<Package>> {
        incr(&self.metrics.search_package);

        let page = page.clamp(1, MAX_PAGE);
        let per_page = per_page.clamp(1, MAX_PER_PAGE);
        let result = {
            let mut db = self.db.lock().await;
            RegistryRepository::search_packages(db.conn(), term, (page - 1) * per_page, per_page)
                .map_err(HorusError::from)
        };

        self.track(result)
    }

    /// A single package with its release history.
    pub async fn info(&self, name: &str) -> HorusResult<PackageInfo> {
        incr(&self.metrics.get_package);

        let result = {
            let mut db = self.db.lock().await;
            match RegistryRepository::find_package_by_name(db.conn(), name)? {
                Some(package) => {
                    let releases = RegistryRepository::releases(db.conn(), &package.id)?;
                    Ok(PackageInfo { package, releases })
                }
                None => Err(HorusError::NotFound("Package not found".to_string())),
            }
        };

        self.track(result)
    }

    /// Fetches an artifact and bumps the package's download counter.
    ///
    /// `version` may be the literal `latest`. The counter bump does not
    /// invalidate the cache; download counts drift until the next mutation.
    pub async fn download(&self, name: &str, version: &str) -> HorusResult<Download> {
        incr(&self.metrics.download_package);

        let result = {
            let mut db = self.db.lock().await;
            self.download_locked(db.conn(), name, version)
        };

        self.track(result)
    }

    fn download_locked(
        &self,
        conn: &mut diesel::SqliteConnection,
        name: &str,
        version: &str,
    ) -> HorusResult<Download> {
        let package = RegistryRepository::find_package_by_name(conn, name)?
            .ok_or_else(|| HorusError::NotFound("Package not found".to_string()))?;

        let version = if version == "latest" {
            package.latest_version.as_str()
        } else {
            version
        };

        let tarball = RegistryRepository::find_tarball(conn, &package.id, version)?
            .ok_or_else(|| HorusError::NotFound("Package version not found".to_string()))?;

        RegistryRepository::increment_downloads(conn, name)?;

        Ok(Download {
            name: package.name,
            version: tarball.version,
            size: tarball.size,
            hash: tarball.hash,
            data: tarball.data,
        })
    }

    /// Removes a package and all of its versions. Owner only.
    pub async fn remove(&self, name: &str, caller: &Caller) -> HorusResult<()> {
        let result = self.remove_inner(name, caller).await;
        self.track(result)
    }

    async fn remove_inner(&self, name: &str, caller: &Caller) -> HorusResult<()> {
        {
            let mut db = self.db.lock().await;
            let package = RegistryRepository::find_package_by_name(db.conn(), name)?
                .ok_or_else(|| HorusError::NotFound("Package not found".to_string()))?;

            if package.owner_id != caller.id {
                return Err(HorusError::NotOwner(
                    "You must be the package owner".to_string(),
                ));
            }

            RegistryRepository::delete_package_cascade(db.conn(), name)?;
        }

        incr(&self.metrics.remove_package);
        self.cache.invalidate();
        info!(package = name, "package removed");
        Ok(())
    }

    fn track<T>(&self, result: HorusResult<T>) -> HorusResult<T> {
        if let Err(err) = &result {
            let counter = match err {
                HorusError::NotFound(_) => &self.metrics.errors.not_found,
                HorusError::NotOwner(_) => &self.metrics.errors.not_authorized,
                HorusError::InvalidName(_) => &self.metrics.errors.bad_name,
                HorusError::InvalidUrl(_) | HorusError::CloneFailed(_) => {
                    &self.metrics.errors.bad_url
                }
                HorusError::StoreError(_) => &self.metrics.errors.query,
                _ => &self.metrics.errors.other,
            };
            incr(counter);
        }
        result
    }
}

fn sort_key(sort: SortField) -> &'static str {
    match sort {
        SortField::Name => "name",
        SortField::Downloads => "downloads",
        SortField::CreatedAt => "created",
        SortField::UpdatedAt => "updated",
    }
}

fn direction_key(direction: SortDirection) -> &'static str {
    match direction {
        SortDirection::Asc => "asc",
        SortDirection::Desc => "desc",
    }
}
