pub mod create_user;
pub mod load_data;

use tokio::fs;
use tracing::debug;
use yamdb_types::config::BackendConfig;

#[allow(async_fn_in_trait)]
pub trait Executor {
    async fn run(self) -> anyhow::Result<()>;
}

/// Opens database of the backend, migrations are applied so CLI can run before the server.
pub async fn open_pool(backend: &BackendConfig) -> anyhow::Result<yamdb_dal::Pool> {
    let data_dir = backend.data_dir();
    if !fs::try_exists(&data_dir).await? {
        fs::create_dir_all(&data_dir).await?;
    }
    let database_url = backend.database_url();
    debug!("Opening database {database_url}");
    let pool = yamdb_dal::new_pool(&database_url).await?;
    yamdb_dal::migrate(&pool).await?;
    Ok(pool)
}
