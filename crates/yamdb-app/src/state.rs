use std::sync::Arc;

use url::Url;
use yamdb_auth::token::TokenManager;
use yamdb_dal::Pool;

use crate::{error::Result, mail::Mailer};

#[derive(Clone)]
pub struct AppState {
    state: Arc<AppStateInner>,
}

impl AppState {
    pub fn new(
        app_config: AppConfig,
        pool: Pool,
        tokens: TokenManager,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        AppState {
            state: Arc::new(AppStateInner {
                pool,
                app_config,
                tokens,
                mailer,
            }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.state.app_config
    }

    /// Absolute URL for path on this server, path prefix of base URL is kept.
    pub fn build_url(&self, path: &str, query: Option<&str>) -> Result<Url> {
        let mut url = self.config().base_url.clone();
        if url.cannot_be_a_base() {
            return Err(anyhow::anyhow!("Base URL {url} cannot have path"));
        }
        let prefix = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{prefix}{path}"));
        url.set_query(query);
        Ok(url)
    }

    pub fn pool(&self) -> &Pool {
        &self.state.pool
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.state.tokens
    }

    pub fn mailer(&self) -> &dyn Mailer {
        self.state.mailer.as_ref()
    }
}

struct AppStateInner {
    pool: Pool,
    app_config: AppConfig,
    tokens: TokenManager,
    mailer: Arc<dyn Mailer>,
}

pub struct AppConfig {
    pub base_url: Url,
    pub default_page_size: u32,
    /// Sender of outgoing mail
    pub mail_from: String,
}
