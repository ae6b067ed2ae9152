use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use chrono::Duration;
use tracing::info;

use mastopruner::application::services::cleanup::cleanup_old_statuses;
use mastopruner::application::services::retention::RetentionPolicy;
use mastopruner::application::services::status_service::StatusServiceImpl;
use mastopruner::config::{AppCredentials, SessionStore};
use mastopruner::constants::{APP_CREDENTIALS_FILE, DEFAULT_MIN_AGE_DAYS, SESSION_CONFIG_FILE};
use mastopruner::session::login::Session;
use mastopruner::session::prompt::TerminalPrompt;
use mastopruner::utils::logger::setup_logger;

#[tokio::main]
async fn main() -> Result<()> {
    setup_logger();

    let credentials = AppCredentials::load(Path::new(APP_CREDENTIALS_FILE))?;
    let store = SessionStore::load(Path::new(SESSION_CONFIG_FILE))?;

    let mut session = Session::new(credentials, store);
    let client = session.connect(&TerminalPrompt).await?;

    let service = StatusServiceImpl::new(Arc::new(client));
    let policy = RetentionPolicy::new(Duration::days(DEFAULT_MIN_AGE_DAYS));
    let deleted = cleanup_old_statuses(&service, policy).await?;

    info!("Cleanup finished: {} statuses deleted", deleted);
    Ok(())
}
