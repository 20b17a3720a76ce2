use crate::auth::jwt::{Clock, JwtKeys, SystemClock};
use crate::auth::repo::{PgSessionRepository, PgUserRepository, SessionRepository, UserRepository};
use crate::config::AppConfig;
use crate::contact::repo::{ContactRepository, PgContactRepository};
use crate::notifications::{self, Mailer};
use crate::progress::repo::{PgProgressRepository, ProgressRepository};
use crate::verification::repo::{PgVerificationCodeRepository, VerificationCodeRepository};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub jwt: JwtKeys,
    pub clock: Arc<dyn Clock>,
    pub users: Arc<dyn UserRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub contacts: Arc<dyn ContactRepository>,
    pub codes: Arc<dyn VerificationCodeRepository>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let db = crate::db::connect(&config.database_url).await?;
        let mailer = notifications::from_config(config.mail.as_ref())?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Ok(Self {
            jwt: JwtKeys::new(&config.jwt, clock.clone()),
            clock,
            users: Arc::new(PgUserRepository::new(db.clone())),
            sessions: Arc::new(PgSessionRepository::new(db.clone())),
            progress: Arc::new(PgProgressRepository::new(db.clone())),
            contacts: Arc::new(PgContactRepository::new(db.clone())),
            codes: Arc::new(PgVerificationCodeRepository::new(db)),
            mailer,
            config,
        })
    }
}
