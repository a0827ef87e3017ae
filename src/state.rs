use crate::config::AppConfig;
use crate::mailer::{LogMailer, Mailer, SesMailer};
use crate::store::{memory::InMemoryStore, postgres::PgStore, Store};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store = match &config.database_url {
            Some(url) => Arc::new(PgStore::connect(url).await?) as Arc<dyn Store>,
            None => {
                tracing::warn!("DATABASE_URL not set; using in-memory store, data will not persist");
                Arc::new(InMemoryStore::new()) as Arc<dyn Store>
            }
        };

        let mailer = match &config.mail.from {
            Some(from) => Arc::new(SesMailer::new(&config.mail, from).await?) as Arc<dyn Mailer>,
            None => {
                tracing::warn!("MAIL_FROM not set; outgoing email will only be logged");
                Arc::new(LogMailer) as Arc<dyn Mailer>
            }
        };

        tracing::info!(store = store.backend_name(), "state initialised");
        Ok(Self::from_parts(store, config, mailer))
    }

    pub fn from_parts(store: Arc<dyn Store>, config: Arc<AppConfig>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            store,
            config,
            mailer,
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use crate::config::{JwtConfig, MailConfig};
    use crate::mailer::Email;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every message; fails every send when `fail` is set.
    #[derive(Default)]
    pub struct FakeMailer {
        pub sent: Mutex<Vec<Email>>,
        pub fail: bool,
    }

    impl FakeMailer {
        pub fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        pub fn sent(&self) -> Vec<Email> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Mailer for FakeMailer {
        async fn send(&self, email: Email) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("smtp unavailable");
            }
            self.sent.lock().unwrap().push(email);
            Ok(())
        }
    }

    pub fn test_config() -> AppConfig {
        AppConfig {
            database_url: None,
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 60 * 24 * 30,
            },
            mail: MailConfig {
                from: None,
                region: "us-east-1".into(),
                endpoint: None,
                access_key: None,
                secret_key: None,
            },
            frontend_url: "http://frontend.test".into(),
        }
    }

    impl AppState {
        pub fn fake() -> Self {
            Self::fake_with_mailer(Arc::new(FakeMailer::default()))
        }

        pub fn fake_with_mailer(mailer: Arc<FakeMailer>) -> Self {
            Self::from_parts(
                Arc::new(InMemoryStore::new()),
                Arc::new(test_config()),
                mailer,
            )
        }
    }
}
