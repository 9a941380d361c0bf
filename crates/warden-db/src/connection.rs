//! Connection to the SurrealDB instance holding Warden's RBAC tables.
//!
//! The server connects once at startup over WebSocket, signs in as root
//! and pins the namespace/database pair; every repository then shares
//! the resulting handle.

use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::info;

/// Where the RBAC tables live. Defaults match a local
/// `surreal start --user root --pass root` instance.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// `host:port`, optionally prefixed with `ws://`.
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "warden".into(),
            database: "rbac".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

impl DbConfig {
    /// The address handed to the WebSocket engine, which expects a bare
    /// `host:port`.
    pub fn endpoint(&self) -> &str {
        self.url
            .strip_prefix("ws://")
            .unwrap_or(&self.url)
            .trim_end_matches('/')
    }
}

/// Owns the shared SurrealDB handle.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    pub async fn connect(config: &DbConfig) -> Result<Self, surrealdb::Error> {
        info!(
            endpoint = config.endpoint(),
            namespace = %config.namespace,
            database = %config.database,
            "Connecting to RBAC store"
        );

        let db = Surreal::new::<Ws>(config.endpoint()).await?;
        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await?;
        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        info!("Connected to RBAC store");
        Ok(Self { db })
    }

    /// The handle repositories and migrations run against.
    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }
}
