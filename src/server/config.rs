use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::server::{
    handlers::{
        admin::{admin_messages, delete_conversation, list_conversations},
        guest::{guest_merge, guest_message, guest_messages},
        messages::{fetch_thread, mark_seen, send_message, unread_count},
    },
    services::{
        alias::SupportAliasService, auth::AuthService, guest_identity::GuestIdentityService,
        pg_store::PgStore, relay::MessageRelay, store::SupportStore, unread::UnreadAccounting,
    },
};

/// Historical support account some pre-migration messages were addressed
/// to. Carried as a configurable default rather than a literal in logic.
pub const DEFAULT_LEGACY_ALIAS_ID: &str = "b1cb10e6-5a3c-4b6e-9d2f-8a1c3e5b7d90";
pub const DEFAULT_SUPPORT_EMAIL: &str = "support@sakina.app";

#[derive(Debug, Clone)]
pub struct SupportSettings {
    pub port: u16,
    pub owner_id: Uuid,
    pub support_email: String,
    pub legacy_alias_id: Uuid,
    pub guest_retention_days: i64,
    pub thread_limit: i64,
}

impl SupportSettings {
    pub fn from_env() -> Result<Self> {
        let owner_id = std::env::var("SUPPORT_OWNER_ID")
            .context("SUPPORT_OWNER_ID must be set")?
            .parse()
            .context("SUPPORT_OWNER_ID must be a UUID")?;

        Ok(Self {
            port: env_or("PORT", 8000),
            owner_id,
            support_email: std::env::var("SUPPORT_EMAIL")
                .unwrap_or_else(|_| DEFAULT_SUPPORT_EMAIL.to_string()),
            legacy_alias_id: match std::env::var("LEGACY_ALIAS_ID") {
                Ok(raw) => raw.parse().context("LEGACY_ALIAS_ID must be a UUID")?,
                Err(_) => DEFAULT_LEGACY_ALIAS_ID.parse().expect("default legacy id"),
            },
            guest_retention_days: env_or("GUEST_RETENTION_DAYS", 180),
            thread_limit: env_or("THREAD_LIMIT", crate::server::services::relay::DEFAULT_THREAD_LIMIT),
        })
    }

    pub fn for_tests(owner_id: Uuid, legacy_alias_id: Uuid) -> Self {
        Self {
            port: 0,
            owner_id,
            support_email: DEFAULT_SUPPORT_EMAIL.to_string(),
            legacy_alias_id,
            guest_retention_days: 180,
            thread_limit: crate::server::services::relay::DEFAULT_THREAD_LIMIT,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("invalid {} value, using default", key);
            default
        }),
        Err(_) => default,
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SupportStore>,
    pub auth: Arc<AuthService>,
    pub guests: Arc<GuestIdentityService>,
    pub relay: Arc<MessageRelay>,
    pub alias: Arc<SupportAliasService>,
    pub unread: Arc<UnreadAccounting>,
    pub settings: Arc<SupportSettings>,
}

pub fn configure_app(pool: PgPool, settings: SupportSettings) -> Router {
    app_with_store(Arc::new(PgStore::new(pool)), settings)
}

/// Router assembly over any store implementation; tests run this against
/// the in-memory store.
pub fn app_with_store(store: Arc<dyn SupportStore>, settings: SupportSettings) -> Router {
    let auth = Arc::new(AuthService::new(store.clone()));
    let guests = Arc::new(GuestIdentityService::new(store.clone()));
    let relay = Arc::new(MessageRelay::new(store.clone()));
    let alias = Arc::new(SupportAliasService::new(
        store.clone(),
        settings.owner_id,
        settings.support_email.clone(),
        settings.legacy_alias_id,
    ));
    let unread = Arc::new(UnreadAccounting::new(store.clone(), alias.clone()));

    let state = AppState {
        store,
        auth,
        guests,
        relay,
        alias,
        unread,
        settings: Arc::new(settings),
    };

    app_router(state)
}

async fn log_request(request: Request, next: Next) -> Response {
    info!("{} {}", request.method(), request.uri().path());
    next.run(request).await
}

fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/guest-message", post(guest_message))
        .route("/guest-messages", get(guest_messages))
        .route("/guest-merge", post(guest_merge))
        .route("/messages/unread-count", get(unread_count))
        .route("/messages/mark-seen", post(mark_seen))
        .route(
            "/messages/:counterpart_id",
            get(fetch_thread).post(send_message),
        )
        .route("/admin/conversations", get(list_conversations))
        .route("/admin/conversations/:id", delete(delete_conversation))
        .route("/admin/messages", get(admin_messages))
        .layer(middleware::from_fn(log_request))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
