#![allow(dead_code)]

use std::sync::Arc;

use axum::http::{header::AUTHORIZATION, HeaderName, HeaderValue};
use axum_test::TestServer;

use sakina_support::server::{
    config::{app_with_store, SupportSettings},
    models::identity::{Identity, IdentityKind, NewIdentity, Role},
    services::{memory_store::MemoryStore, store::SupportStore},
};

pub const OWNER_SESSION: &str = "owner-session-token";
pub const USER_SESSION: &str = "user-session-token";

pub struct TestApp {
    pub server: TestServer,
    pub store: Arc<MemoryStore>,
    pub owner: Identity,
    pub system: Identity,
    pub legacy: Identity,
    pub user: Identity,
}

/// Full app over the in-memory store: owner + system + legacy support
/// identities, one registered member, and sessions for owner and member.
pub async fn spawn_app() -> TestApp {
    spawn_app_with_system(true).await
}

/// `with_system = false` leaves the well-known support email unregistered,
/// exercising the degraded alias set.
pub async fn spawn_app_with_system(with_system: bool) -> TestApp {
    let store = Arc::new(MemoryStore::new());

    let owner = store
        .create_identity(NewIdentity {
            id: None,
            kind: IdentityKind::User,
            role: Role::Owner,
            display_name: "Dr. Huda".into(),
            email: Some("huda@sakina.app".into()),
        })
        .await
        .unwrap();
    let system = store
        .create_identity(NewIdentity {
            id: None,
            kind: IdentityKind::System,
            role: Role::Admin,
            display_name: "Sakina Support".into(),
            email: with_system.then(|| "support@sakina.app".to_string()),
        })
        .await
        .unwrap();
    let legacy = store
        .create_identity(NewIdentity {
            id: None,
            kind: IdentityKind::System,
            role: Role::Admin,
            display_name: "Legacy Support".into(),
            email: None,
        })
        .await
        .unwrap();
    let user = store
        .create_identity(NewIdentity::user("Amina", Some("amina@example.com")))
        .await
        .unwrap();

    store.create_session(OWNER_SESSION, owner.id).await.unwrap();
    store.create_session(USER_SESSION, user.id).await.unwrap();

    let settings = SupportSettings::for_tests(owner.id, legacy.id);
    let server = TestServer::new(app_with_store(store.clone(), settings)).unwrap();

    TestApp {
        server,
        store,
        owner,
        system,
        legacy,
        user,
    }
}

pub fn bearer(token: &str) -> (HeaderName, HeaderValue) {
    (
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    )
}
