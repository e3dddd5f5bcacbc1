mod common;

use common::spawn_app;
use storefront_api::entities::user::UserRole;

#[tokio::test]
async fn first_sign_in_creates_an_account() {
    let app = spawn_app().await;

    let user = app
        .state
        .services
        .users
        .upsert_from_identity("auth0|new-subject", Some("ada@example.com"), Some("Ada"))
        .await
        .expect("account created");

    assert_eq!(user.external_subject, "auth0|new-subject");
    assert_eq!(user.email, "ada@example.com");
    assert_eq!(user.display_name, "Ada");
    assert_eq!(user.role, UserRole::User);
}

#[tokio::test]
async fn repeat_sign_in_reuses_and_syncs_the_account() {
    let app = spawn_app().await;
    let users = &app.state.services.users;

    let first = users
        .upsert_from_identity("auth0|subject", Some("old@example.com"), Some("Old Name"))
        .await
        .expect("account created");

    let second = users
        .upsert_from_identity("auth0|subject", Some("new@example.com"), Some("New Name"))
        .await
        .expect("account synced");

    assert_eq!(first.id, second.id, "same subject maps to the same account");
    assert_eq!(second.email, "new@example.com");
    assert_eq!(second.display_name, "New Name");

    let (all, total) = users.list_users(1, 50).await.expect("listing works");
    assert_eq!(total, 1);
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn sign_in_without_profile_keeps_existing_fields() {
    let app = spawn_app().await;
    let users = &app.state.services.users;

    users
        .upsert_from_identity("auth0|keep", Some("keep@example.com"), Some("Keeper"))
        .await
        .expect("account created");

    let synced = users
        .upsert_from_identity("auth0|keep", None, None)
        .await
        .expect("token without profile claims still resolves");

    assert_eq!(synced.email, "keep@example.com");
    assert_eq!(synced.display_name, "Keeper");
}
