mod common;

use common::{create_user, spawn_app};
use storefront_api::{
    entities::{chat_message::ChatSender, user::UserRole},
    services::chat::PostMessageInput,
};

fn msg(content: &str) -> PostMessageInput {
    PostMessageInput {
        content: content.to_string(),
    }
}

#[tokio::test]
async fn thread_interleaves_user_and_admin_messages() {
    let app = spawn_app().await;
    let user = create_user(&app, UserRole::User).await;
    let chat = &app.state.services.chat;

    chat.post_message(user.id, ChatSender::User, msg("Where is my order?"))
        .await
        .expect("user message posts");
    chat.post_message(user.id, ChatSender::Admin, msg("It ships tomorrow."))
        .await
        .expect("admin reply posts");
    chat.post_message(user.id, ChatSender::User, msg("Thanks!"))
        .await
        .expect("second user message posts");

    let thread = chat.list_thread(user.id).await.expect("thread loads");
    assert_eq!(thread.len(), 3);
    assert_eq!(thread[0].sender, ChatSender::User);
    assert_eq!(thread[1].sender, ChatSender::Admin);
    assert_eq!(thread[2].content, "Thanks!");
}

#[tokio::test]
async fn threads_are_isolated_per_user() {
    let app = spawn_app().await;
    let alice = create_user(&app, UserRole::User).await;
    let bob = create_user(&app, UserRole::User).await;
    let chat = &app.state.services.chat;

    chat.post_message(alice.id, ChatSender::User, msg("Hello from Alice"))
        .await
        .expect("posts");
    chat.post_message(bob.id, ChatSender::User, msg("Hello from Bob"))
        .await
        .expect("posts");

    let alices = chat.list_thread(alice.id).await.expect("thread loads");
    assert_eq!(alices.len(), 1);
    assert_eq!(alices[0].content, "Hello from Alice");
}

#[tokio::test]
async fn inbox_counts_unread_user_messages_only() {
    let app = spawn_app().await;
    let user = create_user(&app, UserRole::User).await;
    let chat = &app.state.services.chat;

    chat.post_message(user.id, ChatSender::User, msg("First"))
        .await
        .expect("posts");
    chat.post_message(user.id, ChatSender::User, msg("Second"))
        .await
        .expect("posts");
    // Admin replies are born read and never count as unread.
    chat.post_message(user.id, ChatSender::Admin, msg("Reply"))
        .await
        .expect("posts");

    let threads = chat.list_threads().await.expect("inbox loads");
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].user_id, user.id);
    assert_eq!(threads[0].unread_count, 2);
    assert_eq!(threads[0].last_message, "Reply");
    assert_eq!(threads[0].last_sender, ChatSender::Admin);
}

#[tokio::test]
async fn marking_read_clears_the_unread_count() {
    let app = spawn_app().await;
    let user = create_user(&app, UserRole::User).await;
    let chat = &app.state.services.chat;

    chat.post_message(user.id, ChatSender::User, msg("Ping"))
        .await
        .expect("posts");

    let marked = chat.mark_thread_read(user.id).await.expect("mark succeeds");
    assert_eq!(marked, 1);

    let threads = chat.list_threads().await.expect("inbox loads");
    assert_eq!(threads[0].unread_count, 0);

    // Idempotent: nothing left to mark.
    let again = chat.mark_thread_read(user.id).await.expect("mark succeeds");
    assert_eq!(again, 0);
}

#[tokio::test]
async fn blank_messages_are_rejected() {
    let app = spawn_app().await;
    let user = create_user(&app, UserRole::User).await;

    let err = app
        .state
        .services
        .chat
        .post_message(user.id, ChatSender::User, msg(""))
        .await
        .expect_err("empty content is invalid");

    assert!(matches!(
        err,
        storefront_api::errors::ServiceError::ValidationError(_)
    ));
}
