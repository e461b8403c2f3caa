//! Integration tests for the webmail core.
//!
//! These drive the public [`Webmail`] API the way a front end would:
//! register, log in, send, list and read, with snapshots on disk where the
//! test needs them.

#![allow(clippy::unwrap_used)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use primail_core::{Config, Error, ErrorKind, HashParams, SessionToken, Webmail};

const ALICE: &str = "alice@primary.com";
const BOB: &str = "bob@primary.com";
const CAROL: &str = "carol@primary.com";
const PASSWORD: &str = "correct horse";

fn config(dir: &Path) -> Config {
    Config::builder()
        .data_dir(dir)
        .password_hash(HashParams::minimal())
        .build()
}

/// In-memory service with Alice, Bob and Carol registered.
async fn populated() -> Webmail {
    let mail = Webmail::in_memory(&config(Path::new(".")));
    for user in [ALICE, BOB, CAROL] {
        mail.register(user, PASSWORD).await.unwrap();
    }
    mail
}

#[tokio::test]
async fn test_hello_scenario() {
    let mail = populated().await;

    let alice = mail.login(ALICE, PASSWORD).await.unwrap();
    mail.send(&alice, BOB, "Hello", "Hi Bob").await.unwrap();
    mail.logout(&alice).await;

    let bob = mail.login(BOB, PASSWORD).await.unwrap();
    let inbox = mail.inbox(&bob, "hel").await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].from, ALICE);
    assert_eq!(inbox[0].subject, "Hello");
    assert!(!inbox[0].read);
    assert!(mail.inbox(&bob, "invoice").await.unwrap().is_empty());

    let alice = mail.login(ALICE, PASSWORD).await.unwrap();
    assert!(mail.inbox(&alice, "").await.unwrap().is_empty());
    let sent = mail.sent(&alice, "").await.unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, BOB);
}

#[tokio::test]
async fn test_register_rules() {
    let mail = populated().await;

    let err = mail.register(ALICE, "other").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    for (email, password) in [
        ("", PASSWORD),
        ("dave@other.com", PASSWORD),
        ("not-an-address", PASSWORD),
        ("dave@primary.com", ""),
    ] {
        let err = mail.register(email, password).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "{email:?}");
    }

    assert_eq!(mail.credentials().len().await, 3);
}

#[tokio::test]
async fn test_mailbox_has_one_spelling() {
    let mail = populated().await;

    let err = mail.register("bob@PRIMARY.COM", PASSWORD).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(mail.credentials().len().await, 3);

    let alice = mail.login(ALICE, PASSWORD).await.unwrap();
    let err = mail
        .send(&alice, "bob@PRIMARY.COM", "Hello", "")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(mail.messages().is_empty().await);
}

#[tokio::test]
async fn test_login_failures_look_the_same() {
    let mail = populated().await;

    let unknown = mail.login("nobody@primary.com", PASSWORD).await.unwrap_err();
    let wrong = mail.login(ALICE, "wrong").await.unwrap_err();

    assert!(matches!(unknown, Error::Auth));
    assert!(matches!(wrong, Error::Auth));
    assert_eq!(unknown.to_string(), wrong.to_string());
    assert!(mail.sessions().is_empty().await);
}

#[tokio::test]
async fn test_logout_invalidates_token() {
    let mail = populated().await;
    let token = mail.login(ALICE, PASSWORD).await.unwrap();
    assert_eq!(mail.current_user(&token).await.unwrap(), ALICE);

    mail.logout(&token).await;

    assert!(matches!(
        mail.current_user(&token).await,
        Err(Error::SessionNotFound)
    ));
    assert!(matches!(
        mail.inbox(&token, "").await,
        Err(Error::SessionNotFound)
    ));
    assert!(matches!(
        mail.send(&token, BOB, "Hi", "").await,
        Err(Error::SessionNotFound)
    ));
    // Logging out twice is harmless.
    mail.logout(&token).await;
}

#[tokio::test]
async fn test_forged_token_is_rejected() {
    let mail = populated().await;
    mail.login(ALICE, PASSWORD).await.unwrap();

    let forged = SessionToken::from(ALICE);
    assert!(matches!(
        mail.inbox(&forged, "").await,
        Err(Error::SessionNotFound)
    ));
}

#[tokio::test]
async fn test_idle_session_expires() {
    let cfg = Config::builder()
        .password_hash(HashParams::minimal())
        .session_idle_timeout(Duration::ZERO)
        .build();
    let mail = Webmail::in_memory(&cfg);
    mail.register(ALICE, PASSWORD).await.unwrap();

    let token = mail.login(ALICE, PASSWORD).await.unwrap();
    assert!(matches!(
        mail.current_user(&token).await,
        Err(Error::SessionNotFound)
    ));
}

#[tokio::test]
async fn test_abandoned_sessions_are_dropped() {
    let cfg = Config::builder()
        .password_hash(HashParams::minimal())
        .session_idle_timeout(Duration::ZERO)
        .build();
    let mail = Webmail::in_memory(&cfg);
    mail.register(ALICE, PASSWORD).await.unwrap();

    for _ in 0..6 {
        mail.login(ALICE, PASSWORD).await.unwrap();
    }
    assert_eq!(mail.sessions().len().await, 1);
}

#[tokio::test]
async fn test_self_sent_message_only_in_sent() {
    let mail = populated().await;
    let alice = mail.login(ALICE, PASSWORD).await.unwrap();

    mail.send(&alice, ALICE, "Note to self", "").await.unwrap();

    assert!(mail.inbox(&alice, "").await.unwrap().is_empty());
    assert_eq!(mail.sent(&alice, "note").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_send_to_unregistered_recipient() {
    let mail = populated().await;
    let alice = mail.login(ALICE, PASSWORD).await.unwrap();

    let err = mail
        .send(&alice, "ghost@primary.com", "Hi", "")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(mail.messages().is_empty().await);
}

#[tokio::test]
async fn test_inbox_is_newest_first() {
    let mail = populated().await;
    let alice = mail.login(ALICE, PASSWORD).await.unwrap();
    let carol = mail.login(CAROL, PASSWORD).await.unwrap();

    mail.send(&alice, BOB, "first", "").await.unwrap();
    mail.send(&carol, BOB, "second", "").await.unwrap();
    mail.send(&alice, BOB, "third", "").await.unwrap();

    let bob = mail.login(BOB, PASSWORD).await.unwrap();
    let subjects: Vec<String> = mail
        .inbox(&bob, "")
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.subject)
        .collect();
    assert_eq!(subjects, ["third", "second", "first"]);
}

#[tokio::test]
async fn test_read_message_marks_read() {
    let mail = populated().await;
    let alice = mail.login(ALICE, PASSWORD).await.unwrap();
    let id = mail.send(&alice, BOB, "Lunch?", "Noon").await.unwrap();

    let bob = mail.login(BOB, PASSWORD).await.unwrap();
    assert_eq!(mail.query().unread_count(BOB).await, 1);

    let message = mail.read_message(&bob, id).await.unwrap();
    assert!(message.read);
    assert_eq!(message.body, "Noon");
    assert!(mail.inbox(&bob, "").await.unwrap()[0].read);
    assert_eq!(mail.query().unread_count(BOB).await, 0);

    // Marking again changes nothing.
    mail.mark_read(&bob, id).await.unwrap();
    assert!(mail.messages().get(id).await.unwrap().read);
}

#[tokio::test]
async fn test_sender_viewing_sent_message_keeps_it_unread() {
    let mail = populated().await;
    let alice = mail.login(ALICE, PASSWORD).await.unwrap();
    let id = mail.send(&alice, BOB, "Agenda", "Item 1").await.unwrap();

    let message = mail.read_message(&alice, id).await.unwrap();
    assert_eq!(message.body, "Item 1");
    assert!(!message.read);
    assert!(!mail.messages().get(id).await.unwrap().read);
    assert_eq!(mail.query().unread_count(BOB).await, 1);
}

#[tokio::test]
async fn test_outsiders_cannot_read_or_mark() {
    let mail = populated().await;
    let alice = mail.login(ALICE, PASSWORD).await.unwrap();
    let id = mail.send(&alice, BOB, "Private", "").await.unwrap();

    let carol = mail.login(CAROL, PASSWORD).await.unwrap();
    let err = mail.read_message(&carol, id).await.unwrap_err();
    assert!(matches!(err, Error::MessageNotFound(found) if found == id));

    mail.mark_read(&carol, id).await.unwrap();
    assert!(!mail.messages().get(id).await.unwrap().read);
}

#[tokio::test]
async fn test_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    let id = {
        let mail = Webmail::open(&config(dir.path())).await.unwrap();
        mail.register(ALICE, PASSWORD).await.unwrap();
        mail.register(BOB, PASSWORD).await.unwrap();
        let alice = mail.login(ALICE, PASSWORD).await.unwrap();
        let id = mail.send(&alice, BOB, "Hello", "Hi Bob").await.unwrap();
        let bob = mail.login(BOB, PASSWORD).await.unwrap();
        mail.read_message(&bob, id).await.unwrap();
        id
    };

    let mail = Webmail::open(&config(dir.path())).await.unwrap();

    // Sessions are not persisted; passwords are.
    let bob = mail.login(BOB, PASSWORD).await.unwrap();
    let inbox = mail.inbox(&bob, "").await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].id, id);
    assert!(inbox[0].read);
    assert!(matches!(
        mail.login(BOB, "wrong").await,
        Err(Error::Auth)
    ));

    let raw = std::fs::read_to_string(config(dir.path()).users_path()).unwrap();
    assert!(!raw.contains(PASSWORD));
}

#[tokio::test]
async fn test_corrupt_snapshot_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    std::fs::write(cfg.users_path(), "{ not json").unwrap();

    let err = Webmail::open(&cfg).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Persistence);
    assert_eq!(
        std::fs::read_to_string(cfg.users_path()).unwrap(),
        "{ not json"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sends_from_many_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let mail = Arc::new(Webmail::open(&config(dir.path())).await.unwrap());
    for user in [ALICE, BOB, CAROL] {
        mail.register(user, PASSWORD).await.unwrap();
    }

    let mut handles = Vec::new();
    for sender in [ALICE, CAROL] {
        let token = mail.login(sender, PASSWORD).await.unwrap();
        for i in 0..10 {
            let mail = Arc::clone(&mail);
            let token = token.clone();
            handles.push(tokio::spawn(async move {
                mail.send(&token, BOB, &format!("{sender} #{i}"), "")
                    .await
            }));
        }
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let reopened = Webmail::open(&config(dir.path())).await.unwrap();
    let bob = reopened.login(BOB, PASSWORD).await.unwrap();
    assert_eq!(reopened.inbox(&bob, "").await.unwrap().len(), 20);
    assert_eq!(reopened.inbox(&bob, "carol").await.unwrap().len(), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registration_of_same_address() {
    let mail = Arc::new(Webmail::in_memory(&config(Path::new("."))));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let mail = Arc::clone(&mail);
            tokio::spawn(async move { mail.register(ALICE, PASSWORD).await })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(err) => assert_eq!(err.kind(), ErrorKind::Conflict),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(mail.credentials().len().await, 1);
}
