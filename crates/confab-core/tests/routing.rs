use confab_core::{group, message, AppConfig, AppState};
use confab_models::{Conversation, Message, ServerEvent};
use tokio::sync::mpsc::Receiver;

async fn test_state() -> AppState {
    let db = confab_db::create_pool("sqlite::memory:", 1).await.expect("pool");
    confab_db::run_migrations(&db).await.expect("migrations");
    AppState::new(
        db,
        AppConfig {
            jwt_secret: "routing-test-secret".into(),
            jwt_expiry_seconds: 3600,
        },
    )
}

async fn seed_users(state: &AppState, ids: &[i64]) {
    for id in ids {
        confab_db::users::create_user(
            &state.db,
            *id,
            &format!("user{id}"),
            &format!("user{id}@example.com"),
            "hash",
        )
        .await
        .expect("create user");
    }
}

fn drain(rx: &mut Receiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn message_ids(events: &[ServerEvent]) -> Vec<i64> {
    events
        .iter()
        .filter_map(|event| match event {
            ServerEvent::NewMessage { id, .. } => Some(*id),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn creator_is_always_a_member_of_a_new_group() {
    let state = test_state().await;
    seed_users(&state, &[1, 2, 3]).await;

    // The creator is absent from the supplied member list on purpose.
    let created = group::create_group(&state.db, &state.members, 1, "Team", None, &[2, 3])
        .await
        .expect("create group");

    assert_eq!(created.group.admin_id, 1);
    assert!(created.member_ids.contains(&1));

    let resolved = state
        .members
        .resolve(created.group.id)
        .await
        .expect("resolve");
    assert!(resolved.contains(&1));
    assert_eq!(resolved.len(), 3);
}

#[tokio::test]
async fn direct_send_reaches_both_parties_and_nobody_else() {
    let state = test_state().await;
    seed_users(&state, &[1, 2, 3]).await;

    let (_, mut rx_sender) = state.mux.register(1);
    let (_, mut rx_peer) = state.mux.register(2);
    let (_, mut rx_bystander) = state.mux.register(3);

    message::send_message(
        &state.db,
        &state.router,
        1,
        Conversation::Direct { peer_id: 2 },
        Some("hi"),
        None,
    )
    .await
    .expect("send");

    assert_eq!(drain(&mut rx_sender).len(), 1);
    assert_eq!(drain(&mut rx_peer).len(), 1);
    assert!(drain(&mut rx_bystander).is_empty());
}

#[tokio::test]
async fn group_send_reaches_members_only() {
    let state = test_state().await;
    seed_users(&state, &[1, 2, 3, 4]).await;

    let created = group::create_group(&state.db, &state.members, 1, "Team", None, &[2, 3])
        .await
        .expect("create group");

    let (_, mut rx_admin) = state.mux.register(1);
    let (_, mut rx_member) = state.mux.register(3);
    let (_, mut rx_outsider) = state.mux.register(4);

    let sent = message::send_message(
        &state.db,
        &state.router,
        2,
        Conversation::Group {
            group_id: created.group.id,
        },
        Some("hello"),
        None,
    )
    .await
    .expect("send");

    for rx in [&mut rx_admin, &mut rx_member] {
        let events = drain(rx);
        assert_eq!(events.len(), 1);
        match &events[0] {
            ServerEvent::NewMessage {
                id,
                sender_id,
                conversation_id,
                ..
            } => {
                assert_eq!(*id, sent.id);
                assert_eq!(*sender_id, 2);
                assert_eq!(*conversation_id, Some(created.group.id));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
    assert!(drain(&mut rx_outsider).is_empty());
}

#[tokio::test]
async fn senders_other_tab_gets_each_message_exactly_once() {
    let state = test_state().await;
    seed_users(&state, &[1, 2]).await;

    let (_, mut rx_tab_a) = state.mux.register(1);
    let (_, mut rx_tab_b) = state.mux.register(1);
    let (_, mut rx_peer) = state.mux.register(2);

    let mut sent_ids = Vec::new();
    for text in ["hi", "hi again"] {
        let sent = message::send_message(
            &state.db,
            &state.router,
            1,
            Conversation::Direct { peer_id: 2 },
            Some(text),
            None,
        )
        .await
        .expect("send");
        sent_ids.push(sent.id);
    }

    for rx in [&mut rx_tab_a, &mut rx_tab_b, &mut rx_peer] {
        let ids = message_ids(&drain(rx));
        assert_eq!(ids, sent_ids);
    }
}

#[tokio::test]
async fn routing_to_an_unknown_group_delivers_nothing() {
    let state = test_state().await;
    seed_users(&state, &[1]).await;
    let (_, mut rx) = state.mux.register(1);

    // Bypass the send service, which would reject the group outright; the
    // router itself must degrade to an empty audience.
    let orphan = Message {
        id: 999,
        sender_id: 1,
        conversation: Conversation::Group { group_id: 123_456 },
        text: Some("void".into()),
        image: None,
        created_at: chrono::Utc::now(),
    };
    state.router.route(&orphan).await;

    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn sends_to_unknown_targets_are_not_found() {
    let state = test_state().await;
    seed_users(&state, &[1]).await;

    let err = message::send_message(
        &state.db,
        &state.router,
        1,
        Conversation::Group { group_id: 42 },
        Some("hi"),
        None,
    )
    .await
    .expect_err("unknown group");
    assert!(matches!(err, confab_core::error::CoreError::NotFound));

    let err = message::send_message(
        &state.db,
        &state.router,
        1,
        Conversation::Direct { peer_id: 404 },
        Some("hi"),
        None,
    )
    .await
    .expect_err("unknown peer");
    assert!(matches!(err, confab_core::error::CoreError::NotFound));
}

#[tokio::test]
async fn non_member_send_is_unauthorized() {
    let state = test_state().await;
    seed_users(&state, &[1, 2, 4]).await;
    let created = group::create_group(&state.db, &state.members, 1, "Team", None, &[2])
        .await
        .expect("create group");

    let err = message::send_message(
        &state.db,
        &state.router,
        4,
        Conversation::Group {
            group_id: created.group.id,
        },
        Some("let me in"),
        None,
    )
    .await
    .expect_err("non-member send");
    assert!(matches!(err, confab_core::error::CoreError::Unauthorized));
}

#[tokio::test]
async fn membership_changes_invalidate_the_fanout_index() {
    let state = test_state().await;
    seed_users(&state, &[1, 2, 3]).await;
    let created = group::create_group(&state.db, &state.members, 1, "Team", None, &[2])
        .await
        .expect("create group");
    let group_id = created.group.id;

    // Warm the cache.
    assert_eq!(state.members.resolve(group_id).await.expect("resolve").len(), 2);

    // A raw store write is invisible until invalidation...
    confab_db::groups::add_member(&state.db, group_id, 3)
        .await
        .expect("raw add");
    assert_eq!(state.members.resolve(group_id).await.expect("resolve").len(), 2);
    state.members.invalidate(group_id).await;
    assert_eq!(state.members.resolve(group_id).await.expect("resolve").len(), 3);

    // ...while the service-level removal invalidates on its own.
    group::remove_member(&state.db, &state.members, group_id, 1, 3)
        .await
        .expect("remove member");
    let resolved = state.members.resolve(group_id).await.expect("resolve");
    assert!(!resolved.contains(&3));
}

#[tokio::test]
async fn concurrent_resolves_share_one_load() {
    let state = test_state().await;
    seed_users(&state, &[1, 2]).await;
    let created = group::create_group(&state.db, &state.members, 1, "Team", None, &[2])
        .await
        .expect("create group");
    let group_id = created.group.id;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let members = state.members.clone();
        handles.push(tokio::spawn(
            async move { members.resolve(group_id).await },
        ));
    }

    let mut first: Option<std::sync::Arc<std::collections::HashSet<i64>>> = None;
    for handle in handles {
        let resolved = handle.await.expect("join").expect("resolve");
        if let Some(ref first) = first {
            // try_get_with coalesces the loads, so every caller sees the
            // same shared set.
            assert!(std::sync::Arc::ptr_eq(first, &resolved));
        } else {
            first = Some(resolved);
        }
    }
}

#[tokio::test]
async fn admin_cannot_be_removed_from_their_group() {
    let state = test_state().await;
    seed_users(&state, &[1, 2]).await;
    let created = group::create_group(&state.db, &state.members, 1, "Team", None, &[2])
        .await
        .expect("create group");

    let err = group::remove_member(&state.db, &state.members, created.group.id, 1, 1)
        .await
        .expect_err("admin removal");
    assert!(matches!(
        err,
        confab_core::error::CoreError::Validation(_)
    ));
}
