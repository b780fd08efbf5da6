//! Connection lifecycle: lazy establishment, session command replay,
//! reconfiguration semantics and the cache identity key.

mod common;

use common::{FakeResponse, books_table, gateway};
use crudgate::{ConfigPatch, Driver};
use serde_json::json;

#[tokio::test]
async fn connects_lazily_and_reuses_the_connection() {
    let (mut gw, state) = gateway(Driver::MySql);
    assert_eq!(state.lock().unwrap().connects, 0);
    assert!(!gw.is_connected());

    state.lock().unwrap().script(FakeResponse::Rows(vec![]));
    gw.select_single(&books_table(), &[], &json!(1)).await.unwrap();
    assert_eq!(state.lock().unwrap().connects, 1);
    assert!(gw.is_connected());

    state.lock().unwrap().script(FakeResponse::Rows(vec![]));
    gw.select_single(&books_table(), &[], &json!(2)).await.unwrap();
    assert_eq!(state.lock().unwrap().connects, 1, "second op reuses");
}

#[tokio::test]
async fn session_commands_replay_on_every_new_connection() {
    let (mut gw, state) = gateway(Driver::MySql);
    gw.add_session_command("SET ROLE reporting;");

    state.lock().unwrap().script(FakeResponse::Rows(vec![]));
    gw.select_single(&books_table(), &[], &json!(1)).await.unwrap();

    {
        let state = state.lock().unwrap();
        let first: Vec<&str> = state
            .commands
            .iter()
            .filter(|(conn, _)| *conn == 1)
            .map(|(_, c)| c.as_str())
            .collect();
        // dialect defaults first, appended commands after, in order
        assert_eq!(
            first,
            vec![
                "SET SESSION sql_warnings=1;",
                "SET NAMES utf8mb4;",
                "SET SESSION sql_mode = \"ANSI,TRADITIONAL\";",
                "SET ROLE reporting;",
            ]
        );
    }

    // reconfiguration discards the physical connection; the accumulated
    // command list replays against the replacement
    gw.reconfigure(ConfigPatch::default());
    assert!(!gw.is_connected());

    state.lock().unwrap().script(FakeResponse::Rows(vec![]));
    gw.select_single(&books_table(), &[], &json!(1)).await.unwrap();

    let state = state.lock().unwrap();
    assert_eq!(state.connects, 2);
    let second: Vec<&str> = state
        .commands
        .iter()
        .filter(|(conn, _)| *conn == 2)
        .map(|(_, c)| c.as_str())
        .collect();
    assert_eq!(second.last(), Some(&"SET ROLE reporting;"));
    assert_eq!(second.len(), 4);
}

#[tokio::test]
async fn reconfigure_merges_partial_fields() {
    let (mut gw, state) = gateway(Driver::MySql);

    gw.reconfigure(ConfigPatch {
        host: Some("replica.internal".to_string()),
        ..Default::default()
    });
    assert_eq!(gw.config().host, "replica.internal");
    assert_eq!(gw.config().database, "shop", "omitted fields retained");

    state.lock().unwrap().script(FakeResponse::Rows(vec![]));
    gw.select_single(&books_table(), &[], &json!(1)).await.unwrap();
    assert_eq!(
        state.lock().unwrap().opened_hosts,
        vec!["replica.internal".to_string()]
    );
}

#[tokio::test]
async fn reconfigure_switches_dialect_generation() {
    let (mut gw, state) = gateway(Driver::MySql);

    state.lock().unwrap().script(FakeResponse::Rows(vec![]));
    gw.select_all(
        &books_table(),
        &[],
        crudgate::Condition::None,
        &[],
        0,
        Some(3),
    )
    .await
    .unwrap();
    assert!(state.lock().unwrap().statements[0].sql.ends_with(" LIMIT 0, 3"));

    gw.reconfigure(ConfigPatch {
        driver: Some(Driver::SqlSrv),
        ..Default::default()
    });

    state.lock().unwrap().script(FakeResponse::Rows(vec![]));
    gw.select_all(
        &books_table(),
        &[],
        crudgate::Condition::None,
        &[],
        0,
        Some(3),
    )
    .await
    .unwrap();

    let state = state.lock().unwrap();
    assert!(
        state.statements[1]
            .sql
            .ends_with(" OFFSET 0 ROWS FETCH NEXT 3 ROWS ONLY")
    );
    // SQL Server has no session defaults; connection 2 got none
    assert!(state.commands.iter().all(|(conn, _)| *conn == 1));
}

#[tokio::test]
async fn cache_key_tracks_target_identity_not_credentials() {
    let (mut gw, _state) = gateway(Driver::MySql);
    let key = gw.cache_key();
    assert_eq!(key.len(), 64);
    assert!(key.chars().all(|c| c.is_ascii_hexdigit()));

    // all-empty reconfiguration leaves the key unchanged
    gw.reconfigure(ConfigPatch::default());
    assert_eq!(gw.cache_key(), key);

    // a password rotation leaves the key unchanged
    gw.reconfigure(ConfigPatch {
        password: Some("rotated".to_string()),
        ..Default::default()
    });
    assert_eq!(gw.cache_key(), key);

    // a target change invalidates it
    gw.reconfigure(ConfigPatch {
        database: Some("analytics".to_string()),
        ..Default::default()
    });
    assert_ne!(gw.cache_key(), key);
}
