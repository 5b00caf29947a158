//! API integration tests.

use axum::http::{Method, StatusCode, header};
use murmur_rest::murmur::{Meta, VirtualServer};
use murmur_rpc::{Acl, AclSet, Ban, Group};
use serde_json::{Value, json};

mod common;
use common::{
    TEST_PASSWORD, TEST_USER, basic_auth, create_server, delete, get, post, post_empty,
    send_with, test_app, test_app_with_auth,
};

// -- Health --

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _) = test_app();

    let response = get(&app, "/health").await;
    assert_eq!(response.status, StatusCode::OK);

    let json = response.json();
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert!(response.text.starts_with("{\n    \"status\": \"ok\",\n"));
}

// -- Output format --

#[tokio::test]
async fn test_bodies_are_pretty_printed_with_sorted_keys() {
    let (app, _) = test_app();
    let id = create_server(&app, &[]).await;

    let response = post_empty(&app, &format!("/servers/{id}/start")).await;
    assert_eq!(
        response.text,
        "{\n    \"message\": \"Server already running.\"\n}"
    );
    assert_eq!(
        response.headers.get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );

    let detail = get(&app, &format!("/servers/{id}")).await;
    let keys: Vec<&str> = detail
        .text
        .lines()
        .filter(|l| l.starts_with("    \"") && !l.starts_with("     "))
        .map(|l| l.trim().split('"').nth(1).unwrap())
        .collect();
    let mut sorted = keys.clone();
    sorted.sort_unstable();
    assert_eq!(keys, sorted);
    assert!(keys.contains(&"humanize_uptime"));
}

// -- Not found handling --

#[tokio::test]
async fn test_unknown_server_is_not_found_everywhere() {
    let (app, meta) = test_app();

    for (method, uri) in [
        (Method::GET, "/servers/42"),
        (Method::DELETE, "/servers/42"),
        (Method::POST, "/servers/42/start"),
        (Method::POST, "/servers/42/stop"),
        (Method::GET, "/servers/42/logs"),
        (Method::GET, "/servers/42/user"),
        (Method::GET, "/servers/42/user/1"),
        (Method::GET, "/servers/42/channels"),
        (Method::GET, "/servers/42/channels/0"),
        (Method::GET, "/servers/42/channels/0/acl"),
        (Method::GET, "/servers/42/bans"),
        (Method::GET, "/servers/42/conf"),
        (Method::GET, "/cvp/42"),
    ] {
        let response = send_with(&app, method.clone(), uri, None, None).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "{method} {uri}");
        assert_eq!(response.json(), json!({"message": "Not Found"}), "{method} {uri}");
    }

    for uri in [
        "/servers/42/user",
        "/servers/42/channels",
        "/servers/42/conf",
        "/servers/42/sendmessage",
        "/servers/42/setsuperuserpw",
        "/servers/42/kickuser",
        "/servers/42/channels/0/password",
    ] {
        let response = post(
            &app,
            uri,
            &[
                ("username", "u"),
                ("password", "p"),
                ("name", "c"),
                ("key", "k"),
                ("value", "v"),
                ("message", "m"),
                ("usersession", "1"),
            ],
        )
        .await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "POST {uri}");
    }

    assert!(meta.get_all_servers().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_legacy_internal_status_for_sub_resource_deletes() {
    let (app, _) = test_app();

    let response = delete(&app, "/servers/7/user/3").await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json()["message"], "No Server Found for ID 7");

    let response = delete(&app, "/servers/7/channels/3").await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json()["message"], "No Server Found for ID 7");

    let response = post_empty(&app, "/servers/7/user/3/mute").await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json()["message"], "No Server Found for ID 7");

    let id = create_server(&app, &[]).await;

    let response = delete(&app, &format!("/servers/{id}/user/9")).await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json()["message"], "No User Found for ID 9");

    let response = delete(&app, &format!("/servers/{id}/channels/9")).await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json()["message"], "No Channel Found for ID 9");

    let response = post_empty(&app, &format!("/servers/{id}/user/9/unmute")).await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json()["message"], "No User Found for ID 9");
}

// -- Servers --

#[tokio::test]
async fn test_list_servers() {
    let (app, _) = test_app();
    assert_eq!(get(&app, "/servers").await.json(), json!([]));

    create_server(&app, &[("registername", "Alpha")]).await;
    let second = create_server(&app, &[]).await;
    post_empty(&app, &format!("/servers/{second}/stop")).await;

    let list = get(&app, "/servers").await.json();
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 2);

    assert_eq!(list[0]["name"], "Alpha");
    assert_eq!(list[0]["running"], true);
    assert_eq!(list[0]["port"], 64738);
    assert_eq!(list[0]["address"], ":64738");
    assert_eq!(list[0]["maxusers"], 100);
    assert_eq!(list[0]["channels"], 1);
    assert_eq!(list[0]["users"], 0);
    assert!(list[0]["uptime"].as_str().unwrap().contains(':'));

    assert_eq!(list[1]["running"], false);
    assert_eq!(list[1]["port"], 64739);
    assert_eq!(list[1]["channels"], 0);
    assert_eq!(list[1]["uptime"], "");
    assert_eq!(list[1]["uptime_seconds"], 0);
}

#[tokio::test]
async fn test_create_then_get() {
    let (app, _) = test_app();
    let id = create_server(&app, &[("registername", "X")]).await;

    let detail = get(&app, &format!("/servers/{id}")).await;
    assert_eq!(detail.status, StatusCode::OK);
    let detail = detail.json();
    assert_eq!(detail["name"], "X");
    assert_eq!(detail["running"], true);
    assert_eq!(detail["parent_channel"]["name"], "Root");
    assert_eq!(detail["sub_channels"], json!([]));
    assert_eq!(detail["users"], json!([]));
    assert_eq!(detail["registered_users"], json!({"0": "SuperUser"}));
    assert_eq!(detail["bans"], json!([]));
    assert_eq!(detail["user_count"], 0);
}

#[tokio::test]
async fn test_create_writes_only_submitted_fields() {
    let (app, meta) = test_app();

    let bare = create_server(&app, &[]).await;
    assert!(meta.explicit_conf(bare as i32).await.is_empty());

    let configured = create_server(
        &app,
        &[
            ("users", "12"),
            ("welcometext", "hi"),
            ("registerhostname", "voice.example.org"),
            ("password", ""),
            ("unrelated", "ignored"),
        ],
    )
    .await;

    let conf = meta.explicit_conf(configured as i32).await;
    assert_eq!(conf.len(), 3);
    assert_eq!(conf["users"], "12");
    assert_eq!(conf["welcometext"], "hi");
    assert_eq!(conf["registerhostname"], "voice.example.org");

    let detail = get(&app, &format!("/servers/{configured}")).await.json();
    assert_eq!(detail["maxusers"], 12);
    assert_eq!(detail["welcometext"], "hi");
}

#[tokio::test]
async fn test_stopped_server_detail_has_null_tree_fields() {
    let (app, _) = test_app();
    let id = create_server(&app, &[]).await;
    post_empty(&app, &format!("/servers/{id}/stop")).await;

    let detail = get(&app, &format!("/servers/{id}")).await.json();
    assert_eq!(detail["running"], false);
    assert_eq!(detail["uptime"], 0);
    assert_eq!(detail["humanize_uptime"], "");
    for key in ["parent_channel", "sub_channels", "users", "registered_users", "bans"] {
        assert_eq!(detail[key], Value::Null, "{key}");
    }
}

#[tokio::test]
async fn test_start_and_stop_are_idempotent() {
    let (app, _) = test_app();
    let id = create_server(&app, &[]).await;

    let cases = [
        ("start", "Server already running."),
        ("stop", "Server stopped."),
        ("stop", "Server already stopped."),
        ("start", "Server started."),
        ("start", "Server already running."),
    ];
    for (action, expected) in cases {
        let response = post_empty(&app, &format!("/servers/{id}/{action}")).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json()["message"], expected, "{action}");
    }
}

#[tokio::test]
async fn test_delete_running_server() {
    let (app, meta) = test_app();
    let id = create_server(&app, &[]).await;

    let response = delete(&app, &format!("/servers/{id}")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), json!({"message": "Server deleted"}));
    assert!(meta.get_server(id as i32).await.unwrap().is_none());

    let response = delete(&app, &format!("/servers/{id}")).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bulk_delete_skips_unknown_ids() {
    let (app, meta) = test_app();
    for _ in 0..6 {
        create_server(&app, &[]).await;
    }
    post_empty(&app, "/servers/6/stop").await;

    let response = delete(&app, "/servers/delete?id=5,6,999").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json(),
        json!({"message": "Deleting servers.", "ids": [5, 6, 999]})
    );

    let remaining: Vec<i32> = meta
        .get_all_servers()
        .await
        .unwrap()
        .iter()
        .map(|s| s.id())
        .collect();
    assert_eq!(remaining, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn test_bulk_delete_without_ids() {
    let (app, _) = test_app();

    let response = delete(&app, "/servers/delete").await;
    assert_eq!(response.json(), json!({"message": "No servers to delete."}));

    let response = delete(&app, "/servers/delete?id=").await;
    assert_eq!(response.json(), json!({"message": "No servers to delete."}));

    let response = delete(&app, "/servers/delete?id=1,abc").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_logs() {
    let (app, _) = test_app();
    let id = create_server(&app, &[]).await;

    let logs = get(&app, &format!("/servers/{id}/logs")).await.json();
    let logs = logs.as_array().unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0]["message"], "Server started");
    assert!(logs[0]["timestamp"].is_number());
    assert_eq!(logs[1]["message"], "Server created");
}

// -- Users --

#[tokio::test]
async fn test_user_registration_lifecycle() {
    let (app, _) = test_app();
    let id = create_server(&app, &[]).await;

    let created = post(
        &app,
        &format!("/servers/{id}/user"),
        &[("username", "alice"), ("password", "pw")],
    )
    .await;
    assert_eq!(created.status, StatusCode::OK);
    let created = created.json();
    assert_eq!(created["user_id"], 1);
    assert_eq!(created["username"], "alice");
    assert!(!created["last_active"].as_str().unwrap().is_empty());

    let fetched = get(&app, &format!("/servers/{id}/user/1")).await.json();
    assert_eq!(fetched["username"], "alice");

    let response = get(&app, &format!("/servers/{id}/user/5")).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let deleted = delete(&app, &format!("/servers/{id}/user/1")).await;
    assert_eq!(deleted.json(), json!({"user_id": 1, "deleted": "Success"}));

    let response = post(&app, &format!("/servers/{id}/user"), &[("username", "bob")]).await;
    assert_eq!(
        response.json(),
        json!({"message": "Username and password required."})
    );
}

#[tokio::test]
async fn test_mute_and_unmute_connected_user() {
    let (app, meta) = test_app();
    let id = create_server(&app, &[]).await;
    post(
        &app,
        &format!("/servers/{id}/user"),
        &[("username", "carol"), ("password", "pw")],
    )
    .await;
    let session = meta.connect_user(id as i32, "carol", 1).await.unwrap();
    meta.connect_user(id as i32, "guest", -1).await.unwrap();

    let listed = get(&app, &format!("/servers/{id}/user")).await.json();
    assert_eq!(listed[session.to_string()]["name"], "carol");
    assert_eq!(listed[session.to_string()]["mute"], false);

    let response = post_empty(&app, &format!("/servers/{id}/user/1/mute")).await;
    assert_eq!(response.json(), json!({"user_id": 1, "muted": "Success"}));
    let listed = get(&app, &format!("/servers/{id}/user")).await.json();
    assert_eq!(listed[session.to_string()]["mute"], true);

    let response = post_empty(&app, &format!("/servers/{id}/user/1/unmute")).await;
    assert_eq!(response.json(), json!({"user_id": 1, "unmuted": "Success"}));
    let listed = get(&app, &format!("/servers/{id}/user")).await.json();
    assert_eq!(listed[session.to_string()]["mute"], false);
}

#[tokio::test]
async fn test_duplicate_registration_is_a_server_error() {
    let (app, _) = test_app();
    let id = create_server(&app, &[]).await;
    let uri = format!("/servers/{id}/user");

    let first = post(&app, &uri, &[("username", "bob"), ("password", "pw")]).await;
    assert_eq!(first.status, StatusCode::OK);

    let second = post(&app, &uri, &[("username", "bob"), ("password", "other")]).await;
    assert_eq!(second.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_ne!(second.json()["message"], "User Not Found");

    let users = get(&app, &format!("/servers/{id}/user/1")).await.json();
    assert_eq!(users["username"], "bob");
}

// -- Channels --

#[tokio::test]
async fn test_channel_listing_orders_ids_numerically() {
    let (app, _) = test_app();
    let id = create_server(&app, &[]).await;
    for n in 1..=11 {
        let name = format!("Room {n}");
        post(&app, &format!("/servers/{id}/channels"), &[("name", name.as_str())]).await;
    }

    let response = get(&app, &format!("/servers/{id}/channels")).await;
    let keys: Vec<i32> = response
        .text
        .lines()
        .filter(|l| l.starts_with("    \"") && !l.starts_with("     "))
        .map(|l| l.trim().split('"').nth(1).unwrap().parse().unwrap())
        .collect();
    assert_eq!(keys, (0..=11).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_channel_crud() {
    let (app, _) = test_app();
    let id = create_server(&app, &[]).await;

    let created = post(
        &app,
        &format!("/servers/{id}/channels"),
        &[("name", "Lobby"), ("parent", "0")],
    )
    .await
    .json();
    assert_eq!(created["id"], 1);
    assert_eq!(created["name"], "Lobby");
    assert_eq!(created["parent"], 0);

    let sub = post(
        &app,
        &format!("/servers/{id}/channels"),
        &[("name", "Side Room"), ("parent", "1")],
    )
    .await
    .json();
    assert_eq!(sub["parent"], 1);

    let listed = get(&app, &format!("/servers/{id}/channels")).await.json();
    assert_eq!(listed.as_object().unwrap().len(), 3);
    assert_eq!(listed["2"]["name"], "Side Room");

    let fetched = get(&app, &format!("/servers/{id}/channels/1")).await.json();
    assert_eq!(fetched["name"], "Lobby");

    let response = get(&app, &format!("/servers/{id}/channels/77")).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let deleted = delete(&app, &format!("/servers/{id}/channels/1")).await;
    assert_eq!(deleted.json(), json!({"channel_id": 1, "deleted": "Success"}));
    let listed = get(&app, &format!("/servers/{id}/channels")).await.json();
    assert_eq!(listed.as_object().unwrap().len(), 1);

    let response = post(&app, &format!("/servers/{id}/channels"), &[("parent", "0")]).await;
    assert_eq!(response.json(), json!({"message": "Channel name required."}));
}

#[tokio::test]
async fn test_channel_password_replaces_acl_entries() {
    let (app, meta) = test_app();
    let id = create_server(&app, &[]).await;
    for name in ["One", "Two", "Three"] {
        post(&app, &format!("/servers/{id}/channels"), &[("name", name)]).await;
    }

    let server = meta.get_server(id as i32).await.unwrap().unwrap();
    server
        .set_acl(
            3,
            AclSet {
                acls: vec![
                    Acl {
                        apply_here: true,
                        userid: 4,
                        allow: 1,
                        ..Acl::default()
                    };
                    3
                ],
                groups: vec![Group {
                    name: "admins".to_string(),
                    members: vec![4],
                    ..Group::default()
                }],
                inherit: false,
            },
        )
        .await
        .unwrap();

    let response = post(
        &app,
        &format!("/servers/{id}/channels/3/password"),
        &[("password", "abc")],
    )
    .await;
    assert_eq!(
        response.json(),
        json!({"channel_id": 3, "set_password": "Success"})
    );

    let acl = get(&app, &format!("/servers/{id}/channels/3/acl")).await.json();
    assert_eq!(
        acl[0],
        json!([
            {
                "applyHere": true,
                "applySubs": false,
                "inherited": false,
                "userid": -1,
                "group": "all",
                "allow": 0,
                "deny": 910
            },
            {
                "applyHere": true,
                "applySubs": false,
                "inherited": false,
                "userid": -1,
                "group": "#abc",
                "allow": 910,
                "deny": 0
            }
        ])
    );
    assert_eq!(acl[1][0]["name"], "admins");
    assert_eq!(acl[2], false);
}

#[tokio::test]
async fn test_channel_password_errors() {
    let (app, _) = test_app();
    let id = create_server(&app, &[]).await;

    let response = post(
        &app,
        &format!("/servers/{id}/channels/12/password"),
        &[("password", "abc")],
    )
    .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json(), json!({"message": "Channel Not Found"}));

    let response = post_empty(&app, &format!("/servers/{id}/channels/0/password")).await;
    assert_eq!(response.json(), json!({"message": "Password required."}));
}

// -- Configuration --

#[tokio::test]
async fn test_conf_get_includes_defaults() {
    let (app, _) = test_app();
    let id = create_server(&app, &[("users", "5")]).await;

    let conf = get(&app, &format!("/servers/{id}/conf")).await.json();
    assert_eq!(conf["users"], "5");
    assert_eq!(conf["port"], "64738");
    assert_eq!(conf["timeout"], "30");
}

#[tokio::test]
async fn test_conf_set() {
    let (app, meta) = test_app();
    let id = create_server(&app, &[]).await;
    let uri = format!("/servers/{id}/conf");

    let response = post(&app, &uri, &[("key", "users"), ("value", "20")]).await;
    assert_eq!(response.json(), json!({"message": "Configuration updated."}));
    assert_eq!(meta.explicit_conf(id as i32).await.len(), 1);

    let response = post(
        &app,
        &uri,
        &[("bandwidth", "64000"), ("timeout", "45"), ("password", "")],
    )
    .await;
    assert_eq!(
        response.json(),
        json!({"message": "Configuration updated: 2 values."})
    );
    let conf = meta.explicit_conf(id as i32).await;
    assert_eq!(conf.len(), 3);
    assert_eq!(conf["timeout"], "45");

    let response = post(&app, &uri, &[("key", "users")]).await;
    assert_eq!(
        response.json(),
        json!({"message": "Configuration key and value required."})
    );

    let response = post_empty(&app, &uri).await;
    assert_eq!(
        response.json(),
        json!({"message": "Configuration key and value required."})
    );
}

// -- Messaging and moderation --

#[tokio::test]
async fn test_send_message() {
    let (app, meta) = test_app();
    let id = create_server(&app, &[]).await;
    let uri = format!("/servers/{id}/sendmessage");

    let response = post_empty(&app, &uri).await;
    assert_eq!(response.json(), json!({"message": "Message required."}));

    let response = post(&app, &uri, &[("message", "Maintenance at 10")]).await;
    assert_eq!(response.json(), json!({"message": "Message sent."}));

    let sent = meta.sent_messages(id as i32).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].channel_id, 0);
    assert!(sent[0].tree);
    assert_eq!(sent[0].text, "Maintenance at 10");
}

#[tokio::test]
async fn test_set_superuser_password() {
    let (app, meta) = test_app();
    let id = create_server(&app, &[]).await;
    let uri = format!("/servers/{id}/setsuperuserpw");

    let response = post(&app, &uri, &[("password", "")]).await;
    assert_eq!(response.json(), json!({"message": "Password required."}));

    let response = post(&app, &uri, &[("password", "hunter2")]).await;
    assert_eq!(response.json(), json!({"message": "Superuser password set."}));
    assert_eq!(
        meta.superuser_password(id as i32).await.as_deref(),
        Some("hunter2")
    );
}

#[tokio::test]
async fn test_kick_user() {
    let (app, meta) = test_app();
    let id = create_server(&app, &[]).await;
    let session = meta.connect_user(id as i32, "dave", -1).await.unwrap();
    let uri = format!("/servers/{id}/kickuser");

    for form in [vec![], vec![("usersession", "0")], vec![("usersession", "abc")]] {
        let response = post(&app, &uri, &form).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json(), json!({"message": "User session required."}));
    }

    let response = post(&app, &uri, &[("usersession", "999")]).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), json!({"message": "Not a valid session ID."}));

    let session = session.to_string();
    let response = post(&app, &uri, &[("usersession", session.as_str())]).await;
    assert_eq!(response.json(), json!({"message": "User kicked from server."}));

    let users = get(&app, &format!("/servers/{id}/user")).await.json();
    assert_eq!(users, json!({}));

    let logs = get(&app, &format!("/servers/{id}/logs")).await.json();
    assert!(
        logs[0]["message"]
            .as_str()
            .unwrap()
            .ends_with("Reason not defined.")
    );
}

#[tokio::test]
async fn test_bans() {
    let (app, meta) = test_app();
    let id = create_server(&app, &[]).await;
    meta.add_ban(
        id as i32,
        Ban {
            address: vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 255, 255, 10, 0, 0, 1],
            bits: 128,
            name: "troll".to_string(),
            reason: "spam".to_string(),
            ..Ban::default()
        },
    )
    .await
    .unwrap();

    let bans = get(&app, &format!("/servers/{id}/bans")).await.json();
    assert_eq!(bans.as_array().unwrap().len(), 1);
    assert_eq!(bans[0]["name"], "troll");
    assert_eq!(bans[0]["bits"], 128);
}

// -- Stats --

#[tokio::test]
async fn test_stats_only_count_running_servers() {
    let (app, meta) = test_app();
    let first = create_server(&app, &[]).await as i32;
    let second = create_server(&app, &[]).await as i32;
    create_server(&app, &[]).await;

    meta.connect_user(first, "a", -1).await.unwrap();
    meta.connect_user(first, "b", -1).await.unwrap();
    meta.connect_user(second, "c", -1).await.unwrap();
    post_empty(&app, &format!("/servers/{second}/stop")).await;

    let stats = get(&app, "/stats").await;
    assert_eq!(stats.status, StatusCode::OK);
    let stats = stats.json();
    assert_eq!(stats["all_servers"], 3);
    assert_eq!(stats["booted_servers"], 2);
    assert_eq!(stats["users_online"], 2);
    assert_eq!(stats["murmur_version"], "1.3.4");
    assert!(stats["murmur-rest_version"].is_string());
    assert!(stats["uptime"].is_number());
}

// -- CVP --

#[tokio::test]
async fn test_cvp_disabled_until_flag_set() {
    let (app, _) = test_app();
    let id = create_server(&app, &[]).await;

    let response = get(&app, &format!("/cvp/{id}")).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.json(), json!({"message": "CVP Disabled"}));

    post(
        &app,
        &format!("/servers/{id}/conf"),
        &[("key", "x_cvp"), ("value", "false")],
    )
    .await;
    let response = get(&app, &format!("/cvp/{id}")).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    post(
        &app,
        &format!("/servers/{id}/conf"),
        &[("key", "x_cvp"), ("value", "true")],
    )
    .await;
    let response = get(&app, &format!("/cvp/{id}")).await;
    assert_eq!(response.status, StatusCode::OK);

    let doc = response.json();
    assert_eq!(doc["id"], id);
    assert_eq!(doc["name"], "Root");
    assert_eq!(doc["root"]["name"], "Root");
    assert_eq!(doc["root"]["channels"], json!([]));
    assert!(doc["x_uptime"].is_number());
    assert!(doc.get("x_connecturl").is_none());
}

#[tokio::test]
async fn test_cvp_document() {
    let (app, meta) = test_app();
    let id = create_server(
        &app,
        &[
            ("registername", "Friday Night"),
            ("registerhostname", "voice.example.org"),
            ("port", "50000"),
        ],
    )
    .await;
    post(
        &app,
        &format!("/servers/{id}/conf"),
        &[("key", "x_cvp"), ("value", "1")],
    )
    .await;
    post(&app, &format!("/servers/{id}/channels"), &[("name", "Lobby")]).await;
    meta.connect_user(id as i32, "erin", -1).await.unwrap();

    let doc = get(&app, &format!("/cvp/{id}")).await.json();
    assert_eq!(doc["name"], "Friday Night");
    assert_eq!(
        doc["x_connecturl"],
        "mumble://voice.example.org:50000/?version=1.2.0"
    );
    assert_eq!(doc["root"]["channels"][0]["name"], "Lobby");
    assert_eq!(doc["root"]["users"][0]["name"], "erin");
    assert!(doc["root"]["users"][0].get("os").is_none());
}

#[tokio::test]
async fn test_cvp_jsonp() {
    let (app, _) = test_app();
    let id = create_server(&app, &[]).await;
    post(
        &app,
        &format!("/servers/{id}/conf"),
        &[("key", "x_cvp"), ("value", "true")],
    )
    .await;

    let response = get(&app, &format!("/cvp/{id}?callback=render.tree")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.headers.get(header::CONTENT_TYPE).unwrap(),
        "application/javascript"
    );
    assert!(response.text.starts_with("render.tree({"));
    assert!(response.text.ends_with("})"));
    let inner = &response.text["render.tree(".len()..response.text.len() - 1];
    let doc: Value = serde_json::from_str(inner).unwrap();
    assert_eq!(doc["id"], id);

    let response = get(&app, "/cvp/999?callback=cb").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(response.text.starts_with("cb("));

    let response = get(&app, &format!("/cvp/{id}?callback=render%2Etree")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.text.starts_with("render.tree({"));

    let response = get(&app, &format!("/cvp/{id}?callback=render%28")).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = get(&app, &format!("/cvp/{id}?callback=alert(1)")).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = get(&app, &format!("/cvp/{id}?callback=")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.text.starts_with('{'));
}

// -- Authentication --

#[tokio::test]
async fn test_admin_routes_require_credentials() {
    let (app, _) = test_app_with_auth();

    for uri in ["/servers", "/stats", "/servers/1/user"] {
        let response = get(&app, uri).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED, "{uri}");
        assert!(
            response
                .headers
                .get(header::WWW_AUTHENTICATE)
                .unwrap()
                .to_str()
                .unwrap()
                .starts_with("Basic realm=")
        );
        assert_eq!(response.text, "{\n    \"message\": \"Unauthorized\"\n}");
    }

    let wrong = basic_auth(TEST_USER, "nope");
    let response = send_with(&app, Method::GET, "/servers", None, Some(&wrong)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let right = basic_auth(TEST_USER, TEST_PASSWORD);
    let response = send_with(&app, Method::GET, "/servers", None, Some(&right)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), json!([]));

    let response = send_with(
        &app,
        Method::POST,
        "/servers",
        Some(&[("registername", "Secure")][..]),
        Some(&right),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["name"], "Secure");
}

#[tokio::test]
async fn test_public_routes_skip_auth() {
    let (app, meta) = test_app_with_auth();

    let response = get(&app, "/health").await;
    assert_eq!(response.status, StatusCode::OK);

    let server = meta.new_server().await.unwrap();
    server.start().await.unwrap();
    server.set_conf("x_cvp", "true").await.unwrap();

    let response = get(&app, &format!("/cvp/{}", server.id())).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["name"], "Root");
}
