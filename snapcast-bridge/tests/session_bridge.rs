//! End-to-end tests: the real session worker against a fake snapserver

mod support;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde_json::json;
use snapcast_bridge::{
    ClientId, ConnectionState, ErrorKind, GroupId, GroupSelection, Intent, SnapcastBridge,
    StreamId, StreamStatus,
};
use support::{
    client_json, default_status, replacement_status, stream_json, wait_for, FakeSnapserver,
};

const WAIT: Duration = Duration::from_secs(5);

fn connect(server: &FakeSnapserver) -> SnapcastBridge {
    SnapcastBridge::connect(server.config()).expect("bridge should connect to fake server")
}

#[test]
fn test_connect_loads_full_state() {
    let server = FakeSnapserver::start(default_status());
    let bridge = connect(&server);

    let summary = bridge.summary();
    assert_eq!(summary.server_version.as_deref(), Some("0.27.0"));
    assert_eq!((summary.clients, summary.groups, summary.streams), (3, 2, 2));

    let snapshot = bridge.current_snapshot();
    assert_eq!(snapshot.session_id(), 1);
    assert!(snapshot.check_consistency().is_empty());
    assert_eq!(
        snapshot.client_display_name(&ClientId::new("patio")),
        "patio-pi"
    );
    assert_eq!(
        snapshot.group_display_name(&GroupId::new("downstairs")),
        "Downstairs"
    );
    assert_eq!(
        snapshot.selection_of(&GroupId::new("downstairs")),
        Some(GroupSelection::Mute)
    );

    let labels: Vec<_> = snapshot
        .stream_choices()
        .into_iter()
        .map(|choice| choice.label)
        .collect();
    assert_eq!(labels, vec!["Radio : playing", "Spotify : idle", "Mute"]);
    assert!(matches!(
        bridge.connection_state(),
        ConnectionState::Connected { session: 1 }
    ));
}

#[test]
fn test_stream_on_muted_group_waits_for_unmute_ack() {
    let server = FakeSnapserver::start(default_status());
    let bridge = Arc::new(connect(&server));
    server.hold("Group.SetMute");

    let worker_bridge = Arc::clone(&bridge);
    let call = thread::spawn(move || {
        worker_bridge.set_group_selection(
            &GroupId::new("downstairs"),
            &GroupSelection::Stream(StreamId::new("spotify")),
        )
    });

    assert!(wait_for(WAIT, || server.mutating_methods().len() == 1));
    thread::sleep(Duration::from_millis(150));
    assert_eq!(server.mutating_methods(), vec!["Group.SetMute"]);

    server.release_held();
    let confirmation = call.join().unwrap().unwrap();

    assert_eq!(
        confirmation.methods(),
        vec!["Group.SetMute", "Group.SetStream"]
    );
    let received = server.received();
    let mutes: Vec<_> = received
        .iter()
        .filter(|r| r.method == "Group.SetMute")
        .collect();
    assert_eq!(mutes.len(), 1);
    assert_eq!(mutes[0].params["mute"], json!(false));
    assert_eq!(
        server.mutating_methods(),
        vec!["Group.SetMute", "Group.SetStream"]
    );

    let snapshot = bridge.current_snapshot();
    let group = snapshot.group(&GroupId::new("downstairs")).unwrap();
    assert!(!group.muted);
    assert_eq!(group.stream_id, Some(StreamId::new("spotify")));
}

#[test]
fn test_delayed_unmute_still_precedes_stream() {
    let server = FakeSnapserver::start(default_status());
    let bridge = connect(&server);
    server.set_delay("Group.SetMute", Duration::from_millis(200));

    let results = bridge.set_group_selections(&[(
        GroupId::new("downstairs"),
        GroupSelection::Stream(StreamId::new("radio")),
    )]);
    assert!(results[0].is_ok());

    let received = server.received();
    let mute = received.iter().find(|r| r.method == "Group.SetMute").unwrap();
    let stream = received
        .iter()
        .find(|r| r.method == "Group.SetStream")
        .unwrap();
    assert!(stream.received_at >= mute.answered_at.unwrap());
}

#[test]
fn test_muting_muted_group_sends_one_command() {
    let server = FakeSnapserver::start(default_status());
    let bridge = connect(&server);

    let confirmation = bridge
        .set_group_selection(&GroupId::new("downstairs"), &GroupSelection::Mute)
        .unwrap();

    assert_eq!(confirmation.methods(), vec!["Group.SetMute"]);
    let received = server.received();
    let mutes: Vec<_> = received
        .iter()
        .filter(|r| r.method != "Server.GetStatus")
        .collect();
    assert_eq!(mutes.len(), 1);
    assert_eq!(mutes[0].params["mute"], json!(true));
}

#[test]
fn test_batch_rows_fail_independently() {
    let server = FakeSnapserver::start(default_status());
    let bridge = connect(&server);

    let results =
        bridge.set_client_volumes(&[(ClientId::new("ghost"), 50), (ClientId::new("patio"), 80)]);

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].as_ref().unwrap_err().kind(), ErrorKind::NotFound);
    assert!(results[1].is_ok());
    assert_eq!(server.mutating_methods(), vec!["Client.SetVolume"]);
    assert_eq!(
        bridge
            .current_snapshot()
            .client(&ClientId::new("patio"))
            .unwrap()
            .volume,
        80
    );
}

#[test]
fn test_volume_keeps_client_mute_flag() {
    let server = FakeSnapserver::start(default_status());
    let bridge = connect(&server);

    bridge
        .set_client_volume(&ClientId::new("garage"), 65)
        .unwrap();

    let received = server.received();
    let request = received
        .iter()
        .find(|r| r.method == "Client.SetVolume")
        .unwrap();
    assert_eq!(
        request.params,
        json!({"id": "garage", "volume": {"muted": true, "percent": 65}})
    );
}

#[test]
fn test_reconnect_replaces_state() {
    let server = FakeSnapserver::start(default_status());
    let bridge = connect(&server);
    assert_eq!(bridge.current_snapshot().client_count(), 3);

    server.replace_status(replacement_status());
    server.disconnect();

    assert!(wait_for(WAIT, || bridge.current_snapshot().session_id() == 2
        && bridge.is_connected()));

    let snapshot = bridge.current_snapshot();
    let clients: Vec<_> = snapshot.clients().map(|c| c.id.to_string()).collect();
    assert_eq!(clients, vec!["attic"]);
    assert!(snapshot.group(&GroupId::new("downstairs")).is_none());
    assert!(snapshot.stream(&StreamId::new("radio")).is_none());
    assert!(snapshot.check_consistency().is_empty());
    assert_eq!(server.connections(), 2);

    let err = bridge
        .set_client_volume(&ClientId::new("kitchen"), 10)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_timeout_discards_late_response() {
    let server = FakeSnapserver::start(default_status());
    let config = server
        .config()
        .with_request_timeout(Duration::from_millis(200));
    let bridge = SnapcastBridge::connect(config).unwrap();
    server.hold("Client.SetVolume");

    let err = bridge
        .set_client_volume(&ClientId::new("kitchen"), 90)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);

    server.release_held();
    thread::sleep(Duration::from_millis(200));

    let snapshot = bridge.current_snapshot();
    assert_eq!(
        snapshot.client(&ClientId::new("kitchen")).unwrap().volume,
        40
    );
    assert_eq!(snapshot.session_id(), 1);

    // The connection is still usable afterwards
    bridge
        .set_group_selection(&GroupId::new("outside"), &GroupSelection::Mute)
        .unwrap();
    assert!(bridge.current_snapshot().group(&GroupId::new("outside")).unwrap().muted);
}

#[test]
fn test_reassign_moves_client_to_exactly_one_group() {
    let server = FakeSnapserver::start(default_status());
    let bridge = connect(&server);

    let confirmation = bridge
        .reassign_client(&ClientId::new("kitchen"), &GroupId::new("outside"))
        .unwrap();
    assert_eq!(confirmation.methods(), vec!["Group.SetClients"]);

    let snapshot = bridge.current_snapshot();
    let holding: Vec<_> = snapshot
        .groups()
        .filter(|g| g.contains(&ClientId::new("kitchen")))
        .map(|g| g.id.to_string())
        .collect();
    assert_eq!(holding, vec!["outside"]);
    assert_eq!(
        snapshot.group_of(&ClientId::new("kitchen")).unwrap().id,
        GroupId::new("outside")
    );
    assert!(snapshot.check_consistency().is_empty());
}

#[test]
fn test_reassign_to_current_group_sends_nothing() {
    let server = FakeSnapserver::start(default_status());
    let bridge = connect(&server);

    let confirmation = bridge
        .reassign_client(&ClientId::new("patio"), &GroupId::new("outside"))
        .unwrap();

    assert!(confirmation.is_noop());
    assert!(server.mutating_methods().is_empty());
}

#[test]
fn test_notifications_update_snapshot() {
    let server = FakeSnapserver::start(default_status());
    let bridge = connect(&server);

    server.notify(
        "Client.OnVolumeChanged",
        json!({"id": "patio", "volume": {"muted": false, "percent": 13}}),
    );
    server.notify(
        "Stream.OnUpdate",
        json!({"id": "spotify", "stream": stream_json("spotify", "Spotify", "playing")}),
    );

    assert!(wait_for(WAIT, || {
        let snapshot = bridge.current_snapshot();
        snapshot.client(&ClientId::new("patio")).unwrap().volume == 13
            && snapshot.stream(&StreamId::new("spotify")).unwrap().status
                == StreamStatus::Playing
    }));
}

#[test]
fn test_batched_notifications_and_unknown_methods() {
    let server = FakeSnapserver::start(default_status());
    let bridge = connect(&server);

    let batch = json!([
        {"jsonrpc": "2.0", "method": "Plugin.OnSomething", "params": {}},
        {"jsonrpc": "2.0", "method": "Group.OnMute", "params": {"id": "outside", "mute": true}},
        {"jsonrpc": "2.0", "method": "Client.OnNameChanged", "params": {"id": "kitchen", "name": "Kitchen"}}
    ]);
    server.send_raw(batch.to_string());
    server.send_raw("this is not json".to_string());

    assert!(wait_for(WAIT, || {
        let snapshot = bridge.current_snapshot();
        snapshot.group(&GroupId::new("outside")).unwrap().muted
            && snapshot.client_display_name(&ClientId::new("kitchen")) == "Kitchen"
    }));
    assert!(bridge.is_connected());
}

#[test]
fn test_new_client_triggers_full_pull() {
    let server = FakeSnapserver::start(default_status());
    let bridge = connect(&server);

    let mut status = default_status();
    status["groups"][1]["clients"]
        .as_array_mut()
        .unwrap()
        .push(client_json("shed", "shed-pi", 25, false));
    server.replace_status(status);
    server.notify(
        "Client.OnConnect",
        json!({"id": "shed", "client": client_json("shed", "shed-pi", 25, false)}),
    );

    assert!(wait_for(WAIT, || bridge
        .current_snapshot()
        .client(&ClientId::new("shed"))
        .is_some()));
    let snapshot = bridge.current_snapshot();
    assert_eq!(
        snapshot.group_of(&ClientId::new("shed")).unwrap().id,
        GroupId::new("outside")
    );
    assert_eq!(snapshot.session_id(), 1);
}

#[test]
fn test_new_stream_triggers_full_pull() {
    let server = FakeSnapserver::start(default_status());
    let bridge = connect(&server);

    let mut status = default_status();
    status["streams"]
        .as_array_mut()
        .unwrap()
        .push(stream_json("airplay", "AirPlay", "idle"));
    server.replace_status(status);
    server.notify(
        "Stream.OnUpdate",
        json!({"id": "airplay", "stream": stream_json("airplay", "AirPlay", "idle")}),
    );

    assert!(wait_for(WAIT, || bridge
        .current_snapshot()
        .stream(&StreamId::new("airplay"))
        .is_some()));
    let labels: Vec<_> = bridge
        .current_snapshot()
        .stream_choices()
        .into_iter()
        .map(|choice| choice.label)
        .collect();
    assert!(labels.contains(&"AirPlay : idle".to_string()));
}

#[test]
fn test_bad_batch_element_does_not_hide_response() {
    let server = FakeSnapserver::start(default_status());
    let bridge = Arc::new(connect(&server));
    server.hold("Client.SetVolume");

    let caller = Arc::clone(&bridge);
    let call = thread::spawn(move || caller.set_client_volume(&ClientId::new("kitchen"), 77));

    assert!(wait_for(WAIT, || server
        .request_id("Client.SetVolume")
        .is_some()));
    let id = server.request_id("Client.SetVolume").unwrap();
    let batch = json!([
        {"id": id, "jsonrpc": "2.0", "result": {"volume": {"muted": false, "percent": 77}}},
        42
    ]);
    server.send_raw(batch.to_string());

    assert!(call.join().unwrap().is_ok());
    assert_eq!(
        bridge
            .current_snapshot()
            .client(&ClientId::new("kitchen"))
            .unwrap()
            .volume,
        77
    );
    assert!(bridge.is_connected());
}

#[test]
fn test_malformed_response_fails_only_its_request() {
    let server = FakeSnapserver::start(default_status());
    let bridge = Arc::new(connect(&server));
    server.hold("Client.SetVolume");

    let caller = Arc::clone(&bridge);
    let call = thread::spawn(move || caller.set_client_volume(&ClientId::new("kitchen"), 60));

    assert!(wait_for(WAIT, || server
        .request_id("Client.SetVolume")
        .is_some()));
    let id = server.request_id("Client.SetVolume").unwrap();
    let broken = json!({"id": id, "jsonrpc": "1.0", "result": {}});
    server.send_raw(broken.to_string());

    let err = call.join().unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProtocolError);

    // Other commands on the same connection are unaffected
    bridge
        .set_group_selection(&GroupId::new("outside"), &GroupSelection::Mute)
        .unwrap();
    assert_eq!(bridge.current_snapshot().session_id(), 1);
}

#[test]
fn test_transport_drop_fails_in_flight_request() {
    let server = FakeSnapserver::start(default_status());
    let bridge = Arc::new(connect(&server));
    server.hold("Client.SetVolume");

    let caller = Arc::clone(&bridge);
    let call = thread::spawn(move || caller.set_client_volume(&ClientId::new("patio"), 20));

    assert!(wait_for(WAIT, || server
        .request_id("Client.SetVolume")
        .is_some()));
    server.disconnect();

    let err = call.join().unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConnectionLost);
    assert!(wait_for(WAIT, || bridge.current_snapshot().session_id() == 2));
}

#[test]
fn test_submit_from_form_rows() {
    let server = FakeSnapserver::start(default_status());
    let bridge = connect(&server);

    let intents = vec![
        Intent::volume_from_form("kitchen", "55").unwrap(),
        Intent::selection_from_form("outside", "spotify").unwrap(),
        Intent::selection_from_form("outside", "no-such-stream").unwrap(),
        Intent::reassign_from_form("garage", "downstairs").unwrap(),
    ];
    let results = bridge.submit(&intents);

    let kinds: Vec<_> = results
        .iter()
        .map(|r| r.as_ref().err().map(|e| e.kind()))
        .collect();
    assert_eq!(kinds, vec![None, None, Some(ErrorKind::NotFound), None]);

    let snapshot = bridge.current_snapshot();
    assert_eq!(snapshot.client(&ClientId::new("kitchen")).unwrap().volume, 55);
    assert_eq!(
        snapshot.selection_of(&GroupId::new("outside")),
        Some(GroupSelection::Stream(StreamId::new("spotify")))
    );
    assert_eq!(
        snapshot.group_of(&ClientId::new("garage")).unwrap().id,
        GroupId::new("downstairs")
    );
}

#[test]
fn test_concurrent_callers() {
    let server = FakeSnapserver::start(default_status());
    let bridge = Arc::new(connect(&server));

    let handles: Vec<_> = ["kitchen", "patio", "garage"]
        .into_iter()
        .enumerate()
        .map(|(i, id)| {
            let bridge = Arc::clone(&bridge);
            thread::spawn(move || bridge.set_client_volume(&ClientId::new(id), 10 + i as u8))
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap().is_ok());
    }
    assert_eq!(server.mutating_methods().len(), 3);
    let snapshot = bridge.current_snapshot();
    assert_eq!(snapshot.client(&ClientId::new("garage")).unwrap().volume, 12);
}

#[test]
fn test_shutdown_fails_later_requests() {
    let server = FakeSnapserver::start(default_status());
    let bridge = connect(&server);

    bridge.shutdown();

    assert_eq!(bridge.connection_state(), ConnectionState::Closed);
    assert!(bridge.current_snapshot().is_empty());
    let err = bridge
        .session()
        .request(snapcast_api::Operation::GetStatus)
        .unwrap_err();
    assert!(matches!(err, snapcast_session::SessionError::ConnectionLost));
}
