//! Stream client tests against a scripted local event stream.

#![allow(clippy::unwrap_used)]

use std::ops::ControlFlow;

use amber_reducer::{ClientError, IncidentBoard, IncidentStatus, WatchEnd, watch};
use amber_types::{Event, EventKind, encode_frame};
use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;

fn stamped(kind: EventKind, from: &str, alert_id: &str, ts: i64) -> Event {
    let mut event = Event::new(kind, from).with_alert_id(alert_id);
    event.timestamp = ts;
    event
}

/// A stream body: greeting, keep-alive comment, a broken frame, and a short
/// incident timeline.
fn scripted_body() -> String {
    let mut body = encode_frame(&Event::connected()).unwrap();
    body.push_str(":\n\n");
    body.push_str("data: {\"oops\": \n\n");
    for event in [
        stamped(EventKind::AlertReported, "Alert Receiver", "A-1", 1),
        stamped(EventKind::AlertAssessed, "AI Analyzer", "A-1", 2).with_to("Broadcast Agent"),
        stamped(EventKind::AlertResolved, "System", "A-1", 3),
    ] {
        body.push_str(&encode_frame(&event).unwrap());
    }
    body
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/api/events")
}

#[tokio::test]
async fn watch_folds_stream_until_closed() {
    let url = serve(Router::new().route("/api/events", get(|| async { scripted_body() }))).await;

    let mut board = IncidentBoard::new();
    let mut seen = Vec::new();
    let end = watch(&reqwest::Client::new(), &url, &mut board, |event, _, _| {
        seen.push(event.kind.clone());
        ControlFlow::Continue(())
    })
    .await
    .unwrap();

    assert_eq!(end, WatchEnd::StreamClosed);
    assert_eq!(
        seen,
        vec![
            EventKind::Connected,
            EventKind::AlertReported,
            EventKind::AlertAssessed,
            EventKind::AlertResolved,
        ]
    );
    let incident = board.get("A-1").unwrap();
    assert_eq!(incident.status, IncidentStatus::Resolved);
    assert_eq!(incident.events.len(), 3);
}

#[tokio::test]
async fn watch_stops_when_callback_breaks() {
    let url = serve(Router::new().route("/api/events", get(|| async { scripted_body() }))).await;

    let mut board = IncidentBoard::new();
    let end = watch(&reqwest::Client::new(), &url, &mut board, |event, _, _| {
        if event.kind == EventKind::AlertAssessed {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    })
    .await
    .unwrap();

    assert_eq!(end, WatchEnd::Stopped);
    assert_eq!(board.get("A-1").unwrap().status, IncidentStatus::Active);
}

#[tokio::test]
async fn watch_reports_error_status() {
    let url = serve(Router::new().route(
        "/api/events",
        get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
    ))
    .await;

    let mut board = IncidentBoard::new();
    let err = watch(&reqwest::Client::new(), &url, &mut board, |_, _, _| {
        ControlFlow::Continue(())
    })
    .await
    .unwrap_err();
    assert!(matches!(err, ClientError::Status(503)));
}
