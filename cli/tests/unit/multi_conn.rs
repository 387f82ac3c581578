//! Discovery, scan merging and primary selection.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use multiconn_common::{ApiError, Port};
use multiconn_cli::application::PrimaryTarget;
use multiconn_cli::domain::{MultiConnError, PrimaryError, Status};

use crate::mocks::{FakeInstance, FakeTransport, multi_conn, port};

fn three_instances() -> FakeTransport {
    FakeTransport::new()
        .with(port(19723), FakeInstance::solo("House"))
        .with(port(19725), FakeInstance::teamwork("Tower"))
        .with(port(19744), FakeInstance::untitled())
}

#[tokio::test]
async fn test_discover_registers_every_open_port() {
    let transport = three_instances();
    let mut conn = multi_conn(&transport);
    conn.discover(None).await.unwrap();

    assert_eq!(conn.open_ports(), vec![port(19723), port(19725), port(19744)]);
    assert_eq!(conn.closed_ports().len(), 19);
    assert_eq!(conn.all_ports().len(), 22);
    assert!(conn.handles().all(|h| h.status() == Status::Pending));
    assert_eq!(conn.pending().len(), 3);
}

#[tokio::test]
async fn test_discover_picks_lowest_port_as_primary() {
    let transport = three_instances();
    let mut conn = multi_conn(&transport);
    conn.discover(None).await.unwrap();

    assert_eq!(conn.primary_port(), Some(port(19723)));
    assert_eq!(conn.primary().unwrap().status(), Status::Active);
    assert!(conn.standard().is_ok());
    // The registry entry is a separate handle and stays pending.
    assert_eq!(conn.get(port(19723)).unwrap().status(), Status::Pending);
}

#[tokio::test]
async fn test_discover_with_requested_primary() {
    let transport = three_instances();
    let mut conn = multi_conn(&transport);
    conn.discover(Some(port(19725))).await.unwrap();
    assert_eq!(conn.primary_port(), Some(port(19725)));
}

#[tokio::test]
async fn test_primary_on_closed_port_is_rejected() {
    let transport = three_instances();
    let mut conn = multi_conn(&transport);
    let err = conn.discover(Some(port(19730))).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Failed to set primary. Port 19730 is closed."
    );
    assert!(matches!(
        err,
        MultiConnError::Primary(PrimaryError::NotRegistered(p)) if p == port(19730)
    ));
}

#[tokio::test]
async fn test_primary_by_handle_searches_by_identity() {
    let transport = three_instances();
    let mut conn = multi_conn(&transport);
    conn.discover(None).await.unwrap();

    let tower = conn.get(port(19725)).unwrap().clone();
    conn.set_primary(Some(PrimaryTarget::from(&tower))).await.unwrap();
    assert_eq!(conn.primary_port(), Some(port(19725)));
}

#[tokio::test]
async fn test_no_instances_means_no_primary() {
    let transport = FakeTransport::new();
    let mut conn = multi_conn(&transport);
    conn.discover(None).await.unwrap();

    assert!(conn.is_empty());
    assert!(conn.primary().is_none());
    assert!(matches!(conn.core(), Err(MultiConnError::NoPrimary)));
}

#[tokio::test]
async fn test_scan_keeps_earlier_success_over_fresh_failure() {
    let transport = three_instances();
    let mut conn = multi_conn(&transport);
    conn.scan(Port::all()).await;
    assert!(conn.get(port(19723)).unwrap().is_fully_initialized());

    transport.fail(port(19723), "GetProjectInfo", ApiError::timeout("busy"));
    conn.scan([port(19723)]).await;

    let handle = conn.get(port(19723)).unwrap();
    assert_eq!(handle.archicad_id().as_ref().unwrap().project_name(), "House");
}

#[tokio::test]
async fn test_scan_drops_unreachable_ports_and_reselects_primary() {
    let transport = three_instances();
    let mut conn = multi_conn(&transport);
    conn.discover(None).await.unwrap();

    transport.remove(port(19723));
    conn.scan(Port::all()).await;

    assert_eq!(conn.open_ports(), vec![port(19725), port(19744)]);
    assert_eq!(conn.primary_port(), Some(port(19725)));
}

#[tokio::test]
async fn test_scan_picks_up_new_instances() {
    let transport = three_instances();
    let mut conn = multi_conn(&transport);
    conn.scan(Port::all()).await;

    transport.add(port(19730), FakeInstance::solo("Shed"));
    conn.scan([port(19730)]).await;
    assert_eq!(conn.len(), 4);
    assert_eq!(
        conn.get(port(19730))
            .unwrap()
            .archicad_id()
            .as_ref()
            .unwrap()
            .project_name(),
        "Shed"
    );
}

#[tokio::test]
async fn test_close_if_open_moves_primary() {
    let transport = three_instances();
    let mut conn = multi_conn(&transport);
    conn.discover(None).await.unwrap();

    conn.close_if_open(port(19723)).await;
    assert!(conn.get(port(19723)).is_none());
    assert_eq!(conn.primary_port(), Some(port(19725)));

    // Closing an unknown port is a no-op.
    conn.close_if_open(port(19730)).await;
    assert_eq!(conn.len(), 2);
}

#[test]
fn test_blocking_discover_outside_runtime() {
    let transport = three_instances();
    let mut conn = multi_conn(&transport);
    conn.discover_blocking(None).unwrap();
    assert_eq!(conn.len(), 3);
    assert_eq!(conn.primary_port(), Some(port(19723)));
}

#[tokio::test]
async fn test_blocking_discover_inside_runtime_is_refused() {
    let transport = three_instances();
    let mut conn = multi_conn(&transport);
    assert!(matches!(
        conn.discover_blocking(None),
        Err(MultiConnError::Bridge(_))
    ));
    assert!(conn.is_empty());
}
