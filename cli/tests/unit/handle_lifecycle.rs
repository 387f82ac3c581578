//! Instance handle lifecycle, identity and persistence.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use multiconn_common::{ApiError, ArchicadId, codes};
use multiconn_cli::application::InstanceHandle;
use multiconn_cli::domain::{HandleError, Status};

use crate::mocks::{FakeInstance, FakeTransport, port};

const TIMEOUT: Duration = Duration::from_millis(200);

async fn bootstrapped(transport: &FakeTransport, n: u16) -> InstanceHandle<FakeTransport> {
    InstanceHandle::bootstrapped(port(n), transport.clone(), TIMEOUT, TIMEOUT).await
}

#[tokio::test]
async fn test_new_handle_is_pending_and_not_fetched() {
    let handle = InstanceHandle::new(port(19723), FakeTransport::new());
    assert_eq!(handle.status(), Status::Pending);
    assert_eq!(
        handle.product_info().as_ref().unwrap_err().code,
        codes::NOT_FETCHED
    );
    assert!(!handle.is_fully_initialized());
    assert!(matches!(handle.standard(), Err(HandleError::NotConnected(Some(_)))));
}

#[tokio::test]
async fn test_bootstrap_fills_all_fields() {
    let transport = FakeTransport::new().with(port(19723), FakeInstance::solo("House"));
    let handle = bootstrapped(&transport, 19723).await;

    assert!(handle.is_fully_initialized());
    assert_eq!(handle.product_info().as_ref().unwrap().version, 27);
    assert_eq!(handle.archicad_id().as_ref().unwrap().project_name(), "House");
    assert!(
        handle
            .archicad_location()
            .as_ref()
            .unwrap()
            .archicad_location
            .starts_with("/opt/archicad/ARCHICAD")
    );
}

#[tokio::test]
async fn test_bootstrap_failures_are_kept_per_field() {
    let transport = FakeTransport::new().with(
        port(19723),
        FakeInstance::solo("House").failing("GetProjectInfo", ApiError::new(4010, "busy")),
    );
    let handle = bootstrapped(&transport, 19723).await;

    assert!(handle.is_product_info_initialized());
    assert_eq!(handle.archicad_id(), &Err(ApiError::new(4010, "busy")));
    assert!(handle.archicad_location().is_ok());
    assert!(!handle.is_fully_initialized());
}

#[tokio::test]
async fn test_connect_activates_and_binds_surface() {
    let transport = FakeTransport::new().with(port(19723), FakeInstance::solo("House"));
    let mut handle = bootstrapped(&transport, 19723).await;

    assert_eq!(handle.connect(TIMEOUT).await.unwrap(), Status::Active);
    let surface = handle.standard().expect("surface bound");
    assert_eq!(surface.port(), port(19723));
    assert_eq!(surface.product().build, 3001);
}

#[tokio::test]
async fn test_connect_refetches_missing_product_info() {
    let transport = FakeTransport::new().with(
        port(19723),
        FakeInstance::solo("House").failing("API.GetProductInfo", ApiError::timeout("slow")),
    );
    let mut handle = bootstrapped(&transport, 19723).await;
    assert!(!handle.is_product_info_initialized());

    transport.heal(port(19723), "API.GetProductInfo");
    assert_eq!(handle.connect(TIMEOUT).await.unwrap(), Status::Active);
    assert_eq!(transport.calls_to("API.GetProductInfo").len(), 2);
}

#[tokio::test]
async fn test_connect_without_product_info_fails() {
    let transport = FakeTransport::new().with(
        port(19723),
        FakeInstance::solo("House").failing("API.GetProductInfo", ApiError::timeout("slow")),
    );
    let mut handle = bootstrapped(&transport, 19723).await;

    assert_eq!(handle.connect(TIMEOUT).await.unwrap(), Status::Failed);
    assert!(handle.standard().is_err());
}

#[tokio::test]
async fn test_disconnect_returns_to_pending() {
    let transport = FakeTransport::new().with(port(19723), FakeInstance::solo("House"));
    let mut handle = bootstrapped(&transport, 19723).await;
    handle.connect(TIMEOUT).await.unwrap();

    handle.disconnect().unwrap();
    assert_eq!(handle.status(), Status::Pending);
    assert!(handle.standard().is_err());
    assert!(handle.core().is_ok());
}

#[tokio::test]
async fn test_unassigned_is_terminal() {
    let transport = FakeTransport::new().with(port(19723), FakeInstance::solo("House"));
    let mut handle = bootstrapped(&transport, 19723).await;
    handle.unassign();

    assert_eq!(handle.status(), Status::Unassigned);
    assert_eq!(handle.port(), None);
    assert_eq!(handle.core().unwrap_err(), HandleError::Unassigned);
    assert_eq!(handle.connect(TIMEOUT).await.unwrap_err(), HandleError::Unassigned);
    assert_eq!(handle.disconnect().unwrap_err(), HandleError::Unassigned);
}

#[tokio::test]
async fn test_set_port_keeps_active_handle_active() {
    let transport = FakeTransport::new()
        .with(port(19723), FakeInstance::solo("House"))
        .with(port(19730), FakeInstance::solo("House"));
    let mut handle = bootstrapped(&transport, 19723).await;
    handle.connect(TIMEOUT).await.unwrap();

    handle.set_port(Some(port(19730)));
    assert_eq!(handle.status(), Status::Active);
    assert_eq!(handle.standard().unwrap().port(), port(19730));

    handle.set_port(None);
    assert_eq!(handle.status(), Status::Unassigned);
}

#[tokio::test]
async fn test_equality_ignores_port() {
    let transport = FakeTransport::new()
        .with(port(19723), FakeInstance::solo("House"))
        .with(port(19724), FakeInstance::solo("House"))
        .with(port(19725), FakeInstance::solo("Barn"));
    let a = bootstrapped(&transport, 19723).await;
    let b = bootstrapped(&transport, 19724).await;
    let c = bootstrapped(&transport, 19725).await;

    assert_eq!(a, b);
    assert_ne!(a, c);
    // Handles without bootstrap data are never equal, not even to themselves.
    let empty = InstanceHandle::new(port(19726), transport.clone());
    assert!(!empty.same_instance(&empty));
}

#[tokio::test]
async fn test_teamwork_identity_ignores_credentials() {
    let transport = FakeTransport::new().with(port(19723), FakeInstance::teamwork("Tower"));
    let handle = bootstrapped(&transport, 19723).await;

    let ArchicadId::Teamwork {
        server_address,
        credentials,
        ..
    } = handle.archicad_id().as_ref().unwrap()
    else {
        panic!("expected a teamwork identity");
    };
    assert_eq!(server_address, "http://bimcloud.local:22000");
    assert_eq!(credentials.username, "alice");
}

#[tokio::test]
async fn test_json_round_trip_yields_unassigned_handle() {
    let transport = FakeTransport::new().with(port(19723), FakeInstance::teamwork("Tower"));
    let handle = bootstrapped(&transport, 19723).await;

    let saved = handle.to_json();
    assert!(saved["archicadId"]["teamworkCredentials"]["password"].is_null());

    let restored = InstanceHandle::from_json(saved, transport.clone()).unwrap();
    assert_eq!(restored.status(), Status::Unassigned);
    assert_eq!(restored.port(), Some(port(19723)));
    assert_eq!(restored, handle);
}

#[tokio::test]
async fn test_json_keeps_failure_records() {
    let transport = FakeTransport::new().with(
        port(19723),
        FakeInstance::solo("House").failing("GetArchicadLocation", ApiError::new(9, "denied")),
    );
    let handle = bootstrapped(&transport, 19723).await;

    let restored = InstanceHandle::from_json(handle.to_json(), transport.clone()).unwrap();
    assert_eq!(restored.archicad_location(), &Err(ApiError::new(9, "denied")));
}

#[test]
fn test_from_json_rejects_unknown_shape() {
    let value = serde_json::json!({"port": 19723, "productInfo": 5});
    assert!(InstanceHandle::from_json(value, FakeTransport::new()).is_err());
}
