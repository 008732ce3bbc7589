//! Inventory reconciler tests against `MemoryFacade`

use std::sync::Arc;

use aap_api::fakes::MemoryFacade;
use aap_api::{Lookup, RemoteFacade};
use aap_reconcile_core::{
    CancellationToken, InventoryAttributes, InventoryReconciler, ManagedValue, ReadOutcome,
    ReconcileError, Reconciler,
};

fn setup() -> (Arc<MemoryFacade>, InventoryReconciler, i64) {
    let facade = Arc::new(MemoryFacade::new());
    let org = facade.add_organization("Default");
    let reconciler = InventoryReconciler::new(facade.clone());
    (facade, reconciler, org)
}

#[tokio::test]
async fn test_create_and_read_back_without_drift() {
    let (_facade, reconciler, org) = setup();
    let declared = InventoryAttributes::new("web", org)
        .with_description("frontends")
        .with_variables("{\"env\": \"prod\", \"ports\": [80, 443]}");

    let state = reconciler
        .create(&declared, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(state.attributes, declared);
    assert!(state.url.ends_with(&format!("inventories/{}/", state.id)));

    match reconciler.read(&state).await.unwrap() {
        ReadOutcome::Found { state: observed, drift } => {
            assert!(drift.is_empty());
            assert_eq!(observed, state);
        }
        ReadOutcome::Absent => panic!("inventory should exist"),
    }
}

#[tokio::test]
async fn test_create_resolves_organization_name() {
    let (facade, reconciler, org) = setup();
    let declared = InventoryAttributes::in_organization_named("web", "Default");

    let state = reconciler
        .create(&declared, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(state.attributes.organization, Some(org));
    assert_eq!(state.attributes.organization_name.as_deref(), Some("Default"));

    let remote = facade
        .get_inventory(&Lookup::scoped("web", "Default"))
        .await
        .unwrap();
    assert_eq!(remote.id, state.id);
}

#[tokio::test]
async fn test_unknown_organization_name_is_validation_error() {
    let (facade, reconciler, _) = setup();
    let declared = InventoryAttributes::in_organization_named("web", "Nope");

    let err = reconciler
        .create(&declared, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(
        matches!(err, ReconcileError::Validation { ref attribute, .. } if attribute == "organization_name")
    );
    assert_eq!(facade.inventory_writes(), 0);
}

#[tokio::test]
async fn test_invalid_attributes_send_nothing() {
    let (facade, reconciler, org) = setup();

    let err = reconciler
        .create(&InventoryAttributes::new("", org), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::Validation { .. }));
    assert_eq!(facade.inventory_writes(), 0);
}

#[tokio::test]
async fn test_read_keeps_applied_variables_when_reformatted() {
    let (facade, reconciler, org) = setup();
    let declared = InventoryAttributes::new("web", org).with_variables("env: prod\nregion: eu\n");
    let state = reconciler
        .create(&declared, &CancellationToken::new())
        .await
        .unwrap();

    facade.edit_inventory(state.id, |inv| {
        inv.variables = "{\"region\": \"eu\", \"env\": \"prod\"}".into();
    });

    match reconciler.read(&state).await.unwrap() {
        ReadOutcome::Found { state: observed, drift } => {
            assert!(drift.is_empty());
            assert_eq!(
                observed.attributes.variables,
                Some(ManagedValue::new("env: prod\nregion: eu\n"))
            );
        }
        ReadOutcome::Absent => panic!("inventory should exist"),
    }
}

#[tokio::test]
async fn test_read_reports_out_of_band_changes() {
    let (facade, reconciler, org) = setup();
    let declared = InventoryAttributes::new("web", org)
        .with_description("frontends")
        .with_variables("env: prod\n");
    let state = reconciler
        .create(&declared, &CancellationToken::new())
        .await
        .unwrap();

    facade.edit_inventory(state.id, |inv| {
        inv.name = "web-renamed".into();
        inv.variables = "env: staging\n".into();
    });

    match reconciler.read(&state).await.unwrap() {
        ReadOutcome::Found { state: observed, drift } => {
            assert_eq!(drift.attributes, vec!["name", "variables"]);
            assert_eq!(observed.attributes.name, "web-renamed");
            assert_eq!(observed.attributes.description.as_deref(), Some("frontends"));
        }
        ReadOutcome::Absent => panic!("inventory should exist"),
    }
}

#[tokio::test]
async fn test_read_absent_inventory_is_not_an_error() {
    let (facade, reconciler, org) = setup();
    let state = reconciler
        .create(&InventoryAttributes::new("web", org), &CancellationToken::new())
        .await
        .unwrap();

    facade.remove_inventory(state.id);
    assert_eq!(reconciler.read(&state).await.unwrap(), ReadOutcome::Absent);
}

#[tokio::test]
async fn test_update_moves_inventory_between_organizations() {
    let (facade, reconciler, org) = setup();
    let other = facade.add_organization("Platform");
    let state = reconciler
        .create(&InventoryAttributes::new("web", org), &CancellationToken::new())
        .await
        .unwrap();

    let declared = InventoryAttributes::new("web", other).with_description("moved");
    let next = reconciler
        .update(&state, &declared, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(next.id, state.id);
    assert_eq!(next.attributes.organization, Some(other));
    let remote = facade.get_inventory(&Lookup::id(state.id)).await.unwrap();
    assert_eq!(remote.organization, other);
    assert_eq!(remote.description, "moved");
}

#[tokio::test]
async fn test_update_of_removed_inventory_is_not_found() {
    let (facade, reconciler, org) = setup();
    let state = reconciler
        .create(&InventoryAttributes::new("web", org), &CancellationToken::new())
        .await
        .unwrap();
    facade.remove_inventory(state.id);

    let err = reconciler
        .update(&state, &InventoryAttributes::new("web2", org), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::NotFound { .. }));
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let (facade, reconciler, org) = setup();
    let state = reconciler
        .create(&InventoryAttributes::new("web", org), &CancellationToken::new())
        .await
        .unwrap();

    reconciler.delete(&state).await.unwrap();
    assert!(facade.get_inventory(&Lookup::id(state.id)).await.is_err());

    // already gone
    reconciler.delete(&state).await.unwrap();
}
