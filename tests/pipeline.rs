//! End-to-end tests of the mutation and reload pipeline.

use reload_conductor::coordinator::ReleaseOutcome;
use reload_conductor::error::ConductorError;
use reload_conductor::health::HealthStatus;
use reload_conductor::lifecycle::{bootstrap, CycleOutcome, ReloadScheduler};
use reload_conductor::model::{Action, ChangeSetStatus, Placement};
use reload_conductor::service::ReloadDisposition;
use std::time::Duration;

mod common;

use common::{batched, checkout_route, id, immediate, route, Harness};

#[tokio::test]
async fn test_checkout_scenario() {
    let h = Harness::new();

    let outcome = h
        .service
        .add_or_update_routes(batched("cs-1", vec![checkout_route()]))
        .await
        .unwrap();
    assert!(outcome.config_changed);
    assert_eq!(outcome.reload, ReloadDisposition::Queued);
    assert_eq!(h.proxy.validations(), 1);
    assert_eq!(h.proxy.reloads(), 0);

    let frontend = h.fragment("checkout.public.frontend").unwrap();
    assert!(frontend.contains("acl is_checkout path_beg -i /cart"));
    assert!(frontend.contains("use_backend cart-backend if is_checkout"));
    let backend = h.fragment("checkout.backend").unwrap();
    assert!(backend.contains("backend cart-backend"));
    assert!(backend.contains("server checkout-1 10.0.0.5:8080"));

    let regenerated = h.service.regenerate_config().await.unwrap();
    assert!(!regenerated.reload_needed);

    assert_eq!(h.service.query_change_set_status(&id("cs-1")).await, ChangeSetStatus::Pending);
    h.service.lock_for_reload().await.unwrap();
    let report = h.service.reload().await.unwrap();
    assert_eq!(report.change_sets, vec![id("cs-1")]);
    h.service.release_reload_lock(ReleaseOutcome::Success).await.unwrap();

    assert_eq!(h.service.query_change_set_status(&id("cs-1")).await, ChangeSetStatus::Success);
    assert_eq!(h.proxy.reloads(), 1);
}

#[tokio::test]
async fn test_regenerate_is_idempotent() {
    let h = Harness::new();

    let first = h.service.regenerate_config().await.unwrap();
    assert!(first.reload_needed);
    let before = h.active().unwrap();

    let second = h.service.regenerate_config().await.unwrap();
    assert!(!second.reload_needed);
    assert_eq!(h.active().unwrap(), before);
    assert_eq!(h.proxy.validations(), 1);
}

#[tokio::test]
async fn test_regenerate_picks_up_operator_fragments() {
    let h = Harness::new();
    h.service.regenerate_config().await.unwrap();

    std::fs::write(h.paths.conf_dir.join("ops.backend"), "\nbackend maintenance\n").unwrap();
    let outcome = h.service.regenerate_config().await.unwrap();
    assert!(outcome.reload_needed);
    assert!(h.active().unwrap().contains("backend maintenance"));
}

#[tokio::test]
async fn test_rejected_regenerate_keeps_previous_config() {
    let h = Harness::new();
    h.service.regenerate_config().await.unwrap();
    let before = h.active().unwrap();

    std::fs::write(h.paths.conf_dir.join("ops.backend"), "\nbackend broken\n").unwrap();
    h.proxy.reject_next_validation("unknown keyword");
    let err = h.service.regenerate_config().await.unwrap_err();
    assert!(matches!(err, ConductorError::ValidationFailed { ref diagnostic } if diagnostic == "unknown keyword"));
    assert_eq!(h.active().unwrap(), before);
}

#[tokio::test]
async fn test_assembly_order() {
    let h = Harness::new();

    let mut top = route("alpha", "public", "/admin", "admin-backend", "10.0.0.1", 80);
    top.frontends[0].placement = Placement::Top;
    let mut bottom = route("omega", "public", "catchall.example.com", "fallback-backend", "10.0.0.2", 80);
    bottom.frontends[0].placement = Placement::Bottom;
    bottom.frontends[0].default_backend = Some("fallback-backend".into());
    let normal = route("middle", "public", "/shop", "shop-backend", "10.0.0.3", 80);
    let other = route("internal-api", "internal", "/api", "api-backend", "10.0.0.4", 80);

    h.service
        .add_or_update_routes(immediate(vec![bottom, normal, top, other]))
        .await
        .unwrap();

    let active = h.active().unwrap();
    let pos = |needle: &str| {
        active
            .find(needle)
            .unwrap_or_else(|| panic!("{} missing from:\n{}", needle, active))
    };

    assert!(pos("global") < pos("defaults"));
    assert!(pos("defaults") < pos("frontend public"));
    assert!(pos("frontend public") < pos("acl is_alpha"));
    assert!(pos("acl is_alpha") < pos("acl is_middle"));
    assert!(pos("acl is_middle") < pos("acl is_omega"));
    assert!(pos("acl is_omega") < pos("default_backend fallback-backend"));
    // frontends sort by name: "internal" before "public"
    assert!(pos("acl is_internal-api") < pos("frontend public"));

    let first_backend = pos("\nbackend ");
    for needle in ["acl is_alpha", "acl is_middle", "acl is_omega", "acl is_internal-api", "default_backend"] {
        assert!(pos(needle) < first_backend, "{} after backends", needle);
    }
}

#[tokio::test]
async fn test_rejected_new_route_is_rolled_back() {
    let h = Harness::new();
    h.service.regenerate_config().await.unwrap();
    let before = h.active().unwrap();
    let fragments_before = h.fragment_names();

    h.proxy.reject_next_validation("config invalid");
    let err = h
        .service
        .add_or_update_routes(batched("cs-bad", vec![checkout_route()]))
        .await
        .unwrap_err();

    assert!(matches!(err, ConductorError::ValidationFailed { .. }));
    assert_eq!(h.active().unwrap(), before);
    assert_eq!(h.fragment_names(), fragments_before);
    assert_eq!(h.service.query_change_set_status(&id("cs-bad")).await, ChangeSetStatus::NotFound);
}

#[tokio::test]
async fn test_rejected_update_restores_previous_fragments() {
    let h = Harness::new();
    h.service
        .add_or_update_routes(immediate(vec![checkout_route()]))
        .await
        .unwrap();
    let before = h.active().unwrap();
    let backend_before = h.fragment("checkout.backend").unwrap();

    let mut updated = checkout_route();
    updated.backends[0].servers[0].port = 9090;
    updated.frontends[0].placement = Placement::Top;

    h.proxy.reject_next_validation("bad port");
    let err = h
        .service
        .add_or_update_routes(immediate(vec![updated]))
        .await
        .unwrap_err();

    assert!(matches!(err, ConductorError::ValidationFailed { .. }));
    assert_eq!(h.active().unwrap(), before);
    assert_eq!(h.fragment("checkout.backend").unwrap(), backend_before);
    assert!(h.fragment("checkout.public.frontend").is_some());
    assert!(h.fragment("checkout.public.frontendtop").is_none());
}

#[tokio::test]
async fn test_lock_excludes_mutations() {
    let h = Harness::new();
    h.service
        .add_or_update_routes(batched("cs-1", vec![checkout_route()]))
        .await
        .unwrap();
    h.service.lock_for_reload().await.unwrap();
    let fragments_before = h.fragment_names();
    let active_before = h.active();

    let other = route("search", "public", "/search", "search-backend", "10.0.0.9", 80);
    let err = h
        .service
        .add_or_update_routes(batched("cs-2", vec![other]))
        .await
        .unwrap_err();
    assert!(matches!(err, ConductorError::Locked));

    let err = h
        .service
        .remove_routes(batched("cs-3", vec![checkout_route()]))
        .await
        .unwrap_err();
    assert!(matches!(err, ConductorError::Locked));

    assert!(matches!(h.service.regenerate_config().await, Err(ConductorError::Locked)));
    assert!(matches!(h.service.lock_for_reload().await, Err(ConductorError::Locked)));

    assert_eq!(h.fragment_names(), fragments_before);
    assert_eq!(h.active(), active_before);
    // every change set reads as pending while the window is open
    assert_eq!(h.service.query_change_set_status(&id("cs-2")).await, ChangeSetStatus::Pending);
}

#[tokio::test]
async fn test_lock_requires_pending_change_sets() {
    let h = Harness::new();
    assert!(matches!(h.service.lock_for_reload().await, Err(ConductorError::NothingPending)));
    assert!(matches!(h.service.reload().await, Err(ConductorError::NotLocked)));
    // releasing an unheld lock is harmless
    h.service.release_reload_lock(ReleaseOutcome::Success).await.unwrap();
}

#[tokio::test]
async fn test_failed_reload_then_successful_retry() {
    let h = Harness::new();
    h.service
        .add_or_update_routes(batched("cs-1", vec![checkout_route()]))
        .await
        .unwrap();
    h.service.lock_for_reload().await.unwrap();

    h.proxy.fail_next_reload("reload.sh exited 1");
    let err = h.service.reload().await.unwrap_err();
    assert!(matches!(err, ConductorError::Proxy { action: "reload", .. }));
    assert_eq!(h.service.query_change_set_status(&id("cs-1")).await, ChangeSetStatus::Pending);

    h.service.reload().await.unwrap();
    h.service.release_reload_lock(ReleaseOutcome::Failure).await.unwrap();
    assert_eq!(h.service.query_change_set_status(&id("cs-1")).await, ChangeSetStatus::Success);
}

#[tokio::test]
async fn test_release_without_reload_records_outcome() {
    let h = Harness::new();
    h.service
        .add_or_update_routes(batched("cs-1", vec![checkout_route()]))
        .await
        .unwrap();
    h.service.lock_for_reload().await.unwrap();
    h.service.release_reload_lock(ReleaseOutcome::Failure).await.unwrap();

    assert_eq!(h.service.query_change_set_status(&id("cs-1")).await, ChangeSetStatus::Failed);
    assert_eq!(h.proxy.reloads(), 0);
}

#[tokio::test]
async fn test_remove_is_idempotent() {
    let h = Harness::new();
    h.service
        .add_or_update_routes(immediate(vec![checkout_route()]))
        .await
        .unwrap();

    let outcome = h
        .service
        .remove_routes(immediate(vec![checkout_route()]))
        .await
        .unwrap();
    assert!(outcome.config_changed);
    assert!(h.fragment("checkout.backend").is_none());
    assert!(h.fragment("checkout.public.frontend").is_none());
    assert!(!h.active().unwrap().contains("cart-backend"));

    let again = h
        .service
        .remove_routes(immediate(vec![checkout_route()]))
        .await
        .unwrap();
    assert!(!again.config_changed);
    assert_eq!(again.reload, ReloadDisposition::NotNeeded);
}

#[tokio::test]
async fn test_remove_action_inside_add_batch() {
    let h = Harness::new();
    h.service
        .add_or_update_routes(immediate(vec![checkout_route()]))
        .await
        .unwrap();

    let mut removal = checkout_route();
    removal.action = Action::Remove;
    removal.frontends.clear();
    removal.backends.clear();
    let search = route("search", "public", "/search", "search-backend", "10.0.0.9", 80);

    h.service
        .add_or_update_routes(immediate(vec![removal, search]))
        .await
        .unwrap();
    assert!(h.fragment("checkout.backend").is_none());
    assert!(h.fragment("search.backend").is_some());
}

#[tokio::test]
async fn test_batched_mode_requires_id() {
    let h = Harness::new();
    let mut batch = batched("unused", vec![checkout_route()]);
    batch.id = None;

    let err = h.service.add_or_update_routes(batch).await.unwrap_err();
    assert!(matches!(err, ConductorError::InvalidChangeSet(_)));
    assert!(h.fragment("checkout.backend").is_none());
}

#[tokio::test]
async fn test_invalid_route_touches_nothing() {
    let h = Harness::new();
    let mut bad = checkout_route();
    bad.backends[0].name = "cart backend".into();

    let err = h
        .service
        .add_or_update_routes(immediate(vec![checkout_route(), bad]))
        .await
        .unwrap_err();
    assert!(matches!(err, ConductorError::InvalidRoute(_)));
    assert!(h.fragment("checkout.backend").is_none());
    assert!(h.active().is_none());
}

#[tokio::test]
async fn test_unchanged_batch_is_recorded_without_reload() {
    let h = Harness::new();
    h.service
        .add_or_update_routes(immediate(vec![checkout_route()]))
        .await
        .unwrap();
    let validations = h.proxy.validations();

    let outcome = h
        .service
        .add_or_update_routes(batched("cs-same", vec![checkout_route()]))
        .await
        .unwrap();
    assert!(!outcome.config_changed);
    assert_eq!(outcome.reload, ReloadDisposition::NotNeeded);
    assert_eq!(h.proxy.validations(), validations);
    assert_eq!(h.service.query_change_set_status(&id("cs-same")).await, ChangeSetStatus::Success);
}

#[tokio::test]
async fn test_unchanged_batch_rides_pending_reload() {
    let h = Harness::new();
    h.service
        .add_or_update_routes(batched("cs-1", vec![checkout_route()]))
        .await
        .unwrap();

    let outcome = h
        .service
        .add_or_update_routes(batched("cs-2", vec![checkout_route()]))
        .await
        .unwrap();
    assert!(!outcome.config_changed);
    assert_eq!(outcome.reload, ReloadDisposition::Queued);
    assert_eq!(h.service.status().await.pending, vec![id("cs-1"), id("cs-2")]);
}

#[tokio::test]
async fn test_immediate_reload_failure_keeps_config() {
    let h = Harness::new();
    h.proxy.fail_next_reload("proxy not running");

    let err = h
        .service
        .add_or_update_routes(immediate(vec![checkout_route()]))
        .await
        .unwrap_err();
    assert!(matches!(err, ConductorError::Proxy { action: "reload", .. }));
    assert!(h.active().unwrap().contains("cart-backend"));
    assert!(h.fragment("checkout.backend").is_some());
}

#[tokio::test]
async fn test_retry_after_failed_immediate_reload() {
    let h = Harness::new();
    h.proxy.fail_next_reload("reload refused");

    h.service
        .add_or_update_routes(immediate(vec![checkout_route()]))
        .await
        .unwrap_err();
    assert!(h.service.status().await.reload_owed);
    assert!(h.proxy_file("unloaded").exists());

    let outcome = h
        .service
        .add_or_update_routes(immediate(vec![checkout_route()]))
        .await
        .unwrap();
    assert!(!outcome.config_changed);
    assert_eq!(outcome.reload, ReloadDisposition::Reloaded);
    assert_eq!(h.proxy.reloads(), 2);
    assert!(!h.service.status().await.reload_owed);
    assert!(!h.proxy_file("unloaded").exists());
}

#[tokio::test]
async fn test_unloaded_config_is_queued_after_restart() {
    let mut h = Harness::new();
    h.proxy.fail_next_reload("reload refused");
    h.service
        .add_or_update_routes(immediate(vec![checkout_route()]))
        .await
        .unwrap_err();

    h.reopen();
    assert!(h.service.regenerate_config().await.unwrap().reload_needed);

    let outcome = h
        .service
        .add_or_update_routes(batched("cs-1", vec![checkout_route()]))
        .await
        .unwrap();
    assert_eq!(outcome.reload, ReloadDisposition::Queued);

    h.service.lock_for_reload().await.unwrap();
    h.service.reload().await.unwrap();
    h.service.release_reload_lock(ReleaseOutcome::Success).await.unwrap();
    assert!(!h.service.status().await.reload_owed);
}

#[tokio::test]
async fn test_state_survives_restart() {
    let mut h = Harness::new();
    h.service
        .add_or_update_routes(batched("cs-1", vec![checkout_route()]))
        .await
        .unwrap();
    h.service.lock_for_reload().await.unwrap();

    h.reopen();
    assert!(h.service.status().await.locked);
    assert!(h.proxy_file("lock").exists());
    assert_eq!(h.service.query_change_set_status(&id("cs-1")).await, ChangeSetStatus::Pending);

    h.service.reload().await.unwrap();
    h.service.release_reload_lock(ReleaseOutcome::Success).await.unwrap();
    assert_eq!(h.service.query_change_set_status(&id("cs-1")).await, ChangeSetStatus::Success);
    assert!(!h.proxy_file("lock").exists());
}

#[tokio::test]
async fn test_bootstrap_marks_node_live() {
    let h = Harness::new();
    assert_eq!(h.service.health_probe(), HealthStatus::NotReady);

    let report = bootstrap(&h.service).await;
    assert!(report.config_ready);
    assert!(report.proxy_started);
    assert!(report.live);
    assert_eq!(h.service.health_probe(), HealthStatus::Ok);

    h.service.set_not_live().unwrap();
    assert_eq!(h.service.health_probe(), HealthStatus::NotReady);
}

#[tokio::test]
async fn test_scheduler_cycle() {
    let h = Harness::new();
    let scheduler = ReloadScheduler::new(h.service.clone(), Duration::from_secs(3600));

    assert_eq!(scheduler.run_cycle().await, CycleOutcome::Skipped);

    h.service
        .add_or_update_routes(batched("cs-1", vec![checkout_route()]))
        .await
        .unwrap();
    assert_eq!(scheduler.run_cycle().await, CycleOutcome::Reloaded);
    assert_eq!(h.service.query_change_set_status(&id("cs-1")).await, ChangeSetStatus::Success);

    h.service
        .add_or_update_routes(batched("cs-2", vec![route("search", "public", "/search", "search-backend", "10.0.0.9", 80)]))
        .await
        .unwrap();
    h.proxy.fail_next_reload("boom");
    assert_eq!(scheduler.run_cycle().await, CycleOutcome::Failed);
    assert_eq!(h.service.query_change_set_status(&id("cs-2")).await, ChangeSetStatus::Failed);
    assert!(!h.service.status().await.locked);
}
