//! Route → fragment rendering.
//!
//! # Responsibilities
//! - Render ACL rule blocks per frontend and placement
//! - Render backend blocks with one server line per entry
//! - Render co-located default-backend directives
//! - Replace or delete a route's fragments in the store

use std::fmt::Write as _;

use crate::error::ConductorResult;
use crate::fragments::key::{FragmentKey, FragmentKind};
use crate::fragments::store::FragmentStore;
use crate::model::{AclMatch, Action, BackendPool, Frontend, Placement, ServiceRoute};

/// Rendered fragment bodies for one route, in render order.
pub type RenderedFragments = Vec<(FragmentKey, String)>;

fn placement_kind(placement: Placement) -> FragmentKind {
    match placement {
        Placement::Normal => FragmentKind::Frontend,
        Placement::Top => FragmentKind::FrontendTop,
        Placement::Bottom => FragmentKind::FrontendBottom,
    }
}

fn append(out: &mut RenderedFragments, key: FragmentKey, body: String) {
    if body.is_empty() {
        return;
    }
    match out.iter_mut().find(|(k, _)| *k == key) {
        Some((_, existing)) => existing.push_str(&body),
        None => out.push((key, body)),
    }
}

fn render_acls(frontend: &Frontend) -> String {
    let mut body = String::new();
    for group in &frontend.acl_groups {
        for m in &group.matches {
            let _ = match m {
                AclMatch::HeaderMatch(host) => {
                    writeln!(body, "    acl {} hdr_beg(host) {}", group.name, host)
                }
                AclMatch::PathPrefixMatch(path) => {
                    writeln!(body, "    acl {} path_beg -i {}", group.name, path)
                }
            };
        }
        let _ = writeln!(body, "    use_backend {} if {}", group.backend, group.name);
    }
    body
}

fn render_backend(pool: &BackendPool) -> String {
    let mut body = String::new();
    let _ = writeln!(body, "\nbackend {}", pool.name);
    let tail = pool.tail.trim();
    for server in &pool.servers {
        if tail.is_empty() {
            let _ = writeln!(body, "    server {} {}:{}", server.name, server.address, server.port);
        } else {
            let _ = writeln!(
                body,
                "    server {} {}:{} {}",
                server.name, server.address, server.port, tail
            );
        }
    }
    body
}

/// Render every fragment an upserted route contributes.
///
/// Frontends sharing a name and placement merge into one fragment.
pub fn render_route(route: &ServiceRoute) -> RenderedFragments {
    let mut out = RenderedFragments::new();

    for frontend in &route.frontends {
        let kind = placement_kind(frontend.placement);
        let key = FragmentKey::scoped(&route.id, &frontend.name, kind);
        append(&mut out, key, render_acls(frontend));
    }

    let backends: String = route.backends.iter().map(render_backend).collect();
    append(
        &mut out,
        FragmentKey::global(&route.id, FragmentKind::Backend),
        backends,
    );

    // A frontend takes one default backend; the last declaration wins.
    for frontend in &route.frontends {
        if let Some(default_backend) = &frontend.default_backend {
            let key = FragmentKey::scoped(&route.id, &frontend.name, FragmentKind::DefaultBackend);
            let body = format!("    default_backend {}\n", default_backend);
            match out.iter_mut().find(|(k, _)| *k == key) {
                Some((_, existing)) => *existing = body,
                None => out.push((key, body)),
            }
        }
    }

    out
}

/// Bring the store in line with one route.
///
/// Stale fragments are always deleted first; an upsert then writes the
/// freshly rendered set.
pub fn apply_route(
    store: &mut FragmentStore,
    route: &ServiceRoute,
    force_remove: bool,
) -> ConductorResult<()> {
    store.remove_owner(&route.id)?;

    if force_remove || route.action == Action::Remove {
        tracing::info!(route = %route.id, "Route removed");
        return Ok(());
    }

    let fragments = render_route(route);
    for (key, body) in &fragments {
        store.write(key, body.as_bytes())?;
    }
    tracing::info!(route = %route.id, fragments = fragments.len(), "Route rendered");
    Ok(())
}
