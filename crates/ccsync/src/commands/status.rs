//! `status`: what the controller currently has, grouped by kind.

use std::fmt::Write as _;

use tabled::Tabled;

use ccsync_core::{Controller, InventorySnapshot, ObservedDetail, ObservedResource, ResourceKind};

use crate::cli::{GlobalOpts, StatusArgs, StatusKind};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct PoolRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "CIDR")]
    cidr: String,
    #[tabled(rename = "Gateway")]
    gateway: String,
    #[tabled(rename = "DHCP")]
    dhcp: String,
    #[tabled(rename = "DNS")]
    dns: String,
    #[tabled(rename = "Used")]
    usage: String,
}

#[derive(Tabled)]
struct SiteRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "ID")]
    id: String,
}

#[derive(Tabled)]
struct ReservationRow {
    #[tabled(rename = "Site")]
    site: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "CIDR")]
    cidr: String,
    #[tabled(rename = "Used")]
    usage: String,
}

fn usage(used: Option<u64>, total: Option<u64>) -> String {
    match (used, total) {
        (Some(u), Some(t)) => format!("{u}/{t}"),
        (Some(u), None) => u.to_string(),
        _ => "-".into(),
    }
}

fn cidr(resource: &ObservedResource) -> String {
    resource
        .cidr()
        .map_or_else(|| "-".into(), |c| c.to_string())
}

fn pool_row(r: &ObservedResource) -> Option<PoolRow> {
    let ObservedDetail::Pool {
        gateways,
        dhcp_servers,
        dns_servers,
        used,
        total,
        ..
    } = &r.detail
    else {
        return None;
    };
    Some(PoolRow {
        name: r.key.name().to_owned(),
        cidr: cidr(r),
        gateway: gateways.join(", "),
        dhcp: dhcp_servers.join(", "),
        dns: dns_servers.join(", "),
        usage: usage(*used, *total),
    })
}

fn site_row(r: &ObservedResource) -> Option<SiteRow> {
    let ObservedDetail::Site { inferred_kind, .. } = &r.detail else {
        return None;
    };
    let kind = r.kind().to_string();
    Some(SiteRow {
        kind: if *inferred_kind { format!("{kind}*") } else { kind },
        path: util::resource_label(&r.key),
        id: r.id.clone(),
    })
}

fn reservation_row(r: &ObservedResource) -> Option<ReservationRow> {
    let ObservedDetail::Reservation { used, total, .. } = &r.detail else {
        return None;
    };
    let ccsync_core::ResourceKey::Reservation { site, name } = &r.key else {
        return None;
    };
    Some(ReservationRow {
        site: site.to_string(),
        name: name.clone(),
        cidr: cidr(r),
        usage: usage(*used, *total),
    })
}

fn includes(filter: Option<StatusKind>, kind: ResourceKind) -> bool {
    match filter {
        None => true,
        Some(StatusKind::Pools) => kind == ResourceKind::GlobalPool,
        Some(StatusKind::Sites) => kind.is_site(),
        Some(StatusKind::Reservations) => kind == ResourceKind::PoolReservation,
    }
}

fn render_snapshot(snapshot: &InventorySnapshot) -> String {
    let mut out = String::new();

    let pools: Vec<PoolRow> = snapshot.resources.iter().filter_map(pool_row).collect();
    if !pools.is_empty() {
        let _ = writeln!(out, "Global pools\n{}", output::render_table(&pools));
    }

    let mut sites: Vec<&ObservedResource> = snapshot
        .resources
        .iter()
        .filter(|r| r.kind().is_site())
        .collect();
    sites.sort_by(|a, b| a.key.cmp(&b.key));
    let sites: Vec<SiteRow> = sites.into_iter().filter_map(site_row).collect();
    if !sites.is_empty() {
        let _ = writeln!(out, "Sites\n{}", output::render_table(&sites));
    }

    let reservations: Vec<ReservationRow> = snapshot
        .resources
        .iter()
        .filter_map(reservation_row)
        .collect();
    if !reservations.is_empty() {
        let _ = writeln!(out, "Reservations\n{}", output::render_table(&reservations));
    }

    if out.is_empty() {
        return "No matching resources on the controller.".into();
    }
    if snapshot.resources.iter().any(|r| {
        matches!(
            r.detail,
            ObservedDetail::Site {
                inferred_kind: true,
                ..
            }
        )
    }) {
        out.push_str("* kind inferred from hierarchy depth\n");
    }
    let _ = write!(out, "as of {}", snapshot.taken_at.to_rfc3339());
    out
}

pub async fn handle(
    controller: &Controller,
    args: &StatusArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut snapshot = controller.status().await?;
    snapshot.resources.retain(|r| includes(args.kind, r.kind()));

    let rendered = output::render_single(&global.output, &snapshot, render_snapshot, |s| {
        s.resources
            .iter()
            .map(|r| util::resource_label(&r.key))
            .collect::<Vec<_>>()
            .join("\n")
    });
    output::print_output(&rendered, global.quiet);
    Ok(())
}
