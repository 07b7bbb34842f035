use anyhow::Result;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use serde_json::json;

use fieldsync_core::FieldSync;
use fieldsync_types::{Entity, EntityBody, NewContact, SyncDomain, SyncRecord};

pub async fn status(sync: &FieldSync, json: bool) -> Result<()> {
    sync.resolver.connect_with_fallback().await;
    let state = sync.resolver.state();
    let snapshot = sync.store.snapshot();

    if json {
        let counts: serde_json::Map<String, serde_json::Value> = SyncDomain::ALL
            .iter()
            .map(|d| (d.to_string(), json!(snapshot.count(*d))))
            .collect();
        let out = json!({
            "connection": state,
            "selected_server": snapshot.selected_server,
            "last_sync": snapshot.last_sync,
            "sample": snapshot.sample,
            "counts": counts,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let headline = if state.is_connected() {
        state.message.green()
    } else {
        state.message.red()
    };
    println!("{}", headline);
    if let Some(error) = &state.last_error {
        println!("Last error: {}", error);
    }
    println!(
        "Last sync: {}",
        snapshot
            .last_sync
            .map_or_else(|| "never".to_string(), |t| t.to_rfc3339())
    );
    if snapshot.sample {
        println!("{}", "Showing sample data (no cache yet)".yellow());
    }
    for domain in SyncDomain::ALL {
        println!("  {:<14} {}", domain.to_string(), snapshot.count(domain));
    }
    Ok(())
}

pub async fn test_servers(sync: &FieldSync, json: bool) -> Result<()> {
    let results = sync.resolver.test_all_servers().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Server", "Endpoint", "Status", "Latency", "Detail"]);

    for result in &results {
        let status = if result.available {
            Cell::new("Available").fg(Color::Green)
        } else {
            Cell::new("Unavailable").fg(Color::Red)
        };
        table.add_row(vec![
            Cell::new(&result.candidate.name),
            Cell::new(result.candidate.base_url()),
            status,
            Cell::new(format!("{}ms", result.latency_ms)),
            Cell::new(result.detail.as_deref().unwrap_or("-")),
        ]);
    }

    println!("{table}");
    let available = results.iter().filter(|r| r.available).count();
    println!("\n{} of {} servers available", available, results.len());
    Ok(())
}

pub async fn refresh(sync: &FieldSync, domain: Option<SyncDomain>, json: bool) -> Result<()> {
    let records = match domain {
        Some(domain) => vec![sync.orchestrator.refresh_domain(domain).await],
        None => {
            let report = sync.orchestrator.refresh().await;
            if let Some(error) = &report.connection_error {
                if json {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else {
                    println!("{} {}", "✗".red(), error);
                    println!("{}", sync.resolver.state().message);
                }
                return Ok(());
            }
            report.records
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Domain", "Seq", "Result", "Items"]);
    for record in &records {
        table.add_row(vec![
            Cell::new(record.domain),
            Cell::new(record.sequence_number),
            outcome_cell(record),
            Cell::new(record.item_count),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn outcome_cell(record: &SyncRecord) -> Cell {
    match (&record.error, record.applied) {
        (Some(error), _) => Cell::new(error).fg(Color::Red),
        (None, true) => Cell::new("Applied").fg(Color::Green),
        (None, false) => Cell::new("Stale, discarded").fg(Color::Yellow),
    }
}

pub fn list(sync: &FieldSync, domain: SyncDomain, json: bool) -> Result<()> {
    let entities = sync.store.entities(domain);

    if json {
        println!("{}", serde_json::to_string_pretty(&entities)?);
        return Ok(());
    }

    if entities.is_empty() {
        println!("{}", format!("No {} stored.", domain).yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    match domain {
        SyncDomain::Contacts => table.set_header(vec!["Id", "Address", "City", "Owner", "Fiber", "Source"]),
        SyncDomain::Incidents => table.set_header(vec!["Id", "Address", "Kind", "Assigned", "Status", "Source"]),
        SyncDomain::Analytics => table.set_header(vec!["Total", "Fiber", "Recent", "Conversion", "Top cities"]),
        SyncDomain::RollingSales => table.set_header(vec!["Week", "Sales", "Revenue"]),
    };

    let snapshot = sync.store.snapshot();
    for entity in &entities {
        table.add_row(row(entity, |id| {
            snapshot.salespeople.get(&id).map(|p| p.name.clone())
        }));
    }

    println!("{table}");
    if snapshot.sample {
        println!("{}", "Sample data, run `fieldsync refresh` to sync.".yellow());
    }
    Ok(())
}

fn row(entity: &Entity, salesperson: impl Fn(i64) -> Option<String>) -> Vec<Cell> {
    let source = format!("{:?}", entity.source);
    match &entity.body {
        EntityBody::Contact(c) => vec![
            Cell::new(&entity.id),
            Cell::new(&c.address),
            Cell::new(&c.city),
            Cell::new(&c.owner_name),
            Cell::new(if c.fiber_available { "yes" } else { "no" }),
            Cell::new(source),
        ],
        EntityBody::Incident(i) => vec![
            Cell::new(&entity.id),
            Cell::new(&i.address),
            Cell::new(&i.kind),
            Cell::new(
                i.assigned_salesperson_id
                    .and_then(&salesperson)
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(&i.status),
            Cell::new(source),
        ],
        EntityBody::Analytics(a) => vec![
            Cell::new(a.total_contacts),
            Cell::new(a.fiber_contacts),
            Cell::new(a.recent_contacts),
            Cell::new(format!("{:.1}%", a.conversion_rate)),
            Cell::new(
                a.top_cities
                    .iter()
                    .map(|c| format!("{} ({})", c.city, c.count))
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
        ],
        EntityBody::RollingSales(w) => vec![
            Cell::new(&w.week),
            Cell::new(w.sales),
            Cell::new(format!("${:.2}", w.revenue)),
        ],
    }
}

pub async fn add_contact(sync: &FieldSync, contact: NewContact) -> Result<()> {
    match sync.orchestrator.create_contact(contact).await {
        Ok(entity) => {
            println!("{} Contact created: {}", "✓".green(), entity.id.green());
            Ok(())
        }
        Err(kind) => anyhow::bail!("Contact not created: {}", kind),
    }
}

pub async fn clear_cache(sync: &FieldSync) -> Result<()> {
    sync.orchestrator.clear_cache().await?;
    println!("{} Local cache cleared", "✓".green());
    Ok(())
}
