//! Output formatting utilities

use charter_chain::LogEntry;
use charter_deployer::Deployment;
use charter_types::Address;
use colored::*;
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed table format
    #[default]
    Table,
    /// JSON format
    Json,
}

/// One named address of a deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
pub struct AddressRow {
    #[tabled(rename = "Component")]
    pub name: String,
    #[tabled(rename = "Address")]
    pub address: Address,
}

/// One log entry emitted during the run
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct EventRow {
    #[tabled(rename = "Block")]
    pub block: u64,
    #[tabled(rename = "Emitter")]
    pub emitter: Address,
    #[tabled(rename = "Event")]
    pub event: String,
}

#[derive(Serialize)]
struct Report<'a> {
    engine: Address,
    deployment: &'a Deployment,
    #[serde(skip_serializing_if = "Option::is_none")]
    events: Option<&'a [LogEntry]>,
}

/// Engine first, then every component and plugin repository.
pub fn address_rows(engine: Address, deployment: &Deployment) -> Vec<AddressRow> {
    std::iter::once(("engine".to_string(), engine))
        .chain(deployment.addresses())
        .map(|(name, address)| AddressRow { name, address })
        .collect()
}

pub fn event_rows(events: &[LogEntry]) -> anyhow::Result<Vec<EventRow>> {
    events
        .iter()
        .map(|entry| {
            Ok(EventRow {
                block: entry.block,
                emitter: entry.emitter,
                event: serde_json::to_string(&entry.event)?,
            })
        })
        .collect()
}

/// Print the deployment record (and optionally its events) in the specified format
pub fn print_deployment(
    engine: Address,
    deployment: &Deployment,
    events: Option<&[LogEntry]>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let report = Report {
                engine,
                deployment,
                events,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table => {
            println!("{}", Table::new(address_rows(engine, deployment)));
            if let Some(events) = events {
                if events.is_empty() {
                    println!("{}", "No events".dimmed());
                } else {
                    println!("{}", Table::new(event_rows(events)?));
                }
            }
            print_success(&format!(
                "Protocol deployed, management DAO at {}",
                deployment.management_dao
            ));
        }
    }
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use charter_chain::Event;

    #[test]
    fn engine_row_comes_first() {
        let engine = Address::named("engine");
        let deployment = Deployment {
            dao_factory: Address::named("factory"),
            ..Deployment::default()
        };
        let rows = address_rows(engine, &deployment);
        assert_eq!(rows[0].name, "engine");
        assert_eq!(rows[0].address, engine);
        assert_eq!(rows[1].name, "dao_factory");
        assert_eq!(rows.len(), deployment.addresses().len() + 1);
    }

    #[test]
    fn table_lists_every_component() {
        let deployment = Deployment::default();
        let table = Table::new(address_rows(Address::named("engine"), &deployment)).to_string();
        assert!(table.contains("Component"));
        assert!(table.contains("management_dao_multisig"));
    }

    #[test]
    fn events_render_as_json_cells() {
        let engine = Address::named("engine");
        let entries = vec![LogEntry {
            block: 3,
            emitter: engine,
            event: Event::ProtocolDeployed { deployer: engine },
        }];
        let rows = event_rows(&entries).unwrap();
        assert_eq!(rows[0].block, 3);
        assert!(rows[0].event.contains("protocol_deployed"));
    }
}
