use clap::{Parser, Subcommand};
use intake_core::{
    intake::patient_intake_schema, CoreConfig, DraftKey, FieldPath, FileDraftStore, FormSession,
    RecordService,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "intake")]
#[command(about = "Intake multi-step form CLI")]
struct Cli {
    /// Data directory for drafts and records
    #[arg(long, env = "INTAKE_DATA_DIR", default_value = intake_core::constants::DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current state of a form
    Show {
        /// Form key
        key: String,
    },
    /// Set a field on a form
    Set {
        /// Form key
        key: String,
        /// Dotted field path (e.g. emergencyContact.phone)
        path: String,
        /// Field value (JSON, or plain text)
        value: String,
    },
    /// Advance to the next section
    Next {
        /// Form key
        key: String,
    },
    /// Go back one section
    Back {
        /// Form key
        key: String,
    },
    /// Clear a form and start over
    Reset {
        /// Form key
        key: String,
    },
    /// Submit a completed form
    Submit {
        /// Form key
        key: String,
    },
    /// List all submitted records
    ListRecords,
}

fn open_session(cfg: &CoreConfig, key: &str) -> Result<FormSession<FileDraftStore>, Box<dyn std::error::Error>> {
    let key = DraftKey::new(key)?;
    let schema = Arc::new(patient_intake_schema()?);
    let store = FileDraftStore::new(cfg);
    Ok(FormSession::new(store, schema, key))
}

fn print_state(session: &FormSession<FileDraftStore>) {
    let section = session.current_section();
    println!(
        "Section {}/{}: {} ({}%)",
        section.index() + 1,
        session.schema().section_count(),
        section.title(),
        session.progress()
    );
    match serde_json::to_string_pretty(session.data()) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error rendering form data: {}", e),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let cfg = CoreConfig::new(cli.data_dir)?;

    match cli.command {
        Some(Commands::Show { key }) => {
            let session = open_session(&cfg, &key)?;
            print_state(&session);
        }
        Some(Commands::Set { key, path, value }) => {
            let mut session = open_session(&cfg, &key)?;
            let path = FieldPath::new(&path)?;
            // Accept JSON values; anything that does not parse is a string.
            let value = serde_json::from_str(&value)
                .unwrap_or_else(|_| serde_json::Value::String(value));
            match session.update_field(&path, value) {
                Ok(()) => println!("Set {} on form '{}'", path, key),
                Err(e) => eprintln!("Error setting field: {}", e),
            }
        }
        Some(Commands::Next { key }) => {
            let mut session = open_session(&cfg, &key)?;
            match session.next() {
                Ok(outcome) if outcome.ok() => print_state(&session),
                Ok(outcome) => {
                    eprintln!("Cannot continue:");
                    for error in outcome.errors() {
                        eprintln!("  - {}", error);
                    }
                }
                Err(e) => eprintln!("Error advancing form: {}", e),
            }
        }
        Some(Commands::Back { key }) => {
            let mut session = open_session(&cfg, &key)?;
            match session.previous() {
                Ok(()) => print_state(&session),
                Err(e) => eprintln!("Error going back: {}", e),
            }
        }
        Some(Commands::Reset { key }) => {
            let mut session = open_session(&cfg, &key)?;
            session.reset();
            println!("Reset form '{}'", key);
        }
        Some(Commands::Submit { key }) => {
            let mut session = open_session(&cfg, &key)?;
            let records = RecordService::new(&cfg, session.schema().slug());
            match session.submit(&records).await {
                Ok(record) => println!("Submitted form '{}' as record {}", key, record.id),
                Err(e) => eprintln!("Error submitting form: {}", e),
            }
        }
        Some(Commands::ListRecords) => {
            let records = RecordService::new(&cfg, "patient-intake");
            let listed = records.list_records()?;
            if listed.is_empty() {
                println!("No records found.");
            } else {
                for record in listed {
                    println!(
                        "ID: {}, Schema: {}, Submitted: {}",
                        record.id, record.schema, record.submitted_at
                    );
                }
            }
        }
        None => {
            println!("Use 'intake --help' for commands");
        }
    }

    Ok(())
}
