use clap::{Parser, Subcommand};
use perisentez_core::{
    constants::DISPLAY_DATE_FORMAT, credentials::CredentialStore, records::RecordService,
    reference::ReferenceData, scoring::assess, scoring::PatientObservation,
    validation::validate_observation, CoreConfig, Username, DEFAULT_DATA_DIR,
};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "perisentez")]
#[command(about = "Perisentez prenatal syndrome risk CLI")]
struct Cli {
    /// Data directory (defaults to PERISENTEZ_DATA_DIR, then perisentez_data)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the structural findings the scorer recognises
    Findings,
    /// Score an observation against every syndrome profile
    Assess {
        /// Gestational week (10-40)
        #[arg(long)]
        week: u32,
        /// Nuchal translucency in mm
        #[arg(long)]
        nt: f64,
        /// Femur length in mm
        #[arg(long)]
        fl: f64,
        /// Free beta-hCG in MoM
        #[arg(long)]
        bhcg: f64,
        /// PAPP-A in MoM
        #[arg(long)]
        pappa: f64,
        /// Selected structural finding (repeatable)
        #[arg(long = "finding")]
        findings: Vec<String>,
        /// Also show syndromes that scored zero
        #[arg(long)]
        all: bool,
    },
    /// Register a clinician account
    Register {
        username: String,
        #[arg(long)]
        password: String,
        /// Defaults to --password
        #[arg(long)]
        confirm_password: Option<String>,
    },
    /// List a clinician's saved patient records
    Records {
        username: String,
        /// Case-insensitive patient name filter
        #[arg(long)]
        search: Option<String>,
    },
}

fn core_config(data_dir: Option<PathBuf>) -> anyhow::Result<CoreConfig> {
    let data_dir = data_dir.unwrap_or_else(|| {
        std::env::var("PERISENTEZ_DATA_DIR")
            .unwrap_or_else(|_| DEFAULT_DATA_DIR.into())
            .into()
    });
    Ok(CoreConfig::new(data_dir, None)?)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("perisentez=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Findings => {
            for finding in ReferenceData::builtin().vocabulary() {
                println!("{finding}");
            }
        }
        Commands::Assess {
            week,
            nt,
            fl,
            bhcg,
            pappa,
            findings,
            all,
        } => {
            let reference = ReferenceData::builtin();
            for label in &findings {
                if !reference.is_known_finding(label) {
                    eprintln!("Warning: unknown finding '{label}' will not match any syndrome");
                }
            }
            let observation = PatientObservation {
                gestational_week: week,
                nt_mm: nt,
                fl_mm: fl,
                bhcg_mom: bhcg,
                pappa_mom: pappa,
                findings: findings.into_iter().collect::<BTreeSet<_>>(),
            };
            validate_observation(&observation)?;

            let scores: Vec<_> = assess(&reference, &observation)
                .into_iter()
                .filter(|s| all || s.is_reportable())
                .collect();
            if scores.is_empty() {
                println!("No syndrome matched the observation.");
            }
            for s in scores {
                println!(
                    "{}: %{:.2} ({}/{})",
                    s.syndrome, s.percentage, s.raw_points, s.max_points
                );
                for item in &s.contributing {
                    println!("  - {item}");
                }
            }
        }
        Commands::Register {
            username,
            password,
            confirm_password,
        } => {
            let cfg = core_config(cli.data_dir)?;
            let confirm = confirm_password.unwrap_or_else(|| password.clone());
            let username = CredentialStore::new(&cfg).register(&username, &password, &confirm)?;
            println!("Registered clinician: {username}");
        }
        Commands::Records { username, search } => {
            let cfg = Arc::new(core_config(cli.data_dir)?);
            let username = Username::parse(&username)?;
            let records = RecordService::new(cfg).search(&username, search.as_deref().unwrap_or(""));
            if records.is_empty() {
                println!("No records found.");
            }
            for r in records {
                println!(
                    "ID: {}, Patient: {}, Date: {}, Prediction: {} (%{:.2})",
                    r.id,
                    r.patient_name,
                    r.created_at.format(DISPLAY_DATE_FORMAT),
                    r.predicted_syndrome,
                    r.probability_percent
                );
            }
        }
    }

    Ok(())
}
