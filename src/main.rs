/// Command-line front end for the doctor schedule.
///
/// Each subcommand maps to one page of the clinic front end: the personal
/// week view (once or auto-refreshing), the offline booking form, and the
/// cancel-shift dialog.
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use easyschedule::availability::{
    book_with_precheck, selectable_doctors, shift_options, BookingError, BookingRequest,
};
use easyschedule::calendar::DATE_FORMAT;
use easyschedule::cancellation::{submit_and_refresh, CancellationFlow, FlowError};
use easyschedule::config::{self, ClientConfig};
use easyschedule::view::RefreshReport;
use easyschedule::{ApiError, AuthSession, AutoRefresh, ClinicClient, Notice, ScheduleView};

#[derive(Parser)]
#[command(name = config::APP_NAME, version = config::APP_VERSION)]
#[command(about = "Doctor shift and appointment schedule")]
struct Cli {
    /// Backend base URL; overrides EASYSCHEDULE_API_URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a doctor's week
    Week {
        /// Doctor id; defaults to the session's doctor
        #[arg(long)]
        doctor: Option<i64>,

        /// Any day of the week to show (YYYY-MM-DD); defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Keep a doctor's current week on screen, refreshing periodically
    Watch {
        #[arg(long)]
        doctor: Option<i64>,
    },

    /// List doctors with open shifts for a specialty on a date
    Doctors {
        #[arg(long)]
        date: NaiveDate,

        #[arg(long)]
        specialty: i64,
    },

    /// Book an offline appointment
    Book {
        #[arg(long)]
        patient: i64,

        #[arg(long)]
        doctor: i64,

        #[arg(long)]
        shift: i64,

        #[arg(long)]
        date: NaiveDate,

        #[arg(long)]
        specialty: i64,

        /// Initial symptoms
        #[arg(long)]
        symptom: Option<String>,
    },

    /// Cancel a shift assignment and reschedule its appointments
    CancelShift {
        #[arg(long)]
        assignment: i64,

        #[arg(long)]
        reason: String,

        /// Doctor whose schedule is re-fetched afterwards
        #[arg(long)]
        doctor: Option<i64>,

        /// Only show what would be rescheduled
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env();
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }
    let session = AuthSession::load(&config);
    let client = Arc::new(
        ClinicClient::new(&config, session).context("Failed to build the HTTP client")?,
    );

    match cli.command {
        Commands::Week { doctor, date } => {
            let doctor_id = resolve_doctor(doctor, &client.session())?;
            show_week(&client, doctor_id, date.unwrap_or_else(today)).await
        }
        Commands::Watch { doctor } => {
            let doctor_id = resolve_doctor(doctor, &client.session())?;
            watch(client, doctor_id, &config).await
        }
        Commands::Doctors { date, specialty } => list_doctors(&client, date, specialty).await,
        Commands::Book {
            patient,
            doctor,
            shift,
            date,
            specialty,
            symptom,
        } => {
            let mut request = BookingRequest::new(patient, doctor, shift, date);
            if let Some(symptom) = symptom {
                request = request.with_symptom(&symptom);
            }
            book(&client, &request, specialty).await
        }
        Commands::CancelShift {
            assignment,
            reason,
            doctor,
            dry_run,
        } => {
            let refetch = refetch_doctor(dry_run, doctor, &client.session())?;
            cancel_shift(&client, assignment, &reason, refetch).await
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn resolve_doctor(explicit: Option<i64>, session: &AuthSession) -> Result<i64> {
    match explicit.or_else(|| session.doctor_id()) {
        Some(id) => Ok(id),
        None => bail!("No doctor given; pass --doctor or set EASYSCHEDULE_DOCTOR_ID"),
    }
}

/// Doctor whose week is re-fetched after a cancellation; none for a dry run.
fn refetch_doctor(
    dry_run: bool,
    explicit: Option<i64>,
    session: &AuthSession,
) -> Result<Option<i64>> {
    if dry_run {
        return Ok(None);
    }
    resolve_doctor(explicit, session).map(Some)
}

/// Print the user-facing notice and hand the error on.
fn surface(error: ApiError) -> anyhow::Error {
    print_notice(&error.notice());
    error.into()
}

fn print_notice(notice: &Notice) {
    eprintln!("\n[{:?}] {}", notice.severity, notice);
}

fn print_header(title: &str) {
    println!("\n{}", "=".repeat(60));
    println!("       {}", title);
    println!("{}", "=".repeat(60));
}

fn print_failures(report: &RefreshReport) {
    for failure in &report.failures {
        eprintln!("  {:?} could not be loaded", failure.section);
        print_notice(&failure.error.notice());
    }
}

async fn show_week(client: &ClinicClient, doctor_id: i64, day: NaiveDate) -> Result<()> {
    let view = ScheduleView::new(doctor_id);
    let report = view.refresh(client).await;
    print_failures(&report);

    print_header(&format!("SCHEDULE FOR DOCTOR {}", doctor_id));
    print!("{}", view.week(day));
    Ok(())
}

async fn watch(client: Arc<ClinicClient>, doctor_id: i64, config: &ClientConfig) -> Result<()> {
    let view = Arc::new(ScheduleView::new(doctor_id));
    println!(
        "Refreshing every {} seconds, press Ctrl-C to stop",
        config.poll_interval_secs
    );

    let handle = AutoRefresh::spawn(view, client, config.poll_interval(), move |view, report| {
        print_failures(&report);
        if report.applied {
            print_header(&format!(
                "SCHEDULE FOR DOCTOR {} (refresh #{})",
                doctor_id, report.generation
            ));
            print!("{}", view.week(today()));
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    handle.stop().await;
    println!("\nStopped");
    Ok(())
}

async fn list_doctors(client: &ClinicClient, date: NaiveDate, specialty: i64) -> Result<()> {
    let date = date.format(DATE_FORMAT).to_string();
    let doctors = client
        .doctor_availability(&date, specialty)
        .await
        .map_err(surface)?;
    let doctors = selectable_doctors(doctors);

    if doctors.is_empty() {
        println!("\nNo doctor has an open shift on {}", date);
        return Ok(());
    }

    println!("\n--- Doctors on {} ({}) ---", date, doctors.len());
    for doctor in &doctors {
        println!("\n{} (ID {}):", doctor.doctor_name, doctor.doctor_id);
        for option in shift_options(doctor) {
            if option.disabled {
                println!("  [{}] {}  full", option.shift_id, option.label);
            } else {
                println!(
                    "  [{}] {}  {} slots left",
                    option.shift_id, option.label, option.remaining
                );
            }
        }
    }
    Ok(())
}

async fn book(client: &ClinicClient, request: &BookingRequest, specialty: i64) -> Result<()> {
    match book_with_precheck(client, request, specialty).await {
        Ok(confirmation) => {
            let queue = confirmation
                .slot_number
                .map(|slot| format!("Queue number {}", slot))
                .unwrap_or_else(|| "Appointment created".to_string());
            print_notice(&Notice::info("Booking confirmed", &queue));
            Ok(())
        }
        Err(BookingError::Precheck(error)) => {
            eprintln!("\nBooking not sent: {}", error);
            Err(error.into())
        }
        Err(BookingError::Api(error)) => Err(surface(error)),
    }
}

async fn cancel_shift(
    client: &ClinicClient,
    assignment_id: i64,
    reason: &str,
    refetch: Option<i64>,
) -> Result<()> {
    let mut flow = CancellationFlow::new(assignment_id);
    let preview = flow.load_preview(client).await.map_err(flow_failure)?;

    println!("\n--- Cancel Shift {} ---", assignment_id);
    println!("  Affected appointments: {}", preview.affected_appointments);
    println!(
        "  Replacement doctor: {}",
        if preview.has_replacement_doctor { "yes" } else { "no" }
    );
    println!(
        "  Automatic reschedule: {}",
        if preview.can_auto_reschedule { "yes" } else { "no" }
    );
    if let Some(warning) = &preview.warning {
        println!("  Warning: {}", warning);
    }
    let Some(doctor_id) = refetch else {
        return Ok(());
    };

    flow.confirm(reason).map_err(flow_failure)?;
    let view = ScheduleView::new(doctor_id);
    let (summary, report) = submit_and_refresh(&mut flow, &view, client)
        .await
        .map_err(flow_failure)?;

    println!("\n--- Reschedule Results ---");
    println!("  Total appointments: {}", summary.total_appointments);
    println!("  Rescheduled: {}", summary.rescheduled_count);
    println!("  Failed: {}", summary.failed_count);
    println!("  Success rate: {:.1}%", summary.success_rate());

    print_failures(&report);
    print!("{}", view.week(today()));
    Ok(())
}

fn flow_failure(error: FlowError) -> anyhow::Error {
    match error {
        FlowError::Api(error) => surface(error),
        other => other.into(),
    }
}
