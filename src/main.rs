use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use benefit_portal::applicants::AnswerSummaryRow;
use benefit_portal::applications::{
    application_router, AnswerUpdate, ApplicationService, ProgressView, SubmissionReceipt,
    Submitter,
};
use benefit_portal::config::AppConfig;
use benefit_portal::error::AppError;
use benefit_portal::infra::{
    InMemoryApplicationRepository, InMemoryTiRepository, RecordingEventPublisher,
};
use benefit_portal::intermediaries::{ti_router, TiService, TrustedIntermediaryGroup};
use benefit_portal::programs::{standard_program, ProgramRegistry};
use benefit_portal::questions::{Scalar, ScalarValue, ServiceAreaInclusion, ServiceAreaState};
use benefit_portal::telemetry;
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Benefit Portal",
    about = "Run the benefits application portal service or demo an intake end to end",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Walk a sample applicant through the standard program from the terminal
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args, Debug)]
struct DemoArgs {
    /// Evaluation date for predicates (defaults to today, YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    today: Option<NaiveDate>,
    /// Sample monthly income in cents; the program caps eligibility at 350000
    #[arg(long, default_value_t = 250_000)]
    income_cents: i64,
    /// Answer the veteran screening question with "yes"
    #[arg(long)]
    veteran: bool,
    /// Include the full review summary in the output
    #[arg(long)]
    list_answers: bool,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Demo(args) => run_demo(args),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

fn portal_registry() -> Result<Arc<ProgramRegistry>, AppError> {
    let mut registry = ProgramRegistry::default();
    let program_id = standard_program().id;
    registry
        .insert_draft(standard_program())
        .map_err(|err| AppError::Demo(err.to_string()))?;
    registry
        .publish(program_id)
        .map_err(|err| AppError::Demo(err.to_string()))?;
    Ok(Arc::new(registry))
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let registry = portal_registry()?;
    let repository = Arc::new(InMemoryApplicationRepository::default());
    let events = Arc::new(RecordingEventPublisher::default());
    let application_service = Arc::new(ApplicationService::new(registry, repository, events));

    let ti_repository = Arc::new(InMemoryTiRepository::default());
    ti_repository.add_group(TrustedIntermediaryGroup {
        id: 1,
        name: "Community Action Partnership".to_string(),
        description: "Regional assistance organization applying on behalf of clients".to_string(),
        members: Vec::new(),
    });
    let ti_service = Arc::new(TiService::new(ti_repository));

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(application_router(application_service))
        .merge(ti_router(ti_service))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "benefit portal ready");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

struct DemoOutcome {
    progress_log: Vec<String>,
    final_progress: ProgressView,
    receipt: SubmissionReceipt,
    summary: Vec<AnswerSummaryRow>,
}

fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let outcome = demo_walkthrough(today, args.income_cents, args.veteran)?;

    println!("Benefit portal intake demo");
    println!("Evaluation date: {today}");
    println!();
    for line in &outcome.progress_log {
        println!("{line}");
    }

    println!();
    println!(
        "Progress before submission: {}% across {} visible screens",
        outcome.final_progress.completion_percent, outcome.final_progress.active_block_count
    );
    println!(
        "Submitted application {} ({})",
        outcome.receipt.application_id.0,
        if outcome.receipt.eligible {
            "meets eligibility criteria"
        } else {
            "does not meet eligibility criteria"
        }
    );
    println!("Confirmation: {}", outcome.receipt.confirmation_message);

    if args.list_answers {
        println!();
        println!("Review summary");
        for row in &outcome.summary {
            let entity = row
                .entity_name
                .as_ref()
                .map(|name| format!(" [{name}]"))
                .unwrap_or_default();
            let answer = if row.answer_text.is_empty() {
                "(blank)"
            } else {
                &row.answer_text
            };
            let eligibility = if row.is_eligible {
                ""
            } else {
                " (may not qualify)"
            };
            println!("- {}{}: {}{}", row.question_text, entity, answer, eligibility);
        }
    }

    Ok(())
}

/// Drive the whole stack the way the HTTP handlers do, screen by screen.
fn demo_walkthrough(
    today: NaiveDate,
    income_cents: i64,
    veteran: bool,
) -> Result<DemoOutcome, AppError> {
    const APPLICANT_ID: u64 = 1;

    let registry = portal_registry()?;
    let program_id = standard_program().id;
    let repository = Arc::new(InMemoryApplicationRepository::default());
    let events = Arc::new(RecordingEventPublisher::default());
    let service = ApplicationService::new(registry, repository, events);

    let noon = today
        .and_hms_opt(12, 0, 0)
        .ok_or_else(|| AppError::Demo(format!("cannot build a timestamp for {today}")))?;
    let now: DateTime<Utc> = Utc.from_utc_datetime(&noon);

    let mut progress_log = Vec::new();
    let mut answer_block = |block_id: &str, updates: Vec<AnswerUpdate>| -> Result<(), AppError> {
        let outcome = service
            .update_block_answers(APPLICANT_ID, program_id, block_id, updates, now)
            .map_err(|err| AppError::Demo(err.to_string()))?;
        if let Some(problem) = outcome.errors.first() {
            return Err(AppError::Demo(format!(
                "screen {block_id} rejected question {}: {}",
                problem.question_id, problem.message
            )));
        }
        progress_log.push(match &outcome.next_block_id {
            Some(next) => format!(
                "Saved screen {block_id}, next screen {next} ({}% complete)",
                outcome.completion_percent
            ),
            None => format!(
                "Saved screen {block_id} ({}% complete)",
                outcome.completion_percent
            ),
        });
        Ok(())
    };

    answer_block(
        "1",
        vec![
            answers(
                1,
                vec![
                    (Scalar::FirstName, ScalarValue::Text("Ana".to_string())),
                    (Scalar::LastName, ScalarValue::Text("Silva".to_string())),
                ],
            ),
            answers(
                2,
                vec![(Scalar::Date, ScalarValue::Date(demo_date(1988, 3, 2)?))],
            ),
        ],
    )?;
    answer_block(
        "2",
        vec![
            answers(3, vec![(Scalar::Number, ScalarValue::Long(3))]),
            answers(
                4,
                vec![(
                    Scalar::Selection,
                    ScalarValue::Text(if veteran { "yes" } else { "no" }.to_string()),
                )],
            ),
        ],
    )?;
    answer_block(
        "3",
        vec![answers(
            5,
            vec![(Scalar::CurrencyCents, ScalarValue::Long(income_cents))],
        )],
    )?;
    if veteran {
        answer_block(
            "4",
            vec![answers(
                11,
                vec![(Scalar::Text, ScalarValue::Text("Army".to_string()))],
            )],
        )?;
    }
    answer_block(
        "5",
        vec![answers(
            6,
            vec![
                (Scalar::Street, ScalarValue::Text("100 Main St".to_string())),
                (Scalar::City, ScalarValue::Text("Springfield".to_string())),
                (Scalar::State, ScalarValue::Text("WA".to_string())),
                (Scalar::Zip, ScalarValue::Text("98101".to_string())),
                (
                    Scalar::ServiceAreas,
                    ScalarValue::ServiceAreas(vec![ServiceAreaInclusion {
                        area_id: "metro_county".to_string(),
                        state: ServiceAreaState::InArea,
                        timestamp: now.timestamp(),
                    }]),
                ),
            ],
        )],
    )?;
    answer_block(
        "6",
        vec![answers(
            10,
            vec![(
                Scalar::Selections,
                ScalarValue::List(vec!["electric".to_string(), "water".to_string()]),
            )],
        )],
    )?;
    answer_block(
        "7",
        vec![answers(
            7,
            vec![(
                Scalar::EntityName,
                ScalarValue::List(vec!["Luis".to_string(), "Mia".to_string()]),
            )],
        )],
    )?;
    for (index, (relationship, year)) in [("Son", 2010), ("Daughter", 2014)].iter().enumerate() {
        answer_block(
            &format!("8-{index}"),
            vec![
                answers(
                    8,
                    vec![(Scalar::Text, ScalarValue::Text(relationship.to_string()))],
                ),
                answers(
                    9,
                    vec![(Scalar::Date, ScalarValue::Date(demo_date(*year, 1, 5)?))],
                ),
            ],
        )?;
    }

    let final_progress = service
        .progress(APPLICANT_ID, program_id, now)
        .map_err(|err| AppError::Demo(err.to_string()))?;
    let summary = service
        .summary(APPLICANT_ID, program_id, now)
        .map_err(|err| AppError::Demo(err.to_string()))?;
    let receipt = service
        .submit(APPLICANT_ID, program_id, Submitter::Applicant, now)
        .map_err(|err| AppError::Demo(err.to_string()))?;

    Ok(DemoOutcome {
        progress_log,
        final_progress,
        receipt,
        summary,
    })
}

fn answers(question_id: u64, pairs: Vec<(Scalar, ScalarValue)>) -> AnswerUpdate {
    let mut scalars = BTreeMap::new();
    for (scalar, value) in pairs {
        scalars.insert(scalar, value);
    }
    AnswerUpdate {
        question_id,
        scalars,
    }
}

fn demo_date(year: i32, month: u32, day: u32) -> Result<NaiveDate, AppError> {
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| AppError::Demo(format!("invalid date {year}-{month:02}-{day:02}")))
}
