use crate::infra::{InMemoryNotifier, InMemoryReviewRepository};
use chrono::Utc;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use ticket_review::error::AppError;
use ticket_review::workflows::review::risk::{score_components, RiskComponent};
use ticket_review::workflows::review::{
    parse_webhook_url, ItemView, NewItem, Principal, ReconcileSummary, ReviewError,
    ReviewService, ReviewSettings, RiskAssessment, RiskCategory, TicketCsvImporter, TicketFilter,
    TransitionRequest,
};

type DemoService = ReviewService<InMemoryReviewRepository, InMemoryNotifier>;

#[derive(Args, Debug, Default)]
pub(crate) struct ScoreArgs {
    /// Declared fee for the ticket
    #[arg(long)]
    pub(crate) price: Option<f64>,
    /// Ticket tag; repeat for several
    #[arg(long = "tag")]
    pub(crate) tags: Vec<String>,
    /// Print the assessment as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ImportArgs {
    /// CSV export with `title,description,price,tags` columns
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Principal recorded as the creator of every imported ticket
    #[arg(long, default_value = "importer")]
    pub(crate) principal: String,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Fallback webhook recorded for rejections without their own hook
    #[arg(long)]
    pub(crate) fallback_webhook: Option<String>,
}

#[derive(Debug, Serialize)]
struct ScoreReport {
    score: u32,
    category: RiskCategory,
    tags: Vec<String>,
    components: Vec<RiskComponent>,
}

fn score_report(price: Option<f64>, tags: &[String]) -> ScoreReport {
    let assessment = RiskAssessment::evaluate(price, tags);
    ScoreReport {
        score: assessment.score,
        category: assessment.category,
        tags: assessment.tags,
        components: score_components(price, tags),
    }
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let report = score_report(args.price, &args.tags);

    if args.json {
        let rendered = serde_json::to_string_pretty(&report).map_err(|err| {
            AppError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err))
        })?;
        println!("{rendered}");
        return Ok(());
    }

    println!("Risk score {} ({})", report.score, report.category.label());
    for component in &report.components {
        println!("- {:>2} pts  {}", component.score, component.notes);
    }
    if report.tags.is_empty() {
        println!("Tags: (none)");
    } else {
        println!("Tags: {}", report.tags.join(", "));
    }

    Ok(())
}

fn demo_service(settings: ReviewSettings) -> (DemoService, InMemoryNotifier) {
    let notifier = InMemoryNotifier::default();
    let service = ReviewService::new(
        Arc::new(InMemoryReviewRepository::default()),
        Arc::new(notifier.clone()),
        settings,
    );
    (service, notifier)
}

pub(crate) fn run_import(args: ImportArgs) -> Result<(), AppError> {
    let ImportArgs { csv, principal } = args;
    let submissions = TicketCsvImporter::from_path(&csv)?;
    let (service, _) = demo_service(ReviewSettings::default());
    let importer = Principal::new(principal);

    let mut accepted = 0usize;
    let mut rejected = 0usize;
    for (row, submission) in submissions.into_iter().enumerate() {
        match service.submit(Some(&importer), submission) {
            Ok(_) => accepted += 1,
            Err(err) => {
                rejected += 1;
                println!("row {}: skipped ({err})", row + 1);
            }
        }
    }

    let summary = service.reconcile_all()?;
    println!(
        "Imported {accepted} ticket(s) from {} ({rejected} skipped)",
        csv.display()
    );
    render_sweep(&summary);
    render_tickets(&service.list(None, &TicketFilter::all())?);

    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let settings = ReviewSettings {
        fallback_webhook_url: match args.fallback_webhook {
            Some(raw) => parse_webhook_url(&raw).map_err(ReviewError::from)?,
            None => Some("https://hooks.example.com/ticket-rejections".to_string()),
        },
        ..ReviewSettings::default()
    };
    let (service, notifier) = demo_service(settings);

    let requester = Principal::new("req-17").with_name("Casey Lin");
    let reviewer = Principal::new("rev-02")
        .with_name("Morgan Diaz")
        .with_email("morgan@example.com");

    println!("Ticket review demo");
    let chargeback = service.submit(
        Some(&requester),
        NewItem {
            title: "Chargeback dispute".to_string(),
            description: "Card issuer reversed a 5,400 payment".to_string(),
            amount: Some(5400.0),
            tags: vec!["Billing".to_string()],
        },
    )?;
    service.submit(
        Some(&requester),
        NewItem {
            title: "Broken export button".to_string(),
            description: "CSV export returns an empty file".to_string(),
            amount: Some(1200.0),
            tags: vec!["Bug Report".to_string()],
        },
    )?;
    service.submit(
        Some(&requester),
        NewItem {
            title: "Logo alignment".to_string(),
            description: "Header logo is off by a few pixels".to_string(),
            amount: None,
            tags: vec!["ui".to_string()],
        },
    )?;
    render_tickets(&service.list(Some(&requester.id), &TicketFilter::default())?);

    println!("\nReviewer moves the chargeback through triage");
    service.transition(
        &chargeback.id,
        Some(&reviewer),
        TransitionRequest::status("pending").with_note("requested issuer statement"),
    )?;
    let rejected = service.transition(
        &chargeback.id,
        Some(&reviewer),
        TransitionRequest::status("Rejected").with_note("outside dispute window"),
    )?;
    println!(
        "- {} -> {} (notification: {:?})",
        rejected.previous_status, rejected.item.status, rejected.notification
    );

    for delivery in notifier.deliveries() {
        let body = serde_json::to_string(&delivery.event).map_err(|err| {
            AppError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err))
        })?;
        println!("- webhook queued for {}: {body}", delivery.url);
    }

    println!("\nAudit feed");
    for entry in service.audit_feed(None)? {
        println!(
            "- {} | {} | {} | {} -> {}",
            entry.created_at,
            entry.user,
            entry.action,
            entry.old_value.as_deref().unwrap_or("-"),
            entry.new_value.as_deref().unwrap_or("-"),
        );
    }

    println!("\nHigh-risk sweep at {}", Utc::now().format("%Y-%m-%d %H:%M:%S"));
    render_sweep(&service.reconcile_all()?);

    Ok(())
}

fn render_sweep(summary: &ReconcileSummary) {
    println!(
        "- scanned {} | updated {} | failed {}",
        summary.scanned, summary.updated, summary.failed
    );
}

fn render_tickets(tickets: &[ItemView]) {
    for ticket in tickets {
        let tags = if ticket.tags.is_empty() {
            "-".to_string()
        } else {
            ticket.tags.join(", ")
        };
        println!(
            "- [{}] {} | {} risk ({}) | fee {:.2} | tags {}",
            ticket.status,
            ticket.title,
            ticket.risk.label(),
            ticket.risk_score,
            ticket.price,
            tags
        );
    }
}
