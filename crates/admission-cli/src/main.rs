//! `admission` command line front end

use admission_core::notifier::format_brl;
use admission_core::{
    AdmissionConfig, AdmissionForm, AdmissionRequest, AdmissionWorkflow, NotificationStatus,
    Resolution, SubmissionOutcome,
};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "admission.toml";

/// Exit status of a rejected submission or unauthorized e-mail
const EXIT_REJECTED: u8 = 2;

fn cli() -> Command {
    Command::new("admission")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Manager-authorized admission requests")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Configuration file (defaults to ./admission.toml when present)"),
        )
        .subcommand(
            Command::new("submit")
                .about("Submit an admission request")
                .arg(
                    Arg::new("manager-email")
                        .long("manager-email")
                        .required(true)
                        .help("E-mail of the requesting manager"),
                )
                .arg(
                    Arg::new("employee-name")
                        .long("employee-name")
                        .required(true)
                        .help("Full name of the new hire"),
                )
                .arg(
                    Arg::new("employee-email")
                        .long("employee-email")
                        .required(true)
                        .help("E-mail of the new hire"),
                )
                .arg(
                    Arg::new("job-title")
                        .long("job-title")
                        .required(true)
                        .help("Position title"),
                )
                .arg(
                    Arg::new("salary")
                        .long("salary")
                        .required(true)
                        .allow_hyphen_values(true)
                        .value_parser(parse_salary)
                        .help("Monthly salary, e.g. 4500.00 or 4.500,00"),
                )
                .arg(
                    Arg::new("admission-date")
                        .long("admission-date")
                        .required(true)
                        .value_parser(parse_date)
                        .help("Start date, YYYY-MM-DD or DD/MM/YYYY"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output the outcome as JSON"),
                ),
        )
        .subcommand(
            Command::new("resolve")
                .about("Check whether a manager e-mail is authorized")
                .arg(Arg::new("email").required(true).help("Manager e-mail")),
        )
        .subcommand(Command::new("next-id").about("Preview the next protocol ID"))
        .subcommand(
            Command::new("records").about("List stored requests").arg(
                Arg::new("json")
                    .long("json")
                    .action(ArgAction::SetTrue)
                    .help("Output as JSON"),
            ),
        )
}

/// Parse a salary in either `1234.56` or `1.234,56` notation
fn parse_salary(raw: &str) -> Result<Decimal, String> {
    let text = raw.trim().trim_start_matches("R$").trim();
    let normalized = if text.contains(',') || is_grouped_thousands(text) {
        text.replace('.', "").replace(',', ".")
    } else {
        text.to_string()
    };
    Decimal::from_str(&normalized).map_err(|e| format!("invalid salary '{raw}': {e}"))
}

/// `1.234` or `1.500.000`: dots separate groups of three digits
fn is_grouped_thousands(text: &str) -> bool {
    let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    let mut groups = text.strip_prefix('-').unwrap_or(text).split('.');
    let lead_ok = groups
        .next()
        .is_some_and(|lead| (1..=3).contains(&lead.len()) && digits(lead));
    let rest: Vec<&str> = groups.collect();
    lead_ok && !rest.is_empty() && rest.iter().all(|g| g.len() == 3 && digits(g))
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    let text = raw.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(text, "%d/%m/%Y"))
        .map_err(|_| format!("invalid date '{raw}': expected YYYY-MM-DD or DD/MM/YYYY"))
}

fn load_config(explicit: Option<&PathBuf>) -> Result<AdmissionConfig> {
    match explicit {
        Some(path) => AdmissionConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => {
            let path = Path::new(DEFAULT_CONFIG);
            if path.exists() {
                AdmissionConfig::load(path)
                    .with_context(|| format!("failed to load config {}", path.display()))
            } else {
                tracing::debug!("no {DEFAULT_CONFIG} found; using defaults");
                Ok(AdmissionConfig::default())
            }
        }
    }
}

fn form_from(args: &ArgMatches) -> Result<AdmissionForm> {
    let text = |name: &str| {
        args.get_one::<String>(name)
            .cloned()
            .with_context(|| format!("missing --{name}"))
    };
    Ok(AdmissionForm {
        manager_email: text("manager-email")?,
        employee_name: text("employee-name")?,
        employee_email: text("employee-email")?,
        job_title: text("job-title")?,
        monthly_salary: *args
            .get_one::<Decimal>("salary")
            .context("missing --salary")?,
        admission_date: *args
            .get_one::<NaiveDate>("admission-date")
            .context("missing --admission-date")?,
    })
}

async fn submit(workflow: &AdmissionWorkflow, args: &ArgMatches) -> Result<ExitCode> {
    let form = form_from(args)?;
    let outcome = workflow.submit(&form).await.context("submission failed")?;

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }

    match outcome {
        SubmissionOutcome::Created(receipt) => {
            if !args.get_flag("json") {
                println!("Solicitação registrada: {}", receipt.protocol_id);
                if let NotificationStatus::Failed(reason) = &receipt.notification {
                    println!("Aviso: notificação não enviada ({reason})");
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        SubmissionOutcome::Rejected(rejection) => {
            if !args.get_flag("json") {
                eprintln!("Solicitação recusada: {rejection}");
            }
            Ok(ExitCode::from(EXIT_REJECTED))
        }
    }
}

async fn resolve(workflow: &AdmissionWorkflow, args: &ArgMatches) -> Result<ExitCode> {
    let email = args.get_one::<String>("email").context("missing e-mail")?;
    match workflow.resolver().resolve(email).await? {
        Resolution::Authorized(profile) => {
            println!("{} <{}>", profile.display_name, profile.email);
            println!("{} ({})", profile.employer_name, profile.employer_tax_id);
            Ok(ExitCode::SUCCESS)
        }
        Resolution::Unauthorized => {
            eprintln!("{} is not an authorized manager", email.trim());
            Ok(ExitCode::from(EXIT_REJECTED))
        }
    }
}

fn record_line(request: &AdmissionRequest) -> String {
    format!(
        "{}  {}  {}  {}  {}  {}",
        request.protocol_id,
        request.submitted_at.format("%d/%m/%Y %H:%M"),
        request.employer_name,
        request.employee_name,
        request.job_title,
        format_brl(request.monthly_salary),
    )
}

async fn records(workflow: &AdmissionWorkflow, args: &ArgMatches) -> Result<ExitCode> {
    let records = workflow.store().records().await?;
    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else if records.is_empty() {
        println!("No requests stored");
    } else {
        for request in &records {
            println!("{}", record_line(request));
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn run(matches: ArgMatches) -> Result<ExitCode> {
    let config = load_config(matches.get_one::<PathBuf>("config"))?;
    let workflow = config
        .build_workflow()
        .await
        .context("failed to set up admission workflow")?;

    let code = match matches.subcommand() {
        Some(("submit", args)) => submit(&workflow, args).await?,
        Some(("resolve", args)) => resolve(&workflow, args).await?,
        Some(("next-id", _)) => {
            println!("{}", workflow.next_id().await?);
            ExitCode::SUCCESS
        }
        Some(("records", args)) => records(&workflow, args).await?,
        _ => anyhow::bail!("unknown command"),
    };

    workflow.close().await?;
    Ok(code)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli().get_matches()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn salary_notations() {
        assert_eq!(parse_salary("4500.50").unwrap(), Decimal::new(450_050, 2));
        assert_eq!(parse_salary("4.500,50").unwrap(), Decimal::new(450_050, 2));
        assert_eq!(parse_salary("R$ 1.234,56").unwrap(), Decimal::new(123_456, 2));
        assert_eq!(parse_salary("0").unwrap(), Decimal::ZERO);
        assert!(parse_salary("abc").is_err());
    }

    #[test]
    fn dotted_thousands_without_cents() {
        assert_eq!(parse_salary("R$ 1.234").unwrap(), Decimal::new(1234, 0));
        assert_eq!(parse_salary("1.500.000").unwrap(), Decimal::new(1_500_000, 0));
        assert_eq!(parse_salary("4500.5").unwrap(), Decimal::new(45_005, 1));
        assert_eq!(parse_salary("12.34").unwrap(), Decimal::new(1234, 2));
        assert_eq!(parse_salary("1234.567").unwrap(), Decimal::new(1_234_567, 3));
    }

    #[test]
    fn date_notations() {
        let expected = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        assert_eq!(parse_date("2025-06-02").unwrap(), expected);
        assert_eq!(parse_date("02/06/2025").unwrap(), expected);
        assert!(parse_date("2025-13-01").is_err());
    }

    #[test]
    fn submit_arguments_build_form() {
        let matches = cli()
            .try_get_matches_from([
                "admission",
                "submit",
                "--manager-email",
                "Ana@Example.com",
                "--employee-name",
                "Joana Lima",
                "--employee-email",
                "joana@example.com",
                "--job-title",
                "Analista",
                "--salary",
                "4.500,00",
                "--admission-date",
                "2025-06-02",
            ])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "submit");
        let form = form_from(args).unwrap();
        assert_eq!(form.manager_email, "Ana@Example.com");
        assert_eq!(form.monthly_salary, Decimal::new(4500, 0));
        assert_eq!(form.admission_date, NaiveDate::from_ymd_opt(2025, 6, 2).unwrap());
    }

    #[test]
    fn negative_salary_is_passed_through_for_validation() {
        let matches = cli()
            .try_get_matches_from([
                "admission", "submit", "--manager-email", "a@b.co", "--employee-name", "J",
                "--employee-email", "j@b.co", "--job-title", "T", "--salary", "-10",
                "--admission-date", "2025-06-02",
            ])
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        assert_eq!(form_from(args).unwrap().monthly_salary, Decimal::new(-10, 0));
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(load_config(Some(&path)).is_err());
    }

    #[tokio::test]
    async fn next_id_against_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("admission.toml");
        std::fs::write(
            &config_path,
            "recipient = \"rh@example.com\"\n[notifier]\nkind = \"log\"\n",
        )
        .unwrap();
        let matches = cli()
            .try_get_matches_from(["admission", "--config", config_path.to_str().unwrap(), "next-id"])
            .unwrap();
        run(matches).await.unwrap();
        assert!(dir.path().join("solicitacoes_admissao.csv").exists());
    }
}
