use crate::infra::{parse_birth_date, parse_date, InMemoryProfileRepository};
use chrono::{Local, NaiveDate};
use clap::Args;
use std::sync::Arc;
use std::time::Duration;
use tripmate::error::AppError;
use tripmate::onboarding::catalog::{DATE_OF_BIRTH, FIRST_NAME, GENDER, LOCATION};
use tripmate::onboarding::dates::format_birthday_input;
use tripmate::onboarding::{
    AnswerValue, DateOfBirth, Identity, Location, LocationSearch, OnboardingFlows,
    OnboardingService, SearchOutcome, StaticGeocoder, StepKind, Submission, Transition, UserId,
    Wizard, WizardOptions, WizardSession, BASIC_INFO_FLOW, QUESTIONNAIRE_FLOW,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Override the date ages are computed against (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Birth date entered on the date step (DD/MM/YYYY).
    #[arg(long, value_parser = parse_birth_date)]
    pub(crate) birth_date: Option<DateOfBirth>,
    /// First name entered on the name step.
    #[arg(long, default_value = "Mia")]
    pub(crate) first_name: String,
    /// City typed into the location search, one keystroke at a time.
    #[arg(long, default_value = "Vienna")]
    pub(crate) city: String,
}

type DemoService = OnboardingService<InMemoryProfileRepository, StaticGeocoder>;

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        today,
        birth_date,
        first_name,
        city,
    } = args;

    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let birth_date = birth_date.unwrap_or_else(|| DateOfBirth::new("13", "06", "1999"));
    let options = WizardOptions::default();

    let service: DemoService = OnboardingService::new(
        OnboardingFlows::standard()?,
        Arc::new(InMemoryProfileRepository::default()),
        Arc::new(StaticGeocoder::demo()),
        options.clone(),
    )
    .with_clock(move || today);
    let identity = Identity {
        user_id: UserId("demo-user".to_string()),
        email: "demo@tripmate.test".to_string(),
    };

    println!("Onboarding wizard demo ({today})");
    print_entry(&service, &identity);

    let Some(mut wizard) = service.start_wizard(BASIC_INFO_FLOW) else {
        println!("basic info flow is not configured");
        return Ok(());
    };

    println!("\nBasic info ({} steps)", wizard.total_steps());
    wizard.set_answer(FIRST_NAME, AnswerValue::text(first_name.as_str()));
    let transition = wizard.advance();
    report_step(&wizard, transition);

    let typed = format_birthday_input(&birth_date.slashed().replace('/', ""));
    println!("  typed birth date      -> {typed}");
    let entered = DateOfBirth::from_slashed(&typed).unwrap_or(birth_date);
    wizard.set_answer(DATE_OF_BIRTH, AnswerValue::Date(entered));
    match wizard.advance() {
        Transition::GateOpened(prompt) => {
            println!(
                "  age prompt            -> born {}, age {}",
                prompt.born_on, prompt.age
            );
            match wizard.confirm_age() {
                Transition::AgeBlocked { age } => {
                    println!(
                        "  confirm refused       -> age {age} is under {}",
                        options.bounds.minimum
                    );
                    if let Some(warning) = prompt.warning() {
                        println!("  {warning}");
                    }
                    return Ok(());
                }
                other => report_step(&wizard, other),
            }
        }
        other => {
            report_step(&wizard, other);
            return Ok(());
        }
    }

    let search = Arc::new(LocationSearch::new(
        Arc::new(StaticGeocoder::demo()),
        Duration::from_millis(150),
    ));
    let Some(place) = pick_location(search, &city).await else {
        println!("  no suggestions for '{city}'");
        return Ok(());
    };
    println!("  location picked       -> {}", place.display_name);
    wizard.set_answer(LOCATION, AnswerValue::Location(place));
    let transition = wizard.advance();
    report_step(&wizard, transition);

    wizard.set_answer(GENDER, AnswerValue::text("woman"));
    if !save(&mut wizard, &service, &identity.user_id) {
        return Ok(());
    }
    print_entry(&service, &identity);

    let Some(wizard) = service.start_wizard(QUESTIONNAIRE_FLOW) else {
        println!("questionnaire flow is not configured");
        return Ok(());
    };
    println!("\nQuestionnaire ({} steps)", wizard.total_steps());
    let mut session = WizardSession::new(wizard);
    answer_questionnaire(&mut session, options.auto_advance_delay).await;

    let submission = session.submit(service.store(), &identity.user_id);
    println!("  submit                -> {submission:?}");
    if submission == Submission::Saved {
        print_entry(&service, &identity);
        if let Ok(Some(row)) = service.store().profile(&identity.user_id) {
            println!("\nStored profile ({} columns)", row.columns.len());
            for (column, value) in &row.columns {
                println!("  {column:<22} {value}");
            }
        }
    }

    Ok(())
}

fn print_entry(service: &DemoService, identity: &Identity) {
    match service.entry(Some(identity)) {
        Ok(decision) => println!("entry -> {:?} ({})", decision, decision.redirect()),
        Err(err) => println!("entry unavailable: {err}"),
    }
}

fn report_step(wizard: &Wizard, transition: Transition) {
    let step = wizard.current_step();
    match transition {
        Transition::Moved { from, to } => println!(
            "  step {from} -> {to}           now on '{}' ({}%)",
            step.id,
            wizard.progress_percent()
        ),
        Transition::NotReady(error) => println!("  step '{}' not ready -> {error}", step.id),
        other => println!("  step '{}' -> {other:?}", step.id),
    }
}

fn save(wizard: &mut Wizard, service: &DemoService, user_id: &UserId) -> bool {
    match wizard.submit(service.store(), user_id) {
        Submission::Saved => {
            println!("  basic info saved");
            true
        }
        other => {
            println!("  basic info not saved -> {other:?}");
            false
        }
    }
}

/// Types `city` one character at a time; only the final keystroke's results survive.
async fn pick_location(
    search: Arc<LocationSearch<StaticGeocoder>>,
    city: &str,
) -> Option<Location> {
    let mut keystrokes = Vec::new();
    for len in 1..=city.chars().count() {
        let prefix: String = city.chars().take(len).collect();
        let search = Arc::clone(&search);
        keystrokes.push(tokio::spawn(async move { search.search(&prefix).await }));
        tokio::time::sleep(Duration::from_millis(40)).await;
    }

    let mut outcomes = Vec::with_capacity(keystrokes.len());
    for keystroke in keystrokes {
        outcomes.push(keystroke.await.unwrap_or(SearchOutcome::Superseded));
    }

    let superseded = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, SearchOutcome::Superseded))
        .count();
    println!(
        "  location search       -> {} keystrokes, {superseded} superseded",
        outcomes.len()
    );
    outcomes
        .last()
        .and_then(|outcome| outcome.suggestions().first().cloned())
}

async fn answer_questionnaire(session: &mut WizardSession, delay: Duration) {
    let total = session.with(|wizard| wizard.total_steps());
    for _ in 0..total {
        let step = session.with(|wizard| wizard.current_step().clone());
        let field = step.primary_field();
        match &step.kind {
            StepKind::SingleSelect { options } => {
                let Some(choice) = options.first() else {
                    return;
                };
                session.set_answer(field, AnswerValue::text(choice.value));
                if session.position() < total {
                    tokio::time::sleep(delay + Duration::from_millis(50)).await;
                }
                println!(
                    "  {:<24} {:<18} (auto-advance)",
                    step.id, choice.value
                );
            }
            StepKind::MultiSelect { options, max } => {
                for option in options.iter().take(*max + 1) {
                    let outcome = session.toggle_choice(field, option.value);
                    println!("  {:<24} toggle {:<11} {outcome:?}", step.id, option.value);
                }
                let transition = session.advance();
                println!("  {:<24} -> {transition:?}", step.id);
            }
            _ => {
                session.set_answer(field, AnswerValue::text("Night trains and mountain huts"));
                let transition = session.advance();
                println!("  {:<24} -> {transition:?}", step.id);
            }
        }
    }
}
