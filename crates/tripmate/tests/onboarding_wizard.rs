use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use serde_json::json;
use tripmate::onboarding::catalog::{DATE_OF_BIRTH, FIRST_NAME, GENDER, LOCATION};
use tripmate::onboarding::{
    AnswerValue, DateOfBirth, EntryDecision, Identity, OnboardingFlows, OnboardingService,
    PersistenceError, ProfileRepository, ProfileRow, StaticGeocoder, StepKind, Submission,
    Transition, UserId, Wizard, WizardOptions, BASIC_INFO_FLOW, QUESTIONNAIRE_FLOW,
};

#[derive(Default)]
struct ProfileTable {
    rows: Mutex<HashMap<UserId, ProfileRow>>,
}

impl ProfileRepository for ProfileTable {
    fn insert(&self, row: ProfileRow) -> Result<ProfileRow, PersistenceError> {
        let mut rows = self.rows.lock().expect("profile table poisoned");
        if rows.contains_key(&row.user_id) {
            return Err(PersistenceError::Conflict);
        }
        rows.insert(row.user_id.clone(), row.clone());
        Ok(row)
    }

    fn update(&self, row: ProfileRow) -> Result<(), PersistenceError> {
        let mut rows = self.rows.lock().expect("profile table poisoned");
        match rows.get_mut(&row.user_id) {
            Some(existing) => {
                *existing = row;
                Ok(())
            }
            None => Err(PersistenceError::NotFound),
        }
    }

    fn fetch(&self, user_id: &UserId) -> Result<Option<ProfileRow>, PersistenceError> {
        Ok(self
            .rows
            .lock()
            .expect("profile table poisoned")
            .get(user_id)
            .cloned())
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date")
}

fn service() -> OnboardingService<ProfileTable, StaticGeocoder> {
    OnboardingService::new(
        OnboardingFlows::standard().expect("flows build"),
        Arc::new(ProfileTable::default()),
        Arc::new(StaticGeocoder::demo()),
        WizardOptions::default(),
    )
    .with_clock(today)
}

fn traveller() -> Identity {
    Identity {
        user_id: UserId("traveller-7".to_string()),
        email: "traveller@example.com".to_string(),
    }
}

fn complete_basic_info(wizard: &mut Wizard, birth_date: &str) -> Transition {
    wizard.set_answer(FIRST_NAME, AnswerValue::text("Jonas"));
    wizard.advance();
    wizard.set_answer(
        DATE_OF_BIRTH,
        AnswerValue::Date(DateOfBirth::from_slashed(birth_date).expect("slashed date")),
    );
    match wizard.advance() {
        Transition::GateOpened(_) => wizard.confirm_age(),
        other => other,
    }
}

#[tokio::test]
async fn traveller_finishes_both_flows_and_lands_on_the_dashboard() {
    let service = service();
    let identity = traveller();
    assert_eq!(
        service.entry(Some(&identity)).expect("entry"),
        EntryDecision::BasicInfo
    );

    let mut basics = service.start_wizard(BASIC_INFO_FLOW).expect("basic info");
    assert_eq!(
        complete_basic_info(&mut basics, "28/02/2007"),
        Transition::Moved { from: 2, to: 3 }
    );

    let graz = service.suggest_locations("graz").await;
    assert_eq!(graz.len(), 1);
    basics.set_answer(LOCATION, AnswerValue::Location(graz[0].clone()));
    basics.advance();
    basics.set_answer(GENDER, AnswerValue::text("man"));
    assert_eq!(
        basics.submit(service.store(), &identity.user_id),
        Submission::Saved
    );
    assert_eq!(
        service.entry(Some(&identity)).expect("entry"),
        EntryDecision::Questionnaire
    );

    let mut questions = service
        .start_wizard(QUESTIONNAIRE_FLOW)
        .expect("questionnaire");
    let steps = questions.table().steps().to_vec();
    for (index, step) in steps.iter().enumerate() {
        let field = step.primary_field();
        match &step.kind {
            StepKind::SingleSelect { options } => {
                questions.set_answer(field, AnswerValue::text(options[1].value));
            }
            StepKind::MultiSelect { options, .. } => {
                questions.toggle_choice(field, options[0].value);
                questions.toggle_choice(field, options[2].value);
            }
            _ => {
                questions.set_answer(field, AnswerValue::text("Alpine lakes"));
            }
        }
        if index + 1 < steps.len() {
            assert_eq!(
                questions.advance(),
                Transition::Moved {
                    from: index + 1,
                    to: index + 2
                }
            );
        }
    }
    assert_eq!(
        questions.submit(service.store(), &identity.user_id),
        Submission::Saved
    );
    assert_eq!(
        service.entry(Some(&identity)).expect("entry"),
        EntryDecision::Dashboard
    );

    let row = service
        .store()
        .profile(&identity.user_id)
        .expect("fetch")
        .expect("row");
    assert_eq!(row.columns[DATE_OF_BIRTH], json!("2007-02-28"));
    assert_eq!(row.columns[LOCATION]["city"], json!("Graz"));
    assert_eq!(
        row.columns["motivations"],
        json!(["make_friends", "escape_city"])
    );
    assert_eq!(row.columns["drinks_smokes"], json!("social_vibe"));
}

#[test]
fn day_before_eighteenth_birthday_cannot_pass_the_gate() {
    let service = service();
    let mut wizard = service.start_wizard(BASIC_INFO_FLOW).expect("basic info");

    assert_eq!(
        complete_basic_info(&mut wizard, "02/03/2007"),
        Transition::AgeBlocked { age: 17 }
    );
    assert_eq!(wizard.position(), 2);
    assert!(wizard.edit_age());

    wizard.set_answer(
        DATE_OF_BIRTH,
        AnswerValue::Date(DateOfBirth::new("01", "03", "2007")),
    );
    assert!(matches!(wizard.advance(), Transition::GateOpened(prompt) if prompt.age == 18));
    assert_eq!(wizard.confirm_age(), Transition::Moved { from: 2, to: 3 });
}

#[test]
fn impossible_dates_never_open_the_gate() {
    let service = service();
    let mut wizard = service.start_wizard(BASIC_INFO_FLOW).expect("basic info");
    wizard.set_answer(FIRST_NAME, AnswerValue::text("Jonas"));
    wizard.advance();

    for raw in ["31/04/1990", "29/02/2001", "12/13/1990", "01/01/1890"] {
        wizard.set_answer(
            DATE_OF_BIRTH,
            AnswerValue::Date(DateOfBirth::from_slashed(raw).expect("slashed date")),
        );
        assert!(
            matches!(wizard.advance(), Transition::NotReady(_)),
            "{raw} should be refused"
        );
        assert!(wizard.age_prompt().is_none());
    }
    assert_eq!(wizard.position(), 2);
}
