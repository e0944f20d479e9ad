use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::onboarding::catalog::{self, DATE_OF_BIRTH, FIRST_NAME, GENDER, LAST_NAME, LOCATION};
use crate::onboarding::domain::{
    AnswerSet, AnswerValue, Coordinates, DateOfBirth, Identity, Location, UserId,
};
use crate::onboarding::location::{GeocodeError, Geocoder, StaticGeocoder};
use crate::onboarding::repository::{
    PersistenceAdapter, PersistenceError, ProfileRepository, ProfileRow,
};
use crate::onboarding::steps::{StepKind, StepTable};
use crate::onboarding::validators::AgeBounds;
use crate::onboarding::wizard::{Wizard, WizardOptions};
use crate::onboarding::{onboarding_router, OnboardingFlows, OnboardingService};

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 13).expect("valid date")
}

pub(super) fn options() -> WizardOptions {
    WizardOptions {
        bounds: AgeBounds::default(),
        auto_advance_delay: Duration::from_millis(300),
    }
}

pub(super) fn user_id() -> UserId {
    UserId("user-42".to_string())
}

pub(super) fn identity() -> Identity {
    Identity {
        user_id: user_id(),
        email: "mia@example.com".to_string(),
    }
}

pub(super) fn questionnaire_table() -> Arc<StepTable> {
    Arc::new(catalog::questionnaire().expect("questionnaire builds"))
}

pub(super) fn basic_info_table() -> Arc<StepTable> {
    Arc::new(catalog::basic_info().expect("basic info builds"))
}

pub(super) fn questionnaire_wizard() -> Wizard {
    Wizard::new(questionnaire_table(), options(), today())
}

pub(super) fn basic_info_wizard() -> Wizard {
    Wizard::new(basic_info_table(), options(), today())
}

/// A valid answer for every step in `table`: first option, or a short sentence for text.
pub(super) fn answer_for(table: &StepTable, step_index: usize) -> (&'static str, AnswerValue) {
    let step = &table.steps()[step_index];
    let field = step.primary_field();
    let value = match &step.kind {
        StepKind::SingleSelect { options } => AnswerValue::text(options[0].value),
        StepKind::MultiSelect { options, .. } => {
            AnswerValue::Choices(vec![options[0].value.to_string()])
        }
        _ => AnswerValue::text("Mountain huts and night trains"),
    };
    (field, value)
}

pub(super) fn questionnaire_answers() -> AnswerSet {
    let table = questionnaire_table();
    (0..table.len()).fold(AnswerSet::new(), |answers, index| {
        let (field, value) = answer_for(&table, index);
        answers.with(field, value)
    })
}

pub(super) fn vienna() -> Location {
    Location {
        city: "Vienna".to_string(),
        country: "Austria".to_string(),
        display_name: "Vienna, Austria".to_string(),
        coordinates: Some(Coordinates {
            lat: 48.2082,
            lon: 16.3738,
        }),
    }
}

pub(super) fn basic_info_answers(birth_date: &str) -> AnswerSet {
    AnswerSet::new()
        .with(FIRST_NAME, AnswerValue::text("Mia"))
        .with(LAST_NAME, AnswerValue::text("O'Neill"))
        .with(
            DATE_OF_BIRTH,
            AnswerValue::Date(DateOfBirth::from_slashed(birth_date).expect("slashed date")),
        )
        .with(LOCATION, AnswerValue::Location(vienna()))
        .with(GENDER, AnswerValue::text("woman"))
}

/// Walks a wizard forward through every step, answering as it goes.
pub(super) fn answer_and_advance_to_end(wizard: &mut Wizard) {
    let table = Arc::new(wizard.table().clone());
    for index in 0..table.len() {
        let (field, value) = answer_for(&table, index);
        wizard.set_answer(field, value);
        if index + 1 < table.len() {
            wizard.advance();
        }
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) rows: Arc<Mutex<HashMap<UserId, ProfileRow>>>,
}

impl MemoryRepository {
    pub(super) fn row(&self, user_id: &UserId) -> Option<ProfileRow> {
        self.rows
            .lock()
            .expect("repository mutex poisoned")
            .get(user_id)
            .cloned()
    }
}

impl ProfileRepository for MemoryRepository {
    fn insert(&self, row: ProfileRow) -> Result<ProfileRow, PersistenceError> {
        let mut guard = self.rows.lock().expect("repository mutex poisoned");
        if guard.contains_key(&row.user_id) {
            return Err(PersistenceError::Conflict);
        }
        guard.insert(row.user_id.clone(), row.clone());
        Ok(row)
    }

    fn update(&self, row: ProfileRow) -> Result<(), PersistenceError> {
        let mut guard = self.rows.lock().expect("repository mutex poisoned");
        guard.insert(row.user_id.clone(), row);
        Ok(())
    }

    fn fetch(&self, user_id: &UserId) -> Result<Option<ProfileRow>, PersistenceError> {
        let guard = self.rows.lock().expect("repository mutex poisoned");
        Ok(guard.get(user_id).cloned())
    }
}

pub(super) struct UnavailableRepository;

impl ProfileRepository for UnavailableRepository {
    fn insert(&self, _row: ProfileRow) -> Result<ProfileRow, PersistenceError> {
        Err(PersistenceError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _row: ProfileRow) -> Result<(), PersistenceError> {
        Err(PersistenceError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _user_id: &UserId) -> Result<Option<ProfileRow>, PersistenceError> {
        Err(PersistenceError::Unavailable("database offline".to_string()))
    }
}

/// Adapter that records every save and optionally fails them.
#[derive(Default)]
pub(super) struct RecordingAdapter {
    saves: Mutex<Vec<(UserId, AnswerSet)>>,
    failure: Option<PersistenceError>,
}

impl RecordingAdapter {
    pub(super) fn failing(error: PersistenceError) -> Self {
        Self {
            saves: Mutex::new(Vec::new()),
            failure: Some(error),
        }
    }

    pub(super) fn saves(&self) -> Vec<(UserId, AnswerSet)> {
        self.saves.lock().expect("adapter mutex poisoned").clone()
    }
}

impl PersistenceAdapter for RecordingAdapter {
    fn save(&self, user_id: &UserId, answers: &AnswerSet) -> Result<(), PersistenceError> {
        self.saves
            .lock()
            .expect("adapter mutex poisoned")
            .push((user_id.clone(), answers.clone()));
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

pub(super) struct FailingGeocoder;

impl Geocoder for FailingGeocoder {
    async fn search(&self, _query: &str) -> Result<Vec<Location>, GeocodeError> {
        Err(GeocodeError::Status(503))
    }
}

pub(super) fn service_with<R, G>(repository: Arc<R>, geocoder: G) -> OnboardingService<R, G>
where
    R: ProfileRepository + 'static,
    G: Geocoder + 'static,
{
    OnboardingService::new(
        OnboardingFlows::standard().expect("flows build"),
        repository,
        Arc::new(geocoder),
        options(),
    )
    .with_clock(today)
}

pub(super) fn build_service() -> (
    OnboardingService<MemoryRepository, StaticGeocoder>,
    Arc<MemoryRepository>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let service = service_with(repository.clone(), StaticGeocoder::demo());
    (service, repository)
}

pub(super) fn router_with_service(
    service: OnboardingService<MemoryRepository, StaticGeocoder>,
) -> axum::Router {
    onboarding_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
