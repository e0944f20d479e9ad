use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::{info, warn};

use super::catalog::{OnboardingFlows, EMAIL};
use super::domain::{AnswerSet, AnswerValue, Identity, Location};
use super::location::{Geocoder, MIN_QUERY_CHARS};
use super::repository::{PersistenceAdapter, PersistenceError, ProfileRepository, ProfileStore};
use super::steps::{StepError, StepTable, ValidationContext};
use super::validators;
use super::wizard::{Wizard, WizardOptions};

/// Where an authenticated (or anonymous) visitor should be sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryDecision {
    Login,
    BasicInfo,
    Questionnaire,
    Dashboard,
}

impl EntryDecision {
    pub fn redirect(self) -> &'static str {
        match self {
            EntryDecision::Login => "/auth/login",
            EntryDecision::BasicInfo => "/onboarding/basic-info",
            EntryDecision::Questionnaire => "/onboarding/questionnaire",
            EntryDecision::Dashboard => "/dashboard",
        }
    }
}

type Clock = Box<dyn Fn() -> NaiveDate + Send + Sync>;

/// Service composing the step tables, profile store, and geocoder.
pub struct OnboardingService<R, G> {
    flows: OnboardingFlows,
    store: ProfileStore<R>,
    geocoder: Arc<G>,
    options: WizardOptions,
    clock: Clock,
}

impl<R, G> OnboardingService<R, G>
where
    R: ProfileRepository + 'static,
    G: Geocoder + 'static,
{
    pub fn new(
        flows: OnboardingFlows,
        repository: Arc<R>,
        geocoder: Arc<G>,
        options: WizardOptions,
    ) -> Self {
        Self {
            flows,
            store: ProfileStore::new(repository),
            geocoder,
            options,
            clock: Box::new(|| Local::now().date_naive()),
        }
    }

    /// Pins "today" for age calculations.
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn today(&self) -> NaiveDate {
        (self.clock)()
    }

    pub fn flows(&self) -> &OnboardingFlows {
        &self.flows
    }

    pub fn store(&self) -> &ProfileStore<R> {
        &self.store
    }

    pub fn options(&self) -> &WizardOptions {
        &self.options
    }

    /// Fresh wizard for the named flow, positioned on step 1.
    pub fn start_wizard(&self, flow: &str) -> Option<Wizard> {
        let table = self.flows.by_name(flow)?;
        Some(Wizard::new(
            Arc::new(table.clone()),
            self.options.clone(),
            self.today(),
        ))
    }

    /// Route guard for the onboarding area.
    pub fn entry(
        &self,
        identity: Option<&Identity>,
    ) -> Result<EntryDecision, OnboardingServiceError> {
        let Some(identity) = identity else {
            return Ok(EntryDecision::Login);
        };
        let decision = match self.store.profile(&identity.user_id)? {
            Some(row) if row.has(self.flows.questionnaire.completion_field()) => {
                EntryDecision::Dashboard
            }
            Some(row) if row.has(self.flows.basic_info.completion_field()) => {
                EntryDecision::Questionnaire
            }
            _ => EntryDecision::BasicInfo,
        };
        Ok(decision)
    }

    pub fn submit_basic_info(
        &self,
        identity: Option<&Identity>,
        answers: AnswerSet,
    ) -> Result<EntryDecision, OnboardingServiceError> {
        self.submit_flow(&self.flows.basic_info, identity, answers)?;
        Ok(EntryDecision::Questionnaire)
    }

    pub fn submit_questionnaire(
        &self,
        identity: Option<&Identity>,
        answers: AnswerSet,
    ) -> Result<EntryDecision, OnboardingServiceError> {
        self.submit_flow(&self.flows.questionnaire, identity, answers)?;
        Ok(EntryDecision::Dashboard)
    }

    fn submit_flow(
        &self,
        table: &StepTable,
        identity: Option<&Identity>,
        answers: AnswerSet,
    ) -> Result<(), OnboardingServiceError> {
        let identity = identity.ok_or(OnboardingServiceError::Unauthenticated)?;

        let mut accepted = AnswerSet::new();
        for (field, value) in answers.iter() {
            if table.step_for_field(field.as_str()).is_some() {
                accepted.insert(field.clone(), value.clone());
            } else {
                warn!(flow = table.name(), field = field.as_str(), "dropping unknown field");
            }
        }

        let ctx = ValidationContext {
            today: self.today(),
            bounds: self.options.bounds,
        };
        table.validate_for_save(&accepted, &ctx)?;

        if let Some(raw) = accepted.text(EMAIL) {
            if let Ok(normalized) = validators::email(raw) {
                accepted.insert(EMAIL, AnswerValue::Text(normalized));
            }
        }

        self.store.save(&identity.user_id, &accepted)?;
        info!(
            flow = table.name(),
            user_id = %identity.user_id.0,
            fields = accepted.len(),
            "onboarding flow saved"
        );
        Ok(())
    }

    /// Suggestions for one query. Provider failures degrade to an empty list.
    pub async fn suggest_locations(&self, query: &str) -> Vec<Location> {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_CHARS {
            return Vec::new();
        }
        match self.geocoder.search(query).await {
            Ok(places) => places,
            Err(err) => {
                warn!(query, %err, "location suggestions unavailable");
                Vec::new()
            }
        }
    }
}

/// Error raised by the onboarding service.
#[derive(Debug, thiserror::Error)]
pub enum OnboardingServiceError {
    #[error("sign in to continue onboarding")]
    Unauthenticated,
    #[error(transparent)]
    Invalid(#[from] StepError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
