//! Multi-step onboarding: the wizard controller, its step tables, the field validators it
//! gates on, and the adapters at its boundary (location suggestions and profile persistence).
//!
//! The controller is the single writer of an [`AnswerSet`]; everything else reads snapshots
//! and reports intents back through [`Wizard`] or [`WizardSession`].

pub mod age_gate;
pub mod catalog;
pub mod dates;
pub mod domain;
pub mod location;
pub mod repository;
pub mod router;
pub mod service;
pub mod session;
pub mod steps;
pub mod validators;
pub mod wizard;

#[cfg(test)]
mod tests;

pub use age_gate::{AgeGate, AgePrompt, GateDecision};
pub use catalog::{OnboardingFlows, BASIC_INFO_FLOW, QUESTIONNAIRE_FLOW};
pub use domain::{
    AnswerSet, AnswerValue, Coordinates, DateOfBirth, FieldId, Identity, Location, UserId,
};
pub use location::{
    GeocodeError, Geocoder, LocationSearch, NominatimGeocoder, SearchOutcome, StaticGeocoder,
};
pub use repository::{
    PersistenceAdapter, PersistenceError, ProfileRepository, ProfileRow, ProfileStore,
};
pub use router::onboarding_router;
pub use service::{EntryDecision, OnboardingService, OnboardingServiceError};
pub use session::WizardSession;
pub use steps::{
    AgeCheck, ChoiceOption, FieldRule, FieldSpec, StepDescriptor, StepError, StepKind, StepTable,
    StepTableError, ValidationContext,
};
pub use validators::{AgeBounds, FieldError};
pub use wizard::{
    AnswerOutcome, DotState, ScheduledAdvance, Submission, ToggleOutcome, Transition, Wizard,
    WizardOptions, WizardSnapshot,
};
