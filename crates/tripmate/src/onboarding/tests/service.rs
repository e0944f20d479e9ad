use super::common::*;
use serde_json::json;
use std::sync::Arc;

use crate::onboarding::catalog::{DATE_OF_BIRTH, QUESTIONNAIRE_FLOW};
use crate::onboarding::domain::{AnswerValue, UserId};
use crate::onboarding::location::StaticGeocoder;
use crate::onboarding::repository::PersistenceError;
use crate::onboarding::validators::FieldError;
use crate::onboarding::{EntryDecision, OnboardingServiceError};

#[test]
fn entry_routes_through_the_onboarding_stages() {
    let (service, _) = build_service();

    assert_eq!(service.entry(None).expect("entry"), EntryDecision::Login);
    assert_eq!(
        service.entry(Some(&identity())).expect("entry"),
        EntryDecision::BasicInfo
    );

    service
        .submit_basic_info(Some(&identity()), basic_info_answers("13/06/1999"))
        .expect("basic info saves");
    assert_eq!(
        service.entry(Some(&identity())).expect("entry"),
        EntryDecision::Questionnaire
    );

    service
        .submit_questionnaire(Some(&identity()), questionnaire_answers())
        .expect("questionnaire saves");
    assert_eq!(
        service.entry(Some(&identity())).expect("entry"),
        EntryDecision::Dashboard
    );
}

#[test]
fn basic_info_stores_birth_date_in_iso_form() {
    let (service, repository) = build_service();
    let next = service
        .submit_basic_info(Some(&identity()), basic_info_answers("13/06/1999"))
        .expect("basic info saves");
    assert_eq!(next, EntryDecision::Questionnaire);

    let row = repository.row(&user_id()).expect("row stored");
    assert_eq!(row.columns[DATE_OF_BIRTH], json!("1999-06-13"));
    assert_eq!(row.columns["location"]["display_name"], json!("Vienna, Austria"));
    assert_eq!(row.columns["gender"], json!("woman"));
}

#[test]
fn basic_info_enforces_the_minimum_age_without_a_prompt() {
    let (service, repository) = build_service();
    let result = service.submit_basic_info(Some(&identity()), basic_info_answers("14/06/2006"));

    match result {
        Err(OnboardingServiceError::Invalid(error)) => {
            assert_eq!(error.step, DATE_OF_BIRTH);
            assert_eq!(
                error.error,
                FieldError::Underage {
                    minimum: 18,
                    age: 17
                }
            );
        }
        other => panic!("expected underage rejection, got {other:?}"),
    }
    assert!(repository.row(&user_id()).is_none());
}

#[test]
fn questionnaire_reports_the_first_unanswered_step() {
    let (service, repository) = build_service();
    let mut answers = questionnaire_answers();
    answers.remove("bedtime");
    answers.remove("drinks_smokes");

    match service.submit_questionnaire(Some(&identity()), answers) {
        Err(OnboardingServiceError::Invalid(error)) => assert_eq!(error.step, "bedtime"),
        other => panic!("expected validation failure, got {other:?}"),
    }
    assert!(repository.row(&user_id()).is_none());
}

#[test]
fn unknown_fields_are_dropped_before_saving() {
    let (service, repository) = build_service();
    let answers = questionnaire_answers().with("shoe_size", AnswerValue::text("42"));

    service
        .submit_questionnaire(Some(&identity()), answers)
        .expect("questionnaire saves");

    let row = repository.row(&user_id()).expect("row stored");
    assert_eq!(row.columns.len(), 17);
    assert!(!row.columns.contains_key("shoe_size"));
}

#[test]
fn anonymous_submissions_are_refused() {
    let (service, _) = build_service();
    assert!(matches!(
        service.submit_questionnaire(None, questionnaire_answers()),
        Err(OnboardingServiceError::Unauthenticated)
    ));
}

#[test]
fn storage_failures_surface_as_persistence_errors() {
    let service = service_with(Arc::new(UnavailableRepository), StaticGeocoder::demo());

    assert!(matches!(
        service.entry(Some(&identity())),
        Err(OnboardingServiceError::Persistence(
            PersistenceError::Unavailable(_)
        ))
    ));
    assert!(matches!(
        service.submit_questionnaire(Some(&identity()), questionnaire_answers()),
        Err(OnboardingServiceError::Persistence(_))
    ));
}

#[test]
fn profiles_are_kept_per_user() {
    let (service, repository) = build_service();
    service
        .submit_questionnaire(Some(&identity()), questionnaire_answers())
        .expect("questionnaire saves");

    assert!(repository
        .row(&UserId("someone-else".to_string()))
        .is_none());
}

#[test]
fn start_wizard_uses_the_service_clock_and_options() {
    let (service, _) = build_service();
    let wizard = service
        .start_wizard(QUESTIONNAIRE_FLOW)
        .expect("questionnaire flow");
    assert_eq!(wizard.total_steps(), 17);
    assert_eq!(wizard.context().today, today());
    assert!(service.start_wizard("settings").is_none());
}

#[tokio::test]
async fn location_suggestions_come_from_the_geocoder() {
    let (service, _) = build_service();
    let places = service.suggest_locations("vien").await;
    assert_eq!(places.len(), 1);
    assert_eq!(places[0].city, "Vienna");

    assert!(service.suggest_locations("v").await.is_empty());
}

#[tokio::test]
async fn location_failures_degrade_to_no_suggestions() {
    let service = service_with(Arc::new(MemoryRepository::default()), FailingGeocoder);
    assert!(service.suggest_locations("Vienna").await.is_empty());
}
