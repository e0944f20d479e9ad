use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::age_gate::{AgeGate, AgePrompt, GateDecision};
use super::domain::{AnswerSet, AnswerValue, DateOfBirth, UserId};
use super::repository::{PersistenceAdapter, PersistenceError};
use super::steps::{
    FieldRule, StepDescriptor, StepError, StepKind, StepTable, ValidationContext,
};
use super::validators::AgeBounds;
use crate::config::OnboardingConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardOptions {
    pub bounds: AgeBounds,
    pub auto_advance_delay: Duration,
}

impl Default for WizardOptions {
    fn default() -> Self {
        Self::from(&OnboardingConfig::default())
    }
}

impl From<&OnboardingConfig> for WizardOptions {
    fn from(config: &OnboardingConfig) -> Self {
        Self {
            bounds: config.age_bounds(),
            auto_advance_delay: config.auto_advance_delay,
        }
    }
}

/// A pending auto-advance. Only the most recent ticket may fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledAdvance {
    pub ticket: u64,
    pub position: usize,
    pub delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    Stored,
    /// Stored, and an auto-advance was (re)armed. Any earlier ticket is void.
    Scheduled(ScheduledAdvance),
    UnknownField,
    /// The field belongs to another step; nothing was written.
    NotOnCurrentStep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Removed,
    /// Selection is full; nothing changed.
    AtCapacity,
    NotMultiSelect,
    NotOnCurrentStep,
}

/// Outcome of a navigation request. Rejections leave the wizard untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Moved { from: usize, to: usize },
    AtLastStep,
    AtFirstStep,
    NotReady(StepError),
    GateOpened(AgePrompt),
    /// The age prompt is open and must be confirmed or edited first.
    GatePending,
    AgeBlocked { age: i32 },
    NoGate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Saved,
    NotOnFinalStep,
    NotReady(StepError),
    /// The adapter failed; position and answers are unchanged so the caller can retry.
    Failed(PersistenceError),
    AlreadySubmitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DotState {
    Done,
    Current,
    Upcoming,
}

/// Read-only view handed to renderers.
#[derive(Debug, Clone, Serialize)]
pub struct WizardSnapshot {
    pub flow: &'static str,
    pub position: usize,
    pub total: usize,
    pub step: StepDescriptor,
    pub answers: AnswerSet,
    pub ready: bool,
    pub progress_percent: u8,
    pub dots: Vec<DotState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_prompt: Option<AgePrompt>,
    pub completed: bool,
}

/// Step controller: sole owner of the current position and the answers.
#[derive(Debug)]
pub struct Wizard {
    table: Arc<StepTable>,
    options: WizardOptions,
    today: NaiveDate,
    current: usize,
    answers: AnswerSet,
    gate: AgeGate,
    pending: Option<ScheduledAdvance>,
    next_ticket: u64,
    completed: bool,
}

impl Wizard {
    pub fn new(table: Arc<StepTable>, options: WizardOptions, today: NaiveDate) -> Self {
        let gate = AgeGate::new(options.bounds.minimum);
        // Opt-in flags start checked.
        let answers = table
            .steps()
            .iter()
            .flat_map(|step| step.fields.iter())
            .filter(|spec| spec.rule == FieldRule::Flag)
            .fold(AnswerSet::new(), |answers, spec| {
                answers.with(spec.id, AnswerValue::Flag(true))
            });
        Self {
            table,
            options,
            today,
            current: 1,
            answers,
            gate,
            pending: None,
            next_ticket: 1,
            completed: false,
        }
    }

    /// Starts at step 1 with previously stored answers; fields outside the table are dropped.
    pub fn resume(
        table: Arc<StepTable>,
        options: WizardOptions,
        today: NaiveDate,
        stored: &AnswerSet,
    ) -> Self {
        let mut wizard = Self::new(table, options, today);
        for (field, value) in stored.iter() {
            if wizard.table.step_for_field(field.as_str()).is_some() {
                wizard.answers.insert(field.clone(), value.clone());
            }
        }
        wizard
    }

    pub fn table(&self) -> &StepTable {
        &self.table
    }

    pub fn position(&self) -> usize {
        self.current
    }

    pub fn total_steps(&self) -> usize {
        self.table.len()
    }

    pub fn current_step(&self) -> &StepDescriptor {
        &self.table.steps()[self.current - 1]
    }

    pub fn answers(&self) -> &AnswerSet {
        &self.answers
    }

    pub fn age_prompt(&self) -> Option<&AgePrompt> {
        self.gate.prompt()
    }

    pub fn pending_advance(&self) -> Option<ScheduledAdvance> {
        self.pending
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn context(&self) -> ValidationContext {
        ValidationContext {
            today: self.today,
            bounds: self.options.bounds,
        }
    }

    pub fn readiness(&self) -> Result<(), StepError> {
        self.current_step().validate(&self.answers, &self.context())
    }

    /// Same predicate the advance affordance should be disabled with.
    pub fn can_advance(&self) -> bool {
        !self.gate.is_open() && self.readiness().is_ok()
    }

    pub fn progress_percent(&self) -> u8 {
        let percent = self.current as f64 / self.table.len() as f64 * 100.0;
        percent.round() as u8
    }

    pub fn progress_dots(&self) -> Vec<DotState> {
        (1..=self.table.len())
            .map(|position| match position.cmp(&self.current) {
                std::cmp::Ordering::Less => DotState::Done,
                std::cmp::Ordering::Equal => DotState::Current,
                std::cmp::Ordering::Greater => DotState::Upcoming,
            })
            .collect()
    }

    pub fn snapshot(&self) -> WizardSnapshot {
        WizardSnapshot {
            flow: self.table.name(),
            position: self.current,
            total: self.table.len(),
            step: self.current_step().clone(),
            answers: self.answers.clone(),
            ready: self.can_advance(),
            progress_percent: self.progress_percent(),
            dots: self.progress_dots(),
            age_prompt: self.gate.prompt().cloned(),
            completed: self.completed,
        }
    }

    /// Stores `value` for a field of the current step. Validation gates transitions, never writes.
    pub fn set_answer(&mut self, field: &str, value: AnswerValue) -> AnswerOutcome {
        let Some(owner) = self.table.step_for_field(field) else {
            warn!(field, flow = self.table.name(), "ignoring answer for unknown field");
            return AnswerOutcome::UnknownField;
        };
        if owner.id != self.current_step().id {
            debug!(field, step = self.current_step().id, "ignoring answer for another step");
            return AnswerOutcome::NotOnCurrentStep;
        }
        let arm = owner.auto_advance && !value.is_empty();

        self.answers.insert(field, value);
        // A changed date invalidates whatever the prompt was showing.
        self.gate.edit();
        self.pending = None;
        if arm {
            AnswerOutcome::Scheduled(self.schedule())
        } else {
            AnswerOutcome::Stored
        }
    }

    /// Multi-select toggle: removing always works, adding stops silently at the cap.
    pub fn toggle_choice(&mut self, field: &str, value: &str) -> ToggleOutcome {
        let Some(step) = self.table.step_for_field(field) else {
            return ToggleOutcome::NotMultiSelect;
        };
        let StepKind::MultiSelect { max, .. } = step.kind else {
            return ToggleOutcome::NotMultiSelect;
        };
        if step.id != self.current_step().id {
            return ToggleOutcome::NotOnCurrentStep;
        }

        let mut selection = self.answers.choices(field).to_vec();
        let outcome = if let Some(index) = selection.iter().position(|chosen| chosen == value) {
            selection.remove(index);
            ToggleOutcome::Removed
        } else if selection.len() < max {
            selection.push(value.to_string());
            ToggleOutcome::Added
        } else {
            return ToggleOutcome::AtCapacity;
        };

        self.answers.insert(field, AnswerValue::Choices(selection));
        outcome
    }

    fn schedule(&mut self) -> ScheduledAdvance {
        let scheduled = ScheduledAdvance {
            ticket: self.next_ticket,
            position: self.current,
            delay: self.options.auto_advance_delay,
        };
        self.next_ticket += 1;
        self.pending = Some(scheduled);
        scheduled
    }

    /// Runs a scheduled auto-advance if `ticket` is still the live one for this step.
    pub fn fire_auto_advance(&mut self, ticket: u64) -> Option<Transition> {
        match self.pending {
            Some(scheduled) if scheduled.ticket == ticket && scheduled.position == self.current => {
                self.pending = None;
                Some(self.advance())
            }
            _ => {
                debug!(ticket, "stale auto-advance ignored");
                None
            }
        }
    }

    pub fn cancel_pending(&mut self) -> Option<ScheduledAdvance> {
        self.pending.take()
    }

    pub fn advance(&mut self) -> Transition {
        if self.gate.is_open() {
            return Transition::GatePending;
        }
        self.pending = None;

        let ctx = self.context();
        let step = &self.table.steps()[self.current - 1];
        if let Err(err) = step.validate(&self.answers, &ctx) {
            debug!(step = step.id, %err, "advance refused");
            return Transition::NotReady(err);
        }

        if step.gates_age() {
            let birth = self
                .answers
                .date(step.primary_field())
                .and_then(DateOfBirth::to_date);
            if let Some(birth) = birth {
                let prompt = self.gate.open(birth, self.today).clone();
                return Transition::GateOpened(prompt);
            }
        }

        self.step_forward()
    }

    fn step_forward(&mut self) -> Transition {
        let from = self.current;
        if from >= self.table.len() {
            return Transition::AtLastStep;
        }
        self.current = from + 1;
        info!(flow = self.table.name(), from, to = self.current, "wizard advanced");
        Transition::Moved {
            from,
            to: self.current,
        }
    }

    pub fn retreat(&mut self) -> Transition {
        self.pending = None;
        self.gate.edit();
        if self.current <= 1 {
            return Transition::AtFirstStep;
        }
        let from = self.current;
        self.current -= 1;
        debug!(flow = self.table.name(), from, to = self.current, "wizard retreated");
        Transition::Moved {
            from,
            to: self.current,
        }
    }

    /// Confirm on the age prompt. Refused while the computed age is under the minimum.
    pub fn confirm_age(&mut self) -> Transition {
        match self.gate.confirm() {
            GateDecision::Confirmed => self.step_forward(),
            GateDecision::Blocked { age } => Transition::AgeBlocked { age },
            GateDecision::NotOpen => Transition::NoGate,
        }
    }

    /// Edit on the age prompt: close it and stay on the date step with the answer kept.
    pub fn edit_age(&mut self) -> bool {
        self.gate.edit()
    }

    /// Hands a snapshot of the answers to `adapter` once the final step is ready.
    pub fn submit<P>(&mut self, adapter: &P, user_id: &UserId) -> Submission
    where
        P: PersistenceAdapter + ?Sized,
    {
        if self.completed {
            return Submission::AlreadySubmitted;
        }
        if self.current != self.table.len() {
            return Submission::NotOnFinalStep;
        }
        self.pending = None;

        if let Err(err) = self.table.validate_for_save(&self.answers, &self.context()) {
            debug!(%err, "submit refused");
            return Submission::NotReady(err);
        }

        let snapshot = self.answers.clone();
        match adapter.save(user_id, &snapshot) {
            Ok(()) => {
                self.completed = true;
                info!(flow = self.table.name(), user_id = %user_id.0, "onboarding answers saved");
                Submission::Saved
            }
            Err(err) => {
                warn!(flow = self.table.name(), user_id = %user_id.0, %err, "saving answers failed");
                Submission::Failed(err)
            }
        }
    }
}
