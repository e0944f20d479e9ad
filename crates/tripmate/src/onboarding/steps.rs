use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;

use super::domain::{AnswerSet, AnswerValue};
use super::validators::{self, AgeBounds, FieldError};

/// One selectable answer for a choice step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceOption {
    pub value: &'static str,
    pub label: &'static str,
}

impl ChoiceOption {
    pub const fn new(value: &'static str, label: &'static str) -> Self {
        Self { value, label }
    }
}

/// How a composite date step treats the minimum age.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeCheck {
    /// The step itself rejects dates outside the age bounds.
    Inline,
    /// The step checks structure and plausibility; the age gate enforces the minimum.
    Gate,
}

/// Renderer dispatch key. One generic renderer per variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepKind {
    SingleSelect { options: Vec<ChoiceOption> },
    MultiSelect { options: Vec<ChoiceOption>, max: usize },
    FreeText,
    CompositeDate { age_check: AgeCheck },
    StructuredLocation,
}

impl StepKind {
    pub fn label(&self) -> &'static str {
        match self {
            StepKind::SingleSelect { .. } => "single_select",
            StepKind::MultiSelect { .. } => "multi_select",
            StepKind::FreeText => "free_text",
            StepKind::CompositeDate { .. } => "composite_date",
            StepKind::StructuredLocation => "structured_location",
        }
    }
}

/// Per-field rule used by free-text steps and for shape checks elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum FieldRule {
    Text { max_chars: usize },
    PersonName { required: bool },
    Email,
    VerificationCode { length: usize },
    /// Optional boolean; absent means the step default.
    Flag,
    Choice,
    Date,
    Location,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub id: &'static str,
    pub rule: FieldRule,
}

impl FieldSpec {
    pub const fn new(id: &'static str, rule: FieldRule) -> Self {
        Self { id, rule }
    }

    pub fn is_required(&self) -> bool {
        !matches!(
            self.rule,
            FieldRule::Flag | FieldRule::PersonName { required: false }
        )
    }
}

/// Immutable description of one wizard step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepDescriptor {
    pub id: &'static str,
    pub title: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'static str>,
    pub fields: Vec<FieldSpec>,
    #[serde(flatten)]
    pub kind: StepKind,
    pub auto_advance: bool,
}

impl StepDescriptor {
    pub fn single_select(
        id: &'static str,
        title: &'static str,
        options: Vec<ChoiceOption>,
    ) -> Self {
        Self {
            id,
            title,
            hint: None,
            fields: vec![FieldSpec::new(id, FieldRule::Choice)],
            kind: StepKind::SingleSelect { options },
            auto_advance: true,
        }
    }

    pub fn multi_select(
        id: &'static str,
        title: &'static str,
        options: Vec<ChoiceOption>,
        max: usize,
    ) -> Self {
        Self {
            id,
            title,
            hint: None,
            fields: vec![FieldSpec::new(id, FieldRule::Choice)],
            kind: StepKind::MultiSelect { options, max },
            auto_advance: false,
        }
    }

    pub fn free_text(id: &'static str, title: &'static str, fields: Vec<FieldSpec>) -> Self {
        Self {
            id,
            title,
            hint: None,
            fields,
            kind: StepKind::FreeText,
            auto_advance: false,
        }
    }

    pub fn composite_date(id: &'static str, title: &'static str, age_check: AgeCheck) -> Self {
        Self {
            id,
            title,
            hint: None,
            fields: vec![FieldSpec::new(id, FieldRule::Date)],
            kind: StepKind::CompositeDate { age_check },
            auto_advance: false,
        }
    }

    pub fn structured_location(id: &'static str, title: &'static str) -> Self {
        Self {
            id,
            title,
            hint: None,
            fields: vec![FieldSpec::new(id, FieldRule::Location)],
            kind: StepKind::StructuredLocation,
            auto_advance: false,
        }
    }

    pub fn with_hint(mut self, hint: &'static str) -> Self {
        self.hint = Some(hint);
        self
    }

    /// Turns auto-advance off, e.g. on a closing step that shows a Continue affordance.
    pub fn manual(mut self) -> Self {
        self.auto_advance = false;
        self
    }

    /// Field the step's primary answer lives in.
    pub fn primary_field(&self) -> &'static str {
        self.fields.first().map(|field| field.id).unwrap_or(self.id)
    }

    pub fn collects(&self, field: &str) -> bool {
        self.fields.iter().any(|spec| spec.id == field)
    }

    pub fn field(&self, field: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.id == field)
    }

    pub fn gates_age(&self) -> bool {
        matches!(
            self.kind,
            StepKind::CompositeDate {
                age_check: AgeCheck::Gate
            }
        )
    }

    /// Readiness predicate for the step against the current answers.
    pub fn validate(&self, answers: &AnswerSet, ctx: &ValidationContext) -> Result<(), StepError> {
        match &self.kind {
            StepKind::SingleSelect { options } => {
                let field = self.primary_field();
                let value = answers.text(field).unwrap_or_default();
                validators::single_select(value, options).map_err(|err| self.error(field, err))
            }
            StepKind::MultiSelect { options, max } => {
                let field = self.primary_field();
                validators::multi_select(answers.choices(field), options, *max)
                    .map_err(|err| self.error(field, err))
            }
            StepKind::FreeText => self
                .fields
                .iter()
                .try_for_each(|spec| validate_text_field(spec, answers))
                .map_err(|(field, err)| self.error(field, err)),
            StepKind::CompositeDate { age_check } => {
                let field = self.primary_field();
                let Some(dob) = answers.date(field) else {
                    return Err(self.error(field, FieldError::Required));
                };
                let result = match age_check {
                    AgeCheck::Inline => {
                        validators::date_of_birth(dob, ctx.today, ctx.bounds).map(|_| ())
                    }
                    AgeCheck::Gate => {
                        validators::plausible_birth_date(dob, ctx.today, ctx.bounds).map(|_| ())
                    }
                };
                result.map_err(|err| self.error(field, err))
            }
            StepKind::StructuredLocation => {
                let field = self.primary_field();
                match answers.location(field) {
                    Some(location) => {
                        validators::location(location).map_err(|err| self.error(field, err))
                    }
                    None => Err(self.error(field, FieldError::MissingLocation)),
                }
            }
        }
    }

    pub fn is_ready(&self, answers: &AnswerSet, ctx: &ValidationContext) -> bool {
        self.validate(answers, ctx).is_ok()
    }

    fn error(&self, field: &str, error: FieldError) -> StepError {
        StepError {
            step: self.id,
            field: field.to_string(),
            error,
        }
    }
}

fn validate_text_field(
    spec: &FieldSpec,
    answers: &AnswerSet,
) -> Result<(), (&'static str, FieldError)> {
    let fail = |err| (spec.id, err);
    match spec.rule {
        FieldRule::Flag => match answers.get(spec.id) {
            None | Some(AnswerValue::Flag(_)) => Ok(()),
            Some(_) => Err(fail(FieldError::WrongShape)),
        },
        FieldRule::Text { max_chars } => {
            validators::required_text(text_or_empty(answers, spec.id)?, max_chars).map_err(fail)
        }
        FieldRule::PersonName { required } => {
            validators::person_name(text_or_empty(answers, spec.id)?, required).map_err(fail)
        }
        FieldRule::Email => validators::email(text_or_empty(answers, spec.id)?)
            .map(|_| ())
            .map_err(fail),
        FieldRule::VerificationCode { length } => {
            validators::verification_code(text_or_empty(answers, spec.id)?, length).map_err(fail)
        }
        FieldRule::Choice | FieldRule::Date | FieldRule::Location => {
            Err(fail(FieldError::WrongShape))
        }
    }
}

fn text_or_empty<'a>(
    answers: &'a AnswerSet,
    field: &'static str,
) -> Result<&'a str, (&'static str, FieldError)> {
    match answers.get(field) {
        None => Ok(""),
        Some(AnswerValue::Text(text)) => Ok(text),
        Some(_) => Err((field, FieldError::WrongShape)),
    }
}

/// Inputs validation needs beyond the answers themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationContext {
    pub today: NaiveDate,
    pub bounds: AgeBounds,
}

/// A step that is not ready, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("step '{step}' field '{field}': {error}")]
pub struct StepError {
    pub step: &'static str,
    pub field: String,
    pub error: FieldError,
}

/// Malformed step configuration. These are programming errors surfaced at startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StepTableError {
    #[error("a step table needs at least one step")]
    Empty,
    #[error("step id '{0}' appears more than once")]
    DuplicateStep(&'static str),
    #[error("field '{field}' is collected by more than one step (again in '{step}')")]
    DuplicateField {
        step: &'static str,
        field: &'static str,
    },
    #[error("step '{0}' collects no fields")]
    NoFields(&'static str),
    #[error("step '{step}' is {kind} and must collect exactly one field")]
    ChoiceFieldCount {
        step: &'static str,
        kind: &'static str,
    },
    #[error("step '{0}' offers no options")]
    NoOptions(&'static str),
    #[error("step '{step}' caps selections at {max}, above its {available} options")]
    InvalidCap {
        step: &'static str,
        max: usize,
        available: usize,
    },
    #[error("step '{0}' is marked auto-advance but is not a single-select step")]
    AutoAdvanceNotSupported(&'static str),
    #[error("free-text step '{step}' declares non-text field '{field}'")]
    NonTextField {
        step: &'static str,
        field: &'static str,
    },
}

/// Ordered, validated list of steps. Positions are 1-based and contiguous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepTable {
    name: &'static str,
    steps: Vec<StepDescriptor>,
}

impl StepTable {
    pub fn new(name: &'static str, steps: Vec<StepDescriptor>) -> Result<Self, StepTableError> {
        if steps.is_empty() {
            return Err(StepTableError::Empty);
        }

        let mut step_ids = HashSet::new();
        let mut field_ids = HashSet::new();
        for step in &steps {
            if !step_ids.insert(step.id) {
                return Err(StepTableError::DuplicateStep(step.id));
            }
            if step.fields.is_empty() {
                return Err(StepTableError::NoFields(step.id));
            }
            for field in &step.fields {
                if !field_ids.insert(field.id) {
                    return Err(StepTableError::DuplicateField {
                        step: step.id,
                        field: field.id,
                    });
                }
            }
            check_kind(step)?;
        }

        Ok(Self { name, steps })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step at a 1-based position.
    pub fn step(&self, position: usize) -> Option<&StepDescriptor> {
        position
            .checked_sub(1)
            .and_then(|index| self.steps.get(index))
    }

    pub fn position_of(&self, step_id: &str) -> Option<usize> {
        self.steps
            .iter()
            .position(|step| step.id == step_id)
            .map(|index| index + 1)
    }

    pub fn steps(&self) -> &[StepDescriptor] {
        &self.steps
    }

    pub fn step_for_field(&self, field: &str) -> Option<&StepDescriptor> {
        self.steps.iter().find(|step| step.collects(field))
    }

    pub fn field_ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.steps
            .iter()
            .flat_map(|step| step.fields.iter().map(|field| field.id))
    }

    /// Field whose presence marks the flow as finished.
    pub fn completion_field(&self) -> &'static str {
        self.steps
            .last()
            .map(StepDescriptor::primary_field)
            .unwrap_or(self.name)
    }

    /// First step that is not ready, in order.
    pub fn validate_all(&self, answers: &AnswerSet, ctx: &ValidationContext) -> Result<(), StepError> {
        self.steps
            .iter()
            .try_for_each(|step| step.validate(answers, ctx))
    }

    /// [`validate_all`](Self::validate_all) plus the minimum age on gated date steps.
    /// Saved answers never rely on the prompt having been seen.
    pub fn validate_for_save(
        &self,
        answers: &AnswerSet,
        ctx: &ValidationContext,
    ) -> Result<(), StepError> {
        self.validate_all(answers, ctx)?;
        self.steps
            .iter()
            .filter(|step| step.gates_age())
            .try_for_each(|step| {
                let field = step.primary_field();
                match answers.date(field) {
                    Some(dob) => validators::date_of_birth(dob, ctx.today, ctx.bounds)
                        .map(|_| ())
                        .map_err(|err| step.error(field, err)),
                    None => Ok(()),
                }
            })
    }
}

fn check_kind(step: &StepDescriptor) -> Result<(), StepTableError> {
    match &step.kind {
        StepKind::SingleSelect { options } | StepKind::MultiSelect { options, .. } => {
            if step.fields.len() != 1 {
                return Err(StepTableError::ChoiceFieldCount {
                    step: step.id,
                    kind: step.kind.label(),
                });
            }
            if options.is_empty() {
                return Err(StepTableError::NoOptions(step.id));
            }
            if let StepKind::MultiSelect { max, .. } = &step.kind {
                if *max == 0 || *max > options.len() {
                    return Err(StepTableError::InvalidCap {
                        step: step.id,
                        max: *max,
                        available: options.len(),
                    });
                }
            }
        }
        StepKind::FreeText => {
            if let Some(field) = step.fields.iter().find(|field| {
                matches!(
                    field.rule,
                    FieldRule::Choice | FieldRule::Date | FieldRule::Location
                )
            }) {
                return Err(StepTableError::NonTextField {
                    step: step.id,
                    field: field.id,
                });
            }
        }
        StepKind::CompositeDate { .. } | StepKind::StructuredLocation => {
            if step.fields.len() != 1 {
                return Err(StepTableError::ChoiceFieldCount {
                    step: step.id,
                    kind: step.kind.label(),
                });
            }
        }
    }

    if step.auto_advance && !matches!(step.kind, StepKind::SingleSelect { .. }) {
        return Err(StepTableError::AutoAdvanceNotSupported(step.id));
    }
    Ok(())
}
