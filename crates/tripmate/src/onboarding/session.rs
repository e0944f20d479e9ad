use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use tracing::debug;

use super::domain::{AnswerValue, UserId};
use super::repository::PersistenceAdapter;
use super::wizard::{
    AnswerOutcome, Submission, ToggleOutcome, Transition, Wizard, WizardSnapshot,
};

/// A [`Wizard`] driven by a tokio timer for auto-advance.
///
/// At most one timer is alive: arming a new one aborts the previous task, and dropping the
/// session aborts whatever is left. The wizard's ticket check covers a timer that already
/// woke up and is waiting on the lock.
pub struct WizardSession {
    wizard: Arc<Mutex<Wizard>>,
    timer: Option<JoinHandle<()>>,
}

impl WizardSession {
    pub fn new(wizard: Wizard) -> Self {
        Self {
            wizard: Arc::new(Mutex::new(wizard)),
            timer: None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Wizard> {
        self.wizard.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` against the wizard under the session lock.
    pub fn with<T>(&self, f: impl FnOnce(&mut Wizard) -> T) -> T {
        f(&mut self.lock())
    }

    pub fn snapshot(&self) -> WizardSnapshot {
        self.lock().snapshot()
    }

    pub fn position(&self) -> usize {
        self.lock().position()
    }

    /// Must be called from within a tokio runtime; arming spawns the timer task.
    pub fn set_answer(&mut self, field: &str, value: AnswerValue) -> AnswerOutcome {
        let outcome = self.lock().set_answer(field, value);
        match outcome {
            AnswerOutcome::Scheduled(scheduled) => {
                self.abort_timer();
                let wizard = Arc::clone(&self.wizard);
                self.timer = Some(tokio::spawn(async move {
                    tokio::time::sleep(scheduled.delay).await;
                    let fired = wizard
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .fire_auto_advance(scheduled.ticket);
                    debug!(ticket = scheduled.ticket, ?fired, "auto-advance timer fired");
                }));
            }
            AnswerOutcome::Stored => {
                if self.lock().pending_advance().is_none() {
                    self.abort_timer();
                }
            }
            AnswerOutcome::UnknownField | AnswerOutcome::NotOnCurrentStep => {}
        }
        outcome
    }

    pub fn toggle_choice(&mut self, field: &str, value: &str) -> ToggleOutcome {
        self.lock().toggle_choice(field, value)
    }

    pub fn advance(&mut self) -> Transition {
        self.abort_timer();
        self.lock().advance()
    }

    pub fn retreat(&mut self) -> Transition {
        self.abort_timer();
        self.lock().retreat()
    }

    pub fn confirm_age(&mut self) -> Transition {
        self.lock().confirm_age()
    }

    pub fn edit_age(&mut self) -> bool {
        self.lock().edit_age()
    }

    pub fn submit<P>(&mut self, adapter: &P, user_id: &UserId) -> Submission
    where
        P: PersistenceAdapter + ?Sized,
    {
        self.abort_timer();
        self.lock().submit(adapter, user_id)
    }

    pub fn has_pending_timer(&self) -> bool {
        self.timer.as_ref().is_some_and(|timer| !timer.is_finished())
    }

    /// Tears down any scheduled auto-advance without moving.
    pub fn cancel(&mut self) {
        self.abort_timer();
        self.lock().cancel_pending();
    }

    fn abort_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for WizardSession {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}
