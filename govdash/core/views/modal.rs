use std::future::Future;

use serde::Serialize;

use crate::error::ApiError;

/// Visibility of a create or edit form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ModalPhase {
    /// Hidden.
    Closed,
    /// Shown and editable.
    Open,
    /// Submission in flight.
    Submitting,
}

/// Form modal that keeps its fields across failed submissions.
#[derive(Debug, Clone)]
pub struct FormModal<F> {
    phase: ModalPhase,
    form: F,
    error: Option<String>,
}

impl<F: Default> Default for FormModal<F> {
    fn default() -> Self {
        Self {
            phase: ModalPhase::Closed,
            form: F::default(),
            error: None,
        }
    }
}

impl<F: Default> FormModal<F> {
    /// Closed modal with a blank form.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shows the modal with its current fields.
    pub fn open(&mut self) {
        self.phase = ModalPhase::Open;
        self.error = None;
    }

    /// Shows the modal prefilled, e.g. for editing.
    pub fn open_with(&mut self, form: F) {
        self.form = form;
        self.open();
    }

    /// Hides the modal; fields are kept for the next open.
    pub fn cancel(&mut self) {
        self.phase = ModalPhase::Closed;
        self.error = None;
    }

    /// Mutable access to the fields while open.
    pub fn form_mut(&mut self) -> &mut F {
        &mut self.form
    }

    /// Current fields.
    #[must_use]
    pub const fn form(&self) -> &F {
        &self.form
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> ModalPhase {
        self.phase
    }

    /// Inline error of the last failed submission.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Moves to Submitting and hands out a snapshot of the fields.
    pub fn begin_submit(&mut self) -> Result<F, ApiError>
    where
        F: Clone,
    {
        if self.phase != ModalPhase::Open {
            return Err(ApiError::Validation("form is not open".into()));
        }
        self.phase = ModalPhase::Submitting;
        self.error = None;
        Ok(self.form.clone())
    }

    /// Applies a submission result: success closes and resets, failure reopens with the error.
    pub fn finish_submit<T>(&mut self, outcome: &Result<T, ApiError>) {
        match outcome {
            Ok(_) => {
                self.phase = ModalPhase::Closed;
                self.form = F::default();
                self.error = None;
            }
            Err(err) => {
                self.phase = ModalPhase::Open;
                self.error = Some(err.message());
            }
        }
    }

    /// Runs `submit` against a snapshot of the fields and applies the outcome.
    pub async fn submit<T, Fut>(
        &mut self,
        submit: impl FnOnce(F) -> Fut,
    ) -> Result<T, ApiError>
    where
        F: Clone,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let form = self.begin_submit()?;
        let outcome = submit(form).await;
        self.finish_submit(&outcome);
        outcome
    }
}
