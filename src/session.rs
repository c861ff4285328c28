//! Tokenization session: owns the widget handle once it is initialised.
//!
//! ```text
//! Uninitialized ──init()──▶ Initializing ──ok──▶ Ready
//!                                 │
//!                                 └──err──▶ InitFailed (until reload)
//! ```

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::error::PaymentFormError;
use crate::loader::WidgetLoader;
use crate::widget::{AutofillData, FieldStyle, SeamlessWidget, TokenizeFields};

/// Lifecycle of the widget wiring.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initializing,
    Ready,
    InitFailed(PaymentFormError),
}

/// Receiver for widget field events. Held weakly by the session's callbacks.
pub trait SessionHooks {
    fn number_validity(&self, valid: bool);
    fn cvv_validity(&self, valid: bool);
    fn autofilled(&self, data: AutofillData);
    /// The embedded fields are wired and may be shown.
    fn ready(&self);
}

/// Mount targets and credential for `init`.
pub struct InitRequest<'a> {
    pub integration_key: &'a str,
    pub number_field_id: &'a str,
    pub cvv_field_id: &'a str,
    /// Sampled once the widget has loaded, so the page layout has settled.
    pub style: &'a dyn Fn() -> FieldStyle,
}

pub struct TokenizationSession<W> {
    state: RefCell<SessionState>,
    widget: RefCell<Option<Rc<W>>>,
}

impl<W: SeamlessWidget + 'static> TokenizationSession<W> {
    pub fn new() -> Self {
        TokenizationSession {
            state: RefCell::new(SessionState::Uninitialized),
            widget: RefCell::new(None),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.state.borrow(), SessionState::Ready)
    }

    /// Load the widget, mount its fields and register field callbacks.
    ///
    /// A session that is already `Ready` returns immediately. A failed session
    /// keeps failing with the first error.
    pub async fn init<L>(
        &self,
        loader: &L,
        request: InitRequest<'_>,
        hooks: Weak<dyn SessionHooks>,
    ) -> Result<(), PaymentFormError>
    where
        L: WidgetLoader<Widget = W>,
    {
        match self.state() {
            SessionState::Ready => return Ok(()),
            SessionState::InitFailed(err) => return Err(err),
            SessionState::Initializing => return Err(PaymentFormError::NotReady),
            SessionState::Uninitialized => {}
        }
        self.set_state(SessionState::Initializing);

        match self.wire(loader, request, hooks).await {
            Ok(()) => Ok(()),
            Err(err) => {
                log::warn!("payment form initialisation failed: {err}");
                self.set_state(SessionState::InitFailed(err.clone()));
                Err(err)
            }
        }
    }

    async fn wire<L>(
        &self,
        loader: &L,
        request: InitRequest<'_>,
        hooks: Weak<dyn SessionHooks>,
    ) -> Result<(), PaymentFormError>
    where
        L: WidgetLoader<Widget = W>,
    {
        let widget = Rc::new(loader.load().await?);
        let style = (request.style)();
        widget
            .init(
                request.integration_key,
                request.number_field_id,
                request.cvv_field_id,
            )
            .await?;

        widget.enable_autofill();
        let on_autofill = hooks.clone();
        widget.on_autofill(Box::new(move |data| {
            if let Some(hooks) = on_autofill.upgrade() {
                hooks.autofilled(data);
            }
        }));
        widget.set_number_style(&style);
        widget.set_cvv_style(&style);
        let on_number = hooks.clone();
        widget.on_number_input(Box::new(move |valid| {
            if let Some(hooks) = on_number.upgrade() {
                hooks.number_validity(valid);
            }
        }));
        let on_cvv = hooks.clone();
        widget.on_cvv_input(Box::new(move |valid| {
            if let Some(hooks) = on_cvv.upgrade() {
                hooks.cvv_validity(valid);
            }
        }));

        *self.widget.borrow_mut() = Some(widget);
        self.set_state(SessionState::Ready);
        if let Some(hooks) = hooks.upgrade() {
            hooks.ready();
        }
        Ok(())
    }

    /// Ask the widget for a token. Fails with `NotReady` before `init` succeeds.
    pub async fn tokenize(&self, fields: &TokenizeFields) -> Result<String, PaymentFormError> {
        let widget = self
            .widget
            .borrow()
            .clone()
            .ok_or(PaymentFormError::NotReady)?;
        widget.tokenize(fields).await
    }

    fn set_state(&self, state: SessionState) {
        log::info!("payment session: {:?} -> {:?}", self.state.borrow(), state);
        *self.state.borrow_mut() = state;
    }
}

impl<W: SeamlessWidget + 'static> Default for TokenizationSession<W> {
    fn default() -> Self {
        Self::new()
    }
}
