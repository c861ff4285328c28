//! Checkout form controller.
//!
//! Decides at any moment whether the checkout form may submit, drives the order
//! button and loader, and turns a click on the order button into
//! tokenize → inject token → real submit, exactly once.
//!
//! The controller only talks to the page through [`CheckoutPage`] and to the
//! widget through [`WidgetLoader`], so the whole flow is independent of the DOM.
//! Every handler runs synchronously to completion; the only suspension points are
//! the widget load/init in [`CheckoutController::bootstrap`] and the tokenize
//! future returned from [`CheckoutController::on_place_order_click`].

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use futures::future::{FutureExt, LocalBoxFuture};

use crate::config::SessionConfig;
use crate::error::{PaymentFormError, BOOTSTRAP_FALLBACK_MESSAGE};
use crate::expiry::{format_expiry, is_expiry_valid, pad_expiry};
use crate::loader::WidgetLoader;
use crate::session::{InitRequest, SessionHooks, SessionState, TokenizationSession};
use crate::widget::{AutofillData, FieldStyle, SampledCss, TokenizeFields};

/// This gateway's payment-method radio, when the page renders one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GatewayRadio {
    pub checked: bool,
}

/// The slice of the checkout page the controller reads and drives.
pub trait CheckoutPage {
    /// Look up the payment-method radio whose value is `gateway_id`.
    fn gateway_radio(&self, gateway_id: &str) -> Option<GatewayRadio>;

    /// Visibility of the enclosing payment box, `None` if there is no box.
    fn payment_box_visible(&self) -> Option<bool>;

    fn seamless_form_visible(&self) -> bool;

    fn card_holder(&self) -> String;
    fn set_card_holder(&self, value: &str);

    fn expiry(&self) -> String;
    fn set_expiry(&self, value: &str);

    fn billing_email(&self) -> String;

    fn token(&self) -> String;
    fn set_token(&self, token: &str);

    fn set_place_order_disabled(&self, disabled: bool);

    fn set_loader_active(&self, active: bool);

    fn clear_errors(&self);

    /// Render a non-empty list of messages into the error container.
    fn show_errors(&self, messages: &[String]);

    /// Un-hide the container holding the embedded fields.
    fn reveal_seamless_form(&self);

    /// Computed CSS of the card-holder input.
    fn sample_field_css(&self) -> SampledCss;

    /// Click the order button. May re-enter the controller synchronously.
    fn click_place_order(&self);

    /// Submit the checkout form. May re-enter the controller synchronously.
    fn submit_form(&self);
}

/// One-shot permission for the next submit to pass through.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SubmitLatch {
    #[default]
    Blocked,
    Armed,
    Consumed,
}

impl SubmitLatch {
    /// Consume an armed latch. Returns whether it was armed.
    pub fn take(&mut self) -> bool {
        if *self == SubmitLatch::Armed {
            *self = SubmitLatch::Consumed;
            true
        } else {
            false
        }
    }

    pub fn is_armed(&self) -> bool {
        *self == SubmitLatch::Armed
    }
}

/// Mutable per-page-view form state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FormState {
    pub is_processing: bool,
    pub latch: SubmitLatch,
    pub valid_number: bool,
    pub valid_cvv: bool,
}

/// What the page should do with a native submit event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitDecision {
    /// Let the submission go ahead.
    Proceed,
    /// Prevent default and stop propagation.
    Cancel,
}

/// What the page should do with a click on the order button.
pub enum ClickAction {
    /// Not ours: leave the default behaviour alone.
    PassThrough,
    /// A tokenize is already running: prevent default, nothing else.
    Swallow,
    /// Prevent default, stop propagation and drive this future to completion.
    Tokenize(LocalBoxFuture<'static, ()>),
}

impl std::fmt::Debug for ClickAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClickAction::PassThrough => f.write_str("PassThrough"),
            ClickAction::Swallow => f.write_str("Swallow"),
            ClickAction::Tokenize(_) => f.write_str("Tokenize(..)"),
        }
    }
}

/// Page controller for one checkout page view. Cheap to clone.
pub struct CheckoutController<P, L: WidgetLoader> {
    inner: Rc<Inner<P, L>>,
}

impl<P, L: WidgetLoader> Clone for CheckoutController<P, L> {
    fn clone(&self) -> Self {
        CheckoutController {
            inner: self.inner.clone(),
        }
    }
}

struct Inner<P, L: WidgetLoader> {
    config: SessionConfig,
    page: P,
    loader: L,
    session: TokenizationSession<L::Widget>,
    form: RefCell<FormState>,
}

impl<P, L> CheckoutController<P, L>
where
    P: CheckoutPage + 'static,
    L: WidgetLoader + 'static,
{
    pub fn new(config: SessionConfig, page: P, loader: L) -> Self {
        CheckoutController {
            inner: Rc::new(Inner {
                config,
                page,
                loader,
                session: TokenizationSession::new(),
                form: RefCell::new(FormState::default()),
            }),
        }
    }

    pub fn page(&self) -> &P {
        &self.inner.page
    }

    pub fn form_state(&self) -> FormState {
        *self.inner.form.borrow()
    }

    pub fn session_state(&self) -> SessionState {
        self.inner.session.state()
    }

    pub fn is_gateway_selected(&self) -> bool {
        self.inner.is_gateway_selected()
    }

    pub fn is_form_visible(&self) -> bool {
        self.inner.is_form_visible()
    }

    /// Whether this gateway currently owns the checkout form.
    pub fn should_handle(&self) -> bool {
        self.inner.should_handle()
    }

    /// Re-derive the submit gate from the current flags and inputs.
    pub fn recompute(&self) -> bool {
        self.inner.recompute()
    }

    /// Initialise the widget, then settle the button into its gated state.
    pub async fn bootstrap(&self) {
        let inner = &self.inner;
        if inner.should_handle() {
            inner.toggle_place_order(true);
        }
        inner.page.set_loader_active(true);

        if let Err(err) = inner.init_session().await {
            if err.is_terminal() {
                log::error!("payment form unavailable until reload: {err}");
            } else {
                log::warn!("payment form not initialised: {err}");
            }
            let mut messages = err.messages();
            messages.retain(|m| !m.trim().is_empty());
            if messages.is_empty() {
                messages.push(BOOTSTRAP_FALLBACK_MESSAGE.to_string());
            }
            inner.display_errors(&messages);
        }

        inner.page.set_loader_active(false);
        inner.recompute();
    }

    pub fn on_card_holder_input(&self) {
        self.inner.recompute();
    }

    /// Reformat the expiry input in place, then recompute.
    pub fn on_expiry_input(&self) {
        let page = &self.inner.page;
        let raw = page.expiry();
        let formatted = format_expiry(&raw);
        if formatted != raw {
            page.set_expiry(&formatted);
        }
        self.inner.recompute();
    }

    /// Any payment-method change invalidates a fetched token.
    pub fn on_payment_method_change(&self) {
        self.inner.reset_token();
        self.inner.recompute();
    }

    /// Host refresh events (`updated_checkout`, `payment_method_selected`).
    pub fn on_checkout_updated(&self) {
        self.inner.recompute();
    }

    /// Gate a native submit of the checkout form.
    pub fn on_form_submit(&self) -> SubmitDecision {
        let inner = &self.inner;
        if !inner.should_handle() {
            inner.form.borrow_mut().latch = SubmitLatch::Blocked;
            return SubmitDecision::Proceed;
        }

        if inner.form.borrow_mut().latch.take() {
            log::debug!("allow-latch consumed, submitting");
            return SubmitDecision::Proceed;
        }

        log::debug!("submit without token, rerouting through the order button");
        inner.page.click_place_order();
        SubmitDecision::Cancel
    }

    /// Handle a click on the order button.
    pub fn on_place_order_click(&self) -> ClickAction {
        let inner = &self.inner;
        if !inner.should_handle() {
            return ClickAction::PassThrough;
        }

        if inner.form.borrow().is_processing {
            log::debug!("tokenize already in flight, click dropped");
            return ClickAction::Swallow;
        }

        inner.page.clear_errors();
        inner.page.set_token("");
        inner.toggle_place_order(true);
        inner.page.set_loader_active(true);
        inner.form.borrow_mut().is_processing = true;

        let inner = self.inner.clone();
        ClickAction::Tokenize(async move { inner.complete_tokenize().await }.boxed_local())
    }
}

impl<P, L> Inner<P, L>
where
    P: CheckoutPage + 'static,
    L: WidgetLoader + 'static,
{
    fn is_gateway_selected(&self) -> bool {
        let Some(gateway_id) = self.config.gateway_id() else {
            return true;
        };
        self.page
            .gateway_radio(gateway_id)
            .map_or(true, |radio| radio.checked)
    }

    fn is_form_visible(&self) -> bool {
        self.page
            .payment_box_visible()
            .unwrap_or_else(|| self.page.seamless_form_visible())
    }

    fn should_handle(&self) -> bool {
        self.config.is_enabled() && self.is_gateway_selected() && self.is_form_visible()
    }

    /// The button is always enabled while another gateway owns the form.
    fn toggle_place_order(&self, disabled: bool) {
        let disabled = disabled && self.should_handle();
        self.page.set_place_order_disabled(disabled);
    }

    fn recompute(&self) -> bool {
        if !self.should_handle() {
            self.page.set_place_order_disabled(false);
            self.form.borrow_mut().latch = SubmitLatch::Blocked;
            return false;
        }

        if !self.session.is_ready() {
            self.page.set_place_order_disabled(true);
            self.form.borrow_mut().latch = SubmitLatch::Blocked;
            return false;
        }

        let holder_filled = self.page.card_holder().trim().chars().count() > 1;
        let expiry_valid = is_expiry_valid(&self.page.expiry());
        let valid = {
            let mut form = self.form.borrow_mut();
            let valid = form.valid_number && form.valid_cvv && holder_filled && expiry_valid;
            form.latch = if valid {
                SubmitLatch::Armed
            } else {
                SubmitLatch::Blocked
            };
            valid
        };

        self.page.set_place_order_disabled(!valid);
        valid
    }

    fn reset_token(&self) {
        self.page.set_token("");
        self.form.borrow_mut().latch = SubmitLatch::Blocked;
    }

    fn display_errors(&self, messages: &[String]) {
        self.page.clear_errors();
        let messages: Vec<String> = messages
            .iter()
            .filter(|m| !m.is_empty())
            .cloned()
            .collect();
        if !messages.is_empty() {
            self.page.show_errors(&messages);
        }
    }

    async fn init_session(self: &Rc<Self>) -> Result<(), PaymentFormError> {
        let Some(integration_key) = self.config.integration_key() else {
            log::debug!("no integration key configured, widget not loaded");
            return Ok(());
        };

        let selectors = &self.config.selectors;
        let sample = || FieldStyle::from_sample(self.page.sample_field_css());
        let hooks: Rc<dyn SessionHooks> = Rc::clone(self) as Rc<dyn SessionHooks>;
        let hooks: Weak<dyn SessionHooks> = Rc::downgrade(&hooks);

        self.session
            .init(
                &self.loader,
                InitRequest {
                    integration_key,
                    number_field_id: &selectors.card_number,
                    cvv_field_id: &selectors.cvv,
                    style: &sample,
                },
                hooks,
            )
            .await
    }

    async fn complete_tokenize(self: Rc<Self>) {
        let fields = TokenizeFields::from_inputs(
            &self.page.card_holder(),
            &self.page.expiry(),
            &self.page.billing_email(),
        );
        let result = self.session.tokenize(&fields).await;

        self.form.borrow_mut().is_processing = false;
        self.page.set_loader_active(false);

        match result {
            Ok(token) => {
                log::info!("card tokenized, submitting order");
                self.page.set_token(&token);
                self.toggle_place_order(false);
                self.form.borrow_mut().latch = SubmitLatch::Armed;
                self.page.submit_form();
                // A jQuery-triggered submit never reaches the native listener that
                // consumes the latch. The token is single-use and the submit handlers
                // read it synchronously.
                self.form.borrow_mut().latch.take();
                self.page.set_token("");
            }
            Err(err) => {
                log::warn!("tokenization failed: {err}");
                self.recompute();
                self.display_errors(&err.messages());
            }
        }
    }
}

impl<P, L> SessionHooks for Inner<P, L>
where
    P: CheckoutPage + 'static,
    L: WidgetLoader + 'static,
{
    fn number_validity(&self, valid: bool) {
        self.form.borrow_mut().valid_number = valid;
        self.recompute();
    }

    fn cvv_validity(&self, valid: bool) {
        self.form.borrow_mut().valid_cvv = valid;
        self.recompute();
    }

    fn autofilled(&self, data: AutofillData) {
        if !data.card_holder.is_empty() {
            self.page.set_card_holder(&data.card_holder);
        }
        if !data.month.is_empty() && !data.year.is_empty() {
            self.page.set_expiry(&pad_expiry(&data.month, &data.year));
        }
        self.recompute();
    }

    fn ready(&self) {
        self.page.reveal_seamless_form();
    }
}
