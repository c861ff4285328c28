//! End-to-end checkout flow against an in-memory page and widget.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use async_trait::async_trait;
use futures::executor::block_on;
use till_seamless::{
    AutofillData, CheckoutController, CheckoutPage, ClickAction, FieldStyle, GatewayRadio,
    PaymentFormError, SampledCss, SeamlessWidget, SessionConfig, SessionState, SubmitDecision,
    SubmitLatch, TokenizeFields, WidgetError, WidgetLoader,
};

#[derive(Default)]
struct Page {
    radio: Cell<Option<GatewayRadio>>,
    holder: RefCell<String>,
    expiry: RefCell<String>,
    token: RefCell<String>,
    disabled: Cell<bool>,
    loader: Cell<bool>,
    errors: RefCell<Vec<String>>,
    clicks: Cell<u32>,
    submitted_tokens: RefCell<Vec<String>>,
}

impl CheckoutPage for Page {
    fn gateway_radio(&self, _: &str) -> Option<GatewayRadio> {
        self.radio.get()
    }
    fn payment_box_visible(&self) -> Option<bool> {
        None
    }
    fn seamless_form_visible(&self) -> bool {
        true
    }
    fn card_holder(&self) -> String {
        self.holder.borrow().clone()
    }
    fn set_card_holder(&self, value: &str) {
        *self.holder.borrow_mut() = value.into();
    }
    fn expiry(&self) -> String {
        self.expiry.borrow().clone()
    }
    fn set_expiry(&self, value: &str) {
        *self.expiry.borrow_mut() = value.into();
    }
    fn billing_email(&self) -> String {
        " jane@example.com ".into()
    }
    fn token(&self) -> String {
        self.token.borrow().clone()
    }
    fn set_token(&self, token: &str) {
        *self.token.borrow_mut() = token.into();
    }
    fn set_place_order_disabled(&self, disabled: bool) {
        self.disabled.set(disabled);
    }
    fn set_loader_active(&self, active: bool) {
        self.loader.set(active);
    }
    fn clear_errors(&self) {
        self.errors.borrow_mut().clear();
    }
    fn show_errors(&self, messages: &[String]) {
        *self.errors.borrow_mut() = messages.to_vec();
    }
    fn reveal_seamless_form(&self) {}
    fn sample_field_css(&self) -> SampledCss {
        SampledCss {
            font_family: Some("Georgia".into()),
            outer_height_px: Some(40.0),
            ..Default::default()
        }
    }
    fn click_place_order(&self) {
        self.clicks.set(self.clicks.get() + 1);
    }
    fn submit_form(&self) {
        self.submitted_tokens.borrow_mut().push(self.token());
    }
}

type Callback = Rc<RefCell<Option<Box<dyn FnMut(bool)>>>>;

/// Widget double shared between the loader and the test body.
#[derive(Clone, Default)]
struct Widget {
    number: Callback,
    cvv: Callback,
    style: Rc<RefCell<Option<FieldStyle>>>,
    tokenize_calls: Rc<RefCell<Vec<TokenizeFields>>>,
    reject_with: Rc<RefCell<Option<Vec<WidgetError>>>>,
}

impl Widget {
    fn type_number(&self, valid: bool) {
        (self.number.borrow_mut().as_mut().expect("number callback"))(valid);
    }

    fn type_cvv(&self, valid: bool) {
        (self.cvv.borrow_mut().as_mut().expect("cvv callback"))(valid);
    }
}

#[async_trait(?Send)]
impl SeamlessWidget for Widget {
    async fn init(&self, key: &str, number: &str, cvv: &str) -> Result<(), PaymentFormError> {
        assert_eq!(key, "int-key");
        assert_eq!(number, "till_payments_seamless_card_number");
        assert_eq!(cvv, "till_payments_seamless_cvv");
        Ok(())
    }
    fn enable_autofill(&self) {}
    fn on_autofill(&self, _: Box<dyn FnMut(AutofillData)>) {}
    fn set_number_style(&self, style: &FieldStyle) {
        *self.style.borrow_mut() = Some(style.clone());
    }
    fn set_cvv_style(&self, _: &FieldStyle) {}
    fn on_number_input(&self, callback: Box<dyn FnMut(bool)>) {
        *self.number.borrow_mut() = Some(callback);
    }
    fn on_cvv_input(&self, callback: Box<dyn FnMut(bool)>) {
        *self.cvv.borrow_mut() = Some(callback);
    }
    async fn tokenize(&self, fields: &TokenizeFields) -> Result<String, PaymentFormError> {
        self.tokenize_calls.borrow_mut().push(fields.clone());
        match self.reject_with.borrow_mut().take() {
            Some(errors) => Err(PaymentFormError::rejected(errors)),
            None => Ok("tok_live_123".into()),
        }
    }
}

struct Loader(Widget);

#[async_trait(?Send)]
impl WidgetLoader for Loader {
    type Widget = Widget;

    async fn load(&self) -> Result<Widget, PaymentFormError> {
        Ok(self.0.clone())
    }
}

fn setup() -> (CheckoutController<Page, Loader>, Widget) {
    let widget = Widget::default();
    let config = SessionConfig {
        integration_key: Some("int-key".into()),
        gateway_id: "till_payments".into(),
        ..Default::default()
    };
    let page = Page::default();
    page.radio.set(Some(GatewayRadio { checked: true }));
    let ctl = CheckoutController::new(config, page, Loader(widget.clone()));
    block_on(ctl.bootstrap());
    (ctl, widget)
}

fn fill_valid_card(ctl: &CheckoutController<Page, Loader>, widget: &Widget) {
    widget.type_number(true);
    widget.type_cvv(true);
    ctl.page().set_card_holder("Jane Doe");
    ctl.on_card_holder_input();
    ctl.page().set_expiry("0927");
    ctl.on_expiry_input();
}

fn click(ctl: &CheckoutController<Page, Loader>) {
    match ctl.on_place_order_click() {
        ClickAction::Tokenize(fut) => block_on(fut),
        other => panic!("expected tokenize, got {other:?}"),
    }
}

#[test]
fn bootstrap_styles_fields_and_blocks_until_valid() {
    let (ctl, widget) = setup();

    assert_eq!(ctl.session_state(), SessionState::Ready);
    assert!(ctl.page().disabled.get());
    let style = widget.style.borrow().clone().expect("number style applied");
    assert_eq!(style.font_family, "Georgia");
    assert_eq!(style.height, "40px");

    widget.type_number(true);
    assert!(ctl.page().disabled.get());

    fill_valid_card(&ctl, &widget);
    assert!(!ctl.page().disabled.get());
    assert_eq!(ctl.page().expiry(), "09/27");

    widget.type_cvv(false);
    assert!(ctl.page().disabled.get());
}

#[test]
fn successful_tokenize_submits_exactly_once() {
    let (ctl, widget) = setup();
    fill_valid_card(&ctl, &widget);

    click(&ctl);

    let calls = widget.tokenize_calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].month, "09");
    assert_eq!(calls[0].year, "27");
    assert_eq!(calls[0].email, "jane@example.com");
    drop(calls);

    assert_eq!(*ctl.page().submitted_tokens.borrow(), vec!["tok_live_123".to_string()]);
    assert_eq!(ctl.page().token(), "");
    assert!(!ctl.form_state().is_processing);
    assert!(!ctl.page().loader.get());
    assert_eq!(ctl.form_state().latch, SubmitLatch::Consumed);

    // Another native submit is rerouted through the button.
    assert_eq!(ctl.on_form_submit(), SubmitDecision::Cancel);
    assert_eq!(ctl.page().clicks.get(), 1);
}

#[test]
fn spent_token_is_not_reused_by_a_later_submit() {
    let (ctl, widget) = setup();
    fill_valid_card(&ctl, &widget);

    click(&ctl);
    assert_eq!(*ctl.page().submitted_tokens.borrow(), vec!["tok_live_123".to_string()]);

    // The page stays put after an AJAX checkout; the customer edits a field.
    ctl.page().set_card_holder("Jane Q Doe");
    ctl.on_card_holder_input();

    assert_eq!(ctl.page().token(), "");
    assert_eq!(widget.tokenize_calls.borrow().len(), 1);
}

#[test]
fn double_click_tokenizes_once() {
    let (ctl, widget) = setup();
    fill_valid_card(&ctl, &widget);

    let ClickAction::Tokenize(first) = ctl.on_place_order_click() else {
        panic!("expected tokenize");
    };
    assert!(ctl.page().disabled.get());
    assert!(matches!(ctl.on_place_order_click(), ClickAction::Swallow));
    block_on(first);

    assert_eq!(widget.tokenize_calls.borrow().len(), 1);
    assert_eq!(ctl.page().submitted_tokens.borrow().len(), 1);
}

#[test]
fn declined_card_shows_one_error_and_can_retry() {
    let (ctl, widget) = setup();
    fill_valid_card(&ctl, &widget);
    *widget.reject_with.borrow_mut() = Some(vec![WidgetError::new("Card declined")]);

    click(&ctl);

    assert_eq!(*ctl.page().errors.borrow(), vec!["Card declined".to_string()]);
    assert!(!ctl.form_state().is_processing);
    assert_eq!(ctl.page().token(), "");
    assert!(ctl.page().submitted_tokens.borrow().is_empty());
    assert!(!ctl.page().disabled.get());

    click(&ctl);
    assert!(ctl.page().errors.borrow().is_empty());
    assert_eq!(*ctl.page().submitted_tokens.borrow(), vec!["tok_live_123".to_string()]);
    assert_eq!(widget.tokenize_calls.borrow().len(), 2);
}

#[test]
fn switching_gateway_clears_token_and_releases_button() {
    let (ctl, widget) = setup();
    fill_valid_card(&ctl, &widget);
    click(&ctl);
    assert_eq!(ctl.page().submitted_tokens.borrow().len(), 1);

    ctl.page().radio.set(Some(GatewayRadio { checked: false }));
    ctl.on_payment_method_change();

    assert_eq!(ctl.page().token(), "");
    assert!(!ctl.page().disabled.get());
    assert!(!ctl.should_handle());
    assert!(matches!(ctl.on_place_order_click(), ClickAction::PassThrough));
    assert_eq!(ctl.on_form_submit(), SubmitDecision::Proceed);
}

#[test]
fn checkout_refresh_recomputes_without_reinitialising() {
    let (ctl, widget) = setup();
    fill_valid_card(&ctl, &widget);

    ctl.page().radio.set(Some(GatewayRadio { checked: false }));
    ctl.on_checkout_updated();
    assert!(!ctl.page().disabled.get());

    ctl.page().radio.set(Some(GatewayRadio { checked: true }));
    ctl.on_checkout_updated();
    assert!(!ctl.page().disabled.get());
    assert_eq!(ctl.session_state(), SessionState::Ready);
}
