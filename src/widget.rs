//! till_seamless/src/widget.rs
//!
//! High-level Rust API over the `payment.js` seamless widget.
//!
//! This module provides:
//! - `SeamlessWidget`, the capability the session consumes (init, field events,
//!   autofill, styling, tokenize). The checkout flow is written against this trait.
//! - `FieldStyle`, `AutofillData` and `TokenizeFields`, the values crossing it.
//! - `PaymentJsWidget`, the browser implementation over `bindings::PaymentJs`.
//!   The widget's success/failure callback pairs are bridged to `js_sys::Promise`
//!   and awaited with `JsFuture`, so no callback closures are leaked.

use std::cell::RefCell;

use async_trait::async_trait;
use gloo_utils::format::JsValueSerdeExt;
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::js_sys::{Promise, Reflect};

use crate::bindings::PaymentJs as JsPaymentJs;
use crate::error::{PaymentFormError, WidgetError, WidgetErrorEntry};
use crate::expiry::split_expiry;

/// The external tokenization widget, as seen by the session.
#[async_trait(?Send)]
pub trait SeamlessWidget {
    /// Mount the number/CVV fields. Resolves once the widget reports success.
    async fn init(
        &self,
        integration_key: &str,
        number_field_id: &str,
        cvv_field_id: &str,
    ) -> Result<(), PaymentFormError>;

    fn enable_autofill(&self);

    fn on_autofill(&self, callback: Box<dyn FnMut(AutofillData)>);

    fn set_number_style(&self, style: &FieldStyle);

    fn set_cvv_style(&self, style: &FieldStyle);

    /// Called on every keystroke in the number field with its validity.
    fn on_number_input(&self, callback: Box<dyn FnMut(bool)>);

    /// Called on every keystroke in the CVV field with its validity.
    fn on_cvv_input(&self, callback: Box<dyn FnMut(bool)>);

    /// Exchange the card details for an opaque token.
    async fn tokenize(&self, fields: &TokenizeFields) -> Result<String, PaymentFormError>;
}

/// CSS applied to the embedded fields so they match the merchant's inputs.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldStyle {
    pub border: String,
    pub border_radius: String,
    pub height: String,
    pub padding: String,
    pub font_size: String,
    pub font_weight: String,
    pub font_family: String,
    pub color: String,
    pub background: String,
    pub letter_spacing: String,
    pub word_spacing: String,
}

/// Computed CSS sampled from the card-holder input. Empty values are `None`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampledCss {
    pub border: Option<String>,
    pub border_radius: Option<String>,
    pub outer_height_px: Option<f64>,
    pub padding: Option<String>,
    pub font_size: Option<String>,
    pub font_weight: Option<String>,
    pub font_family: Option<String>,
    pub color: Option<String>,
    pub background_color: Option<String>,
}

impl FieldStyle {
    /// Fill gaps in the sampled CSS with the stock checkout look.
    pub fn from_sample(css: SampledCss) -> Self {
        fn or(value: Option<String>, fallback: &str) -> String {
            value
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| fallback.to_string())
        }

        FieldStyle {
            border: or(css.border, "1px solid #d5d8dc"),
            border_radius: or(css.border_radius, "4px"),
            height: format!("{}px", css.outer_height_px.unwrap_or(0.0)),
            padding: or(css.padding, "14px 12px"),
            font_size: or(css.font_size, "16px"),
            font_weight: or(css.font_weight, "400"),
            font_family: or(css.font_family, "inherit"),
            color: or(css.color, "#1f2d3d"),
            background: or(css.background_color, "#fff"),
            letter_spacing: "0.1px".into(),
            word_spacing: "1.7px".into(),
        }
    }
}

/// Card data the widget detected from browser autofill.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AutofillData {
    pub card_holder: String,
    pub month: String,
    pub year: String,
}

/// Payload for `payment.tokenize(...)`.
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct TokenizeFields {
    pub card_holder: String,
    pub month: String,
    pub year: String,
    pub email: String,
}

impl TokenizeFields {
    /// Bundle the visible inputs; holder and email are trimmed.
    pub fn from_inputs(card_holder: &str, expiry: &str, email: &str) -> Self {
        let (month, year) = split_expiry(expiry);
        TokenizeFields {
            card_holder: card_holder.trim().to_string(),
            month,
            year,
            email: email.trim().to_string(),
        }
    }
}

/// `SeamlessWidget` over the real `window.PaymentJs`.
///
/// Field callbacks stay registered for as long as this value lives.
pub struct PaymentJsWidget {
    payment: RefCell<JsPaymentJs>,
    callbacks: RefCell<Vec<Closure<dyn FnMut(JsValue)>>>,
}

impl PaymentJsWidget {
    pub fn new(payment: JsPaymentJs) -> Self {
        PaymentJsWidget {
            payment: RefCell::new(payment),
            callbacks: RefCell::new(Vec::new()),
        }
    }

    fn payment(&self) -> JsPaymentJs {
        self.payment.borrow().clone()
    }

    fn keep(&self, closure: Closure<dyn FnMut(JsValue)>) {
        self.callbacks.borrow_mut().push(closure);
    }

    fn style_value(style: &FieldStyle) -> Option<JsValue> {
        serde_wasm_bindgen::to_value(style)
            .map_err(|e| log::warn!("field style not serialisable: {e}"))
            .ok()
    }
}

#[async_trait(?Send)]
impl SeamlessWidget for PaymentJsWidget {
    async fn init(
        &self,
        integration_key: &str,
        number_field_id: &str,
        cvv_field_id: &str,
    ) -> Result<(), PaymentFormError> {
        let payment = self.payment();
        let mut call = Ok(());
        let promise = Promise::new(&mut |resolve, reject| {
            call = payment.init(integration_key, number_field_id, cvv_field_id, &resolve, &reject);
        });
        call.map_err(|e| PaymentFormError::init_failed(js_to_widget_error(&e)))?;

        let api = JsFuture::from(promise)
            .await
            .map_err(|e| PaymentFormError::init_failed(js_to_widget_error(&e)))?;

        // The success callback hands back the live api object.
        if api.is_object() {
            *self.payment.borrow_mut() = api.unchecked_into();
        }
        Ok(())
    }

    fn enable_autofill(&self) {
        if let Err(e) = self.payment().enable_autofill() {
            log::warn!("enableAutofill failed: {e:?}");
        }
    }

    fn on_autofill(&self, mut callback: Box<dyn FnMut(AutofillData)>) {
        let closure = Closure::wrap(Box::new(move |data: JsValue| {
            callback(AutofillData {
                card_holder: js_text(&data, "card_holder"),
                month: js_text(&data, "month"),
                year: js_text(&data, "year"),
            });
        }) as Box<dyn FnMut(JsValue)>);

        match self.payment().on_autofill(closure.as_ref().unchecked_ref()) {
            Ok(()) => self.keep(closure),
            Err(e) => log::warn!("onAutofill failed: {e:?}"),
        }
    }

    fn set_number_style(&self, style: &FieldStyle) {
        if let Some(style) = Self::style_value(style) {
            if let Err(e) = self.payment().set_number_style(&style) {
                log::warn!("setNumberStyle failed: {e:?}");
            }
        }
    }

    fn set_cvv_style(&self, style: &FieldStyle) {
        if let Some(style) = Self::style_value(style) {
            if let Err(e) = self.payment().set_cvv_style(&style) {
                log::warn!("setCvvStyle failed: {e:?}");
            }
        }
    }

    fn on_number_input(&self, mut callback: Box<dyn FnMut(bool)>) {
        let closure = Closure::wrap(Box::new(move |data: JsValue| {
            callback(js_flag(&data, "validNumber"));
        }) as Box<dyn FnMut(JsValue)>);

        match self.payment().number_on("input", closure.as_ref().unchecked_ref()) {
            Ok(()) => self.keep(closure),
            Err(e) => log::warn!("numberOn failed: {e:?}"),
        }
    }

    fn on_cvv_input(&self, mut callback: Box<dyn FnMut(bool)>) {
        let closure = Closure::wrap(Box::new(move |data: JsValue| {
            callback(js_flag(&data, "validCvv"));
        }) as Box<dyn FnMut(JsValue)>);

        match self.payment().cvv_on("input", closure.as_ref().unchecked_ref()) {
            Ok(()) => self.keep(closure),
            Err(e) => log::warn!("cvvOn failed: {e:?}"),
        }
    }

    async fn tokenize(&self, fields: &TokenizeFields) -> Result<String, PaymentFormError> {
        let fields_js = serde_wasm_bindgen::to_value(fields)
            .map_err(|e| PaymentFormError::rejected(vec![WidgetError::new(e.to_string())]))?;

        let payment = self.payment();
        let mut call = Ok(());
        let promise = Promise::new(&mut |resolve, reject| {
            call = payment.tokenize(&fields_js, &resolve, &reject);
        });
        call.map_err(|e| PaymentFormError::rejected(vec![js_to_widget_error(&e).unwrap_or_default()]))?;

        match JsFuture::from(promise).await {
            Ok(token) => accept_token(token.as_string()),
            Err(errors) => Err(PaymentFormError::rejected(js_to_widget_errors(&errors))),
        }
    }
}

/// Best-effort conversion of a thrown value or rejection reason.
fn js_to_widget_error(value: &JsValue) -> Option<WidgetError> {
    if value.is_undefined() || value.is_null() {
        return None;
    }
    if let Some(message) = value.as_string() {
        return Some(WidgetError::new(message));
    }
    let message = Reflect::get(value, &JsValue::from_str("message"))
        .ok()
        .and_then(|v| v.as_string());
    Some(WidgetError { message })
}

/// The tokenize failure callback delivers an array of `{ message }` objects.
fn js_to_widget_errors(value: &JsValue) -> Vec<WidgetError> {
    match value.into_serde::<Vec<WidgetErrorEntry>>() {
        Ok(entries) => WidgetError::from_entries(entries),
        Err(_) => vec![js_to_widget_error(value).unwrap_or_default()],
    }
}

/// A success callback without a usable token counts as a rejection.
fn accept_token(token: Option<String>) -> Result<String, PaymentFormError> {
    token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| PaymentFormError::rejected(vec![WidgetError::default()]))
}

fn js_flag(data: &JsValue, key: &str) -> bool {
    Reflect::get(data, &JsValue::from_str(key))
        .map(|v| v.is_truthy())
        .unwrap_or(false)
}

/// Read a string-or-number property as text; absent values become empty.
fn js_text(data: &JsValue, key: &str) -> String {
    let value = match Reflect::get(data, &JsValue::from_str(key)) {
        Ok(value) => value,
        Err(_) => return String::new(),
    };
    if let Some(text) = value.as_string() {
        return text;
    }
    match value.as_f64() {
        Some(n) if n.fract() == 0.0 => format!("{}", n as i64),
        Some(n) => n.to_string(),
        None => String::new(),
    }
}
