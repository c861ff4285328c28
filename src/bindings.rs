//! till_seamless/src/bindings.rs
//!
//! Low-level wasm-bindgen bindings to the `payment.js` seamless widget.
//!
//! Exposes the raw widget handle (`PaymentJs`) and its callback-style methods.
//! Callbacks are plain `js_sys::Function`s so a `Promise`'s resolve/reject pair
//! can be handed straight to the widget. Higher-level wrappers live in `widget.rs`.

use wasm_bindgen::prelude::*;
use web_sys::js_sys::Function;

#[wasm_bindgen]
extern "C" {
    //------------------------------------------------------------------------------
    // Core Types
    //------------------------------------------------------------------------------

    /// Raw seamless widget handle.
    #[derive(Debug, Clone)]
    pub type PaymentJs;

    /// jQuery collection, used only to hear jQuery-triggered host events.
    #[wasm_bindgen(js_name = jQuery)]
    #[derive(Debug, Clone)]
    pub type JQuery;

    //------------------------------------------------------------------------------
    // Constructors
    //------------------------------------------------------------------------------

    /// Construct the widget with a protocol version.
    ///
    /// ```js
    ///   const payment = new PaymentJs("1.3");
    /// ```
    #[wasm_bindgen(constructor, catch)]
    pub fn new(version: &str) -> Result<PaymentJs, JsValue>;

    /// `jQuery(target)`
    #[wasm_bindgen(js_namespace = window, js_name = jQuery, catch)]
    pub fn jquery(target: &JsValue) -> Result<JQuery, JsValue>;

    //------------------------------------------------------------------------------
    // Instance Methods
    //------------------------------------------------------------------------------

    /// `payment.init(key, numberId, cvvId, onSuccess(api), onError(err))`
    #[wasm_bindgen(method, catch)]
    pub fn init(
        this: &PaymentJs,
        integration_key: &str,
        number_field_id: &str,
        cvv_field_id: &str,
        on_success: &Function,
        on_failure: &Function,
    ) -> Result<(), JsValue>;

    /// `payment.enableAutofill()`
    #[wasm_bindgen(method, catch, js_name = enableAutofill)]
    pub fn enable_autofill(this: &PaymentJs) -> Result<(), JsValue>;

    /// `payment.onAutofill(cb)`, `cb` receives `{ card_holder, month, year }`
    #[wasm_bindgen(method, catch, js_name = onAutofill)]
    pub fn on_autofill(this: &PaymentJs, callback: &Function) -> Result<(), JsValue>;

    /// `payment.setNumberStyle(style)`
    #[wasm_bindgen(method, catch, js_name = setNumberStyle)]
    pub fn set_number_style(this: &PaymentJs, style: &JsValue) -> Result<(), JsValue>;

    /// `payment.setCvvStyle(style)`
    #[wasm_bindgen(method, catch, js_name = setCvvStyle)]
    pub fn set_cvv_style(this: &PaymentJs, style: &JsValue) -> Result<(), JsValue>;

    /// `payment.numberOn("input", cb)`, `cb` receives `{ validNumber }`
    #[wasm_bindgen(method, catch, js_name = numberOn)]
    pub fn number_on(this: &PaymentJs, event: &str, callback: &Function) -> Result<(), JsValue>;

    /// `payment.cvvOn("input", cb)`, `cb` receives `{ validCvv }`
    #[wasm_bindgen(method, catch, js_name = cvvOn)]
    pub fn cvv_on(this: &PaymentJs, event: &str, callback: &Function) -> Result<(), JsValue>;

    /// `payment.tokenize(fields, onSuccess(token), onError(errors))`
    #[wasm_bindgen(method, catch)]
    pub fn tokenize(
        this: &PaymentJs,
        fields: &JsValue,
        on_success: &Function,
        on_failure: &Function,
    ) -> Result<(), JsValue>;

    /// `$(target).on(events, handler)`
    #[wasm_bindgen(method, js_name = on)]
    pub fn on(this: &JQuery, events: &str, handler: &Function) -> JQuery;

    /// `$(target).trigger(event)`
    #[wasm_bindgen(method, catch, js_name = trigger)]
    pub fn trigger(this: &JQuery, event: &str) -> Result<JQuery, JsValue>;

    /// `$(target).off(events, handler)`
    #[wasm_bindgen(method, js_name = off)]
    pub fn off(this: &JQuery, events: &str, handler: &Function) -> JQuery;
}
