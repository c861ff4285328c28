//! The real checkout page: `CheckoutPage` over `web-sys`, plus event wiring.
//!
//! `DomCheckoutPage::locate` resolves the DOM contract once. `PageBinding`
//! owns every listener it registers and removes them again when dropped, so
//! tearing down a mounted form leaves the page as it found it.

use std::cell::RefCell;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::js_sys::{Function, Reflect};
use web_sys::{Document, Element, Event, EventTarget, HtmlElement, HtmlFormElement, HtmlInputElement};
use yew::AppHandle;

use crate::bindings::{jquery, JQuery};
use crate::components::{ErrorList, ErrorListProps};
use crate::config::{PageSelectors, SessionConfig};
use crate::controller::{CheckoutController, CheckoutPage, ClickAction, GatewayRadio, SubmitDecision};
use crate::error::MountError;
use crate::loader::{BrowserLoader, WidgetLoader};
use crate::widget::SampledCss;

/// Host events WooCommerce fires through jQuery on `document.body`.
const CHECKOUT_EVENTS: [&str; 2] = ["updated_checkout", "payment_method_selected"];

const LOADER_ACTIVE_CLASS: &str = "is-active";

pub struct DomCheckoutPage {
    document: Document,
    selectors: PageSelectors,
    seamless_form: HtmlElement,
    form: HtmlFormElement,
    place_order: HtmlElement,
    token_input: HtmlInputElement,
    errors: Option<Element>,
    loader: Option<Element>,
    card_holder: Option<HtmlInputElement>,
    expiry: Option<HtmlInputElement>,
    error_list: RefCell<Option<AppHandle<ErrorList>>>,
}

impl DomCheckoutPage {
    /// Resolve the DOM contract. The seamless form, its `<form>`, the order
    /// button and the token input are required.
    pub fn locate(document: Document, selectors: PageSelectors) -> Result<Self, MountError> {
        let seamless_form: HtmlElement = by_id(&document, &selectors.seamless_form)?;
        let form = seamless_form
            .closest("form")
            .ok()
            .flatten()
            .and_then(|el| el.dyn_into::<HtmlFormElement>().ok())
            .ok_or_else(|| MountError("form".into()))?;
        let place_order = form
            .query_selector(&format!("#{}", selectors.place_order))
            .ok()
            .flatten()
            .and_then(|el| el.dyn_into::<HtmlElement>().ok())
            .ok_or_else(|| MountError(selectors.place_order.clone()))?;
        let token_input = by_id(&document, &selectors.token_input)?;

        Ok(DomCheckoutPage {
            errors: document.get_element_by_id(&selectors.errors),
            loader: document.get_element_by_id(&selectors.loader),
            card_holder: by_id(&document, &selectors.card_holder).ok(),
            expiry: by_id(&document, &selectors.expiry).ok(),
            document,
            selectors,
            seamless_form,
            form,
            place_order,
            token_input,
            error_list: RefCell::new(None),
        })
    }

    fn destroy_error_list(&self) {
        if let Some(handle) = self.error_list.borrow_mut().take() {
            handle.destroy();
        }
    }
}

impl CheckoutPage for DomCheckoutPage {
    fn gateway_radio(&self, gateway_id: &str) -> Option<GatewayRadio> {
        let selector = format!(
            r#"input[name="{}"][value="{}"]"#,
            self.selectors.payment_method_name,
            gateway_id.replace('"', r#"\""#)
        );
        self.document
            .query_selector(&selector)
            .ok()
            .flatten()
            .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
            .map(|input| GatewayRadio {
                checked: input.checked(),
            })
    }

    fn payment_box_visible(&self) -> Option<bool> {
        self.seamless_form
            .closest(&format!(".{}", self.selectors.payment_box_class))
            .ok()
            .flatten()
            .and_then(|el| el.dyn_into::<HtmlElement>().ok())
            .map(|payment_box| is_visible(&payment_box))
    }

    fn seamless_form_visible(&self) -> bool {
        is_visible(&self.seamless_form)
    }

    fn card_holder(&self) -> String {
        self.card_holder.as_ref().map(|i| i.value()).unwrap_or_default()
    }

    fn set_card_holder(&self, value: &str) {
        if let Some(input) = &self.card_holder {
            input.set_value(value);
        }
    }

    fn expiry(&self) -> String {
        self.expiry.as_ref().map(|i| i.value()).unwrap_or_default()
    }

    fn set_expiry(&self, value: &str) {
        if let Some(input) = &self.expiry {
            input.set_value(value);
        }
    }

    fn billing_email(&self) -> String {
        by_id::<HtmlInputElement>(&self.document, &self.selectors.billing_email)
            .map(|input| input.value())
            .unwrap_or_default()
    }

    fn token(&self) -> String {
        self.token_input.value()
    }

    fn set_token(&self, token: &str) {
        self.token_input.set_value(token);
    }

    fn set_place_order_disabled(&self, disabled: bool) {
        if let Err(e) = Reflect::set(
            &self.place_order,
            &JsValue::from_str("disabled"),
            &JsValue::from_bool(disabled),
        ) {
            log::warn!("could not toggle order button: {e:?}");
        }
    }

    fn set_loader_active(&self, active: bool) {
        if let Some(loader) = &self.loader {
            if let Err(e) = loader
                .class_list()
                .toggle_with_force(LOADER_ACTIVE_CLASS, active)
            {
                log::warn!("could not toggle loader: {e:?}");
            }
        }
    }

    fn clear_errors(&self) {
        self.destroy_error_list();
        if let Some(container) = &self.errors {
            container.set_inner_html("");
        }
    }

    fn show_errors(&self, messages: &[String]) {
        let Some(container) = &self.errors else {
            log::warn!("no error container for: {messages:?}");
            return;
        };
        self.destroy_error_list();
        let handle = yew::Renderer::<ErrorList>::with_root_and_props(
            container.clone(),
            ErrorListProps {
                messages: messages.to_vec(),
            },
        )
        .render();
        *self.error_list.borrow_mut() = Some(handle);
    }

    fn reveal_seamless_form(&self) {
        if let Err(e) = self.seamless_form.remove_attribute("hidden") {
            log::warn!("could not reveal seamless form: {e:?}");
        }
    }

    fn sample_field_css(&self) -> SampledCss {
        let Some(input) = &self.card_holder else {
            return SampledCss::default();
        };
        let computed = web_sys::window()
            .and_then(|win| win.get_computed_style(input).ok().flatten());
        let Some(style) = computed else {
            return SampledCss::default();
        };
        let prop = |name: &str| {
            style
                .get_property_value(name)
                .ok()
                .filter(|v| !v.trim().is_empty())
        };

        SampledCss {
            border: prop("border"),
            border_radius: prop("border-radius"),
            outer_height_px: Some(f64::from(input.offset_height())),
            padding: prop("padding"),
            font_size: prop("font-size"),
            font_weight: prop("font-weight"),
            font_family: prop("font-family"),
            color: prop("color"),
            background_color: prop("background-color"),
        }
    }

    fn click_place_order(&self) {
        self.place_order.click();
    }

    fn submit_form(&self) {
        // jQuery's trigger skips constraint validation and reaches the host's jQuery handlers.
        if let Some(form) = jquery_for(&self.form) {
            if let Err(e) = form.trigger("submit") {
                log::error!("could not submit checkout form: {e:?}");
            }
            return;
        }
        if let Err(e) = self.form.request_submit() {
            log::error!("could not submit checkout form: {e:?}");
        }
    }
}

fn by_id<T: JsCast>(document: &Document, id: &str) -> Result<T, MountError> {
    document
        .get_element_by_id(id)
        .and_then(|el| el.dyn_into::<T>().ok())
        .ok_or_else(|| MountError(id.to_string()))
}

/// Same notion as jQuery's `:visible`: the element takes up layout space.
fn is_visible(element: &HtmlElement) -> bool {
    element.offset_width() > 0 || element.offset_height() > 0
}

/// A native listener, removed on drop.
struct DomListener {
    target: EventTarget,
    event: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

impl DomListener {
    fn new(
        target: &EventTarget,
        event: &'static str,
        handler: impl FnMut(Event) + 'static,
    ) -> Result<Self, JsValue> {
        let callback = Closure::<dyn FnMut(Event)>::new(handler);
        target.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())?;
        Ok(DomListener {
            target: target.clone(),
            event,
            callback,
        })
    }
}

impl Drop for DomListener {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.event, self.callback.as_ref().unchecked_ref());
    }
}

/// A jQuery-bound handler, unbound on drop.
struct JQueryListener {
    target: JQuery,
    events: String,
    callback: Closure<dyn FnMut(JsValue)>,
}

impl Drop for JQueryListener {
    fn drop(&mut self) {
        self.target
            .off(&self.events, self.callback.as_ref().unchecked_ref());
    }
}

/// Every listener the controller needs on the page.
pub struct PageBinding {
    listeners: Vec<DomListener>,
    jquery: Option<JQueryListener>,
}

impl PageBinding {
    pub fn attach<L>(controller: &CheckoutController<DomCheckoutPage, L>) -> Result<Self, JsValue>
    where
        L: WidgetLoader + 'static,
    {
        let page = controller.page();
        let mut listeners = Vec::new();

        if let Some(input) = &page.card_holder {
            let ctl = controller.clone();
            listeners.push(DomListener::new(input.as_ref(), "input", move |_| {
                ctl.on_card_holder_input();
            })?);
        }

        if let Some(input) = &page.expiry {
            let ctl = controller.clone();
            listeners.push(DomListener::new(input.as_ref(), "input", move |_| {
                ctl.on_expiry_input();
            })?);
        }

        // Delegated: the payment-method list is re-rendered on every checkout refresh.
        let ctl = controller.clone();
        let method_name = page.selectors.payment_method_name.clone();
        listeners.push(DomListener::new(page.document.as_ref(), "change", move |event| {
            let is_method_radio = event
                .target()
                .and_then(|t| t.dyn_into::<HtmlInputElement>().ok())
                .is_some_and(|input| input.name() == method_name);
            if is_method_radio {
                ctl.on_payment_method_change();
            }
        })?);

        let ctl = controller.clone();
        listeners.push(DomListener::new(page.form.as_ref(), "submit", move |event| {
            if ctl.on_form_submit() == SubmitDecision::Cancel {
                event.prevent_default();
                event.stop_immediate_propagation();
            }
        })?);

        let ctl = controller.clone();
        listeners.push(DomListener::new(page.place_order.as_ref(), "click", move |event| {
            match ctl.on_place_order_click() {
                ClickAction::PassThrough => {}
                ClickAction::Swallow => event.prevent_default(),
                ClickAction::Tokenize(tokenize) => {
                    event.prevent_default();
                    event.stop_immediate_propagation();
                    spawn_local(tokenize);
                }
            }
        })?);

        let body: Option<EventTarget> = page.document.body().map(Into::into);
        let mut jquery_listener = None;
        if let Some(body) = body {
            match jquery_for(&body) {
                Some(target) => {
                    let ctl = controller.clone();
                    let callback = Closure::<dyn FnMut(JsValue)>::new(move |_: JsValue| {
                        ctl.on_checkout_updated();
                    });
                    let events = CHECKOUT_EVENTS.join(" ");
                    target.on(&events, callback.as_ref().unchecked_ref());
                    jquery_listener = Some(JQueryListener {
                        target,
                        events,
                        callback,
                    });
                }
                None => {
                    for event in CHECKOUT_EVENTS {
                        let ctl = controller.clone();
                        listeners.push(DomListener::new(&body, event, move |_| {
                            ctl.on_checkout_updated();
                        })?);
                    }
                }
            }
        }

        Ok(PageBinding {
            listeners,
            jquery: jquery_listener,
        })
    }

    /// Remove every listener registered by `attach`. Dropping the binding does the same.
    pub fn detach(self) {
        let PageBinding {
            listeners,
            jquery: jquery_listener,
        } = self;
        drop(jquery_listener);
        drop(listeners);
    }
}

/// `jQuery(target)`, when the host page loads jQuery.
fn jquery_for(target: &JsValue) -> Option<JQuery> {
    let window = web_sys::window()?;
    let has_jquery = Reflect::get(&window, &JsValue::from_str("jQuery"))
        .map(|f| f.is_function())
        .unwrap_or(false);
    if !has_jquery {
        return None;
    }
    jquery(target).ok()
}

/// A controller bound to the live page.
pub struct MountedForm {
    controller: CheckoutController<DomCheckoutPage, BrowserLoader>,
    binding: PageBinding,
}

impl MountedForm {
    pub fn controller(&self) -> &CheckoutController<DomCheckoutPage, BrowserLoader> {
        &self.controller
    }

    /// Detach all listeners. The widget is released with the last controller handle.
    pub fn unmount(self) {
        self.binding.detach();
    }
}

/// Wire the controller into the current document and start the bootstrap.
///
/// Returns `Ok(None)` when no integration key is configured.
pub fn mount_form(config: SessionConfig) -> Result<Option<MountedForm>, MountError> {
    if !config.is_enabled() {
        log::info!("no integration key, seamless payment form disabled");
        return Ok(None);
    }

    let document = web_sys::window()
        .and_then(|win| win.document())
        .ok_or_else(|| MountError("document".into()))?;
    let page = DomCheckoutPage::locate(document, config.selectors.clone())?;
    let loader = BrowserLoader::new(config.selectors.script_marker.clone());
    let controller = CheckoutController::new(config, page, loader);

    let binding = PageBinding::attach(&controller).map_err(|e| {
        log::error!("could not attach checkout listeners: {e:?}");
        MountError("listeners".into())
    })?;

    let ctl = controller.clone();
    spawn_local(async move { ctl.bootstrap().await });

    Ok(Some(MountedForm {
        controller,
        binding,
    }))
}

/// Run `f` once the DOM is parsed.
pub fn on_document_ready(f: impl FnOnce() + 'static) {
    let Some(document) = web_sys::window().and_then(|win| win.document()) else {
        return;
    };
    let loading = Reflect::get(&document, &JsValue::from_str("readyState"))
        .ok()
        .and_then(|state| state.as_string())
        .is_some_and(|state| state == "loading");
    if !loading {
        f();
        return;
    }

    let callback = Closure::once_into_js(f);
    if let Err(e) = document
        .add_event_listener_with_callback("DOMContentLoaded", callback.unchecked_ref::<Function>())
    {
        log::error!("could not wait for DOMContentLoaded: {e:?}");
    }
}
