//! Waiting for the widget script.
//!
//! The `payment.js` tag is injected by the host page with `async`, and there is
//! no load event we can subscribe to from here. Instead we poll for the script's
//! marker element and the `window.PaymentJs` constructor on a fixed schedule and
//! give up after a bounded number of attempts.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use gloo_timers::future::TimeoutFuture;
use wasm_bindgen::JsValue;
use web_sys::js_sys::Reflect;

use crate::bindings::PaymentJs as JsPaymentJs;
use crate::config::{PollPolicy, PROTOCOL_VERSION};
use crate::error::PaymentFormError;
use crate::widget::{PaymentJsWidget, SeamlessWidget};

/// Something that can hand over a ready widget handle.
#[async_trait(?Send)]
pub trait WidgetLoader {
    type Widget: SeamlessWidget;

    async fn load(&self) -> Result<Self::Widget, PaymentFormError>;
}

/// Result of a single availability check.
#[derive(Debug)]
pub enum Probe<W> {
    /// The script marker is not in the document yet.
    Pending,
    /// The marker is present but the library never registered itself.
    LibraryMissing,
    Ready(W),
}

/// Poll `probe` until it yields a widget or the attempt budget runs out.
///
/// `sleep` is awaited between attempts. The probe runs at most
/// `policy.max_attempts + 1` times.
pub async fn await_widget<W, P, S, F>(
    mut probe: P,
    mut sleep: S,
    policy: PollPolicy,
) -> Result<W, PaymentFormError>
where
    P: FnMut() -> Probe<W>,
    S: FnMut(Duration) -> F,
    F: Future<Output = ()>,
{
    let mut attempts = 0;
    loop {
        match probe() {
            Probe::Ready(widget) => {
                log::debug!("payment widget available after {attempts} retries");
                return Ok(widget);
            }
            Probe::LibraryMissing => return Err(PaymentFormError::LibraryUnavailable),
            Probe::Pending if attempts >= policy.max_attempts => {
                return Err(PaymentFormError::ScriptTimeout)
            }
            Probe::Pending => {
                attempts += 1;
                sleep(policy.interval).await;
            }
        }
    }
}

/// Loader for the real page: marker selector plus `window.PaymentJs`.
#[derive(Clone, Debug)]
pub struct BrowserLoader {
    pub marker: String,
    pub policy: PollPolicy,
}

impl BrowserLoader {
    pub fn new(marker: impl Into<String>) -> Self {
        BrowserLoader {
            marker: marker.into(),
            policy: PollPolicy::default(),
        }
    }

    fn probe(&self) -> Probe<PaymentJsWidget> {
        let Some(window) = web_sys::window() else {
            return Probe::Pending;
        };
        let marker_present = window
            .document()
            .and_then(|doc| doc.query_selector(&self.marker).ok().flatten())
            .is_some();
        if !marker_present {
            return Probe::Pending;
        }

        let has_constructor = Reflect::get(&window, &JsValue::from_str("PaymentJs"))
            .map(|ctor| ctor.is_function())
            .unwrap_or(false);
        if !has_constructor {
            return Probe::LibraryMissing;
        }

        match JsPaymentJs::new(PROTOCOL_VERSION) {
            Ok(payment) => Probe::Ready(PaymentJsWidget::new(payment)),
            Err(e) => {
                log::error!("PaymentJs constructor threw: {e:?}");
                Probe::LibraryMissing
            }
        }
    }
}

#[async_trait(?Send)]
impl WidgetLoader for BrowserLoader {
    type Widget = PaymentJsWidget;

    async fn load(&self) -> Result<PaymentJsWidget, PaymentFormError> {
        await_widget(
            || self.probe(),
            |interval| TimeoutFuture::new(interval.as_millis() as u32),
            self.policy,
        )
        .await
    }
}
