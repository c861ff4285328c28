//! Page-injected configuration for the seamless payment form.
//!
//! The host page exposes `window.tillPaymentsInlineConfig`:
//!
//! ```js
//! window.tillPaymentsInlineConfig = {
//!     integrationKey: "...",
//!     gatewayId: "till_payments",
//!     selectors: { placeOrder: "place_order" }, // optional overrides
//! };
//! ```

use std::time::Duration;

use serde::{Deserialize, Deserializer};
use wasm_bindgen::JsValue;
use web_sys::js_sys::Reflect;

/// Name of the page global holding the configuration object.
pub const CONFIG_GLOBAL: &str = "tillPaymentsInlineConfig";

/// Protocol version passed to the `PaymentJs` constructor.
pub const PROTOCOL_VERSION: &str = "1.3";

/// Immutable session configuration, read once at startup.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    /// Opaque integration credential. Without it the feature is disabled.
    pub integration_key: Option<String>,
    /// Value of this gateway's payment-method radio. Empty means always active.
    #[serde(deserialize_with = "null_as_default")]
    pub gateway_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub selectors: PageSelectors,
}

/// Page scripts write `null` for unset values; treat it like an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl SessionConfig {
    /// Read `window.tillPaymentsInlineConfig`; a missing global yields defaults.
    pub fn from_window() -> Result<Self, serde_wasm_bindgen::Error> {
        let raw = web_sys::window()
            .and_then(|win| Reflect::get(&win, &JsValue::from_str(CONFIG_GLOBAL)).ok())
            .unwrap_or(JsValue::UNDEFINED);
        Self::from_js(raw)
    }

    pub fn from_js(raw: JsValue) -> Result<Self, serde_wasm_bindgen::Error> {
        if raw.is_undefined() || raw.is_null() {
            return Ok(Self::default());
        }
        serde_wasm_bindgen::from_value(raw)
    }

    /// The credential, if one is configured and not blank.
    pub fn integration_key(&self) -> Option<&str> {
        self.integration_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn is_enabled(&self) -> bool {
        self.integration_key().is_some()
    }

    /// The gateway id, or `None` when this form is not tied to a radio.
    pub fn gateway_id(&self) -> Option<&str> {
        Some(self.gateway_id.trim()).filter(|id| !id.is_empty())
    }
}

/// Element ids and selectors making up the DOM contract.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageSelectors {
    pub seamless_form: String,
    pub token_input: String,
    pub errors: String,
    pub loader: String,
    pub card_holder: String,
    pub expiry: String,
    pub card_number: String,
    pub cvv: String,
    pub place_order: String,
    pub billing_email: String,
    pub payment_method_name: String,
    pub payment_box_class: String,
    pub script_marker: String,
}

impl Default for PageSelectors {
    fn default() -> Self {
        PageSelectors {
            seamless_form: "till_payments_seamless".into(),
            token_input: "till_payments_token".into(),
            errors: "till_payments_errors".into(),
            loader: "till_payments_loader".into(),
            card_holder: "till_payments_seamless_card_holder".into(),
            expiry: "till_payments_seamless_expiry".into(),
            card_number: "till_payments_seamless_card_number".into(),
            cvv: "till_payments_seamless_cvv".into(),
            place_order: "place_order".into(),
            billing_email: "billing_email".into(),
            payment_method_name: "payment_method".into(),
            payment_box_class: "payment_box".into(),
            script_marker: r#"[data-main="payment-js"]"#.into(),
        }
    }
}

/// Bounded-retry schedule for the widget loader.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        PollPolicy {
            interval: Duration::from_millis(100),
            max_attempts: 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn blank_key_disables_the_form() {
        let config = SessionConfig {
            integration_key: Some("   ".into()),
            ..Default::default()
        };
        assert!(!config.is_enabled());
        assert!(!SessionConfig::default().is_enabled());

        let config = SessionConfig {
            integration_key: Some(" key-123 ".into()),
            ..Default::default()
        };
        assert_eq!(config.integration_key(), Some("key-123"));
    }

    #[test]
    fn empty_gateway_means_always_active() {
        assert_eq!(SessionConfig::default().gateway_id(), None);
        let config = SessionConfig {
            gateway_id: "till_payments".into(),
            ..Default::default()
        };
        assert_eq!(config.gateway_id(), Some("till_payments"));
    }

    #[test]
    fn deserialises_camel_case_with_partial_selectors() {
        let config: SessionConfig = serde_json::from_str(
            r#"{"integrationKey":"abc","gatewayId":"till","selectors":{"placeOrder":"submit_btn"}}"#,
        )
        .unwrap();
        assert_eq!(config.integration_key(), Some("abc"));
        assert_eq!(config.gateway_id(), Some("till"));
        assert_eq!(config.selectors.place_order, "submit_btn");
        assert_eq!(config.selectors.token_input, "till_payments_token");
    }

    #[rstest]
    #[case(r#"{"integrationKey":"abc","gatewayId":null}"#, Some("abc"), None)]
    #[case(r#"{"integrationKey":null,"gatewayId":"till"}"#, None, Some("till"))]
    #[case(r#"{"integrationKey":"abc","gatewayId":null,"selectors":null}"#, Some("abc"), None)]
    #[case(r#"{"integrationKey":"abc"}"#, Some("abc"), None)]
    fn null_fields_fall_back_to_defaults(
        #[case] raw: &str,
        #[case] key: Option<&str>,
        #[case] gateway: Option<&str>,
    ) {
        let config: SessionConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.integration_key(), key);
        assert_eq!(config.gateway_id(), gateway);
        assert_eq!(config.selectors, PageSelectors::default());
    }

    #[test]
    fn default_poll_policy_is_five_seconds() {
        let policy = PollPolicy::default();
        assert_eq!(policy.interval * policy.max_attempts, Duration::from_secs(5));
    }
}
