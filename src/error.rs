//! Error types surfaced in the payment form's error container.

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Fallback shown when the widget rejects tokenization without a message.
pub const TOKENIZE_FALLBACK_MESSAGE: &str = "Unable to tokenise card details.";

/// Fallback shown when the widget init failure carries no message.
pub const INIT_FALLBACK_MESSAGE: &str = "Card initialisation failed.";

/// Fallback shown when bootstrap fails with an empty error.
pub const BOOTSTRAP_FALLBACK_MESSAGE: &str = "Failed to prepare payment form.";

/// Everything that can go wrong between page load and a tokenized submit.
///
/// None of these are fatal to the page. Loader and init failures leave the
/// order button blocked until reload; `NotReady` and `TokenizationRejected`
/// leave the form re-attemptable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentFormError {
    #[error("Payment script failed to load.")]
    ScriptTimeout,
    #[error("Payment library unavailable.")]
    LibraryUnavailable,
    #[error("{0}")]
    CardInitializationFailed(String),
    #[error("Payment form is not ready yet. Please wait a moment and try again.")]
    NotReady,
    #[error("{}", .0.join(" "))]
    TokenizationRejected(Vec<String>),
}

impl PaymentFormError {
    /// Build an init failure from whatever the widget handed back.
    pub fn init_failed(err: Option<WidgetError>) -> Self {
        let message = err
            .and_then(|e| e.message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| INIT_FALLBACK_MESSAGE.to_string());
        PaymentFormError::CardInitializationFailed(message)
    }

    /// Map the widget's structured tokenize errors to display strings.
    pub fn rejected(errors: Vec<WidgetError>) -> Self {
        let messages = errors
            .into_iter()
            .map(|e| {
                e.message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| TOKENIZE_FALLBACK_MESSAGE.to_string())
            })
            .collect();
        PaymentFormError::TokenizationRejected(messages)
    }

    /// Lines rendered into the error list.
    pub fn messages(&self) -> Vec<String> {
        match self {
            PaymentFormError::TokenizationRejected(messages) => messages.clone(),
            other => vec![other.to_string()],
        }
    }

    /// `true` for failures that leave the order button blocked until reload.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentFormError::ScriptTimeout
                | PaymentFormError::LibraryUnavailable
                | PaymentFormError::CardInitializationFailed(_)
        )
    }
}

/// Representation of a widget error object (`{ message }`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct WidgetError {
    /// Human-readable message, when the widget supplies one.
    #[serde(default, deserialize_with = "text_or_none")]
    pub message: Option<String>,
}

impl WidgetError {
    pub fn new(message: impl Into<String>) -> Self {
        WidgetError { message: Some(message.into()) }
    }

    /// Map each entry of a tokenize failure list on its own, so one malformed
    /// entry does not hide the messages of the others.
    ///
    /// An empty list still yields one (message-less) error.
    pub fn from_entries(entries: Vec<WidgetErrorEntry>) -> Vec<WidgetError> {
        let errors: Vec<WidgetError> = entries.into_iter().map(WidgetError::from).collect();
        if errors.is_empty() {
            vec![WidgetError::default()]
        } else {
            errors
        }
    }
}

/// One element of the widget's error array, as loosely typed as the widget sends it.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WidgetErrorEntry {
    Text(String),
    Object(WidgetError),
    Other(IgnoredAny),
}

impl From<WidgetErrorEntry> for WidgetError {
    fn from(entry: WidgetErrorEntry) -> Self {
        match entry {
            WidgetErrorEntry::Text(message) => WidgetError::new(message),
            WidgetErrorEntry::Object(error) => error,
            WidgetErrorEntry::Other(_) => WidgetError::default(),
        }
    }
}

fn text_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Text {
        Str(String),
        Other(IgnoredAny),
    }

    Ok(match Option::<Text>::deserialize(deserializer)? {
        Some(Text::Str(message)) => Some(message),
        _ => None,
    })
}

/// The host page is missing part of the DOM contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("checkout element `{0}` not found")]
pub struct MountError(pub String);
