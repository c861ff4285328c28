//! Seamless card fields for a WooCommerce-style checkout, in Rust/wasm.
//!
//! Bridges the checkout form to the `payment.js` tokenization widget: keeps the
//! order button disabled until the card details are valid, exchanges them for a
//! token on click, and lets exactly one real submission through with the token
//! attached.

mod bindings;
mod components;
mod config;
mod controller;
mod dom;
mod error;
mod expiry;
mod loader;
mod logging;
mod session;
mod widget;

use std::cell::RefCell;

use wasm_bindgen::prelude::*;

pub use bindings::*;
pub use components::*;
pub use config::*;
pub use controller::*;
pub use dom::{mount_form, on_document_ready, DomCheckoutPage, MountedForm, PageBinding};
pub use error::*;
pub use expiry::{format_expiry, is_expiry_valid, pad_expiry};
pub use loader::*;
pub use logging::init_logging;
pub use session::*;
pub use widget::*;

thread_local! {
    static MOUNTED: RefCell<Option<MountedForm>> = const { RefCell::new(None) };
}

/// Entry point called by the host page once the module is loaded:
///
/// ```js
/// import init, { mountTillPayments } from "./till_seamless.js";
/// await init();
/// mountTillPayments();
/// ```
///
/// Mounts the form once the document is ready. Calling it again replaces the
/// previously mounted form.
#[wasm_bindgen(js_name = mountTillPayments)]
pub fn mount() {
    console_error_panic_hook::set_once();
    init_logging(log::LevelFilter::Info);
    on_document_ready(mount_from_window);
}

fn mount_from_window() {
    let config = match SessionConfig::from_window() {
        Ok(config) => config,
        Err(e) => {
            log::error!("invalid {CONFIG_GLOBAL}: {e}");
            return;
        }
    };

    match mount_form(config) {
        Ok(Some(form)) => {
            MOUNTED.with(|slot| {
                if let Some(previous) = slot.borrow_mut().replace(form) {
                    previous.unmount();
                }
            });
        }
        Ok(None) => {}
        Err(e) => log::info!("seamless payment form not mounted: {e}"),
    }
}

/// Detach the mounted form's listeners, e.g. before the host re-renders it.
#[wasm_bindgen(js_name = unmountTillPayments)]
pub fn unmount() {
    if let Some(form) = MOUNTED.with(|slot| slot.borrow_mut().take()) {
        form.unmount();
    }
}

/// Mount again after the host replaced the checkout markup.
#[wasm_bindgen(js_name = remountTillPayments)]
pub fn remount() {
    unmount();
    mount_from_window();
}
