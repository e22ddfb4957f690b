//! Browser wiring: find the guarded form and hook its submit event.

use crate::config::{CONTAINER_SELECTOR, SUBMIT_SELECTOR};
use crate::controller::CooldownController;
use crate::countdown::{BrowserClock, IntervalScheduler};
use crate::storage::browser_store;
use crate::utils::CooldownKeys;
use crate::CooldownPolicy;
use log::warn;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, Event, HtmlButtonElement, HtmlFormElement};

#[derive(Debug)]
pub enum InstallError {
    NoQualifyingForm,
    /// A controller already guards the form behind these storage keys
    AlreadyInstalled(String),
    Location(String),
    Listener(String),
}

impl fmt::Display for InstallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallError::NoQualifyingForm => {
                write!(f, "No valid form-box with submit button found")
            }
            InstallError::AlreadyInstalled(key) => {
                write!(f, "Cooldown already installed for {}", key)
            }
            InstallError::Location(e) => write!(f, "Could not read page path: {}", e),
            InstallError::Listener(e) => write!(f, "Could not attach submit listener: {}", e),
        }
    }
}

impl std::error::Error for InstallError {}

thread_local! {
    /// Attempts keys of every form that already has a controller on this page.
    static INSTALLED: RefCell<HashSet<String>> = RefCell::new(HashSet::new());
}

/// Reserve `keys` for one controller. `false` if another already holds them,
/// since two controllers would count every submit twice.
pub fn claim_keys(keys: &CooldownKeys) -> bool {
    INSTALLED.with(|installed| installed.borrow_mut().insert(keys.attempts.clone()))
}

/// The form under cooldown and the control that gets disabled.
pub struct FormTarget {
    pub form: HtmlFormElement,
    pub button: HtmlButtonElement,
}

/// First `.form-box` in document order that belongs to a form with a
/// submit button.
///
/// The form is looked up around the marker first (the marker sits inside the
/// form) and then beneath it (the marker wraps the form).
pub fn find_form_target(document: &Document) -> Option<FormTarget> {
    let boxes = document.query_selector_all(CONTAINER_SELECTOR).ok()?;
    (0..boxes.length())
        .filter_map(|i| boxes.item(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .find_map(|container| {
            let form = owning_form(&container)?;
            let button = form
                .query_selector(SUBMIT_SELECTOR)
                .ok()
                .flatten()?
                .dyn_into::<HtmlButtonElement>()
                .ok()?;
            Some(FormTarget { form, button })
        })
}

fn owning_form(container: &Element) -> Option<HtmlFormElement> {
    let enclosing = container.closest("form").ok().flatten();
    let form = match enclosing {
        Some(form) => form,
        None => container.query_selector("form").ok().flatten()?,
    };
    form.dyn_into::<HtmlFormElement>().ok()
}

/// Run `setup` once the document has been parsed.
pub fn on_dom_ready<F>(setup: F)
where
    F: FnOnce() + 'static,
{
    let document = gloo_utils::document();
    if document.ready_state() != "loading" {
        setup();
        return;
    }

    let mut pending = Some(setup);
    let ready_cb = Closure::wrap(Box::new(move |_event: Event| {
        if let Some(setup) = pending.take() {
            setup();
        }
    }) as Box<dyn FnMut(_)>);
    if let Err(e) = document
        .add_event_listener_with_callback("DOMContentLoaded", ready_cb.as_ref().unchecked_ref())
    {
        warn!("Could not wait for DOMContentLoaded: {:?}", e);
        return;
    }
    ready_cb.forget();
}

/// Build the controller for this page and hook the form's submit event.
///
/// Resumes a cooldown left running by a previous page load. The submit
/// listener never calls `preventDefault`. Installing twice on the same form
/// is refused.
pub fn install_cooldown() -> Result<(), InstallError> {
    let document = gloo_utils::document();
    let target = find_form_target(&document).ok_or(InstallError::NoQualifyingForm)?;

    let page_path = gloo_utils::window()
        .location()
        .pathname()
        .map_err(|e| InstallError::Location(format!("{:?}", e)))?;
    let keys = CooldownKeys::new(&page_path, &target.form.action());
    if !claim_keys(&keys) {
        return Err(InstallError::AlreadyInstalled(keys.attempts));
    }

    let controller = Rc::new(CooldownController::new(
        browser_store(),
        BrowserClock,
        IntervalScheduler,
        CooldownPolicy::default(),
        keys,
        target.button.clone(),
    ));
    controller.on_page_load();

    let submit_controller = Rc::clone(&controller);
    let submit_cb = Closure::wrap(Box::new(move |_event: Event| {
        submit_controller.on_submit();
    }) as Box<dyn FnMut(_)>);
    target
        .form
        .add_event_listener_with_callback("submit", submit_cb.as_ref().unchecked_ref())
        .map_err(|e| InstallError::Listener(format!("{:?}", e)))?;
    submit_cb.forget();

    Ok(())
}
