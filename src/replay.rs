//! Replay button for an animated image or a media element.

use log::debug;
use std::cell::RefCell;
use std::fmt;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{Element, Event, HtmlMediaElement};

#[derive(Debug)]
pub enum ReplayError {
    MissingElement(String),
    Dom(String),
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayError::MissingElement(id) => write!(f, "No element with id '{}'", id),
            ReplayError::Dom(e) => write!(f, "DOM operation failed: {}", e),
        }
    }
}

impl std::error::Error for ReplayError {}

impl From<JsValue> for ReplayError {
    fn from(value: JsValue) -> Self {
        ReplayError::Dom(format!("{:?}", value))
    }
}

/// How a replay restarts its target.
enum ReplayTarget {
    /// `<video>` / `<audio>`: rewind and play.
    Media(HtmlMediaElement),
    /// Anything else (an animated GIF): swap in a fresh clone so the browser
    /// restarts the animation. The handle follows the clone.
    Image(RefCell<Element>),
}

impl ReplayTarget {
    fn from_element(element: Element) -> Self {
        match element.dyn_into::<HtmlMediaElement>() {
            Ok(media) => ReplayTarget::Media(media),
            Err(element) => ReplayTarget::Image(RefCell::new(element)),
        }
    }

    fn replay(&self) -> Result<(), ReplayError> {
        match self {
            ReplayTarget::Media(media) => {
                media.set_current_time(0.0);
                let playing = media.play()?;
                spawn_local(async move {
                    if let Err(e) = await_playback(playing).await {
                        debug!("Playback refused: {}", e);
                    }
                });
            }
            ReplayTarget::Image(slot) => {
                let current = slot.borrow().clone();
                let fresh: Element = current
                    .clone_node_with_deep(true)?
                    .dyn_into()
                    .map_err(JsValue::from)?;
                current.replace_with_with_node_1(&fresh)?;
                *slot.borrow_mut() = fresh;
            }
        }
        Ok(())
    }
}

/// Wait for a `play()` promise to settle.
///
/// Autoplay restrictions reject it; awaiting turns that into an error here
/// rather than an unhandled rejection in the console.
pub async fn await_playback(playing: js_sys::Promise) -> Result<(), ReplayError> {
    JsFuture::from(playing).await?;
    Ok(())
}

/// Restart the element `media_id` whenever `button_id` is clicked.
pub fn install(media_id: &str, button_id: &str) -> Result<(), ReplayError> {
    let document = gloo_utils::document();
    let media = document
        .get_element_by_id(media_id)
        .ok_or_else(|| ReplayError::MissingElement(media_id.to_string()))?;
    let button = document
        .get_element_by_id(button_id)
        .ok_or_else(|| ReplayError::MissingElement(button_id.to_string()))?;

    let target = ReplayTarget::from_element(media);
    let click_cb = Closure::wrap(Box::new(move |_event: Event| {
        if let Err(e) = target.replay() {
            debug!("Replay failed: {}", e);
        }
    }) as Box<dyn FnMut(_)>);
    button.add_event_listener_with_callback("click", click_cb.as_ref().unchecked_ref())?;
    click_cb.forget();

    Ok(())
}
