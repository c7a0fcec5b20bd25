use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use beacon_core::HandlerFault;
use futures::FutureExt;

/// Awaits a handler future, turning a panic inside it into a [`HandlerFault`].
pub(crate) async fn contain<T, F>(future: F) -> Result<T, HandlerFault>
where
    F: Future<Output = Result<T, HandlerFault>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(HandlerFault::new(format!(
            "handler panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
