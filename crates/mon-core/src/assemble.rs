//! Response assembly: normalizing raw handler results.

use mon_model::{Reply, Response};

/// Normalize a raw handler reply into a wire-ready response.
///
/// A built response passes through unchanged; structured data becomes a 200
/// JSON response; any scalar becomes a 200 response carrying its string
/// form. The same rules apply whether the reply came from a closure, a
/// controller action, or the wildcard fallback handler.
#[must_use]
pub fn normalize(reply: Reply) -> Response {
    match reply {
        Reply::Response(response) => response,
        Reply::Json(value) => Response::json_value(&value),
        Reply::Text(text) => Response::html(text),
    }
}
