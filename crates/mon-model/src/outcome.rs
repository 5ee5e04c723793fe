//! Handler return types.
//!
//! A handler produces a [`HandlerOutcome`]: a normal [`Reply`] that the
//! response assembler normalizes, an explicit [`HandlerOutcome::Jump`]
//! short-circuit carrying a pre-built response (redirects, aborts, and
//! structured results), or an application failure. The jump variant replaces
//! the classic control-flow-via-exception pattern with a tagged union that
//! the pipeline threads through explicitly.

use http::StatusCode;

use crate::response::Response;

/// The raw result of a successful handler invocation, before normalization.
#[derive(Debug)]
pub enum Reply {
    /// An already-built response; passes through the assembler unchanged.
    Response(Response),
    /// Structured data, serialized to JSON with status 200.
    Json(serde_json::Value),
    /// A scalar result, sent as the string form with status 200.
    Text(String),
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}

impl From<serde_json::Value> for Reply {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

/// What a handler invocation produced.
#[derive(Debug)]
pub enum HandlerOutcome {
    /// A normal result; flows through the response assembler and any
    /// middleware post-processing.
    Reply(Reply),
    /// A non-local return carrying a pre-built response. Short-circuits the
    /// pipeline: middleware post-processing is skipped and the response is
    /// sent verbatim. Not an error; never reported.
    Jump(Response),
    /// An application failure, reported and rendered by the exception
    /// handler.
    Fail(anyhow::Error),
}

impl HandlerOutcome {
    /// A plain text reply.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Reply(Reply::Text(text.into()))
    }

    /// A structured JSON reply.
    #[must_use]
    pub fn json(value: serde_json::Value) -> Self {
        Self::Reply(Reply::Json(value))
    }

    /// A fully-built response reply.
    #[must_use]
    pub fn response(response: Response) -> Self {
        Self::Reply(Reply::Response(response))
    }

    /// Short-circuit with a redirect to the given location.
    #[must_use]
    pub fn redirect(location: &str) -> Self {
        Self::Jump(Response::redirect(location))
    }

    /// Short-circuit with the given status and body.
    #[must_use]
    pub fn abort(status: StatusCode, body: impl Into<String>) -> Self {
        Self::Jump(
            Response::new(status)
                .with_header("content-type", "text/html; charset=utf-8")
                .with_body(body.into()),
        )
    }

    /// Short-circuit with an arbitrary pre-built response.
    #[must_use]
    pub fn jump(response: Response) -> Self {
        Self::Jump(response)
    }

    /// An application failure.
    #[must_use]
    pub fn fail(error: impl Into<anyhow::Error>) -> Self {
        Self::Fail(error.into())
    }
}

impl From<Reply> for HandlerOutcome {
    fn from(reply: Reply) -> Self {
        Self::Reply(reply)
    }
}

impl From<Response> for HandlerOutcome {
    fn from(response: Response) -> Self {
        Self::Reply(Reply::Response(response))
    }
}

impl From<serde_json::Value> for HandlerOutcome {
    fn from(value: serde_json::Value) -> Self {
        Self::Reply(Reply::Json(value))
    }
}

impl From<anyhow::Error> for HandlerOutcome {
    fn from(error: anyhow::Error) -> Self {
        Self::Fail(error)
    }
}
