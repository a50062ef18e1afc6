//! Redirects are followed by the client itself rather than by reqwest, so
//! the envelope can report the method and URL of the last request sent.

use reqwest::header::{
    AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, LOCATION, PROXY_AUTHORIZATION,
    WWW_AUTHENTICATE,
};
use reqwest::{Method, Request, StatusCode};

pub(crate) const MAX_REDIRECTS: usize = 10;

/// Copy of a request kept until its response is known.
pub(crate) struct Snapshot {
    request: Request,
    /// False when the body was streamed and cannot be sent twice.
    replayable: bool,
}

impl Snapshot {
    pub(crate) fn of(request: &Request) -> Self {
        match request.try_clone() {
            Some(request) => Self {
                request,
                replayable: true,
            },
            None => {
                let mut bare = Request::new(request.method().clone(), request.url().clone());
                *bare.headers_mut() = request.headers().clone();
                Self {
                    request: bare,
                    replayable: false,
                }
            }
        }
    }
}

/// Builds the follow-up request for a 3xx response, or `None` when the
/// response should be handed back as is.
///
/// 301, 302 and 303 switch any method other than GET and HEAD to GET and drop
/// the body. 307 and 308 resend method and body unchanged, which needs a
/// replayable body. Credentials are not forwarded to another origin.
pub(crate) fn next_request(
    previous: Snapshot,
    status: StatusCode,
    location: Option<&str>,
) -> Option<Request> {
    let Snapshot {
        request: mut next,
        replayable,
    } = previous;
    let target = next.url().join(location?).ok()?;

    match status {
        StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND | StatusCode::SEE_OTHER => {
            if !matches!(*next.method(), Method::GET | Method::HEAD) {
                *next.method_mut() = Method::GET;
            }
            *next.body_mut() = None;
            let headers = next.headers_mut();
            headers.remove(CONTENT_TYPE);
            headers.remove(CONTENT_LENGTH);
        }
        StatusCode::TEMPORARY_REDIRECT | StatusCode::PERMANENT_REDIRECT if replayable => {}
        _ => return None,
    }

    if target.origin() != next.url().origin() {
        let headers = next.headers_mut();
        for sensitive in [AUTHORIZATION, COOKIE, PROXY_AUTHORIZATION, WWW_AUTHENTICATE] {
            headers.remove(sensitive);
        }
    }

    *next.url_mut() = target;
    Some(next)
}

pub(crate) fn location(response: &reqwest::Response) -> Option<&str> {
    response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
}
