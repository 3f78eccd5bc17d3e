use crate::http::encoding::negotiate;
use crate::http::request::{Method, Request};
use crate::http::response::{Response, ResponseBuilder, StatusCode};
use crate::storage::{FileStore, StoreError};

/// How a route matches the request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathMatcher {
    Exact(&'static str),
    /// Matches any path starting with the prefix; the remainder is handed
    /// to the handler.
    Prefix(&'static str),
}

impl PathMatcher {
    /// Returns the unmatched remainder of `path` on success.
    pub fn matches<'p>(&self, path: &'p str) -> Option<&'p str> {
        match self {
            PathMatcher::Exact(expected) => (path == *expected).then_some(""),
            PathMatcher::Prefix(prefix) => path.strip_prefix(prefix),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    Root,
    UserAgent,
    Echo,
    ReadFile,
    WriteFile,
}

#[derive(Debug, Clone)]
pub struct Route {
    /// `None` accepts any method. A GET route also answers HEAD.
    pub method: Option<Method>,
    pub matcher: PathMatcher,
    pub handler: Handler,
}

/// The fixed route table, evaluated in order.
pub const ROUTES: &[Route] = &[
    Route {
        method: None,
        matcher: PathMatcher::Exact("/"),
        handler: Handler::Root,
    },
    Route {
        method: None,
        matcher: PathMatcher::Exact("/user-agent"),
        handler: Handler::UserAgent,
    },
    Route {
        method: None,
        matcher: PathMatcher::Prefix("/echo/"),
        handler: Handler::Echo,
    },
    Route {
        method: Some(Method::GET),
        matcher: PathMatcher::Prefix("/files/"),
        handler: Handler::ReadFile,
    },
    Route {
        method: Some(Method::POST),
        matcher: PathMatcher::Prefix("/files/"),
        handler: Handler::WriteFile,
    },
];

/// Finds the first route accepting `method` and `path`, with the path remainder.
pub fn match_route<'p>(
    routes: &'static [Route],
    method: &Method,
    path: &'p str,
) -> Option<(&'static Route, &'p str)> {
    routes.iter().find_map(|route| {
        if route.method.as_ref().is_some_and(|allowed| !accepts(allowed, method)) {
            return None;
        }
        route.matcher.matches(path).map(|rest| (route, rest))
    })
}

fn accepts(allowed: &Method, method: &Method) -> bool {
    allowed == method || (*allowed == Method::GET && *method == Method::HEAD)
}

/// Dispatches requests over the static route table.
pub struct Router<F> {
    routes: &'static [Route],
    store: F,
}

impl<F: FileStore> Router<F> {
    pub fn new(store: F) -> Self {
        Self {
            routes: ROUTES,
            store,
        }
    }

    /// Produces the response for `req`. Unmatched requests get an empty 404.
    pub async fn dispatch(&self, req: &Request) -> Response {
        let Some((route, rest)) = match_route(self.routes, &req.method, &req.path) else {
            return Response::not_found();
        };

        match route.handler {
            Handler::Root => Response::ok(Vec::new()),
            Handler::UserAgent => Response::ok(req.header("User-Agent").unwrap_or_default()),
            Handler::Echo => echo(req, rest),
            Handler::ReadFile => self.read_file(rest).await,
            Handler::WriteFile => self.write_file(rest, &req.body).await,
        }
    }

    async fn read_file(&self, name: &str) -> Response {
        let found = match self.store.exists(name).await {
            Ok(true) => self.store.read(name).await,
            Ok(false) => Ok(None),
            Err(e) => Err(e),
        };

        match found {
            Ok(Some(contents)) => ResponseBuilder::new(StatusCode::Ok)
                .content_type("application/octet-stream")
                .body(contents)
                .build(),
            Ok(None) => Response::not_found(),
            Err(StoreError::InvalidName(name)) => {
                tracing::debug!(name = %name, "Rejected file name");
                Response::not_found()
            }
            Err(e) => {
                tracing::error!(name = %name, error = %e, "File read failed");
                Response::internal_error()
            }
        }
    }

    async fn write_file(&self, name: &str, body: &[u8]) -> Response {
        match self.store.write(name, body).await {
            Ok(()) => Response::empty(StatusCode::Created),
            Err(StoreError::InvalidName(name)) => {
                tracing::debug!(name = %name, "Rejected file name");
                Response::empty(StatusCode::BadRequest)
            }
            Err(e) => {
                tracing::error!(name = %name, error = %e, "File write failed");
                Response::internal_error()
            }
        }
    }
}

fn echo(req: &Request, value: &str) -> Response {
    let negotiated = negotiate(req.header("Accept-Encoding"), value.as_bytes());

    let mut builder = ResponseBuilder::new(StatusCode::Ok);
    if let Some(coding) = negotiated.encoding {
        builder = builder.header("Content-Encoding", coding.as_str());
    }
    builder.body(negotiated.body).build()
}
