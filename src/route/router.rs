use std::{any::Any, panic::AssertUnwindSafe, sync::Arc};

use fnv::FnvHashMap;
use futures_util::FutureExt;

use super::{
    config::MuxConfig,
    internal::{
        path::clean_path,
        pattern::expand_optional,
        radix_tree::{Lookup, RadixTree},
    },
    router_mount::Mount,
};
use crate::{
    endpoint::BoxEndpoint,
    error::RouteError,
    http::{
        header::{self, HeaderValue},
        Method, StatusCode,
    },
    Endpoint, EndpointExt, Error, IntoResponse, Middleware, Request, Response, Result,
};

/// The method that matches requests of any method with no route of their
/// own.
pub const METHOD_WILD: &str = "*";

const STANDARD_METHODS: [Method; 9] = [
    Method::GET,
    Method::HEAD,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::CONNECT,
    Method::OPTIONS,
    Method::TRACE,
];

const WILD_INDEX: usize = STANDARD_METHODS.len();

type MiddlewareFn = Arc<dyn Fn(BoxEndpoint) -> BoxEndpoint + Send + Sync>;
type ErrorSink = Arc<dyn Fn(Error) -> Response + Send + Sync>;
type PanicSink = Arc<dyn Fn(Box<dyn Any + Send>) -> Response + Send + Sync>;

fn parse_method(method: &str) -> Result<Method, RouteError> {
    if method.is_empty() {
        return Err(RouteError::EmptyMethod);
    }
    Method::from_bytes(method.as_bytes()).map_err(|_| RouteError::InvalidMethod(method.to_string()))
}

fn is_wild(method: &Method) -> bool {
    method.as_str() == METHOD_WILD
}

fn default_panic_handler(err: Box<dyn Any + Send>) -> Response {
    let message = if let Some(message) = err.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = err.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    };
    tracing::error!(message = %message, "request handler panicked");
    StatusCode::INTERNAL_SERVER_ERROR.into()
}

/// Routes the result of the handler through the error sink.
struct ErrorSinkEndpoint {
    inner: BoxEndpoint,
    on_error: ErrorSink,
}

#[async_trait::async_trait]
impl Endpoint for ErrorSinkEndpoint {
    async fn call(&self, req: Request) -> Result<Response> {
        match self.inner.call(req).await {
            Ok(resp) => Ok(resp),
            Err(err) => Ok((self.on_error)(err)),
        }
    }
}

/// Everything a route is built from, kept so that [`Mux::merge`] can
/// rebuild it under another router.
#[derive(Clone)]
struct RouteEntry {
    endpoint: Arc<dyn Endpoint>,
    mount: Option<Mount>,
    middleware: Vec<MiddlewareFn>,
    on_error: ErrorSink,
}

impl RouteEntry {
    fn compose(&self) -> Arc<dyn Endpoint> {
        let ep = match &self.mount {
            Some(mount) => mount.wrap(self.endpoint.clone()),
            None => self.endpoint.clone().boxed(),
        };
        let ep = self.middleware.iter().fold(ep, |ep, middleware| middleware(ep));
        Arc::new(ErrorSinkEndpoint {
            inner: ep,
            on_error: self.on_error.clone(),
        })
    }
}

struct Handler {
    entry: RouteEntry,
    ep: Arc<dyn Endpoint>,
}

impl From<RouteEntry> for Handler {
    fn from(entry: RouteEntry) -> Self {
        let ep = entry.compose();
        Self { entry, ep }
    }
}

/// An HTTP request multiplexer.
///
/// Routes are kept in one radix tree per method. A request is matched
/// against the tree of its own method first and against the tree of
/// [`METHOD_WILD`] after that. When neither has a route the mux tries, in
/// order, a trailing slash redirect, a fixed path redirect, an automatic
/// `OPTIONS` answer and a `405 METHOD NOT ALLOWED` answer before giving up
/// with the not found handler.
///
/// # Example
///
/// ```
/// use radix_mux::{handler, http::StatusCode, route::Mux, test::TestClient, web::Path};
///
/// #[handler]
/// fn hello(Path(name): Path<String>) -> String {
///     format!("hello: {}", name)
/// }
///
/// let mut mux = Mux::new();
/// mux.get("/hello/{name}", hello).unwrap();
/// let cli = TestClient::new(mux);
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let resp = cli.get("/hello/steve").send().await;
/// resp.assert_status_is_ok();
/// resp.assert_text("hello: steve").await;
///
/// let resp = cli.get("/Hello/steve").send().await;
/// resp.assert_status(StatusCode::MOVED_PERMANENTLY);
/// resp.assert_header("location", "/hello/steve");
/// # });
/// ```
pub struct Mux {
    trees: Vec<Option<RadixTree<Handler>>>,
    custom_methods: FnvHashMap<Method, usize>,
    registered: Vec<(Method, Vec<String>)>,
    global_allowed: Vec<Method>,
    config: MuxConfig,
    middleware: Vec<MiddlewareFn>,
    not_found: Arc<dyn Endpoint>,
    method_not_allowed: Arc<dyn Endpoint>,
    global_options: Option<Arc<dyn Endpoint>>,
    on_error: ErrorSink,
    on_panic: Option<PanicSink>,
}

impl Default for Mux {
    fn default() -> Self {
        Self::new()
    }
}

impl Mux {
    /// Create a new mux with the default configuration.
    pub fn new() -> Self {
        Self::with_config(MuxConfig::default())
    }

    /// Create a new mux with the specified configuration.
    pub fn with_config(config: MuxConfig) -> Self {
        Self {
            trees: std::iter::repeat_with(|| None)
                .take(WILD_INDEX + 1)
                .collect(),
            custom_methods: FnvHashMap::default(),
            registered: Vec::new(),
            global_allowed: Vec::new(),
            config,
            middleware: Vec::new(),
            not_found: Arc::new(crate::endpoint::make_sync(|_| StatusCode::NOT_FOUND)),
            method_not_allowed: Arc::new(crate::endpoint::make_sync(|_| {
                StatusCode::METHOD_NOT_ALLOWED
            })),
            global_options: None,
            on_error: Arc::new(|err: Error| err.as_response()),
            on_panic: Some(Arc::new(default_panic_handler)),
        }
    }

    /// Returns the configuration of this mux.
    pub fn config(&self) -> &MuxConfig {
        &self.config
    }

    /// Appends a middleware.
    ///
    /// Middleware apply to routes registered after this call only. The first
    /// middleware registered is the innermost one.
    pub fn pre<M>(&mut self, middleware: M)
    where
        M: Middleware<BoxEndpoint> + Send + Sync + 'static,
    {
        self.middleware
            .push(Arc::new(move |ep| middleware.transform(ep).boxed()));
    }

    /// Sets the sink for errors returned by handlers.
    ///
    /// Like middleware, the sink is captured by every route when it is
    /// registered.
    pub fn on_error<F>(&mut self, f: F)
    where
        F: Fn(Error) -> Response + Send + Sync + 'static,
    {
        self.on_error = Arc::new(f);
    }

    /// Sets the handler for panics raised while serving a request.
    pub fn on_panic<F>(&mut self, f: F)
    where
        F: Fn(Box<dyn Any + Send>) -> Response + Send + Sync + 'static,
    {
        self.on_panic = Some(Arc::new(f));
    }

    /// Stop catching panics, they unwind through the mux instead.
    pub fn disable_panic_handler(&mut self) {
        self.on_panic = None;
    }

    /// Sets the endpoint called when nothing matches.
    pub fn not_found(&mut self, ep: impl Endpoint) {
        self.not_found = Arc::new(ep);
    }

    /// Sets the endpoint called when the path is registered for other
    /// methods only. The `Allow` header is added to its response unless it
    /// sets one itself.
    pub fn method_not_allowed(&mut self, ep: impl Endpoint) {
        self.method_not_allowed = Arc::new(ep);
    }

    /// Sets the endpoint answering automatic `OPTIONS` requests. The `Allow`
    /// header is added to its response unless it sets one itself.
    pub fn global_options(&mut self, ep: impl Endpoint) {
        self.global_options = Some(Arc::new(ep));
    }

    /// Registers an endpoint for the method and pattern.
    ///
    /// Use [`METHOD_WILD`] to match any method. Optional parameters are
    /// expanded into one route per resulting pattern.
    pub fn handle(
        &mut self,
        method: &str,
        pattern: &str,
        ep: impl Endpoint,
    ) -> Result<(), RouteError> {
        let method = parse_method(method)?;
        let entry = self.entry(Arc::new(ep), None);
        self.register(method, pattern, entry)
    }

    pub(super) fn handle_mount(
        &mut self,
        pattern: &str,
        strip: &str,
        ep: impl Endpoint,
    ) -> Result<(), RouteError> {
        let mount = Mount {
            strip: strip.to_string(),
            not_found: self.not_found.clone(),
        };
        let entry = self.entry(Arc::new(ep), Some(mount));
        self.register(parse_method(METHOD_WILD)?, pattern, entry)
    }

    /// Registers an endpoint for `GET` requests.
    pub fn get(&mut self, pattern: &str, ep: impl Endpoint) -> Result<(), RouteError> {
        self.handle(Method::GET.as_str(), pattern, ep)
    }

    /// Registers an endpoint for `HEAD` requests.
    pub fn head(&mut self, pattern: &str, ep: impl Endpoint) -> Result<(), RouteError> {
        self.handle(Method::HEAD.as_str(), pattern, ep)
    }

    /// Registers an endpoint for `POST` requests.
    pub fn post(&mut self, pattern: &str, ep: impl Endpoint) -> Result<(), RouteError> {
        self.handle(Method::POST.as_str(), pattern, ep)
    }

    /// Registers an endpoint for `PUT` requests.
    pub fn put(&mut self, pattern: &str, ep: impl Endpoint) -> Result<(), RouteError> {
        self.handle(Method::PUT.as_str(), pattern, ep)
    }

    /// Registers an endpoint for `PATCH` requests.
    pub fn patch(&mut self, pattern: &str, ep: impl Endpoint) -> Result<(), RouteError> {
        self.handle(Method::PATCH.as_str(), pattern, ep)
    }

    /// Registers an endpoint for `DELETE` requests.
    pub fn delete(&mut self, pattern: &str, ep: impl Endpoint) -> Result<(), RouteError> {
        self.handle(Method::DELETE.as_str(), pattern, ep)
    }

    /// Registers an endpoint for `CONNECT` requests.
    pub fn connect(&mut self, pattern: &str, ep: impl Endpoint) -> Result<(), RouteError> {
        self.handle(Method::CONNECT.as_str(), pattern, ep)
    }

    /// Registers an endpoint for `OPTIONS` requests.
    pub fn options(&mut self, pattern: &str, ep: impl Endpoint) -> Result<(), RouteError> {
        self.handle(Method::OPTIONS.as_str(), pattern, ep)
    }

    /// Registers an endpoint for `TRACE` requests.
    pub fn trace(&mut self, pattern: &str, ep: impl Endpoint) -> Result<(), RouteError> {
        self.handle(Method::TRACE.as_str(), pattern, ep)
    }

    /// Registers an endpoint for requests of any method that have no route
    /// of their own.
    pub fn any(&mut self, pattern: &str, ep: impl Endpoint) -> Result<(), RouteError> {
        self.handle(METHOD_WILD, pattern, ep)
    }

    /// Returns the registered patterns grouped by method, in registration
    /// order. Optional parameters appear expanded.
    pub fn list(&self) -> impl Iterator<Item = (&Method, &[String])> {
        self.registered
            .iter()
            .map(|(method, patterns)| (method, patterns.as_slice()))
    }

    /// Copies every route of `other` under `prefix`.
    ///
    /// Each route keeps the error sink it was registered with. Its
    /// middleware run as if this mux's middleware had been registered
    /// first, so the middleware of `other` sit outside them. A route for `/`
    /// is registered at the bare prefix. Mounted endpoints keep seeing
    /// their path with the whole new prefix stripped.
    pub fn merge(&mut self, prefix: &str, other: Mux) -> Result<(), RouteError> {
        for (method, patterns) in &other.registered {
            let tree = match other.tree(method) {
                Some(tree) => tree,
                None => continue,
            };

            for pattern in patterns {
                let route = match tree.route(pattern) {
                    Some(route) => route,
                    None => continue,
                };
                let full = if !prefix.is_empty() && pattern == "/" {
                    prefix.to_string()
                } else {
                    format!("{}{}", prefix, pattern)
                };
                let source = &route.data.entry;
                let entry = RouteEntry {
                    endpoint: source.endpoint.clone(),
                    mount: source.mount.as_ref().map(|mount| Mount {
                        strip: format!("{}{}", prefix, mount.strip),
                        not_found: mount.not_found.clone(),
                    }),
                    middleware: self
                        .middleware
                        .iter()
                        .chain(&source.middleware)
                        .cloned()
                        .collect(),
                    on_error: source.on_error.clone(),
                };
                self.register(method.clone(), &full, entry)?;
            }
        }
        Ok(())
    }

    /// Swaps the endpoint of an already registered route.
    ///
    /// Only available when the mux was created with
    /// [`MuxConfig::mutable`] set. The new endpoint is composed with the
    /// current middleware and error sink.
    pub fn replace(&self, method: &str, pattern: &str, ep: impl Endpoint) -> Result<(), RouteError> {
        if !self.config.mutable {
            return Err(RouteError::NotMutable);
        }

        let method = parse_method(method)?;
        let not_found = || RouteError::RouteNotFound {
            method: method.to_string(),
            path: pattern.to_string(),
        };
        let tree = self.tree(&method).ok_or_else(not_found)?;
        let entry = self.entry(Arc::new(ep), None);

        let patterns = expand_optional(pattern);
        if patterns
            .iter()
            .any(|concrete| tree.route(concrete).is_none())
        {
            return Err(not_found());
        }
        for concrete in &patterns {
            if !tree.replace(concrete, entry.clone().into())? {
                return Err(not_found());
            }
        }

        tracing::debug!(method = %method, pattern = %pattern, "route replaced");
        Ok(())
    }

    fn entry(&self, endpoint: Arc<dyn Endpoint>, mount: Option<Mount>) -> RouteEntry {
        RouteEntry {
            endpoint,
            mount,
            middleware: self.middleware.clone(),
            on_error: self.on_error.clone(),
        }
    }

    fn register(
        &mut self,
        method: Method,
        pattern: &str,
        entry: RouteEntry,
    ) -> Result<(), RouteError> {
        if !pattern.starts_with('/') {
            return Err(RouteError::InvalidPath(pattern.to_string()));
        }

        let index = self.tree_index(&method);
        let mutable = self.config.mutable;
        let tree = self.trees[index].get_or_insert_with(|| RadixTree::new(mutable));

        let patterns = expand_optional(pattern);
        for concrete in &patterns {
            tree.check(concrete)?;
        }
        for concrete in &patterns {
            tree.add(concrete, entry.clone().into())?;
        }

        let is_new_method = match self.registered.iter_mut().find(|(m, _)| *m == method) {
            Some((_, registered)) => {
                for concrete in patterns {
                    if !registered.contains(&concrete) {
                        registered.push(concrete);
                    }
                }
                false
            }
            None => {
                self.registered.push((method.clone(), patterns));
                true
            }
        };
        if is_new_method {
            self.global_allowed = self.compute_global_allowed();
        }

        tracing::debug!(method = %method, pattern = %pattern, "route registered");
        Ok(())
    }

    fn method_index(&self, method: &Method) -> Option<usize> {
        if is_wild(method) {
            return Some(WILD_INDEX);
        }
        STANDARD_METHODS
            .iter()
            .position(|standard| standard == method)
            .or_else(|| self.custom_methods.get(method).copied())
    }

    fn tree_index(&mut self, method: &Method) -> usize {
        match self.method_index(method) {
            Some(index) => index,
            None => {
                self.trees.push(None);
                let index = self.trees.len() - 1;
                self.custom_methods.insert(method.clone(), index);
                index
            }
        }
    }

    fn tree(&self, method: &Method) -> Option<&RadixTree<Handler>> {
        self.trees.get(self.method_index(method)?)?.as_ref()
    }

    fn compute_global_allowed(&self) -> Vec<Method> {
        let methods = self
            .registered
            .iter()
            .map(|(method, _)| method)
            .filter(|method| **method != Method::OPTIONS && !is_wild(method))
            .cloned()
            .collect();
        with_options(methods)
    }

    /// The methods other than `req_method` with a route for `path`.
    fn allowed(&self, path: &str, req_method: &Method) -> Vec<Method> {
        if path == "*" || path == "/*" {
            return self.global_allowed.clone();
        }

        let methods = self
            .registered
            .iter()
            .map(|(method, _)| method)
            .filter(|method| {
                *method != req_method && **method != Method::OPTIONS && !is_wild(method)
            })
            .filter(|method| {
                self.tree(method)
                    .map_or(false, |tree| matches!(tree.get(path), Lookup::Matched(_)))
            })
            .cloned()
            .collect();
        with_options(methods)
    }

    fn try_redirect(
        &self,
        tree: &RadixTree<Handler>,
        tsr: bool,
        req: &Request,
    ) -> Option<Response> {
        let path = req.uri().path();
        let status = if req.method() == Method::GET {
            StatusCode::MOVED_PERMANENTLY
        } else {
            StatusCode::PERMANENT_REDIRECT
        };

        if tsr && self.config.redirect_trailing_slash {
            let location = match path.strip_suffix('/') {
                Some(path) => path.to_string(),
                None => format!("{}/", path),
            };
            tracing::trace!(path = %path, location = %location, "trailing slash redirect");
            return Some(redirect(status, location, req));
        }

        if self.config.redirect_fixed_path {
            let cleaned = clean_path(path.strip_suffix('.').unwrap_or(path));
            if let Some(location) =
                tree.find_case_insensitive_path(&cleaned, self.config.redirect_trailing_slash)
            {
                tracing::trace!(path = %path, location = %location, "fixed path redirect");
                return Some(redirect(status, location, req));
            }
        }

        None
    }

    async fn dispatch(&self, mut req: Request) -> Result<Response> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let can_redirect = method != Method::CONNECT && path != "/" && path.starts_with('/');

        let mut indices = Vec::with_capacity(2);
        if let Some(index) = self.method_index(&method) {
            indices.push(index);
        }
        if !indices.contains(&WILD_INDEX) {
            indices.push(WILD_INDEX);
        }

        for index in indices {
            let tree = match &self.trees[index] {
                Some(tree) => tree,
                None => continue,
            };

            let tsr = match tree.get(&path) {
                Lookup::Matched(matched) => {
                    tracing::trace!(method = %method, pattern = %matched.route.pattern, "route matched");
                    req.path_params_mut().extend(matched.params);
                    return matched.route.data.ep.call(req).await;
                }
                Lookup::TrailingSlash => true,
                Lookup::NotFound => false,
            };

            if can_redirect {
                if let Some(resp) = self.try_redirect(tree, tsr, &req) {
                    return Ok(resp);
                }
            }
        }

        if method == Method::OPTIONS && self.config.handle_options {
            if let Some(allow) = allow_header(&self.allowed(&path, &method)) {
                tracing::trace!(path = %path, allow = ?allow, "automatic options");
                let mut resp = match &self.global_options {
                    Some(ep) => ep.get_response(req).await,
                    None => Response::default(),
                };
                resp.headers_mut().entry(header::ALLOW).or_insert(allow);
                return Ok(resp);
            }
        } else if self.config.handle_method_not_allowed {
            if let Some(allow) = allow_header(&self.allowed(&path, &method)) {
                tracing::trace!(method = %method, path = %path, allow = ?allow, "method not allowed");
                let mut resp = self.method_not_allowed.get_response(req).await;
                resp.headers_mut().entry(header::ALLOW).or_insert(allow);
                return Ok(resp);
            }
        }

        tracing::trace!(method = %method, path = %path, "not found");
        self.not_found.call(req).await
    }
}

fn with_options(mut methods: Vec<Method>) -> Vec<Method> {
    if !methods.is_empty() {
        methods.push(Method::OPTIONS);
        methods.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    }
    methods
}

fn allow_header(methods: &[Method]) -> Option<HeaderValue> {
    if methods.is_empty() {
        return None;
    }
    let value = methods
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    HeaderValue::from_str(&value).ok()
}

fn redirect(status: StatusCode, mut location: String, req: &Request) -> Response {
    if let Some(query) = req.uri().query() {
        location.push('?');
        location.push_str(query);
    }
    Response::builder()
        .status(status)
        .header(header::LOCATION, location)
        .finish()
}

#[async_trait::async_trait]
impl Endpoint for Mux {
    async fn call(&self, req: Request) -> Result<Response> {
        match &self.on_panic {
            Some(on_panic) => match AssertUnwindSafe(self.dispatch(req)).catch_unwind().await {
                Ok(resp) => resp,
                Err(err) => Ok(on_panic(err).into_response()),
            },
            None => self.dispatch(req).await,
        }
    }
}
