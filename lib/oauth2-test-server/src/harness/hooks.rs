use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, PoisonError, RwLock};

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

/// Path of the test-only hook endpoint.
pub const TESTPATH: &str = "/testpath";

/// Boxed future returned by hook handlers.
pub type HookFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

type HookHandler = Arc<dyn Fn(Request) -> HookFuture + Send + Sync>;
type PathPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Which request paths a hook intercepts.
#[derive(Clone)]
pub enum PathMatcher {
    /// The configured authorization endpoint path.
    AuthorizeEndpoint,
    /// One exact path.
    Exact(String),
    /// Any path accepted by the predicate.
    Predicate(PathPredicate),
}

impl PathMatcher {
    /// Matches paths accepted by `predicate`.
    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(predicate))
    }

    fn matches(&self, path: &str, authorize_path: &str) -> bool {
        match self {
            Self::AuthorizeEndpoint => path == authorize_path,
            Self::Exact(expected) => path == expected,
            Self::Predicate(predicate) => predicate(path),
        }
    }
}

impl fmt::Debug for PathMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthorizeEndpoint => write!(f, "AuthorizeEndpoint"),
            Self::Exact(path) => f.debug_tuple("Exact").field(path).finish(),
            Self::Predicate(_) => write!(f, "Predicate(..)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Authorize,
    Testpath,
    Extra,
}

#[derive(Clone)]
struct Hook {
    slot: Slot,
    matcher: PathMatcher,
    handler: HookHandler,
}

/// Request interceptors evaluated before the authorization server routes.
///
/// Hooks are tried in insertion order; the first whose path matches answers the
/// request. Requests no hook matches reach the authorization server.
///
/// The chain is shared with the running server, so hooks can be changed between
/// requests of a started harness.
#[derive(Clone, Default)]
pub struct HookChain {
    hooks: Arc<RwLock<Vec<Hook>>>,
}

impl HookChain {
    /// Intercepts the authorization endpoint, replacing any previous handler.
    pub fn set_on_authorize_endpoint<F, Fut, R>(&self, handler: F)
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        self.set_slot(Slot::Authorize, PathMatcher::AuthorizeEndpoint, handler);
    }

    /// Serves [`TESTPATH`], replacing any previous handler.
    pub fn set_on_testpath_endpoint<F, Fut, R>(&self, handler: F)
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        self.set_slot(Slot::Testpath, PathMatcher::Exact(TESTPATH.to_string()), handler);
    }

    /// Lets the authorization endpoint reach the server again.
    pub fn clear_on_authorize_endpoint(&self) {
        self.write().retain(|hook| hook.slot != Slot::Authorize);
    }

    /// Removes the [`TESTPATH`] handler.
    pub fn clear_on_testpath_endpoint(&self) {
        self.write().retain(|hook| hook.slot != Slot::Testpath);
    }

    /// Appends a hook after the existing ones.
    pub fn add_hook<F, Fut, R>(&self, matcher: PathMatcher, handler: F)
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        let hook = Hook {
            slot: Slot::Extra,
            matcher,
            handler: boxed(handler),
        };
        self.write().push(hook);
    }

    /// Removes every hook.
    pub fn clear(&self) {
        self.write().clear();
    }

    /// Number of registered hooks.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns `true` if no hook is registered.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn set_slot<F, Fut, R>(&self, slot: Slot, matcher: PathMatcher, handler: F)
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        let hook = Hook {
            slot,
            matcher,
            handler: boxed(handler),
        };
        let mut hooks = self.write();
        match hooks.iter_mut().find(|existing| existing.slot == slot) {
            Some(existing) => *existing = hook,
            None => hooks.push(hook),
        }
    }

    fn find(&self, path: &str, authorize_path: &str) -> Option<(PathMatcher, HookHandler)> {
        self.read()
            .iter()
            .find(|hook| hook.matcher.matches(path, authorize_path))
            .map(|hook| (hook.matcher.clone(), Arc::clone(&hook.handler)))
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Hook>> {
        self.hooks.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Hook>> {
        self.hooks.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for HookChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hooks = self.read();
        f.debug_list()
            .entries(hooks.iter().map(|hook| &hook.matcher))
            .finish()
    }
}

fn boxed<F, Fut, R>(handler: F) -> HookHandler
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    Arc::new(move |request: Request| -> HookFuture {
        let response = handler(request);
        Box::pin(async move { response.await.into_response() })
    })
}

/// State of the [`dispatch`] middleware.
#[derive(Debug, Clone)]
pub(crate) struct HookDispatch {
    pub(crate) hooks: HookChain,
    pub(crate) authorize_path: Arc<str>,
}

/// Routes a request to the first matching hook, or to the next service.
pub(crate) async fn dispatch(
    State(dispatch): State<HookDispatch>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    match dispatch.hooks.find(&path, &dispatch.authorize_path) {
        Some((matcher, handler)) => {
            debug!(%path, ?matcher, "request intercepted by hook");
            handler(request).await
        }
        None => next.run(request).await,
    }
}
