//! Values that may be fixed, computed, or fetched asynchronously.
//!
//! # Design
//! Base URLs and bearer tokens are often only known at call time (a token
//! refreshed by an auth service, a base URL picked by service discovery).
//! `Resolvable` gives all three shapes one resolution path: `resolve().await`
//! yields the value or the supplier's error.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};

use crate::error::BoxError;

type Resolver<T> = dyn Fn() -> BoxFuture<'static, Result<T, BoxError>> + Send + Sync;

/// A value resolved anew on every call.
pub struct Resolvable<T> {
    resolver: Arc<Resolver<T>>,
}

impl<T> Clone for Resolvable<T> {
    fn clone(&self) -> Self {
        Self {
            resolver: self.resolver.clone(),
        }
    }
}

impl<T> fmt::Debug for Resolvable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolvable").finish_non_exhaustive()
    }
}

impl<T: Clone + Send + Sync + 'static> Resolvable<T> {
    pub fn fixed(value: T) -> Self {
        Self::from_fn(move || value.clone())
    }

    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            resolver: Arc::new(move || {
                let value = f();
                async move { Ok::<T, BoxError>(value) }.boxed()
            }),
        }
    }

    pub fn from_async<F, Fut, E>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        Self {
            resolver: Arc::new(move || {
                f().map(|result| result.map_err(Into::<BoxError>::into)).boxed()
            }),
        }
    }

    pub async fn resolve(&self) -> Result<T, BoxError> {
        (self.resolver)().await
    }
}

impl From<&str> for Resolvable<String> {
    fn from(value: &str) -> Self {
        Resolvable::fixed(value.to_string())
    }
}

impl From<String> for Resolvable<String> {
    fn from(value: String) -> Self {
        Resolvable::fixed(value)
    }
}
