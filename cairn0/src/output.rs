//! The deferred value: [`Output<T>`].
//!
//! An Output resolves to an [`OutputData`]: an optional value plus three
//! properties that travel with it through every combinator:
//!
//! - **known**: false during preview when the engine cannot determine the
//!   value yet. An unknown Output never carries a value.
//! - **secret**: the value must be withheld from logs. Once secret, every
//!   value derived from it is secret too.
//! - **dependencies**: the resources the value was derived from. Combining
//!   Outputs unions their dependency sets.
//!
//! Outputs are immutable. Every combinator returns a new Output, and the
//! computation behind an Output runs at most once however many clones of
//! it are awaited.

use crate::error::OutputError;
use crate::resource::ResourceRef;
use crate::task;
use futures::future::{self, BoxFuture, FutureExt, Shared};
use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;

/// Bound for values an [`Output`] can carry.
///
/// Any type that is `Clone + Send + Sync + 'static` automatically
/// implements `OutputValue`.
pub trait OutputValue: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> OutputValue for T {}

/// The set of resources a value was derived from.
///
/// Iterates in resource declaration order, so anything built from it (a
/// registration request's dependency list, for instance) is deterministic.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct DependencySet {
    resources: BTreeSet<ResourceRef>,
}

impl DependencySet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// A set holding exactly one resource.
    pub fn singleton(resource: ResourceRef) -> Self {
        let mut set = Self::new();
        set.insert(resource);
        set
    }

    /// Add a resource. Returns false if it was already present.
    pub fn insert(&mut self, resource: ResourceRef) -> bool {
        self.resources.insert(resource)
    }

    /// Add every resource of `other`.
    pub fn union_with(&mut self, other: &DependencySet) {
        self.resources.extend(other.resources.iter().cloned());
    }

    /// The union of two sets.
    pub fn union(&self, other: &DependencySet) -> DependencySet {
        let mut merged = self.clone();
        merged.union_with(other);
        merged
    }

    /// Whether `resource` is in the set.
    pub fn contains(&self, resource: &ResourceRef) -> bool {
        self.resources.contains(resource)
    }

    /// Whether every member of `self` is also in `other`.
    pub fn is_subset(&self, other: &DependencySet) -> bool {
        self.resources.is_subset(&other.resources)
    }

    /// Number of resources.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Iterate in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &ResourceRef> {
        self.resources.iter()
    }
}

impl Extend<ResourceRef> for DependencySet {
    fn extend<I: IntoIterator<Item = ResourceRef>>(&mut self, iter: I) {
        self.resources.extend(iter);
    }
}

impl FromIterator<ResourceRef> for DependencySet {
    fn from_iter<I: IntoIterator<Item = ResourceRef>>(iter: I) -> Self {
        Self {
            resources: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for DependencySet {
    type Item = ResourceRef;
    type IntoIter = std::collections::btree_set::IntoIter<ResourceRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.into_iter()
    }
}

impl fmt::Debug for DependencySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.resources.iter()).finish()
    }
}

/// What an [`Output`] resolves to.
#[derive(Clone, PartialEq)]
pub struct OutputData<T> {
    value: Option<T>,
    known: bool,
    secret: bool,
    dependencies: DependencySet,
}

impl<T> OutputData<T> {
    /// Build output data. An unknown value is dropped.
    pub fn new(value: Option<T>, known: bool, secret: bool, dependencies: DependencySet) -> Self {
        Self {
            value: if known { value } else { None },
            known,
            secret,
            dependencies,
        }
    }

    /// A known, non-secret value without dependencies.
    pub fn known(value: T) -> Self {
        Self::new(Some(value), true, false, DependencySet::new())
    }

    /// A known but absent value (the engine reported null).
    pub fn absent() -> Self {
        Self::new(None, true, false, DependencySet::new())
    }

    /// An unknown value.
    pub fn unknown() -> Self {
        Self::new(None, false, false, DependencySet::new())
    }

    /// Borrow the value. Always `None` when unknown.
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Take the value. Always `None` when unknown.
    pub fn into_value(self) -> Option<T> {
        self.value
    }

    /// Whether the value is known.
    pub fn is_known(&self) -> bool {
        self.known
    }

    /// Whether the value is secret.
    pub fn is_secret(&self) -> bool {
        self.secret
    }

    /// The resources the value was derived from.
    pub fn dependencies(&self) -> &DependencySet {
        &self.dependencies
    }

    /// Split into `(value, known, secret, dependencies)`.
    pub fn into_parts(self) -> (Option<T>, bool, bool, DependencySet) {
        (self.value, self.known, self.secret, self.dependencies)
    }

    /// OR the secret flag.
    pub fn with_secret(mut self, secret: bool) -> Self {
        self.secret |= secret;
        self
    }

    /// Union the dependency set.
    pub fn with_dependencies(mut self, dependencies: &DependencySet) -> Self {
        self.dependencies.union_with(dependencies);
        self
    }

    /// Replace the value, keeping the flags and dependencies.
    fn map_value<U>(self, f: impl FnOnce(T) -> U) -> OutputData<U> {
        OutputData {
            value: self.value.map(f),
            known: self.known,
            secret: self.secret,
            dependencies: self.dependencies,
        }
    }

    /// Same flags and dependencies, no value.
    fn without_value<U>(self) -> OutputData<U> {
        OutputData {
            value: None,
            known: self.known,
            secret: self.secret,
            dependencies: self.dependencies,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for OutputData<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("OutputData");
        if self.secret {
            out.field("value", &"[secret]");
        } else {
            out.field("value", &self.value);
        }
        out.field("known", &self.known)
            .field("secret", &self.secret)
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

type SharedData<T> = Shared<BoxFuture<'static, Result<OutputData<T>, OutputError>>>;

/// A deferred value carrying known/secret/dependency metadata.
///
/// # Example
///
/// ```
/// use cairn0::Output;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let port = Output::of(8080);
/// let password = Output::secret("hunter2".to_owned());
///
/// let conn = Output::tuple2(&port, &password)
///     .map(|(port, password)| format!("postgres://admin:{password}@db:{port}"));
///
/// let data = conn.resolve().await.unwrap();
/// assert!(data.is_secret());
/// assert!(data.is_known());
/// # }
/// ```
pub struct Output<T> {
    inner: SharedData<T>,
}

impl<T> Clone for Output<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for Output<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Output(..)")
    }
}

impl<T: OutputValue> Output<T> {
    fn ready(data: OutputData<T>) -> Self {
        Self {
            inner: future::ready(Ok(data)).boxed().shared(),
        }
    }

    /// Wrap a pending computation that yields the full 4-tuple.
    ///
    /// The computation is started right away as a background task (tracked
    /// by the current [`TaskTracker`](crate::task::TaskTracker) if there is
    /// one), so side effects inside it happen even if nobody awaits the
    /// Output.
    pub fn from_data<F>(future: F) -> Self
    where
        F: Future<Output = Result<OutputData<T>, OutputError>> + Send + 'static,
    {
        let inner = future.boxed().shared();
        task::drive(inner.clone().map(|_| ()).boxed());
        Self { inner }
    }

    /// A known, non-secret value without dependencies.
    pub fn of(value: T) -> Self {
        Self::ready(OutputData::known(value))
    }

    /// A known, secret value without dependencies.
    pub fn secret(value: T) -> Self {
        Self::ready(OutputData::known(value).with_secret(true))
    }

    /// An unknown value, as the engine reports during preview.
    pub fn unknown() -> Self {
        Self::ready(OutputData::unknown())
    }

    /// An Output that fails with `error` when resolved.
    pub fn failed(error: OutputError) -> Self {
        Self {
            inner: future::ready(Err(error)).boxed().shared(),
        }
    }

    /// Wrap a user future producing a known value.
    pub fn from_future<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, OutputError>> + Send + 'static,
    {
        Self::from_data(async move { future.await.map(OutputData::known) })
    }

    /// Wrap an externally driven result whose known-ness is decided by
    /// `is_known` once it arrives.
    pub fn from_pending<F, P>(future: F, is_known: P) -> Self
    where
        F: Future<Output = Result<T, OutputError>> + Send + 'static,
        P: FnOnce(&T) -> bool + Send + 'static,
    {
        Self::from_data(async move {
            let value = future.await?;
            if is_known(&value) {
                Ok(OutputData::known(value))
            } else {
                Ok(OutputData::unknown())
            }
        })
    }

    /// Wait for the 4-tuple. This is the only way to observe it.
    pub async fn resolve(&self) -> Result<OutputData<T>, OutputError> {
        self.inner.clone().await
    }

    /// Transform the value. `f` only runs when the value is known and
    /// present; flags and dependencies pass through unchanged.
    pub fn map<U, F>(&self, f: F) -> Output<U>
    where
        U: OutputValue,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let source = self.clone();
        Output::from_data(async move { Ok(source.resolve().await?.map_value(f)) })
    }

    /// Like [`map`](Self::map), for transformations that can fail. The
    /// error becomes this Output's resolution failure.
    pub fn try_map<U, F>(&self, f: F) -> Output<U>
    where
        U: OutputValue,
        F: FnOnce(T) -> Result<U, OutputError> + Send + 'static,
    {
        let source = self.clone();
        Output::from_data(async move {
            let data = source.resolve().await?;
            let (value, known, secret, dependencies) = data.into_parts();
            let value = value.map(f).transpose()?;
            Ok(OutputData::new(value, known, secret, dependencies))
        })
    }

    /// Flat-map: `f` produces another Output from the value.
    ///
    /// The result depends on both Outputs, is secret if either is, and is
    /// known only if both are. When this Output is unknown, `f` is never
    /// called and the result is unknown with this Output's dependencies.
    pub fn apply<U, F>(&self, f: F) -> Output<U>
    where
        U: OutputValue,
        F: FnOnce(T) -> Output<U> + Send + 'static,
    {
        let source = self.clone();
        Output::from_data(async move {
            let outer = source.resolve().await?;
            if !outer.is_known() {
                return Ok(outer.without_value());
            }
            let (value, _, secret, dependencies) = outer.into_parts();
            let Some(value) = value else {
                return Ok(OutputData::new(None, true, secret, dependencies));
            };
            let inner = f(value).resolve().await?;
            Ok(inner.with_secret(secret).with_dependencies(&dependencies))
        })
    }

    /// Force the secret flag, leaving value, known-ness and dependencies.
    pub fn as_secret(&self) -> Output<T> {
        let source = self.clone();
        Output::from_data(async move { Ok(source.resolve().await?.with_secret(true)) })
    }

    /// Add `resource` to the dependency set.
    pub fn with_dependency(&self, resource: ResourceRef) -> Output<T> {
        self.with_dependencies(DependencySet::singleton(resource))
    }

    /// Union `dependencies` into the dependency set.
    pub fn with_dependencies(&self, dependencies: DependencySet) -> Output<T> {
        let source = self.clone();
        Output::from_data(async move { Ok(source.resolve().await?.with_dependencies(&dependencies)) })
    }

    /// Pair this Output with another.
    pub fn zip<U: OutputValue>(&self, other: &Output<U>) -> Output<(T, U)> {
        Output::tuple2(self, other)
    }
}

/// Combine the metadata of several resolved inputs: AND known, OR secret,
/// union dependencies.
fn combine<T>(parts: &[(bool, bool, &DependencySet)], value: Option<T>) -> OutputData<T> {
    let known = parts.iter().all(|(known, _, _)| *known);
    let secret = parts.iter().any(|(_, secret, _)| *secret);
    let mut dependencies = DependencySet::new();
    for (_, _, deps) in parts {
        dependencies.union_with(deps);
    }
    OutputData::new(value, known, secret, dependencies)
}

impl<A: OutputValue, B: OutputValue> Output<(A, B)> {
    /// Combine two Outputs element-wise.
    pub fn tuple2(a: &Output<A>, b: &Output<B>) -> Self {
        let (a, b) = (a.clone(), b.clone());
        Output::from_data(async move {
            let (a, b) = futures::try_join!(a.resolve(), b.resolve())?;
            let meta = [
                (a.known, a.secret, &a.dependencies),
                (b.known, b.secret, &b.dependencies),
            ];
            let value = a.value.clone().zip(b.value.clone());
            Ok(combine(&meta, value))
        })
    }
}

impl<A: OutputValue, B: OutputValue, C: OutputValue> Output<(A, B, C)> {
    /// Combine three Outputs element-wise.
    pub fn tuple3(a: &Output<A>, b: &Output<B>, c: &Output<C>) -> Self {
        let (a, b, c) = (a.clone(), b.clone(), c.clone());
        Output::from_data(async move {
            let (a, b, c) = futures::try_join!(a.resolve(), b.resolve(), c.resolve())?;
            let meta = [
                (a.known, a.secret, &a.dependencies),
                (b.known, b.secret, &b.dependencies),
                (c.known, c.secret, &c.dependencies),
            ];
            let value = match (a.value.clone(), b.value.clone(), c.value.clone()) {
                (Some(a), Some(b), Some(c)) => Some((a, b, c)),
                _ => None,
            };
            Ok(combine(&meta, value))
        })
    }
}

impl<T: OutputValue> Output<Vec<T>> {
    /// Combine any number of Outputs into one list, preserving order.
    pub fn all<I>(outputs: I) -> Self
    where
        I: IntoIterator<Item = Output<T>>,
    {
        let outputs: Vec<Output<T>> = outputs.into_iter().collect();
        Output::from_data(async move {
            let resolved =
                future::try_join_all(outputs.iter().map(|output| output.resolve())).await?;
            let meta: Vec<_> = resolved
                .iter()
                .map(|data| (data.known, data.secret, &data.dependencies))
                .collect();
            let value = resolved
                .iter()
                .map(|data| data.value.clone())
                .collect::<Option<Vec<T>>>();
            Ok(combine(&meta, value))
        })
    }
}

impl<T: OutputValue> From<T> for Output<T> {
    fn from(value: T) -> Self {
        Output::of(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn literal_is_known_and_plain() {
        let data = Output::of(3).resolve().await.unwrap();
        assert_eq!(data.value(), Some(&3));
        assert!(data.is_known());
        assert!(!data.is_secret());
        assert!(data.dependencies().is_empty());
    }

    #[tokio::test]
    async fn map_skips_unknown() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let data = Output::<i32>::unknown()
            .map(move |v| {
                counter.fetch_add(1, Ordering::SeqCst);
                v + 1
            })
            .resolve()
            .await
            .unwrap();
        assert!(!data.is_known());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn try_map_error_becomes_failure() {
        let result = Output::of("x".to_owned())
            .try_map(|s| s.parse::<i32>().map_err(OutputError::other))
            .resolve()
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn failure_propagates_through_combinators() {
        let failed = Output::<i32>::failed(OutputError::other("boom"));
        let mapped = failed.map(|v| v * 2);
        let applied = mapped.apply(|v| Output::of(v + 1));
        let tupled = Output::tuple2(&applied, &Output::of(1));
        let err = tupled.resolve().await.unwrap_err();
        assert_eq!(err, OutputError::Other("boom".into()));
    }

    #[tokio::test]
    async fn computation_runs_once_across_clones() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let output = Output::from_future(async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(42)
        });
        let copy = output.clone();
        assert_eq!(output.resolve().await.unwrap().value(), Some(&42));
        assert_eq!(copy.resolve().await.unwrap().value(), Some(&42));
        assert_eq!(output.resolve().await.unwrap().value(), Some(&42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn from_pending_consults_predicate() {
        let unknown = Output::from_pending(async { Ok(String::new()) }, |id| !id.is_empty());
        assert!(!unknown.resolve().await.unwrap().is_known());
        let known = Output::from_pending(async { Ok("i-123".to_owned()) }, |id| !id.is_empty());
        assert_eq!(
            known.resolve().await.unwrap().into_value(),
            Some("i-123".to_owned())
        );
    }

    #[tokio::test]
    async fn all_preserves_order_and_flags() {
        let data = Output::all(vec![Output::of(1), Output::secret(2), Output::of(3)])
            .resolve()
            .await
            .unwrap();
        assert_eq!(data.value(), Some(&vec![1, 2, 3]));
        assert!(data.is_secret());

        let data = Output::all(vec![Output::of(1), Output::unknown()])
            .resolve()
            .await
            .unwrap();
        assert!(!data.is_known());
        assert!(data.value().is_none());
    }

    #[tokio::test]
    async fn apply_on_absent_value_stays_known() {
        let absent = Output::<i32>::from_data(async { Ok(OutputData::absent()) });
        let data = absent.apply(|v| Output::of(v + 1)).resolve().await.unwrap();
        assert!(data.is_known());
        assert!(data.value().is_none());
    }

    #[test]
    fn secret_value_is_redacted_in_debug() {
        let data = OutputData::known("hunter2").with_secret(true);
        let printed = format!("{data:?}");
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("[secret]"));
    }

    #[test]
    fn unknown_data_never_holds_a_value() {
        let data = OutputData::new(Some(1), false, false, DependencySet::new());
        assert!(data.value().is_none());
    }
}
