/// Remote evaluator trait and implementations
///
/// A remote evaluator holds the referenced-parameter state of one cascading
/// parameter and computes its choices from it. Implementations are provided
/// for an in-process script (tests, demos) and for HTTP endpoints.
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};
#[cfg(feature = "http")]
use std::time::Duration;
use url::Url;

use crate::protocol::{self, DecodeError, Operation};
use crate::value_set::ValueSet;

/// Error types for evaluator calls
#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    InvalidEndpoint(String),
    Request { operation: Operation, message: String },
    Status { operation: Operation, status: u16 },
    Decode(DecodeError),
    Unavailable(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::InvalidEndpoint(url) => write!(f, "Invalid evaluator endpoint: {}", url),
            TransportError::Request { operation, message } => {
                write!(f, "Request to {} failed: {}", operation, message)
            }
            TransportError::Status { operation, status } => {
                write!(f, "{} answered with HTTP status {}", operation, status)
            }
            TransportError::Decode(e) => write!(f, "{}", e),
            TransportError::Unavailable(msg) => write!(f, "Evaluator unavailable: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DecodeError> for TransportError {
    fn from(e: DecodeError) -> Self {
        TransportError::Decode(e)
    }
}

/// Async trait for the server side of a cascading parameter
#[async_trait]
pub trait RemoteEvaluator: Send + Sync {
    /// Replace the evaluator's view of the referenced parameters
    ///
    /// # Arguments
    /// * `parameters` - `name=value` entries joined by [`protocol::SEPARATOR`]
    async fn set_state(&self, parameters: &str) -> Result<(), TransportError>;

    /// Fetch the value set computed from the current state
    async fn get_choices(&self) -> Result<ValueSet, TransportError>;

    /// Fetch a single scalar result
    async fn get_choices_as_string(&self) -> Result<String, TransportError>;

    /// Fetch the display values only, as used by lists and galleries
    async fn get_choices_as_list(&self) -> Result<Vec<String>, TransportError> {
        Ok(self.get_choices().await?.values)
    }
}

/// Result of a scripted evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptValue {
    /// Each entry is its own key
    List(Vec<String>),
    /// `(key, display value)` pairs
    Map(Vec<(String, String)>),
    Text(String),
}

impl ScriptValue {
    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScriptValue::List(items.into_iter().map(Into::into).collect())
    }

    pub fn map<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        ScriptValue::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn text(text: impl Into<String>) -> Self {
        ScriptValue::Text(text.into())
    }

    pub fn to_value_set(&self) -> ValueSet {
        match self {
            ScriptValue::List(items) => ValueSet::from_values(items.iter().cloned()),
            ScriptValue::Map(pairs) => ValueSet::from_pairs(pairs.iter().cloned()),
            ScriptValue::Text(text) => ValueSet::from_values([text.clone()]),
        }
    }

    /// Scalar rendering: text verbatim, lists as `[a, b]`, maps as `{k=v}`
    pub fn to_display_string(&self) -> String {
        match self {
            ScriptValue::Text(text) => text.clone(),
            ScriptValue::List(items) => format!("[{}]", items.join(", ")),
            ScriptValue::Map(pairs) => {
                let entries: Vec<String> =
                    pairs.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                format!("{{{}}}", entries.join(", "))
            }
        }
    }
}

/// A call received by a [`ScriptedEvaluator`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvaluatorCall {
    SetState(String),
    GetChoices,
    GetChoicesAsString,
}

type Script = dyn Fn(&BTreeMap<String, String>) -> ScriptValue + Send + Sync;

/// In-process evaluator backed by a closure over the referenced parameters
///
/// Every call is recorded, which makes it the evaluator of choice for tests.
#[derive(Clone)]
pub struct ScriptedEvaluator {
    script: Arc<Script>,
    parameters: Arc<RwLock<BTreeMap<String, String>>>,
    calls: Arc<RwLock<Vec<EvaluatorCall>>>,
}

impl ScriptedEvaluator {
    /// Create an evaluator running `script` against the current state
    ///
    /// # Example
    /// ```
    /// use param_cascade::remote::{RemoteEvaluator, ScriptValue, ScriptedEvaluator};
    ///
    /// # tokio_test::block_on(async {
    /// let evaluator = ScriptedEvaluator::new(|params| {
    ///     match params.get("country").map(String::as_str) {
    ///         Some("Brazil") => ScriptValue::list(["Sao Paulo", "Rio de Janeiro"]),
    ///         _ => ScriptValue::list(Vec::<String>::new()),
    ///     }
    /// });
    /// evaluator.set_state("country=Brazil").await.unwrap();
    /// assert_eq!(evaluator.get_choices().await.unwrap().len(), 2);
    /// # });
    /// ```
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&BTreeMap<String, String>) -> ScriptValue + Send + Sync + 'static,
    {
        ScriptedEvaluator {
            script: Arc::new(script),
            parameters: Arc::new(RwLock::new(BTreeMap::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// An evaluator that always answers `value`
    pub fn constant(value: ScriptValue) -> Self {
        Self::new(move |_| value.clone())
    }

    /// The state received by the last update
    pub fn parameters(&self) -> BTreeMap<String, String> {
        self.parameters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn calls(&self) -> Vec<EvaluatorCall> {
        self.calls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of state updates received
    pub fn update_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, EvaluatorCall::SetState(_)))
            .count()
    }

    pub fn clear_calls(&self) {
        self.calls
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn record(&self, call: EvaluatorCall) {
        self.calls
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    fn evaluate(&self) -> ScriptValue {
        let parameters = self.parameters.read().unwrap_or_else(PoisonError::into_inner);
        (self.script)(&*parameters)
    }
}

#[async_trait]
impl RemoteEvaluator for ScriptedEvaluator {
    async fn set_state(&self, parameters: &str) -> Result<(), TransportError> {
        self.record(EvaluatorCall::SetState(parameters.to_string()));
        let parsed = protocol::parse_parameters(parameters);
        *self.parameters.write().unwrap_or_else(PoisonError::into_inner) = parsed;
        Ok(())
    }

    async fn get_choices(&self) -> Result<ValueSet, TransportError> {
        self.record(EvaluatorCall::GetChoices);
        Ok(self.evaluate().to_value_set())
    }

    async fn get_choices_as_string(&self) -> Result<String, TransportError> {
        self.record(EvaluatorCall::GetChoicesAsString);
        Ok(self.evaluate().to_display_string())
    }
}

/// Parse an evaluator base URL, making sure operation names join under it
pub fn normalize_base(base: &str) -> Result<Url, TransportError> {
    let mut url = Url::parse(base).map_err(|e| TransportError::InvalidEndpoint(format!("{}: {}", base, e)))?;
    if url.cannot_be_a_base() {
        return Err(TransportError::InvalidEndpoint(base.to_string()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Optional timeouts applied to evaluator requests
///
/// None are set by default: a call waits until the evaluator answers.
#[cfg(feature = "http")]
#[derive(Clone, Debug, Default)]
pub struct HttpEvaluatorOptions {
    pub connect_timeout: Option<Duration>,
    pub request_timeout: Option<Duration>,
}

#[cfg(feature = "http")]
impl HttpEvaluatorOptions {
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

/// Evaluator reached over HTTP
///
/// Each operation is a `POST` to `<base>/<operation>` whose body is the JSON
/// array of its arguments, sent with [`protocol::CONTENT_TYPE`].
///
/// Only available with the `http` feature.
#[cfg(feature = "http")]
#[derive(Clone, Debug)]
pub struct HttpEvaluator {
    base: Url,
    client: reqwest::Client,
}

#[cfg(feature = "http")]
impl HttpEvaluator {
    /// # Example
    /// ```no_run
    /// use param_cascade::remote::HttpEvaluator;
    ///
    /// let evaluator = HttpEvaluator::new("http://localhost:8080/job/demo/descriptorByName/city").unwrap();
    /// assert!(evaluator.base().as_str().ends_with("/city/"));
    /// ```
    pub fn new(base: &str) -> Result<Self, TransportError> {
        Self::with_options(base, HttpEvaluatorOptions::default())
    }

    pub fn with_options(base: &str, options: HttpEvaluatorOptions) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = options.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Unavailable(e.to_string()))?;
        Ok(HttpEvaluator {
            base: normalize_base(base)?,
            client,
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    async fn call(&self, operation: Operation, args: &[&str]) -> Result<String, TransportError> {
        let url = self
            .base
            .join(operation.name())
            .map_err(|e| TransportError::InvalidEndpoint(e.to_string()))?;
        let body = serde_json::to_string(args).map_err(|e| TransportError::Request {
            operation,
            message: e.to_string(),
        })?;
        log::debug!("POST {} ({} bytes)", url, body.len());

        let request_error = |e: reqwest::Error| TransportError::Request {
            operation,
            message: e.to_string(),
        };
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, protocol::CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                operation,
                status: status.as_u16(),
            });
        }
        response.text().await.map_err(request_error)
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl RemoteEvaluator for HttpEvaluator {
    async fn set_state(&self, parameters: &str) -> Result<(), TransportError> {
        self.call(Operation::Update, &[parameters]).await?;
        Ok(())
    }

    async fn get_choices(&self) -> Result<ValueSet, TransportError> {
        let body = self.call(Operation::Choices, &[]).await?;
        Ok(protocol::decode_value_set(&body)?)
    }

    async fn get_choices_as_string(&self) -> Result<String, TransportError> {
        let body = self.call(Operation::ChoicesAsString, &[]).await?;
        Ok(protocol::decode_string(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_evaluator_tracks_state() {
        let evaluator = ScriptedEvaluator::new(|params| {
            ScriptValue::text(params.get("a").cloned().unwrap_or_default())
        });
        evaluator.set_state("a=1__LESEP__b=2").await.unwrap();
        assert_eq!(evaluator.get_choices_as_string().await.unwrap(), "1");

        evaluator.set_state("b=3").await.unwrap();
        assert_eq!(evaluator.get_choices_as_string().await.unwrap(), "");
        assert_eq!(evaluator.parameters().get("b").map(String::as_str), Some("3"));
        assert_eq!(evaluator.update_count(), 2);
    }

    #[tokio::test]
    async fn test_scripted_map_and_list() {
        let evaluator = ScriptedEvaluator::constant(ScriptValue::map([("sp", "Sao Paulo")]));
        let set = evaluator.get_choices().await.unwrap();
        assert_eq!(set.keys, vec!["sp"]);
        assert_eq!(set.values, vec!["Sao Paulo"]);
        assert_eq!(
            evaluator.get_choices_as_list().await.unwrap(),
            vec!["Sao Paulo"]
        );
        assert_eq!(
            evaluator.calls(),
            vec![EvaluatorCall::GetChoices, EvaluatorCall::GetChoices]
        );
    }

    #[test]
    fn test_display_strings() {
        assert_eq!(ScriptValue::list(["a", "b"]).to_display_string(), "[a, b]");
        assert_eq!(ScriptValue::map([("k", "v")]).to_display_string(), "{k=v}");
    }

    #[test]
    fn test_normalize_base() {
        let url = normalize_base("http://localhost/job/x/param").unwrap();
        assert_eq!(url.join("doUpdate").unwrap().path(), "/job/x/param/doUpdate");
        let url = normalize_base("http://localhost/p/").unwrap();
        assert_eq!(url.as_str(), "http://localhost/p/");
        assert!(matches!(
            normalize_base("not a url"),
            Err(TransportError::InvalidEndpoint(_))
        ));
    }

    #[cfg(feature = "http")]
    #[test]
    fn test_http_options_have_no_timeouts_by_default() {
        let options = HttpEvaluatorOptions::default();
        assert!(options.connect_timeout.is_none());
        assert!(options.request_timeout.is_none());

        let options = options.with_request_timeout(Duration::from_secs(5));
        assert_eq!(options.request_timeout, Some(Duration::from_secs(5)));
        assert!(HttpEvaluator::with_options("http://localhost/p", options).is_ok());
    }
}
