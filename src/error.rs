//! Engine-level error types shared by the token, Graph, resolver, and sync layers.

// self
use crate::_prelude::*;

/// Engine-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical engine error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Token acquisition failed; the tenant is unreachable for now.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Temporary upstream or network failure; eligible for the next scheduled run.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Storage-layer failure outside of reconciliation.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// A reconciliation chunk could not be written.
	#[error("Reconciliation failed while writing chunk {chunk}.")]
	Reconciliation {
		/// Zero-based index of the failing chunk.
		chunk: usize,
		/// Underlying store failure.
		#[source]
		source: crate::store::StoreError,
	},
	/// Provider response body did not match the expected shape.
	#[error("Provider returned an undecodable {context} payload.")]
	Decode {
		/// Short description of the payload being decoded.
		context: &'static str,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},

	/// The granted permissions do not cover the requested resource.
	#[error("Permission denied for {resource} (HTTP {status}).")]
	PermissionDenied {
		/// Resource URL or facet label.
		resource: String,
		/// HTTP status code returned by the provider.
		status: u16,
	},
	/// Provider reported the resource as missing.
	#[error("Resource not found: {resource}.")]
	NotFound {
		/// Resource URL.
		resource: String,
	},
	/// Provider returned a non-retryable, non-permission failure.
	#[error("Provider returned HTTP {status} for {resource}: {message}.")]
	Upstream {
		/// Resource URL.
		resource: String,
		/// HTTP status code.
		status: u16,
		/// Provider error message, when available.
		message: String,
	},
	/// Tenant is unknown, lacks credentials, or has fetching disabled.
	#[error("Tenant {tenant} is not eligible for sync: {reason}.")]
	NotEligible {
		/// Local tenant identifier.
		tenant: String,
		/// Why the tenant was rejected.
		reason: &'static str,
	},
	/// The run was cancelled by its trigger.
	#[error("Sync run was cancelled.")]
	Cancelled,
	/// The run exceeded its wall-clock budget.
	#[error("Sync run exceeded its {budget} budget.")]
	BudgetExceeded {
		/// Configured budget.
		budget: Duration,
	},
	/// Engine invariant broken (illegal state transition, aborted task).
	#[error("Internal engine failure: {message}.")]
	Internal {
		/// What went wrong.
		message: String,
	},
}
impl Error {
	/// Returns the stable classification recorded in failure summaries.
	pub fn kind(&self) -> FailureKind {
		match self {
			Self::Config(_) => FailureKind::Config,
			Self::Auth(_) => FailureKind::Auth,
			Self::Transient(_) => FailureKind::Transient,
			Self::Storage(_) => FailureKind::Storage,
			Self::Reconciliation { .. } => FailureKind::Reconciliation,
			Self::Decode { .. } => FailureKind::Decode,
			Self::PermissionDenied { .. } => FailureKind::PermissionDenied,
			Self::NotFound { .. } | Self::Upstream { .. } => FailureKind::Upstream,
			Self::NotEligible { .. } => FailureKind::NotEligible,
			Self::Cancelled => FailureKind::Cancelled,
			Self::BudgetExceeded { .. } => FailureKind::BudgetExceeded,
			Self::Internal { .. } => FailureKind::Internal,
		}
	}

	pub(crate) fn decode(
		context: &'static str,
		source: serde_path_to_error::Error<serde_json::Error>,
	) -> Self {
		Self::Decode { context, source }
	}
}

/// Stable failure labels written into sync summaries and metrics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
	/// Configuration problem.
	Config,
	/// Token acquisition failure.
	Auth,
	/// Timeout, network, or retryable upstream status.
	Transient,
	/// Storage failure outside reconciliation.
	Storage,
	/// Reconciliation chunk failure.
	Reconciliation,
	/// Undecodable provider payload.
	Decode,
	/// Missing provider permission.
	PermissionDenied,
	/// Other provider failure.
	Upstream,
	/// Tenant not eligible.
	NotEligible,
	/// Run cancelled.
	Cancelled,
	/// Run exceeded its budget.
	BudgetExceeded,
	/// Engine invariant broken.
	Internal,
}
impl FailureKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Config => "config",
			Self::Auth => "auth",
			Self::Transient => "transient",
			Self::Storage => "storage",
			Self::Reconciliation => "reconciliation",
			Self::Decode => "decode",
			Self::PermissionDenied => "permission_denied",
			Self::Upstream => "upstream",
			Self::NotEligible => "not_eligible",
			Self::Cancelled => "cancelled",
			Self::BudgetExceeded => "budget_exceeded",
			Self::Internal => "internal",
		}
	}
}
impl Display for FailureKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Configuration and validation failures raised by the engine.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// An endpoint URL cannot be used.
	#[error("The {endpoint} endpoint is invalid.")]
	InvalidEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A configuration value is out of range.
	#[error("Setting `{name}` is invalid: {reason}.")]
	InvalidSetting {
		/// Setting name.
		name: &'static str,
		/// Human-readable constraint.
		reason: &'static str,
	},
	/// Credential cannot be used for token requests.
	#[error("Tenant credential is incomplete.")]
	IncompleteCredential,
	/// Identifier validation failed.
	#[error(transparent)]
	Identifier(#[from] crate::model::IdentifierError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Token acquisition failures. Every variant is an `AuthFailure` for the tenant.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// Client authentication failed or credentials are malformed.
	#[error("Client authentication failed: {reason}.")]
	InvalidClient {
		/// Provider-supplied reason string.
		reason: String,
	},
	/// Provider rejected the token request for another reason.
	#[error("Token endpoint rejected the request: {reason}.")]
	Rejected {
		/// Provider-supplied reason string.
		reason: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Provider rejected a bearer token that was still cached.
	#[error("Provider rejected the bearer token (HTTP {status}).")]
	TokenRejected {
		/// HTTP status code.
		status: u16,
	},
	/// Token endpoint could not be reached.
	#[error("Token endpoint is unreachable.")]
	Unreachable {
		/// Underlying transport failure.
		#[source]
		source: BoxError,
	},
	/// Token endpoint responded with malformed JSON.
	#[error("Token endpoint returned malformed JSON.")]
	MalformedResponse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Token endpoint omitted or returned an unusable `expires_in`.
	#[error("Token endpoint returned an unusable expires_in.")]
	InvalidExpiry,
}
impl AuthError {
	/// Wraps a transport failure observed while calling the token endpoint.
	pub fn unreachable(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Unreachable { source: Box::new(src) }
	}
}

/// Temporary failure variants; retried by the next scheduled run, never in-run.
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// The per-request timeout elapsed.
	#[error("Request to {resource} timed out.")]
	Timeout {
		/// Resource URL.
		resource: String,
	},
	/// Connection-level failure (DNS, TCP, TLS).
	#[error("Network error while calling {resource}.")]
	Network {
		/// Resource URL.
		resource: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Provider throttled the call or failed server-side.
	#[error("Provider returned HTTP {status} for {resource}.")]
	UpstreamStatus {
		/// Resource URL.
		resource: String,
		/// HTTP status code.
		status: u16,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
}
impl TransientError {
	/// Classifies a reqwest failure for `resource`.
	pub fn from_reqwest(resource: impl Into<String>, err: ReqwestError) -> Self {
		let resource = resource.into();

		if err.is_timeout() {
			Self::Timeout { resource }
		} else {
			Self::Network { resource, source: Box::new(err) }
		}
	}
}
