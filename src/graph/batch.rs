//! JSON `$batch` execution: many logical GETs per HTTP round-trip, judged independently.

// self
use crate::{
	_prelude::*,
	graph::{GraphClient, decode_json},
	model::TenantCredential,
	obs::{self, OpSpan, Operation, Outcome},
};

/// Provider limit on sub-requests per `$batch` POST.
pub const MAX_BATCH_REQUESTS: usize = 20;

/// One logical sub-request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BatchRequest {
	/// Caller-chosen identifier, unique within the batch.
	pub id: String,
	/// HTTP method.
	pub method: String,
	/// URL relative to the API version root, e.g. `/users/{id}/memberOf`.
	pub url: String,
	/// Per-request headers.
	#[serde(skip_serializing_if = "BTreeMap::is_empty")]
	pub headers: BTreeMap<String, String>,
}
impl BatchRequest {
	/// Builds a GET sub-request.
	pub fn get(id: impl Into<String>, url: impl Into<String>) -> Self {
		Self { id: id.into(), method: "GET".into(), url: url.into(), headers: BTreeMap::new() }
	}

	/// Adds a header to the sub-request.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into(), value.into());

		self
	}
}

/// One sub-response.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct BatchResponse {
	/// Identifier of the matching sub-request.
	pub id: String,
	/// Sub-request status code.
	pub status: u16,
	/// Response body; `null` when absent.
	#[serde(default)]
	pub body: serde_json::Value,
}
impl BatchResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Decodes the body into `T`.
	pub fn decode<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		serde_path_to_error::deserialize(self.body.clone())
			.map_err(|e| Error::decode(std::any::type_name::<T>(), e))
	}
}

#[derive(Debug, Serialize)]
struct BatchEnvelope<'a> {
	requests: &'a [BatchRequest],
}

#[derive(Debug, Deserialize)]
struct BatchReply {
	#[serde(default)]
	responses: Vec<BatchResponse>,
}

/// Per-id results of a batch call.
///
/// A failed POST leaves its sub-requests absent and records the failure; it never fails the
/// other POSTs of the same call.
#[derive(Debug, Default)]
pub struct BatchOutcome {
	responses: HashMap<String, BatchResponse>,
	failures: Vec<Error>,
}
impl BatchOutcome {
	/// Raw sub-response for `id`, whatever its status.
	pub fn get(&self, id: &str) -> Option<&BatchResponse> {
		self.responses.get(id)
	}

	/// Sub-response for `id` when it succeeded.
	pub fn success(&self, id: &str) -> Option<&BatchResponse> {
		self.get(id).filter(|response| response.is_success())
	}

	/// Decoded body of a successful sub-response; `None` on failure or undecodable body.
	pub fn decode<T>(&self, id: &str) -> Option<T>
	where
		T: DeserializeOwned,
	{
		let response = self.success(id)?;

		match response.decode() {
			Ok(value) => Some(value),
			Err(e) => {
				tracing::warn!(id, error = %e, "Batch sub-response could not be decoded.");

				None
			},
		}
	}

	/// Number of sub-responses received.
	pub fn len(&self) -> usize {
		self.responses.len()
	}

	/// Returns `true` when no sub-response arrived.
	pub fn is_empty(&self) -> bool {
		self.responses.is_empty()
	}

	/// Failures of whole POSTs (network errors, non-2xx top-level status).
	pub fn failures(&self) -> &[Error] {
		&self.failures
	}
}

impl GraphClient {
	/// Executes `requests` through `$batch`, splitting into POSTs of at most
	/// [`MAX_BATCH_REQUESTS`].
	pub async fn batch(
		&self,
		credential: &TenantCredential,
		requests: Vec<BatchRequest>,
	) -> BatchOutcome {
		let span = OpSpan::new(Operation::Batch, "batch");

		obs::record_operation(Operation::Batch, Outcome::Attempt);

		let outcome = span
			.instrument(async {
				let url = self.url("/$batch");
				let mut outcome = BatchOutcome::default();

				for chunk in requests.chunks(MAX_BATCH_REQUESTS) {
					match self.post_batch(credential, &url, chunk).await {
						Ok(responses) =>
							for response in responses {
								outcome.responses.insert(response.id.clone(), response);
							},
						Err(e) => {
							tracing::warn!(
								requests = chunk.len(),
								error = %e,
								"Batch request failed; its sub-requests are reported empty."
							);
							outcome.failures.push(e);
						},
					}
				}

				outcome
			})
			.await;
		let label = if outcome.failures.is_empty() { Outcome::Success } else { Outcome::Degraded };

		obs::record_operation(Operation::Batch, label);

		outcome
	}

	async fn post_batch(
		&self,
		credential: &TenantCredential,
		url: &str,
		requests: &[BatchRequest],
	) -> Result<Vec<BatchResponse>> {
		let request = self.http_client.post(url).json(&BatchEnvelope { requests });
		let response = self.execute(credential, url, request).await?;
		let body = response
			.bytes()
			.await
			.map_err(|e| crate::error::TransientError::from_reqwest(url, e))?;
		let reply: BatchReply = decode_json("batch reply", &body)?;

		Ok(reply.responses)
	}
}
