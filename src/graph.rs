//! Authenticated Graph calls: single GETs, lazy pagination, binary downloads, and `$batch`.

pub mod batch;
pub mod page;
pub mod schema;

pub use batch::*;
pub use page::*;

// crates.io
use reqwest::{RequestBuilder, Response};
// self
use crate::{
	_prelude::*,
	config::EngineConfig,
	error::{AuthError, TransientError},
	graph::schema::ODataError,
	http::{self, ReqwestHttpClient},
	model::TenantCredential,
	token::TokenManager,
};

/// Graph client bound to one engine configuration and token manager.
#[derive(Debug)]
pub struct GraphClient {
	config: Arc<EngineConfig>,
	http_client: ReqwestHttpClient,
	tokens: Arc<TokenManager>,
}
impl GraphClient {
	/// Creates a client sharing `http_client` and `tokens` with the rest of the engine.
	pub fn new(
		config: Arc<EngineConfig>,
		http_client: ReqwestHttpClient,
		tokens: Arc<TokenManager>,
	) -> Self {
		Self { config, http_client, tokens }
	}

	/// Absolute URL for a Graph-relative path such as `/organization`.
	pub fn url(&self, path: &str) -> String {
		self.config.graph_url(path)
	}

	/// Engine configuration.
	pub fn config(&self) -> &EngineConfig {
		&self.config
	}

	/// Token manager used to authorize calls.
	pub fn tokens(&self) -> &TokenManager {
		&self.tokens
	}

	/// GETs `url` and decodes the JSON body into `T`.
	pub async fn get_json<T>(
		&self,
		credential: &TenantCredential,
		url: &str,
		headers: &[(&str, &str)],
	) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let mut request = self.http_client.get(url);

		for (name, value) in headers {
			request = request.header(*name, *value);
		}

		let response = self.execute(credential, url, request).await?;
		let body = response.bytes().await.map_err(|e| TransientError::from_reqwest(url, e))?;

		decode_json(std::any::type_name::<T>(), &body)
	}

	/// GETs binary content; a missing resource yields `None`.
	pub async fn get_bytes(
		&self,
		credential: &TenantCredential,
		url: &str,
	) -> Result<Option<Vec<u8>>> {
		let request = self.http_client.get(url);
		let response = match self.execute(credential, url, request).await {
			Ok(response) => response,
			Err(Error::NotFound { .. }) => return Ok(None),
			Err(e) => return Err(e),
		};
		let body = response.bytes().await.map_err(|e| TransientError::from_reqwest(url, e))?;

		Ok(Some(body.to_vec()))
	}

	/// Starts a lazy pager at `start_url`. The pager cannot be restarted.
	pub fn paginate<'a, T>(
		&'a self,
		credential: &'a TenantCredential,
		start_url: String,
	) -> Pager<'a, T>
	where
		T: DeserializeOwned,
	{
		Pager::new(self, credential, start_url, self.config.max_pages)
	}

	/// Attaches a bearer token, sends `request`, and maps non-2xx statuses to typed errors.
	pub(crate) async fn execute(
		&self,
		credential: &TenantCredential,
		url: &str,
		request: RequestBuilder,
	) -> Result<Response> {
		let token = self.tokens.get_token(credential).await?;
		let response = request
			.bearer_auth(token.expose())
			.send()
			.await
			.map_err(|e| TransientError::from_reqwest(url, e))?;
		let status = response.status();

		if status.is_success() {
			return Ok(response);
		}

		tracing::debug!(url, status = status.as_u16(), "Graph call returned an error status.");

		Err(self.status_error(credential, url, response).await)
	}

	async fn status_error(
		&self,
		credential: &TenantCredential,
		url: &str,
		response: Response,
	) -> Error {
		let code = response.status().as_u16();

		match code {
			401 => {
				self.tokens.invalidate(credential);

				AuthError::TokenRejected { status: code }.into()
			},
			403 => Error::PermissionDenied { resource: url.to_owned(), status: code },
			404 => Error::NotFound { resource: url.to_owned() },
			429 | 500..=599 => TransientError::UpstreamStatus {
				resource: url.to_owned(),
				status: code,
				retry_after: http::parse_retry_after(response.headers()),
			}
			.into(),
			_ => {
				let body = response.bytes().await.unwrap_or_default();
				let message = serde_json::from_slice::<ODataError>(&body)
					.map(|error| error.error.message)
					.unwrap_or_else(|_| String::from_utf8_lossy(&body).into_owned());

				Error::Upstream { resource: url.to_owned(), status: code, message }
			},
		}
	}
}

pub(crate) fn decode_json<T>(context: &'static str, body: &[u8]) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer).map_err(|e| Error::decode(context, e))
}
