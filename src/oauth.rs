//! Client-credentials exchange through the `oauth2` crate, with provider error classification.

pub use oauth2;

// crates.io
use oauth2::{
	AuthType, ClientId, ClientSecret as OAuthClientSecret, HttpClientError, RequestTokenError,
	Scope, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicErrorResponseType, BasicRequestTokenError},
};
// self
use crate::{
	_prelude::*,
	error::{AuthError, ConfigError},
	http::{ResponseMetadata, ResponseMetadataSlot, ReqwestHttpClient},
	model::{AccessToken, TenantCredential},
};

/// Access token plus the lifetime the provider granted.
#[derive(Clone, Debug)]
pub struct IssuedToken {
	/// Bearer token.
	pub access_token: AccessToken,
	/// Provider-reported `expires_in`.
	pub expires_in: Duration,
}

/// Thin facade that posts `client_credentials` grants with request-body client authentication.
#[derive(Clone, Debug)]
pub(crate) struct TokenFacade {
	http_client: ReqwestHttpClient,
}
impl TokenFacade {
	pub(crate) fn new(http_client: ReqwestHttpClient) -> Self {
		Self { http_client }
	}

	/// Exchanges `credential` for an access token at `token_url`.
	pub(crate) async fn exchange_client_credentials(
		&self,
		token_url: String,
		credential: &TenantCredential,
		scope: &str,
	) -> Result<IssuedToken> {
		let token_url = TokenUrl::new(token_url)
			.map_err(|source| ConfigError::InvalidEndpoint { endpoint: "token", source })?;
		let oauth_client = BasicClient::new(ClientId::new(credential.client_id.clone()))
			.set_client_secret(OAuthClientSecret::new(
				credential.client_secret.expose().to_owned(),
			))
			.set_auth_type(AuthType::RequestBody)
			.set_token_uri(token_url);
		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.instrumented(meta.clone());
		let response = oauth_client
			.exchange_client_credentials()
			.add_scope(Scope::new(scope.to_owned()))
			.request_async(&instrumented)
			.await
			.map_err(|err| map_request_error(meta.take(), err))?;
		let expires_in = response
			.expires_in()
			.and_then(|lifetime| i64::try_from(lifetime.as_secs()).ok())
			.filter(|secs| *secs > 0)
			.ok_or(AuthError::InvalidExpiry)?;

		Ok(IssuedToken {
			access_token: AccessToken::new(response.access_token().secret().to_owned()),
			expires_in: Duration::seconds(expires_in),
		})
	}
}

fn map_request_error(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<ReqwestError>>,
) -> AuthError {
	let status = meta.as_ref().and_then(|value| value.status);

	match err {
		RequestTokenError::ServerResponse(response) => map_server_response(response, status),
		RequestTokenError::Request(error) => map_transport_error(error),
		// Non-2xx bodies that are not OAuth errors (gateway pages, throttling) are rejections.
		RequestTokenError::Parse(_, _) if status.is_some_and(|code| !(200..300).contains(&code)) =>
			AuthError::Rejected {
				reason: "token endpoint returned a non-OAuth error body".into(),
				status,
			},
		RequestTokenError::Parse(source, _body) => AuthError::MalformedResponse { source },
		RequestTokenError::Other(message) => AuthError::Rejected { reason: message, status },
	}
}

fn map_server_response(response: BasicErrorResponse, status: Option<u16>) -> AuthError {
	let reason = match response.error_description() {
		Some(description) => format!("{}: {description}", response.error().as_ref()),
		None => response.error().as_ref().to_owned(),
	};

	if matches!(response.error(), BasicErrorResponseType::InvalidClient) || status == Some(401) {
		AuthError::InvalidClient { reason }
	} else {
		AuthError::Rejected { reason, status }
	}
}

fn map_transport_error(err: HttpClientError<ReqwestError>) -> AuthError {
	match err {
		HttpClientError::Reqwest(inner) => AuthError::unreachable(*inner),
		HttpClientError::Http(inner) => AuthError::unreachable(inner),
		HttpClientError::Io(inner) => AuthError::unreachable(inner),
		HttpClientError::Other(message) => AuthError::Unreachable { source: message.into() },
		_ => AuthError::Unreachable { source: "unknown transport failure".into() },
	}
}
