//! Multi-tenant directory synchronization engine: client-credential token caching, paginated
//! and batched Graph calls, idempotent user reconciliation, and derived identity signals.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod config;
pub mod details;
pub mod engine;
pub mod error;
pub mod graph;
pub mod http;
pub mod license;
pub mod model;
pub mod oauth;
pub mod obs;
pub mod profile;
pub mod store;
pub mod sync;
pub mod token;

mod _prelude {
	pub use std::{
		collections::{BTreeMap, BTreeSet, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use tokio_util::sync::CancellationToken;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use tokio_util::sync::CancellationToken;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
