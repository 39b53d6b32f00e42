//! Lazy pagination over `@odata.nextLink` continuations.

// std
use std::marker::PhantomData;
// self
use crate::{
	_prelude::*,
	graph::{GraphClient, schema::ODataPage},
	model::TenantCredential,
	obs::{self, OpSpan, Operation, Outcome},
};

/// Everything a drained pager produced.
#[derive(Debug)]
pub struct Paginated<T> {
	/// Items from every successful page, in fetch order.
	pub items: Vec<T>,
	/// Successful page requests.
	pub pages_fetched: usize,
	/// `true` when the page ceiling stopped pagination early.
	pub ceiling_reached: bool,
	/// Error that stopped pagination, if any.
	pub error: Option<Error>,
}

/// Lazy, single-use page iterator.
///
/// Stops after an empty page, a page without a continuation, a failed page, or once the page
/// ceiling is reached. Reaching the ceiling is logged and flagged, not treated as an error.
#[derive(Debug)]
pub struct Pager<'a, T> {
	client: &'a GraphClient,
	credential: &'a TenantCredential,
	next_url: Option<String>,
	max_pages: usize,
	pages_fetched: usize,
	ceiling_reached: bool,
	_item: PhantomData<fn() -> T>,
}
impl<'a, T> Pager<'a, T>
where
	T: DeserializeOwned,
{
	pub(crate) fn new(
		client: &'a GraphClient,
		credential: &'a TenantCredential,
		start_url: String,
		max_pages: usize,
	) -> Self {
		Self {
			client,
			credential,
			next_url: Some(start_url),
			max_pages,
			pages_fetched: 0,
			ceiling_reached: false,
			_item: PhantomData,
		}
	}

	/// Fetches the next page; `None` once pagination has stopped.
	pub async fn next_page(&mut self) -> Option<Result<Vec<T>>> {
		let url = self.next_url.take()?;
		let page = match self.client.get_json::<ODataPage<T>>(self.credential, &url, &[]).await {
			Ok(page) => page,
			Err(e) => {
				tracing::warn!(
					url,
					pages_fetched = self.pages_fetched,
					error = %e,
					"Page request failed."
				);

				return Some(Err(e));
			},
		};

		self.pages_fetched += 1;

		if page.value.is_empty() {
			return Some(Ok(page.value));
		}

		match page.next_link.filter(|link| !link.is_empty()) {
			Some(_) if self.pages_fetched >= self.max_pages => {
				self.ceiling_reached = true;

				tracing::warn!(
					max_pages = self.max_pages,
					"Page ceiling reached; remaining pages were not fetched."
				);
			},
			next => self.next_url = next,
		}

		Some(Ok(page.value))
	}

	/// Successful page requests so far.
	pub fn pages_fetched(&self) -> usize {
		self.pages_fetched
	}

	/// `true` once the page ceiling stopped pagination.
	pub fn ceiling_reached(&self) -> bool {
		self.ceiling_reached
	}

	/// Drains the pager, keeping the items fetched before any failure.
	pub async fn collect(mut self) -> Paginated<T> {
		let span = OpSpan::new(Operation::Paginate, "collect");

		obs::record_operation(Operation::Paginate, Outcome::Attempt);

		let (items, error) = span
			.instrument(async {
				let mut items = Vec::new();

				while let Some(page) = self.next_page().await {
					match page {
						Ok(mut values) => items.append(&mut values),
						Err(e) => return (items, Some(e)),
					}
				}

				(items, None)
			})
			.await;
		let outcome = if error.is_some() { Outcome::Failure } else { Outcome::Success };

		obs::record_operation(Operation::Paginate, outcome);

		Paginated {
			items,
			pages_fetched: self.pages_fetched,
			ceiling_reached: self.ceiling_reached,
			error,
		}
	}
}
