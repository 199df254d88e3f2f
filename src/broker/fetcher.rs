use super::{FetchWindow, OrdersApi, PageRequest};
use crate::constants::DEFAULT_PAGE_SIZE;
use crate::error::ReconcileError;
use crate::model::FilledOrder;
use tracing::{debug, info};

/// Walks the paginated order endpoint for one window.
pub struct OrderFetcher<'a, A: ?Sized> {
    api: &'a A,
    page_size: u32,
}

impl<'a, A: OrdersApi + ?Sized> OrderFetcher<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self {
            api,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Every filled order in `window`, oldest fill first.
    ///
    /// Follows next-page locators until the broker stops returning one. Any failed page
    /// fails the whole fetch; nothing already collected is returned.
    pub async fn fetch_filled_orders(
        &self,
        window: &FetchWindow,
    ) -> Result<Vec<FilledOrder>, ReconcileError> {
        if window.is_empty() {
            debug!(after = %window.after, until = %window.until, "Empty fetch window");
            return Ok(Vec::new());
        }

        let mut request = PageRequest::First {
            window: *window,
            limit: self.page_size,
        };
        let mut orders = Vec::new();
        let mut page = 0usize;

        loop {
            let result = self
                .api
                .fetch_page(&request)
                .await
                .map_err(|e| e.at_page(page))?;
            debug!(page, records = result.orders.len(), "Fetched order page");
            orders.extend(result.orders);

            match result.next {
                Some(url) => {
                    request = PageRequest::Next(url);
                    page += 1;
                }
                None => break,
            }
        }

        info!(
            pages = page + 1,
            orders = orders.len(),
            after = %window.after,
            until = %window.until,
            "Fetched filled orders"
        );
        Ok(orders)
    }
}
