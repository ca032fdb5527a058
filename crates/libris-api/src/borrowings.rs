// Borrowing endpoints.

use reqwest::Method;
use serde_json::json;
use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::models::{ActiveBorrowing, EntityId};

impl ApiClient {
    /// Borrow a copy of a book for the current member.
    ///
    /// `POST /borrowings` with `{book_id}`. The response body is ignored.
    pub async fn borrow_book(&self, book_id: &EntityId) -> Result<(), Error> {
        let url = self.endpoint(&["borrowings"])?;
        self.send_json(Method::POST, url, &json!({ "book_id": book_id }), &[200, 201])
            .await?;
        debug!(%book_id, "book borrowed");
        Ok(())
    }

    /// Mark a borrowing as returned.
    ///
    /// `POST /borrowings/{id}/return`
    pub async fn return_borrowing(&self, borrowing_id: &EntityId) -> Result<(), Error> {
        let url = self.endpoint(&["borrowings", borrowing_id.as_str(), "return"])?;
        self.send(Method::POST, url, &[200, 201]).await?;
        debug!(%borrowing_id, "borrowing returned");
        Ok(())
    }

    /// Every unreturned borrowing in the library.
    ///
    /// `GET /borrowings/current`
    pub async fn current_borrowings(&self) -> Result<Vec<ActiveBorrowing>, Error> {
        let url = self.endpoint(&["borrowings", "current"])?;
        self.get_json(url).await
    }
}
