// Book catalog endpoints.

use reqwest::Method;
use serde_json::json;
use tracing::debug;

use crate::client::{ApiClient, decode};
use crate::error::Error;
use crate::models::{Book, BookChanges, BookInput, EntityId};

impl ApiClient {
    /// List every book.
    ///
    /// `GET /books`
    pub async fn list_books(&self) -> Result<Vec<Book>, Error> {
        let url = self.endpoint(&["books"])?;
        let books: Vec<Book> = self.get_json(url).await?;
        debug!(count = books.len(), "fetched books");
        Ok(books)
    }

    /// Fetch one book.
    ///
    /// `GET /books/{id}`
    pub async fn get_book(&self, id: &EntityId) -> Result<Book, Error> {
        let url = self.endpoint(&["books", id.as_str()])?;
        self.get_json(url).await
    }

    /// Create a book and return the server's entity.
    ///
    /// `POST /books` with `{book: {..}}`
    pub async fn create_book(&self, input: &BookInput) -> Result<Book, Error> {
        let url = self.endpoint(&["books"])?;
        let resp = self
            .send_json(Method::POST, url, &json!({ "book": input }), &[200, 201])
            .await?;
        decode(resp).await
    }

    /// Apply a partial update and return the server's entity.
    ///
    /// `PUT /books/{id}` with `{book: {..changed fields}}`
    pub async fn update_book(&self, id: &EntityId, changes: &BookChanges) -> Result<Book, Error> {
        let url = self.endpoint(&["books", id.as_str()])?;
        let resp = self
            .send_json(Method::PUT, url, &json!({ "book": changes }), &[200])
            .await?;
        decode(resp).await
    }

    /// `DELETE /books/{id}`
    pub async fn delete_book(&self, id: &EntityId) -> Result<(), Error> {
        let url = self.endpoint(&["books", id.as_str()])?;
        self.send(Method::DELETE, url, &[200, 204]).await?;
        Ok(())
    }
}
