// Dashboard endpoints.

use crate::client::ApiClient;
use crate::error::Error;
use crate::models::{LibrarianDashboard, MemberDashboard};

impl ApiClient {
    /// `GET /dashboards/librarian`
    pub async fn librarian_dashboard(&self) -> Result<LibrarianDashboard, Error> {
        let url = self.endpoint(&["dashboards", "librarian"])?;
        self.get_json(url).await
    }

    /// `GET /dashboards/member`
    pub async fn member_dashboard(&self) -> Result<MemberDashboard, Error> {
        let url = self.endpoint(&["dashboards", "member"])?;
        self.get_json(url).await
    }
}
