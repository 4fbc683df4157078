use std::sync::Arc;

use riskboard_core::{DashboardPayload, DashboardQuery, ExportRequest, ExportResponse};
use riskboard_sync::{DashboardClient, FetchError};

/// Where the controller gets dashboard data from.
#[async_trait::async_trait]
pub trait DashboardSource: Send + Sync + 'static {
    async fn fetch(&self, query: &DashboardQuery) -> Result<DashboardPayload, FetchError>;

    async fn export(&self, request: &ExportRequest) -> Result<ExportResponse, FetchError>;
}

#[async_trait::async_trait]
impl<T: DashboardSource + ?Sized> DashboardSource for Arc<T> {
    async fn fetch(&self, query: &DashboardQuery) -> Result<DashboardPayload, FetchError> {
        (**self).fetch(query).await
    }

    async fn export(&self, request: &ExportRequest) -> Result<ExportResponse, FetchError> {
        (**self).export(request).await
    }
}

#[async_trait::async_trait]
impl DashboardSource for DashboardClient {
    async fn fetch(&self, query: &DashboardQuery) -> Result<DashboardPayload, FetchError> {
        self.fetch_dashboard(query).await
    }

    async fn export(&self, request: &ExportRequest) -> Result<ExportResponse, FetchError> {
        DashboardClient::export(self, request).await
    }
}
