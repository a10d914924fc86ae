//! Construction of request-scoped server instances

use std::sync::Arc;

use crate::dataforseo_client::SeoApi;
use crate::domain::tools::ToolCatalog;
use crate::mcp::server::{McpServer, ServerInstance};
use crate::{credentials::Credentials, errors::AppError};

/// Builds a fresh, fully independent server instance for every request.
///
/// Implementations must not hand out the same instance twice; the only state an
/// instance may share with others is read-only configuration.
pub trait ServerFactory: Send + Sync {
    fn create(&self, credentials: Credentials) -> Result<Arc<dyn ServerInstance>, AppError>;
}

pub struct McpServerFactory {
    api: Arc<dyn SeoApi>,
    catalog: Arc<ToolCatalog>,
}

impl McpServerFactory {
    pub fn new(api: Arc<dyn SeoApi>, catalog: ToolCatalog) -> Self {
        Self {
            api,
            catalog: Arc::new(catalog),
        }
    }
}

impl ServerFactory for McpServerFactory {
    fn create(&self, credentials: Credentials) -> Result<Arc<dyn ServerInstance>, AppError> {
        if self.catalog.is_empty() {
            return Err(AppError::internal("no tools are enabled"));
        }

        Ok(Arc::new(McpServer::new(
            credentials,
            Arc::clone(&self.api),
            Arc::clone(&self.catalog),
        )))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::Value;

    use super::*;
    use crate::{dataforseo_client::UpstreamError, domain::modules::EnabledModules};

    struct NoopApi;

    #[async_trait]
    impl SeoApi for NoopApi {
        async fn post(
            &self,
            _credentials: &Credentials,
            _path: &str,
            _body: Value,
        ) -> Result<Value, UpstreamError> {
            Ok(Value::Null)
        }
    }

    #[test]
    fn creates_distinct_instances() {
        let factory = McpServerFactory::new(
            Arc::new(NoopApi),
            ToolCatalog::new(&EnabledModules::all()),
        );

        let first = factory
            .create(Credentials::new("a", "1"))
            .expect("first instance");
        let second = factory
            .create(Credentials::new("b", "2"))
            .expect("second instance");

        assert!(!std::ptr::eq(
            Arc::as_ptr(&first) as *const (),
            Arc::as_ptr(&second) as *const ()
        ));
    }

    #[test]
    fn empty_catalog_fails_construction() {
        let factory = McpServerFactory::new(
            Arc::new(NoopApi),
            ToolCatalog::from_tools(Vec::new()),
        );

        let err = factory
            .create(Credentials::new("a", "1"))
            .err()
            .expect("construction should fail");
        assert!(matches!(err, AppError::Internal { .. }));
    }
}
