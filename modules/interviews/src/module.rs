use std::sync::Arc;

use axum::Router;
use tracing::{debug, info};

use crate::api::rest::openapi::ApiCatalog;
use crate::api::rest::routes::{self, RouteDeps};
use crate::config::InterviewsConfig;
use crate::contract::client::InterviewsApi;
use crate::domain::account::AccountService;
use crate::domain::export::ExportService;
use crate::domain::mapper::field;
use crate::domain::ports::{AuthSession, BlobStore, RecordStore};
use crate::domain::profile::{ProfileConfig, ProfileService};
use crate::domain::service::Service;
use crate::domain::sync::{InterviewSynchronizer, SessionBinding, SyncConfig};
use crate::gateways::local::InterviewsLocalClient;
use crate::infra::{LocalSession, MemoryBlobStore, MemoryRecordStore, OwnerRule};

/// The interviews module wired against in-process adapters.
pub struct Interviews {
    config: InterviewsConfig,
    session: Arc<LocalSession>,
    store: MemoryRecordStore,
    blobs: Arc<MemoryBlobStore>,
    service: Arc<Service>,
    binding: SessionBinding,
}

impl Interviews {
    /// Build the module and start following the session. Must be called
    /// inside a Tokio runtime.
    pub fn init(config: InterviewsConfig) -> Self {
        info!("Initializing interviews module");
        debug!(
            "Loaded interviews config: interviews_collection={}, profiles_collection={}, owner_rule={}",
            config.interviews_collection, config.profiles_collection, config.owner_rule
        );

        let session = Arc::new(LocalSession::new());
        let store = if config.owner_rule {
            MemoryRecordStore::with_owner_rules(
                session.clone(),
                [
                    (
                        config.interviews_collection.clone(),
                        OwnerRule::Field(field::USER_ID.to_string()),
                    ),
                    (config.profiles_collection.clone(), OwnerRule::DocumentId),
                ],
            )
        } else {
            MemoryRecordStore::new()
        };
        let blobs = Arc::new(MemoryBlobStore::new(config.blob_base_url.clone()));

        let session_port: Arc<dyn AuthSession> = session.clone();
        let store_port: Arc<dyn RecordStore> = Arc::new(store.clone());
        let blob_port: Arc<dyn BlobStore> = blobs.clone();

        let sync = Arc::new(InterviewSynchronizer::new(
            store_port.clone(),
            session_port.clone(),
            SyncConfig {
                collection: config.interviews_collection.clone(),
                max_text_length: config.max_text_length,
            },
        ));
        let profile = ProfileService::new(
            store_port.clone(),
            blob_port.clone(),
            session_port.clone(),
            ProfileConfig {
                collection: config.profiles_collection.clone(),
                max_text_length: config.max_text_length,
                max_upload_bytes: config.max_upload_bytes,
            },
        );
        let account = AccountService::new(
            store_port.clone(),
            blob_port,
            session_port.clone(),
            sync.clone(),
            config.interviews_collection.clone(),
            config.profiles_collection.clone(),
        );
        let export = ExportService::new(
            store_port,
            session_port.clone(),
            config.interviews_collection.clone(),
            config.profiles_collection.clone(),
        );

        let binding = sync.bind_session();
        let service = Arc::new(Service::new(session_port, sync, profile, account, export));
        info!("Interviews module initialized");

        Self {
            config,
            session,
            store,
            blobs,
            service,
            binding,
        }
    }

    pub fn config(&self) -> &InterviewsConfig {
        &self.config
    }

    pub fn service(&self) -> Arc<Service> {
        self.service.clone()
    }

    pub fn session(&self) -> Arc<LocalSession> {
        self.session.clone()
    }

    /// Direct handle on the backing store (failure injection in tests).
    pub fn store(&self) -> &MemoryRecordStore {
        &self.store
    }

    pub fn blobs(&self) -> Arc<MemoryBlobStore> {
        self.blobs.clone()
    }

    /// In-process client for other modules.
    pub fn client(&self) -> Arc<dyn InterviewsApi> {
        Arc::new(InterviewsLocalClient::new(self.service.clone()))
    }

    /// REST routes plus `/api/openapi.json`.
    pub fn router(&self) -> Router {
        info!("Registering interviews REST routes");
        let mut catalog = ApiCatalog::new();
        let router = routes::register_routes(
            Router::new(),
            &mut catalog,
            RouteDeps {
                service: self.service.clone(),
                session: self.session.clone(),
                blobs: self.blobs.clone(),
                max_upload_bytes: self.config.max_upload_bytes,
            },
        );
        let doc = catalog.build_openapi("Interfy API", env!("CARGO_PKG_VERSION"));
        debug!(operations = catalog.operations().len(), "OpenAPI document built");
        routes::register_openapi_route(router, doc)
    }

    /// Stop following the session and release the subscription.
    pub async fn shutdown(self) {
        self.binding.shutdown().await;
        self.service.synchronizer().unsubscribe().await;
        info!("Interviews module stopped");
    }
}
