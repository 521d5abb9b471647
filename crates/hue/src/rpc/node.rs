//! node service: data-plane bootstrap.

use tonic::{Request, Response, Status};

use crate::AppState;
use crate::rpc::pb::{self, node_service_server::NodeService};
use crate::rpc::check_node_ip;

/// node service implementation.
pub struct NodeServiceImpl {
    state: AppState,
}

impl NodeServiceImpl {
    /// create the service over the shared application state.
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[tonic::async_trait]
impl NodeService for NodeServiceImpl {
    async fn authenticate(
        &self,
        request: Request<pb::AuthenticateNodeRequest>,
    ) -> Result<Response<pb::AuthenticateNodeResponse>, Status> {
        check_node_ip(&request, &self.state.config)?;

        let secret_key = request.into_inner().secret_key;
        if secret_key.is_empty() {
            return Err(Status::invalid_argument("secret_key is required"));
        }

        let node = self
            .state
            .meta
            .get_node_by_secret_key(&secret_key)
            .await
            .map_err(|e| Status::internal(e.to_string()))?;

        Ok(Response::new(match node {
            Some(node) => pb::AuthenticateNodeResponse {
                success: true,
                node_id: node.id,
            },
            None => pb::AuthenticateNodeResponse {
                success: false,
                node_id: String::new(),
            },
        }))
    }

    async fn heartbeat(
        &self,
        request: Request<pb::HeartbeatRequest>,
    ) -> Result<Response<pb::HeartbeatResponse>, Status> {
        check_node_ip(&request, &self.state.config)?;

        let node_id = request.into_inner().node_id;
        let known = self
            .state
            .meta
            .get_node(&node_id)
            .await
            .map_err(|e| Status::internal(e.to_string()))?
            .is_some();

        Ok(Response::new(pb::HeartbeatResponse { success: known }))
    }
}
