//! admin service: control-plane CRUD over gRPC.
//!
//! thin wrappers around the metadata store; enforcement state never lives
//! here. Every call authenticates with the shared admin secret.

use chrono::{DateTime, Utc};
use tonic::{Request, Response, Status};

use hue_db::EventQuery;
use hue_types::{
    AuthMethod, Event, EventType, Node, NodeCreate, Package, PackageCreate, ResetMode, Service,
    ServiceCreate, User, UserFilter, UserStatus,
};

use crate::AppState;
use crate::rpc::pb::{self, admin_service_server::AdminService};
use crate::rpc::{check_admin_secret, unix_or_zero};

/// admin service implementation.
pub struct AdminServiceImpl {
    state: AppState,
}

impl AdminServiceImpl {
    /// create the service over the shared application state.
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

fn internal(e: impl std::fmt::Display) -> Status {
    Status::internal(e.to_string())
}

fn user_to_proto(user: User) -> pb::User {
    pb::User {
        id: user.id,
        manager_id: user.manager_id.unwrap_or_default(),
        username: user.username,
        public_key: user.public_key,
        groups: user.groups,
        allowed_devices: user.allowed_devices,
        status: user.status.to_string(),
        active_package_id: user.active_package_id.unwrap_or_default(),
        first_connection_at: unix_or_zero(user.first_connection_at),
        last_connection_at: unix_or_zero(user.last_connection_at),
        created_at: user.created_at.timestamp(),
        updated_at: user.updated_at.timestamp(),
    }
}

fn package_to_proto(pkg: Package) -> pb::Package {
    pb::Package {
        id: pkg.id,
        user_id: pkg.user_id,
        total_traffic: pkg.total_traffic,
        upload_limit: pkg.upload_limit,
        download_limit: pkg.download_limit,
        reset_mode: pkg.reset_mode.to_string(),
        duration: pkg.duration,
        start_at: unix_or_zero(pkg.start_at),
        max_concurrent: pkg.max_concurrent,
        status: pkg.status.to_string(),
        current_upload: pkg.current_upload,
        current_download: pkg.current_download,
        current_total: pkg.current_total,
        expires_at: unix_or_zero(pkg.expires_at),
    }
}

fn node_to_proto(node: Node) -> pb::Node {
    pb::Node {
        id: node.id,
        name: node.name,
        allowed_ips: node.allowed_ips,
        traffic_multiplier: node.traffic_multiplier,
        reset_mode: node.reset_mode.to_string(),
        current_upload: node.current_upload,
        current_download: node.current_download,
        country: node.country,
        city: node.city,
        isp: node.isp,
    }
}

fn service_to_proto(service: Service) -> pb::Service {
    pb::Service {
        id: service.id,
        node_id: service.node_id,
        name: service.name,
        protocol: service.protocol,
        allowed_auth_methods: service
            .allowed_auth_methods
            .iter()
            .map(|m| {
                serde_json::to_value(m)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default()
            })
            .collect(),
        callback_url: service.callback_url,
        current_upload: service.current_upload,
        current_download: service.current_download,
    }
}

fn event_to_proto(ev: Event) -> pb::Event {
    pb::Event {
        id: ev.id,
        r#type: ev.event_type.to_string(),
        user_id: ev.user_id.unwrap_or_default(),
        package_id: ev.package_id.unwrap_or_default(),
        node_id: ev.node_id.unwrap_or_default(),
        service_id: ev.service_id.unwrap_or_default(),
        tags: ev.tags,
        timestamp: ev.timestamp.timestamp(),
    }
}

fn parse_auth_methods(labels: &[String]) -> Vec<AuthMethod> {
    labels
        .iter()
        .filter_map(|label| serde_json::from_value(serde_json::Value::String(label.clone())).ok())
        .collect()
}

fn optional(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

#[tonic::async_trait]
impl AdminService for AdminServiceImpl {
    // ============ users ============

    async fn create_user(
        &self,
        request: Request<pb::CreateUserRequest>,
    ) -> Result<Response<pb::User>, Status> {
        check_admin_secret(&request, &self.state.config)?;
        let req = request.into_inner();

        if req.username.is_empty() || req.password.is_empty() {
            return Err(Status::invalid_argument("username and password are required"));
        }

        let mut user = User::new(req.username, req.password);
        user.manager_id = optional(req.manager_id);
        user.public_key = req.public_key;
        user.private_key = req.private_key;
        user.ca_cert_list = req.ca_cert_list;
        user.groups = req.groups;
        user.allowed_devices = req.allowed_devices;
        user.active_package_id = optional(req.active_package_id);

        self.state.meta.create_user(&user).await.map_err(internal)?;
        Ok(Response::new(user_to_proto(user)))
    }

    async fn get_user(
        &self,
        request: Request<pb::GetUserRequest>,
    ) -> Result<Response<pb::User>, Status> {
        check_admin_secret(&request, &self.state.config)?;
        let id = request.into_inner().id;

        let user = self
            .state
            .meta
            .get_user(&id)
            .await
            .map_err(internal)?
            .ok_or_else(|| Status::not_found("user not found"))?;
        Ok(Response::new(user_to_proto(user)))
    }

    async fn list_users(
        &self,
        request: Request<pb::ListUsersRequest>,
    ) -> Result<Response<pb::ListUsersResponse>, Status> {
        check_admin_secret(&request, &self.state.config)?;
        let req = request.into_inner();

        let filter = UserFilter {
            status: optional(req.status).map(|s| UserStatus::parse(&s)),
            search: optional(req.search),
            limit: req.limit,
            offset: req.offset,
        };
        let users = self.state.meta.list_users(&filter).await.map_err(internal)?;
        let total = users.len() as u32;

        Ok(Response::new(pb::ListUsersResponse {
            users: users.into_iter().map(user_to_proto).collect(),
            total,
        }))
    }

    async fn update_user(
        &self,
        request: Request<pb::UpdateUserRequest>,
    ) -> Result<Response<pb::User>, Status> {
        check_admin_secret(&request, &self.state.config)?;
        let req = request.into_inner();

        let mut user = self
            .state
            .meta
            .get_user(&req.id)
            .await
            .map_err(internal)?
            .ok_or_else(|| Status::not_found("user not found"))?;

        if !req.username.is_empty() {
            user.username = req.username;
        }
        if !req.password.is_empty() {
            user.password = req.password;
        }
        if !req.status.is_empty() {
            user.status = UserStatus::parse(&req.status);
        }
        if !req.active_package_id.is_empty() {
            user.active_package_id = Some(req.active_package_id);
        }
        if !req.manager_id.is_empty() {
            user.manager_id = Some(req.manager_id);
        }

        self.state.meta.update_user(&user).await.map_err(internal)?;
        self.state
            .engine
            .quota()
            .refresh_cache(&user.id)
            .await
            .map_err(internal)?;

        Ok(Response::new(user_to_proto(user)))
    }

    async fn delete_user(
        &self,
        request: Request<pb::DeleteUserRequest>,
    ) -> Result<Response<pb::DeleteUserResponse>, Status> {
        check_admin_secret(&request, &self.state.config)?;
        let id = request.into_inner().id;

        self.state
            .meta
            .get_user(&id)
            .await
            .map_err(internal)?
            .ok_or_else(|| Status::not_found("user not found"))?;

        self.state.meta.delete_user(&id).await.map_err(internal)?;
        self.state.state.delete_user(&id);
        Ok(Response::new(pb::DeleteUserResponse { success: true }))
    }

    // ============ packages ============

    async fn create_package(
        &self,
        request: Request<pb::CreatePackageRequest>,
    ) -> Result<Response<pb::Package>, Status> {
        check_admin_secret(&request, &self.state.config)?;
        let req = request.into_inner();

        if req.duration <= 0 {
            return Err(Status::invalid_argument("duration must be positive"));
        }
        self.state
            .meta
            .get_user(&req.user_id)
            .await
            .map_err(internal)?
            .ok_or_else(|| Status::not_found("user not found"))?;

        let create = PackageCreate {
            user_id: req.user_id,
            total_traffic: req.total_traffic,
            total_limit: 0,
            upload_limit: req.upload_limit,
            download_limit: req.download_limit,
            reset_mode: ResetMode::parse(&req.reset_mode),
            duration: req.duration,
            start_at: (req.start_at > 0)
                .then(|| DateTime::<Utc>::from_timestamp(req.start_at, 0))
                .flatten(),
            max_concurrent: req.max_concurrent,
        };
        let pkg = create.into_package();
        self.state.meta.create_package(&pkg).await.map_err(internal)?;
        Ok(Response::new(package_to_proto(pkg)))
    }

    async fn get_package(
        &self,
        request: Request<pb::GetPackageRequest>,
    ) -> Result<Response<pb::Package>, Status> {
        check_admin_secret(&request, &self.state.config)?;
        let id = request.into_inner().id;

        let pkg = self
            .state
            .meta
            .get_package(&id)
            .await
            .map_err(internal)?
            .ok_or_else(|| Status::not_found("package not found"))?;
        Ok(Response::new(package_to_proto(pkg)))
    }

    // ============ nodes ============

    async fn create_node(
        &self,
        request: Request<pb::CreateNodeRequest>,
    ) -> Result<Response<pb::Node>, Status> {
        check_admin_secret(&request, &self.state.config)?;
        let req = request.into_inner();

        if req.name.is_empty() || req.secret_key.is_empty() {
            return Err(Status::invalid_argument("name and secret_key are required"));
        }

        let create = NodeCreate {
            name: req.name,
            secret_key: req.secret_key,
            allowed_ips: req.allowed_ips,
            traffic_multiplier: if req.traffic_multiplier > 0.0 {
                req.traffic_multiplier
            } else {
                1.0
            },
            reset_mode: ResetMode::parse(&req.reset_mode),
            reset_day: 0,
            country: req.country,
            city: req.city,
            isp: req.isp,
        };
        let node = create.into_node();
        self.state.meta.create_node(&node).await.map_err(internal)?;
        Ok(Response::new(node_to_proto(node)))
    }

    async fn get_node(
        &self,
        request: Request<pb::GetNodeRequest>,
    ) -> Result<Response<pb::Node>, Status> {
        check_admin_secret(&request, &self.state.config)?;
        let id = request.into_inner().id;

        let node = self
            .state
            .meta
            .get_node(&id)
            .await
            .map_err(internal)?
            .ok_or_else(|| Status::not_found("node not found"))?;
        Ok(Response::new(node_to_proto(node)))
    }

    async fn list_nodes(
        &self,
        request: Request<pb::ListNodesRequest>,
    ) -> Result<Response<pb::ListNodesResponse>, Status> {
        check_admin_secret(&request, &self.state.config)?;
        let nodes = self.state.meta.list_nodes().await.map_err(internal)?;
        Ok(Response::new(pb::ListNodesResponse {
            nodes: nodes.into_iter().map(node_to_proto).collect(),
        }))
    }

    async fn delete_node(
        &self,
        request: Request<pb::DeleteNodeRequest>,
    ) -> Result<Response<pb::DeleteNodeResponse>, Status> {
        check_admin_secret(&request, &self.state.config)?;
        let id = request.into_inner().id;
        self.state.meta.delete_node(&id).await.map_err(internal)?;
        Ok(Response::new(pb::DeleteNodeResponse { success: true }))
    }

    // ============ services ============

    async fn create_service(
        &self,
        request: Request<pb::CreateServiceRequest>,
    ) -> Result<Response<pb::Service>, Status> {
        check_admin_secret(&request, &self.state.config)?;
        let req = request.into_inner();

        if req.name.is_empty() || req.secret_key.is_empty() || req.protocol.is_empty() {
            return Err(Status::invalid_argument(
                "name, secret_key and protocol are required",
            ));
        }
        self.state
            .meta
            .get_node(&req.node_id)
            .await
            .map_err(internal)?
            .ok_or_else(|| Status::not_found("node not found"))?;

        let create = ServiceCreate {
            node_id: req.node_id,
            secret_key: req.secret_key,
            name: req.name,
            protocol: req.protocol,
            allowed_auth_methods: parse_auth_methods(&req.allowed_auth_methods),
            callback_url: req.callback_url,
        };
        let service = create.into_service();
        self.state
            .meta
            .create_service(&service)
            .await
            .map_err(internal)?;
        Ok(Response::new(service_to_proto(service)))
    }

    async fn get_service(
        &self,
        request: Request<pb::GetServiceRequest>,
    ) -> Result<Response<pb::Service>, Status> {
        check_admin_secret(&request, &self.state.config)?;
        let id = request.into_inner().id;

        let service = self
            .state
            .meta
            .get_service(&id)
            .await
            .map_err(internal)?
            .ok_or_else(|| Status::not_found("service not found"))?;
        Ok(Response::new(service_to_proto(service)))
    }

    async fn delete_service(
        &self,
        request: Request<pb::DeleteServiceRequest>,
    ) -> Result<Response<pb::DeleteServiceResponse>, Status> {
        check_admin_secret(&request, &self.state.config)?;
        let id = request.into_inner().id;
        self.state.meta.delete_service(&id).await.map_err(internal)?;
        Ok(Response::new(pb::DeleteServiceResponse { success: true }))
    }

    // ============ events ============

    async fn query_events(
        &self,
        request: Request<pb::QueryEventsRequest>,
    ) -> Result<Response<pb::QueryEventsResponse>, Status> {
        check_admin_secret(&request, &self.state.config)?;
        let req = request.into_inner();

        let query = EventQuery {
            event_type: optional(req.r#type).and_then(|t| EventType::parse(&t)),
            user_id: optional(req.user_id),
            start: (req.start > 0)
                .then(|| DateTime::<Utc>::from_timestamp(req.start, 0))
                .flatten(),
            end: (req.end > 0)
                .then(|| DateTime::<Utc>::from_timestamp(req.end, 0))
                .flatten(),
            limit: req.limit,
        };

        let events = self
            .state
            .engine
            .events()
            .events(&query)
            .await
            .map_err(internal)?;

        Ok(Response::new(pb::QueryEventsResponse {
            events: events.into_iter().map(event_to_proto).collect(),
        }))
    }
}
