//! usage service: the data-plane reporting path.

use chrono::{DateTime, Utc};
use tonic::{Request, Response, Status};

use hue_types::{UsageReport, UsageReportResult};

use crate::AppState;
use crate::rpc::pb::{self, usage_service_server::UsageService};
use crate::rpc::check_node_ip;

/// usage service implementation.
pub struct UsageServiceImpl {
    state: AppState,
}

impl UsageServiceImpl {
    /// create the service over the shared application state.
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

fn report_from_proto(report: pb::UsageReport) -> UsageReport {
    let timestamp = DateTime::from_timestamp(report.timestamp, 0).unwrap_or_else(Utc::now);
    UsageReport {
        id: report.id,
        user_id: report.user_id,
        node_id: report.node_id,
        service_id: report.service_id,
        upload: report.upload,
        download: report.download,
        session_id: report.session_id,
        client_ip: report.client_ip,
        tags: report.tags,
        timestamp,
    }
}

fn result_to_proto(result: UsageReportResult) -> pb::UsageReportResult {
    pb::UsageReportResult {
        user_id: result.user_id,
        package_id: result.package_id,
        accepted: result.accepted,
        quota_exceeded: result.quota_exceeded,
        session_limit_hit: result.session_limit_hit,
        penalty_applied: result.penalty_applied,
        should_disconnect: result.should_disconnect,
        reason: result.reason,
    }
}

#[tonic::async_trait]
impl UsageService for UsageServiceImpl {
    async fn report_usage(
        &self,
        request: Request<pb::ReportUsageRequest>,
    ) -> Result<Response<pb::ReportUsageResponse>, Status> {
        check_node_ip(&request, &self.state.config)?;

        let Some(report) = request.into_inner().report else {
            return Err(Status::invalid_argument("report is required"));
        };
        let report = report_from_proto(report);

        let result = self.state.engine.process_report(&report).await;
        Ok(Response::new(pb::ReportUsageResponse {
            result: Some(result_to_proto(result)),
        }))
    }

    async fn batch_report_usage(
        &self,
        request: Request<pb::BatchReportUsageRequest>,
    ) -> Result<Response<pb::BatchReportUsageResponse>, Status> {
        check_node_ip(&request, &self.state.config)?;

        let reports: Vec<UsageReport> = request
            .into_inner()
            .reports
            .into_iter()
            .map(report_from_proto)
            .collect();

        let results = self.state.engine.process_batch(&reports).await;
        Ok(Response::new(pb::BatchReportUsageResponse {
            results: results.into_iter().map(result_to_proto).collect(),
        }))
    }

    async fn get_disconnect_commands(
        &self,
        request: Request<pb::GetDisconnectCommandsRequest>,
    ) -> Result<Response<pb::GetDisconnectCommandsResponse>, Status> {
        check_node_ip(&request, &self.state.config)?;
        let _node_id = request.into_inner().node_id;

        let commands = self
            .state
            .engine
            .disconnect_batch()
            .into_iter()
            .map(|cmd| pb::DisconnectCommand {
                user_id: cmd.user_id,
                session_id: cmd.session_id,
                reason: cmd.reason,
                node_id: cmd.node_id,
            })
            .collect();

        Ok(Response::new(pb::GetDisconnectCommandsResponse { commands }))
    }
}
