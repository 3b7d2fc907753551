use std::sync::{PoisonError, RwLock};

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use serde_json::Value;

use super::dto::{
    decode_rows, Envelope, ErrorBody, ListPayload, RawAppointment, RawDoctorAvailability,
    RawShiftAssignment, RawShiftTemplate,
};
use super::ScheduleBackend;
use crate::availability::{BookingConfirmation, BookingRequest, DoctorAvailability};
use crate::cancellation::{ReschedulePreview, RescheduleSummary};
use crate::config::ClientConfig;
use crate::error::{ApiError, BackendErrorCode};
use crate::models::{Appointment, DoctorShiftAssignment, ShiftTemplate};
use crate::session::AuthSession;

/// Header carrying a per-mutation correlation id.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CancelShiftBody<'a> {
    cancel_reason: &'a str,
}

/// HTTP client for the clinic backend.
///
/// Every response is classified into `ApiError` here; callers never see a
/// raw status code.
pub struct ClinicClient {
    base_url: String,
    http: reqwest::Client,
    session: RwLock<AuthSession>,
}

impl ClinicClient {
    pub fn new(config: &ClientConfig, session: AuthSession) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            http,
            session: RwLock::new(session),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> AuthSession {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn refresh_session(&self, token: impl Into<String>) {
        self.session
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .refresh(token);
    }

    pub fn clear_session(&self) {
        self.session
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// `GET /doctor-shifts/availability?date=&specialtyId=`
    pub async fn doctor_availability(
        &self,
        date: &str,
        specialty_id: i64,
    ) -> Result<Vec<DoctorAvailability>, ApiError> {
        let specialty = specialty_id.to_string();
        let request = self
            .request(Method::GET, "/doctor-shifts/availability")
            .query(&[("date", date), ("specialtyId", specialty.as_str())]);
        let envelope: Envelope<Vec<Value>> = self.send(request).await?;
        let rows = unwrap_envelope(envelope)?;
        Ok(decode_rows::<RawDoctorAvailability>(rows, "doctor availability")
            .into_iter()
            .filter_map(RawDoctorAvailability::normalize)
            .collect())
    }

    /// `POST /appointments`
    pub async fn create_appointment(
        &self,
        booking: &BookingRequest,
    ) -> Result<BookingConfirmation, ApiError> {
        let request = self.mutation(Method::POST, "/appointments").json(booking);
        let envelope: Envelope<BookingConfirmation> = self.send(request).await?;
        unwrap_envelope(envelope)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(method = method.as_str(), url = url.as_str(), "Sending request");

        let builder = self.http.request(method, url);
        match self.session().bearer() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn mutation(&self, method: Method, path: &str) -> RequestBuilder {
        let request_id = Uuid::new_v4().to_string();
        debug!(request_id = request_id.as_str(), path, "Mutation");
        self.request(method, path)
            .header(REQUEST_ID_HEADER, request_id)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let error = classify_failure(status, &body);
            if error == ApiError::Unauthenticated {
                info!("Backend rejected the session token, clearing session");
                self.clear_session();
            }
            warn!(status = status.as_u16(), error = %error, "Request failed");
            return Err(error);
        }

        Ok(serde_json::from_str(&body)?)
    }
}

fn classify_failure(status: StatusCode, body: &str) -> ApiError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let code = parsed.code.clone();
    ApiError::from_status(status.as_u16(), parsed.into_message(), code.as_deref())
}

/// Treat `success: false` as a rejection and require `data`.
fn unwrap_envelope<T>(envelope: Envelope<T>) -> Result<T, ApiError> {
    if envelope.success == Some(false) {
        return Err(ApiError::Rejected {
            code: envelope.code.as_deref().and_then(BackendErrorCode::from_wire),
            message: envelope.message.unwrap_or_default(),
        });
    }
    envelope
        .data
        .ok_or_else(|| ApiError::Decode("response has no data".to_string()))
}

impl ScheduleBackend for ClinicClient {
    async fn shift_templates(&self) -> Result<Vec<ShiftTemplate>, ApiError> {
        let payload: ListPayload<Value> =
            self.send(self.request(Method::GET, "/shifts")).await?;
        let rows = match payload {
            ListPayload::Bare(rows) => rows,
            ListPayload::Wrapped(envelope) => unwrap_envelope(envelope)?,
        };
        Ok(decode_rows::<RawShiftTemplate>(rows, "shift template")
            .into_iter()
            .filter_map(RawShiftTemplate::normalize)
            .collect())
    }

    async fn doctor_shifts(&self, doctor_id: i64) -> Result<Vec<DoctorShiftAssignment>, ApiError> {
        let path = format!("/doctors/{doctor_id}/shifts");
        let envelope: Envelope<Vec<Value>> =
            self.send(self.request(Method::GET, &path)).await?;
        let rows = unwrap_envelope(envelope)?;
        Ok(decode_rows::<RawShiftAssignment>(rows, "shift assignment")
            .into_iter()
            .filter_map(RawShiftAssignment::normalize)
            .collect())
    }

    async fn appointments(
        &self,
        doctor_id: i64,
        date: Option<&str>,
    ) -> Result<Vec<Appointment>, ApiError> {
        let mut query = vec![("doctorId", doctor_id.to_string())];
        if let Some(date) = date {
            query.push(("date", date.to_string()));
        }
        let request = self.request(Method::GET, "/appointments").query(&query);
        let envelope: Envelope<Vec<Value>> = self.send(request).await?;
        let rows = unwrap_envelope(envelope)?;
        Ok(decode_rows::<RawAppointment>(rows, "appointment")
            .into_iter()
            .filter_map(RawAppointment::normalize)
            .collect())
    }

    async fn reschedule_preview(&self, assignment_id: i64) -> Result<ReschedulePreview, ApiError> {
        let path = format!("/doctor-shifts/{assignment_id}/reschedule-preview");
        let envelope: Envelope<ReschedulePreview> =
            self.send(self.request(Method::GET, &path)).await?;
        unwrap_envelope(envelope)
    }

    async fn cancel_and_reschedule(
        &self,
        assignment_id: i64,
        reason: &str,
    ) -> Result<RescheduleSummary, ApiError> {
        let path = format!("/doctor-shifts/{assignment_id}/cancel-and-reschedule");
        let request = self
            .mutation(Method::POST, &path)
            .json(&CancelShiftBody {
                cancel_reason: reason,
            });
        let envelope: Envelope<RescheduleSummary> = self.send(request).await?;
        let summary = unwrap_envelope(envelope)?;
        info!(
            assignment_id,
            rescheduled = summary.rescheduled_count,
            failed = summary.failed_count,
            "Shift cancelled"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_body_code_is_typed() {
        let error = classify_failure(
            StatusCode::CONFLICT,
            r#"{"success":false,"message":"Ca đã đầy","code":"SHIFT_FULL"}"#,
        );
        assert_eq!(
            error,
            ApiError::Rejected {
                code: Some(BackendErrorCode::ShiftFull),
                message: "Ca đã đầy".to_string()
            }
        );
    }

    #[test]
    fn non_json_failure_body_is_tolerated() {
        let error = classify_failure(StatusCode::TOO_MANY_REQUESTS, "<html>slow down</html>");
        assert_eq!(error, ApiError::RateLimited);
    }

    #[test]
    fn envelope_success_false_is_rejection() {
        let envelope: Envelope<Vec<i64>> = serde_json::from_str(
            r#"{"success":false,"message":"Bác sĩ không trực","code":"DOCTOR_NOT_ON_DUTY"}"#,
        )
        .unwrap();
        assert!(matches!(
            unwrap_envelope(envelope),
            Err(ApiError::Rejected {
                code: Some(BackendErrorCode::DoctorNotOnDuty),
                ..
            })
        ));
    }

    #[test]
    fn envelope_without_data_is_decode_error() {
        let envelope: Envelope<Vec<i64>> = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert!(matches!(unwrap_envelope(envelope), Err(ApiError::Decode(_))));
    }

    #[test]
    fn base_url_is_trimmed() {
        let config = ClientConfig {
            api_url: "http://clinic.local/api/".to_string(),
            ..ClientConfig::default()
        };
        let client = ClinicClient::new(&config, AuthSession::anonymous()).unwrap();
        assert_eq!(client.base_url(), "http://clinic.local/api");
    }
}
