//! Error types for backend calls and the notices shown for them.
//!
//! Every failure a page can observe is an `ApiError`. `ApiError::notice`
//! turns it into the localized text the user sees; there is no global toast.

use std::fmt;

use thiserror::Error;

/// Fixed message for HTTP 429, shown the same way on every page.
pub const TOO_MANY_REQUESTS_MESSAGE: &str =
    "Bạn đã gửi quá nhiều yêu cầu. Vui lòng thử lại sau ít phút.";

/// Business-rule rejections the backend reports with a machine-readable `code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendErrorCode {
    AppointmentOverlap,
    ShiftFull,
    DoctorNotOnDuty,
    DuplicateBooking,
    PastDate,
    ShiftAlreadyCancelled,
}

impl BackendErrorCode {
    /// Parse the backend `code` field. Unknown codes return `None`.
    pub fn from_wire(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "APPOINTMENT_OVERLAP" => Some(BackendErrorCode::AppointmentOverlap),
            "SHIFT_FULL" => Some(BackendErrorCode::ShiftFull),
            "DOCTOR_NOT_ON_DUTY" => Some(BackendErrorCode::DoctorNotOnDuty),
            "DUPLICATE_BOOKING" => Some(BackendErrorCode::DuplicateBooking),
            "PAST_DATE" => Some(BackendErrorCode::PastDate),
            "SHIFT_ALREADY_CANCELLED" => Some(BackendErrorCode::ShiftAlreadyCancelled),
            _ => None,
        }
    }
}

/// Errors observed when talking to the clinic backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("Too many requests")]
    RateLimited,

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Access denied")]
    Forbidden,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Request rejected: {message}")]
    Rejected {
        code: Option<BackendErrorCode>,
        message: String,
    },

    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Classify a non-success HTTP response.
    pub fn from_status(status: u16, message: Option<String>, code: Option<&str>) -> Self {
        let message = message.unwrap_or_default();
        match status {
            429 => ApiError::RateLimited,
            401 => ApiError::Unauthenticated,
            403 => ApiError::Forbidden,
            404 => ApiError::NotFound(message),
            400 | 409 | 422 => ApiError::Rejected {
                code: code.and_then(BackendErrorCode::from_wire),
                message,
            },
            _ => ApiError::Server { status, message },
        }
    }

    /// The user-facing notice for this error.
    pub fn notice(&self) -> Notice {
        match self {
            ApiError::RateLimited => {
                Notice::warning("Quá nhiều yêu cầu", TOO_MANY_REQUESTS_MESSAGE)
            }
            ApiError::Unauthenticated => Notice::error(
                "Phiên đăng nhập đã hết hạn",
                "Vui lòng đăng nhập lại để tiếp tục.",
            ),
            ApiError::Forbidden => Notice::error(
                "Không có quyền truy cập",
                "Bạn không có quyền thực hiện thao tác này.",
            ),
            ApiError::NotFound(_) => Notice::error(
                "Không tìm thấy dữ liệu",
                "Dữ liệu yêu cầu không tồn tại hoặc đã bị xoá.",
            ),
            ApiError::Rejected { code, message } => rejection_notice(*code, message),
            ApiError::Server { .. } => Notice::error(
                "Lỗi máy chủ",
                "Đã có lỗi xảy ra. Vui lòng thử lại sau.",
            ),
            ApiError::Network(_) => Notice::error(
                "Lỗi kết nối",
                "Không thể kết nối tới máy chủ. Vui lòng kiểm tra mạng.",
            ),
            ApiError::Decode(_) => Notice::error(
                "Dữ liệu không hợp lệ",
                "Máy chủ trả về dữ liệu không hợp lệ.",
            ),
        }
    }
}

fn rejection_notice(code: Option<BackendErrorCode>, raw_message: &str) -> Notice {
    let Some(code) = code else {
        let message = if raw_message.trim().is_empty() {
            "Không thể thực hiện yêu cầu."
        } else {
            raw_message
        };
        return Notice::error("Không thể thực hiện yêu cầu", message);
    };

    match code {
        BackendErrorCode::AppointmentOverlap => Notice::error(
            "Trùng lịch hẹn",
            "Bệnh nhân đã có lịch hẹn khác trong khung giờ này.",
        ),
        BackendErrorCode::ShiftFull => Notice::error(
            "Ca khám đã đầy",
            "Ca khám đã đủ số lượng bệnh nhân. Vui lòng chọn ca khác.",
        ),
        BackendErrorCode::DoctorNotOnDuty => Notice::error(
            "Bác sĩ không có lịch trực",
            "Bác sĩ không trực trong ca đã chọn. Vui lòng chọn bác sĩ hoặc ca khác.",
        ),
        BackendErrorCode::DuplicateBooking => Notice::warning(
            "Lịch hẹn đã tồn tại",
            "Lịch hẹn này đã được đặt trước đó.",
        ),
        BackendErrorCode::PastDate => Notice::error(
            "Ngày không hợp lệ",
            "Không thể đặt lịch cho ngày trong quá khứ.",
        ),
        BackendErrorCode::ShiftAlreadyCancelled => Notice::warning(
            "Ca trực đã bị huỷ",
            "Ca trực này đã được huỷ trước đó.",
        ),
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            ApiError::Decode(error.to_string())
        } else if let Some(status) = error.status() {
            ApiError::from_status(status.as_u16(), Some(error.to_string()), None)
        } else {
            ApiError::Network(error.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(error: serde_json::Error) -> Self {
        ApiError::Decode(error.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Text for a toast or dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn info(title: &str, message: &str) -> Self {
        Self::with(Severity::Info, title, message)
    }

    pub fn warning(title: &str, message: &str) -> Self {
        Self::with(Severity::Warning, title, message)
    }

    pub fn error(title: &str, message: &str) -> Self {
        Self::with(Severity::Error, title, message)
    }

    fn with(severity: Severity, title: &str, message: &str) -> Self {
        Notice {
            severity,
            title: title.to_string(),
            message: message.to_string(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}
