use std::fmt;
use thiserror::Error;

/// Результат операций клиента Lygos.
pub type Result<T> = std::result::Result<T, LygosError>;

// --- Таксономия ошибок API ---

/// Вид ошибки API, определяемый по HTTP-статусу ответа.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Базовая ошибка: неизвестный статус или сбой транспорта.
    Api,
    BadRequest,
    Authentication,
    PermissionDenied,
    NotFound,
    Conflict,
    UnprocessableEntity,
    ServerError,
    BadGateway,
    ServiceUnavailable,
    GatewayTimeout,
}

impl ErrorKind {
    /// Выбирает вид ошибки по точному совпадению статуса.
    /// Любой другой код даёт базовый `ErrorKind::Api`.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => ErrorKind::BadRequest,
            401 => ErrorKind::Authentication,
            403 => ErrorKind::PermissionDenied,
            404 => ErrorKind::NotFound,
            409 => ErrorKind::Conflict,
            422 => ErrorKind::UnprocessableEntity,
            500 => ErrorKind::ServerError,
            502 => ErrorKind::BadGateway,
            503 => ErrorKind::ServiceUnavailable,
            504 => ErrorKind::GatewayTimeout,
            _ => ErrorKind::Api,
        }
    }

    pub fn default_status(self) -> Option<u16> {
        match self {
            ErrorKind::Api => None,
            ErrorKind::BadRequest => Some(400),
            ErrorKind::Authentication => Some(401),
            ErrorKind::PermissionDenied => Some(403),
            ErrorKind::NotFound => Some(404),
            ErrorKind::Conflict => Some(409),
            ErrorKind::UnprocessableEntity => Some(422),
            ErrorKind::ServerError => Some(500),
            ErrorKind::BadGateway => Some(502),
            ErrorKind::ServiceUnavailable => Some(503),
            ErrorKind::GatewayTimeout => Some(504),
        }
    }

    pub fn default_message(self) -> &'static str {
        match self {
            ErrorKind::Api => "Lygos API error",
            ErrorKind::BadRequest => "Bad Request",
            ErrorKind::Authentication => "Authentication failed. Please check your API key.",
            ErrorKind::PermissionDenied => {
                "Permission denied. You do not have access to this resource."
            }
            ErrorKind::NotFound => "The requested resource was not found.",
            ErrorKind::Conflict => "The request conflicts with the current state of the server.",
            ErrorKind::UnprocessableEntity => {
                "The request was well-formed but contains invalid data."
            }
            ErrorKind::ServerError => "An unexpected internal server error occurred.",
            ErrorKind::BadGateway => {
                "The server received an invalid response from an upstream server."
            }
            ErrorKind::ServiceUnavailable => {
                "The service is temporarily unavailable. Please try again later."
            }
            ErrorKind::GatewayTimeout => {
                "The server did not receive a timely response from an upstream server."
            }
        }
    }

    /// `true` для ServerError и его специализаций (502, 503, 504).
    pub fn is_server_error(self) -> bool {
        matches!(
            self,
            ErrorKind::ServerError
                | ErrorKind::BadGateway
                | ErrorKind::ServiceUnavailable
                | ErrorKind::GatewayTimeout
        )
    }

    pub fn is_client_error(self) -> bool {
        matches!(
            self,
            ErrorKind::BadRequest
                | ErrorKind::Authentication
                | ErrorKind::PermissionDenied
                | ErrorKind::NotFound
                | ErrorKind::Conflict
                | ErrorKind::UnprocessableEntity
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Api => "api_error",
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::Authentication => "authentication",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::UnprocessableEntity => "unprocessable_entity",
            ErrorKind::ServerError => "server_error",
            ErrorKind::BadGateway => "bad_gateway",
            ErrorKind::ServiceUnavailable => "service_unavailable",
            ErrorKind::GatewayTimeout => "gateway_timeout",
        };
        f.write_str(name)
    }
}

/// Ошибка, полученная от API Lygos (или при попытке до него достучаться).
///
/// Несёт вид ошибки, человекочитаемое сообщение и HTTP-статус.
/// Статус отсутствует, если ответ вообще не был получен.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    status_code: Option<u16>,
    #[source]
    source: Option<reqwest::Error>,
}

impl ApiError {
    /// Ошибка с сообщением и статусом по умолчанию для данного вида.
    pub fn new(kind: ErrorKind) -> Self {
        ApiError {
            kind,
            message: kind.default_message().to_string(),
            status_code: kind.default_status(),
            source: None,
        }
    }

    /// Переопределяет сообщение, статус остаётся по умолчанию.
    pub fn with_message(kind: ErrorKind, message: impl Into<String>) -> Self {
        ApiError {
            message: message.into(),
            ..ApiError::new(kind)
        }
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// Строит ошибку для неуспешного ответа: вид выбирается по статусу.
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        ApiError::with_message(ErrorKind::from_status(status_code), message).with_status(status_code)
    }

    /// Сбой транспорта (DNS, соединение, таймаут): ответа нет, статуса нет.
    pub fn transport(source: reqwest::Error) -> Self {
        ApiError {
            kind: ErrorKind::Api,
            message: format!("Error connecting to the API: {}", source),
            status_code: None,
            source: Some(source),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    pub fn is_server_error(&self) -> bool {
        self.kind.is_server_error()
    }
}

// --- Общая ошибка клиента ---

#[derive(Error, Debug)]
pub enum LygosError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Запрошено поле шлюза вне списка поддерживаемых.
    #[error("Unsupported gateway field: '{0}'")]
    UnsupportedField(String),

    #[error("Empty response from endpoint '{endpoint}'")]
    EmptyResponse { endpoint: String },
}

impl LygosError {
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            LygosError::Api(err) => Some(err),
            _ => None,
        }
    }

    /// HTTP-статус, если ошибка пришла от API.
    pub fn status_code(&self) -> Option<u16> {
        self.api_error().and_then(ApiError::status_code)
    }
}
