pub mod error;
pub mod models;

pub use error::{ApiError, ErrorKind, LygosError, Result};
pub use models::{
    BatchCreateResult, Gateway, GatewayField, GatewayUpdate, NewGateway, PayinStatus,
};

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client as ReqwestClient, Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

// --- Константы ---
pub const LYGOS_API_BASE_URL: &str = "https://api.lygosapp.com/v1/";
pub const API_KEY_ENV: &str = "LYGOS_API_KEY";
pub const API_URL_ENV: &str = "LYGOS_API_URL";
const API_KEY_HEADER: &str = "api-key";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_USER_AGENT: &str = concat!("lygos-rs/", env!("CARGO_PKG_VERSION"));

// --- Конфигурация ---

/// Настройки клиента. После создания клиента не меняются.
#[derive(Clone)]
pub struct ClientConfig {
    api_key: String,
    base_url: Url,
    timeout: Duration,
    user_agent: String,
}

impl ClientConfig {
    /// Конфигурация по умолчанию для данного API-ключа.
    ///
    /// Возвращает `LygosError::Config`, если ключ пустой.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LygosError::Config(
                "an API key is required to initialize the client".to_string(),
            ));
        }
        Ok(ClientConfig {
            api_key,
            base_url: parse_base_url(LYGOS_API_BASE_URL)?,
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        })
    }

    /// Читает `LYGOS_API_KEY` (обязательно) и `LYGOS_API_URL` (необязательно).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    // Источник переменных подменяется в тестах
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup(API_KEY_ENV)
            .ok_or_else(|| LygosError::Config(format!("environment variable {API_KEY_ENV} is not set")))?;
        let config = ClientConfig::new(api_key)?;
        match lookup(API_URL_ENV) {
            Some(url) if !url.trim().is_empty() => config.with_base_url(&url),
            _ => Ok(config),
        }
    }

    /// Устанавливает кастомный базовый URL (для тестирования или прокси).
    /// Путь базового URL сохраняется: `https://host/v2` превращается в `https://host/v2/`.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        self.base_url = parse_base_url(base_url)?;
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

// Ключ в Debug не выводим
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"***")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    // Завершающий слэш обязателен, иначе Url::join отбросит последний сегмент пути
    let mut normalized = raw.trim().trim_end_matches('/').to_string();
    normalized.push('/');
    Url::parse(&normalized)
        .map_err(|e| LygosError::Config(format!("invalid base URL '{raw}': {e}")))
}

// --- Клиент Lygos ---

#[derive(Clone)]
pub struct LygosClient {
    client: ReqwestClient,
    config: ClientConfig,
}

impl fmt::Debug for LygosClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LygosClient")
            .field("base_url", &self.config.base_url.as_str())
            .finish()
    }
}

impl LygosClient {
    /// Создает новый клиент Lygos API с настройками по умолчанию.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Ваш API-ключ Lygos. Не должен быть пустым.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(ClientConfig::new(api_key)?)
    }

    /// Создает клиент с явной конфигурацией.
    ///
    /// HTTP-клиент собирается один раз и переиспользуется всеми вызовами;
    /// заголовки (`api-key`, JSON, User-Agent) выставляются по умолчанию для каждого запроса.
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let mut api_key = HeaderValue::from_str(&config.api_key)
            .map_err(|e| LygosError::Config(format!("invalid API key header value: {e}")))?;
        api_key.set_sensitive(true);
        let user_agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|e| LygosError::Config(format!("invalid user agent header value: {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, api_key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, user_agent);

        let client = ReqwestClient::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| LygosError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(LygosClient { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &Url {
        &self.config.base_url
    }

    // Внутренний метод: один запрос, один ответ. `None` для 204 и пустого тела.
    async fn send<B, R>(&self, method: Method, url: Url, body: Option<&B>) -> Result<Option<R>>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        tracing::debug!(%method, %url, "sending Lygos API request");

        let mut request_builder = self.client.request(method, url);
        if let Some(payload) = body {
            request_builder = request_builder.json(payload);
        }

        let response = request_builder.send().await.map_err(ApiError::transport)?;
        let status = response.status();
        tracing::debug!(status = status.as_u16(), url = %response.url(), "received Lygos API response");

        if !status.is_success() {
            return Err(error_from_response(response).await.into());
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let bytes = response.bytes().await.map_err(ApiError::transport)?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        // Сначала синтаксис JSON, потом форма: ошибки различаются текстом, статус сохраняется
        let value: Value = serde_json::from_slice(&bytes).map_err(|e| {
            ApiError::with_message(ErrorKind::Api, format!("Invalid JSON in API response: {e}"))
                .with_status(status.as_u16())
        })?;
        let parsed = serde_json::from_value(value).map_err(|e| {
            ApiError::with_message(ErrorKind::Api, format!("Unexpected response shape: {e}"))
                .with_status(status.as_u16())
        })?;
        Ok(Some(parsed))
    }

    // Как `send`, но ответ обязан содержать тело
    async fn send_expecting<B, R>(&self, method: Method, url: Url, body: Option<&B>) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let endpoint = url.path().to_string();
        self.send(method, url, body)
            .await?
            .ok_or(LygosError::EmptyResponse { endpoint })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        endpoint_url(&self.config.base_url, segments)
    }

    /// Получает список всех платежных шлюзов.
    pub async fn list_gateways(&self) -> Result<Vec<Gateway>> {
        let url = self.endpoint(&["gateway"])?;
        self.send_expecting(Method::GET, url, None::<&()>)
            .await
    }

    /// Создает платежный шлюз.
    ///
    /// Если `order_id` не указан, генерируется UUID v4. В тело запроса
    /// попадают только заданные поля.
    ///
    /// # Arguments
    ///
    /// * `gateway` - Данные для создания шлюза.
    pub async fn create_gateway(&self, gateway: &NewGateway) -> Result<Gateway> {
        let gateway = with_order_id(gateway.clone());
        self.post_gateway(&gateway).await
    }

    async fn post_gateway(&self, gateway: &NewGateway) -> Result<Gateway> {
        if gateway.shop_name.trim().is_empty() {
            return Err(LygosError::InvalidArgument(
                "shop_name is required to create a gateway".to_string(),
            ));
        }
        let url = self.endpoint(&["gateway"])?;
        self.send_expecting(Method::POST, url, Some(gateway))
            .await
    }

    /// Получает шлюз по его идентификатору.
    ///
    /// # Arguments
    ///
    /// * `gateway_id` - Идентификатор шлюза.
    pub async fn get_gateway(&self, gateway_id: &str) -> Result<Gateway> {
        let url = self.endpoint(&["gateway", resource_id(gateway_id)?])?;
        self.send_expecting(Method::GET, url, None::<&()>)
            .await
    }

    /// Обновляет шлюз.
    ///
    /// Пустое обновление отклоняется с `LygosError::InvalidArgument` до отправки запроса.
    ///
    /// # Arguments
    ///
    /// * `gateway_id` - Идентификатор шлюза.
    /// * `update` - Поля для изменения.
    pub async fn update_gateway(&self, gateway_id: &str, update: &GatewayUpdate) -> Result<Gateway> {
        if update.is_empty() {
            return Err(LygosError::InvalidArgument(
                "no update fields provided".to_string(),
            ));
        }
        let url = self.endpoint(&["gateway", resource_id(gateway_id)?])?;
        self.send_expecting(Method::PUT, url, Some(update))
            .await
    }

    /// Удаляет шлюз. API отвечает 204 No Content.
    pub async fn delete_gateway(&self, gateway_id: &str) -> Result<()> {
        let url = self.endpoint(&["gateway", resource_id(gateway_id)?])?;
        self.send::<(), Value>(Method::DELETE, url, None)
            .await?;
        Ok(())
    }

    /// Получает статус входящего платежа по `order_id`.
    pub async fn get_payin_status(&self, order_id: &str) -> Result<PayinStatus> {
        let url = self.endpoint(&["gateway", "payin", resource_id(order_id)?])?;
        self.send_expecting(Method::GET, url, None::<&()>)
            .await
    }

    // --- Пакетные операции (последовательные вызовы) ---

    /// Создает несколько шлюзов, по одному запросу за раз.
    ///
    /// Ошибка одного элемента не прерывает обработку: на его месте в результате
    /// будет `BatchCreateResult::Failed` с текстом ошибки и исходными данными
    /// (включая сгенерированный `order_id`).
    pub async fn create_gateways_batch<I>(&self, gateways: I) -> Vec<BatchCreateResult>
    where
        I: IntoIterator<Item = NewGateway>,
    {
        let mut results = Vec::new();
        for gateway in gateways {
            let gateway = with_order_id(gateway);
            match self.post_gateway(&gateway).await {
                Ok(created) => results.push(BatchCreateResult::Created(created)),
                Err(err) => {
                    tracing::warn!(
                        order_id = gateway.order_id.as_deref().unwrap_or_default(),
                        error = %err,
                        "failed to create gateway in batch"
                    );
                    results.push(BatchCreateResult::Failed {
                        error: err.to_string(),
                        data: gateway,
                    });
                }
            }
        }
        results
    }

    /// Получает несколько шлюзов. Первая ошибка прерывает обработку.
    pub async fn get_gateways_batch<I, S>(&self, gateway_ids: I) -> Result<Vec<Gateway>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut gateways = Vec::new();
        for gateway_id in gateway_ids {
            gateways.push(self.get_gateway(gateway_id.as_ref()).await?);
        }
        Ok(gateways)
    }

    /// Обновляет несколько шлюзов по парам `(gateway_id, update)`.
    /// Первая ошибка прерывает обработку.
    pub async fn update_gateways_batch<I, S>(&self, updates: I) -> Result<Vec<Gateway>>
    where
        I: IntoIterator<Item = (S, GatewayUpdate)>,
        S: AsRef<str>,
    {
        let mut gateways = Vec::new();
        for (gateway_id, update) in updates {
            gateways.push(self.update_gateway(gateway_id.as_ref(), &update).await?);
        }
        Ok(gateways)
    }

    /// Удаляет несколько шлюзов. Первая ошибка прерывает обработку.
    pub async fn delete_gateways_batch<I, S>(&self, gateway_ids: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for gateway_id in gateway_ids {
            self.delete_gateway(gateway_id.as_ref()).await?;
        }
        Ok(())
    }

    // --- Доступ к отдельным полям шлюза ---

    /// Загружает шлюз целиком и возвращает одно поле в виде `{field: value}`.
    ///
    /// Поле берется из исходного JSON-объекта ответа, поэтому расхождение типов
    /// в других полях шлюза на результат не влияет.
    pub async fn get_field(&self, gateway_id: &str, field: GatewayField) -> Result<Map<String, Value>> {
        let url = self.endpoint(&["gateway", resource_id(gateway_id)?])?;
        let gateway: Map<String, Value> = self.send_expecting(Method::GET, url, None::<&()>).await?;
        let value = gateway.get(field.as_str()).cloned().unwrap_or(Value::Null);
        let mut result = Map::new();
        result.insert(field.as_str().to_string(), value);
        Ok(result)
    }

    /// То же, что `get_field`, но поле задаётся строкой.
    /// Неподдерживаемое имя дает `LygosError::UnsupportedField` без обращения к сети.
    pub async fn get_field_by_name(&self, gateway_id: &str, field: &str) -> Result<Map<String, Value>> {
        let field: GatewayField = field.parse()?;
        self.get_field(gateway_id, field).await
    }
}

macro_rules! field_getters {
    ($($name:ident => $field:ident),* $(,)?) => {
        impl LygosClient {
            $(
                #[doc = concat!("Поле `GatewayField::", stringify!($field), "` шлюза, см. [`LygosClient::get_field`].")]
                pub async fn $name(&self, gateway_id: &str) -> Result<Map<String, Value>> {
                    self.get_field(gateway_id, GatewayField::$field).await
                }
            )*
        }
    };
}

field_getters! {
    get_link => Link,
    get_amount => Amount,
    get_shop_name => ShopName,
    get_message => Message,
    get_user_country => UserCountry,
    get_creation_date => CreationDate,
    get_order_id => OrderId,
    get_success_url => SuccessUrl,
    get_failure_url => FailureUrl,
}

fn with_order_id(mut gateway: NewGateway) -> NewGateway {
    if gateway.order_id.is_none() {
        gateway.order_id = Some(Uuid::new_v4().to_string());
    }
    gateway
}

// Идентификаторы непрозрачны: пустые и `.`/`..` отклоняются,
// остальное кодируется как один сегмент пути
fn resource_id(id: &str) -> Result<&str> {
    if id.trim().is_empty() {
        return Err(LygosError::InvalidArgument(
            "a non-empty identifier is required".to_string(),
        ));
    }
    if id == "." || id == ".." {
        return Err(LygosError::InvalidArgument(format!(
            "'{id}' is not a valid identifier"
        )));
    }
    Ok(id)
}

fn endpoint_url(base_url: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base_url.clone();
    url.path_segments_mut()
        .map_err(|_| LygosError::Config(format!("base URL '{base_url}' cannot have a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

// Разбор неуспешного ответа в ошибку из таксономии
async fn error_from_response(response: Response) -> ApiError {
    let status = response.status();
    let reason = status.canonical_reason().unwrap_or_default();
    let body_text = response.text().await.unwrap_or_default();
    let message = error_message(reason, &body_text);
    if message.is_empty() {
        ApiError::new(ErrorKind::from_status(status.as_u16())).with_status(status.as_u16())
    } else {
        ApiError::from_status(status.as_u16(), message)
    }
}

// JSON-объект: `message` (или reason phrase) + `: details`.
// Иначе сырой текст тела или reason phrase.
fn error_message(reason: &str, body_text: &str) -> String {
    match serde_json::from_str::<Value>(body_text) {
        Ok(Value::Object(data)) => {
            let message = match data.get("message") {
                Some(Value::String(message)) => message.clone(),
                Some(Value::Null) | None => reason.to_string(),
                Some(other) => other.to_string(),
            };
            match data.get("details") {
                Some(Value::String(details)) if !details.is_empty() => {
                    format!("{message}: {details}")
                }
                Some(details) if is_truthy(details) && !details.is_string() => {
                    format!("{message}: {details}")
                }
                _ => message,
            }
        }
        _ if body_text.is_empty() => reason.to_string(),
        _ => body_text.to_string(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
