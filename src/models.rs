use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::LygosError;

// --- Модели данных (Запросы и Ответы) ---

// Платёжный шлюз (ответ). Все поля необязательны: API может опускать любые из них,
// а незнакомые поля сохраняются в `extra`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Gateway {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    // API может прислать сумму как 1000, 1000.0 или "1000"
    #[serde(
        default,
        deserialize_with = "lenient_amount",
        skip_serializing_if = "Option::is_none"
    )]
    pub amount: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>, // URL страницы оплаты
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Gateway {
    /// Значение одного поля в виде JSON (`Value::Null`, если поле отсутствует).
    pub fn field(&self, field: GatewayField) -> Value {
        fn opt<T: Into<Value> + Clone>(v: &Option<T>) -> Value {
            v.clone().map(Into::into).unwrap_or(Value::Null)
        }
        match field {
            GatewayField::Link => opt(&self.link),
            GatewayField::Amount => opt(&self.amount),
            GatewayField::ShopName => opt(&self.shop_name),
            GatewayField::Message => opt(&self.message),
            GatewayField::UserCountry => opt(&self.user_country),
            GatewayField::CreationDate => opt(&self.creation_date),
            GatewayField::OrderId => opt(&self.order_id),
            GatewayField::SuccessUrl => opt(&self.success_url),
            GatewayField::FailureUrl => opt(&self.failure_url),
        }
    }
}

// Целая сумма из числа (в том числе с нулевой дробной частью) или строки
fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let invalid = |value: &dyn fmt::Display| -> D::Error {
        <D::Error as de::Error>::custom(format!("amount {value} is not an integer"))
    };
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => number
            .as_i64()
            .or_else(|| {
                number
                    .as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() <= i64::MAX as f64)
                    .map(|f| f as i64)
            })
            .map(Some)
            .ok_or_else(|| invalid(&number)),
        Some(Value::String(text)) => text
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| invalid(&format!("'{text}'"))),
        Some(other) => Err(invalid(&other)),
    }
}

// Статус входящего платежа (payin), только чтение
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PayinStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Запрос на создание шлюза.
///
/// Обязательны только `amount` и `shop_name`. Если `order_id` не задан,
/// клиент сгенерирует UUID v4 перед отправкой.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NewGateway {
    pub amount: i64,
    pub shop_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_url: Option<String>,
}

impl NewGateway {
    pub fn new(amount: i64, shop_name: impl Into<String>) -> Self {
        NewGateway {
            amount,
            shop_name: shop_name.into(),
            order_id: None,
            message: None,
            success_url: None,
            failure_url: None,
        }
    }

    pub fn order_id(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = Some(order_id.into());
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn success_url(mut self, url: impl Into<String>) -> Self {
        self.success_url = Some(url.into());
        self
    }

    pub fn failure_url(mut self, url: impl Into<String>) -> Self {
        self.failure_url = Some(url.into());
        self
    }
}

/// Изменения шлюза. Отправляются только заданные поля.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct GatewayUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shop_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_url: Option<String>,
    // Поля, которые API принимает, но клиент не знает
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GatewayUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn amount(mut self, amount: i64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn shop_name(mut self, shop_name: impl Into<String>) -> Self {
        self.shop_name = Some(shop_name.into());
        self
    }

    pub fn order_id(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = Some(order_id.into());
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn success_url(mut self, url: impl Into<String>) -> Self {
        self.success_url = Some(url.into());
        self
    }

    pub fn failure_url(mut self, url: impl Into<String>) -> Self {
        self.failure_url = Some(url.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.shop_name.is_none()
            && self.order_id.is_none()
            && self.message.is_none()
            && self.success_url.is_none()
            && self.failure_url.is_none()
            && self.extra.is_empty()
    }
}

/// Поле шлюза, доступное через `LygosClient::get_field`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayField {
    Link,
    Amount,
    ShopName,
    Message,
    UserCountry,
    CreationDate,
    OrderId,
    SuccessUrl,
    FailureUrl,
}

impl GatewayField {
    pub const ALL: [GatewayField; 9] = [
        GatewayField::Link,
        GatewayField::Amount,
        GatewayField::ShopName,
        GatewayField::Message,
        GatewayField::UserCountry,
        GatewayField::CreationDate,
        GatewayField::OrderId,
        GatewayField::SuccessUrl,
        GatewayField::FailureUrl,
    ];

    /// Имя поля в JSON ответа API.
    pub fn as_str(self) -> &'static str {
        match self {
            GatewayField::Link => "link",
            GatewayField::Amount => "amount",
            GatewayField::ShopName => "shop_name",
            GatewayField::Message => "message",
            GatewayField::UserCountry => "user_country",
            GatewayField::CreationDate => "creation_date",
            GatewayField::OrderId => "order_id",
            GatewayField::SuccessUrl => "success_url",
            GatewayField::FailureUrl => "failure_url",
        }
    }
}

impl fmt::Display for GatewayField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GatewayField {
    type Err = LygosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GatewayField::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| LygosError::UnsupportedField(s.to_string()))
    }
}

/// Результат создания одного шлюза в пакетном режиме.
///
/// Сериализуется без тега: либо объект шлюза, либо `{"error": ..., "data": ...}`.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum BatchCreateResult {
    Created(Gateway),
    Failed { error: String, data: NewGateway },
}

impl BatchCreateResult {
    pub fn is_created(&self) -> bool {
        matches!(self, BatchCreateResult::Created(_))
    }

    pub fn gateway(&self) -> Option<&Gateway> {
        match self {
            BatchCreateResult::Created(gateway) => Some(gateway),
            BatchCreateResult::Failed { .. } => None,
        }
    }
}
