//! Wire protocol: newline-delimited UTF-8 JSON, one object per line.
//!
//! Requests carry an `operacao` tag plus operation-specific fields; every
//! response is an envelope `{"operacao", "status", "info", ...extras}`
//! echoing the request's operation. This module owns decoding a raw line
//! into a typed [`Request`] (the schema gate) and building response
//! envelopes; it performs no business logic.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AppError;

/// Operation name used for synthesized error reports in both directions.
pub const ERROR_OPERATION: &str = "erro_servidor";

/// Every operation the router recognizes. A valid JSON message whose
/// `operacao` is not in this list is rejected as unsupported before any
/// field of it is examined.
const OPERATIONS: &[&str] = &[
    "connect",
    "usuario_criar",
    "usuario_login",
    "usuario_logout",
    "usuario_ler",
    "usuario_atualizar",
    "usuario_deletar",
    "depositar",
    "transacao_criar",
    "transacao_ler",
    ERROR_OPERATION,
];

/// One decoded client request, tagged by `operacao`.
///
/// Deserializing into this enum is the structural-validation step: required
/// fields present and declared types matching. Anything that fails here
/// never reaches a service.
#[derive(Debug, Deserialize)]
#[serde(tag = "operacao")]
pub enum Request {
    #[serde(rename = "connect")]
    Connect,

    #[serde(rename = "usuario_criar")]
    CreateAccount {
        nome: String,
        cpf: String,
        senha: String,
    },

    #[serde(rename = "usuario_login")]
    Login { cpf: String, senha: String },

    #[serde(rename = "usuario_logout")]
    Logout { token: String },

    #[serde(rename = "usuario_ler")]
    ReadAccount { token: String },

    #[serde(rename = "usuario_atualizar")]
    UpdateAccount { token: String, usuario: ProfilePatch },

    #[serde(rename = "usuario_deletar")]
    DeleteAccount { token: String },

    #[serde(rename = "depositar")]
    Deposit {
        token: String,
        valor_enviado: Decimal,
    },

    #[serde(rename = "transacao_criar")]
    Transfer {
        token: String,
        cpf_destino: String,
        valor: Decimal,
    },

    #[serde(rename = "transacao_ler")]
    ListTransfers {
        token: String,
        #[serde(default)]
        data_inicial: Option<String>,
        #[serde(default)]
        data_final: Option<String>,
    },

    /// Peer-reported error, acknowledged and logged only.
    #[serde(rename = "erro_servidor")]
    ErrorReport {
        #[serde(default)]
        operacao_enviada: Option<String>,
        #[serde(default)]
        info: Option<String>,
    },
}

/// The optional fields of `usuario_atualizar`'s `usuario` object.
#[derive(Debug, Deserialize)]
pub struct ProfilePatch {
    #[serde(default)]
    pub nome: Option<String>,
    #[serde(default)]
    pub senha: Option<String>,
}

impl Request {
    /// The wire name of this operation, echoed in the response envelope.
    pub fn operation(&self) -> &'static str {
        match self {
            Request::Connect => "connect",
            Request::CreateAccount { .. } => "usuario_criar",
            Request::Login { .. } => "usuario_login",
            Request::Logout { .. } => "usuario_logout",
            Request::ReadAccount { .. } => "usuario_ler",
            Request::UpdateAccount { .. } => "usuario_atualizar",
            Request::DeleteAccount { .. } => "usuario_deletar",
            Request::Deposit { .. } => "depositar",
            Request::Transfer { .. } => "transacao_criar",
            Request::ListTransfers { .. } => "transacao_ler",
            Request::ErrorReport { .. } => ERROR_OPERATION,
        }
    }

    /// Shape checks serde cannot express: identifiers and credentials must
    /// be non-empty strings.
    fn validate(&self) -> Result<(), AppError> {
        fn required(field: &'static str, value: &str) -> Result<(), AppError> {
            if value.trim().is_empty() {
                Err(AppError::Validation(format!("o campo {field} não pode ser vazio")))
            } else {
                Ok(())
            }
        }

        match self {
            Request::CreateAccount { nome, cpf, senha } => {
                required("nome", nome)?;
                required("cpf", cpf)?;
                required("senha", senha)
            }
            Request::Login { cpf, senha } => {
                required("cpf", cpf)?;
                required("senha", senha)
            }
            Request::Logout { token }
            | Request::ReadAccount { token }
            | Request::UpdateAccount { token, .. }
            | Request::DeleteAccount { token }
            | Request::Deposit { token, .. }
            | Request::ListTransfers { token, .. } => required("token", token),
            Request::Transfer {
                token, cpf_destino, ..
            } => {
                required("token", token)?;
                required("cpf_destino", cpf_destino)
            }
            Request::Connect | Request::ErrorReport { .. } => Ok(()),
        }
    }
}

/// A request line that could not be turned into a [`Request`].
///
/// `operation` is the `operacao` string when one could be extracted, so the
/// synthesized error report can name what the peer tried to do.
#[derive(Debug)]
pub struct RequestError {
    pub operation: Option<String>,
    pub error: AppError,
}

/// Decode one raw line into a typed request.
///
/// Failure modes, in order:
/// - not JSON, or not a JSON object → `Protocol`
/// - no string `operacao` field → `Validation`
/// - unrecognized operation → `UnsupportedOperation`
/// - missing/ill-typed fields for a known operation → `Validation`
pub fn parse_request(line: &str) -> Result<Request, RequestError> {
    let value: Value = serde_json::from_str(line).map_err(|err| RequestError {
        operation: None,
        error: AppError::Protocol(err.to_string()),
    })?;

    if !value.is_object() {
        return Err(RequestError {
            operation: None,
            error: AppError::Protocol("a requisição não é um objeto JSON".to_string()),
        });
    }

    let operation = value
        .get("operacao")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| RequestError {
            operation: None,
            error: AppError::Validation("campo operacao ausente ou não textual".to_string()),
        })?;

    if !OPERATIONS.contains(&operation.as_str()) {
        return Err(RequestError {
            operation: Some(operation.clone()),
            error: AppError::UnsupportedOperation(operation),
        });
    }

    let request: Request = serde_json::from_value(value).map_err(|err| RequestError {
        operation: Some(operation.clone()),
        error: AppError::Validation(err.to_string()),
    })?;

    request.validate().map_err(|error| RequestError {
        operation: Some(operation),
        error,
    })?;

    Ok(request)
}

/// Parse an optional ISO-8601 UTC statement bound.
///
/// The original console client sends empty strings for unset bounds, so
/// `""` reads as absent. A non-empty string that is not a valid timestamp
/// is a validation failure.
pub fn parse_bound(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, AppError> {
    match raw {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|err| {
                AppError::Validation(format!(
                    "data {s:?} inválida (formato ISO 8601 com 'Z' esperado): {err}"
                ))
            }),
    }
}

/// Response envelope: `operacao` + `status` + `info`, plus any
/// operation-specific extras flattened alongside (`token`, `usuario`,
/// `transacoes`).
#[derive(Debug, Serialize)]
pub struct Response {
    pub operacao: String,
    pub status: bool,
    pub info: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Response {
    pub fn success(operation: &str, info: impl Into<String>) -> Self {
        Self {
            operacao: operation.to_string(),
            status: true,
            info: info.into(),
            extra: Map::new(),
        }
    }

    pub fn failure(operation: &str, info: impl Into<String>) -> Self {
        Self {
            operacao: operation.to_string(),
            status: false,
            info: info.into(),
            extra: Map::new(),
        }
    }

    /// Attach an extra top-level field to the envelope.
    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        match serde_json::to_value(value) {
            Ok(v) => {
                self.extra.insert(key.to_string(), v);
            }
            Err(err) => {
                tracing::error!(key, error = %err, "dropping unserializable response field");
            }
        }
        self
    }

    /// The envelope sent when a line cannot be parsed or validated:
    /// an `erro_servidor` message naming the operation the peer attempted.
    pub fn server_error(attempted_operation: Option<&str>, info: impl Into<String>) -> Self {
        Response::failure(ERROR_OPERATION, info)
            .with("operacao_enviada", attempted_operation.unwrap_or_default())
    }

    /// Serialize to a single wire line, without the trailing newline.
    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|err| {
            // Envelope fields are plain strings and JSON values, so this is
            // unreachable in practice; still, the peer must get a line.
            tracing::error!(error = %err, "failed to serialize response envelope");
            format!(
                r#"{{"operacao":"{ERROR_OPERATION}","status":false,"info":"Erro interno do servidor."}}"#
            )
        })
    }
}
