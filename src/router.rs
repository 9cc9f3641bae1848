//! Request router: schema gate plus dispatch table.
//!
//! Every raw line funnels through [`handle_line`], which always produces
//! exactly one response envelope. Errors stop here: a failed parse becomes
//! a synthesized `erro_servidor` message, a failed service call becomes a
//! `status:false` envelope echoing the operation, and nothing propagates
//! far enough to kill the connection loop. The router itself performs no
//! business logic.

use crate::AppState;
use crate::error::AppError;
use crate::protocol::{self, Request, RequestError, Response};
use crate::services::{account_service, transfer_service};

/// Process one request line into one response envelope. Never fails.
pub async fn handle_line(state: &AppState, line: &str) -> Response {
    match protocol::parse_request(line) {
        Ok(request) => {
            let operation = request.operation();
            match dispatch(state, request).await {
                Ok(response) => response,
                Err(err) if err.is_internal() => {
                    tracing::error!(operation, error = %err, "request failed");
                    err.into_response(operation)
                }
                Err(err) => {
                    tracing::debug!(operation, error = %err, "request rejected");
                    err.into_response(operation)
                }
            }
        }
        Err(RequestError { operation, error }) => {
            tracing::debug!(
                operation = operation.as_deref().unwrap_or_default(),
                error = %error,
                "request line rejected"
            );
            if let AppError::UnsupportedOperation(op) = &error {
                // Valid JSON with an unknown operation: a normal error
                // envelope echoing whatever the peer asked for.
                let info = error.client_info();
                Response::failure(op, info)
            } else {
                Response::server_error(operation.as_deref(), error.client_info())
            }
        }
    }
}

/// The dispatch table: one arm per operation.
async fn dispatch(state: &AppState, request: Request) -> Result<Response, AppError> {
    let operation = request.operation();
    match request {
        Request::Connect => Ok(Response::success(operation, "Conectado com sucesso.")),

        Request::CreateAccount { nome, cpf, senha } => {
            account_service::create_account(state, &nome, &cpf, &senha).await?;
            Ok(Response::success(operation, "Usuário criado com sucesso."))
        }

        Request::Login { cpf, senha } => {
            let token = account_service::login(state, &cpf, &senha).await?;
            Ok(Response::success(operation, "Login bem-sucedido.").with("token", token))
        }

        Request::Logout { token } => {
            account_service::logout(state, &token);
            Ok(Response::success(operation, "Logout realizado com sucesso."))
        }

        Request::ReadAccount { token } => {
            let usuario = account_service::read_account(state, &token).await?;
            Ok(
                Response::success(operation, "Dados do usuário recuperados com sucesso.")
                    .with("usuario", usuario),
            )
        }

        Request::UpdateAccount { token, usuario } => {
            account_service::update_account(
                state,
                &token,
                usuario.nome.as_deref(),
                usuario.senha.as_deref(),
            )
            .await?;
            Ok(Response::success(operation, "Usuário atualizado com sucesso."))
        }

        Request::DeleteAccount { token } => {
            account_service::delete_account(state, &token).await?;
            Ok(Response::success(operation, "Usuário deletado com sucesso."))
        }

        Request::Deposit {
            token,
            valor_enviado,
        } => {
            account_service::deposit(state, &token, valor_enviado).await?;
            Ok(Response::success(operation, "Depósito realizado com sucesso."))
        }

        Request::Transfer {
            token,
            cpf_destino,
            valor,
        } => {
            transfer_service::transfer(state, &token, &cpf_destino, valor).await?;
            Ok(Response::success(operation, "Transação realizada com sucesso."))
        }

        Request::ListTransfers {
            token,
            data_inicial,
            data_final,
        } => {
            let start = protocol::parse_bound(data_inicial.as_deref())?;
            let end = protocol::parse_bound(data_final.as_deref())?;
            let transacoes = transfer_service::list_transfers(state, &token, start, end).await?;
            Ok(
                Response::success(operation, "Transações do usuário recuperadas com sucesso.")
                    .with("transacoes", transacoes),
            )
        }

        Request::ErrorReport {
            operacao_enviada,
            info,
        } => {
            tracing::warn!(
                operation = operacao_enviada.as_deref().unwrap_or_default(),
                info = info.as_deref().unwrap_or_default(),
                "peer reported an error"
            );
            Ok(Response::success(operation, "Mensagem de erro recebida."))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::Value;
    use std::sync::Arc;

    fn state() -> AppState {
        AppState::new(Arc::new(MemoryStore::new()))
    }

    async fn call(state: &AppState, line: &str) -> Value {
        serde_json::from_str(&handle_line(state, line).await.to_line()).unwrap()
    }

    #[tokio::test]
    async fn connect_is_acknowledged() {
        let state = state();
        let resp = call(&state, r#"{"operacao":"connect"}"#).await;
        assert_eq!(resp["operacao"], "connect");
        assert_eq!(resp["status"], true);
        assert_eq!(resp["info"], "Conectado com sucesso.");
    }

    #[tokio::test]
    async fn info_texts_match_the_console_clients_language() {
        let state = state();
        let resp = call(
            &state,
            r#"{"operacao":"usuario_criar","nome":"Alice","cpf":"111","senha":"secret1"}"#,
        )
        .await;
        assert_eq!(resp["info"], "Usuário criado com sucesso.");

        let resp = call(
            &state,
            r#"{"operacao":"usuario_login","cpf":"111","senha":"secret1"}"#,
        )
        .await;
        assert_eq!(resp["info"], "Login bem-sucedido.");
        let token = resp["token"].as_str().unwrap().to_string();

        let resp = call(
            &state,
            &format!(r#"{{"operacao":"depositar","token":"{token}","valor_enviado":10.0}}"#),
        )
        .await;
        assert_eq!(resp["info"], "Depósito realizado com sucesso.");

        let resp = call(&state, r#"{"operacao":"usuario_ler","token":"stale"}"#).await;
        assert_eq!(resp["info"], "Token inválido ou sessão expirada.");

        let resp = call(
            &state,
            r#"{"operacao":"usuario_login","cpf":"111","senha":"wrong"}"#,
        )
        .await;
        assert_eq!(resp["info"], "CPF ou senha inválidos.");
    }

    #[tokio::test]
    async fn full_session_over_the_dispatch_table() {
        let state = state();

        let resp = call(
            &state,
            r#"{"operacao":"usuario_criar","nome":"Alice","cpf":"111","senha":"secret1"}"#,
        )
        .await;
        assert_eq!(resp["status"], true);

        let resp = call(
            &state,
            r#"{"operacao":"usuario_login","cpf":"111","senha":"secret1"}"#,
        )
        .await;
        assert_eq!(resp["status"], true);
        let token = resp["token"].as_str().unwrap().to_string();

        let resp = call(
            &state,
            &format!(r#"{{"operacao":"depositar","token":"{token}","valor_enviado":100.0}}"#),
        )
        .await;
        assert_eq!(resp["status"], true);

        let resp = call(&state, &format!(r#"{{"operacao":"usuario_ler","token":"{token}"}}"#)).await;
        assert_eq!(resp["status"], true);
        assert_eq!(resp["usuario"]["nome"], "Alice");
        assert_eq!(resp["usuario"]["saldo"], 100.0);

        // second account to receive a transfer
        call(
            &state,
            r#"{"operacao":"usuario_criar","nome":"Bob","cpf":"222","senha":"secret2"}"#,
        )
        .await;
        let resp = call(
            &state,
            &format!(
                r#"{{"operacao":"transacao_criar","token":"{token}","cpf_destino":"222","valor":40.0}}"#
            ),
        )
        .await;
        assert_eq!(resp["status"], true);

        let resp = call(
            &state,
            &format!(r#"{{"operacao":"transacao_ler","token":"{token}"}}"#),
        )
        .await;
        assert_eq!(resp["status"], true);
        let transacoes = resp["transacoes"].as_array().unwrap();
        assert_eq!(transacoes.len(), 1);
        assert_eq!(transacoes[0]["valor_enviado"], 40.0);
        assert_eq!(transacoes[0]["usuario_recebedor"]["cpf"], "222");
    }

    #[tokio::test]
    async fn duplicate_account_fails_with_the_operation_echoed() {
        let state = state();
        let line = r#"{"operacao":"usuario_criar","nome":"Alice","cpf":"111","senha":"s"}"#;
        call(&state, line).await;
        let resp = call(&state, line).await;
        assert_eq!(resp["operacao"], "usuario_criar");
        assert_eq!(resp["status"], false);
    }

    #[tokio::test]
    async fn bad_credentials_fail_closed() {
        let state = state();
        let resp = call(
            &state,
            r#"{"operacao":"usuario_login","cpf":"111","senha":"nope"}"#,
        )
        .await;
        assert_eq!(resp["status"], false);
        assert!(resp.get("token").is_none());
    }

    #[tokio::test]
    async fn unknown_operation_gets_a_plain_error_envelope() {
        let state = state();
        let resp = call(&state, r#"{"operacao":"usuario_hackear"}"#).await;
        assert_eq!(resp["operacao"], "usuario_hackear");
        assert_eq!(resp["status"], false);
    }

    #[tokio::test]
    async fn malformed_line_gets_a_synthesized_error_report() {
        let state = state();
        let resp = call(&state, "this is not json").await;
        assert_eq!(resp["operacao"], "erro_servidor");
        assert_eq!(resp["status"], false);
    }

    #[tokio::test]
    async fn schema_invalid_message_names_the_attempted_operation() {
        let state = state();
        let resp = call(&state, r#"{"operacao":"usuario_login","cpf":"111"}"#).await;
        assert_eq!(resp["operacao"], "erro_servidor");
        assert_eq!(resp["operacao_enviada"], "usuario_login");
    }

    #[tokio::test]
    async fn peer_error_reports_are_acknowledged() {
        let state = state();
        let resp = call(
            &state,
            r#"{"operacao":"erro_servidor","operacao_enviada":"depositar","info":"weird reply"}"#,
        )
        .await;
        assert_eq!(resp["operacao"], "erro_servidor");
        assert_eq!(resp["status"], true);
    }

    #[tokio::test]
    async fn authenticated_operations_reject_dead_tokens() {
        let state = state();
        let resp = call(&state, r#"{"operacao":"usuario_ler","token":"stale"}"#).await;
        assert_eq!(resp["operacao"], "usuario_ler");
        assert_eq!(resp["status"], false);
    }

    #[tokio::test]
    async fn invalid_date_bound_is_a_validation_failure() {
        let state = state();
        call(
            &state,
            r#"{"operacao":"usuario_criar","nome":"A","cpf":"1","senha":"s"}"#,
        )
        .await;
        let resp = call(
            &state,
            r#"{"operacao":"usuario_login","cpf":"1","senha":"s"}"#,
        )
        .await;
        let token = resp["token"].as_str().unwrap();
        let resp = call(
            &state,
            &format!(
                r#"{{"operacao":"transacao_ler","token":"{token}","data_inicial":"yesterday","data_final":""}}"#
            ),
        )
        .await;
        assert_eq!(resp["status"], false);
    }
}
