//! End-to-end tests speaking the line protocol over real sockets.
//!
//! Each test binds the server on an ephemeral port with the in-memory
//! store and drives it with raw TCP clients, asserting on the exact
//! envelope lines a console client would see.

use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedReadHalf;

use linebank::store::MemoryStore;
use linebank::{AppState, server};

/// Bind on an ephemeral port and serve in the background.
async fn start_server() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    let state = AppState::new(Arc::new(MemoryStore::new()));
    tokio::spawn(async move {
        let _ = server::run(listener, state).await;
    });
    addr
}

/// One protocol client: writes request lines, reads response lines.
struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: tokio::net::tcp::OwnedWriteHalf,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect");
        let (read_half, writer) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer,
        }
    }

    async fn send_raw(&mut self, line: &str) -> Value {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .await
            .expect("write request");
        let mut response = String::new();
        let read = self
            .reader
            .read_line(&mut response)
            .await
            .expect("read response");
        assert!(read > 0, "server closed the connection");
        serde_json::from_str(response.trim_end()).expect("response is JSON")
    }

    async fn send(&mut self, request: Value) -> Value {
        self.send_raw(&request.to_string()).await
    }
}

#[tokio::test]
async fn the_reference_scenario_over_the_wire() {
    let addr = start_server().await;
    let mut client = Client::connect(addr).await;

    let resp = client.send(json!({"operacao": "connect"})).await;
    assert_eq!(resp["status"], true);

    for (nome, cpf, senha) in [("Alice", "111", "secret1"), ("Bob", "222", "secret2")] {
        let resp = client
            .send(json!({
                "operacao": "usuario_criar",
                "nome": nome,
                "cpf": cpf,
                "senha": senha,
            }))
            .await;
        assert_eq!(resp["status"], true, "creating {cpf}: {resp}");
    }

    let resp = client
        .send(json!({"operacao": "usuario_login", "cpf": "111", "senha": "secret1"}))
        .await;
    assert_eq!(resp["status"], true);
    let token_a = resp["token"].as_str().expect("token").to_string();

    let resp = client
        .send(json!({"operacao": "depositar", "token": token_a, "valor_enviado": 50.0}))
        .await;
    assert_eq!(resp["status"], true);

    let resp = client
        .send(json!({
            "operacao": "transacao_criar",
            "token": token_a,
            "cpf_destino": "222",
            "valor": 20.0,
        }))
        .await;
    assert_eq!(resp["status"], true);

    let resp = client
        .send(json!({"operacao": "usuario_ler", "token": token_a}))
        .await;
    assert_eq!(resp["usuario"]["saldo"], 30.0);

    let resp = client
        .send(json!({"operacao": "usuario_login", "cpf": "222", "senha": "secret2"}))
        .await;
    let token_b = resp["token"].as_str().expect("token").to_string();
    let resp = client
        .send(json!({"operacao": "usuario_ler", "token": token_b}))
        .await;
    assert_eq!(resp["usuario"]["saldo"], 20.0);

    let resp = client
        .send(json!({"operacao": "transacao_ler", "token": token_a}))
        .await;
    assert_eq!(resp["status"], true);
    let transacoes = resp["transacoes"].as_array().expect("transacoes");
    assert_eq!(transacoes.len(), 1);
    assert_eq!(transacoes[0]["usuario_enviador"]["cpf"], "111");
    assert_eq!(transacoes[0]["usuario_recebedor"]["cpf"], "222");
    assert_eq!(transacoes[0]["valor_enviado"], 20.0);
}

#[tokio::test]
async fn a_malformed_line_never_closes_the_socket() {
    let addr = start_server().await;
    let mut client = Client::connect(addr).await;

    let resp = client.send_raw("definitely {not json").await;
    assert_eq!(resp["operacao"], "erro_servidor");
    assert_eq!(resp["status"], false);

    let resp = client
        .send(json!({"operacao": "usuario_login", "cpf": "111"}))
        .await;
    assert_eq!(resp["operacao"], "erro_servidor");
    assert_eq!(resp["operacao_enviada"], "usuario_login");

    // the same connection still serves valid requests
    let resp = client.send(json!({"operacao": "connect"})).await;
    assert_eq!(resp["status"], true);
}

#[tokio::test]
async fn responses_are_strictly_ordered_per_connection() {
    let addr = start_server().await;
    let mut client = Client::connect(addr).await;

    client
        .send(json!({
            "operacao": "usuario_criar",
            "nome": "Carol", "cpf": "333", "senha": "pw",
        }))
        .await;
    let resp = client
        .send(json!({"operacao": "usuario_login", "cpf": "333", "senha": "pw"}))
        .await;
    let token = resp["token"].as_str().expect("token").to_string();

    // write a burst of requests before reading anything back
    for i in 1..=5 {
        client
            .writer
            .write_all(
                format!(
                    "{}\n",
                    json!({"operacao": "depositar", "token": token, "valor_enviado": i as f64})
                )
                .as_bytes(),
            )
            .await
            .expect("write burst");
    }
    for _ in 0..5 {
        let mut line = String::new();
        client.reader.read_line(&mut line).await.expect("read");
        let resp: Value = serde_json::from_str(line.trim_end()).expect("json");
        assert_eq!(resp["operacao"], "depositar");
        assert_eq!(resp["status"], true);
    }

    let resp = client
        .send(json!({"operacao": "usuario_ler", "token": token}))
        .await;
    assert_eq!(resp["usuario"]["saldo"], 15.0);
}

#[tokio::test]
async fn two_connections_share_the_same_bank() {
    let addr = start_server().await;
    let mut alice = Client::connect(addr).await;
    let mut bob = Client::connect(addr).await;

    alice
        .send(json!({"operacao": "usuario_criar", "nome": "Alice", "cpf": "111", "senha": "a"}))
        .await;
    bob.send(json!({"operacao": "usuario_criar", "nome": "Bob", "cpf": "222", "senha": "b"}))
        .await;

    let resp = alice
        .send(json!({"operacao": "usuario_login", "cpf": "111", "senha": "a"}))
        .await;
    let token_a = resp["token"].as_str().expect("token").to_string();
    alice
        .send(json!({"operacao": "depositar", "token": token_a, "valor_enviado": 10.0}))
        .await;
    alice
        .send(json!({
            "operacao": "transacao_criar",
            "token": token_a,
            "cpf_destino": "222",
            "valor": 10.0,
        }))
        .await;

    let resp = bob
        .send(json!({"operacao": "usuario_login", "cpf": "222", "senha": "b"}))
        .await;
    let token_b = resp["token"].as_str().expect("token").to_string();
    let resp = bob
        .send(json!({"operacao": "usuario_ler", "token": token_b}))
        .await;
    assert_eq!(resp["usuario"]["saldo"], 10.0);
}

#[tokio::test]
async fn logout_then_read_fails_but_the_connection_survives() {
    let addr = start_server().await;
    let mut client = Client::connect(addr).await;

    client
        .send(json!({"operacao": "usuario_criar", "nome": "Dave", "cpf": "444", "senha": "pw"}))
        .await;
    let resp = client
        .send(json!({"operacao": "usuario_login", "cpf": "444", "senha": "pw"}))
        .await;
    let token = resp["token"].as_str().expect("token").to_string();

    let resp = client
        .send(json!({"operacao": "usuario_logout", "token": token}))
        .await;
    assert_eq!(resp["status"], true);

    // logging out twice still reports success
    let resp = client
        .send(json!({"operacao": "usuario_logout", "token": token}))
        .await;
    assert_eq!(resp["status"], true);

    let resp = client
        .send(json!({"operacao": "usuario_ler", "token": token}))
        .await;
    assert_eq!(resp["status"], false);
}

#[tokio::test]
async fn account_deletion_keeps_the_counterpartys_statement() {
    let addr = start_server().await;
    let mut client = Client::connect(addr).await;

    client
        .send(json!({"operacao": "usuario_criar", "nome": "Alice", "cpf": "111", "senha": "a"}))
        .await;
    client
        .send(json!({"operacao": "usuario_criar", "nome": "Bob", "cpf": "222", "senha": "b"}))
        .await;

    let resp = client
        .send(json!({"operacao": "usuario_login", "cpf": "111", "senha": "a"}))
        .await;
    let token_a = resp["token"].as_str().expect("token").to_string();
    client
        .send(json!({"operacao": "depositar", "token": token_a, "valor_enviado": 5.0}))
        .await;
    client
        .send(json!({
            "operacao": "transacao_criar",
            "token": token_a,
            "cpf_destino": "222",
            "valor": 5.0,
        }))
        .await;

    let resp = client
        .send(json!({"operacao": "usuario_deletar", "token": token_a}))
        .await;
    assert_eq!(resp["status"], true);

    let resp = client
        .send(json!({"operacao": "usuario_login", "cpf": "222", "senha": "b"}))
        .await;
    let token_b = resp["token"].as_str().expect("token").to_string();
    let resp = client
        .send(json!({"operacao": "transacao_ler", "token": token_b}))
        .await;
    let transacoes = resp["transacoes"].as_array().expect("transacoes");
    assert_eq!(transacoes.len(), 1);
    // the deleted sender still renders by its captured name
    assert_eq!(transacoes[0]["usuario_enviador"]["nome"], "Alice");
}
