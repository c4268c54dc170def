use burrow_proto::{Role, SessionId};
use burrow_token::TokenSigner;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::time::Duration;

use crate::error::RelayError;

/// The single JSON line a client sends to authenticate, per spec.md §6.
#[derive(Deserialize)]
struct HandshakeFrame {
    #[serde(rename = "sessionId")]
    session_id: String,
    #[serde(rename = "relayToken")]
    relay_token: String,
    role: String,
}

#[derive(Serialize)]
struct HandshakeReply {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// A successfully authenticated handshake: the claims have already been
/// checked against the asserted session id and role.
pub struct AuthenticatedHandshake {
    pub session_id: SessionId,
    pub role: Role,
}

/// Reads exactly one newline-terminated JSON line from `reader` within
/// `deadline`, parses it, and verifies its token against `signer`. Any
/// failure is classified into a [`RelayError`] variant; the caller is
/// responsible for writing the corresponding wire reply. Generic over the
/// reader half so both a plain `TcpStream` and a TLS-wrapped connection use
/// the same handshake code.
pub async fn read_and_authenticate<R: AsyncRead + Unpin>(
    reader: &mut BufReader<R>,
    signer: &TokenSigner,
    now_unix: u64,
    deadline: Duration,
) -> Result<AuthenticatedHandshake, RelayError> {
    let mut line = String::new();
    let read = tokio::time::timeout(deadline, reader.read_line(&mut line))
        .await
        .map_err(|_| RelayError::HandshakeTimeout)?
        .map_err(|e| RelayError::HandshakeMalformed(e.to_string()))?;

    if read == 0 {
        return Err(RelayError::HandshakeMalformed("connection closed before handshake".to_string()));
    }

    let frame: HandshakeFrame =
        serde_json::from_str(line.trim_end()).map_err(|e| RelayError::HandshakeMalformed(e.to_string()))?;

    let asserted_session_id: SessionId = frame
        .session_id
        .parse()
        .map_err(|_| RelayError::HandshakeMalformed("sessionId is not valid hex".to_string()))?;
    let asserted_role = match frame.role.as_str() {
        "host" => Role::Host,
        "joiner" => Role::Joiner,
        other => return Err(RelayError::HandshakeMalformed(format!("unknown role {other:?}"))),
    };

    let claims = signer
        .verify(&frame.relay_token, now_unix)
        .map_err(|e| RelayError::AuthFailed(e.to_string()))?;

    if claims.sid != asserted_session_id || claims.role != asserted_role {
        return Err(RelayError::AuthFailed("token claims do not match the asserted session/role".to_string()));
    }

    Ok(AuthenticatedHandshake {
        session_id: claims.sid,
        role: claims.role,
    })
}

pub async fn write_success<W: AsyncWriteExt + Unpin>(writer: &mut W) -> std::io::Result<()> {
    write_reply(writer, &HandshakeReply { success: true, error: None }).await
}

pub async fn write_failure<W: AsyncWriteExt + Unpin>(writer: &mut W, err: &RelayError) -> std::io::Result<()> {
    write_reply(
        writer,
        &HandshakeReply {
            success: false,
            error: Some(err.wire_message()),
        },
    )
    .await
}

async fn write_reply<W: AsyncWriteExt + Unpin>(writer: &mut W, reply: &HandshakeReply) -> std::io::Result<()> {
    let mut bytes = serde_json::to_vec(reply).expect("HandshakeReply serialization is infallible");
    bytes.push(b'\n');
    writer.write_all(&bytes).await
}
