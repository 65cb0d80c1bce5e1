//! Length-prefixed JSON frames
//!
//! Every frame is a `u32` big-endian length followed by that many bytes of
//! JSON. Both directions of the plugin channel use the same framing.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Maximum frame size (16 MiB)
pub const MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;

/// Frame-level failures. All of them leave the channel unusable.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("peer closed the channel")]
    Closed,

    #[error("frame of {0} bytes exceeds the {MAX_FRAME_SIZE} byte limit")]
    TooLarge(usize),

    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialize `value` and write it as one frame.
pub async fn write_frame<W, T>(writer: &mut W, value: &T) -> Result<(), CodecError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let body = serde_json::to_vec(value)?;
    let len = u32::try_from(body.len())
        .ok()
        .filter(|len| *len <= MAX_FRAME_SIZE)
        .ok_or(CodecError::TooLarge(body.len()))?;

    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame and decode it.
///
/// EOF before the length prefix is [`CodecError::Closed`]; EOF inside a frame
/// is an I/O error.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<T, CodecError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(CodecError::Closed);
        }
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_SIZE {
        return Err(CodecError::TooLarge(len as usize));
    }

    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body).await?;
    Ok(serde_json::from_slice(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[tokio::test]
    async fn frame_layout() {
        let mut buf = Vec::new();
        write_frame(&mut buf, &json!({"a": 1})).await.unwrap();

        let body = br#"{"a":1}"#;
        assert_eq!(&buf[..4], &(body.len() as u32).to_be_bytes());
        assert_eq!(&buf[4..], body);

        let decoded: Value = read_frame(&mut buf.as_slice()).await.unwrap();
        assert_eq!(decoded, json!({"a": 1}));
    }

    #[tokio::test]
    async fn empty_stream_is_closed() {
        let err = read_frame::<_, Value>(&mut &b""[..]).await.unwrap_err();
        assert!(matches!(err, CodecError::Closed));
    }

    #[tokio::test]
    async fn truncated_body_is_io_error() {
        let mut buf = 10u32.to_be_bytes().to_vec();
        buf.extend_from_slice(b"{}");
        let err = read_frame::<_, Value>(&mut buf.as_slice()).await.unwrap_err();
        assert!(matches!(err, CodecError::Io(_)));
    }

    #[tokio::test]
    async fn oversized_length_rejected() {
        let buf = (MAX_FRAME_SIZE + 1).to_be_bytes();
        let err = read_frame::<_, Value>(&mut &buf[..]).await.unwrap_err();
        assert!(matches!(err, CodecError::TooLarge(_)));
    }

    #[tokio::test]
    async fn garbage_body_is_json_error() {
        let mut buf = 3u32.to_be_bytes().to_vec();
        buf.extend_from_slice(b"{{{");
        let err = read_frame::<_, Value>(&mut buf.as_slice()).await.unwrap_err();
        assert!(matches!(err, CodecError::Json(_)));
    }
}
