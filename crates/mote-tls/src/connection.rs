//! Asynchronous connection driver.
//!
//! Wraps an `AsyncRead + AsyncWrite` socket around the sans-io
//! [`TlsStream`], pumping bytes in both directions, awaiting the external
//! signer when one is configured, and exposing a blocking-style
//! handshake/read/write/shutdown surface.

use crate::config::TlsOptions;
use crate::stream::{ConnectionState, StreamEvent, TlsStream};
use crate::transport::BufferedTransport;
use crate::verify::ChainVerifier;
use mote_types::{SignerError, TlsError};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// An externally held signing key (e.g. a secure element) producing
/// RSA-PKCS1-SHA256 signatures over the handshake transcript.
pub trait RemoteSigner: Send + Sync {
    fn sign<'a>(
        &'a self,
        data: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, SignerError>> + Send + 'a>>;
}

/// An asynchronous TLS 1.2 client connection over `S`.
pub struct TlsClient<S> {
    socket: S,
    stream: TlsStream<BufferedTransport>,
    signer: Option<Arc<dyn RemoteSigner>>,
    write_result: Option<Result<(), TlsError>>,
    closed: bool,
}

impl<S: AsyncRead + AsyncWrite + Unpin> TlsClient<S> {
    /// Wrap an already-connected socket.
    pub fn new(socket: S, options: TlsOptions, verifier: Arc<dyn ChainVerifier>) -> Self {
        Self {
            socket,
            stream: TlsStream::new(options, verifier, BufferedTransport::new()),
            signer: None,
            write_result: None,
            closed: false,
        }
    }

    /// Configure the external signer backing `ClientKey::External`.
    pub fn with_remote_signer(mut self, signer: Arc<dyn RemoteSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Run the handshake to completion.
    pub async fn handshake(&mut self) -> Result<(), TlsError> {
        self.stream.transport_connected();
        loop {
            self.pump().await?;
            match self.stream.state() {
                ConnectionState::Established => return Ok(()),
                ConnectionState::Terminated => return Err(TlsError::HandshakeInterrupted),
                _ => {}
            }
            self.fill().await;
        }
    }

    /// Read the next decrypted chunk. An empty chunk signals end of
    /// stream.
    pub async fn read(&mut self) -> Result<Vec<u8>, TlsError> {
        loop {
            if let Some(chunk) = self.stream.read() {
                return Ok(chunk);
            }
            self.pump().await?;
            if let Some(chunk) = self.stream.read() {
                return Ok(chunk);
            }
            if self.closed || self.stream.state() == ConnectionState::Terminated {
                return Ok(Vec::new());
            }
            self.fill().await;
        }
    }

    /// Write plaintext, waiting out handshake gating and backpressure.
    pub async fn write(&mut self, data: &[u8]) -> Result<(), TlsError> {
        let accepted = self.stream.write(data)?;
        self.pump().await?;
        if accepted {
            return Ok(());
        }
        loop {
            if let Some(result) = self.write_result.take() {
                return result;
            }
            if self.stream.state() == ConnectionState::Terminated {
                return Err(TlsError::BrokenPipe("connection terminated"));
            }
            self.fill().await;
            self.pump().await?;
        }
    }

    /// Graceful close: close_notify, transport end, socket flush.
    pub async fn shutdown(&mut self) -> Result<(), TlsError> {
        self.stream.end();
        self.pump().await?;
        let _ = self.socket.shutdown().await;
        Ok(())
    }

    /// Flush outbound bytes and service queued events until both settle.
    async fn pump(&mut self) -> Result<(), TlsError> {
        loop {
            let out = self.stream.transport_mut().take_output();
            if !out.is_empty() {
                if let Err(e) = self.socket.write_all(&out).await {
                    self.stream.transport_error(e);
                }
            }
            if self.stream.transport_mut().poll_drain() {
                self.stream.transport_drain();
            }

            let Some(event) = self.stream.poll_event() else {
                return Ok(());
            };
            match event {
                StreamEvent::SignatureRequest(data) => {
                    let result = match &self.signer {
                        Some(signer) => signer.sign(&data).await,
                        None => Err(SignerError("no external signer configured".into())),
                    };
                    self.stream.provide_signature(result);
                }
                StreamEvent::WriteDone(result) => self.write_result = Some(result),
                StreamEvent::End | StreamEvent::Close => self.closed = true,
                StreamEvent::Error(e) => return Err(e),
            }
        }
    }

    /// Pull one batch of socket bytes into the stream.
    async fn fill(&mut self) {
        let mut buf = [0u8; 16 * 1024];
        match self.socket.read(&mut buf).await {
            Ok(0) => self.stream.transport_closed(),
            Ok(n) => self.stream.transport_data(&buf[..n]),
            Err(e) => self.stream.transport_error(e),
        }
    }
}
