//! TCP client for the Felicity inverter local API
//!
//! One poll issues three fixed commands, each on a fresh connection. The
//! device sends no length prefix and no terminator; the response ends when it
//! stays silent for one read-timeout window. Runtime telemetry is mandatory,
//! basic info and settings are best-effort.

use crate::config::InverterConfig;
use crate::error::{HelionError, Result};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::protocol;
use crate::record::{BASIC_NS, RawRecord, SETTINGS_NS};
use serde_json::Value;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Runtime telemetry request (mandatory)
pub const CMD_REALTIME: &[u8] = b"wifilocalMonitor:get dev real infor";

/// Device identity/version request (best-effort)
pub const CMD_BASIC: &[u8] = b"wifilocalMonitor:get dev basice infor";

/// Device settings request (best-effort, may answer with several objects)
pub const CMD_SETTINGS: &[u8] = b"wifilocalMonitor:get dev set infor";

const READ_CHUNK_SIZE: usize = 2048;

/// TCP client for one inverter
pub struct FelicityClient {
    config: InverterConfig,
    logger: StructuredLogger,
}

impl FelicityClient {
    /// Create a new client for the configured inverter
    pub fn new(config: &InverterConfig) -> Self {
        let logger =
            get_logger_with_context(LogContext::new("client").with_host(config.host.clone()));
        Self {
            config: config.clone(),
            logger,
        }
    }

    /// Issue all three commands and combine the decoded responses into one
    /// record.
    ///
    /// Fails with a connection error if the runtime-telemetry socket cannot
    /// be opened, and with a protocol error if that command yields no
    /// parseable object. Failures of the other two commands only leave their
    /// namespace absent.
    pub async fn fetch(&self) -> Result<RawRecord> {
        let realtime_raw = self.read_raw(CMD_REALTIME).await?;
        let mut record = protocol::parse_first_object(&realtime_raw).ok_or_else(|| {
            HelionError::protocol(format!("Unexpected runtime payload: {:?}", realtime_raw))
        })?;

        match self.read_raw(CMD_BASIC).await {
            Ok(basic_raw) => {
                if let Some(basic) = protocol::parse_first_object(&basic_raw) {
                    record.insert(BASIC_NS.to_string(), Value::Object(basic));
                }
            }
            Err(err) => {
                self.logger.debug(&format!("Failed to read basic info: {}", err));
            }
        }

        match self.read_raw(CMD_SETTINGS).await {
            Ok(set_raw) => {
                let fragments = protocol::parse_fragments(&set_raw);
                if let Some(merged) = protocol::merge_object_fragments(fragments) {
                    record.insert(SETTINGS_NS.to_string(), Value::Object(merged));
                }
            }
            Err(err) => {
                self.logger.debug(&format!("Failed to read settings info: {}", err));
            }
        }

        Ok(RawRecord::new(record))
    }

    /// Open a fresh connection, send one command, and accumulate the response
    /// text until the device closes or goes silent.
    async fn read_raw(&self, command: &[u8]) -> Result<String> {
        let address = format!("{}:{}", self.config.host, self.config.port);
        let connect_timeout = Duration::from_millis(self.config.connect_timeout_ms);

        let mut stream = match timeout(connect_timeout, TcpStream::connect(&address)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(err)) => {
                return Err(HelionError::connection(format!(
                    "Error connecting to {}: {}",
                    address, err
                )));
            }
            Err(_) => {
                return Err(HelionError::connection(format!(
                    "Timed out connecting to {}",
                    address
                )));
            }
        };

        // The stream drops (and the socket closes) on every exit path below.
        stream.write_all(command).await.map_err(|err| {
            HelionError::connection(format!("Error talking to {}: {}", address, err))
        })?;

        let read_timeout = Duration::from_millis(self.config.read_timeout_ms);
        let mut data: Vec<u8> = Vec::new();
        let mut buf = [0u8; READ_CHUNK_SIZE];

        for _ in 0..self.config.max_read_chunks {
            match timeout(read_timeout, stream.read(&mut buf)).await {
                // Silence for a full window: the frame is over
                Err(_) => break,
                // Peer closed
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => data.extend_from_slice(&buf[..n]),
                Ok(Err(err)) => {
                    return Err(HelionError::connection(format!(
                        "Error talking to {}: {}",
                        address, err
                    )));
                }
            }
        }

        if data.is_empty() {
            return Err(HelionError::protocol("No data received from inverter"));
        }

        let text = decode_permissive_ascii(&data);
        self.logger
            .debug(&format!("Raw response for {:?}: {:?}", command, text));
        Ok(text)
    }
}

/// Decode bytes as ASCII, dropping anything outside the 7-bit range
fn decode_permissive_ascii(data: &[u8]) -> String {
    data.iter()
        .filter(|b| b.is_ascii())
        .map(|&b| b as char)
        .collect::<String>()
        .trim()
        .to_string()
}
