//! Core driver logic for Helion
//!
//! This module contains the polling state machine that ties the TCP client,
//! the field mapper, and the glitch filters together, and publishes the
//! latest snapshot to subscribers through a watch channel.

use crate::client::FelicityClient;
use crate::config::Config;
use crate::energy::EnergyTodayFilter;
use crate::error::Result;
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::mapper;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::{mpsc, watch};
use tokio::time::{Duration, interval};

/// Main driver state
#[derive(Debug, Clone)]
pub enum DriverState {
    /// Driver is initializing
    Initializing,
    /// Driver is running normally
    Running,
    /// Driver is in error state
    Error(String),
    /// Driver is shutting down
    ShuttingDown,
}

/// One published poll result
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    /// When this snapshot was taken; `None` until the first successful poll
    pub taken_at: Option<DateTime<Utc>>,
    /// Mapped display values keyed by field name
    pub fields: Map<String, Value>,
    /// The raw record the fields were derived from
    pub raw: Map<String, Value>,
}

/// Main driver for Helion
pub struct FelicityDriver {
    /// Configuration
    config: Config,

    /// Current driver state
    state: watch::Sender<DriverState>,

    /// Latest poll result
    snapshot_tx: watch::Sender<Snapshot>,

    /// TCP client for the inverter
    client: FelicityClient,

    /// Logger with context
    logger: StructuredLogger,

    /// Shutdown signal
    shutdown_tx: mpsc::UnboundedSender<()>,

    /// Shutdown receiver
    shutdown_rx: mpsc::UnboundedReceiver<()>,

    /// Per-counter glitch filter state, keyed by field name
    energy_filters: HashMap<&'static str, EnergyTodayFilter>,

    /// Consecutive failed poll cycles
    consecutive_failures: u32,
}

impl FelicityDriver {
    /// Create a new driver instance, loading configuration from the default
    /// search path
    pub fn new() -> Result<Self> {
        let config = Config::load().map_err(|e| {
            eprintln!("Failed to load configuration: {}", e);
            e
        })?;
        Self::from_config(config)
    }

    /// Create a driver from an already-loaded configuration
    pub fn from_config(config: Config) -> Result<Self> {
        config.validate()?;
        crate::logging::init_logging(&config.logging)?;

        let context = LogContext::new("driver").with_host(config.inverter.host.clone());
        let logger = get_logger_with_context(context);

        let (shutdown_tx, shutdown_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(DriverState::Initializing);
        let (snapshot_tx, _) = watch::channel(Snapshot::default());

        logger.info("Initializing inverter driver");

        let client = FelicityClient::new(&config.inverter);

        Ok(Self {
            config,
            state: state_tx,
            snapshot_tx,
            client,
            logger,
            shutdown_tx,
            shutdown_rx,
            energy_filters: HashMap::new(),
            consecutive_failures: 0,
        })
    }

    /// Run the driver main loop
    pub async fn run(&mut self) -> Result<()> {
        self.logger.info("Starting inverter driver main loop");
        self.state.send_replace(DriverState::Running);

        let mut poll_interval = interval(Duration::from_millis(self.config.poll_interval_ms));

        loop {
            tokio::select! {
                _ = poll_interval.tick() => {
                    match self.poll_cycle().await {
                        Ok(()) => {
                            if self.consecutive_failures > 0 {
                                self.logger.info("Inverter connection recovered");
                            }
                            self.consecutive_failures = 0;
                            self.state.send_replace(DriverState::Running);
                        }
                        Err(e) => {
                            // Keep polling; the inverter WiFi dongle drops
                            // connections routinely.
                            self.consecutive_failures += 1;
                            self.logger.error(&format!(
                                "Poll cycle failed ({} consecutive): {}",
                                self.consecutive_failures, e
                            ));
                            self.state.send_replace(DriverState::Error(e.to_string()));
                        }
                    }
                }
                _ = self.shutdown_rx.recv() => {
                    self.logger.info("Shutdown signal received");
                    break;
                }
            }
        }

        self.state.send_replace(DriverState::ShuttingDown);
        self.logger.info("Driver shutdown complete");
        Ok(())
    }

    /// Single polling cycle: fetch one record, map it, publish the snapshot
    async fn poll_cycle(&mut self) -> Result<()> {
        self.logger.debug("Starting poll cycle");

        let record = self.client.fetch().await?;
        let fields = mapper::project_all(
            &record,
            &mut self.energy_filters,
            &self.config.glitch_filter,
        );

        self.logger
            .debug(&format!("Mapped {} fields from record", fields.len()));

        // send_replace stores the value even while nobody subscribes; a late
        // subscriber still sees the latest snapshot.
        self.snapshot_tx.send_replace(Snapshot {
            taken_at: Some(Utc::now()),
            fields,
            raw: record.into_inner(),
        });

        Ok(())
    }

    /// Get the current driver state
    pub fn get_state(&self) -> DriverState {
        self.state.borrow().clone()
    }

    /// Subscribe to driver state changes
    pub fn subscribe_state(&self) -> watch::Receiver<DriverState> {
        self.state.subscribe()
    }

    /// Subscribe to published snapshots
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Request the driver to shut down
    pub fn request_shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Sender that can be handed to a signal handler task
    pub fn shutdown_sender(&self) -> mpsc::UnboundedSender<()> {
        self.shutdown_tx.clone()
    }

    /// Access the active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
