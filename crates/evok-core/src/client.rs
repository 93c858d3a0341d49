// ── Client abstraction ──
//
// Full lifecycle management for one controller endpoint. Owns the
// connection supervisor (REST snapshot, WebSocket session, watchdog,
// reconnect policy), routes outbound commands, and drives the gesture
// and output engines from the event stream. Consumers interact through
// the façade: typed getters backed by the device directory, typed
// setters routed over the socket, and a broadcast event subscription.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use tokio::sync::{Mutex, broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use evok_api::{EvokSocket, RestClient, SetCommand, SocketEvent, SocketWriter};

use crate::config::{EndpointConfig, WatchdogConfig};
use crate::directory::DeviceDirectory;
use crate::error::CoreError;
use crate::gesture::{GestureAction, GestureConfig, GestureEngine};
use crate::model::{DeviceKind, EventCategory, EvokEvent, LifecycleEvent, RelaySubtype};
use crate::output::{OutputAction, OutputEngine};
use crate::rules::RuleSet;
use crate::timer::{Ticker, earliest};

const COMMAND_CHANNEL_SIZE: usize = 64;
const EVENT_CHANNEL_SIZE: usize = 256;

// ── ConnectionState ──────────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// A live session was lost or a connect attempt failed; `attempt`
    /// counts consecutive failures since the last good session.
    Reconnecting { attempt: u32 },
}

// ── Internal plumbing ────────────────────────────────────────────────

/// Requests routed from the façade into the running session.
#[derive(Debug)]
enum ClientCommand {
    /// Forward a wire command as-is.
    Send(SetCommand),
    /// Drive a virtual pulse relay.
    Pulse {
        subtype: RelaySubtype,
        circuit: String,
        on: bool,
    },
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Shutdown,
    ConnectionLost,
}

// ── EvokClient ───────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc`. Call [`start()`](Self::start) to spawn
/// the supervisor; the client connects, mirrors device state, and keeps
/// reconnecting until [`stop()`](Self::stop).
#[derive(Clone)]
pub struct EvokClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: EndpointConfig,
    directory: DeviceDirectory,
    connection_state: watch::Sender<ConnectionState>,
    event_tx: broadcast::Sender<Arc<EvokEvent>>,
    command_tx: mpsc::Sender<ClientCommand>,
    command_rx: Mutex<Option<mpsc::Receiver<ClientCommand>>>,
    /// Published virtual pulse-relay states, keyed (subtype, circuit).
    /// Survives reconnects.
    pulse_states: DashMap<(RelaySubtype, String), bool>,
    maintenance: AtomicBool,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl EvokClient {
    /// Create a client from configuration. Does NOT connect -- call
    /// [`start()`](Self::start) to spawn the supervisor.
    pub fn new(config: EndpointConfig) -> Self {
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);

        let pulse_states = DashMap::new();
        for timer in config.timers.iter().filter(|t| t.pulse) {
            pulse_states.insert((timer.relay_type, timer.circuit.clone()), false);
        }

        Self {
            inner: Arc::new(ClientInner {
                config,
                directory: DeviceDirectory::new(),
                connection_state,
                event_tx,
                command_tx,
                command_rx: Mutex::new(Some(command_rx)),
                pulse_states,
                maintenance: AtomicBool::new(false),
                cancel: CancellationToken::new(),
                task: Mutex::new(None),
            }),
        }
    }

    /// Access the endpoint configuration.
    pub fn config(&self) -> &EndpointConfig {
        &self.inner.config
    }

    /// Access the device directory for bulk queries.
    pub fn directory(&self) -> &DeviceDirectory {
        &self.inner.directory
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Spawn the connection supervisor.
    ///
    /// Returns immediately; observe [`connection_state()`](Self::connection_state)
    /// or the [`Lifecycle`](EvokEvent::Lifecycle) events to learn when
    /// the endpoint comes up.
    ///
    /// Clients are single-shot: any second call fails with
    /// `AlreadyStarted`, including after [`stop()`](Self::stop). A
    /// stopped client cannot be restarted; build a new one from the
    /// same configuration instead.
    pub async fn start(&self) -> Result<(), CoreError> {
        let mut task = self.inner.task.lock().await;
        if task.is_some() {
            return Err(CoreError::AlreadyStarted);
        }
        let commands = self
            .inner
            .command_rx
            .lock()
            .await
            .take()
            .ok_or(CoreError::AlreadyStarted)?;

        let inner = Arc::clone(&self.inner);
        *task = Some(tokio::spawn(supervise(inner, commands)));
        Ok(())
    }

    /// Stop the supervisor and wait for it to wind down.
    pub async fn stop(&self) {
        self.inner.cancel.cancel();
        if let Some(handle) = self.inner.task.lock().await.take() {
            let _ = handle.await;
        }
        let _ = self
            .inner
            .connection_state
            .send(ConnectionState::Disconnected);
        debug!(endpoint = %self.inner.config.name, "client stopped");
    }

    // ── State observation ────────────────────────────────────────────

    /// Subscribe to connection state changes.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    /// Connection state changes as a `Stream`.
    pub fn connection_stream(&self) -> WatchStream<ConnectionState> {
        WatchStream::new(self.inner.connection_state.subscribe())
    }

    /// Subscribe to the event broadcast stream.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<EvokEvent>> {
        self.inner.event_tx.subscribe()
    }

    // ── Maintenance mode ─────────────────────────────────────────────

    /// In maintenance mode pulse-relay writes flip the virtual state
    /// without pulsing hardware. Everything else is unaffected.
    pub fn set_maintenance_mode(&self, enabled: bool) {
        self.inner.maintenance.store(enabled, Ordering::Relaxed);
        info!(endpoint = %self.inner.config.name, enabled, "maintenance mode");
    }

    pub fn maintenance_mode(&self) -> bool {
        self.inner.maintenance.load(Ordering::Relaxed)
    }

    // ── Typed getters ────────────────────────────────────────────────
    //
    // Reads require a live session: between reconnects the mirror may
    // lag hardware, so stale answers are refused rather than served.
    // Bulk directory queries stay available through `directory()`.

    /// Boolean state of a digital input.
    pub fn input_state(&self, circuit: &str) -> Result<bool, CoreError> {
        self.ensure_connected()?;
        Ok(self
            .inner
            .directory
            .get(DeviceKind::Input, None, circuit)?
            .is_on())
    }

    /// Boolean state of a relay output (physical or digital).
    pub fn relay_state(&self, subtype: RelaySubtype, circuit: &str) -> Result<bool, CoreError> {
        self.ensure_connected()?;
        Ok(self
            .inner
            .directory
            .get(DeviceKind::Relay, Some(subtype), circuit)?
            .is_on())
    }

    /// Boolean state of a user LED.
    pub fn led_state(&self, circuit: &str) -> Result<bool, CoreError> {
        self.ensure_connected()?;
        Ok(self
            .inner
            .directory
            .get(DeviceKind::Led, None, circuit)?
            .is_on())
    }

    /// Reading of an analogue input, in hardware units.
    pub fn analogue_input_value(&self, circuit: &str) -> Result<f64, CoreError> {
        self.ensure_connected()?;
        Ok(self
            .inner
            .directory
            .get(DeviceKind::AnalogueInput, None, circuit)?
            .value)
    }

    /// Last written value of an analogue output.
    pub fn analogue_output_value(&self, circuit: &str) -> Result<f64, CoreError> {
        self.ensure_connected()?;
        Ok(self
            .inner
            .directory
            .get(DeviceKind::AnalogueOutput, None, circuit)?
            .value)
    }

    /// Virtual state of a configured pulse relay. `None` when the
    /// circuit has no pulse timer configured.
    pub fn pulse_relay_state(&self, subtype: RelaySubtype, circuit: &str) -> Option<bool> {
        self.inner
            .pulse_states
            .get(&(subtype, circuit.to_owned()))
            .map(|entry| *entry)
    }

    // ── Typed setters ────────────────────────────────────────────────

    /// Switch a relay output on or off.
    pub async fn set_relay(
        &self,
        subtype: RelaySubtype,
        circuit: &str,
        on: bool,
    ) -> Result<(), CoreError> {
        self.ensure_connected()?;
        self.inner
            .directory
            .get(DeviceKind::Relay, Some(subtype), circuit)?;
        self.send(ClientCommand::Send(SetCommand::binary("relay", circuit, on)))
            .await
    }

    /// Switch a user LED on or off.
    pub async fn set_led(&self, circuit: &str, on: bool) -> Result<(), CoreError> {
        self.ensure_connected()?;
        self.inner.directory.get(DeviceKind::Led, None, circuit)?;
        self.send(ClientCommand::Send(SetCommand::binary("led", circuit, on)))
            .await
    }

    /// Write an analogue output value.
    pub async fn set_analogue_output(&self, circuit: &str, value: f64) -> Result<(), CoreError> {
        self.ensure_connected()?;
        self.inner
            .directory
            .get(DeviceKind::AnalogueOutput, None, circuit)?;
        self.send(ClientCommand::Send(SetCommand::analogue(
            "ao", circuit, value,
        )))
        .await
    }

    /// Drive a virtual pulse relay to the requested state.
    ///
    /// The matching physical output receives an ON pulse; the virtual
    /// state is updated directly and broadcast as a
    /// [`PulseRelay`](EvokEvent::PulseRelay) event.
    pub async fn set_pulse_relay(
        &self,
        subtype: RelaySubtype,
        circuit: &str,
        on: bool,
    ) -> Result<(), CoreError> {
        self.ensure_connected()?;
        self.inner
            .directory
            .get(DeviceKind::Relay, Some(subtype), circuit)?;
        self.send(ClientCommand::Pulse {
            subtype,
            circuit: circuit.to_owned(),
            on,
        })
        .await
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn ensure_connected(&self) -> Result<(), CoreError> {
        if *self.inner.connection_state.borrow() == ConnectionState::Connected {
            Ok(())
        } else {
            Err(CoreError::NotConnected)
        }
    }

    async fn send(&self, command: ClientCommand) -> Result<(), CoreError> {
        self.inner
            .command_tx
            .send(command)
            .await
            .map_err(|_| CoreError::NotConnected)
    }
}

// ── Watchdog ─────────────────────────────────────────────────────────

/// Session liveness watchdog.
///
/// Ticks at a fixed interval; any inbound socket traffic resets the
/// missed-tick counter. When the counter passes the ceiling the session
/// is declared dead. Each healthy tick optionally toggles a user LED as
/// a visible heartbeat.
struct Watchdog {
    ticker: Ticker,
    max_missed: u32,
    missed: u32,
    led_circuit: Option<String>,
    led_on: bool,
}

/// Outcome of one watchdog tick.
struct WatchdogTick {
    expired: bool,
    led: Option<SetCommand>,
}

impl Watchdog {
    fn new(config: &WatchdogConfig, now: Instant) -> Self {
        let mut ticker = Ticker::new(config.interval);
        let _ = ticker.start(now);
        Self {
            ticker,
            max_missed: config.max_missed,
            missed: 0,
            led_circuit: config.led_circuit.clone(),
            led_on: false,
        }
    }

    /// Inbound traffic observed: the session is alive.
    fn observe_traffic(&mut self) {
        self.missed = 0;
    }

    fn deadline(&self) -> Option<Instant> {
        self.ticker.deadline()
    }

    fn fire_if_due(&mut self, now: Instant) -> Option<WatchdogTick> {
        if !self.ticker.fire_if_due(now) {
            return None;
        }
        self.missed += 1;
        if self.missed > self.max_missed {
            return Some(WatchdogTick {
                expired: true,
                led: None,
            });
        }
        let led = self.led_circuit.as_ref().map(|circuit| {
            self.led_on = !self.led_on;
            SetCommand::binary("led", circuit.clone(), self.led_on)
        });
        Some(WatchdogTick {
            expired: false,
            led,
        })
    }
}

// ── Supervisor ───────────────────────────────────────────────────────

/// Connect, run the session until it dies, reconnect, repeat.
///
/// A failed connect attempt waits out the configured reconnect interval
/// before retrying; losing an established session reconnects right
/// away, since the endpoint was reachable moments ago.
async fn supervise(inner: Arc<ClientInner>, mut commands: mpsc::Receiver<ClientCommand>) {
    let endpoint = inner.config.name.clone();
    let mut attempt: u32 = 0;

    // Engines outlive individual sessions so pulse-relay virtual state
    // carries across reconnects.
    let mut gestures = GestureEngine::new(
        GestureConfig {
            double_press_max_delay: inner.config.double_press_max_delay,
            long_press_min_delay: inner.config.long_press_min_delay,
            max_repeat_count: inner.config.max_repeat_count,
        },
        RuleSet::new(inner.config.rules.clone()),
    );
    let mut outputs = OutputEngine::new(&inner.config.timers);

    loop {
        if inner.cancel.is_cancelled() {
            break;
        }
        let _ = inner.connection_state.send(if attempt == 0 {
            ConnectionState::Connecting
        } else {
            ConnectionState::Reconnecting { attempt }
        });

        let result = tokio::select! {
            biased;
            () = inner.cancel.cancelled() => Ok(SessionEnd::Shutdown),
            result = run_session(&inner, &mut commands, &mut gestures, &mut outputs) => result,
        };
        gestures.reset();
        outputs.reset();

        match result {
            Ok(SessionEnd::Shutdown) => break,
            Ok(SessionEnd::ConnectionLost) => {
                warn!(endpoint = %endpoint, "session lost, reconnecting");
                let _ = inner
                    .event_tx
                    .send(Arc::new(EvokEvent::Lifecycle(LifecycleEvent::Disconnected)));
                attempt = 1;
            }
            Err(err) => {
                attempt += 1;
                warn!(
                    endpoint = %endpoint,
                    error = %err,
                    attempt,
                    delay = ?inner.config.reconnect_interval,
                    "connect failed, retrying"
                );
                tokio::select! {
                    biased;
                    () = inner.cancel.cancelled() => break,
                    () = tokio::time::sleep(inner.config.reconnect_interval) => {}
                }
            }
        }
    }

    let _ = inner.connection_state.send(ConnectionState::Disconnected);
    debug!(endpoint = %endpoint, "supervisor exited");
}

/// One connected session: snapshot load, socket attach, event loop.
async fn run_session(
    inner: &Arc<ClientInner>,
    commands: &mut mpsc::Receiver<ClientCommand>,
    gestures: &mut GestureEngine,
    outputs: &mut OutputEngine,
) -> Result<SessionEnd, CoreError> {
    let transport = inner.config.transport();
    let rest = RestClient::new(&transport)?;
    let snapshot = rest.fetch_all().await?;
    inner.directory.load(snapshot);
    info!(
        endpoint = %inner.config.name,
        devices = inner.directory.len(),
        "snapshot loaded"
    );

    let ws_url = transport.ws_url()?;
    let socket = EvokSocket::connect(&ws_url).await?;
    let (writer, mut reader) = socket.split();

    let now = Instant::now();
    gestures.setup(&inner.directory.inputs()?);
    let mut seedable = inner.directory.relays()?;
    seedable.extend(inner.directory.digital_outputs()?);
    outputs.seed(&seedable, now);

    let mut session = Session {
        inner,
        writer,
        gestures,
        outputs,
        watchdog: Watchdog::new(&inner.config.watchdog, now),
        expired: false,
    };

    let _ = inner.connection_state.send(ConnectionState::Connected);
    let _ = inner
        .event_tx
        .send(Arc::new(EvokEvent::Lifecycle(LifecycleEvent::Connected)));
    info!(endpoint = %inner.config.name, "connected");

    let end = loop {
        let deadline = earliest([
            session.gestures.next_deadline(),
            session.outputs.next_deadline(),
            session.watchdog.deadline(),
        ]);

        tokio::select! {
            biased;
            () = inner.cancel.cancelled() => break SessionEnd::Shutdown,
            command = commands.recv() => match command {
                Some(command) => {
                    if session.handle_command(command).await.is_err() {
                        break SessionEnd::ConnectionLost;
                    }
                }
                // All façade handles dropped.
                None => break SessionEnd::Shutdown,
            },
            event = reader.next() => match event {
                Ok(Some(SocketEvent::Batch(batch))) => {
                    session.watchdog.observe_traffic();
                    if session.handle_batch(batch).await.is_err() {
                        break SessionEnd::ConnectionLost;
                    }
                }
                Ok(Some(SocketEvent::Keepalive)) => session.watchdog.observe_traffic(),
                Ok(None) => break SessionEnd::ConnectionLost,
                Err(err) => {
                    warn!(endpoint = %inner.config.name, error = %err, "socket error");
                    break SessionEnd::ConnectionLost;
                }
            },
            () = wait_until(deadline) => {
                if session.on_deadline(Instant::now()).await.is_err() {
                    break SessionEnd::ConnectionLost;
                }
                if session.expired {
                    warn!(endpoint = %inner.config.name, "watchdog expired");
                    break SessionEnd::ConnectionLost;
                }
            }
        }
    };

    session.writer.close().await;
    Ok(end)
}

/// Sleep until `deadline`, or forever when no timer is pending.
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

// ── Session ──────────────────────────────────────────────────────────

/// Mutable state of one connected session.
struct Session<'a> {
    inner: &'a Arc<ClientInner>,
    writer: SocketWriter,
    gestures: &'a mut GestureEngine,
    outputs: &'a mut OutputEngine,
    watchdog: Watchdog,
    /// Set when the watchdog declares the session dead.
    expired: bool,
}

impl Session<'_> {
    /// Apply one inbound record batch, preserving array order.
    async fn handle_batch(&mut self, batch: Vec<evok_api::RawDevice>) -> Result<(), evok_api::Error> {
        let now = Instant::now();
        for raw in batch {
            let Some(event) = self.inner.directory.ingest(raw) else {
                continue;
            };

            match event.category {
                EventCategory::Input => {
                    let pressed = event.record.is_on();
                    let actions = self.gestures.on_edge(&event.record.circuit, pressed, now);
                    self.apply_gesture_actions(actions).await?;
                }
                EventCategory::Relay | EventCategory::DigitalOutput => {
                    let maintenance = self.inner.maintenance.load(Ordering::Relaxed);
                    let actions = self.outputs.on_output_change(
                        &event.record,
                        event.previous.as_ref(),
                        now,
                        maintenance,
                    );
                    self.apply_output_actions(actions).await?;
                }
                _ => {}
            }

            let _ = self
                .inner
                .event_tx
                .send(Arc::new(EvokEvent::Device(event)));
        }
        Ok(())
    }

    async fn handle_command(&mut self, command: ClientCommand) -> Result<(), evok_api::Error> {
        match command {
            ClientCommand::Send(command) => self.writer.send(&command).await,
            ClientCommand::Pulse {
                subtype,
                circuit,
                on,
            } => {
                let maintenance = self.inner.maintenance.load(Ordering::Relaxed);
                let actions = self.outputs.pulse(subtype, &circuit, on, maintenance);
                self.apply_output_actions(actions).await
            }
        }
    }

    /// Fire every engine timer due at `now`, then the watchdog.
    async fn on_deadline(&mut self, now: Instant) -> Result<(), evok_api::Error> {
        let actions = self.gestures.poll(now);
        self.apply_gesture_actions(actions).await?;

        let actions = self.outputs.poll(now);
        self.apply_output_actions(actions).await?;

        if let Some(tick) = self.watchdog.fire_if_due(now) {
            if tick.expired {
                self.expired = true;
            } else if let Some(led) = tick.led {
                self.writer.send(&led).await?;
            }
        }
        Ok(())
    }

    async fn apply_gesture_actions(
        &mut self,
        actions: Vec<GestureAction>,
    ) -> Result<(), evok_api::Error> {
        for action in actions {
            match action {
                GestureAction::Emit(event) => {
                    let _ = self
                        .inner
                        .event_tx
                        .send(Arc::new(EvokEvent::Gesture(event)));
                }
                GestureAction::Command(command) => self.writer.send(&command).await?,
            }
        }
        Ok(())
    }

    async fn apply_output_actions(
        &mut self,
        actions: Vec<OutputAction>,
    ) -> Result<(), evok_api::Error> {
        for action in actions {
            match action {
                OutputAction::Command(command) => self.writer.send(&command).await?,
                OutputAction::PulseChanged {
                    subtype,
                    circuit,
                    on,
                } => {
                    self.inner
                        .pulse_states
                        .insert((subtype, circuit.clone()), on);
                    let _ = self.inner.event_tx.send(Arc::new(EvokEvent::PulseRelay {
                        subtype,
                        circuit,
                        on,
                    }));
                }
            }
        }
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    const MS: Duration = Duration::from_millis(1);

    fn watchdog_config() -> WatchdogConfig {
        WatchdogConfig {
            interval: 3000 * MS,
            max_missed: 5,
            led_circuit: Some("1_01".into()),
        }
    }

    #[test]
    fn watchdog_expires_after_silent_ticks_past_the_ceiling() {
        let t0 = Instant::now();
        let mut watchdog = Watchdog::new(&watchdog_config(), t0);

        for tick in 1..=5u32 {
            let outcome = watchdog.fire_if_due(t0 + tick * 3000 * MS).unwrap();
            assert!(!outcome.expired, "tick {tick} must not expire");
        }
        let outcome = watchdog.fire_if_due(t0 + 6 * 3000 * MS).unwrap();
        assert!(outcome.expired);
    }

    #[test]
    fn traffic_resets_the_missed_counter() {
        let t0 = Instant::now();
        let mut watchdog = Watchdog::new(&watchdog_config(), t0);

        for tick in 1..=5u32 {
            watchdog.fire_if_due(t0 + tick * 3000 * MS).unwrap();
        }
        watchdog.observe_traffic();

        // The counter starts over: another full five silent ticks
        // before expiry.
        for tick in 6..=10u32 {
            let outcome = watchdog.fire_if_due(t0 + tick * 3000 * MS).unwrap();
            assert!(!outcome.expired);
        }
        assert!(watchdog.fire_if_due(t0 + 11 * 3000 * MS).unwrap().expired);
    }

    #[test]
    fn heartbeat_led_alternates() {
        let t0 = Instant::now();
        let mut watchdog = Watchdog::new(&watchdog_config(), t0);

        let first = watchdog.fire_if_due(t0 + 3000 * MS).unwrap().led.unwrap();
        let second = watchdog.fire_if_due(t0 + 6000 * MS).unwrap().led.unwrap();
        assert_eq!(first, SetCommand::binary("led", "1_01", true));
        assert_eq!(second, SetCommand::binary("led", "1_01", false));
    }

    #[test]
    fn no_heartbeat_without_a_led_circuit() {
        let t0 = Instant::now();
        let mut watchdog = Watchdog::new(
            &WatchdogConfig {
                led_circuit: None,
                ..watchdog_config()
            },
            t0,
        );
        assert!(watchdog.fire_if_due(t0 + 3000 * MS).unwrap().led.is_none());
    }

    #[test]
    fn nothing_fires_between_ticks() {
        let t0 = Instant::now();
        let mut watchdog = Watchdog::new(&watchdog_config(), t0);
        assert!(watchdog.fire_if_due(t0 + 2999 * MS).is_none());
        assert_eq!(watchdog.deadline(), Some(t0 + 3000 * MS));
    }

    #[tokio::test]
    async fn setters_and_getters_fail_before_the_client_connects() {
        let client = EvokClient::new(EndpointConfig::default());
        let err = client
            .set_relay(RelaySubtype::Physical, "1_01", true)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotConnected));
        assert!(matches!(
            client.input_state("1_01"),
            Err(CoreError::NotConnected)
        ));
        assert!(matches!(
            client.analogue_input_value("1_01"),
            Err(CoreError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn start_is_single_shot() {
        let client = EvokClient::new(EndpointConfig {
            host: "127.0.0.1".into(),
            // Closed ports so the supervisor just cycles retries.
            port: 1,
            ws_port: 1,
            reconnect_interval: 10 * MS,
            ..EndpointConfig::default()
        });
        client.start().await.unwrap();
        assert!(matches!(
            client.start().await,
            Err(CoreError::AlreadyStarted)
        ));
        client.stop().await;
        assert_eq!(
            *client.connection_state().borrow(),
            ConnectionState::Disconnected
        );
        // Stopped clients stay stopped.
        assert!(matches!(
            client.start().await,
            Err(CoreError::AlreadyStarted)
        ));
    }

    #[test]
    fn pulse_state_defaults_to_off_for_configured_relays() {
        let client = EvokClient::new(EndpointConfig {
            timers: vec![crate::config::TimerConfig {
                relay_type: RelaySubtype::Digital,
                circuit: "2_01".into(),
                timeout: Duration::from_secs(1),
                pulse: true,
                name: None,
            }],
            ..EndpointConfig::default()
        });
        assert_eq!(
            client.pulse_relay_state(RelaySubtype::Digital, "2_01"),
            Some(false)
        );
        assert_eq!(client.pulse_relay_state(RelaySubtype::Digital, "9_99"), None);
    }
}

