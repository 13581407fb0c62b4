//! Engine adapter: lifecycle of the engine core
//!
//! The adapter owns the single engine instance and the two background
//! tasks that keep it alive: the pump task, which iterates the engine so
//! its internal state machines advance, and the router task, which drains
//! the ordered event channel and dispatches delegate callbacks. Initialize
//! is idempotent, destroy is safe at any point, and the configuration can
//! be swapped without restarting the core.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;

use crate::call::CallId;
use crate::client::router::CallEventRouter;
use crate::config::Config;
use crate::engine::{EngineCall, EngineTuning, SipEngine};
use crate::error::{ClientError, ClientResult};
use crate::registration::RegistrationCoordinator;

/// Pump interval; the engine's own event loop advances at this cadence
const PUMP_INTERVAL: Duration = Duration::from_millis(50);

/// Owns the engine core, the active-call set, and the background tasks
pub struct EngineAdapter {
    engine: Arc<dyn SipEngine>,
    config: Arc<RwLock<Option<Config>>>,
    initialized: Arc<AtomicBool>,
    registration: Arc<RegistrationCoordinator>,
    active_calls: Arc<DashMap<CallId, Arc<dyn EngineCall>>>,
    pump_task: Mutex<Option<JoinHandle<()>>>,
    router_task: Mutex<Option<JoinHandle<()>>>,
}

impl EngineAdapter {
    /// Wrap an engine instance; nothing starts until [`initialize`]
    ///
    /// [`initialize`]: EngineAdapter::initialize
    pub fn new(engine: Arc<dyn SipEngine>) -> Self {
        Self {
            engine,
            config: Arc::new(RwLock::new(None)),
            initialized: Arc::new(AtomicBool::new(false)),
            registration: Arc::new(RegistrationCoordinator::new()),
            active_calls: Arc::new(DashMap::new()),
            pump_task: Mutex::new(None),
            router_task: Mutex::new(None),
        }
    }

    pub(crate) fn engine(&self) -> &Arc<dyn SipEngine> {
        &self.engine
    }

    pub(crate) fn registration(&self) -> &Arc<RegistrationCoordinator> {
        &self.registration
    }

    pub(crate) fn active_calls(&self) -> &Arc<DashMap<CallId, Arc<dyn EngineCall>>> {
        &self.active_calls
    }

    /// Whether the engine core is up and the tasks are running
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Snapshot of the active configuration
    pub async fn config(&self) -> Option<Config> {
        self.config.read().await.clone()
    }

    /// Emit a diagnostic line via tracing and the logging delegate
    pub(crate) async fn log(&self, message: &str) {
        tracing::debug!("{message}");
        if let Some(config) = self.config.read().await.as_ref() {
            if let Some(delegate) = &config.logging_delegate {
                delegate.on_client_log(message);
            }
        }
    }

    /// Bring the engine core up under `config`
    ///
    /// Idempotent: calling on an already-initialized adapter only stores
    /// the new configuration. On engine start failure the adapter stays
    /// uninitialized and the call can be retried.
    pub async fn initialize(&self, config: Config) -> ClientResult<()> {
        if self.is_initialized() {
            self.log("Engine already initialized, updating configuration only.")
                .await;
            *self.config.write().await = Some(config);
            return Ok(());
        }

        let codecs = config.codecs.clone();
        let user_agent = config.user_agent.clone();
        let ring_sound = config.ring_sound.clone();
        let stun = config.stun.clone();
        *self.config.write().await = Some(config);

        // Engine-side log collection stays off; engine lines reach the
        // consumer through the event channel instead.
        self.engine.set_log_collection_enabled(false);

        let (tx, rx) = mpsc::unbounded_channel();
        self.engine.install_event_sink(tx);

        self.engine.set_user_agent(&user_agent);
        self.engine.set_ring_sound(ring_sound.as_deref());
        self.engine.set_stun_server(stun.as_deref());

        if let Err(error) = self.engine.start() {
            tracing::error!(%error, "engine start failed");
            return Err(ClientError::engine_start(&error));
        }

        self.engine.apply_tuning(EngineTuning::default());
        self.set_audio_codecs(&codecs).await;

        self.initialized.store(true, Ordering::SeqCst);

        let router = CallEventRouter::new(
            self.config.clone(),
            self.registration.clone(),
            self.active_calls.clone(),
        );
        *self.router_task.lock().unwrap() = Some(tokio::spawn(router.run(rx)));
        *self.pump_task.lock().unwrap() = Some(self.spawn_pump());

        self.log("Engine initialized.").await;
        Ok(())
    }

    fn spawn_pump(&self) -> JoinHandle<()> {
        let engine = self.engine.clone();
        let initialized = self.initialized.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(PUMP_INTERVAL);
            while initialized.load(Ordering::SeqCst) {
                ticker.tick().await;
                engine.iterate();
            }
        })
    }

    /// Replace the active configuration without touching the engine core
    ///
    /// The next `register` uses the new credentials; the call delegate is
    /// switched for every event dispatched from now on.
    pub async fn swap_config(&self, config: Config) {
        *self.config.write().await = Some(config);
    }

    /// Tear the engine core down
    ///
    /// Safe to call at any point, including before [`initialize`] or twice
    /// in a row. Pending registration callbacks are dropped, background
    /// tasks stop, and the active-call set is emptied.
    ///
    /// [`initialize`]: EngineAdapter::initialize
    pub async fn destroy(&self) {
        self.initialized.store(false, Ordering::SeqCst);
        self.registration.clear();

        if let Some(task) = self.pump_task.lock().unwrap().take() {
            task.abort();
        }
        if let Some(task) = self.router_task.lock().unwrap().take() {
            task.abort();
        }

        self.engine.stop();
        self.active_calls.clear();
        self.log("Engine destroyed.").await;
    }
}
