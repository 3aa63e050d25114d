// ── Simulated backend ──
//
// An in-process stand-in for the vehicle service. It speaks the same
// traits as a real backend (events on login, per-vehicle handles) and keeps
// a tiny mutable car model so lock/start/charge calls are observable in the
// next status query. Used by the test suites and the CLI `simulate` command.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tracing::debug;

use crate::auth::Credentials;
use crate::client::{ClientEvent, Connector, Vehicle, VehicleClient};
use crate::error::Error;
use crate::models::{FullStatusOptions, Location, Odometer, Speed, StatusOptions};

const EVENT_CHANNEL_SIZE: usize = 16;

/// What the simulated service does when asked to log in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginBehavior {
    /// Publish `ready` after the configured latency.
    Succeed,
    /// Publish `error` with the given reason.
    Fail(String),
    /// Accept the request and never answer.
    Hang,
}

/// Knobs for a [`SimulatedClient`].
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub login: LoginBehavior,
    /// Delay applied to login and to every vehicle call.
    pub latency: Duration,
    /// VINs registered to the simulated account.
    pub vehicles: Vec<String>,
    /// When set, every vehicle call is rejected with this reason.
    pub reject_calls: Option<String>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            login: LoginBehavior::Succeed,
            latency: Duration::ZERO,
            vehicles: vec![SIM_VIN.to_string()],
            reject_calls: None,
        }
    }
}

/// VIN of the vehicle a default [`SimConfig`] registers.
pub const SIM_VIN: &str = "KMHL14JA5KA000001";

#[derive(Debug, Clone)]
struct CarState {
    locked: bool,
    engine_on: bool,
    charging: bool,
    battery_pct: u8,
    odometer_km: f64,
    latitude: f64,
    longitude: f64,
    last_start_options: Option<Value>,
}

impl Default for CarState {
    fn default() -> Self {
        Self {
            locked: true,
            engine_on: false,
            charging: false,
            battery_pct: 72,
            odometer_km: 12_345.6,
            latitude: 37.5665,
            longitude: 126.978,
            last_start_options: None,
        }
    }
}

fn lock_state(state: &Mutex<CarState>) -> MutexGuard<'_, CarState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Client ───────────────────────────────────────────────────────

/// Simulated account handle.
///
/// Cheaply shareable behind an `Arc`; tests keep a typed `Arc<SimulatedClient>`
/// to inject events and inspect call counters while the core holds the same
/// handle as `Arc<dyn VehicleClient>`.
pub struct SimulatedClient {
    config: Mutex<SimConfig>,
    events: broadcast::Sender<ClientEvent>,
    cars: HashMap<String, Arc<Mutex<CarState>>>,
    login_calls: AtomicUsize,
    vehicle_calls: Arc<AtomicUsize>,
}

impl SimulatedClient {
    pub fn new(config: SimConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let cars = config
            .vehicles
            .iter()
            .map(|vin| (vin.clone(), Arc::new(Mutex::new(CarState::default()))))
            .collect();
        Self {
            config: Mutex::new(config),
            events,
            cars,
            login_calls: AtomicUsize::new(0),
            vehicle_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Publish a lifecycle event as if the service had sent it unprompted.
    pub fn emit(&self, event: ClientEvent) {
        debug!(event = event.name(), "simulated client event");
        // No subscribers is fine: nobody is listening yet.
        let _ = self.events.send(event);
    }

    /// Change what subsequent logins do.
    pub fn set_login_behavior(&self, behavior: LoginBehavior) {
        self.config
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .login = behavior;
    }

    /// Number of `login()` calls received so far.
    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    /// Number of vehicle operations started so far.
    pub fn vehicle_calls(&self) -> usize {
        self.vehicle_calls.load(Ordering::SeqCst)
    }

    /// Whether the given car is currently locked, `None` for unknown VINs.
    pub fn is_locked(&self, vin: &str) -> Option<bool> {
        self.cars.get(vin).map(|car| lock_state(car).locked)
    }

    /// Options passed to the most recent remote start of the given car.
    pub fn last_start_options(&self, vin: &str) -> Option<Value> {
        self.cars
            .get(vin)
            .and_then(|car| lock_state(car).last_start_options.clone())
    }

    fn snapshot_config(&self) -> SimConfig {
        self.config
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl VehicleClient for SimulatedClient {
    fn events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    async fn login(&self) -> Result<(), Error> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        let config = self.snapshot_config();
        if !config.latency.is_zero() {
            tokio::time::sleep(config.latency).await;
        }
        match config.login {
            LoginBehavior::Succeed => self.emit(ClientEvent::Ready),
            LoginBehavior::Fail(reason) => self.emit(ClientEvent::Error(reason)),
            LoginBehavior::Hang => debug!("simulated login left unanswered"),
        }
        Ok(())
    }

    async fn get_vehicle(&self, vehicle_id: &str) -> Result<Arc<dyn Vehicle>, Error> {
        let car = self
            .cars
            .get(vehicle_id)
            .ok_or_else(|| Error::VehicleNotFound {
                vehicle_id: vehicle_id.to_string(),
            })?;
        let config = self.snapshot_config();
        Ok(Arc::new(SimulatedVehicle {
            vin: vehicle_id.to_string(),
            state: Arc::clone(car),
            latency: config.latency,
            reject_calls: config.reject_calls,
            calls: Arc::clone(&self.vehicle_calls),
        }))
    }
}

/// [`Connector`] that hands out fresh [`SimulatedClient`]s.
#[derive(Debug, Clone, Default)]
pub struct SimulatedConnector {
    pub config: SimConfig,
}

impl SimulatedConnector {
    pub fn new(config: SimConfig) -> Self {
        Self { config }
    }
}

impl Connector for SimulatedConnector {
    fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn VehicleClient>, Error> {
        if credentials.username.trim().is_empty() {
            return Err(Error::Authentication {
                message: "username must not be empty".into(),
            });
        }
        debug!(
            username = %credentials.username,
            region = %credentials.region,
            brand = %credentials.brand,
            "creating simulated client"
        );
        Ok(Arc::new(SimulatedClient::new(self.config.clone())))
    }
}

// ── Vehicle ──────────────────────────────────────────────────────

struct SimulatedVehicle {
    vin: String,
    state: Arc<Mutex<CarState>>,
    latency: Duration,
    reject_calls: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl SimulatedVehicle {
    /// Count the call, wait out the latency, and apply the rejection knob.
    async fn begin(&self) -> Result<(), Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match &self.reject_calls {
            Some(reason) => Err(Error::Rejected {
                message: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    fn raw_status(car: &CarState) -> Value {
        json!({
            "doorLock": car.locked,
            "engine": car.engine_on,
            "airCtrlOn": car.engine_on,
            "evStatus": {
                "batteryCharge": car.charging,
                "batteryStatus": car.battery_pct,
            },
            "time": Utc::now().format("%Y%m%d%H%M%S").to_string(),
        })
    }

    fn parsed_status(car: &CarState) -> Value {
        json!({
            "chassis": { "locked": car.locked },
            "climate": { "active": car.engine_on },
            "engine": {
                "ignition": car.engine_on,
                "charging": car.charging,
                "batteryCharge": car.battery_pct,
            },
            "lastupdate": Utc::now().to_rfc3339(),
        })
    }

    fn odometer_of(car: &CarState) -> Odometer {
        Odometer {
            value: car.odometer_km,
            unit: "km".into(),
        }
    }

    fn location_of(car: &CarState) -> Location {
        Location {
            latitude: car.latitude,
            longitude: car.longitude,
            altitude: 38.0,
            heading: 0.0,
            speed: Speed {
                value: 0.0,
                unit: "km/h".into(),
            },
        }
    }
}

#[async_trait]
impl Vehicle for SimulatedVehicle {
    fn vin(&self) -> &str {
        &self.vin
    }

    async fn status(&self, options: StatusOptions) -> Result<Value, Error> {
        self.begin().await?;
        let car = lock_state(&self.state);
        Ok(if options.parsed {
            Self::parsed_status(&car)
        } else {
            Self::raw_status(&car)
        })
    }

    async fn full_status(&self, _options: FullStatusOptions) -> Result<Value, Error> {
        self.begin().await?;
        let car = lock_state(&self.state);
        Ok(json!({
            "vehicleStatus": Self::raw_status(&car),
            "vehicleLocation": Self::location_of(&car),
            "odometer": Self::odometer_of(&car),
        }))
    }

    async fn odometer(&self) -> Result<Odometer, Error> {
        self.begin().await?;
        Ok(Self::odometer_of(&lock_state(&self.state)))
    }

    async fn location(&self) -> Result<Location, Error> {
        self.begin().await?;
        Ok(Self::location_of(&lock_state(&self.state)))
    }

    async fn lock(&self) -> Result<String, Error> {
        self.begin().await?;
        lock_state(&self.state).locked = true;
        Ok("Lock successful".into())
    }

    async fn unlock(&self) -> Result<String, Error> {
        self.begin().await?;
        lock_state(&self.state).locked = false;
        Ok("Unlock successful".into())
    }

    async fn start(&self, options: Value) -> Result<String, Error> {
        self.begin().await?;
        let mut car = lock_state(&self.state);
        car.engine_on = true;
        car.last_start_options = Some(options);
        Ok("Vehicle started!".into())
    }

    async fn stop(&self) -> Result<String, Error> {
        self.begin().await?;
        lock_state(&self.state).engine_on = false;
        Ok("Vehicle stopped".into())
    }

    async fn start_charge(&self) -> Result<String, Error> {
        self.begin().await?;
        lock_state(&self.state).charging = true;
        Ok("Charge started".into())
    }

    async fn stop_charge(&self) -> Result<String, Error> {
        self.begin().await?;
        lock_state(&self.state).charging = false;
        Ok("Charge stopped".into())
    }
}
