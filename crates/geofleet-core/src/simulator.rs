//! The per-tick unit of work: perturb every vehicle, then match, dedup,
//! and emit.
//!
//! # Tick sequence
//!
//! 1. Read the vehicle and geofence snapshot (once; never re-read mid-tick)
//! 2. For each vehicle, draw a uniform offset in `[-D, D]` per axis
//! 3. Write the new position through the store (one atomic call)
//! 4. Match the committed position against every geofence
//! 5. For each match, consult the deduplicator and emit if allowed
//!
//! A failure on one vehicle is logged and counted; the remaining vehicles
//! are still processed. Only a failed snapshot read aborts the tick.
//!
//! Ticks are single-flight: the internal state mutex is held for the
//! whole tick, so a manual [`PositionSimulator::tick`] issued while a
//! scheduled tick runs waits for it to finish.

use std::sync::Arc;

use chrono::TimeDelta;
use geofleet_db::{DbError, EntityStore};
use geofleet_types::{Coordinate, Geofence, Vehicle};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::Mutex;

use crate::clock::Clock;
use crate::dedup::{AlertDeduplicator, EmitDecision};
use crate::emitter::AlertEmitter;
use crate::geofence::{match_all, GeofenceMatch};

/// Errors that abort a whole tick.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// The store could not be reached while reading the snapshot. The tick
    /// is skipped and the next scheduled tick retries.
    #[error("tick {tick}: entity store unavailable: {source}")]
    StoreUnavailable {
        /// Tick number that was skipped.
        tick: u64,
        /// The underlying store error.
        source: DbError,
    },

    /// The snapshot read failed for a reason other than connectivity.
    #[error("tick {tick}: failed to read snapshot: {source}")]
    Snapshot {
        /// Tick number that was skipped.
        tick: u64,
        /// The underlying store error.
        source: DbError,
    },
}

impl TickError {
    fn from_snapshot(tick: u64, source: DbError) -> Self {
        if source.is_unavailable() {
            Self::StoreUnavailable { tick, source }
        } else {
            Self::Snapshot { tick, source }
        }
    }
}

/// Counters describing one completed tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// Vehicles whose new position was committed.
    pub vehicles_moved: u32,
    /// Vehicles whose write failed (store error); retried next tick.
    pub vehicles_failed: u32,
    /// Vehicles whose drawn position was out of range and rejected.
    pub vehicles_rejected: u32,
    /// Geofences in the snapshot with invalid geometry, ignored this tick.
    pub geofences_skipped: u32,
    /// (vehicle, geofence) containment matches.
    pub matches: u32,
    /// Alerts persisted.
    pub alerts_emitted: u32,
    /// Matches suppressed by the deduplication window.
    pub alerts_suppressed: u32,
    /// Matches whose dedup lookup or alert insert failed.
    pub alert_failures: u32,
}

/// Simulator tuning parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatorSettings {
    /// Maximum per-axis offset per tick, in degrees.
    pub perturbation_deg: f64,
    /// Deduplication window.
    pub dedup_window: TimeDelta,
    /// RNG seed; the OS seeds the generator when `None`.
    pub seed: Option<u64>,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            perturbation_deg: 0.005,
            dedup_window: TimeDelta::minutes(5),
            seed: None,
        }
    }
}

#[derive(Debug)]
struct SimState {
    rng: StdRng,
    tick: u64,
}

/// Drives the random walk and the alert pipeline.
#[derive(Debug)]
pub struct PositionSimulator<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    dedup: AlertDeduplicator<S>,
    emitter: AlertEmitter<S>,
    perturbation_deg: f64,
    state: Mutex<SimState>,
}

impl<S: EntityStore> PositionSimulator<S> {
    /// Create a simulator over `store`.
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, settings: SimulatorSettings) -> Self {
        let rng = settings
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        Self {
            dedup: AlertDeduplicator::new(Arc::clone(&store), settings.dedup_window),
            emitter: AlertEmitter::new(Arc::clone(&store), Arc::clone(&clock)),
            store,
            clock,
            perturbation_deg: settings.perturbation_deg,
            state: Mutex::new(SimState { rng, tick: 0 }),
        }
    }

    /// The store this simulator writes to.
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Number of ticks attempted so far.
    pub async fn ticks_attempted(&self) -> u64 {
        self.state.lock().await.tick
    }

    /// Run one tick.
    ///
    /// # Errors
    ///
    /// Returns [`TickError`] only when the snapshot cannot be read; every
    /// per-vehicle and per-alert failure is absorbed into the summary.
    pub async fn tick(&self) -> Result<TickSummary, TickError> {
        let mut state = self.state.lock().await;
        state.tick = state.tick.saturating_add(1);
        let tick = state.tick;

        let vehicles = self
            .store
            .list_vehicles()
            .await
            .map_err(|e| TickError::from_snapshot(tick, e))?;
        let snapshot = self
            .store
            .list_geofences()
            .await
            .map_err(|e| TickError::from_snapshot(tick, e))?;

        let mut summary = TickSummary {
            tick,
            ..TickSummary::default()
        };

        let geofences: Vec<Geofence> = snapshot
            .into_iter()
            .filter(|g| match g.validate() {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(geofence_id = %g.id, geofence = %g.name, error = %e, "Skipping invalid geofence");
                    summary.geofences_skipped = summary.geofences_skipped.saturating_add(1);
                    false
                }
            })
            .collect();

        for vehicle in vehicles {
            let position = perturb(vehicle.position, &mut state.rng, self.perturbation_deg);
            let Some(moved) = self.commit_position(vehicle, position, &mut summary).await else {
                continue;
            };
            for hit in match_all(&moved, &geofences) {
                summary.matches = summary.matches.saturating_add(1);
                self.process_match(&moved, &hit, &mut summary).await;
            }
        }

        tracing::debug!(
            tick,
            moved = summary.vehicles_moved,
            failed = summary.vehicles_failed,
            rejected = summary.vehicles_rejected,
            matches = summary.matches,
            emitted = summary.alerts_emitted,
            suppressed = summary.alerts_suppressed,
            "Tick complete"
        );
        Ok(summary)
    }

    /// Write the new position. Returns the vehicle as committed, or `None`
    /// when the write was rejected or failed.
    async fn commit_position(
        &self,
        vehicle: Vehicle,
        position: Coordinate,
        summary: &mut TickSummary,
    ) -> Option<Vehicle> {
        let updated_at = self.clock.now();
        match self
            .store
            .update_vehicle_position(vehicle.id, position, updated_at)
            .await
        {
            Ok(()) => {
                summary.vehicles_moved = summary.vehicles_moved.saturating_add(1);
                Some(Vehicle {
                    position,
                    updated_at,
                    ..vehicle
                })
            }
            Err(DbError::InvalidGeometry(e)) => {
                tracing::warn!(
                    vehicle_id = %vehicle.id,
                    vehicle = %vehicle.label,
                    %position,
                    error = %e,
                    "Rejected out-of-range position, keeping last valid position"
                );
                summary.vehicles_rejected = summary.vehicles_rejected.saturating_add(1);
                None
            }
            Err(e) => {
                tracing::warn!(
                    vehicle_id = %vehicle.id,
                    vehicle = %vehicle.label,
                    error = %e,
                    "Position write failed, retrying next tick"
                );
                summary.vehicles_failed = summary.vehicles_failed.saturating_add(1);
                None
            }
        }
    }

    async fn process_match(&self, vehicle: &Vehicle, hit: &GeofenceMatch<'_>, summary: &mut TickSummary) {
        let geofence = hit.geofence;
        match self.dedup.check(vehicle.id, geofence.id, self.clock.now()).await {
            Ok(EmitDecision::Emit) => match self.emitter.emit(vehicle, hit).await {
                Ok(_) => summary.alerts_emitted = summary.alerts_emitted.saturating_add(1),
                Err(e) => {
                    tracing::warn!(
                        vehicle_id = %vehicle.id,
                        geofence_id = %geofence.id,
                        error = %e,
                        "Failed to persist alert"
                    );
                    summary.alert_failures = summary.alert_failures.saturating_add(1);
                }
            },
            Ok(EmitDecision::Suppressed { existing }) => {
                tracing::debug!(
                    vehicle = %vehicle.label,
                    geofence = %geofence.name,
                    existing_alert = %existing,
                    "Duplicate alert suppressed"
                );
                summary.alerts_suppressed = summary.alerts_suppressed.saturating_add(1);
            }
            Err(e) => {
                tracing::warn!(
                    vehicle_id = %vehicle.id,
                    geofence_id = %geofence.id,
                    error = %e,
                    "Dedup lookup failed, skipping match"
                );
                summary.alert_failures = summary.alert_failures.saturating_add(1);
            }
        }
    }
}

/// Offset `position` by an independent uniform draw in `[-max_deg, max_deg]`
/// on each axis. The result is not clamped to valid ranges.
///
/// A non-positive or non-finite `max_deg` leaves the position unchanged.
pub fn perturb(position: Coordinate, rng: &mut impl Rng, max_deg: f64) -> Coordinate {
    if !max_deg.is_finite() || max_deg <= 0.0 {
        return position;
    }
    let dlat = rng.random_range(-max_deg..=max_deg);
    let dlng = rng.random_range(-max_deg..=max_deg);
    Coordinate::unchecked(position.lat + dlat, position.lng + dlng)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use geofleet_db::MemoryStore;
    use geofleet_types::{GeofenceId, NewGeofence, NewVehicle, VehicleId, VehicleStatus};
    use proptest::prelude::*;

    use super::*;
    use crate::clock::ManualClock;
    use crate::testing::FailingStore;

    const CHICAGO: Coordinate = Coordinate::unchecked(41.8781, -87.6298);

    fn settings(seed: u64) -> SimulatorSettings {
        SimulatorSettings {
            seed: Some(seed),
            ..SimulatorSettings::default()
        }
    }

    async fn add_vehicle<S: EntityStore>(store: &S, label: &str, at: Coordinate) -> VehicleId {
        store
            .insert_vehicle(
                NewVehicle {
                    label: label.to_owned(),
                    position: at,
                    status: VehicleStatus::Active,
                },
                Utc::now(),
            )
            .await
            .unwrap()
            .id
    }

    async fn add_geofence<S: EntityStore>(store: &S, name: &str, radius_m: f64) -> GeofenceId {
        store
            .insert_geofence(NewGeofence {
                name: name.to_owned(),
                center: CHICAGO,
                radius_m,
                alert_message: format!("Entered {name}"),
            })
            .await
            .unwrap()
            .id
    }

    async fn add_downtown<S: EntityStore>(store: &S) {
        add_geofence(store, "Downtown", 8000.0).await;
    }

    #[tokio::test]
    async fn tick_moves_every_vehicle_within_bound() {
        let store = Arc::new(MemoryStore::new());
        for i in 0..5 {
            add_vehicle(store.as_ref(), &format!("TRK-{i}"), CHICAGO).await;
        }
        let before = store.list_vehicles().await.unwrap();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let sim = PositionSimulator::new(Arc::clone(&store), clock, settings(11));

        let summary = sim.tick().await.unwrap();
        assert_eq!(summary.tick, 1);
        assert_eq!(summary.vehicles_moved, 5);

        let after = store.list_vehicles().await.unwrap();
        for (old, new) in before.iter().zip(&after) {
            assert_eq!(old.id, new.id);
            assert!((new.position.lat - old.position.lat).abs() <= 0.005 + 1e-9);
            assert!((new.position.lng - old.position.lng).abs() <= 0.005 + 1e-9);
        }
    }

    #[tokio::test]
    async fn two_ticks_ten_seconds_apart_emit_one_alert() {
        let store = Arc::new(MemoryStore::new());
        add_vehicle(store.as_ref(), "TRK-1", CHICAGO).await;
        add_downtown(store.as_ref()).await;
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let sim = PositionSimulator::new(Arc::clone(&store), Arc::clone(&clock) as Arc<dyn Clock>, settings(3));

        let first = sim.tick().await.unwrap();
        clock.advance(TimeDelta::seconds(10));
        let second = sim.tick().await.unwrap();

        assert_eq!(first.alerts_emitted, 1);
        assert_eq!(second.alerts_emitted, 0);
        assert_eq!(second.alerts_suppressed, 1);
        assert_eq!(store.alert_count().await, 1);
    }

    #[tokio::test]
    async fn match_after_window_emits_again() {
        let store = Arc::new(MemoryStore::new());
        add_vehicle(store.as_ref(), "TRK-1", CHICAGO).await;
        add_downtown(store.as_ref()).await;
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let sim = PositionSimulator::new(Arc::clone(&store), Arc::clone(&clock) as Arc<dyn Clock>, settings(5));

        sim.tick().await.unwrap();
        clock.advance(TimeDelta::minutes(5) + TimeDelta::seconds(1));
        let summary = sim.tick().await.unwrap();

        assert_eq!(summary.alerts_emitted, 1);
        assert_eq!(store.alert_count().await, 2);
    }

    #[tokio::test]
    async fn vehicle_outside_every_geofence_raises_nothing() {
        let store = Arc::new(MemoryStore::new());
        add_vehicle(store.as_ref(), "TRK-AZ", Coordinate::unchecked(33.4484, -112.0740)).await;
        add_downtown(store.as_ref()).await;
        let sim = PositionSimulator::new(
            Arc::clone(&store),
            Arc::new(ManualClock::new(Utc::now())),
            settings(1),
        );

        let summary = sim.tick().await.unwrap();
        assert_eq!(summary.matches, 0);
        assert_eq!(store.alert_count().await, 0);
    }

    #[tokio::test]
    async fn one_failed_write_does_not_stop_the_others() {
        let store = Arc::new(FailingStore::new(MemoryStore::new()));
        let broken = add_vehicle(store.as_ref(), "TRK-1", CHICAGO).await;
        add_vehicle(store.as_ref(), "TRK-2", CHICAGO).await;
        add_vehicle(store.as_ref(), "TRK-3", CHICAGO).await;
        add_downtown(store.as_ref()).await;
        store.fail_next_update(broken);

        let clock = Arc::new(ManualClock::new(Utc::now()));
        let sim = PositionSimulator::new(Arc::clone(&store), Arc::clone(&clock) as Arc<dyn Clock>, settings(9));

        let first = sim.tick().await.unwrap();
        assert_eq!(first.vehicles_failed, 1);
        assert_eq!(first.vehicles_moved, 2);
        assert_eq!(first.alerts_emitted, 2);

        clock.advance(TimeDelta::seconds(10));
        let second = sim.tick().await.unwrap();
        assert_eq!(second.vehicles_failed, 0);
        assert_eq!(second.vehicles_moved, 3);
        // Only the vehicle that failed before has no alert inside the window.
        assert_eq!(second.alerts_emitted, 1);
        assert_eq!(second.alerts_suppressed, 2);
    }

    #[tokio::test]
    async fn failed_alert_insert_spares_other_geofences() {
        let store = Arc::new(FailingStore::new(MemoryStore::new()));
        add_vehicle(store.as_ref(), "TRK-1", CHICAGO).await;
        add_vehicle(store.as_ref(), "TRK-2", CHICAGO).await;
        add_geofence(store.as_ref(), "Downtown", 8000.0).await;
        let loop_zone = add_geofence(store.as_ref(), "Loop", 9000.0).await;
        store.fail_alert_inserts(loop_zone);

        let sim = PositionSimulator::new(
            Arc::clone(&store),
            Arc::new(ManualClock::new(Utc::now())),
            settings(21),
        );
        let summary = sim.tick().await.unwrap();

        assert_eq!(summary.vehicles_moved, 2);
        assert_eq!(summary.matches, 4);
        assert_eq!(summary.alerts_emitted, 2);
        assert_eq!(summary.alert_failures, 2);
        let alerts = store.recent_alerts(10).await.unwrap();
        assert_eq!(alerts.len(), 2);
        assert!(alerts.iter().all(|a| a.geofence_name == "Downtown"));
    }

    #[tokio::test]
    async fn failed_dedup_lookup_skips_only_that_match() {
        let store = Arc::new(FailingStore::new(MemoryStore::new()));
        add_vehicle(store.as_ref(), "TRK-1", CHICAGO).await;
        add_vehicle(store.as_ref(), "TRK-2", CHICAGO).await;
        let downtown = add_geofence(store.as_ref(), "Downtown", 8000.0).await;
        add_geofence(store.as_ref(), "Loop", 9000.0).await;
        store.fail_alert_lookups(downtown);

        let sim = PositionSimulator::new(
            Arc::clone(&store),
            Arc::new(ManualClock::new(Utc::now())),
            settings(22),
        );
        let summary = sim.tick().await.unwrap();

        assert_eq!(summary.matches, 4);
        assert_eq!(summary.alerts_emitted, 2);
        assert_eq!(summary.alerts_suppressed, 0);
        assert_eq!(summary.alert_failures, 2);
        let alerts = store.recent_alerts(10).await.unwrap();
        assert!(alerts.iter().all(|a| a.geofence_name == "Loop"));
    }

    #[tokio::test]
    async fn invalid_geofence_in_snapshot_is_skipped() {
        let store = Arc::new(FailingStore::new(MemoryStore::new()));
        add_vehicle(store.as_ref(), "TRK-1", CHICAGO).await;
        add_downtown(store.as_ref()).await;
        store.plant_geofence(Geofence {
            id: GeofenceId::new(),
            name: String::from("Broken"),
            center: CHICAGO,
            radius_m: -50.0,
            alert_message: String::from("Entered broken"),
        });

        let sim = PositionSimulator::new(
            Arc::clone(&store),
            Arc::new(ManualClock::new(Utc::now())),
            settings(23),
        );
        let summary = sim.tick().await.unwrap();

        assert_eq!(summary.geofences_skipped, 1);
        assert_eq!(summary.vehicles_moved, 1);
        assert_eq!(summary.matches, 1);
        assert_eq!(summary.alerts_emitted, 1);
    }

    #[test]
    fn non_finite_offset_leaves_position_unchanged() {
        let mut rng = StdRng::seed_from_u64(1);
        for max_deg in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            assert_eq!(perturb(CHICAGO, &mut rng, max_deg), CHICAGO);
        }
    }

    #[tokio::test]
    async fn unreachable_store_skips_the_tick() {
        let store = Arc::new(FailingStore::new(MemoryStore::new()));
        add_vehicle(store.as_ref(), "TRK-1", CHICAGO).await;
        store.set_unavailable(true);
        let sim = PositionSimulator::new(
            Arc::clone(&store),
            Arc::new(ManualClock::new(Utc::now())),
            settings(2),
        );

        let err = sim.tick().await.unwrap_err();
        assert!(matches!(err, TickError::StoreUnavailable { tick: 1, .. }));

        store.set_unavailable(false);
        let summary = sim.tick().await.unwrap();
        assert_eq!(summary.tick, 2);
        assert_eq!(summary.vehicles_moved, 1);
    }

    #[tokio::test]
    async fn out_of_range_draw_keeps_last_valid_position() {
        let store = Arc::new(MemoryStore::new());
        add_vehicle(store.as_ref(), "TRK-1", CHICAGO).await;
        let sim = PositionSimulator::new(
            Arc::clone(&store),
            Arc::new(ManualClock::new(Utc::now())),
            SimulatorSettings {
                perturbation_deg: 1000.0,
                ..settings(4)
            },
        );

        // With offsets this large almost every draw leaves the valid range.
        let mut rejected: u32 = 0;
        for _ in 0..10 {
            let summary = sim.tick().await.unwrap();
            rejected = rejected.saturating_add(summary.vehicles_rejected);
            let stored = store.list_vehicles().await.unwrap();
            assert!(stored.iter().all(|v| v.position.is_valid()));
        }
        assert!(rejected > 0);
    }

    #[tokio::test]
    async fn zero_perturbation_holds_position() {
        let store = Arc::new(MemoryStore::new());
        add_vehicle(store.as_ref(), "TRK-1", CHICAGO).await;
        let sim = PositionSimulator::new(
            Arc::clone(&store),
            Arc::new(ManualClock::new(Utc::now())),
            SimulatorSettings {
                perturbation_deg: 0.0,
                ..settings(8)
            },
        );
        sim.tick().await.unwrap();
        let stored = store.list_vehicles().await.unwrap();
        assert_eq!(stored.first().map(|v| v.position), Some(CHICAGO));
    }

    #[tokio::test]
    async fn same_seed_walks_the_same_path() {
        async fn walk(seed: u64) -> Vec<Coordinate> {
            let store = Arc::new(MemoryStore::new());
            add_vehicle(store.as_ref(), "TRK-1", CHICAGO).await;
            let sim = PositionSimulator::new(
                Arc::clone(&store),
                Arc::new(ManualClock::new(Utc::now())),
                settings(seed),
            );
            let mut path = Vec::new();
            for _ in 0..3 {
                sim.tick().await.unwrap();
                path.extend(store.list_vehicles().await.unwrap().iter().map(|v| v.position));
            }
            path
        }

        assert_eq!(walk(77).await, walk(77).await);
    }

    proptest! {
        #[test]
        fn perturbation_stays_within_bound(
            seed in any::<u64>(),
            lat in -89.0f64..89.0,
            lng in -179.0f64..179.0,
            max_deg in 0.0f64..1.0,
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let start = Coordinate::unchecked(lat, lng);
            let next = perturb(start, &mut rng, max_deg);
            prop_assert!((next.lat - start.lat).abs() <= max_deg + 1e-9);
            prop_assert!((next.lng - start.lng).abs() <= max_deg + 1e-9);
        }
    }
}
