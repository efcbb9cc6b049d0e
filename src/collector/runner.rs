use anyhow::Context;
use chrono::{DateTime, Utc};
use tokio::time::{Duration, Instant, sleep};

use crate::{
    api::{Session, Transport},
    metrics::{Gauge, MetricsSink},
    schema::Ship,
    util,
};

/// Summary of one completed cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,

    /// Time spent fetching and publishing
    pub elapsed: Duration,

    /// Sleep before the next cycle, zero on overrun
    pub wait: Duration,

    pub ships: usize,
}

/// Poll loop of one account.
///
/// One cycle, strictly sequential:
/// 1. game status       -> `game_status`
/// 2. account details   -> `credits`, `shipcount`, `structurecount`
/// 3. leaderboard       -> `userrank`
/// 4. ships             -> `shipload`, one series per ship
/// 5. sleep for what is left of the interval
///
/// Later steps label their gauges with the username refreshed in
/// step 2, hence no fan-out across the four calls.
///
/// FAILURE POLICY:
/// - any fetch error ends the cycle and the loop
/// - no skip, no retry at this level (the transport retries timeouts)
///
pub struct Collector<T, S> {
    session: Session<T>,
    sink: S,
    interval: Duration,
}

impl<T: Transport, S: MetricsSink> Collector<T, S> {
    pub fn new(session: Session<T>, sink: S, interval: Duration) -> Self {
        Self {
            session,
            sink,
            interval,
        }
    }

    /// Runs cycles until one fails, then returns that error.
    ///
    /// GUARANTEES:
    /// - never returns `Ok`
    /// - no call is issued after the failing one
    pub async fn run(&mut self) -> anyhow::Result<()> {
        let mut cycle: u64 = 0;

        loop {
            cycle += 1;

            let report = self
                .run_cycle()
                .await
                .with_context(|| format!("collection cycle {cycle} failed"))?;

            log::info!(
                "cycle {} ({}, {} ships) Duration: {} / Wait: {}",
                cycle,
                report.started_at.to_rfc3339(),
                report.ships,
                report.elapsed.as_millis(),
                report.wait.as_millis()
            );

            if report.wait.is_zero() {
                log::warn!(
                    "cycle {} overran the {} ms interval, starting next cycle now",
                    cycle,
                    self.interval.as_millis()
                );
            } else {
                sleep(report.wait).await;
            }
        }
    }

    /// Fetches and publishes everything once. Does not sleep.
    pub async fn run_cycle(&mut self) -> anyhow::Result<CycleReport> {
        let started_at = Utc::now();
        let start = Instant::now();

        // ----------------------------------------------------
        // Game status
        // ----------------------------------------------------
        let status = self
            .session
            .fetch_status()
            .await
            .context("fetching game status")?;

        self.sink.record(
            Gauge::GameStatus,
            &[self.session.username()],
            status.as_signal() as f64,
        );
        log::info!("game status: {:?}", status);

        // ----------------------------------------------------
        // Account details
        // ----------------------------------------------------
        let details = self
            .session
            .fetch_account_details()
            .await
            .context("fetching account details")?;

        let username = [details.username.as_str()];
        self.sink.record(Gauge::Credits, &username, details.credits as f64);
        self.sink.record(Gauge::ShipCount, &username, details.ship_count as f64);
        self.sink.record(Gauge::StructureCount, &username, details.structure_count as f64);
        log::info!("{:?}", details);

        // ----------------------------------------------------
        // Leaderboard
        // ----------------------------------------------------
        let board = self
            .session
            .fetch_leaderboard()
            .await
            .context("fetching leaderboard")?;

        self.sink.record(
            Gauge::UserRank,
            &[self.session.username()],
            board.user_net_worth.rank as f64,
        );
        log::info!("{:?}", board.user_net_worth);

        // ----------------------------------------------------
        // Ships
        // ----------------------------------------------------
        let ships = self
            .session
            .fetch_ships()
            .await
            .context("fetching ships")?;

        for ship in &ships {
            self.publish_ship(ship);
            log::info!("{:?}", ship);
        }

        let elapsed = start.elapsed();

        Ok(CycleReport {
            started_at,
            elapsed,
            wait: util::remaining_wait(self.interval, elapsed),
            ships: ships.len(),
        })
    }

    fn publish_ship(&self, ship: &Ship) {
        let max_cargo = ship.max_cargo.to_string();
        let plating = ship.plating.to_string();
        let speed = ship.speed.to_string();
        let weapons = ship.weapons.to_string();

        self.sink.record(
            Gauge::ShipLoad,
            &[
                self.session.username(),
                &ship.id,
                &ship.class,
                &ship.manufacturer,
                &ship.kind,
                &max_cargo,
                &plating,
                &speed,
                &weapons,
            ],
            ship.space_available as f64,
        );
    }
}
