use std::{sync::Arc, time::Duration};

use chrono::Utc;
use log::{debug, info, warn};
use tokio::{
    sync::{Mutex, RwLock, mpsc},
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    location::{GeoPoint, LocationService},
    maneuver::Maneuver,
    prelude::*,
    route::{BehaviorSink, IndicatorAdvisor, RouteService},
    session::{NavSession, NavSnapshot, RouteRequest},
    settings::IndicatorSettings,
};

pub trait StateUpdateSender {
    fn send_update(&self);
}

type RouteDelivery = (u64, Vec<Maneuver>);
type RouteSlot = (mpsc::Sender<RouteDelivery>, Mutex<mpsc::Receiver<RouteDelivery>>);

/// Drives a [NavSession] from a [LocationService], one fix per tick. Routes are fetched
/// from a [RouteService] in the background and picked up at the start of the next tick,
/// behavior events go to a [BehaviorSink], and the UI is poked through [StateUpdateSender].
pub struct Navigator<L: LocationService, R: RouteService, S: BehaviorSink, U: StateUpdateSender> {
    session: RwLock<NavSession>,
    location: L,
    routes: Arc<R>,
    sink: S,
    state_update_sender: U,
    advisor: Option<Box<dyn IndicatorAdvisor>>,
    interval: Duration,
    route_slot: RouteSlot,
    cancel: CancellationToken,
}

impl<L: LocationService, R: RouteService, S: BehaviorSink, U: StateUpdateSender>
    Navigator<L, R, S, U>
{
    pub fn new(
        interval: Duration,
        settings: IndicatorSettings,
        location: L,
        routes: Arc<R>,
        sink: S,
        state_update_sender: U,
    ) -> Result<Self> {
        settings.validate().context("Invalid indicator settings")?;

        let (tx, rx) = mpsc::channel(2);

        Ok(Self {
            session: RwLock::new(NavSession::new(settings)),
            location,
            routes,
            sink,
            state_update_sender,
            advisor: None,
            interval,
            route_slot: (tx, Mutex::new(rx)),
            cancel: CancellationToken::new(),
        })
    }

    /// Attach a predictor whose result is shown in [NavSnapshot::advisory_forget_indicator]
    pub fn with_advisor(mut self, advisor: impl IndicatorAdvisor + 'static) -> Self {
        self.advisor = Some(Box::new(advisor));
        self
    }

    pub async fn get_snapshot(&self) -> NavSnapshot {
        self.session.read().await.snapshot()
    }

    pub async fn set_indicator(&self, on: bool) {
        let mut session = self.session.write().await;
        if let Some(event) = session.set_indicator(on, Utc::now()) {
            self.sink.log_event(event);
        }
        drop(session);
        self.state_update_sender.send_update();
    }

    pub async fn set_destination(&self, destination: Option<GeoPoint>) {
        info!("Destination set to {destination:?}");
        self.session.write().await.set_destination(destination);
        self.state_update_sender.send_update();
    }

    pub async fn quit(&self) {
        self.cancel.cancel();
    }

    fn spawn_route_fetch(&self, req: RouteRequest) {
        debug!("Requesting route from {:?} to {:?}", req.start, req.end);
        let routes = self.routes.clone();
        let tx = self.route_slot.0.clone();
        tokio::spawn(async move {
            let maneuvers = routes.fetch_route(req.start, req.end).await;
            if tx.send((req.generation, maneuvers)).await.is_err() {
                debug!("Navigator stopped before the route arrived");
            }
        });
    }

    async fn merge_routes(&self, session: &mut NavSession) {
        let mut rx = self.route_slot.1.lock().await;
        while let Ok((generation, maneuvers)) = rx.try_recv() {
            session.apply_route(generation, maneuvers);
        }
    }

    /// Process a single fix, returns whether the location source gave us one
    async fn tick(&self, session: &mut NavSession, resuming: bool) -> bool {
        self.merge_routes(session).await;

        let Some(fix) = self.location.get_fix() else {
            return false;
        };

        if resuming {
            session.restart_tracking();
        }

        for event in session.process_fix(&fix, Utc::now()) {
            self.sink.log_event(event);
        }

        if let Some(advisor) = &self.advisor {
            if let Some(input) = session.advisory_input() {
                session.set_advisory(advisor.predict(input));
            }
        }

        if let Some(req) = session.needs_route(Instant::now()) {
            self.spawn_route_fetch(req);
        }

        self.state_update_sender.send_update();

        true
    }

    /// Main loop, runs until [Navigator::quit] is called and returns the final snapshot
    pub async fn main_loop(&self) -> NavSnapshot {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut interrupted = false;

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    break;
                }

                _ = interval.tick() => {
                    let mut session = self.session.write().await;
                    let got_fix = self.tick(&mut session, interrupted).await;

                    if got_fix && interrupted {
                        info!("Location source resumed");
                    } else if !got_fix && !interrupted {
                        warn!("Location source interrupted");
                    }

                    interrupted = !got_fix;
                }
            }
        }

        self.get_snapshot().await
    }
}
