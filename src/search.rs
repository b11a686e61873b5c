use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::{RangeQuery, SearchSettings};
use crate::destination::{bearings, destination_point, GeoPoint};
use crate::routing::RoutingProvider;

/// Furthest point along one bearing that was confirmed reachable
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryPoint {
    pub bearing: f64,
    pub point: GeoPoint,
    /// Road distance reported by the provider for `point`
    pub route_km: f64,
}

/// Binary-searches the furthest reachable query target along `bearing`.
///
/// Always issues exactly `settings.iterations` provider calls. The result is
/// the best reachable candidate seen, which is not necessarily the last one:
/// road distance is not strictly monotonic in the straight-line offset.
pub async fn find_boundary_point<P>(
    provider: &P,
    query: &RangeQuery,
    settings: &SearchSettings,
    bearing: f64,
) -> Option<BoundaryPoint>
where
    P: RoutingProvider,
{
    let start = query.start();
    let range_km = query.effective_range_km();

    let mut low = 0.0;
    let mut high = range_km * settings.upper_bound_factor;
    let mut best: Option<BoundaryPoint> = None;

    for _ in 0..settings.iterations {
        let mid = (low + high) / 2.0;
        let candidate = destination_point(start, bearing, mid);

        let Some(actual) = provider.routable_distance_km(start, candidate).await else {
            // unknown counts as too far
            high = mid;
            continue;
        };

        debug!(bearing, candidate_km = mid, route_km = actual, "step");

        if actual <= range_km {
            low = mid;
            if actual > best.map_or(0.0, |b| b.route_km) {
                best = Some(BoundaryPoint {
                    bearing,
                    point: candidate,
                    route_km: actual,
                });
            }
        } else {
            high = mid;
        }
    }

    best
}

/// Searches every bearing of `query` and returns the boundary points in
/// bearing order, starting at north.
///
/// At most `settings.concurrency` bearings are in flight at once. Bearings
/// without a reachable candidate are left out.
pub async fn find_boundary_points<P>(
    provider: Arc<P>,
    query: &RangeQuery,
    settings: &SearchSettings,
) -> Vec<BoundaryPoint>
where
    P: RoutingProvider + Send + Sync + 'static,
{
    let bearings = bearings(query.num_directions());
    let total = bearings.len();
    // more permits than bearings buys nothing
    let permits = Arc::new(Semaphore::new(settings.concurrency.clamp(1, total.max(1))));

    let mut tasks = JoinSet::new();
    for (index, bearing) in bearings.into_iter().enumerate() {
        let provider = Arc::clone(&provider);
        let permits = Arc::clone(&permits);
        let query = query.clone();
        let settings = settings.clone();

        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await.ok();
            let point = find_boundary_point(&*provider, &query, &settings, bearing).await;
            (index, bearing, point)
        });
    }

    // One slot per bearing keeps the ring in sweep order whatever finishes first
    let mut slots: Vec<Option<BoundaryPoint>> = vec![None; total];
    let mut done = 0;
    while let Some(joined) = tasks.join_next().await {
        done += 1;
        match joined {
            Ok((index, bearing, point)) => {
                match &point {
                    Some(found) => info!(
                        "[{done}/{total}] bearing {bearing:.1}°: boundary at {} ({:.1} km by road)",
                        found.point, found.route_km
                    ),
                    None => info!("[{done}/{total}] bearing {bearing:.1}°: no reachable point"),
                }
                slots[index] = point;
            }
            Err(err) => warn!("[{done}/{total}] bearing search failed: {err}"),
        }
    }

    let (found, points) = slots.into_iter().fold(
        (0usize, Vec::with_capacity(total)),
        |(found, mut points), slot| match slot {
            Some(point) => {
                points.push(point);
                (found + 1, points)
            }
            None => (found, points),
        },
    );
    info!("{found} of {total} bearings produced a boundary point");

    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::{assert_none, assert_ok, assert_some};
    use std::collections::VecDeque;
    use std::future::Future;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Answers from a fixed script, then `fallback` once the script runs out
    struct ScriptedProvider {
        script: Mutex<VecDeque<Option<f64>>>,
        fallback: Option<f64>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Option<f64>>, fallback: Option<f64>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                fallback,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl RoutingProvider for ScriptedProvider {
        fn routable_distance_km(
            &self,
            _origin: GeoPoint,
            _destination: GeoPoint,
        ) -> impl Future<Output = Option<f64>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let answer = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(self.fallback);
            async move { answer }
        }
    }

    /// Road distance is the straight-line query offset times a detour factor
    struct DetourProvider {
        factor: f64,
        calls: AtomicUsize,
    }

    impl RoutingProvider for DetourProvider {
        fn routable_distance_km(
            &self,
            origin: GeoPoint,
            destination: GeoPoint,
        ) -> impl Future<Output = Option<f64>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let north_km = (destination.lat - origin.lat) * 111.0;
            let east_km = (destination.lon - origin.lon) * 111.0 * origin.lat.to_radians().cos();
            let km = north_km.hypot(east_km) * self.factor;
            async move { Some(km) }
        }
    }

    fn query(directions: usize) -> RangeQuery {
        assert_ok!(RangeQuery::new(
            GeoPoint::new(52.52, 13.405),
            110.0,
            10.0,
            directions
        ))
    }

    #[tokio::test]
    async fn issues_exactly_ten_calls_per_bearing() {
        let settings = SearchSettings::default();

        let reachable = ScriptedProvider::new(vec![], Some(1.0));
        find_boundary_point(&reachable, &query(16), &settings, 0.0).await;
        assert_eq!(reachable.calls(), 10);

        let unreachable = ScriptedProvider::new(vec![], Some(1_000.0));
        find_boundary_point(&unreachable, &query(16), &settings, 45.0).await;
        assert_eq!(unreachable.calls(), 10);

        let absent = ScriptedProvider::new(vec![], None);
        find_boundary_point(&absent, &query(16), &settings, 90.0).await;
        assert_eq!(absent.calls(), 10);
    }

    #[tokio::test]
    async fn call_count_follows_iterations_setting() {
        let settings = SearchSettings {
            iterations: 4,
            ..SearchSettings::default()
        };
        let provider = ScriptedProvider::new(vec![], Some(50.0));
        find_boundary_point(&provider, &query(16), &settings, 0.0).await;
        assert_eq!(provider.calls(), 4);
    }

    #[tokio::test]
    async fn keeps_best_reachable_point_not_last() {
        // effective range 100 km, candidates at 75, 112.5, 93.75, ...
        let provider = ScriptedProvider::new(
            vec![Some(95.0), Some(99.0), Some(140.0)],
            Some(150.0),
        );
        let settings = SearchSettings::default();

        let found = assert_some!(find_boundary_point(&provider, &query(16), &settings, 0.0).await);

        assert_eq!(found.route_km, 99.0);
        let expected = destination_point(GeoPoint::new(52.52, 13.405), 0.0, 112.5);
        assert_eq!(found.point, expected);
        assert_eq!(provider.calls(), 10);
    }

    #[tokio::test]
    async fn shorter_route_further_out_does_not_replace_best() {
        // second candidate is further out but reports a shorter road distance
        let provider = ScriptedProvider::new(vec![Some(90.0), Some(60.0)], Some(500.0));
        let settings = SearchSettings::default();

        let found = assert_some!(find_boundary_point(&provider, &query(16), &settings, 0.0).await);

        assert_eq!(found.route_km, 90.0);
        let expected = destination_point(GeoPoint::new(52.52, 13.405), 0.0, 75.0);
        assert_eq!(found.point, expected);
    }

    #[tokio::test]
    async fn always_absent_gives_no_point() {
        let provider = ScriptedProvider::new(vec![], None);
        let settings = SearchSettings::default();

        assert_none!(find_boundary_point(&provider, &query(16), &settings, 180.0).await);
    }

    #[tokio::test]
    async fn never_within_range_gives_no_point() {
        let provider = ScriptedProvider::new(vec![], Some(101.0));
        let settings = SearchSettings::default();

        assert_none!(find_boundary_point(&provider, &query(16), &settings, 180.0).await);
    }

    #[tokio::test]
    async fn absent_distance_narrows_downward() {
        // first call fails, second lands at 37.5 km
        let provider = ScriptedProvider::new(vec![None, Some(40.0)], Some(1_000.0));
        let settings = SearchSettings::default();

        let found = assert_some!(find_boundary_point(&provider, &query(16), &settings, 0.0).await);
        let expected = destination_point(GeoPoint::new(52.52, 13.405), 0.0, 37.5);
        assert_eq!(found.point, expected);
    }

    #[tokio::test]
    async fn converges_towards_effective_range() {
        let provider = DetourProvider {
            factor: 1.25,
            calls: AtomicUsize::new(0),
        };
        let settings = SearchSettings::default();

        let found = assert_some!(find_boundary_point(&provider, &query(16), &settings, 90.0).await);

        assert!(found.route_km <= 100.0);
        assert!(found.route_km > 99.0, "got {}", found.route_km);
        assert!(found.point.lon > 13.405);
    }

    #[tokio::test]
    async fn points_come_back_in_bearing_order() {
        let provider = Arc::new(DetourProvider {
            factor: 1.3,
            calls: AtomicUsize::new(0),
        });
        let settings = SearchSettings {
            concurrency: 8,
            ..SearchSettings::default()
        };

        let points = find_boundary_points(Arc::clone(&provider), &query(16), &settings).await;

        assert_eq!(points.len(), 16);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 160);
        let swept: Vec<f64> = points.iter().map(|p| p.bearing).collect();
        assert_eq!(swept, bearings(16));
    }

    #[tokio::test]
    async fn concurrency_does_not_change_the_result() {
        let sequential = find_boundary_points(
            Arc::new(DetourProvider {
                factor: 1.4,
                calls: AtomicUsize::new(0),
            }),
            &query(12),
            &SearchSettings::default(),
        )
        .await;

        let parallel = find_boundary_points(
            Arc::new(DetourProvider {
                factor: 1.4,
                calls: AtomicUsize::new(0),
            }),
            &query(12),
            &SearchSettings {
                concurrency: 12,
                ..SearchSettings::default()
            },
        )
        .await;

        assert_eq!(sequential, parallel);
    }

    #[tokio::test]
    async fn oversized_concurrency_is_clamped() {
        let provider = Arc::new(DetourProvider {
            factor: 1.2,
            calls: AtomicUsize::new(0),
        });
        let settings = SearchSettings {
            concurrency: usize::MAX,
            ..SearchSettings::default()
        };

        let points = find_boundary_points(Arc::clone(&provider), &query(8), &settings).await;

        assert_eq!(points.len(), 8);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 80);
    }

    #[tokio::test]
    async fn failed_bearings_are_skipped() {
        let provider = Arc::new(ScriptedProvider::new(vec![], None));
        let points =
            find_boundary_points(provider, &query(16), &SearchSettings::default()).await;
        assert!(points.is_empty());
    }
}
