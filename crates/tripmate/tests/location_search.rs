use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tripmate::onboarding::{GeocodeError, Geocoder, Location, LocationSearch, SearchOutcome};

/// Answers with the query itself; shorter queries take longer to come back.
#[derive(Default)]
struct EchoGeocoder {
    calls: AtomicUsize,
}

impl Geocoder for EchoGeocoder {
    async fn search(&self, query: &str) -> Result<Vec<Location>, GeocodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let latency = if query.len() < 3 { 1_000 } else { 10 };
        tokio::time::sleep(Duration::from_millis(latency)).await;
        Ok(vec![Location {
            city: query.to_string(),
            country: "Austria".to_string(),
            display_name: format!("{query}, Austria"),
            coordinates: None,
        }])
    }
}

struct DownGeocoder;

impl Geocoder for DownGeocoder {
    async fn search(&self, _query: &str) -> Result<Vec<Location>, GeocodeError> {
        Err(GeocodeError::Transport("connection refused".to_string()))
    }
}

fn debounce() -> Duration {
    Duration::from_millis(300)
}

#[tokio::test(start_paused = true)]
async fn rapid_keystrokes_reach_the_geocoder_once() {
    let geocoder = Arc::new(EchoGeocoder::default());
    let search = LocationSearch::new(geocoder.clone(), debounce());

    let (first, second, third) = tokio::join!(
        search.search("Gra"),
        async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            search.search("Graz").await
        },
        async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            search.search("Graz ").await
        },
    );

    assert_eq!(first, SearchOutcome::Superseded);
    assert_eq!(second, SearchOutcome::Superseded);
    assert_eq!(third.suggestions()[0].display_name, "Graz, Austria");
    assert_eq!(geocoder.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn late_response_for_an_older_query_is_discarded() {
    let geocoder = Arc::new(EchoGeocoder::default());
    let search = LocationSearch::new(geocoder.clone(), debounce());

    let (older, newer) = tokio::join!(search.search("Vi"), async {
        // Past the debounce, so the older query is already waiting on the geocoder.
        tokio::time::sleep(Duration::from_millis(350)).await;
        search.search("Vienna").await
    });

    assert_eq!(older, SearchOutcome::Superseded);
    assert_eq!(newer.suggestions().len(), 1);
    assert_eq!(newer.suggestions()[0].city, "Vienna");
    assert_eq!(geocoder.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn provider_failures_show_no_suggestions() {
    let search = LocationSearch::new(Arc::new(DownGeocoder), debounce());
    assert_eq!(
        search.search("Salzburg").await,
        SearchOutcome::Suggestions(Vec::new())
    );
}
