use crate::error::ApiError;
use async_trait::async_trait;
use configuration::DataSourceSettings;
use core_types::{Instrument, Interval, Period, Series};
use futures::stream::{self, StreamExt};
use reqwest::Url;
use std::time::Duration;

pub mod error;
pub mod responses;
// --- Public API ---
pub use responses::ChartResponse;

/// What to download for each instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesRequest {
    pub interval: Interval,
    pub period: Period,
}

/// The generic, abstract interface for a market-data provider.
/// This trait is the contract the dashboard uses, allowing the underlying
/// implementation (live or stub) to be swapped out.
#[async_trait]
pub trait MarketDataClient: Send + Sync {
    /// Fetches the price history of one symbol.
    async fn fetch_series(&self, symbol: &str, request: SeriesRequest) -> Result<Series, ApiError>;
}

/// A concrete implementation of `MarketDataClient` for the Yahoo Finance chart API.
#[derive(Clone)]
pub struct YahooClient {
    client: reqwest::Client,
    base_url: Url,
}

impl YahooClient {
    pub fn new(settings: &DataSourceSettings) -> Result<Self, ApiError> {
        let base_url = Url::parse(&settings.base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", settings.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(settings.base_url.clone()));
        }

        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self { client, base_url })
    }

    fn chart_url(&self, symbol: &str) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", symbol]);
        Ok(url)
    }
}

#[async_trait]
impl MarketDataClient for YahooClient {
    async fn fetch_series(&self, symbol: &str, request: SeriesRequest) -> Result<Series, ApiError> {
        let url = self.chart_url(symbol)?;

        let response = self
            .client
            .get(url)
            .query(&[
                ("range", request.period.as_str()),
                ("interval", request.interval.as_str()),
                ("includePrePost", "false"),
            ])
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;

        let parsed = serde_json::from_str::<ChartResponse>(&text);
        if !status.is_success() {
            // The chart API explains most failures inside the usual envelope.
            let detail = parsed
                .ok()
                .and_then(|body| body.chart.error)
                .map(|error| format!(": {}: {}", error.code, error.description))
                .unwrap_or_default();
            return Err(ApiError::Provider(format!("HTTP {} for {}{}", status, symbol, detail)));
        }

        parsed
            .map_err(|e| ApiError::Deserialization(e.to_string()))?
            .into_series()
    }
}

/// Fetches one series, turning every failure (including a timeout) into an
/// empty series so the ranking can still place the instrument.
pub async fn fetch_or_empty<C>(
    client: &C,
    instrument: &Instrument,
    request: SeriesRequest,
    timeout: Duration,
) -> Series
where
    C: MarketDataClient + ?Sized,
{
    let outcome = match tokio::time::timeout(timeout, client.fetch_series(&instrument.symbol, request)).await {
        Ok(result) => result,
        Err(_) => Err(ApiError::Timeout(timeout)),
    };

    match outcome {
        Ok(series) => {
            tracing::debug!(symbol = %instrument.symbol, points = series.len(), "Fetched series.");
            series
        }
        Err(e) => {
            tracing::warn!(symbol = %instrument.symbol, error = %e, "Fetch failed, using an empty series.");
            Series::empty()
        }
    }
}

/// Fetches every instrument with at most `max_concurrency` requests in flight.
///
/// The output keeps the input order. `on_complete` is called once per
/// instrument as results are yielded, which is where a progress bar is driven.
pub async fn fetch_all<C, F>(
    client: &C,
    instruments: Vec<Instrument>,
    request: SeriesRequest,
    max_concurrency: usize,
    timeout: Duration,
    mut on_complete: F,
) -> Vec<(Instrument, Series)>
where
    C: MarketDataClient + ?Sized,
    F: FnMut(&Instrument, &Series),
{
    stream::iter(instruments)
        .map(|instrument| async move {
            let series = fetch_or_empty(client, &instrument, request, timeout).await;
            (instrument, series)
        })
        .buffered(max_concurrency.max(1))
        .inspect(|(instrument, series)| on_complete(instrument, series))
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use core_types::PricePoint;
    use std::collections::HashMap;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    enum Behaviour {
        Points(usize),
        Fail,
        Hang,
    }

    struct StubClient {
        behaviour: HashMap<String, Behaviour>,
    }

    #[async_trait]
    impl MarketDataClient for StubClient {
        async fn fetch_series(&self, symbol: &str, _request: SeriesRequest) -> Result<Series, ApiError> {
            match self.behaviour.get(symbol) {
                Some(Behaviour::Points(n)) => {
                    let start = NaiveDate::from_ymd_opt(2024, 1, 1)
                        .unwrap()
                        .and_hms_opt(0, 0, 0)
                        .unwrap();
                    let points = (0..*n)
                        .map(|i| PricePoint::new(start + chrono::Duration::days(i as i64), i as f64, i as f64))
                        .collect();
                    Ok(Series::new(points)?)
                }
                Some(Behaviour::Fail) => Err(ApiError::Provider("boom".to_string())),
                Some(Behaviour::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(Series::empty())
                }
                None => Err(ApiError::InvalidData(format!("unknown symbol {symbol}"))),
            }
        }
    }

    fn request() -> SeriesRequest {
        SeriesRequest {
            interval: Interval::OneDay,
            period: Period::OneYear,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failures_and_timeouts_become_empty_series_in_order() {
        let client = StubClient {
            behaviour: HashMap::from([
                ("GC=F".to_string(), Behaviour::Points(5)),
                ("SI=F".to_string(), Behaviour::Fail),
                ("CL=F".to_string(), Behaviour::Hang),
                ("NG=F".to_string(), Behaviour::Points(2)),
            ]),
        };
        let instruments = vec![
            Instrument::new("Gold", "GC=F"),
            Instrument::new("Silver", "SI=F"),
            Instrument::new("Crude Oil", "CL=F"),
            Instrument::new("Natural Gas", "NG=F"),
        ];

        let mut completed = 0;
        let results = fetch_all(&client, instruments, request(), 2, Duration::from_secs(10), |_, _| {
            completed += 1
        })
        .await;

        assert_eq!(completed, 4);
        let lengths: Vec<(&str, usize)> = results
            .iter()
            .map(|(i, s)| (i.symbol.as_str(), s.len()))
            .collect();
        assert_eq!(lengths, vec![("GC=F", 5), ("SI=F", 0), ("CL=F", 0), ("NG=F", 2)]);
    }

    #[tokio::test]
    async fn trait_objects_can_be_used() {
        let client: Box<dyn MarketDataClient> = Box::new(StubClient {
            behaviour: HashMap::from([("BTC-USD".to_string(), Behaviour::Points(3))]),
        });
        let series = fetch_or_empty(
            client.as_ref(),
            &Instrument::from_symbol("BTC-USD"),
            request(),
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(series.len(), 3);
    }

    /// Serves exactly one HTTP response and hands back the request line.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            request.lines().next().unwrap_or_default().to_string()
        });
        (format!("http://{}", addr), handle)
    }

    fn settings(base_url: String) -> DataSourceSettings {
        DataSourceSettings {
            base_url,
            timeout_secs: 5,
            ..DataSourceSettings::default()
        }
    }

    #[tokio::test]
    async fn yahoo_client_requests_the_chart_endpoint() {
        let body = r#"{"chart":{"result":[{"meta":{"symbol":"GC=F","gmtoffset":0},"timestamp":[1704067200,1704153600],"indicators":{"quote":[{"close":[2063.0,2071.5],"high":[2070.0,2075.0]}]}}],"error":null}}"#;
        let (base_url, server) = serve_once("200 OK", body).await;

        let client = YahooClient::new(&settings(base_url)).unwrap();
        let series = client.fetch_series("GC=F", request()).await.unwrap();
        let request_line = server.await.unwrap();

        assert_eq!(series.len(), 2);
        assert!(request_line.starts_with("GET /v8/finance/chart/GC=F?"));
        assert!(request_line.contains("range=1y"));
        assert!(request_line.contains("interval=1d"));
    }

    #[tokio::test]
    async fn yahoo_client_reports_error_envelope_on_http_failure() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#;
        let (base_url, server) = serve_once("404 Not Found", body).await;

        let client = YahooClient::new(&settings(base_url)).unwrap();
        let err = client.fetch_series("NOPE=F", request()).await.unwrap_err();
        server.await.unwrap();

        assert!(matches!(err, ApiError::Provider(msg) if msg.contains("No data found")));
    }

    #[tokio::test]
    async fn yahoo_client_rejects_failed_status_even_with_a_result() {
        let body = r#"{"chart":{"result":[{"meta":{"gmtoffset":0},"timestamp":[1704067200],"indicators":{"quote":[{"close":[1.0],"high":[1.0]}]}}],"error":null}}"#;
        let (base_url, server) = serve_once("503 Service Unavailable", body).await;

        let client = YahooClient::new(&settings(base_url)).unwrap();
        let err = client.fetch_series("GC=F", request()).await.unwrap_err();
        server.await.unwrap();

        assert!(matches!(err, ApiError::Provider(msg) if msg.starts_with("HTTP 503")));
    }

    #[test]
    fn rejects_unusable_base_url() {
        assert!(matches!(
            YahooClient::new(&settings("not a url".to_string())),
            Err(ApiError::InvalidUrl(_))
        ));
    }
}
